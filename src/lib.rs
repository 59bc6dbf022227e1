pub mod auth;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod handlers;
pub mod paths;
pub mod services;
pub mod state;

#[cfg(test)]
mod testing;

pub use handlers::router;
pub use state::AppState;
