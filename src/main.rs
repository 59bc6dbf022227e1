use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use finance_tracker::auth::db as auth_db;
use finance_tracker::db::{self, LogOnError};
use finance_tracker::{config, router, AppState};

#[tokio::main]
async fn main() {
  tracing_subscriber::registry()
    .with(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "finance_tracker=debug,tower_http=debug".into()),
    )
    .with(tracing_subscriber::fmt::layer())
    .init();

  let settings = config::load();

  let pool = db::init_db(&settings.database_path).expect("Failed to initialize database");
  tracing::info!("Database ready at {}", settings.database_path.display());

  {
    let conn = pool.lock().expect("Database lock failed during startup");
    let purged = auth_db::cleanup_expired_sessions(&conn)
      .log_warn_default("Failed to purge expired sessions");
    if purged > 0 {
      tracing::debug!("Purged {} expired sessions", purged);
    }
  }

  let app = router(AppState::new(pool));

  let bind_addr = settings.bind_addr();
  let listener = tokio::net::TcpListener::bind(&bind_addr)
    .await
    .unwrap_or_else(|_| panic!("Failed to bind to {}", bind_addr));

  tracing::info!("Server running on http://{}", bind_addr);

  axum::serve(listener, app)
    .await
    .expect("Server failed to start");
}
