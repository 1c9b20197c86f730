use assessment_backend::{
    config::{Config, LogFormat},
    database::{
        pool::{create_pool, run_migrations},
        AssessmentStore, MemoryStore, PgStore,
    },
    routes, utils, AppState,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_tracing(config.log_format);

    let store: Arc<dyn AssessmentStore> = match config.database_url {
        Some(_) => {
            let pool = create_pool(&config).await?;
            run_migrations(&pool).await?;
            info!("Using Postgres assessment store");
            Arc::new(PgStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory store; data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let app_state = AppState::new(store, &config);

    {
        let attempt_svc = app_state.attempt_service.clone();
        let interval = Duration::from_secs(config.expiry_sweep_seconds.max(1));
        tokio::spawn(async move {
            loop {
                if let Err(e) = attempt_svc.expire_overdue(utils::time::now()).await {
                    tracing::error!(error = ?e, "Expiry sweeper error");
                }
                tokio::time::sleep(interval).await;
            }
        });
    }

    let app = routes::build_router(app_state, config.max_body_bytes);

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}
