use std::{sync::Arc, time::Duration};

use axum::Router;
use tokio::net::TcpListener;
use tokio::time::interval;

use parkease::{
    app::{
        api::{create_api_router, AppContext},
        state::AppState,
    },
    config::GlobalConfig,
    events::AppEvent,
    services::payment::MockPaymentGateway,
    utils::{
        clock::SystemClock,
        rate_limiter::RateLimiter,
        store::{FileStore, KeyValueStore, MemoryStore},
    },
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    tracing::info!("Starting ParkEase session engine");

    let config = GlobalConfig::from_env()?;

    let store: Arc<dyn KeyValueStore> = match &config.storage.data_file {
        Some(path) => Arc::new(FileStore::open(path)?),
        None => {
            tracing::info!("PARKEASE_DATA_FILE not set, records are kept in memory only");
            Arc::new(MemoryStore::new())
        }
    };

    let state = AppState::new(
        store,
        Arc::new(MockPaymentGateway::new(config.payments.failure_rate)),
        Arc::new(SystemClock),
        &config.billing,
    );
    let rate_limiter = RateLimiter::new(config.server.rate_limit_per_second);

    let tick_state = state.clone();
    let sweep_state = state.clone();
    let tick_interval_ms = config.scheduler.tick_interval_ms;
    let sweep_interval_sec = config.scheduler.standing_sweep_interval_sec;

    tokio::spawn(async move {
        let mut interval = interval(Duration::from_millis(tick_interval_ms));

        loop {
            interval.tick().await;

            match tick_state.running_session_views() {
                Ok(views) => {
                    for view in views {
                        tick_state.events.broadcast(AppEvent::SessionTick { view });
                    }
                }
                Err(e) => tracing::error!("Session tick failed: {}", e),
            }
        }
    });

    tokio::spawn(async move {
        let mut interval = interval(Duration::from_secs(sweep_interval_sec));

        loop {
            interval.tick().await;

            match sweep_state.escalate_overdue_accounts().await {
                Ok(0) => {}
                Ok(count) => tracing::info!("Suspended {} accounts with overdue dues", count),
                Err(e) => tracing::error!("Standing sweep failed: {}", e),
            }
        }
    });

    let context = AppContext {
        state: state.clone(),
        config: config.clone(),
        rate_limiter,
    };

    let app: Router = create_api_router(context);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", addr, e))?;

    tracing::info!("ParkEase engine running on http://{}", addr);
    tracing::info!(
        "Penalty: {} per {} min, cap {} intervals; suspension after {}h unpaid",
        config.billing.penalty_per_interval,
        config.billing.penalty_interval_minutes,
        config.billing.penalty_max_intervals,
        config.billing.suspension_after_hours
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await
    .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    Ok(())
}
