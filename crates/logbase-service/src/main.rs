use logbase_service::{
    AppState, DefaultAppState,
    collector::spawn_daily_collection,
    config::Config,
    db,
    routes::create_router,
    shutdown::{GracefulShutdownLayer, ShutdownState},
};
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("logbase_service=debug,tower_http=info")),
        )
        .init();

    let config = Config::from_env().unwrap_or_else(|err| {
        error!(error = %err, "Invalid configuration");
        std::process::exit(1);
    });

    let connection = db::establish_connection(&config.database_url).unwrap_or_else(|err| {
        error!(database_url = %config.database_url, error = %err, "Failed to open database");
        std::process::exit(1);
    });
    info!(database_url = %config.database_url, "Connected to database");

    if config.admin_token.is_none() {
        warn!("ADMIN_TOKEN is not set: admin routes are open to anyone");
    }
    if config.newsletter_test_mode {
        warn!(
            recipients = config.newsletter_test_recipients.len(),
            "Newsletter test mode is on: campaigns only go to test recipients"
        );
    }

    let bind_addr = config.bind_addr.clone();
    let request_timeout = config.request_timeout;

    let app_state = DefaultAppState::new(db::shared(connection), config).unwrap_or_else(|err| {
        error!(error = %err, "Failed to build HTTP client");
        std::process::exit(1);
    });
    let shutdown_state = ShutdownState::new();

    let scheduler = app_state
        .config()
        .collect
        .scheduled
        .then(|| spawn_daily_collection(app_state.clone(), shutdown_state.clone()));

    let app = create_router()
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(GracefulShutdownLayer::new(shutdown_state.clone()))
                .layer(TimeoutLayer::new(request_timeout)),
        )
        .with_state(app_state);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|err| {
            error!(bind_address = %bind_addr, error = %err, "Failed to bind to address");
            std::process::exit(1);
        });

    info!(bind_address = %bind_addr, "Server running");

    let server =
        axum::serve(listener, app).with_graceful_shutdown(shutdown_signal(shutdown_state));

    if let Err(err) = server.await {
        error!(error = %err, "Server error");
        std::process::exit(1);
    }

    if let Some(scheduler) = scheduler {
        if let Err(err) = scheduler.await {
            error!(error = %err, "Collection scheduler task failed");
        }
    }
}

async fn shutdown_signal(shutdown_state: ShutdownState) {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(error = %err, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                error!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown");
    let shutdown_completed = shutdown_state.completed();
    shutdown_state.start_shutdown();

    shutdown_completed.await;
    info!("Graceful shutdown completed - all requests finished");
}
