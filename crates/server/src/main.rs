//! Civic Connect server entry point.

use std::{net::SocketAddr, sync::Arc};

use civic_api::{AppState, app};
use civic_common::{Config, LocalStorage};
use civic_core::{
    AnalyticsService, AuthService, ExportService, HelperService, ReportService, SessionKeys,
    UploadService,
};
use civic_db::repositories::{ComplaintHelperRepository, ComplaintRepository, UserRepository};
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Waits for a shutdown signal (SIGINT or SIGTERM).
///
/// On Unix systems, this listens for both SIGINT (Ctrl+C) and SIGTERM.
/// On Windows, this only listens for Ctrl+C.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "civic=debug,tower_http=debug".into()),
        )
        .init();

    info!("Starting civic-connect server...");

    let config = Config::load()?;
    let session_keys = SessionKeys::from_config(&config.auth)?;

    // Connect to database
    let db = Arc::new(civic_db::init(&config).await?);
    info!("Connected to database");

    info!("Running database migrations...");
    civic_db::migrate(&db).await?;
    info!("Migrations completed");

    // Initialize repositories
    let user_repo = UserRepository::new(Arc::clone(&db));
    let complaint_repo = ComplaintRepository::new(Arc::clone(&db));
    let helper_repo = ComplaintHelperRepository::new(Arc::clone(&db));

    let storage = Arc::new(LocalStorage::new(
        config.storage.base_path.clone(),
        config.storage.base_url.clone(),
    ));

    // Initialize services
    if config.auth.plaintext_admin_passwords {
        warn!(
            "ADMIN passwords are compared as stored plaintext; \
             set auth.plaintext_admin_passwords = false once admin credentials are hashed"
        );
    }
    let auth_service = AuthService::new(
        user_repo.clone(),
        complaint_repo.clone(),
        session_keys,
        config.auth.plaintext_admin_passwords,
    );

    if let Some(admin) = &config.bootstrap_admin
        && let Some(created) = auth_service.bootstrap_admin(admin).await?
    {
        info!(user_id = %created.id, email = %created.email, "Bootstrapped admin account");
    }

    let state = AppState {
        auth_service,
        report_service: ReportService::new(
            complaint_repo.clone(),
            helper_repo.clone(),
            user_repo.clone(),
        ),
        helper_service: HelperService::new(
            helper_repo.clone(),
            complaint_repo.clone(),
            user_repo.clone(),
        ),
        analytics_service: AnalyticsService::new(
            complaint_repo.clone(),
            user_repo.clone(),
            helper_repo.clone(),
        ),
        export_service: ExportService::new(complaint_repo, user_repo, helper_repo),
        upload_service: UploadService::new(storage, config.storage.default_folder.clone()),
    };

    let mut router = app(state);

    // Serve uploaded images when the storage URL is a local path
    if config.storage.base_url.starts_with('/') {
        router = router.nest_service(
            &config.storage.base_url,
            ServeDir::new(&config.storage.base_path),
        );
    }

    let router = router.layer(TraceLayer::new_for_http()).layer(
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    );

    // Start server with graceful shutdown
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
