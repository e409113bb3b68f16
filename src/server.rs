use anyhow::{Context, Result};
use axum::{
    extract::{ConnectInfo, Request},
    middleware::{self, Next},
    response::Response,
    routing::{delete, get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::routes;
use crate::state::AppState;

/// Asset requests the request logger ignores
const ASSET_EXTENSIONS: &[&str] = &[
    ".css", ".js", ".png", ".jpg", ".jpeg", ".ico", ".svg", ".woff", ".ttf", ".map",
];

pub fn is_asset_path(path: &str) -> bool {
    let path = path.to_lowercase();
    ASSET_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

/// Log route, method and client address of every non-asset request
async fn log_request(request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    if !is_asset_path(&path) {
        let (ip, port) = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| (addr.ip().to_string(), addr.port().to_string()))
            .unwrap_or_else(|| ("unknown".to_string(), "unknown".to_string()));
        info!(
            "Route: {} | Method: {} | IP: {} | Port: {}",
            path,
            request.method(),
            ip,
            port
        );
    }
    next.run(request).await
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let static_files = ServeDir::new(&state.config.static_dir);

    Router::new()
        // Identity
        .route("/signup", post(routes::signup))
        .route("/login", post(routes::login))
        .route("/logout", post(routes::logout))
        .route("/current-user", get(routes::current_user))
        // Translation
        .route("/translate", post(routes::translate))
        // History & saved
        .route("/save-translation", post(routes::save_translation))
        .route("/save-to-saved", post(routes::save_to_saved))
        .route("/history", get(routes::get_history))
        .route("/saved-translations", get(routes::get_saved))
        .route("/delete-history-item", delete(routes::delete_history_item))
        .route("/delete-saved-item", delete(routes::delete_saved_item))
        .route("/delete-history", delete(routes::delete_history))
        .route("/delete-saved", delete(routes::delete_saved))
        .route("/health", get(routes::health))
        // Pages
        .route("/", get(routes::login_page))
        .route("/home", get(routes::home_page))
        .route("/index.html", get(routes::forbidden_page))
        .route("/login.html", get(routes::forbidden_page))
        .fallback_service(static_files)
        .layer(middleware::from_fn(log_request))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve on an already bound listener until a shutdown signal arrives
pub async fn serve(listener: TcpListener, state: Arc<AppState>) -> Result<()> {
    let app = build_router(state);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    info!("Server shut down");
    Ok(())
}

pub async fn run(state: Arc<AppState>) -> Result<()> {
    let address = format!("0.0.0.0:{}", state.config.port);
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind to {}", address))?;
    info!("Server running at http://localhost:{}", state.config.port);

    serve(listener, state).await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
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
}
