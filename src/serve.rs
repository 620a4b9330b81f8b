use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::Config;
use crate::dashboard::Dashboard;
use crate::export::SpacesResponse;
use crate::fetch::Sources;

struct ServeState {
    config: Config,
    sources: Sources,
}

/// Serve the dashboard as JSON until Ctrl-C
pub async fn run(config: Config, port: u16) -> Result<()> {
    let sources = Sources::from_config(&config);
    let state = Arc::new(ServeState { config, sources });

    let app = router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!(%addr, "stop serve listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("HTTP server failed")
}

fn router(state: Arc<ServeState>) -> Router {
    Router::new()
        .route("/spaces", get(spaces))
        .route("/health", get(|| async { "ok" }))
        .with_state(state)
}

async fn spaces(State(state): State<Arc<ServeState>>) -> Response {
    let snapshot = match state.sources.fetch_all().await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            warn!(error = %e, "fetch failed");
            return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
        }
    };

    let dashboard = Dashboard::build(snapshot, &state.config);
    let body = SpacesResponse::build(&dashboard, &state.config, Utc::now());
    (
        [(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")],
        Json(body),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    async fn get_raw(addr: SocketAddr, path: &str) -> String {
        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        let request = format!("GET {} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n", path);
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        response
    }

    async fn spawn_server() -> SocketAddr {
        let config = Config {
            yabai_path: "/nonexistent/yabai".to_string(),
            tmux_path: "/nonexistent/tmux".to_string(),
            ps_path: "/nonexistent/ps".to_string(),
            ..Config::default()
        };
        let sources = Sources::from_config(&config);
        let app = router(Arc::new(ServeState { config, sources }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        addr
    }

    #[tokio::test]
    async fn health_is_ok() {
        let addr = spawn_server().await;
        let response = get_raw(addr, "/health").await;
        assert!(response.starts_with("HTTP/1.1 200"), "{response}");
        assert!(response.ends_with("ok"));
    }

    #[tokio::test]
    async fn spaces_without_yabai_is_server_error() {
        let addr = spawn_server().await;
        let response = get_raw(addr, "/spaces").await;
        assert!(response.starts_with("HTTP/1.1 500"), "{response}");
        assert!(response.contains("not found"));
    }
}
