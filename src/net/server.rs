//! HTTP server that generates test images on demand.
//!
//! Routes:
//! - `GET /`                 plain-text endpoint listing
//! - `GET /image/{w}/{h}`    JPEG of the given dimensions
//! - `GET /image/{n}kb`      JPEG of roughly n KB
//! - `GET /stats`            JSON summary of recent transfers
//! - `GET /clear-stats`      empty the transfer log
//!
//! Encoding is CPU-bound and runs on the blocking pool; the transfer log is
//! the only state shared between requests.

use std::convert::Infallible;
use std::future::Future;
use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;

use hyper::header::{HeaderValue, CONTENT_DISPOSITION, CONTENT_TYPE, USER_AGENT};
use hyper::server::conn::AddrStream;
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Method, Request, Response, Server, StatusCode};
use serde::Serialize;
use serde_json::json;

use crate::config::types::AppConfig;
use crate::error::SpeedError;
use crate::payload::encoder::{EncodedPayload, PayloadEncoder};
use crate::payload::PayloadSpec;
use crate::transfer::log::TransferRecorder;
use crate::transfer::stats::{summarize, StatsReport};
use crate::transfer::{ClientInfo, TransferObservation};

const UNKNOWN_AGENT: &str = "Unknown";

/// State shared by all connections.
pub struct AppState {
    pub recorder: TransferRecorder,
    pub encoder: PayloadEncoder,
    pub recent_window: usize,
}

impl AppState {
    pub fn new(config: &AppConfig) -> Self {
        let recorder = TransferRecorder::new(config.server.history_capacity);
        tracing::debug!(capacity = recorder.capacity(), "Transfer log ready");
        Self {
            recorder,
            encoder: PayloadEncoder::new(config.encoder.clone()),
            recent_window: config.server.recent_window,
        }
    }

    /// Generate a payload and log it. Nothing is logged when generation fails.
    pub fn generate_and_record(
        &self,
        spec: &PayloadSpec,
        client: ClientInfo,
    ) -> Result<EncodedPayload, SpeedError> {
        let payload = self.encoder.generate(spec)?;
        let observation =
            TransferObservation::new(spec, payload.size(), client, payload.elapsed_ms);
        let seq = self.recorder.append(observation);
        tracing::debug!(
            seq,
            size = payload.size(),
            entries = self.recorder.len(),
            "Transfer recorded"
        );
        Ok(payload)
    }

    pub fn stats(&self) -> StatsReport {
        summarize(&self.recorder.snapshot(), self.recent_window)
    }

    pub fn clear_stats(&self) {
        self.recorder.clear();
        tracing::info!("Stats cleared");
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    Index,
    Image(PayloadSpec),
    Stats,
    ClearStats,
    NotFound,
}

fn parse_route(path: &str) -> Route {
    let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();
    match segments.as_slice() {
        [""] => Route::Index,
        ["stats"] => Route::Stats,
        ["clear-stats"] => Route::ClearStats,
        ["image", width, height] => match (parse_number(width), parse_number(height)) {
            (Some(width), Some(height)) => Route::Image(PayloadSpec::Dimensions { width, height }),
            _ => Route::NotFound,
        },
        ["image", sized] => sized
            .strip_suffix("kb")
            .and_then(parse_number)
            .map(|target_kb| Route::Image(PayloadSpec::TargetSize { target_kb }))
            .unwrap_or(Route::NotFound),
        _ => Route::NotFound,
    }
}

/// Plain ASCII digits only; signs and overflow do not route.
fn parse_number(segment: &str) -> Option<u32> {
    if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    segment.parse().ok()
}

/// Bind the listening socket.
pub fn bind(host: &str, port: u16) -> Result<TcpListener, SpeedError> {
    let addr = format!("{}:{}", host, port);
    TcpListener::bind(&addr).map_err(|e| SpeedError::Bind {
        addr,
        reason: e.to_string(),
    })
}

/// Serve requests on `listener` until `shutdown` resolves.
pub async fn serve<F>(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: F,
) -> Result<(), SpeedError>
where
    F: Future<Output = ()>,
{
    listener.set_nonblocking(true)?;
    let local_addr = listener.local_addr()?;

    let make_svc = make_service_fn(move |conn: &AddrStream| {
        let remote = conn.remote_addr();
        let state = Arc::clone(&state);
        async move {
            Ok::<_, Infallible>(service_fn(move |req| handle(req, remote, Arc::clone(&state))))
        }
    });

    let server = Server::from_tcp(listener)
        .map_err(|e| SpeedError::Server(format!("Failed to start server: {}", e)))?
        .serve(make_svc);

    tracing::info!(addr = %local_addr, "Listening");
    server
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| SpeedError::Server(e.to_string()))
}

/// Run the server on the current thread until Ctrl-C.
///
/// Creates a local tokio runtime and blocks on the accept loop.
pub fn run_server_sync(host: &str, port: u16, config: &AppConfig) -> Result<(), SpeedError> {
    let listener = bind(host, port)?;
    let state = Arc::new(AppState::new(config));

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| SpeedError::Server(format!("Failed to create async runtime: {}", e)))?;

    rt.block_on(serve(listener, state, async {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown requested");
        }
    }))
}

async fn handle(
    req: Request<Body>,
    remote: SocketAddr,
    state: Arc<AppState>,
) -> Result<Response<Body>, Infallible> {
    let path = req.uri().path().to_string();
    let method = req.method().clone();

    let response = if method != Method::GET {
        json_response(
            StatusCode::METHOD_NOT_ALLOWED,
            &json!({ "error": "method not allowed" }),
        )
    } else {
        match parse_route(&path) {
            Route::Index => text_response(index_text()),
            Route::Image(spec) => {
                let client = client_info(&req, remote);
                serve_image(&state, spec, client).await
            }
            Route::Stats => json_response(StatusCode::OK, &state.stats()),
            Route::ClearStats => {
                state.clear_stats();
                json_response(StatusCode::OK, &json!({ "message": "Stats cleared" }))
            }
            Route::NotFound => {
                json_response(StatusCode::NOT_FOUND, &json!({ "error": "not found" }))
            }
        }
    };

    tracing::debug!(
        %method,
        path = %path,
        %remote,
        status = response.status().as_u16(),
        "Request handled"
    );
    Ok(response)
}

async fn serve_image(state: &Arc<AppState>, spec: PayloadSpec, client: ClientInfo) -> Response<Body> {
    let worker = Arc::clone(state);
    let job = tokio::task::spawn_blocking(move || worker.generate_and_record(&spec, client));

    match job.await {
        Ok(Ok(payload)) => image_response(&spec, payload),
        Ok(Err(err)) => {
            if err.is_client_fault() {
                tracing::debug!(%err, "Rejected image request");
            } else {
                tracing::error!(%err, "Image generation failed");
            }
            error_response(&err)
        }
        Err(join_err) => {
            tracing::error!(error = %join_err, "Image worker panicked");
            json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &json!({ "error": "image generation failed" }),
            )
        }
    }
}

fn client_info(req: &Request<Body>, remote: SocketAddr) -> ClientInfo {
    let forwarded = req
        .headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(String::from);

    let user_agent = req
        .headers()
        .get(USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .unwrap_or(UNKNOWN_AGENT)
        .to_string();

    ClientInfo {
        ip: forwarded.or_else(|| Some(remote.ip().to_string())),
        user_agent: Some(user_agent),
    }
}

fn index_text() -> String {
    [
        "Image Speed Test Server",
        "",
        "Endpoints:",
        "  /image/{width}/{height}  JPEG with the given dimensions (e.g. /image/1920/1080)",
        "  /image/{size}kb          JPEG of roughly the given size (e.g. /image/100kb)",
        "  /stats                   statistics for recent requests",
        "  /clear-stats             reset statistics",
        "",
    ]
    .join("\n")
}

fn image_response(spec: &PayloadSpec, payload: EncodedPayload) -> Response<Body> {
    let disposition = format!("inline; filename=\"{}\"", spec.file_name());
    let mut response = with_status(StatusCode::OK, Body::from(payload.bytes));
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("image/jpeg"));
    if let Ok(value) = HeaderValue::from_str(&disposition) {
        headers.insert(CONTENT_DISPOSITION, value);
    }
    response
}

fn error_response(err: &SpeedError) -> Response<Body> {
    let status = if err.is_client_fault() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    json_response(status, &json!({ "error": err.to_string() }))
}

fn json_response<T: Serialize + ?Sized>(status: StatusCode, value: &T) -> Response<Body> {
    match serde_json::to_vec(value) {
        Ok(body) => {
            let mut response = with_status(status, Body::from(body));
            response
                .headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            response
        }
        Err(err) => {
            tracing::error!(%err, "Failed to serialize response");
            with_status(StatusCode::INTERNAL_SERVER_ERROR, Body::empty())
        }
    }
}

fn text_response(text: String) -> Response<Body> {
    let mut response = with_status(StatusCode::OK, Body::from(text));
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}

fn with_status(status: StatusCode, body: Body) -> Response<Body> {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    response
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::config::types::EncoderConfig;

    /// State with a small default canvas so target-size requests stay cheap.
    pub(crate) fn test_state() -> Arc<AppState> {
        let mut config = AppConfig::default();
        config.encoder = EncoderConfig {
            default_width: 320,
            default_height: 240,
            ..EncoderConfig::default()
        };
        Arc::new(AppState::new(&config))
    }

    /// Run a server on an ephemeral loopback port in a background thread.
    pub(crate) fn spawn_server(state: Arc<AppState>) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            let runtime = tokio::runtime::Runtime::new().unwrap();
            runtime
                .block_on(serve(listener, state, std::future::pending::<()>()))
                .unwrap();
        });
        addr
    }
}
