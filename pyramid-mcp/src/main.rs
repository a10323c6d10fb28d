mod tools;

use anyhow::Result;
use axum::{
    extract::{Json, State},
    http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
    routing::post,
    Router,
};
use clap::Parser;
use futures::stream::{self, StreamExt};
use governor::{Quota, RateLimiter};
use payroll_client::ClientConfig;
use std::collections::HashMap;
use std::io::Write;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{self, AsyncBufReadExt, BufReader};
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tools::{handle_protocol, JsonRpcRequest, ToolContext, STDIO_CLIENT};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};
use uuid::Uuid;

const SESSION_HEADER: &str = "mcp-session-id";
/// HTTP sessions idle for longer than this are dropped.
const SESSION_IDLE_TTL: Duration = Duration::from_secs(30 * 60);
const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Port to listen on (if not set, runs in stdio mode)
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,

    /// Transport mode: stdio (default) or sse
    #[arg(long, env = "MCP_TRANSPORT")]
    transport: Option<String>,

    /// API Key for HTTP authentication
    #[arg(long, env = "MCP_API_KEY")]
    api_key: Option<String>,

    /// Rate limit (requests per minute) for stdio mode
    #[arg(long, default_value = "60")]
    rate_limit: u32,

    /// Payroll API base URL used by fetch_pyramid
    #[arg(long, env = "PAYROLL_API_URL")]
    payroll_api_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();

    let mut client_config = ClientConfig::from_env();
    if let Some(url) = args.payroll_api_url {
        client_config = client_config.with_base_url(url);
    }
    client_config.validate()?;
    info!(base_url = %client_config.base_url, "payroll API configured");
    let ctx = Arc::new(ToolContext::new(client_config)?);

    let is_sse = args.transport.as_deref() == Some("sse") || args.port.is_some();
    if is_sse {
        let port = args.port.unwrap_or(8084);
        info!("Starting pyramid MCP server in HTTP/SSE mode on port {}", port);
        run_sse_server(ctx, port, args.api_key).await?;
    } else {
        info!("Starting pyramid MCP server in stdio mode");
        run_stdio_server(ctx, args.rate_limit).await?;
    }

    Ok(())
}

async fn run_stdio_server(ctx: Arc<ToolContext>, rate_limit_per_min: u32) -> Result<()> {
    let stdin = io::stdin();
    let mut reader = BufReader::new(stdin).lines();

    let quota = Quota::per_minute(NonZeroU32::new(rate_limit_per_min).unwrap_or(NonZeroU32::MIN));
    let limiter = RateLimiter::direct(quota);

    while let Some(line) = reader.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        if limiter.check().is_err() {
            limiter.until_ready().await;
        }

        let req: JsonRpcRequest = match serde_json::from_str(&line) {
            Ok(r) => r,
            Err(e) => {
                error!("Failed to parse request: {}", e);
                continue;
            }
        };

        if let Some(response) = handle_protocol(&ctx, STDIO_CLIENT, req).await {
            let response_json = serde_json::to_string(&response)?;
            println!("{}", response_json);
            std::io::stdout().flush()?;
        }
    }
    Ok(())
}

// --- SSE Mode ---

struct Session {
    created_at: Instant,
    last_seen: Instant,
}

/// Removes sessions idle since before `now - ttl` and returns their ids.
fn prune_idle(sessions: &mut HashMap<String, Session>, now: Instant, ttl: Duration) -> Vec<String> {
    let expired: Vec<String> = sessions
        .iter()
        .filter(|(_, s)| now.saturating_duration_since(s.last_seen) > ttl)
        .map(|(id, _)| id.clone())
        .collect();
    for id in &expired {
        sessions.remove(id);
    }
    expired
}

async fn sweep_idle_sessions(state: Arc<AppState>) {
    let mut interval = tokio::time::interval(SESSION_SWEEP_INTERVAL);
    loop {
        interval.tick().await;
        let expired = prune_idle(&mut *state.sessions.write().await, Instant::now(), SESSION_IDLE_TTL);
        for id in &expired {
            state.tools.forget_client(id).await;
        }
        if !expired.is_empty() {
            info!(expired = expired.len(), "dropped idle sessions");
        }
    }
}

struct AppState {
    sessions: RwLock<HashMap<String, Session>>,
    api_key: Option<String>,
    tools: Arc<ToolContext>,
}

async fn run_sse_server(tools: Arc<ToolContext>, port: u16, api_key: Option<String>) -> Result<()> {
    let state = Arc::new(AppState {
        sessions: RwLock::new(HashMap::new()),
        api_key,
        tools,
    });
    tokio::spawn(sweep_idle_sessions(state.clone()));

    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers(tower_http::cors::Any)
        .expose_headers([HeaderName::from_static(SESSION_HEADER)]);

    let app = Router::new()
        .route(
            "/sse",
            post(handle_sse_post)
                .get(handle_sse_get)
                .delete(handle_sse_delete),
        )
        .route("/messages", post(handle_sse_post))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn is_authorized(api_key: Option<&str>, headers: &HeaderMap) -> bool {
    let Some(key) = api_key else {
        return true;
    };
    headers
        .get("x-api-key")
        .or_else(|| headers.get("authorization"))
        .and_then(|h| h.to_str().ok())
        .is_some_and(|h| h == key || h.strip_prefix("Bearer ") == Some(key))
}

async fn handle_sse_post(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<JsonRpcRequest>,
) -> impl IntoResponse {
    if !is_authorized(state.api_key.as_deref(), &headers) {
        return (StatusCode::UNAUTHORIZED, "Invalid API Key").into_response();
    }

    let is_initialize = req.method == "initialize";
    let is_notification = req.id.is_none();

    let session_id = if is_initialize {
        let new_id = Uuid::new_v4().to_string();
        let now = Instant::now();
        state.sessions.write().await.insert(
            new_id.clone(),
            Session {
                created_at: now,
                last_seen: now,
            },
        );
        Some(new_id)
    } else {
        match headers.get(SESSION_HEADER).and_then(|h| h.to_str().ok()) {
            Some(id) => {
                let mut sessions = state.sessions.write().await;
                sessions.get_mut(id).map(|session| {
                    session.last_seen = Instant::now();
                    debug!(session = id, age_secs = session.created_at.elapsed().as_secs(), "session request");
                    id.to_string()
                })
            }
            None => None,
        }
    };

    if !is_initialize && session_id.is_none() {
        return (
            StatusCode::UNAUTHORIZED,
            "Missing or invalid Mcp-Session-Id header",
        )
            .into_response();
    }

    let client = session_id.clone().unwrap_or_default();
    let response = handle_protocol(&state.tools, &client, req).await;

    if is_notification {
        return StatusCode::ACCEPTED.into_response();
    }

    match response {
        Some(resp) => {
            let mut response = Json(resp).into_response();
            if let Some(value) = session_id.and_then(|sid| HeaderValue::from_str(&sid).ok()) {
                response
                    .headers_mut()
                    .insert(HeaderName::from_static(SESSION_HEADER), value);
            }
            response
        }
        None => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

async fn handle_sse_get(headers: HeaderMap) -> impl IntoResponse {
    if headers.get(SESSION_HEADER).is_some() {
        return StatusCode::METHOD_NOT_ALLOWED.into_response();
    }

    let host = headers
        .get("host")
        .and_then(|h| h.to_str().ok())
        .unwrap_or("localhost");
    let endpoint_event = Event::default()
        .event("endpoint")
        .data(format!("http://{}/sse?sessionId={}", host, Uuid::new_v4()));

    let pending = stream::pending::<Result<Event, std::convert::Infallible>>();
    let stream = stream::once(async { Ok(endpoint_event) }).chain(pending);

    Sse::new(stream)
        .keep_alive(KeepAlive::default())
        .into_response()
}

async fn handle_sse_delete(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    if let Some(id) = headers.get(SESSION_HEADER).and_then(|h| h.to_str().ok()) {
        if state.sessions.write().await.remove(id).is_some() {
            state.tools.forget_client(id).await;
            return StatusCode::OK.into_response();
        }
    }
    StatusCode::NOT_FOUND.into_response()
}
