//! JSON-RPC protocol handling and the pyramid tools.

use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use payroll_client::{
    load_pyramid, ClientConfig, ClientError, DemographicFilters, HttpPayrollSource, LoadResult,
    PayrollSource, PyramidOptions, PyramidSession,
};
use payroll_pyramid::api::{parse_curp_inner, pyramid_inner, PyramidRequest};
use payroll_pyramid::{PyramidConfig, PyramidResults, PyramidVariant, RowOrder, ScaleConfig};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

#[derive(Deserialize, Debug, Clone)]
pub struct JsonRpcRequest {
    #[allow(dead_code)]
    pub jsonrpc: String,
    pub method: String,
    pub params: Option<Value>,
    pub id: Option<Value>,
}

#[derive(Serialize, Debug)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
}

#[derive(Deserialize)]
struct CurpParams {
    ids: Vec<String>,
    reference_date: Option<NaiveDate>,
}

#[derive(Deserialize)]
struct FetchParams {
    #[serde(default)]
    filters: DemographicFilters,
    #[serde(default)]
    variant: Option<PyramidVariant>,
    #[serde(default = "default_true")]
    use_latest_period: bool,
    min_age: Option<i32>,
    max_age: Option<i32>,
    target_max_width: Option<f64>,
    min_scale_factor: Option<f64>,
    order: Option<RowOrder>,
    reference_date: Option<NaiveDate>,
}

fn default_true() -> bool {
    true
}

impl FetchParams {
    fn options(&self) -> PyramidOptions {
        let defaults = PyramidConfig::default();
        let scale_defaults = ScaleConfig::default();
        PyramidOptions {
            variant: self.variant.unwrap_or_default(),
            config: PyramidConfig {
                min_age: self.min_age.unwrap_or(defaults.min_age),
                max_age: self.max_age.unwrap_or(defaults.max_age),
                scale: ScaleConfig {
                    target_max_width: self
                        .target_max_width
                        .unwrap_or(scale_defaults.target_max_width),
                    min_scale_factor: self
                        .min_scale_factor
                        .unwrap_or(scale_defaults.min_scale_factor),
                },
                order: self.order.unwrap_or(defaults.order),
            },
            use_latest_period: self.use_latest_period,
            reference_date: self.reference_date,
        }
    }
}

/// Key used for the single client of a stdio server.
pub const STDIO_CLIENT: &str = "stdio";

/// Shared server state. Each client gets its own pyramid session, so a slow
/// `fetch_pyramid` call never overwrites that client's newer answer while
/// other clients load independently.
pub struct ToolContext {
    client_config: ClientConfig,
    source: Arc<dyn PayrollSource>,
    sessions: Mutex<HashMap<String, PyramidSession<PyramidResults>>>,
}

impl ToolContext {
    pub fn new(client_config: ClientConfig) -> Result<Self, ClientError> {
        let source = HttpPayrollSource::new(&client_config)?;
        Ok(Self::with_source(client_config, Arc::new(source)))
    }

    pub fn with_source(client_config: ClientConfig, source: Arc<dyn PayrollSource>) -> Self {
        Self {
            client_config,
            source,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Drops the pyramid session of a disconnected client.
    pub async fn forget_client(&self, client: &str) {
        self.sessions.lock().await.remove(client);
    }
}

pub async fn handle_protocol(
    ctx: &ToolContext,
    client: &str,
    req: JsonRpcRequest,
) -> Option<JsonRpcResponse> {
    let is_notification = req.id.is_none();

    let result = match req.method.as_str() {
        "initialize" => Ok(json!({
            "protocolVersion": "2024-11-05",
            "capabilities": {
                "tools": { "listChanged": false }
            },
            "serverInfo": {
                "name": "pyramid-mcp",
                "version": env!("CARGO_PKG_VERSION")
            }
        })),
        "notifications/initialized" => {
            info!("Client confirmed initialization.");
            return None;
        }
        "tools/list" => Ok(tool_list()),
        "tools/call" => handle_tool_call(ctx, client, req.params).await,
        _ => Err(anyhow!("Method not found: {}", req.method)),
    };

    if is_notification {
        if let Err(e) = result {
            error!("Error handling notification: {}", e);
        }
        return None;
    }

    Some(match result {
        Ok(v) => JsonRpcResponse {
            jsonrpc: "2.0".to_string(),
            result: Some(v),
            error: None,
            id: req.id,
        },
        Err(e) => JsonRpcResponse {
            jsonrpc: "2.0".to_string(),
            result: None,
            error: Some(json!({
                "code": -32603,
                "message": e.to_string()
            })),
            id: req.id,
        },
    })
}

fn pyramid_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "records": { "type": "array", "items": { "type": "object" } },
            "csv_content": { "type": "string" },
            "json_content": { "type": "string" },
            "min_age": { "type": "integer" },
            "max_age": { "type": "integer" },
            "target_max_width": { "type": "number" },
            "min_scale_factor": { "type": "number" },
            "order": { "type": "string", "enum": ["ascending", "descending"] },
            "reference_date": { "type": "string", "format": "date" }
        }
    })
}

fn tool_list() -> Value {
    json!({
        "tools": [
            {
                "name": "population_pyramid",
                "description": "Build an age/gender population pyramid from payroll rows, counting each person once.",
                "inputSchema": pyramid_schema()
            },
            {
                "name": "salary_age_pyramid",
                "description": "Build an age/gender pyramid with each bar split by salary band.",
                "inputSchema": pyramid_schema()
            },
            {
                "name": "parse_curp",
                "description": "Decode age, gender and birth date from national IDs.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "ids": { "type": "array", "items": { "type": "string" } },
                        "reference_date": { "type": "string", "format": "date" }
                    },
                    "required": ["ids"]
                }
            },
            {
                "name": "fetch_pyramid",
                "description": "Load payroll rows page by page from the payroll API and build a pyramid.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "filters": {
                            "type": "object",
                            "properties": {
                                "search": { "type": "string" },
                                "sucursales": { "type": "array", "items": { "type": "string" } },
                                "puestos": { "type": "array", "items": { "type": "string" } },
                                "puestosCategorias": { "type": "array", "items": { "type": "string" } },
                                "status": { "type": "array", "items": { "type": "string" } },
                                "period": { "type": "string" }
                            }
                        },
                        "variant": { "type": "string", "enum": ["population", "salary_age"] },
                        "use_latest_period": { "type": "boolean" },
                        "min_age": { "type": "integer" },
                        "max_age": { "type": "integer" },
                        "target_max_width": { "type": "number" },
                        "min_scale_factor": { "type": "number" },
                        "order": { "type": "string", "enum": ["ascending", "descending"] },
                        "reference_date": { "type": "string", "format": "date" }
                    }
                }
            }
        ]
    })
}

fn text_content<T: Serialize>(value: &T) -> Result<Value> {
    Ok(json!({ "content": [{ "type": "text", "text": serde_json::to_string(value)? }] }))
}

async fn handle_tool_call(ctx: &ToolContext, client: &str, params: Option<Value>) -> Result<Value> {
    let params = params.ok_or_else(|| anyhow!("Missing params"))?;
    let name = params
        .get("name")
        .and_then(|v| v.as_str())
        .ok_or_else(|| anyhow!("Missing tool name"))?;
    let arguments = params
        .get("arguments")
        .cloned()
        .ok_or_else(|| anyhow!("Missing arguments"))?;

    match name {
        "population_pyramid" | "salary_age_pyramid" => {
            let variant = if name == "population_pyramid" {
                PyramidVariant::Population
            } else {
                PyramidVariant::SalaryAge
            };
            let req: PyramidRequest = serde_json::from_value(arguments)?;
            let res = pyramid_inner(req, variant).map_err(|e| anyhow!(e))?;
            text_content(&res)
        }
        "parse_curp" => {
            let p: CurpParams = serde_json::from_value(arguments)?;
            let res = p
                .ids
                .iter()
                .map(|id| parse_curp_inner(id, p.reference_date))
                .collect::<Vec<_>>();
            text_content(&res)
        }
        "fetch_pyramid" => {
            let p: FetchParams = serde_json::from_value(arguments)?;
            fetch_pyramid(ctx, client, p).await
        }
        _ => Err(anyhow!("Unknown tool: {}", name)),
    }
}

async fn fetch_pyramid(ctx: &ToolContext, client: &str, p: FetchParams) -> Result<Value> {
    let options = p.options();
    options.config.validate()?;

    let token = {
        let mut sessions = ctx.sessions.lock().await;
        let session = sessions
            .entry(client.to_string())
            .or_insert_with(|| PyramidSession::new(DemographicFilters::default()));
        match session.set_filters(p.filters.clone()) {
            Some(token) => token,
            None => session.reload(),
        }
    };

    let result = load_pyramid(
        ctx.source.as_ref(),
        &p.filters,
        &ctx.client_config,
        &options,
    )
    .await;
    let failure = match &result {
        LoadResult::Failed(e) => Some(e.clone()),
        _ => None,
    };

    let mut sessions = ctx.sessions.lock().await;
    let session = sessions
        .get_mut(client)
        .ok_or_else(|| anyhow!("Client session closed during fetch_pyramid"))?;
    if !session.complete(token, result) {
        warn!(client, token = token.value(), "fetch_pyramid result superseded");
        return Err(anyhow!("Superseded by a newer fetch_pyramid call"));
    }
    if let Some(e) = failure {
        return Err(anyhow!("Failed to load payroll data: {}", e));
    }
    let results = session
        .current()
        .ok_or_else(|| anyhow!("No pyramid loaded"))?;
    Ok(json!({
        "content": [{ "type": "text", "text": serde_json::to_string(results)? }],
        "warning": session.error()
    }))
}
