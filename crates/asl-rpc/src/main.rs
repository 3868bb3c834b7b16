use asl_codec::checksum::compute_sha256_hex;
use asl_codec::{
    canonicalize, preview, CryptoSettings, LicenseCodec, LicenseError, LicenseKeyGenerator,
    LicenseRecord,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::time::Duration;
use tracing::{debug, error, info, warn};
use tracing_subscriber::prelude::__tracing_subscriber_SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// --- Struct Definitions ---
#[derive(Deserialize, Serialize, Clone, Debug)]
struct RpcRequest {
    jsonrpc: String,
    #[serde(default)]
    id: Value,
    method: String,
    #[serde(default)]
    params: Value,
}

#[derive(Serialize, Debug)]
struct RpcResponse {
    jsonrpc: String,
    id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<RpcError>,
}

#[derive(Serialize, Debug)]
struct RpcError {
    code: i32,
    message: String,
}

#[derive(Deserialize, Debug)]
struct LicenseCreateParams {
    record: LicenseRecord,
}

#[derive(Deserialize, Debug)]
struct LicenseOpenParams {
    asl: String,
    #[serde(default)]
    enforce_expiry: bool,
    #[serde(default)]
    now: Option<DateTime<Utc>>,
}

#[derive(Deserialize, Debug)]
struct LicenseKeyGenerateParams {
    company_name: String,
    product_id: String,
    #[serde(default)]
    seed: Option<i64>,
}

#[derive(Deserialize, Debug)]
struct ChecksumParams {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    json: Option<Value>,
}
// --- Struct Definitions End ---

const INVALID_REQUEST: i32 = -32600;
const METHOD_NOT_FOUND: i32 = -32601;
const INVALID_PARAMS: i32 = -32602;
const PARSE_ERROR: i32 = -32700;
const SERVER_ERROR: i32 = -32000;

// --- Helper Functions ---
fn create_error_response(id: Value, code: i32, message: String) -> RpcResponse {
    error!("Responding with error: code={}, message={}", code, message);
    RpcResponse {
        jsonrpc: "2.0".to_string(),
        id,
        result: None,
        error: Some(RpcError { code, message }),
    }
}

fn create_success_response(id: Value, result: Value) -> RpcResponse {
    RpcResponse {
        jsonrpc: "2.0".to_string(),
        id,
        result: Some(result),
        error: None,
    }
}

fn license_error_response(id: Value, err: LicenseError) -> RpcResponse {
    create_error_response(id, SERVER_ERROR, err.to_string())
}

fn params<T: serde::de::DeserializeOwned>(id: &Value, method: &str, params: Value) -> Result<T, RpcResponse> {
    serde_json::from_value(params).map_err(|e| {
        create_error_response(id.clone(), INVALID_PARAMS, format!("Invalid params for {}: {}", method, e))
    })
}

async fn write_line<W: AsyncWrite + Unpin>(out: &mut W, line: &str) -> std::io::Result<()> {
    out.write_all(format!("{}\r\n", line).as_bytes()).await?;
    out.flush().await
}

fn serialize_response(response: &RpcResponse) -> String {
    serde_json::to_string(response).unwrap_or_else(|e| {
        error!("Failed to serialize response for ID {:?}: {}", response.id, e);
        r#"{"jsonrpc":"2.0","id":null,"error":{"code":-32000,"message":"Internal Server Error"}}"#
            .to_string()
    })
}
// --- Helper Functions End ---

type ResponseFuture = Pin<Box<dyn Future<Output = RpcResponse> + Send>>;

// --- Main Request Processor ---
fn process_request(req: RpcRequest, codec: Arc<Option<LicenseCodec>>) -> ResponseFuture {
    Box::pin(async move {
        debug!("Processing request: method={}", req.method);

        if req.jsonrpc != "2.0" {
            return create_error_response(
                req.id,
                INVALID_REQUEST,
                "Invalid Request: jsonrpc must be \"2.0\"".to_string(),
            );
        }

        match req.method.as_str() {
            "help" => {
                info!("Received help request");
                create_success_response(
                    req.id,
                    json!({
                        "message": "ASL license tool: create, open and inspect license files.",
                        "commands": {
                            "help": { "description": "Displays this help message." },
                            "license_create": { "description": "Creates a Base64 ASL from a license record; generates a license key when LicenseKey is empty.", "params": ["record"] },
                            "license_open": { "description": "Decrypts and verifies a Base64 ASL.", "params": ["asl", "enforce_expiry?", "now?"] },
                            "license_preview": { "description": "Shows the canonical JSON with checksum that would be encrypted.", "params": ["record"] },
                            "license_key_generate": { "description": "Generates a license key.", "params": ["company_name", "product_id", "seed?"] },
                            "checksum_sha256": { "description": "SHA-256 of text, or of the canonical form of a JSON value.", "params": ["text | json"] },
                            "crypto_generate": { "description": "Generates a random Base64 AES-256 key and IV." }
                        }
                    }),
                )
            }

            "license_create" => {
                info!("Received license_create request");
                let Some(codec) = &*codec else {
                    return license_error_response(req.id, LicenseError::OperationFailed);
                };
                let p: LicenseCreateParams = match params(&req.id, &req.method, req.params) {
                    Ok(p) => p,
                    Err(resp) => return resp,
                };
                match codec.create_with_generated_key(&p.record, &LicenseKeyGenerator::new()) {
                    Ok(issued) => {
                        info!("Created license file ({} Base64 chars)", issued.asl.len());
                        create_success_response(
                            req.id,
                            json!({ "asl": issued.asl, "license_key": issued.license_key }),
                        )
                    }
                    Err(e) => license_error_response(req.id, e),
                }
            }

            "license_open" => {
                info!("Received license_open request");
                let Some(codec) = &*codec else {
                    return license_error_response(req.id, LicenseError::InvalidLicenseFile);
                };
                let p: LicenseOpenParams = match params(&req.id, &req.method, req.params) {
                    Ok(p) => p,
                    Err(resp) => return resp,
                };
                let now = p.now.unwrap_or_else(Utc::now);
                let opened = if p.enforce_expiry {
                    codec.import(&p.asl, now)
                } else {
                    codec.open(&p.asl)
                };
                match opened {
                    Ok(opened) => create_success_response(
                        req.id,
                        json!({
                            "record": opened.record,
                            "verified": opened.verified,
                            "status": opened.record.status_at(now),
                        }),
                    ),
                    Err(e) => license_error_response(req.id, e),
                }
            }

            "license_preview" => {
                info!("Received license_preview request");
                let p: LicenseCreateParams = match params(&req.id, &req.method, req.params) {
                    Ok(p) => p,
                    Err(resp) => return resp,
                };
                match preview(&p.record) {
                    Ok(json) => create_success_response(req.id, json!({ "json": json })),
                    Err(e) => license_error_response(req.id, e),
                }
            }

            "license_key_generate" => {
                info!("Received license_key_generate request");
                let p: LicenseKeyGenerateParams = match params(&req.id, &req.method, req.params) {
                    Ok(p) => p,
                    Err(resp) => return resp,
                };
                match LicenseKeyGenerator::new().generate(&p.company_name, &p.product_id, p.seed) {
                    Ok(key) => create_success_response(req.id, json!({ "license_key": key })),
                    Err(e) => {
                        warn!("License key generation failed: {}", e);
                        license_error_response(req.id, LicenseError::OperationFailed)
                    }
                }
            }

            "checksum_sha256" => {
                let p: ChecksumParams = match params(&req.id, &req.method, req.params) {
                    Ok(p) => p,
                    Err(resp) => return resp,
                };
                let input = match (p.text, p.json) {
                    (Some(text), None) => text,
                    (None, Some(value)) => match canonicalize(&value) {
                        Ok(canonical) => canonical,
                        Err(e) => {
                            return create_error_response(req.id, INVALID_PARAMS, format!("Invalid json: {}", e))
                        }
                    },
                    _ => {
                        return create_error_response(
                            req.id,
                            INVALID_PARAMS,
                            "Exactly one of 'text' or 'json' is required".to_string(),
                        )
                    }
                };
                create_success_response(
                    req.id,
                    json!({ "checksum": compute_sha256_hex(input.as_bytes()) }),
                )
            }

            "crypto_generate" => {
                info!("Received crypto_generate request");
                let settings = CryptoSettings::generate();
                create_success_response(
                    req.id,
                    json!({
                        "key": settings.key().to_base64(),
                        "iv": settings.iv().to_base64(),
                    }),
                )
            }

            other => {
                warn!("Unknown method '{}'", other);
                create_error_response(req.id, METHOD_NOT_FOUND, format!("Method not found: {}", other))
            }
        }
    })
}

// --- Main Function ---
#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    info!("Starting ASL license tool on stdio...");

    let codec = match CryptoSettings::from_env() {
        Ok(settings) => Some(LicenseCodec::from_settings(&settings)),
        Err(e) => {
            warn!("License key material not loaded: {}", e);
            if let Some(hint) = e.suggestion() {
                warn!("{}", hint);
            }
            None
        }
    };
    let codec = Arc::new(codec);

    let stdin = tokio::io::stdin();
    let mut reader = BufReader::new(stdin);
    let mut stdout = tokio::io::stdout();
    let mut line_buffer = String::new();

    let ready_msg = json!({"jsonrpc": "2.0", "method": "server/ready", "params": {"status": "ready"}});
    if let Err(e) = write_line(&mut stdout, &ready_msg.to_string()).await {
        error!("Fatal: Failed to write ready message: {}", e);
        return;
    }

    info!("Listening on stdio for JSON-RPC messages...");

    loop {
        line_buffer.clear();
        match reader.read_line(&mut line_buffer).await {
            Ok(0) => {
                info!("Stdin closed (EOF). Exiting.");
                break;
            }
            Ok(_) => {
                let trimmed_line = line_buffer.trim();
                if trimmed_line.is_empty() || !trimmed_line.starts_with('{') {
                    if !trimmed_line.is_empty() {
                        warn!("Received non-JSON input line, ignoring.");
                    }
                    continue;
                }
                // Requests carry license data; log sizes only
                debug!("<<< Received line ({} bytes)", trimmed_line.len());

                let req: RpcRequest = match serde_json::from_str(trimmed_line) {
                    Ok(r) => r,
                    Err(e) => {
                        let id = serde_json::from_str::<Value>(trimmed_line)
                            .ok()
                            .and_then(|v| v.get("id").cloned())
                            .unwrap_or(Value::Null);
                        let resp = create_error_response(id, PARSE_ERROR, format!("Parse error: {}", e));
                        if let Err(io_e) = write_line(&mut stdout, &serialize_response(&resp)).await {
                            error!("Failed to write parse error response: {}", io_e);
                        }
                        continue;
                    }
                };

                if req.id.is_null() {
                    info!("Received notification '{}', no response sent.", req.method);
                    continue;
                }

                let request_id = req.id.clone();
                let request_method = req.method.clone();
                let response = match tokio::time::timeout(REQUEST_TIMEOUT, process_request(req, codec.clone())).await {
                    Ok(response) => response,
                    Err(_) => {
                        error!("Request timed out for method '{}'", request_method);
                        create_error_response(
                            request_id.clone(),
                            SERVER_ERROR,
                            format!("Request timed out for method '{}'", request_method),
                        )
                    }
                };

                if let Err(e) = write_line(&mut stdout, &serialize_response(&response)).await {
                    error!("Failed to write response for ID {:?}: {}", request_id, e);
                }
            }
            Err(e) => {
                error!("Error reading from stdin: {}. Exiting.", e);
                break;
            }
        }
    }
    info!("ASL license tool shutting down.");
}

#[cfg(test)]
mod tests {
    use super::*;
    use asl_codec::{AesIv, AesKey};

    fn codec() -> Arc<Option<LicenseCodec>> {
        Arc::new(Some(LicenseCodec::new(
            AesKey::from_slice(&[0x11; 32]).unwrap(),
            AesIv::from_slice(&[0x22; 16]).unwrap(),
        )))
    }

    fn request(method: &str, params: Value) -> RpcRequest {
        RpcRequest {
            jsonrpc: "2.0".to_string(),
            id: json!(1),
            method: method.to_string(),
            params,
        }
    }

    fn record_json() -> Value {
        json!({
            "CompanyName": "Acme Corp",
            "ProductID": "PROD-001",
            "DealerCode": "DEALER-001",
            "LicenseKey": "",
            "LicenseType": "Subscription",
            "ValidFromUtc": "2025-12-01T00:00:00Z",
            "ValidToUtc": "2026-01-01T00:00:00Z",
            "ModuleCodes": ["MODULE-001"]
        })
    }

    #[tokio::test]
    async fn test_create_then_open() {
        let created = process_request(request("license_create", json!({ "record": record_json() })), codec()).await;
        let result = created.result.unwrap();
        let asl = result["asl"].as_str().unwrap().to_string();
        assert!(result["license_key"].as_str().unwrap().starts_with("PROD-"));

        let opened = process_request(request("license_open", json!({ "asl": asl })), codec()).await;
        let result = opened.result.unwrap();
        assert_eq!(result["verified"], json!(true));
        assert_eq!(result["record"]["CompanyName"], json!("Acme Corp"));
    }

    #[tokio::test]
    async fn test_open_failure_is_uniform() {
        let resp = process_request(request("license_open", json!({ "asl": "AAAA" })), codec()).await;
        let err = resp.error.unwrap();
        assert_eq!(err.code, SERVER_ERROR);
        assert_eq!(err.message, "Invalid license file.");
    }

    #[tokio::test]
    async fn test_open_enforces_expiry() {
        let created = process_request(request("license_create", json!({ "record": record_json() })), codec()).await;
        let asl = created.result.unwrap()["asl"].as_str().unwrap().to_string();

        let resp = process_request(
            request(
                "license_open",
                json!({ "asl": asl, "enforce_expiry": true, "now": "2026-02-01T00:00:00Z" }),
            ),
            codec(),
        )
        .await;
        assert_eq!(resp.error.unwrap().message, "License expired.");
    }

    #[tokio::test]
    async fn test_missing_key_material() {
        let resp = process_request(
            request("license_create", json!({ "record": record_json() })),
            Arc::new(None),
        )
        .await;
        assert_eq!(resp.error.unwrap().message, "Operation failed. Contact admin.");
    }

    #[tokio::test]
    async fn test_checksum_of_canonical_json() {
        let resp = process_request(
            request("checksum_sha256", json!({ "json": { "b": 1, "a": 2 } })),
            codec(),
        )
        .await;
        assert_eq!(
            resp.result.unwrap()["checksum"],
            json!(compute_sha256_hex(br#"{"a":2,"b":1}"#))
        );
    }

    #[tokio::test]
    async fn test_unknown_method_and_bad_version() {
        let resp = process_request(request("license_delete", json!({})), codec()).await;
        assert_eq!(resp.error.unwrap().code, METHOD_NOT_FOUND);

        let mut req = request("help", Value::Null);
        req.jsonrpc = "1.0".to_string();
        assert_eq!(process_request(req, codec()).await.error.unwrap().code, INVALID_REQUEST);
    }
}
