//! Line-oriented JSON-RPC loop over stdio
//!
//! One request is processed end-to-end per line; suspension points are
//! exactly the awaited upstream calls inside the dispatcher. Notifications
//! (requests without an id) are consumed without a response. Malformed lines
//! get a parse error with a null id so the channel never goes silent on
//! garbage input.

use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, info};

use crate::dispatch::Dispatcher;
use crate::protocol::{PROTOCOL_VERSION, RpcRequest, RpcResponse};
use crate::tools::registry;

const PARSE_ERROR: i64 = -32700;
const METHOD_NOT_FOUND: i64 = -32601;
const INVALID_PARAMS: i64 = -32602;

/// Run the stdio server until the client closes stdin.
///
/// # Errors
///
/// Returns an error only on stdio failures; tool-level and protocol-level
/// problems are answered in-band.
pub async fn serve(dispatcher: &mut Dispatcher) -> anyhow::Result<()> {
    dispatcher.startup().await;
    info!("docforge serving on stdio ({} tools)", registry().len());

    let mut stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();
    let mut line = String::new();

    loop {
        line.clear();
        if stdin.read_line(&mut line).await? == 0 {
            break;
        }
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<RpcRequest>(&line) {
            Ok(request) => handle_request(dispatcher, request).await,
            Err(err) => {
                debug!("malformed request line: {err}");
                Some(RpcResponse::failure(
                    Value::Null,
                    PARSE_ERROR,
                    format!("parse error: {err}"),
                ))
            }
        };

        if let Some(response) = response {
            let mut payload = serde_json::to_string(&response)?;
            payload.push('\n');
            stdout.write_all(payload.as_bytes()).await?;
            stdout.flush().await?;
        }
    }

    info!("stdin closed, shutting down");
    Ok(())
}

/// Handle one request; `None` means a notification with nothing to answer.
pub async fn handle_request(
    dispatcher: &mut Dispatcher,
    request: RpcRequest,
) -> Option<RpcResponse> {
    let Some(id) = request.id else {
        debug!("notification consumed: {}", request.method);
        return None;
    };

    let response = match request.method.as_str() {
        "initialize" => RpcResponse::success(
            id,
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": { "tools": {} },
                "serverInfo": {
                    "name": "docforge",
                    "version": env!("CARGO_PKG_VERSION"),
                }
            }),
        ),
        "ping" => RpcResponse::success(id, json!({})),
        "tools/list" => RpcResponse::success(id, json!({ "tools": registry() })),
        "tools/call" => {
            let Some(name) = request.params.get("name").and_then(Value::as_str) else {
                return Some(RpcResponse::failure(
                    id,
                    INVALID_PARAMS,
                    "tools/call requires a 'name' parameter",
                ));
            };
            let arguments = request
                .params
                .get("arguments")
                .cloned()
                .unwrap_or_else(|| json!({}));

            let result = dispatcher.handle(name, &arguments).await;
            match serde_json::to_value(&result) {
                Ok(value) => RpcResponse::success(id, value),
                Err(err) => RpcResponse::failure(
                    id,
                    INVALID_PARAMS,
                    format!("failed to serialize tool response: {err}"),
                ),
            }
        }
        other => RpcResponse::failure(
            id,
            METHOD_NOT_FOUND,
            format!("method '{other}' is not supported"),
        ),
    };

    Some(response)
}
