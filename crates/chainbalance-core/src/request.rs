//! JSON-RPC 2.0 wire types and builders for the two read primitives the
//! balance fetchers need: `eth_getBalance` and `eth_call`.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::TransportError;

/// A JSON-RPC 2.0 request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    pub params: Vec<Value>,
    pub id: u64,
}

impl JsonRpcRequest {
    /// Create a new JSON-RPC 2.0 request.
    pub fn new(id: u64, method: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            method: method.into(),
            params,
            id,
        }
    }

    /// `eth_getBalance(address, "latest")`.
    pub fn get_balance(id: u64, address: &str) -> Self {
        Self::new(id, "eth_getBalance", vec![json!(address), json!("latest")])
    }

    /// Read-only contract call at the latest block. `data` is hex calldata
    /// without the `0x` prefix.
    pub fn eth_call(id: u64, to: &str, data: &str) -> Self {
        Self::new(
            id,
            "eth_call",
            vec![json!({ "to": to, "data": format!("0x{data}") }), json!("latest")],
        )
    }
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl std::fmt::Display for JsonRpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "JSON-RPC error {}: {}", self.code, self.message)
    }
}

/// A JSON-RPC 2.0 response. Nodes echo ids as numbers or strings, so the id
/// is kept as a raw value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// Successful response carrying `result`.
    pub fn success(id: u64, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            id: json!(id),
            result: Some(result),
            error: None,
        }
    }

    /// Error response carrying a node-side error object.
    pub fn failure(id: u64, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            id: json!(id),
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }

    /// Unwrap the result value, mapping a node error to [`TransportError::Rpc`].
    pub fn into_result(self) -> Result<Value, TransportError> {
        match (self.error, self.result) {
            (Some(err), _) => Err(TransportError::Rpc(err)),
            (None, Some(result)) => Ok(result),
            (None, None) => Err(TransportError::InvalidResponse(
                "response has neither result nor error".into(),
            )),
        }
    }

    /// Unwrap a hex-string result (`"0x..."`), the shape of both
    /// `eth_getBalance` and `eth_call` answers.
    pub fn into_hex(self) -> Result<String, TransportError> {
        match self.into_result()? {
            Value::String(s) => Ok(s),
            other => Err(TransportError::InvalidResponse(format!(
                "expected hex string, got {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_balance_serialization() {
        let req = JsonRpcRequest::get_balance(7, "0xabc");
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("\"jsonrpc\":\"2.0\""));
        assert!(json.contains("\"method\":\"eth_getBalance\""));
        assert!(json.contains("\"params\":[\"0xabc\",\"latest\"]"));
    }

    #[test]
    fn eth_call_prefixes_calldata() {
        let req = JsonRpcRequest::eth_call(1, "0xtoken", "313ce567");
        assert_eq!(req.params[0]["data"], "0x313ce567");
        assert_eq!(req.params[0]["to"], "0xtoken");
    }

    #[test]
    fn node_error_maps_to_rpc() {
        let resp = JsonRpcResponse::failure(1, -32000, "execution reverted");
        match resp.into_result() {
            Err(TransportError::Rpc(err)) => assert_eq!(err.code, -32000),
            other => panic!("expected rpc error, got {other:?}"),
        }
    }

    #[test]
    fn string_ids_deserialize() {
        let raw = r#"{"jsonrpc":"2.0","id":"abc","result":"0x10"}"#;
        let resp: JsonRpcResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(resp.into_hex().unwrap(), "0x10");
    }

    #[test]
    fn non_string_result_is_invalid() {
        let resp = JsonRpcResponse::success(1, json!(16));
        assert!(matches!(
            resp.into_hex(),
            Err(TransportError::InvalidResponse(_))
        ));
    }
}
