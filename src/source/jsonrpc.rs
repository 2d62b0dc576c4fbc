//! JSON-RPC 2.0 packets exchanged with the remote endpoint.

use crate::error::SourceError;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

pub const VERSION: &str = "2.0";

pub const METHOD_BLOCK_NUMBER: &str = "eth_blockNumber";
pub const METHOD_GET_BLOCK_BY_NUMBER: &str = "eth_getBlockByNumber";

/// Cloudflare's custom "resource not found" code, returned for blocks not produced yet.
pub const CODE_RESOURCE_NOT_FOUND: i64 = -32001;

#[derive(Debug, Serialize)]
pub struct Request<'a> {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: &'a str,
    pub params: serde_json::Value,
}

impl<'a> Request<'a> {
    pub fn new(id: u64, method: &'a str, params: serde_json::Value) -> Self {
        Self { jsonrpc: VERSION, id, method, params }
    }
}

#[derive(Debug, Deserialize)]
pub struct Response<T> {
    pub id: Option<u64>,
    pub result: Option<T>,
    pub error: Option<ErrorObject>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorObject {
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

/// Outcome of a response body that parsed as JSON-RPC.
#[derive(Debug)]
pub enum Payload<T> {
    Result(T),
    /// `result` was `null` or absent and no error was set.
    Null,
    Error(ErrorObject),
}

/// Decodes a raw response body. Bodies that are not JSON-RPC, or whose result does not have
/// the expected shape, are malformed.
pub fn decode<T: DeserializeOwned>(body: &str) -> Result<Payload<T>, SourceError> {
    let response: Response<T> = serde_json::from_str(body)?;
    Ok(match (response.error, response.result) {
        (Some(error), _) => Payload::Error(error),
        (None, Some(result)) => Payload::Result(result),
        (None, None) => Payload::Null,
    })
}
