//! JSON-RPC chain client.
//!
//! Exposes the three chain capabilities the indexer consumes: current block
//! height, filtered log retrieval, and transaction lookup by hash. The
//! concrete client speaks JSON-RPC over HTTP; the [`ChainClient`] trait is
//! the seam that lets the scheduler run against a fake in tests.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::IndexerError;

/// A raw EVM log as returned by `eth_getLogs`.
///
/// All numeric fields are hex strings exactly as the provider sent them;
/// decoding happens in the normalizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawLog {
    /// Emitting contract address.
    pub address: String,
    /// Log topics; `topics[0]` is the event signature hash.
    pub topics: Vec<String>,
    /// Non-indexed event data, hex encoded.
    pub data: String,
    /// Block number, hex encoded.
    #[serde(rename = "blockNumber")]
    pub block_number: String,
    /// Transaction hash.
    #[serde(rename = "transactionHash")]
    pub transaction_hash: String,
    /// Position of the log within the block, hex encoded.
    #[serde(rename = "logIndex")]
    pub log_index: String,
}

impl RawLog {
    /// Returns the block number, if the hex field parses.
    #[must_use]
    pub fn block_number_u64(&self) -> Option<u64> {
        parse_hex_u64(&self.block_number)
    }

    /// Returns the log index, if the hex field parses.
    #[must_use]
    pub fn log_index_u64(&self) -> Option<u64> {
        parse_hex_u64(&self.log_index)
    }
}

/// Chain capabilities consumed by the indexer.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Returns the current chain head block number.
    async fn block_number(&self) -> Result<u64, IndexerError>;

    /// Returns all logs emitted by the configured contract in
    /// `[from, to]` (inclusive) whose first topic equals `topic0`.
    async fn get_logs(&self, from: u64, to: u64, topic0: &str)
        -> Result<Vec<RawLog>, IndexerError>;

    /// Looks up a transaction by hash, returning the raw JSON-RPC object.
    ///
    /// Consumers use this to resolve a stored `hashedConsumer` digest back
    /// to a real sender address; the indexer itself never does.
    async fn transaction_by_hash(&self, hash: &str) -> Result<Option<Value>, IndexerError>;
}

/// JSON-RPC client over HTTP.
#[derive(Debug, Clone)]
pub struct RpcClient {
    http: reqwest::Client,
    url: String,
    contract_address: String,
}

impl RpcClient {
    /// Creates a new client for the given endpoint and contract.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(
        url: impl Into<String>,
        contract_address: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, IndexerError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            url: url.into(),
            contract_address: contract_address.into(),
        })
    }

    /// Returns the contract address this client filters on.
    #[must_use]
    pub fn contract_address(&self) -> &str {
        &self.contract_address
    }

    /// Issues a single JSON-RPC request and returns the `result` field.
    async fn request(&self, method: &str, params: Value) -> Result<Value, IndexerError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let response: Value = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(err) = response.get("error") {
            return Err(IndexerError::Rpc(err.to_string()));
        }

        response
            .get("result")
            .cloned()
            .ok_or_else(|| IndexerError::MalformedResponse(format!("{method}: missing result")))
    }
}

#[async_trait]
impl ChainClient for RpcClient {
    async fn block_number(&self) -> Result<u64, IndexerError> {
        let result = self.request("eth_blockNumber", json!([])).await?;
        let raw = result
            .as_str()
            .ok_or_else(|| IndexerError::MalformedResponse("eth_blockNumber: not a string".into()))?;
        parse_hex_u64(raw).ok_or_else(|| {
            IndexerError::MalformedResponse(format!("eth_blockNumber: bad hex {raw}"))
        })
    }

    async fn get_logs(
        &self,
        from: u64,
        to: u64,
        topic0: &str,
    ) -> Result<Vec<RawLog>, IndexerError> {
        let filter = json!({
            "address": self.contract_address,
            "fromBlock": to_hex(from),
            "toBlock": to_hex(to),
            "topics": [topic0],
        });
        let result = self.request("eth_getLogs", json!([filter])).await?;
        serde_json::from_value(result)
            .map_err(|e| IndexerError::MalformedResponse(format!("eth_getLogs: {e}")))
    }

    async fn transaction_by_hash(&self, hash: &str) -> Result<Option<Value>, IndexerError> {
        let result = self
            .request("eth_getTransactionByHash", json!([hash]))
            .await?;
        if result.is_null() {
            Ok(None)
        } else {
            Ok(Some(result))
        }
    }
}

/// Parses a hex string (with or without `0x`) into a u64.
#[must_use]
pub fn parse_hex_u64(s: &str) -> Option<u64> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    u64::from_str_radix(s, 16).ok()
}

/// Formats a block number as a 0x-prefixed hex string.
#[must_use]
pub fn to_hex(n: u64) -> String {
    format!("0x{n:x}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_hex_u64_basic() {
        assert_eq!(parse_hex_u64("0x1"), Some(1));
        assert_eq!(parse_hex_u64("0xff"), Some(255));
        assert_eq!(parse_hex_u64("1234"), Some(0x1234));
        assert_eq!(parse_hex_u64("0xzz"), None);
    }

    #[test]
    fn to_hex_round_trips() {
        assert_eq!(to_hex(0), "0x0");
        assert_eq!(to_hex(2500), "0x9c4");
        assert_eq!(parse_hex_u64(&to_hex(5_000_000_000)), Some(5_000_000_000));
    }

    #[test]
    fn raw_log_field_parsing() {
        let log = RawLog {
            address: "0x0".into(),
            topics: vec![],
            data: "0x".into(),
            block_number: "0x12a05f200".into(),
            transaction_hash: "0xabc".into(),
            log_index: "0x5".into(),
        };
        assert_eq!(log.block_number_u64(), Some(5_000_000_000));
        assert_eq!(log.log_index_u64(), Some(5));
    }

    #[test]
    fn raw_log_deserializes_provider_shape() {
        let json = r#"{
            "address": "0x1111111111111111111111111111111111111111",
            "topics": ["0xaaaa"],
            "data": "0x",
            "blockNumber": "0x10",
            "blockHash": "0xdead",
            "transactionHash": "0xbeef",
            "logIndex": "0x0",
            "removed": false
        }"#;
        let log: RawLog = serde_json::from_str(json).expect("log should deserialize");
        assert_eq!(log.block_number_u64(), Some(16));
        assert_eq!(log.transaction_hash, "0xbeef");
    }
}
