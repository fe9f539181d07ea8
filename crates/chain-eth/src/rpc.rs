//! The chain-access boundary and its blocking JSON-RPC 2.0 implementation.

use std::sync::atomic::{AtomicU64, Ordering};

use alloy_primitives::U256;
use reqwest::blocking::Client;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::address::Address;
use crate::error::EthError;

/// Read access to an EVM chain.
///
/// Every method is a single blocking round-trip. Failures surface as
/// [`EthError::Network`] or, for contract calls, [`EthError::ContractCall`];
/// implementations do not retry.
pub trait ChainClient: Send + Sync {
    /// Native balance of `address` in wei.
    fn balance(&self, address: &Address) -> Result<U256, EthError>;

    /// Number of transactions sent from `address`, i.e. its next nonce.
    fn transaction_count(&self, address: &Address) -> Result<u64, EthError>;

    /// Current gas price in wei.
    fn gas_price(&self) -> Result<u128, EthError>;

    fn chain_id(&self) -> Result<u64, EthError>;

    /// Executes a read-only call against `contract` and returns the raw
    /// return data.
    fn call(&self, contract: &Address, data: &[u8]) -> Result<Vec<u8>, EthError>;
}

/// [`ChainClient`] over HTTP JSON-RPC (`eth_*` methods).
pub struct HttpChainClient {
    endpoint: Url,
    http: Client,
    next_id: AtomicU64,
}

#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

/// Why a request failed: the transport, or the node answering with an error.
enum RpcFailure {
    Transport(String),
    Remote(RpcErrorObject),
}

impl RpcFailure {
    fn into_network(self, method: &str) -> EthError {
        match self {
            RpcFailure::Transport(msg) => EthError::Network(format!("{method}: {msg}")),
            RpcFailure::Remote(err) => {
                EthError::Network(format!("{method}: rpc error {}: {}", err.code, err.message))
            }
        }
    }
}

impl HttpChainClient {
    /// Creates a client for `endpoint`. No request is made until first use.
    pub fn new(endpoint: &str) -> Result<Self, EthError> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| EthError::InvalidInput(format!("invalid rpc url {endpoint:?}: {e}")))?;

        let http = Client::builder()
            .build()
            .map_err(|e| EthError::Network(format!("failed to build http client: {e}")))?;

        Ok(Self {
            endpoint,
            http,
            next_id: AtomicU64::new(1),
        })
    }

    fn send(&self, method: &str, params: Value) -> Result<Value, RpcFailure> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        debug!(method, id, endpoint = %self.endpoint, "json-rpc request");

        let request = RpcRequest {
            jsonrpc: "2.0",
            id,
            method,
            params,
        };

        let response: RpcResponse = self
            .http
            .post(self.endpoint.clone())
            .json(&request)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| RpcFailure::Transport(e.to_string()))?
            .json()
            .map_err(|e| RpcFailure::Transport(format!("invalid response: {e}")))?;

        if let Some(error) = response.error {
            debug!(method, id, code = error.code, message = %error.message, "json-rpc error");
            return Err(RpcFailure::Remote(error));
        }

        response
            .result
            .ok_or_else(|| RpcFailure::Transport("response has neither result nor error".into()))
    }

    fn quantity(&self, method: &str, params: Value) -> Result<U256, EthError> {
        let value = self
            .send(method, params)
            .map_err(|f| f.into_network(method))?;
        parse_quantity(&value).map_err(|msg| EthError::Network(format!("{method}: {msg}")))
    }
}

impl ChainClient for HttpChainClient {
    fn balance(&self, address: &Address) -> Result<U256, EthError> {
        self.quantity("eth_getBalance", json!([address.to_string(), "latest"]))
    }

    fn transaction_count(&self, address: &Address) -> Result<u64, EthError> {
        let count = self.quantity("eth_getTransactionCount", json!([address.to_string(), "latest"]))?;
        u64::try_from(count)
            .map_err(|_| EthError::Network(format!("transaction count {count} out of range")))
    }

    fn gas_price(&self) -> Result<u128, EthError> {
        let price = self.quantity("eth_gasPrice", json!([]))?;
        u128::try_from(price).map_err(|_| EthError::Network(format!("gas price {price} out of range")))
    }

    fn chain_id(&self) -> Result<u64, EthError> {
        let id = self.quantity("eth_chainId", json!([]))?;
        u64::try_from(id).map_err(|_| EthError::Network(format!("chain id {id} out of range")))
    }

    fn call(&self, contract: &Address, data: &[u8]) -> Result<Vec<u8>, EthError> {
        let params = json!([
            { "to": contract.to_string(), "data": format!("0x{}", hex::encode(data)) },
            "latest"
        ]);

        let value = self.send("eth_call", params).map_err(|f| match f {
            RpcFailure::Remote(err) => {
                EthError::ContractCall(format!("{contract}: {} (code {})", err.message, err.code))
            }
            transport => transport.into_network("eth_call"),
        })?;

        parse_data(&value).map_err(|msg| EthError::Network(format!("eth_call: {msg}")))
    }
}

/// Parses a JSON-RPC hex quantity such as `"0x1a"`.
fn parse_quantity(value: &Value) -> Result<U256, String> {
    let text = value
        .as_str()
        .ok_or_else(|| format!("expected hex string, got {value}"))?;
    let digits = text
        .strip_prefix("0x")
        .filter(|d| !d.is_empty())
        .ok_or_else(|| format!("malformed quantity {text:?}"))?;

    U256::from_str_radix(digits, 16).map_err(|e| format!("malformed quantity {text:?}: {e}"))
}

/// Parses JSON-RPC hex data such as `"0x"` or `"0xdeadbeef"`.
fn parse_data(value: &Value) -> Result<Vec<u8>, String> {
    let text = value
        .as_str()
        .ok_or_else(|| format!("expected hex string, got {value}"))?;
    let digits = text
        .strip_prefix("0x")
        .ok_or_else(|| format!("malformed data {text:?}"))?;

    hex::decode(digits).map_err(|e| format!("malformed data {text:?}: {e}"))
}
