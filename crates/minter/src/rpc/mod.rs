//! Ethereum JSON-RPC backend
//!
//! [`JsonRpcClient`] talks to a node over HTTP and acts as the wallet. A node does not push
//! notifications, so network changes and mint events are polled for as long as someone
//! listens to them.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use minter_common::error::METHOD_NOT_FOUND_CODE;
use minter_common::parking_lot::Mutex;
use minter_common::pub_sub::Pubsub;
use minter_common::task;
use minter_common::{
    Address, ChainId, Error, ProviderEvent, ProviderEvents, ProviderTopic, Subscription,
    WalletProvider,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::task::JoinHandle;
use tracing::instrument;
use url::Url;

mod abi;
mod contract;

pub use contract::RpcNftContract;

/// Default delay between two polls of the node
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(4);

#[derive(Debug, Serialize)]
struct RpcRequest<'a, P> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: P,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

/// Decode a JSON-RPC response body
pub(crate) fn parse_response<R>(body: &str) -> Result<R, Error>
where
    R: DeserializeOwned,
{
    let response: RpcResponse = serde_json::from_str(body)?;

    if let Some(error) = response.error {
        return Err(Error::from_provider(error.code, error.message));
    }

    Ok(serde_json::from_value(response.result.unwrap_or(Value::Null))?)
}

fn http_error(err: reqwest::Error) -> Error {
    Error::HttpError(err.status().map(|status| status.as_u16()), err.to_string())
}

/// JSON-RPC node client
#[derive(Debug, Clone)]
pub struct JsonRpcClient {
    endpoint: Url,
    http: reqwest::Client,
    ids: Arc<AtomicU64>,
    poll_interval: Duration,
    events: Arc<Pubsub<ProviderEvents>>,
    chain_poller: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl JsonRpcClient {
    /// Create a new client for the node at `endpoint`
    pub fn new(endpoint: Url) -> Self {
        Self {
            endpoint,
            http: reqwest::Client::new(),
            ids: Arc::new(AtomicU64::new(1)),
            poll_interval: DEFAULT_POLL_INTERVAL,
            events: Arc::new(Pubsub::new()),
            chain_poller: Arc::new(Mutex::new(None)),
        }
    }

    /// Set the delay between two polls of the node
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Node endpoint
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Delay between two polls of the node
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub(crate) fn events(&self) -> &Arc<Pubsub<ProviderEvents>> {
        &self.events
    }

    /// Send one JSON-RPC request
    pub async fn request<P, R>(&self, method: &str, params: P) -> Result<R, Error>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: self.ids.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };

        let response = self
            .http
            .post(self.endpoint.clone())
            .json(&request)
            .send()
            .await
            .map_err(http_error)?;

        let status = response.status();
        let body = response.text().await.map_err(http_error)?;

        if !status.is_success() {
            // Nodes answer errors with a JSON-RPC body and a non 2xx status
            if let Ok(RpcResponse {
                error: Some(error), ..
            }) = serde_json::from_str::<RpcResponse>(&body)
            {
                return Err(Error::from_provider(error.code, error.message));
            }
            return Err(Error::HttpError(Some(status.as_u16()), body));
        }

        parse_response(&body)
    }

    fn ensure_chain_poller(&self) {
        let mut poller = self.chain_poller.lock();
        if poller.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return;
        }

        let client = self.clone();
        *poller = Some(task::spawn(async move {
            tracing::debug!("Polling {} for network changes", client.endpoint);
            let mut last = None;

            while client.events.has_listeners(&ProviderTopic::ChainChanged) {
                match client.chain_id().await {
                    Ok(chain_id) => {
                        if last.is_some_and(|last| last != chain_id) {
                            if let Err(err) =
                                client.events.publish_now(ProviderEvent::ChainChanged(chain_id))
                            {
                                tracing::error!("Could not publish network change: {}", err);
                            }
                        }
                        last = Some(chain_id);
                    }
                    Err(err) => tracing::warn!("Could not poll network: {}", err),
                }

                tokio::time::sleep(client.poll_interval).await;
            }

            tracing::debug!("No network listener left, polling stopped");
        }));
    }
}

#[async_trait]
impl WalletProvider for JsonRpcClient {
    #[instrument(skip(self))]
    async fn accounts(&self) -> Result<Vec<Address>, Error> {
        self.request("eth_accounts", json!([])).await
    }

    #[instrument(skip(self))]
    async fn chain_id(&self) -> Result<ChainId, Error> {
        self.request("eth_chainId", json!([])).await
    }

    #[instrument(skip(self))]
    async fn request_accounts(&self) -> Result<Vec<Address>, Error> {
        match self.request("eth_requestAccounts", json!([])).await {
            Err(Error::Provider { code, .. }) if code == METHOD_NOT_FOUND_CODE => {
                tracing::debug!("Node has no account prompt, using unlocked accounts");
                self.accounts().await
            }
            result => result,
        }
    }

    fn subscribe_chain_changed(&self) -> Result<Subscription, Error> {
        let subscription = self.events.subscribe(vec![ProviderTopic::ChainChanged])?;
        self.ensure_chain_poller();
        Ok(subscription)
    }
}

#[cfg(test)]
mod tests {
    use minter_common::alloy::primitives::address;

    use super::*;

    #[test]
    fn test_parse_result() {
        let chain: ChainId =
            parse_response(r#"{"jsonrpc":"2.0","id":1,"result":"0x4"}"#).unwrap();
        assert_eq!(chain, ChainId::new(4));

        let accounts: Vec<Address> = parse_response(
            r#"{"jsonrpc":"2.0","id":2,"result":["0xAABBCCDDEEFF00112233445566778899AABBCCDD"]}"#,
        )
        .unwrap();
        assert_eq!(
            accounts,
            vec![address!("aabbccddeeff00112233445566778899aabbccdd")]
        );
    }

    #[test]
    fn test_parse_null_result() {
        let receipt: Option<Value> =
            parse_response(r#"{"jsonrpc":"2.0","id":3,"result":null}"#).unwrap();
        assert!(receipt.is_none());
    }

    #[test]
    fn test_parse_errors() {
        let rejected = parse_response::<Value>(
            r#"{"jsonrpc":"2.0","id":4,"error":{"code":4001,"message":"User denied"}}"#,
        )
        .unwrap_err();
        assert!(rejected.is_user_rejection());

        let missing = parse_response::<Value>(
            r#"{"jsonrpc":"2.0","id":5,"error":{"code":-32601,"message":"Method not found"}}"#,
        )
        .unwrap_err();
        assert!(matches!(
            missing,
            Error::Provider {
                code: METHOD_NOT_FOUND_CODE,
                ..
            }
        ));

        assert!(parse_response::<Value>("not json").is_err());
    }

    #[test]
    fn test_request_encoding() {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: 7,
            method: "eth_chainId",
            params: json!([]),
        };

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"jsonrpc": "2.0", "id": 7, "method": "eth_chainId", "params": []})
        );
    }

    #[tokio::test]
    async fn test_unreachable_node() {
        let client = JsonRpcClient::new(Url::parse("http://127.0.0.1:9").unwrap());
        assert!(matches!(
            client.chain_id().await,
            Err(Error::HttpError(None, _))
        ));
    }
}
