//! Collection contract reached through a JSON-RPC node

use std::sync::Arc;

use async_trait::async_trait;
use minter_common::alloy::primitives::Bytes;
use minter_common::alloy::rpc::types::{
    Log, TransactionInput, TransactionReceipt, TransactionRequest,
};
use minter_common::alloy::sol_types::{SolCall, SolEvent};
use minter_common::parking_lot::Mutex;
use minter_common::task;
use minter_common::{
    Address, ContractLog, Error, MintEvent, MintedCount, NftContract, ProviderTopic, Receipt,
    Subscription, TokenId, TxHash, WalletProvider,
};
use minter_common::types::U64;
use serde_json::json;
use tokio::task::JoinHandle;
use tracing::instrument;

use super::abi::{getMintedCountCall, makeAnEpicNFTCall, NewEpicNFTMinted};
use super::JsonRpcClient;

/// [`NftContract`] bound to a deployed address through a [`JsonRpcClient`]
#[derive(Debug, Clone)]
pub struct RpcNftContract {
    client: JsonRpcClient,
    address: Address,
    log_poller: Arc<Mutex<Option<JoinHandle<()>>>>,
    /// First block whose mint events are not delivered yet
    next_block: Arc<Mutex<Option<u64>>>,
}

impl RpcNftContract {
    /// Create a new contract binding
    pub fn new(client: JsonRpcClient, address: Address) -> Self {
        Self {
            client,
            address,
            log_poller: Arc::new(Mutex::new(None)),
            next_block: Arc::new(Mutex::new(None)),
        }
    }

    fn call(&self, data: Vec<u8>) -> TransactionRequest {
        TransactionRequest::default()
            .to(self.address)
            .input(TransactionInput::both(Bytes::from(data)))
    }

    fn decode_log(&self, log: &Log, fallback: Option<(TxHash, u64)>) -> Result<ContractLog, Error> {
        let topic = log.topics().first().copied();
        if log.address() != self.address || topic != Some(NewEpicNFTMinted::SIGNATURE_HASH) {
            return Ok(ContractLog::Other {
                address: log.address(),
                topic,
            });
        }

        let NewEpicNFTMinted {
            sender,
            tokenId: token_id,
        } = log.log_decode::<NewEpicNFTMinted>()?.inner.data;

        let tx_hash = log
            .transaction_hash
            .or(fallback.map(|(tx_hash, _)| tx_hash))
            .ok_or(Error::IncompleteLog("transaction hash"))?;
        let block_number = log
            .block_number
            .or(fallback.map(|(_, block_number)| block_number))
            .ok_or(Error::IncompleteLog("block number"))?;

        Ok(ContractLog::Minted(MintEvent {
            contract: self.address,
            sender,
            token_id: TokenId::try_from(token_id)?,
            tx_hash,
            log_index: log.log_index.unwrap_or_default(),
            block_number,
        }))
    }

    fn decode_receipt(&self, receipt: &TransactionReceipt) -> Result<Receipt, Error> {
        let block_number = receipt.block_number.unwrap_or_default();
        let fallback = Some((receipt.transaction_hash, block_number));

        let logs = receipt
            .inner
            .logs()
            .iter()
            .map(|log| self.decode_log(log, fallback))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Receipt {
            tx_hash: receipt.transaction_hash,
            block_number,
            success: receipt.inner.status(),
            logs,
        })
    }

    async fn block_number(&self) -> Result<u64, Error> {
        let block: U64 = self.client.request("eth_blockNumber", json!([])).await?;
        Ok(block.to::<u64>())
    }

    fn has_mint_listeners(&self) -> bool {
        self.client
            .events()
            .has_listeners(&ProviderTopic::Minted(self.address))
    }

    async fn minted_logs(&self, from: u64, to: u64) -> Result<Vec<MintEvent>, Error> {
        let logs: Vec<Log> = self
            .client
            .request(
                "eth_getLogs",
                json!([{
                    "fromBlock": U64::from(from),
                    "toBlock": U64::from(to),
                    "address": self.address,
                    "topics": [NewEpicNFTMinted::SIGNATURE_HASH],
                }]),
            )
            .await?;

        let mut events = Vec::with_capacity(logs.len());
        for log in logs.iter() {
            match self.decode_log(log, None) {
                Ok(ContractLog::Minted(event)) => events.push(event),
                Ok(ContractLog::Other { .. }) => {}
                Err(err) => tracing::warn!("Skipping undecodable mint log: {}", err),
            }
        }

        Ok(events)
    }

    fn ensure_log_poller(&self) {
        let mut poller = self.log_poller.lock();
        if poller.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return;
        }

        let contract = self.clone();
        *poller = Some(task::spawn(async move {
            let events = contract.client.events().clone();
            let interval = contract.client.poll_interval();

            tracing::debug!("Polling mint events of {}", contract.address);

            while contract.has_mint_listeners() {
                match contract.block_number().await {
                    Ok(head) => {
                        // A count read before the first poll sets where delivery starts
                        let from = *contract.next_block.lock().get_or_insert(head + 1);
                        if head >= from {
                            match contract.minted_logs(from, head).await {
                                Ok(minted) => {
                                    for event in minted {
                                        if let Err(err) = events.publish_now(event) {
                                            tracing::error!("Could not publish mint event: {}", err);
                                        }
                                    }
                                    let mut next_block = contract.next_block.lock();
                                    *next_block = next_block.max(Some(head + 1));
                                }
                                Err(err) => tracing::warn!("Could not fetch mint events: {}", err),
                            }
                        }
                    }
                    Err(err) => tracing::warn!("Could not poll block number: {}", err),
                }

                tokio::time::sleep(interval).await;
            }

            *contract.next_block.lock() = None;
            tracing::debug!("No mint listener left, polling stopped");
        }));
    }
}

#[async_trait]
impl NftContract for RpcNftContract {
    fn address(&self) -> &Address {
        &self.address
    }

    #[instrument(skip(self))]
    async fn mint(&self) -> Result<TxHash, Error> {
        let from = self
            .client
            .accounts()
            .await?
            .into_iter()
            .next()
            .ok_or(Error::NoAccounts)?;

        let transaction = self.call(makeAnEpicNFTCall {}.abi_encode()).from(from);

        self.client
            .request("eth_sendTransaction", json!([transaction]))
            .await
    }

    #[instrument(skip(self))]
    async fn wait_for_receipt(&self, tx_hash: &TxHash) -> Result<Receipt, Error> {
        loop {
            let receipt: Option<TransactionReceipt> = self
                .client
                .request("eth_getTransactionReceipt", json!([tx_hash]))
                .await?;

            if let Some(receipt) = receipt {
                return self.decode_receipt(&receipt);
            }

            tracing::trace!("Transaction {} pending", tx_hash);
            tokio::time::sleep(self.client.poll_interval()).await;
        }
    }

    /// Reads the count at the current head, so that live events start right after it
    #[instrument(skip(self))]
    async fn minted_count(&self) -> Result<MintedCount, Error> {
        let block_number = self.block_number().await?;

        let result: Bytes = self
            .client
            .request(
                "eth_call",
                json!([
                    self.call(getMintedCountCall {}.abi_encode()),
                    U64::from(block_number)
                ]),
            )
            .await?;

        let minted = getMintedCountCall::abi_decode_returns(&result)?;
        let minted = u64::try_from(minted).map_err(|_| Error::Overflow)?;

        if self.has_mint_listeners() {
            self.next_block.lock().get_or_insert(block_number + 1);
        }

        Ok(MintedCount {
            minted,
            block_number,
        })
    }

    fn subscribe_minted(&self) -> Result<Subscription, Error> {
        let subscription = self
            .client
            .events()
            .subscribe(vec![ProviderTopic::Minted(self.address)])?;
        self.ensure_log_poller();
        Ok(subscription)
    }
}
