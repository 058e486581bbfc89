//! Test environment without a live network.
//!
//! Server mode runs against [`Asserter`]-backed transports: queue the JSON-RPC
//! responses a test expects, in order. Client mode runs against
//! [`MockConnector`], an in-memory wallet with two connectors backed by the
//! well-known local development keys.

use std::{
    collections::{HashMap, HashSet, VecDeque},
    sync::{Arc, Mutex, PoisonError},
};

use alloy::{
    dyn_abi::TypedData,
    primitives::{Address, Bytes, Signature, TxHash, U256, U64, address, keccak256},
    rpc::types::{TransactionReceipt, TransactionRequest},
    signers::{SignerSync, local::PrivateKeySigner},
    transports::mock::Asserter,
};
use alloy_sol_types::SolValue;
use async_trait::async_trait;

use crate::{
    chain::{Chain, Transport},
    config::{Config, Options, RawConfig},
    connector::{Connection, ConnectorError, ConnectorId, ConnectorInfo, ConnectorState, WalletConnector},
    session::{Session, SharedSession},
    subscription::{Listener, Subscribers, Subscription},
};

/// Local development keys, funded on a fresh `anvil` node.
pub const KEYS: [&str; 3] = [
    "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
    "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d",
    "0x5de4111afa1a4b94908f83103eb1f1706367c2e68ca870fc3fb9a804cdab365a",
];

/// Arbitrary non-zero contract address.
pub const CONTRACT: Address = address!("0x5FbDB2315678afecb367f032d93F642f64180aa3");

pub fn signer(index: usize) -> PrivateKeySigner {
    KEYS[index].parse().unwrap()
}

/// Return data of a function returning a single string.
pub fn encode_string(value: &str) -> Bytes {
    Bytes::from(value.to_string().abi_encode())
}

/// Chains every testing session is configured with, default first.
pub fn chains() -> Vec<Chain> {
    vec![Chain::anvil(), Chain::sepolia()]
}

/// JSON-RPC form of a mined EIP-1559 transaction receipt in block 1.
pub fn receipt_json(hash: TxHash, from: Address, to: Option<Address>, success: bool) -> serde_json::Value {
    serde_json::json!({
        "type": "0x2",
        "status": if success { "0x1" } else { "0x0" },
        "cumulativeGasUsed": "0xb416",
        "logs": [],
        "logsBloom": format!("0x{}", "0".repeat(512)),
        "transactionHash": hash,
        "transactionIndex": "0x0",
        "blockHash": keccak256(hash),
        "blockNumber": "0x1",
        "gasUsed": "0xb416",
        "effectiveGasPrice": "0x3b9aca00",
        "from": from,
        "to": to,
        "contractAddress": null,
    })
}

/// Queues what a server-mode signing provider asks for while filling and
/// broadcasting one transaction: gas estimate, fee history, pending nonce and
/// chain ID, then the hash returned by `eth_sendRawTransaction`.
pub fn push_submission(asserter: &Asserter, chain_id: u64, nonce: u64, tx_hash: TxHash) {
    asserter.push_success(&U64::from(60_000));
    asserter.push_success(&serde_json::json!({
        "oldestBlock": "0x1",
        "baseFeePerGas": ["0x3b9aca00", "0x3b9aca00"],
        "gasUsedRatio": [0.5],
        "reward": [["0x3b9aca00"]],
    }));
    asserter.push_success(&U64::from(nonce));
    asserter.push_success(&U64::from(chain_id));
    asserter.push_success(&tx_hash);
}

/// Server-mode session signing with `KEYS[0]`; both chains share one
/// asserter. Handles are not built yet.
pub fn server_session() -> (SharedSession, Asserter) {
    let asserter = Asserter::new();
    let options = chains().into_iter().fold(Options::server(KEYS[0], chains()), |options, chain| {
        options.with_transport(chain.id(), Transport::Mocked(asserter.clone()))
    });
    let config = Config::prepare(RawConfig::new("server", options)).unwrap();
    (Session::new(config), asserter)
}

/// Client-mode session over a fresh [`MockConnector`]. Handles are not built
/// yet and no wallet is connected.
pub fn client_session() -> (SharedSession, Arc<MockConnector>) {
    let connector = Arc::new(MockConnector::new(chains()));
    let config =
        Config::prepare(RawConfig::new("client", Options::client(connector.clone(), chains()))).unwrap();
    (Session::new(config), connector)
}

/// In-memory wallet connector.
///
/// Offers `"injected"` (account of `KEYS[0]`) and `"walletConnect"` (account
/// of `KEYS[1]`). `eth_call` results are queued with [`Self::push_call`];
/// sent transactions are confirmed immediately.
#[derive(Debug)]
pub struct MockConnector {
    chains: Vec<u64>,
    wallets: Vec<(ConnectorInfo, PrivateKeySigner)>,
    inner: Mutex<Inner>,
    subscribers: Subscribers<ConnectorState>,
}

#[derive(Debug, Default)]
struct Inner {
    state: ConnectorState,
    authorized: HashSet<ConnectorId>,
    balances: HashMap<Address, U256>,
    calls: HashMap<&'static str, usize>,
    call_results: VecDeque<Result<Bytes, ConnectorError>>,
    last_call: Option<TransactionRequest>,
    last_sent: Option<TransactionRequest>,
    sent: HashMap<TxHash, TransactionRequest>,
    fail_send: Option<ConnectorError>,
    fail_receipt: Option<ConnectorError>,
    revert_receipt: bool,
}

impl MockConnector {
    /// Connector on the first of `chains`, nothing connected.
    pub fn new(chains: Vec<Chain>) -> Self {
        let state =
            ConnectorState { chain_id: chains.first().map(Chain::id).unwrap_or_default(), connection: None };
        let wallets = [("injected", "Injected"), ("walletConnect", "WalletConnect")]
            .into_iter()
            .enumerate()
            .map(|(index, (id, name))| {
                (ConnectorInfo { id: id.to_string(), name: name.to_string() }, signer(index))
            })
            .collect();
        Self {
            chains: chains.iter().map(Chain::id).collect(),
            wallets,
            inner: Mutex::new(Inner { state, ..Default::default() }),
            subscribers: Subscribers::default(),
        }
    }

    /// Queues the result of the next `eth_call`.
    pub fn push_call(&self, result: Result<Bytes, ConnectorError>) {
        self.lock().call_results.push_back(result);
    }

    pub fn set_balance(&self, address: Address, wei: U256) {
        self.lock().balances.insert(address, wei);
    }

    /// Marks connectors as still authorized for [`WalletConnector::reconnect`].
    pub fn authorize(&self, connectors: &[&str]) {
        self.lock().authorized.extend(connectors.iter().map(|id| id.to_string()));
    }

    pub fn fail_next_send(&self, error: ConnectorError) {
        self.lock().fail_send = Some(error);
    }

    pub fn fail_next_receipt(&self, error: ConnectorError) {
        self.lock().fail_receipt = Some(error);
    }

    /// Next receipt reports a reverted execution.
    pub fn revert_next_receipt(&self) {
        self.lock().revert_receipt = true;
    }

    /// Chain change made by the user in the wallet itself.
    pub fn user_switch_chain(&self, chain_id: u64) {
        self.update(|state| {
            state.chain_id = chain_id;
            if let Some(connection) = state.connection.as_mut() {
                connection.chain_id = chain_id;
            }
        });
    }

    /// Number of calls of the connector method `method`.
    pub fn calls(&self, method: &str) -> usize {
        self.lock().calls.get(method).copied().unwrap_or_default()
    }

    /// Number of calls of any connector method reaching the network.
    pub fn total_calls(&self) -> usize {
        self.lock().calls.values().sum()
    }

    pub fn last_call(&self) -> Option<TransactionRequest> {
        self.lock().last_call.clone()
    }

    pub fn last_sent(&self) -> Option<TransactionRequest> {
        self.lock().last_sent.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn count(&self, method: &'static str) {
        *self.lock().calls.entry(method).or_default() += 1;
    }

    /// Applies `change` and notifies watchers if the state changed.
    fn update(&self, change: impl FnOnce(&mut ConnectorState)) -> ConnectorState {
        let (current, previous) = {
            let mut inner = self.lock();
            let previous = inner.state.clone();
            change(&mut inner.state);
            (inner.state.clone(), previous)
        };
        if current != previous {
            self.subscribers.notify(&current, &previous);
        }
        current
    }

    fn wallet(&self, connector: &str) -> Result<&(ConnectorInfo, PrivateKeySigner), ConnectorError> {
        self.wallets
            .iter()
            .find(|(info, _)| info.id == connector)
            .ok_or_else(|| ConnectorError::UnknownConnector(connector.to_string()))
    }

    fn signer_for(&self, account: Address) -> Result<&PrivateKeySigner, ConnectorError> {
        self.wallets
            .iter()
            .map(|(_, signer)| signer)
            .find(|signer| signer.address() == account)
            .ok_or(ConnectorError::NotConnected)
    }

    fn activate(&self, connector: &str) -> Result<Connection, ConnectorError> {
        let (info, signer) = self.wallet(connector)?;
        let account = signer.address();
        self.lock().authorized.insert(info.id.clone());
        let state = self.update(|state| {
            state.connection = Some(Connection {
                connector: info.id.clone(),
                accounts: vec![account],
                chain_id: state.chain_id,
            });
        });
        state.connection.ok_or(ConnectorError::NotConnected)
    }

    fn receipt(hash: TxHash, tx: &TransactionRequest, success: bool) -> Result<TransactionReceipt, ConnectorError> {
        let to = tx.to.and_then(|kind| kind.to().copied());
        serde_json::from_value(receipt_json(hash, tx.from.unwrap_or_default(), to, success))
            .map_err(|err| ConnectorError::Rpc(err.to_string()))
    }
}

#[async_trait]
impl WalletConnector for MockConnector {
    fn connectors(&self) -> Vec<ConnectorInfo> {
        self.wallets.iter().map(|(info, _)| info.clone()).collect()
    }

    fn state(&self) -> ConnectorState {
        self.lock().state.clone()
    }

    fn watch(&self, listener: Listener<ConnectorState>) -> Subscription {
        self.subscribers.subscribe(listener)
    }

    async fn connect(&self, connector: &str) -> Result<Connection, ConnectorError> {
        self.count("connect");
        self.activate(connector)
    }

    async fn disconnect(&self) -> Result<(), ConnectorError> {
        self.count("disconnect");
        self.update(|state| state.connection = None);
        Ok(())
    }

    async fn reconnect(&self, connectors: &[ConnectorId]) -> Result<Vec<Connection>, ConnectorError> {
        self.count("reconnect");
        let authorized = self.lock().authorized.clone();
        connectors
            .iter()
            .filter(|id| authorized.contains(*id))
            .map(|id| self.activate(id))
            .collect()
    }

    async fn switch_chain(&self, chain_id: u64) -> Result<u64, ConnectorError> {
        self.count("switch_chain");
        if !self.chains.contains(&chain_id) {
            return Err(ConnectorError::ChainNotConfigured(chain_id));
        }
        self.user_switch_chain(chain_id);
        Ok(chain_id)
    }

    async fn switch_account(&self, connector: &str) -> Result<Connection, ConnectorError> {
        self.count("switch_account");
        self.activate(connector)
    }

    async fn call(&self, tx: TransactionRequest) -> Result<Bytes, ConnectorError> {
        self.count("call");
        let mut inner = self.lock();
        inner.last_call = Some(tx);
        inner
            .call_results
            .pop_front()
            .unwrap_or_else(|| Err(ConnectorError::Rpc("no call result queued".to_string())))
    }

    async fn send_transaction(&self, tx: TransactionRequest) -> Result<TxHash, ConnectorError> {
        self.count("send_transaction");
        let mut inner = self.lock();
        inner.last_sent = Some(tx.clone());
        if let Some(error) = inner.fail_send.take() {
            return Err(error);
        }
        if tx.from.is_none() {
            return Err(ConnectorError::NotConnected);
        }
        let hash = keccak256(U256::from(inner.sent.len()).to_be_bytes::<32>());
        inner.sent.insert(hash, tx);
        Ok(hash)
    }

    async fn wait_for_receipt(&self, hash: TxHash) -> Result<TransactionReceipt, ConnectorError> {
        self.count("wait_for_receipt");
        let mut inner = self.lock();
        if let Some(error) = inner.fail_receipt.take() {
            return Err(error);
        }
        let success = !std::mem::take(&mut inner.revert_receipt);
        let tx = inner
            .sent
            .get(&hash)
            .ok_or_else(|| ConnectorError::Rpc(format!("unknown transaction {hash}")))?;
        Self::receipt(hash, tx, success)
    }

    async fn balance(&self, address: Address) -> Result<U256, ConnectorError> {
        self.count("balance");
        Ok(self.lock().balances.get(&address).copied().unwrap_or_default())
    }

    async fn sign_message(&self, account: Address, message: &[u8]) -> Result<Signature, ConnectorError> {
        self.count("sign_message");
        self.signer_for(account)?
            .sign_message_sync(message)
            .map_err(|err| ConnectorError::Rejected(err.to_string()))
    }

    async fn sign_typed_data(
        &self,
        account: Address,
        typed_data: &TypedData,
    ) -> Result<Signature, ConnectorError> {
        self.count("sign_typed_data");
        let hash = typed_data.eip712_signing_hash().map_err(|err| ConnectorError::Rpc(err.to_string()))?;
        self.signer_for(account)?
            .sign_hash_sync(&hash)
            .map_err(|err| ConnectorError::Rejected(err.to_string()))
    }
}
