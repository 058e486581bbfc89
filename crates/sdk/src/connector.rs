//! Wallet-connector collaborator used in client mode.
//!
//! A connector owns the wallet side of a browser-like session: it enumerates
//! available wallets, holds the connected accounts and the active chain, lets
//! the user switch both, and signs/submits on their behalf. The SDK only
//! talks to it through [`WalletConnector`].

use alloy::{
    dyn_abi::TypedData,
    primitives::{Address, Bytes, Signature, TxHash, U256},
    rpc::types::{TransactionReceipt, TransactionRequest},
};
use async_trait::async_trait;
use thiserror::Error;

use crate::subscription::{Listener, Subscription};

/// Identifier of a connector, e.g. `"injected"` or `"walletConnect"`.
pub type ConnectorId = String;

#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("connector not found: {0}")]
    UnknownConnector(ConnectorId),
    #[error("no connected account")]
    NotConnected,
    #[error("chain {0} is not configured for the connector")]
    ChainNotConfigured(u64),
    #[error("request rejected by user: {0}")]
    Rejected(String),
    #[error("execution reverted: {0}")]
    Reverted(String),
    #[error("rpc error: {0}")]
    Rpc(String),
}

/// Wallet the connector can connect to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectorInfo {
    pub id: ConnectorId,
    pub name: String,
}

/// Established connection to a wallet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Connection {
    pub connector: ConnectorId,
    /// Accounts exposed by the wallet; the first one is active.
    pub accounts: Vec<Address>,
    pub chain_id: u64,
}

impl Connection {
    pub fn account(&self) -> Option<Address> {
        self.accounts.first().copied()
    }
}

/// Observable state of the connector.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConnectorState {
    pub chain_id: u64,
    /// Currently active connection, if any.
    pub connection: Option<Connection>,
}

impl ConnectorState {
    pub fn account(&self) -> Option<Address> {
        self.connection.as_ref().and_then(Connection::account)
    }
}

#[async_trait]
pub trait WalletConnector: Send + Sync {
    fn connectors(&self) -> Vec<ConnectorInfo>;

    fn state(&self) -> ConnectorState;

    /// Registers a listener invoked on every state change, including changes
    /// the user makes in the wallet itself.
    fn watch(&self, listener: Listener<ConnectorState>) -> Subscription;

    async fn connect(&self, connector: &str) -> Result<Connection, ConnectorError>;

    async fn disconnect(&self) -> Result<(), ConnectorError>;

    /// Restores connections to the given connectors where the wallet still
    /// authorizes it. Returns the restored connections.
    async fn reconnect(&self, connectors: &[ConnectorId]) -> Result<Vec<Connection>, ConnectorError>;

    async fn switch_chain(&self, chain_id: u64) -> Result<u64, ConnectorError>;

    /// Makes `connector` the active connection.
    async fn switch_account(&self, connector: &str) -> Result<Connection, ConnectorError>;

    /// `eth_call` on the active chain.
    async fn call(&self, tx: TransactionRequest) -> Result<Bytes, ConnectorError>;

    /// Submits through the wallet; returns as soon as the hash is known.
    async fn send_transaction(&self, tx: TransactionRequest) -> Result<TxHash, ConnectorError>;

    async fn wait_for_receipt(&self, hash: TxHash) -> Result<TransactionReceipt, ConnectorError>;

    async fn balance(&self, address: Address) -> Result<U256, ConnectorError>;

    async fn sign_message(&self, account: Address, message: &[u8]) -> Result<Signature, ConnectorError>;

    async fn sign_typed_data(
        &self,
        account: Address,
        typed_data: &TypedData,
    ) -> Result<Signature, ConnectorError>;
}
