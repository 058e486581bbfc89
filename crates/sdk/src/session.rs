//! Live network session shared by every contract wrapper.
//!
//! A [`Session`] is created once per configuration and handed around as a
//! [`SharedSession`]. Its backend is chosen from the configured [`Mode`] at
//! construction:
//!
//! * client mode keeps a wallet handle over the configured
//!   [`WalletConnector`], with user-driven connection, account and chain
//!   switching;
//! * server mode keeps an RPC pair: a read provider bound to one chain and a
//!   signing provider bound to one private key. Switching chain or account
//!   builds a new pair and swaps it in whole.
//!
//! Handles are built lazily. Operations that need a handle set which has not
//! been built fail with [`SdkError::ClientNotFound`]; wrappers call
//! [`Session::ensure_clients`] on construction.
//!
//! Chain and account changes made through one wrapper are observed by every
//! other wrapper holding the same session on its next call. Concurrent
//! mutations race, last writer wins.

use std::{
    fmt,
    str::FromStr,
    sync::{Arc, PoisonError, RwLock},
};

use alloy::{
    dyn_abi::TypedData,
    network::EthereumWallet,
    primitives::{Address, Bytes, Signature, TxHash, U256, utils::format_units},
    providers::{DynProvider, Provider},
    rpc::types::{TransactionReceipt, TransactionRequest},
    signers::{SignerSync, local::PrivateKeySigner},
};
use async_trait::async_trait;

use crate::{
    abi::AbiRegistry,
    chain::{self, Chain, ChainDescriptor, Transport},
    config::{self, Config, Mode},
    connector::{Connection, ConnectorId, ConnectorInfo, ConnectorState, WalletConnector},
    error::{BoxError, Result, SdkError},
    resolver::{self, ResolveRequest, ResolvedParams, Resolver},
    subscription::{Listener, Subscription},
};

pub type SharedSession = Arc<Session>;

/// Handle set a session operation runs against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ClientKind {
    /// Wallet-connector handle (client mode).
    Wallet,
    /// Read provider plus signing provider (server mode).
    RpcPair,
}

impl fmt::Display for ClientKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientKind::Wallet => write!(f, "wallet"),
            ClientKind::RpcPair => write!(f, "rpc-pair"),
        }
    }
}

impl FromStr for ClientKind {
    type Err = SdkError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "wallet" => Ok(ClientKind::Wallet),
            "rpc-pair" | "rpc" => Ok(ClientKind::RpcPair),
            other => Err(SdkError::InvalidClientType(other.to_string())),
        }
    }
}

/// Result of a client-mode operation which may register a change listener.
#[derive(Clone, Debug)]
pub struct Watched<T> {
    pub value: T,
    /// Present when a listener was registered.
    pub subscription: Option<Subscription>,
}

/// Native currency balance of an account.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NativeBalance {
    pub wei: U256,
    pub decimals: u8,
    pub symbol: String,
}

impl fmt::Display for NativeBalance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let amount = format_units(self.wei, self.decimals).map_err(|_| fmt::Error)?;
        write!(f, "{} {}", amount, self.symbol)
    }
}

pub struct Session {
    config: Config,
    registry: Arc<AbiRegistry>,
    backend: Backend,
}

enum Backend {
    Client(RwLock<Option<WalletHandle>>),
    Server(RwLock<Option<RpcPair>>),
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("mode", &self.config.mode())
            .field("clients", &self.clients_exist(self.active_kind()))
            .field("account", &self.account())
            .finish()
    }
}

impl Session {
    pub fn new(config: Config) -> SharedSession {
        Self::with_registry(config, AbiRegistry::builtin())
    }

    /// Session resolving contracts against `registry` instead of the
    /// bundled interfaces.
    pub fn with_registry(config: Config, registry: Arc<AbiRegistry>) -> SharedSession {
        let backend = match config.mode() {
            Mode::Client => Backend::Client(RwLock::new(None)),
            Mode::Server => Backend::Server(RwLock::new(None)),
        };
        Arc::new(Self { config, registry, backend })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn mode(&self) -> Mode {
        self.config.mode()
    }

    pub fn registry(&self) -> &Arc<AbiRegistry> {
        &self.registry
    }

    /// Handle set matching the session mode.
    pub fn active_kind(&self) -> ClientKind {
        match self.backend {
            Backend::Client(_) => ClientKind::Wallet,
            Backend::Server(_) => ClientKind::RpcPair,
        }
    }

    /// Whether the handle set of `kind` has been built.
    pub fn clients_exist(&self, kind: ClientKind) -> bool {
        match (&self.backend, kind) {
            (Backend::Client(wallet), ClientKind::Wallet) => read(wallet).is_some(),
            (Backend::Server(pair), ClientKind::RpcPair) => read(pair).is_some(),
            _ => false,
        }
    }

    /// (Re)builds the handle set of the session mode from the configuration,
    /// discarding the current one.
    pub fn set_clients(&self) -> Result<()> {
        match &self.backend {
            Backend::Client(wallet) => {
                let connector = self
                    .config
                    .options()
                    .connector
                    .clone()
                    .ok_or(SdkError::MissingRequiredParams("Wallet Connector Config"))?;
                *write(wallet) = Some(WalletHandle { connector });
                tracing::debug!("built wallet client");
            },
            Backend::Server(pair) => {
                let chain = self
                    .config
                    .default_chain()
                    .ok_or(SdkError::MissingRequiredParams("Chains"))?;
                let key = self
                    .config
                    .options()
                    .private_key
                    .as_deref()
                    .ok_or(SdkError::MissingRequiredParams("Private Key"))?;
                let rebuilt = RpcPair::new(&self.config, chain, config::parse_private_key(key)?)?;
                tracing::debug!(chain = chain.id(), account = %rebuilt.signer.address(), "built rpc clients");
                *write(pair) = Some(rebuilt);
            },
        }
        Ok(())
    }

    /// Builds the handle set of the session mode unless it already exists.
    pub fn ensure_clients(&self) -> Result<()> {
        if !self.clients_exist(self.active_kind()) {
            self.set_clients()?;
        }
        Ok(())
    }

    /// Chain the handle set of `kind` is currently on.
    pub fn chain(&self, kind: ClientKind) -> Result<ChainDescriptor> {
        let id = match (&self.backend, kind) {
            (Backend::Client(wallet), ClientKind::Wallet) => {
                read(wallet).as_ref().ok_or(SdkError::ClientNotFound(kind))?.connector.state().chain_id
            },
            (Backend::Server(pair), ClientKind::RpcPair) => {
                return Ok(read(pair)
                    .as_ref()
                    .ok_or(SdkError::ClientNotFound(kind))?
                    .chain
                    .descriptor());
            },
            _ => return Err(SdkError::ClientNotFound(kind)),
        };
        chain::chain_by_id(&self.config, id).map(Chain::descriptor)
    }

    /// Chain of the session's own handle set.
    pub fn current_chain(&self) -> Result<ChainDescriptor> {
        self.chain(self.active_kind())
    }

    /// Account signing for the session: the active wallet account in client
    /// mode, the bound key's address in server mode. `None` if nothing is
    /// connected or bound.
    pub fn account(&self) -> Option<Address> {
        match &self.backend {
            Backend::Client(wallet) => {
                read(wallet).as_ref().and_then(|handle| handle.connector.state().account())
            },
            Backend::Server(pair) => read(pair).as_ref().map(|pair| pair.signer.address()),
        }
    }

    /// Native balance of `address`, queried through the handle set of `kind`.
    pub async fn balance_of(&self, kind: ClientKind, address: Address) -> Result<NativeBalance> {
        let (wei, chain) = match (&self.backend, kind) {
            (Backend::Client(wallet), ClientKind::Wallet) => {
                let handle = read(wallet).clone().ok_or(SdkError::ClientNotFound(kind))?;
                let chain_id = handle.connector.state().chain_id;
                let wei = handle.connector.balance(address).await?;
                (wei, chain::chain_by_id(&self.config, chain_id)?.clone())
            },
            (Backend::Server(pair), ClientKind::RpcPair) => {
                let pair = read(pair).clone().ok_or(SdkError::ClientNotFound(kind))?;
                (pair.public.get_balance(address).await?, pair.chain)
            },
            _ => return Err(SdkError::ClientNotFound(kind)),
        };
        let currency = chain.native_currency();
        Ok(NativeBalance { wei, decimals: currency.decimals, symbol: currency.symbol.clone() })
    }

    /// Resolves a contract using the chain registry's transport for
    /// `request.chain`.
    pub async fn resolve(&self, request: &ResolveRequest) -> Result<ResolvedParams> {
        let transport = chain::transport(&self.config, request.chain.id())?;
        Resolver::new(self.registry.clone()).resolve(request, &transport).await
    }

    /// Implementation behind the proxy at `address` on chain `chain_id`,
    /// [`Address::ZERO`] if it is not a proxy.
    pub async fn implementation_of(&self, chain_id: u64, address: Address) -> Result<Address> {
        let transport = chain::transport(&self.config, chain_id)?;
        resolver::implementation_of(&transport, address).await
    }

    // Client mode

    pub fn connectors(&self) -> Result<Vec<ConnectorInfo>> {
        Ok(self.wallet()?.connector.connectors())
    }

    pub fn connection(&self) -> Result<Option<Connection>> {
        Ok(self.wallet()?.connector.state().connection)
    }

    /// Connects to `connector`. `on_change` is notified of subsequent
    /// connection changes until it cancels its subscription.
    pub async fn connect(
        &self,
        connector: &str,
        on_change: Option<Listener<Option<Connection>>>,
    ) -> Result<Watched<Connection>> {
        let handle = self.wallet()?;
        let connection = handle.connector.connect(connector).await?;
        tracing::debug!(connector, account = ?connection.account(), "connected wallet");
        let subscription = on_change.map(|listener| watch_connection(&handle, listener));
        Ok(Watched { value: connection, subscription })
    }

    pub async fn disconnect(&self) -> Result<()> {
        self.wallet()?.connector.disconnect().await?;
        tracing::debug!("disconnected wallet");
        Ok(())
    }

    /// Restores previous connections. Returns how many were restored.
    pub async fn reconnect(&self, connectors: &[ConnectorId]) -> Result<usize> {
        let restored = self.wallet()?.connector.reconnect(connectors).await?;
        tracing::debug!(requested = connectors.len(), restored = restored.len(), "reconnected wallets");
        Ok(restored.len())
    }

    pub async fn switch_account(
        &self,
        connector: &str,
        on_change: Option<Listener<Option<Connection>>>,
    ) -> Result<Watched<Connection>> {
        let handle = self.wallet()?;
        let connection = handle.connector.switch_account(connector).await?;
        tracing::debug!(connector, account = ?connection.account(), "switched account");
        let subscription = on_change.map(|listener| watch_connection(&handle, listener));
        Ok(Watched { value: connection, subscription })
    }

    /// Asks the wallet to switch to chain `id`. `on_change` receives chain
    /// IDs of subsequent chain changes.
    pub async fn switch_chain(
        &self,
        id: u64,
        on_change: Option<Listener<u64>>,
    ) -> Result<Watched<ChainDescriptor>> {
        let handle = self.wallet()?;
        let chain = chain::chain_by_id(&self.config, id)?.descriptor();
        let switched = handle.connector.switch_chain(id).await?;
        tracing::debug!(chain = switched, "switched wallet chain");
        let subscription = on_change.map(|listener| {
            handle.connector.watch(Arc::new(
                move |current: &ConnectorState, previous: &ConnectorState, sub: &Subscription| {
                    if current.chain_id != previous.chain_id {
                        listener(&current.chain_id, &previous.chain_id, sub);
                    }
                },
            ))
        });
        Ok(Watched { value: chain, subscription })
    }

    fn wallet(&self) -> Result<WalletHandle> {
        match &self.backend {
            Backend::Client(wallet) => {
                read(wallet).clone().ok_or(SdkError::ClientNotFound(ClientKind::Wallet))
            },
            Backend::Server(_) => Err(SdkError::InvalidSdkMode(
                "wallet operations are only available in client mode".to_string(),
            )),
        }
    }

    // Server mode

    /// Rebinds the RPC pair to chain `id`, keeping the current signing key.
    pub fn use_chain(&self, id: u64) -> Result<()> {
        let Backend::Server(pair) = &self.backend else {
            return Err(SdkError::InvalidSdkMode("use_chain is only available in server mode".to_string()));
        };
        let chain = chain::chain_by_id(&self.config, id)?;
        let signer = match read(pair).as_ref() {
            Some(current) => current.signer.clone(),
            None => config::parse_private_key(
                self.config
                    .options()
                    .private_key
                    .as_deref()
                    .ok_or(SdkError::MissingRequiredParams("Private Key"))?,
            )?,
        };
        let rebuilt = RpcPair::new(&self.config, chain, signer)?;
        *write(pair) = Some(rebuilt);
        tracing::debug!(chain = id, "switched rpc chain");
        Ok(())
    }

    /// Rebinds the signer to `private_key` without changing chain. Returns
    /// the new account address.
    pub fn use_account(&self, private_key: &str) -> Result<Address> {
        let Backend::Server(pair) = &self.backend else {
            return Err(SdkError::InvalidSdkMode(
                "use_account is only available in server mode".to_string(),
            ));
        };
        let signer = config::parse_private_key(private_key)?;
        let chain = match read(pair).as_ref() {
            Some(current) => current.chain.clone(),
            None => self.config.default_chain().ok_or(SdkError::MissingRequiredParams("Chains"))?.clone(),
        };
        let rebuilt = RpcPair::new(&self.config, &chain, signer)?;
        let address = rebuilt.signer.address();
        *write(pair) = Some(rebuilt);
        tracing::debug!(%address, "switched rpc account");
        Ok(address)
    }

    /// Snapshot of the live handle set, used for one logical operation.
    pub(crate) fn execution(&self) -> Result<Box<dyn Execution>> {
        match &self.backend {
            Backend::Client(wallet) => Ok(Box::new(
                read(wallet).clone().ok_or(SdkError::ClientNotFound(ClientKind::Wallet))?,
            )),
            Backend::Server(pair) => Ok(Box::new(
                read(pair).clone().ok_or(SdkError::ClientNotFound(ClientKind::RpcPair))?,
            )),
        }
    }
}

fn watch_connection(handle: &WalletHandle, listener: Listener<Option<Connection>>) -> Subscription {
    handle.connector.watch(Arc::new(
        move |current: &ConnectorState, previous: &ConnectorState, sub: &Subscription| {
            if current.connection != previous.connection {
                listener(&current.connection, &previous.connection, sub);
            }
        },
    ))
}

fn read<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

/// What a live handle set can do for one contract interaction.
#[async_trait]
pub(crate) trait Execution: Send + Sync {
    fn kind(&self) -> ClientKind;

    fn account(&self) -> Option<Address>;

    async fn call(&self, tx: TransactionRequest) -> Result<Bytes, BoxError>;

    async fn send(&self, tx: TransactionRequest) -> Result<TxHash, BoxError>;

    async fn receipt(&self, hash: TxHash) -> Result<TransactionReceipt, BoxError>;

    async fn sign_message(&self, message: &[u8]) -> Result<Signature>;

    async fn sign_typed_data(&self, typed_data: &TypedData) -> Result<Signature>;
}

#[derive(Clone)]
struct WalletHandle {
    connector: Arc<dyn WalletConnector>,
}

impl WalletHandle {
    fn signer(&self) -> Result<Address> {
        self.connector.state().account().ok_or(SdkError::ClientNotFound(ClientKind::Wallet))
    }
}

#[async_trait]
impl Execution for WalletHandle {
    fn kind(&self) -> ClientKind {
        ClientKind::Wallet
    }

    fn account(&self) -> Option<Address> {
        self.connector.state().account()
    }

    async fn call(&self, tx: TransactionRequest) -> Result<Bytes, BoxError> {
        Ok(self.connector.call(tx).await?)
    }

    async fn send(&self, tx: TransactionRequest) -> Result<TxHash, BoxError> {
        Ok(self.connector.send_transaction(tx).await?)
    }

    async fn receipt(&self, hash: TxHash) -> Result<TransactionReceipt, BoxError> {
        Ok(self.connector.wait_for_receipt(hash).await?)
    }

    async fn sign_message(&self, message: &[u8]) -> Result<Signature> {
        let account = self.signer()?;
        Ok(self.connector.sign_message(account, message).await?)
    }

    async fn sign_typed_data(&self, typed_data: &TypedData) -> Result<Signature> {
        let account = self.signer()?;
        Ok(self.connector.sign_typed_data(account, typed_data).await?)
    }
}

/// Read provider and signing provider bound to one chain and one key.
#[derive(Clone)]
struct RpcPair {
    chain: Chain,
    public: DynProvider,
    signer: PrivateKeySigner,
    wallet: DynProvider,
}

impl RpcPair {
    fn new(config: &Config, chain: &Chain, signer: PrivateKeySigner) -> Result<Self> {
        let transport: Transport = chain::transport(config, chain.id())?;
        Ok(Self {
            chain: chain.clone(),
            public: transport.provider(),
            wallet: transport.signing_provider(EthereumWallet::from(signer.clone())),
            signer,
        })
    }
}

#[async_trait]
impl Execution for RpcPair {
    fn kind(&self) -> ClientKind {
        ClientKind::RpcPair
    }

    fn account(&self) -> Option<Address> {
        Some(self.signer.address())
    }

    async fn call(&self, tx: TransactionRequest) -> Result<Bytes, BoxError> {
        Ok(self.public.call(tx).await?)
    }

    async fn send(&self, tx: TransactionRequest) -> Result<TxHash, BoxError> {
        let pending = self.wallet.send_transaction(tx).await?;
        Ok(*pending.tx_hash())
    }

    async fn receipt(&self, hash: TxHash) -> Result<TransactionReceipt, BoxError> {
        let interval = self.wallet.client().poll_interval();
        loop {
            if let Some(receipt) = self.wallet.get_transaction_receipt(hash).await? {
                return Ok(receipt);
            }
            tracing::trace!(%hash, "transaction not mined yet");
            tokio::time::sleep(interval).await;
        }
    }

    async fn sign_message(&self, message: &[u8]) -> Result<Signature> {
        Ok(self.signer.sign_message_sync(message)?)
    }

    async fn sign_typed_data(&self, typed_data: &TypedData) -> Result<Signature> {
        let hash = typed_data.eip712_signing_hash()?;
        Ok(self.signer.sign_hash_sync(&hash)?)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use alloy::transports::mock::Asserter;

    use super::*;
    use crate::{
        config::{Options, RawConfig},
        testing::{self, MockConnector},
    };

    #[test]
    fn test_client_kind_from_str() {
        assert_eq!("wallet".parse::<ClientKind>().unwrap(), ClientKind::Wallet);
        assert_eq!("rpc-pair".parse::<ClientKind>().unwrap(), ClientKind::RpcPair);
        assert!(matches!("public".parse::<ClientKind>(), Err(SdkError::InvalidClientType(t)) if t == "public"));
    }

    #[test]
    fn test_server_account_before_and_after_binding() {
        let (session, _) = testing::server_session();
        assert_eq!(session.account(), None);
        assert!(!session.clients_exist(ClientKind::RpcPair));

        let address = session.use_account(testing::KEYS[1]).unwrap();
        assert_eq!(address, testing::signer(1).address());
        assert_eq!(session.account(), Some(address));
        assert_eq!(session.current_chain().unwrap().id, 31337);
    }

    #[test]
    fn test_server_set_clients_binds_configured_key() {
        let (session, _) = testing::server_session();
        session.set_clients().unwrap();
        assert!(session.clients_exist(ClientKind::RpcPair));
        assert!(!session.clients_exist(ClientKind::Wallet));
        assert_eq!(session.account(), Some(testing::signer(0).address()));
    }

    #[test]
    fn test_use_chain_keeps_signer() {
        let (session, _) = testing::server_session();
        session.use_account(testing::KEYS[2]).unwrap();
        session.use_chain(11155111).unwrap();
        assert_eq!(session.current_chain().unwrap().name, "Sepolia");
        assert_eq!(session.account(), Some(testing::signer(2).address()));

        assert!(matches!(session.use_chain(5), Err(SdkError::InvalidChainId { id: 5, .. })));
        assert_eq!(session.current_chain().unwrap().id, 11155111);
    }

    #[test]
    fn test_mode_gating() {
        let (server, _) = testing::server_session();
        assert!(matches!(server.connectors(), Err(SdkError::InvalidSdkMode(_))));
        assert!(matches!(server.connection(), Err(SdkError::InvalidSdkMode(_))));

        let (client, _) = testing::client_session();
        assert!(matches!(client.use_chain(31337), Err(SdkError::InvalidSdkMode(_))));
        assert!(matches!(client.use_account(testing::KEYS[0]), Err(SdkError::InvalidSdkMode(_))));
    }

    #[test]
    fn test_chain_requires_matching_handles() {
        let (session, _) = testing::server_session();
        assert!(matches!(session.chain(ClientKind::RpcPair), Err(SdkError::ClientNotFound(ClientKind::RpcPair))));
        session.set_clients().unwrap();
        assert!(matches!(session.chain(ClientKind::Wallet), Err(SdkError::ClientNotFound(ClientKind::Wallet))));
        assert_eq!(session.chain(ClientKind::RpcPair).unwrap().id, 31337);
    }

    #[tokio::test]
    async fn test_client_operations_require_wallet_handle() {
        let (session, _) = testing::client_session();
        assert!(matches!(session.connectors(), Err(SdkError::ClientNotFound(ClientKind::Wallet))));
        assert!(matches!(
            session.connect("injected", None).await,
            Err(SdkError::ClientNotFound(ClientKind::Wallet))
        ));
        session.ensure_clients().unwrap();
        assert_eq!(session.connectors().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_connect_and_watch_connection() {
        let (session, connector) = testing::client_session();
        session.ensure_clients().unwrap();
        assert_eq!(session.account(), None);

        let changes = Arc::new(Mutex::new(Vec::new()));
        let sink = changes.clone();
        let connected = session
            .connect(
                "injected",
                Some(Arc::new(move |current: &Option<Connection>, previous: &Option<Connection>, _: &Subscription| {
                    sink.lock().unwrap().push((
                        current.as_ref().and_then(Connection::account),
                        previous.as_ref().and_then(Connection::account),
                    ));
                })),
            )
            .await
            .unwrap();
        assert_eq!(connected.value.account(), Some(testing::signer(0).address()));
        assert_eq!(session.account(), Some(testing::signer(0).address()));

        session.switch_account("walletConnect", None).await.unwrap();
        assert_eq!(session.account(), Some(testing::signer(1).address()));
        assert_eq!(
            *changes.lock().unwrap(),
            vec![(Some(testing::signer(1).address()), Some(testing::signer(0).address()))]
        );

        connected.subscription.unwrap().cancel();
        session.disconnect().await.unwrap();
        assert_eq!(session.account(), None);
        assert_eq!(changes.lock().unwrap().len(), 1);
        assert_eq!(connector.calls("disconnect"), 1);
    }

    #[tokio::test]
    async fn test_switch_chain_listener_unsubscribes_itself() {
        let (session, connector) = testing::client_session();
        session.ensure_clients().unwrap();
        session.connect("injected", None).await.unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let switched = session
            .switch_chain(
                11155111,
                Some(Arc::new(move |current: &u64, previous: &u64, sub: &Subscription| {
                    sink.lock().unwrap().push((*current, *previous));
                    sub.cancel();
                })),
            )
            .await
            .unwrap();
        assert_eq!(switched.value.name, "Sepolia");
        assert_eq!(session.current_chain().unwrap().id, 11155111);

        // Changes made in the wallet itself.
        connector.user_switch_chain(31337);
        connector.user_switch_chain(11155111);
        assert_eq!(*seen.lock().unwrap(), vec![(31337, 11155111)]);
        assert!(!switched.subscription.unwrap().is_active());

        assert!(matches!(session.switch_chain(1, None).await, Err(SdkError::InvalidChainId { id: 1, .. })));
    }

    #[tokio::test]
    async fn test_reconnect_counts_restored() {
        let (session, connector) = testing::client_session();
        session.ensure_clients().unwrap();
        connector.authorize(&["injected"]);
        let restored = session
            .reconnect(&["injected".to_string(), "walletConnect".to_string()])
            .await
            .unwrap();
        assert_eq!(restored, 1);
        assert!(session.connection().unwrap().is_some());
    }

    #[tokio::test]
    async fn test_balance_of() {
        let (session, connector) = testing::client_session();
        session.ensure_clients().unwrap();
        let holder = testing::signer(0).address();
        connector.set_balance(holder, U256::from(1_500_000_000_000_000_000u128));

        let balance = session.balance_of(ClientKind::Wallet, holder).await.unwrap();
        assert_eq!(balance.wei, U256::from(1_500_000_000_000_000_000u128));
        assert_eq!(balance.to_string(), "1.500000000000000000 ETH");
        assert!(matches!(
            session.balance_of(ClientKind::RpcPair, holder).await,
            Err(SdkError::ClientNotFound(ClientKind::RpcPair))
        ));
    }

    #[tokio::test]
    async fn test_server_balance_of() {
        let asserter = Asserter::new();
        let config = Config::prepare(RawConfig::new(
            "server",
            Options::server(testing::KEYS[0], vec![Chain::anvil()])
                .with_transport(31337, Transport::Mocked(asserter.clone())),
        ))
        .unwrap();
        let session = Session::new(config);
        session.set_clients().unwrap();

        asserter.push_success(&U256::from(42));
        let balance = session.balance_of(ClientKind::RpcPair, Address::ZERO).await.unwrap();
        assert_eq!(balance.wei, U256::from(42));

        asserter.push_failure_msg("connection refused");
        assert!(matches!(
            session.balance_of(ClientKind::RpcPair, Address::ZERO).await,
            Err(SdkError::Transport(_))
        ));
    }

    #[test]
    fn test_shared_session_observed_by_all_holders() {
        let (session, _) = testing::server_session();
        session.set_clients().unwrap();
        let other = session.clone();
        session.use_chain(11155111).unwrap();
        assert_eq!(other.current_chain().unwrap().id, 11155111);
    }

    #[test]
    fn test_client_config_requires_connector_for_handles() {
        let connector = Arc::new(MockConnector::new(vec![Chain::anvil()]));
        let config = Config::prepare(RawConfig::new(
            "client",
            Options::client(connector, vec![Chain::anvil()]),
        ))
        .unwrap();
        let session = Session::new(config);
        assert!(!session.clients_exist(ClientKind::Wallet));
        session.set_clients().unwrap();
        assert!(session.clients_exist(ClientKind::Wallet));
    }
}
