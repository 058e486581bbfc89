//! SDK configuration and its preparation.

use std::{collections::HashMap, fmt, str::FromStr, sync::Arc};

use alloy::signers::local::PrivateKeySigner;

use crate::{
    chain::{Chain, Transport},
    connector::WalletConnector,
    error::{Result, SdkError},
};

/// Execution context the SDK runs in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Browser-like context: a wallet connector holds accounts and signs.
    Client,
    /// Backend context: a single private key signs.
    Server,
}

impl FromStr for Mode {
    type Err = SdkError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "client" => Ok(Mode::Client),
            "server" => Ok(Mode::Server),
            other => Err(SdkError::InvalidSdkMode(format!("unknown mode {other:?}"))),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Client => write!(f, "client"),
            Mode::Server => write!(f, "server"),
        }
    }
}

/// Mode-specific options.
///
/// Client mode requires [`Options::connector`]; server mode requires
/// [`Options::private_key`] and at least one chain.
#[derive(Clone, Default, derive_more::Debug)]
pub struct Options {
    #[debug("{}", if connector.is_some() { "Some(..)" } else { "None" })]
    pub connector: Option<Arc<dyn WalletConnector>>,
    #[debug("{}", if private_key.is_some() { "Some(<redacted>)" } else { "None" })]
    pub private_key: Option<String>,
    pub chains: Vec<Chain>,
    /// Per-chain transports. Server mode fills this with one HTTP transport
    /// per configured chain when absent.
    pub transports: Option<HashMap<u64, Transport>>,
}

impl Options {
    pub fn client(connector: Arc<dyn WalletConnector>, chains: Vec<Chain>) -> Self {
        Self { connector: Some(connector), chains, ..Default::default() }
    }

    pub fn server(private_key: impl Into<String>, chains: Vec<Chain>) -> Self {
        Self { private_key: Some(private_key.into()), chains, ..Default::default() }
    }

    pub fn with_transport(mut self, chain_id: u64, transport: Transport) -> Self {
        self.transports.get_or_insert_with(HashMap::new).insert(chain_id, transport);
        self
    }
}

/// Configuration as supplied by the caller, not validated yet.
#[derive(Clone, Debug)]
pub struct RawConfig {
    pub mode: String,
    pub options: Options,
}

impl RawConfig {
    pub fn new(mode: impl Into<String>, options: Options) -> Self {
        Self { mode: mode.into(), options }
    }
}

impl From<Config> for RawConfig {
    fn from(config: Config) -> Self {
        Self { mode: config.mode.to_string(), options: config.options }
    }
}

/// Validated configuration. Immutable once prepared.
#[derive(Clone, Debug)]
pub struct Config {
    mode: Mode,
    options: Options,
}

impl Config {
    /// Validates `raw` and fills in defaults.
    ///
    /// Fails with [`SdkError::InvalidSdkMode`] for an unknown mode and with
    /// [`SdkError::MissingRequiredParams`] when the options required by the
    /// mode are absent. Preparing an already prepared config returns it
    /// unchanged.
    pub fn prepare(raw: RawConfig) -> Result<Self> {
        let mode: Mode = raw.mode.parse()?;
        let mut options = raw.options;

        match mode {
            Mode::Client => {
                if options.connector.is_none() {
                    return Err(SdkError::MissingRequiredParams("Wallet Connector Config"));
                }
            },
            Mode::Server => {
                let Some(key) = options.private_key.as_deref() else {
                    return Err(SdkError::MissingRequiredParams("Private Key"));
                };
                if options.chains.is_empty() {
                    return Err(SdkError::MissingRequiredParams("Chains"));
                }
                parse_private_key(key)?;
                if options.transports.is_none() {
                    options.transports = Some(
                        options
                            .chains
                            .iter()
                            .map(|chain| (chain.id(), Transport::Http(chain.rpc_url().clone())))
                            .collect(),
                    );
                }
            },
        }

        tracing::debug!(%mode, chains = options.chains.len(), "prepared SDK config");
        Ok(Self { mode, options })
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// First configured chain, the default binding for server handles.
    pub(crate) fn default_chain(&self) -> Option<&Chain> {
        self.options.chains.first()
    }
}

pub(crate) fn parse_private_key(key: &str) -> Result<PrivateKeySigner> {
    key.parse::<PrivateKeySigner>()
        .map_err(|err| SdkError::InvalidArgument(format!("invalid private key: {err}")))
}
