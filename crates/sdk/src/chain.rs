//! Chain registry.
//!
//! Chains available to a [`Config`] and the transports used to reach them.
//! Everything here is a pure function of the configuration.

use std::fmt;

use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{
    config::Config,
    error::{Result, SdkError},
};

/// Native currency of a chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeCurrency {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

impl NativeCurrency {
    pub fn ether() -> Self {
        Self { name: "Ether".to_string(), symbol: "ETH".to_string(), decimals: 18 }
    }
}

/// Chain the contracts are deployed on.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chain {
    id: u64,
    name: String,
    native_currency: NativeCurrency,
    rpc_url: Url,
}

impl Chain {
    pub fn mainnet() -> Self {
        Self::custom(1, "Ethereum", NativeCurrency::ether(), default_url("https://eth.merkle.io"))
    }

    pub fn sepolia() -> Self {
        Self::custom(
            11155111,
            "Sepolia",
            NativeCurrency {
                name: "Sepolia Ether".to_string(),
                symbol: "ETH".to_string(),
                decimals: 18,
            },
            default_url("https://sepolia.drpc.org"),
        )
    }

    /// Local development node.
    pub fn anvil() -> Self {
        Self::custom(31337, "Anvil", NativeCurrency::ether(), default_url("http://127.0.0.1:8545"))
    }

    pub fn custom(
        id: u64,
        name: impl Into<String>,
        native_currency: NativeCurrency,
        rpc_url: Url,
    ) -> Self {
        Self { id, name: name.into(), native_currency, rpc_url }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn native_currency(&self) -> &NativeCurrency {
        &self.native_currency
    }

    /// Default RPC endpoint, used when no explicit transport is configured.
    pub fn rpc_url(&self) -> &Url {
        &self.rpc_url
    }

    pub fn descriptor(&self) -> ChainDescriptor {
        ChainDescriptor {
            id: self.id,
            name: self.name.clone(),
            native_symbol: self.native_currency.symbol.clone(),
        }
    }
}

fn default_url(url: &str) -> Url {
    // Preset URLs are literals known to parse.
    Url::parse(url).unwrap_or_else(|_| unreachable!("invalid preset RPC URL {url}"))
}

/// Read-only view of the chain a client handle is bound to.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "display", derive(tabled::Tabled))]
pub struct ChainDescriptor {
    pub id: u64,
    pub name: String,
    pub native_symbol: String,
}

impl fmt::Display for ChainDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (#{}, {})", self.name, self.id, self.native_symbol)
    }
}

/// How to reach a chain's JSON-RPC endpoint.
#[derive(Clone, Debug)]
pub enum Transport {
    Http(Url),
    /// In-memory transport answering from a queue of canned responses.
    #[cfg(any(test, feature = "testing"))]
    Mocked(alloy::transports::mock::Asserter),
}

impl Transport {
    /// Read-only provider over this transport.
    pub fn provider(&self) -> DynProvider {
        match self {
            Transport::Http(url) => ProviderBuilder::new().connect_http(url.clone()).erased(),
            #[cfg(any(test, feature = "testing"))]
            Transport::Mocked(asserter) => {
                ProviderBuilder::new().connect_mocked_client(asserter.clone()).erased()
            },
        }
    }

    /// Provider over this transport which fills and signs transactions with
    /// `wallet`.
    pub fn signing_provider(&self, wallet: alloy::network::EthereumWallet) -> DynProvider {
        match self {
            Transport::Http(url) => {
                ProviderBuilder::new().wallet(wallet).connect_http(url.clone()).erased()
            },
            #[cfg(any(test, feature = "testing"))]
            Transport::Mocked(asserter) => {
                ProviderBuilder::new().wallet(wallet).connect_mocked_client(asserter.clone()).erased()
            },
        }
    }
}

impl From<Url> for Transport {
    fn from(url: Url) -> Self {
        Transport::Http(url)
    }
}

/// Chains available to the configuration.
pub fn chains(config: &Config) -> Vec<ChainDescriptor> {
    config.options().chains.iter().map(Chain::descriptor).collect()
}

/// Configured chain with the given ID.
pub fn chain_by_id(config: &Config, id: u64) -> Result<&Chain> {
    config
        .options()
        .chains
        .iter()
        .find(|chain| chain.id == id)
        .ok_or_else(|| invalid_chain_id(config, id))
}

/// Transport for chain `id`: the explicitly configured one if any, otherwise
/// HTTP to the chain's default RPC URL.
pub fn transport(config: &Config, id: u64) -> Result<Transport> {
    let chain = chain_by_id(config, id)?;
    Ok(config
        .options()
        .transports
        .as_ref()
        .and_then(|transports| transports.get(&id).cloned())
        .unwrap_or_else(|| Transport::Http(chain.rpc_url.clone())))
}

pub(crate) fn invalid_chain_id(config: &Config, id: u64) -> SdkError {
    SdkError::InvalidChainId {
        id,
        configured: config.options().chains.iter().map(Chain::id).join(", "),
    }
}

/// Renders chain descriptors as a table.
#[cfg(feature = "display")]
pub fn render(chains: &[ChainDescriptor]) -> String {
    use tabled::{Table, settings::Style};

    let mut table = Table::new(chains);
    table.with(Style::sharp());
    table.to_string()
}
