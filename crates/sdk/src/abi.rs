//! Contract kinds and their interface descriptions.
//!
//! Bundled interfaces live in `abi/<kind>/<version>.json` and are parsed on
//! first lookup. [`REVISION`] is the revision of the bundled set.

use std::{
    fmt,
    str::FromStr,
    sync::{Arc, LazyLock},
};

use alloy::json_abi::JsonAbi;
use dashmap::DashMap;
use itertools::Itertools;

use crate::error::SdkError;

/// Revision of the bundled interfaces.
pub const REVISION: &str = env!("ABI_REVISION");

alloy::sol! {
    /// Accessors every contract of the family exposes to identify itself.
    #[sol(rpc)]
    interface IContractIdentity {
        function contractType() external view returns (string);
        function version() external view returns (string);
    }
}

/// Kind of contract in the family.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ContractKind {
    Controller,
    Vault,
    VaultFactory,
    Token,
}

impl ContractKind {
    pub const ALL: [ContractKind; 4] =
        [ContractKind::Controller, ContractKind::Vault, ContractKind::VaultFactory, ContractKind::Token];

    /// Canonical label as reported on-chain.
    pub fn label(&self) -> &'static str {
        match self {
            ContractKind::Controller => "CONTROLLER",
            ContractKind::Vault => "VAULT",
            ContractKind::VaultFactory => "VAULT FACTORY",
            ContractKind::Token => "TOKEN",
        }
    }
}

impl fmt::Display for ContractKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ContractKind {
    type Err = SdkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = normalize_kind(s);
        ContractKind::ALL
            .into_iter()
            .find(|kind| kind.label() == normalized)
            .ok_or_else(|| SdkError::InvalidArgument(format!("unknown contract kind {s:?}")))
    }
}

/// Normalizes a self-reported contract kind: `"vault_factory"`,
/// `" Vault-Factory "` and `"VAULT  FACTORY"` all become `"VAULT FACTORY"`.
pub fn normalize_kind(reported: &str) -> String {
    reported
        .replace(['_', '-'], " ")
        .split_whitespace()
        .map(str::to_uppercase)
        .join(" ")
}

static BUNDLED: &[(ContractKind, &str, &str)] = &[
    (ContractKind::Controller, "1.0.0", include_str!("../abi/controller/1.0.0.json")),
    (ContractKind::Vault, "1.0.0", include_str!("../abi/vault/1.0.0.json")),
    (ContractKind::VaultFactory, "1.0.0", include_str!("../abi/vault_factory/1.0.0.json")),
    (ContractKind::Token, "1.0.0", include_str!("../abi/token/1.0.0.json")),
];

static BUILTIN: LazyLock<Arc<AbiRegistry>> = LazyLock::new(|| {
    let registry = AbiRegistry::empty();
    for (kind, version, json) in BUNDLED {
        match serde_json::from_str::<JsonAbi>(json) {
            Ok(abi) => registry.register(*kind, *version, abi),
            Err(err) => tracing::error!(%kind, version, %err, "bundled interface does not parse"),
        }
    }
    Arc::new(registry)
});

/// Mapping from (contract kind, version) to interface description.
#[derive(Debug, Default)]
pub struct AbiRegistry {
    entries: DashMap<(ContractKind, String), Arc<JsonAbi>>,
}

impl AbiRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Shared registry preloaded with the bundled interfaces.
    pub fn builtin() -> Arc<Self> {
        BUILTIN.clone()
    }

    /// Registers (or replaces) the interface of `kind` at `version`.
    pub fn register(&self, kind: ContractKind, version: impl Into<String>, abi: JsonAbi) {
        self.entries.insert((kind, version.into()), Arc::new(abi));
    }

    pub fn get(&self, kind: ContractKind, version: &str) -> Option<Arc<JsonAbi>> {
        self.entries
            .get(&(kind, version.to_string()))
            .map(|entry| entry.value().clone())
    }

    /// Versions registered for `kind`, sorted.
    pub fn versions(&self, kind: ContractKind) -> Vec<String> {
        self.entries
            .iter()
            .filter(|entry| entry.key().0 == kind)
            .map(|entry| entry.key().1.clone())
            .sorted()
            .collect()
    }
}
