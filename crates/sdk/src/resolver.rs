//! Contract identity verification and proxy implementation lookup.

use std::sync::Arc;

use alloy::{
    json_abi::JsonAbi,
    primitives::{Address, B256, U256, b256, keccak256},
    providers::Provider,
};

use crate::{
    abi::{AbiRegistry, ContractKind, IContractIdentity, normalize_kind},
    chain::{Chain, Transport},
    error::{Result, SdkError},
};

/// Storage slot holding the implementation address of an EIP-1967 proxy:
/// `keccak256("eip1967.proxy.implementation") - 1`.
pub const IMPLEMENTATION_SLOT: B256 =
    b256!("0x360894a13ba1a3210667c828492db98dca3e2076cc3735a920a3ca505d382bbc");

/// Computes [`IMPLEMENTATION_SLOT`].
pub fn implementation_slot() -> U256 {
    U256::from_be_bytes(keccak256("eip1967.proxy.implementation").0) - U256::from(1)
}

/// Contract expected at an address.
#[derive(Clone, Debug)]
pub struct ResolveRequest {
    pub address: Address,
    pub chain: Chain,
    pub expected_kind: ContractKind,
}

/// Verified contract address together with its interface.
#[derive(Clone, Debug)]
pub struct ResolvedParams {
    pub address: Address,
    pub abi: Arc<JsonAbi>,
    pub chain: Chain,
}

/// Verifies contract identities and binds interfaces from a registry.
#[derive(Clone, Debug)]
pub struct Resolver {
    registry: Arc<AbiRegistry>,
}

impl Resolver {
    pub fn new(registry: Arc<AbiRegistry>) -> Self {
        Self { registry }
    }

    /// Confirms that `request.address` hosts a contract of
    /// `request.expected_kind` and returns it bound to the interface of its
    /// reported version.
    ///
    /// Every failure is reported as [`SdkError::InvalidContract`] naming the
    /// chain; its cause tells unreadable type or version, kind mismatch and
    /// unknown version apart. An unknown version is recoverable by passing
    /// the interface explicitly instead of resolving.
    pub async fn resolve(
        &self,
        request: &ResolveRequest,
        transport: &Transport,
    ) -> Result<ResolvedParams> {
        let chain_name = request.chain.name();
        let invalid = |cause: SdkError| {
            tracing::warn!(address = %request.address, chain = chain_name, %cause, "contract verification failed");
            SdkError::invalid_contract(chain_name, cause)
        };

        if request.address.is_zero() {
            return Err(invalid(SdkError::ZeroAddress));
        }

        let provider = transport.provider();
        let contract = IContractIdentity::new(request.address, provider);

        let reported = contract
            .contractType()
            .call()
            .await
            .map_err(|err| invalid(SdkError::InvalidContractType(err.to_string())))?;
        let normalized = normalize_kind(&reported);
        if normalized != request.expected_kind.label() {
            return Err(invalid(SdkError::ContractTypeMismatch {
                expected: request.expected_kind,
                found: normalized,
            }));
        }

        let version = contract
            .version()
            .call()
            .await
            .map_err(|err| invalid(SdkError::InvalidContractVersion(err.to_string())))?;
        let abi = self.registry.get(request.expected_kind, &version).ok_or_else(|| {
            invalid(SdkError::AbiNotFound { kind: request.expected_kind, version: version.clone() })
        })?;

        tracing::debug!(
            address = %request.address,
            chain = chain_name,
            kind = %request.expected_kind,
            version = %version,
            "resolved contract"
        );
        Ok(ResolvedParams { address: request.address, abi, chain: request.chain.clone() })
    }
}

/// Current implementation address of the EIP-1967 proxy at `address`.
///
/// Returns [`Address::ZERO`] when the slot is empty, i.e. `address` is not a
/// proxy. Read failures are returned as is.
pub async fn implementation_of(transport: &Transport, address: Address) -> Result<Address> {
    let provider = transport.provider();
    let value = provider.get_storage_at(address, implementation_slot()).await?;
    Ok(Address::from_word(B256::from(value.to_be_bytes::<32>())))
}
