//! Contract wrappers bound to a session.
//!
//! Every wrapper owns a [`ContractBinding`] and passes it through
//! [`ContractBinding::require_present`] before any call reaches the
//! executor, so an incomplete binding never produces network traffic.

use std::sync::Arc;

use alloy::{
    dyn_abi::DynSolValue,
    json_abi::JsonAbi,
    primitives::{Address, U256},
};

use crate::{
    abi::ContractKind,
    chain::{self, ChainDescriptor},
    config::Mode,
    error::{Result, SdkError},
    executor::{self, ContractCall, TransactionResult},
    resolver::{ResolveRequest, ResolvedParams},
    session::SharedSession,
};

/// Address and interface a wrapper operates on.
#[derive(Clone, Debug)]
pub struct ContractBinding {
    kind: ContractKind,
    address: Option<Address>,
    abi: Option<Arc<JsonAbi>>,
}

impl ContractBinding {
    pub fn empty(kind: ContractKind) -> Self {
        Self { kind, address: None, abi: None }
    }

    pub fn new(kind: ContractKind, address: Address, abi: Arc<JsonAbi>) -> Self {
        Self { kind, address: Some(address), abi: Some(abi) }
    }

    pub fn kind(&self) -> ContractKind {
        self.kind
    }

    pub fn address(&self) -> Option<Address> {
        self.address
    }

    pub fn abi(&self) -> Option<&Arc<JsonAbi>> {
        self.abi.as_ref()
    }

    /// Address and interface, or [`SdkError::MissingRequiredParams`] naming
    /// the first one missing (interface first).
    pub fn require_present(&self) -> Result<(Address, &Arc<JsonAbi>)> {
        let abi = self.abi.as_ref().ok_or(SdkError::MissingRequiredParams("Contract Abi"))?;
        let address = self.address.ok_or(SdkError::MissingRequiredParams("Contract Address"))?;
        Ok((address, abi))
    }

    /// Replaces address and interface together.
    fn replace(&mut self, address: Address, abi: Arc<JsonAbi>) {
        self.address = Some(address);
        self.abi = Some(abi);
    }
}

/// Wrapper around one contract of the family.
#[derive(Clone, Debug)]
pub struct Contract {
    session: SharedSession,
    binding: ContractBinding,
}

impl Contract {
    /// Wrapper with no bound contract yet. Builds the session's handles if
    /// they do not exist.
    pub fn new(session: SharedSession, kind: ContractKind) -> Result<Self> {
        session.ensure_clients()?;
        Ok(Self { session, binding: ContractBinding::empty(kind) })
    }

    /// Wrapper bound to already known parameters, without verification.
    pub fn with_params(
        session: SharedSession,
        kind: ContractKind,
        address: Address,
        abi: Arc<JsonAbi>,
    ) -> Result<Self> {
        session.ensure_clients()?;
        Ok(Self { session, binding: ContractBinding::new(kind, address, abi) })
    }

    /// Wrapper bound to the contract at `address` on chain `chain_id`, after
    /// verifying its type and version.
    pub async fn resolve(
        session: SharedSession,
        kind: ContractKind,
        address: Address,
        chain_id: u64,
    ) -> Result<Self> {
        session.ensure_clients()?;
        let chain = chain::chain_by_id(session.config(), chain_id)?.clone();
        let resolved =
            session.resolve(&ResolveRequest { address, chain, expected_kind: kind }).await?;
        Ok(Self { session, binding: ContractBinding::new(kind, resolved.address, resolved.abi) })
    }

    pub fn session(&self) -> &SharedSession {
        &self.session
    }

    pub fn binding(&self) -> &ContractBinding {
        &self.binding
    }

    /// Chain the session is currently on.
    pub fn chain(&self) -> Result<ChainDescriptor> {
        self.session.current_chain()
    }

    /// Switches to another contract of the same kind.
    ///
    /// In server mode the session is first moved to `chain_id`, so the new
    /// contract is used on the chain it lives on. `chain_id` must be the chain
    /// `params` were resolved on.
    pub fn use_new_contract(&mut self, chain_id: u64, params: ResolvedParams) -> Result<()> {
        if params.address.is_zero() {
            return Err(SdkError::invalid_contract(params.chain.name(), SdkError::ZeroAddress));
        }
        if params.chain.id() != chain_id {
            return Err(SdkError::invalid_contract(
                params.chain.name(),
                SdkError::InvalidArgument(format!(
                    "contract resolved on chain {} cannot be used on chain {chain_id}",
                    params.chain.id()
                )),
            ));
        }
        if self.session.mode() == Mode::Server {
            self.session.use_chain(chain_id)?;
        }
        tracing::debug!(kind = %self.binding.kind, address = %params.address, chain = chain_id, "bound new contract");
        self.binding.replace(params.address, params.abi);
        Ok(())
    }

    /// Calls view function `function`.
    pub async fn read(&self, function: &str, args: Vec<DynSolValue>) -> Result<Vec<DynSolValue>> {
        let call = self.call(function, args)?;
        executor::read(&self.session, &call).await
    }

    /// Sends a transaction calling `function`, with optional native `value`.
    pub async fn write(
        &self,
        function: &str,
        args: Vec<DynSolValue>,
        value: Option<U256>,
    ) -> Result<TransactionResult> {
        let mut call = self.call(function, args)?;
        call.value = value;
        executor::write(&self.session, &call).await
    }

    fn call(&self, function: &str, args: Vec<DynSolValue>) -> Result<ContractCall> {
        let (address, abi) = self.binding.require_present()?;
        Ok(ContractCall::new(address, abi.clone(), function).with_args(args))
    }
}

/// Fungible token of the family.
#[derive(Clone, Debug)]
pub struct Token {
    contract: Contract,
}

impl Token {
    pub fn new(contract: Contract) -> Self {
        Self { contract }
    }

    pub fn contract(&self) -> &Contract {
        &self.contract
    }

    pub async fn name(&self) -> Result<String> {
        let value = single(self.contract.read("name", vec![]).await?)?;
        value.as_str().map(str::to_string).ok_or_else(|| unexpected(&value))
    }

    pub async fn symbol(&self) -> Result<String> {
        let value = single(self.contract.read("symbol", vec![]).await?)?;
        value.as_str().map(str::to_string).ok_or_else(|| unexpected(&value))
    }

    pub async fn decimals(&self) -> Result<u8> {
        let value = single(self.contract.read("decimals", vec![]).await?)?;
        value
            .as_uint()
            .and_then(|(decimals, _)| u8::try_from(decimals).ok())
            .ok_or_else(|| unexpected(&value))
    }

    pub async fn balance_of(&self, account: Address) -> Result<U256> {
        let value = single(self.contract.read("balanceOf", vec![DynSolValue::Address(account)]).await?)?;
        value.as_uint().map(|(balance, _)| balance).ok_or_else(|| unexpected(&value))
    }

    pub async fn transfer(&self, to: Address, amount: U256) -> Result<TransactionResult> {
        self.contract
            .write("transfer", vec![DynSolValue::Address(to), DynSolValue::Uint(amount, 256)], None)
            .await
    }

    pub async fn approve(&self, spender: Address, amount: U256) -> Result<TransactionResult> {
        self.contract
            .write("approve", vec![DynSolValue::Address(spender), DynSolValue::Uint(amount, 256)], None)
            .await
    }
}

/// The only returned value.
fn single(values: Vec<DynSolValue>) -> Result<DynSolValue> {
    let count = values.len();
    let mut values = values.into_iter();
    match (values.next(), values.next()) {
        (Some(value), None) => Ok(value),
        _ => Err(SdkError::InvalidArgument(format!("expected one return value, got {count}"))),
    }
}

fn unexpected(value: &DynSolValue) -> SdkError {
    SdkError::InvalidArgument(format!("unexpected return value {value:?}"))
}
