use std::fmt;

use thiserror::Error;

use crate::{abi::ContractKind, connector::ConnectorError, session::ClientKind};

/// Boxed underlying failure carried by [`SdkError::ContractInteractionFailed`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors surfaced by the SDK.
///
/// Precondition failures (mode gating, missing binding fields, unknown chain
/// IDs) are returned before any network access. Network failures are never
/// retried and are returned as soon as they happen.
#[derive(Debug, Error)]
pub enum SdkError {
    /// The operation is not available in the active SDK mode, or the mode
    /// tag itself is not recognized.
    #[error("invalid SDK mode: {0}")]
    InvalidSdkMode(String),

    /// A required parameter is absent.
    #[error("missing required params: {0}")]
    MissingRequiredParams(&'static str),

    /// The address does not host the expected contract.
    #[error("invalid contract on {chain}: {cause}")]
    InvalidContract {
        chain: String,
        #[source]
        cause: Box<SdkError>,
    },

    /// Reading the self-reported contract type failed.
    #[error("unable to read contract type: {0}")]
    InvalidContractType(String),

    /// Reading the self-reported contract version failed.
    #[error("unable to read contract version: {0}")]
    InvalidContractVersion(String),

    /// Reported contract type differs from the expected one.
    #[error("Contract Type and Expected Contract Type Does Not Match (expected {expected}, found {found})")]
    ContractTypeMismatch { expected: ContractKind, found: String },

    /// No bundled or registered interface for this type/version pair.
    #[error("interface not found for {kind} version {version}, supply it manually")]
    AbiNotFound { kind: ContractKind, version: String },

    /// Zero address given where a contract address is required.
    #[error("zero address is not a valid contract address")]
    ZeroAddress,

    #[error("invalid chain id: {id} (configured: {configured})")]
    InvalidChainId { id: u64, configured: String },

    #[error("invalid client type: {0}")]
    InvalidClientType(String),

    /// The handle set an operation needs has not been built.
    #[error("{0} client not found")]
    ClientNotFound(ClientKind),

    /// Read or write against a contract failed at the given step.
    #[error("contract interaction failed: {function} ({step}): {cause}")]
    ContractInteractionFailed {
        function: String,
        step: ExecutionStep,
        #[source]
        cause: BoxError,
    },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Transport(#[from] alloy::transports::TransportError),

    #[error(transparent)]
    Connector(#[from] ConnectorError),

    #[error(transparent)]
    Signature(#[from] alloy::primitives::SignatureError),

    #[error(transparent)]
    Signer(#[from] alloy::signers::Error),

    #[error(transparent)]
    Abi(#[from] alloy::dyn_abi::Error),
}

impl SdkError {
    /// Wraps `cause` as a failed interaction with `function`.
    pub(crate) fn interaction(
        function: impl Into<String>,
        step: ExecutionStep,
        cause: impl Into<BoxError>,
    ) -> Self {
        Self::ContractInteractionFailed { function: function.into(), step, cause: cause.into() }
    }

    pub(crate) fn invalid_contract(chain: impl Into<String>, cause: SdkError) -> Self {
        Self::InvalidContract { chain: chain.into(), cause: Box::new(cause) }
    }

    /// Underlying reason of [`SdkError::InvalidContract`], if this is one.
    pub fn contract_cause(&self) -> Option<&SdkError> {
        match self {
            Self::InvalidContract { cause, .. } => Some(cause),
            _ => None,
        }
    }
}

/// Step of contract interaction a failure happened at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ExecutionStep {
    Read,
    Simulate,
    Submit,
    Confirm,
}

impl fmt::Display for ExecutionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionStep::Read => write!(f, "read"),
            ExecutionStep::Simulate => write!(f, "simulate"),
            ExecutionStep::Submit => write!(f, "submit"),
            ExecutionStep::Confirm => write!(f, "confirm"),
        }
    }
}

pub type Result<T, E = SdkError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mismatch_message() {
        let err = SdkError::invalid_contract(
            "Sepolia",
            SdkError::ContractTypeMismatch {
                expected: ContractKind::Vault,
                found: "CONTROLLER".to_string(),
            },
        );
        let msg = err.to_string();
        assert!(msg.contains("Sepolia"));
        assert!(msg.contains("Contract Type and Expected Contract Type Does Not Match"));
        assert!(matches!(err.contract_cause(), Some(SdkError::ContractTypeMismatch { .. })));
    }

    #[test]
    fn test_interaction_names_function_and_step() {
        let err = SdkError::interaction("transfer", ExecutionStep::Submit, "nonce too low");
        assert_eq!(err.to_string(), "contract interaction failed: transfer (submit): nonce too low");
    }
}
