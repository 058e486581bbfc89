//! Uniform contract reads and writes over either session backend.
//!
//! Writes always run simulate → submit → confirm: the call is dry-run from
//! the signing account, the prepared request is submitted and the hash is
//! known right away, then the receipt is awaited. A failure at any step is
//! returned as [`SdkError::ContractInteractionFailed`] naming the function
//! and the step.

use std::sync::Arc;

use alloy::{
    dyn_abi::{DynSolValue, FunctionExt, JsonAbiExt},
    json_abi::{Function, JsonAbi},
    network::{ReceiptResponse, TransactionBuilder},
    primitives::{Address, TxHash, U256},
    rpc::types::{TransactionReceipt, TransactionRequest},
};

use crate::{
    error::{BoxError, ExecutionStep, Result, SdkError},
    session::{ClientKind, Execution, Session},
};

/// Call of a contract function through its interface.
#[derive(Clone, Debug)]
pub struct ContractCall {
    pub address: Address,
    pub abi: Arc<JsonAbi>,
    pub function: String,
    pub args: Vec<DynSolValue>,
    /// Native value attached to a write.
    pub value: Option<U256>,
}

impl ContractCall {
    pub fn new(address: Address, abi: Arc<JsonAbi>, function: impl Into<String>) -> Self {
        Self { address, abi, function: function.into(), args: Vec::new(), value: None }
    }

    pub fn with_args(mut self, args: Vec<DynSolValue>) -> Self {
        self.args = args;
        self
    }

    pub fn with_value(mut self, value: U256) -> Self {
        self.value = Some(value);
        self
    }

    /// Overload of the function matching the number of arguments.
    fn resolve_function(&self) -> Result<&Function, BoxError> {
        let overloads = self
            .abi
            .function(&self.function)
            .ok_or_else(|| format!("function {} not found in interface", self.function))?;
        overloads
            .iter()
            .find(|f| f.inputs.len() == self.args.len())
            .ok_or_else(|| {
                format!("function {} does not take {} arguments", self.function, self.args.len())
                    .into()
            })
    }

    fn request(&self, function: &Function, from: Option<Address>) -> Result<TransactionRequest, BoxError> {
        let input = function.abi_encode_input(&self.args)?;
        let mut tx = TransactionRequest::default().with_to(self.address).with_input(input);
        if let Some(value) = self.value {
            tx = tx.with_value(value);
        }
        if let Some(from) = from {
            tx = tx.with_from(from);
        }
        Ok(tx)
    }
}

/// Outcome of a submitted transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransactionStatus {
    Success,
    /// Mined, but execution reverted.
    Reverted,
}

/// Result of a write, the same for both session backends.
#[derive(Clone, Debug)]
pub struct TransactionResult {
    pub status: TransactionStatus,
    /// Values the simulation returned.
    pub result: Vec<DynSolValue>,
    pub tx_hash: TxHash,
    pub receipt: TransactionReceipt,
}

#[cfg(feature = "display")]
impl std::fmt::Display for TransactionResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use colored::Colorize;

        let status = match self.status {
            TransactionStatus::Success => "success".green(),
            TransactionStatus::Reverted => "reverted".red(),
        };
        write!(f, "{} {}", format!("Tx {}", self.tx_hash).blue(), status)?;
        if let Some(block) = self.receipt.block_number {
            write!(f, " in block #{block}")?;
        }
        write!(f, " (gas used: {})", self.receipt.gas_used)
    }
}

/// Dry-run of a write: the request ready for submission and its return
/// values.
#[derive(Clone, Debug)]
pub struct Simulated {
    pub request: TransactionRequest,
    pub result: Vec<DynSolValue>,
}

/// Calls a view function.
pub async fn read(session: &Session, call: &ContractCall) -> Result<Vec<DynSolValue>> {
    let execution = session.execution()?;
    let fail = |cause: BoxError| SdkError::interaction(&call.function, ExecutionStep::Read, cause);

    let function = call.resolve_function().map_err(fail)?;
    let tx = call.request(function, None).map_err(fail)?;
    let output = execution.call(tx).await.map_err(fail)?;
    let values = function.abi_decode_output(&output).map_err(|err| fail(err.into()))?;
    tracing::debug!(address = %call.address, function = %call.function, client = %execution.kind(), "read contract");
    Ok(values)
}

/// Dry-runs a write from the session's signing account.
pub async fn simulate(session: &Session, call: &ContractCall) -> Result<Simulated> {
    simulate_with(&*session.execution()?, call).await
}

/// Simulates, submits and confirms a write.
///
/// A transaction that is mined but reverts is not an error: check
/// [`TransactionResult::status`] for [`TransactionStatus::Reverted`].
pub async fn write(session: &Session, call: &ContractCall) -> Result<TransactionResult> {
    let execution = session.execution()?;
    let simulated = simulate_with(&*execution, call).await?;

    let tx_hash = execution
        .send(simulated.request)
        .await
        .map_err(|cause| SdkError::interaction(&call.function, ExecutionStep::Submit, cause))?;
    tracing::info!(%tx_hash, function = %call.function, client = %execution.kind(), "submitted transaction");

    let receipt = execution
        .receipt(tx_hash)
        .await
        .map_err(|cause| SdkError::interaction(&call.function, ExecutionStep::Confirm, cause))?;
    let status = if ReceiptResponse::status(&receipt) {
        TransactionStatus::Success
    } else {
        TransactionStatus::Reverted
    };
    tracing::info!(%tx_hash, block = ?receipt.block_number, ?status, "confirmed transaction");

    Ok(TransactionResult { status, result: simulated.result, tx_hash, receipt })
}

async fn simulate_with(execution: &dyn Execution, call: &ContractCall) -> Result<Simulated> {
    let fail = |cause: BoxError| SdkError::interaction(&call.function, ExecutionStep::Simulate, cause);

    let from = execution.account().ok_or(SdkError::ClientNotFound(ClientKind::Wallet))?;
    let function = call.resolve_function().map_err(fail)?;
    let request = call.request(function, Some(from)).map_err(fail)?;
    let output = execution.call(request.clone()).await.map_err(fail)?;
    let result = function.abi_decode_output(&output).map_err(|err| fail(err.into()))?;
    Ok(Simulated { request, result })
}

#[cfg(test)]
mod tests {
    use alloy::primitives::Bytes;
    use alloy_sol_types::SolValue;

    use super::*;
    use crate::{abi::{AbiRegistry, ContractKind}, testing};

    fn token_call(function: &str, args: Vec<DynSolValue>) -> ContractCall {
        let abi = AbiRegistry::builtin().get(ContractKind::Token, "1.0.0").unwrap();
        ContractCall::new(testing::CONTRACT, abi, function).with_args(args)
    }

    #[tokio::test]
    async fn test_client_read() {
        let (session, connector) = testing::client_session();
        session.ensure_clients().unwrap();
        connector.push_call(Ok(Bytes::from(U256::from(1000).abi_encode())));

        let holder = testing::signer(0).address();
        let values =
            read(&session, &token_call("balanceOf", vec![DynSolValue::Address(holder)])).await.unwrap();
        assert_eq!(values, vec![DynSolValue::Uint(U256::from(1000), 256)]);
        assert_eq!(connector.calls("call"), 1);
        assert_eq!(connector.last_call().unwrap().from, None);
    }

    #[tokio::test]
    async fn test_read_failure_names_function() {
        let (session, connector) = testing::client_session();
        session.ensure_clients().unwrap();
        connector.push_call(Err(crate::connector::ConnectorError::Rpc("timeout".to_string())));

        let err = read(&session, &token_call("totalSupply", vec![])).await.unwrap_err();
        assert!(matches!(
            &err,
            SdkError::ContractInteractionFailed { function, step: ExecutionStep::Read, .. } if function == "totalSupply"
        ));
        assert!(err.to_string().contains("timeout"));
    }

    #[tokio::test]
    async fn test_unknown_function_fails_before_network() {
        let (session, connector) = testing::client_session();
        session.ensure_clients().unwrap();

        let err = read(&session, &token_call("mint", vec![])).await.unwrap_err();
        assert!(matches!(err, SdkError::ContractInteractionFailed { step: ExecutionStep::Read, .. }));
        let err = read(&session, &token_call("balanceOf", vec![])).await.unwrap_err();
        assert!(err.to_string().contains("does not take 0 arguments"));
        assert_eq!(connector.calls("call"), 0);
    }

    #[tokio::test]
    async fn test_client_write() {
        let (session, connector) = testing::client_session();
        session.ensure_clients().unwrap();
        session.connect("injected", None).await.unwrap();
        connector.push_call(Ok(Bytes::from(true.abi_encode())));

        let call = token_call(
            "transfer",
            vec![DynSolValue::Address(testing::signer(1).address()), DynSolValue::Uint(U256::from(5), 256)],
        );
        let result = write(&session, &call).await.unwrap();
        assert_eq!(result.status, TransactionStatus::Success);
        assert_eq!(result.result, vec![DynSolValue::Bool(true)]);
        assert_eq!(result.receipt.transaction_hash, result.tx_hash);
        assert_eq!(connector.calls("send_transaction"), 1);
        assert_eq!(connector.calls("wait_for_receipt"), 1);

        let sent = connector.last_sent().unwrap();
        assert_eq!(sent.from, Some(testing::signer(0).address()));
        assert_eq!(sent.to, Some(testing::CONTRACT.into()));
    }

    #[tokio::test]
    async fn test_simulate_prepares_signed_request() {
        let (session, connector) = testing::client_session();
        session.ensure_clients().unwrap();
        session.connect("walletConnect", None).await.unwrap();
        connector.push_call(Ok(Bytes::from(true.abi_encode())));

        let call = token_call(
            "transfer",
            vec![DynSolValue::Address(testing::signer(0).address()), DynSolValue::Uint(U256::from(9), 256)],
        )
        .with_value(U256::ZERO);
        let simulated = simulate(&session, &call).await.unwrap();
        assert_eq!(simulated.request.from, Some(testing::signer(1).address()));
        assert_eq!(simulated.request.value, Some(U256::ZERO));
        assert_eq!(simulated.result, vec![DynSolValue::Bool(true)]);
        assert_eq!(connector.calls("send_transaction"), 0);
    }

    #[tokio::test]
    async fn test_write_reports_failing_step() {
        let (session, connector) = testing::client_session();
        session.ensure_clients().unwrap();
        session.connect("injected", None).await.unwrap();
        let call = token_call(
            "approve",
            vec![DynSolValue::Address(testing::signer(1).address()), DynSolValue::Uint(U256::MAX, 256)],
        );

        connector.push_call(Err(crate::connector::ConnectorError::Reverted("paused".to_string())));
        let err = write(&session, &call).await.unwrap_err();
        assert!(matches!(err, SdkError::ContractInteractionFailed { step: ExecutionStep::Simulate, .. }));
        assert_eq!(connector.calls("send_transaction"), 0);

        connector.push_call(Ok(Bytes::from(true.abi_encode())));
        connector.fail_next_send(crate::connector::ConnectorError::Rejected("user denied".to_string()));
        let err = write(&session, &call).await.unwrap_err();
        assert!(matches!(&err, SdkError::ContractInteractionFailed { function, step: ExecutionStep::Submit, .. } if function == "approve"));
        assert_eq!(connector.calls("wait_for_receipt"), 0);

        connector.push_call(Ok(Bytes::from(true.abi_encode())));
        connector.fail_next_receipt(crate::connector::ConnectorError::Rpc("dropped".to_string()));
        let err = write(&session, &call).await.unwrap_err();
        assert!(matches!(err, SdkError::ContractInteractionFailed { step: ExecutionStep::Confirm, .. }));
    }

    #[tokio::test]
    async fn test_reverted_receipt() {
        let (session, connector) = testing::client_session();
        session.ensure_clients().unwrap();
        session.connect("injected", None).await.unwrap();
        connector.push_call(Ok(Bytes::from(true.abi_encode())));
        connector.revert_next_receipt();

        let call = token_call(
            "transfer",
            vec![DynSolValue::Address(testing::signer(1).address()), DynSolValue::Uint(U256::from(1), 256)],
        );
        let result = write(&session, &call).await.unwrap();
        assert_eq!(result.status, TransactionStatus::Reverted);
    }

    #[tokio::test]
    async fn test_server_simulation_failure() {
        let (session, asserter) = testing::server_session();
        session.set_clients().unwrap();
        asserter.push_failure_msg("execution reverted: insufficient balance");

        let call = token_call(
            "transfer",
            vec![DynSolValue::Address(testing::signer(1).address()), DynSolValue::Uint(U256::from(5), 256)],
        );
        let err = write(&session, &call).await.unwrap_err();
        assert!(matches!(&err, SdkError::ContractInteractionFailed { function, step: ExecutionStep::Simulate, .. } if function == "transfer"));
        assert!(err.to_string().contains("insufficient balance"));
    }

    #[tokio::test]
    async fn test_server_read() {
        let (session, asserter) = testing::server_session();
        session.set_clients().unwrap();
        asserter.push_success(&Bytes::from(U256::from(18).abi_encode()));

        let values = read(&session, &token_call("decimals", vec![])).await.unwrap();
        assert_eq!(values, vec![DynSolValue::Uint(U256::from(18), 8)]);
    }

    #[tokio::test]
    async fn test_write_requires_connected_account() {
        let (session, connector) = testing::client_session();
        session.ensure_clients().unwrap();
        let call = token_call(
            "transfer",
            vec![DynSolValue::Address(testing::signer(1).address()), DynSolValue::Uint(U256::from(5), 256)],
        );

        let err = write(&session, &call).await.unwrap_err();
        assert!(matches!(err, SdkError::ClientNotFound(ClientKind::Wallet)));
        let err = simulate(&session, &call).await.unwrap_err();
        assert!(matches!(err, SdkError::ClientNotFound(ClientKind::Wallet)));
        assert_eq!(connector.calls("call"), 0);
        assert_eq!(connector.calls("send_transaction"), 0);
    }

    #[tokio::test]
    async fn test_server_write() {
        let (session, asserter) = testing::server_session();
        session.set_clients().unwrap();
        let from = testing::signer(0).address();
        let tx_hash = TxHash::repeat_byte(0xab);

        asserter.push_success(&Bytes::from(true.abi_encode()));
        testing::push_submission(&asserter, 31337, 0, tx_hash);
        asserter.push_success(&testing::receipt_json(tx_hash, from, Some(testing::CONTRACT), true));

        let call = token_call(
            "approve",
            vec![DynSolValue::Address(testing::signer(1).address()), DynSolValue::Uint(U256::from(7), 256)],
        );
        let result = write(&session, &call).await.unwrap();
        assert_eq!(result.status, TransactionStatus::Success);
        assert_eq!(result.tx_hash, tx_hash);
        assert_eq!(result.result, vec![DynSolValue::Bool(true)]);
        assert_eq!(result.receipt.transaction_hash, tx_hash);
        assert_eq!(result.receipt.from, from);
    }

    #[tokio::test]
    async fn test_server_write_polls_until_mined() {
        let (session, asserter) = testing::server_session();
        session.set_clients().unwrap();
        let from = testing::signer(0).address();
        let tx_hash = TxHash::repeat_byte(0xcd);

        asserter.push_success(&Bytes::from(true.abi_encode()));
        testing::push_submission(&asserter, 31337, 4, tx_hash);
        asserter.push_success(&serde_json::Value::Null);
        asserter.push_success(&testing::receipt_json(tx_hash, from, Some(testing::CONTRACT), false));

        let call = token_call(
            "transfer",
            vec![DynSolValue::Address(testing::signer(2).address()), DynSolValue::Uint(U256::from(1), 256)],
        );
        let result = write(&session, &call).await.unwrap();
        assert_eq!(result.status, TransactionStatus::Reverted);
        assert_eq!(result.tx_hash, tx_hash);
    }

    #[tokio::test]
    async fn test_missing_clients() {
        let (session, _) = testing::server_session();
        let err = read(&session, &token_call("decimals", vec![])).await.unwrap_err();
        assert!(matches!(err, SdkError::ClientNotFound(ClientKind::RpcPair)));
    }
}
