//! Message and typed-data signatures over the session's signer.
//!
//! Signing goes through the live handle set: the connected wallet account in
//! client mode, the bound key in server mode. Verification, recovery and
//! hashing are local computations.

use alloy::{
    dyn_abi::TypedData,
    primitives::{Address, B256, Bytes, Signature, eip191_hash_message},
};

use crate::{
    error::{Result, SdkError},
    session::SharedSession,
};

/// Plain message to sign with EIP-191.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SignableMessage {
    /// UTF-8 text, signed as its bytes.
    Text(String),
    /// Arbitrary bytes.
    Raw(Bytes),
}

impl SignableMessage {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            SignableMessage::Text(text) => text.as_bytes(),
            SignableMessage::Raw(bytes) => &bytes[..],
        }
    }
}

impl From<&str> for SignableMessage {
    fn from(text: &str) -> Self {
        SignableMessage::Text(text.to_string())
    }
}

impl From<String> for SignableMessage {
    fn from(text: String) -> Self {
        SignableMessage::Text(text)
    }
}

impl From<Bytes> for SignableMessage {
    fn from(bytes: Bytes) -> Self {
        SignableMessage::Raw(bytes)
    }
}

/// Pending message and typed data of one signing flow. Setting either
/// replaces the previous one.
#[derive(Clone, Debug)]
pub struct Signatures {
    session: SharedSession,
    message: Option<SignableMessage>,
    typed_data: Option<TypedData>,
}

impl Signatures {
    pub fn new(session: SharedSession) -> Self {
        Self { session, message: None, typed_data: None }
    }

    pub fn message(&self) -> Option<&SignableMessage> {
        self.message.as_ref()
    }

    pub fn typed_data(&self) -> Option<&TypedData> {
        self.typed_data.as_ref()
    }

    pub fn set_message(&mut self, message: impl Into<SignableMessage>) -> &mut Self {
        self.message = Some(message.into());
        self
    }

    pub fn set_typed_data(&mut self, typed_data: TypedData) -> &mut Self {
        self.typed_data = Some(typed_data);
        self
    }

    pub async fn sign_message(&self) -> Result<Signature> {
        let execution = self.session.execution()?;
        let message = self.pending_message()?;
        let signature = execution.sign_message(message.as_bytes()).await?;
        tracing::debug!(client = %execution.kind(), signer = ?execution.account(), "signed message");
        Ok(signature)
    }

    pub async fn sign_typed_data(&self) -> Result<Signature> {
        let execution = self.session.execution()?;
        let typed_data = self.pending_typed_data()?;
        let signature = execution.sign_typed_data(typed_data).await?;
        tracing::debug!(client = %execution.kind(), primary_type = %typed_data.primary_type, "signed typed data");
        Ok(signature)
    }

    /// EIP-191 hash of the pending message.
    pub fn hash_message(&self) -> Result<B256> {
        Ok(eip191_hash_message(self.pending_message()?.as_bytes()))
    }

    /// EIP-712 signing hash of the pending typed data.
    pub fn hash_typed_data(&self) -> Result<B256> {
        Ok(self.pending_typed_data()?.eip712_signing_hash()?)
    }

    pub fn recover_message_address(&self, signature: &Signature) -> Result<Address> {
        Ok(signature.recover_address_from_msg(self.pending_message()?.as_bytes())?)
    }

    pub fn recover_typed_data_address(&self, signature: &Signature) -> Result<Address> {
        Ok(signature.recover_address_from_prehash(&self.hash_typed_data()?)?)
    }

    /// Whether `signature` over the pending message was made by `signer`,
    /// or by the session's account when `signer` is `None`.
    pub fn verify_message(&self, signature: &Signature, signer: Option<Address>) -> Result<bool> {
        let expected = self.expected_signer(signer)?;
        Ok(self.recover_message_address(signature)? == expected)
    }

    /// Typed-data counterpart of [`Self::verify_message`].
    pub fn verify_typed_data(&self, signature: &Signature, signer: Option<Address>) -> Result<bool> {
        let expected = self.expected_signer(signer)?;
        Ok(self.recover_typed_data_address(signature)? == expected)
    }

    fn expected_signer(&self, signer: Option<Address>) -> Result<Address> {
        signer
            .or_else(|| self.session.account())
            .ok_or(SdkError::ClientNotFound(self.session.active_kind()))
    }

    fn pending_message(&self) -> Result<&SignableMessage> {
        self.message.as_ref().ok_or(SdkError::MissingRequiredParams("Message"))
    }

    fn pending_typed_data(&self) -> Result<&TypedData> {
        self.typed_data.as_ref().ok_or(SdkError::MissingRequiredParams("Typed Data"))
    }
}
