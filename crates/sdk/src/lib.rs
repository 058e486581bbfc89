//! Vault contract family SDK.
//!
//! # Overview
//!
//! Runtime core for talking to the controller, vault, vault factory and
//! token contracts of one on-chain family, either from a browser-like context
//! where a wallet connector holds the accounts ([`config::Mode::Client`]) or
//! from a backend holding a private key ([`config::Mode::Server`]).
//!
//! Prepare a [`config::Config`], create a [`session::Session`] from it and
//! hand the shared session to every [`contract::Contract`] wrapper. Use
//! [`contract::Contract::resolve`] to verify the contract at an address
//! reports the expected kind and to bind the interface of its version, then
//! [`contract::Contract::read`] / [`contract::Contract::write`].
//!
//! Writes are simulated from the signing account, submitted, then confirmed;
//! [`executor::TransactionResult`] has the same shape in both modes.
//! [`signature::Signatures`] signs and verifies messages and EIP-712 typed
//! data with the same signer.
//!
//! See `./tests` for examples.
//!
//! # Logging
//!
//! The SDK emits [`tracing`] events and never installs a subscriber.
//!
//! # Features
//!
//! | Feature | Default | Description |
//! | --- | --- | --- |
//! | `display` | yes | Enables [`std::fmt::Display`] implementation for transaction results and chain tables. |
//! | `testing` | yes | Enables [`testing`] module. |
//!
//! # Testing
//!
//! [`testing`] module provides sessions without a live network: server mode
//! over alloy's mocked transport, client mode over an in-memory wallet
//! connector.

pub mod abi;
pub mod chain;
pub mod config;
pub mod connector;
pub mod contract;
pub mod error;
pub mod executor;
pub mod resolver;
pub mod session;
pub mod signature;
pub mod subscription;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use error::{Result, SdkError};
