//! Retrying, time-bounded wrapper around Alloy providers.
//!
//! [`RobustProvider`] wraps an Alloy [`RootProvider`](alloy::providers::RootProvider) and adds:
//! * bounded per-call timeouts
//! * exponential backoff retries
//! * transparent failover between a primary and one or more fallback providers
//! * [`RobustProvider::batch_get_logs`], which sends `eth_getLogs` and `eth_blockNumber` to the
//!   node as a single JSON-RPC batch
//!
//! Use [`RobustProviderBuilder`] to construct one, or rely on [`IntoRobustProvider`] to wrap
//! any supported provider with default settings.
//!
//! # Examples
//!
//! ```rust,no_run
//! use alloy::providers::ProviderBuilder;
//! use settlement_tokens::robust_provider::RobustProviderBuilder;
//! use std::time::Duration;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let http = ProviderBuilder::new().connect_http("http://localhost:8545".parse()?);
//! let http_fallback = ProviderBuilder::new().connect_http("http://localhost:8546".parse()?);
//!
//! let robust = RobustProviderBuilder::fragile(http)
//!     .fallback(http_fallback)
//!     .call_timeout(Duration::from_secs(30))
//!     .build()
//!     .await?;
//!
//! let block_number = robust.get_block_number().await?;
//! println!("Current block: {block_number}");
//! # Ok(()) }
//! ```

pub mod builder;
pub mod error;
pub mod provider;
pub mod provider_conversion;

pub use builder::*;
pub use error::Error;
pub use provider::{LogBatch, RobustProvider};
pub use provider_conversion::{IntoRobustProvider, IntoRootProvider};
