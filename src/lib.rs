//! Collects every token traded through a settlement contract over a range of blocks.
//!
//! The main entry point is [`TradedTokensFetcher::get_all_traded_tokens`], built with
//! [`TradedTokensFetcherBuilder`]. It returns the sorted, de-duplicated addresses of all tokens
//! bought or sold by `Trade` events in the range, together with the last block the result
//! covers.
//!
//! # Provider limits
//!
//! Nodes cap the size and duration of `eth_getLogs` queries and report the cap in free-form
//! error messages. Failures recognised by the [`classifier::ErrorClassifier`] are worked around
//! by bisecting the block range; anything else is returned unchanged as
//! [`FetchError::Unrecognized`]. No partial results are ever returned.
//!
//! # Latest block
//!
//! When the range is open-ended, the latest block number is requested in the same JSON-RPC
//! batch as the first log query, so both answers come from the same node. The resolved head is
//! reported as [`TradedTokens::to_block`].
//!
//! # Robust providers
//!
//! The [`robust_provider`] module provides [`robust_provider::RobustProvider`], a wrapper that
//! adds timeouts, retries and failover across multiple RPC endpoints.

#[macro_use]
mod logging;

pub mod classifier;
pub mod log_source;
pub mod range_fetcher;
pub mod robust_provider;
pub mod token_set;
pub mod trade;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

mod error;

pub use classifier::{Classification, ErrorClassifier};
pub use error::FetchError;
pub use log_source::{DispatchedQuery, LogSource};
pub use range_fetcher::{RangeEnd, TradedTokens, TradedTokensFetcher, TradedTokensFetcherBuilder};
pub use trade::{DEFAULT_SETTLEMENT_ADDRESS, NATIVE_TOKEN_PLACEHOLDER};
