//! Adaptive collection of traded tokens over a block range.
//!
//! The fetcher asks the node for every `Trade` log in the requested range at once. When the
//! query fails with an error the [`ErrorClassifier`](crate::classifier::ErrorClassifier)
//! recognises, the range is split in two at its midpoint and each half is fetched the same
//! way. Splitting stops when every piece succeeds, or fails with
//! [`FetchError::RangeExhausted`](crate::FetchError::RangeExhausted) once a single block
//! still cannot be queried.
//!
//! # Examples
//!
//! ```rust,no_run
//! use alloy::{eips::BlockNumberOrTag, providers::ProviderBuilder};
//! use settlement_tokens::{TradedTokensFetcherBuilder, robust_provider::RobustProviderBuilder};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let provider = ProviderBuilder::new().connect_http("http://localhost:8545".parse()?);
//! let robust = RobustProviderBuilder::fragile(provider).build().await?;
//!
//! let fetcher = TradedTokensFetcherBuilder::new().connect(robust).await?;
//! let traded = fetcher.get_all_traded_tokens(12_593_265, BlockNumberOrTag::Latest).await?;
//!
//! println!("{} tokens traded up to block {}", traded.tokens.len(), traded.to_block);
//! # Ok(()) }
//! ```

mod builder;
mod fetcher;
pub mod range;

pub use builder::TradedTokensFetcherBuilder;
pub use fetcher::{TradedTokens, TradedTokensFetcher};
pub use range::RangeEnd;
