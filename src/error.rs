use alloy::{eips::BlockNumberOrTag, primitives::BlockNumber, sol_types};
use thiserror::Error;

use crate::{classifier::Classification, robust_provider::Error as ProviderError};

/// Errors returned by [`TradedTokensFetcher`](crate::TradedTokensFetcher).
///
/// Retryable provider failures never show up here unless they persist on a single block.
/// Every variant aborts the whole query; no partial results are returned.
#[derive(Error, Debug)]
pub enum FetchError {
    /// The provider failed in a way no classification rule recognises. The error is passed
    /// through unchanged.
    #[error(transparent)]
    Unrecognized(ProviderError),

    /// A single-block range still failed with a retryable error, so it cannot be split any
    /// further.
    #[error("too many events in block {block} ({classification})")]
    RangeExhausted {
        block: BlockNumber,
        classification: Classification,
        #[source]
        source: ProviderError,
    },

    /// The latest block number could not be resolved.
    #[error("failed to resolve the latest block number: {0}")]
    LatestBlock(#[source] ProviderError),

    /// A log returned for the `Trade` topic could not be decoded.
    #[error("failed to decode Trade log: {0}")]
    Decode(#[from] sol_types::Error),

    #[error("from_block {from} is greater than to_block {to}")]
    InvalidRange { from: BlockNumber, to: BlockNumber },

    #[error("from_block {from} exceeds the latest block {latest}")]
    BlockExceedsLatest { from: BlockNumber, latest: BlockNumber },

    #[error("unsupported block tag {0}, expected a block number or `latest`")]
    UnsupportedBlockTag(BlockNumberOrTag),
}

impl From<ProviderError> for FetchError {
    fn from(error: ProviderError) -> Self {
        FetchError::Unrecognized(error)
    }
}
