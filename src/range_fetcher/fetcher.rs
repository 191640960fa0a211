use std::{ops::RangeInclusive, sync::Arc};

use alloy::{
    eips::BlockNumberOrTag,
    primitives::{Address, BlockNumber},
    rpc::types::{Filter, Log},
    sol_types::SolEvent,
};
use futures::future::{BoxFuture, FutureExt};

use crate::{
    FetchError,
    classifier::ErrorClassifier,
    log_source::LogSource,
    range_fetcher::range::{RangeEnd, bisect},
    robust_provider::Error as ProviderError,
    token_set::TokenSet,
    trade::{Trade, TradeDecoder},
};

/// Tokens traded in a block range, and the block up to which that list is complete.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TradedTokens {
    /// Unique token addresses, sorted, without the native currency placeholder.
    pub tokens: Vec<Address>,
    /// Last block covered. For an open-ended query this is the head observed by the node.
    pub to_block: BlockNumber,
}

struct RangeTokens {
    tokens: TokenSet,
    to_block: BlockNumber,
}

/// Collects the tokens of every `Trade` emitted by a settlement contract.
///
/// Log queries that fail because of provider limits are retried by bisecting the block
/// range until every piece succeeds or a single block still fails.
///
/// Built with [`TradedTokensFetcherBuilder`](super::TradedTokensFetcherBuilder).
pub struct TradedTokensFetcher<S> {
    pub(crate) source: S,
    pub(crate) settlement: Address,
    pub(crate) native_token_placeholder: Address,
    pub(crate) classifier: ErrorClassifier,
    pub(crate) decoder: Arc<dyn TradeDecoder>,
    pub(crate) concurrent_splits: bool,
}

impl<S> std::fmt::Debug for TradedTokensFetcher<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TradedTokensFetcher")
            .field("settlement", &self.settlement)
            .field("native_token_placeholder", &self.native_token_placeholder)
            .field("classifier", &self.classifier)
            .field("concurrent_splits", &self.concurrent_splits)
            .finish_non_exhaustive()
    }
}

impl<S: LogSource> TradedTokensFetcher<S> {
    #[must_use]
    pub fn source(&self) -> &S {
        &self.source
    }

    #[must_use]
    pub fn settlement(&self) -> Address {
        self.settlement
    }

    /// Returns every token bought or sold in `[from_block, to_block]`.
    ///
    /// `to_block` may be a block number, [`BlockNumberOrTag::Latest`] or
    /// [`BlockNumberOrTag::Earliest`]. For `Latest` the head is requested in the same batch as
    /// the first log query and resolved once for the whole call.
    ///
    /// # Errors
    ///
    /// * [`FetchError::InvalidRange`] if `from_block > to_block`
    /// * [`FetchError::UnsupportedBlockTag`] for tags other than the ones above
    /// * [`FetchError::BlockExceedsLatest`] if `from_block` is past the resolved head
    /// * [`FetchError::RangeExhausted`] if a single block still fails with a retryable error
    /// * [`FetchError::Unrecognized`] for any failure the classifier does not recognise
    /// * [`FetchError::LatestBlock`] if the head cannot be resolved
    /// * [`FetchError::Decode`] if a `Trade` log is malformed
    pub async fn get_all_traded_tokens(
        &self,
        from_block: BlockNumber,
        to_block: impl Into<BlockNumberOrTag>,
    ) -> Result<TradedTokens, FetchError> {
        let to = RangeEnd::try_from(to_block.into())?;
        if let RangeEnd::Number(to) = to {
            if from_block > to {
                return Err(FetchError::InvalidRange { from: from_block, to });
            }
        }

        info!(from_block = from_block, to_block = ?to, settlement = %self.settlement, "Collecting traded tokens");

        let RangeTokens { tokens, to_block } = self.fetch_range(from_block, to).await?;
        let tokens = tokens.into_sorted_without(&self.native_token_placeholder);

        info!(token_count = tokens.len(), to_block = to_block, "Collected traded tokens");

        Ok(TradedTokens { tokens, to_block })
    }

    fn filter(&self, from: BlockNumber, to: RangeEnd) -> Filter {
        Filter::new()
            .address(self.settlement)
            .event_signature(Trade::SIGNATURE_HASH)
            .from_block(from)
            .to_block(BlockNumberOrTag::from(to))
    }

    fn fetch_range(
        &self,
        from: BlockNumber,
        to: RangeEnd,
    ) -> BoxFuture<'_, Result<RangeTokens, FetchError>> {
        async move {
            let filter = self.filter(from, to);
            let with_latest_block = to == RangeEnd::Latest;

            let (logs, pending_latest) = match self.source.dispatch(&filter, with_latest_block).await
            {
                Ok(query) => {
                    let (logs, pending_latest) = query.into_parts();
                    (logs.await, pending_latest)
                }
                Err(e) => (Err(e), None),
            };

            match logs {
                Ok(logs) => {
                    let tokens = self.decode_tokens(&logs)?;
                    let to_block = self.resolve_end(from, to, pending_latest).await?;
                    debug!(
                        from = from,
                        to = to_block,
                        log_count = logs.len(),
                        token_count = tokens.len(),
                        "Fetched trades for block range"
                    );
                    Ok(RangeTokens { tokens, to_block })
                }
                Err(error) => {
                    let classification = self.classifier.classify(&error);
                    if !classification.is_retryable() {
                        error!(from = from, to = ?to, error = %error, "Log query failed with an unrecognized error");
                        return Err(FetchError::Unrecognized(error));
                    }

                    let to_block = self.resolve_end(from, to, pending_latest).await?;
                    let Some((lower, upper)) = bisect(from, to_block) else {
                        error!(
                            block = from,
                            classification = %classification,
                            error = %error,
                            "Log query for a single block failed, cannot split further"
                        );
                        return Err(FetchError::RangeExhausted {
                            block: from,
                            classification,
                            source: error,
                        });
                    };

                    warn!(
                        from = from,
                        to = to_block,
                        mid = *lower.end(),
                        classification = %classification,
                        error = %error,
                        "Log query failed, splitting block range"
                    );
                    self.fetch_halves(lower, upper).await
                }
            }
        }
        .boxed()
    }

    async fn fetch_halves(
        &self,
        lower: RangeInclusive<BlockNumber>,
        upper: RangeInclusive<BlockNumber>,
    ) -> Result<RangeTokens, FetchError> {
        let lower = self.fetch_range(*lower.start(), RangeEnd::Number(*lower.end()));
        let upper = self.fetch_range(*upper.start(), RangeEnd::Number(*upper.end()));

        let (mut lower, upper) = if self.concurrent_splits {
            tokio::try_join!(lower, upper)?
        } else {
            (lower.await?, upper.await?)
        };

        lower.tokens.merge(upper.tokens);
        // the upper half covers the most recent blocks
        Ok(RangeTokens { tokens: lower.tokens, to_block: upper.to_block })
    }

    fn decode_tokens(&self, logs: &[Log]) -> Result<TokenSet, FetchError> {
        let mut tokens = TokenSet::new();
        for log in logs {
            tokens.insert_trade(self.decoder.decode(log)?);
        }
        Ok(tokens)
    }

    /// Turns `to` into a concrete block number, awaiting the head that was requested alongside
    /// the log query if there is one.
    async fn resolve_end(
        &self,
        from: BlockNumber,
        to: RangeEnd,
        pending_latest: Option<BoxFuture<'static, Result<BlockNumber, ProviderError>>>,
    ) -> Result<BlockNumber, FetchError> {
        if let RangeEnd::Number(number) = to {
            return Ok(number);
        }

        let latest = match pending_latest {
            Some(pending) => pending.await,
            None => self.source.latest_block_number().await,
        }
        .map_err(FetchError::LatestBlock)?;

        debug!(latest_block = latest, "Resolved latest block");

        if from > latest {
            return Err(FetchError::BlockExceedsLatest { from, latest });
        }
        Ok(latest)
    }
}
