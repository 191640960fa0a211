use std::sync::Arc;

use alloy::{network::Network, primitives::Address};

use crate::{
    FetchError,
    classifier::ErrorClassifier,
    log_source::LogSource,
    range_fetcher::TradedTokensFetcher,
    robust_provider::{IntoRobustProvider, RobustProvider},
    trade::{DEFAULT_SETTLEMENT_ADDRESS, NATIVE_TOKEN_PLACEHOLDER, SettlementTradeDecoder, TradeDecoder},
};

/// Builder for [`TradedTokensFetcher`].
///
/// Defaults: the canonical settlement deployment, the standard native currency placeholder,
/// [`ErrorClassifier::default`], the ABI decoder for `Trade` and concurrent split halves.
pub struct TradedTokensFetcherBuilder {
    settlement: Address,
    native_token_placeholder: Address,
    classifier: ErrorClassifier,
    decoder: Arc<dyn TradeDecoder>,
    concurrent_splits: bool,
}

impl Default for TradedTokensFetcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TradedTokensFetcherBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            settlement: DEFAULT_SETTLEMENT_ADDRESS,
            native_token_placeholder: NATIVE_TOKEN_PLACEHOLDER,
            classifier: ErrorClassifier::default(),
            decoder: Arc::new(SettlementTradeDecoder),
            concurrent_splits: true,
        }
    }

    /// Sets the address of the settlement contract whose `Trade` events are scanned.
    #[must_use]
    pub fn settlement(mut self, settlement: Address) -> Self {
        self.settlement = settlement;
        self
    }

    /// Sets the address that stands for the native currency and is left out of results.
    #[must_use]
    pub fn native_token_placeholder(mut self, placeholder: Address) -> Self {
        self.native_token_placeholder = placeholder;
        self
    }

    /// Replaces the rules deciding which failures are worked around by splitting.
    #[must_use]
    pub fn classifier(mut self, classifier: ErrorClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// Replaces how raw `Trade` logs are turned into token pairs.
    #[must_use]
    pub fn decoder(mut self, decoder: impl TradeDecoder + 'static) -> Self {
        self.decoder = Arc::new(decoder);
        self
    }

    /// Whether the two halves of a split range are queried concurrently.
    ///
    /// Defaults to `true`. Sequential halves halve the peak number of in-flight requests.
    #[must_use]
    pub fn concurrent_splits(mut self, concurrent_splits: bool) -> Self {
        self.concurrent_splits = concurrent_splits;
        self
    }

    /// Builds a fetcher on top of an arbitrary [`LogSource`].
    #[must_use]
    pub fn build<S: LogSource>(self, source: S) -> TradedTokensFetcher<S> {
        debug!(
            settlement = %self.settlement,
            rule_count = self.classifier.rules().len(),
            concurrent_splits = self.concurrent_splits,
            "Building TradedTokensFetcher"
        );

        TradedTokensFetcher {
            source,
            settlement: self.settlement,
            native_token_placeholder: self.native_token_placeholder,
            classifier: self.classifier,
            decoder: self.decoder,
            concurrent_splits: self.concurrent_splits,
        }
    }

    /// Connects to a provider and builds a fetcher that queries it through a
    /// [`RobustProvider`].
    ///
    /// Prefer [`RobustProviderBuilder::fragile`](crate::robust_provider::RobustProviderBuilder::fragile)
    /// for the provider: limit errors are deterministic, so splitting recovers from them faster
    /// than replaying the same query.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider connection fails.
    pub async fn connect<N: Network>(
        self,
        provider: impl IntoRobustProvider<N>,
    ) -> Result<TradedTokensFetcher<RobustProvider<N>>, FetchError> {
        let provider = provider.into_robust_provider().await?;
        Ok(self.build(provider))
    }
}
