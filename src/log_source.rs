//! The transport seam used by the range fetcher.

use alloy::{
    network::Network,
    rpc::types::{Filter, Log},
};
use futures::future::{BoxFuture, FutureExt};

use crate::robust_provider::{Error as ProviderError, RobustProvider};

/// Pending responses of a log query that is already on its way to the node.
///
/// The log response and the optional latest-block response are awaited independently: the
/// fetcher only waits for the block number when it actually needs it.
pub struct DispatchedQuery {
    logs: BoxFuture<'static, Result<Vec<Log>, ProviderError>>,
    latest_block: Option<BoxFuture<'static, Result<u64, ProviderError>>>,
}

impl std::fmt::Debug for DispatchedQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchedQuery")
            .field("with_latest_block", &self.latest_block.is_some())
            .finish_non_exhaustive()
    }
}

impl DispatchedQuery {
    pub fn new(
        logs: impl Future<Output = Result<Vec<Log>, ProviderError>> + Send + 'static,
    ) -> Self {
        Self { logs: logs.boxed(), latest_block: None }
    }

    #[must_use]
    pub fn with_latest_block(
        mut self,
        latest_block: impl Future<Output = Result<u64, ProviderError>> + Send + 'static,
    ) -> Self {
        self.latest_block = Some(latest_block.boxed());
        self
    }

    #[allow(clippy::type_complexity)]
    pub fn into_parts(
        self,
    ) -> (
        BoxFuture<'static, Result<Vec<Log>, ProviderError>>,
        Option<BoxFuture<'static, Result<u64, ProviderError>>>,
    ) {
        (self.logs, self.latest_block)
    }
}

/// Something that can answer `eth_getLogs` and `eth_blockNumber`.
///
/// Implementations must put both requests of one [`LogSource::dispatch`] call into the same
/// transport round trip, so a load-balanced endpoint routes them to the same node.
pub trait LogSource: Send + Sync {
    /// Sends the log query for `filter` and, if `with_latest_block` is set, a request for the
    /// latest block number alongside it.
    ///
    /// # Errors
    ///
    /// Returns an error if the requests could not be sent.
    fn dispatch(
        &self,
        filter: &Filter,
        with_latest_block: bool,
    ) -> impl Future<Output = Result<DispatchedQuery, ProviderError>> + Send;

    /// Standalone latest block number request, used when a batch could not be sent at all.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    fn latest_block_number(&self) -> impl Future<Output = Result<u64, ProviderError>> + Send;
}

impl<N: Network> LogSource for RobustProvider<N> {
    async fn dispatch(
        &self,
        filter: &Filter,
        with_latest_block: bool,
    ) -> Result<DispatchedQuery, ProviderError> {
        let (logs, latest_block) = self.batch_get_logs(filter, with_latest_block).await?.into_parts();

        let query = DispatchedQuery::new(logs);
        Ok(match latest_block {
            Some(latest_block) => query.with_latest_block(latest_block),
            None => query,
        })
    }

    async fn latest_block_number(&self) -> Result<u64, ProviderError> {
        self.get_block_number().await
    }
}

impl<S: LogSource> LogSource for std::sync::Arc<S> {
    fn dispatch(
        &self,
        filter: &Filter,
        with_latest_block: bool,
    ) -> impl Future<Output = Result<DispatchedQuery, ProviderError>> + Send {
        self.as_ref().dispatch(filter, with_latest_block)
    }

    fn latest_block_number(&self) -> impl Future<Output = Result<u64, ProviderError>> + Send {
        self.as_ref().latest_block_number()
    }
}
