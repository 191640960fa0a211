use std::time::Duration;

use alloy::{
    network::{Ethereum, Network},
    primitives::U64,
    providers::{Provider, RootProvider},
    rpc::{
        client::{BatchRequest, Waiter},
        types::{Filter, Log},
    },
    transports::{RpcError, TransportErrorKind},
};
use backon::{ExponentialBuilder, Retryable};
use tokio::time::timeout;

use crate::robust_provider::Error;

/// Provider wrapper with built-in retry and timeout mechanisms.
///
/// Every call is bounded by `call_timeout`, retried with exponential backoff and, if the
/// primary provider keeps failing, replayed against the fallback providers in order.
#[derive(Clone, Debug)]
pub struct RobustProvider<N: Network = Ethereum> {
    pub(crate) primary_provider: RootProvider<N>,
    pub(crate) fallback_providers: Vec<RootProvider<N>>,
    pub(crate) call_timeout: Duration,
    pub(crate) max_retries: usize,
    pub(crate) min_delay: Duration,
}

/// An `eth_getLogs` call and an optional `eth_blockNumber` call that were sent to the node in
/// a single JSON-RPC batch.
///
/// Both responses can be awaited independently; dropping one of the halves discards its
/// response without affecting the other.
pub struct LogBatch {
    logs: Waiter<Vec<Log>>,
    latest_block: Option<Waiter<U64>>,
    call_timeout: Duration,
}

impl std::fmt::Debug for LogBatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogBatch")
            .field("has_latest_block", &self.has_latest_block())
            .field("call_timeout", &self.call_timeout)
            .finish_non_exhaustive()
    }
}

impl LogBatch {
    /// Whether the batch carries an `eth_blockNumber` call.
    #[must_use]
    pub fn has_latest_block(&self) -> bool {
        self.latest_block.is_some()
    }

    /// Splits the batch into the pending log response and the pending block number response.
    pub fn into_parts(
        self,
    ) -> (
        impl Future<Output = Result<Vec<Log>, Error>> + Send + 'static,
        Option<impl Future<Output = Result<u64, Error>> + Send + 'static>,
    ) {
        let call_timeout = self.call_timeout;

        let logs = async move {
            let logs = timeout(call_timeout, self.logs).await??;
            Ok::<_, Error>(logs)
        };
        let latest_block = self.latest_block.map(|waiter| async move {
            let number = timeout(call_timeout, waiter).await??;
            Ok::<_, Error>(number.to::<u64>())
        });

        (logs, latest_block)
    }
}

impl<N: Network> RobustProvider<N> {
    /// Get a reference to the primary provider
    #[must_use]
    pub fn primary(&self) -> &RootProvider<N> {
        &self.primary_provider
    }

    /// Fetch the latest block number with retry and timeout.
    ///
    /// # Errors
    ///
    /// See [retry errors](#retry-errors).
    pub async fn get_block_number(&self) -> Result<u64, Error> {
        info!("eth_blockNumber called");
        let result = self
            .try_operation_with_failover(move |provider| async move {
                provider.get_block_number().await
            })
            .await;
        if let Err(e) = &result {
            error!(error = %e, "eth_blockNumber failed");
        }
        result
    }

    /// Send `eth_getLogs` for `filter`, together with `eth_blockNumber` when `with_latest_block`
    /// is set, as one JSON-RPC batch.
    ///
    /// Batching keeps both calls on the same backend node when the endpoint is load-balanced,
    /// so the returned head is consistent with the log query. Only sending the batch is retried
    /// and failed over; the responses are bounded by the call timeout when awaited.
    ///
    /// # Errors
    ///
    /// See [retry errors](#retry-errors).
    pub async fn batch_get_logs(
        &self,
        filter: &Filter,
        with_latest_block: bool,
    ) -> Result<LogBatch, Error> {
        info!(with_latest_block = with_latest_block, "eth_getLogs batch called");
        let result = self
            .try_operation_with_failover(move |provider| async move {
                let mut batch = BatchRequest::new(provider.client());
                let logs = batch.add_call::<_, Vec<Log>>("eth_getLogs", &(filter.clone(),))?;
                let latest_block = if with_latest_block {
                    Some(batch.add_call::<_, U64>("eth_blockNumber", &())?)
                } else {
                    None
                };
                batch.send().await?;
                Ok::<_, RpcError<TransportErrorKind>>((logs, latest_block))
            })
            .await;

        match result {
            Ok((logs, latest_block)) => {
                Ok(LogBatch { logs, latest_block, call_timeout: self.call_timeout })
            }
            Err(e) => {
                error!(error = %e, "eth_getLogs batch failed");
                Err(e)
            }
        }
    }

    /// Execute `operation` with exponential backoff and a total timeout.
    ///
    /// Wraps the retry logic with `tokio::time::timeout(self.call_timeout, ...)` so
    /// the entire operation (including time spent inside the RPC call) cannot exceed
    /// `call_timeout`.
    ///
    /// If the primary provider fails and fallback providers are available, each fallback
    /// is tried in sequence.
    ///
    /// # Errors
    /// <a name="retry-errors"></a>
    ///
    /// * Returns [`Error::Timeout`] if the call timeout elapses on every provider.
    /// * Propagates the last [`RpcError<TransportErrorKind>`] from the underlying retries.
    pub(crate) async fn try_operation_with_failover<T, F, Fut>(
        &self,
        operation: F,
    ) -> Result<T, Error>
    where
        F: Fn(RootProvider<N>) -> Fut,
        Fut: Future<Output = Result<T, RpcError<TransportErrorKind>>>,
    {
        let last_error = match self.try_provider_with_timeout(self.primary(), &operation).await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        self.try_fallback_providers(&operation, last_error).await
    }

    async fn try_fallback_providers<T, F, Fut>(
        &self,
        operation: F,
        mut last_error: Error,
    ) -> Result<T, Error>
    where
        F: Fn(RootProvider<N>) -> Fut,
        Fut: Future<Output = Result<T, RpcError<TransportErrorKind>>>,
    {
        let num_fallbacks = self.fallback_providers.len();
        if num_fallbacks == 0 {
            return Err(last_error);
        }
        info!("Primary provider failed, trying fallback provider(s)");

        for (fallback_idx, provider) in self.fallback_providers.iter().enumerate() {
            info!("Attempting fallback provider {}/{}", fallback_idx + 1, num_fallbacks);

            match self.try_provider_with_timeout(provider, &operation).await {
                Ok(value) => {
                    info!(provider_num = fallback_idx + 1, "Fallback provider succeeded");
                    return Ok(value);
                }
                Err(e) => {
                    error!(provider_num = fallback_idx + 1, err = %e, "Fallback provider failed");
                    last_error = e;
                }
            }
        }

        error!("All providers failed or timed out - returning the last providers attempt's error");
        Err(last_error)
    }

    /// Try executing an operation with a specific provider with retry and timeout.
    async fn try_provider_with_timeout<T, F, Fut>(
        &self,
        provider: &RootProvider<N>,
        operation: F,
    ) -> Result<T, Error>
    where
        F: Fn(RootProvider<N>) -> Fut,
        Fut: Future<Output = Result<T, RpcError<TransportErrorKind>>>,
    {
        let retry_strategy = ExponentialBuilder::default()
            .with_max_times(self.max_retries)
            .with_min_delay(self.min_delay);

        timeout(
            self.call_timeout,
            (|| operation(provider.clone()))
                .retry(retry_strategy)
                .notify(|err: &RpcError<TransportErrorKind>, dur: Duration| {
                    debug!(error = %err, "RPC error retrying after {:?}", dur);
                })
                .sleep(tokio::time::sleep),
        )
        .await
        .map_err(Error::from)?
        .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::robust_provider::RobustProviderBuilder;
    use alloy::providers::{ProviderBuilder, ext::AnvilApi};
    use alloy_node_bindings::Anvil;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::sleep;

    fn test_provider(timeout: u64, max_retries: usize, min_delay: u64) -> RobustProvider {
        RobustProvider {
            primary_provider: RootProvider::new_http("http://localhost:8545".parse().unwrap()),
            fallback_providers: vec![],
            call_timeout: Duration::from_millis(timeout),
            max_retries,
            min_delay: Duration::from_millis(min_delay),
        }
    }

    #[tokio::test]
    async fn test_retry_with_timeout_succeeds_on_first_attempt() {
        let provider = test_provider(100, 3, 10);

        let call_count = AtomicUsize::new(0);

        let result = provider
            .try_operation_with_failover(|_| async {
                call_count.fetch_add(1, Ordering::SeqCst);
                let count = call_count.load(Ordering::SeqCst);
                Ok(count)
            })
            .await;

        assert!(matches!(result, Ok(1)));
    }

    #[tokio::test]
    async fn test_retry_with_timeout_retries_on_error() {
        let provider = test_provider(100, 3, 10);

        let call_count = AtomicUsize::new(0);

        let result = provider
            .try_operation_with_failover(|_| async {
                call_count.fetch_add(1, Ordering::SeqCst);
                let count = call_count.load(Ordering::SeqCst);
                match count {
                    3 => Ok(count),
                    _ => Err(TransportErrorKind::BackendGone.into()),
                }
            })
            .await;

        assert!(matches!(result, Ok(3)));
    }

    #[tokio::test]
    async fn test_retry_with_timeout_fails_after_max_retries() {
        let provider = test_provider(100, 2, 10);

        let call_count = AtomicUsize::new(0);

        let result: Result<(), Error> = provider
            .try_operation_with_failover(|_| async {
                call_count.fetch_add(1, Ordering::SeqCst);
                Err(TransportErrorKind::BackendGone.into())
            })
            .await;

        assert!(matches!(result, Err(Error::RpcError(_))));
        assert_eq!(call_count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_with_timeout_respects_call_timeout() {
        let call_timeout = 50;
        let provider = test_provider(call_timeout, 10, 1);

        let result = provider
            .try_operation_with_failover(move |_provider| async move {
                sleep(Duration::from_millis(call_timeout + 10)).await;
                Ok(42)
            })
            .await;

        assert!(matches!(result, Err(Error::Timeout)));
    }

    #[tokio::test]
    async fn batch_resolves_latest_block_alongside_logs() -> anyhow::Result<()> {
        let anvil = Anvil::new().try_spawn()?;
        let provider = ProviderBuilder::new().connect_http(anvil.endpoint_url());
        provider.anvil_mine(Some(7), None).await?;

        let robust = RobustProviderBuilder::fragile(provider).build().await?;

        let filter = Filter::new().from_block(0).to_block(7);
        let batch = robust.batch_get_logs(&filter, true).await?;
        assert!(batch.has_latest_block());

        let (logs, latest_block) = batch.into_parts();
        assert!(logs.await?.is_empty());
        assert_eq!(latest_block.expect("batch carries eth_blockNumber").await?, 7);

        Ok(())
    }

    #[tokio::test]
    async fn batch_without_latest_block_only_queries_logs() -> anyhow::Result<()> {
        let anvil = Anvil::new().try_spawn()?;
        let provider = ProviderBuilder::new().connect_http(anvil.endpoint_url());

        let robust = RobustProviderBuilder::fragile(provider).build().await?;

        let batch = robust.batch_get_logs(&Filter::new().from_block(0).to_block(0), false).await?;
        assert!(!batch.has_latest_block());

        let (logs, latest_block) = batch.into_parts();
        assert!(latest_block.is_none());
        assert!(logs.await?.is_empty());

        Ok(())
    }
}
