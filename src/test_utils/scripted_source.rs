use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use alloy::{
    eips::BlockNumberOrTag,
    primitives::BlockNumber,
    rpc::types::{Filter, FilterBlockOption, Log},
};

use crate::{
    log_source::{DispatchedQuery, LogSource},
    robust_provider::Error as ProviderError,
};

type Responder =
    Arc<dyn Fn(BlockNumber, BlockNumber) -> Result<Vec<Log>, ProviderError> + Send + Sync>;
type Rejecter = Arc<dyn Fn(BlockNumber, BlockNumber) -> Option<ProviderError> + Send + Sync>;
type Delay = Arc<dyn Fn(BlockNumber, BlockNumber) -> Duration + Send + Sync>;

/// One `dispatch` call as seen by a [`ScriptedLogSource`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RecordedQuery {
    pub from: BlockNumber,
    pub to: BlockNumberOrTag,
    pub with_latest_block: bool,
}

/// In-memory [`LogSource`] whose answers are computed by closures over the queried range.
///
/// A query with an open-ended upper bound is answered as if it ended at the configured head.
pub struct ScriptedLogSource {
    latest_block: BlockNumber,
    responder: Responder,
    rejecter: Option<Rejecter>,
    delay: Option<Delay>,
    queries: Arc<Mutex<Vec<RecordedQuery>>>,
    latest_block_requests: Arc<AtomicUsize>,
}

impl ScriptedLogSource {
    /// A source with head `latest_block` that returns no logs.
    #[must_use]
    pub fn new(latest_block: BlockNumber) -> Self {
        Self {
            latest_block,
            responder: Arc::new(|_, _| Ok(Vec::new())),
            rejecter: None,
            delay: None,
            queries: Arc::default(),
            latest_block_requests: Arc::default(),
        }
    }

    /// Answers each log query with `responder(from, to)`.
    #[must_use]
    pub fn respond_with(
        mut self,
        responder: impl Fn(BlockNumber, BlockNumber) -> Result<Vec<Log>, ProviderError>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        self.responder = Arc::new(responder);
        self
    }

    /// Fails `dispatch` itself with the returned error, as if the batch never left the client.
    #[must_use]
    pub fn reject_dispatch_with(
        mut self,
        rejecter: impl Fn(BlockNumber, BlockNumber) -> Option<ProviderError> + Send + Sync + 'static,
    ) -> Self {
        self.rejecter = Some(Arc::new(rejecter));
        self
    }

    /// Delays each log response by `delay(from, to)`.
    #[must_use]
    pub fn delay_with(
        mut self,
        delay: impl Fn(BlockNumber, BlockNumber) -> Duration + Send + Sync + 'static,
    ) -> Self {
        self.delay = Some(Arc::new(delay));
        self
    }

    /// Every query dispatched so far, in dispatch order.
    ///
    /// # Panics
    ///
    /// Panics if the query log mutex is poisoned.
    #[must_use]
    pub fn queries(&self) -> Vec<RecordedQuery> {
        self.queries.lock().unwrap().clone()
    }

    /// How many times the head was actually read, through a batch or standalone.
    #[must_use]
    pub fn latest_block_requests(&self) -> usize {
        self.latest_block_requests.load(Ordering::SeqCst)
    }

    fn bounds(&self, filter: &Filter) -> (BlockNumber, BlockNumberOrTag, BlockNumber) {
        let FilterBlockOption::Range { from_block, to_block } = &filter.block_option else {
            panic!("scripted source only answers block range filters");
        };
        let from = from_block.and_then(|block| block.as_number()).unwrap_or(0);
        let to_tag = to_block.unwrap_or(BlockNumberOrTag::Latest);
        let to = to_tag.as_number().unwrap_or(self.latest_block);
        (from, to_tag, to)
    }
}

impl LogSource for ScriptedLogSource {
    async fn dispatch(
        &self,
        filter: &Filter,
        with_latest_block: bool,
    ) -> Result<DispatchedQuery, ProviderError> {
        let (from, to_tag, to) = self.bounds(filter);
        self.queries.lock().unwrap().push(RecordedQuery { from, to: to_tag, with_latest_block });

        if let Some(error) = self.rejecter.as_ref().and_then(|reject| reject(from, to)) {
            return Err(error);
        }

        let response = (self.responder)(from, to);
        let delay = self.delay.as_ref().map(|delay| delay(from, to));
        let query = DispatchedQuery::new(async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            response
        });

        if !with_latest_block {
            return Ok(query);
        }

        let latest_block = self.latest_block;
        let requests = Arc::clone(&self.latest_block_requests);
        Ok(query.with_latest_block(async move {
            requests.fetch_add(1, Ordering::SeqCst);
            Ok(latest_block)
        }))
    }

    async fn latest_block_number(&self) -> Result<BlockNumber, ProviderError> {
        self.latest_block_requests.fetch_add(1, Ordering::SeqCst);
        Ok(self.latest_block)
    }
}
