//! Classification of log query failures.
//!
//! Nodes report their log limits in free-form, provider-specific error messages. The
//! [`ErrorClassifier`] runs an ordered list of [`ClassificationRule`]s over the details of a
//! failure and reports the first match. Failures that match no rule are
//! [`Classification::Unrecognized`] and must not be retried.

use std::{borrow::Cow, fmt, sync::Arc};

use alloy::transports::{RpcError, TransportErrorKind};

use crate::robust_provider::Error as ProviderError;

/// Known causes of a failed log query.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Classification {
    /// The node refused to return that many logs in one response.
    TooManyResults,
    /// The query took too long.
    Timeout,
    /// The node could not be reached.
    NetworkUnavailable,
    /// Anything else. Fatal.
    Unrecognized,
}

impl Classification {
    /// Whether a failure of this kind can be worked around by querying a smaller range.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        !matches!(self, Classification::Unrecognized)
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Classification::TooManyResults => "too many results",
            Classification::Timeout => "timeout",
            Classification::NetworkUnavailable => "network unavailable",
            Classification::Unrecognized => "unrecognized",
        };
        f.write_str(name)
    }
}

/// The parts of a failure that rules can inspect.
///
/// `reason` and `code` are machine-readable labels attached by the transport adapter, used to
/// confirm a message match.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FailureDetails<'a> {
    pub message: Cow<'a, str>,
    pub reason: Option<Cow<'a, str>>,
    pub code: Option<Cow<'a, str>>,
    /// JSON-RPC error code, when the node answered with an error response.
    pub rpc_code: Option<i64>,
}

impl<'a> FailureDetails<'a> {
    #[must_use]
    pub fn new(message: impl Into<Cow<'a, str>>) -> Self {
        Self { message: message.into(), reason: None, code: None, rpc_code: None }
    }

    #[must_use]
    pub fn with_reason(mut self, reason: impl Into<Cow<'a, str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    #[must_use]
    pub fn with_code(mut self, code: impl Into<Cow<'a, str>>) -> Self {
        self.code = Some(code.into());
        self
    }

    #[must_use]
    pub fn with_rpc_code(mut self, rpc_code: i64) -> Self {
        self.rpc_code = Some(rpc_code);
        self
    }

    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    #[must_use]
    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }
}

/// A failure value the classifier can look into.
pub trait ProviderFailure {
    /// Returns `None` when the value is not a structured error at all.
    fn details(&self) -> Option<FailureDetails<'_>>;
}

impl ProviderFailure for FailureDetails<'_> {
    fn details(&self) -> Option<FailureDetails<'_>> {
        Some(self.clone())
    }
}

impl ProviderFailure for ProviderError {
    fn details(&self) -> Option<FailureDetails<'_>> {
        match self {
            ProviderError::Timeout => Some(
                FailureDetails::new("timeout exceeded").with_reason("timeout").with_code("TIMEOUT"),
            ),
            ProviderError::RpcError(err) => err.as_ref().details(),
            ProviderError::BlockNotFound(_) => Some(FailureDetails::new(self.to_string())),
        }
    }
}

impl ProviderFailure for RpcError<TransportErrorKind> {
    fn details(&self) -> Option<FailureDetails<'_>> {
        let details = match self {
            RpcError::ErrorResp(payload) => {
                FailureDetails::new(payload.message.as_ref()).with_rpc_code(payload.code)
            }
            RpcError::Transport(TransportErrorKind::BackendGone) => {
                FailureDetails::new("could not detect network (backend connection task has stopped)")
                    .with_reason("could not detect network")
                    .with_code("NETWORK_ERROR")
            }
            RpcError::Transport(TransportErrorKind::HttpError(err)) => {
                FailureDetails::new(format!("{}: {}", err.status, err.body))
            }
            other => FailureDetails::new(other.to_string()),
        };
        Some(details)
    }
}

type Predicate = Arc<dyn Fn(&FailureDetails<'_>) -> bool + Send + Sync>;

/// A named predicate over [`FailureDetails`] and the classification it assigns.
#[derive(Clone)]
pub struct ClassificationRule {
    name: Cow<'static, str>,
    classification: Classification,
    predicate: Predicate,
}

impl fmt::Debug for ClassificationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassificationRule")
            .field("name", &self.name)
            .field("classification", &self.classification)
            .finish_non_exhaustive()
    }
}

impl ClassificationRule {
    pub fn new(
        name: impl Into<Cow<'static, str>>,
        classification: Classification,
        predicate: impl Fn(&FailureDetails<'_>) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self { name: name.into(), classification, predicate: Arc::new(predicate) }
    }

    /// `query returned more than <N> results`, as reported by geth-based nodes and Infura.
    #[must_use]
    pub fn too_many_results() -> Self {
        Self::new("too-many-results", Classification::TooManyResults, |details| {
            reports_too_many_results(&details.message)
        })
    }

    /// Gateway timeouts that only carry a message.
    #[must_use]
    pub fn network_connection_timed_out() -> Self {
        Self::new("network-connection-timed-out", Classification::Timeout, |details| {
            details.message.contains("Network connection timed out")
        })
    }

    /// Client-side timeouts, confirmed by their reason and code labels.
    #[must_use]
    pub fn timeout() -> Self {
        Self::new("timeout", Classification::Timeout, |details| {
            details.message.starts_with("timeout")
                && details.reason() == Some("timeout")
                && details.code() == Some("TIMEOUT")
        })
    }

    /// Lost connections, confirmed by their reason and code labels.
    #[must_use]
    pub fn network_unavailable() -> Self {
        const REASON: &str = "could not detect network";
        Self::new("network-unavailable", Classification::NetworkUnavailable, |details| {
            details.message.starts_with(REASON)
                && details.reason() == Some(REASON)
                && details.code() == Some("NETWORK_ERROR")
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn classification(&self) -> Classification {
        self.classification
    }

    #[must_use]
    pub fn matches(&self, details: &FailureDetails<'_>) -> bool {
        (self.predicate)(details)
    }
}

fn reports_too_many_results(message: &str) -> bool {
    const PREFIX: &str = "query returned more than ";
    message.match_indices(PREFIX).any(|(idx, _)| {
        let rest = &message[idx + PREFIX.len()..];
        let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
        digits > 0 && rest[digits..].starts_with(" results")
    })
}

/// Ordered list of [`ClassificationRule`]s. The first matching rule wins.
///
/// [`ErrorClassifier::default`] recognises the failure signatures of the common node providers.
/// Support for another provider is added by appending or prepending a rule.
#[derive(Clone, Debug)]
pub struct ErrorClassifier {
    rules: Vec<ClassificationRule>,
}

impl Default for ErrorClassifier {
    fn default() -> Self {
        Self {
            rules: vec![
                ClassificationRule::too_many_results(),
                ClassificationRule::network_connection_timed_out(),
                ClassificationRule::timeout(),
                ClassificationRule::network_unavailable(),
            ],
        }
    }
}

impl ErrorClassifier {
    /// A classifier without any rules; everything is [`Classification::Unrecognized`].
    #[must_use]
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Appends `rule`, evaluated after the existing rules.
    #[must_use]
    pub fn with_rule(mut self, rule: ClassificationRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Inserts `rule` in front of the existing rules.
    #[must_use]
    pub fn with_priority_rule(mut self, rule: ClassificationRule) -> Self {
        self.rules.insert(0, rule);
        self
    }

    #[must_use]
    pub fn rules(&self) -> &[ClassificationRule] {
        &self.rules
    }

    #[must_use]
    pub fn classify<F: ProviderFailure + ?Sized>(&self, failure: &F) -> Classification {
        let Some(details) = failure.details() else {
            return Classification::Unrecognized;
        };

        self.rules
            .iter()
            .find(|rule| rule.matches(&details))
            .map_or(Classification::Unrecognized, ClassificationRule::classification)
    }
}
