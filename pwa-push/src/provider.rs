//! Push provider trait and dispatch reports.

use async_trait::async_trait;

use crate::{Notification, PushError, Result, Subscription};

/// Push provider trait.
#[async_trait]
pub trait PushProvider: Send + Sync {
    /// Deliver an already serialized payload to one subscription.
    async fn send(&self, subscription: &Subscription, payload: &[u8]) -> Result<()>;

    /// Deliver a notification to many subscriptions.
    ///
    /// The default implementation sends one request at a time; every
    /// subscription gets its own result.
    async fn dispatch(
        &self,
        subscriptions: &[Subscription],
        notification: &Notification,
    ) -> DispatchReport {
        let payload = match notification.to_payload() {
            Ok(payload) => payload,
            Err(e) => return DispatchReport::failed_all(subscriptions, &e),
        };

        let mut results = Vec::with_capacity(subscriptions.len());
        for subscription in subscriptions {
            let outcome = self.send(subscription, &payload).await;
            results.push(DeliveryResult::new(subscription, outcome));
        }
        DispatchReport::new(results)
    }
}

/// Outcome of one delivery attempt.
#[derive(Debug)]
pub struct DeliveryResult {
    /// Endpoint the attempt targeted.
    pub endpoint: String,
    /// `Ok` when the push service answered 2xx.
    pub outcome: Result<()>,
}

impl DeliveryResult {
    /// Record an outcome for a subscription.
    pub fn new(subscription: &Subscription, outcome: Result<()>) -> Self {
        Self {
            endpoint: subscription.endpoint.clone(),
            outcome,
        }
    }

    /// Whether the push service accepted the message.
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    /// The failure, if any.
    pub fn error(&self) -> Option<&PushError> {
        self.outcome.as_ref().err()
    }
}

/// Per-subscription results of a batch, in input order.
#[derive(Debug, Default)]
pub struct DispatchReport {
    results: Vec<DeliveryResult>,
}

impl DispatchReport {
    /// Wrap a list of results.
    pub fn new(results: Vec<DeliveryResult>) -> Self {
        Self { results }
    }

    /// Mark every subscription as failed with a copy of `error`.
    pub(crate) fn failed_all(subscriptions: &[Subscription], error: &PushError) -> Self {
        let message = error.to_string();
        Self::new(
            subscriptions
                .iter()
                .map(|s| DeliveryResult::new(s, Err(PushError::Serialization(message.clone()))))
                .collect(),
        )
    }

    /// All results.
    pub fn results(&self) -> &[DeliveryResult] {
        &self.results
    }

    /// Number of attempts.
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Whether the batch was empty.
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Number of accepted messages.
    pub fn delivered(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    /// Number of failed attempts.
    pub fn failed(&self) -> usize {
        self.len() - self.delivered()
    }

    /// Endpoints the push service reported as gone; the host should delete them.
    pub fn gone_endpoints(&self) -> Vec<&str> {
        self.results
            .iter()
            .filter(|r| r.error().is_some_and(PushError::should_remove_subscription))
            .map(|r| r.endpoint.as_str())
            .collect()
    }

    /// Failed attempts with their errors.
    pub fn failures(&self) -> impl Iterator<Item = (&str, &PushError)> {
        self.results
            .iter()
            .filter_map(|r| r.error().map(|e| (r.endpoint.as_str(), e)))
    }
}
