//! Web Push request dispatch (RFC 8030) with VAPID authentication (RFC 8292).

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_ENCODING, CONTENT_TYPE, RETRY_AFTER};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    DeliveryResult, DispatchReport, Notification, PushError, PushProvider, Result, Subscription,
    VapidJwtBuilder, VapidKeyPair, encryption,
};

/// How the message body is encoded on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContentEncoding {
    /// JSON sent as-is with `Content-Type: application/json`.
    #[default]
    Plain,
    /// RFC 8291 encryption with the `aes128gcm` content coding.
    Aes128Gcm,
}

impl std::str::FromStr for ContentEncoding {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "plain" | "none" | "json" => Ok(Self::Plain),
            "aes128gcm" => Ok(Self::Aes128Gcm),
            other => Err(format!("unknown content encoding: {}", other)),
        }
    }
}

/// Dispatcher configuration.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Administrator contact, used as the VAPID `sub` claim.
    pub admin_email: String,
    /// Message TTL in seconds.
    pub ttl: u32,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// Maximum requests in flight during a batch.
    pub concurrency: usize,
    /// Deadline for a whole batch.
    pub batch_deadline: Option<Duration>,
    /// Body encoding.
    pub encoding: ContentEncoding,
    /// `Urgency` header.
    pub urgency: Option<crate::Urgency>,
    /// `Topic` header.
    pub topic: Option<String>,
    /// User agent string.
    pub user_agent: String,
}

impl DispatcherConfig {
    /// Create a configuration for the given administrator email.
    pub fn new(admin_email: impl Into<String>) -> Self {
        Self {
            admin_email: admin_email.into(),
            ttl: 86400,
            timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(5),
            concurrency: 8,
            batch_deadline: None,
            encoding: ContentEncoding::Plain,
            urgency: None,
            topic: None,
            user_agent: format!("pwa-push/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Set the TTL.
    pub fn ttl(mut self, ttl: u32) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set the per-request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the maximum number of concurrent requests.
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Set the batch deadline.
    pub fn batch_deadline(mut self, deadline: Duration) -> Self {
        self.batch_deadline = Some(deadline);
        self
    }

    /// Set the body encoding.
    pub fn encoding(mut self, encoding: ContentEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Set the urgency.
    pub fn urgency(mut self, urgency: crate::Urgency) -> Self {
        self.urgency = Some(urgency);
        self
    }

    /// Set the topic.
    pub fn topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }
}

/// Sends push messages to browser push services.
///
/// The key pair is loaded once at construction, so an unusable key fails
/// here instead of halfway through a batch.
#[derive(Clone)]
pub struct WebPushDispatcher {
    config: Arc<DispatcherConfig>,
    jwt: Arc<VapidJwtBuilder>,
    public_key: Arc<str>,
    client: Client,
}

impl WebPushDispatcher {
    /// Create a dispatcher with its own HTTP client.
    pub fn new(keys: &VapidKeyPair, config: DispatcherConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| PushError::Config(e.to_string()))?;

        Self::with_client(keys, config, client)
    }

    /// Create a dispatcher around an existing HTTP client.
    ///
    /// `config.timeout` is applied to every request regardless of the
    /// client's own settings.
    pub fn with_client(keys: &VapidKeyPair, config: DispatcherConfig, client: Client) -> Result<Self> {
        keys.validate()?;
        let jwt = VapidJwtBuilder::new(keys.signing_key()?, &config.admin_email);

        debug!(subject = %jwt.subject(), "Web push dispatcher ready");

        Ok(Self {
            config: Arc::new(config),
            jwt: Arc::new(jwt),
            public_key: Arc::from(keys.public_key.as_str()),
            client,
        })
    }

    /// The dispatcher configuration.
    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// VAPID public key sent in the `k=` parameter.
    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    /// Send one payload to one subscription.
    pub async fn send(&self, subscription: &Subscription, payload: &[u8]) -> Result<()> {
        let result = self.deliver(subscription, payload).await;

        match &result {
            Ok(()) => debug!(
                endpoint = %subscription.endpoint_summary(),
                "Web push notification sent"
            ),
            Err(e) => warn!(
                endpoint = %subscription.endpoint_summary(),
                status = ?e.status(),
                category = e.category(),
                error = %e,
                "Web push delivery failed"
            ),
        }

        result
    }

    async fn deliver(&self, subscription: &Subscription, payload: &[u8]) -> Result<()> {
        let token = self.jwt.build(&subscription.endpoint)?;

        let mut request = self
            .client
            .post(&subscription.endpoint)
            .timeout(self.config.timeout)
            .header("TTL", self.config.ttl.to_string())
            .header(
                AUTHORIZATION,
                format!("vapid t={}, k={}", token, self.public_key),
            );

        if let Some(urgency) = self.config.urgency {
            request = request.header("Urgency", urgency.as_str());
        }
        if let Some(topic) = &self.config.topic {
            request = request.header("Topic", topic.as_str());
        }

        request = match self.config.encoding {
            ContentEncoding::Plain => request
                .header(CONTENT_TYPE, "application/json")
                .body(payload.to_vec()),
            ContentEncoding::Aes128Gcm => {
                let body =
                    encryption::encrypt(payload, &subscription.keys.p256dh, &subscription.keys.auth)?;
                request
                    .header(CONTENT_TYPE, "application/octet-stream")
                    .header(CONTENT_ENCODING, "aes128gcm")
                    .body(body)
            }
        };

        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(());
        }

        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());

        Err(PushError::from_status(status.as_u16(), retry_after))
    }

    /// Send a notification to every subscription with bounded concurrency.
    pub async fn dispatch(
        &self,
        subscriptions: &[Subscription],
        notification: &Notification,
    ) -> DispatchReport {
        self.dispatch_with_cancel(subscriptions, notification, &CancellationToken::new())
            .await
    }

    /// Like [`dispatch`](Self::dispatch), stopping when `cancel` fires.
    ///
    /// Requests not yet started are reported as [`PushError::Cancelled`];
    /// in-flight requests are dropped. Nothing is retried.
    pub async fn dispatch_with_cancel(
        &self,
        subscriptions: &[Subscription],
        notification: &Notification,
        cancel: &CancellationToken,
    ) -> DispatchReport {
        let payload = match notification.to_payload() {
            Ok(payload) => payload,
            Err(e) => return DispatchReport::failed_all(subscriptions, &e),
        };

        let deadline = self.config.batch_deadline.map(|d| Instant::now() + d);
        let payload = payload.as_slice();

        // No closure inside the stream: the batch future must stay `Send`.
        let sends: Vec<_> = subscriptions
            .iter()
            .enumerate()
            .map(|(index, subscription)| self.send_indexed(index, subscription, payload, deadline, cancel))
            .collect();

        let mut results: Vec<(usize, DeliveryResult)> = stream::iter(sends)
            .buffer_unordered(self.config.concurrency.max(1))
            .collect()
            .await;

        results.sort_by_key(|(index, _)| *index);
        let report = DispatchReport::new(results.into_iter().map(|(_, r)| r).collect());

        info!(
            total = report.len(),
            delivered = report.delivered(),
            failed = report.failed(),
            gone = report.gone_endpoints().len(),
            "Web push batch finished"
        );

        report
    }

    async fn send_indexed(
        &self,
        index: usize,
        subscription: &Subscription,
        payload: &[u8],
        deadline: Option<Instant>,
        cancel: &CancellationToken,
    ) -> (usize, DeliveryResult) {
        let outcome = self.send_guarded(subscription, payload, deadline, cancel).await;
        (index, DeliveryResult::new(subscription, outcome))
    }

    async fn send_guarded(
        &self,
        subscription: &Subscription,
        payload: &[u8],
        deadline: Option<Instant>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        if cancel.is_cancelled() {
            return Err(PushError::Cancelled);
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            warn!(
                endpoint = %subscription.endpoint_summary(),
                "Batch deadline passed before delivery"
            );
            return Err(PushError::Timeout);
        }

        let send = async {
            match deadline {
                Some(deadline) => tokio::time::timeout_at(deadline, self.send(subscription, payload))
                    .await
                    .unwrap_or_else(|_| Err(PushError::Timeout)),
                None => self.send(subscription, payload).await,
            }
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(PushError::Cancelled),
            result = send => result,
        }
    }
}

#[async_trait]
impl PushProvider for WebPushDispatcher {
    async fn send(&self, subscription: &Subscription, payload: &[u8]) -> Result<()> {
        WebPushDispatcher::send(self, subscription, payload).await
    }

    async fn dispatch(
        &self,
        subscriptions: &[Subscription],
        notification: &Notification,
    ) -> DispatchReport {
        WebPushDispatcher::dispatch(self, subscriptions, notification).await
    }
}
