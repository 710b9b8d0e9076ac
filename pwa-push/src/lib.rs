//! # PWA Push
//!
//! Web Push delivery with VAPID authentication for published content.
//!
//! ## Features
//!
//! - **VAPID**: ES256 JWTs signed with the site's P-256 key (RFC 8292)
//! - **Dispatch**: concurrent delivery with per-subscription results
//! - **Encryption**: optional `aes128gcm` payload encryption (RFC 8291)
//! - **Triggers**: publish events rendered into notifications from templates
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pwa_push::{DispatcherConfig, Notification, Subscription, VapidKeyPair, WebPushDispatcher};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let keys = VapidKeyPair::generate()?;
//!     let dispatcher = WebPushDispatcher::new(&keys, DispatcherConfig::new("admin@example.com"))?;
//!
//!     let subscriptions: Vec<Subscription> = serde_json::from_str(&stored_rows)?;
//!     let report = dispatcher
//!         .dispatch(&subscriptions, &Notification::new("New post", "Hello World"))
//!         .await;
//!
//!     for endpoint in report.gone_endpoints() {
//!         // delete the subscription
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Triggers
//!
//! ```rust,ignore
//! use pwa_push::{NotificationTemplate, PublishEvent, Scenario, TriggerEngine};
//! use std::sync::Arc;
//!
//! let engine = TriggerEngine::new(Arc::new(dispatcher))
//!     .scenario(Scenario::new("posts", NotificationTemplate::default()).post_type("post"));
//!
//! let reports = engine.on_publish(&event, &subscriptions).await;
//! ```

pub mod base64url;
pub mod encryption;
pub mod signature;

mod dispatcher;
mod error;
mod keys;
mod notification;
mod provider;
mod subscription;
mod trigger;
mod vapid;

pub use dispatcher::{ContentEncoding, DispatcherConfig, WebPushDispatcher};
pub use error::{PushError, Result};
pub use keys::{PUBLIC_KEY_SIZE, VapidKeyPair, parse_private_key_pem};
pub use notification::{Notification, Urgency};
pub use provider::{DeliveryResult, DispatchReport, PushProvider};
pub use subscription::{Subscription, SubscriptionKeys};
pub use trigger::{
    NotificationTemplate, PublishEvent, Scenario, ScenarioReport, TriggerEngine,
    render_placeholders,
};
pub use vapid::{
    DerSigner, JWT_EXPIRATION_SECS, VapidClaims, VapidHeader, VapidJwtBuilder, audience, build_jwt,
};

/// Prelude for common imports.
///
/// ```
/// use pwa_push::prelude::*;
/// ```
pub mod prelude {
    pub use crate::dispatcher::{ContentEncoding, DispatcherConfig, WebPushDispatcher};
    pub use crate::error::{PushError, Result};
    pub use crate::keys::VapidKeyPair;
    pub use crate::notification::{Notification, Urgency};
    pub use crate::provider::{DispatchReport, PushProvider};
    pub use crate::subscription::Subscription;
    pub use crate::trigger::{NotificationTemplate, PublishEvent, Scenario, TriggerEngine};
}
