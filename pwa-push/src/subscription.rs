//! Browser push subscription records.

use serde::{Deserialize, Serialize};

/// Web Push subscription keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionKeys {
    /// User agent P-256 public key (base64url).
    pub p256dh: String,
    /// Auth secret (base64url).
    pub auth: String,
}

/// Web Push subscription.
///
/// Deserializes from the browser's `PushSubscription.toJSON()` shape
/// (`{"endpoint", "keys": {"p256dh", "auth"}}`) as well as the flat row form
/// (`{"endpoint", "p256dh", "auth"}`) hosts usually store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "SubscriptionRecord")]
pub struct Subscription {
    /// Push service endpoint URL.
    pub endpoint: String,
    /// Subscription keys.
    pub keys: SubscriptionKeys,
    /// Platform reported at subscribe time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    /// Preferred language reported at subscribe time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
}

impl Subscription {
    /// Create a new subscription.
    pub fn new(
        endpoint: impl Into<String>,
        p256dh: impl Into<String>,
        auth: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            keys: SubscriptionKeys {
                p256dh: p256dh.into(),
                auth: auth.into(),
            },
            platform: None,
            lang: None,
        }
    }

    /// Set the platform.
    pub fn platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = Some(platform.into());
        self
    }

    /// Set the language.
    pub fn lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = Some(lang.into());
        self
    }

    /// Endpoint shortened for log output; push endpoints embed long opaque tokens.
    pub fn endpoint_summary(&self) -> String {
        summarize_endpoint(&self.endpoint)
    }
}

/// Keep at most the first 48 characters of an endpoint.
pub(crate) fn summarize_endpoint(endpoint: &str) -> String {
    const MAX: usize = 48;
    match endpoint.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}…", &endpoint[..idx]),
        None => endpoint.to_string(),
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum KeysShape {
    Nested { keys: SubscriptionKeys },
    Flat { p256dh: String, auth: String },
}

#[derive(Deserialize)]
struct SubscriptionRecord {
    endpoint: String,
    #[serde(flatten)]
    keys: KeysShape,
    #[serde(default)]
    platform: Option<String>,
    #[serde(default)]
    lang: Option<String>,
}

impl From<SubscriptionRecord> for Subscription {
    fn from(record: SubscriptionRecord) -> Self {
        let keys = match record.keys {
            KeysShape::Nested { keys } => keys,
            KeysShape::Flat { p256dh, auth } => SubscriptionKeys { p256dh, auth },
        };
        Self {
            endpoint: record.endpoint,
            keys,
            platform: record.platform,
            lang: record.lang,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_browser_shape() {
        let json = r#"{
            "endpoint": "https://fcm.googleapis.com/fcm/send/abc",
            "expirationTime": null,
            "keys": {"p256dh": "BPk", "auth": "xyz"}
        }"#;
        let sub: Subscription = serde_json::from_str(json).unwrap();
        assert_eq!(sub.endpoint, "https://fcm.googleapis.com/fcm/send/abc");
        assert_eq!(sub.keys.p256dh, "BPk");
        assert_eq!(sub.keys.auth, "xyz");
        assert_eq!(sub.platform, None);
    }

    #[test]
    fn test_deserialize_flat_shape() {
        let json = r#"{
            "endpoint": "https://push.example.com/1",
            "p256dh": "key",
            "auth": "secret",
            "platform": "android",
            "lang": "fr"
        }"#;
        let sub: Subscription = serde_json::from_str(json).unwrap();
        assert_eq!(sub.keys.p256dh, "key");
        assert_eq!(sub.platform.as_deref(), Some("android"));
        assert_eq!(sub.lang.as_deref(), Some("fr"));
    }

    #[test]
    fn test_serde_round_trip() {
        let sub = Subscription::new("https://push.example.com/1", "key", "secret").lang("en");
        let json = serde_json::to_string(&sub).unwrap();
        let loaded: Subscription = serde_json::from_str(&json).unwrap();
        assert_eq!(sub, loaded);
    }

    #[test]
    fn test_endpoint_summary() {
        let short = Subscription::new("https://push.example.com/1", "k", "a");
        assert_eq!(short.endpoint_summary(), "https://push.example.com/1");

        let long = Subscription::new(format!("https://fcm.googleapis.com/fcm/send/{}", "x".repeat(100)), "k", "a");
        let summary = long.endpoint_summary();
        assert!(summary.ends_with('…'));
        assert_eq!(summary.chars().count(), 49);
    }
}
