//! Publish-event triggers.
//!
//! Decides whether a content event should notify subscribers and renders
//! the notification from simple `{placeholder}` templates. Delivery goes
//! through whatever [`PushProvider`] the engine was built with.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::{DispatchReport, Notification, PushProvider, Subscription};

/// Replace every `{key}` in `template` with `values[key]`.
///
/// Unknown placeholders are left as written. Substituted values are copied
/// verbatim and never scanned again, so a value containing `{title}` stays
/// literal. There is no escaping and no nesting.
pub fn render_placeholders(template: &str, values: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];

        match after.find(['{', '}']) {
            Some(close) if after.as_bytes()[close] == b'}' => {
                let key = &after[..close];
                match values.get(key) {
                    Some(value) => out.push_str(value),
                    None => {
                        out.push('{');
                        out.push_str(key);
                        out.push('}');
                    }
                }
                rest = &after[close + 1..];
            }
            _ => {
                out.push('{');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

/// A published piece of content.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PublishEvent {
    /// Content identifier.
    pub post_id: u64,
    /// Content type (`post`, `page`, ...).
    pub post_type: String,
    /// Title.
    pub title: String,
    /// Short summary.
    #[serde(default)]
    pub excerpt: String,
    /// Public URL.
    pub permalink: String,
    /// Author display name.
    #[serde(default)]
    pub author: String,
    /// Site name.
    #[serde(default)]
    pub site_name: String,
    /// Featured image URL.
    #[serde(default)]
    pub thumbnail: Option<String>,
}

impl PublishEvent {
    /// Placeholder values available to templates.
    pub fn values(&self) -> HashMap<String, String> {
        let mut values = HashMap::from([
            ("post_id".to_string(), self.post_id.to_string()),
            ("post_type".to_string(), self.post_type.clone()),
            ("title".to_string(), self.title.clone()),
            ("excerpt".to_string(), self.excerpt.clone()),
            ("permalink".to_string(), self.permalink.clone()),
            ("author".to_string(), self.author.clone()),
            ("site_name".to_string(), self.site_name.clone()),
        ]);
        if let Some(thumbnail) = &self.thumbnail {
            values.insert("thumbnail".to_string(), thumbnail.clone());
        }
        values
    }
}

/// Notification fields as placeholder templates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationTemplate {
    /// Title template.
    pub title: String,
    /// Body template.
    pub body: String,
    /// Icon URL template.
    #[serde(default)]
    pub icon: Option<String>,
    /// Badge URL template.
    #[serde(default)]
    pub badge: Option<String>,
    /// Tag template.
    #[serde(default)]
    pub tag: Option<String>,
    /// Click URL template.
    #[serde(default)]
    pub url: Option<String>,
}

impl Default for NotificationTemplate {
    fn default() -> Self {
        Self {
            title: "{title}".to_string(),
            body: "{excerpt}".to_string(),
            icon: None,
            badge: None,
            tag: Some("post-{post_id}".to_string()),
            url: Some("{permalink}".to_string()),
        }
    }
}

impl NotificationTemplate {
    /// Render a notification for `event`.
    pub fn render(&self, event: &PublishEvent) -> Notification {
        let values = event.values();
        let render = |t: &Option<String>| t.as_deref().map(|t| render_placeholders(t, &values));

        Notification {
            title: render_placeholders(&self.title, &values),
            body: render_placeholders(&self.body, &values),
            icon: render(&self.icon),
            badge: render(&self.badge),
            tag: render(&self.tag),
            url: render(&self.url),
            data: HashMap::from([
                ("post_id".to_string(), serde_json::Value::from(event.post_id)),
                ("post_type".to_string(), serde_json::Value::from(event.post_type.clone())),
            ]),
        }
    }
}

/// A notification rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name, used in logs.
    pub name: String,
    /// Disabled scenarios never match.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Content types this scenario reacts to; empty matches any.
    #[serde(default)]
    pub post_types: Vec<String>,
    /// Notification template.
    #[serde(default)]
    pub template: NotificationTemplate,
}

fn default_enabled() -> bool {
    true
}

impl Scenario {
    /// Create an enabled scenario matching any content type.
    pub fn new(name: impl Into<String>, template: NotificationTemplate) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            post_types: Vec::new(),
            template,
        }
    }

    /// Restrict to a content type.
    pub fn post_type(mut self, post_type: impl Into<String>) -> Self {
        self.post_types.push(post_type.into());
        self
    }

    /// Enable or disable.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Whether `event` should trigger this scenario.
    pub fn matches(&self, event: &PublishEvent) -> bool {
        self.enabled
            && (self.post_types.is_empty() || self.post_types.iter().any(|t| *t == event.post_type))
    }
}

/// Result of one scenario firing.
#[derive(Debug)]
pub struct ScenarioReport {
    /// Scenario name.
    pub scenario: String,
    /// The rendered notification.
    pub notification: Notification,
    /// Delivery results.
    pub report: DispatchReport,
}

/// Matches publish events against scenarios and dispatches notifications.
#[derive(Clone)]
pub struct TriggerEngine {
    provider: Arc<dyn PushProvider>,
    scenarios: Vec<Scenario>,
}

impl TriggerEngine {
    /// Create an engine without scenarios.
    pub fn new(provider: Arc<dyn PushProvider>) -> Self {
        Self {
            provider,
            scenarios: Vec::new(),
        }
    }

    /// Add a scenario.
    pub fn scenario(mut self, scenario: Scenario) -> Self {
        self.scenarios.push(scenario);
        self
    }

    /// Configured scenarios.
    pub fn scenarios(&self) -> &[Scenario] {
        &self.scenarios
    }

    /// Fire every matching scenario for `event`.
    pub async fn on_publish(
        &self,
        event: &PublishEvent,
        subscriptions: &[Subscription],
    ) -> Vec<ScenarioReport> {
        let mut reports = Vec::new();

        for scenario in self.scenarios.iter().filter(|s| s.matches(event)) {
            let notification = scenario.template.render(event);
            debug!(scenario = %scenario.name, post_id = event.post_id, "Scenario matched");

            let report = self.provider.dispatch(subscriptions, &notification).await;
            info!(
                scenario = %scenario.name,
                post_id = event.post_id,
                delivered = report.delivered(),
                failed = report.failed(),
                "Scenario dispatched"
            );

            reports.push(ScenarioReport {
                scenario: scenario.name.clone(),
                notification,
                report,
            });
        }

        reports
    }

    /// Fire-and-forget variant of [`on_publish`](Self::on_publish).
    pub fn spawn_on_publish(
        &self,
        event: PublishEvent,
        subscriptions: Vec<Subscription>,
    ) -> JoinHandle<Vec<ScenarioReport>> {
        let engine = self.clone();
        tokio::spawn(async move { engine.on_publish(&event, &subscriptions).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PushError, Result};
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct CapturingProvider {
        payloads: Mutex<Vec<Vec<u8>>>,
    }

    #[async_trait]
    impl PushProvider for CapturingProvider {
        async fn send(&self, subscription: &Subscription, payload: &[u8]) -> Result<()> {
            self.payloads.lock().unwrap().push(payload.to_vec());
            if subscription.endpoint.ends_with("/gone") {
                return Err(PushError::Gone { status: 410 });
            }
            Ok(())
        }
    }

    fn values(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn event() -> PublishEvent {
        PublishEvent {
            post_id: 42,
            post_type: "post".to_string(),
            title: "Hello World".to_string(),
            excerpt: "First post".to_string(),
            permalink: "https://example.com/hello-world".to_string(),
            author: "Sam".to_string(),
            site_name: "Example".to_string(),
            thumbnail: None,
        }
    }

    #[test]
    fn test_render_placeholders() {
        let v = values(&[("title", "Hello"), ("site", "Blog")]);
        assert_eq!(render_placeholders("{title} on {site}", &v), "Hello on Blog");
        assert_eq!(render_placeholders("no placeholders", &v), "no placeholders");
        assert_eq!(render_placeholders("", &v), "");
    }

    #[test]
    fn test_unknown_placeholders_are_kept() {
        let v = values(&[("title", "Hello")]);
        assert_eq!(render_placeholders("{title} {missing}", &v), "Hello {missing}");
    }

    #[test]
    fn test_values_are_not_rescanned() {
        let v = values(&[("title", "{site}"), ("site", "Blog")]);
        assert_eq!(render_placeholders("{title}", &v), "{site}");
    }

    #[test]
    fn test_unbalanced_braces() {
        let v = values(&[("title", "Hello")]);
        assert_eq!(render_placeholders("{{title}", &v), "{Hello");
        assert_eq!(render_placeholders("{title", &v), "{title");
        assert_eq!(render_placeholders("}{title}{", &v), "}Hello{");
    }

    #[test]
    fn test_default_template_render() {
        let notification = NotificationTemplate::default().render(&event());
        assert_eq!(notification.title, "Hello World");
        assert_eq!(notification.body, "First post");
        assert_eq!(notification.tag.as_deref(), Some("post-42"));
        assert_eq!(notification.url.as_deref(), Some("https://example.com/hello-world"));
        assert_eq!(notification.data["post_id"], 42);
    }

    #[test]
    fn test_scenario_matching() {
        let any = Scenario::new("any", NotificationTemplate::default());
        let pages = Scenario::new("pages", NotificationTemplate::default()).post_type("page");
        let off = Scenario::new("off", NotificationTemplate::default()).enabled(false);

        assert!(any.matches(&event()));
        assert!(!pages.matches(&event()));
        assert!(!off.matches(&event()));
    }

    #[tokio::test]
    async fn test_on_publish_dispatches_matching_scenarios() {
        let provider = Arc::new(CapturingProvider::default());
        let template = NotificationTemplate {
            title: "New on {site_name}".to_string(),
            body: "{title} by {author}".to_string(),
            ..Default::default()
        };
        let engine = TriggerEngine::new(provider.clone())
            .scenario(Scenario::new("posts", template).post_type("post"))
            .scenario(Scenario::new("pages", NotificationTemplate::default()).post_type("page"));

        let subs = vec![
            Subscription::new("https://push.example.com/a", "k", "a"),
            Subscription::new("https://push.example.com/gone", "k", "a"),
        ];
        let reports = engine.on_publish(&event(), &subs).await;

        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].scenario, "posts");
        assert_eq!(reports[0].notification.title, "New on Example");
        assert_eq!(reports[0].notification.body, "Hello World by Sam");
        assert_eq!(reports[0].report.delivered(), 1);
        assert_eq!(reports[0].report.gone_endpoints(), vec!["https://push.example.com/gone"]);

        let payloads = provider.payloads.lock().unwrap();
        assert_eq!(payloads.len(), 2);
        let json: serde_json::Value = serde_json::from_slice(&payloads[0]).unwrap();
        assert_eq!(json["title"], "New on Example");
    }

    #[tokio::test]
    async fn test_spawn_on_publish() {
        let provider = Arc::new(CapturingProvider::default());
        let engine = TriggerEngine::new(provider.clone())
            .scenario(Scenario::new("all", NotificationTemplate::default()));

        let handle = engine.spawn_on_publish(
            event(),
            vec![Subscription::new("https://push.example.com/a", "k", "a")],
        );
        let reports = handle.await.unwrap();

        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].report.delivered(), 1);
    }
}
