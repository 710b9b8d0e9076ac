//! Publish-event command: runs trigger scenarios against a content event.

use crate::commands::{load_settings, print_report, read_json};
use crate::error::{CliError, CliResult};
use pwa_push::{
    NotificationTemplate, PublishEvent, Scenario, Subscription, TriggerEngine, WebPushDispatcher,
};
use std::path::Path;
use std::sync::Arc;

pub async fn run(
    config: Option<&Path>,
    event: &Path,
    subscriptions: &Path,
    scenarios: Option<&Path>,
    quiet: bool,
) -> CliResult<()> {
    let event: PublishEvent = read_json(event)?;
    let subscriptions: Vec<Subscription> = read_json(subscriptions)?;
    let scenarios: Vec<Scenario> = match scenarios {
        Some(path) => read_json(path)?,
        None => vec![Scenario::new("publish", NotificationTemplate::default())],
    };

    let (keys, dispatcher_config) = load_settings(config)?.into_parts()?;
    let dispatcher = WebPushDispatcher::new(&keys, dispatcher_config)?;

    let engine = scenarios
        .into_iter()
        .fold(TriggerEngine::new(Arc::new(dispatcher)), TriggerEngine::scenario);

    let mut handle = engine.spawn_on_publish(event, subscriptions);
    let reports = tokio::select! {
        joined = &mut handle => joined.map_err(|e| CliError::Io(std::io::Error::other(e)))?,
        _ = tokio::signal::ctrl_c() => {
            handle.abort();
            return Err(CliError::Interrupted);
        }
    };

    if reports.is_empty() {
        println!("No scenario matched");
        return Ok(());
    }

    for scenario in &reports {
        println!("{}: \"{}\"", scenario.scenario, scenario.notification.title);
        print_report(&scenario.report, quiet);
    }
    Ok(())
}
