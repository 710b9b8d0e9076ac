//! Batch delivery command.

use crate::commands::{load_settings, print_report, read_json, write_gone};
use crate::error::{CliError, CliResult};
use pwa_push::{Notification, Subscription, WebPushDispatcher};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Arguments for `pwa-push send`.
pub struct SendArgs {
    pub subscriptions: PathBuf,
    pub title: String,
    pub body: String,
    pub url: Option<String>,
    pub icon: Option<String>,
    pub tag: Option<String>,
    pub gone_output: Option<PathBuf>,
}

pub async fn run(config: Option<&Path>, args: SendArgs, quiet: bool) -> CliResult<()> {
    let subscriptions: Vec<Subscription> = read_json(&args.subscriptions)?;
    if subscriptions.is_empty() {
        println!("No subscriptions to notify");
        return Ok(());
    }

    let (keys, dispatcher_config) = load_settings(config)?.into_parts()?;
    let dispatcher = WebPushDispatcher::new(&keys, dispatcher_config)?;

    let mut notification = Notification::new(args.title, args.body);
    notification.url = args.url;
    notification.icon = args.icon;
    notification.tag = args.tag;

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, cancelling remaining deliveries");
            interrupt.cancel();
        }
    });

    let report = dispatcher
        .dispatch_with_cancel(&subscriptions, &notification, &cancel)
        .await;

    print_report(&report, quiet);
    if let Some(path) = &args.gone_output {
        write_gone(&report, path)?;
    }

    if cancel.is_cancelled() {
        return Err(CliError::Interrupted);
    }
    if report.delivered() == 0 {
        return Err(CliError::NothingDelivered {
            failed: report.failed(),
        });
    }
    Ok(())
}
