use std::sync::Arc;

use chrono::Utc;
use deckbot_core::config::{AppConfig, LoadOptions};
use deckbot_core::{ReminderSettings, ReminderSweep};
use deckbot_db::{connect_with_config, migrations, SqlAppointmentRepository};
use deckbot_whatsapp::CloudApiClient;

use crate::commands::{current_thread_runtime, CommandResult, FailureClass};

/// Runs one reminder pass. Scheduling repeated passes is left to cron or a
/// systemd timer.
pub fn run(dry_run: bool) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "remind",
                FailureClass::ConfigValidation,
                format!("configuration issue: {error}"),
            );
        }
    };
    init_logging(&config);

    let offset = match config.flows.utc_offset() {
        Ok(offset) => offset,
        Err(error) => {
            return CommandResult::failure(
                "remind",
                FailureClass::ConfigValidation,
                error.to_string(),
            );
        }
    };
    let channel = match CloudApiClient::from_config(&config.whatsapp) {
        Ok(channel) => Arc::new(channel),
        Err(error) => {
            return CommandResult::failure("remind", FailureClass::ChannelInit, error.to_string())
        }
    };

    let runtime = match current_thread_runtime("remind") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    runtime.block_on(async {
        let pool = match connect_with_config(&config.database).await {
            Ok(pool) => pool,
            Err(error) => {
                return CommandResult::failure(
                    "remind",
                    FailureClass::DbConnectivity,
                    error.to_string(),
                );
            }
        };
        if let Err(error) = migrations::run_pending(&pool).await {
            pool.close().await;
            return CommandResult::failure("remind", FailureClass::Migration, error.to_string());
        }

        let sweep = ReminderSweep::new(
            Arc::new(SqlAppointmentRepository::new(pool.clone())),
            channel,
            ReminderSettings::from(&config.reminders),
            offset,
        );
        let now = Utc::now();
        let result =
            if dry_run { dry_run_listing(&sweep, now).await } else { send(&sweep, now).await };
        pool.close().await;
        result
    })
}

async fn dry_run_listing(sweep: &ReminderSweep, now: chrono::DateTime<Utc>) -> CommandResult {
    match sweep.due(now).await {
        Ok(due) => {
            let mut lines =
                vec![format!("{} appointment(s) due for a reminder (dry run)", due.len())];
            lines.extend(due.iter().map(|record| {
                format!(
                    "#{} {} {} ({})",
                    record.id,
                    record.scheduled_at.to_rfc3339(),
                    record.contact_user_id,
                    record.service
                )
            }));
            CommandResult::success("remind", lines.join("\n"))
        }
        Err(error) => CommandResult::failure("remind", FailureClass::Query, error.to_string()),
    }
}

async fn send(sweep: &ReminderSweep, now: chrono::DateTime<Utc>) -> CommandResult {
    match sweep.run_once(now).await {
        Ok(report) if report.failed.is_empty() => CommandResult::success(
            "remind",
            format!("due={} sent={} failed=0", report.due, report.sent.len()),
        ),
        Ok(report) => CommandResult::failure(
            "remind",
            FailureClass::PartialDelivery,
            format!(
                "due={} sent={} failed={} (ids: {:?})",
                report.due,
                report.sent.len(),
                report.failed.len(),
                report.failed
            ),
        ),
        Err(error) => CommandResult::failure("remind", FailureClass::Query, error.to_string()),
    }
}

// Progress goes to stderr so stdout stays a single JSON payload.
fn init_logging(config: &AppConfig) {
    let level = config.logging.level.parse::<tracing::Level>().unwrap_or(tracing::Level::INFO);
    let _ = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .compact()
        .try_init();
}
