use deckbot_core::config::{AppConfig, LoadOptions};
use deckbot_db::{connect_with_config, migrations, ping};
use secrecy::ExposeSecret;
use serde::Serialize;

use crate::commands::config::redact_token;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum Status {
    Pass,
    Warn,
    Fail,
    Skipped,
}

impl Status {
    fn marker(self) -> &'static str {
        match self {
            Self::Pass => "ok",
            Self::Warn => "warn",
            Self::Fail => "fail",
            Self::Skipped => "skip",
        }
    }
}

#[derive(Debug, Serialize)]
struct Finding {
    name: &'static str,
    status: Status,
    details: String,
}

impl Finding {
    fn new(name: &'static str, status: Status, details: impl Into<String>) -> Self {
        Self { name, status, details: details.into() }
    }
}

#[derive(Debug, Serialize)]
struct Report {
    overall_status: Status,
    summary: String,
    checks: Vec<Finding>,
}

impl Report {
    // A missing PDF converter only degrades quotations, so warnings still pass.
    fn from_findings(checks: Vec<Finding>) -> Self {
        let failed = checks.iter().filter(|check| check.status == Status::Fail).count();
        let skipped = checks.iter().filter(|check| check.status == Status::Skipped).count();
        let (overall_status, summary) = if failed == 0 && skipped == 0 {
            (Status::Pass, "doctor: ready to serve".to_string())
        } else {
            (Status::Fail, format!("doctor: {failed} check(s) failed, {skipped} skipped"))
        };
        Self { overall_status, summary, checks }
    }

    fn to_text(&self) -> String {
        std::iter::once(self.summary.clone())
            .chain(self.checks.iter().map(|check| {
                format!("- [{}] {}: {}", check.status.marker(), check.name, check.details)
            }))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

const AFTER_CONFIG: [&str; 4] =
    ["whatsapp_credentials", "llm_endpoint", "database_connectivity", "pdf_converter"];

pub fn run(json_output: bool) -> String {
    let report = Report::from_findings(collect_findings());

    if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|_| {
            r#"{"overall_status":"fail","summary":"doctor report could not be encoded","checks":[]}"#
                .to_string()
        })
    } else {
        report.to_text()
    }
}

fn collect_findings() -> Vec<Finding> {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            let failed = Finding::new("config_validation", Status::Fail, error.to_string());
            return std::iter::once(failed)
                .chain(AFTER_CONFIG.into_iter().map(|name| {
                    Finding::new(name, Status::Skipped, "needs a valid configuration")
                }))
                .collect();
        }
    };

    vec![
        Finding::new("config_validation", Status::Pass, "configuration loaded and validated"),
        whatsapp_credentials(&config),
        llm_endpoint(&config),
        database_connectivity(&config),
        pdf_converter(&config),
    ]
}

fn whatsapp_credentials(config: &AppConfig) -> Finding {
    Finding::new(
        "whatsapp_credentials",
        Status::Pass,
        format!(
            "phone number id {} with token {} against {}",
            config.whatsapp.phone_number_id,
            redact_token(config.whatsapp.access_token.expose_secret()),
            config.whatsapp.api_base_url
        ),
    )
}

fn llm_endpoint(config: &AppConfig) -> Finding {
    Finding::new(
        "llm_endpoint",
        Status::Pass,
        format!(
            "{} model `{}` at {}/chat/completions",
            config.llm.provider.as_str(),
            config.llm.model,
            config.llm.effective_base_url()
        ),
    )
}

fn pdf_converter(config: &AppConfig) -> Finding {
    let located = match &config.documents.wkhtmltopdf_path {
        Some(path) => path.exists().then(|| path.clone()),
        None => which::which("wkhtmltopdf").ok(),
    };

    match located {
        Some(path) => Finding::new(
            "pdf_converter",
            Status::Pass,
            format!("wkhtmltopdf at `{}`", path.display()),
        ),
        None => Finding::new(
            "pdf_converter",
            Status::Warn,
            "wkhtmltopdf not found; quotations will end with a generation error",
        ),
    }
}

fn database_connectivity(config: &AppConfig) -> Finding {
    const NAME: &str = "database_connectivity";

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => return Finding::new(NAME, Status::Fail, format!("no async runtime: {error}")),
    };

    let probe = runtime.block_on(async {
        let pool = connect_with_config(&config.database)
            .await
            .map_err(|error| format!("cannot open `{}`: {error}", config.database.url))?;
        let pinged = ping(&pool).await.map_err(|error| format!("probe query failed: {error}"));
        pool.close().await;
        pinged
    });

    match probe {
        Ok(()) => Finding::new(
            NAME,
            Status::Pass,
            format!(
                "connected using `{}` ({} migration(s) bundled)",
                config.database.url,
                migrations::bundled_count()
            ),
        ),
        Err(details) => Finding::new(NAME, Status::Fail, details),
    }
}
