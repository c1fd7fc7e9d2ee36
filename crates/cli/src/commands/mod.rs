pub mod config;
pub mod doctor;
pub mod migrate;
pub mod remind;

use serde::Serialize;
use tokio::runtime::Runtime;

/// What went wrong, and the process exit code scripts can branch on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    ConfigValidation,
    RuntimeInit,
    ChannelInit,
    DbConnectivity,
    Migration,
    Query,
    PartialDelivery,
}

impl FailureClass {
    pub fn exit_code(self) -> u8 {
        match self {
            Self::ConfigValidation => 2,
            Self::RuntimeInit | Self::ChannelInit => 3,
            Self::DbConnectivity => 4,
            Self::Migration => 5,
            Self::Query => 6,
            Self::PartialDelivery => 7,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum Payload<'a> {
    Ok { command: &'a str, message: &'a str },
    Error { command: &'a str, error_class: FailureClass, message: &'a str },
}

impl CommandResult {
    /// Free-form output that is not a JSON status line.
    pub fn plain(output: String) -> Self {
        Self { exit_code: 0, output }
    }

    pub fn success(command: &str, message: impl AsRef<str>) -> Self {
        let payload = Payload::Ok { command, message: message.as_ref() };
        Self { exit_code: 0, output: render(&payload) }
    }

    pub fn failure(command: &str, class: FailureClass, message: impl AsRef<str>) -> Self {
        let payload = Payload::Error { command, error_class: class, message: message.as_ref() };
        Self { exit_code: class.exit_code(), output: render(&payload) }
    }
}

/// Commands are synchronous entry points; each builds its own small runtime.
pub(crate) fn current_thread_runtime(command: &str) -> Result<Runtime, CommandResult> {
    tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(|error| {
        CommandResult::failure(
            command,
            FailureClass::RuntimeInit,
            format!("failed to initialize async runtime: {error}"),
        )
    })
}

fn render(payload: &Payload<'_>) -> String {
    serde_json::to_string(payload).unwrap_or_else(|_| {
        r#"{"status":"error","command":"unknown","error_class":"serialization","message":"output could not be encoded"}"#
            .to_string()
    })
}
