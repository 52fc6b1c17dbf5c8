use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;
use url::Url;

use crate::error::DebuggerError;
use crate::observe::ObserveOptions;
use crate::transport::SocketChannel;

pub const DEFAULT_SERVER_URL: &str = "ws://localhost:4000/debugger";

/// Debugging runs only when asked for and not explicitly switched off.
pub fn debugging_requested(webhook: bool, disabled: bool) -> bool {
    webhook && !disabled
}

#[derive(Debug, Clone)]
pub struct DebuggerSettings {
    pub server_url: String,
    /// JSON file holding `{"webhook": {"uuid": ...}}`.
    pub credentials_path: PathBuf,
    /// Directory of per-locale model files.
    pub models_dir: PathBuf,
    pub config_path: PathBuf,
    pub language_model_enabled: bool,
    pub observe: ObserveOptions,
}

impl Default for DebuggerSettings {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            credentials_path: default_credentials_path(),
            models_dir: PathBuf::from("models"),
            config_path: PathBuf::from("debugger.json"),
            language_model_enabled: true,
            observe: ObserveOptions::default(),
        }
    }
}

impl DebuggerSettings {
    pub fn webhook_id(&self) -> Result<String, DebuggerError> {
        read_webhook_id(&self.credentials_path)
    }

    /// Socket url for this app, carrying its webhook id.
    pub fn connection_url(&self) -> Result<Url, DebuggerError> {
        let webhook_id = self.webhook_id()?;
        Ok(SocketChannel::service_url(&self.server_url, &webhook_id)?)
    }
}

fn default_credentials_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_default()
        .join(".jovo")
        .join("config")
}

pub fn read_webhook_id(path: &Path) -> Result<String, DebuggerError> {
    let not_found = || DebuggerError::WebhookIdNotFound {
        path: path.to_path_buf(),
    };
    let text = fs::read_to_string(path).map_err(|_| not_found())?;
    let json: serde_json::Value = serde_json::from_str(&text).map_err(|_| not_found())?;
    json.pointer("/webhook/uuid")
        .and_then(serde_json::Value::as_str)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .ok_or_else(not_found)
}

/// Shortcut shown in the remote UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebuggerButton {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,
    /// Full request to replay, when the button is more than an intent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<serde_json::Value>,
}

/// Configuration pushed to the remote UI on connect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebuggerConfig {
    #[serde(default)]
    pub locales: Vec<String>,
    #[serde(default)]
    pub buttons: Vec<DebuggerButton>,
    /// Anything else is passed through to the UI untouched.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Default for DebuggerConfig {
    fn default() -> Self {
        Self {
            locales: vec!["en-US".to_string()],
            buttons: vec![DebuggerButton {
                label: "LAUNCH".to_string(),
                input: None,
                intent: Some("LAUNCH".to_string()),
                request: None,
            }],
            extra: serde_json::Map::new(),
        }
    }
}

impl DebuggerConfig {
    pub fn load(path: &Path) -> Result<Self, DebuggerError> {
        let text = fs::read_to_string(path).map_err(|source| DebuggerError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|e| DebuggerError::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!("{}; using default debugger config", e);
                Self::default()
            }
        }
    }
}
