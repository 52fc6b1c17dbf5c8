use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use clap::Parser;
use session_probe::debugger::{debugging_requested, ConsoleTee, Debugger, DebuggerSettings};
use session_probe::pipeline::{Handler, MockTransport, PipelineBuilder, WebhookSurface};
use session_probe::transport::SocketChannel;
use session_probe::Value;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Debug, Parser)]
#[command(name = "session-probe", about = "Demo app with an optional live remote debugger")]
struct Cli {
    /// Run behind the remote webhook, which enables debugging.
    #[arg(long)]
    webhook: bool,

    #[arg(long)]
    disable_debugger: bool,

    #[arg(long, default_value = session_probe::debugger::config::DEFAULT_SERVER_URL)]
    debugger_url: String,

    #[arg(long, default_value = "models")]
    models_dir: PathBuf,

    #[arg(long, default_value = "debugger.json")]
    debugger_config: PathBuf,

    /// Overrides the credential file holding the webhook id.
    #[arg(long)]
    credentials: Option<PathBuf>,

    #[arg(long)]
    no_language_model: bool,
}

impl Cli {
    fn settings(&self) -> DebuggerSettings {
        let defaults = DebuggerSettings::default();
        DebuggerSettings {
            server_url: self.debugger_url.clone(),
            credentials_path: self.credentials.clone().unwrap_or(defaults.credentials_path),
            models_dir: self.models_dir.clone(),
            config_path: self.debugger_config.clone(),
            language_model_enabled: !self.no_language_model,
            observe: defaults.observe,
        }
    }
}

/// Counts visits in session data and says so.
struct CounterApp;

#[async_trait]
impl Handler for CounterApp {
    async fn handle(&self, context: &Value) -> anyhow::Result<()> {
        let data = context.path("$session.data");
        let count = data.get("count").as_f64().unwrap_or(0.0) + 1.0;
        data.set("count", count);

        let speech = match context.get("$type").as_str() {
            Some("LAUNCH") if count <= 1.0 => "Welcome!".to_string(),
            _ => format!("You have been here {count} times."),
        };
        context.get("$output").set("speech", speech);
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let console = ConsoleTee::new();
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(console.writer())
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("setting default subscriber")?;

    let mut builder = PipelineBuilder::app();
    builder
        .surface(Arc::new(WebhookSurface))
        .handler(Arc::new(CounterApp));

    let remote = if debugging_requested(cli.webhook, cli.disable_debugger) {
        let settings = cli.settings();
        let socket = SocketChannel::new(settings.connection_url()?);
        let debugger = Debugger::new(socket.clone(), settings, Some(Arc::clone(&console)));
        debugger.install(&mut builder)?;
        Some((socket, debugger))
    } else {
        None
    };

    let pipeline = Arc::new(builder.build()?);

    if let Some((socket, debugger)) = &remote {
        debugger.attach(&pipeline);
        socket
            .connect()
            .await
            .with_context(|| format!("connecting to remote debugger at {}", socket.url()))?;
    }

    tracing::info!("Ready. One JSON request per line.");
    let mut out = console.stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let payload: serde_json::Value = match serde_json::from_str(&line) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!("not a JSON request: {}", e);
                continue;
            }
        };
        let mut transport = MockTransport::new(payload);
        match pipeline.handle(&mut transport).await {
            Ok(response) => writeln!(out, "{response}")?,
            Err(e) => tracing::error!("request failed: {}", e),
        }
    }

    if remote.is_some() {
        tracing::info!("Input closed; serving debugger requests until Ctrl+C.");
        tokio::signal::ctrl_c().await?;
    }
    Ok(())
}
