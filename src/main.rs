use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use sirius_gateway::api::ApiServerBuilder;
use sirius_gateway::config::file::config_file_path;
use sirius_gateway::intent::build_model;
use sirius_gateway::{
    Assistant, Channel, CommandResult, Config, DeviceGateway, DeviceSession, IntentResolver,
};

/// Sirius - Voice and text command gateway for home automation
#[derive(Parser)]
#[command(name = "sirius", version, about)]
struct Cli {
    /// Port to listen on (overrides config)
    #[arg(long, env = "SIRIUS_PORT")]
    port: Option<u16>,

    /// Device address, e.g. 192.168.1.50 (overrides config)
    #[arg(long, env = "SIRIUS_DEVICE_ADDRESS")]
    device: Option<String>,

    /// Serve a static web UI from this directory
    #[arg(long, env = "SIRIUS_STATIC_DIR")]
    static_dir: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP gateway (default)
    Serve,
    /// Handle one utterance and print the reply
    Ask {
        /// What to say, e.g. "sirius open the garage"
        text: String,
        /// Treat the text as a speech transcript (wake word required)
        #[arg(long)]
        voice: bool,
    },
    /// Probe the configured device and print its status
    Probe,
    /// Print the config file location
    ConfigPath,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,sirius_gateway=info",
        1 => "info,sirius_gateway=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    if matches!(cli.command, Some(Command::ConfigPath)) {
        match config_file_path() {
            Some(path) => println!("{}", path.display()),
            None => anyhow::bail!("could not determine config directory"),
        }
        return Ok(());
    }

    let mut config = Config::load()?;
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(device) = cli.device {
        config.device.address = Some(device);
    }
    if let Some(dir) = cli.static_dir {
        config.server.static_dir = Some(dir);
    }
    tracing::debug!(?config, "loaded configuration");

    let session = Arc::new(build_session(&config)?);

    match cli.command {
        Some(Command::Probe) => probe(&session).await,
        Some(Command::Ask { text, voice }) => {
            let assistant = build_assistant(&config, session)?;
            ask(&assistant, &text, voice).await
        }
        Some(Command::Serve | Command::ConfigPath) | None => serve(&config, session).await,
    }
}

fn build_session(config: &Config) -> anyhow::Result<DeviceSession> {
    let gateway = DeviceGateway::new(config.device.timeouts);
    let session = match &config.device.address {
        Some(address) => DeviceSession::with_address(gateway, address)?,
        None => DeviceSession::new(gateway),
    };
    Ok(session)
}

fn build_assistant(config: &Config, session: Arc<DeviceSession>) -> anyhow::Result<Assistant> {
    let model = build_model(&config.llm)?;
    let resolver = IntentResolver::new(model, config.llm.timeout);
    Ok(
        Assistant::new(config.wake_word.gate(), resolver, session)
            .with_text_gating(config.wake_word.gate_text),
    )
}

/// Run the HTTP gateway until interrupted
async fn serve(config: &Config, session: Arc<DeviceSession>) -> anyhow::Result<()> {
    if session.address().await.is_some() {
        let result = session.probe().await;
        if !result.success {
            tracing::warn!(message = %result.message, "device not reachable at startup");
        }
    }

    let assistant = Arc::new(build_assistant(config, session)?);
    let wake_word = config.wake_word.gate().primary().map(ToString::to_string);

    let server = ApiServerBuilder::new(assistant)
        .port(config.server.port)
        .static_dir(config.server.static_dir.clone())
        .build();

    match wake_word {
        Some(ww) => tracing::info!("sirius gateway ready - say \"{ww}\""),
        None => tracing::info!("sirius gateway ready"),
    }

    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => tracing::info!("shutdown requested"),
    }

    Ok(())
}

/// Handle one utterance from the command line
async fn ask(assistant: &Assistant, text: &str, voice: bool) -> anyhow::Result<()> {
    if assistant.session().address().await.is_some() {
        let result = assistant.session().probe().await;
        if let Some(note) = probe_note(&result) {
            tracing::warn!(message = %result.message, "device not reachable");
            eprintln!("{note}");
        }
    }

    let channel = if voice { Channel::Voice } else { Channel::Text };
    let interaction = assistant.handle_text(text, channel).await?;

    match interaction.reply_text() {
        Some(reply) => println!("{reply}"),
        None => println!("(not addressed to the assistant)"),
    }

    Ok(())
}

/// Why the device probe failed, shown ahead of the reply
fn probe_note(result: &CommandResult) -> Option<String> {
    (!result.success).then(|| format!("device: {}", result.message))
}

/// Probe the configured device
async fn probe(session: &DeviceSession) -> anyhow::Result<()> {
    let result = session.probe().await;
    if !result.success {
        anyhow::bail!("{}", result.message);
    }

    println!("{}", result.message);
    if let Some(data) = &result.data {
        println!("{}", serde_json::to_string_pretty(data)?);
    }

    Ok(())
}
