use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use agentchat::{app, logging, AgentOrchestrator, Config, HttpAgentClient, SendState};

#[derive(Parser)]
#[command(name = "agentchat")]
#[command(version)]
#[command(about = "Chat with a conversational agent server from the terminal", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file (default: ~/.agentchat/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Agent server root URL
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Agent application name
    #[arg(long, global = true)]
    app_name: Option<String>,

    #[arg(long, global = true)]
    user_id: Option<String>,

    #[arg(long, global = true)]
    session_id: Option<String>,

    /// Start a fresh session with a random id
    #[arg(long, global = true, conflicts_with = "session_id")]
    new_session: bool,

    /// Log level for agentchat (overridden by RUST_LOG)
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Send one message and print the agent's reply
    Send {
        #[arg(required = true)]
        text: Vec<String>,
    },
    /// Show the effective configuration
    Config {
        /// Write it to the config file
        #[arg(long)]
        save: bool,
    },
}

impl Cli {
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(base_url) = &self.base_url {
            config.base_url = base_url.clone();
        }
        if let Some(app_name) = &self.app_name {
            config.app_name = app_name.clone();
        }
        if let Some(user_id) = &self.user_id {
            config.user_id = user_id.clone();
        }
        if let Some(session_id) = &self.session_id {
            config.session_id = session_id.clone();
        }
        if self.new_session {
            config.session_id = uuid::Uuid::new_v4().to_string();
        }
    }
}

fn orchestrator(config: &Config) -> Result<AgentOrchestrator> {
    let identity = config.identity()?;
    let client = HttpAgentClient::new(config)?;
    Ok(AgentOrchestrator::new(Arc::new(client), identity, config.reply_order))
}

async fn chat(config: Config) -> Result<()> {
    let orchestrator = orchestrator(&config)?;
    app::run(orchestrator, config.ui).await
}

async fn send_once(config: Config, text: &str) -> Result<ExitCode> {
    let mut orchestrator = orchestrator(&config)?;

    if let Err(e) = orchestrator.initialize().await {
        eprintln!("warning: {e}");
    }

    let Some(state) = orchestrator.send(text).await else {
        bail!("Nothing to send");
    };

    if let Some(reply) = orchestrator.transcript().last() {
        print!("{}", reply.text);
    }

    Ok(match state {
        SendState::Failed => ExitCode::FAILURE,
        _ => ExitCode::SUCCESS,
    })
}

fn show_config(cli: &Cli, config: &Config, save: bool) -> Result<()> {
    let rendered = toml::to_string_pretty(config).context("Failed to serialize config")?;
    println!("{rendered}");

    if save {
        let path = config.save(cli.config.as_deref())?;
        println!("Saved to {}", path.display());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    cli.apply_overrides(&mut config);

    match &cli.command {
        None => {
            let log_path = Config::home_dir()?.join("agentchat.log");
            logging::init_file(&log_path, cli.log_level.as_deref())?;
            chat(config).await?;
            Ok(ExitCode::SUCCESS)
        }
        Some(Commands::Send { text }) => {
            logging::init_stderr(cli.log_level.as_deref())?;
            send_once(config, &text.join(" ")).await
        }
        Some(Commands::Config { save }) => {
            show_config(&cli, &config, *save)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
