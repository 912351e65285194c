use anyhow::{Context, Result};
use clap::Parser;
use council_core::credentials::{CredentialResolver, EnvKey, KeyCommand, KeyFile};
use council_core::debate::RunState;
use council_core::gateway::Gateway;
use council_core::orchestrator::{DebateSettings, Orchestrator};
use council_service::config::Config;
use council_service::gemini_adapter::GeminiGenerator;
use council_service::prompt_loader;
use council_service::render::{Format, Renderer};
use council_service::shell::{Command, HELP, Outcome, Shell};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncBufReadExt;
use tracing_subscriber::fmt::time::ChronoLocal;

#[derive(Parser)]
#[command(version, about = "A moderated debate between the emotions, voiced by Gemini")]
struct Cli {
    /// Start a debate on this topic right away
    #[arg(long)]
    topic: Option<String>,
    /// Pause between turns in milliseconds (500-4000)
    #[arg(long)]
    speed: Option<u64>,
    /// Debater turns before the moderator concludes unprompted (0 = no limit)
    #[arg(long)]
    max_turns: Option<usize>,
    /// Gemini model name
    #[arg(long)]
    model: Option<String>,
    /// Print one JSON object per event instead of text
    #[arg(long)]
    json: bool,
    /// Exit when the debate finishes
    #[arg(long, requires = "topic")]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // --- 1. Load Configuration ---
    let mut config = Config::from_env().context("Failed to load application configuration")?;
    let args = Cli::parse();
    if let Some(model) = args.model.clone() {
        config.model = model;
    }
    if let Some(ms) = args.speed {
        config.turn_delay = Duration::from_millis(ms);
    }
    if let Some(max_turns) = args.max_turns {
        config.max_turns = (max_turns > 0).then_some(max_turns);
    }

    // --- 2. Initialize Logging ---
    // stdout carries the transcript, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(ChronoLocal::rfc_3339())
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Configuration loaded successfully. Starting council service...");

    // --- 3. Load Prompts ---
    let prompts = prompt_loader::load_prompt_set(config.prompts_dir.as_deref())
        .context("Failed to load prompt templates")?;

    // --- 4. Credentials ---
    let key_file = config.key_file.clone().map(KeyFile::new);
    let mut resolver = CredentialResolver::new();
    if let Some(file) = &key_file {
        resolver = resolver.with_source(file.clone());
    }
    if let Some(command) = config.key_command.as_deref().and_then(KeyCommand::parse) {
        resolver = resolver.with_source(command);
    }
    let resolver = Arc::new(resolver.with_source(EnvKey::from_env()));
    if resolver.status().await.is_none() {
        tracing::warn!("No API key configured yet. Use `key set <KEY>` or set GEMINI_API_KEY.");
    }

    // --- 5. Initialize API Client ---
    let mut client_config = gemini_text::Config::builder()
        .with_api_key("")
        .with_model(&config.model)
        .with_timeout(config.request_timeout);
    if let Some(base_url) = &config.base_url {
        client_config = client_config.with_base_url(base_url);
    }
    let client = gemini_text::Client::new(client_config.build()).context("Failed to create Gemini client")?;
    let generator = Arc::new(GeminiGenerator::new(client, resolver.clone()));

    // --- 6. Debate Setup ---
    let settings = DebateSettings::default()
        .with_turn_delay(config.turn_delay)
        .with_max_turns(config.max_turns);
    let orchestrator = Orchestrator::new(Gateway::with_prompts(generator.clone(), prompts), settings);
    let handle = orchestrator.handle();
    let scheduler = orchestrator.spawn();

    if let Some(topic) = &args.topic {
        if !handle.start(topic) {
            anyhow::bail!("--topic must not be blank");
        }
    } else if !args.json {
        println!("{HELP}");
    }

    // This task prints every change to the debate exactly once.
    let format = if args.json { Format::Json } else { Format::Text };
    let once = args.once;
    let mut changes = handle.subscribe();
    let render_task = tokio::spawn(async move {
        let mut renderer = Renderer::new(format);
        loop {
            let debate = changes.borrow_and_update().clone();
            for line in renderer.update(&debate) {
                println!("{line}");
            }
            if once && debate.state() == RunState::Finished {
                break;
            }
            if changes.changed().await.is_err() {
                break;
            }
        }
    });

    // Reads commands from stdin until `quit` or EOF.
    let shell = Shell::new(handle.clone(), key_file, resolver.clone());
    let input_handle = handle.clone();
    let input = async move {
        let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    tracing::error!("Failed to read from stdin: {}", e);
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            match line.parse::<Command>() {
                Ok(command) => match shell.execute(command).await {
                    Outcome::Reply(text) if text.is_empty() => {}
                    Outcome::Reply(text) => println!("{text}"),
                    Outcome::Quit => return,
                },
                Err(e) => println!("{e}"),
            }
        }

        // Input is closed, but a running debate still plays out.
        if once {
            std::future::pending::<()>().await;
        }
        let mut changes = input_handle.subscribe();
        let _ = changes.wait_for(|debate| !debate.state().is_active()).await;
    };

    tokio::select! {
        _ = input => {},
        _ = render_task => {},
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received Ctrl-C, shutting down...");
        }
    }

    scheduler.abort();
    let stats = generator.client().stats();
    tracing::info!(
        "Shutting down. requests: {}, total_tokens: {}, input_tokens: {}, output_tokens: {}",
        stats.requests(),
        stats.total_tokens(),
        stats.input_tokens(),
        stats.output_tokens()
    );
    Ok(())
}
