//! `mimir`: inspect parameter rules and resolve parameter maps against the
//! console API.
//!
//! Build: `cargo build --bin mimir` (the `cli` feature is on by default)

use std::path::{Path, PathBuf};
use std::{fs, process};

use clap::{CommandFactory, FromArgMatches, Parser, Subcommand};
use serde_json::Value;
use tracing::{info, warn};

use mimir::config::{Config, Secrets};
use mimir::console::ConsoleClient;
use mimir::{CompletionParams, Mimir, MimirBuilder, ModelCatalog, RuleOutcome, TriggerProps};

// ── CLI ─────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "mimir", about = "resolve model parameters against provider rules")]
struct Args {
    /// path to config.toml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// console API base URL (overrides config)
    #[arg(long, env = "MIMIR_CONSOLE_URL")]
    console_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// print the parameter rules of a model as JSON
    Rules {
        /// provider name (e.g. "openai")
        provider: String,
        /// model identifier (e.g. "gpt-4o")
        model: String,
    },
    /// list text-generation models and their status
    Models,
    /// list the built-in preset tones
    Tones,
    /// resolve a parameter map for a model and print it as JSON
    Resolve {
        provider: String,
        model: String,
        /// JSON file holding the starting parameter map
        #[arg(long)]
        params: Option<PathBuf>,
        /// apply a preset tone by id
        #[arg(long)]
        tone: Option<u32>,
        /// set a value: name=JSON (bare words are taken as strings)
        #[arg(long = "set", value_name = "NAME=JSON")]
        set: Vec<String>,
        /// enable an optional parameter: name=JSON
        #[arg(long = "enable", value_name = "NAME=JSON")]
        enable: Vec<String>,
        /// disable an optional parameter
        #[arg(long = "disable", value_name = "NAME")]
        disable: Vec<String>,
        /// keep user stop sequences across reconciliation
        #[arg(long)]
        advanced: bool,
    },
}

// ── helpers ─────────────────────────────────────────────────────────

/// split `name=JSON`; values that are not valid JSON become strings.
fn parse_assignment(raw: &str) -> Result<(String, Value), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{raw}'"))?;
    if name.is_empty() {
        return Err(format!("missing parameter name in '{raw}'"));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((name.to_string(), value))
}

fn load_params(path: &Path) -> Result<CompletionParams, Box<dyn std::error::Error>> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

fn console_client(
    config: &Config,
    secrets: &Secrets,
    url_override: Option<String>,
) -> mimir::Result<ConsoleClient> {
    let url = url_override.unwrap_or_else(|| config.console.base_url.clone());
    let client = ConsoleClient::with_timeout(url, config.console.timeout())?;
    Ok(match secrets.api_token() {
        Some(token) => client.api_token(token),
        None => client,
    })
}

/// session setup shared by `resolve`: console rules, configured cache and
/// the gate inputs.
fn resolve_builder(
    client: ConsoleClient,
    config: &Config,
    catalog: ModelCatalog,
    credential_configured: bool,
    advanced: bool,
) -> MimirBuilder {
    Mimir::builder()
        .fetcher(std::sync::Arc::new(client))
        .cache((&config.cache).into())
        .catalog(catalog)
        .credential_configured(credential_configured)
        .advanced_mode(advanced || config.session.advanced_mode)
}

/// one-line trigger summary for stderr.
fn status_line(props: &TriggerProps) -> String {
    let mut line = format!("{} / {}", props.provider_name, props.display_label());
    if props.has_deprecated {
        line.push_str(" [not in catalog]");
    } else if props.model_disabled {
        line.push_str(" [unavailable]");
    }
    if props.disabled {
        line.push_str(" (disabled)");
    }
    line
}

// ── commands ────────────────────────────────────────────────────────

async fn cmd_rules(
    client: &ConsoleClient,
    provider: &str,
    model: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let rules = client.parameter_rules(provider, model).await?;
    println!("{}", serde_json::to_string_pretty(&rules)?);
    Ok(())
}

async fn cmd_models(client: &ConsoleClient) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = client.text_generation_models().await?;
    if catalog.is_empty() {
        println!("no models available.");
        return Ok(());
    }
    for provider in catalog.providers() {
        println!("{}", provider.provider);
        for model in &provider.models {
            let mode = model.mode().unwrap_or("-");
            let deprecated = if model.deprecated { " (deprecated)" } else { "" };
            println!(
                "  {:<40} {:<8} {:?}{deprecated}",
                model.model, mode, model.status
            );
        }
    }
    Ok(())
}

fn cmd_tones() -> Result<(), Box<dyn std::error::Error>> {
    for tone in mimir::ToneTable::builtin().iter() {
        println!(
            "{:>2}  {:<10} {}",
            tone.id,
            tone.name,
            serde_json::to_string(&tone.config)?
        );
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn cmd_resolve(
    client: ConsoleClient,
    config: &Config,
    credential_configured: bool,
    provider: &str,
    model: &str,
    params: Option<PathBuf>,
    tone: Option<u32>,
    set: Vec<String>,
    enable: Vec<String>,
    disable: Vec<String>,
    advanced: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    // Gates need the catalog, but resolving works without it.
    let catalog = match client.text_generation_models().await {
        Ok(catalog) => catalog,
        Err(e) => {
            warn!(error = %e, "could not load model catalog");
            ModelCatalog::default()
        }
    };

    let mut builder = resolve_builder(client, config, catalog, credential_configured, advanced);
    if let Some(path) = params {
        builder = builder.params(load_params(&path)?);
    }
    let session = builder.build()?;

    let outcome = session.select_model(provider, model).await;
    if let RuleOutcome::Failed(e) = &outcome.rules {
        return Err(format!("failed to load parameter rules: {e}").into());
    }
    if session.rules().is_empty() {
        warn!(provider, model, "model has no parameter rules");
    }

    if let Some(id) = tone {
        if session.tones().get(id).is_none() {
            warn!(tone = id, "unknown preset tone");
        }
        session.apply_tone(id);
    }
    for raw in &set {
        let (name, value) = parse_assignment(raw)?;
        session.set_value(name, value);
    }
    for raw in &enable {
        let (name, value) = parse_assignment(raw)?;
        session.toggle(name, true, value);
    }
    for name in &disable {
        session.toggle(name.as_str(), false, Value::Null);
    }

    eprintln!("{}", session.render_trigger(&status_line, false));
    println!("{}", serde_json::to_string_pretty(&session.params())?);
    Ok(())
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    if let Command::Tones = args.command {
        return cmd_tones();
    }

    let config = Config::load(args.config.as_deref())?;
    let secrets = Secrets::load()?;
    let client = console_client(&config, &secrets, args.console_url)?;
    info!(base_url = client.base_url(), "using console");

    match args.command {
        Command::Rules { provider, model } => cmd_rules(&client, &provider, &model).await,
        Command::Models => cmd_models(&client).await,
        Command::Tones => cmd_tones(),
        Command::Resolve {
            provider,
            model,
            params,
            tone,
            set,
            enable,
            disable,
            advanced,
        } => {
            let credential_configured = secrets.api_token().is_some();
            cmd_resolve(
                client,
                &config,
                credential_configured,
                &provider,
                &model,
                params,
                tone,
                set,
                enable,
                disable,
                advanced,
            )
            .await
        }
    }
}

// ── main ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    // Initialise tracing (default: warn for CLI; override with RUST_LOG).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let matches = Args::command()
        .version(mimir::version_string())
        .get_matches();
    let args = match Args::from_arg_matches(&matches) {
        Ok(args) => args,
        Err(e) => e.exit(),
    };

    if let Err(e) = run(args).await {
        eprintln!("error: {e}");
        process::exit(1);
    }
}
