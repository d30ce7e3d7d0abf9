mod config;
mod error;
mod executor;

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use mcp::ToolRegistry;
use runtime::{Assistant, AssistantConfig, OllamaBackend, Reply};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use config::{CONFIG_FILE, Config};
use error::{Error, Result};
use executor::Tools;

#[derive(Parser)]
#[command(name = "macpilot")]
#[command(about = "Control Mac applications with natural language", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (defaults to ./macpilot.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(flatten)]
    server: ServerArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args)]
struct ServerArgs {
    /// Send tool calls to this tool server command instead of running them in-process
    #[arg(long, global = true)]
    server: Option<String>,

    /// Argument passed to the --server command (repeatable)
    #[arg(long = "server-arg", global = true, allow_hyphen_values = true)]
    server_args: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve tools over JSON-RPC on stdin/stdout
    Serve,
    /// Handle a single request
    Ask {
        /// Request text (read from stdin when omitted)
        text: Vec<String>,
    },
    /// Start an interactive session
    Chat,
    /// List the available tools
    Tools,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    let default_level = match cli.command {
        Some(Commands::Serve) => "info",
        _ => "warn",
    };
    init_logging(default_level);

    let config = load_config(cli.config.as_deref())?;
    let registry = Arc::new(host::catalog::registry()?);

    match cli.command {
        Some(Commands::Serve) => cmd_serve(registry, &config).await,
        Some(Commands::Tools) => cmd_tools(&registry),
        Some(Commands::Ask { text }) => cmd_ask(registry, &config, &cli.server, text).await,
        Some(Commands::Chat) | None => cmd_chat(registry, &config, &cli.server).await,
    }
}

/// Logs always go to stderr; stdout carries protocol traffic under `serve`.
fn init_logging(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr).with_target(false))
        .with(filter)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::load(path)?,
        None if Path::new(CONFIG_FILE).exists() => Config::load(CONFIG_FILE)?,
        None => Config::default(),
    };
    let config = config.apply_env(|key| std::env::var(key).ok());
    config.validate()?;
    Ok(config)
}

async fn cmd_serve(registry: Arc<ToolRegistry>, config: &Config) -> Result<()> {
    let dispatcher = executor::dispatcher(registry, config);
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    dispatcher.serve(stdin, tokio::io::stdout()).await?;
    Ok(())
}

fn cmd_tools(registry: &ToolRegistry) -> Result<()> {
    for tool in registry.list() {
        println!("{}", tool.name);
        println!("    {}", tool.description);
        for param in &tool.parameters {
            let required = if param.required { ", required" } else { "" };
            println!(
                "    - {} ({}{required}): {}",
                param.name, param.param_type, param.description
            );
        }
    }
    Ok(())
}

async fn assistant(
    registry: Arc<ToolRegistry>,
    config: &Config,
    server: &ServerArgs,
) -> Result<Assistant<OllamaBackend, Tools>> {
    let tools = match &server.server {
        Some(command) => Tools::remote(command, &server.server_args, config).await?,
        None => Tools::local(Arc::clone(&registry), config),
    };

    let backend = OllamaBackend::builder(&config.backend.model)
        .url(&config.backend.url)
        .temperature(config.backend.temperature)
        .max_tokens(config.backend.max_tokens)
        .timeout(config.backend_timeout())
        .build();

    Ok(Assistant::with_config(
        backend,
        tools,
        registry,
        AssistantConfig {
            completion_timeout: config.backend_timeout(),
            ..AssistantConfig::default()
        },
    ))
}

async fn cmd_ask(
    registry: Arc<ToolRegistry>,
    config: &Config,
    server: &ServerArgs,
    text: Vec<String>,
) -> Result<()> {
    let request = if text.is_empty() {
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        line.trim().to_string()
    } else {
        text.join(" ")
    };
    if request.is_empty() {
        return Err(Error::EmptyRequest);
    }

    let assistant = assistant(registry, config, server).await?;
    let reply = assistant.ask(&request).await;
    print_reply(&reply);
    Ok(())
}

async fn cmd_chat(registry: Arc<ToolRegistry>, config: &Config, server: &ServerArgs) -> Result<()> {
    println!("macpilot v{}", env!("CARGO_PKG_VERSION"));
    let assistant = assistant(registry, config, server).await?;
    println!("Model: {} at {}", config.backend.model, config.backend.url);
    println!("Type 'quit' or Ctrl+D to exit.\n");

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("> ");
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            // EOF
            break;
        }

        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input == "quit" || input == "exit" {
            break;
        }

        let reply = assistant.ask(input).await;
        print_reply(&reply);
        println!();
    }

    println!("\nBye.");
    Ok(())
}

fn print_reply(reply: &Reply) {
    if let Some(call) = &reply.call {
        eprintln!("[{}] {}", call.name, call.arguments.to_json());
    }
    if reply.is_error {
        eprintln!("{}", reply.text);
    } else {
        println!("{}", reply.text);
    }
}
