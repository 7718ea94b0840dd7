//! Gemini CLI SDK - run a query and print the Claude-compatible message stream.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use futures_util::StreamExt;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use gemini_cli_sdk::config::{ConfigLoader, EnvSnapshot};
use gemini_cli_sdk::{display, GeminiClient, GeminiOptions, Message};

#[derive(Parser)]
#[command(
    name = "gemini-sdk",
    about = "Run the Gemini CLI and print Claude Code SDK compatible messages",
    version
)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Configuration file (defaults to .gemini-cli-sdk.toml, then the user config dir).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a prompt to Gemini.
    Query {
        /// The prompt to send.
        prompt: String,
        /// Gemini model to use.
        #[arg(short, long)]
        model: Option<String>,
        /// Instruction text placed before the prompt.
        #[arg(long)]
        system_prompt: Option<String>,
        /// Auto-accept all actions.
        #[arg(long)]
        yolo: bool,
        /// Run in the CLI sandbox.
        #[arg(long)]
        sandbox: bool,
        /// Working directory for the CLI.
        #[arg(long)]
        cwd: Option<PathBuf>,
        /// Print messages as JSON lines.
        #[arg(long)]
        json: bool,
        /// Do not truncate long values.
        #[arg(long)]
        raw: bool,
    },
    /// Print the effective configuration.
    Config,
}

fn init_tracing(verbosity: u8, configured: Option<&str>) {
    let level = match verbosity {
        0 => configured.unwrap_or("warn"),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let env = EnvSnapshot::capture();
    let loader = cli.config.clone().map_or_else(ConfigLoader::new, ConfigLoader::with_path);
    let config = match loader.load_with_env(&env) {
        Ok(config) => config,
        Err(e) => {
            display::print_error(&e.to_string());
            return ExitCode::FAILURE;
        }
    };
    init_tracing(cli.verbose, config.log_level.as_deref());

    match cli.command {
        Commands::Config => match toml::to_string_pretty(&config) {
            Ok(text) => {
                print!("{text}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                display::print_error(&e.to_string());
                ExitCode::FAILURE
            }
        },
        Commands::Query {
            prompt,
            model,
            system_prompt,
            yolo,
            sandbox,
            cwd,
            json,
            raw,
        } => {
            let client = match GeminiClient::from_config_with_env(config, &env) {
                Ok(client) => client,
                Err(e) => {
                    display::print_error(&e.to_string());
                    return ExitCode::FAILURE;
                }
            };
            let options = GeminiOptions {
                model,
                system_prompt,
                yolo,
                sandbox,
                cwd,
                ..Default::default()
            };
            tracing::info!(prompt = %prompt, model = ?options.model, "Starting query");

            let mut stream = client.query(prompt, Some(options));
            let mut failed = false;
            while let Some(item) = stream.next().await {
                match item {
                    Ok(message) => {
                        if let Message::Result(result) = &message {
                            failed = result.is_error;
                        }
                        if json {
                            display::print_json_line(&message);
                        } else {
                            display::print_message(&message, raw);
                        }
                    }
                    Err(e) => {
                        display::print_error(&e.to_string());
                        return ExitCode::FAILURE;
                    }
                }
            }
            if failed {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            }
        }
    }
}
