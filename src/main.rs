//! astlens CLI - parse source files through any registered parser adapter

mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "astlens")]
#[command(version)]
#[command(about = "Uniform adapter layer over parser engines")]
#[command(long_about = r#"
astlens runs many unrelated parsers behind one contract:
  • Lazy, at-most-once engine loading
  • Per-parser option defaults merged with your own
  • Source locations for every node, whatever the tree shape

Example usage:
  astlens languages
  astlens parse src/app.js --options '{"strict": false}'
  astlens locate style.css --pointer /children/0
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit machine-readable JSON
    #[arg(long, global = true)]
    json: bool,

    /// Config file (defaults to ./astlens.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List languages and their parsers
    Languages,

    /// Parse a file and print its tree
    Parse {
        file: PathBuf,

        #[command(flatten)]
        selection: Selection,
    },

    /// Print a parser's package version
    Version {
        #[arg(short, long)]
        language: Option<String>,

        #[arg(short, long)]
        parser: Option<String>,

        /// Engine release to report instead of the default
        #[arg(long)]
        engine_version: Option<String>,
    },

    /// Parse a file and resolve the location of one node
    Locate {
        file: PathBuf,

        /// JSON pointer to the node, e.g. /children/0
        #[arg(long)]
        pointer: String,

        #[command(flatten)]
        selection: Selection,
    },

    /// Write a starter config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(clap::Args, Debug, Clone)]
pub struct Selection {
    /// Language id; inferred from the file extension when omitted
    #[arg(short, long)]
    pub language: Option<String>,

    /// Parser id; the language's default when omitted
    #[arg(short, long)]
    pub parser: Option<String>,

    /// Options text, merged over the parser's defaults
    #[arg(short, long)]
    pub options: Option<String>,

    #[arg(long, value_enum, default_value_t = OptionsFormat::Json)]
    pub options_format: OptionsFormat,

    /// Engine release to parse with, for parsers that allow choosing one
    #[arg(long)]
    pub engine_version: Option<String>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionsFormat {
    Json,
    Toml,
}

impl From<OptionsFormat> for astlens::OptionsLanguage {
    fn from(format: OptionsFormat) -> Self {
        match format {
            OptionsFormat::Json => astlens::OptionsLanguage::Json,
            OptionsFormat::Toml => astlens::OptionsLanguage::Toml,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

impl OutputMode {
    pub fn is_human(self) -> bool {
        self == OutputMode::Human
    }
}

#[derive(Serialize)]
struct Envelope<'a> {
    ok: bool,
    command: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

pub fn emit_success(output_mode: OutputMode, command: &str, data: Value) -> anyhow::Result<()> {
    if output_mode.is_human() {
        println!("{}", serde_json::to_string_pretty(&data)?);
        return Ok(());
    }
    let envelope = Envelope { ok: true, command, data: Some(data), error: None };
    println!("{}", serde_json::to_string(&envelope)?);
    Ok(())
}

fn emit_failure(output_mode: OutputMode, command: &str, err: &anyhow::Error) {
    if output_mode.is_human() {
        astlens::ui::error(&format!("{:#}", err));
        return;
    }
    let envelope = Envelope { ok: false, command, data: None, error: Some(format!("{:#}", err)) };
    match serde_json::to_string(&envelope) {
        Ok(line) => println!("{}", line),
        Err(_) => astlens::ui::error(&format!("{:#}", err)),
    }
}

fn init_logging(verbose: bool, directive: Option<&str>) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else if let Some(directive) = directive {
        EnvFilter::new(directive)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    let output_mode = if cli.json { OutputMode::Json } else { OutputMode::Human };

    let config = match astlens::config::load_config(cli.config.as_deref()) {
        Ok(config) => config.unwrap_or_default(),
        Err(err) => {
            emit_failure(output_mode, "config", &err);
            return std::process::ExitCode::FAILURE;
        }
    };
    init_logging(cli.verbose, config.log.as_deref());

    let (name, result) = match cli.command {
        Commands::Languages => ("languages", commands::run_languages(output_mode)),
        Commands::Parse { file, selection } => (
            "parse",
            commands::run_parse(output_mode, &config, &file, &selection).await,
        ),
        Commands::Version { language, parser, engine_version } => (
            "version",
            commands::run_version(
                output_mode,
                &config,
                language.as_deref(),
                parser.as_deref(),
                engine_version.as_deref(),
            )
            .await,
        ),
        Commands::Locate { file, pointer, selection } => (
            "locate",
            commands::run_locate(output_mode, &config, &file, &pointer, &selection).await,
        ),
        Commands::Init { force } => ("init", commands::run_init(output_mode, cli.config.as_deref(), force)),
    };

    match result {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(err) => {
            emit_failure(output_mode, name, &err);
            std::process::ExitCode::FAILURE
        }
    }
}
