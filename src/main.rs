// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand, ValueEnum};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, info, warn};

use crate::knowledge::YamlKnowledgeBase;
use crate::project::TitleProject;
use crate::rate_limit::OrchestratorState;
use crate::registry::{EngineMode, list_translator_engines};
use crate::service::{TranslateOptions, TranslationService};
use crate::translator::EngineSettings;

mod context;
mod engines;
mod errors;
mod knowledge;
mod project;
mod rate_limit;
mod registry;
mod service;
mod translator;

/// CLI wrapper for log levels to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for LevelFilter {
    fn from(level: CliLogLevel) -> Self {
        match level {
            CliLogLevel::Error => LevelFilter::Error,
            CliLogLevel::Warn => LevelFilter::Warn,
            CliLogLevel::Info => LevelFilter::Info,
            CliLogLevel::Debug => LevelFilter::Debug,
            CliLogLevel::Trace => LevelFilter::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the registered translation engines
    Engines,

    /// Translate one or more texts with a chosen engine
    Translate(TranslateArgs),
}

#[derive(Parser, Debug)]
struct TranslateArgs {
    /// Texts to translate, in order
    #[arg(value_name = "TEXT", required = true)]
    texts: Vec<String>,

    /// Engine id or alias (e.g. 'deepl', 'google_translate', 'openai')
    #[arg(short, long, default_value = "google_translate")]
    engine: String,

    /// Source language code (e.g. 'ja')
    #[arg(short, long, default_value = "ja")]
    source_language: String,

    /// Target language code (e.g. 'en')
    #[arg(short, long, default_value = "en")]
    target_language: String,

    /// Title identifier; selects the knowledge base folder
    #[arg(long, default_value = "untitled")]
    title_id: String,

    /// Human-readable title name
    #[arg(long)]
    title_name: Option<String>,

    /// Knowledge base root directory
    #[arg(long)]
    knowledge_dir: Option<PathBuf>,

    /// API key for engines with an API mode
    #[arg(long, env = "MANGATL_API_KEY")]
    api_key: Option<String>,

    /// Extra engine setting as KEY=VALUE (repeatable)
    #[arg(long = "set", value_name = "KEY=VALUE")]
    settings: Vec<String>,
}

/// mangatl - Manga translation orchestrator
///
/// Translates manga text blocks through a catalogue of engines with
/// rate limiting, container failover and per-title glossaries.
#[derive(Parser, Debug)]
#[command(name = "mangatl")]
#[command(version)]
#[command(about = "Manga translation orchestrator")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Set logging level
    #[arg(short, long, value_enum, global = true)]
    log_level: Option<CliLogLevel>,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    fn color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "\x1B[1;31m",
            Level::Warn => "\x1B[1;33m",
            Level::Info => "\x1B[1;32m",
            Level::Debug => "\x1B[1;36m",
            Level::Trace => "\x1B[1;35m",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "{}{} {:5} {}\x1B[0m",
                Self::color_for_level(record.level()),
                now,
                record.level(),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = CommandLineOptions::parse();

    let level = cli.log_level.map_or(LevelFilter::Info, Into::into);
    CustomLogger::init(level)?;

    match cli.command {
        Commands::Engines => {
            run_engines();
            Ok(())
        }
        Commands::Translate(args) => run_translate(args).await,
    }
}

fn run_engines() {
    for descriptor in list_translator_engines() {
        let mut flags = Vec::new();
        if matches!(descriptor.mode, EngineMode::Offline) {
            flags.push("offline");
        }
        if descriptor.supports_api {
            flags.push("api");
        }
        if descriptor.supports_scrape_mode {
            flags.push("web");
        }
        if descriptor.requires_api_key && !descriptor.api_optional {
            flags.push("key required");
        }
        println!("{:20} {:24} {}", descriptor.id, descriptor.name, flags.join(", "));
    }
}

async fn run_translate(options: TranslateArgs) -> Result<()> {
    let mut settings: EngineSettings = EngineSettings::new();
    if let Some(api_key) = &options.api_key {
        settings.insert("api_key".to_string(), api_key.clone());
    }
    for pair in &options.settings {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| anyhow!("invalid --set value '{}', expected KEY=VALUE", pair))?;
        settings.insert(key.to_string(), value.to_string());
    }

    let knowledge_dir = options.knowledge_dir.clone().unwrap_or_else(|| {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("mangatl")
            .join("knowledge")
    });

    let state = Arc::new(OrchestratorState::new());
    let mut service = TranslationService::new(Arc::clone(&state))
        .with_knowledge_source(Box::new(YamlKnowledgeBase::new(&knowledge_dir)));
    service.set_rate_limit_callback(Box::new(|engine| {
        warn!("{}: rate limited, switching to slow mode", engine);
    }));

    let project = TitleProject {
        title_id: options.title_id.clone(),
        title_name: options
            .title_name
            .clone()
            .unwrap_or_else(|| options.title_id.clone()),
        original_language: options.source_language.clone(),
        target_language: options.target_language.clone(),
        content_type: None,
        color_mode: None,
    };
    let translate_options = TranslateOptions::default();

    info!(
        "Translating {} text(s) {} -> {} via '{}'",
        options.texts.len(),
        options.source_language,
        options.target_language,
        options.engine
    );
    for text in &options.texts {
        let translated = service
            .translate_text(text, &project, &options.engine, &settings, &translate_options)
            .await
            .context(format!("translation failed for '{}'", text))?;
        println!("{}", translated);
    }
    Ok(())
}
