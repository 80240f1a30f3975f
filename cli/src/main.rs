//! CLI entrypoint for cogerphere
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Context, Result, bail};
use clap::Parser;
use cogerphere_application::{ConversationLogger, SessionManager};
use cogerphere_domain::ProviderConfig;
use cogerphere_infrastructure::{
    ConfigLoader, FileConfig, FileKeyValueStore, JsonlConversationLogger, OpenRouterGateway,
};
use cogerphere_presentation::{
    ChatRepl, Cli, ConsoleNotices, StreamReporter, print_outcome, send_interruptible,
};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let _guard = init_logging(&cli);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Initialize logging based on verbosity level. `RUST_LOG` wins when set.
fn init_logging(cli: &Cli) -> Option<WorkerGuard> {
    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace", // -vvv or more
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match &cli.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "cogerphere.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
            None
        }
    }
}

fn load_config(cli: &Cli) -> Result<FileConfig> {
    let config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_ref()).context("Failed to load configuration")?
    };
    config.validate()?;
    Ok(config)
}

fn transcript_logger(config: &FileConfig) -> Option<Arc<dyn ConversationLogger>> {
    let path = config.logging.transcript_path()?;
    match JsonlConversationLogger::open(&path) {
        Ok(logger) => {
            info!(path = %logger.path().display(), "Writing conversation transcript");
            Some(Arc::new(logger))
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Transcript disabled");
            None
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    if cli.show_config {
        ConfigLoader::print_config_sources(cli.config.as_ref());
        return Ok(ExitCode::SUCCESS);
    }

    let config = load_config(&cli)?;
    info!("Starting cogerphere");

    // === Dependency Injection ===
    let Some(data_dir) = config.storage.resolve_data_dir() else {
        bail!("No data directory available. Set storage.data_dir in the config file.");
    };
    let store = Arc::new(FileKeyValueStore::new(data_dir.clone()));
    let gateway = Arc::new(OpenRouterGateway::new(config.endpoint.to_settings())?);

    let mut manager = SessionManager::new(gateway, store)
        .with_notice_sink(Arc::new(ConsoleNotices))
        .with_default_model(config.provider.default_model.clone());
    if let Some(logger) = transcript_logger(&config) {
        manager = manager.with_conversation_logger(logger);
    }
    let manager = Arc::new(manager);
    manager.restore();

    if cli.api_key.is_some() || cli.model.is_some() {
        let current = manager.provider_config();
        let updated = ProviderConfig::new(
            cli.api_key.clone().unwrap_or(current.api_key),
            cli.model.clone().unwrap_or(current.model),
        );
        if updated != manager.provider_config() {
            manager.set_provider_config(updated);
        }
    }

    if cli.new {
        manager.create_conversation();
    }

    // Chat mode
    if cli.chat {
        ChatRepl::new(manager)
            .with_quiet(cli.quiet)
            .with_data_dir(data_dir)
            .run()
            .await?;
        return Ok(ExitCode::SUCCESS);
    }

    // Single message mode - message is required
    let Some(message) = cli.message else {
        bail!("A message is required. Use --chat for interactive mode.");
    };

    let reporter = StreamReporter::new().quiet(cli.quiet);
    match send_interruptible(&manager, &message, &reporter).await {
        Ok(outcome) => {
            print_outcome(&outcome, reporter.has_printed());
            Ok(ExitCode::SUCCESS)
        }
        // The notice sink already printed the reason.
        Err(_) => Ok(ExitCode::FAILURE),
    }
}
