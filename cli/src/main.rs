//! CLI entrypoint for LLM Council
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Result, anyhow, bail};
use clap::Parser;
use council_application::{
    DeliberationError, DeliberationInput, EventSink, RunDeliberationUseCase,
};
use council_domain::{DeliberationResult, ModelId};
use council_infrastructure::{
    ConfigLoader, FileConfig, JsonlConversationLogger, OpenRouterInvoker,
};
use council_presentation::{
    Cli, ConsoleFormatter, ProgressReporter, SilentProgress, SimpleProgress,
};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Exit status after Ctrl-C
const EXIT_CANCELLED: u8 = 130;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    // Held until main returns so the file writer flushes on every exit path
    let _log_guard = init_tracing(&cli);

    run(&cli).await
}

async fn run(cli: &Cli) -> Result<ExitCode> {
    info!("Starting LLM Council");

    let config = load_config(cli)?;

    if cli.show_config {
        ConfigLoader::print_config_sources(cli.config.as_deref());
        println!();
        println!("Effective configuration:");
        println!("{:#?}", config);
        return Ok(ExitCode::SUCCESS);
    }

    for issue in config.ensure_valid()? {
        warn!("{}", issue);
    }

    if !config.output.color {
        colored::control::set_override(false);
    }

    let Some(question) = cli.question.clone() else {
        bail!("A question is required");
    };

    // === Dependency Injection ===
    let mut params = config.to_deliberation_params();
    if let Some(voting) = cli.voting {
        params = params.with_voting_method(voting.into());
    }

    let invoker = Arc::new(OpenRouterInvoker::new(config.to_openrouter_settings())?);
    let mut use_case = RunDeliberationUseCase::new(invoker, params);

    if let Some(path) = &cli.transcript {
        let Some(logger) = JsonlConversationLogger::new(path) else {
            bail!("Could not open transcript file {}", path.display());
        };
        info!("Writing transcript to {}", logger.path().display());
        use_case = use_case.with_conversation_logger(Arc::new(logger));
    }

    let mut input = DeliberationInput::new(question);
    if !cli.model.is_empty() {
        let council = cli.model.iter().map(|m| ModelId::new(m.as_str())).collect();
        input = input.with_council(council);
    }
    if let Some(chairman) = &cli.chairman {
        input = input.with_chairman(ModelId::new(chairman.as_str()));
    }
    if cli.title {
        input = input.with_title(true);
    }

    let progress: Box<dyn EventSink> = if cli.quiet {
        Box::new(SilentProgress)
    } else if cli.verbose > 0 {
        // bars would fight with log lines on stderr
        Box::new(SimpleProgress)
    } else {
        Box::new(ProgressReporter::new())
    };

    let mut handle = use_case.spawn(input);

    let cancellation = handle.cancellation.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancellation.cancel();
        }
    });

    while let Some(event) = handle.events.recv().await {
        progress.emit(event);
    }

    match conclude(handle.join.await?)? {
        Conclusion::Finished(result) => {
            let format = cli.output_format(config.output.format);
            println!("{}", ConsoleFormatter::render(&result, format));
            Ok(ExitCode::SUCCESS)
        }
        Conclusion::Cancelled => {
            eprintln!("Deliberation cancelled");
            Ok(ExitCode::from(EXIT_CANCELLED))
        }
    }
}

/// How a run that did not fail ended
#[derive(Debug)]
enum Conclusion {
    Finished(Box<DeliberationResult>),
    Cancelled,
}

fn conclude(outcome: Result<DeliberationResult, DeliberationError>) -> Result<Conclusion> {
    match outcome {
        Ok(result) => Ok(Conclusion::Finished(Box::new(result))),
        Err(e) if e.is_cancelled() => Ok(Conclusion::Cancelled),
        Err(e) => Err(e.into()),
    }
}

/// Console logs on stderr by verbosity, plus an optional daily log file
fn init_tracing(cli: &Cli) -> Option<WorkerGuard> {
    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace", // -vvv or more
    };

    let console = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    let (file, guard) = match &cli.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "llm-council.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(level))
        .with(console)
        .with(file)
        .init();

    guard
}

fn load_config(cli: &Cli) -> Result<FileConfig> {
    if cli.no_config {
        return Ok(ConfigLoader::load_defaults());
    }
    ConfigLoader::load(cli.config.as_deref())
        .map_err(|e| anyhow!("Failed to load configuration: {}", e))
}
