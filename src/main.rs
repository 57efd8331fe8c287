use anyhow::{Context, Result};
use clap::Parser;
use mentor::backend::Dispatcher;
use mentor::config::Config;
use mentor::curriculum::CurriculumMap;
use mentor::progress::ProgressStore;
use mentor::server::{self, AppState};
use mentor::session::SessionContext;
use mentor::tutor::Tutor;
use mentor::Error;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mentor")]
#[command(about = "Curriculum-aware learning companion", long_about = None)]
#[command(version)]
struct Cli {
    /// Host to bind to
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load().await.context("Failed to load configuration")?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(config.log_level.as_deref().unwrap_or("info"))
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let curriculum = match &config.curriculum {
        Some(path) => CurriculumMap::from_file(path)
            .with_context(|| format!("Failed to load curriculum from {:?}", path))?,
        None => CurriculumMap::builtin(),
    };
    tracing::info!("Curriculum has {} weeks", curriculum.week_count());

    let config_error = config.validate().err().map(|e| match e {
        Error::Configuration(problem) => problem,
        other => other.to_string(),
    });
    if let Some(problem) = &config_error {
        tracing::warn!("{}", problem);
    }

    let learner = config.learner();
    let data_dir = config.data_dir();
    let store = ProgressStore::open(&data_dir, &learner)
        .context("Failed to open progress store")?
        .with_curriculum(&curriculum);
    tracing::info!("Progress for '{}' in {:?}", learner, store.path());

    let dispatcher = Dispatcher::from_config(&config);
    tracing::info!("Using {} backend", dispatcher.backend_name());
    let backend_error = if config_error.is_none() {
        dispatcher
            .refresh_models()
            .await
            .err()
            .map(|e| e.setup_hint(dispatcher.backend_name()))
    } else {
        None
    };
    if let Some(hint) = &backend_error {
        tracing::warn!("{}", hint);
    }

    let tutor = Tutor::new(Arc::new(curriculum), Arc::new(dispatcher), Arc::new(store));
    let state = AppState::new(tutor, SessionContext::new(learner))
        .with_config_error(config_error)
        .with_backend_error(backend_error);

    let host = cli.host.unwrap_or_else(|| config.host());
    let port = cli.port.unwrap_or_else(|| config.port());
    server::run(state, &host, port).await
}
