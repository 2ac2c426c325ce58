use anyhow::{Context, Result};
use clap::Parser;
use onboard_core::model::{PathId, StepAction, StepId, UserId};
use serde::Serialize;
use services::{Clock, ErrorKind, KnowledgePathError, OnboardingError, ProgressServices};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod config;

use cli::{Cli, Command};

fn emit<T: Serialize>(value: &T) -> Result<()> {
    let out = serde_json::to_string_pretty(value).context("encoding output")?;
    println!("{out}");
    Ok(())
}

async fn build_services(cli: &Cli) -> Result<ProgressServices> {
    let catalog = config::load_catalog(cli.catalog.as_deref())?;
    let clock = Clock::default();

    if cli.in_memory {
        tracing::info!("using in-memory store");
        return Ok(ProgressServices::in_memory(clock, catalog));
    }

    let db_url = config::normalize_sqlite_url(&cli.db);
    config::prepare_sqlite_file(&db_url)?;
    let services = ProgressServices::sqlite(&db_url, clock, catalog)
        .await
        .with_context(|| format!("opening {db_url}"))?;
    tracing::info!(db = %db_url, "store ready");
    Ok(services)
}

async fn run(cli: Cli) -> Result<()> {
    let services = build_services(&cli).await?;

    match cli.command {
        Command::Phases { user } => emit(&services.onboarding_phases(&user).await?),
        Command::Tasks { user, phase } => {
            emit(&services.onboarding().phase_tasks(&user, &phase).await?)
        }
        Command::Toggle { user, phase, task } => {
            emit(&services.toggle_task(&user, &phase, &task).await?)
        }
        Command::SetTask {
            user,
            phase,
            task,
            state,
        } => emit(
            &services
                .onboarding()
                .set_task_completion(&user, &phase, &task, state.completed())
                .await?,
        ),
        Command::Progress { user: Some(user) } => {
            emit(&services.onboarding().onboarding_progress(&user).await?)
        }
        Command::Progress { user: None } => {
            emit(&services.onboarding().progress_overview().await?)
        }
        Command::Achievements { user } => emit(&services.onboarding_achievements(&user).await?),
        Command::Paths {
            category,
            difficulty,
        } => emit(&services.knowledge_paths(category.as_deref(), difficulty)),
        Command::Path { path_id, user } => emit(&services.knowledge_path(&path_id, &user).await?),
        Command::UserPaths { user } => emit(&services.paths().user_paths(&user).await?),
        Command::Step {
            path_id,
            user,
            step_id,
            action,
        } => emit(
            &services
                .knowledge_path_progress(&path_id, &user, &step_id, action)
                .await?,
        ),
        Command::Resource { name } => emit(&services.resource_url(&name)?.as_str()),
        Command::Seed => seed(&services).await,
    }
}

/// Demo data: one user partway through onboarding, one finished, and a
/// started knowledge path.
async fn seed(services: &ProgressServices) -> Result<()> {
    let onboarding = services.onboarding();
    let phases = services.catalog().phases().to_vec();

    let finished = UserId::new("roopika")?;
    for phase in &phases {
        for task in &phase.tasks {
            onboarding
                .set_task_completion(&finished, &phase.title, &task.name, true)
                .await?;
        }
    }

    let partial = UserId::new("rakshitha")?;
    for phase in phases.iter().take(2) {
        for task in &phase.tasks {
            onboarding
                .set_task_completion(&partial, &phase.title, &task.name, true)
                .await?;
        }
    }
    if let Some(phase) = phases.get(2) {
        if let Some(task) = phase.tasks.first() {
            onboarding
                .set_task_completion(&partial, &phase.title, &task.name, true)
                .await?;
        }
    }

    let path = PathId::new("new-developer")?;
    if services.catalog().path(&path).is_some() {
        for step in ["step-1", "step-2"] {
            services
                .knowledge_path_progress(&path, &partial, &StepId::new(step)?, StepAction::Complete)
                .await?;
        }
    }

    emit(&onboarding.progress_overview().await?)
}

fn exit_code(err: &anyhow::Error) -> i32 {
    let kind = if let Some(e) = err.downcast_ref::<OnboardingError>() {
        Some(e.kind())
    } else if let Some(e) = err.downcast_ref::<KnowledgePathError>() {
        Some(e.kind())
    } else if let Some(e) = err.downcast_ref::<onboard_core::error::ResourceError>() {
        Some(ErrorKind::from(e))
    } else {
        None
    };
    match kind {
        Some(ErrorKind::NotFound) => 3,
        Some(ErrorKind::InvalidOperation) => 4,
        Some(ErrorKind::Conflict) => 5,
        Some(ErrorKind::Internal) | None => 1,
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "app=info,services=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        eprintln!("error: {err:#}");
        std::process::exit(exit_code(&err));
    }
}
