//! Fortell CLI entry point.

use anyhow::Result;
use clap::Parser;
use fortell::cli::{commands, Cli, Commands};
use fortell::config::Settings;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("fortell={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Load configuration
    let settings = match &cli.config {
        Some(path) => Settings::load_from(Some(&std::path::PathBuf::from(path)))?,
        None => Settings::load()?,
    };

    // Ensure data directories exist
    std::fs::create_dir_all(settings.document_library_dir())?;
    std::fs::create_dir_all(settings.audio_dir())?;

    // Execute command
    match cli.command {
        Commands::Init => {
            commands::run_init(&settings)?;
        }

        Commands::Doctor => {
            commands::run_doctor(&settings)?;
        }

        Commands::Ingest { paths } => {
            commands::run_ingest(&paths, settings).await?;
        }

        Commands::Audio {
            text,
            file,
            page,
            entire,
            podcast,
            two_speakers,
            accent,
            style,
            expressiveness,
            voices,
        } => {
            commands::run_audio(
                text,
                file,
                page,
                entire,
                podcast,
                two_speakers,
                accent,
                style,
                expressiveness,
                &voices,
                settings,
            )
            .await?;
        }

        Commands::Search {
            text,
            file,
            page,
            k,
            fetch_k,
            min_score,
            include_self,
        } => {
            commands::run_search(text, file, page, k, fetch_k, min_score, include_self, settings)
                .await?;
        }

        Commands::Insights { text, file, page, k } => {
            commands::run_insights(text, file, page, k, settings).await?;
        }

        Commands::Cross {
            files,
            max_per_doc,
            deep,
            focus,
        } => {
            commands::run_cross(&files, max_per_doc, deep, focus, settings).await?;
        }

        Commands::List => {
            commands::run_list(settings).await?;
        }

        Commands::Config { action } => {
            commands::run_config(&action, settings)?;
        }
    }

    Ok(())
}
