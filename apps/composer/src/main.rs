use std::{path::PathBuf, sync::Arc};

use anyhow::{bail, Result};
use chrono::{TimeZone, Utc};
use clap::{Parser, Subcommand};
use client_core::{
    config::{load_settings, normalize_backend_url},
    views::{submit_login, submit_quiz, ProfileState, StatusLine},
    DurableSessionStore, HttpBackend, QuizBackend, QuizDraftStore, SessionManager,
};
use tracing::info;

mod quiz_file;

#[derive(Parser, Debug)]
#[command(about = "Compose quizzes and submit them to the quiz backend")]
struct Cli {
    /// Overrides `backend_url` from composer.toml and the environment.
    #[arg(long)]
    backend_url: Option<String>,
    /// Where the session token is kept between runs.
    #[arg(long)]
    database_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Login {
        #[arg(long)]
        username: String,
        #[arg(long, env = "QUIZ_PASSWORD")]
        password: String,
    },
    Logout,
    /// Shows the profile view for the saved session.
    Whoami,
    /// Prints the claims carried by the saved token without contacting the backend.
    Session,
    Submit {
        file: PathBuf,
        /// Build the draft and print it without submitting.
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("warn").init();
    let cli = Cli::parse();

    let mut settings = load_settings();
    if let Some(url) = cli.backend_url {
        settings.backend_url = url;
    }
    if let Some(url) = cli.database_url {
        settings.database_url = url;
    }
    let backend_url = normalize_backend_url(&settings.backend_url)?;
    info!(%backend_url, database_url = %settings.database_url, "composer starting");

    let backend: Arc<dyn QuizBackend> = Arc::new(HttpBackend::new(backend_url));
    let store = DurableSessionStore::initialize(&settings.database_url).await?;
    let session = SessionManager::new(backend.clone(), store);
    let mut status = StatusLine::default();

    match cli.command {
        Command::Login { username, password } => {
            if !submit_login(&session, &mut status, &username, &password).await {
                fail(&status)?;
            }
            println!("Logged in as {username}");
        }
        Command::Logout => {
            if let Err(err) = session.logout().await {
                status.show_error(&err);
                fail(&status)?;
            }
            println!("Logged out");
        }
        Command::Whoami => {
            let profile = ProfileState::load(&session).await;
            println!("{}", profile.message());
            if !matches!(profile, ProfileState::Ready(_)) {
                std::process::exit(1);
            }
        }
        Command::Session => match session.claims().await {
            Ok(claims) => {
                println!("username: {}", claims.username());
                if let Some(exp) = claims.exp.and_then(|exp| Utc.timestamp_opt(exp, 0).single()) {
                    let state = if exp <= Utc::now() { "expired" } else { "valid" };
                    println!("expires:  {} ({state})", exp.to_rfc3339());
                }
            }
            Err(err) => {
                status.show_error(&err);
                fail(&status)?;
            }
        },
        Command::Submit { file, dry_run } => {
            let quiz = quiz_file::read_quiz_file(&file)?;
            let drafts = QuizDraftStore::new(backend);
            let draft = quiz_file::apply_to_store(&quiz, &drafts)?;
            println!(
                "Draft \"{}\" with {} question(s)",
                draft.title,
                draft.questions.len()
            );
            if dry_run {
                return Ok(());
            }
            if submit_quiz(&drafts, &session, &mut status).await.is_none() {
                fail(&status)?;
            }
            if let Some(message) = status.current() {
                println!("{message}");
            }
        }
    }

    Ok(())
}

fn fail(status: &StatusLine) -> Result<()> {
    bail!("{}", status.current().unwrap_or("request failed"))
}
