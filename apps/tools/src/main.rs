use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use server_api::{ApiContext, TokenConfig};
use shared::domain::{AttemptId, QuizId};
use storage::Storage;

#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, default_value = "sqlite://./data/server.db")]
    database_url: String,
    /// bcrypt work factor used by `create-user`.
    #[arg(long, default_value_t = server_api::credentials::DEFAULT_COST)]
    password_cost: u32,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Creates an account, or resets its password if it already exists.
    CreateUser { username: String, password: String },
    ListQuizzes {
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
    /// Prints a stored quiz as JSON.
    ShowQuiz { quiz_id: i64 },
    /// Prints an attempt and its answers as JSON.
    ShowAttempt { attempt_id: i64 },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let storage = Storage::new(&cli.database_url).await?;
    let ctx = ApiContext {
        storage,
        // Admin commands never mint tokens.
        tokens: TokenConfig {
            secret: String::new(),
            ttl_seconds: 0,
        },
        password_cost: cli.password_cost,
    };

    match cli.command {
        Command::CreateUser { username, password } => {
            let user_id = server_api::register_user(&ctx, &username, &password)
                .await
                .map_err(|e| anyhow!(e.message))?;
            println!("user_id={} username={username}", user_id.0);
        }
        Command::ListQuizzes { limit } => {
            for quiz in ctx.storage.list_quizzes(limit).await? {
                println!(
                    "{:>5}  {:<32}  {:>3} question(s)  {:<16}  {}",
                    quiz.quiz_id.0,
                    quiz.title,
                    quiz.question_count,
                    quiz.author.as_deref().unwrap_or("-"),
                    quiz.created_at.to_rfc3339()
                );
            }
        }
        Command::ShowQuiz { quiz_id } => {
            let record = server_api::get_quiz(&ctx, QuizId(quiz_id))
                .await
                .map_err(|e| anyhow!(e.message))?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Command::ShowAttempt { attempt_id } => {
            let record = server_api::get_attempt(&ctx, AttemptId(attempt_id))
                .await
                .map_err(|e| anyhow!(e.message))?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
    }

    Ok(())
}
