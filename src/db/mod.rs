//! Database module for SQLite persistence.
//!
//! SQLite is the source of truth for users, sessions, questions, drops and analyses.

mod repository;

pub use repository::*;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

/// Questions inserted on first start when the pool is empty.
pub const SEED_QUESTIONS: &[&str] = &[
    "What is one thing you are grateful for today?",
    "What took most of your energy today?",
    "What is something you learned recently?",
    "Who made a difference in your day, and how?",
    "What would you like to let go of?",
    "What is a small win you had today?",
    "What are you looking forward to tomorrow?",
    "When did you feel most like yourself today?",
    "What is worrying you right now, and what can you control about it?",
    "What did you do today that your future self will thank you for?",
];

/// Initialize the database connection pool and run migrations.
pub async fn init_database(db_path: &Path) -> Result<SqlitePool, sqlx::Error> {
    // Ensure the parent directory exists
    if let Some(parent) = db_path.parent() {
        tokio::fs::create_dir_all(parent).await.ok();
    }

    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

    let options = SqliteConnectOptions::from_str(&db_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
        .busy_timeout(std::time::Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    run_migrations(&pool).await?;
    seed_questions(&pool).await?;

    Ok(pool)
}

/// Run database migrations.
async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            email TEXT,
            display_name TEXT,
            revision_id INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sessions (
            token_hash TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            created_at TEXT NOT NULL,
            expires_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS questions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            text TEXT NOT NULL UNIQUE,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        "#,
    )
    .execute(pool)
    .await?;

    // question_text is a snapshot; it must survive later edits to the pool
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS drops (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            question_id INTEGER NOT NULL REFERENCES questions(id),
            question_text TEXT NOT NULL,
            text TEXT NOT NULL,
            created_at TEXT NOT NULL,
            journal_date TEXT NOT NULL,
            message_count INTEGER NOT NULL DEFAULT 0,
            UNIQUE (user_id, journal_date, question_id)
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS analyses (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            content TEXT NOT NULL,
            drop_count INTEGER NOT NULL,
            created_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes for common queries
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_sessions_user_id ON sessions(user_id);
        CREATE INDEX IF NOT EXISTS idx_drops_user_id ON drops(user_id);
        CREATE INDEX IF NOT EXISTS idx_drops_user_journal_date ON drops(user_id, journal_date);
        CREATE INDEX IF NOT EXISTS idx_analyses_user_id ON analyses(user_id);
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Fill the question pool on first start.
async fn seed_questions(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM questions")
        .fetch_one(pool)
        .await?;
    if count > 0 {
        return Ok(());
    }

    let mut tx = pool.begin().await?;
    for text in SEED_QUESTIONS {
        sqlx::query("INSERT INTO questions (text) VALUES (?)")
            .bind(*text)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;

    tracing::info!("Seeded question pool with {} questions", SEED_QUESTIONS.len());
    Ok(())
}
