//! Database repository for users, sessions, questions, drops and analyses.
//!
//! Every drop and analysis query is scoped by user id.

use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

use crate::errors::AppError;
use crate::journal;
use crate::models::{
    Analysis, CreateAnalysisRequest, CreateSessionRequest, Entry, Question, User,
};

const ENTRY_COLUMNS: &str =
    "id, user_id, question_id, question_text, text, created_at, message_count";

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get the user's data revision. Unknown users are at revision 0.
    pub async fn get_revision_id(&self, user_id: &str) -> Result<i64, AppError> {
        let row = sqlx::query("SELECT revision_id FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.get("revision_id")).unwrap_or(0))
    }

    // ==================== USER OPERATIONS ====================

    /// Create the user on first sign-in, or refresh their profile.
    pub async fn upsert_user(
        &self,
        request: &CreateSessionRequest,
        now: DateTime<Utc>,
    ) -> Result<User, AppError> {
        sqlx::query(
            r#"INSERT INTO users (id, email, display_name, revision_id, created_at)
            VALUES (?, ?, ?, 0, ?)
            ON CONFLICT(id) DO UPDATE SET
                email = COALESCE(excluded.email, users.email),
                display_name = COALESCE(excluded.display_name, users.display_name)"#,
        )
        .bind(&request.user_id)
        .bind(&request.email)
        .bind(&request.display_name)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.get_user(&request.user_id)
            .await?
            .ok_or_else(|| AppError::Internal("User vanished after upsert".to_string()))
    }

    /// Get a user by ID.
    pub async fn get_user(&self, id: &str) -> Result<Option<User>, AppError> {
        let row =
            sqlx::query("SELECT id, email, display_name, created_at FROM users WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    /// Delete a user together with their sessions, drops and analyses.
    pub async fn delete_user(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User {} not found", id)));
        }
        Ok(())
    }

    // ==================== SESSION OPERATIONS ====================

    /// Store a session by the hash of its token.
    pub async fn create_session(
        &self,
        user_id: &str,
        token_hash: &str,
        now: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO sessions (token_hash, user_id, created_at, expires_at) VALUES (?, ?, ?, ?)",
        )
        .bind(token_hash)
        .bind(user_id)
        .bind(now)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Resolve a session token hash to its user, dropping the session if it has expired.
    pub async fn find_session_user(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<String>, AppError> {
        let row = sqlx::query("SELECT user_id, expires_at FROM sessions WHERE token_hash = ?")
            .bind(token_hash)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let expires_at: DateTime<Utc> = row.get("expires_at");
        if expires_at <= now {
            self.delete_session(token_hash).await?;
            return Ok(None);
        }

        Ok(Some(row.get("user_id")))
    }

    /// Delete a session.
    pub async fn delete_session(&self, token_hash: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM sessions WHERE token_hash = ?")
            .bind(token_hash)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // ==================== QUESTION OPERATIONS ====================

    /// List the question pool in pool order.
    pub async fn list_questions(&self) -> Result<Vec<Question>, AppError> {
        let rows = sqlx::query("SELECT id, text FROM questions ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(|row| question_from_row(&row)).collect())
    }

    /// Append a question to the pool.
    pub async fn create_question(&self, text: &str) -> Result<Question, AppError> {
        let result = sqlx::query("INSERT INTO questions (text) VALUES (?)")
            .bind(text)
            .execute(&self.pool)
            .await;

        match result {
            Ok(done) => Ok(Question {
                id: done.last_insert_rowid(),
                text: text.to_string(),
            }),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(AppError::Validation(
                "Question already exists in the pool".to_string(),
            )),
            Err(e) => Err(e.into()),
        }
    }

    // ==================== DROP OPERATIONS ====================

    /// List the user's drops in insertion order.
    pub async fn list_entries(&self, user_id: &str) -> Result<Vec<Entry>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM drops WHERE user_id = ? ORDER BY id",
            ENTRY_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|row| entry_from_row(&row)).collect())
    }

    /// The first `n` drops of [`Repository::list_entries`], without re-sorting.
    pub async fn recent_entries(&self, user_id: &str, n: i64) -> Result<Vec<Entry>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM drops WHERE user_id = ? ORDER BY id LIMIT ?",
            ENTRY_COLUMNS
        ))
        .bind(user_id)
        .bind(n)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|row| entry_from_row(&row)).collect())
    }

    /// Get one of the user's drops by ID.
    pub async fn get_entry(&self, user_id: &str, id: i64) -> Result<Option<Entry>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM drops WHERE id = ? AND user_id = ?",
            ENTRY_COLUMNS
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(entry_from_row))
    }

    /// ID of the user's most recently created drop.
    pub async fn latest_entry_id(&self, user_id: &str) -> Result<Option<i64>, AppError> {
        let entries = self.list_entries(user_id).await?;
        Ok(journal::latest_entry_id(&entries))
    }

    /// Record an answer for `question_id`, unless the user already answered
    /// that question on the current journaling day.
    ///
    /// The duplicate check and the insert share one write transaction, so two
    /// concurrent submissions cannot both pass the check.
    pub async fn record_answer(
        &self,
        user_id: &str,
        question_id: i64,
        answer_text: &str,
        now: DateTime<Utc>,
    ) -> Result<Entry, AppError> {
        let text = journal::normalize_answer(answer_text)?;
        let journal_date = journal::journaling_date(now);

        let mut tx = self.pool.begin().await?;

        // Writing first takes the database write lock for the whole check-and-insert
        let claimed = sqlx::query("UPDATE users SET revision_id = revision_id + 1 WHERE id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        if claimed.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User {} not found", user_id)));
        }

        let question = sqlx::query("SELECT id, text FROM questions WHERE id = ?")
            .bind(question_id)
            .fetch_optional(&mut *tx)
            .await?
            .as_ref()
            .map(question_from_row)
            .ok_or_else(|| AppError::NotFound(format!("Question {} not found", question_id)))?;

        let same_day: Vec<Entry> = sqlx::query(&format!(
            "SELECT {} FROM drops WHERE user_id = ? AND journal_date = ?",
            ENTRY_COLUMNS
        ))
        .bind(user_id)
        .bind(journal_date)
        .fetch_all(&mut *tx)
        .await?
        .iter()
        .map(entry_from_row)
        .collect();

        if journal::has_answered_today(&same_day, Some(question.text.as_str()), now) {
            tracing::debug!(user_id, question_id, %journal_date, "Rejected duplicate answer");
            return Err(already_answered(journal_date));
        }

        let inserted = sqlx::query(
            r#"INSERT INTO drops (user_id, question_id, question_text, text, created_at, journal_date, message_count)
            VALUES (?, ?, ?, ?, ?, ?, 0)"#,
        )
        .bind(user_id)
        .bind(question.id)
        .bind(&question.text)
        .bind(text)
        .bind(now)
        .bind(journal_date)
        .execute(&mut *tx)
        .await;

        let id = match inserted {
            Ok(done) => done.last_insert_rowid(),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                return Err(already_answered(journal_date));
            }
            Err(e) => return Err(e.into()),
        };

        tx.commit().await?;

        tracing::info!(user_id, drop_id = id, question_id, "Recorded drop");

        Ok(Entry {
            id,
            user_id: user_id.to_string(),
            question_id: question.id,
            question_text: question.text,
            text: text.to_string(),
            created_at: now,
            message_count: 0,
        })
    }

    // ==================== ANALYSIS OPERATIONS ====================

    /// List the user's analyses, newest first.
    pub async fn list_analyses(&self, user_id: &str) -> Result<Vec<Analysis>, AppError> {
        let rows = sqlx::query(
            "SELECT id, user_id, content, drop_count, created_at FROM analyses WHERE user_id = ? ORDER BY created_at DESC, id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|row| analysis_from_row(&row)).collect())
    }

    /// Get one of the user's analyses by ID.
    pub async fn get_analysis(&self, user_id: &str, id: i64) -> Result<Option<Analysis>, AppError> {
        let row = sqlx::query(
            "SELECT id, user_id, content, drop_count, created_at FROM analyses WHERE id = ? AND user_id = ?",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(analysis_from_row))
    }

    /// Store an analysis produced by the analyzer.
    ///
    /// `drop_count` defaults to the number of drops the user has right now.
    pub async fn create_analysis(
        &self,
        request: &CreateAnalysisRequest,
        now: DateTime<Utc>,
    ) -> Result<Analysis, AppError> {
        let mut tx = self.pool.begin().await?;

        let bumped = sqlx::query("UPDATE users SET revision_id = revision_id + 1 WHERE id = ?")
            .bind(&request.user_id)
            .execute(&mut *tx)
            .await?;
        if bumped.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "User {} not found",
                request.user_id
            )));
        }

        let drop_count = match request.drop_count {
            Some(count) => count,
            None => {
                let (count,): (i64,) =
                    sqlx::query_as("SELECT COUNT(*) FROM drops WHERE user_id = ?")
                        .bind(&request.user_id)
                        .fetch_one(&mut *tx)
                        .await?;
                count
            }
        };

        let done = sqlx::query(
            "INSERT INTO analyses (user_id, content, drop_count, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&request.user_id)
        .bind(&request.content)
        .bind(drop_count)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Analysis {
            id: done.last_insert_rowid(),
            user_id: request.user_id.clone(),
            content: request.content.clone(),
            drop_count,
            created_at: now,
        })
    }
}

fn already_answered(journal_date: chrono::NaiveDate) -> AppError {
    AppError::Conflict {
        message: "You have already answered this question today".to_string(),
        journaling_date: journal_date.to_string(),
    }
}

// Helper functions for row conversion

fn user_from_row(row: &sqlx::sqlite::SqliteRow) -> User {
    User {
        id: row.get("id"),
        email: row.get("email"),
        display_name: row.get("display_name"),
        created_at: row.get("created_at"),
    }
}

fn question_from_row(row: &sqlx::sqlite::SqliteRow) -> Question {
    Question {
        id: row.get("id"),
        text: row.get("text"),
    }
}

fn entry_from_row(row: &sqlx::sqlite::SqliteRow) -> Entry {
    Entry {
        id: row.get("id"),
        user_id: row.get("user_id"),
        question_id: row.get("question_id"),
        question_text: row.get("question_text"),
        text: row.get("text"),
        created_at: row.get("created_at"),
        message_count: row.get("message_count"),
    }
}

fn analysis_from_row(row: &sqlx::sqlite::SqliteRow) -> Analysis {
    Analysis {
        id: row.get("id"),
        user_id: row.get("user_id"),
        content: row.get("content"),
        drop_count: row.get("drop_count"),
        created_at: row.get("created_at"),
    }
}
