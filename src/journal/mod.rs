//! Daily-question selection and answer deduplication.
//!
//! Everything here is pure: the current instant is always passed in, so the
//! handlers decide which clock to read and tests can pin it.

mod clock;

pub use clock::*;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;

use crate::models::{Entry, Question};

/// Offset of the journaling day from UTC, in hours.
///
/// Both the question cycle and the "answered today" check roll over at
/// midnight UTC-7, regardless of where the user is.
pub const JOURNAL_UTC_OFFSET_HOURS: i64 = -7;

/// Errors raised by the journaling core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JournalError {
    /// The question pool has no entries to choose from.
    EmptyPool,
    /// The submitted answer is empty after trimming.
    EmptyAnswer,
}

impl std::fmt::Display for JournalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JournalError::EmptyPool => write!(f, "No questions available, try again later"),
            JournalError::EmptyAnswer => write!(f, "Answer text is required"),
        }
    }
}

impl std::error::Error for JournalError {}

/// Today's question as presented to a user.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TodaysQuestion {
    pub question: Question,
    pub journaling_date: NaiveDate,
    pub answered_today: bool,
}

/// Calendar date of `instant` on the journaling clock (UTC-7).
pub fn journaling_date(instant: DateTime<Utc>) -> NaiveDate {
    (instant + Duration::hours(JOURNAL_UTC_OFFSET_HOURS)).date_naive()
}

/// Number of journaling days between 1970-01-01 and the journaling date of `instant`.
pub fn day_index(instant: DateTime<Utc>) -> i64 {
    let epoch = DateTime::<Utc>::UNIX_EPOCH.date_naive();
    journaling_date(instant)
        .signed_duration_since(epoch)
        .num_days()
}

/// Pick the question for the journaling day containing `reference`.
///
/// The same day maps to the same question for every user; the next day maps
/// to the next question in pool order, wrapping at the end.
pub fn resolve_daily_question(
    pool: &[Question],
    reference: DateTime<Utc>,
) -> Result<&Question, JournalError> {
    if pool.is_empty() {
        return Err(JournalError::EmptyPool);
    }

    let index = day_index(reference).rem_euclid(pool.len() as i64) as usize;
    Ok(&pool[index])
}

/// Whether any of `entries` answers `todays_question_text` on the journaling
/// day containing `reference`.
///
/// A `None` question text means the pool has not been resolved yet, which is
/// never treated as answered.
pub fn has_answered_today(
    entries: &[Entry],
    todays_question_text: Option<&str>,
    reference: DateTime<Utc>,
) -> bool {
    let Some(question_text) = todays_question_text else {
        return false;
    };

    let today = journaling_date(reference);
    entries.iter().any(|entry| {
        journaling_date(entry.created_at) == today && entry.question_text == question_text
    })
}

/// Id of the most recently created entry, independent of the input order.
pub fn latest_entry_id(entries: &[Entry]) -> Option<i64> {
    entries
        .iter()
        .max_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)))
        .map(|entry| entry.id)
}

/// Trim an answer and reject it if nothing is left.
pub fn normalize_answer(answer_text: &str) -> Result<&str, JournalError> {
    let trimmed = answer_text.trim();
    if trimmed.is_empty() {
        return Err(JournalError::EmptyAnswer);
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn pool(size: usize) -> Vec<Question> {
        (1..=size as i64)
            .map(|id| Question {
                id,
                text: format!("Question {}", id),
            })
            .collect()
    }

    fn at(rfc3339: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(rfc3339)
            .unwrap()
            .with_timezone(&Utc)
    }

    fn entry(id: i64, question_text: &str, created_at: DateTime<Utc>) -> Entry {
        Entry {
            id,
            user_id: "user-1".to_string(),
            question_id: 1,
            question_text: question_text.to_string(),
            text: "an answer".to_string(),
            created_at,
            message_count: 0,
        }
    }

    #[test]
    fn test_journaling_date_shifts_by_seven_hours() {
        assert_eq!(
            journaling_date(at("2024-03-15T02:00:00Z")),
            NaiveDate::from_ymd_opt(2024, 3, 14).unwrap()
        );
        assert_eq!(
            journaling_date(at("2024-03-15T07:00:00Z")),
            NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
        );
    }

    #[test]
    fn test_day_index_at_epoch() {
        assert_eq!(day_index(at("1970-01-01T07:00:00Z")), 0);
        assert_eq!(day_index(at("1970-01-01T06:59:59Z")), -1);
    }

    #[test]
    fn test_resolve_empty_pool() {
        let result = resolve_daily_question(&[], at("2024-03-15T12:00:00Z"));
        assert_eq!(result, Err(JournalError::EmptyPool));
    }

    #[test]
    fn test_resolve_is_deterministic() {
        let questions = pool(7);
        let reference = at("2024-03-15T12:00:00Z");

        let first = resolve_daily_question(&questions, reference).unwrap().id;
        for _ in 0..10 {
            assert_eq!(resolve_daily_question(&questions, reference).unwrap().id, first);
        }
    }

    #[test]
    fn test_resolve_same_day_same_question() {
        let questions = pool(5);
        let morning = resolve_daily_question(&questions, at("2024-03-15T08:00:00Z")).unwrap();
        let night = resolve_daily_question(&questions, at("2024-03-16T06:59:00Z")).unwrap();
        assert_eq!(morning.id, night.id);
    }

    #[test]
    fn test_resolve_advances_one_per_day_and_wraps() {
        for size in [1usize, 2, 3, 7, 31] {
            let questions = pool(size);
            let start = Utc.with_ymd_and_hms(2023, 12, 25, 12, 0, 0).unwrap();

            for offset in 0..(2 * size as i64 + 3) {
                let today = start + Duration::days(offset);
                let tomorrow = today + Duration::days(1);

                let index_today = questions
                    .iter()
                    .position(|q| q.id == resolve_daily_question(&questions, today).unwrap().id)
                    .unwrap();
                let index_tomorrow = questions
                    .iter()
                    .position(|q| q.id == resolve_daily_question(&questions, tomorrow).unwrap().id)
                    .unwrap();

                assert_eq!(index_tomorrow, (index_today + 1) % size);
            }
        }
    }

    #[test]
    fn test_resolve_before_epoch_stays_in_range() {
        let questions = pool(4);
        let question = resolve_daily_question(&questions, at("1969-06-01T12:00:00Z")).unwrap();
        assert!(questions.iter().any(|q| q.id == question.id));
    }

    #[test]
    fn test_has_answered_today_empty_entries() {
        assert!(!has_answered_today(&[], Some("Question 1"), at("2024-03-15T02:00:00Z")));
        assert!(!has_answered_today(&[], Some("Question 1"), at("2031-01-01T00:00:00Z")));
    }

    #[test]
    fn test_has_answered_today_loading_state() {
        let entries = vec![entry(1, "Question 1", at("2024-03-15T06:00:00Z"))];
        assert!(!has_answered_today(&entries, None, at("2024-03-15T02:00:00Z")));
    }

    #[test]
    fn test_has_answered_today_same_journaling_day() {
        let entries = vec![entry(1, "Question 1", at("2024-03-15T06:00:00Z"))];
        assert!(has_answered_today(&entries, Some("Question 1"), at("2024-03-15T02:00:00Z")));
    }

    #[test]
    fn test_has_answered_today_after_rollover() {
        let entries = vec![entry(1, "Question 1", at("2024-03-15T08:00:00Z"))];
        assert!(!has_answered_today(&entries, Some("Question 1"), at("2024-03-15T02:00:00Z")));
    }

    #[test]
    fn test_has_answered_today_different_question_same_day() {
        let entries = vec![entry(1, "Question 2", at("2024-03-15T06:00:00Z"))];
        assert!(!has_answered_today(&entries, Some("Question 1"), at("2024-03-15T02:00:00Z")));
    }

    #[test]
    fn test_has_answered_today_any_match_counts() {
        let entries = vec![
            entry(1, "Question 1", at("2024-03-10T12:00:00Z")),
            entry(2, "Question 2", at("2024-03-14T12:00:00Z")),
            entry(3, "Question 1", at("2024-03-14T20:00:00Z")),
        ];
        assert!(has_answered_today(&entries, Some("Question 1"), at("2024-03-15T02:00:00Z")));
    }

    #[test]
    fn test_latest_entry_id_sorts_by_created_at() {
        let day1 = at("2024-03-01T12:00:00Z");
        let day2 = at("2024-03-02T12:00:00Z");
        let day3 = at("2024-03-03T12:00:00Z");
        let entries = vec![
            entry(10, "Question 1", day1),
            entry(30, "Question 1", day3),
            entry(20, "Question 1", day2),
        ];
        assert_eq!(latest_entry_id(&entries), Some(30));
    }

    #[test]
    fn test_latest_entry_id_empty() {
        assert_eq!(latest_entry_id(&[]), None);
    }

    #[test]
    fn test_normalize_answer() {
        assert_eq!(normalize_answer("  hello \n"), Ok("hello"));
        assert_eq!(normalize_answer("  "), Err(JournalError::EmptyAnswer));
        assert_eq!(normalize_answer(""), Err(JournalError::EmptyAnswer));
    }
}
