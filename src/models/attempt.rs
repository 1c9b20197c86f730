use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::models::answer::NewAnswer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    InProgress,
    Completed,
    Abandoned,
}

impl AttemptStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptStatus::InProgress => "in_progress",
            AttemptStatus::Completed => "completed",
            AttemptStatus::Abandoned => "abandoned",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, AttemptStatus::InProgress)
    }
}

impl fmt::Display for AttemptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttemptStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in_progress" => Ok(AttemptStatus::InProgress),
            "completed" => Ok(AttemptStatus::Completed),
            "abandoned" => Ok(AttemptStatus::Abandoned),
            other => Err(format!("unknown attempt status '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attempt {
    pub id: Uuid,
    pub candidate_id: Uuid,
    pub template_id: Uuid,
    pub status: AttemptStatus,
    pub started_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub score: Option<i32>,
    pub max_score: i32,
    pub passed: Option<bool>,
}

impl Attempt {
    /// True once `now` is past the deadline extended by `grace`.
    pub fn is_overdue(&self, now: DateTime<Utc>, grace: chrono::Duration) -> bool {
        match self.expires_at {
            Some(deadline) => now > deadline + grace,
            None => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewAttempt {
    pub candidate_id: Uuid,
    pub template_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub max_score: i32,
}

/// Everything written when an attempt completes. Applied as one unit.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptCompletion {
    pub attempt_id: Uuid,
    pub completed_at: DateTime<Utc>,
    pub score: i32,
    pub passed: bool,
    pub answers: Vec<NewAnswer>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttemptFilter {
    pub candidate_id: Option<Uuid>,
    pub template_id: Option<Uuid>,
    pub status: Option<AttemptStatus>,
}

impl AttemptFilter {
    pub fn matches(&self, attempt: &Attempt) -> bool {
        self.candidate_id.map_or(true, |id| attempt.candidate_id == id)
            && self.template_id.map_or(true, |id| attempt.template_id == id)
            && self.status.map_or(true, |s| attempt.status == s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn attempt(expires_at: Option<DateTime<Utc>>) -> Attempt {
        Attempt {
            id: Uuid::new_v4(),
            candidate_id: Uuid::new_v4(),
            template_id: Uuid::new_v4(),
            status: AttemptStatus::InProgress,
            started_at: Utc::now(),
            expires_at,
            completed_at: None,
            score: None,
            max_score: 10,
            passed: None,
        }
    }

    #[test]
    fn only_in_progress_is_non_terminal() {
        assert!(!AttemptStatus::InProgress.is_terminal());
        assert!(AttemptStatus::Completed.is_terminal());
        assert!(AttemptStatus::Abandoned.is_terminal());
    }

    #[test]
    fn overdue_respects_grace_and_missing_deadline() {
        let now = Utc::now();
        let grace = Duration::seconds(30);
        assert!(!attempt(None).is_overdue(now, grace));
        assert!(!attempt(Some(now - Duration::seconds(10))).is_overdue(now, grace));
        assert!(attempt(Some(now - Duration::seconds(31))).is_overdue(now, grace));
    }

    #[test]
    fn status_serializes_snake_case() {
        assert_eq!(
            serde_json::to_value(AttemptStatus::InProgress).unwrap(),
            serde_json::json!("in_progress")
        );
        assert_eq!("abandoned".parse::<AttemptStatus>().unwrap(), AttemptStatus::Abandoned);
    }
}
