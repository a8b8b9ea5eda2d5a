use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::PollEntity,
    dto::{
        epoch_millis, format_system_time, roster::RosterEntry,
        validation::validate_option_labels,
    },
    state::{
        poll::{Poll, PollDraft, PollOption, PollStatus},
        roster::AnswerCounts,
    },
};

/// Wire representation of a poll lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PollStatusDto {
    Active,
    Ended,
}

impl From<PollStatus> for PollStatusDto {
    fn from(value: PollStatus) -> Self {
        match value {
            PollStatus::Active => Self::Active,
            PollStatus::Ended => Self::Ended,
        }
    }
}

/// One option of a poll with its running tally.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PollOptionSnapshot {
    pub id: u8,
    pub text: String,
    pub votes: u32,
}

impl From<&PollOption> for PollOptionSnapshot {
    fn from(option: &PollOption) -> Self {
        Self {
            id: option.id,
            text: option.text.clone(),
            votes: option.votes,
        }
    }
}

/// Client-safe view of the current poll.
///
/// The answer key is never part of this projection. The correct-answer count only
/// appears once the poll has ended.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PollSnapshot {
    pub poll_id: Uuid,
    pub question: String,
    pub options: Vec<PollOptionSnapshot>,
    pub status: PollStatusDto,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
    /// Instant after which ballots are refused, in milliseconds since the Unix epoch.
    pub deadline_ms: u64,
    /// RFC 3339 end timestamp, once ended.
    pub ended_at: Option<String>,
    pub max_time_seconds: u32,
    pub total_votes: u32,
    pub total_students: usize,
    pub students_answered: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_answers_count: Option<u32>,
}

impl From<&Poll> for PollSnapshot {
    fn from(poll: &Poll) -> Self {
        Self {
            poll_id: poll.id,
            question: poll.question.clone(),
            options: poll.options.iter().map(Into::into).collect(),
            status: poll.status.into(),
            created_at: format_system_time(poll.created_at),
            deadline_ms: epoch_millis(poll.deadline()),
            ended_at: poll.ended_at.map(format_system_time),
            max_time_seconds: poll.max_time_seconds,
            total_votes: poll.total_votes(),
            total_students: poll.total_students,
            students_answered: poll.students_answered,
            correct_answers_count: (!poll.is_active()).then_some(poll.correct_answers_count),
        }
    }
}

/// Answered and total student counters.
#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
pub struct AnswerCountsDto {
    pub answered: usize,
    pub total: usize,
}

impl From<AnswerCounts> for AnswerCountsDto {
    fn from(value: AnswerCounts) -> Self {
        Self {
            answered: value.answered,
            total: value.total,
        }
    }
}

/// Teacher request starting a new poll.
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct CreatePollRequest {
    /// Length is checked after trimming when the poll is created.
    #[validate(length(min = 1))]
    pub question: String,
    /// Option labels; blank entries are dropped.
    #[validate(length(min = 2), custom(function = "validate_option_labels"))]
    pub options: Vec<String>,
    #[validate(range(min = 1))]
    pub max_time_seconds: u32,
    /// Position of the right answer among the non-blank options.
    #[serde(default)]
    pub correct_option_index: Option<usize>,
}

impl From<CreatePollRequest> for PollDraft {
    fn from(value: CreatePollRequest) -> Self {
        Self {
            question: value.question,
            options: value.options,
            max_time_seconds: value.max_time_seconds,
            correct_option_index: value.correct_option_index,
        }
    }
}

/// Ended poll listed in the history.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PollHistoryItem {
    pub poll_id: Uuid,
    pub question: String,
    pub options: Vec<PollOptionSnapshot>,
    pub created_at: String,
    pub ended_at: Option<String>,
    pub max_time_seconds: u32,
    pub total_votes: u32,
    pub correct_answers_count: u32,
}

impl From<PollEntity> for PollHistoryItem {
    fn from(entity: PollEntity) -> Self {
        let options = entity
            .options
            .into_iter()
            .map(|option| PollOptionSnapshot {
                id: option.id,
                text: option.text,
                votes: option.votes,
            })
            .collect::<Vec<_>>();
        Self {
            poll_id: entity.id,
            question: entity.question,
            total_votes: options.iter().map(|option| option.votes).sum(),
            options,
            created_at: format_system_time(entity.created_at),
            ended_at: entity.ended_at.map(format_system_time),
            max_time_seconds: entity.max_time_seconds,
            correct_answers_count: entity.correct_answers_count,
        }
    }
}

/// Query parameters accepted by the history endpoint.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct HistoryQuery {
    /// Maximum number of polls to return; capped by the server configuration.
    pub limit: Option<usize>,
}

/// Everything a freshly connected client needs to render the classroom.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SessionSnapshot {
    pub poll: Option<PollSnapshot>,
    pub counts: AnswerCountsDto,
    pub roster: Vec<RosterEntry>,
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use validator::Validate;

    use super::*;
    use crate::state::poll::PollCoordinator;

    fn request(options: &[&str]) -> CreatePollRequest {
        CreatePollRequest {
            question: "Capital of France?".into(),
            options: options.iter().map(|label| label.to_string()).collect(),
            max_time_seconds: 30,
            correct_option_index: Some(0),
        }
    }

    #[test]
    fn snapshot_never_carries_the_answer_key() {
        let mut coordinator = PollCoordinator::default();
        let poll = coordinator
            .create(request(&["Paris", "Lyon"]).into(), SystemTime::now())
            .unwrap();
        let active = serde_json::to_value(PollSnapshot::from(&*poll)).unwrap();
        assert!(active.get("correct_option_id").is_none());
        assert!(active.get("correct_answers_count").is_none());
        assert_eq!(active["status"], "active");

        let poll_id = poll.id;
        let ended = coordinator.end(poll_id, SystemTime::now()).unwrap();
        let ended = serde_json::to_value(PollSnapshot::from(&*ended)).unwrap();
        assert!(ended.get("correct_option_id").is_none());
        assert_eq!(ended["correct_answers_count"], 0);
        assert_eq!(ended["status"], "ended");
    }

    #[test]
    fn create_request_validation() {
        assert!(request(&["Paris", "Lyon"]).validate().is_ok());
        assert!(request(&["Paris"]).validate().is_err());

        let mut no_question = request(&["Paris", "Lyon"]);
        no_question.question.clear();
        assert!(no_question.validate().is_err());

        let mut no_time = request(&["Paris", "Lyon"]);
        no_time.max_time_seconds = 0;
        assert!(no_time.validate().is_err());

        let long_label = "x".repeat(41);
        assert!(request(&["Paris", &long_label]).validate().is_err());
    }

    #[test]
    fn padded_question_is_measured_after_trimming() {
        let mut padded = request(&["Paris", "Lyon"]);
        padded.question = format!("   {}   ", "q".repeat(98));
        assert!(padded.validate().is_ok());

        let mut coordinator = PollCoordinator::default();
        let poll = coordinator
            .create(padded.into(), SystemTime::now())
            .unwrap();
        assert_eq!(poll.question.chars().count(), 98);

        let mut too_long = request(&["Paris", "Lyon"]);
        too_long.question = "q".repeat(101);
        assert!(
            PollCoordinator::default()
                .create(too_long.into(), SystemTime::now())
                .is_err()
        );
    }
}
