use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

use crate::state::poll::{Poll, PollOption, PollStatus};

/// Stored lifecycle status of a poll.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PollStatusEntity {
    Active,
    Ended,
}

/// Option tally as stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PollOptionEntity {
    /// Position of the option inside the poll.
    pub id: u8,
    /// Label shown to students.
    pub text: String,
    /// Ballots cast for this option.
    pub votes: u32,
}

/// Durable record of a poll.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PollEntity {
    /// Stable identifier for the poll.
    pub id: Uuid,
    pub question: String,
    pub options: Vec<PollOptionEntity>,
    pub status: PollStatusEntity,
    pub created_at: SystemTime,
    /// Set once the poll has ended.
    pub ended_at: Option<SystemTime>,
    pub max_time_seconds: u32,
    /// Answer key, kept for reporting only.
    pub correct_option_id: Option<u8>,
    pub correct_answers_count: u32,
}

/// Final figures written when a poll ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollOutcomeEntity {
    pub ended_at: SystemTime,
    pub options: Vec<PollOptionEntity>,
    pub correct_answers_count: u32,
}

impl From<&PollOption> for PollOptionEntity {
    fn from(option: &PollOption) -> Self {
        Self {
            id: option.id,
            text: option.text.clone(),
            votes: option.votes,
        }
    }
}

impl From<PollStatus> for PollStatusEntity {
    fn from(value: PollStatus) -> Self {
        match value {
            PollStatus::Active => Self::Active,
            PollStatus::Ended => Self::Ended,
        }
    }
}

impl From<&Poll> for PollEntity {
    fn from(poll: &Poll) -> Self {
        Self {
            id: poll.id,
            question: poll.question.clone(),
            options: option_entities(poll),
            status: poll.status.into(),
            created_at: poll.created_at,
            ended_at: poll.ended_at,
            max_time_seconds: poll.max_time_seconds,
            correct_option_id: poll.correct_option_id,
            correct_answers_count: poll.correct_answers_count,
        }
    }
}

/// Snapshot the tallies of `poll` for storage.
pub fn option_entities(poll: &Poll) -> Vec<PollOptionEntity> {
    poll.options.iter().map(Into::into).collect()
}
