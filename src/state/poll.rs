//! The single current poll: lifecycle, ballots and tally rules.

use std::{
    collections::HashSet,
    time::{Duration, SystemTime},
};

use thiserror::Error;
use uuid::Uuid;

use crate::state::roster::{AnswerCounts, StudentId};

/// Longest accepted question, in characters.
pub const MAX_QUESTION_CHARS: usize = 100;
/// Longest accepted option label, in characters.
pub const MAX_OPTION_CHARS: usize = 40;
/// Fewest non-empty options a poll can be created with.
pub const MIN_OPTIONS: usize = 2;
/// Most options a poll can carry.
pub const MAX_OPTIONS: usize = 6;

/// Identifier assigned to a poll when it is created.
pub type PollId = Uuid;

/// Lifecycle status of a poll. There is no draft state: a poll is born active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStatus {
    /// Accepting ballots and timeout reports.
    Active,
    /// Closed; tallies and the correct-answer count are frozen.
    Ended,
}

/// Coarse phase of the coordinator, derived from the current poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollPhase {
    /// No poll has been created yet.
    NoPoll,
    /// The current poll is accepting ballots.
    Active(PollId),
    /// The current poll has ended and stays visible until the next one starts.
    Ended(PollId),
}

/// One answer choice with its running tally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollOption {
    /// Position of the option, fixed at creation and never renumbered.
    pub id: u8,
    /// Label shown to students.
    pub text: String,
    /// Number of ballots cast for this option.
    pub votes: u32,
}

/// Teacher-authored poll definition, before validation.
#[derive(Debug, Clone, Default)]
pub struct PollDraft {
    /// Question text.
    pub question: String,
    /// Option labels; blank entries are dropped before validation.
    pub options: Vec<String>,
    /// Answer window length.
    pub max_time_seconds: u32,
    /// Index of the right answer among the options that remain once blanks are dropped.
    pub correct_option_index: Option<usize>,
}

/// Reasons a [`PollDraft`] is refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DraftError {
    /// The question is blank.
    #[error("question must not be empty")]
    EmptyQuestion,
    /// The question exceeds [`MAX_QUESTION_CHARS`].
    #[error("question is {chars} characters long (max {})", MAX_QUESTION_CHARS)]
    QuestionTooLong {
        /// Length of the trimmed question.
        chars: usize,
    },
    /// Fewer than [`MIN_OPTIONS`] non-empty options.
    #[error("a poll needs at least {} non-empty options (got {count})", MIN_OPTIONS)]
    TooFewOptions {
        /// Number of non-empty options.
        count: usize,
    },
    /// More than [`MAX_OPTIONS`] non-empty options.
    #[error("a poll accepts at most {} options (got {count})", MAX_OPTIONS)]
    TooManyOptions {
        /// Number of non-empty options.
        count: usize,
    },
    /// An option label exceeds [`MAX_OPTION_CHARS`].
    #[error("option {index} is {chars} characters long (max {})", MAX_OPTION_CHARS)]
    OptionTooLong {
        /// Position of the offending option after blanks are dropped.
        index: usize,
        /// Length of the trimmed label.
        chars: usize,
    },
    /// The answer window is zero seconds.
    #[error("poll duration must be strictly positive")]
    ZeroDuration,
    /// No correct option was designated.
    #[error("a correct option must be designated")]
    MissingCorrectOption,
    /// The designated correct option does not exist.
    #[error("correct option {index} does not match any of the {count} options")]
    CorrectOptionOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of non-empty options.
        count: usize,
    },
}

/// Errors returned by [`PollCoordinator::create`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CreatePollError {
    /// Another poll is still active.
    #[error("poll `{active}` is still active; end it first")]
    AlreadyActive {
        /// Identifier of the poll that blocks creation.
        active: PollId,
    },
    /// The draft failed validation.
    #[error(transparent)]
    Invalid(#[from] DraftError),
}

/// Errors returned by [`PollCoordinator::end`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EndPollError {
    /// No poll was ever created.
    #[error("no poll is running")]
    NoPoll,
    /// The request targets a poll that is not the current one.
    #[error("poll `{requested}` is not the current poll")]
    NotCurrent {
        /// Identifier named by the caller.
        requested: PollId,
    },
    /// The current poll already ended.
    #[error("poll `{id}` has already ended")]
    AlreadyEnded {
        /// Identifier of the ended poll.
        id: PollId,
    },
}

/// Why a ballot or timeout report was dropped without touching any tally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// No poll exists.
    NoPoll,
    /// The ballot names a poll that is no longer current.
    NotCurrent,
    /// The current poll has ended.
    NotActive,
    /// The server-side deadline passed.
    DeadlineElapsed,
    /// The student is not (or no longer) on the roster.
    UnknownStudent,
    /// The student already answered or timed out on this poll.
    AlreadyAnswered,
    /// The option id does not exist on this poll.
    UnknownOption,
}

/// Result of submitting a ballot or a timeout report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BallotOutcome {
    /// The ballot was tallied.
    Counted {
        /// Option that received the vote.
        option_id: u8,
        /// Whether the option is the designated correct answer.
        correct: bool,
    },
    /// The student was marked answered without a ballot.
    TimedOut,
    /// Nothing changed.
    Ignored(IgnoreReason),
}

impl BallotOutcome {
    /// Whether the outcome mutated the session.
    pub fn is_applied(&self) -> bool {
        !matches!(self, Self::Ignored(_))
    }
}

/// Canonical poll state. Only [`PollCoordinator`] hands out mutable access.
#[derive(Debug, Clone)]
pub struct Poll {
    /// Identifier assigned at creation.
    pub id: PollId,
    /// Trimmed question text.
    pub question: String,
    /// Options in creation order.
    pub options: Vec<PollOption>,
    /// Lifecycle status.
    pub status: PollStatus,
    /// Creation instant; the deadline is measured from here.
    pub created_at: SystemTime,
    /// Set exactly once, when the poll ends.
    pub ended_at: Option<SystemTime>,
    /// Answer window length.
    pub max_time_seconds: u32,
    /// Answer key. Never leaves the server through a snapshot.
    pub correct_option_id: Option<u8>,
    /// Ballots cast for the correct option.
    pub correct_answers_count: u32,
    /// Students bound to this poll, refreshed from the roster on every mutation.
    pub total_students: usize,
    /// Students that voted or timed out, refreshed from the roster on every mutation.
    pub students_answered: usize,
    respondents: HashSet<StudentId>,
}

impl Poll {
    fn from_draft(draft: PollDraft, now: SystemTime) -> Result<Self, DraftError> {
        let question = draft.question.trim();
        if question.is_empty() {
            return Err(DraftError::EmptyQuestion);
        }
        let chars = question.chars().count();
        if chars > MAX_QUESTION_CHARS {
            return Err(DraftError::QuestionTooLong { chars });
        }

        let labels = draft
            .options
            .iter()
            .map(|label| label.trim())
            .filter(|label| !label.is_empty())
            .collect::<Vec<_>>();
        if labels.len() < MIN_OPTIONS {
            return Err(DraftError::TooFewOptions {
                count: labels.len(),
            });
        }
        if labels.len() > MAX_OPTIONS {
            return Err(DraftError::TooManyOptions {
                count: labels.len(),
            });
        }
        if let Some((index, chars)) = labels
            .iter()
            .map(|label| label.chars().count())
            .enumerate()
            .find(|(_, chars)| *chars > MAX_OPTION_CHARS)
        {
            return Err(DraftError::OptionTooLong { index, chars });
        }

        if draft.max_time_seconds == 0 {
            return Err(DraftError::ZeroDuration);
        }

        let correct = draft
            .correct_option_index
            .ok_or(DraftError::MissingCorrectOption)?;
        if correct >= labels.len() {
            return Err(DraftError::CorrectOptionOutOfRange {
                index: correct,
                count: labels.len(),
            });
        }

        // At most MAX_OPTIONS entries, so positions always fit in a u8.
        let options = labels
            .into_iter()
            .zip(0u8..)
            .map(|(text, id)| PollOption {
                id,
                text: text.to_owned(),
                votes: 0,
            })
            .collect::<Vec<_>>();
        let correct_option_id = options.get(correct).map(|option| option.id);

        Ok(Self {
            id: Uuid::new_v4(),
            question: question.to_owned(),
            options,
            status: PollStatus::Active,
            created_at: now,
            ended_at: None,
            max_time_seconds: draft.max_time_seconds,
            correct_option_id,
            correct_answers_count: 0,
            total_students: 0,
            students_answered: 0,
            respondents: HashSet::new(),
        })
    }

    /// Instant after which ballots are no longer accepted.
    pub fn deadline(&self) -> SystemTime {
        self.created_at + Duration::from_secs(u64::from(self.max_time_seconds))
    }

    /// Whether the poll still accepts ballots.
    pub fn is_active(&self) -> bool {
        self.status == PollStatus::Active
    }

    /// Sum of all option tallies.
    pub fn total_votes(&self) -> u32 {
        self.options.iter().map(|option| option.votes).sum()
    }

    /// Whether `student` voted or timed out on this poll, even across reconnects.
    pub fn has_responded(&self, student: &StudentId) -> bool {
        self.respondents.contains(student)
    }

    /// Look up an option by id.
    pub fn option(&self, id: u8) -> Option<&PollOption> {
        self.options.iter().find(|option| option.id == id)
    }

    pub(crate) fn refresh_counts(&mut self, counts: AnswerCounts) {
        self.total_students = counts.total;
        self.students_answered = counts.answered;
    }
}

/// Owner of the single current poll.
///
/// Enforces the one-active-poll rule and is the only writer of tallies, status and the
/// correct-answer count. Roster checks (is the student connected, did they already
/// answer) are layered on top by [`crate::state::session::PollSession`]; the coordinator
/// keeps its own ledger of respondents so a ballot can never be counted twice.
#[derive(Debug, Default)]
pub struct PollCoordinator {
    current: Option<Poll>,
    vote_grace: Duration,
}

impl PollCoordinator {
    /// Create an empty coordinator. `vote_grace` extends the deadline for ballots in flight.
    pub fn new(vote_grace: Duration) -> Self {
        Self {
            current: None,
            vote_grace,
        }
    }

    /// Current poll, active or ended.
    pub fn current(&self) -> Option<&Poll> {
        self.current.as_ref()
    }

    /// Identifier of the current poll when it is still active.
    pub fn active_poll_id(&self) -> Option<PollId> {
        self.current
            .as_ref()
            .filter(|poll| poll.is_active())
            .map(|poll| poll.id)
    }

    /// Inspect the current phase.
    pub fn phase(&self) -> PollPhase {
        match &self.current {
            None => PollPhase::NoPoll,
            Some(poll) if poll.is_active() => PollPhase::Active(poll.id),
            Some(poll) => PollPhase::Ended(poll.id),
        }
    }

    /// Start a new poll, replacing an ended one.
    pub fn create(
        &mut self,
        draft: PollDraft,
        now: SystemTime,
    ) -> Result<&mut Poll, CreatePollError> {
        if let Some(active) = self.active_poll_id() {
            return Err(CreatePollError::AlreadyActive { active });
        }

        let poll = Poll::from_draft(draft, now)?;
        Ok(self.current.insert(poll))
    }

    /// Tally a ballot from `student`. Stale, late and duplicate ballots are ignored.
    pub fn cast_vote(
        &mut self,
        poll_id: PollId,
        option_id: u8,
        student: &StudentId,
        now: SystemTime,
    ) -> BallotOutcome {
        let grace = self.vote_grace;
        let poll = match self.open_poll_mut(poll_id) {
            Ok(poll) => poll,
            Err(reason) => return BallotOutcome::Ignored(reason),
        };

        if now > poll.deadline() + grace {
            return BallotOutcome::Ignored(IgnoreReason::DeadlineElapsed);
        }
        if poll.respondents.contains(student) {
            return BallotOutcome::Ignored(IgnoreReason::AlreadyAnswered);
        }

        let Some(option) = poll
            .options
            .iter_mut()
            .find(|option| option.id == option_id)
        else {
            return BallotOutcome::Ignored(IgnoreReason::UnknownOption);
        };
        option.votes += 1;

        poll.respondents.insert(student.clone());
        let correct = poll.correct_option_id == Some(option_id);
        if correct {
            poll.correct_answers_count += 1;
        }

        BallotOutcome::Counted { option_id, correct }
    }

    /// Mark `student` as answered without a ballot.
    pub fn record_timeout(&mut self, poll_id: PollId, student: &StudentId) -> BallotOutcome {
        let poll = match self.open_poll_mut(poll_id) {
            Ok(poll) => poll,
            Err(reason) => return BallotOutcome::Ignored(reason),
        };

        if !poll.respondents.insert(student.clone()) {
            return BallotOutcome::Ignored(IgnoreReason::AlreadyAnswered);
        }
        BallotOutcome::TimedOut
    }

    /// Close the current poll, freezing its tallies.
    pub fn end(&mut self, poll_id: PollId, now: SystemTime) -> Result<&mut Poll, EndPollError> {
        let poll = self.current.as_mut().ok_or(EndPollError::NoPoll)?;
        if poll.id != poll_id {
            return Err(EndPollError::NotCurrent { requested: poll_id });
        }
        if !poll.is_active() {
            return Err(EndPollError::AlreadyEnded { id: poll.id });
        }

        poll.status = PollStatus::Ended;
        poll.ended_at = Some(now);
        Ok(poll)
    }

    /// Copy roster counters onto the active poll. Ended polls keep their final figures.
    pub(crate) fn refresh_counts(&mut self, counts: AnswerCounts) {
        if let Some(poll) = self.current.as_mut().filter(|poll| poll.is_active()) {
            poll.refresh_counts(counts);
        }
    }

    fn open_poll_mut(&mut self, poll_id: PollId) -> Result<&mut Poll, IgnoreReason> {
        let poll = self.current.as_mut().ok_or(IgnoreReason::NoPoll)?;
        if poll.id != poll_id {
            return Err(IgnoreReason::NotCurrent);
        }
        if !poll.is_active() {
            return Err(IgnoreReason::NotActive);
        }
        Ok(poll)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(options: &[&str], correct: Option<usize>) -> PollDraft {
        PollDraft {
            question: "Pick one".into(),
            options: options.iter().map(|label| label.to_string()).collect(),
            max_time_seconds: 30,
            correct_option_index: correct,
        }
    }

    fn student(name: &str) -> StudentId {
        StudentId::from(name)
    }

    fn started(coordinator: &mut PollCoordinator) -> PollId {
        coordinator
            .create(draft(&["A", "B"], Some(0)), SystemTime::now())
            .unwrap()
            .id
    }

    #[test]
    fn initial_phase_is_no_poll() {
        let coordinator = PollCoordinator::default();
        assert_eq!(coordinator.phase(), PollPhase::NoPoll);
        assert!(coordinator.current().is_none());
    }

    #[test]
    fn create_vote_end_happy_path() {
        let mut coordinator = PollCoordinator::default();
        let poll_id = started(&mut coordinator);
        assert_eq!(coordinator.phase(), PollPhase::Active(poll_id));

        let now = SystemTime::now();
        assert_eq!(
            coordinator.cast_vote(poll_id, 0, &student("ana"), now),
            BallotOutcome::Counted {
                option_id: 0,
                correct: true
            }
        );
        assert_eq!(
            coordinator.cast_vote(poll_id, 1, &student("ben"), now),
            BallotOutcome::Counted {
                option_id: 1,
                correct: false
            }
        );

        let ended = coordinator.end(poll_id, now).unwrap();
        assert_eq!(ended.status, PollStatus::Ended);
        assert_eq!(ended.ended_at, Some(now));
        assert_eq!(ended.correct_answers_count, 1);
        let tallies = ended
            .options
            .iter()
            .map(|option| (option.id, option.text.as_str(), option.votes))
            .collect::<Vec<_>>();
        assert_eq!(tallies, vec![(0, "A", 1), (1, "B", 1)]);
        assert_eq!(coordinator.phase(), PollPhase::Ended(poll_id));
    }

    #[test]
    fn duplicate_ballot_is_ignored() {
        let mut coordinator = PollCoordinator::default();
        let poll_id = started(&mut coordinator);
        let now = SystemTime::now();

        assert!(
            coordinator
                .cast_vote(poll_id, 1, &student("ana"), now)
                .is_applied()
        );
        assert_eq!(
            coordinator.cast_vote(poll_id, 1, &student("ana"), now),
            BallotOutcome::Ignored(IgnoreReason::AlreadyAnswered)
        );
        assert_eq!(coordinator.current().unwrap().total_votes(), 1);
    }

    #[test]
    fn create_while_active_conflicts_and_keeps_tallies() {
        let mut coordinator = PollCoordinator::default();
        let poll_id = started(&mut coordinator);
        coordinator.cast_vote(poll_id, 0, &student("ana"), SystemTime::now());

        let err = coordinator
            .create(draft(&["X", "Y"], Some(1)), SystemTime::now())
            .unwrap_err();
        assert_eq!(err, CreatePollError::AlreadyActive { active: poll_id });

        let current = coordinator.current().unwrap();
        assert_eq!(current.id, poll_id);
        assert_eq!(current.total_votes(), 1);
    }

    #[test]
    fn ending_twice_only_mutates_once() {
        let mut coordinator = PollCoordinator::default();
        let poll_id = started(&mut coordinator);
        let first = SystemTime::now();
        coordinator.end(poll_id, first).unwrap();

        let later = first + Duration::from_secs(5);
        let err = coordinator.end(poll_id, later).unwrap_err();
        assert_eq!(err, EndPollError::AlreadyEnded { id: poll_id });
        assert_eq!(coordinator.current().unwrap().ended_at, Some(first));
    }

    #[test]
    fn end_with_foreign_id_is_rejected() {
        let mut coordinator = PollCoordinator::default();
        assert_eq!(
            coordinator.end(Uuid::new_v4(), SystemTime::now()).unwrap_err(),
            EndPollError::NoPoll
        );

        let poll_id = started(&mut coordinator);
        let other = Uuid::new_v4();
        assert_eq!(
            coordinator.end(other, SystemTime::now()).unwrap_err(),
            EndPollError::NotCurrent { requested: other }
        );
        assert_eq!(coordinator.phase(), PollPhase::Active(poll_id));
    }

    #[test]
    fn ballots_after_end_are_frozen_out() {
        let mut coordinator = PollCoordinator::default();
        let poll_id = started(&mut coordinator);
        coordinator.end(poll_id, SystemTime::now()).unwrap();

        assert_eq!(
            coordinator.cast_vote(poll_id, 0, &student("ana"), SystemTime::now()),
            BallotOutcome::Ignored(IgnoreReason::NotActive)
        );
        assert_eq!(coordinator.current().unwrap().correct_answers_count, 0);
    }

    #[test]
    fn ballots_for_stale_poll_are_ignored() {
        let mut coordinator = PollCoordinator::default();
        let first = started(&mut coordinator);
        coordinator.end(first, SystemTime::now()).unwrap();
        let second = started(&mut coordinator);

        assert_eq!(
            coordinator.cast_vote(first, 0, &student("ana"), SystemTime::now()),
            BallotOutcome::Ignored(IgnoreReason::NotCurrent)
        );
        assert_eq!(coordinator.phase(), PollPhase::Active(second));
    }

    #[test]
    fn unknown_option_is_ignored() {
        let mut coordinator = PollCoordinator::default();
        let poll_id = started(&mut coordinator);
        assert_eq!(
            coordinator.cast_vote(poll_id, 7, &student("ana"), SystemTime::now()),
            BallotOutcome::Ignored(IgnoreReason::UnknownOption)
        );
        assert!(!coordinator.current().unwrap().has_responded(&student("ana")));
    }

    #[test]
    fn late_ballot_is_ignored() {
        let mut coordinator = PollCoordinator::new(Duration::from_millis(500));
        let created = SystemTime::now();
        let poll_id = coordinator
            .create(draft(&["A", "B"], Some(0)), created)
            .unwrap()
            .id;

        let within_grace = created + Duration::from_millis(30_400);
        assert!(
            coordinator
                .cast_vote(poll_id, 0, &student("ana"), within_grace)
                .is_applied()
        );
        let too_late = created + Duration::from_secs(31);
        assert_eq!(
            coordinator.cast_vote(poll_id, 0, &student("ben"), too_late),
            BallotOutcome::Ignored(IgnoreReason::DeadlineElapsed)
        );
    }

    #[test]
    fn timeout_blocks_later_ballot() {
        let mut coordinator = PollCoordinator::default();
        let poll_id = started(&mut coordinator);

        assert_eq!(
            coordinator.record_timeout(poll_id, &student("ana")),
            BallotOutcome::TimedOut
        );
        assert_eq!(
            coordinator.record_timeout(poll_id, &student("ana")),
            BallotOutcome::Ignored(IgnoreReason::AlreadyAnswered)
        );
        assert_eq!(
            coordinator.cast_vote(poll_id, 0, &student("ana"), SystemTime::now()),
            BallotOutcome::Ignored(IgnoreReason::AlreadyAnswered)
        );
        assert_eq!(coordinator.current().unwrap().total_votes(), 0);
    }

    #[test]
    fn blank_options_are_dropped_before_indexing() {
        let mut coordinator = PollCoordinator::default();
        let poll = coordinator
            .create(draft(&["A", "  ", "", "C"], Some(1)), SystemTime::now())
            .unwrap();

        let labels = poll
            .options
            .iter()
            .map(|option| (option.id, option.text.as_str()))
            .collect::<Vec<_>>();
        assert_eq!(labels, vec![(0, "A"), (1, "C")]);
        assert_eq!(poll.correct_option_id, Some(1));
    }

    #[test]
    fn invalid_drafts_are_refused() {
        let now = SystemTime::now();
        let mut coordinator = PollCoordinator::default();

        let mut blank_question = draft(&["A", "B"], Some(0));
        blank_question.question = "   ".into();
        assert_eq!(
            coordinator.create(blank_question, now).unwrap_err(),
            CreatePollError::Invalid(DraftError::EmptyQuestion)
        );

        let mut long_question = draft(&["A", "B"], Some(0));
        long_question.question = "q".repeat(MAX_QUESTION_CHARS + 1);
        assert_eq!(
            coordinator.create(long_question, now).unwrap_err(),
            CreatePollError::Invalid(DraftError::QuestionTooLong { chars: 101 })
        );

        assert_eq!(
            coordinator
                .create(draft(&["A", " "], Some(0)), now)
                .unwrap_err(),
            CreatePollError::Invalid(DraftError::TooFewOptions { count: 1 })
        );
        assert_eq!(
            coordinator
                .create(draft(&["1", "2", "3", "4", "5", "6", "7"], Some(0)), now)
                .unwrap_err(),
            CreatePollError::Invalid(DraftError::TooManyOptions { count: 7 })
        );

        let long_label = "x".repeat(MAX_OPTION_CHARS + 1);
        assert_eq!(
            coordinator
                .create(draft(&["A", &long_label], Some(0)), now)
                .unwrap_err(),
            CreatePollError::Invalid(DraftError::OptionTooLong {
                index: 1,
                chars: 41
            })
        );

        let mut no_time = draft(&["A", "B"], Some(0));
        no_time.max_time_seconds = 0;
        assert_eq!(
            coordinator.create(no_time, now).unwrap_err(),
            CreatePollError::Invalid(DraftError::ZeroDuration)
        );

        assert_eq!(
            coordinator.create(draft(&["A", "B"], None), now).unwrap_err(),
            CreatePollError::Invalid(DraftError::MissingCorrectOption)
        );
        // The index points past the options left once the blank one is dropped.
        assert_eq!(
            coordinator
                .create(draft(&["A", "", "B"], Some(2)), now)
                .unwrap_err(),
            CreatePollError::Invalid(DraftError::CorrectOptionOutOfRange { index: 2, count: 2 })
        );

        assert_eq!(coordinator.phase(), PollPhase::NoPoll);
    }

    #[test]
    fn votes_never_exceed_distinct_voters() {
        let mut coordinator = PollCoordinator::default();
        let poll_id = started(&mut coordinator);
        let voters = ["ana", "ben", "cid"];
        let now = SystemTime::now();

        for round in 0..4u8 {
            for (offset, name) in voters.iter().enumerate() {
                let option = (round + offset as u8) % 2;
                coordinator.cast_vote(poll_id, option, &student(name), now);
            }
        }

        let poll = coordinator.current().unwrap();
        assert_eq!(poll.total_votes(), voters.len() as u32);
        assert!(voters.iter().all(|name| poll.has_responded(&student(name))));
    }
}
