//! The live classroom session: current poll, roster and chat behind one owner.

use std::time::{Duration, SystemTime};

use crate::state::{
    channel::PeerId,
    chat::{ChatError, ChatLog, ChatMessage, NewChatMessage},
    poll::{
        BallotOutcome, CreatePollError, EndPollError, IgnoreReason, Poll, PollCoordinator,
        PollDraft, PollId, PollPhase,
    },
    roster::{
        AnswerCounts, JoinOutcome, PollBinding, RosterError, RosterRegistry, StudentId,
        StudentSession,
    },
};

/// Aggregate owning every piece of mutable classroom state.
///
/// Each operation keeps the poll counters in step with the roster before returning, so a
/// snapshot taken right after any call is consistent.
#[derive(Debug)]
pub struct PollSession {
    polls: PollCoordinator,
    roster: RosterRegistry,
    chat: ChatLog,
}

impl Default for PollSession {
    fn default() -> Self {
        Self::new(crate::state::chat::DEFAULT_CHAT_WINDOW, Duration::ZERO)
    }
}

impl PollSession {
    /// Build an empty session.
    pub fn new(chat_window: usize, vote_grace: Duration) -> Self {
        Self {
            polls: PollCoordinator::new(vote_grace),
            roster: RosterRegistry::new(),
            chat: ChatLog::new(chat_window),
        }
    }

    /// Current poll, active or ended.
    pub fn current_poll(&self) -> Option<&Poll> {
        self.polls.current()
    }

    /// Phase of the current poll.
    pub fn phase(&self) -> PollPhase {
        self.polls.phase()
    }

    /// Identifier of the active poll, if any.
    pub fn active_poll_id(&self) -> Option<PollId> {
        self.polls.active_poll_id()
    }

    /// Connected students.
    pub fn roster(&self) -> &RosterRegistry {
        &self.roster
    }

    /// Chat history.
    pub fn chat(&self) -> &ChatLog {
        &self.chat
    }

    /// Answered and total counters for the current poll.
    pub fn counts(&self) -> AnswerCounts {
        self.roster.counts(self.polls.current().map(|poll| poll.id))
    }

    /// Start a poll and rebind every connected student to it.
    pub fn create_poll(
        &mut self,
        draft: PollDraft,
        now: SystemTime,
    ) -> Result<&Poll, CreatePollError> {
        let poll = self.polls.create(draft, now)?;
        self.roster.reset(poll.id);
        poll.refresh_counts(self.roster.counts(Some(poll.id)));
        Ok(&*poll)
    }

    /// Tally a ballot from a connected student.
    pub fn submit_vote(
        &mut self,
        poll_id: PollId,
        option_id: u8,
        student: &StudentId,
        now: SystemTime,
    ) -> BallotOutcome {
        if let Some(reason) = self.roster_gate(poll_id, student) {
            return BallotOutcome::Ignored(reason);
        }

        let outcome = self.polls.cast_vote(poll_id, option_id, student, now);
        if outcome.is_applied() {
            self.roster.mark_answered(student, poll_id);
            self.refresh_counts();
        }
        outcome
    }

    /// Mark a connected student as answered without a ballot.
    pub fn record_timeout(&mut self, poll_id: PollId, student: &StudentId) -> BallotOutcome {
        if let Some(reason) = self.roster_gate(poll_id, student) {
            return BallotOutcome::Ignored(reason);
        }

        let outcome = self.polls.record_timeout(poll_id, student);
        if outcome.is_applied() {
            self.roster.mark_answered(student, poll_id);
            self.refresh_counts();
        }
        outcome
    }

    /// Record a timeout for every connected student that has not answered `poll_id`.
    ///
    /// Returns the students that were timed out; empty when the poll is no longer active.
    pub fn expire_deadline(&mut self, poll_id: PollId) -> Vec<StudentId> {
        if self.polls.active_poll_id() != Some(poll_id) {
            return Vec::new();
        }

        let pending = self
            .roster
            .iter()
            .filter(|session| !(session.answered && session.current_poll_id == Some(poll_id)))
            .map(|session| session.id.clone())
            .collect::<Vec<_>>();

        let mut timed_out = Vec::with_capacity(pending.len());
        for student in pending {
            if self.polls.record_timeout(poll_id, &student).is_applied() {
                self.roster.mark_answered(&student, poll_id);
                timed_out.push(student);
            }
        }

        if !timed_out.is_empty() {
            self.refresh_counts();
        }
        timed_out
    }

    /// Close the current poll.
    pub fn end_poll(&mut self, poll_id: PollId, now: SystemTime) -> Result<&Poll, EndPollError> {
        self.refresh_counts();
        self.polls.end(poll_id, now).map(|poll| &*poll)
    }

    /// Join (or rejoin) the roster from `peer_id`.
    ///
    /// Without a token the connection's existing identity is reused, or a new token is issued.
    pub fn join(
        &mut self,
        requested: Option<StudentId>,
        display_name: &str,
        peer_id: PeerId,
    ) -> Result<(StudentId, JoinOutcome), RosterError> {
        let id = requested
            .or_else(|| self.roster.student_for_peer(peer_id).cloned())
            .unwrap_or_else(StudentId::issue);

        let binding = match self.polls.current() {
            Some(poll) => PollBinding {
                poll_id: Some(poll.id),
                answered: poll.has_responded(&id),
            },
            None => PollBinding::default(),
        };

        let outcome = self.roster.join(id.clone(), display_name, peer_id, binding)?;
        self.refresh_counts();
        Ok((id, outcome))
    }

    /// Drop the student carried by a closed connection.
    pub fn leave(&mut self, peer_id: PeerId) -> Option<StudentSession> {
        let session = self.roster.remove_peer(peer_id)?;
        self.refresh_counts();
        Some(session)
    }

    /// Remove a student for good.
    pub fn kick(&mut self, student: &StudentId) -> Result<StudentSession, RosterError> {
        let session = self.roster.kick(student)?;
        self.refresh_counts();
        Ok(session)
    }

    /// Append a chat message, stamped with the poll active right now, if any.
    pub fn post_chat(
        &mut self,
        message: NewChatMessage,
        now: SystemTime,
    ) -> Result<&ChatMessage, ChatError> {
        let poll_id = self.polls.active_poll_id();
        self.chat.append(message, poll_id, now)
    }

    fn roster_gate(&self, poll_id: PollId, student: &StudentId) -> Option<IgnoreReason> {
        match self.roster.has_answered(student, poll_id) {
            None => Some(IgnoreReason::UnknownStudent),
            Some(true) => Some(IgnoreReason::AlreadyAnswered),
            Some(false) => None,
        }
    }

    fn refresh_counts(&mut self) {
        let counts = self.counts();
        self.polls.refresh_counts(counts);
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    fn draft() -> PollDraft {
        PollDraft {
            question: "2 + 2?".into(),
            options: vec!["3".into(), "4".into(), "5".into()],
            max_time_seconds: 20,
            correct_option_index: Some(1),
        }
    }

    fn join(session: &mut PollSession, name: &str) -> (StudentId, PeerId) {
        let peer = Uuid::new_v4();
        let (id, _) = session.join(None, name, peer).unwrap();
        (id, peer)
    }

    #[test]
    fn two_students_vote_and_poll_ends() {
        let mut session = PollSession::default();
        let (ana, _) = join(&mut session, "Ana");
        let (ben, _) = join(&mut session, "Ben");
        let poll_id = session.create_poll(draft(), SystemTime::now()).unwrap().id;

        let now = SystemTime::now();
        assert!(session.submit_vote(poll_id, 1, &ana, now).is_applied());
        assert!(session.submit_vote(poll_id, 2, &ben, now).is_applied());
        let poll = session.current_poll().unwrap();
        assert_eq!(poll.students_answered, 2);
        assert_eq!(poll.total_students, 2);

        let ended = session.end_poll(poll_id, now).unwrap();
        assert_eq!(ended.correct_answers_count, 1);
        assert_eq!(ended.total_votes(), 2);
    }

    #[test]
    fn create_resets_answered_flags() {
        let mut session = PollSession::default();
        let (ana, _) = join(&mut session, "Ana");
        let first = session.create_poll(draft(), SystemTime::now()).unwrap().id;
        session.submit_vote(first, 0, &ana, SystemTime::now());
        session.end_poll(first, SystemTime::now()).unwrap();

        let second = session.create_poll(draft(), SystemTime::now()).unwrap().id;
        assert_eq!(session.roster().has_answered(&ana, second), Some(false));
        assert_eq!(
            session.counts(),
            AnswerCounts {
                answered: 0,
                total: 1
            }
        );
        assert!(session.submit_vote(second, 0, &ana, SystemTime::now()).is_applied());
    }

    #[test]
    fn kicked_student_vote_is_ignored() {
        let mut session = PollSession::default();
        let (ana, _) = join(&mut session, "Ana");
        let poll_id = session.create_poll(draft(), SystemTime::now()).unwrap().id;

        session.kick(&ana).unwrap();
        assert_eq!(
            session.submit_vote(poll_id, 1, &ana, SystemTime::now()),
            BallotOutcome::Ignored(IgnoreReason::UnknownStudent)
        );
        assert_eq!(session.current_poll().unwrap().total_votes(), 0);
        assert_eq!(session.current_poll().unwrap().total_students, 0);
    }

    #[test]
    fn reconnect_restores_answered_status() {
        let mut session = PollSession::default();
        let (ana, peer) = join(&mut session, "Ana");
        let poll_id = session.create_poll(draft(), SystemTime::now()).unwrap().id;
        session.submit_vote(poll_id, 1, &ana, SystemTime::now());

        session.leave(peer).unwrap();
        assert_eq!(session.current_poll().unwrap().total_students, 0);

        let (id, outcome) = session
            .join(Some(ana.clone()), "Ana", Uuid::new_v4())
            .unwrap();
        assert_eq!(id, ana);
        assert_eq!(outcome, JoinOutcome::Registered { answered: true });
        assert_eq!(
            session.submit_vote(poll_id, 0, &ana, SystemTime::now()),
            BallotOutcome::Ignored(IgnoreReason::AlreadyAnswered)
        );
        assert_eq!(session.current_poll().unwrap().total_votes(), 1);
    }

    #[test]
    fn join_without_token_reuses_connection_identity() {
        let mut session = PollSession::default();
        let (ana, peer) = join(&mut session, "Ana");
        let (again, outcome) = session.join(None, "Ana", peer).unwrap();
        assert_eq!(again, ana);
        assert!(matches!(outcome, JoinOutcome::Rejoined { .. }));
        assert_eq!(session.roster().len(), 1);
    }

    #[test]
    fn expiry_times_out_everyone_pending() {
        let mut session = PollSession::default();
        let (ana, _) = join(&mut session, "Ana");
        let (ben, _) = join(&mut session, "Ben");
        let poll_id = session.create_poll(draft(), SystemTime::now()).unwrap().id;
        session.submit_vote(poll_id, 1, &ana, SystemTime::now());

        assert_eq!(session.expire_deadline(poll_id), vec![ben.clone()]);
        assert_eq!(
            session.counts(),
            AnswerCounts {
                answered: 2,
                total: 2
            }
        );
        assert_eq!(session.current_poll().unwrap().total_votes(), 1);
        assert!(session.expire_deadline(poll_id).is_empty());

        session.end_poll(poll_id, SystemTime::now()).unwrap();
        assert!(session.expire_deadline(poll_id).is_empty());
    }

    #[test]
    fn ended_poll_keeps_final_counters() {
        let mut session = PollSession::default();
        let (ana, _) = join(&mut session, "Ana");
        let poll_id = session.create_poll(draft(), SystemTime::now()).unwrap().id;
        session.submit_vote(poll_id, 1, &ana, SystemTime::now());
        session.end_poll(poll_id, SystemTime::now()).unwrap();

        join(&mut session, "Late");
        let poll = session.current_poll().unwrap();
        assert_eq!(poll.total_students, 1);
        assert_eq!(poll.students_answered, 1);
    }

    #[test]
    fn chat_is_stamped_with_active_poll_only() {
        let mut session = PollSession::default();
        let message = NewChatMessage {
            sender_id: "t".into(),
            sender_name: "Teacher".into(),
            text: "welcome".into(),
            timestamp: None,
        };
        assert_eq!(
            session
                .post_chat(message.clone(), SystemTime::now())
                .unwrap()
                .poll_id,
            None
        );

        let poll_id = session.create_poll(draft(), SystemTime::now()).unwrap().id;
        assert_eq!(
            session
                .post_chat(message.clone(), SystemTime::now())
                .unwrap()
                .poll_id,
            Some(poll_id)
        );

        session.end_poll(poll_id, SystemTime::now()).unwrap();
        assert_eq!(
            session.post_chat(message, SystemTime::now()).unwrap().poll_id,
            None
        );
        assert_eq!(session.chat().len(), 3);
    }
}
