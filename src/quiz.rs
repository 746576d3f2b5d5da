use crate::question::QuestionRecord;
use crate::result::{self, SessionResult, Tier};
use crate::sampler::DrawnSet;
use crate::scoring::ScoreBook;
use std::time::SystemTime;
use thiserror::Error;

/// Per-question time budget in milliseconds
pub const DEFAULT_TIME_LIMIT_MS: u64 = 30_000;

/// Contract violations at the engine boundary. These indicate a UI/engine
/// desynchronization, not a recoverable runtime condition.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum QuizError {
    #[error("session is already finished")]
    SessionFinished,
    #[error("session is still in progress")]
    NotFinished,
    #[error("option `{0}` does not exist on the current question")]
    UnknownOption(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Presenting,
    Finished,
}

/// Terminal record of one question's lifetime, in answer order
#[derive(Clone, Debug, PartialEq)]
pub struct AnswerRecord {
    pub question_id: String,
    pub chosen: Option<String>,
    pub correct: bool,
    pub timed_out: bool,
    pub elapsed_ms: u64,
    pub gained: f64,
}

/// One in-progress quiz session. Owns the drawn queue, the cursor, and all
/// scoring state; mutated only through the state-machine methods below and
/// discarded once finalized.
#[derive(Debug)]
pub struct Quiz {
    pub queue: Vec<QuestionRecord>,
    pub cursor: usize,
    pub player_label: String,
    pub time_limit_ms: u64,
    pub max_raw_points: f64,
    pub book: ScoreBook,
    pub answers: Vec<AnswerRecord>,
    phase: Phase,
    presented_at: Option<SystemTime>,
}

impl Quiz {
    pub fn new(drawn: DrawnSet, player_label: String, time_limit_ms: u64) -> Self {
        let phase = if drawn.queue.is_empty() {
            Phase::Finished
        } else {
            Phase::Presenting
        };
        Self {
            queue: drawn.queue,
            cursor: 0,
            player_label,
            time_limit_ms,
            max_raw_points: drawn.max_raw_points,
            book: ScoreBook::default(),
            answers: Vec::new(),
            phase,
            presented_at: None,
        }
    }

    /// Start the first question's timer. Idempotent once presenting.
    pub fn start(&mut self) {
        self.start_at(SystemTime::now());
    }

    pub fn start_at(&mut self, now: SystemTime) {
        if self.phase == Phase::Presenting && self.presented_at.is_none() {
            self.presented_at = Some(now);
        }
    }

    pub fn has_started(&self) -> bool {
        self.presented_at.is_some() || self.phase == Phase::Finished
    }

    pub fn has_finished(&self) -> bool {
        self.phase == Phase::Finished
    }

    /// The question under the cursor, while presenting
    pub fn current(&self) -> Option<&QuestionRecord> {
        if self.phase == Phase::Finished {
            None
        } else {
            self.queue.get(self.cursor)
        }
    }

    /// Completed fraction of the session, for progress display
    pub fn progress_fraction(&self) -> f64 {
        if self.queue.is_empty() {
            1.0
        } else {
            self.cursor as f64 / self.queue.len() as f64
        }
    }

    /// Time spent on the current question so far, carried skips included
    pub fn effective_elapsed_ms(&self, now: SystemTime) -> u64 {
        let carry = self
            .current()
            .map(|q| q.elapsed_carry_ms)
            .unwrap_or_default();
        let running = self
            .presented_at
            .and_then(|t| now.duration_since(t).ok())
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();
        carry + running
    }

    /// Remaining share of the current question's budget, in [0, 1]. Derives
    /// from the same elapsed computation the timeout check uses, so the
    /// timer display can never disagree with the state machine.
    pub fn remaining_fraction(&self, now: SystemTime) -> f64 {
        if self.phase == Phase::Finished {
            return 0.0;
        }
        let elapsed = self.effective_elapsed_ms(now);
        let remaining = self.time_limit_ms.saturating_sub(elapsed);
        remaining as f64 / self.time_limit_ms as f64
    }

    /// Submit the chosen option for the current question and advance.
    pub fn submit_answer(&mut self, key: &str) -> Result<AnswerRecord, QuizError> {
        self.submit_answer_at(key, SystemTime::now())
    }

    pub fn submit_answer_at(
        &mut self,
        key: &str,
        now: SystemTime,
    ) -> Result<AnswerRecord, QuizError> {
        if self.phase == Phase::Finished {
            return Err(QuizError::SessionFinished);
        }
        if !self.queue[self.cursor].has_option(key) {
            return Err(QuizError::UnknownOption(key.to_string()));
        }

        let elapsed = self.effective_elapsed_ms(now);
        let question = &self.queue[self.cursor];
        let gained = self.book.record(question, Some(key), elapsed);
        let record = AnswerRecord {
            question_id: question.id.clone(),
            chosen: Some(key.to_string()),
            correct: key == question.answer_key,
            timed_out: false,
            elapsed_ms: elapsed,
            gained,
        };
        self.answers.push(record.clone());
        self.advance(now);
        Ok(record)
    }

    /// Skip the current question: bank the elapsed time into its carry,
    /// requeue it at the back, and present whatever now sits at the cursor.
    /// The cursor itself does not move.
    pub fn skip(&mut self) -> Result<(), QuizError> {
        self.skip_at(SystemTime::now())
    }

    pub fn skip_at(&mut self, now: SystemTime) -> Result<(), QuizError> {
        if self.phase == Phase::Finished {
            return Err(QuizError::SessionFinished);
        }
        let running = self
            .presented_at
            .and_then(|t| now.duration_since(t).ok())
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();

        let mut question = self.queue.remove(self.cursor);
        question.elapsed_carry_ms += running;
        self.queue.push(question);

        self.presented_at = Some(now);
        Ok(())
    }

    /// Poll the wall clock. Transitions to `TimedOut` and advances when the
    /// current question's budget is spent; a no-op otherwise. Must be called
    /// at least once per rendered frame while presenting.
    pub fn on_tick(&mut self) -> Option<AnswerRecord> {
        self.on_tick_at(SystemTime::now())
    }

    pub fn on_tick_at(&mut self, now: SystemTime) -> Option<AnswerRecord> {
        if self.phase == Phase::Finished || self.presented_at.is_none() {
            return None;
        }
        let elapsed = self.effective_elapsed_ms(now);
        if elapsed < self.time_limit_ms {
            return None;
        }

        let question = &self.queue[self.cursor];
        let gained = self.book.record(question, None, elapsed);
        let record = AnswerRecord {
            question_id: question.id.clone(),
            chosen: None,
            correct: false,
            timed_out: true,
            elapsed_ms: elapsed,
            gained,
        };
        self.answers.push(record.clone());
        self.advance(now);
        Some(record)
    }

    fn advance(&mut self, now: SystemTime) {
        self.cursor += 1;
        if self.cursor >= self.queue.len() {
            self.phase = Phase::Finished;
            self.presented_at = None;
        } else {
            self.presented_at = Some(now);
        }
    }

    /// Finalize the finished session into its result snapshot.
    pub fn finish(&self) -> Result<SessionResult, QuizError> {
        self.finish_with_tiers(&result::TIERS)
    }

    pub fn finish_with_tiers(&self, tiers: &[Tier]) -> Result<SessionResult, QuizError> {
        if self.phase != Phase::Finished {
            return Err(QuizError::NotFinished);
        }
        Ok(result::finalize(self, tiers))
    }
}
