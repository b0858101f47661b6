//! Quiz engine: the attempt state machine.
//!
//! The engine enforces the legal order of quiz interactions
//! (select → submit → advance, with regenerate allowed from anywhere) and is
//! the single place where answers are scored. Correctness is tallied inside
//! `submit` only; finalization never re-counts the last question.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::QuizError;
use crate::model::{Question, QuestionBank};
use crate::results::{AnswerRecord, QuizResult};
use crate::timer::{Countdown, Tick, DEFAULT_TIME_LIMIT};

/// Configuration for the quiz engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Whether each question runs a countdown.
    pub timer_enabled: bool,
    /// Countdown length in ticks.
    pub time_limit: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            timer_enabled: true,
            time_limit: DEFAULT_TIME_LIMIT,
        }
    }
}

impl EngineConfig {
    pub fn untimed() -> Self {
        Self {
            timer_enabled: false,
            ..Self::default()
        }
    }

    pub fn timed(time_limit: u32) -> Self {
        Self {
            timer_enabled: true,
            time_limit,
        }
    }
}

/// Per-attempt state. Read-only outside the engine.
#[derive(Debug, Clone)]
pub struct Attempt {
    id: u64,
    current_index: usize,
    selected: Option<usize>,
    answered: bool,
    score: u32,
    countdown: Option<Countdown>,
    answers: Vec<AnswerRecord>,
    finalized: bool,
}

impl Attempt {
    fn fresh(id: u64, config: &EngineConfig) -> Self {
        Self {
            id,
            current_index: 0,
            selected: None,
            answered: false,
            score: 0,
            countdown: config
                .timer_enabled
                .then(|| Countdown::new(config.time_limit)),
            answers: Vec::new(),
            finalized: false,
        }
    }

    /// Attempt generation; changes on every regeneration.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn is_answered(&self) -> bool {
        self.answered
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    /// Seconds left on the countdown, or `None` when the timer is disabled.
    pub fn time_remaining(&self) -> Option<u32> {
        self.countdown.as_ref().map(Countdown::remaining)
    }

    pub fn answers(&self) -> &[AnswerRecord] {
        &self.answers
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    fn state_label(&self) -> &'static str {
        if self.finalized {
            "the attempt is finalized"
        } else if self.answered {
            "the question is already answered"
        } else {
            "the question is unanswered"
        }
    }
}

/// Outcome of a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Submission {
    pub correct: bool,
    /// Forced by the countdown reaching zero.
    pub timed_out: bool,
    /// The question had already been submitted; nothing changed.
    pub repeated: bool,
}

/// Outcome of advancing past an answered question.
#[derive(Debug, Clone)]
pub enum Advance {
    /// Moved to the question at this index.
    Next(usize),
    /// The last question was passed; the attempt is finalized.
    Finished(QuizResult),
}

/// Outcome of one timer tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Time is still left.
    Running(u32),
    /// The countdown hit zero and the question was submitted.
    Expired(Submission),
    /// No countdown is running for the current question.
    Idle,
    /// The tick was scheduled for an attempt that has been replaced.
    Stale,
}

/// Display state of a single option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionState {
    Idle,
    Selected,
    Correct,
    Incorrect,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionView {
    pub label: String,
    pub state: OptionState,
}

/// Everything the presentation layer needs to render the current question.
///
/// Correctness is only revealed once the question is answered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptView {
    pub attempt_id: u64,
    pub bank_title: String,
    /// 1-based position of the current question.
    pub question_number: usize,
    pub total: usize,
    pub prompt: String,
    pub options: Vec<OptionView>,
    pub time_remaining: Option<u32>,
    pub answered: bool,
    pub finalized: bool,
    pub score: u32,
    /// Whether the submitted answer was correct, once answered.
    pub last_correct: Option<bool>,
    /// Explanation text, once answered.
    pub explanation: Option<String>,
}

impl AttemptView {
    /// Progress through the bank as a fraction in `(0, 1]`.
    pub fn progress(&self) -> f64 {
        self.question_number as f64 / self.total.max(1) as f64
    }

    pub fn is_last_question(&self) -> bool {
        self.question_number == self.total
    }
}

/// Owns the active attempt and the bank it is bound to.
pub struct QuizEngine {
    bank: Arc<QuestionBank>,
    config: EngineConfig,
    attempt: Attempt,
    result: Option<QuizResult>,
}

impl QuizEngine {
    /// Start a fresh attempt on `bank`.
    pub fn new(bank: Arc<QuestionBank>, config: EngineConfig) -> Result<Self, QuizError> {
        if bank.is_empty() {
            return Err(QuizError::EmptyBank);
        }
        tracing::debug!(bank = %bank.id, questions = bank.len(), "starting attempt");
        let attempt = Attempt::fresh(1, &config);
        Ok(Self {
            bank,
            config,
            attempt,
            result: None,
        })
    }

    pub fn bank(&self) -> &Arc<QuestionBank> {
        &self.bank
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn attempt(&self) -> &Attempt {
        &self.attempt
    }

    /// The result of the finalized attempt, if it has finished.
    pub fn result(&self) -> Option<&QuizResult> {
        self.result.as_ref()
    }

    pub fn current_question(&self) -> &Question {
        &self.bank.questions()[self.attempt.current_index]
    }

    /// Choose an option for the current question. Re-selection is allowed
    /// until the question is submitted.
    pub fn select_answer(&mut self, option_index: usize) -> Result<(), QuizError> {
        if self.attempt.finalized || self.attempt.answered {
            return Err(QuizError::InvalidTransition {
                operation: "select an answer",
                state: self.attempt.state_label(),
            });
        }
        let option_count = self.current_question().options.len();
        if option_index >= option_count {
            return Err(QuizError::OutOfRangeSelection {
                index: option_index,
                option_count,
            });
        }
        self.attempt.selected = Some(option_index);
        tracing::debug!(
            attempt = self.attempt.id,
            question = self.attempt.current_index,
            option = option_index,
            "answer selected"
        );
        Ok(())
    }

    /// Submit the current selection (possibly none, which scores as
    /// incorrect). Repeated calls for the same question are no-ops.
    pub fn submit(&mut self) -> Result<Submission, QuizError> {
        self.submit_inner(false)
    }

    fn submit_inner(&mut self, timed_out: bool) -> Result<Submission, QuizError> {
        if self.attempt.finalized {
            return Err(QuizError::InvalidTransition {
                operation: "submit",
                state: self.attempt.state_label(),
            });
        }

        if self.attempt.answered {
            let previous = self.attempt.answers.last();
            return Ok(Submission {
                correct: previous.is_some_and(|a| a.correct),
                timed_out: previous.is_some_and(|a| a.timed_out),
                repeated: true,
            });
        }

        let question = &self.bank.questions()[self.attempt.current_index];
        let correct = question.is_correct(self.attempt.selected);
        let question_id = question.id.clone();

        self.attempt.answered = true;
        if correct {
            self.attempt.score += 1;
        }
        if let Some(countdown) = self.attempt.countdown.as_mut() {
            countdown.cancel();
        }
        self.attempt.answers.push(AnswerRecord {
            question_id,
            selected: self.attempt.selected,
            correct,
            timed_out,
        });

        tracing::debug!(
            attempt = self.attempt.id,
            question = self.attempt.current_index,
            correct,
            timed_out,
            score = self.attempt.score,
            "answer submitted"
        );

        Ok(Submission {
            correct,
            timed_out,
            repeated: false,
        })
    }

    /// Move past an answered question, finalizing after the last one.
    pub fn advance(&mut self) -> Result<Advance, QuizError> {
        if self.attempt.finalized || !self.attempt.answered {
            return Err(QuizError::InvalidTransition {
                operation: "advance",
                state: self.attempt.state_label(),
            });
        }

        if self.attempt.current_index + 1 < self.bank.len() {
            self.attempt.current_index += 1;
            self.attempt.selected = None;
            self.attempt.answered = false;
            if let Some(countdown) = self.attempt.countdown.as_mut() {
                countdown.reset();
            }
            return Ok(Advance::Next(self.attempt.current_index));
        }

        self.attempt.finalized = true;
        let result = QuizResult::new(
            self.attempt.id,
            &self.bank,
            self.attempt.score,
            self.attempt.answers.clone(),
        );
        tracing::info!(
            attempt = self.attempt.id,
            bank = %self.bank.id,
            score = result.score,
            total = result.total,
            percentage = result.percentage,
            "attempt finalized"
        );
        self.result = Some(result.clone());
        Ok(Advance::Finished(result))
    }

    /// Discard the current attempt and start over on a new bank.
    ///
    /// Valid from any state. Returns the new attempt id; ticks scheduled for
    /// the old id become stale.
    pub fn regenerate(&mut self, bank: Arc<QuestionBank>) -> Result<u64, QuizError> {
        if bank.is_empty() {
            return Err(QuizError::EmptyBank);
        }
        let id = self.attempt.id + 1;
        tracing::debug!(
            discarded = self.attempt.id,
            attempt = id,
            bank = %bank.id,
            "regenerating attempt"
        );
        self.bank = bank;
        self.attempt = Attempt::fresh(id, &self.config);
        self.result = None;
        Ok(id)
    }

    /// Advance the countdown by one tick, auto-submitting on expiry.
    pub fn tick(&mut self) -> TickOutcome {
        if self.attempt.finalized || self.attempt.answered {
            return TickOutcome::Idle;
        }
        let Some(countdown) = self.attempt.countdown.as_mut() else {
            return TickOutcome::Idle;
        };
        match countdown.tick() {
            Tick::Running(remaining) => TickOutcome::Running(remaining),
            Tick::Idle => TickOutcome::Idle,
            Tick::Expired => match self.submit_inner(true) {
                Ok(submission) => TickOutcome::Expired(submission),
                Err(_) => TickOutcome::Idle,
            },
        }
    }

    /// Like [`QuizEngine::tick`], but ignored unless `attempt_id` is current.
    pub fn tick_for(&mut self, attempt_id: u64) -> TickOutcome {
        if attempt_id != self.attempt.id {
            tracing::debug!(
                stale = attempt_id,
                current = self.attempt.id,
                "dropping stale tick"
            );
            return TickOutcome::Stale;
        }
        self.tick()
    }

    /// Snapshot of the current question for rendering.
    pub fn view(&self) -> AttemptView {
        let question = self.current_question();
        let answered = self.attempt.answered;
        let selected = self.attempt.selected;

        let options = question
            .options
            .iter()
            .enumerate()
            .map(|(i, label)| {
                let is_selected = selected == Some(i);
                let state = if !answered {
                    if is_selected {
                        OptionState::Selected
                    } else {
                        OptionState::Idle
                    }
                } else if i == question.correct_index {
                    OptionState::Correct
                } else if is_selected {
                    OptionState::Incorrect
                } else {
                    OptionState::Idle
                };
                OptionView {
                    label: label.clone(),
                    state,
                }
            })
            .collect();

        AttemptView {
            attempt_id: self.attempt.id,
            bank_title: self.bank.title.clone(),
            question_number: self.attempt.current_index + 1,
            total: self.bank.len(),
            prompt: question.prompt.clone(),
            options,
            time_remaining: self.attempt.time_remaining(),
            answered,
            finalized: self.attempt.finalized,
            score: self.attempt.score,
            last_correct: answered.then(|| question.is_correct(selected)),
            explanation: answered.then(|| question.explanation.clone()),
        }
    }
}
