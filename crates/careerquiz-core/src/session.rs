//! Async session driver.
//!
//! A session owns one [`QuizEngine`] inside a single tokio task. User
//! intents arrive as [`Command`]s over a channel and countdown ticks come
//! from an interval on the same task, so every mutation is serialized.
//! Each tick is tagged with the attempt it was scheduled for. Only a
//! successful advance or regeneration re-arms the interval. Events are
//! queued without bound so the task never waits on a slow reader, and
//! dropping the [`SessionHandle`] stops the task and its timer.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use uuid::Uuid;

use crate::engine::{Advance, AttemptView, EngineConfig, QuizEngine, TickOutcome};
use crate::error::QuizError;
use crate::results::QuizResult;
use crate::traits::QuestionSource;

const COMMAND_CAPACITY: usize = 32;

/// A user intent sent to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Select(usize),
    Submit,
    Advance,
    Regenerate,
    /// Ask for a fresh snapshot without changing anything.
    Refresh,
}

/// Something the presentation layer should react to.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// A new attempt is ready (initial start).
    Started(AttemptView),
    /// State changed in response to a command.
    Updated(AttemptView),
    /// One second passed on the current question.
    Tick { attempt_id: u64, remaining: u32 },
    /// The countdown expired and the question was auto-submitted.
    TimedOut(AttemptView),
    /// The last question was passed.
    Finished(QuizResult),
    /// A fresh attempt replaced the previous one.
    Regenerated(AttemptView),
    /// The command was not allowed; state is unchanged.
    Rejected(QuizError),
    /// Fetching a new bank failed; the previous attempt stays active.
    RegenerateFailed(String),
}

/// Session settings.
#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    pub engine: EngineConfig,
    /// Wall-clock duration of one countdown tick.
    pub tick_period: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            tick_period: Duration::from_secs(1),
        }
    }
}

/// Caller side of a running session.
pub struct SessionHandle {
    id: Uuid,
    commands: mpsc::Sender<Command>,
    events: mpsc::UnboundedReceiver<SessionEvent>,
    task: JoinHandle<()>,
}

impl SessionHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Queue a command for the session task.
    pub async fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| anyhow::anyhow!("quiz session {} has stopped", self.id))
    }

    /// Wait for the next event. `None` once the session has stopped.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        self.events.recv().await
    }

    /// Stop the session and wait for its task to exit.
    pub async fn shutdown(self) -> Result<()> {
        let SessionHandle {
            id,
            commands,
            events,
            task,
        } = self;
        drop(commands);
        drop(events);
        task.await
            .with_context(|| format!("quiz session {id} panicked"))?;
        Ok(())
    }
}

/// What the run loop does after a command.
enum Step {
    Stop,
    Continue,
    Rearm,
}

/// The task-side state of a session.
pub struct QuizSession {
    id: Uuid,
    engine: QuizEngine,
    source: Arc<dyn QuestionSource>,
    config: SessionConfig,
    events: mpsc::UnboundedSender<SessionEvent>,
}

impl QuizSession {
    /// Fetch the first bank from `source` and spawn the session task.
    pub async fn start(
        source: Arc<dyn QuestionSource>,
        config: SessionConfig,
    ) -> Result<SessionHandle> {
        let bank = source
            .next_bank()
            .await
            .with_context(|| format!("failed to load questions from {}", source.name()))?;
        let engine = QuizEngine::new(Arc::new(bank), config.engine)?;

        let id = Uuid::new_v4();
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CAPACITY);
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let session = QuizSession {
            id,
            engine,
            source,
            config,
            events: event_tx,
        };
        let task = tokio::spawn(session.run(command_rx));

        Ok(SessionHandle {
            id,
            commands: command_tx,
            events: event_rx,
            task,
        })
    }

    fn arm_timer(&self) -> (Interval, u64) {
        let period = self.config.tick_period;
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        (interval, self.engine.attempt().id())
    }

    async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        tracing::debug!(session = %self.id, "quiz session started");
        if !self.emit(SessionEvent::Started(self.engine.view())) {
            return;
        }

        let timer_enabled = self.config.engine.timer_enabled;
        let (mut interval, mut scheduled_for) = self.arm_timer();

        loop {
            tokio::select! {
                biased;
                command = commands.recv() => {
                    let Some(command) = command else { break };
                    match self.handle(command).await {
                        Step::Stop => break,
                        Step::Continue => {}
                        Step::Rearm => (interval, scheduled_for) = self.arm_timer(),
                    }
                }
                _ = interval.tick(), if timer_enabled => {
                    if !self.on_tick(scheduled_for) {
                        break;
                    }
                }
            }
        }

        tracing::debug!(session = %self.id, "quiz session stopped");
    }

    fn on_tick(&mut self, scheduled_for: u64) -> bool {
        match self.engine.tick_for(scheduled_for) {
            TickOutcome::Running(remaining) => self.emit(SessionEvent::Tick {
                attempt_id: scheduled_for,
                remaining,
            }),
            TickOutcome::Expired(_) => self.emit(SessionEvent::TimedOut(self.engine.view())),
            TickOutcome::Idle | TickOutcome::Stale => true,
        }
    }

    /// Apply one command and report whether the countdown restarts.
    async fn handle(&mut self, command: Command) -> Step {
        let mut rearm = false;
        let outcome = match command {
            Command::Select(index) => self
                .engine
                .select_answer(index)
                .map(|_| SessionEvent::Updated(self.engine.view())),
            Command::Submit => self
                .engine
                .submit()
                .map(|_| SessionEvent::Updated(self.engine.view())),
            Command::Advance => self.engine.advance().map(|advance| match advance {
                Advance::Next(_) => {
                    rearm = true;
                    SessionEvent::Updated(self.engine.view())
                }
                Advance::Finished(result) => SessionEvent::Finished(result),
            }),
            Command::Regenerate => {
                let event = self.regenerate().await;
                rearm = matches!(event, SessionEvent::Regenerated(_));
                Ok(event)
            }
            Command::Refresh => Ok(SessionEvent::Updated(self.engine.view())),
        };

        let event = outcome.unwrap_or_else(|e| {
            tracing::warn!(session = %self.id, ?command, "rejected: {e}");
            SessionEvent::Rejected(e)
        });
        if !self.emit(event) {
            Step::Stop
        } else if rearm {
            Step::Rearm
        } else {
            Step::Continue
        }
    }

    async fn regenerate(&mut self) -> SessionEvent {
        let bank = match self.source.next_bank().await {
            Ok(bank) => bank,
            Err(e) => {
                tracing::warn!(session = %self.id, "regeneration failed: {e:#}");
                return SessionEvent::RegenerateFailed(format!("{e:#}"));
            }
        };
        match self.engine.regenerate(Arc::new(bank)) {
            Ok(_) => SessionEvent::Regenerated(self.engine.view()),
            Err(e) => SessionEvent::Rejected(e),
        }
    }

    /// Returns `false` once the event receiver is gone.
    fn emit(&self, event: SessionEvent) -> bool {
        self.events.send(event).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{sample_question, QuestionBank};
    use crate::source::StaticSource;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn source(correct: &[usize]) -> Arc<dyn QuestionSource> {
        let questions = correct
            .iter()
            .enumerate()
            .map(|(i, &c)| sample_question(&format!("q{}", i + 1), c))
            .collect();
        Arc::new(StaticSource::new(
            QuestionBank::new("bank", "Bank", questions).unwrap(),
        ))
    }

    fn config(timer: Option<u32>) -> SessionConfig {
        SessionConfig {
            engine: match timer {
                Some(limit) => EngineConfig::timed(limit),
                None => EngineConfig::untimed(),
            },
            tick_period: Duration::from_secs(1),
        }
    }

    /// Counts how many banks were requested.
    struct CountingSource {
        inner: Arc<dyn QuestionSource>,
        calls: AtomicU32,
    }

    #[async_trait]
    impl QuestionSource for CountingSource {
        fn name(&self) -> &str {
            "counting"
        }

        async fn next_bank(&self) -> Result<QuestionBank> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.next_bank().await
        }
    }

    struct FailingSource {
        first: Arc<dyn QuestionSource>,
        calls: AtomicU32,
    }

    #[async_trait]
    impl QuestionSource for FailingSource {
        fn name(&self) -> &str {
            "failing"
        }

        async fn next_bank(&self) -> Result<QuestionBank> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                self.first.next_bank().await
            } else {
                anyhow::bail!("generator offline")
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn plays_two_question_quiz() {
        let mut handle = QuizSession::start(source(&[1, 0]), config(None))
            .await
            .unwrap();
        assert!(matches!(
            handle.next_event().await,
            Some(SessionEvent::Started(_))
        ));

        for cmd in [Command::Select(1), Command::Submit, Command::Advance] {
            handle.send(cmd).await.unwrap();
            assert!(matches!(
                handle.next_event().await,
                Some(SessionEvent::Updated(_))
            ));
        }

        handle.send(Command::Select(1)).await.unwrap();
        handle.next_event().await;
        handle.send(Command::Submit).await.unwrap();
        let Some(SessionEvent::Updated(view)) = handle.next_event().await else {
            panic!("expected update");
        };
        assert_eq!(view.score, 1);
        assert_eq!(view.last_correct, Some(false));

        handle.send(Command::Advance).await.unwrap();
        let Some(SessionEvent::Finished(result)) = handle.next_event().await else {
            panic!("expected finish");
        };
        assert_eq!(result.score, 1);
        assert_eq!(result.percentage, 50);

        handle.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_expires_after_limit() {
        let mut handle = QuizSession::start(source(&[0, 1]), config(Some(5)))
            .await
            .unwrap();
        handle.next_event().await;

        let mut ticks = Vec::new();
        let view = loop {
            match handle.next_event().await {
                Some(SessionEvent::Tick { remaining, .. }) => ticks.push(remaining),
                Some(SessionEvent::TimedOut(view)) => break view,
                other => panic!("unexpected event: {other:?}"),
            }
        };
        assert_eq!(ticks, vec![4, 3, 2, 1]);
        assert!(view.answered);
        assert_eq!(view.score, 0);
        assert_eq!(view.time_remaining, Some(0));

        // Nothing more until the user advances.
        handle.send(Command::Refresh).await.unwrap();
        assert!(matches!(
            handle.next_event().await,
            Some(SessionEvent::Updated(_))
        ));

        handle.send(Command::Advance).await.unwrap();
        let Some(SessionEvent::Updated(view)) = handle.next_event().await else {
            panic!("expected update");
        };
        assert_eq!(view.question_number, 2);
        assert_eq!(view.time_remaining, Some(5));
        assert!(matches!(
            handle.next_event().await,
            Some(SessionEvent::Tick { remaining: 4, .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn manual_submit_stops_ticks() {
        let mut handle = QuizSession::start(source(&[0]), config(Some(3)))
            .await
            .unwrap();
        handle.next_event().await;

        handle.send(Command::Select(0)).await.unwrap();
        handle.next_event().await;
        handle.send(Command::Submit).await.unwrap();
        let Some(SessionEvent::Updated(view)) = handle.next_event().await else {
            panic!("expected update");
        };
        assert_eq!(view.score, 1);

        tokio::time::sleep(Duration::from_secs(10)).await;
        handle.send(Command::Refresh).await.unwrap();
        let Some(SessionEvent::Updated(view)) = handle.next_event().await else {
            panic!("no tick events expected after submit");
        };
        assert_eq!(view.score, 1);
        assert_eq!(view.time_remaining, Some(3));
    }

    #[tokio::test(start_paused = true)]
    async fn regenerate_mid_quiz_starts_fresh_attempt() {
        let counting = Arc::new(CountingSource {
            inner: source(&[1, 0, 2]),
            calls: AtomicU32::new(0),
        });
        let mut handle = QuizSession::start(counting.clone(), config(None))
            .await
            .unwrap();
        handle.next_event().await;

        for cmd in [Command::Select(1), Command::Submit, Command::Advance] {
            handle.send(cmd).await.unwrap();
            handle.next_event().await;
        }

        handle.send(Command::Regenerate).await.unwrap();
        let Some(SessionEvent::Regenerated(view)) = handle.next_event().await else {
            panic!("expected regeneration");
        };
        assert_eq!(view.question_number, 1);
        assert_eq!(view.score, 0);
        assert!(!view.answered);
        assert_eq!(view.attempt_id, 2);
        assert_eq!(counting.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn regenerate_rearms_timer_for_new_attempt() {
        let mut handle = QuizSession::start(source(&[0]), config(Some(3)))
            .await
            .unwrap();
        handle.next_event().await;
        assert!(matches!(
            handle.next_event().await,
            Some(SessionEvent::Tick {
                attempt_id: 1,
                remaining: 2
            })
        ));

        handle.send(Command::Regenerate).await.unwrap();
        let Some(SessionEvent::Regenerated(view)) = handle.next_event().await else {
            panic!("expected regeneration");
        };
        assert_eq!(view.time_remaining, Some(3));

        match handle.next_event().await {
            Some(SessionEvent::Tick {
                attempt_id,
                remaining,
            }) => {
                assert_eq!(attempt_id, 2);
                assert_eq!(remaining, 2);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_commands_report_error() {
        let mut handle = QuizSession::start(source(&[0, 1]), config(None))
            .await
            .unwrap();
        handle.next_event().await;

        handle.send(Command::Advance).await.unwrap();
        assert!(matches!(
            handle.next_event().await,
            Some(SessionEvent::Rejected(QuizError::InvalidTransition { .. }))
        ));

        handle.send(Command::Select(9)).await.unwrap();
        assert!(matches!(
            handle.next_event().await,
            Some(SessionEvent::Rejected(QuizError::OutOfRangeSelection { .. }))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_regeneration_keeps_attempt() {
        let failing = Arc::new(FailingSource {
            first: source(&[0, 1]),
            calls: AtomicU32::new(0),
        });
        let mut handle = QuizSession::start(failing, config(None)).await.unwrap();
        handle.next_event().await;

        handle.send(Command::Select(0)).await.unwrap();
        handle.next_event().await;
        handle.send(Command::Regenerate).await.unwrap();
        let Some(SessionEvent::RegenerateFailed(msg)) = handle.next_event().await else {
            panic!("expected failure");
        };
        assert!(msg.contains("generator offline"));

        handle.send(Command::Submit).await.unwrap();
        let Some(SessionEvent::Updated(view)) = handle.next_event().await else {
            panic!("expected update");
        };
        assert_eq!(view.score, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn commands_are_answered_while_events_go_unread() {
        let mut handle = QuizSession::start(source(&[0, 1]), config(None))
            .await
            .unwrap();

        for _ in 0..100 {
            handle.send(Command::Refresh).await.unwrap();
        }

        assert!(matches!(
            handle.next_event().await,
            Some(SessionEvent::Started(_))
        ));
        for _ in 0..100 {
            assert!(matches!(
                handle.next_event().await,
                Some(SessionEvent::Updated(_))
            ));
        }
        handle.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn refused_commands_leave_countdown_running() {
        let failing = Arc::new(FailingSource {
            first: source(&[0, 1]),
            calls: AtomicU32::new(0),
        });
        let start = Instant::now();
        let mut handle = QuizSession::start(failing, config(Some(3))).await.unwrap();

        for _ in 0..3 {
            tokio::time::sleep(Duration::from_millis(900)).await;
            handle.send(Command::Advance).await.unwrap();
            handle.send(Command::Regenerate).await.unwrap();
        }

        let mut seen = Vec::new();
        loop {
            match handle.next_event().await {
                Some(SessionEvent::Started(_)) => {}
                Some(SessionEvent::Rejected(_)) => seen.push("rejected".to_string()),
                Some(SessionEvent::RegenerateFailed(_)) => seen.push("failed".to_string()),
                Some(SessionEvent::Tick { remaining, .. }) => seen.push(format!("tick {remaining}")),
                Some(SessionEvent::TimedOut(view)) => {
                    assert!(view.answered);
                    break;
                }
                other => panic!("unexpected event: {other:?}"),
            }
        }

        assert_eq!(
            seen,
            [
                "rejected", "failed", "tick 2", "rejected", "failed", "tick 1", "rejected",
                "failed",
            ]
        );
        assert_eq!(start.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn tick_from_replaced_attempt_is_dropped() {
        let start = Instant::now();
        let mut handle = QuizSession::start(source(&[0]), config(Some(3)))
            .await
            .unwrap();
        handle.next_event().await;

        tokio::time::sleep(Duration::from_millis(500)).await;
        handle.send(Command::Regenerate).await.unwrap();
        assert!(matches!(
            handle.next_event().await,
            Some(SessionEvent::Regenerated(_))
        ));

        let Some(SessionEvent::Tick {
            attempt_id,
            remaining,
        }) = handle.next_event().await
        else {
            panic!("expected a tick for the new attempt");
        };
        assert_eq!((attempt_id, remaining), (2, 2));
        assert_eq!(start.elapsed(), Duration::from_millis(1500));
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_handle_stops_session() {
        let handle = QuizSession::start(source(&[0]), config(Some(2)))
            .await
            .unwrap();
        let id = handle.id();
        assert!(!id.is_nil());
        handle.shutdown().await.unwrap();
    }
}
