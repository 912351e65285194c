//! Drives a [`Debate`] forward in time.
//!
//! The debate lives inside a `tokio::sync::watch` channel. Commands from the
//! shell and results from the scheduler both go through `send_if_modified`, so
//! there is a single writer at any moment, and every accepted change wakes the
//! scheduler and any subscribed renderer.

use crate::debate::{Commit, Debate, RunState, Step, Ticket, TurnKind};
use crate::gateway::Gateway;
use crate::generator::TextGenerator;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

pub const DEFAULT_TURN_DELAY: Duration = Duration::from_millis(1500);
pub const MIN_TURN_DELAY: Duration = Duration::from_millis(500);
pub const MAX_TURN_DELAY: Duration = Duration::from_millis(4000);
const MAX_THINKING_DELAY: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebateSettings {
    turn_delay: Duration,
    max_turns: Option<usize>,
}

impl Default for DebateSettings {
    fn default() -> Self {
        Self {
            turn_delay: DEFAULT_TURN_DELAY,
            max_turns: Some(crate::debate::DEFAULT_MAX_TURNS),
        }
    }
}

impl DebateSettings {
    /// Pause between turns, clamped to 500..=4000 ms.
    pub fn with_turn_delay(mut self, delay: Duration) -> Self {
        self.turn_delay = delay.clamp(MIN_TURN_DELAY, MAX_TURN_DELAY);
        self
    }

    /// `None` (or `Some(0)`) disables the turn ceiling.
    pub fn with_max_turns(mut self, max_turns: Option<usize>) -> Self {
        self.max_turns = max_turns.filter(|&n| n > 0);
        self
    }

    pub fn turn_delay(&self) -> Duration {
        self.turn_delay
    }

    /// The pause between picking a speaker and asking the model for their line.
    pub fn thinking_delay(&self) -> Duration {
        (self.turn_delay * 3 / 5).min(MAX_THINKING_DELAY)
    }

    pub fn max_turns(&self) -> Option<usize> {
        self.max_turns
    }
}

/// The command surface. Cheap to clone; every clone talks to the same debate.
#[derive(Clone)]
pub struct DebateHandle {
    store: Arc<watch::Sender<Debate>>,
    settings: Arc<watch::Sender<DebateSettings>>,
}

impl DebateHandle {
    fn new(debate: Debate, settings: DebateSettings) -> Self {
        Self {
            store: Arc::new(watch::Sender::new(debate)),
            settings: Arc::new(watch::Sender::new(settings)),
        }
    }

    pub fn start(&self, topic: &str) -> bool {
        let started = self.store.send_if_modified(|debate| debate.start(topic));
        if started {
            tracing::info!(topic = topic.trim(), "debate started");
        } else {
            tracing::debug!(topic, "start ignored");
        }
        started
    }

    pub fn stop(&self) -> bool {
        let stopped = self.store.send_if_modified(Debate::stop);
        if stopped {
            tracing::info!("debate stopped");
        }
        stopped
    }

    pub fn conclude(&self) -> bool {
        let accepted = self.store.send_if_modified(Debate::conclude);
        if accepted {
            tracing::info!("conclusion requested");
        }
        accepted
    }

    pub fn reset(&self) -> bool {
        let reset = self.store.send_if_modified(Debate::reset);
        if reset {
            tracing::info!("debate reset");
        }
        reset
    }

    pub fn subscribe(&self) -> watch::Receiver<Debate> {
        self.store.subscribe()
    }

    pub fn snapshot(&self) -> Debate {
        self.store.borrow().clone()
    }

    pub fn state(&self) -> RunState {
        self.store.borrow().state()
    }

    pub fn settings(&self) -> DebateSettings {
        *self.settings.borrow()
    }

    /// Changes the pacing of later turns. Returns the delay actually applied.
    pub fn set_turn_delay(&self, delay: Duration) -> Duration {
        let mut applied = delay;
        self.settings.send_modify(|settings| {
            *settings = settings.with_turn_delay(delay);
            applied = settings.turn_delay();
        });
        tracing::debug!(turn_delay_ms = applied.as_millis() as u64, "turn delay changed");
        applied
    }

    fn next_step(&self) -> Step {
        let mut step = Step::Wait;
        self.store.send_if_modified(|debate| {
            step = debate.next_step();
            !matches!(step, Step::Wait)
        });
        step
    }

    fn commit(&self, ticket: &Ticket, text: String) -> Commit {
        let mut outcome = Commit::Discarded;
        self.store.send_if_modified(|debate| {
            outcome = debate.commit(ticket, text);
            matches!(outcome, Commit::Appended(_))
        });
        outcome
    }
}

pub struct Orchestrator<G> {
    gateway: Gateway<G>,
    handle: DebateHandle,
}

impl<G: TextGenerator + 'static> Orchestrator<G> {
    pub fn new(gateway: Gateway<G>, settings: DebateSettings) -> Self {
        Self::with_debate(gateway, settings, Debate::new(settings.max_turns()))
    }

    pub fn with_debate(gateway: Gateway<G>, settings: DebateSettings, mut debate: Debate) -> Self {
        debate.set_max_turns(settings.max_turns());
        Self {
            gateway,
            handle: DebateHandle::new(debate, settings),
        }
    }

    pub fn handle(&self) -> DebateHandle {
        self.handle.clone()
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Runs until the task is dropped or aborted. At most one generation is
    /// outstanding; a result that arrives after the run moved on is dropped.
    pub async fn run(self) {
        let mut changes = self.handle.subscribe();
        loop {
            if changes
                .wait_for(|debate| debate.state().is_active())
                .await
                .is_err()
            {
                return;
            }

            let settings = self.handle.settings();
            tokio::time::sleep(settings.turn_delay()).await;

            let pending = match self.handle.next_step() {
                Step::Wait => continue,
                Step::Finished => {
                    tracing::info!("conclusion already in the log, debate finished");
                    continue;
                }
                Step::Generate(pending) => pending,
            };
            let speaker = pending.ticket.speaker.persona();
            tracing::debug!(
                speaker = speaker.name,
                run = pending.ticket.run,
                kind = ?pending.ticket.kind,
                "dispatching turn"
            );

            tokio::time::sleep(settings.thinking_delay()).await;

            let text = match pending.ticket.kind {
                TurnKind::Utterance => {
                    self.gateway
                        .generate_utterance(&pending.topic, &pending.history, speaker)
                        .await
                }
                TurnKind::Closing => {
                    self.gateway
                        .generate_closing(&pending.topic, &pending.history)
                        .await
                }
            };

            match self.handle.commit(&pending.ticket, text) {
                Commit::Appended(turn) => {
                    tracing::info!(speaker = speaker.name, chars = turn.text.len(), "turn committed");
                    if pending.ticket.kind == TurnKind::Closing {
                        tracing::info!("debate finished");
                    }
                }
                Commit::Discarded => {
                    tracing::debug!(speaker = speaker.name, "stale result discarded");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::{Generation, GenerationError, GenerationRequest};
    use crate::persona::PersonaId;
    use crate::transcript::is_diagnostic;
    use async_trait::async_trait;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    const PATIENCE: Duration = Duration::from_secs(600);

    /// Answers every call with a numbered line.
    struct Scripted {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TextGenerator for Scripted {
        async fn generate(&self, request: GenerationRequest) -> Result<Generation, GenerationError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if request.system_instruction.contains("leader of the emotions") {
                Ok(Generation::complete("Everyone was heard, and that is wonderful!"))
            } else {
                Ok(Generation::complete(format!("opinion number {n}")))
            }
        }
    }

    /// Holds each call until the test releases it.
    struct Gated {
        entered: Arc<Notify>,
        release: Arc<Notify>,
    }

    #[async_trait]
    impl TextGenerator for Gated {
        async fn generate(&self, _request: GenerationRequest) -> Result<Generation, GenerationError> {
            self.entered.notify_one();
            self.release.notified().await;
            Ok(Generation::complete("a very late opinion"))
        }
    }

    struct NoKey;

    #[async_trait]
    impl TextGenerator for NoKey {
        async fn generate(&self, _request: GenerationRequest) -> Result<Generation, GenerationError> {
            Err(GenerationError::MissingCredential)
        }
    }

    fn orchestrator<G: TextGenerator + 'static>(generator: G, max_turns: Option<usize>) -> Orchestrator<G> {
        let settings = DebateSettings::default().with_max_turns(max_turns);
        let debate = Debate::with_rng(settings.max_turns(), StdRng::seed_from_u64(3));
        Orchestrator::with_debate(Gateway::new(generator), settings, debate)
    }

    async fn wait_for_state(handle: &DebateHandle, state: RunState) {
        let mut changes = handle.subscribe();
        tokio::time::timeout(PATIENCE, changes.wait_for(|d| d.state() == state))
            .await
            .expect("timed out waiting for state")
            .expect("store closed");
    }

    #[test]
    fn settings_clamp_and_derive_thinking_delay() {
        let fast = DebateSettings::default().with_turn_delay(Duration::from_millis(100));
        assert_eq!(fast.turn_delay(), MIN_TURN_DELAY);
        assert_eq!(fast.thinking_delay(), Duration::from_millis(300));

        let slow = DebateSettings::default().with_turn_delay(Duration::from_secs(60));
        assert_eq!(slow.turn_delay(), MAX_TURN_DELAY);
        assert_eq!(slow.thinking_delay(), MAX_THINKING_DELAY);

        assert_eq!(DebateSettings::default().thinking_delay(), Duration::from_millis(900));
        assert_eq!(DebateSettings::default().with_max_turns(Some(0)).max_turns(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn full_run_reaches_ceiling_and_concludes() {
        let orchestrator = orchestrator(Scripted { calls: AtomicUsize::new(0) }, Some(4));
        let handle = orchestrator.handle();
        let task = orchestrator.spawn();

        assert!(handle.start("universal basic income"));
        wait_for_state(&handle, RunState::Finished).await;

        let debate = handle.snapshot();
        let turns = debate.transcript().turns();
        assert_eq!(turns.len(), 6);
        assert!(turns[0].text.contains("\"universal basic income\""));
        assert!(turns[1..5].iter().all(|t| !t.speaker.is_moderator()));
        for pair in turns[1..5].windows(2) {
            let next = PersonaId::DEBATERS[(pair[0].speaker.debater_index().unwrap() + 1) % 4];
            assert_eq!(pair[1].speaker, next);
        }
        let closing = &turns[5];
        assert_eq!(closing.speaker, PersonaId::MODERATOR);
        assert!(closing.text.starts_with("Everyone was heard"));
        assert_eq!(debate.current_speaker(), None);

        task.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn manual_conclude_produces_one_closing() {
        let orchestrator = orchestrator(Scripted { calls: AtomicUsize::new(0) }, None);
        let handle = orchestrator.handle();
        let mut changes = handle.subscribe();
        let task = orchestrator.spawn();

        handle.start("cats vs dogs");
        tokio::time::timeout(PATIENCE, changes.wait_for(|d| d.transcript().len() >= 3))
            .await
            .unwrap()
            .unwrap();
        assert!(handle.conclude());
        wait_for_state(&handle, RunState::Finished).await;

        // Nothing else happens once finished.
        tokio::time::sleep(Duration::from_secs(30)).await;
        let debate = handle.snapshot();
        let closings = debate
            .transcript()
            .iter()
            .skip(1)
            .filter(|t| t.speaker.is_moderator())
            .count();
        assert_eq!(closings, 1);
        assert_eq!(debate.state(), RunState::Finished);

        task.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn result_arriving_after_stop_is_dropped() {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let orchestrator = orchestrator(
            Gated {
                entered: entered.clone(),
                release: release.clone(),
            },
            None,
        );
        let handle = orchestrator.handle();
        let task = orchestrator.spawn();

        handle.start("x");
        tokio::time::timeout(PATIENCE, entered.notified()).await.unwrap();
        assert!(handle.snapshot().current_speaker().is_some());

        assert!(handle.stop());
        release.notify_one();
        tokio::time::sleep(Duration::from_secs(10)).await;

        let debate = handle.snapshot();
        assert_eq!(debate.state(), RunState::Idle);
        assert_eq!(debate.transcript().len(), 1);
        assert_eq!(debate.current_speaker(), None);

        task.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn result_from_previous_run_never_reaches_new_run() {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let orchestrator = orchestrator(
            Gated {
                entered: entered.clone(),
                release: release.clone(),
            },
            None,
        );
        let handle = orchestrator.handle();
        let task = orchestrator.spawn();

        handle.start("first");
        tokio::time::timeout(PATIENCE, entered.notified()).await.unwrap();
        handle.stop();
        handle.start("second");
        release.notify_one();
        tokio::time::sleep(Duration::from_millis(100)).await;

        let debate = handle.snapshot();
        assert_eq!(debate.topic(), "second");
        assert_eq!(debate.transcript().len(), 1);

        task.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn missing_key_fills_log_with_notices_and_still_finishes() {
        let orchestrator = orchestrator(NoKey, Some(2));
        let handle = orchestrator.handle();
        let task = orchestrator.spawn();

        handle.start("x");
        wait_for_state(&handle, RunState::Finished).await;

        let debate = handle.snapshot();
        let turns = debate.transcript().turns();
        assert_eq!(turns.len(), 4);
        assert!(turns[1..].iter().all(|t| is_diagnostic(&t.text)));
        assert!(turns[1].text.contains("key set"));

        task.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn missing_key_turn_adds_one_notice_for_the_chosen_speaker() {
        let orchestrator = orchestrator(NoKey, None);
        let handle = orchestrator.handle();
        let mut changes = handle.subscribe();
        let task = orchestrator.spawn();

        handle.start("universal basic income");
        let speaker = tokio::time::timeout(PATIENCE, changes.wait_for(|d| d.current_speaker().is_some()))
            .await
            .unwrap()
            .unwrap()
            .current_speaker()
            .unwrap();
        let debate = tokio::time::timeout(PATIENCE, changes.wait_for(|d| d.transcript().len() >= 2))
            .await
            .unwrap()
            .unwrap()
            .clone();

        assert_eq!(debate.transcript().len(), 2);
        let notice = debate.transcript().last().unwrap();
        assert_eq!(notice.speaker, speaker);
        assert!(is_diagnostic(&notice.text));
        assert!(notice.text.contains("key set"));
        assert_eq!(debate.state(), RunState::Debating);

        task.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn turn_delay_paces_the_first_line() {
        let orchestrator = orchestrator(Scripted { calls: AtomicUsize::new(0) }, None);
        let handle = orchestrator.handle();
        assert_eq!(handle.set_turn_delay(Duration::from_millis(2000)), Duration::from_millis(2000));
        let task = orchestrator.spawn();

        handle.start("x");
        tokio::time::sleep(Duration::from_millis(1900)).await;
        assert_eq!(handle.snapshot().transcript().len(), 1);

        // 2000 ms pacing plus 1000 ms thinking.
        tokio::time::sleep(Duration::from_millis(1200)).await;
        assert_eq!(handle.snapshot().transcript().len(), 2);

        task.abort();
    }
}
