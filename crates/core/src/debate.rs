//! The debate state machine.
//!
//! `Debate` is plain data plus synchronous transitions. It never awaits and never
//! talks to the provider; the orchestrator asks it what to do next, performs the
//! call, and hands the result back through [`Debate::commit`], which re-checks
//! that the world has not moved on in the meantime.

use crate::persona::PersonaId;
use crate::prompts::opening_line;
use crate::transcript::{Transcript, Turn};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

/// A closing line must be longer than this to count as a real conclusion.
pub const CONCLUSION_MIN_CHARS: usize = 20;
pub const DEFAULT_MAX_TURNS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunState {
    Idle,
    Debating,
    Concluding,
    Finished,
}

impl RunState {
    /// States in which the scheduler has work to do.
    pub fn is_active(self) -> bool {
        matches!(self, RunState::Debating | RunState::Concluding)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnKind {
    Utterance,
    Closing,
}

/// Identifies one outstanding unit of work. A result is only committed if the
/// run, the state and the log length are exactly what they were at dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    pub run: u64,
    pub kind: TurnKind,
    pub speaker: PersonaId,
    pub expected_len: usize,
}

impl Ticket {
    fn expected_state(&self) -> RunState {
        match self.kind {
            TurnKind::Utterance => RunState::Debating,
            TurnKind::Closing => RunState::Concluding,
        }
    }
}

/// Everything the gateway needs for one call, captured at dispatch time.
#[derive(Debug, Clone)]
pub struct PendingTurn {
    pub ticket: Ticket,
    pub topic: String,
    pub history: Vec<Turn>,
}

#[derive(Debug, Clone)]
pub enum Step {
    /// Nothing to do in the current state.
    Wait,
    /// The log already ended in a conclusion; the run moved straight to Finished.
    Finished,
    Generate(PendingTurn),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Commit {
    Appended(Turn),
    /// The run was stopped, restarted or concluded while the call was out.
    Discarded,
}

#[derive(Debug, Clone)]
pub struct Debate {
    state: RunState,
    topic: String,
    transcript: Transcript,
    current_speaker: Option<PersonaId>,
    run: u64,
    max_turns: Option<usize>,
    rng: StdRng,
}

impl Default for Debate {
    fn default() -> Self {
        Self::new(Some(DEFAULT_MAX_TURNS))
    }
}

impl Debate {
    /// `max_turns` caps debater turns before the run concludes on its own;
    /// `None` lets it run until someone calls `conclude`.
    pub fn new(max_turns: Option<usize>) -> Self {
        Self::with_rng(max_turns, StdRng::from_entropy())
    }

    pub fn with_rng(max_turns: Option<usize>, rng: StdRng) -> Self {
        Self {
            state: RunState::Idle,
            topic: String::new(),
            transcript: Transcript::new(),
            current_speaker: None,
            run: 0,
            max_turns,
            rng,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn current_speaker(&self) -> Option<PersonaId> {
        self.current_speaker
    }

    pub fn max_turns(&self) -> Option<usize> {
        self.max_turns
    }

    pub fn set_max_turns(&mut self, max_turns: Option<usize>) {
        self.max_turns = max_turns;
    }

    /// Begins a new run. Ignored for a blank topic or while a run is in progress.
    pub fn start(&mut self, topic: &str) -> bool {
        let topic = topic.trim();
        if topic.is_empty() || !matches!(self.state, RunState::Idle | RunState::Finished) {
            return false;
        }
        self.run += 1;
        self.state = RunState::Debating;
        self.topic = topic.to_string();
        self.current_speaker = None;
        self.transcript.clear();
        self.transcript.append(PersonaId::MODERATOR, opening_line(topic));
        true
    }

    /// Drops back to Idle. Anything still being generated is now stale.
    pub fn stop(&mut self) -> bool {
        if self.state == RunState::Idle {
            return false;
        }
        self.run += 1;
        self.state = RunState::Idle;
        self.current_speaker = None;
        true
    }

    pub fn conclude(&mut self) -> bool {
        if self.state != RunState::Debating {
            return false;
        }
        self.state = RunState::Concluding;
        true
    }

    pub fn reset(&mut self) -> bool {
        if !matches!(self.state, RunState::Idle | RunState::Finished) {
            return false;
        }
        self.run += 1;
        self.state = RunState::Idle;
        self.topic.clear();
        self.transcript.clear();
        self.current_speaker = None;
        true
    }

    /// Works out the next unit of work from the current state and the tail of
    /// the log. Marks the chosen speaker as current.
    pub fn next_step(&mut self) -> Step {
        if self.state == RunState::Debating && self.ceiling_reached() {
            tracing::info!(
                turns = self.transcript.debater_turns(),
                "turn ceiling reached, concluding"
            );
            self.state = RunState::Concluding;
        }

        match self.state {
            RunState::Idle | RunState::Finished => Step::Wait,
            RunState::Debating => {
                let Some(last) = self.transcript.last() else {
                    return Step::Wait;
                };
                let speaker = next_speaker(last.speaker, &mut self.rng);
                Step::Generate(self.dispatch(TurnKind::Utterance, speaker))
            }
            RunState::Concluding => {
                if self.ends_in_conclusion() {
                    self.state = RunState::Finished;
                    self.current_speaker = None;
                    return Step::Finished;
                }
                Step::Generate(self.dispatch(TurnKind::Closing, PersonaId::MODERATOR))
            }
        }
    }

    /// Applies a finished generation if its ticket is still current.
    pub fn commit(&mut self, ticket: &Ticket, text: String) -> Commit {
        let current = ticket.run == self.run
            && self.state == ticket.expected_state()
            && self.transcript.len() == ticket.expected_len;
        if !current {
            return Commit::Discarded;
        }

        let turn = self.transcript.append(ticket.speaker, text).clone();
        self.current_speaker = None;
        if ticket.kind == TurnKind::Closing {
            self.state = RunState::Finished;
        }
        Commit::Appended(turn)
    }

    fn dispatch(&mut self, kind: TurnKind, speaker: PersonaId) -> PendingTurn {
        self.current_speaker = Some(speaker);
        PendingTurn {
            ticket: Ticket {
                run: self.run,
                kind,
                speaker,
                expected_len: self.transcript.len(),
            },
            topic: self.topic.clone(),
            history: self.transcript.turns().to_vec(),
        }
    }

    fn ceiling_reached(&self) -> bool {
        self.max_turns
            .is_some_and(|max| self.transcript.debater_turns() >= max)
    }

    // The opener is also a long moderator line, so it must not count.
    fn ends_in_conclusion(&self) -> bool {
        self.transcript.len() > 1
            && self.transcript.last().is_some_and(|turn| {
                turn.speaker.is_moderator() && turn.text.chars().count() > CONCLUSION_MIN_CHARS
            })
    }
}

/// Round robin over the debaters. Right after the moderator the first speaker
/// is drawn uniformly at random.
pub fn next_speaker<R: rand::Rng + ?Sized>(previous: PersonaId, rng: &mut R) -> PersonaId {
    match previous.debater_index() {
        Some(index) => PersonaId::DEBATERS[(index + 1) % PersonaId::DEBATERS.len()],
        None => *PersonaId::DEBATERS
            .choose(rng)
            .unwrap_or(&PersonaId::DEBATERS[0]),
    }
}

#[cfg(test)]
impl Debate {
    pub(crate) fn push_turn(&mut self, speaker: PersonaId, text: &str) {
        self.transcript.append(speaker, text.to_string());
    }
}
