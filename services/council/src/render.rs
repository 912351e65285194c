//! Turns store updates into terminal output.

use council_core::debate::{Debate, RunState};
use council_core::persona::PersonaId;
use council_core::transcript::Turn;
use serde_json::json;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Text,
    Json,
}

/// Remembers what has already been printed so each turn appears exactly once.
pub struct Renderer {
    format: Format,
    run_opener: Option<Uuid>,
    printed: usize,
    state: RunState,
    speaker: Option<PersonaId>,
}

impl Renderer {
    pub fn new(format: Format) -> Self {
        Self {
            format,
            run_opener: None,
            printed: 0,
            state: RunState::Idle,
            speaker: None,
        }
    }

    /// Lines to print for the difference between the last seen debate and this one.
    pub fn update(&mut self, debate: &Debate) -> Vec<String> {
        let mut lines = Vec::new();
        let turns = debate.transcript().turns();

        // A new opener means a new run; the old transcript is gone.
        let opener = turns.first().map(|turn| turn.id);
        if opener != self.run_opener || turns.len() < self.printed {
            self.run_opener = opener;
            self.printed = 0;
        }

        let state_changed = debate.state() != self.state;
        self.state = debate.state();
        if state_changed && self.state == RunState::Debating {
            lines.push(self.state_line(debate));
        }

        for turn in &turns[self.printed..] {
            lines.push(self.turn_line(turn));
        }
        self.printed = turns.len();

        if debate.current_speaker() != self.speaker {
            self.speaker = debate.current_speaker();
            if let Some(speaker) = self.speaker {
                lines.push(self.thinking_line(speaker));
            }
        }

        if state_changed && self.state != RunState::Debating {
            lines.push(self.state_line(debate));
        }
        lines
    }

    fn turn_line(&self, turn: &Turn) -> String {
        match self.format {
            Format::Text => {
                let persona = turn.speaker.persona();
                format!("{} [{}]: {}", persona.name, persona.role, turn.text)
            }
            Format::Json => json!({ "event": "turn", "turn": turn }).to_string(),
        }
    }

    fn thinking_line(&self, speaker: PersonaId) -> String {
        match self.format {
            Format::Text => format!("   ... {} is thinking...", speaker.persona().name),
            Format::Json => json!({ "event": "thinking", "speaker": speaker }).to_string(),
        }
    }

    fn state_line(&self, debate: &Debate) -> String {
        match self.format {
            Format::Text => match debate.state() {
                RunState::Debating => format!("=== Debate started: {} ===", debate.topic()),
                RunState::Concluding => "=== Wrapping up ===".to_string(),
                RunState::Finished => "=== Debate finished ===".to_string(),
                RunState::Idle => "=== Stopped ===".to_string(),
            },
            Format::Json => json!({
                "event": "state",
                "state": debate.state(),
                "topic": debate.topic(),
            })
            .to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use council_core::debate::{Commit, Step};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn debate() -> Debate {
        Debate::with_rng(Some(10), StdRng::seed_from_u64(5))
    }

    fn speak(debate: &mut Debate, text: &str) {
        match debate.next_step() {
            Step::Generate(pending) => {
                assert!(matches!(debate.commit(&pending.ticket, text.to_string()), Commit::Appended(_)));
            }
            other => panic!("expected a turn, got {other:?}"),
        }
    }

    #[test]
    fn each_turn_printed_once() {
        let mut renderer = Renderer::new(Format::Text);
        let mut debate = debate();
        debate.start("naps");

        let lines = renderer.update(&debate);
        assert_eq!(lines[0], "=== Debate started: naps ===");
        assert!(lines[1].starts_with("Joy [Leader of happiness]: Hi everyone!"));
        assert_eq!(lines.len(), 2);

        assert!(renderer.update(&debate).is_empty());

        speak(&mut debate, "Sleep is everything.");
        let lines = renderer.update(&debate);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].ends_with(": Sleep is everything."));
    }

    #[test]
    fn thinking_line_when_speaker_chosen() {
        let mut renderer = Renderer::new(Format::Text);
        let mut debate = debate();
        debate.start("naps");
        renderer.update(&debate);

        let Step::Generate(pending) = debate.next_step() else {
            panic!("expected a turn");
        };
        let lines = renderer.update(&debate);
        let name = pending.ticket.speaker.persona().name;
        assert_eq!(lines, vec![format!("   ... {name} is thinking...")]);
    }

    #[test]
    fn restart_prints_new_opener() {
        let mut renderer = Renderer::new(Format::Text);
        let mut debate = debate();
        debate.start("first");
        renderer.update(&debate);
        debate.stop();
        assert_eq!(renderer.update(&debate), vec!["=== Stopped ===".to_string()]);

        debate.start("second");
        let lines = renderer.update(&debate);
        assert_eq!(lines.len(), 2);
        assert!(lines[1].contains("\"second\""));
    }

    #[test]
    fn json_lines_are_objects() {
        let mut renderer = Renderer::new(Format::Json);
        let mut debate = debate();
        debate.start("naps");

        let lines = renderer.update(&debate);
        let state: serde_json::Value = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(state["state"], "DEBATING");
        let turn: serde_json::Value = serde_json::from_str(&lines[1]).unwrap();
        assert_eq!(turn["event"], "turn");
        assert_eq!(turn["turn"]["speaker"], "JOY");
    }
}
