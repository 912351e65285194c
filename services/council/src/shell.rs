//! Line commands typed at the terminal.

use council_core::credentials::{CredentialResolver, KeyFile};
use council_core::debate::RunState;
use council_core::orchestrator::DebateHandle;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

pub const HELP: &str = "\
Commands:
  start <topic>    begin a debate on <topic>
  stop             halt the debate (the transcript is kept)
  conclude         ask Joy to wrap things up
  reset            clear the transcript (when stopped or finished)
  speed <ms>       pause between turns, 500-4000 ms
  status           show the current state
  key set <KEY>    save a Gemini API key
  key clear        remove the saved API key
  key status       show where the API key comes from
  help             show this message
  quit             exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start(String),
    Stop,
    Conclude,
    Reset,
    Speed(u64),
    Status,
    KeySet(String),
    KeyClear,
    KeyStatus,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("unknown command `{0}` (type `help`)")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
}

impl FromStr for Command {
    type Err = ParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        match (word.to_ascii_lowercase().as_str(), rest) {
            ("start", "") => Err(ParseError::Usage("start <topic>")),
            ("start", topic) => Ok(Command::Start(topic.to_string())),
            ("stop", _) => Ok(Command::Stop),
            ("conclude", _) => Ok(Command::Conclude),
            ("reset", _) => Ok(Command::Reset),
            ("speed", ms) => ms
                .parse()
                .map(Command::Speed)
                .map_err(|_| ParseError::Usage("speed <ms>")),
            ("status", _) => Ok(Command::Status),
            ("key", args) => parse_key(args),
            ("help" | "?", _) => Ok(Command::Help),
            ("quit" | "exit", _) => Ok(Command::Quit),
            (other, _) => Err(ParseError::Unknown(other.to_string())),
        }
    }
}

fn parse_key(args: &str) -> Result<Command, ParseError> {
    let mut words = args.split_whitespace();
    match (words.next(), words.next()) {
        (Some("set"), Some(key)) => Ok(Command::KeySet(key.to_string())),
        (Some("clear"), None) => Ok(Command::KeyClear),
        (Some("status") | None, None) => Ok(Command::KeyStatus),
        _ => Err(ParseError::Usage("key set <KEY> | key clear | key status")),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Reply(String),
    Quit,
}

/// Executes commands against a running debate.
pub struct Shell {
    debate: DebateHandle,
    key_file: Option<KeyFile>,
    credentials: Arc<CredentialResolver>,
}

impl Shell {
    pub fn new(debate: DebateHandle, key_file: Option<KeyFile>, credentials: Arc<CredentialResolver>) -> Self {
        Self {
            debate,
            key_file,
            credentials,
        }
    }

    pub async fn execute(&self, command: Command) -> Outcome {
        let reply = match command {
            Command::Start(topic) => {
                if self.debate.start(&topic) {
                    return Outcome::Reply(String::new());
                }
                "A debate is already running. Use `stop` or `conclude` first.".to_string()
            }
            Command::Stop => reply_if(self.debate.stop(), "Debate stopped.", "Nothing to stop."),
            Command::Conclude => reply_if(
                self.debate.conclude(),
                "Joy will wrap things up next.",
                "Only a running debate can be concluded.",
            ),
            Command::Reset => reply_if(
                self.debate.reset(),
                "Transcript cleared.",
                "Stop the debate before resetting it.",
            ),
            Command::Speed(ms) => {
                let applied = self.debate.set_turn_delay(Duration::from_millis(ms));
                format!("Turn delay set to {} ms.", applied.as_millis())
            }
            Command::Status => self.status().await,
            Command::KeySet(key) => match &self.key_file {
                Some(file) => match file.save(&key).await {
                    Ok(()) => format!("API key saved to {}.", file.path().display()),
                    Err(e) => format!("Could not save the key: {e}"),
                },
                None => "No key file location is configured (set COUNCIL_KEY_FILE).".to_string(),
            },
            Command::KeyClear => match &self.key_file {
                Some(file) => match file.clear().await {
                    Ok(true) => "Saved API key removed.".to_string(),
                    Ok(false) => "No saved API key.".to_string(),
                    Err(e) => format!("Could not remove the key: {e}"),
                },
                None => "No saved API key.".to_string(),
            },
            Command::KeyStatus => self.key_status().await,
            Command::Help => HELP.to_string(),
            Command::Quit => return Outcome::Quit,
        };
        Outcome::Reply(reply)
    }

    async fn status(&self) -> String {
        let debate = self.debate.snapshot();
        let settings = self.debate.settings();
        let mut lines = vec![format!("State: {}", state_name(debate.state()))];
        if !debate.topic().is_empty() {
            lines.push(format!("Topic: {}", debate.topic()));
        }
        lines.push(format!(
            "Turns: {} ({} by debaters)",
            debate.transcript().len(),
            debate.transcript().debater_turns()
        ));
        if let Some(speaker) = debate.current_speaker() {
            lines.push(format!("Speaking: {speaker}"));
        }
        lines.push(format!("Turn delay: {} ms", settings.turn_delay().as_millis()));
        lines.push(match settings.max_turns() {
            Some(max) => format!("Turn limit: {max}"),
            None => "Turn limit: none".to_string(),
        });
        lines.push(self.key_status().await);
        lines.join("\n")
    }

    async fn key_status(&self) -> String {
        match self.credentials.status().await {
            Some(source) => format!("API key: from {source}"),
            None => "API key: not configured".to_string(),
        }
    }
}

fn reply_if(accepted: bool, yes: &str, no: &str) -> String {
    let reply = if accepted { yes } else { no };
    reply.to_string()
}

pub fn state_name(state: RunState) -> &'static str {
    match state {
        RunState::Idle => "idle",
        RunState::Debating => "debating",
        RunState::Concluding => "concluding",
        RunState::Finished => "finished",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use council_core::credentials::EnvKey;
    use council_core::gateway::Gateway;
    use council_core::generator::{Generation, GenerationError, GenerationRequest, TextGenerator};
    use council_core::orchestrator::{DebateSettings, Orchestrator};

    struct Silent;

    #[async_trait::async_trait]
    impl TextGenerator for Silent {
        async fn generate(&self, _request: GenerationRequest) -> Result<Generation, GenerationError> {
            Err(GenerationError::EmptyResponse)
        }
    }

    fn shell(key_file: Option<KeyFile>) -> (Shell, DebateHandle) {
        let orchestrator = Orchestrator::new(Gateway::new(Silent), DebateSettings::default());
        let handle = orchestrator.handle();
        let resolver = match &key_file {
            Some(file) => CredentialResolver::new().with_source(file.clone()),
            None => CredentialResolver::new().with_source(EnvKey::with_lookup(|_| None)),
        };
        (Shell::new(handle.clone(), key_file, Arc::new(resolver)), handle)
    }

    fn reply(outcome: Outcome) -> String {
        match outcome {
            Outcome::Reply(text) => text,
            Outcome::Quit => panic!("unexpected quit"),
        }
    }

    #[test]
    fn parses_commands() {
        assert_eq!(
            "start  universal basic income ".parse(),
            Ok(Command::Start("universal basic income".to_string()))
        );
        assert_eq!("STOP".parse(), Ok(Command::Stop));
        assert_eq!("speed 800".parse(), Ok(Command::Speed(800)));
        assert_eq!("key set AIzaXYZ".parse(), Ok(Command::KeySet("AIzaXYZ".to_string())));
        assert_eq!("key".parse(), Ok(Command::KeyStatus));
        assert_eq!("key clear".parse(), Ok(Command::KeyClear));
        assert_eq!("exit".parse(), Ok(Command::Quit));
    }

    #[test]
    fn rejects_bad_input() {
        assert_eq!("start".parse::<Command>(), Err(ParseError::Usage("start <topic>")));
        assert_eq!("speed fast".parse::<Command>(), Err(ParseError::Usage("speed <ms>")));
        assert!(matches!("key set".parse::<Command>(), Err(ParseError::Usage(_))));
        assert_eq!(
            "dance".parse::<Command>(),
            Err(ParseError::Unknown("dance".to_string()))
        );
    }

    #[tokio::test]
    async fn commands_drive_the_debate() {
        let (shell, handle) = shell(None);

        assert_eq!(reply(shell.execute(Command::Stop).await), "Nothing to stop.");
        reply(shell.execute(Command::Start("pineapple pizza".into())).await);
        assert_eq!(handle.state(), RunState::Debating);
        assert!(reply(shell.execute(Command::Start("other".into())).await).contains("already running"));

        assert!(reply(shell.execute(Command::Reset).await).starts_with("Stop the debate"));
        reply(shell.execute(Command::Conclude).await);
        assert_eq!(handle.state(), RunState::Concluding);
        reply(shell.execute(Command::Stop).await);
        assert_eq!(handle.state(), RunState::Idle);
        assert_eq!(reply(shell.execute(Command::Reset).await), "Transcript cleared.");

        assert_eq!(shell.execute(Command::Quit).await, Outcome::Quit);
    }

    #[tokio::test]
    async fn speed_is_clamped() {
        let (shell, handle) = shell(None);
        assert_eq!(
            reply(shell.execute(Command::Speed(10)).await),
            "Turn delay set to 500 ms."
        );
        assert_eq!(handle.settings().turn_delay(), Duration::from_millis(500));
    }

    #[tokio::test]
    async fn key_commands_use_the_key_file() {
        let dir = tempfile::tempdir().unwrap();
        let (shell, _) = shell(Some(KeyFile::new(dir.path().join("key"))));

        assert_eq!(reply(shell.execute(Command::KeyStatus).await), "API key: not configured");
        assert!(reply(shell.execute(Command::KeySet("nope".into())).await).starts_with("Could not save"));
        assert!(reply(shell.execute(Command::KeySet("AIzaTest".into())).await).starts_with("API key saved"));
        assert_eq!(reply(shell.execute(Command::KeyStatus).await), "API key: from key file");
        assert!(reply(shell.execute(Command::Status).await).contains("API key: from key file"));
        assert_eq!(reply(shell.execute(Command::KeyClear).await), "Saved API key removed.");
        assert_eq!(reply(shell.execute(Command::KeyClear).await), "No saved API key.");
    }
}
