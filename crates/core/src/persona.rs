use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The closed set of council members.
///
/// `Joy` chairs the debate: she opens and closes every run and never takes a
/// regular turn. The others rotate in the order of [`PersonaId::DEBATERS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PersonaId {
    Joy,
    Sadness,
    Anger,
    Disgust,
    Fear,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Persona {
    pub id: PersonaId,
    pub name: &'static str,
    pub role: &'static str,
    pub description: &'static str,
    /// Speech mannerisms the model is told to imitate.
    pub style: &'static str,
    // Presentation only.
    pub color: &'static str,
    pub icon: &'static str,
}

static JOY: Persona = Persona {
    id: PersonaId::Joy,
    name: "Joy",
    role: "Leader of happiness",
    description: "Sees the bright side and pulls everyone along. Always energetic, always steering toward a hopeful conclusion.",
    style: "Bright and cheerful, lots of exclamation marks. \"Wow! What a great idea!\"",
    color: "yellow",
    icon: "Sun",
};

static SADNESS: Persona = Persona {
    id: PersonaId::Sadness,
    name: "Sadness",
    role: "The empathetic gloom",
    description: "Points out the dark and sorrowful side of things. Listless, but looks at every problem with deep empathy.",
    style: "Slow and droopy, trailing off at the end... \"That's just so sad...\"",
    color: "blue",
    icon: "CloudRain",
};

static ANGER: Persona = Persona {
    id: PersonaId::Anger,
    name: "Anger",
    role: "Fiery justice",
    description: "Blows up at anything unfair or frustrating. Blunt and explosive about his opinions.",
    style: "Shouting, forceful!! \"That's ridiculous!!\"",
    color: "red",
    icon: "Flame",
};

static DISGUST: Persona = Persona {
    id: PersonaId::Disgust,
    name: "Disgust",
    role: "The picky critic",
    description: "Cannot stand anything tacky or beneath her standards. Cynical and sarcastic, she goes straight for the weak spot.",
    style: "Haughty and sarcastic. \"Ugh, is that really the best you've got?\"",
    color: "green",
    icon: "OctagonX",
};

static FEAR: Persona = Persona {
    id: PersonaId::Fear,
    name: "Fear",
    role: "Safety keeper",
    description: "Imagines the risks and the worst case in every situation. Jittery, always arguing for the careful approach.",
    style: "Trembling and worried... \"That's dangerous! No, no, no!\"",
    color: "purple",
    icon: "Eye",
};

impl PersonaId {
    pub const ALL: [PersonaId; 5] = [
        PersonaId::Joy,
        PersonaId::Sadness,
        PersonaId::Anger,
        PersonaId::Disgust,
        PersonaId::Fear,
    ];

    pub const MODERATOR: PersonaId = PersonaId::Joy;

    /// Round-robin order. Everyone except the moderator.
    pub const DEBATERS: [PersonaId; 4] = [
        PersonaId::Sadness,
        PersonaId::Anger,
        PersonaId::Disgust,
        PersonaId::Fear,
    ];

    pub fn persona(self) -> &'static Persona {
        match self {
            PersonaId::Joy => &JOY,
            PersonaId::Sadness => &SADNESS,
            PersonaId::Anger => &ANGER,
            PersonaId::Disgust => &DISGUST,
            PersonaId::Fear => &FEAR,
        }
    }

    pub fn is_moderator(self) -> bool {
        self == Self::MODERATOR
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PersonaId::Joy => "JOY",
            PersonaId::Sadness => "SADNESS",
            PersonaId::Anger => "ANGER",
            PersonaId::Disgust => "DISGUST",
            PersonaId::Fear => "FEAR",
        }
    }

    /// Position in [`PersonaId::DEBATERS`], `None` for the moderator.
    pub fn debater_index(self) -> Option<usize> {
        Self::DEBATERS.iter().position(|id| *id == self)
    }
}

impl fmt::Display for PersonaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.persona().name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown persona: {0}")]
pub struct UnknownPersona(pub String);

impl FromStr for PersonaId {
    type Err = UnknownPersona;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|id| id.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownPersona(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exactly_one_moderator() {
        let moderators: Vec<_> = PersonaId::ALL.iter().filter(|id| id.is_moderator()).collect();
        assert_eq!(moderators, vec![&PersonaId::Joy]);
    }

    #[test]
    fn debaters_are_registry_minus_moderator() {
        let expected: Vec<_> = PersonaId::ALL
            .into_iter()
            .filter(|id| !id.is_moderator())
            .collect();
        assert_eq!(PersonaId::DEBATERS.to_vec(), expected);
        assert_eq!(PersonaId::Joy.debater_index(), None);
        assert_eq!(PersonaId::Fear.debater_index(), Some(3));
    }

    #[test]
    fn lookup_matches_id() {
        for id in PersonaId::ALL {
            assert_eq!(id.persona().id, id);
        }
    }

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("anger".parse::<PersonaId>(), Ok(PersonaId::Anger));
        assert_eq!(" JOY ".parse::<PersonaId>(), Ok(PersonaId::Joy));
        assert!("bing-bong".parse::<PersonaId>().is_err());
    }

    #[test]
    fn serializes_as_screaming_snake_case() {
        assert_eq!(serde_json::to_string(&PersonaId::Disgust).unwrap(), "\"DISGUST\"");
    }
}
