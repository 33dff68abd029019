use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Dominant emotion reported for one observation of the viewer.
///
/// The classifier's vocabulary, the two failure sentinels, the `published`
/// pseudo-emotion written by the publishing job, and a catch-all for any
/// label outside the table. Everything outside the classifier's positive and
/// negative range ranks at priority 0.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum Emotion {
    Happy,
    Surprise,
    Neutral,
    Fear,
    Sad,
    Disgust,
    Angry,
    /// Classifier found no face in the frame.
    NoFace,
    /// Classifier failed on the frame.
    AnalysisError,
    /// Item was pushed to the publishing channel.
    Published,
    /// Label outside the table, kept verbatim.
    Unknown(String),
}

/// Labels that derive the positive training target.
pub const POSITIVE_EMOTIONS: [Emotion; 2] = [Emotion::Happy, Emotion::Surprise];

impl Emotion {
    /// Merge priority. Only a strictly higher priority replaces a stored reaction.
    pub fn priority(&self) -> u8 {
        match self {
            Emotion::Happy => 5,
            Emotion::Surprise => 4,
            Emotion::Neutral => 3,
            Emotion::Fear | Emotion::Sad => 2,
            Emotion::Disgust | Emotion::Angry => 1,
            Emotion::NoFace | Emotion::AnalysisError => 0,
            Emotion::Published => 0,
            Emotion::Unknown(_) => 0,
        }
    }

    pub fn is_sentinel(&self) -> bool {
        matches!(self, Emotion::NoFace | Emotion::AnalysisError)
    }

    /// Binary training target: 1 for `happy` and `surprise`, 0 otherwise.
    pub fn is_positive(&self) -> bool {
        POSITIVE_EMOTIONS.contains(self)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Emotion::Happy => "happy",
            Emotion::Surprise => "surprise",
            Emotion::Neutral => "neutral",
            Emotion::Fear => "fear",
            Emotion::Sad => "sad",
            Emotion::Disgust => "disgust",
            Emotion::Angry => "angry",
            Emotion::NoFace => "no_face",
            Emotion::AnalysisError => "analysis_error",
            Emotion::Published => "published",
            Emotion::Unknown(label) => label,
        }
    }

    /// Parse a stored or classifier-provided label. Never fails: anything
    /// outside the table becomes `Unknown`.
    pub fn parse(label: &str) -> Self {
        let normalized = label.trim().to_lowercase();
        match normalized.as_str() {
            "happy" => Emotion::Happy,
            "surprise" => Emotion::Surprise,
            "neutral" => Emotion::Neutral,
            "fear" => Emotion::Fear,
            "sad" => Emotion::Sad,
            "disgust" => Emotion::Disgust,
            "angry" => Emotion::Angry,
            "no_face" | "no-face" | "noface" => Emotion::NoFace,
            "analysis_error" | "analysis-error" => Emotion::AnalysisError,
            "published" => Emotion::Published,
            _ => Emotion::Unknown(label.trim().to_string()),
        }
    }
}

impl FromStr for Emotion {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Emotion::parse(s))
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for Emotion {
    fn from(s: String) -> Self {
        Emotion::parse(&s)
    }
}

impl From<Emotion> for String {
    fn from(e: Emotion) -> Self {
        e.as_str().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_order() {
        assert!(Emotion::Happy.priority() > Emotion::Surprise.priority());
        assert!(Emotion::Surprise.priority() > Emotion::Neutral.priority());
        assert!(Emotion::Neutral.priority() > Emotion::Fear.priority());
        assert_eq!(Emotion::Fear.priority(), Emotion::Sad.priority());
        assert!(Emotion::Sad.priority() > Emotion::Angry.priority());
        assert_eq!(Emotion::Disgust.priority(), Emotion::Angry.priority());
        assert!(Emotion::Angry.priority() > Emotion::NoFace.priority());
    }

    #[test]
    fn test_zero_priority_labels() {
        assert_eq!(Emotion::NoFace.priority(), 0);
        assert_eq!(Emotion::AnalysisError.priority(), 0);
        assert_eq!(Emotion::Published.priority(), 0);
        assert_eq!(Emotion::parse("contempt").priority(), 0);
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!(Emotion::parse("  Happy "), Emotion::Happy);
        assert_eq!(Emotion::parse("ANGRY"), Emotion::Angry);
        assert_eq!(Emotion::parse("no-face"), Emotion::NoFace);
    }

    #[test]
    fn test_unknown_keeps_label() {
        let e = Emotion::parse("contempt");
        assert_eq!(e, Emotion::Unknown("contempt".to_string()));
        assert_eq!(e.to_string(), "contempt");
    }

    #[test]
    fn test_label_roundtrip() {
        for e in [
            Emotion::Happy,
            Emotion::Surprise,
            Emotion::Neutral,
            Emotion::Fear,
            Emotion::Sad,
            Emotion::Disgust,
            Emotion::Angry,
            Emotion::NoFace,
            Emotion::AnalysisError,
            Emotion::Published,
        ] {
            assert_eq!(Emotion::parse(e.as_str()), e);
        }
    }

    #[test]
    fn test_positive_targets() {
        assert!(Emotion::Happy.is_positive());
        assert!(Emotion::Surprise.is_positive());
        assert!(!Emotion::Neutral.is_positive());
        assert!(!Emotion::Published.is_positive());
        assert!(!Emotion::NoFace.is_positive());
    }

    #[test]
    fn test_sentinels() {
        assert!(Emotion::NoFace.is_sentinel());
        assert!(Emotion::AnalysisError.is_sentinel());
        assert!(!Emotion::Published.is_sentinel());
    }

    #[test]
    fn test_serde_as_plain_label() {
        let json = serde_json::to_string(&Emotion::Surprise).unwrap();
        assert_eq!(json, "\"surprise\"");
        let back: Emotion = serde_json::from_str("\"sad\"").unwrap();
        assert_eq!(back, Emotion::Sad);
    }
}
