//! Answer levels and the deterministic `auto` resolution.

use std::{fmt, str::FromStr, sync::LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Requested level. `Auto` is resolved before a prompt is built.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Level {
    General,
    Summary,
    Technical,
    Auto,
}

/// A concrete level: the only thing prompt templates are keyed on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolvedLevel {
    General,
    Summary,
    Technical,
}

impl ResolvedLevel {
    pub const ALL: [ResolvedLevel; 3] = [Self::General, Self::Summary, Self::Technical];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Summary => "summary",
            Self::Technical => "technical",
        }
    }
}

impl fmt::Display for ResolvedLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<ResolvedLevel> for Level {
    fn from(l: ResolvedLevel) -> Self {
        match l {
            ResolvedLevel::General => Level::General,
            ResolvedLevel::Summary => Level::Summary,
            ResolvedLevel::Technical => Level::Technical,
        }
    }
}

/// Unknown level name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown level {0:?} (expected general, summary, technical or auto)")]
pub struct ParseLevelError(pub String);

impl FromStr for Level {
    type Err = ParseLevelError;

    /// Case-insensitive; numeric aliases follow the level servers (0/1/2).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "general" | "level0" | "0" => Ok(Level::General),
            "summary" | "level1" | "1" => Ok(Level::Summary),
            "technical" | "level2" | "2" => Ok(Level::Technical),
            "auto" | "" => Ok(Level::Auto),
            other => Err(ParseLevelError(other.to_string())),
        }
    }
}

impl TryFrom<String> for Level {
    type Error = ParseLevelError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

static SUMMARY_CUES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(summar(y|ise|ize|ies|ised|ized)|overview|brief(ly)?|outline|key points|highlights|gist|tl;?dr|in short|main features)\b",
    )
    .expect("summary cue pattern")
});

static TECHNICAL_CUES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(\b(section|clause|eligib\w*|criteria|amount|percent(age)?|rate|how (much|many)|procedure|deadline|documents? required|subsidy|rupees|lakh|crore|\d+)\b|%)",
    )
    .expect("technical cue pattern")
});

/// Questions longer than this many words are treated as technical.
pub const LONG_QUESTION_WORDS: usize = 25;

/// Keyword heuristic for `auto`:
/// summary cues → Summary; technical cues or long questions → Technical;
/// otherwise General.
pub fn classify(question: &str) -> ResolvedLevel {
    if SUMMARY_CUES.is_match(question) {
        ResolvedLevel::Summary
    } else if TECHNICAL_CUES.is_match(question)
        || question.split_whitespace().count() > LONG_QUESTION_WORDS
    {
        ResolvedLevel::Technical
    } else {
        ResolvedLevel::General
    }
}

/// Resolves the requested level. A concrete request wins; otherwise the
/// instance default (if any), otherwise [`classify`].
pub fn resolve(
    requested: Option<Level>,
    instance_default: Option<ResolvedLevel>,
    question: &str,
) -> ResolvedLevel {
    match requested {
        Some(Level::General) => ResolvedLevel::General,
        Some(Level::Summary) => ResolvedLevel::Summary,
        Some(Level::Technical) => ResolvedLevel::Technical,
        Some(Level::Auto) | None => instance_default.unwrap_or_else(|| classify(question)),
    }
}
