// src/gcode/mod.rs - G-code command model and text rendering
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::axis::Axis;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown arc direction '{0}' (expected CW or CCW)")]
pub struct ArcDirectionError(pub String);

/// Rotation sense of an arc move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArcDirection {
    #[default]
    Clockwise,
    CounterClockwise,
}

impl ArcDirection {
    pub fn code(self) -> &'static str {
        match self {
            ArcDirection::Clockwise => "G2",
            ArcDirection::CounterClockwise => "G3",
        }
    }
}

impl FromStr for ArcDirection {
    type Err = ArcDirectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "CW" => Ok(ArcDirection::Clockwise),
            "CCW" => Ok(ArcDirection::CounterClockwise),
            _ => Err(ArcDirectionError(s.to_string())),
        }
    }
}

impl fmt::Display for ArcDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArcDirection::Clockwise => write!(f, "CW"),
            ArcDirection::CounterClockwise => write!(f, "CCW"),
        }
    }
}

/// A single letter/number parameter such as `X12.5000`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Word {
    pub letter: char,
    pub value: f64,
}

impl Word {
    pub fn new(letter: char, value: f64) -> Self {
        Self { letter, value }
    }

    pub fn axis(axis: Axis, value: f64) -> Self {
        Self::new(axis.letter(), value)
    }

    pub fn render(&self, digits: usize) -> String {
        format!("{}{:.*}", self.letter, digits, self.value)
    }
}

/// Commands understood by the bioprinter firmware, plus comment lines.
#[derive(Debug, Clone, PartialEq)]
pub enum GCodeCommand {
    /// `G1` with the listed words.
    LinearMove(Vec<Word>),
    /// `G2`/`G3` with extrusion and centre offset words.
    Arc { direction: ArcDirection, words: Vec<Word> },
    /// `G1 F…`
    SetFeedrate(f64),
    /// `G90`
    AbsolutePositioning,
    /// `G91`
    RelativePositioning,
    /// `M92` with an optional trailing comment.
    SetStepsPerMm { words: Vec<Word>, comment: Option<String> },
    /// `M302 P1` allows extrusion below the minimum temperature.
    ColdExtrusion(bool),
    Comment(String),
    Blank,
}

impl GCodeCommand {
    pub fn comment(text: impl Into<String>) -> Self {
        GCodeCommand::Comment(text.into())
    }

    /// Render the command as one line with `digits` decimals on every number.
    pub fn render(&self, digits: usize) -> String {
        match self {
            GCodeCommand::LinearMove(words) => with_words("G1", words, digits),
            GCodeCommand::Arc { direction, words } => with_words(direction.code(), words, digits),
            GCodeCommand::SetFeedrate(rate) => format!("G1 F{:.*}", digits, rate),
            GCodeCommand::AbsolutePositioning => "G90".to_string(),
            GCodeCommand::RelativePositioning => "G91".to_string(),
            GCodeCommand::SetStepsPerMm { words, comment } => {
                let mut line = with_words("M92", words, digits);
                if let Some(comment) = comment {
                    line.push_str(" ;");
                    line.push_str(comment);
                }
                line
            }
            GCodeCommand::ColdExtrusion(allow) => format!("M302 P{}", if *allow { 1 } else { 0 }),
            GCodeCommand::Comment(text) => format!(";{}", text),
            GCodeCommand::Blank => String::new(),
        }
    }

    pub fn is_comment(&self) -> bool {
        matches!(self, GCodeCommand::Comment(_) | GCodeCommand::Blank)
    }
}

fn with_words(code: &str, words: &[Word], digits: usize) -> String {
    let mut line = code.to_string();
    for word in words {
        line.push(' ');
        line.push_str(&word.render(digits));
    }
    line
}
