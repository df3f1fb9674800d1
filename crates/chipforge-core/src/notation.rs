//! Tracker cell notation.
//!
//! A cell is one of:
//! - `...` or blank: sustain the current note
//! - `---`: silence for this tick
//! - `===` or `OFF`: note off
//! - `C-4`, `C#4`, `Db3`: note on, optionally followed by effect tokens such as `V0C`
//!
//! Effect tokens are a letter and one or two hex digits: `V` velocity, `U` slide up,
//! `D` slide down, `~` vibrato.

use std::{ops::RangeInclusive, str::FromStr};

use thiserror::Error;

use crate::model::{EffectKind, Note, NoteEffect};

/// Octaves a cell may name; C-1 is MIDI 0.
pub const OCTAVE_RANGE: RangeInclusive<i32> = -1..=9;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NotationError {
    #[error("`{0}` is not a note name")]
    InvalidNoteName(String),
    #[error("`{0}` is missing an octave")]
    MissingOctave(String),
    #[error("`{0}` has an invalid octave")]
    InvalidOctave(String),
    #[error("unknown effect `{0}`")]
    UnknownEffect(String),
    #[error("effect `{0}` needs a one or two digit hex magnitude")]
    InvalidMagnitude(String),
}

impl FromStr for Note {
    type Err = NotationError;

    fn from_str(cell: &str) -> Result<Self, Self::Err> {
        parse_cell(cell)
    }
}

pub fn parse_cell(cell: &str) -> Result<Note, NotationError> {
    let mut tokens = cell.split_whitespace();
    let Some(head) = tokens.next() else {
        return Ok(Note::Sustain);
    };

    let note = match head {
        "..." => Note::Sustain,
        "---" => Note::Silence,
        "===" => Note::Off,
        _ if head.eq_ignore_ascii_case("off") => Note::Off,
        _ => {
            let (name, octave) = parse_pitch(head)?;
            let effects = tokens.map(parse_effect).collect::<Result<Vec<_>, _>>()?;
            return Ok(Note::On {
                name,
                octave,
                effects,
            });
        }
    };

    match tokens.next() {
        Some(extra) => Err(NotationError::UnknownEffect(extra.to_string())),
        None => Ok(note),
    }
}

fn parse_pitch(token: &str) -> Result<(String, i32), NotationError> {
    let mut chars = token.chars().peekable();
    let letter = chars
        .next()
        .map(|value| value.to_ascii_uppercase())
        .filter(|value| ('A'..='G').contains(value))
        .ok_or_else(|| NotationError::InvalidNoteName(token.to_string()))?;

    let mut name = letter.to_string();
    if let Some(accidental) = chars.next_if(|value| *value == '#' || *value == 'b') {
        name.push(accidental);
    }

    let rest: String = chars.collect();
    let octave_text = match rest.strip_prefix('-') {
        Some(after) if name.len() == 1 && !after.is_empty() => after,
        _ => rest.as_str(),
    };
    if octave_text.is_empty() {
        return Err(NotationError::MissingOctave(token.to_string()));
    }

    let octave = octave_text
        .parse::<i32>()
        .ok()
        .filter(|octave| OCTAVE_RANGE.contains(octave))
        .ok_or_else(|| NotationError::InvalidOctave(token.to_string()))?;
    Ok((name, octave))
}

fn parse_effect(token: &str) -> Result<NoteEffect, NotationError> {
    let mut chars = token.chars();
    let kind = match chars.next().map(|value| value.to_ascii_uppercase()) {
        Some('V') => EffectKind::Velocity,
        Some('U') => EffectKind::SlideUp,
        Some('D') => EffectKind::SlideDown,
        Some('~') => EffectKind::Vibrato,
        _ => return Err(NotationError::UnknownEffect(token.to_string())),
    };

    let digits = chars.as_str();
    if digits.is_empty() || digits.len() > 2 {
        return Err(NotationError::InvalidMagnitude(token.to_string()));
    }
    let magnitude = u8::from_str_radix(digits, 16)
        .map_err(|_| NotationError::InvalidMagnitude(token.to_string()))?;

    Ok(NoteEffect { kind, magnitude })
}
