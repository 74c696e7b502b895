//! Events produced while stepping through a byte stream

use serde::Serialize;
use shakmaty::{Chess, Move};

use super::NAG_BASE;

/// A decoded move together with the positions around it.
#[derive(Debug, Clone)]
pub struct MoveEvent {
    pub mv: Move,
    /// SAN with '+' or '#' suffix.
    pub san: String,
    pub before: Chess,
    pub after: Chess,
    /// Full move number of the move.
    pub move_number: u32,
    pub white: bool,
    /// Whether a PGN writer has to print the move number before this move.
    pub move_nbr_needed: bool,
}

impl MoveEvent {
    /// Move number prefix as printed in PGN movetext, e.g. `12.` or `12...`.
    pub fn number_prefix(&self) -> String {
        if self.white {
            format!("{}.", self.move_number)
        } else {
            format!("{}...", self.move_number)
        }
    }
}

#[derive(Debug, Clone)]
pub enum Codepoint {
    Move(Box<MoveEvent>),
    VariationStart,
    VariationEnd,
    CommentStart,
    /// Text between the comment codes, reported before the end code.
    CommentText { text: String },
    /// Carries the full comment text again.
    CommentEnd { text: String },
    MetaStart,
    MetaData { bytes: Vec<u8> },
    MetaEnd,
    Escape,
    EscapeCode { code: u8 },
}

impl Codepoint {
    pub fn as_str(&self) -> &'static str {
        match self {
            Codepoint::Move(_) => "move",
            Codepoint::VariationStart => "variation_start",
            Codepoint::VariationEnd => "variation_end",
            Codepoint::CommentStart => "comment_start",
            Codepoint::CommentText { .. } => "comment_text",
            Codepoint::CommentEnd { .. } => "comment_end",
            Codepoint::MetaStart => "meta_start",
            Codepoint::MetaData { .. } => "meta_data",
            Codepoint::MetaEnd => "meta_end",
            Codepoint::Escape => "escape",
            Codepoint::EscapeCode { .. } => "escape_code",
        }
    }

    /// NAG number of an escape code.
    pub fn nag(&self) -> Option<u8> {
        match self {
            Codepoint::EscapeCode { code } => code.checked_sub(NAG_BASE),
            _ => None,
        }
    }

    pub fn as_move(&self) -> Option<&MoveEvent> {
        match self {
            Codepoint::Move(event) => Some(&**event),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Event {
    /// Offset of the byte that produced the event.
    pub offset: usize,
    /// Variation depth, 0 on the main line.
    pub depth: usize,
    pub codepoint: Codepoint,
}

/// Flat description of an event, used by the dump output.
#[derive(Debug, Clone, Serialize)]
pub struct EventSummary {
    pub offset: usize,
    pub depth: usize,
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl From<&Event> for EventSummary {
    fn from(event: &Event) -> Self {
        let detail = match &event.codepoint {
            Codepoint::Move(m) => Some(format!("{}{}", m.number_prefix(), m.san)),
            Codepoint::CommentText { text } | Codepoint::CommentEnd { text } => Some(text.clone()),
            Codepoint::MetaData { bytes } => Some(String::from_utf8_lossy(bytes).into_owned()),
            Codepoint::EscapeCode { code } => Some(format!("{:#04x}", code)),
            _ => None,
        };
        EventSummary {
            offset: event.offset,
            depth: event.depth,
            kind: event.codepoint.as_str(),
            detail,
        }
    }
}
