//! Byte streams of moves interleaved with structural codes.
//!
//! Bytes 1 to 7 delimit variations, comments and meta data, or escape the
//! following byte. Everything from 8 upwards is a move code. Each kind of
//! span nests and balances on its own, so a span can be skipped by counting
//! only its own start and end codes.

pub mod ops;
pub mod pgn_out;
pub mod stepper;
pub mod types;
pub mod writer;

pub use ops::{
    comment_at, insert_comment, insert_nag, locate, mainline, promote_variation, skip_over, tokens,
    variation_idx, Location, Token, TokenKind,
};
pub use pgn_out::{dump, to_pgn};
pub use stepper::Stepper;
pub use types::{Codepoint, Event, EventSummary, MoveEvent};
pub use writer::StreamWriter;

pub const BC_VARIATION_START: u8 = 1;
pub const BC_VARIATION_END: u8 = 2;
pub const BC_COMMENT_START: u8 = 3;
pub const BC_COMMENT_END: u8 = 4;
pub const BC_META_START: u8 = 5;
pub const BC_META_END: u8 = 6;
pub const BC_ESCAPE: u8 = 7;

/// NAGs are escaped as this value plus the NAG number.
pub const NAG_BASE: u8 = 8;

pub fn is_structural(byte: u8) -> bool {
    (BC_VARIATION_START..=BC_ESCAPE).contains(&byte)
}

/// Comment text as stored: bytes below 8 become '.', line breaks become spaces.
pub fn clean_comment(text: &str) -> Vec<u8> {
    text.bytes()
        .map(|b| match b {
            b'\n' | b'\r' => b' ',
            b if b < NAG_BASE => b'.',
            b => b,
        })
        .collect()
}
