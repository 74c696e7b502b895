//! Error types for chess-bytecode-core

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("illegal move {0}")]
    IllegalMove(String),

    #[error("invalid move code {code:#04x}")]
    InvalidCode { code: u8 },

    #[error("move code {code:#04x} with no legal moves available")]
    NoLegalMoves { code: u8 },

    #[error("slow move code {code:#04x} out of range for {legal} legal moves")]
    SlowIndexOutOfRange { code: u8, legal: usize },

    #[error("reserved byte {code:#04x} at offset {offset}")]
    ReservedCode { offset: usize, code: u8 },

    #[error("unexpected structural byte {code:#04x} at offset {offset}")]
    UnexpectedCode { offset: usize, code: u8 },

    #[error("variations nested deeper than {max_depth} at offset {offset}")]
    NestingTooDeep { offset: usize, max_depth: usize },

    #[error("variation end without a matching start at offset {offset}")]
    UnbalancedVariation { offset: usize },

    #[error("{open} variation(s) left open at end of stream")]
    UnclosedVariation { open: usize },

    #[error("stream truncated at offset {offset}")]
    Truncated { offset: usize },

    #[error("meta data contains reserved byte {0:#04x}")]
    ReservedByte(u8),

    #[error("NAG {0} cannot be escaped")]
    InvalidNag(u16),

    #[error("no editable span at offset {0}")]
    InvalidSpan(usize),

    #[error("FEN error: {0}")]
    Fen(String),

    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("PGN parsing error: {0}")]
    Pgn(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
