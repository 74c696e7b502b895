//! Chess Bytecode Core Library
//!
//! Compresses chess moves to one byte each and reads annotated byte streams
//! (variations, comments, NAGs, meta data) back as typed events.

use shakmaty::Chess;

pub mod army;
pub mod codec;
pub mod config;
pub mod error;
pub mod parser;
pub mod ray;
pub mod square;
pub mod stats;
pub mod stream;

pub use codec::{Codec, Decoded};
pub use config::{Config, SlowIndexPolicy};
pub use error::{Error, Result};
pub use parser::{parse_pgn_file, parse_pgn_string, EncodedGame};
pub use stats::{CodecEvent, CodecStats, Instrument, NoInstrument};
pub use stream::{Codepoint, Event, MoveEvent, Stepper, StreamWriter};

/// Parses a FEN into a position with standard castling rules.
pub fn position_from_fen(fen: &str) -> Result<Chess> {
    let parsed: shakmaty::fen::Fen = fen
        .parse()
        .map_err(|e| Error::Fen(format!("{}: {}", fen, e)))?;
    parsed
        .into_position(shakmaty::CastlingMode::Standard)
        .map_err(|e| Error::Fen(format!("{}: {}", fen, e)))
}

/// Creates the standard starting position
pub fn starting_position() -> Chess {
    Chess::default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use shakmaty::Position;

    #[test]
    fn test_position_from_fen() {
        let pos = position_from_fen("4k3/8/8/8/8/8/8/4K2R w K - 0 1").unwrap();
        assert_eq!(pos.board().occupied().count(), 3);
        assert!(matches!(position_from_fen("junk"), Err(Error::Fen(_))));
        assert!(matches!(position_from_fen("8/8/8/8/8/8/8/8 w - - 0 1"), Err(Error::Fen(_))));
    }

    #[test]
    fn test_starting_position() {
        assert_eq!(starting_position().legal_moves().len(), 20);
    }
}
