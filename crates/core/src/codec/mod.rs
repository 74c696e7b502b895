//! One-byte move codec.
//!
//! A move byte is either a fast code, read against the moving side's
//! [`Army`], or a slow code indexing the sorted legal move list. Fast codes
//! put the piece selector in the high nibble:
//!
//! | high nibble | piece | low nibble |
//! |---|---|---|
//! | `0x0` | king | direction 8..15 (N, NE, E, SE, S, SW, W, NW) |
//! | `0x1` | knight | bit 3 selects the slot, bits 0-2 the jump |
//! | `0x2` / `0x3` | rook slot 0 / 1 | bit 3: same file, bits 0-2 the row; else the file |
//! | `0x4` / `0x5` | dark / light bishop | bit 3: falling diagonal, bits 0-2 the file |
//! | `0x6` / `0x7` | queen, orthogonal / diagonal | as rook / bishop |
//! | `0x8`..`0xF` | pawn slot 0..7 | 0 double, 1 single, 2 left, 3 right; promotions `class << 2 \| piece` |
//! | `0xE` / `0xF` | second queen when there are two | as rook / bishop |
//!
//! Castling reuses the king directions that cannot occur from the home
//! square: SE / SW for white from e1, NE / NW for black from e8.

mod compress;
mod decompress;
pub mod slow;

use shakmaty::{Board, ByColor, Chess, Color, Move, Position};
use tracing::debug;

use crate::army::{self, Army};
use crate::config::SlowIndexPolicy;
use crate::error::{Error, Result};
use crate::stats::{CodecEvent, Instrument, NoInstrument};

/// Bytes below this value are structural.
pub const FIRST_MOVE_CODE: u8 = 8;

pub const CODE_KING: u8 = 0x00;
pub const CODE_KNIGHT: u8 = 0x10;
pub const CODE_ROOK_LO: u8 = 0x20;
pub const CODE_ROOK_HI: u8 = 0x30;
pub const CODE_BISHOP_DARK: u8 = 0x40;
pub const CODE_BISHOP_LIGHT: u8 = 0x50;
pub const CODE_QUEEN_ROOK: u8 = 0x60;
pub const CODE_QUEEN_BISHOP: u8 = 0x70;
pub const CODE_PAWN: u8 = 0x80;
pub const CODE_QUEEN2_ROOK: u8 = 0xE0;
pub const CODE_QUEEN2_BISHOP: u8 = 0xF0;

/// Added to a queen's base code for diagonal moves.
pub const BISHOP_LIKE: u8 = 0x10;

pub const K_N: u8 = 8;
pub const K_NE: u8 = 9;
pub const K_E: u8 = 10;
pub const K_SE: u8 = 11;
pub const K_S: u8 = 12;
pub const K_SW: u8 = 13;
pub const K_W: u8 = 14;
pub const K_NW: u8 = 15;

/// Index deltas for K_N..K_NW.
pub const KING_DELTAS: [i16; 8] = [-8, -7, 1, 9, 8, 7, -1, -9];

pub const N_NNE: u8 = 0;
pub const N_NEE: u8 = 1;
pub const N_SEE: u8 = 2;
pub const N_SSE: u8 = 3;
pub const N_SSW: u8 = 4;
pub const N_SWW: u8 = 5;
pub const N_NWW: u8 = 6;
pub const N_NNW: u8 = 7;
pub const N_HI: u8 = 8;

pub const KNIGHT_DELTAS: [i16; 8] = [-15, -6, 10, 17, 15, 6, -10, -17];

pub const R_FILE: u8 = 0;
pub const R_RANK: u8 = 8;
pub const B_RISE: u8 = 0;
pub const B_FALL: u8 = 8;

pub const P_DOUBLE: u8 = 0;
pub const P_SINGLE: u8 = 1;
pub const P_LEFT: u8 = 2;
pub const P_RIGHT: u8 = 3;

pub const PROMOTE_QUEEN: u8 = 0;
pub const PROMOTE_ROOK: u8 = 1;
pub const PROMOTE_BISHOP: u8 = 2;
pub const PROMOTE_KNIGHT: u8 = 3;

/// A decoded move byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    pub mv: Move,
    /// SAN from the fast decoder, '+' suffixed on check. None for slow
    /// codes and for sides with two queens.
    pub san: Option<String>,
    pub fast: bool,
}

/// Compresses and decompresses moves one byte at a time, keeping both armies
/// in lock-step with the position.
#[derive(Debug, Clone)]
pub struct Codec<I: Instrument = NoInstrument> {
    position: Chess,
    armies: ByColor<Army>,
    policy: SlowIndexPolicy,
    instrument: I,
}

impl Default for Codec {
    fn default() -> Self {
        Codec::new(Chess::default())
    }
}

impl Codec {
    pub fn new(position: Chess) -> Codec {
        Codec::with_instrument(position, NoInstrument)
    }
}

fn play(position: &Chess, mv: Move) -> Result<Chess> {
    position
        .clone()
        .play(mv)
        .map_err(|_| Error::IllegalMove(slow::terse(&mv)))
}

fn ensure_fast<I: Instrument>(army: &mut Army, board: &Board, instrument: &mut I) -> bool {
    if army.fast_mode {
        return true;
    }
    let success = army.try_fast_mode(board);
    instrument.record(CodecEvent::Rescan { success });
    if !success {
        debug!(color = ?army.color(), "army does not fit fast codes, using slow path");
    }
    success
}

impl<I: Instrument> Codec<I> {
    pub fn with_instrument(position: Chess, instrument: I) -> Self {
        Codec {
            position,
            armies: army::armies(),
            policy: SlowIndexPolicy::default(),
            instrument,
        }
    }

    pub fn with_policy(mut self, policy: SlowIndexPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn position(&self) -> &Chess {
        &self.position
    }

    pub fn army(&self, color: Color) -> &Army {
        match color {
            Color::White => &self.armies.white,
            Color::Black => &self.armies.black,
        }
    }

    pub fn instrument(&self) -> &I {
        &self.instrument
    }

    pub fn into_instrument(self) -> I {
        self.instrument
    }

    /// Jumps to an unrelated position. Both armies will re-scan.
    pub fn set_position(&mut self, position: Chess) {
        self.position = position;
        self.invalidate();
    }

    pub fn invalidate(&mut self) {
        self.armies.white.fast_mode = false;
        self.armies.black.fast_mode = false;
    }

    /// Encodes a legal move and plays it. An illegal move leaves the codec untouched.
    pub fn compress_move(&mut self, mv: Move) -> Result<u8> {
        let after = play(&self.position, mv)?;
        let mut armies = self.armies.clone();
        let (mover, other) = army::split(&mut armies, self.position.turn());

        let code = if ensure_fast(mover, self.position.board(), &mut self.instrument) {
            let code = compress::encode(mover, mv)?;
            let reorder = mover.advance(other, mv);
            self.instrument.record(CodecEvent::CompressFast);
            self.instrument.record(CodecEvent::Reorder(reorder));
            code
        } else {
            other.fast_mode = false;
            self.instrument.record(CodecEvent::CompressSlow);
            slow::encode(&self.position, mv)?
        };

        self.armies = armies;
        self.position = after;
        Ok(code)
    }

    pub fn decompress_move(&mut self, code: u8) -> Result<Move> {
        Ok(self.step(code, false)?.mv)
    }

    /// Decodes and plays one byte, producing SAN where the fast path allows.
    pub fn decode(&mut self, code: u8) -> Result<Decoded> {
        self.step(code, true)
    }

    pub fn compress_moves(&mut self, moves: &[Move]) -> Result<Vec<u8>> {
        moves.iter().map(|&mv| self.compress_move(mv)).collect()
    }

    pub fn decompress_moves(&mut self, codes: &[u8]) -> Result<Vec<Move>> {
        codes.iter().map(|&code| self.decompress_move(code)).collect()
    }

    fn step(&mut self, code: u8, with_san: bool) -> Result<Decoded> {
        if code < FIRST_MOVE_CODE {
            return Err(Error::InvalidCode { code });
        }
        let mut armies = self.armies.clone();
        let (mover, other) = army::split(&mut armies, self.position.turn());

        let (decoded, after) = if ensure_fast(mover, self.position.board(), &mut self.instrument) {
            let mv = decompress::decode(mover, self.position.board(), code)?;
            let after = play(&self.position, mv)?;
            let san = if with_san {
                decompress::san(&self.position, mover, mv, &after)
            } else {
                None
            };
            let reorder = mover.advance(other, mv);
            self.instrument.record(CodecEvent::DecompressFast);
            self.instrument.record(CodecEvent::Reorder(reorder));
            (Decoded { mv, san, fast: true }, after)
        } else {
            other.fast_mode = false;
            let (mv, clamped) = slow::decode(&self.position, code, self.policy)?;
            if clamped {
                self.instrument.record(CodecEvent::SlowIndexClamped);
            }
            self.instrument.record(CodecEvent::DecompressSlow);
            let after = play(&self.position, mv)?;
            (
                Decoded {
                    mv,
                    san: None,
                    fast: false,
                },
                after,
            )
        };

        self.armies = armies;
        self.position = after;
        Ok(decoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::CodecStats;
    use shakmaty::{fen::Fen, san::SanPlus, CastlingMode, Role, Square};

    fn position(fen: &str) -> Chess {
        let fen: Fen = fen.parse().unwrap();
        fen.into_position(CastlingMode::Standard).unwrap()
    }

    fn moves_from_san(start: &Chess, sans: &[&str]) -> Vec<Move> {
        let mut pos = start.clone();
        let mut moves = Vec::new();
        for san in sans {
            let mv = san.parse::<SanPlus>().unwrap().san.to_move(&pos).unwrap();
            pos = pos.play(mv).unwrap();
            moves.push(mv);
        }
        moves
    }

    fn decode_all(start: &Chess, codes: &[u8]) -> Vec<Decoded> {
        let mut codec = Codec::new(start.clone());
        codes.iter().map(|&c| codec.decode(c).unwrap()).collect()
    }

    #[test]
    fn test_round_trip_opening() {
        let start = Chess::default();
        let moves = moves_from_san(&start, &["e4", "e5", "Nf3", "Nc6", "Bb5", "a6", "O-O", "Nf6", "Re1", "b5"]);
        let mut codec = Codec::new(start.clone());
        let codes = codec.compress_moves(&moves).unwrap();
        assert_eq!(codes.len(), moves.len());
        assert!(codes.iter().all(|&c| c >= FIRST_MOVE_CODE));
        assert_eq!(codes[0], 0xC0);
        assert_eq!(codes[2], CODE_KNIGHT | N_HI | N_NNW);
        assert_eq!(codes[6], CODE_KING | K_SE);

        let mut decoder = Codec::new(start);
        assert_eq!(decoder.decompress_moves(&codes).unwrap(), moves);
        assert_eq!(decoder.position().board(), codec.position().board());
    }

    #[test]
    fn test_same_move_same_byte() {
        let start = Chess::default();
        let nf3 = moves_from_san(&start, &["Nf3"])[0];
        let first = Codec::new(start.clone()).compress_move(nf3).unwrap();
        let second = Codec::new(start).compress_move(nf3).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_fools_mate_san() {
        let start = Chess::default();
        let moves = moves_from_san(&start, &["f3", "e5", "g4", "Qh4#"]);
        let codes = Codec::new(start.clone()).compress_moves(&moves).unwrap();
        let decoded = decode_all(&start, &codes);
        let sans: Vec<_> = decoded.iter().map(|d| d.san.clone().unwrap()).collect();
        assert_eq!(sans, ["f3", "e5", "g4", "Qh4+"]);

        let mut codec = Codec::new(start);
        codec.decompress_moves(&codes).unwrap();
        assert!(codec.position().is_checkmate());
    }

    #[test]
    fn test_knight_retreat_san() {
        let start = Chess::default();
        let moves = moves_from_san(&start, &["Nf3", "Nf6", "Ng1"]);
        let codes = Codec::new(start.clone()).compress_moves(&moves).unwrap();
        let decoded = decode_all(&start, &codes);
        assert_eq!(decoded[2].san.as_deref(), Some("Ng1"));
        assert_eq!(decoded[2].mv, moves[2]);
    }

    #[test]
    fn test_en_passant_updates_other_army() {
        let start = Chess::default();
        let moves = moves_from_san(&start, &["e4", "a6", "e5", "d5", "exd6"]);
        let mut codec = Codec::new(start.clone());
        let codes = codec.compress_moves(&moves).unwrap();
        assert!(codec.army(Color::Black).fast_mode);
        assert_eq!(codec.army(Color::Black).nbr_pawns, 7);

        let mut decoder = Codec::new(start);
        for &code in &codes[..4] {
            decoder.decode(code).unwrap();
        }
        assert_eq!(decoder.army(Color::Black).nbr_pawns, 8);
        let last = decoder.decode(codes[4]).unwrap();
        match last.mv {
            Move::EnPassant { from, to } => {
                assert_eq!(from, Square::E5);
                assert_eq!(to, Square::D6);
            }
            other => panic!("expected en passant, got {:?}", other),
        }
        assert_eq!(last.san.as_deref(), Some("exd6"));
        assert_eq!(decoder.army(Color::Black).nbr_pawns, 7);
    }

    #[test]
    fn test_promotion_forces_rescan() {
        let start = position("4k3/P7/8/8/8/8/8/4K3 w - - 0 1");
        let moves = moves_from_san(&start, &["a8=Q+", "Kd7", "Qb7+", "Ke6", "Qb3+"]);
        let mut codec = Codec::with_instrument(start.clone(), CodecStats::default());
        let first = codec.compress_move(moves[0]).unwrap();
        assert_eq!(first, CODE_PAWN | (P_SINGLE << 2) | PROMOTE_QUEEN);
        assert!(!codec.army(Color::White).fast_mode);
        let rest = codec.compress_moves(&moves[1..]).unwrap();
        assert!(codec.army(Color::White).fast_mode);
        assert_eq!(codec.instrument().compress_slow, 0);

        let mut codes = vec![first];
        codes.extend(rest);
        let decoded = decode_all(&start, &codes);
        let sans: Vec<_> = decoded.iter().map(|d| d.san.clone().unwrap()).collect();
        assert_eq!(sans, ["a8=Q+", "Kd7", "Qb7+", "Ke6", "Qb3+"]);
    }

    #[test]
    fn test_slow_path_for_crowded_army() {
        let start = position("4k3/8/8/8/8/8/8/RR2K2R w - - 0 1");
        let moves = moves_from_san(&start, &["Rb8+", "Kd7", "Rh7+"]);
        let mut codec = Codec::with_instrument(start.clone(), CodecStats::default());
        let codes = codec.compress_moves(&moves).unwrap();

        let sorted = slow::sorted_moves(&start);
        let idx = sorted.iter().position(|&m| m == moves[0]).unwrap();
        assert_eq!(codes[0], 255 - idx as u8);
        assert_eq!(codec.instrument().compress_slow, 2);
        assert_eq!(codec.instrument().compress_fast, 1);

        let decoded = decode_all(&start, &codes);
        assert!(!decoded[0].fast);
        assert_eq!(decoded[0].san, None);
        assert!(decoded[1].fast);
        let moves_back: Vec<_> = decoded.iter().map(|d| d.mv).collect();
        assert_eq!(moves_back, moves);
    }

    #[test]
    fn test_slow_code_255_is_first_sorted_move() {
        let start = position("4k3/8/8/8/8/8/8/RR2K2R w - - 0 1");
        let first = slow::sorted_moves(&start)[0];
        let mut codec = Codec::new(start.clone());
        assert_eq!(codec.decompress_move(255).unwrap(), first);

        let mut codec = Codec::new(start.clone());
        assert_eq!(codec.decompress_move(FIRST_MOVE_CODE).unwrap(), first);

        let mut strict = Codec::new(start).with_policy(SlowIndexPolicy::Reject);
        assert!(matches!(
            strict.decompress_move(FIRST_MOVE_CODE),
            Err(Error::SlowIndexOutOfRange { .. })
        ));
    }

    #[test]
    fn test_illegal_move_leaves_state() {
        let mut codec = Codec::default();
        let bogus = Move::Normal {
            role: Role::Queen,
            from: Square::D1,
            capture: None,
            to: Square::H5,
            promotion: None,
        };
        assert!(matches!(codec.compress_move(bogus), Err(Error::IllegalMove(_))));
        assert_eq!(codec.position().board(), &Board::default());
        assert!(!codec.army(Color::White).fast_mode);
    }

    #[test]
    fn test_bad_fast_code_is_rejected() {
        let mut codec = Codec::default();
        // Rook moves are blocked in the start position.
        assert!(matches!(
            codec.decompress_move(CODE_ROOK_LO | R_RANK | 4),
            Err(Error::IllegalMove(_))
        ));
        assert!(matches!(codec.decompress_move(3), Err(Error::InvalidCode { code: 3 })));
        assert_eq!(codec.position().board(), &Board::default());
    }

    #[test]
    fn test_two_queens_round_trip() {
        let start = position("4k3/8/8/8/8/8/PPPPPP2/2Q1K1Q1 w - - 0 1");
        let moves = moves_from_san(&start, &["Qg4", "Kd8", "Qd7+"]);
        let codes = Codec::new(start.clone()).compress_moves(&moves).unwrap();
        assert_eq!(codes[0], CODE_QUEEN2_ROOK | R_RANK | 4);
        let decoded = decode_all(&start, &codes);
        assert_eq!(decoded[0].san, None);
        assert!(decoded[0].fast);
        let moves_back: Vec<_> = decoded.iter().map(|d| d.mv).collect();
        assert_eq!(moves_back, moves);
    }
}
