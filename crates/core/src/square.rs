//! Square numbering used by the byte codec.
//!
//! Squares run rank-major from a8 (0) to h1 (63), so one step north is -8.
//! shakmaty counts from a1 instead; the two only meet in this module.

use shakmaty::Square;

pub const A8: u8 = 0;
pub const E8: u8 = 4;
pub const H8: u8 = 7;
pub const A1: u8 = 56;
pub const E1: u8 = 60;
pub const H1: u8 = 63;

/// Converts a codec square index into a shakmaty square.
pub fn to_square(idx: u8) -> Square {
    Square::new(u32::from(idx ^ 0x38))
}

/// Converts a shakmaty square into a codec square index.
pub fn from_square(sq: Square) -> u8 {
    (sq as u8) ^ 0x38
}

pub fn file_of(idx: u8) -> u8 {
    idx & 7
}

/// Row counted from the eighth rank, so a8 is row 0 and a1 is row 7.
pub fn row_of(idx: u8) -> u8 {
    idx >> 3
}

pub fn is_dark(idx: u8) -> bool {
    (file_of(idx) + row_of(idx)) & 1 == 1
}

pub fn file_char(idx: u8) -> char {
    char::from(b'a' + file_of(idx))
}

pub fn rank_char(idx: u8) -> char {
    char::from(b'8' - row_of(idx))
}

/// Adds a signed step, returning None when the result leaves the board.
pub fn offset(idx: u8, delta: i16) -> Option<u8> {
    let target = i16::from(idx) + delta;
    (0..64).contains(&target).then_some(target as u8)
}

/// Stable pawn ordering: file-major, then from the first rank upwards.
///
/// Pawn slots are kept sorted by this value. Pushes never change the
/// relative order of two pawns, so only captures need a re-sort.
pub fn pawn_ordering(idx: u8) -> u8 {
    file_of(idx) * 8 + (7 - row_of(idx))
}

/// Squares in ascending `pawn_ordering`: a1, a2 .. a8, b1 .. h8.
pub fn pawn_traversal() -> impl Iterator<Item = u8> {
    (0..8u8).flat_map(|file| (0..8u8).rev().map(move |row| row * 8 + file))
}
