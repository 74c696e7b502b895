//! Fast-path move encoding

use shakmaty::{Move, Role};

use crate::army::Army;
use crate::error::{Error, Result};
use crate::square::{file_of, from_square, is_dark, row_of};

use super::slow::terse;
use super::*;

fn untracked(mv: &Move) -> Error {
    Error::IllegalMove(terse(mv))
}

/// Detail nibble for an orthogonal move.
pub(super) fn rook_detail(src: u8, dst: u8) -> u8 {
    if file_of(src) == file_of(dst) {
        R_RANK | row_of(dst)
    } else {
        R_FILE | file_of(dst)
    }
}

/// Detail nibble for a diagonal move.
pub(super) fn bishop_detail(src: u8, dst: u8) -> u8 {
    if src.abs_diff(dst) % 9 == 0 {
        B_FALL | file_of(dst)
    } else {
        B_RISE | file_of(dst)
    }
}

fn is_orthogonal(src: u8, dst: u8) -> bool {
    file_of(src) == file_of(dst) || row_of(src) == row_of(dst)
}

fn promotion_bits(role: Role) -> Option<u8> {
    match role {
        Role::Queen => Some(PROMOTE_QUEEN),
        Role::Rook => Some(PROMOTE_ROOK),
        Role::Bishop => Some(PROMOTE_BISHOP),
        Role::Knight => Some(PROMOTE_KNIGHT),
        _ => None,
    }
}

/// Encodes a legal move for a side in fast mode. The army is read, not updated.
pub(super) fn encode(army: &Army, mv: Move) -> Result<u8> {
    match mv {
        Move::Castle { king, rook } => {
            let kingside = rook.file() > king.file();
            let vector = match (army.white, kingside) {
                (true, true) => K_SE,
                (true, false) => K_SW,
                (false, true) => K_NE,
                (false, false) => K_NW,
            };
            Ok(CODE_KING | vector)
        }
        Move::EnPassant { from, to } => encode_pawn(army, &mv, from_square(from), from_square(to), None),
        Move::Normal {
            role,
            from,
            to,
            promotion,
            ..
        } => {
            let (src, dst) = (from_square(from), from_square(to));
            let delta = i16::from(dst) - i16::from(src);
            match role {
                Role::King => {
                    let vector = KING_DELTAS
                        .iter()
                        .position(|&d| d == delta)
                        .ok_or_else(|| untracked(&mv))?;
                    Ok(CODE_KING | (K_N + vector as u8))
                }
                Role::Knight => {
                    let slot = army.knight_slot(src).ok_or_else(|| untracked(&mv))?;
                    let vector = KNIGHT_DELTAS
                        .iter()
                        .position(|&d| d == delta)
                        .ok_or_else(|| untracked(&mv))?;
                    Ok(CODE_KNIGHT | ((slot as u8) << 3) | vector as u8)
                }
                Role::Rook => {
                    let slot = army.rook_slot(src).ok_or_else(|| untracked(&mv))?;
                    Ok((CODE_ROOK_LO + ((slot as u8) << 4)) | rook_detail(src, dst))
                }
                Role::Bishop => {
                    let base = if is_dark(src) {
                        CODE_BISHOP_DARK
                    } else {
                        CODE_BISHOP_LIGHT
                    };
                    Ok(base | bishop_detail(src, dst))
                }
                Role::Queen => {
                    let slot = army.queen_slot(src).ok_or_else(|| untracked(&mv))?;
                    let base = if slot == 0 {
                        CODE_QUEEN_ROOK
                    } else {
                        CODE_QUEEN2_ROOK
                    };
                    if is_orthogonal(src, dst) {
                        Ok(base | rook_detail(src, dst))
                    } else {
                        Ok((base + BISHOP_LIKE) | bishop_detail(src, dst))
                    }
                }
                Role::Pawn => encode_pawn(army, &mv, src, dst, promotion),
            }
        }
        Move::Put { .. } => Err(untracked(&mv)),
    }
}

fn encode_pawn(army: &Army, mv: &Move, src: u8, dst: u8, promotion: Option<Role>) -> Result<u8> {
    let slot = army.pawn_slot(src).ok_or_else(|| untracked(mv))?;
    let forward = if army.white {
        i16::from(src) - i16::from(dst)
    } else {
        i16::from(dst) - i16::from(src)
    };
    let direction = match forward {
        16 => P_DOUBLE,
        8 => P_SINGLE,
        9 => P_LEFT,
        7 => P_RIGHT,
        _ => return Err(untracked(mv)),
    };
    let detail = match promotion {
        None => direction,
        Some(role) => (direction << 2) | promotion_bits(role).ok_or_else(|| untracked(mv))?,
    };
    Ok((CODE_PAWN + ((slot as u8) << 4)) | detail)
}
