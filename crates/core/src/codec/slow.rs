//! Slow-path codes: an index into the sorted legal move list.

use shakmaty::{Chess, File, Move, Position, Role, Square};
use tracing::debug;

use crate::config::SlowIndexPolicy;
use crate::error::{Error, Result};

use super::FIRST_MOVE_CODE;

/// Renders a move as source, destination and promotion letter, e.g. `e7e8q`.
/// Castling is written as the king's two-square step.
pub fn terse(mv: &Move) -> String {
    match mv {
        Move::Normal {
            from,
            to,
            promotion,
            ..
        } => {
            let promo = promotion
                .map(|r| match r {
                    Role::Queen => "q",
                    Role::Rook => "r",
                    Role::Bishop => "b",
                    Role::Knight => "n",
                    _ => "",
                })
                .unwrap_or("");
            format!("{}{}{}", from, to, promo)
        }
        Move::EnPassant { from, to } => format!("{}{}", from, to),
        Move::Castle { king, rook } => {
            let king_to = if rook.file() > king.file() {
                Square::from_coords(File::G, king.rank())
            } else {
                Square::from_coords(File::C, king.rank())
            };
            format!("{}{}", king, king_to)
        }
        Move::Put { .. } => String::new(),
    }
}

/// Legal moves ordered by their terse rendering.
pub fn sorted_moves(position: &Chess) -> Vec<Move> {
    let mut keyed: Vec<(String, Move)> = position
        .legal_moves()
        .into_iter()
        .map(|m| (terse(&m), m))
        .collect();
    keyed.sort_by(|a, b| a.0.cmp(&b.0));
    keyed.into_iter().map(|(_, m)| m).collect()
}

pub(super) fn encode(position: &Chess, mv: Move) -> Result<u8> {
    let idx = sorted_moves(position)
        .iter()
        .position(|&m| m == mv)
        .ok_or_else(|| Error::IllegalMove(terse(&mv)))?;
    let code = 255usize.saturating_sub(idx).max(usize::from(FIRST_MOVE_CODE));
    Ok(code as u8)
}

/// Returns the move and whether the index had to be clamped.
pub(super) fn decode(position: &Chess, code: u8, policy: SlowIndexPolicy) -> Result<(Move, bool)> {
    let moves = sorted_moves(position);
    let Some(&first) = moves.first() else {
        return Err(Error::NoLegalMoves { code });
    };
    let idx = usize::from(255 - code);
    match moves.get(idx) {
        Some(&mv) => Ok((mv, false)),
        None if policy == SlowIndexPolicy::Reject => Err(Error::SlowIndexOutOfRange {
            code,
            legal: moves.len(),
        }),
        None => {
            debug!(code, legal = moves.len(), "slow index out of range, using first move");
            Ok((first, true))
        }
    }
}
