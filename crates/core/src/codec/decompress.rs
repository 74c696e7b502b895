//! Fast-path move decoding and the SAN that rides along with it.

use shakmaty::{Board, Chess, Color, Move, Position, Role};

use crate::army::Army;
use crate::error::{Error, Result};
use crate::ray::{attacks, discovered_check, Lines, RayTable};
use crate::square::{file_char, file_of, from_square, offset, rank_char, row_of, to_square, E1, E8};

use super::*;

fn normal(board: &Board, role: Role, src: u8, dst: u8, promotion: Option<Role>) -> Move {
    let to = to_square(dst);
    Move::Normal {
        role,
        from: to_square(src),
        capture: board.role_at(to),
        to,
        promotion,
    }
}

fn slot(squares: &[u8], count: u8, slot: usize, code: u8) -> Result<u8> {
    if slot < usize::from(count) {
        Ok(squares[slot])
    } else {
        Err(Error::InvalidCode { code })
    }
}

fn rook_target(src: u8, detail: u8) -> Option<u8> {
    let dst = if detail & R_RANK != 0 {
        ((detail & 7) << 3) | file_of(src)
    } else {
        (src & 0x38) | (detail & 7)
    };
    (dst != src).then_some(dst)
}

fn bishop_target(src: u8, detail: u8) -> Option<u8> {
    let files = i16::from(detail & 7) - i16::from(file_of(src));
    if files == 0 {
        return None;
    }
    if detail & B_FALL != 0 {
        offset(src, 9 * files)
    } else {
        offset(src, -7 * files)
    }
}

fn line_target(src: u8, code: u8) -> Option<u8> {
    if code & BISHOP_LIKE != 0 {
        bishop_target(src, code & 0x0f)
    } else {
        rook_target(src, code & 0x0f)
    }
}

/// Decodes a fast-path byte against the moving side's army. The result is
/// checked for legality by the caller.
pub(super) fn decode(army: &Army, board: &Board, code: u8) -> Result<Move> {
    let invalid = Error::InvalidCode { code };
    let detail = code & 0x0f;

    match code & 0xf0 {
        CODE_KING => {
            let src = army.king;
            let kingside = match (army.white, detail) {
                (true, K_SE) if src == E1 => Some(true),
                (true, K_SW) if src == E1 => Some(false),
                (false, K_NE) if src == E8 => Some(true),
                (false, K_NW) if src == E8 => Some(false),
                _ => None,
            };
            if let Some(kingside) = kingside {
                let rook = if kingside { src + 3 } else { src - 4 };
                return Ok(Move::Castle {
                    king: to_square(src),
                    rook: to_square(rook),
                });
            }
            let vector = detail.checked_sub(K_N).ok_or(Error::InvalidCode { code })?;
            let dst = offset(src, KING_DELTAS[usize::from(vector)])
                .filter(|&dst| file_of(dst).abs_diff(file_of(src)) <= 1)
                .ok_or(invalid)?;
            Ok(normal(board, Role::King, src, dst, None))
        }
        CODE_KNIGHT => {
            let src = slot(&army.knights, army.nbr_knights, usize::from(detail >> 3), code)?;
            let dst = offset(src, KNIGHT_DELTAS[usize::from(detail & 7)])
                .filter(|&dst| RayTable::get().knight_attacks(src, dst))
                .ok_or(invalid)?;
            Ok(normal(board, Role::Knight, src, dst, None))
        }
        CODE_ROOK_LO | CODE_ROOK_HI => {
            let src = slot(&army.rooks, army.nbr_rooks, usize::from((code >> 4) & 1), code)?;
            let dst = rook_target(src, detail).ok_or(invalid)?;
            Ok(normal(board, Role::Rook, src, dst, None))
        }
        CODE_BISHOP_DARK | CODE_BISHOP_LIGHT => {
            let src = army.bishop(code & 0xf0 == CODE_BISHOP_DARK).ok_or(Error::InvalidCode { code })?;
            let dst = bishop_target(src, detail).ok_or(invalid)?;
            Ok(normal(board, Role::Bishop, src, dst, None))
        }
        CODE_QUEEN_ROOK | CODE_QUEEN_BISHOP => {
            let src = slot(&army.queens, army.nbr_queens, 0, code)?;
            let dst = line_target(src, code).ok_or(invalid)?;
            Ok(normal(board, Role::Queen, src, dst, None))
        }
        CODE_QUEEN2_ROOK | CODE_QUEEN2_BISHOP if army.nbr_queens == 2 => {
            let src = army.queens[1];
            let dst = line_target(src, code).ok_or(invalid)?;
            Ok(normal(board, Role::Queen, src, dst, None))
        }
        _ => decode_pawn(army, board, code),
    }
}

fn decode_pawn(army: &Army, board: &Board, code: u8) -> Result<Move> {
    let invalid = Error::InvalidCode { code };
    let src = slot(&army.pawns, army.nbr_pawns, usize::from((code - CODE_PAWN) >> 4), code)?;
    let detail = code & 0x0f;
    let (direction, promotion) = if detail < 4 {
        (detail, None)
    } else {
        let role = match detail & 3 {
            PROMOTE_QUEEN => Role::Queen,
            PROMOTE_ROOK => Role::Rook,
            PROMOTE_BISHOP => Role::Bishop,
            _ => Role::Knight,
        };
        (detail >> 2, Some(role))
    };
    let (step, files) = match direction {
        P_DOUBLE => (16, 0),
        P_SINGLE => (8, 0),
        P_LEFT => (9, 1),
        _ => (7, 1),
    };
    let dst = offset(src, if army.white { -step } else { step })
        .filter(|&dst| file_of(dst).abs_diff(file_of(src)) == files)
        .ok_or(invalid)?;

    if files == 1 && promotion.is_none() && board.piece_at(to_square(dst)).is_none() {
        return Ok(Move::EnPassant {
            from: to_square(src),
            to: to_square(dst),
        });
    }
    Ok(normal(board, Role::Pawn, src, dst, promotion))
}

fn pawn_attacks(white: bool, from: u8, target: u8) -> bool {
    let forward = if white {
        row_of(target) + 1 == row_of(from)
    } else {
        row_of(from) + 1 == row_of(target)
    };
    forward && file_of(from).abs_diff(file_of(target)) == 1
}

/// Whether the piece landing on `dst` gives check, directly or by uncovering
/// a line piece behind `src`.
fn gives_check(board: &Board, us: Color, role: Role, src: u8, dst: u8, king: u8) -> bool {
    let direct = match role {
        Role::Knight => RayTable::get().knight_attacks(dst, king),
        Role::Pawn => pawn_attacks(us.is_white(), dst, king),
        Role::King => false,
        line => Lines::of_role(line).is_some_and(|lines| attacks(board, dst, king, lines)),
    };
    direct || discovered_check(board, us, src, dst, king)
}

/// File or rank prefix needed when the other rook or knight could also reach
/// `dst`. A twin pinned against its own king does not count.
fn disambiguation(board: &Board, army: &Army, us: Color, role: Role, src: u8, dst: u8) -> Option<char> {
    let (pair, count) = match role {
        Role::Rook => (army.rooks, army.nbr_rooks),
        Role::Knight => (army.knights, army.nbr_knights),
        _ => return None,
    };
    if count != 2 {
        return None;
    }
    let twin = if pair[0] == src { pair[1] } else { pair[0] };
    let reaches = match role {
        Role::Knight => RayTable::get().knight_attacks(twin, dst),
        _ => attacks(board, twin, dst, Lines::Rook),
    };
    if !reaches {
        return None;
    }
    let our_king = from_square(board.king_of(us)?);
    if discovered_check(board, !us, twin, dst, our_king) {
        return None;
    }
    if file_of(src) != file_of(twin) {
        Some(file_char(src))
    } else {
        Some(rank_char(src))
    }
}

/// SAN for a fast-decoded move, with '+' for check but never '#'.
///
/// Returns None when the side has two queens; callers fall back to a full
/// legal move search for those.
pub(super) fn san(position: &Chess, army: &Army, mv: Move, after: &Chess) -> Option<String> {
    if army.nbr_queens == 2 {
        return None;
    }
    let board = position.board();
    let us = position.turn();
    let their_king = from_square(board.king_of(!us)?);

    let mut san = String::new();
    let check = match mv {
        Move::Castle { king, rook } => {
            san.push_str(if rook.file() > king.file() { "O-O" } else { "O-O-O" });
            after.is_check()
        }
        Move::EnPassant { from, to } => {
            san.push(file_char(from_square(from)));
            san.push('x');
            san.push_str(&to.to_string());
            after.is_check()
        }
        Move::Normal {
            role,
            from,
            capture,
            to,
            promotion,
        } => {
            let (src, dst) = (from_square(from), from_square(to));
            if role == Role::Pawn {
                if capture.is_some() {
                    san.push(file_char(src));
                    san.push('x');
                }
            } else {
                san.push(role.upper_char());
                if let Some(prefix) = disambiguation(board, army, us, role, src, dst) {
                    san.push(prefix);
                }
                if capture.is_some() {
                    san.push('x');
                }
            }
            san.push_str(&to.to_string());
            match promotion {
                Some(piece) => {
                    san.push('=');
                    san.push(piece.upper_char());
                    after.is_check()
                }
                None => gives_check(board, us, role, src, dst, their_king),
            }
        }
        Move::Put { .. } => return None,
    };
    if check {
        san.push('+');
    }
    Some(san)
}
