//! Per-side piece tracking that backs the fast move codes.
//!
//! An `Army` remembers which slot every piece of one colour occupies. Slots
//! are assigned by a full board scan and then maintained move by move, so the
//! incremental state always equals what a fresh scan of the same position
//! would produce.

use serde::Serialize;
use shakmaty::{Board, ByColor, Color, Move, Role};

use crate::square::{from_square, is_dark, pawn_ordering, pawn_traversal, to_square};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Army {
    pub white: bool,
    pub fast_mode: bool,
    pub king: u8,
    pub queens: [u8; 2],
    pub nbr_queens: u8,
    pub rooks: [u8; 2],
    pub nbr_rooks: u8,
    pub knights: [u8; 2],
    pub nbr_knights: u8,
    pub dark_bishop: u8,
    pub nbr_dark_bishops: u8,
    pub light_bishop: u8,
    pub nbr_light_bishops: u8,
    pub pawns: [u8; 8],
    pub nbr_pawns: u8,
}

/// Slot reshuffles caused by a move, reported to instrumentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reorder {
    None,
    Rooks,
    Knights,
    Queens,
    Pawns(u8),
}

impl Army {
    pub fn new(color: Color) -> Army {
        Army {
            white: color.is_white(),
            fast_mode: false,
            king: 0,
            queens: [0; 2],
            nbr_queens: 0,
            rooks: [0; 2],
            nbr_rooks: 0,
            knights: [0; 2],
            nbr_knights: 0,
            dark_bishop: 0,
            nbr_dark_bishops: 0,
            light_bishop: 0,
            nbr_light_bishops: 0,
            pawns: [0; 8],
            nbr_pawns: 0,
        }
    }

    pub fn color(&self) -> Color {
        Color::from_white(self.white)
    }

    /// Scans the board and assigns slots, or returns None if this side has
    /// more pieces of some kind than the fast codes can address.
    pub fn scan(board: &Board, color: Color) -> Option<Army> {
        let mut army = Army::new(color);

        for sq in pawn_traversal() {
            if board.piece_at(to_square(sq)) == Some(color.pawn()) {
                if army.nbr_pawns == 8 {
                    return None;
                }
                army.pawns[army.nbr_pawns as usize] = sq;
                army.nbr_pawns += 1;
            }
        }

        for sq in 0..64u8 {
            let Some(piece) = board.piece_at(to_square(sq)) else {
                continue;
            };
            if piece.color != color {
                continue;
            }
            match piece.role {
                Role::King => army.king = sq,
                Role::Queen => push_pair(&mut army.queens, &mut army.nbr_queens, sq)?,
                Role::Rook => push_pair(&mut army.rooks, &mut army.nbr_rooks, sq)?,
                Role::Knight => push_pair(&mut army.knights, &mut army.nbr_knights, sq)?,
                Role::Bishop if is_dark(sq) => {
                    if army.nbr_dark_bishops == 1 {
                        return None;
                    }
                    army.dark_bishop = sq;
                    army.nbr_dark_bishops = 1;
                }
                Role::Bishop => {
                    if army.nbr_light_bishops == 1 {
                        return None;
                    }
                    army.light_bishop = sq;
                    army.nbr_light_bishops = 1;
                }
                Role::Pawn => {}
            }
        }

        // A second queen borrows the codes of pawn slots 6 and 7.
        if army.nbr_queens == 2 && army.nbr_pawns > 6 {
            return None;
        }

        army.fast_mode = true;
        Some(army)
    }

    /// Re-scans the board. On failure the army stays out of fast mode.
    pub fn try_fast_mode(&mut self, board: &Board) -> bool {
        match Army::scan(board, self.color()) {
            Some(army) => {
                *self = army;
                true
            }
            None => {
                self.fast_mode = false;
                false
            }
        }
    }

    pub fn queen_slot(&self, sq: u8) -> Option<usize> {
        slot_of(&self.queens, self.nbr_queens, sq)
    }

    pub fn rook_slot(&self, sq: u8) -> Option<usize> {
        slot_of(&self.rooks, self.nbr_rooks, sq)
    }

    pub fn knight_slot(&self, sq: u8) -> Option<usize> {
        slot_of(&self.knights, self.nbr_knights, sq)
    }

    pub fn pawn_slot(&self, sq: u8) -> Option<usize> {
        slot_of(&self.pawns, self.nbr_pawns, sq)
    }

    pub fn bishop(&self, dark: bool) -> Option<u8> {
        match dark {
            true if self.nbr_dark_bishops == 1 => Some(self.dark_bishop),
            false if self.nbr_light_bishops == 1 => Some(self.light_bishop),
            _ => None,
        }
    }

    /// Removes a piece the other side just captured.
    pub fn remove_captured(&mut self, role: Role, sq: u8) {
        let found = match role {
            Role::Pawn => match self.pawn_slot(sq) {
                Some(slot) => {
                    let n = self.nbr_pawns as usize;
                    self.pawns.copy_within(slot + 1..n, slot);
                    self.pawns[n - 1] = 0;
                    self.nbr_pawns -= 1;
                    true
                }
                None => false,
            },
            Role::Knight => remove_pair(&mut self.knights, &mut self.nbr_knights, sq),
            Role::Rook => remove_pair(&mut self.rooks, &mut self.nbr_rooks, sq),
            Role::Queen => remove_pair(&mut self.queens, &mut self.nbr_queens, sq),
            Role::Bishop if is_dark(sq) => {
                self.dark_bishop = 0;
                std::mem::take(&mut self.nbr_dark_bishops) == 1
            }
            Role::Bishop => {
                self.light_bishop = 0;
                std::mem::take(&mut self.nbr_light_bishops) == 1
            }
            Role::King => false,
        };
        if !found {
            self.fast_mode = false;
        }
    }

    /// Applies a move made by this side while it is in fast mode, removing
    /// any captured piece from `other` if that side is in fast mode too.
    pub fn advance(&mut self, other: &mut Army, mv: Move) -> Reorder {
        match mv {
            Move::Castle { king, rook } => {
                let (king, rook) = (from_square(king), from_square(rook));
                let kingside = rook > king;
                self.king = if kingside { king + 2 } else { king - 2 };
                match self.rook_slot(rook) {
                    Some(slot) => self.rooks[slot] = if kingside { king + 1 } else { king - 1 },
                    None => self.fast_mode = false,
                }
                Reorder::None
            }
            Move::EnPassant { from, to } => {
                let to = from_square(to);
                let captured = if self.white { to + 8 } else { to - 8 };
                if other.fast_mode {
                    other.remove_captured(Role::Pawn, captured);
                }
                self.move_pawn(from_square(from), to)
            }
            Move::Normal {
                role,
                from,
                capture,
                to,
                promotion,
            } => {
                let (from, to) = (from_square(from), from_square(to));
                if let Some(captured) = capture {
                    if other.fast_mode {
                        other.remove_captured(captured, to);
                    }
                }
                if promotion.is_some() {
                    // The new piece has no slot until the next scan.
                    self.fast_mode = false;
                    return Reorder::None;
                }
                match role {
                    Role::King => {
                        self.king = to;
                        Reorder::None
                    }
                    Role::Queen => {
                        let swapped = move_pair(&mut self.queens, self.nbr_queens, from, to);
                        self.check_slot(swapped, Reorder::Queens)
                    }
                    Role::Rook => {
                        let swapped = move_pair(&mut self.rooks, self.nbr_rooks, from, to);
                        self.check_slot(swapped, Reorder::Rooks)
                    }
                    Role::Knight => {
                        let swapped = move_pair(&mut self.knights, self.nbr_knights, from, to);
                        self.check_slot(swapped, Reorder::Knights)
                    }
                    Role::Bishop => {
                        if is_dark(from) {
                            self.dark_bishop = to;
                        } else {
                            self.light_bishop = to;
                        }
                        Reorder::None
                    }
                    Role::Pawn => self.move_pawn(from, to),
                }
            }
            Move::Put { .. } => {
                self.fast_mode = false;
                Reorder::None
            }
        }
    }

    fn check_slot(&mut self, swapped: Option<bool>, reorder: Reorder) -> Reorder {
        match swapped {
            Some(true) => reorder,
            Some(false) => Reorder::None,
            None => {
                self.fast_mode = false;
                Reorder::None
            }
        }
    }

    fn move_pawn(&mut self, from: u8, to: u8) -> Reorder {
        let Some(mut slot) = self.pawn_slot(from) else {
            self.fast_mode = false;
            return Reorder::None;
        };
        self.pawns[slot] = to;

        let n = self.nbr_pawns as usize;
        let mut swaps = 0;
        while slot + 1 < n && pawn_ordering(self.pawns[slot]) > pawn_ordering(self.pawns[slot + 1]) {
            self.pawns.swap(slot, slot + 1);
            slot += 1;
            swaps += 1;
        }
        while slot > 0 && pawn_ordering(self.pawns[slot - 1]) > pawn_ordering(self.pawns[slot]) {
            self.pawns.swap(slot - 1, slot);
            slot -= 1;
            swaps += 1;
        }
        if swaps > 0 {
            Reorder::Pawns(swaps)
        } else {
            Reorder::None
        }
    }
}

/// Both armies, indexed by colour.
pub fn armies() -> ByColor<Army> {
    ByColor {
        white: Army::new(Color::White),
        black: Army::new(Color::Black),
    }
}

/// Splits the pair into (side to move, other side).
pub fn split(armies: &mut ByColor<Army>, turn: Color) -> (&mut Army, &mut Army) {
    match turn {
        Color::White => (&mut armies.white, &mut armies.black),
        Color::Black => (&mut armies.black, &mut armies.white),
    }
}

fn slot_of<const N: usize>(slots: &[u8; N], count: u8, sq: u8) -> Option<usize> {
    slots[..count as usize].iter().position(|&s| s == sq)
}

fn push_pair(pair: &mut [u8; 2], count: &mut u8, sq: u8) -> Option<()> {
    if *count == 2 {
        return None;
    }
    pair[*count as usize] = sq;
    *count += 1;
    Some(())
}

fn remove_pair(pair: &mut [u8; 2], count: &mut u8, sq: u8) -> bool {
    match slot_of(pair, *count, sq) {
        Some(slot) => {
            if slot == 0 {
                pair[0] = pair[1];
            }
            *count -= 1;
            pair[*count as usize] = 0;
            true
        }
        None => false,
    }
}

/// Moves a piece within a two-slot pair and restores ascending order.
/// Returns whether the slots swapped, or None if `from` is not tracked.
fn move_pair(pair: &mut [u8; 2], count: u8, from: u8, to: u8) -> Option<bool> {
    let slot = slot_of(pair, count, from)?;
    pair[slot] = to;
    if count == 2 && pair[0] > pair[1] {
        pair.swap(0, 1);
        return Some(true);
    }
    Some(false)
}
