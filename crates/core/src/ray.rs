//! Precomputed line and knight-jump tables used for check detection.
//!
//! `rays[a][b]` describes the line leading from `b` towards `a`: the step
//! between consecutive squares, whether it is an orthogonal or a diagonal
//! line, and how far the line runs from `b` before leaving the board.

use shakmaty::{Board, Color, Role};
use std::sync::OnceLock;

use crate::square::{file_of, row_of, to_square};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RayKind {
    Rook,
    Bishop,
}

/// Which line kinds a query accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lines {
    Rook,
    Bishop,
    Any,
}

impl Lines {
    pub fn accepts(self, kind: RayKind) -> bool {
        match self {
            Lines::Rook => kind == RayKind::Rook,
            Lines::Bishop => kind == RayKind::Bishop,
            Lines::Any => true,
        }
    }

    /// The line kinds along which a piece of this role attacks, if any.
    pub fn of_role(role: Role) -> Option<Lines> {
        match role {
            Role::Rook => Some(Lines::Rook),
            Role::Bishop => Some(Lines::Bishop),
            Role::Queen => Some(Lines::Any),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Ray {
    /// Index step along the line, 0 when the squares share no line
    pub offset: i8,
    pub kind: Option<RayKind>,
    /// Last square on the board along the line
    pub edge: u8,
    /// Steps from the origin to `edge`
    pub count: u8,
}

pub struct RayTable {
    rays: [[Ray; 64]; 64],
    knight: [u64; 64],
}

const DIRECTIONS: [(i8, i8, RayKind); 8] = [
    (-1, 0, RayKind::Rook),
    (1, 0, RayKind::Rook),
    (0, -1, RayKind::Rook),
    (0, 1, RayKind::Rook),
    (-1, -1, RayKind::Bishop),
    (-1, 1, RayKind::Bishop),
    (1, -1, RayKind::Bishop),
    (1, 1, RayKind::Bishop),
];

const KNIGHT_JUMPS: [(i8, i8); 8] = [
    (-2, 1),
    (-1, 2),
    (1, 2),
    (2, 1),
    (2, -1),
    (1, -2),
    (-1, -2),
    (-2, -1),
];

fn step(idx: u8, drow: i8, dfile: i8) -> Option<u8> {
    let row = row_of(idx) as i8 + drow;
    let file = file_of(idx) as i8 + dfile;
    ((0..8).contains(&row) && (0..8).contains(&file)).then(|| (row * 8 + file) as u8)
}

impl RayTable {
    fn build() -> RayTable {
        let mut rays = [[Ray::default(); 64]; 64];
        let mut knight = [0u64; 64];

        // Edge square and distance per origin and direction.
        let mut edges = [[(0u8, 0u8); 8]; 64];
        for origin in 0..64u8 {
            for (d, &(drow, dfile, _)) in DIRECTIONS.iter().enumerate() {
                let (mut edge, mut count) = (origin, 0u8);
                while let Some(next) = step(edge, drow, dfile) {
                    edge = next;
                    count += 1;
                }
                edges[origin as usize][d] = (edge, count);
            }
        }

        for b in 0..64u8 {
            for (d, &(drow, dfile, kind)) in DIRECTIONS.iter().enumerate() {
                let (edge, count) = edges[b as usize][d];
                let mut sq = b;
                while let Some(a) = step(sq, drow, dfile) {
                    rays[a as usize][b as usize] = Ray {
                        offset: drow * 8 + dfile,
                        kind: Some(kind),
                        edge,
                        count,
                    };
                    sq = a;
                }
            }
            for &(drow, dfile) in KNIGHT_JUMPS.iter() {
                if let Some(target) = step(b, drow, dfile) {
                    knight[b as usize] |= 1u64 << target;
                }
            }
        }

        RayTable { rays, knight }
    }

    /// Shared table, built on first use.
    pub fn get() -> &'static RayTable {
        static TABLE: OnceLock<RayTable> = OnceLock::new();
        TABLE.get_or_init(RayTable::build)
    }

    /// The line leading from `from` through `to`.
    pub fn ray(&self, to: u8, from: u8) -> Ray {
        self.rays[to as usize][from as usize]
    }

    pub fn knight_attacks(&self, from: u8, to: u8) -> bool {
        self.knight[from as usize] & (1u64 << to) != 0
    }
}

fn occupied(board: &Board, idx: u8) -> bool {
    board.piece_at(to_square(idx)).is_some()
}

/// True if a line piece of the given kind standing on `from` attacks `to`
/// on the current board.
pub fn attacks(board: &Board, from: u8, to: u8, lines: Lines) -> bool {
    let ray = RayTable::get().ray(to, from);
    match ray.kind {
        Some(kind) if lines.accepts(kind) => {}
        _ => return false,
    }
    let mut sq = i16::from(from) + i16::from(ray.offset);
    while sq != i16::from(to) {
        if occupied(board, sq as u8) {
            return false;
        }
        sq += i16::from(ray.offset);
    }
    true
}

/// True if moving the piece on `src` to `dst` uncovers an attack on `king`
/// by a queen, rook or bishop of the `attacker` colour.
///
/// The board is the one before the move. `dst` counts as occupied after the
/// move, so a piece sliding along the same line keeps the line closed.
pub fn discovered_check(board: &Board, attacker: Color, src: u8, dst: u8, king: u8) -> bool {
    let ray = RayTable::get().ray(src, king);
    let Some(kind) = ray.kind else {
        return false;
    };
    let mut sq = i16::from(king);
    for _ in 0..ray.count {
        sq += i16::from(ray.offset);
        let idx = sq as u8;
        if idx == dst {
            return false;
        }
        if idx == src {
            continue;
        }
        if let Some(piece) = board.piece_at(to_square(idx)) {
            return piece.color == attacker
                && Lines::of_role(piece.role).is_some_and(|lines| lines.accepts(kind));
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::square::{from_square, A1, A8, E1, H1, H8};
    use shakmaty::{fen::Fen, CastlingMode, Chess, Position, Square};

    fn board_from_fen(fen: &str) -> Board {
        let fen: Fen = fen.parse().unwrap();
        let pos: Chess = fen.into_position(CastlingMode::Standard).unwrap();
        pos.board().clone()
    }

    #[test]
    fn test_ray_classification() {
        let table = RayTable::get();
        let ray = table.ray(A8, A1);
        assert_eq!(ray.kind, Some(RayKind::Rook));
        assert_eq!(ray.offset, -8);
        assert_eq!(ray.edge, A8);
        assert_eq!(ray.count, 7);

        let ray = table.ray(H8, A1);
        assert_eq!(ray.kind, Some(RayKind::Bishop));
        assert_eq!(ray.offset, -7);

        assert!(table.ray(from_square(Square::B3), A1).kind.is_none());
        assert!(table.ray(A1, A1).kind.is_none());
    }

    #[test]
    fn test_edge_runs_past_target() {
        let table = RayTable::get();
        let ray = table.ray(from_square(Square::E3), E1);
        assert_eq!(ray.edge, from_square(Square::E8));
        assert_eq!(ray.count, 7);
        let ray = table.ray(from_square(Square::G3), E1);
        assert_eq!(ray.edge, H1 - 8 * 3);
        assert_eq!(ray.count, 3);
    }

    #[test]
    fn test_knight_jumps() {
        let table = RayTable::get();
        let g1 = from_square(Square::G1);
        assert!(table.knight_attacks(g1, from_square(Square::F3)));
        assert!(table.knight_attacks(g1, from_square(Square::H3)));
        assert!(table.knight_attacks(g1, from_square(Square::E2)));
        assert!(!table.knight_attacks(g1, from_square(Square::G3)));
        assert!(!table.knight_attacks(H1, from_square(Square::A2)));
    }

    #[test]
    fn test_attacks_respect_blockers() {
        let board = Board::default();
        let d1 = from_square(Square::D1);
        assert!(!attacks(&board, d1, from_square(Square::H5), Lines::Bishop));
        assert!(attacks(&board, d1, from_square(Square::E2), Lines::Any));
        assert!(!attacks(&board, d1, from_square(Square::E2), Lines::Rook));

        let board = board_from_fen("rnbqkbnr/pppp1ppp/8/4p3/6P1/5P2/PPPPP2P/RNBQKBNR b KQkq - 0 2");
        let h4 = from_square(Square::H4);
        assert!(attacks(&board, from_square(Square::D8), h4, Lines::Bishop));
        assert!(attacks(&board, h4, E1, Lines::Bishop));
    }

    #[test]
    fn test_discovered_check() {
        // Bishop on e2 screens the queen on e1 from the king on e8.
        let board = board_from_fen("4k3/8/8/8/8/8/4B3/4QK2 w - - 0 1");
        let e2 = from_square(Square::E2);
        let e8 = from_square(Square::E8);
        assert!(discovered_check(&board, Color::White, e2, from_square(Square::A6), e8));
        assert!(!discovered_check(&board, Color::White, e2, from_square(Square::E5), e8));
        assert!(!discovered_check(&board, Color::Black, e2, from_square(Square::A6), e8));

        let board = board_from_fen("4k3/8/8/8/4N3/8/8/4R1K1 w - - 0 1");
        let e4 = from_square(Square::E4);
        assert!(discovered_check(&board, Color::White, e4, from_square(Square::F6), e8));
        assert!(!discovered_check(&board, Color::White, e4, from_square(Square::F6), E1));
    }
}
