use chess_bytecode_core::stream::{self, Stepper, StreamWriter};
use chess_bytecode_core::{parse_pgn_string, Codec, CodecStats, Config};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::SeedableRng;
use shakmaty::san::SanPlus;
use shakmaty::{Chess, Move, Position};

/// Plays up to `max_plies` random legal moves. Returns the moves and the
/// position before each of them.
fn random_game(rng: &mut StdRng, start: &Chess, max_plies: usize) -> (Vec<Move>, Vec<Chess>) {
    let mut pos = start.clone();
    let mut moves = Vec::new();
    let mut positions = Vec::new();
    for _ in 0..max_plies {
        let legal = pos.legal_moves();
        let Some(&mv) = legal.choose(rng) else {
            break;
        };
        positions.push(pos.clone());
        moves.push(mv);
        pos = pos.play(mv).unwrap();
    }
    (moves, positions)
}

fn mainline_moves(bytes: &[u8], start: &Chess) -> Vec<Move> {
    Stepper::new(bytes, start.clone(), &Config::default())
        .map(|e| e.unwrap())
        .filter(|e| e.depth == 0)
        .filter_map(|e| e.codepoint.as_move().map(|m| m.mv))
        .collect()
}

#[test]
fn test_random_games_round_trip() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let start = Chess::default();
    for _ in 0..40 {
        let (moves, _) = random_game(&mut rng, &start, 200);
        let mut stats = CodecStats::default();
        let codes = Codec::with_instrument(start.clone(), &mut stats)
            .compress_moves(&moves)
            .unwrap();
        assert_eq!(codes.len(), moves.len());
        assert!(codes.iter().all(|&c| c >= 8));
        assert_eq!(stats.compress_fast + stats.compress_slow, moves.len() as u64);

        let decoded = Codec::new(start.clone()).decompress_moves(&codes).unwrap();
        assert_eq!(decoded, moves);
    }
}

#[test]
fn test_stepper_san_matches_shakmaty() {
    let mut rng = StdRng::seed_from_u64(7);
    let start = Chess::default();
    for _ in 0..40 {
        let (moves, positions) = random_game(&mut rng, &start, 200);
        let codes = Codec::new(start.clone()).compress_moves(&moves).unwrap();
        let events: Vec<_> = Stepper::new(&codes, start.clone(), &Config::default())
            .map(|e| e.unwrap())
            .collect();
        assert_eq!(events.len(), moves.len());
        for (i, event) in events.iter().enumerate() {
            let m = event.codepoint.as_move().unwrap();
            let expected = SanPlus::from_move(positions[i].clone(), moves[i]).to_string();
            assert_eq!(m.san, expected, "ply {} of {:?}", i, moves);
            assert_eq!(m.mv, moves[i]);
        }
    }
}

#[test]
fn test_pgn_round_trip() {
    let mut rng = StdRng::seed_from_u64(11);
    let start = Chess::default();
    let config = Config::default();
    for _ in 0..10 {
        let (moves, _) = random_game(&mut rng, &start, 120);
        let mut writer = StreamWriter::new(start.clone(), &config);
        for (i, &mv) in moves.iter().enumerate() {
            writer.push_move(mv).unwrap();
            if i % 17 == 5 {
                writer.comment("note");
            }
            if i % 23 == 3 {
                writer.nag(2).unwrap();
            }
        }
        let bytes = writer.finish().unwrap();

        let movetext = stream::to_pgn(&bytes, &start, &config, None).unwrap();
        let games = parse_pgn_string(&format!("{}\n", movetext)).unwrap();
        assert_eq!(games.len(), 1);
        assert!(games[0].complete);
        assert_eq!(games[0].bytecode, bytes);
    }
}

#[test]
fn test_promoted_variation_becomes_mainline() {
    let mut rng = StdRng::seed_from_u64(23);
    let start = Chess::default();
    let config = Config::default();
    for _ in 0..10 {
        let (moves, positions) = random_game(&mut rng, &start, 40);
        if moves.len() < 10 {
            continue;
        }
        let k = moves.len() / 2;
        let Some(&alt) = positions[k]
            .legal_moves()
            .iter()
            .filter(|&&m| m != moves[k])
            .collect::<Vec<_>>()
            .choose(&mut rng)
            .copied()
        else {
            continue;
        };
        let after_alt = positions[k].clone().play(alt).unwrap();
        let (tail, _) = random_game(&mut rng, &after_alt, 6);

        let mut writer = StreamWriter::new(start.clone(), &config);
        for &mv in &moves[..=k] {
            writer.push_move(mv).unwrap();
        }
        let var_offset = writer.bytes().len();
        writer.start_variation().unwrap();
        writer.push_move(alt).unwrap();
        for &mv in &tail {
            writer.push_move(mv).unwrap();
        }
        writer.end_variation().unwrap();
        for &mv in &moves[k + 1..] {
            writer.push_move(mv).unwrap();
        }
        let bytes = writer.finish().unwrap();
        assert_eq!(mainline_moves(&bytes, &start), moves);

        let promoted = stream::promote_variation(&bytes, var_offset).unwrap();
        let mut expected: Vec<Move> = moves[..k].to_vec();
        expected.push(alt);
        expected.extend_from_slice(&tail);
        assert_eq!(mainline_moves(&promoted, &start), expected);
        assert_eq!(promoted.len(), bytes.len());

        // promoting the demoted line gives back the input
        let back_offset = promoted
            .iter()
            .position(|&b| b == stream::BC_VARIATION_START)
            .unwrap();
        assert_eq!(stream::promote_variation(&promoted, back_offset).unwrap(), bytes);
    }
}
