//! Walks a byte stream and yields one event per code.

use shakmaty::{san::SanPlus, Chess, Position};
use tracing::trace;

use crate::codec::{Codec, FIRST_MOVE_CODE};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::stats::{Instrument, NoInstrument};

use super::types::{Codepoint, Event, MoveEvent};
use super::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    InMoves,
    /// A move event was handed out; its position becomes the line's
    /// "before last move" on the next step.
    AfterMove,
    InComment,
    InMeta,
    AfterEscape,
}

/// Snapshot taken at a variation start.
#[derive(Debug, Clone)]
struct Frame {
    saved: Chess,
    before_last: Option<Chess>,
}

/// Iterator over the events of a byte stream. Stops after the first error.
pub struct Stepper<'a, I: Instrument = NoInstrument> {
    bytes: &'a [u8],
    offset: usize,
    codec: Codec<I>,
    config: Config,
    state: State,
    stack: Vec<Frame>,
    /// Position before the most recent move of the current line.
    before_last: Option<Chess>,
    pending: Option<Chess>,
    comment: Option<String>,
    meta_reported: bool,
    move_nbr_needed: bool,
    done: bool,
}

impl<'a> Stepper<'a> {
    pub fn new(bytes: &'a [u8], start: Chess, config: &Config) -> Self {
        let codec = Codec::new(start).with_policy(config.slow_index_policy);
        Stepper::with_codec(bytes, codec, config)
    }
}

impl<'a, I: Instrument> Stepper<'a, I> {
    pub fn with_codec(bytes: &'a [u8], codec: Codec<I>, config: &Config) -> Self {
        Stepper {
            bytes,
            offset: 0,
            codec,
            config: config.clone(),
            state: State::InMoves,
            stack: Vec::new(),
            before_last: None,
            pending: None,
            comment: None,
            meta_reported: false,
            move_nbr_needed: true,
            done: false,
        }
    }

    /// Offset of the next byte to be read.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Position after everything stepped so far.
    pub fn position(&self) -> &Chess {
        self.codec.position()
    }

    pub fn codec(&self) -> &Codec<I> {
        &self.codec
    }

    pub fn into_codec(self) -> Codec<I> {
        self.codec
    }

    fn advance(&mut self) -> Result<Option<Event>> {
        if self.state == State::AfterMove {
            if let Some(before) = self.pending.take() {
                self.before_last = Some(before);
            }
            self.state = State::InMoves;
        }
        match self.state {
            State::InComment => self.in_comment().map(Some),
            State::InMeta => self.in_meta().map(Some),
            State::AfterEscape => self.after_escape().map(Some),
            State::InMoves | State::AfterMove => self.in_moves(),
        }
    }

    fn event(&self, offset: usize, depth: usize, codepoint: Codepoint) -> Event {
        trace!(offset, depth, kind = codepoint.as_str(), "stream event");
        Event {
            offset,
            depth,
            codepoint,
        }
    }

    fn in_moves(&mut self) -> Result<Option<Event>> {
        let offset = self.offset;
        let Some(&byte) = self.bytes.get(offset) else {
            if !self.stack.is_empty() {
                return Err(Error::UnclosedVariation {
                    open: self.stack.len(),
                });
            }
            return Ok(None);
        };
        self.offset += 1;

        let (depth, codepoint) = match byte {
            0 => return Err(Error::ReservedCode { offset, code: byte }),
            BC_VARIATION_START => {
                self.start_variation(offset)?;
                (self.stack.len(), Codepoint::VariationStart)
            }
            BC_VARIATION_END => {
                let depth = self.stack.len();
                self.end_variation(offset)?;
                (depth, Codepoint::VariationEnd)
            }
            BC_COMMENT_START => {
                self.state = State::InComment;
                self.comment = None;
                self.move_nbr_needed = true;
                (self.stack.len(), Codepoint::CommentStart)
            }
            BC_META_START => {
                self.state = State::InMeta;
                self.meta_reported = false;
                (self.stack.len(), Codepoint::MetaStart)
            }
            BC_ESCAPE => {
                self.state = State::AfterEscape;
                self.move_nbr_needed = true;
                (self.stack.len(), Codepoint::Escape)
            }
            BC_COMMENT_END | BC_META_END => return Err(Error::UnexpectedCode { offset, code: byte }),
            code => return self.step_move(offset, code).map(Some),
        };
        Ok(Some(self.event(offset, depth, codepoint)))
    }

    fn start_variation(&mut self, offset: usize) -> Result<()> {
        if self.stack.len() >= self.config.max_depth {
            return Err(Error::NestingTooDeep {
                offset,
                max_depth: self.config.max_depth,
            });
        }
        self.stack.push(Frame {
            saved: self.codec.position().clone(),
            before_last: self.before_last.clone(),
        });
        match self.before_last.take() {
            Some(before) => self.codec.set_position(before),
            None => self.codec.invalidate(),
        }
        self.move_nbr_needed = true;
        Ok(())
    }

    fn end_variation(&mut self, offset: usize) -> Result<()> {
        let frame = self
            .stack
            .pop()
            .ok_or(Error::UnbalancedVariation { offset })?;
        self.codec.set_position(frame.saved);
        self.before_last = frame.before_last;
        self.move_nbr_needed = true;
        Ok(())
    }

    /// Offset of the end code closing the span body that starts at `self.offset`.
    fn span_end(&self, end_code: u8) -> Result<usize> {
        for (i, &byte) in self.bytes[self.offset..].iter().enumerate() {
            let at = self.offset + i;
            if byte == end_code {
                return Ok(at);
            }
            if is_structural(byte) {
                return Err(Error::UnexpectedCode { offset: at, code: byte });
            }
        }
        Err(Error::Truncated {
            offset: self.bytes.len(),
        })
    }

    fn in_comment(&mut self) -> Result<Event> {
        let depth = self.stack.len();
        if self.comment.is_none() {
            let start = self.offset;
            let end = self.span_end(BC_COMMENT_END)?;
            let text = String::from_utf8_lossy(&self.bytes[start..end]).into_owned();
            self.offset = end;
            self.comment = Some(text.clone());
            if !text.is_empty() {
                return Ok(self.event(start, depth, Codepoint::CommentText { text }));
            }
        }
        let offset = self.offset;
        self.offset += 1;
        self.state = State::InMoves;
        self.move_nbr_needed = true;
        let text = self.comment.take().unwrap_or_default();
        Ok(self.event(offset, depth, Codepoint::CommentEnd { text }))
    }

    fn in_meta(&mut self) -> Result<Event> {
        let depth = self.stack.len();
        if !self.meta_reported {
            let start = self.offset;
            let end = self.span_end(BC_META_END)?;
            self.meta_reported = true;
            self.offset = end;
            if end > start {
                let bytes = self.bytes[start..end].to_vec();
                return Ok(self.event(start, depth, Codepoint::MetaData { bytes }));
            }
        }
        let offset = self.offset;
        self.offset += 1;
        self.state = State::InMoves;
        Ok(self.event(offset, depth, Codepoint::MetaEnd))
    }

    fn after_escape(&mut self) -> Result<Event> {
        let offset = self.offset;
        let &code = self
            .bytes
            .get(offset)
            .ok_or(Error::Truncated { offset })?;
        self.offset += 1;
        self.state = State::InMoves;
        Ok(self.event(offset, self.stack.len(), Codepoint::EscapeCode { code }))
    }

    fn step_move(&mut self, offset: usize, code: u8) -> Result<Event> {
        let before = self.codec.position().clone();
        let white = before.turn().is_white();
        let move_number = before.fullmoves().get();
        let decoded = self.codec.decode(code)?;
        let after = self.codec.position().clone();

        let san = match decoded.san {
            Some(mut san) => {
                let followed_by_move = self
                    .bytes
                    .get(self.offset)
                    .is_some_and(|&next| next >= FIRST_MOVE_CODE);
                if self.config.mate_upgrade && san.ends_with('+') && !followed_by_move && after.is_checkmate() {
                    san.pop();
                    san.push('#');
                }
                san
            }
            None => SanPlus::from_move(before.clone(), decoded.mv).to_string(),
        };

        let event = MoveEvent {
            mv: decoded.mv,
            san,
            before: before.clone(),
            after,
            move_number,
            white,
            move_nbr_needed: self.move_nbr_needed,
        };
        self.move_nbr_needed = false;
        self.pending = Some(before);
        self.state = State::AfterMove;
        Ok(self.event(offset, self.stack.len(), Codepoint::Move(Box::new(event))))
    }
}

impl<I: Instrument> Iterator for Stepper<'_, I> {
    type Item = Result<Event>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.advance() {
            Ok(Some(event)) => Some(Ok(event)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::writer::StreamWriter;
    use shakmaty::{fen::Fen, CastlingMode};

    fn position(fen: &str) -> Chess {
        let fen: Fen = fen.parse().unwrap();
        fen.into_position(CastlingMode::Standard).unwrap()
    }

    fn write(start: &Chess, build: impl FnOnce(&mut StreamWriter)) -> Vec<u8> {
        let mut writer = StreamWriter::new(start.clone(), &Config::default());
        build(&mut writer);
        writer.finish().unwrap()
    }

    fn events(bytes: &[u8], start: Chess) -> Vec<Event> {
        Stepper::new(bytes, start, &Config::default())
            .collect::<Result<Vec<_>>>()
            .unwrap()
    }

    fn sans(events: &[Event]) -> Vec<String> {
        events
            .iter()
            .filter_map(|e| e.codepoint.as_move())
            .map(|m| m.san.clone())
            .collect()
    }

    #[test]
    fn test_moves_and_numbers() {
        let start = Chess::default();
        let bytes = write(&start, |w| {
            w.push_san("e4").unwrap();
            w.push_san("e5").unwrap();
            w.push_san("Nf3").unwrap();
        });
        let events = events(&bytes, start);
        assert_eq!(sans(&events), ["e4", "e5", "Nf3"]);

        let moves: Vec<_> = events.iter().filter_map(|e| e.codepoint.as_move()).collect();
        assert!(moves[0].move_nbr_needed);
        assert!(!moves[1].move_nbr_needed);
        assert!(!moves[2].move_nbr_needed);
        assert_eq!(moves[1].number_prefix(), "1...");
        assert_eq!(moves[2].number_prefix(), "2.");
        assert_eq!(events[1].offset, 1);
    }

    #[test]
    fn test_variation_restores_positions() {
        // 1.e4 e5 (1...c5 2.Nf3) 2.Nf3
        let start = Chess::default();
        let bytes = write(&start, |w| {
            w.push_san("e4").unwrap();
            w.push_san("e5").unwrap();
            w.start_variation().unwrap();
            w.push_san("c5").unwrap();
            w.push_san("Nf3").unwrap();
            w.end_variation().unwrap();
            w.push_san("Nf3").unwrap();
        });
        let events = events(&bytes, start);
        assert_eq!(sans(&events), ["e4", "e5", "c5", "Nf3", "Nf3"]);

        let c5 = events[3].codepoint.as_move().unwrap();
        assert_eq!(events[3].depth, 1);
        assert!(c5.move_nbr_needed);
        assert_eq!(c5.number_prefix(), "1...");

        let last = events.last().unwrap();
        assert_eq!(last.depth, 0);
        let nf3 = last.codepoint.as_move().unwrap();
        assert!(nf3.move_nbr_needed);
        assert_eq!(nf3.before.board().piece_at(shakmaty::Square::E5).map(|p| p.role), Some(shakmaty::Role::Pawn));
    }

    #[test]
    fn test_sibling_variations() {
        // 1.e4 (1.d4) (1.c4 c5) e5
        let start = Chess::default();
        let bytes = write(&start, |w| {
            w.push_san("e4").unwrap();
            w.start_variation().unwrap();
            w.push_san("d4").unwrap();
            w.end_variation().unwrap();
            w.start_variation().unwrap();
            w.push_san("c4").unwrap();
            w.push_san("c5").unwrap();
            w.end_variation().unwrap();
            w.push_san("e5").unwrap();
        });
        assert_eq!(sans(&events(&bytes, start)), ["e4", "d4", "c4", "c5", "e5"]);
    }

    #[test]
    fn test_comment_events() {
        let start = Chess::default();
        let bytes = write(&start, |w| {
            w.push_san("e4").unwrap();
            w.comment("best by test");
            w.push_san("e5").unwrap();
        });
        let events = events(&bytes, start);
        let kinds: Vec<_> = events.iter().map(|e| e.codepoint.as_str()).collect();
        assert_eq!(kinds, ["move", "comment_start", "comment_text", "comment_end", "move"]);
        match &events[3].codepoint {
            Codepoint::CommentEnd { text } => assert_eq!(text, "best by test"),
            other => panic!("unexpected {:?}", other),
        }
        let e5 = events[4].codepoint.as_move().unwrap();
        assert!(e5.move_nbr_needed);
    }

    #[test]
    fn test_meta_and_nag() {
        let start = Chess::default();
        let bytes = write(&start, |w| {
            w.meta(b"clk 1:00").unwrap();
            w.push_san("d4").unwrap();
            w.nag(1).unwrap();
        });
        let events = events(&bytes, start);
        let kinds: Vec<_> = events.iter().map(|e| e.codepoint.as_str()).collect();
        assert_eq!(kinds, ["meta_start", "meta_data", "meta_end", "move", "escape", "escape_code"]);
        assert_eq!(events[5].codepoint.nag(), Some(1));
    }

    #[test]
    fn test_mate_upgrade() {
        let start = Chess::default();
        let bytes = write(&start, |w| {
            for san in ["f3", "e5", "g4", "Qh4#"] {
                w.push_san(san).unwrap();
            }
        });
        assert_eq!(sans(&events(&bytes, start.clone())), ["f3", "e5", "g4", "Qh4#"]);

        let config = Config {
            mate_upgrade: false,
            ..Config::default()
        };
        let plain: Vec<_> = Stepper::new(&bytes, start, &config)
            .filter_map(|e| e.unwrap().codepoint.as_move().map(|m| m.san.clone()))
            .collect();
        assert_eq!(plain.last().unwrap(), "Qh4+");
    }

    #[test]
    fn test_slow_path_san() {
        let start = position("4k3/8/8/8/8/8/8/RR2K2R w - - 0 1");
        let bytes = write(&start, |w| {
            w.push_san("Rb8+").unwrap();
            w.push_san("Kd7").unwrap();
        });
        assert_eq!(sans(&events(&bytes, start)), ["Rb8+", "Kd7"]);
    }

    fn first_error(bytes: &[u8]) -> Error {
        Stepper::new(bytes, Chess::default(), &Config::default())
            .find_map(|e| e.err())
            .unwrap()
    }

    #[test]
    fn test_structural_errors() {
        assert!(matches!(
            first_error(&[BC_VARIATION_END]),
            Error::UnbalancedVariation { offset: 0 }
        ));
        assert!(matches!(
            first_error(&[0xC0, BC_VARIATION_START]),
            Error::UnclosedVariation { open: 1 }
        ));
        assert!(matches!(first_error(&[0]), Error::ReservedCode { offset: 0, code: 0 }));
        assert!(matches!(first_error(&[BC_COMMENT_START, b'x']), Error::Truncated { .. }));
        assert!(matches!(first_error(&[BC_ESCAPE]), Error::Truncated { offset: 1 }));
        assert!(matches!(
            first_error(&[BC_META_END]),
            Error::UnexpectedCode { offset: 0, code: BC_META_END }
        ));
        assert!(matches!(first_error(&[0x08]), Error::InvalidCode { .. } | Error::IllegalMove(_)));
    }

    #[test]
    fn test_nesting_limit_and_fuse() {
        let config = Config {
            max_depth: 2,
            ..Config::default()
        };
        let bytes = [0xC0, 1, 1, 1, 2, 2, 2];
        let mut stepper = Stepper::new(&bytes, Chess::default(), &config);
        let results: Vec<_> = stepper.by_ref().collect();
        assert_eq!(results.len(), 4);
        assert!(matches!(
            results[3],
            Err(Error::NestingTooDeep { offset: 3, max_depth: 2 })
        ));
        assert!(stepper.next().is_none());
    }
}
