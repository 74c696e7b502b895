//! Builds well-formed byte streams.
//!
//! The writer tracks positions exactly as [`Stepper`](super::Stepper) does
//! when reading, so every move byte it emits decodes back to the same move.

use shakmaty::{san::SanPlus, Chess, Move};

use crate::codec::Codec;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::stats::{Instrument, NoInstrument};

use super::*;

/// Highest NAG that fits an escaped byte.
pub const MAX_NAG: u16 = 255 - NAG_BASE as u16;

#[derive(Debug, Clone)]
struct Frame {
    saved: Chess,
    before_last: Option<Chess>,
}

#[derive(Debug)]
pub struct StreamWriter<I: Instrument = NoInstrument> {
    bytes: Vec<u8>,
    codec: Codec<I>,
    max_depth: usize,
    stack: Vec<Frame>,
    before_last: Option<Chess>,
    /// The last bytes written are a complete comment.
    after_comment: bool,
}

impl StreamWriter {
    pub fn new(start: Chess, config: &Config) -> Self {
        StreamWriter::with_codec(Codec::new(start), config)
    }
}

impl<I: Instrument> StreamWriter<I> {
    pub fn with_codec(codec: Codec<I>, config: &Config) -> Self {
        StreamWriter {
            bytes: Vec::new(),
            codec,
            max_depth: config.max_depth,
            stack: Vec::new(),
            before_last: None,
            after_comment: false,
        }
    }

    /// Position the next move is played from.
    pub fn position(&self) -> &Chess {
        self.codec.position()
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn codec(&self) -> &Codec<I> {
        &self.codec
    }

    pub fn push_move(&mut self, mv: Move) -> Result<u8> {
        let before = self.codec.position().clone();
        let code = self.codec.compress_move(mv)?;
        self.bytes.push(code);
        self.before_last = Some(before);
        self.after_comment = false;
        Ok(code)
    }

    /// Parses and plays a SAN move such as `Nf3` or `exd8=Q+`.
    pub fn push_san(&mut self, san: &str) -> Result<u8> {
        let parsed: SanPlus = san
            .parse()
            .map_err(|_| Error::IllegalMove(san.to_string()))?;
        let mv = parsed
            .san
            .to_move(self.codec.position())
            .map_err(|_| Error::IllegalMove(san.to_string()))?;
        self.push_move(mv)
    }

    /// Opens an alternative to the last move of the current line.
    pub fn start_variation(&mut self) -> Result<()> {
        if self.stack.len() >= self.max_depth {
            return Err(Error::NestingTooDeep {
                offset: self.bytes.len(),
                max_depth: self.max_depth,
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
        self.bytes.push(BC_VARIATION_START);
        self.after_comment = false;
        Ok(())
    }

    pub fn end_variation(&mut self) -> Result<()> {
        let frame = self.stack.pop().ok_or(Error::UnbalancedVariation {
            offset: self.bytes.len(),
        })?;
        self.codec.set_position(frame.saved);
        self.before_last = frame.before_last;
        self.bytes.push(BC_VARIATION_END);
        self.after_comment = false;
        Ok(())
    }

    /// Appends a comment. A comment directly after another one is merged
    /// into it, separated by a space. Empty text writes nothing.
    pub fn comment(&mut self, text: &str) {
        let cleaned = clean_comment(text.trim());
        if cleaned.is_empty() {
            return;
        }
        if self.after_comment {
            self.bytes.pop();
            self.bytes.push(b' ');
        } else {
            self.bytes.push(BC_COMMENT_START);
        }
        self.bytes.extend_from_slice(&cleaned);
        self.bytes.push(BC_COMMENT_END);
        self.after_comment = true;
    }

    pub fn nag(&mut self, nag: u16) -> Result<()> {
        if nag > MAX_NAG {
            return Err(Error::InvalidNag(nag));
        }
        self.bytes.push(BC_ESCAPE);
        self.bytes.push(NAG_BASE + nag as u8);
        self.after_comment = false;
        Ok(())
    }

    /// Appends opaque meta data. Bytes below 8 are not allowed.
    pub fn meta(&mut self, data: &[u8]) -> Result<()> {
        if let Some(&byte) = data.iter().find(|&&b| b < NAG_BASE) {
            return Err(Error::ReservedByte(byte));
        }
        self.bytes.push(BC_META_START);
        self.bytes.extend_from_slice(data);
        self.bytes.push(BC_META_END);
        self.after_comment = false;
        Ok(())
    }

    /// Ends every open variation.
    pub fn close_all(&mut self) {
        while !self.stack.is_empty() {
            // cannot fail while the stack is non-empty
            let _ = self.end_variation();
        }
    }

    pub fn finish(self) -> Result<Vec<u8>> {
        if !self.stack.is_empty() {
            return Err(Error::UnclosedVariation {
                open: self.stack.len(),
            });
        }
        Ok(self.bytes)
    }
}
