//! Structural edits on byte streams.
//!
//! Spans are balanced byte ranges, so editing a game means slicing and
//! splicing bytes. Move bytes never need re-encoding: a move's code depends
//! only on the position it is played from, and every edit here keeps each
//! move in front of the same position.

use shakmaty::{Chess, Move};

use crate::config::Config;
use crate::error::{Error, Result};

use super::stepper::Stepper;
use super::types::Codepoint;
use super::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Move,
    VariationStart,
    VariationEnd,
    Comment,
    Meta,
    Escape,
}

/// A lexical unit of the stream; `end` is exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
}

impl Token {
    pub fn bytes<'a>(&self, stream: &'a [u8]) -> &'a [u8] {
        &stream[self.start..self.end]
    }
}

/// Splits a stream into tokens without decoding any move.
pub fn tokens(bytes: &[u8]) -> Result<Vec<Token>> {
    let mut out = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let start = i;
        let kind = match bytes[i] {
            0 => return Err(Error::ReservedCode { offset: i, code: 0 }),
            BC_VARIATION_START => TokenKind::VariationStart,
            BC_VARIATION_END => TokenKind::VariationEnd,
            BC_COMMENT_START | BC_META_START => {
                i = skip_over(bytes, i)? - 1;
                if bytes[start] == BC_COMMENT_START {
                    TokenKind::Comment
                } else {
                    TokenKind::Meta
                }
            }
            BC_ESCAPE => {
                if i + 1 >= bytes.len() {
                    return Err(Error::Truncated { offset: i + 1 });
                }
                i += 1;
                TokenKind::Escape
            }
            code @ (BC_COMMENT_END | BC_META_END) => {
                return Err(Error::UnexpectedCode { offset: i, code })
            }
            _ => TokenKind::Move,
        };
        i += 1;
        out.push(Token {
            kind,
            start,
            end: i,
        });
    }
    Ok(out)
}

/// Given the offset of a variation, comment or meta start code, returns the
/// offset just past its matching end code.
pub fn skip_over(bytes: &[u8], offset: usize) -> Result<usize> {
    let start_code = *bytes.get(offset).ok_or(Error::InvalidSpan(offset))?;
    let end_code = match start_code {
        BC_VARIATION_START => BC_VARIATION_END,
        BC_COMMENT_START => BC_COMMENT_END,
        BC_META_START => BC_META_END,
        _ => return Err(Error::InvalidSpan(offset)),
    };
    let mut depth = 1usize;
    let mut i = offset + 1;
    while i < bytes.len() {
        let byte = bytes[i];
        if byte == BC_ESCAPE {
            i += 2;
            continue;
        }
        if byte == start_code {
            depth += 1;
        } else if byte == end_code {
            depth -= 1;
            if depth == 0 {
                return Ok(i + 1);
            }
        }
        i += 1;
    }
    Err(Error::Truncated { offset: bytes.len() })
}

/// Text of the comment starting at `offset`.
pub fn comment_at(bytes: &[u8], offset: usize) -> Result<String> {
    if bytes.get(offset) != Some(&BC_COMMENT_START) {
        return Err(Error::InvalidSpan(offset));
    }
    let end = skip_over(bytes, offset)?;
    Ok(String::from_utf8_lossy(&bytes[offset + 1..end - 1]).into_owned())
}

/// Depth of every token. Variation codes count as part of the enclosing line.
fn levels(tokens: &[Token]) -> Result<Vec<usize>> {
    let mut depth = 0usize;
    let mut out = Vec::with_capacity(tokens.len());
    for token in tokens {
        match token.kind {
            TokenKind::VariationStart => {
                out.push(depth);
                depth += 1;
            }
            TokenKind::VariationEnd => {
                depth = depth
                    .checked_sub(1)
                    .ok_or(Error::UnbalancedVariation { offset: token.start })?;
                out.push(depth);
            }
            _ => out.push(depth),
        }
    }
    if depth > 0 {
        return Err(Error::UnclosedVariation { open: depth });
    }
    Ok(out)
}

/// Number of moves of the enclosing line that come before `offset`.
pub fn variation_idx(bytes: &[u8], offset: usize) -> Result<usize> {
    if offset > bytes.len() {
        return Err(Error::InvalidSpan(offset));
    }
    let mut counts = vec![0usize];
    for token in tokens(bytes)? {
        if token.start >= offset {
            break;
        }
        match token.kind {
            TokenKind::Move => {
                if let Some(count) = counts.last_mut() {
                    *count += 1;
                }
            }
            TokenKind::VariationStart => counts.push(0),
            TokenKind::VariationEnd => {
                if counts.len() > 1 {
                    counts.pop();
                } else {
                    return Err(Error::UnbalancedVariation { offset: token.start });
                }
            }
            _ => {}
        }
    }
    Ok(counts.last().copied().unwrap_or(0))
}

/// The main line with every variation removed. Annotations of the main
/// line are kept.
pub fn mainline(bytes: &[u8]) -> Result<Vec<u8>> {
    let tokens = tokens(bytes)?;
    let levels = levels(&tokens)?;
    let mut out = Vec::with_capacity(bytes.len());
    for (token, &level) in tokens.iter().zip(&levels) {
        let structural = matches!(token.kind, TokenKind::VariationStart | TokenKind::VariationEnd);
        if level == 0 && !structural {
            out.extend_from_slice(token.bytes(bytes));
        }
    }
    Ok(out)
}

/// Where an offset sits in the game tree.
#[derive(Debug, Clone)]
pub struct Location {
    pub offset: usize,
    pub depth: usize,
    /// Position before the byte at `offset` is applied.
    pub position: Chess,
    /// Moves leading from the start position to `position`.
    pub path: Vec<Move>,
}

pub fn locate(bytes: &[u8], start: &Chess, config: &Config, offset: usize) -> Result<Location> {
    if offset > bytes.len() {
        return Err(Error::InvalidSpan(offset));
    }
    let mut stepper = Stepper::new(bytes, start.clone(), config);
    let mut position = start.clone();
    let mut depth = 0;
    let mut path = Vec::new();
    let mut saved_paths: Vec<Vec<Move>> = Vec::new();

    while let Some(event) = stepper.next() {
        let event = event?;
        if event.offset >= offset {
            break;
        }
        match &event.codepoint {
            Codepoint::Move(m) => path.push(m.mv),
            Codepoint::VariationStart => {
                saved_paths.push(path.clone());
                path.pop();
            }
            Codepoint::VariationEnd => {
                path = saved_paths.pop().unwrap_or_default();
            }
            _ => {}
        }
        position = stepper.position().clone();
        depth = stepper.depth();
    }

    Ok(Location {
        offset,
        depth,
        position,
        path,
    })
}

/// Offsets at which new tokens may be spliced in.
fn check_boundary(tokens: &[Token], len: usize, offset: usize) -> Result<()> {
    if offset == len || tokens.iter().any(|t| t.start == offset) {
        Ok(())
    } else {
        Err(Error::InvalidSpan(offset))
    }
}

fn splice(bytes: &[u8], offset: usize, insert: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len() + insert.len());
    out.extend_from_slice(&bytes[..offset]);
    out.extend_from_slice(insert);
    out.extend_from_slice(&bytes[offset..]);
    out
}

/// Inserts a comment at a token boundary. Text directly after an existing
/// comment is merged into it.
pub fn insert_comment(bytes: &[u8], offset: usize, text: &str) -> Result<Vec<u8>> {
    let tokens = tokens(bytes)?;
    check_boundary(&tokens, bytes.len(), offset)?;
    let cleaned = clean_comment(text.trim());
    if cleaned.is_empty() {
        return Ok(bytes.to_vec());
    }
    let before = tokens
        .iter()
        .find(|t| t.end == offset && t.kind == TokenKind::Comment);
    match before {
        Some(comment) => {
            let mut insert = vec![b' '];
            insert.extend_from_slice(&cleaned);
            Ok(splice(bytes, comment.end - 1, &insert))
        }
        None => {
            let mut insert = vec![BC_COMMENT_START];
            insert.extend_from_slice(&cleaned);
            insert.push(BC_COMMENT_END);
            Ok(splice(bytes, offset, &insert))
        }
    }
}

pub fn insert_nag(bytes: &[u8], offset: usize, nag: u16) -> Result<Vec<u8>> {
    let tokens = tokens(bytes)?;
    check_boundary(&tokens, bytes.len(), offset)?;
    if nag > writer::MAX_NAG {
        return Err(Error::InvalidNag(nag));
    }
    Ok(splice(bytes, offset, &[BC_ESCAPE, NAG_BASE + nag as u8]))
}

/// Swaps the variation starting at `offset` with the move it is an
/// alternative to. The variation's first move takes the place of that move
/// in the enclosing line, and the replaced move, together with the rest of
/// its line and any sibling variations, becomes a variation after it.
pub fn promote_variation(bytes: &[u8], offset: usize) -> Result<Vec<u8>> {
    let tokens = tokens(bytes)?;
    let levels = levels(&tokens)?;
    let vi = tokens
        .iter()
        .position(|t| t.start == offset && t.kind == TokenKind::VariationStart)
        .ok_or(Error::InvalidSpan(offset))?;
    let d = levels[vi];

    let ve = (vi + 1..tokens.len())
        .find(|&j| tokens[j].kind == TokenKind::VariationEnd && levels[j] == d)
        .ok_or(Error::InvalidSpan(offset))?;

    // the move this variation replaces
    let mut m = None;
    for j in (0..vi).rev() {
        if levels[j] < d {
            break;
        }
        if levels[j] == d && tokens[j].kind == TokenKind::Move {
            m = Some(j);
            break;
        }
    }
    let m = m.ok_or(Error::InvalidSpan(offset))?;

    let first_var = (m + 1..=vi)
        .find(|&j| tokens[j].kind == TokenKind::VariationStart && levels[j] == d)
        .unwrap_or(vi);

    // next move of the line, and where the line ends
    let mut group_end = None;
    let mut line_end = bytes.len();
    for j in ve + 1..tokens.len() {
        if levels[j] < d {
            line_end = tokens[j].start;
            break;
        }
        if group_end.is_none() && levels[j] == d && tokens[j].kind == TokenKind::Move {
            group_end = Some(tokens[j].start);
        }
    }
    let group_end = group_end.unwrap_or(line_end);

    let head = (vi + 1..ve)
        .find(|&j| tokens[j].kind == TokenKind::Move && levels[j] == d + 1)
        .ok_or(Error::InvalidSpan(offset))?;

    let v_start = tokens[vi].start;
    let v_end = tokens[ve].end;
    let head_end = tokens[head].end;

    let mut out = Vec::with_capacity(bytes.len());
    out.extend_from_slice(&bytes[..tokens[m].start]);
    out.extend_from_slice(&bytes[v_start + 1..head_end]);
    out.push(BC_VARIATION_START);
    out.extend_from_slice(&bytes[tokens[m].start..tokens[first_var].start]);
    out.extend_from_slice(&bytes[tokens[first_var].start..v_start]);
    out.extend_from_slice(&bytes[v_end..group_end]);
    out.extend_from_slice(&bytes[group_end..line_end]);
    out.push(BC_VARIATION_END);
    out.extend_from_slice(&bytes[head_end..v_end - 1]);
    out.extend_from_slice(&bytes[line_end..]);
    Ok(out)
}
