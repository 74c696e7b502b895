//! Renders byte streams as PGN movetext or as an event listing

use std::fmt;

use shakmaty::Chess;

use crate::config::Config;
use crate::error::Result;

use super::stepper::Stepper;
use super::types::{Codepoint, EventSummary};

/// Movetext words; a glued word follows the previous one without a space.
#[derive(Default)]
struct Movetext {
    words: Vec<(String, bool)>,
    glue_next: bool,
}

impl Movetext {
    fn push(&mut self, text: String) {
        self.words.push((text, self.glue_next));
        self.glue_next = false;
    }

    fn push_glued(&mut self, text: String) {
        self.words.push((text, true));
        self.glue_next = false;
    }

    fn comment(&mut self, text: &str) {
        let text = text.replace('}', ")");
        let parts: Vec<&str> = text.split_whitespace().collect();
        if parts.is_empty() {
            self.push("{}".to_string());
            return;
        }
        let last = parts.len() - 1;
        for (i, part) in parts.iter().enumerate() {
            let open = if i == 0 { "{" } else { "" };
            let close = if i == last { "}" } else { "" };
            self.push(format!("{}{}{}", open, part, close));
        }
    }

    fn wrap(&self, column: usize) -> String {
        let mut out = String::new();
        let mut line_len = 0;
        for (text, glued) in &self.words {
            if line_len == 0 {
                out.push_str(text);
                line_len = text.len();
            } else if *glued {
                out.push_str(text);
                line_len += text.len();
            } else if line_len + 1 + text.len() > column {
                out.push('\n');
                out.push_str(text);
                line_len = text.len();
            } else {
                out.push(' ');
                out.push_str(text);
                line_len += 1 + text.len();
            }
        }
        out
    }
}

/// PGN movetext for a stream, terminated by `result` (`*` when None).
pub fn to_pgn(bytes: &[u8], start: &Chess, config: &Config, result: Option<&str>) -> Result<String> {
    let mut movetext = Movetext::default();
    for event in Stepper::new(bytes, start.clone(), config) {
        match event?.codepoint {
            Codepoint::Move(m) => {
                if m.white || m.move_nbr_needed {
                    movetext.push(m.number_prefix());
                }
                movetext.push(m.san);
            }
            Codepoint::VariationStart => {
                movetext.push("(".to_string());
                movetext.glue_next = true;
            }
            Codepoint::VariationEnd => movetext.push_glued(")".to_string()),
            Codepoint::CommentEnd { text } => movetext.comment(&text),
            codepoint @ Codepoint::EscapeCode { .. } => {
                if let Some(nag) = codepoint.nag() {
                    movetext.push(format!("${}", nag));
                }
            }
            _ => {}
        }
    }
    movetext.push(result.unwrap_or("*").to_string());
    Ok(movetext.wrap(config.wrap_column))
}

impl fmt::Display for EventSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>6} {}{}", self.offset, "  ".repeat(self.depth), self.kind)?;
        if let Some(detail) = &self.detail {
            write!(f, " {}", detail)?;
        }
        Ok(())
    }
}

/// One summary per event, in stream order.
pub fn dump(bytes: &[u8], start: &Chess, config: &Config) -> Result<Vec<EventSummary>> {
    Stepper::new(bytes, start.clone(), config)
        .map(|event| event.map(|e| EventSummary::from(&e)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::writer::StreamWriter;

    fn sample() -> Vec<u8> {
        // 1.e4 e5 {solid} 2.Nf3 (2.f4 exf4) 2...Nc6 $1
        let mut w = StreamWriter::new(Chess::default(), &Config::default());
        w.push_san("e4").unwrap();
        w.push_san("e5").unwrap();
        w.comment("solid");
        w.push_san("Nf3").unwrap();
        w.start_variation().unwrap();
        w.push_san("f4").unwrap();
        w.push_san("exf4").unwrap();
        w.end_variation().unwrap();
        w.push_san("Nc6").unwrap();
        w.nag(1).unwrap();
        w.finish().unwrap()
    }

    #[test]
    fn test_movetext() {
        let pgn = to_pgn(&sample(), &Chess::default(), &Config::default(), Some("1-0")).unwrap();
        assert_eq!(pgn, "1. e4 e5 {solid} 2. Nf3 (2. f4 exf4) 2... Nc6 $1 1-0");
    }

    #[test]
    fn test_wrapping() {
        let config = Config {
            wrap_column: 20,
            ..Config::default()
        };
        let pgn = to_pgn(&sample(), &Chess::default(), &config, None).unwrap();
        assert!(pgn.lines().all(|l| l.len() <= 20), "{}", pgn);
        assert!(pgn.lines().count() > 1);
        assert!(pgn.ends_with('*'));
        assert_eq!(pgn.replace('\n', " "), "1. e4 e5 {solid} 2. Nf3 (2. f4 exf4) 2... Nc6 $1 *");
    }

    #[test]
    fn test_dump() {
        let summaries = dump(&sample(), &Chess::default(), &Config::default()).unwrap();
        assert_eq!(summaries[0].to_string(), "     0 move 1.e4");
        let variation_move = summaries.iter().find(|s| s.detail.as_deref() == Some("2.f4")).unwrap();
        assert_eq!(variation_move.depth, 1);
        assert_eq!(summaries.last().unwrap().kind, "escape_code");
    }
}
