//! PGN file parsing into byte streams

use pgn_reader::{Nag, RawComment, RawTag, SanPlus, Skip, Visitor};
use shakmaty::Chess;
use std::fs;
use std::io::{self, Cursor};
use std::ops::ControlFlow;
use std::path::Path;
use tracing::{debug, warn};

use crate::config::Config;
use crate::stream::{self, StreamWriter, TokenKind};

/// A parsed game with its movetext compressed to a byte stream
#[derive(Debug, Clone)]
pub struct EncodedGame {
    pub event: Option<String>,
    pub site: Option<String>,
    pub date: Option<String>,
    pub round: Option<String>,
    pub white: Option<String>,
    pub black: Option<String>,
    pub result: Option<String>,
    pub white_elo: Option<u16>,
    pub black_elo: Option<u16>,
    pub fen: Option<String>,
    pub start: Chess,
    pub bytecode: Vec<u8>,
    /// False when an illegal move stopped encoding; the unread movetext is
    /// then kept as a trailing comment.
    pub complete: bool,
}

impl EncodedGame {
    /// Number of main line moves.
    pub fn move_count(&self) -> usize {
        stream::mainline(&self.bytecode)
            .and_then(|main| stream::tokens(&main))
            .map(|tokens| tokens.iter().filter(|t| t.kind == TokenKind::Move).count())
            .unwrap_or(0)
    }

    pub fn summary(&self) -> String {
        let white = self.white.as_deref().unwrap_or("Unknown");
        let black = self.black.as_deref().unwrap_or("Unknown");
        let result = self.result.as_deref().unwrap_or("*");
        format!("{} vs {} - {}", white, black, result)
    }

    /// Position at the end of the main line.
    pub fn final_position(&self, config: &Config) -> crate::Result<Chess> {
        let main = stream::mainline(&self.bytecode)?;
        let location = stream::locate(&main, &self.start, config, main.len())?;
        Ok(location.position)
    }

    /// Tag pairs followed by movetext.
    pub fn to_pgn(&self, config: &Config) -> crate::Result<String> {
        let mut out = String::new();
        let roster = [
            ("Event", self.event.clone().or(Some("?".to_string()))),
            ("Site", self.site.clone().or(Some("?".to_string()))),
            ("Date", self.date.clone().or(Some("????.??.??".to_string()))),
            ("Round", self.round.clone().or(Some("?".to_string()))),
            ("White", self.white.clone().or(Some("?".to_string()))),
            ("Black", self.black.clone().or(Some("?".to_string()))),
            ("Result", Some(self.result.clone().unwrap_or_else(|| "*".to_string()))),
            ("WhiteElo", self.white_elo.map(|e| e.to_string())),
            ("BlackElo", self.black_elo.map(|e| e.to_string())),
            ("SetUp", self.fen.as_ref().map(|_| "1".to_string())),
            ("FEN", self.fen.clone()),
        ];
        for (name, value) in roster {
            if let Some(value) = value {
                out.push_str(&format!("[{} \"{}\"]\n", name, value.replace('"', "\\\"")));
            }
        }
        out.push('\n');
        out.push_str(&stream::to_pgn(&self.bytecode, &self.start, config, self.result.as_deref())?);
        out.push('\n');
        Ok(out)
    }
}

#[derive(Default)]
struct GameTags {
    event: Option<String>,
    site: Option<String>,
    date: Option<String>,
    round: Option<String>,
    white: Option<String>,
    black: Option<String>,
    result: Option<String>,
    white_elo: Option<u16>,
    black_elo: Option<u16>,
    fen: Option<String>,
}

struct GameMoves {
    tags: GameTags,
    start: Chess,
    writer: StreamWriter,
    /// Movetext left over after the first move that could not be encoded.
    rest: Option<Vec<String>>,
}

impl GameMoves {
    fn stop(&mut self, word: String) {
        debug!(word = %word, "stopped encoding movetext");
        self.rest = Some(vec![word]);
    }
}

struct GameParser {
    config: Config,
}

impl Visitor for GameParser {
    type Tags = GameTags;
    type Movetext = GameMoves;
    type Output = Option<EncodedGame>;

    fn begin_tags(&mut self) -> ControlFlow<Self::Output, Self::Tags> {
        ControlFlow::Continue(GameTags::default())
    }

    fn tag(
        &mut self,
        tags: &mut Self::Tags,
        name: &[u8],
        value: RawTag<'_>,
    ) -> ControlFlow<Self::Output> {
        let name_str = String::from_utf8_lossy(name);
        let value_str = value.decode_utf8_lossy().to_string();

        match name_str.as_ref() {
            "Event" => tags.event = Some(value_str),
            "Site" => tags.site = Some(value_str),
            "Date" => tags.date = Some(value_str),
            "Round" => tags.round = Some(value_str),
            "White" => tags.white = Some(value_str),
            "Black" => tags.black = Some(value_str),
            "Result" => tags.result = Some(value_str),
            "WhiteElo" => tags.white_elo = value_str.parse().ok(),
            "BlackElo" => tags.black_elo = value_str.parse().ok(),
            "FEN" => tags.fen = Some(value_str),
            _ => {}
        }

        ControlFlow::Continue(())
    }

    fn begin_movetext(&mut self, tags: Self::Tags) -> ControlFlow<Self::Output, Self::Movetext> {
        let start = match tags.fen.as_deref().map(start_position) {
            None => Chess::default(),
            Some(Ok(position)) => position,
            Some(Err(e)) => {
                warn!(error = %e, "skipping game with unusable FEN");
                return ControlFlow::Break(None);
            }
        };
        ControlFlow::Continue(GameMoves {
            tags,
            writer: StreamWriter::new(start.clone(), &self.config),
            start,
            rest: None,
        })
    }

    fn san(&mut self, movetext: &mut Self::Movetext, san: SanPlus) -> ControlFlow<Self::Output> {
        if let Some(rest) = movetext.rest.as_mut() {
            rest.push(san.to_string());
            return ControlFlow::Continue(());
        }

        let pushed = san
            .san
            .to_move(movetext.writer.position())
            .map_err(|_| crate::Error::IllegalMove(san.to_string()))
            .and_then(|m| movetext.writer.push_move(m));
        if pushed.is_err() {
            movetext.stop(san.to_string());
        }

        ControlFlow::Continue(())
    }

    fn nag(&mut self, movetext: &mut Self::Movetext, nag: Nag) -> ControlFlow<Self::Output> {
        match movetext.rest.as_mut() {
            Some(rest) => rest.push(format!("${}", nag.0)),
            None => {
                if let Err(e) = movetext.writer.nag(u16::from(nag.0)) {
                    debug!(error = %e, "dropping NAG");
                }
            }
        }
        ControlFlow::Continue(())
    }

    fn comment(&mut self, movetext: &mut Self::Movetext, comment: RawComment<'_>) -> ControlFlow<Self::Output> {
        let text = String::from_utf8_lossy(comment.as_bytes());
        match movetext.rest.as_mut() {
            Some(rest) => rest.push(format!("{{{}}}", text.trim())),
            None => movetext.writer.comment(&text),
        }
        ControlFlow::Continue(())
    }

    fn begin_variation(
        &mut self,
        movetext: &mut Self::Movetext,
    ) -> ControlFlow<Self::Output, Skip> {
        match movetext.rest.as_mut() {
            Some(rest) => rest.push("(".to_string()),
            None => {
                if movetext.writer.start_variation().is_err() {
                    movetext.stop("(".to_string());
                }
            }
        }
        ControlFlow::Continue(Skip(false))
    }

    fn end_variation(&mut self, movetext: &mut Self::Movetext) -> ControlFlow<Self::Output> {
        match movetext.rest.as_mut() {
            Some(rest) => rest.push(")".to_string()),
            None => {
                if movetext.writer.end_variation().is_err() {
                    movetext.stop(")".to_string());
                }
            }
        }
        ControlFlow::Continue(())
    }

    fn end_game(&mut self, movetext: Self::Movetext) -> Self::Output {
        let GameMoves {
            tags,
            start,
            mut writer,
            rest,
        } = movetext;
        writer.close_all();
        let complete = rest.is_none();
        if let Some(rest) = rest {
            writer.comment(&rest.join(" "));
        }
        let bytecode = writer.finish().ok()?;

        Some(EncodedGame {
            event: tags.event,
            site: tags.site,
            date: tags.date,
            round: tags.round,
            white: tags.white,
            black: tags.black,
            result: tags.result,
            white_elo: tags.white_elo,
            black_elo: tags.black_elo,
            fen: tags.fen,
            start,
            bytecode,
            complete,
        })
    }
}

fn start_position(fen: &str) -> Result<Chess, PgnError> {
    crate::position_from_fen(fen).map_err(|e| PgnError::ParseError(e.to_string()))
}

#[derive(Debug)]
pub enum PgnError {
    FileError(io::Error),
    NoGamesFound,
    ParseError(String),
}

impl std::fmt::Display for PgnError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PgnError::FileError(e) => write!(f, "File error: {}", e),
            PgnError::NoGamesFound => write!(f, "No valid games found in PGN"),
            PgnError::ParseError(s) => write!(f, "Parse error: {}", s),
        }
    }
}

impl std::error::Error for PgnError {}

impl From<io::Error> for PgnError {
    fn from(error: io::Error) -> Self {
        PgnError::FileError(error)
    }
}

impl From<PgnError> for crate::Error {
    fn from(error: PgnError) -> Self {
        match error {
            PgnError::FileError(e) => crate::Error::Io(e),
            other => crate::Error::Pgn(other.to_string()),
        }
    }
}

pub fn parse_pgn_file<P: AsRef<Path>>(path: P) -> Result<Vec<EncodedGame>, PgnError> {
    let contents = fs::read_to_string(path)?;
    parse_pgn_string(&contents)
}

pub fn parse_pgn_string(pgn: &str) -> Result<Vec<EncodedGame>, PgnError> {
    parse_pgn_string_with(pgn, &Config::default())
}

pub fn parse_pgn_string_with(pgn: &str, config: &Config) -> Result<Vec<EncodedGame>, PgnError> {
    let mut parser = GameParser {
        config: config.clone(),
    };
    let mut games: Vec<EncodedGame> = Vec::new();

    let cursor = Cursor::new(pgn.as_bytes());
    let mut reader = pgn_reader::Reader::new(cursor);

    loop {
        match reader.read_game(&mut parser) {
            Ok(Some(maybe_game)) => {
                if let Some(game) = maybe_game {
                    games.push(game);
                }
            }
            Ok(None) => break,
            Err(e) => return Err(PgnError::ParseError(e.to_string())),
        }
    }

    if games.is_empty() {
        Err(PgnError::NoGamesFound)
    } else {
        Ok(games)
    }
}
