use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use shakmaty::Chess;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use chess_bytecode_core::parser::{parse_pgn_file, parse_pgn_string_with, EncodedGame};
use chess_bytecode_core::stream::{self, Stepper};
use chess_bytecode_core::{position_from_fen, Codec, CodecStats, Config, SlowIndexPolicy};

#[derive(Parser)]
#[command(name = "chess-bytecode", version, about = "One byte per chess move")]
struct Cli {
    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log filter, e.g. `debug` or `chess_bytecode_core=trace`
    #[arg(long, global = true, default_value = "warn")]
    log: String,

    /// Wrap PGN movetext at this column
    #[arg(long, global = true)]
    wrap_column: Option<usize>,

    /// Reject slow codes that index past the legal move list
    #[arg(long, global = true)]
    strict: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Encode every game of a PGN file
    Encode {
        pgn: PathBuf,
        /// One JSON object per game instead of text
        #[arg(long)]
        json: bool,
    },
    /// Decode a hex byte stream to PGN movetext
    Decode {
        hex: String,
        #[arg(long)]
        fen: Option<String>,
        #[arg(long)]
        result: Option<String>,
    },
    /// List the events of a hex byte stream
    Dump {
        hex: String,
        #[arg(long)]
        fen: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Encode, decode and re-encode every game of a PGN file
    Roundtrip { pgn: PathBuf },
}

#[derive(Serialize)]
struct EncodedRecord<'a> {
    summary: String,
    white: Option<&'a str>,
    black: Option<&'a str>,
    result: Option<&'a str>,
    fen: Option<&'a str>,
    moves: usize,
    complete: bool,
    bytecode: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&cli.log).unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(&cli)?;
    debug!(?config, "configuration");

    match cli.command {
        Command::Encode { pgn, json } => encode(&pgn, json),
        Command::Decode { hex, fen, result } => decode(&hex, fen.as_deref(), result.as_deref(), &config),
        Command::Dump { hex, fen, json } => dump(&hex, fen.as_deref(), json, &config),
        Command::Roundtrip { pgn } => roundtrip(&pgn, &config),
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::from_json_file(path)
            .with_context(|| format!("reading config {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(column) = cli.wrap_column {
        config.wrap_column = column;
    }
    if cli.strict {
        config.slow_index_policy = SlowIndexPolicy::Reject;
    }
    Ok(config)
}

fn start_position(fen: Option<&str>) -> Result<Chess> {
    match fen {
        Some(fen) => Ok(position_from_fen(fen)?),
        None => Ok(Chess::default()),
    }
}

fn read_games(path: &Path) -> Result<Vec<EncodedGame>> {
    let games = parse_pgn_file(path).with_context(|| format!("parsing {}", path.display()))?;
    info!(games = games.len(), path = %path.display(), "parsed PGN");
    Ok(games)
}

fn encode(path: &Path, json: bool) -> Result<()> {
    for game in read_games(path)? {
        if json {
            let record = EncodedRecord {
                summary: game.summary(),
                white: game.white.as_deref(),
                black: game.black.as_deref(),
                result: game.result.as_deref(),
                fen: game.fen.as_deref(),
                moves: game.move_count(),
                complete: game.complete,
                bytecode: hex::encode(&game.bytecode),
            };
            println!("{}", serde_json::to_string(&record)?);
        } else {
            let marker = if game.complete { "[OK]" } else { "[PARTIAL]" };
            println!("{} {} ({} moves, {} bytes)", marker, game.summary(), game.move_count(), game.bytecode.len());
            println!("   {}", hex::encode(&game.bytecode));
        }
    }
    Ok(())
}

fn decode(hex_text: &str, fen: Option<&str>, result: Option<&str>, config: &Config) -> Result<()> {
    let bytes = hex::decode(hex_text.trim()).context("bytecode must be hex")?;
    let start = start_position(fen)?;
    println!("{}", stream::to_pgn(&bytes, &start, config, result)?);
    Ok(())
}

fn dump(hex_text: &str, fen: Option<&str>, json: bool, config: &Config) -> Result<()> {
    let bytes = hex::decode(hex_text.trim()).context("bytecode must be hex")?;
    let start = start_position(fen)?;
    let summaries = stream::dump(&bytes, &start, config)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
    } else {
        for summary in &summaries {
            println!("{}", summary);
        }
    }
    Ok(())
}

fn roundtrip(path: &Path, config: &Config) -> Result<()> {
    let mut stats = CodecStats::default();
    let mut failures = 0;
    let games = read_games(path)?;

    for game in &games {
        let codec = Codec::with_instrument(game.start.clone(), &mut stats).with_policy(config.slow_index_policy);
        for event in Stepper::with_codec(&game.bytecode, codec, config) {
            event.with_context(|| format!("decoding {}", game.summary()))?;
        }

        let text = game.to_pgn(config)?;
        let reparsed = parse_pgn_string_with(&text, config)?;
        let same = reparsed
            .first()
            .is_some_and(|again| again.bytecode == game.bytecode);
        if same {
            println!("[OK] {}", game.summary());
        } else {
            failures += 1;
            println!("[ERROR] {} does not survive a round trip", game.summary());
        }
    }

    println!();
    println!("{}", serde_json::to_string_pretty(&stats)?);
    println!("fast ratio: {:.3}", stats.fast_ratio());

    if failures > 0 {
        bail!("{} of {} games failed the round trip", failures, games.len());
    }
    Ok(())
}
