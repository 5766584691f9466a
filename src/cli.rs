use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use env_logger::Env;
use serde::Serialize;

use crate::action::{default_action, parse_codes, Action, ActionCode};
use crate::analysis::{convergence, preflop_grid, purify_snapshot, trace_keys, visit_stats};
use crate::display::{
    action_grid, convergence_table, key_table, print_error, print_section, print_success,
    strategy_table, styled_action, trace_table, visit_stats_table,
};
use crate::error::{InfosetError, InfosetResult};
use crate::hands::hand_to_card_id;
use crate::key::{Header, InfosetKey, Street};
use crate::purify::{Purifier, DEFAULT_FOLD_THRESHOLD, DEFAULT_VISIT_COUNT_THRESHOLD};
use crate::snapshot::{Snapshot, StrategyEntry};

#[derive(Parser)]
#[command(
    name = "infoset",
    version = "1.0.0",
    about = "Decode CFR infoset keys and purify trained strategies."
)]
struct Cli {
    /// Fold outright when fold's probability exceeds this
    #[arg(long, global = true, default_value_t = DEFAULT_FOLD_THRESHOLD)]
    fold_threshold: f64,

    /// Let regrets override the average strategy below this many visits
    #[arg(long = "visit-threshold", global = true, default_value_t = DEFAULT_VISIT_COUNT_THRESHOLD)]
    visit_threshold: u64,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Preflop betting sequences worth charting.
#[derive(Clone, Copy, ValueEnum)]
enum Spot {
    /// Small blind first to act
    #[value(name = "sb-open")]
    SbOpen,
    /// Big blind facing a small-blind raise
    #[value(name = "bb-3bet")]
    Bb3Bet,
    /// Small blind facing a 3-bet
    #[value(name = "sb-4bet")]
    Sb4Bet,
}

impl Spot {
    fn player(self) -> u8 {
        match self {
            Spot::SbOpen | Spot::Sb4Bet => 0,
            Spot::Bb3Bet => 1,
        }
    }

    fn history(self) -> InfosetResult<Vec<ActionCode>> {
        match self {
            Spot::SbOpen => Ok(Vec::new()),
            Spot::Bb3Bet => Ok(vec![ActionCode::sized(0)?]),
            Spot::Sb4Bet => Ok(vec![ActionCode::sized(0)?, ActionCode::sized(0)?]),
        }
    }

    fn title(self) -> &'static str {
        match self {
            Spot::SbOpen => "SB open",
            Spot::Bb3Bet => "BB vs SB open",
            Spot::Sb4Bet => "SB vs BB 3-bet",
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Break a raw key into player, street, card and action history
    Decode {
        /// Raw u64 key
        key: String,
    },
    /// Build a key from its parts
    Encode {
        /// Player to act (0 or 1)
        #[arg(short, long, default_value_t = 0)]
        player: u8,
        /// Street name or index (preflop, flop, turn, river)
        #[arg(short, long, default_value = "preflop")]
        street: String,
        /// Card id, or hand notation like AKs on the preflop
        #[arg(short, long)]
        card: String,
        /// Action history, oldest first (e.g. "b1,c" or "3 2")
        #[arg(short, long, default_value = "")]
        actions: String,
    },
    /// Purify one strategy given on the command line
    Purify {
        /// Raw u64 key
        key: String,
        /// Visit count
        visits: u64,
        /// Interleaved regret/probability pairs: r0 p0 r1 p1 ...
        #[arg(required = true, num_args = 2.., allow_negative_numbers = true)]
        values: Vec<f64>,
    },
    /// Show a key's strategy in a snapshot and its pure action
    Lookup {
        snapshot: PathBuf,
        key: String,
        #[arg(long)]
        json: bool,
    },
    /// 13x13 pure-action chart for a preflop betting sequence
    Grid {
        snapshot: PathBuf,
        /// Preset sequence
        #[arg(long, default_value = "sb-open")]
        spot: Spot,
        /// Override the preset's player
        #[arg(short, long)]
        player: Option<u8>,
        /// Override the preset's history (e.g. "b1,b1")
        #[arg(long)]
        history: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Count pure-action changes between consecutive checkpoints
    Convergence {
        #[arg(required = true, num_args = 2..)]
        snapshots: Vec<PathBuf>,
        #[arg(long)]
        json: bool,
    },
    /// Visit-count and uniform-strategy statistics
    Stats {
        snapshot: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Follow keys' strategies across checkpoints
    Trace {
        #[arg(required = true)]
        snapshots: Vec<PathBuf>,
        /// Keys to follow (repeatable)
        #[arg(short, long = "key", required = true)]
        keys: Vec<String>,
        #[arg(long)]
        json: bool,
    },
    /// Write the pure action of every infoset as "<key> <action>" lines
    Export {
        snapshot: PathBuf,
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

pub fn run() {
    let cli = Cli::parse();
    dispatch(cli);
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let _ = env_logger::Builder::from_env(Env::default().default_filter_or(level))
        .format_timestamp(None)
        .try_init();
}

fn dispatch(cli: Cli) {
    init_logging(cli.verbose);

    let purifier = Purifier::new()
        .with_fold_threshold(cli.fold_threshold)
        .with_visit_count_threshold(cli.visit_threshold);
    if let Err(e) = purifier.validate() {
        print_error(&e.to_string());
        std::process::exit(2);
    }

    let result = match cli.command {
        Commands::Decode { key } => cmd_decode(&key),
        Commands::Encode {
            player,
            street,
            card,
            actions,
        } => cmd_encode(player, &street, &card, &actions),
        Commands::Purify { key, visits, values } => cmd_purify(&key, visits, &values, &purifier),
        Commands::Lookup {
            snapshot,
            key,
            json,
        } => cmd_lookup(&snapshot, &key, json, &purifier),
        Commands::Grid {
            snapshot,
            spot,
            player,
            history,
            json,
        } => cmd_grid(&snapshot, spot, player, history.as_deref(), json, &purifier),
        Commands::Convergence { snapshots, json } => cmd_convergence(&snapshots, json, &purifier),
        Commands::Stats { snapshot, json } => cmd_stats(&snapshot, json),
        Commands::Trace {
            snapshots,
            keys,
            json,
        } => cmd_trace(&snapshots, &keys, json, &purifier),
        Commands::Export { snapshot, output } => cmd_export(&snapshot, output.as_deref(), &purifier),
    };

    if let Err(e) = result {
        print_error(&e.to_string());
        std::process::exit(1);
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> InfosetResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Label a checkpoint by its file name.
fn checkpoint_label(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn parse_card(card: &str, street: Street) -> InfosetResult<u16> {
    match card.trim().parse::<u16>() {
        Ok(id) => Ok(id),
        Err(_) if street == Street::Preflop => hand_to_card_id(card),
        Err(_) => Err(InfosetError::InvalidHandNotation(format!(
            "{} (only preflop cards take hand notation)",
            card
        ))),
    }
}

fn pure_label(action: usize, facing_bet: bool) -> String {
    styled_action(&Action::from_index(action, facing_bet).label(facing_bet))
}

// ---------------------------------------------------------------------------
// Key commands
// ---------------------------------------------------------------------------

fn cmd_decode(key: &str) -> InfosetResult<()> {
    let key: InfosetKey = key.parse()?;
    println!("{}", key_table(key));
    Ok(())
}

fn cmd_encode(player: u8, street: &str, card: &str, actions: &str) -> InfosetResult<()> {
    let street: Street = street.parse()?;
    let card_id = parse_card(card, street)?;
    let history = parse_codes(actions)?;

    let key = InfosetKey::encode(Header::new(player, street, card_id), &history)?;
    println!("{}", key_table(key));
    print_success(&key.to_string());
    Ok(())
}

// ---------------------------------------------------------------------------
// Strategy commands
// ---------------------------------------------------------------------------

fn cmd_purify(key: &str, visits: u64, values: &[f64], purifier: &Purifier) -> InfosetResult<()> {
    let key: InfosetKey = key.parse()?;
    if values.len() % 2 != 0 {
        return Err(InfosetError::LengthMismatch {
            regrets: values.len().div_ceil(2),
            probabilities: values.len() / 2,
        });
    }
    let (regrets, probabilities): (Vec<f64>, Vec<f64>) =
        values.chunks_exact(2).map(|pair| (pair[0], pair[1])).unzip();
    let entry = StrategyEntry::new(visits, regrets, probabilities);

    let facing_bet = key.is_facing_bet();
    let action = entry.purify(key, purifier)?;

    print_section("Key", &key.header().to_string());
    println!("{}", strategy_table(&entry, facing_bet, Some(action)));
    println!("\n  Pure action: {} ({})", pure_label(action, facing_bet), action);
    Ok(())
}

#[derive(Serialize)]
struct LookupReport<'a> {
    key: InfosetKey,
    header: Header,
    facing_bet: bool,
    found: bool,
    entry: Option<&'a StrategyEntry>,
    action: usize,
}

fn cmd_lookup(path: &Path, key: &str, json: bool, purifier: &Purifier) -> InfosetResult<()> {
    let key: InfosetKey = key.parse()?;
    let snapshot = Snapshot::load(path)?;
    let facing_bet = key.is_facing_bet();

    let entry = snapshot.get(key);
    let action = match entry {
        Some(entry) => entry.purify(key, purifier)?,
        None => default_action(key),
    };

    if json {
        return print_json(&LookupReport {
            key,
            header: key.header(),
            facing_bet,
            found: entry.is_some(),
            entry,
            action,
        });
    }

    println!("{}", key_table(key));
    match entry {
        Some(entry) => {
            print_section("Strategy", &format!("{} visits", entry.visit_count));
            println!("{}", strategy_table(entry, facing_bet, Some(action)));
        }
        None => print_section(
            "Strategy",
            &"not in snapshot, using the default action".yellow().to_string(),
        ),
    }
    println!("\n  Pure action: {} ({})", pure_label(action, facing_bet), action);
    Ok(())
}

// ---------------------------------------------------------------------------
// Analysis commands
// ---------------------------------------------------------------------------

fn cmd_grid(
    path: &Path,
    spot: Spot,
    player: Option<u8>,
    history: Option<&str>,
    json: bool,
    purifier: &Purifier,
) -> InfosetResult<()> {
    let player = player.unwrap_or_else(|| spot.player());
    let history = match history {
        Some(codes) => parse_codes(codes)?,
        None => spot.history()?,
    };

    let snapshot = Snapshot::load(path)?;
    let table = purify_snapshot(&snapshot, purifier);
    let grid = preflop_grid(&snapshot, &table, player, &history)?;

    if json {
        return print_json(&grid);
    }

    let title = if history == spot.history()? && player == spot.player() {
        spot.title().to_string()
    } else {
        let codes: Vec<String> = history.iter().map(ActionCode::to_string).collect();
        format!("P{} after [{}]", player, codes.join(", "))
    };
    println!("{}", action_grid(&grid, &title));
    println!(
        "  {}",
        format!("{}/169 hands in snapshot", grid.filled()).dimmed()
    );
    Ok(())
}

fn cmd_convergence(paths: &[PathBuf], json: bool, purifier: &Purifier) -> InfosetResult<()> {
    let mut checkpoints = Vec::with_capacity(paths.len());
    for path in paths {
        let snapshot = Snapshot::load(path)?;
        checkpoints.push((checkpoint_label(path), purify_snapshot(&snapshot, purifier)));
    }

    let changes = convergence(&checkpoints)?;
    if json {
        return print_json(&changes);
    }

    print_section("Pure-action changes", &format!("{} checkpoints", checkpoints.len()));
    println!("{}", convergence_table(&changes));
    Ok(())
}

fn cmd_stats(path: &Path, json: bool) -> InfosetResult<()> {
    let snapshot = Snapshot::load(path)?;
    let stats = visit_stats(&snapshot);
    if json {
        return print_json(&stats);
    }

    print_section("Visit counts", &checkpoint_label(path));
    println!("{}", visit_stats_table(&stats));
    if snapshot.skipped() > 0 {
        println!(
            "  {}",
            format!("{} malformed lines skipped", snapshot.skipped()).yellow()
        );
    }
    Ok(())
}

fn cmd_trace(paths: &[PathBuf], keys: &[String], json: bool, purifier: &Purifier) -> InfosetResult<()> {
    let keys: Vec<InfosetKey> = keys.iter().map(|k| k.parse()).collect::<InfosetResult<_>>()?;

    let mut checkpoints = Vec::with_capacity(paths.len());
    for path in paths {
        checkpoints.push((checkpoint_label(path), Snapshot::load(path)?));
    }

    let traces = trace_keys(
        checkpoints.iter().map(|(label, snapshot)| (label.as_str(), snapshot)),
        &keys,
        purifier,
    );
    if json {
        return print_json(&traces);
    }

    for trace in &traces {
        print_section(&format!("Key {}", trace.key), &trace.key.header().to_string());
        if trace.points.is_empty() {
            println!("  {}", "not present in any checkpoint".yellow());
            continue;
        }
        println!("{}", trace_table(trace));
    }
    Ok(())
}

fn cmd_export(path: &Path, output: Option<&Path>, purifier: &Purifier) -> InfosetResult<()> {
    let snapshot = Snapshot::load(path)?;
    let table = purify_snapshot(&snapshot, purifier);

    match output {
        Some(out) => {
            table.save(out)?;
            print_success(&format!(
                "Exported {} pure actions to {}",
                table.len(),
                out.display()
            ));
        }
        None => {
            let stdout = io::stdout();
            let mut writer = BufWriter::new(stdout.lock());
            table.write(&mut writer)?;
            writer.flush()?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_global_thresholds() {
        let cli = Cli::parse_from(["infoset", "--fold-threshold", "0.3", "decode", "1344"]);
        assert_eq!(cli.fold_threshold, 0.3);
        assert_eq!(cli.visit_threshold, DEFAULT_VISIT_COUNT_THRESHOLD);
        assert!(matches!(cli.command, Commands::Decode { .. }));
    }

    #[test]
    fn test_purify_accepts_negative_regrets() {
        let cli = Cli::parse_from(["infoset", "purify", "65536", "10", "-1.5", "0.4", "2", "0.6"]);
        match cli.command {
            Commands::Purify { visits, values, .. } => {
                assert_eq!(visits, 10);
                assert_eq!(values, vec![-1.5, 0.4, 2.0, 0.6]);
            }
            _ => panic!("expected purify"),
        }
    }

    #[test]
    fn test_spot_presets() {
        assert!(Spot::SbOpen.history().unwrap().is_empty());
        assert_eq!(Spot::Bb3Bet.player(), 1);
        let codes: Vec<u8> = Spot::Sb4Bet.history().unwrap().iter().map(|c| c.as_u8()).collect();
        assert_eq!(codes, vec![3, 3]);
    }

    #[test]
    fn test_parse_card_hand_only_preflop() {
        assert_eq!(parse_card("AA", Street::Preflop).unwrap(), 168);
        assert_eq!(parse_card("42", Street::Flop).unwrap(), 42);
        assert!(parse_card("AKs", Street::Turn).is_err());
    }
}
