//! Batch analysis over snapshots: purify whole checkpoints, measure how many
//! pure actions move between checkpoints, and slice out preflop grids,
//! visit-count statistics and per-key trajectories.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use itertools::Itertools;
use rayon::prelude::*;
use serde::Serialize;

use crate::action::{default_action, ActionCode};
use crate::error::{InfosetError, InfosetResult};
use crate::hands::{grid_card_id, NUM_RANKS};
use crate::key::{Header, InfosetKey, KeyBuilder, Street};
use crate::purify::Purifier;
use crate::snapshot::{is_blank, Snapshot};

// ---------------------------------------------------------------------------
// Purified tables
// ---------------------------------------------------------------------------

/// One pure action per infoset.
#[derive(Debug, Clone, Default)]
pub struct PurifiedTable {
    actions: HashMap<InfosetKey, usize>,
    rejected: usize,
}

impl PurifiedTable {
    pub fn get(&self, key: InfosetKey) -> Option<usize> {
        self.actions.get(&key).copied()
    }

    /// Pure action for `key`, falling back to fold-or-check for keys the
    /// solver never reached.
    pub fn action_for(&self, key: InfosetKey) -> usize {
        self.get(key).unwrap_or_else(|| default_action(key))
    }

    pub fn insert(&mut self, key: InfosetKey, action: usize) {
        self.actions.insert(key, action);
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Entries that failed purification preconditions.
    pub fn rejected(&self) -> usize {
        self.rejected
    }

    pub fn iter(&self) -> impl Iterator<Item = (InfosetKey, usize)> + '_ {
        self.actions.iter().map(|(k, a)| (*k, *a))
    }

    /// `<key> <action>` lines in key order.
    pub fn write<W: Write>(&self, mut writer: W) -> InfosetResult<()> {
        for (key, action) in self.actions.iter().sorted_by_key(|(key, _)| **key) {
            writeln!(writer, "{} {}", key, action)?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn save(&self, path: impl AsRef<Path>) -> InfosetResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        self.write(BufWriter::new(File::create(path)?))?;
        log::info!("wrote {} pure actions to {}", self.len(), path.display());
        Ok(())
    }

    /// Read `<key> <action>` lines; malformed lines are skipped.
    pub fn from_reader<R: BufRead>(reader: R) -> InfosetResult<Self> {
        let mut table = PurifiedTable::default();
        for raw in reader.split(b'\n') {
            let raw = raw?;
            if is_blank(&raw) {
                continue;
            }
            match std::str::from_utf8(&raw).ok().and_then(parse_pure_action) {
                Some((key, action)) => table.insert(key, action),
                None => table.rejected += 1,
            }
        }
        if table.rejected > 0 {
            log::warn!("skipped {} malformed pure-action lines", table.rejected);
        }
        Ok(table)
    }

    pub fn load(path: impl AsRef<Path>) -> InfosetResult<Self> {
        Self::from_reader(BufReader::new(File::open(path)?))
    }
}

fn parse_pure_action(line: &str) -> Option<(InfosetKey, usize)> {
    let mut fields = line.split_whitespace();
    match (fields.next(), fields.next(), fields.next()) {
        (Some(key), Some(action), None) => key
            .parse::<InfosetKey>()
            .ok()
            .zip(action.parse::<usize>().ok()),
        _ => None,
    }
}

/// Purify every infoset of a snapshot in parallel.
pub fn purify_snapshot(snapshot: &Snapshot, purifier: &Purifier) -> PurifiedTable {
    let results: Vec<(InfosetKey, InfosetResult<usize>)> = snapshot
        .entries()
        .par_iter()
        .map(|(key, entry)| (*key, entry.purify(*key, purifier)))
        .collect();

    let mut table = PurifiedTable {
        actions: HashMap::with_capacity(results.len()),
        rejected: 0,
    };
    for (key, result) in results {
        match result {
            Ok(action) => table.insert(key, action),
            Err(e) => {
                log::debug!("not purifying {}: {}", key, e);
                table.rejected += 1;
            }
        }
    }

    if table.rejected > 0 {
        log::warn!("{} infosets could not be purified", table.rejected);
    }
    table
}

// ---------------------------------------------------------------------------
// Convergence across checkpoints
// ---------------------------------------------------------------------------

/// Infosets of `cur` that are new or whose pure action differs from `prev`.
pub fn count_action_changes(prev: &PurifiedTable, cur: &PurifiedTable) -> usize {
    cur.actions
        .par_iter()
        .filter(|(key, action)| prev.get(**key) != Some(**action))
        .count()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckpointChange {
    pub from: String,
    pub to: String,
    pub changes: usize,
    pub infosets: usize,
}

/// Action changes between each consecutive pair of labelled checkpoints.
pub fn convergence(checkpoints: &[(String, PurifiedTable)]) -> InfosetResult<Vec<CheckpointChange>> {
    if checkpoints.len() < 2 {
        return Err(InfosetError::NotEnoughSnapshots {
            need: 2,
            got: checkpoints.len(),
        });
    }

    Ok(checkpoints
        .iter()
        .tuple_windows()
        .map(|((prev_label, prev), (cur_label, cur))| CheckpointChange {
            from: prev_label.clone(),
            to: cur_label.clone(),
            changes: count_action_changes(prev, cur),
            infosets: cur.len(),
        })
        .collect())
}

// ---------------------------------------------------------------------------
// Preflop grid
// ---------------------------------------------------------------------------

/// Pure actions for all 169 preflop hands at one betting sequence, laid out
/// aces first with suited hands above the diagonal.
#[derive(Debug, Clone, Serialize)]
pub struct ActionGrid {
    pub player: u8,
    pub history: Vec<ActionCode>,
    pub facing_bet: bool,
    /// Largest strategy width seen among the grid's infosets.
    pub num_actions: usize,
    pub cells: [[Option<usize>; NUM_RANKS]; NUM_RANKS],
}

impl ActionGrid {
    /// How many hands take each action index.
    pub fn counts(&self) -> Vec<usize> {
        let mut counts = vec![0; self.num_actions];
        for action in self.cells.iter().flatten().flatten() {
            if let Some(count) = counts.get_mut(*action) {
                *count += 1;
            }
        }
        counts
    }

    /// Hands present in the snapshot.
    pub fn filled(&self) -> usize {
        self.cells.iter().flatten().filter(|c| c.is_some()).count()
    }
}

pub fn preflop_grid(
    snapshot: &Snapshot,
    table: &PurifiedTable,
    player: u8,
    history: &[ActionCode],
) -> InfosetResult<ActionGrid> {
    let mut builder = KeyBuilder::new(Header::new(player, Street::Preflop, 0))?;
    for &code in history {
        builder.push(code)?;
    }
    let base = builder.build();

    let mut cells = [[None; NUM_RANKS]; NUM_RANKS];
    let mut num_actions = 0;
    for (row, line) in cells.iter_mut().enumerate() {
        for (col, cell) in line.iter_mut().enumerate() {
            let key = base.with_card_id(grid_card_id(row, col))?;
            *cell = table.get(key);
            if let Some(entry) = snapshot.get(key) {
                num_actions = num_actions.max(entry.num_actions());
            }
        }
    }

    Ok(ActionGrid {
        player,
        history: history.to_vec(),
        facing_bet: base.is_facing_bet(),
        num_actions,
        cells,
    })
}

// ---------------------------------------------------------------------------
// Visit counts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VisitStats {
    pub infosets: usize,
    /// Strategies with every action equally likely.
    pub uniform: usize,
    pub unvisited: usize,
    pub visited_once: usize,
    pub max_visits: u64,
    /// `decades[i]` counts visit counts in `[10^i, 10^(i+1))`.
    pub decades: Vec<usize>,
}

pub fn visit_stats(snapshot: &Snapshot) -> VisitStats {
    let mut stats = VisitStats {
        infosets: snapshot.len(),
        ..Default::default()
    };

    for (_, entry) in snapshot.iter() {
        if entry.is_uniform() {
            stats.uniform += 1;
        }
        match entry.visit_count {
            0 => stats.unvisited += 1,
            1 => stats.visited_once += 1,
            _ => {}
        }
        stats.max_visits = stats.max_visits.max(entry.visit_count);

        if entry.visit_count > 0 {
            let decade = entry.visit_count.ilog10() as usize;
            if stats.decades.len() <= decade {
                stats.decades.resize(decade + 1, 0);
            }
            stats.decades[decade] += 1;
        }
    }

    stats
}

// ---------------------------------------------------------------------------
// Per-key trajectories
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TracePoint {
    pub checkpoint: String,
    pub visit_count: u64,
    pub probabilities: Vec<f64>,
    pub action: Option<usize>,
}

/// How one infoset's strategy moves across checkpoints.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyTrace {
    pub key: InfosetKey,
    pub facing_bet: bool,
    pub points: Vec<TracePoint>,
}

impl KeyTrace {
    pub fn new(key: InfosetKey) -> Self {
        KeyTrace {
            key,
            facing_bet: key.is_facing_bet(),
            points: Vec::new(),
        }
    }

    /// Add this checkpoint's view of the key; absent keys add nothing.
    pub fn record(&mut self, checkpoint: &str, snapshot: &Snapshot, purifier: &Purifier) {
        if let Some(entry) = snapshot.get(self.key) {
            self.points.push(TracePoint {
                checkpoint: checkpoint.to_string(),
                visit_count: entry.visit_count,
                probabilities: entry.probabilities.clone(),
                action: entry.purify(self.key, purifier).ok(),
            });
        }
    }
}

pub fn trace_keys<'a>(
    checkpoints: impl IntoIterator<Item = (&'a str, &'a Snapshot)>,
    keys: &[InfosetKey],
    purifier: &Purifier,
) -> Vec<KeyTrace> {
    let mut traces: Vec<KeyTrace> = keys.iter().copied().map(KeyTrace::new).collect();
    for (label, snapshot) in checkpoints {
        for trace in &mut traces {
            trace.record(label, snapshot, purifier);
        }
    }
    traces
}
