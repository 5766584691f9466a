//! Snapshot files: one line per infoset,
//!
//! ```text
//! <key> <visit_count> <regret_0> <probability_0> <regret_1> <probability_1> ...
//! ```
//!
//! Loading is lenient. A line that does not parse (including one that is not
//! valid UTF-8) is skipped and counted so a single bad record never costs the
//! rest of a multi-million-line checkpoint. Visit counts are written as signed
//! ints and can wrap negative on long runs; those read back as 0.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use itertools::Itertools;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{InfosetError, InfosetResult};
use crate::key::InfosetKey;
use crate::purify::Purifier;

/// Malformed lines reported individually before going quiet.
const MAX_REPORTED_SKIPS: usize = 10;

/// Lines held in memory and parsed together.
const CHUNK_LINES: usize = 1 << 16;

/// Learned strategy at one infoset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyEntry {
    pub visit_count: u64,
    pub regrets: Vec<f64>,
    pub probabilities: Vec<f64>,
}

impl StrategyEntry {
    pub fn new(visit_count: u64, regrets: Vec<f64>, probabilities: Vec<f64>) -> Self {
        StrategyEntry {
            visit_count,
            regrets,
            probabilities,
        }
    }

    pub fn num_actions(&self) -> usize {
        self.probabilities.len()
    }

    /// Every action equally likely, e.g. a node training never moved.
    pub fn is_uniform(&self) -> bool {
        self.probabilities.iter().all_equal()
    }

    pub fn purify(&self, key: InfosetKey, purifier: &Purifier) -> InfosetResult<usize> {
        purifier.purify(self.visit_count, &self.regrets, &self.probabilities, key)
    }
}

/// All infosets of one training checkpoint.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    entries: HashMap<InfosetKey, StrategyEntry>,
    skipped: usize,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a snapshot file.
    pub fn load(path: impl AsRef<Path>) -> InfosetResult<Self> {
        let path = path.as_ref();
        log::info!("loading snapshot {}", path.display());
        let file = File::open(path)?;
        let snapshot = Self::from_reader(BufReader::new(file))?;
        log::info!(
            "loaded {} infosets from {} ({} skipped)",
            snapshot.len(),
            path.display(),
            snapshot.skipped
        );
        Ok(snapshot)
    }

    /// Parse records from any buffered reader. Only I/O failures are errors.
    pub fn from_reader<R: BufRead>(reader: R) -> InfosetResult<Self> {
        let mut snapshot = Snapshot::default();
        let mut chunk: Vec<Vec<u8>> = Vec::with_capacity(CHUNK_LINES);
        let mut first_line = 1;

        for line in reader.split(b'\n') {
            chunk.push(line?);
            if chunk.len() == CHUNK_LINES {
                snapshot.absorb(first_line, &chunk);
                first_line += chunk.len();
                chunk.clear();
            }
        }
        snapshot.absorb(first_line, &chunk);

        if snapshot.skipped > 0 {
            log::warn!("skipped {} malformed snapshot lines", snapshot.skipped);
        }
        Ok(snapshot)
    }

    /// Parse one chunk of raw lines in parallel and insert them in line order.
    fn absorb(&mut self, first_line: usize, lines: &[Vec<u8>]) {
        let parsed: Vec<InfosetResult<(InfosetKey, StrategyEntry)>> = lines
            .par_iter()
            .enumerate()
            .filter(|(_, raw)| !is_blank(raw))
            .map(|(i, raw)| parse_raw(first_line + i, raw))
            .collect();

        for record in parsed {
            match record {
                Ok((key, entry)) => {
                    self.entries.insert(key, entry);
                }
                Err(e) => {
                    if self.skipped < MAX_REPORTED_SKIPS {
                        log::debug!("skipping: {}", e);
                    }
                    self.skipped += 1;
                }
            }
        }
    }

    /// Write records in key order, in the same format [`Snapshot::load`] reads.
    pub fn write<W: Write>(&self, mut writer: W) -> InfosetResult<()> {
        for (key, entry) in self.entries.iter().sorted_by_key(|(key, _)| **key) {
            write!(writer, "{} {}", key, entry.visit_count)?;
            for (r, p) in entry.regrets.iter().zip(&entry.probabilities) {
                write!(writer, " {} {}", r, p)?;
            }
            writeln!(writer)?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn save(&self, path: impl AsRef<Path>) -> InfosetResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        self.write(BufWriter::new(File::create(path)?))
    }

    pub fn insert(&mut self, key: InfosetKey, entry: StrategyEntry) {
        self.entries.insert(key, entry);
    }

    pub fn get(&self, key: InfosetKey) -> Option<&StrategyEntry> {
        self.entries.get(&key)
    }

    pub fn contains(&self, key: InfosetKey) -> bool {
        self.entries.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Lines dropped as malformed during loading.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn iter(&self) -> impl Iterator<Item = (InfosetKey, &StrategyEntry)> {
        self.entries.iter().map(|(k, v)| (*k, v))
    }

    pub fn entries(&self) -> &HashMap<InfosetKey, StrategyEntry> {
        &self.entries
    }
}

/// Parse one record. `line_no` is 1-based and only used in errors.
pub fn parse_record(line_no: usize, line: &str) -> InfosetResult<(InfosetKey, StrategyEntry)> {
    let malformed = |reason: String| InfosetError::MalformedRecord {
        line: line_no,
        reason,
    };

    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 4 {
        return Err(malformed(format!("expected at least 4 fields, got {}", fields.len())));
    }
    if fields.len() % 2 != 0 {
        return Err(malformed(format!(
            "odd number of fields ({}): regrets and probabilities must pair up",
            fields.len()
        )));
    }

    let key: InfosetKey = fields[0].parse().map_err(|e: InfosetError| malformed(e.to_string()))?;
    let visit_count = parse_visit_count(fields[1])
        .ok_or_else(|| malformed(format!("bad visit count '{}'", fields[1])))?;

    let values: Vec<f64> = fields[2..]
        .iter()
        .map(|f| f.parse::<f64>().map_err(|_| malformed(format!("bad number '{}'", f))))
        .collect::<InfosetResult<_>>()?;

    let (regrets, probabilities): (Vec<f64>, Vec<f64>) = values.chunks_exact(2).map(|pair| (pair[0], pair[1])).unzip();

    Ok((key, StrategyEntry::new(visit_count, regrets, probabilities)))
}

/// Visit count as written by the trainer; negative (wrapped) counts clamp to 0.
fn parse_visit_count(field: &str) -> Option<u64> {
    field
        .parse::<u64>()
        .ok()
        .or_else(|| field.parse::<i64>().ok().map(|t| t.max(0) as u64))
}

pub(crate) fn is_blank(raw: &[u8]) -> bool {
    raw.iter().all(u8::is_ascii_whitespace)
}

fn parse_raw(line_no: usize, raw: &[u8]) -> InfosetResult<(InfosetKey, StrategyEntry)> {
    let line = std::str::from_utf8(raw).map_err(|e| InfosetError::MalformedRecord {
        line: line_no,
        reason: format!("invalid UTF-8: {}", e),
    })?;
    parse_record(line_no, line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_record_pairs() {
        let (key, entry) = parse_record(1, "1344 12 0.5 0.25 -1.5 0.75").unwrap();
        assert_eq!(key.as_u64(), 1344);
        assert_eq!(entry.visit_count, 12);
        assert_eq!(entry.regrets, vec![0.5, -1.5]);
        assert_eq!(entry.probabilities, vec![0.25, 0.75]);
    }

    #[test]
    fn test_parse_record_trailing_space() {
        assert!(parse_record(1, "8 0 0 0.5 0 0.5 ").is_ok());
    }

    #[test]
    fn test_parse_record_rejects() {
        assert!(parse_record(1, "8 0 0 0.5 0").is_err());
        assert!(parse_record(1, "8 0").is_err());
        assert!(parse_record(1, "key 0 0 1").is_err());
        assert!(parse_record(1, "8 3 0 nope").is_err());
    }

    #[test]
    fn test_negative_visit_count_clamps() {
        let (_, entry) = parse_record(1, "8 -3 0 1").unwrap();
        assert_eq!(entry.visit_count, 0);
        assert_eq!(parse_visit_count("18446744073709551615"), Some(u64::MAX));
        assert_eq!(parse_visit_count("-"), None);
    }

    #[test]
    fn test_blank_lines() {
        assert!(is_blank(b""));
        assert!(is_blank(b" \t\r"));
        assert!(!is_blank(b" 8 "));
    }

    #[test]
    fn test_chunks_keep_line_order() {
        let mut text = String::from("1344 1 0 0.5 0 0.5\n");
        for i in 1..CHUNK_LINES {
            text.push_str(&format!("{} 1 0 0.5 0 0.5\n", 2000 + i * 8));
        }
        text.push_str("1344 2 0 0.9 0 0.1\nbad\n");

        let snapshot = Snapshot::from_reader(text.as_bytes()).unwrap();
        assert_eq!(snapshot.len(), CHUNK_LINES);
        assert_eq!(snapshot.skipped(), 1);
        assert_eq!(snapshot.get(InfosetKey::from_raw(1344)).unwrap().visit_count, 2);
    }

    #[test]
    fn test_uniform() {
        assert!(StrategyEntry::new(0, vec![0.0; 3], vec![1.0 / 3.0; 3]).is_uniform());
        assert!(!StrategyEntry::new(5, vec![0.0; 2], vec![0.4, 0.6]).is_uniform());
    }
}
