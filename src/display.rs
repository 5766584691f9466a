use colored::Colorize;
use comfy_table::{Cell, CellAlignment, ContentArrangement, Table};

use crate::action::{action_labels, Action};
use crate::analysis::{ActionGrid, CheckpointChange, KeyTrace, VisitStats};
use crate::hands::{card_id_to_hand, grid_card_id, NUM_RANKS};
use crate::key::{InfosetKey, Street};
use crate::snapshot::StrategyEntry;

const GRID_RANKS: [char; NUM_RANKS] = ['A', 'K', 'Q', 'J', 'T', '9', '8', '7', '6', '5', '4', '3', '2'];

/// Color an action label the way a range chart would: aggression red,
/// calls green, folds dim, checks yellow.
pub fn styled_action(label: &str) -> String {
    let lower = label.to_lowercase();
    if lower.starts_with("bet") || lower.starts_with("raise") {
        label.red().bold().to_string()
    } else if lower == "call" {
        label.green().bold().to_string()
    } else if lower == "fold" {
        label.dimmed().bold().to_string()
    } else if lower == "check" {
        label.yellow().bold().to_string()
    } else {
        label.bold().to_string()
    }
}

/// Short grid tag for an action index: C/X passive, F fold, 1..n sizes.
fn grid_tag(action: usize, facing_bet: bool) -> String {
    match Action::from_index(action, facing_bet) {
        Action::Check => "X".yellow().to_string(),
        Action::Call => "C".green().to_string(),
        Action::Fold => "F".dimmed().to_string(),
        Action::Raise(tier) => format!("R{}", tier + 1).red().bold().to_string(),
    }
}

pub fn key_table(key: InfosetKey) -> String {
    let header = key.header();

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Field").set_alignment(CellAlignment::Left),
        Cell::new("Value").set_alignment(CellAlignment::Left),
    ]);

    table.add_row(vec![Cell::new("Key".bold().to_string()), Cell::new(key.to_string())]);
    table.add_row(vec![
        Cell::new("Player".bold().to_string()),
        Cell::new(header.player.to_string()),
    ]);
    table.add_row(vec![
        Cell::new("Street".bold().to_string()),
        Cell::new(header.street.to_string()),
    ]);

    let card = match (header.street, card_id_to_hand(header.card_id)) {
        (Street::Preflop, Some(hand)) => format!("{} ({})", header.card_id, hand),
        (Street::Preflop, None) => format!("{} (not a preflop hand)", header.card_id),
        _ => format!("bucket {}", header.card_id),
    };
    table.add_row(vec![Cell::new("Card".bold().to_string()), Cell::new(card)]);

    let history: Vec<String> = key.history().map(|code| code.to_string()).collect();
    let history = if history.is_empty() {
        "(round start)".dimmed().to_string()
    } else {
        history.join(" \u{2192} ")
    };
    table.add_row(vec![Cell::new("History".bold().to_string()), Cell::new(history)]);

    let facing = if key.is_facing_bet() {
        "Yes".red().to_string()
    } else {
        "No".green().to_string()
    };
    table.add_row(vec![Cell::new("Facing Bet".bold().to_string()), Cell::new(facing)]);

    table.to_string()
}

/// Regret and probability per action, with the pure choice marked.
pub fn strategy_table(entry: &StrategyEntry, facing_bet: bool, chosen: Option<usize>) -> String {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("#"),
        Cell::new("Action"),
        Cell::new("Regret").set_alignment(CellAlignment::Right),
        Cell::new("Probability").set_alignment(CellAlignment::Right),
        Cell::new(""),
    ]);

    let labels = action_labels(entry.num_actions(), facing_bet);
    for (i, label) in labels.iter().enumerate() {
        let marker = if chosen == Some(i) {
            "\u{2190} pure".cyan().bold().to_string()
        } else {
            String::new()
        };
        table.add_row(vec![
            Cell::new(i),
            Cell::new(styled_action(label)),
            Cell::new(format!("{:.4}", entry.regrets[i])).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.1}%", entry.probabilities[i] * 100.0))
                .set_alignment(CellAlignment::Right),
            Cell::new(marker),
        ]);
    }

    table.to_string()
}

pub fn action_grid(grid: &ActionGrid, title: &str) -> String {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);

    let mut header = vec![Cell::new("")];
    for &r in &GRID_RANKS {
        header.push(Cell::new(r).set_alignment(CellAlignment::Center));
    }
    table.set_header(header);

    for (i, &r) in GRID_RANKS.iter().enumerate() {
        let mut row = vec![Cell::new(r.to_string().bold().to_string())];
        for j in 0..NUM_RANKS {
            let text = match grid.cells[i][j] {
                Some(action) => grid_tag(action, grid.facing_bet),
                None => "\u{00b7}".dimmed().to_string(),
            };
            row.push(Cell::new(text).set_alignment(CellAlignment::Center));
        }
        table.add_row(row);
    }

    let legend = action_labels(grid.num_actions, grid.facing_bet)
        .iter()
        .zip(grid.counts())
        .enumerate()
        .map(|(i, (label, count))| format!("{} {} ({})", grid_tag(i, grid.facing_bet), label, count))
        .collect::<Vec<_>>()
        .join("  ");

    format!(
        "  {}\n{}\n  {}\n  {}",
        title.bold(),
        table,
        "Suited above the diagonal, offsuit below".dimmed(),
        legend
    )
}

/// Hand at grid cell (`row`, `col`), for labels outside the grid.
pub fn grid_hand(row: usize, col: usize) -> &'static str {
    card_id_to_hand(grid_card_id(row, col)).unwrap_or("??")
}

pub fn convergence_table(changes: &[CheckpointChange]) -> String {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("From"),
        Cell::new("To"),
        Cell::new("Changed").set_alignment(CellAlignment::Right),
        Cell::new("Infosets").set_alignment(CellAlignment::Right),
        Cell::new("Share").set_alignment(CellAlignment::Right),
    ]);

    for change in changes {
        let share = if change.infosets > 0 {
            change.changes as f64 / change.infosets as f64
        } else {
            0.0
        };
        table.add_row(vec![
            Cell::new(&change.from),
            Cell::new(&change.to),
            Cell::new(change.changes).set_alignment(CellAlignment::Right),
            Cell::new(change.infosets).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.2}%", share * 100.0)).set_alignment(CellAlignment::Right),
        ]);
    }

    table.to_string()
}

pub fn visit_stats_table(stats: &VisitStats) -> String {
    let pct = |n: usize| {
        if stats.infosets == 0 {
            0.0
        } else {
            n as f64 / stats.infosets as f64 * 100.0
        }
    };

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Metric").set_alignment(CellAlignment::Left),
        Cell::new("Value").set_alignment(CellAlignment::Right),
    ]);
    table.add_row(vec![Cell::new("Infosets".bold().to_string()), Cell::new(stats.infosets)]);
    table.add_row(vec![
        Cell::new("Uniform strategies".bold().to_string()),
        Cell::new(format!("{} ({:.1}%)", stats.uniform, pct(stats.uniform))),
    ]);
    table.add_row(vec![
        Cell::new("Visited 0 times".bold().to_string()),
        Cell::new(format!("{} ({:.1}%)", stats.unvisited, pct(stats.unvisited))),
    ]);
    table.add_row(vec![
        Cell::new("Visited 1 time".bold().to_string()),
        Cell::new(format!("{} ({:.1}%)", stats.visited_once, pct(stats.visited_once))),
    ]);
    table.add_row(vec![
        Cell::new("Max visits".bold().to_string()),
        Cell::new(stats.max_visits),
    ]);

    for (decade, count) in stats.decades.iter().enumerate() {
        table.add_row(vec![
            Cell::new(format!("  1e{}..1e{}", decade, decade + 1)),
            Cell::new(format!("{} {}", count, bar(pct(*count) / 100.0, 20))),
        ]);
    }

    table.to_string()
}

pub fn trace_table(trace: &KeyTrace) -> String {
    let width = trace.points.iter().map(|p| p.probabilities.len()).max().unwrap_or(0);
    let labels = action_labels(width, trace.facing_bet);

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    let mut header = vec![Cell::new("Checkpoint"), Cell::new("Visits").set_alignment(CellAlignment::Right)];
    for label in &labels {
        header.push(Cell::new(label).set_alignment(CellAlignment::Right));
    }
    header.push(Cell::new("Pure"));
    table.set_header(header);

    for point in &trace.points {
        let mut row = vec![
            Cell::new(&point.checkpoint),
            Cell::new(point.visit_count).set_alignment(CellAlignment::Right),
        ];
        for i in 0..width {
            let text = point
                .probabilities
                .get(i)
                .map(|p| format!("{:.1}%", p * 100.0))
                .unwrap_or_default();
            row.push(Cell::new(text).set_alignment(CellAlignment::Right));
        }
        let pure = match point.action {
            Some(a) => styled_action(&Action::from_index(a, trace.facing_bet).label(trace.facing_bet)),
            None => "-".dimmed().to_string(),
        };
        row.push(Cell::new(pure));
        table.add_row(row);
    }

    table.to_string()
}

pub fn bar(share: f64, width: usize) -> String {
    let filled = ((share.clamp(0.0, 1.0)) * width as f64) as usize;
    "\u{2588}".repeat(filled) + &"\u{2591}".repeat(width - filled)
}

pub fn print_section(title: &str, content: &str) {
    println!("\n{}", title.cyan().bold());
    println!("  {}", content);
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", "Error:".red().bold(), msg);
}

pub fn print_success(msg: &str) {
    println!("{}", msg.green().bold());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_hand_corners() {
        assert_eq!(grid_hand(0, 0), "AA");
        assert_eq!(grid_hand(0, 1), "AKs");
        assert_eq!(grid_hand(1, 0), "AKo");
        assert_eq!(grid_hand(12, 12), "22");
    }

    #[test]
    fn test_bar_width() {
        assert_eq!(bar(0.5, 10).chars().count(), 10);
        assert_eq!(bar(2.0, 4), "\u{2588}".repeat(4));
    }
}
