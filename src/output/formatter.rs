use std::io::IsTerminal;
use owo_colors::OwoColorize;
use terminal_size::{Width, terminal_size};

use crate::scoring::{RankedEntity, WeightConfig};

/// Check if stdout is a TTY (for auto-detecting color support)
pub fn should_use_colors() -> bool {
    std::io::stdout().is_terminal()
}

/// Format a score with two decimals (40 -> "40.00")
pub fn format_score(score: f64) -> String {
    format!("{:.2}", score)
}

/// Get terminal width, defaulting to None for pipes (unlimited)
fn get_terminal_width() -> Option<usize> {
    terminal_size().map(|(Width(w), _)| w as usize)
}

/// Truncate a name to fit available width, accounting for Unicode
fn truncate_name(name: &str, max_width: usize) -> String {
    let chars: Vec<char> = name.chars().collect();
    if chars.len() <= max_width {
        name.to_string()
    } else if max_width > 3 {
        format!("{}...", chars[..max_width - 3].iter().collect::<String>())
    } else {
        chars[..max_width].iter().collect()
    }
}

/// Format ranked entities as a table with columns: Rank, Score, Name
/// No headers. Rank column is right-aligned with a trailing dot, score column
/// is right-aligned and sized to the widest score in the list.
pub fn format_ranked_table(ranked: &[RankedEntity], use_colors: bool) -> String {
    if ranked.is_empty() {
        return "No lawyers found.".to_string();
    }

    let term_width = get_terminal_width();
    let separator = "  ";

    let index_width = format!("{}.", ranked.len()).len().max(3);
    let score_width = ranked
        .iter()
        .map(|r| format_score(r.score).len())
        .max()
        .unwrap_or(0);

    ranked
        .iter()
        .map(|entry| {
            let index_str =
                format!("{:>width$}", format!("{}.", entry.rank), width = index_width);
            let score_padded =
                format!("{:>width$}", format_score(entry.score), width = score_width);

            let fixed_width = index_width + 1 + score_width + separator.len();
            let name = match term_width {
                Some(width) if width > fixed_width + 10 => {
                    truncate_name(entry.record.id(), width - fixed_width)
                }
                // Very narrow terminal, show truncated
                Some(_) => truncate_name(entry.record.id(), 20),
                // No terminal (pipe), don't truncate
                None => entry.record.id().to_string(),
            };

            if use_colors {
                format!(
                    "{} {}{}{}",
                    index_str.dimmed(),
                    score_padded.bold(),
                    separator,
                    name
                )
            } else {
                format!("{} {}{}{}", index_str, score_padded, separator, name)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Format one ranked entity with every field and the per-metric breakdown
pub fn format_ranked_detail(entry: &RankedEntity, columns: &[String], use_colors: bool) -> String {
    let mut lines = Vec::new();

    let heading = format!("#{} {}", entry.rank, entry.record.id());
    let score = format_score(entry.score);
    if use_colors {
        lines.push(format!("{}", heading.bold()));
        lines.push(format!("  Score: {}", score.green()));
    } else {
        lines.push(heading);
        lines.push(format!("  Score: {}", score));
    }

    for column in columns {
        if let Some(value) = entry.record.get(column) {
            if !value.is_missing() {
                lines.push(format!("  {}: {}", column, value));
            }
        }
    }

    if !entry.breakdown.contributions.is_empty() {
        lines.push("  Breakdown:".to_string());
        for c in &entry.breakdown.contributions {
            let line = format!(
                "    {}: {} x {} = {}",
                c.metric,
                c.value,
                c.weight,
                format_score(c.contribution)
            );
            if use_colors && c.contribution == 0.0 {
                lines.push(format!("{}", line.dimmed()));
            } else {
                lines.push(line);
            }
        }
    }

    lines.join("\n")
}

/// Format ranked entities as tab-separated values for scripting
/// Columns: rank, score, name (no headers, no colors)
pub fn format_tsv(ranked: &[RankedEntity]) -> String {
    ranked
        .iter()
        .map(|entry| {
            format!(
                "{}\t{}\t{}",
                entry.rank,
                format_score(entry.score),
                entry.record.id()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Format ranked entities as a JSON array of objects with `rank`, `score`
/// and every field of the record
pub fn format_json(ranked: &[RankedEntity]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(ranked)
}

/// Format weights as "metric: weight" lines, aligned on the colon
pub fn format_weights(weights: &WeightConfig, use_colors: bool) -> String {
    if weights.is_empty() {
        return "No weights configured.".to_string();
    }

    let name_width = weights.metrics().map(|m| m.chars().count()).max().unwrap_or(0);

    weights
        .iter()
        .map(|(metric, weight)| {
            let padded = format!("{:<width$}", metric, width = name_width);
            if use_colors {
                format!("{}  {}", padded.cyan(), weight)
            } else {
                format!("{}  {}", padded, weight)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
