use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use std::io::Write;
use std::time::Duration;

use super::aggregate::{BatchSummary, GroupAggregate};

fn pct(value: f64) -> String {
    if value.is_nan() {
        "n/a".to_string()
    } else {
        format!("{:.1}%", value * 100.0)
    }
}

pub fn generate_json_report(out: &mut impl Write, summaries: &[BatchSummary]) -> Result<()> {
    let json_output = serde_json::to_string_pretty(summaries)?;
    writeln!(out, "{json_output}")?;
    Ok(())
}

/// One CSV line: a group of decks in one batch.
#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    scenario: &'a str,
    seed: u64,
    level: &'static str,
    label: &'a str,
    mean_decks: Option<f64>,
    match_win: Option<f64>,
    match_win_std: Option<f64>,
    percentile: Option<f64>,
    percentile_std: Option<f64>,
    mean_top_cut: Option<f64>,
    champion_rate: Option<f64>,
}

fn defined(value: f64) -> Option<f64> {
    (!value.is_nan()).then_some(value)
}

pub fn generate_csv_report(out: &mut impl Write, summaries: &[BatchSummary]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    for summary in summaries {
        let levels = [
            ("archetype", &summary.archetypes),
            ("variant", &summary.variants),
        ];
        for (level, rows) in levels {
            for row in rows {
                writer.serialize(CsvRow {
                    scenario: &summary.scenario,
                    seed: summary.batch_seed,
                    level,
                    label: &row.label,
                    mean_decks: defined(row.mean_decks),
                    match_win: defined(row.match_win),
                    match_win_std: defined(row.match_win_std),
                    percentile: defined(row.percentile),
                    percentile_std: defined(row.percentile_std),
                    mean_top_cut: defined(row.mean_top_cut),
                    champion_rate: defined(row.champion_rate),
                })?;
            }
        }
    }
    writer.flush()?;
    Ok(())
}

pub fn generate_markdown_report(out: &mut impl Write, summaries: &[BatchSummary]) -> Result<()> {
    writeln!(out, "# Metagame Simulation Results\n")?;
    for summary in summaries {
        writeln!(out, "## {} (seed {})\n", summary.scenario, summary.batch_seed)?;
        writeln!(
            out,
            "- **Trials**: {}/{} completed",
            summary.completed, summary.trials
        )?;
        writeln!(
            out,
            "- **Field**: {} players, {} Swiss rounds, top {}",
            summary.players, summary.swiss_rounds, summary.top_cut
        )?;
        if summary.fallback_rounds > 0 {
            writeln!(
                out,
                "- **Heuristic fallback rounds**: {}",
                summary.fallback_rounds
            )?;
        }
        writeln!(out)?;

        writeln!(out, "### Archetypes\n")?;
        markdown_table(out, &summary.archetypes)?;
        writeln!(out, "\n### Variants\n")?;
        markdown_table(out, &summary.variants)?;

        for snap in &summary.snapshots {
            writeln!(out, "\n### Top {} share by round\n", snap.cutoff)?;
            let names = &summary.projection.archetypes;
            writeln!(out, "| Slot | {} |", names.join(" | "))?;
            writeln!(out, "|---|{}", "---|".repeat(names.len()))?;
            for (slot, row) in snap.rows.iter().enumerate() {
                let cells: Vec<String> = row.iter().map(|v| pct(*v)).collect();
                writeln!(out, "| {slot} | {} |", cells.join(" | "))?;
            }
        }

        writeln!(out, "\n### Projected field share by elimination round\n")?;
        let projection = &summary.projection;
        writeln!(out, "| Round | {} |", projection.archetypes.join(" | "))?;
        writeln!(out, "|---|{}", "---|".repeat(projection.archetypes.len()))?;
        for (round, row) in projection.field.iter().enumerate() {
            let cells: Vec<String> = row.iter().map(|v| pct(*v)).collect();
            writeln!(out, "| {round} | {} |", cells.join(" | "))?;
        }

        if !summary.failures.is_empty() {
            writeln!(out, "\n### Failed trials\n")?;
            for failure in &summary.failures {
                writeln!(
                    out,
                    "- trial {} (seed {:#x}): {}",
                    failure.index, failure.seed, failure.error
                )?;
            }
        }
        writeln!(out)?;
    }
    Ok(())
}

fn markdown_table(out: &mut impl Write, rows: &[GroupAggregate]) -> Result<()> {
    writeln!(
        out,
        "| Deck | Mean count | Match win | Percentile | Mean top cut | Champion |"
    )?;
    writeln!(out, "|---|---|---|---|---|---|")?;
    for row in rows {
        writeln!(
            out,
            "| {} | {:.2} | {} | {} | {:.2} | {} |",
            row.label,
            row.mean_decks,
            pct(row.match_win),
            pct(row.percentile),
            row.mean_top_cut,
            pct(row.champion_rate)
        )?;
    }
    Ok(())
}

pub fn generate_console_report(
    out: &mut impl Write,
    summaries: &[BatchSummary],
    total_duration: Duration,
) -> Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", "📊 Simulation Summary".bright_cyan().bold())?;
    writeln!(out, "{}", "=====================".cyan())?;

    for summary in summaries {
        writeln!(
            out,
            "{} {} (seed {})",
            "▶".bright_blue(),
            summary.scenario.bold(),
            summary.batch_seed
        )?;
        let completed = format!("{}/{}", summary.completed, summary.trials);
        let completed = if summary.failures.is_empty() {
            completed.green()
        } else {
            completed.yellow()
        };
        writeln!(
            out,
            "   Trials: {completed}   Players: {}   Swiss rounds: {}   Top cut: {}",
            summary.players, summary.swiss_rounds, summary.top_cut
        )?;
        writeln!(out)?;
        writeln!(
            out,
            "   {:<24} {:>8} {:>10} {:>11} {:>9} {:>9}",
            "Archetype", "Decks", "Match win", "Percentile", "Top cut", "Champion"
        )?;
        for row in &summary.archetypes {
            writeln!(
                out,
                "   {:<24} {:>8.2} {:>10} {:>11} {:>9.2} {:>9}",
                row.label,
                row.mean_decks,
                pct(row.match_win),
                pct(row.percentile),
                row.mean_top_cut,
                pct(row.champion_rate)
            )?;
        }

        writeln!(out)?;
        writeln!(out, "   {}", "Projected share after each elimination round".bold())?;
        let projection = &summary.projection;
        for (name, index) in projection.archetypes.iter().zip(0..) {
            let shares: Vec<String> = projection
                .field
                .iter()
                .map(|row| pct(row[index]))
                .collect();
            writeln!(out, "   {name:<24} {}", shares.join(" → "))?;
        }

        if !summary.failures.is_empty() {
            writeln!(out)?;
            writeln!(out, "   {}", "Failed trials:".red())?;
            for failure in &summary.failures {
                writeln!(
                    out,
                    "     • trial {} (seed {:#x}): {}",
                    failure.index,
                    failure.seed,
                    failure.error.red()
                )?;
            }
        }
        writeln!(out)?;
    }
    writeln!(out, "Total time: {total_duration:?}")?;
    Ok(())
}
