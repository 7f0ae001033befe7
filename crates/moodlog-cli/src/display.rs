//! Terminal rendering for entries, score breakdowns, and evaluation reports.

use std::fmt::Display;

use chrono::{Local, TimeZone};
use moodlog_ai::{Classification, EvalReport, PrototypeSet};
use moodlog_core::JournalEntry;

const MAX_MISMATCHES: usize = 20;
const TEXT_PREVIEW_CHARS: usize = 72;

// ── Entries ──

pub fn print_saved(entry: &JournalEntry) {
    println!("\nSaved entry #{}", entry.id);
    println!("  {:<7} {}", "Mood", entry.tags.mood);
    println!("  {:<7} {}\n", "Energy", entry.tags.energy);
}

pub fn print_entries(entries: &[JournalEntry]) {
    if entries.is_empty() {
        println!("No journal entries found yet. Try adding one with `moodlog add`.");
        return;
    }
    println!("\nLast {} journal entries:\n", entries.len());
    for e in entries {
        println!("{}\n", entry_block(e, &Local));
    }
}

/// Entries are stored in UTC and shown in `tz`.
fn entry_block<Tz: TimeZone>(e: &JournalEntry, tz: &Tz) -> String
where
    Tz::Offset: Display,
{
    format!(
        "[{}] #{} {}\n  → Mood: {}, Energy: {}",
        e.timestamp.with_timezone(tz).format("%Y-%m-%d %H:%M:%S"),
        e.id,
        e.text,
        e.tags.mood,
        e.tags.energy
    )
}

// ── Classification ──

pub fn print_classifications(results: &[Classification], explain: bool) {
    for c in results {
        println!("  {:<8} {}", c.space, c.label);
        if explain {
            for line in explain_lines(c) {
                println!("{line}");
            }
        }
    }
}

fn explain_lines(c: &Classification) -> Vec<String> {
    let mut lines = vec![format!("    decision: {}", c.decision.as_str())];
    if let (Some(best), Some(second)) = (&c.best, &c.second) {
        lines.push(format!(
            "    margin:   {:.4} ({} over {})",
            best.score - second.score,
            best.label,
            second.label
        ));
    }
    for s in c.scores.ranked() {
        let marker = if s.label == c.label { "*" } else { " " };
        lines.push(format!("    {marker} {:<14} {:>7.4}", s.label, s.score));
    }
    lines
}

// ── Evaluation ──

pub fn print_report(report: &EvalReport) {
    println!("\nEvaluated {} samples", report.total);
    println!("  {:<8} {}", "Mood", accuracy_line(report.mood_correct, report.total));
    println!("  {:<8} {}", "Energy", accuracy_line(report.energy_correct, report.total));
    println!("  {:<8} {}", "Pair", accuracy_line(report.pair_correct, report.total));

    if !report.failures.is_empty() {
        println!("\nFailures ({}):", report.failures.len());
        for f in &report.failures {
            println!("  id={} {}", f.id, f.error);
        }
    }

    if !report.mismatches.is_empty() {
        println!("\nMismatches ({}):", report.mismatches.len());
        for m in report.mismatches.iter().take(MAX_MISMATCHES) {
            println!("  id={}", m.id);
            println!("    expected : {} / {}", m.expected.mood, m.expected.energy);
            println!("    predicted: {} / {}", m.predicted.mood, m.predicted.energy);
            println!("    text     : {}", preview(&m.text));
        }
        if report.mismatches.len() > MAX_MISMATCHES {
            println!("  ... and {} more", report.mismatches.len() - MAX_MISMATCHES);
        }
    }
}

fn accuracy_line(correct: usize, total: usize) -> String {
    let pct = if total == 0 {
        0.0
    } else {
        100.0 * correct as f64 / total as f64
    };
    format!("{pct:>5.1}% ({correct}/{total})")
}

fn preview(text: &str) -> String {
    let mut out: String = text.chars().take(TEXT_PREVIEW_CHARS).collect();
    if text.chars().count() > TEXT_PREVIEW_CHARS {
        out.push('…');
    }
    out
}

// ── Corpus ──

pub fn print_prototypes(set: &PrototypeSet) {
    let summary = set.summary();
    println!(
        "{} spaces, {} labels, {} prototype sentences",
        summary.spaces, summary.labels, summary.sentences
    );
    for space in set.space_names() {
        println!("\n{space}");
        for (label, sentences) in set.labels(space) {
            println!("  {:<14} {}", label, sentences.len());
        }
    }
}
