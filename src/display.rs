// ============================================================================
// File: src/display.rs
// Terminal rendering of results and history
// ============================================================================

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use crate::history::{HistoryStore, SearchRecord};
use crate::orchestrator::{PipelineOutcome, Stage, FAILURE_MESSAGE};

pub fn print_header() {
    println!("{}", "\n═══════════════════════════════════════".bright_blue());
    println!("{}", "       📖 ISLAMIC KNOWLEDGE FINDER".bright_white().bold());
    println!("{}", "═══════════════════════════════════════".bright_blue());
    println!(
        "\nAsk about Islam, the Quran or Hadith. {} for commands.\n",
        ":help".bright_cyan()
    );
}

pub fn print_help() {
    println!("{}", "Commands".green().bold());
    println!("  {}   list this session's searches", ":history".bright_cyan());
    println!("  {}     start a new session", ":clear".bright_cyan());
    println!("  {}      show this message", ":help".bright_cyan());
    println!("  {}      leave", ":quit".bright_cyan());
    println!("Anything else is sent as a question.");
}

pub fn create_spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

pub fn print_outcome(outcome: &PipelineOutcome) {
    match outcome {
        PipelineOutcome::Rejected { message } => {
            println!("\n{}", "### 🔎 Search Result:".green().bold());
            println!("{}", message.yellow());
        }
        PipelineOutcome::Referenced { answer, references } => {
            println!("\n{}", "### 🔎 Search Result:".green().bold());
            println!("{}", answer);
            println!("\n{}", "### 📜 Elaborated Explanation:".green().bold());
            println!("{}", references);
        }
        PipelineOutcome::Failed { stage, attempts, .. } => {
            let stage = match stage {
                Stage::Answer => "answer",
                Stage::References => "references",
            };
            println!("\n{}", FAILURE_MESSAGE.red().bold());
            println!(
                "{}",
                format!("(the {} request failed after {} attempt(s))", stage, attempts).bright_black()
            );
        }
    }
}

pub fn print_history(history: &HistoryStore) {
    if history.is_empty() {
        println!("{}", "No searches yet in this session.".bright_black());
        return;
    }

    println!("\n{} ({})", "Search History".green().bold(), history.len());
    println!("{}", "─".repeat(40).bright_black());
    for record in history.all() {
        print_record(record);
    }
}

fn print_record(record: &SearchRecord) {
    println!(
        "{} {}",
        record.timestamp.format("%Y-%m-%d %H:%M:%S").to_string().bright_black(),
        record.query.bright_white().bold()
    );
    println!("  {}", preview(&record.search_result, 120));
    if let Some(references) = &record.references {
        println!("  {} {}", "refs:".bright_black(), preview(references, 120));
    }
}

/// First line of `text`, cut to `max_chars` characters.
fn preview(text: &str, max_chars: usize) -> String {
    let line = text.lines().next().unwrap_or_default();
    let mut out: String = line.chars().take(max_chars).collect();
    if line.chars().count() > max_chars || text.lines().nth(1).is_some() {
        out.push('…');
    }
    out
}
