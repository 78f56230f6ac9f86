//! History command implementation

use anyhow::Result;
use aura_core::{Intent, Snapshot, Vault, VoiceEntry};
use chrono::{Local, TimeZone};

use super::truncate;

/// One-line detail of the record derived from an entry
fn describe(snapshot: &Snapshot, entry: &VoiceEntry) -> String {
    match entry.intent {
        Intent::Expense => snapshot
            .expense_for_entry(&entry.id)
            .map(|e| format!("{:.2} {} · {}", e.amount, e.currency, e.category)),
        Intent::Mood => snapshot
            .mood_for_entry(&entry.id)
            .map(|m| format!("{} · {}", m.sentiment, m.sentence)),
        Intent::Note => snapshot.note_for_entry(&entry.id).map(|n| n.text.clone()),
        Intent::Todo | Intent::Reminder => None,
    }
    .unwrap_or_else(|| entry.raw_text.clone())
}

fn format_time(ms: i64) -> String {
    Local
        .timestamp_millis_opt(ms)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

pub async fn cmd_history(vault: &Vault, intent: Option<&str>, limit: usize) -> Result<()> {
    let intent = intent
        .map(|label| label.parse::<Intent>().map_err(|e: String| anyhow::anyhow!(e)))
        .transpose()?;
    let snapshot = vault.snapshot().await?;

    let entries: Vec<&VoiceEntry> = snapshot.entries(intent).take(limit).collect();
    if entries.is_empty() {
        println!("No entries found.");
        return Ok(());
    }

    println!();
    println!(
        "{:16} │ {:8} │ {:40} │ {}",
        "When", "Intent", "Said", "Stored"
    );
    println!("─────────────────┼──────────┼──────────────────────────────────────────┼──────────────────────");
    for entry in &entries {
        println!(
            "{:16} │ {:8} │ {:40} │ {}",
            format_time(entry.created_at),
            entry.intent.as_str(),
            truncate(&entry.raw_text, 40),
            truncate(&describe(&snapshot, entry), 40)
        );
    }

    let total = snapshot.entries(intent).count();
    if total > entries.len() {
        println!();
        println!("Showing {} of {} entries (use --limit to see more)", entries.len(), total);
    }

    Ok(())
}
