//! Report command implementation

use anyhow::{Context, Result};
use aura_core::{Analytics, DateRange, Vault};
use chrono::{Local, NaiveDate};

/// Resolve a named period or a custom --from/--to pair to a date range
pub fn resolve_period(
    period: &str,
    custom_from: Option<&str>,
    custom_to: Option<&str>,
    today: NaiveDate,
) -> Result<DateRange> {
    match (custom_from, custom_to) {
        (Some(from), Some(to)) => {
            let from_date = NaiveDate::parse_from_str(from, "%Y-%m-%d")
                .context("Invalid --from date format (use YYYY-MM-DD)")?;
            let to_date = NaiveDate::parse_from_str(to, "%Y-%m-%d")
                .context("Invalid --to date format (use YYYY-MM-DD)")?;
            return Ok(DateRange::new(from_date, to_date)?);
        }
        (Some(_), None) | (None, Some(_)) => {
            anyhow::bail!("--from and --to must be given together")
        }
        (None, None) => {}
    }

    match period.to_lowercase().as_str() {
        "month" => Ok(DateRange::month_to_date(today)),
        "week" => Ok(DateRange::last_days(today, 7)),
        "today" => Ok(DateRange::single_day(today)),
        "all" => {
            let from = NaiveDate::from_ymd_opt(2000, 1, 1).context("Invalid start date")?;
            Ok(DateRange::new(from, today.max(from))?)
        }
        _ => anyhow::bail!("Unknown period: {}. Available: month, week, today, all", period),
    }
}

pub async fn cmd_report(
    vault: &Vault,
    period: &str,
    from: Option<&str>,
    to: Option<&str>,
    json: bool,
) -> Result<()> {
    let range = resolve_period(period, from, to, Local::now().date_naive())?;
    let report = vault.analytics(range).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print_report(&report);
    Ok(())
}

fn print_report(report: &Analytics) {
    println!();
    println!(
        "📊 Report: {} to {} ({} days)",
        report.range.from(),
        report.range.to(),
        report.range.days()
    );
    println!("   ─────────────────────────────────────────────────────────────");

    println!();
    println!("💰 Spending");
    println!("   Total: {:>12.2}", report.total_spend);
    println!("   Daily average: {:>12.2}", report.daily_average);
    if let Some(top) = &report.top_category {
        println!("   Top category: {}", top);
    }
    if !report.category_breakdown.is_empty() {
        println!();
        for cat in &report.category_breakdown {
            let bar_len = (cat.share / 5.0).round() as usize;
            println!(
                "   {:15} {:>10.2} {:>5.1}% {:>3}x {}",
                cat.category,
                cat.amount,
                cat.share,
                cat.count,
                "█".repeat(bar_len)
            );
        }
    }

    println!();
    println!("✅ Tasks");
    println!(
        "   Completed: {}/{} ({}% efficiency)",
        report.tasks.completed, report.tasks.total, report.tasks.efficiency
    );
    println!("   High priority pending: {}", report.tasks.high_priority_pending);
    println!(
        "   Reminders: {} ({} pending)",
        report.tasks.reminders_total, report.tasks.reminders_pending
    );

    if !report.mood_counts.is_empty() {
        println!();
        println!("🙂 Moods");
        for (sentiment, count) in &report.mood_counts {
            println!("   {:15} {}", sentiment, count);
        }
    }

    if !report.entries_by_intent.is_empty() {
        println!();
        println!("🎙️  Captures");
        for (intent, count) in &report.entries_by_intent {
            println!("   {:15} {}", intent.as_str(), count);
        }
    }
}
