//! Analytics over loaded collections
//!
//! Pure recomputation: nothing here reads the store. Ranges are inclusive
//! local calendar days. A day starts at local midnight and ends at
//! 23:59:59.999 local time, so a mood captured at 00:30 lands on the day
//! the user saw on their clock.

use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, Duration, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::models::{Intent, Priority, Snapshot, Task};

const MS_PER_DAY: i64 = 86_400_000;

/// Inclusive range of local calendar days
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    from: NaiveDate,
    to: NaiveDate,
}

impl DateRange {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Result<Self> {
        if from > to {
            return Err(Error::InvalidData(format!(
                "Range start {} is after end {}",
                from, to
            )));
        }
        Ok(Self { from, to })
    }

    pub fn single_day(day: NaiveDate) -> Self {
        Self { from: day, to: day }
    }

    /// First of the month through `today`
    pub fn month_to_date(today: NaiveDate) -> Self {
        Self {
            from: today.with_day(1).unwrap_or(today),
            to: today,
        }
    }

    /// The `n` days ending with `today` (at least one)
    pub fn last_days(today: NaiveDate, n: u32) -> Self {
        let span = i64::from(n.max(1)) - 1;
        Self {
            from: today - Duration::days(span),
            to: today,
        }
    }

    pub fn from(&self) -> NaiveDate {
        self.from
    }

    pub fn to(&self) -> NaiveDate {
        self.to
    }

    /// Number of calendar days covered
    pub fn days(&self) -> i64 {
        (self.to - self.from).num_days() + 1
    }

    pub fn contains_day(&self, day: NaiveDate) -> bool {
        self.from <= day && day <= self.to
    }

    /// Epoch ms of local midnight on the first day
    pub fn start_ms(&self) -> i64 {
        local_ms(self.from.and_time(NaiveTime::MIN), false)
    }

    /// Epoch ms of 23:59:59.999 local on the last day
    pub fn end_ms(&self) -> i64 {
        let end = self.to.and_time(NaiveTime::MIN) + Duration::milliseconds(MS_PER_DAY - 1);
        local_ms(end, true)
    }

    pub fn contains_timestamp(&self, ms: i64) -> bool {
        self.start_ms() <= ms && ms <= self.end_ms()
    }
}

/// Resolve a local wall-clock time, taking the earliest or latest instant
/// across a DST fold. Times inside a DST gap are read as UTC.
fn local_ms(local: NaiveDateTime, latest: bool) -> i64 {
    let resolved = Local.from_local_datetime(&local);
    let instant = if latest {
        resolved.latest()
    } else {
        resolved.earliest()
    };
    instant
        .map(|dt| dt.timestamp_millis())
        .unwrap_or_else(|| local.and_utc().timestamp_millis())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorySpend {
    pub category: String,
    pub amount: f64,
    /// Percentage of total spend, 0 when nothing was spent
    pub share: f64,
    pub count: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStats {
    /// Non-reminder tasks
    pub total: usize,
    pub completed: usize,
    /// `round(100 * completed / total)`, 0 when there are no tasks
    pub efficiency: u32,
    pub high_priority_pending: usize,
    pub reminders_total: usize,
    pub reminders_pending: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Analytics {
    pub range: DateRange,
    pub total_spend: f64,
    pub daily_average: f64,
    /// Largest first
    pub category_breakdown: Vec<CategorySpend>,
    pub top_category: Option<String>,
    pub mood_counts: BTreeMap<String, usize>,
    pub tasks: TaskStats,
    pub entries_by_intent: BTreeMap<Intent, usize>,
}

impl Analytics {
    pub fn compute(snapshot: &Snapshot, range: &DateRange) -> Self {
        let mut total_spend = 0.0;
        let mut by_category: HashMap<&str, (f64, usize)> = HashMap::new();
        for expense in &snapshot.expenses {
            if !expense.day().is_some_and(|d| range.contains_day(d)) {
                continue;
            }
            total_spend += expense.amount;
            let slot = by_category.entry(expense.category.as_str()).or_default();
            slot.0 += expense.amount;
            slot.1 += 1;
        }

        let mut category_breakdown: Vec<CategorySpend> = by_category
            .into_iter()
            .map(|(category, (amount, count))| CategorySpend {
                category: category.to_string(),
                amount,
                share: percentage(amount, total_spend),
                count,
            })
            .collect();
        category_breakdown.sort_by(|a, b| {
            b.amount
                .total_cmp(&a.amount)
                .then_with(|| a.category.cmp(&b.category))
        });
        let top_category = category_breakdown.first().map(|c| c.category.clone());

        let mut mood_counts = BTreeMap::new();
        for mood in snapshot
            .moods
            .iter()
            .filter(|m| range.contains_timestamp(m.created_at))
        {
            *mood_counts.entry(mood.sentiment.clone()).or_insert(0) += 1;
        }

        let mut entries_by_intent = BTreeMap::new();
        for entry in snapshot
            .voice_entries
            .iter()
            .filter(|e| range.contains_timestamp(e.created_at))
        {
            *entries_by_intent.entry(entry.intent).or_insert(0) += 1;
        }

        let tasks = task_stats(
            snapshot
                .tasks
                .iter()
                .filter(|t| task_in_range(t, range)),
        );

        Self {
            range: *range,
            total_spend,
            daily_average: total_spend / range.days() as f64,
            category_breakdown,
            top_category,
            mood_counts,
            tasks,
            entries_by_intent,
        }
    }
}

fn task_in_range(task: &Task, range: &DateRange) -> bool {
    match task.day() {
        Some(day) => range.contains_day(day),
        None => range.contains_timestamp(task.created_at),
    }
}

fn task_stats<'a>(tasks: impl Iterator<Item = &'a Task>) -> TaskStats {
    let mut stats = TaskStats::default();
    for task in tasks {
        if task.is_reminder() {
            stats.reminders_total += 1;
            if !task.completed {
                stats.reminders_pending += 1;
            }
            continue;
        }

        stats.total += 1;
        if task.completed {
            stats.completed += 1;
        } else if task.priority == Priority::High {
            stats.high_priority_pending += 1;
        }
    }

    stats.efficiency = percentage(stats.completed as f64, stats.total as f64).round() as u32;
    stats
}

fn percentage(part: f64, whole: f64) -> f64 {
    if whole == 0.0 {
        0.0
    } else {
        100.0 * part / whole
    }
}
