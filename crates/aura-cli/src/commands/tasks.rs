//! Task and category command implementations

use anyhow::{Context, Result};
use aura_core::{Priority, Vault};

use super::truncate;

pub async fn cmd_tasks_list(vault: &Vault, all: bool) -> Result<()> {
    let snapshot = vault.snapshot().await?;
    let tasks: Vec<_> = snapshot
        .tasks
        .iter()
        .filter(|t| all || !t.completed)
        .collect();

    if tasks.is_empty() {
        println!("No tasks found.");
        return Ok(());
    }

    println!();
    println!(
        "{:36} │ {:3} │ {:10} │ {:6} │ {:9} │ Title",
        "ID", "", "Date", "Prio", "Kind"
    );
    println!("─────────────────────────────────────┼─────┼────────────┼────────┼───────────┼──────────────────");
    for task in tasks {
        let check = if task.completed { "[x]" } else { "[ ]" };
        let kind = if task.is_reminder() { "reminder" } else { "task" };
        let priority = match task.priority {
            Priority::High => "HIGH",
            Priority::Medium => "med",
            Priority::Low => "low",
        };
        println!(
            "{:36} │ {:3} │ {:10} │ {:6} │ {:9} │ {}",
            task.id,
            check,
            task.date,
            priority,
            kind,
            truncate(&task.title, 50)
        );
    }

    Ok(())
}

pub async fn cmd_tasks_toggle(vault: &Vault, id: &str) -> Result<()> {
    let task = vault
        .toggle_task(id)
        .await
        .with_context(|| format!("Failed to toggle task {}", id))?;

    if task.completed {
        println!("✅ Done: {}", task.title);
    } else {
        println!("↩️  Reopened: {}", task.title);
    }
    Ok(())
}

pub async fn cmd_categories_list(vault: &Vault) -> Result<()> {
    let snapshot = vault.snapshot().await?;

    println!();
    println!("🏷️  Categories");
    for name in &snapshot.categories {
        let spent: f64 = snapshot
            .expenses
            .iter()
            .filter(|e| e.category == *name)
            .map(|e| e.amount)
            .sum();
        println!("   {:20} {:>12.2}", name, spent);
    }
    Ok(())
}

pub async fn cmd_categories_add(vault: &Vault, name: &str) -> Result<()> {
    if vault.add_category(name).await? {
        println!("✅ Added category: {}", name.trim());
    } else {
        println!("Category already exists: {}", name.trim());
    }
    Ok(())
}
