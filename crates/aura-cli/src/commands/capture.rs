//! Capture command implementation

use anyhow::{Context, Result};
use aura_core::{ChildRecord, Classification, Classifier, Intent, KeywordClassifier, Vault};
use serde_json::Value;

/// Build a classification from flags, falling back to the offline classifier
pub async fn build_classification(
    text: &str,
    intent: Option<&str>,
    entities: Option<&str>,
    confidence: Option<f64>,
) -> Result<Classification> {
    let entities = match entities {
        Some(raw) => match serde_json::from_str::<Value>(raw).context("Invalid --entities JSON")? {
            Value::Object(map) => Some(map),
            _ => anyhow::bail!("--entities must be a JSON object"),
        },
        None => None,
    };

    let mut classification = match intent {
        Some(label) => {
            let intent: Intent = label.parse().map_err(|e: String| anyhow::anyhow!(e))?;
            Classification::new(intent)
        }
        None => KeywordClassifier::new().classify(text).await?,
    };

    if let Some(map) = entities {
        classification.entities.extend(map);
    }
    if let Some(confidence) = confidence {
        if !(0.0..=1.0).contains(&confidence) {
            anyhow::bail!("--confidence must be between 0 and 1");
        }
        classification.confidence = Some(confidence);
    }

    Ok(classification)
}

pub async fn cmd_capture(
    vault: &Vault,
    text: &str,
    intent: Option<&str>,
    entities: Option<&str>,
    confidence: Option<f64>,
) -> Result<()> {
    if text.trim().is_empty() {
        anyhow::bail!("Nothing to capture: transcript is empty");
    }

    let classification = build_classification(text, intent, entities, confidence).await?;
    let derivation = vault
        .capture(text, &classification)
        .await
        .context("Failed to save capture")?;

    let entry = &derivation.entry;
    println!(
        "✅ Captured {} ({:.0}% confidence)",
        entry.intent,
        entry.confidence * 100.0
    );
    match &derivation.child {
        ChildRecord::Expense(e) => {
            println!("   Amount: {:.2} {}", e.amount, e.currency);
            println!("   Category: {}", e.category);
            println!("   Date: {}", e.date);
            println!("   Description: {}", e.description);
        }
        ChildRecord::Task(t) => {
            println!("   Title: {}", t.title);
            println!("   Priority: {}", t.priority);
            println!("   Category: {}", t.category);
            println!("   Date: {}", t.date);
            println!("   ID: {}", t.id);
        }
        ChildRecord::Mood(m) => {
            println!("   Sentiment: {}", m.sentiment);
            println!("   {}", m.sentence);
            println!("   Reason: {}", m.reason);
        }
        ChildRecord::Note(n) => {
            println!("   Note: {}", n.text);
            println!("   Date: {}", n.date);
        }
    }
    if let Some(category) = &derivation.new_category {
        println!("   ➕ New category: {}", category);
    }

    Ok(())
}
