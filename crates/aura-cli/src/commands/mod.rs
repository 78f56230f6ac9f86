//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `backup` - Export, import and purge
//! - `capture` - Classify and store an utterance
//! - `core` - Init and status commands, plus shared utilities (open_vault)
//! - `history` - Captured entries, newest first
//! - `reports` - Period analytics
//! - `tasks` - Task and category management

pub mod backup;
pub mod capture;
pub mod core;
pub mod history;
pub mod reports;
pub mod tasks;

// Re-export command functions for main.rs
pub use backup::*;
pub use capture::*;
pub use self::core::*;
pub use history::*;
pub use reports::*;
pub use tasks::*;

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
