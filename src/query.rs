// Read-only views over a task collection

use crate::models::Task;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Status filter mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    Pending,
    Search,
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusFilter::All => write!(f, "all"),
            StatusFilter::Pending => write!(f, "pending"),
            StatusFilter::Search => write!(f, "search"),
        }
    }
}

impl FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(StatusFilter::All),
            "pending" => Ok(StatusFilter::Pending),
            "search" => Ok(StatusFilter::Search),
            other => Err(format!("unknown status filter: {}", other)),
        }
    }
}

/// Criteria for `filter`
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    /// Case-insensitive substring matched against title and category
    pub search_term: String,
    pub status: StatusFilter,
    pub hide_completed: bool,
}

/// Aggregate counts over a collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TaskStats {
    pub total: usize,
    pub pending: usize,
    pub completed: usize,
    /// Completed share as a rounded integer percentage
    pub progress: u32,
}

/// Apply search, status and hide-completed filters, preserving order
pub fn filter(tasks: &[Task], criteria: &TaskFilter) -> Vec<Task> {
    let term = criteria.search_term.to_lowercase();
    let pending_only = criteria.status == StatusFilter::Pending;

    tasks
        .iter()
        .filter(|t| {
            term.is_empty()
                || t.title.to_lowercase().contains(&term)
                || t.category.name().to_lowercase().contains(&term)
        })
        .filter(|t| !pending_only || !t.completed)
        .filter(|t| !criteria.hide_completed || !t.completed)
        .cloned()
        .collect()
}

pub fn stats(tasks: &[Task]) -> TaskStats {
    let total = tasks.len();
    let completed = tasks.iter().filter(|t| t.completed).count();
    let progress = if total == 0 {
        0
    } else {
        (completed as f64 / total as f64 * 100.0).round() as u32
    };

    TaskStats {
        total,
        pending: total - completed,
        completed,
        progress,
    }
}

/// Index of the task with `id`
pub fn position(tasks: &[Task], id: i64) -> Option<usize> {
    tasks.iter().position(|t| t.id == id)
}

pub fn can_move_up(tasks: &[Task], id: i64) -> bool {
    position(tasks, id).is_some_and(|i| i > 0)
}

pub fn can_move_down(tasks: &[Task], id: i64) -> bool {
    position(tasks, id).is_some_and(|i| i + 1 < tasks.len())
}
