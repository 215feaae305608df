// View derivation: filtering and sorting tasks for display

use crate::models::Task;
use std::str::FromStr;

/// Which tasks a view includes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Filter {
    #[default]
    All,
    Completed,
    Pending,
}

impl Filter {
    pub fn matches(self, task: &Task) -> bool {
        match self {
            Filter::All => true,
            Filter::Completed => task.completed,
            Filter::Pending => !task.completed,
        }
    }
}

/// Display order by creation time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Newest,
    Oldest,
}

/// Project `tasks` through a filter and sort order.
///
/// Pure: the input slice is left in insertion order. The sort is stable, so
/// tasks created at the same instant keep their insertion order.
pub fn view(tasks: &[Task], filter: Filter, sort: SortOrder) -> Vec<&Task> {
    let mut visible: Vec<&Task> = tasks.iter().filter(|t| filter.matches(t)).collect();

    match sort {
        SortOrder::Newest => visible.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        SortOrder::Oldest => visible.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
    }

    visible
}

impl std::fmt::Display for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Filter::All => write!(f, "all"),
            Filter::Completed => write!(f, "completed"),
            Filter::Pending => write!(f, "pending"),
        }
    }
}

impl FromStr for Filter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(Filter::All),
            "completed" => Ok(Filter::Completed),
            "pending" => Ok(Filter::Pending),
            other => Err(format!("unknown filter '{}' (expected all, completed or pending)", other)),
        }
    }
}

impl std::fmt::Display for SortOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SortOrder::Newest => write!(f, "newest"),
            SortOrder::Oldest => write!(f, "oldest"),
        }
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "newest" => Ok(SortOrder::Newest),
            "oldest" => Ok(SortOrder::Oldest),
            other => Err(format!("unknown sort order '{}' (expected newest or oldest)", other)),
        }
    }
}
