//! Output formatting utilities for markdown and JSON.

use crate::types::{Status, Todo};
use serde_json::{Value, json};

/// Output format for board listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Markdown,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(OutputFormat::Json),
            "markdown" | "md" => Some(OutputFormat::Markdown),
            _ => None,
        }
    }
}

/// Column heading as shown on the board.
pub fn status_heading(status: Status) -> &'static str {
    match status {
        Status::Pending => "Pending",
        Status::InProgress => "In Progress",
        Status::Completed => "Completed",
        Status::Cancelled => "Cancelled",
    }
}

/// Format a single todo as a markdown list entry.
pub fn format_todo_markdown(todo: &Todo) -> String {
    let mut md = format!("- `{}` {}", todo.id, todo.title);
    if let Some(priority) = todo.priority {
        md.push_str(&format!(" [{}]", priority.as_str()));
    }
    if let Some(due) = todo.payload("dueDate").and_then(|v| v.as_str()) {
        md.push_str(&format!(" (due {})", due));
    }
    md.push('\n');
    if !todo.description.is_empty() {
        md.push_str(&format!("  {}\n", todo.description));
    }
    md
}

/// Format every column as markdown, empty columns included.
pub fn format_board_markdown(columns: &[(Status, Vec<&Todo>)], user: &str) -> String {
    let mut md = format!("# {}'s board\n", user);
    for (status, todos) in columns {
        md.push_str(&format!("\n## {} ({})\n", status_heading(*status), todos.len()));
        if todos.is_empty() {
            md.push_str("_empty_\n");
        }
        for todo in todos {
            md.push_str(&format_todo_markdown(todo));
        }
    }
    md
}

/// Format every column as a JSON object keyed by wire status.
pub fn format_board_json(columns: &[(Status, Vec<&Todo>)]) -> Value {
    let mut map = serde_json::Map::new();
    for (status, todos) in columns {
        map.insert(status.as_str().to_string(), json!(todos));
    }
    Value::Object(map)
}
