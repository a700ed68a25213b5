//! Rendering query results for the terminal
//!
//! Rows are dynamically shaped, so tables are assembled with `tabled`'s
//! [`Builder`](tabled::builder::Builder) from the column names of the first
//! row rather than from a derived `Tabled` type.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::database::Row;

/// Output format shared by all CLI commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    /// Rounded table (default)
    #[default]
    Table,
    Markdown,
    /// One JSON array
    Json,
    JsonPretty,
    /// One JSON object per line
    JsonLine,
    /// Pipe-separated values with a header line
    Psv,
}

const FORMAT_NAMES: &[&str] = &["table", "markdown", "json", "json-pretty", "json-line", "psv"];

impl OutputFormat {
    pub fn is_json(&self) -> bool {
        matches!(self, Self::Json | Self::JsonPretty | Self::JsonLine)
    }

    /// Render `rows`; an empty set renders as an empty string for table formats
    pub fn render_rows(&self, rows: &[Row]) -> String {
        match self {
            Self::Json => serde_json::to_string(rows).unwrap_or_default(),
            Self::JsonPretty => serde_json::to_string_pretty(rows).unwrap_or_default(),
            Self::JsonLine => rows
                .iter()
                .filter_map(|row| serde_json::to_string(row).ok())
                .collect::<Vec<_>>()
                .join("\n"),
            Self::Psv => render_psv(rows),
            Self::Table | Self::Markdown => self.render_table(rows),
        }
    }

    /// Render any serializable value; table formats fall back to pretty JSON
    pub fn render_value<T: Serialize>(&self, value: &T) -> String {
        let rendered = match self {
            Self::Json | Self::JsonLine => serde_json::to_string(value),
            _ => serde_json::to_string_pretty(value),
        };
        rendered.unwrap_or_default()
    }

    #[cfg(feature = "display")]
    fn render_table(&self, rows: &[Row]) -> String {
        use tabled::builder::Builder;
        use tabled::settings::Style;

        let Some(first) = rows.first() else {
            return String::new();
        };
        let mut builder = Builder::default();
        builder.push_record(first.names().map(String::from));
        for row in rows {
            builder.push_record(row.values().map(|v| v.to_string()));
        }

        let mut table = builder.build();
        match self {
            Self::Markdown => table.with(Style::markdown()),
            _ => table.with(Style::rounded()),
        };
        table.to_string()
    }

    #[cfg(not(feature = "display"))]
    fn render_table(&self, rows: &[Row]) -> String {
        render_psv(rows)
    }
}

fn render_psv(rows: &[Row]) -> String {
    let Some(first) = rows.first() else {
        return String::new();
    };
    let mut lines = vec![first.names().collect::<Vec<_>>().join("|")];
    for row in rows {
        lines.push(
            row.values()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join("|"),
        );
    }
    lines.join("\n")
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let idx = match self {
            Self::Table => 0,
            Self::Markdown => 1,
            Self::Json => 2,
            Self::JsonPretty => 3,
            Self::JsonLine => 4,
            Self::Psv => 5,
        };
        f.write_str(FORMAT_NAMES[idx])
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(Self::Table),
            "markdown" | "md" => Ok(Self::Markdown),
            "json" => Ok(Self::Json),
            "json-pretty" => Ok(Self::JsonPretty),
            "json-line" | "jsonl" => Ok(Self::JsonLine),
            "psv" => Ok(Self::Psv),
            _ => Err(format!(
                "unknown output format '{}', expected one of: {}",
                s,
                FORMAT_NAMES.join(", ")
            )),
        }
    }
}
