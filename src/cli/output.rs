//! Output formatting for CLI commands.

use serde::Serialize;

use crate::cli::args::{OutputFormat, PuzzleNifArgs};
use crate::error::Result;

/// Result of a refresh.
#[derive(Debug, Serialize)]
pub struct RefreshResult {
    pub updated: bool,
    pub archive: String,
    pub csv: String,
}

/// Result of an update: the refresh plus the build it triggered, if any.
#[derive(Debug, Serialize)]
pub struct UpdateResult<B: Serialize> {
    pub refresh: RefreshResult,
    pub build: Option<B>,
}

/// Result of an index query.
#[derive(Debug, Serialize)]
pub struct QueryResult {
    pub query: String,
    pub matches: usize,
    pub ids: Vec<String>,
}

/// One encoded identifier.
#[derive(Debug, Serialize)]
pub struct EncodedKey {
    pub id: String,
    pub key: String,
}

/// Output a result in the specified format.
pub fn output_result<T: Serialize>(message: &str, result: &T, args: &PuzzleNifArgs) -> Result<()> {
    match args.output_format {
        OutputFormat::Human => output_human(message, result, args),
        OutputFormat::Json => output_json(result, args),
    }
}

/// Output in human-readable format.
fn output_human<T: Serialize>(message: &str, result: &T, args: &PuzzleNifArgs) -> Result<()> {
    if args.verbosity() > 0 {
        println!("{message}");
        println!();
    }

    let value = serde_json::to_value(result)?;
    for line in human_lines(&value, 0) {
        println!("{line}");
    }
    Ok(())
}

/// Render a JSON value as indented `key: value` lines.
fn human_lines(value: &serde_json::Value, indent: usize) -> Vec<String> {
    let spaces = "  ".repeat(indent);
    let mut lines = Vec::new();

    match value {
        serde_json::Value::Object(obj) => {
            for (key, val) in obj {
                match val {
                    serde_json::Value::Object(_) => {
                        lines.push(format!("{spaces}{key}:"));
                        lines.extend(human_lines(val, indent + 1));
                    }
                    serde_json::Value::Number(n) if key.ends_with("size") && key != "ngram_size" => {
                        let formatted = n.as_u64().map(format_bytes).unwrap_or_else(|| n.to_string());
                        lines.push(format!("{spaces}{key}: {formatted}"));
                    }
                    _ => lines.push(format!("{spaces}{key}: {}", format_value(val))),
                }
            }
        }
        serde_json::Value::Array(items) => {
            for item in items {
                lines.push(format!("{spaces}{}", format_value(item)));
            }
        }
        _ => lines.push(format!("{spaces}{}", format_value(value))),
    }
    lines
}

/// Output in JSON format.
fn output_json<T: Serialize>(result: &T, args: &PuzzleNifArgs) -> Result<()> {
    let json = if args.pretty {
        serde_json::to_string_pretty(result)?
    } else {
        serde_json::to_string(result)?
    };

    println!("{json}");
    Ok(())
}

/// Format a JSON value for display.
fn format_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(format_value).collect();
            format!("[{}]", items.join(", "))
        }
        serde_json::Value::Object(_) => "[object]".to_string(),
        serde_json::Value::Null => "-".to_string(),
    }
}

/// Format bytes into human-readable format.
fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    let unit = UNITS[unit_index];
    if unit_index == 0 {
        format!("{bytes} {unit}")
    } else {
        format!("{size:.1} {unit}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1024), "1.0 KB");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(1048576), "1.0 MB");
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(&json!("abc")), "abc");
        assert_eq!(format_value(&json!(42)), "42");
        assert_eq!(format_value(&json!(["a", "b"])), "[a, b]");
        assert_eq!(format_value(&json!(null)), "-");
    }

    #[test]
    fn test_human_lines_nest_objects_and_format_sizes() {
        let value = json!({
            "records": 3,
            "file_size": 2048,
            "header": { "ngram_size": 3 }
        });
        let lines = human_lines(&value, 0);
        assert!(lines.contains(&"records: 3".to_string()));
        assert!(lines.contains(&"file_size: 2.0 KB".to_string()));
        assert!(lines.contains(&"header:".to_string()));
        assert!(lines.contains(&"  ngram_size: 3".to_string()));
    }
}
