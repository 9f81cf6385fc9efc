//! Role listing output (aligned table or JSON)

use std::io::Write;

use anyhow::{Context, Result};
use chrono::SecondsFormat;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::role::Role;

/// Maximum description width in table output
pub const DESCRIPTION_WIDTH: usize = 50;

/// Spaces between table columns
const COLUMN_GAP: usize = 2;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

/// Write `roles` to `out` in the requested format.
///
/// `show_all` adds the ARN and creation date columns to the table; JSON
/// output always carries every field.
pub fn render_roles<W: Write>(
    out: &mut W,
    roles: &[Role],
    format: OutputFormat,
    show_all: bool,
) -> Result<()> {
    match format {
        OutputFormat::Table => render_table(out, roles, show_all),
        OutputFormat::Json => render_json(out, roles),
    }
}

fn render_table<W: Write>(out: &mut W, roles: &[Role], show_all: bool) -> Result<()> {
    let header: Vec<String> = if show_all {
        vec!["NAME", "ARN", "CREATED", "LAST USED", "DESCRIPTION"]
    } else {
        vec!["NAME", "LAST USED", "DESCRIPTION"]
    }
    .into_iter()
    .map(String::from)
    .collect();

    let mut rows = vec![header];
    for role in roles {
        let last_used = role
            .last_used_at
            .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
            .unwrap_or_else(|| "Never".to_string());
        let description = truncate(&role.description, DESCRIPTION_WIDTH);

        rows.push(if show_all {
            vec![
                role.name.clone(),
                role.arn.clone(),
                role.created_at.to_rfc3339_opts(SecondsFormat::Secs, true),
                last_used,
                description,
            ]
        } else {
            vec![role.name.clone(), last_used, description]
        });
    }

    let columns = rows[0].len();
    let widths: Vec<usize> = (0..columns)
        .map(|col| {
            rows.iter()
                .map(|row| row[col].chars().count())
                .max()
                .unwrap_or(0)
        })
        .collect();

    for row in &rows {
        let mut line = String::new();
        for (col, cell) in row.iter().enumerate() {
            if col + 1 == columns {
                line.push_str(cell);
            } else {
                line.push_str(&format!("{:<width$}", cell, width = widths[col] + COLUMN_GAP));
            }
        }
        writeln!(out, "{}", line.trim_end()).context("Failed to write table row")?;
    }

    Ok(())
}

fn render_json<W: Write>(out: &mut W, roles: &[Role]) -> Result<()> {
    let data = serde_json::to_string_pretty(roles).context("Failed to serialize roles to JSON")?;
    writeln!(out, "{}", data).context("Failed to write JSON output")?;
    Ok(())
}

/// Shorten `s` to at most `max` characters, ending in `...` when cut
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }

    let kept: String = s.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", kept)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iam::testing::sample_roles;
    use chrono::{TimeZone, Utc};

    fn render(roles: &[Role], format: OutputFormat, show_all: bool) -> String {
        let mut buf = Vec::new();
        render_roles(&mut buf, roles, format, show_all).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short string", 20), "short string");
        assert_eq!(
            truncate("this is a longer string that should be truncated", 17),
            "this is a long..."
        );
        assert_eq!(truncate("", 10), "");
        assert_eq!(truncate("exactly ten", 11), "exactly ten");
    }

    #[test]
    fn test_truncate_is_char_safe() {
        let cut = truncate("ééééééééééé", 6);
        assert_eq!(cut, "ééé...");
        assert_eq!(cut.chars().count(), 6);
    }

    #[test]
    fn test_table_columns() {
        let created = Utc.with_ymd_and_hms(2023, 1, 2, 3, 4, 5).unwrap();
        let roles = vec![
            Role::new("Short", "arn:aws:iam::1:role/Short", created)
                .with_last_used(Some(Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap())),
            Role::new("MuchLongerName", "arn:aws:iam::1:role/MuchLongerName", created)
                .with_description("x".repeat(80)),
        ];

        let table = render(&roles, OutputFormat::Table, false);
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("NAME            LAST USED"));
        assert!(lines[1].starts_with("Short           2024-06-01T12:00:00Z"));
        assert!(lines[2].contains("Never"));
        assert!(lines[2].ends_with(&format!("{}...", "x".repeat(47))));
    }

    #[test]
    fn test_table_with_all_columns() {
        let roles = sample_roles(Utc::now());
        let table = render(&roles, OutputFormat::Table, true);

        let header = table.lines().next().unwrap();
        let labels: Vec<&str> = header.split("  ").filter(|s| !s.trim().is_empty()).collect();
        assert_eq!(
            labels.iter().map(|s| s.trim()).collect::<Vec<_>>(),
            vec!["NAME", "ARN", "CREATED", "LAST USED", "DESCRIPTION"]
        );
        assert!(table.contains("arn:aws:iam::123456789012:role/InactiveRole"));
    }

    #[test]
    fn test_empty_table_has_header_only() {
        let table = render(&[], OutputFormat::Table, false);
        assert_eq!(table, "NAME  LAST USED  DESCRIPTION\n");
    }

    #[test]
    fn test_json_output() {
        let roles = sample_roles(Utc::now());
        let json = render(&roles, OutputFormat::Json, false);

        let parsed: Vec<Role> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.len(), 3);
        assert_eq!(parsed[0].name, "ActiveRole");
        assert!(parsed[2].last_used_at.is_none());
        assert!(json.contains("\n  {"));
    }
}
