//! Output formatting: table, JSON, plain.

use std::io::{self, Write};

use tabled::{Table, Tabled, settings::Style};

use crate::cli::OutputFormat;
use crate::error::CliError;

/// Render a list in the chosen format.
///
/// - `table`: `Tabled` rows built with `to_row`
/// - `json`: the original data via serde
/// - `plain`: `id_fn` of each item, one per line
pub fn render_list<T, R>(
    format: &OutputFormat,
    data: &[T],
    to_row: impl Fn(&T) -> R,
    id_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize,
    R: Tabled,
{
    Ok(match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().map(to_row).collect();
            Table::new(rows).with(Style::rounded()).to_string()
        }
        OutputFormat::Json => serde_json::to_string_pretty(data)?,
        OutputFormat::Plain => data.iter().map(id_fn).collect::<Vec<_>>().join("\n"),
    })
}

/// Render raw gateway JSON. Tables fall back to pretty JSON since the
/// shape is device-specific.
pub fn render_value(format: &OutputFormat, value: &serde_json::Value) -> Result<String, CliError> {
    Ok(match format {
        OutputFormat::Table | OutputFormat::Json => serde_json::to_string_pretty(value)?,
        OutputFormat::Plain => serde_json::to_string(value)?,
    })
}

pub fn print_output(output: &str) {
    if output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}
