use pnl_forecast_core::PipelineInput;
use std::io::{self, Read};

use super::file::{parse_csv_rows, parse_json_input};

/// Read raw text from stdin if data is being piped.
/// Returns None if stdin is a TTY (interactive) or empty.
pub fn read_stdin() -> Result<Option<String>, Box<dyn std::error::Error>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }

    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;

    let trimmed = buffer.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    Ok(Some(trimmed.to_string()))
}

/// Piped pipeline input: JSON when it opens with `[` or `{`, CSV otherwise.
pub fn read_pipeline_stdin() -> Result<Option<PipelineInput>, Box<dyn std::error::Error>> {
    let Some(text) = read_stdin()? else {
        return Ok(None);
    };
    let input = if text.starts_with('[') || text.starts_with('{') {
        parse_json_input(&text)?
    } else {
        PipelineInput {
            rows: parse_csv_rows(&text)?,
            ..Default::default()
        }
    };
    Ok(Some(input))
}
