use anyhow::Result;
use std::path::Path;

use crate::cli::OutputFormat;
use crate::pipeline::ExtractionResult;

pub mod formatters;

pub use formatters::*;

fn render(
    result: &ExtractionResult,
    format: &OutputFormat,
    include_timestamps: bool,
) -> Result<String> {
    Ok(match format {
        OutputFormat::Text => format_as_text(result, include_timestamps),
        OutputFormat::Json => format_as_json(result)?,
        OutputFormat::Srt => format_as_srt(result),
        OutputFormat::Vtt => format_as_vtt(result),
        OutputFormat::Csv => format_as_csv(result),
    })
}

/// Save extraction result to file
pub async fn save_to_file(
    result: &ExtractionResult,
    path: &Path,
    format: &OutputFormat,
    include_timestamps: bool,
) -> Result<()> {
    let content = render(result, format, include_timestamps)?;
    fs_err::write(path, content)?;
    Ok(())
}

/// Print extraction result to console
pub fn print_to_console(
    result: &ExtractionResult,
    format: &OutputFormat,
    include_timestamps: bool,
) -> Result<()> {
    let content = render(result, format, include_timestamps)?;
    println!("{}", content);
    Ok(())
}
