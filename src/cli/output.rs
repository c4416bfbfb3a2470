//! Output formatting utilities for CLI operations.

use std::io::{self, Write};

use pr_backfill::BackfillError;
use pr_backfill::pipeline::RunSummary;

/// Writes the run summary to stdout.
pub fn write_summary(summary: &RunSummary) -> Result<(), BackfillError> {
    let mut stdout = io::stdout().lock();
    write_summary_to(&mut stdout, summary)
}

/// Writes the run summary to the given writer.
pub fn write_summary_to<W: Write>(
    writer: &mut W,
    summary: &RunSummary,
) -> Result<(), BackfillError> {
    write!(writer, "{summary}").map_err(|e| io_error(&e))?;
    writer.flush().map_err(|e| io_error(&e))
}

fn io_error(error: &io::Error) -> BackfillError {
    BackfillError::Io {
        message: error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use pr_backfill::pipeline::RunSummary;

    use super::write_summary_to;

    #[test]
    fn writes_the_rendered_summary() {
        let summary = RunSummary::new("octo/repo");
        let mut buffer = Vec::new();

        write_summary_to(&mut buffer, &summary).expect("write should succeed");

        let output = String::from_utf8(buffer).expect("utf-8 output");
        assert!(
            output.starts_with("Backfill of octo/repo completed"),
            "unexpected output {output:?}"
        );
    }
}
