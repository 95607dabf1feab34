use std::io::Write;

use crate::report_encoder::ReportEncoder;
use crate::session::SegmentReport;
use crate::{Error, Result};

/// A `ReportEncoder` that writes one human-readable line per segment, for following a
/// performance from a terminal.
///
/// ```text
/// [00:00.000] #0  waiting       ""
/// [00:01.000] #1  first_line    0.91  Hello there  <- "hello there"
/// ```
///
/// Timestamps are the nominal start of each segment's audio, overlap included.
pub struct TextEncoder<W: Write> {
    w: W,
    closed: bool,
}

impl<W: Write> TextEncoder<W> {
    pub fn new(w: W) -> Self {
        Self { w, closed: false }
    }
}

impl<W: Write> ReportEncoder for TextEncoder<W> {
    fn write_report(&mut self, report: &SegmentReport) -> Result<()> {
        if self.closed {
            return Err(Error::msg("cannot write report: encoder is already closed"));
        }

        let start = format_timestamp(report.start_seconds);
        let index = report.segment_index;

        match &report.result {
            None => {
                writeln!(
                    self.w,
                    "[{start}] #{index:<2} {:<12}  {:?}",
                    "waiting", report.transcript
                )?;
            }
            Some(result) => {
                let score = result
                    .similarity
                    .map(|s| format!("{s:.2}"))
                    .unwrap_or_else(|| "  - ".to_owned());
                writeln!(
                    self.w,
                    "[{start}] #{index:<2} {:<12}  {score}  {}  <- {:?}",
                    result.method.as_str(),
                    result.matched_text,
                    report.transcript
                )?;
            }
        }

        if report.transcription_failed {
            writeln!(self.w, "           (transcription failed)")?;
        }

        // Flush so streaming consumers (stdout, pipes) see output promptly.
        self.w.flush()?;
        Ok(())
    }

    /// Flush the underlying writer. This is idempotent.
    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.w.flush()?;
        self.closed = true;
        Ok(())
    }
}

/// Format seconds as `MM:SS.mmm`, rounding to the nearest millisecond.
fn format_timestamp(seconds: f64) -> String {
    let total_ms = (seconds * 1000.0).round() as u64;
    let ms = total_ms % 1000;
    let total_s = total_ms / 1000;
    format!("{:02}:{:02}.{ms:03}", total_s / 60, total_s % 60)
}
