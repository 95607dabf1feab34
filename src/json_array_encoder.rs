use std::io::Write;

use crate::Result;
use crate::report_encoder::ReportEncoder;
use crate::session::SegmentReport;

/// A `ReportEncoder` that writes segment reports as a single JSON array.
///
/// Reports are streamed as they arrive, so a consumer reading the output live sees each
/// alignment decision as soon as the segment is processed.
///
/// Example output (abbreviated):
/// ```json
/// [
///   { "segment_index": 0, "transcript": "", "result": null },
///   { "segment_index": 1, "transcript": "hello there",
///     "result": { "matched_text": "Hello there", "method": "first_line" } }
/// ]
/// ```
pub struct JsonArrayEncoder<W: Write> {
    w: W,
    // `[` has been written.
    opened: bool,
    // Reports written so far; decides comma placement.
    written: usize,
    closed: bool,
}

impl<W: Write> JsonArrayEncoder<W> {
    /// Create an encoder over `w`. Nothing is written until the first report or `close`.
    pub fn new(w: W) -> Self {
        Self {
            w,
            opened: false,
            written: 0,
            closed: false,
        }
    }

    /// Number of reports written so far.
    pub fn reports_written(&self) -> usize {
        self.written
    }

    fn open_if_needed(&mut self) -> Result<()> {
        if !self.opened {
            self.w.write_all(b"[")?;
            self.opened = true;
        }
        Ok(())
    }
}

impl<W: Write> ReportEncoder for JsonArrayEncoder<W> {
    /// Serialize a single report and append it to the JSON array.
    fn write_report(&mut self, report: &SegmentReport) -> Result<()> {
        if self.closed {
            return Err(crate::Error::msg(
                "cannot write report: encoder is already closed",
            ));
        }

        self.open_if_needed()?;
        if self.written > 0 {
            self.w.write_all(b",")?;
        }
        serde_json::to_writer(&mut self.w, report)?;
        self.written += 1;

        // Flush so a live consumer sees each decision as soon as it is made.
        self.w.flush()?;
        Ok(())
    }

    /// Finalize the JSON array and flush the underlying writer.
    ///
    /// This method is idempotent:
    /// - Calling `close()` multiple times is safe.
    /// - After closing, no further reports may be written.
    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }

        // An empty session still produces valid JSON (`[]`).
        self.open_if_needed()?;
        self.w.write_all(b"]")?;
        self.w.flush()?;

        self.closed = true;
        Ok(())
    }
}
