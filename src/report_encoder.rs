use crate::Result;
use crate::session::SegmentReport;

/// A sink for per-segment alignment reports.
pub trait ReportEncoder {
    fn write_report(&mut self, report: &SegmentReport) -> Result<()>;
    fn close(&mut self) -> Result<()>;
}
