/// The supported output formats for session reports.
///
/// Integration notes:
/// - With the `cli` feature, `ValueEnum` allows this enum to be used directly as a CLI flag.
/// - Each variant maps to a concrete `ReportEncoder` implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum OutputType {
    /// Output reports as a JSON array.
    Json,

    /// Output one human-readable line per segment.
    Text,
}
