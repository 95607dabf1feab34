//! `linecue`: follow spoken audio through a known script in real time.
//!
//! This crate provides:
//! - A block-matching similarity scorer tuned for noisy transcripts
//! - Overlapping audio segmentation over fixed-size capture frames
//! - A stateful alignment engine (first-line anchor, next-line fast path, fallback scan)
//! - A session driver that glues capture, transcription and alignment together
//! - Pluggable collaborators: Whisper transcription, microphone capture, WAV replay
//!
//! The alignment engine has no audio or transcription dependency and can be driven directly
//! with text fragments.

// High-level API (most consumers should start here).
pub mod opts;
pub mod session;

// Alignment core.
pub mod engine;
pub mod script;
pub mod similarity;

// Audio segmentation and collaborators.
pub mod backends;
#[cfg(feature = "capture")]
pub mod capture;
pub mod recognizer;
pub mod segmenter;
pub mod wav;

// Output selection and encoder interfaces.
pub mod output_type;
pub mod report_encoder;

// Output encoders that serialize session reports.
pub mod json_array_encoder;
pub mod text_encoder;

// Logging configuration and control.
#[cfg(feature = "logging")]
pub mod logging;

mod error;

#[cfg(feature = "whisper")]
pub use backends::whisper::WhisperRecognizer;
#[cfg(feature = "capture")]
pub use capture::MicFrameSource;
pub use engine::{AlignMode, Aligner, AlignmentState, MatchMethod, MatchResult};
pub use error::{Error, Result};
pub use opts::Opts;
pub use output_type::OutputType;
pub use recognizer::{Recognizer, TranscribeRequest};
pub use script::{Script, ScriptLine};
pub use segmenter::{AudioSegment, FrameSource, OverlapSegmenter, SegmenterConfig};
pub use session::{SegmentReport, Session, SessionSummary};
pub use similarity::similarity;
pub use wav::WavFrameSource;
