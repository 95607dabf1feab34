use std::path::PathBuf;

use crate::{Error, Result};

/// Capture sample rate (Hz) shared by the capture, transcription and debug collaborators.
pub const SAMPLE_RATE: u32 = 16_000;

/// Samples delivered by a single capture read.
pub const FRAME_SAMPLES: usize = 4096;

/// Bytes per 16-bit mono sample.
pub const BYTES_PER_SAMPLE: usize = 2;

/// Longest session the options accept, in seconds (24 hours).
pub const MAX_TOTAL_DURATION: f64 = 86_400.0;

/// Default similarity a fragment must reach to be accepted by the anchored strategies.
pub const DEFAULT_ACCEPT_THRESHOLD: f64 = 0.3;

/// Options that control an alignment session.
///
/// This struct represents *library-level configuration*, not CLI flags directly.
/// The CLI is responsible for mapping user input into this type so that:
/// - the library remains reusable outside of a CLI context
/// - tests can construct sessions programmatically with fake collaborators
#[derive(Debug, Clone)]
pub struct Opts {
    /// Length of each fresh capture batch, in seconds.
    pub chunk_duration: f64,

    /// Trailing audio of the previous batch carried into the next segment, in seconds.
    ///
    /// Must be strictly shorter than `chunk_duration`.
    pub overlap_duration: f64,

    /// Total listening time, in seconds. Determines how many segments a session produces.
    pub total_duration: f64,

    /// Minimum similarity for the first-line anchor and the next-line fast path.
    pub accept_threshold: f64,

    /// Optional language hint (e.g. `"en"`, `"ko"`) passed to the recognizer.
    ///
    /// When `None`, the recognizer auto-detects.
    pub language: Option<String>,

    /// When set, every segment is also written to this path as a WAV file (overwritten
    /// each time). Purely diagnostic.
    pub debug_audio_path: Option<PathBuf>,
}

impl Default for Opts {
    fn default() -> Self {
        Self {
            chunk_duration: 2.0,
            overlap_duration: 1.0,
            total_duration: 10.0,
            accept_threshold: DEFAULT_ACCEPT_THRESHOLD,
            language: None,
            debug_audio_path: None,
        }
    }
}

impl Opts {
    /// Reject option combinations that cannot produce a session.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("chunk_duration", self.chunk_duration),
            ("overlap_duration", self.overlap_duration),
            ("total_duration", self.total_duration),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(Error::config(format!(
                    "{name} must be a positive number of seconds, got {value}"
                )));
            }
        }

        if self.overlap_duration >= self.chunk_duration {
            return Err(Error::config(format!(
                "overlap_duration ({}) must be shorter than chunk_duration ({})",
                self.overlap_duration, self.chunk_duration
            )));
        }

        if self.total_duration < self.chunk_duration {
            return Err(Error::config(format!(
                "total_duration ({}) must be at least chunk_duration ({})",
                self.total_duration, self.chunk_duration
            )));
        }

        if self.total_duration > MAX_TOTAL_DURATION {
            return Err(Error::config(format!(
                "total_duration ({}) exceeds the {MAX_TOTAL_DURATION}s session limit",
                self.total_duration
            )));
        }

        if !(0.0..=1.0).contains(&self.accept_threshold) {
            return Err(Error::config(format!(
                "accept_threshold must be within [0, 1], got {}",
                self.accept_threshold
            )));
        }

        if frames_for(self.chunk_duration) == 0 {
            return Err(Error::config(format!(
                "chunk_duration ({}) is shorter than a single {FRAME_SAMPLES}-sample capture frame",
                self.chunk_duration
            )));
        }

        Ok(())
    }

    /// Number of segments a session with these options produces.
    ///
    /// `floor((total - chunk) / (chunk - overlap)) + 1`
    pub fn total_segments(&self) -> usize {
        let stride = self.chunk_duration - self.overlap_duration;
        ((self.total_duration - self.chunk_duration) / stride).floor() as usize + 1
    }
}

/// Number of whole capture frames that fit in `seconds` of audio.
pub(crate) fn frames_for(seconds: f64) -> usize {
    (SAMPLE_RATE as f64 / FRAME_SAMPLES as f64 * seconds) as usize
}
