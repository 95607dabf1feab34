use crate::Result;
use crate::opts::SAMPLE_RATE;

/// Parameters for a single transcription call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscribeRequest {
    pub sample_rate: u32,
    pub channels: u16,
    /// Optional language hint (e.g. `"ko"`). `None` lets the recognizer auto-detect.
    pub language: Option<String>,
}

impl TranscribeRequest {
    /// A request for Linecue's capture format (16 kHz mono).
    pub fn mono_16k(language: Option<String>) -> Self {
        Self {
            sample_rate: SAMPLE_RATE,
            channels: 1,
            language,
        }
    }
}

/// Pluggable speech-to-text collaborator used by [`crate::session::Session`].
///
/// A recognizer turns one segment of 16-bit little-endian PCM into plain text. Calls may be slow
/// and may fail; the session driver maps a failure to an empty fragment rather than aborting.
pub trait Recognizer {
    fn transcribe(&mut self, pcm: &[u8], req: &TranscribeRequest) -> Result<String>;
}

impl<R: Recognizer + ?Sized> Recognizer for Box<R> {
    fn transcribe(&mut self, pcm: &[u8], req: &TranscribeRequest) -> Result<String> {
        (**self).transcribe(pcm, req)
    }
}
