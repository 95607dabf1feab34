//! The session driver: capture → transcribe → align, one segment at a time.
//!
//! A session is single-threaded and strictly sequential. It owns the [`AlignmentState`] for its
//! whole lifetime and threads it from one segment to the next; nothing is shared with other
//! threads except the caller's stop flag, which is checked between segments.
//!
//! Failure policy:
//! - A recognizer error is logged and treated as an empty fragment for that segment.
//! - A capture error ends the session. The frame source is owned by [`Session::run`], so it is
//!   dropped (releasing the device) before the error reaches the caller.
//! - A raised stop flag ends the session normally with the reports produced so far.

use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use tracing::{debug, error, info, info_span, warn};

use crate::Result;
use crate::engine::{Aligner, AlignmentState, MatchResult};
use crate::opts::Opts;
use crate::recognizer::{Recognizer, TranscribeRequest};
use crate::script::Script;
use crate::segmenter::{FrameSource, OverlapSegmenter, SegmenterConfig};
use crate::wav::write_debug_wav;

/// What happened to one segment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentReport {
    pub segment_index: usize,
    pub start_seconds: f64,
    pub nominal_duration: f64,
    /// The recognizer's text, or empty when it produced nothing or failed.
    pub transcript: String,
    pub transcription_failed: bool,
    /// `None` while the session is still waiting for its first non-empty fragment.
    pub result: Option<MatchResult>,
}

/// How a session ended.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub segments_processed: usize,
    pub stopped_early: bool,
    pub final_state: AlignmentState,
    pub reports: Vec<SegmentReport>,
}

/// Drives one alignment session against a fixed script.
pub struct Session<R: Recognizer> {
    opts: Opts,
    config: SegmenterConfig,
    script: Script,
    aligner: Aligner,
    recognizer: R,
    request: TranscribeRequest,
}

impl<R: Recognizer> Session<R> {
    /// Validate `opts` and prepare a session. No audio is captured until [`Session::run`].
    pub fn new(opts: Opts, script: Script, recognizer: R) -> Result<Self> {
        let config = SegmenterConfig::from_opts(&opts)?;
        if script.is_empty() {
            warn!("script is empty; every fragment will report no match");
        }

        Ok(Self {
            aligner: Aligner::new(opts.accept_threshold),
            request: TranscribeRequest::mono_16k(opts.language.clone()),
            opts,
            config,
            script,
            recognizer,
        })
    }

    pub fn total_segments(&self) -> usize {
        self.config.total_segments
    }

    pub fn recognizer(&self) -> &R {
        &self.recognizer
    }

    /// Run the session to completion, a stop request, or a capture failure.
    ///
    /// `on_report` sees every segment as soon as it is aligned; returning an error from it
    /// aborts the session. `source` is consumed and released before this returns.
    pub fn run<S, F>(
        &mut self,
        mut source: S,
        stop: &AtomicBool,
        mut on_report: F,
    ) -> Result<SessionSummary>
    where
        S: FrameSource,
        F: FnMut(&SegmentReport) -> Result<()>,
    {
        let span = info_span!("session", total_segments = self.config.total_segments);
        let _entered = span.enter();
        info!(
            chunk_duration = self.opts.chunk_duration,
            overlap_duration = self.opts.overlap_duration,
            total_duration = self.opts.total_duration,
            script_lines = self.script.len(),
            "session started"
        );

        let mut segments = OverlapSegmenter::new(self.config, &mut source);
        let mut state = AlignmentState::new();
        let mut reports = Vec::new();
        let mut stopped_early = false;

        loop {
            if stop.load(Ordering::SeqCst) {
                info!(segments_processed = reports.len(), "stop requested");
                stopped_early = true;
                break;
            }

            let Some(segment) = segments.next() else {
                break;
            };
            let segment = segment.inspect_err(|err| error!(error = %err, "capture failed"))?;

            if let Some(path) = &self.opts.debug_audio_path {
                if let Err(err) = write_debug_wav(path, &segment.pcm) {
                    warn!(path = %path.display(), error = %err, "failed to write debug audio");
                }
            }

            let (transcript, transcription_failed) =
                match self.recognizer.transcribe(&segment.pcm, &self.request) {
                    Ok(text) => (text, false),
                    Err(err) => {
                        warn!(
                            segment = segment.index,
                            error = %err,
                            "transcription failed; treating as empty"
                        );
                        (String::new(), true)
                    }
                };
            debug!(segment = segment.index, transcript = %transcript, "segment transcribed");

            // Leading silence is discarded until the first non-empty fragment starts alignment.
            let result = if !state.has_started() && transcript.trim().is_empty() {
                None
            } else {
                let result = self.aligner.align(&transcript, state, &self.script);
                info!(
                    segment = segment.index,
                    method = result.method.as_str(),
                    similarity = result.similarity,
                    matched = %result.matched_text,
                    "segment aligned"
                );
                state = result.updated_state.clone();
                Some(result)
            };

            let report = SegmentReport {
                segment_index: segment.index,
                start_seconds: segment.start_seconds,
                nominal_duration: segment.nominal_duration,
                transcript,
                transcription_failed,
                result,
            };
            on_report(&report)?;
            reports.push(report);
        }

        drop(segments);
        drop(source);
        info!(segments_processed = reports.len(), stopped_early, "session finished");

        Ok(SessionSummary {
            segments_processed: reports.len(),
            stopped_early,
            final_state: state,
            reports,
        })
    }
}
