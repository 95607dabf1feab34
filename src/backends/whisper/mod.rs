use std::os::raw::{c_char, c_void};
use std::sync::Once;

use anyhow::{Context, ensure};
use tracing::debug;
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use crate::opts::SAMPLE_RATE;
use crate::recognizer::{Recognizer, TranscribeRequest};
use crate::segmenter::pcm_to_f32;
use crate::{Error, Result};

/// Built-in recognizer powered by `whisper-rs` / `whisper.cpp`.
///
/// The model is loaded once; every `transcribe` call runs a fresh full pass with no text context
/// carried over, so each segment is recognized on its own.
pub struct WhisperRecognizer {
    ctx: WhisperContext,
}

impl WhisperRecognizer {
    /// Load a ggml model from disk.
    pub fn new(model_path: &str) -> Result<Self> {
        if model_path.trim().is_empty() {
            return Err(Error::config("model path must be provided"));
        }
        silence_native_logs();

        let ctx = WhisperContext::new_with_params(model_path, WhisperContextParameters::default())
            .with_context(|| format!("failed to load whisper model '{model_path}'"))?;
        debug!(model = model_path, "whisper model loaded");
        Ok(Self { ctx })
    }

    fn run(&self, pcm: &[u8], req: &TranscribeRequest) -> anyhow::Result<String> {
        ensure!(
            req.sample_rate == SAMPLE_RATE && req.channels == 1,
            "whisper expects {SAMPLE_RATE} Hz mono audio, got {} Hz with {} channel(s)",
            req.sample_rate,
            req.channels
        );

        let samples = pcm_to_f32(pcm);
        if samples.is_empty() {
            return Ok(String::new());
        }

        let params = build_full_params(req);
        let mut state = self
            .ctx
            .create_state()
            .context("failed to create whisper state")?;
        state
            .full(params, &samples)
            .context("failed to run whisper full()")?;

        let mut text = String::new();
        for segment in state.as_iter() {
            let piece = segment.to_str().context("failed to get segment text")?;
            text.push_str(piece);
        }

        Ok(text.trim().to_owned())
    }
}

impl Recognizer for WhisperRecognizer {
    fn transcribe(&mut self, pcm: &[u8], req: &TranscribeRequest) -> Result<String> {
        let text = self
            .run(pcm, req)
            .map_err(|err| Error::Transcription(format!("{err:#}")))?;
        debug!(chars = text.chars().count(), "whisper transcription finished");
        Ok(text)
    }
}

fn build_full_params(req: &TranscribeRequest) -> FullParams<'_, '_> {
    let mut params = FullParams::new(SamplingStrategy::BeamSearch {
        beam_size: 5,
        patience: 1.0,
    });

    params.set_n_threads(num_cpus::get() as i32);
    params.set_translate(false);
    params.set_language(req.language.as_deref());
    params.set_no_context(true);
    params.set_single_segment(false);

    params.set_print_progress(false);
    params.set_print_special(false);
    params.set_print_realtime(false);
    params.set_print_timestamps(false);

    params
}

unsafe extern "C" fn discard_native_log(_level: u32, _msg: *const c_char, _user_data: *mut c_void) {}

/// whisper.cpp prints model-loading chatter to stderr, where it would interleave with the
/// per-segment report. Installed once per process.
fn silence_native_logs() {
    static SILENCE: Once = Once::new();
    SILENCE.call_once(|| unsafe {
        whisper_rs::set_log_callback(Some(discard_native_log), std::ptr::null_mut());
    });
}
