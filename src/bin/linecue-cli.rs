use std::io::{self, BufWriter};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use linecue::json_array_encoder::JsonArrayEncoder;
use linecue::logging;
use linecue::report_encoder::ReportEncoder;
use linecue::text_encoder::TextEncoder;
use linecue::{
    FrameSource, MicFrameSource, Opts, OutputType, Script, Session, WavFrameSource,
    WhisperRecognizer,
};

fn main() -> Result<()> {
    logging::init();
    let params = Params::parse();

    let script = Script::load(&params.script_path)?;
    let recognizer = WhisperRecognizer::new(&params.model_path)?;
    let opts = Opts {
        chunk_duration: params.chunk_duration,
        overlap_duration: params.overlap_duration,
        total_duration: params.total_duration,
        accept_threshold: params.threshold,
        language: params.language.clone(),
        debug_audio_path: params.debug_audio_path.clone(),
    };
    let mut session = Session::new(opts, script, recognizer)?;

    let stop = Arc::new(AtomicBool::new(false));
    watch_ctrl_c(Arc::clone(&stop))?;

    let source: Box<dyn FrameSource> = match &params.input_path {
        Some(path) => Box::new(WavFrameSource::open(path)?),
        None => Box::new(MicFrameSource::open_default()?),
    };

    let stdout = io::stdout();
    let writer = BufWriter::new(stdout.lock());
    let mut encoder: Box<dyn ReportEncoder> = match params.output_type {
        OutputType::Json => Box::new(JsonArrayEncoder::new(writer)),
        OutputType::Text => Box::new(TextEncoder::new(writer)),
    };

    eprintln!(
        "Listening for {}s in {}s chunks with {}s overlap ({} segments)...",
        params.total_duration,
        params.chunk_duration,
        params.overlap_duration,
        session.total_segments()
    );

    let run_res = session.run(source, &stop, |report| encoder.write_report(report));
    let close_res = encoder.close();
    let summary = run_res.context("alignment session failed")?;
    close_res.context("failed to finish output")?;

    if summary.stopped_early {
        eprintln!("Stopped by user.");
    }
    info!(
        segments_processed = summary.segments_processed,
        stopped_early = summary.stopped_early,
        "done"
    );
    Ok(())
}

/// Raise `stop` on Ctrl-C. The session checks it between segments.
fn watch_ctrl_c(stop: Arc<AtomicBool>) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build signal runtime")?;

    std::thread::spawn(move || {
        runtime.block_on(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                stop.store(true, Ordering::SeqCst);
            }
        });
    });
    Ok(())
}

#[derive(Parser, Debug)]
#[command(name = "linecue")]
#[command(about = "Follow live speech through a script")]
struct Params {
    /// JSON script: an array of `{ "text": ... }` records, in performance order.
    #[arg(short = 's', long = "script")]
    script_path: PathBuf,

    /// Path to a whisper.cpp model file (e.g. `ggml-base.bin`).
    #[arg(short = 'm', long = "model")]
    model_path: String,

    /// Replay a 16 kHz mono 16-bit WAV file instead of capturing from the microphone.
    #[arg(short = 'i', long = "input")]
    input_path: Option<PathBuf>,

    /// Seconds of fresh audio per segment.
    #[arg(long = "chunk-duration", default_value_t = 2.0)]
    chunk_duration: f64,

    /// Seconds of the previous segment carried into the next one.
    #[arg(long = "overlap-duration", default_value_t = 1.0)]
    overlap_duration: f64,

    /// Total listening time in seconds.
    #[arg(long = "total-duration", default_value_t = 10.0)]
    total_duration: f64,

    /// Minimum similarity for the first-line anchor and next-line fast path.
    #[arg(long = "threshold", default_value_t = linecue::opts::DEFAULT_ACCEPT_THRESHOLD)]
    threshold: f64,

    /// Language hint for transcription (e.g. `en`, `ko`). Auto-detected when omitted.
    #[arg(short = 'l', long = "language")]
    language: Option<String>,

    /// Write every segment to this WAV file (overwritten per segment) for inspection.
    #[arg(long = "debug-audio")]
    debug_audio_path: Option<PathBuf>,

    #[arg(
        short = 'o',
        long = "output-type",
        value_enum,
        default_value_t = OutputType::Text
    )]
    output_type: OutputType,
}
