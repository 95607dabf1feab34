use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use linecue::opts::{BYTES_PER_SAMPLE, FRAME_SAMPLES};
use linecue::{
    Error, FrameSource, MatchMethod, Opts, Recognizer, Script, Session, TranscribeRequest,
};

/// Yields silent frames and records when it is released.
struct SilentSource {
    frames_read: usize,
    fail_after: Option<usize>,
    released: Arc<AtomicBool>,
}

impl SilentSource {
    fn new(released: &Arc<AtomicBool>) -> Self {
        Self {
            frames_read: 0,
            fail_after: None,
            released: Arc::clone(released),
        }
    }
}

impl FrameSource for SilentSource {
    fn read_frame(&mut self, frame_samples: usize) -> linecue::Result<Vec<u8>> {
        if self.fail_after == Some(self.frames_read) {
            return Err(Error::Capture("device unplugged".to_owned()));
        }
        self.frames_read += 1;
        Ok(vec![0; frame_samples * BYTES_PER_SAMPLE])
    }
}

impl Drop for SilentSource {
    fn drop(&mut self) {
        self.released.store(true, Ordering::SeqCst);
    }
}

/// Plays back a fixed list of transcription outcomes, one per segment.
struct ScriptedRecognizer {
    outcomes: VecDeque<Option<&'static str>>,
    calls: Vec<(usize, TranscribeRequest)>,
}

impl ScriptedRecognizer {
    /// `None` entries simulate a failing transcription call.
    fn new(outcomes: &[Option<&'static str>]) -> Self {
        Self {
            outcomes: outcomes.iter().copied().collect(),
            calls: Vec::new(),
        }
    }
}

impl Recognizer for ScriptedRecognizer {
    fn transcribe(&mut self, pcm: &[u8], req: &TranscribeRequest) -> linecue::Result<String> {
        self.calls.push((pcm.len(), req.clone()));
        match self.outcomes.pop_front().flatten() {
            Some(text) => Ok(text.to_owned()),
            None => Err(Error::Transcription("model crashed".to_owned())),
        }
    }
}

fn script() -> Script {
    Script::from_texts(["Hello there", "How are you", "Goodbye now"])
}

const PERFORMANCE: [Option<&str>; 9] = [
    Some(""),
    Some("   "),
    Some("Hello there"),
    Some("how r u"),
    Some("completely unrelated content xyz"),
    Some("Goodbye now"),
    None,
    Some(""),
    Some("Goodbye now"),
];

#[test]
fn follows_a_performance_through_the_script() -> anyhow::Result<()> {
    let released = Arc::new(AtomicBool::new(false));
    let stop = AtomicBool::new(false);
    let mut session = Session::new(
        Opts::default(),
        script(),
        ScriptedRecognizer::new(&PERFORMANCE),
    )?;

    let summary = session.run(SilentSource::new(&released), &stop, |_| Ok(()))?;

    assert!(released.load(Ordering::SeqCst));
    assert!(!summary.stopped_early);
    assert_eq!(summary.segments_processed, 9);

    let decisions: Vec<Option<(MatchMethod, &str)>> = summary
        .reports
        .iter()
        .map(|r| {
            r.result
                .as_ref()
                .map(|m| (m.method, m.matched_text.as_str()))
        })
        .collect();

    assert_eq!(
        decisions,
        vec![
            None,
            None,
            Some((MatchMethod::FirstLine, "Hello there")),
            Some((MatchMethod::NextLine, "How are you")),
            Some((MatchMethod::OverallScan, "How are you")),
            Some((MatchMethod::NextLine, "Goodbye now")),
            Some((MatchMethod::None, "No transcription")),
            Some((MatchMethod::None, "No transcription")),
            Some((MatchMethod::OverallScan, "Goodbye now")),
        ]
    );

    assert!(summary.reports[6].transcription_failed);
    assert!(summary.reports[6].transcript.is_empty());
    assert_eq!(summary.final_state.next_line_to_check, None);
    Ok(())
}

#[test]
fn recognizer_sees_overlapped_segments() -> anyhow::Result<()> {
    let released = Arc::new(AtomicBool::new(false));
    let stop = AtomicBool::new(false);
    let opts = Opts {
        language: Some("ko".to_owned()),
        ..Opts::default()
    };
    let mut session = Session::new(opts, script(), ScriptedRecognizer::new(&PERFORMANCE))?;
    session.run(SilentSource::new(&released), &stop, |_| Ok(()))?;

    let frame_bytes = FRAME_SAMPLES * BYTES_PER_SAMPLE;
    let calls = &session.recognizer().calls;
    assert_eq!(calls.len(), 9);
    assert_eq!(calls[0].0, 7 * frame_bytes);
    assert!(calls[1..].iter().all(|(len, _)| *len == 10 * frame_bytes));
    assert!(calls.iter().all(|(_, req)| {
        req.sample_rate == 16_000 && req.channels == 1 && req.language.as_deref() == Some("ko")
    }));
    Ok(())
}

#[test]
fn replaying_a_performance_is_deterministic() -> anyhow::Result<()> {
    let run = || -> anyhow::Result<Vec<linecue::SegmentReport>> {
        let released = Arc::new(AtomicBool::new(false));
        let stop = AtomicBool::new(false);
        let mut session = Session::new(
            Opts::default(),
            script(),
            ScriptedRecognizer::new(&PERFORMANCE),
        )?;
        Ok(session
            .run(SilentSource::new(&released), &stop, |_| Ok(()))?
            .reports)
    };

    assert_eq!(run()?, run()?);
    Ok(())
}

#[test]
fn stop_before_start_captures_nothing() -> anyhow::Result<()> {
    let released = Arc::new(AtomicBool::new(false));
    let stop = AtomicBool::new(true);
    let mut session = Session::new(
        Opts::default(),
        script(),
        ScriptedRecognizer::new(&PERFORMANCE),
    )?;

    let summary = session.run(SilentSource::new(&released), &stop, |_| Ok(()))?;

    assert!(summary.stopped_early);
    assert_eq!(summary.segments_processed, 0);
    assert!(session.recognizer().calls.is_empty());
    assert!(released.load(Ordering::SeqCst));
    Ok(())
}

#[test]
fn stop_requested_mid_session_keeps_results_so_far() -> anyhow::Result<()> {
    let released = Arc::new(AtomicBool::new(false));
    let stop = AtomicBool::new(false);
    let mut session = Session::new(
        Opts::default(),
        script(),
        ScriptedRecognizer::new(&PERFORMANCE),
    )?;

    let summary = session.run(SilentSource::new(&released), &stop, |report| {
        if report.segment_index == 3 {
            stop.store(true, Ordering::SeqCst);
        }
        Ok(())
    })?;

    assert!(summary.stopped_early);
    assert_eq!(summary.segments_processed, 4);
    assert_eq!(
        summary
            .final_state
            .next_line_to_check
            .map(|line| line.text),
        Some("Goodbye now".to_owned())
    );
    assert!(released.load(Ordering::SeqCst));
    Ok(())
}

#[test]
fn capture_failure_is_fatal_and_releases_the_source() -> anyhow::Result<()> {
    let released = Arc::new(AtomicBool::new(false));
    let stop = AtomicBool::new(false);
    let mut session = Session::new(
        Opts::default(),
        script(),
        ScriptedRecognizer::new(&PERFORMANCE),
    )?;

    let mut source = SilentSource::new(&released);
    source.fail_after = Some(12);
    let mut seen = 0;
    let res = session.run(source, &stop, |_| {
        seen += 1;
        Ok(())
    });

    assert!(matches!(res, Err(Error::Capture(_))));
    assert_eq!(seen, 1);
    assert!(released.load(Ordering::SeqCst));
    Ok(())
}

#[test]
fn report_sink_errors_abort_the_session() -> anyhow::Result<()> {
    let released = Arc::new(AtomicBool::new(false));
    let stop = AtomicBool::new(false);
    let mut session = Session::new(
        Opts::default(),
        script(),
        ScriptedRecognizer::new(&PERFORMANCE),
    )?;

    let res = session.run(SilentSource::new(&released), &stop, |_| {
        Err(Error::Message("stdout closed".to_owned()))
    });

    assert!(res.is_err());
    assert_eq!(session.recognizer().calls.len(), 1);
    assert!(released.load(Ordering::SeqCst));
    Ok(())
}

#[test]
fn empty_script_reports_no_match() -> anyhow::Result<()> {
    let released = Arc::new(AtomicBool::new(false));
    let stop = AtomicBool::new(false);
    let opts = Opts {
        total_duration: 3.0,
        ..Opts::default()
    };
    let recognizer = ScriptedRecognizer::new(&[Some("hello"), Some("anyone")]);
    let mut session = Session::new(opts, Script::default(), recognizer)?;

    let summary = session.run(SilentSource::new(&released), &stop, |_| Ok(()))?;

    assert_eq!(summary.segments_processed, 2);
    for report in &summary.reports {
        let result = report.result.as_ref().expect("alignment should have started");
        assert_eq!(result.method, MatchMethod::None);
        assert_eq!(result.matched_text, "No match found");
    }
    Ok(())
}

#[test]
fn debug_audio_holds_the_latest_segment() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("debug_audio.wav");
    let released = Arc::new(AtomicBool::new(false));
    let stop = AtomicBool::new(false);
    let opts = Opts {
        total_duration: 3.0,
        debug_audio_path: Some(path.clone()),
        ..Opts::default()
    };
    let mut session = Session::new(opts, script(), ScriptedRecognizer::new(&PERFORMANCE))?;
    session.run(SilentSource::new(&released), &stop, |_| Ok(()))?;

    let reader = hound::WavReader::open(&path)?;
    assert_eq!(reader.spec().channels, 1);
    assert_eq!(reader.spec().sample_rate, 16_000);
    assert_eq!(reader.len() as usize, 10 * FRAME_SAMPLES);
    Ok(())
}

#[test]
fn longest_session_stops_without_reserving_every_segment() -> anyhow::Result<()> {
    let released = Arc::new(AtomicBool::new(false));
    let stop = AtomicBool::new(true);
    let opts = Opts {
        total_duration: linecue::opts::MAX_TOTAL_DURATION,
        ..Opts::default()
    };
    let mut session = Session::new(opts, script(), ScriptedRecognizer::new(&[]))?;
    assert_eq!(session.total_segments(), 86_399);

    let summary = session.run(SilentSource::new(&released), &stop, |_| Ok(()))?;

    assert!(summary.stopped_early);
    assert!(summary.reports.is_empty());
    assert!(released.load(Ordering::SeqCst));
    Ok(())
}

#[test]
fn unbounded_total_duration_is_rejected() {
    let opts = Opts {
        total_duration: 1e17,
        ..Opts::default()
    };
    let res = Session::new(opts, script(), ScriptedRecognizer::new(&[]));
    assert!(matches!(res, Err(Error::InvalidConfig(_))));
}

#[test]
fn invalid_options_are_rejected_up_front() {
    let opts = Opts {
        chunk_duration: 1.0,
        overlap_duration: 1.0,
        ..Opts::default()
    };
    let res = Session::new(opts, script(), ScriptedRecognizer::new(&[]));
    assert!(matches!(res, Err(Error::InvalidConfig(_))));
}
