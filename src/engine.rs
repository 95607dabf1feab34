//! Script alignment: turn one noisy transcript fragment into a script position.
//!
//! Strategies, in strict priority order:
//! 1. First-line anchor: only for the first fragment the engine sees in a session.
//! 2. Next-line fast path: the line after the last confirmed match.
//! 3. Fallback scan: the best-scoring line in the whole script.
//!
//! Strategies 1 and 2 only accept a fragment whose similarity reaches the accept threshold.
//! The fallback scan accepts the strictly highest non-zero score, with ties going to the
//! earliest line.
//!
//! [`Aligner::align`] is a pure function of `(fragment, state, script)`.

use serde::Serialize;
use tracing::debug;

use crate::opts::DEFAULT_ACCEPT_THRESHOLD;
use crate::script::{Script, ScriptLine};
use crate::similarity::similarity;

/// Reported when the fragment is empty or whitespace.
pub const NO_TRANSCRIPTION: &str = "No transcription";

/// Reported when the fallback scan finds nothing.
pub const NO_MATCH_FOUND: &str = "No match found";

/// Which strategy produced a [`MatchResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMethod {
    FirstLine,
    NextLine,
    OverallScan,
    None,
}

impl MatchMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchMethod::FirstLine => "first_line",
            MatchMethod::NextLine => "next_line",
            MatchMethod::OverallScan => "overall_scan",
            MatchMethod::None => "none",
        }
    }
}

/// Whether the engine has processed a non-empty fragment yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlignMode {
    /// No fragment processed; the first-line anchor is still armed.
    #[default]
    NotStarted,
    /// At least one fragment processed; the anchor has been spent.
    Tracking,
}

/// The only state the engine carries between fragments.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct AlignmentState {
    pub mode: AlignMode,
    /// The line expected after the most recent match, or `None` before any match or once the
    /// script is exhausted.
    pub next_line_to_check: Option<ScriptLine>,
}

impl AlignmentState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_started(&self) -> bool {
        self.mode == AlignMode::Tracking
    }
}

/// The outcome of aligning one fragment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    pub matched_text: String,
    pub method: MatchMethod,
    /// Script position of the matched line, when there is one.
    pub line_index: Option<usize>,
    /// Similarity of the fragment against the matched line.
    pub similarity: Option<f64>,
    pub updated_state: AlignmentState,
}

impl MatchResult {
    fn matched(line: &ScriptLine, method: MatchMethod, score: f64, script: &Script) -> Self {
        Self {
            matched_text: line.text.clone(),
            method,
            line_index: Some(line.index),
            similarity: Some(score),
            updated_state: AlignmentState {
                mode: AlignMode::Tracking,
                next_line_to_check: script.next_after(line).cloned(),
            },
        }
    }

    fn unmatched(text: &str, state: AlignmentState) -> Self {
        Self {
            matched_text: text.to_owned(),
            method: MatchMethod::None,
            line_index: None,
            similarity: None,
            updated_state: state,
        }
    }
}

/// The script-matching engine.
#[derive(Debug, Clone, Copy)]
pub struct Aligner {
    accept_threshold: f64,
}

impl Default for Aligner {
    fn default() -> Self {
        Self::new(DEFAULT_ACCEPT_THRESHOLD)
    }
}

impl Aligner {
    pub fn new(accept_threshold: f64) -> Self {
        Self { accept_threshold }
    }

    /// Align `fragment` against `script`, starting from `state`.
    pub fn align(&self, fragment: &str, state: AlignmentState, script: &Script) -> MatchResult {
        if fragment.trim().is_empty() {
            debug!("empty fragment, skipping alignment");
            return MatchResult::unmatched(NO_TRANSCRIPTION, state);
        }

        if state.mode == AlignMode::NotStarted {
            if let Some(first) = script.first() {
                let score = similarity(fragment, &first.text);
                debug!(similarity = score, "first line check");
                if score >= self.accept_threshold {
                    return MatchResult::matched(first, MatchMethod::FirstLine, score, script);
                }
            }
        }

        if let Some(expected) = &state.next_line_to_check {
            let score = similarity(fragment, &expected.text);
            debug!(line = expected.index, similarity = score, "next line check");
            if score >= self.accept_threshold {
                return MatchResult::matched(expected, MatchMethod::NextLine, score, script);
            }
        }

        let mut best: Option<(&ScriptLine, f64)> = None;
        let mut highest = 0.0;
        for line in script.lines() {
            let score = similarity(fragment, &line.text);
            if score > highest {
                highest = score;
                best = Some((line, score));
            }
        }

        match best {
            Some((line, score)) => {
                debug!(line = line.index, similarity = score, "fallback scan match");
                MatchResult::matched(line, MatchMethod::OverallScan, score, script)
            }
            None => {
                debug!("fallback scan found no match");
                MatchResult::unmatched(
                    NO_MATCH_FOUND,
                    AlignmentState {
                        mode: AlignMode::Tracking,
                        next_line_to_check: state.next_line_to_check,
                    },
                )
            }
        }
    }
}
