//! The script being followed: an immutable, ordered list of lines.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// One line of the script. `index` is its position in script order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScriptLine {
    pub index: usize,
    pub text: String,
}

/// A record in the script source. Extra fields (speaker, cue notes, ...) are ignored.
#[derive(Debug, Deserialize)]
struct ScriptRecord {
    text: String,
}

/// An ordered sequence of [`ScriptLine`]s, loaded once before alignment begins.
#[derive(Debug, Clone, Default)]
pub struct Script {
    lines: Vec<ScriptLine>,
}

impl Script {
    /// Build a script from line texts, in order.
    pub fn from_texts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let lines = texts
            .into_iter()
            .enumerate()
            .map(|(index, text)| ScriptLine {
                index,
                text: text.into(),
            })
            .collect();
        Self { lines }
    }

    /// Parse a JSON array of `{ "text": ... }` records.
    pub fn from_reader<R: Read>(r: R) -> Result<Self> {
        let records: Vec<ScriptRecord> = serde_json::from_reader(r)
            .map_err(|err| Error::Script(format!("malformed script source: {err}")))?;
        Ok(Self::from_texts(records.into_iter().map(|record| record.text)))
    }

    /// Load a script from a JSON file on disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|err| {
            Error::Script(format!("failed to open script '{}': {err}", path.display()))
        })?;
        let script = Self::from_reader(BufReader::new(file))?;
        tracing::info!(path = %path.display(), lines = script.len(), "loaded script");
        Ok(script)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn lines(&self) -> &[ScriptLine] {
        &self.lines
    }

    pub fn first(&self) -> Option<&ScriptLine> {
        self.lines.first()
    }

    pub fn line(&self, index: usize) -> Option<&ScriptLine> {
        self.lines.get(index)
    }

    /// The line immediately after `line` in script order, or `None` at the end.
    pub fn next_after(&self, line: &ScriptLine) -> Option<&ScriptLine> {
        self.lines.get(line.index + 1)
    }
}
