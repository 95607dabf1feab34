//! WAV helpers: replaying a recording as a frame source, and the debug audio sink.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

use crate::opts::{BYTES_PER_SAMPLE, SAMPLE_RATE};
use crate::segmenter::FrameSource;
use crate::{Error, Result};

/// The on-disk format shared by replayed recordings and debug dumps.
pub fn capture_wav_spec() -> WavSpec {
    WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    }
}

/// A [`FrameSource`] that replays a 16 kHz mono 16-bit WAV recording.
///
/// Reading past the end of the recording yields silence, the same best-effort behavior a live
/// device gives on an overrun, so a session always runs for its configured duration.
pub struct WavFrameSource<R: Read> {
    reader: WavReader<R>,
    exhausted: bool,
}

impl WavFrameSource<BufReader<File>> {
    /// Open a WAV file for replay.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let reader = WavReader::open(path).map_err(|err| {
            Error::capture(format!("failed to open WAV '{}': {err}", path.display()))
        })?;
        Self::from_wav_reader(reader)
    }
}

impl<R: Read> WavFrameSource<R> {
    /// Replay WAV data from any reader.
    pub fn from_reader(r: R) -> Result<Self> {
        let reader = WavReader::new(r)
            .map_err(|err| Error::capture(format!("failed to read WAV data: {err}")))?;
        Self::from_wav_reader(reader)
    }

    fn from_wav_reader(reader: WavReader<R>) -> Result<Self> {
        let spec = reader.spec();

        // We require exactly the capture format so frames can be passed through untouched.
        if spec.channels != 1 {
            return Err(Error::capture(format!(
                "expected mono WAV (1 channel), got {} channels",
                spec.channels
            )));
        }
        if spec.sample_rate != SAMPLE_RATE {
            return Err(Error::capture(format!(
                "expected {SAMPLE_RATE} Hz sample rate, got {} Hz",
                spec.sample_rate
            )));
        }
        if spec.bits_per_sample != 16 || spec.sample_format != SampleFormat::Int {
            return Err(Error::capture(format!(
                "expected 16-bit integer PCM, got {}-bit {:?}",
                spec.bits_per_sample, spec.sample_format
            )));
        }

        Ok(Self {
            reader,
            exhausted: false,
        })
    }
}

impl<R: Read> FrameSource for WavFrameSource<R> {
    fn read_frame(&mut self, frame_samples: usize) -> Result<Vec<u8>> {
        let mut frame = Vec::with_capacity(frame_samples * BYTES_PER_SAMPLE);

        if !self.exhausted {
            let mut samples = self.reader.samples::<i16>();
            while frame.len() < frame_samples * BYTES_PER_SAMPLE {
                match samples.next() {
                    Some(sample) => {
                        let sample = sample.map_err(|err| {
                            Error::capture(format!("failed to read WAV sample: {err}"))
                        })?;
                        frame.extend_from_slice(&sample.to_le_bytes());
                    }
                    None => {
                        self.exhausted = true;
                        tracing::debug!("recording exhausted, padding with silence");
                        break;
                    }
                }
            }
        }

        frame.resize(frame_samples * BYTES_PER_SAMPLE, 0);
        Ok(frame)
    }
}

/// Write a segment's PCM to `path` as a mono 16-bit 16 kHz WAV file, replacing any existing file.
pub fn write_debug_wav(path: impl AsRef<Path>, pcm: &[u8]) -> Result<()> {
    let mut writer = WavWriter::create(path, capture_wav_spec())?;
    for chunk in pcm.chunks_exact(BYTES_PER_SAMPLE) {
        writer.write_sample(i16::from_le_bytes([chunk[0], chunk[1]]))?;
    }
    writer.finalize()?;
    Ok(())
}
