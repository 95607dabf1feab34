//! Overlapping, time-windowed audio segments built from fixed-size capture frames.
//!
//! Segment 0 is one fresh capture batch of `chunk_duration`. Every later segment is the trailing
//! `overlap_duration` of the previous fresh batch followed by a new fresh batch, so all segments
//! but the first are `chunk + overlap` long. The extra leading context lets a line that was
//! cut at a segment boundary still be recognized in the next segment.

use crate::opts::{BYTES_PER_SAMPLE, FRAME_SAMPLES, Opts, SAMPLE_RATE, frames_for};
use crate::{Error, Result};

/// A blocking source of fixed-size 16-bit little-endian mono PCM frames.
///
/// Implementations should be overrun tolerant: a read returns best-effort data rather than
/// failing because the device buffer overflowed. Any capture resource should be released on
/// drop.
pub trait FrameSource {
    /// Read exactly `frame_samples` samples (`frame_samples * 2` bytes).
    fn read_frame(&mut self, frame_samples: usize) -> Result<Vec<u8>>;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn read_frame(&mut self, frame_samples: usize) -> Result<Vec<u8>> {
        (**self).read_frame(frame_samples)
    }
}

/// Frame arithmetic derived from [`Opts`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmenterConfig {
    /// Samples per capture read.
    pub frame_samples: usize,
    /// Frames per fresh capture batch.
    pub chunk_frames: usize,
    /// Frames carried over from the previous batch.
    pub overlap_frames: usize,
    pub total_segments: usize,
    pub chunk_duration: f64,
    pub overlap_duration: f64,
}

impl SegmenterConfig {
    pub fn from_opts(opts: &Opts) -> Result<Self> {
        opts.validate()?;
        Ok(Self {
            frame_samples: FRAME_SAMPLES,
            chunk_frames: frames_for(opts.chunk_duration),
            overlap_frames: frames_for(opts.overlap_duration),
            total_segments: opts.total_segments(),
            chunk_duration: opts.chunk_duration,
            overlap_duration: opts.overlap_duration,
        })
    }

    fn frame_bytes(&self) -> usize {
        self.frame_samples * BYTES_PER_SAMPLE
    }
}

/// One windowed slice of captured audio.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioSegment {
    /// Position in the session, starting at 0.
    pub index: usize,
    /// 16-bit little-endian mono PCM at [`SAMPLE_RATE`].
    pub pcm: Vec<u8>,
    /// Nominal start of the segment's audio since capture began, overlap included.
    pub start_seconds: f64,
    /// Nominal length in seconds (`chunk`, or `chunk + overlap` after the first segment).
    pub nominal_duration: f64,
}

impl AudioSegment {
    /// Actual captured length in seconds.
    pub fn captured_seconds(&self) -> f64 {
        (self.pcm.len() / BYTES_PER_SAMPLE) as f64 / SAMPLE_RATE as f64
    }

    /// Samples normalized from i16 PCM to f32 in `[-1.0, 1.0]`.
    pub fn samples_f32(&self) -> Vec<f32> {
        pcm_to_f32(&self.pcm)
    }
}

/// Convert 16-bit little-endian PCM bytes to normalized `f32` samples.
pub fn pcm_to_f32(pcm: &[u8]) -> Vec<f32> {
    pcm.chunks_exact(BYTES_PER_SAMPLE)
        .map(|b| i16::from_le_bytes([b[0], b[1]]) as f32 / i16::MAX as f32)
        .collect()
}

/// Lazy, finite, non-restartable sequence of [`AudioSegment`]s.
///
/// Each call to `next` blocks on the frame source. A capture error is yielded once and ends
/// the sequence.
pub struct OverlapSegmenter<'s, S: FrameSource + ?Sized> {
    config: SegmenterConfig,
    source: &'s mut S,
    produced: usize,
    // Fresh frames of the previous batch; the overlap is taken from its tail.
    previous_batch: Vec<Vec<u8>>,
    failed: bool,
}

impl<'s, S: FrameSource + ?Sized> OverlapSegmenter<'s, S> {
    pub fn new(config: SegmenterConfig, source: &'s mut S) -> Self {
        Self {
            config,
            source,
            produced: 0,
            previous_batch: Vec::new(),
            failed: false,
        }
    }

    fn capture_batch(&mut self) -> Result<Vec<Vec<u8>>> {
        let expected = self.config.frame_bytes();
        let mut batch = Vec::with_capacity(self.config.chunk_frames);
        for _ in 0..self.config.chunk_frames {
            let frame = self.source.read_frame(self.config.frame_samples)?;
            if frame.len() != expected {
                return Err(Error::capture(format!(
                    "frame source returned {} bytes, expected {expected}",
                    frame.len()
                )));
            }
            batch.push(frame);
        }
        Ok(batch)
    }

    fn next_segment(&mut self) -> Result<AudioSegment> {
        let batch = self.capture_batch()?;
        let index = self.produced;

        let carried: &[Vec<u8>] = if index == 0 {
            &[]
        } else {
            let keep = self.config.overlap_frames.min(self.previous_batch.len());
            &self.previous_batch[self.previous_batch.len() - keep..]
        };

        let frame_count = carried.len() + batch.len();
        let mut pcm = Vec::with_capacity(frame_count * self.config.frame_bytes());
        for frame in carried.iter().chain(batch.iter()) {
            pcm.extend_from_slice(frame);
        }

        let fresh_start = self.config.chunk_duration * index as f64;
        let (start_seconds, nominal_duration) = if index == 0 {
            (fresh_start, self.config.chunk_duration)
        } else {
            (
                fresh_start - self.config.overlap_duration,
                self.config.chunk_duration + self.config.overlap_duration,
            )
        };

        self.previous_batch = batch;
        Ok(AudioSegment {
            index,
            pcm,
            start_seconds,
            nominal_duration,
        })
    }
}

impl<S: FrameSource + ?Sized> Iterator for OverlapSegmenter<'_, S> {
    type Item = Result<AudioSegment>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.produced >= self.config.total_segments {
            return None;
        }

        match self.next_segment() {
            Ok(segment) => {
                self.produced += 1;
                Some(Ok(segment))
            }
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.failed {
            return (0, Some(0));
        }
        (0, Some(self.config.total_segments - self.produced))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Emits frames whose samples all carry the frame's sequence number.
    struct CountingSource {
        frames_read: usize,
        fail_after: Option<usize>,
    }

    impl CountingSource {
        fn new() -> Self {
            Self {
                frames_read: 0,
                fail_after: None,
            }
        }
    }

    impl FrameSource for CountingSource {
        fn read_frame(&mut self, frame_samples: usize) -> Result<Vec<u8>> {
            if self.fail_after == Some(self.frames_read) {
                return Err(Error::capture("device unplugged"));
            }
            let value = self.frames_read as i16;
            self.frames_read += 1;
            Ok(std::iter::repeat_n(value.to_le_bytes(), frame_samples)
                .flatten()
                .collect())
        }
    }

    fn frame_ids(segment: &AudioSegment, frame_samples: usize) -> Vec<i16> {
        segment
            .pcm
            .chunks_exact(frame_samples * BYTES_PER_SAMPLE)
            .map(|frame| i16::from_le_bytes([frame[0], frame[1]]))
            .collect()
    }

    #[test]
    fn default_options_produce_nine_overlapping_segments() -> anyhow::Result<()> {
        let config = SegmenterConfig::from_opts(&Opts::default())?;
        assert_eq!(config.chunk_frames, 7);
        assert_eq!(config.overlap_frames, 3);

        let mut source = CountingSource::new();
        let segments: Vec<AudioSegment> =
            OverlapSegmenter::new(config, &mut source).collect::<Result<_>>()?;

        assert_eq!(segments.len(), 9);
        let frame_bytes = FRAME_SAMPLES * BYTES_PER_SAMPLE;
        assert_eq!(segments[0].pcm.len(), 7 * frame_bytes);
        assert_eq!(segments[0].nominal_duration, 2.0);
        assert_eq!(segments[0].start_seconds, 0.0);
        for segment in &segments[1..] {
            assert_eq!(segment.pcm.len(), 10 * frame_bytes);
            assert_eq!(segment.nominal_duration, 3.0);
        }
        assert_eq!(segments[1].start_seconds, 1.0);
        assert_eq!(segments[8].start_seconds, 15.0);
        assert_eq!(source.frames_read, 9 * 7);
        Ok(())
    }

    #[test]
    fn overlap_is_the_tail_of_the_previous_fresh_batch() -> anyhow::Result<()> {
        let config = SegmenterConfig::from_opts(&Opts::default())?;
        let mut source = CountingSource::new();
        let segments: Vec<AudioSegment> = OverlapSegmenter::new(config, &mut source)
            .take(3)
            .collect::<Result<_>>()?;

        assert_eq!(frame_ids(&segments[0], FRAME_SAMPLES), vec![0, 1, 2, 3, 4, 5, 6]);
        assert_eq!(
            frame_ids(&segments[1], FRAME_SAMPLES),
            vec![4, 5, 6, 7, 8, 9, 10, 11, 12, 13]
        );
        // The carried frames come from the fresh part only, never from the previous overlap.
        assert_eq!(
            frame_ids(&segments[2], FRAME_SAMPLES),
            vec![11, 12, 13, 14, 15, 16, 17, 18, 19, 20]
        );
        Ok(())
    }

    #[test]
    fn overlap_shorter_than_a_frame_carries_nothing() -> anyhow::Result<()> {
        let opts = Opts {
            overlap_duration: 0.2,
            ..Opts::default()
        };
        let config = SegmenterConfig::from_opts(&opts)?;
        assert_eq!(config.chunk_frames, 7);
        assert_eq!(config.overlap_frames, 0);

        let mut source = CountingSource::new();
        let segments: Vec<AudioSegment> = OverlapSegmenter::new(config, &mut source)
            .take(3)
            .collect::<Result<_>>()?;

        let frame_bytes = FRAME_SAMPLES * BYTES_PER_SAMPLE;
        for segment in &segments[1..] {
            assert_eq!(segment.pcm.len(), config.chunk_frames * frame_bytes);
            assert!((segment.nominal_duration - 2.2).abs() < 1e-9);
            assert!(segment.captured_seconds() < segment.nominal_duration);
        }
        assert_eq!(
            frame_ids(&segments[1], FRAME_SAMPLES),
            vec![7, 8, 9, 10, 11, 12, 13]
        );
        Ok(())
    }

    #[test]
    fn segments_are_produced_lazily() -> anyhow::Result<()> {
        let config = SegmenterConfig::from_opts(&Opts::default())?;
        let mut source = CountingSource::new();
        let mut segmenter = OverlapSegmenter::new(config, &mut source);

        let first = segmenter.next().transpose()?;
        assert!(first.is_some());
        drop(segmenter);
        assert_eq!(source.frames_read, 7);
        Ok(())
    }

    #[test]
    fn capture_error_is_yielded_once_then_ends() -> anyhow::Result<()> {
        let config = SegmenterConfig::from_opts(&Opts::default())?;
        let mut source = CountingSource::new();
        source.fail_after = Some(10);
        let mut segmenter = OverlapSegmenter::new(config, &mut source);

        assert!(matches!(segmenter.next(), Some(Ok(_))));
        assert!(matches!(segmenter.next(), Some(Err(Error::Capture(_)))));
        assert!(segmenter.next().is_none());
        Ok(())
    }

    #[test]
    fn short_frames_are_rejected() -> anyhow::Result<()> {
        struct ShortSource;
        impl FrameSource for ShortSource {
            fn read_frame(&mut self, _frame_samples: usize) -> Result<Vec<u8>> {
                Ok(vec![0; 3])
            }
        }

        let config = SegmenterConfig::from_opts(&Opts::default())?;
        let mut source = ShortSource;
        let first = OverlapSegmenter::new(config, &mut source).next();
        assert!(matches!(first, Some(Err(Error::Capture(_)))));
        Ok(())
    }

    #[test]
    fn invalid_options_are_rejected_before_capture() {
        let opts = Opts {
            overlap_duration: 3.0,
            ..Opts::default()
        };
        assert!(SegmenterConfig::from_opts(&opts).is_err());
    }

    #[test]
    fn pcm_is_normalized_to_unit_range() {
        let mut pcm = Vec::new();
        pcm.extend_from_slice(&i16::MAX.to_le_bytes());
        pcm.extend_from_slice(&0i16.to_le_bytes());
        let samples = pcm_to_f32(&pcm);
        assert_eq!(samples, vec![1.0, 0.0]);
    }
}
