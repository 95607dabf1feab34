//! Live microphone capture via `cpal`.
//!
//! The device callback runs on a driver thread; it downmixes to mono, converts to i16, and hands
//! buffers to the session thread over a bounded channel. When the session falls behind
//! (a slow transcription call), new buffers are dropped instead of failing, which is the
//! overrun-tolerant read the segmenter expects.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError, SyncSender, TrySendError, sync_channel};
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, SampleRate, Stream, StreamConfig};
use tracing::{info, warn};

use crate::opts::{BYTES_PER_SAMPLE, SAMPLE_RATE};
use crate::segmenter::FrameSource;
use crate::{Error, Result};

/// Device buffers queued between the callback and the reader.
const CHANNEL_CAPACITY: usize = 512;

/// How long a read waits for the device before treating it as gone.
const READ_TIMEOUT: Duration = Duration::from_secs(5);

/// A [`FrameSource`] backed by an input device. The device is released when this is dropped.
pub struct MicFrameSource {
    stream: Stream,
    rx: Receiver<Vec<i16>>,
    pending: VecDeque<i16>,
    dropped_buffers: Arc<AtomicUsize>,
}

impl MicFrameSource {
    /// Open the host's default input device.
    pub fn open_default() -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| Error::capture("no default input device available"))?;
        Self::open(&device)
    }

    /// Open `device` at 16 kHz and start capturing.
    pub fn open(device: &cpal::Device) -> Result<Self> {
        let name = device.name().unwrap_or_else(|_| "<unknown>".to_owned());

        let supported = device
            .supported_input_configs()
            .map_err(|err| Error::capture(format!("failed to query '{name}': {err}")))?
            .filter(|range| {
                range.min_sample_rate() <= SampleRate(SAMPLE_RATE)
                    && range.max_sample_rate() >= SampleRate(SAMPLE_RATE)
                    && matches!(range.sample_format(), SampleFormat::I16 | SampleFormat::F32)
            })
            .min_by_key(|range| range.channels())
            .ok_or_else(|| {
                Error::capture(format!("input device '{name}' cannot capture at {SAMPLE_RATE} Hz"))
            })?
            .with_sample_rate(SampleRate(SAMPLE_RATE));

        let channels = usize::from(supported.channels());
        let sample_format = supported.sample_format();
        let config: StreamConfig = supported.into();

        let (tx, rx) = sync_channel::<Vec<i16>>(CHANNEL_CAPACITY);
        let dropped_buffers = Arc::new(AtomicUsize::new(0));
        let dropped = Arc::clone(&dropped_buffers);
        let on_error = |err: cpal::StreamError| warn!(error = %err, "input stream error");

        let stream = match sample_format {
            SampleFormat::I16 => device.build_input_stream(
                &config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    forward(&tx, &dropped, downmix(data, channels, |s| s as f32))
                },
                on_error,
                None,
            ),
            SampleFormat::F32 => device.build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    forward(
                        &tx,
                        &dropped,
                        downmix(data, channels, |s| s * i16::MAX as f32),
                    )
                },
                on_error,
                None,
            ),
            other => {
                return Err(Error::capture(format!(
                    "unsupported sample format {other:?}"
                )));
            }
        }
        .map_err(|err| Error::capture(format!("failed to open input stream on '{name}': {err}")))?;

        stream
            .play()
            .map_err(|err| Error::capture(format!("failed to start input stream: {err}")))?;

        info!(device = %name, channels, "microphone capture started");

        Ok(Self {
            stream,
            rx,
            pending: VecDeque::new(),
            dropped_buffers,
        })
    }

    /// Device buffers discarded so far because the reader fell behind.
    pub fn dropped_buffers(&self) -> usize {
        self.dropped_buffers.load(Ordering::Relaxed)
    }
}

impl FrameSource for MicFrameSource {
    fn read_frame(&mut self, frame_samples: usize) -> Result<Vec<u8>> {
        while self.pending.len() < frame_samples {
            match self.rx.recv_timeout(READ_TIMEOUT) {
                Ok(buf) => self.pending.extend(buf),
                Err(RecvTimeoutError::Timeout) => {
                    return Err(Error::capture(format!(
                        "no audio from input device for {}s",
                        READ_TIMEOUT.as_secs()
                    )));
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(Error::capture("input stream closed"));
                }
            }
        }

        let mut frame = Vec::with_capacity(frame_samples * BYTES_PER_SAMPLE);
        for sample in self.pending.drain(..frame_samples) {
            frame.extend_from_slice(&sample.to_le_bytes());
        }
        Ok(frame)
    }
}

impl Drop for MicFrameSource {
    fn drop(&mut self) {
        let _ = self.stream.pause();
        info!(
            dropped_buffers = self.dropped_buffers(),
            "microphone capture released"
        );
    }
}

fn forward(tx: &SyncSender<Vec<i16>>, dropped: &AtomicUsize, buf: Vec<i16>) {
    match tx.try_send(buf) {
        Ok(()) | Err(TrySendError::Disconnected(_)) => {}
        Err(TrySendError::Full(_)) => {
            dropped.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Average interleaved frames into mono i16. `scale` maps a sample onto the i16 range.
fn downmix<T: Copy>(data: &[T], channels: usize, scale: impl Fn(T) -> f32) -> Vec<i16> {
    let channels = channels.max(1);
    data.chunks(channels)
        .map(|frame| {
            let sum: f32 = frame.iter().map(|&s| scale(s)).sum();
            (sum / frame.len() as f32).clamp(i16::MIN as f32, i16::MAX as f32) as i16
        })
        .collect()
}
