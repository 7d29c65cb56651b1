use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc as std_mpsc, Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, Stream, StreamConfig};
use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::HeapRb;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use super::device::{CaptureConfig, CaptureDevice, CaptureEvent, MediaFrame, TrackKind};
use crate::error::EngineError;
use crate::session::event::EventSink;

type RingProducer = ringbuf::HeapProd<i16>;
type RingConsumer = ringbuf::HeapCons<i16>;

/// Commands sent to the capture thread.
enum CaptureCommand {
    Access {
        reply: oneshot::Sender<Result<(), EngineError>>,
    },
    Preview {
        reply: oneshot::Sender<Result<(), EngineError>>,
    },
    StartSpan {
        reply: oneshot::Sender<Result<mpsc::Receiver<MediaFrame>, EngineError>>,
    },
    StopSpan {
        reply: oneshot::Sender<Result<(), EngineError>>,
    },
    Release,
}

/// Microphone capture adapter backed by cpal.
///
/// A dedicated thread owns the non-Send `Stream`; the audio callback
/// downmixes to mono, resamples to the target rate and pushes into a
/// lock-free ring which the thread drains into frames on a fixed cadence.
/// This adapter exposes an audio track only; toggling the video track is
/// reported as unsupported.
pub struct MicrophoneCapture {
    config: CaptureConfig,
    cmd_tx: std_mpsc::Sender<CaptureCommand>,
    muted: Arc<AtomicBool>,
    released: AtomicBool,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl MicrophoneCapture {
    /// Spawn the capture thread. Hardware is not touched until
    /// `request_access`.
    pub fn spawn(config: CaptureConfig, sink: EventSink) -> Result<Self, EngineError> {
        let (cmd_tx, cmd_rx) = std_mpsc::channel();
        let muted = Arc::new(AtomicBool::new(false));

        let thread_config = config.clone();
        let thread_muted = Arc::clone(&muted);
        let thread = thread::Builder::new()
            .name("interview-capture".to_string())
            .spawn(move || capture_thread_main(thread_config, thread_muted, sink, cmd_rx))
            .map_err(|e| {
                EngineError::DeviceUnavailable(format!("failed to spawn capture thread: {}", e))
            })?;

        Ok(Self {
            config,
            cmd_tx,
            muted,
            released: AtomicBool::new(false),
            thread: Mutex::new(Some(thread)),
        })
    }

    fn send(&self, cmd: CaptureCommand) -> Result<(), EngineError> {
        self.cmd_tx
            .send(cmd)
            .map_err(|_| EngineError::DeviceUnavailable("capture thread not running".to_string()))
    }
}

#[async_trait::async_trait]
impl CaptureDevice for MicrophoneCapture {
    async fn request_access(&self) -> Result<(), EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(CaptureCommand::Access { reply: reply_tx })?;
        reply_rx
            .await
            .map_err(|_| EngineError::DeviceUnavailable("capture thread dropped".to_string()))?
    }

    async fn start_preview(&self) -> Result<(), EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(CaptureCommand::Preview { reply: reply_tx })?;
        reply_rx
            .await
            .map_err(|_| EngineError::DeviceUnavailable("capture thread dropped".to_string()))?
    }

    async fn start_recording(&self) -> Result<mpsc::Receiver<MediaFrame>, EngineError> {
        if self.released.load(Ordering::SeqCst) {
            return Err(EngineError::Capture("device already released".to_string()));
        }
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(CaptureCommand::StartSpan { reply: reply_tx })?;
        reply_rx
            .await
            .map_err(|_| EngineError::DeviceUnavailable("capture thread dropped".to_string()))?
    }

    async fn stop_recording(&self) -> Result<(), EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(CaptureCommand::StopSpan { reply: reply_tx })?;
        reply_rx
            .await
            .map_err(|_| EngineError::DeviceUnavailable("capture thread dropped".to_string()))?
    }

    fn set_track_enabled(&self, kind: TrackKind, enabled: bool) -> Result<(), EngineError> {
        match kind {
            TrackKind::Audio => {
                self.muted.store(!enabled, Ordering::SeqCst);
                debug!("microphone track enabled={}", enabled);
                Ok(())
            }
            TrackKind::Video => Err(EngineError::TrackUnsupported(
                TrackKind::Video.as_str().to_string(),
            )),
        }
    }

    fn release(&self) {
        if self.released.swap(true, Ordering::SeqCst) {
            return; // already released
        }
        let _ = self.cmd_tx.send(CaptureCommand::Release);
        if let Some(handle) = self.thread.lock().expect("thread lock poisoned").take() {
            let _ = handle.join();
        }
        info!("Microphone capture released");
    }

    fn name(&self) -> &str {
        "microphone"
    }
}

impl Drop for MicrophoneCapture {
    fn drop(&mut self) {
        self.release();
    }
}

/// State of one in-flight recording span on the capture thread.
struct SpanOut {
    frames_tx: mpsc::Sender<MediaFrame>,
    sent_samples: u64,
}

fn capture_thread_main(
    config: CaptureConfig,
    muted: Arc<AtomicBool>,
    sink: EventSink,
    cmd_rx: std_mpsc::Receiver<CaptureCommand>,
) {
    // The Stream is not Send, so it lives here for the thread's lifetime.
    let mut stream: Option<Stream> = None;
    let mut consumer: Option<RingConsumer> = None;
    let mut span: Option<SpanOut> = None;

    let frame_interval = Duration::from_millis(config.frame_duration_ms.max(10));
    let samples_per_frame = (config.sample_rate as u64 * config.frame_duration_ms / 1000)
        as usize
        * config.channels as usize;

    loop {
        match cmd_rx.recv_timeout(frame_interval) {
            Ok(CaptureCommand::Access { reply }) => {
                let result = find_device(config.device_id.as_deref()).map(|device| {
                    let name = device.name().unwrap_or_else(|_| "unknown".to_string());
                    info!("Capture access granted: {}", name);
                });
                let _ = reply.send(result);
            }
            Ok(CaptureCommand::Preview { reply }) => {
                let result = ensure_stream(&config, &muted, &sink, &mut stream, &mut consumer);
                let _ = reply.send(result);
            }
            Ok(CaptureCommand::StartSpan { reply }) => {
                let result = (|| {
                    if span.is_some() {
                        return Err(EngineError::Capture(
                            "recording span already in flight".to_string(),
                        ));
                    }
                    ensure_stream(&config, &muted, &sink, &mut stream, &mut consumer)?;
                    // Discard stale preview audio so the span starts clean
                    if let Some(consumer) = consumer.as_mut() {
                        drain_ring(consumer);
                    }
                    let (frames_tx, frames_rx) = mpsc::channel(64);
                    span = Some(SpanOut {
                        frames_tx,
                        sent_samples: 0,
                    });
                    info!("Microphone recording span started");
                    Ok(frames_rx)
                })();
                let _ = reply.send(result);
            }
            Ok(CaptureCommand::StopSpan { reply }) => {
                if let Some(mut out) = span.take() {
                    // Flush whatever the ring still holds into a final frame
                    if let Some(consumer) = consumer.as_mut() {
                        let samples = drain_ring(consumer);
                        if !samples.is_empty() {
                            send_frame(&config, &mut out, samples);
                        }
                    }
                    info!("Microphone recording span stopped");
                }
                let _ = reply.send(Ok(()));
            }
            Ok(CaptureCommand::Release) => {
                span.take();
                consumer.take();
                stream.take();
                break;
            }
            Err(std_mpsc::RecvTimeoutError::Timeout) => {
                // Frame cadence: drain the ring, forward to the span if one
                // is live, discard otherwise so preview audio never goes stale.
                if let Some(ring) = consumer.as_mut() {
                    if ring.occupied_len() < samples_per_frame && span.is_some() {
                        continue;
                    }
                    let samples = drain_ring(ring);
                    if samples.is_empty() {
                        continue;
                    }
                    if let Some(out) = span.as_mut() {
                        send_frame(&config, out, samples);
                    }
                }
            }
            Err(std_mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }

    debug!("Capture thread shutting down");
}

fn drain_ring(consumer: &mut RingConsumer) -> Vec<i16> {
    let available = consumer.occupied_len();
    let mut samples = vec![0i16; available];
    let read = consumer.pop_slice(&mut samples);
    samples.truncate(read);
    samples
}

fn send_frame(config: &CaptureConfig, out: &mut SpanOut, samples: Vec<i16>) {
    let timestamp_ms = out.sent_samples * 1000
        / (config.sample_rate as u64 * config.channels as u64).max(1);
    out.sent_samples += samples.len() as u64;

    let frame = MediaFrame {
        samples,
        sample_rate: config.sample_rate,
        channels: config.channels,
        timestamp_ms,
    };
    if out.frames_tx.try_send(frame).is_err() {
        warn!("Frame consumer lagging, dropping capture frame");
    }
}

fn find_device(selected: Option<&str>) -> Result<Device, EngineError> {
    let host = cpal::default_host();

    if let Some(id) = selected {
        let devices = host.input_devices().map_err(|e| {
            EngineError::DeviceUnavailable(format!("failed to enumerate devices: {}", e))
        })?;
        for device in devices {
            if let Ok(name) = device.name() {
                if name == id {
                    return Ok(device);
                }
            }
        }
        warn!("Selected input device '{}' not found, falling back to default", id);
    }

    host.default_input_device()
        .ok_or_else(|| EngineError::DeviceUnavailable("no default input device".to_string()))
}

fn ensure_stream(
    config: &CaptureConfig,
    muted: &Arc<AtomicBool>,
    sink: &EventSink,
    stream: &mut Option<Stream>,
    consumer: &mut Option<RingConsumer>,
) -> Result<(), EngineError> {
    if stream.is_some() {
        return Ok(());
    }

    let device = find_device(config.device_id.as_deref())?;
    let device_name = device.name().unwrap_or_else(|_| "unknown".to_string());

    let supported = device.default_input_config().map_err(|e| {
        EngineError::DeviceUnavailable(format!("failed to read device config: {}", e))
    })?;
    let sample_format = supported.sample_format();
    let stream_config: StreamConfig = supported.config();

    // Two seconds of headroom between the callback and the drain cadence
    let capacity = (config.sample_rate as usize * config.channels as usize * 2).max(1024);
    let ring = HeapRb::<i16>::new(capacity);
    let (producer, ring_consumer) = ring.split();

    let new_stream = build_input_stream(
        &device,
        &stream_config,
        sample_format,
        config.sample_rate,
        producer,
        Arc::clone(muted),
        sink.clone(),
    )?;

    new_stream
        .play()
        .map_err(|e| EngineError::DeviceUnavailable(format!("failed to start stream: {}", e)))?;

    info!(
        "Input stream open: {} ({}Hz/{}ch -> {}Hz mono)",
        device_name,
        stream_config.sample_rate.0,
        stream_config.channels,
        config.sample_rate
    );

    *stream = Some(new_stream);
    *consumer = Some(ring_consumer);
    Ok(())
}

fn build_input_stream(
    device: &Device,
    stream_config: &StreamConfig,
    sample_format: SampleFormat,
    target_sample_rate: u32,
    mut producer: RingProducer,
    muted: Arc<AtomicBool>,
    sink: EventSink,
) -> Result<Stream, EngineError> {
    let channels = stream_config.channels as usize;
    let device_sample_rate = stream_config.sample_rate.0;

    let err_sink = sink;
    let err_fn = move |err: cpal::StreamError| {
        error!("Input stream error: {}", err);
        err_sink.capture(CaptureEvent::TrackEnded {
            kind: TrackKind::Audio,
            message: err.to_string(),
        });
    };

    let stream = match sample_format {
        SampleFormat::I16 => device.build_input_stream(
            stream_config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                push_samples(
                    data,
                    channels,
                    device_sample_rate,
                    target_sample_rate,
                    &muted,
                    &mut producer,
                );
            },
            err_fn,
            None,
        ),
        SampleFormat::F32 => device.build_input_stream(
            stream_config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                let i16_data: Vec<i16> = data
                    .iter()
                    .map(|&s| (s.clamp(-1.0, 1.0) * 32767.0) as i16)
                    .collect();
                push_samples(
                    &i16_data,
                    channels,
                    device_sample_rate,
                    target_sample_rate,
                    &muted,
                    &mut producer,
                );
            },
            err_fn,
            None,
        ),
        other => {
            return Err(EngineError::DeviceUnavailable(format!(
                "unsupported sample format: {:?}",
                other
            )))
        }
    }
    .map_err(|e| EngineError::DeviceUnavailable(format!("failed to build stream: {}", e)))?;

    Ok(stream)
}

fn push_samples(
    data: &[i16],
    channels: usize,
    device_sample_rate: u32,
    target_sample_rate: u32,
    muted: &AtomicBool,
    producer: &mut RingProducer,
) {
    // Downmix to mono
    let mono: Vec<i16> = if channels > 1 {
        data.chunks(channels)
            .map(|chunk| {
                let sum: i32 = chunk.iter().map(|&s| s as i32).sum();
                (sum / channels as i32) as i16
            })
            .collect()
    } else {
        data.to_vec()
    };

    let mut resampled = resample(&mono, device_sample_rate, target_sample_rate);

    // A muted track keeps producing (the recording keeps its timeline),
    // just with silence.
    if muted.load(Ordering::SeqCst) {
        resampled.iter_mut().for_each(|s| *s = 0);
    }

    let _ = producer.push_slice(&resampled);
}

/// Linear-interpolation resampler, good enough for speech input.
fn resample(samples: &[i16], from_rate: u32, to_rate: u32) -> Vec<i16> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let output_len = (samples.len() as f64 / ratio).ceil() as usize;
    let mut output = Vec::with_capacity(output_len);

    for i in 0..output_len {
        let src_pos = i as f64 * ratio;
        let src_idx = src_pos.floor() as usize;
        let frac = src_pos.fract();

        let sample = if src_idx + 1 < samples.len() {
            let s0 = samples[src_idx] as f64;
            let s1 = samples[src_idx + 1] as f64;
            (s0 + (s1 - s0) * frac) as i16
        } else if src_idx < samples.len() {
            samples[src_idx]
        } else {
            0
        };
        output.push(sample);
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resample_same_rate() {
        let samples = vec![100, 200, 300, 400];
        assert_eq!(resample(&samples, 48000, 48000), samples);
    }

    #[test]
    fn test_resample_downsample() {
        let samples: Vec<i16> = (0..48).map(|i| i * 100).collect();
        let result = resample(&samples, 48000, 16000);
        assert!(result.len() >= 15 && result.len() <= 17);
    }

    #[test]
    fn test_resample_upsample() {
        let samples = vec![0, 1000, 2000, 3000];
        let result = resample(&samples, 8000, 16000);
        assert!(result.len() >= 7 && result.len() <= 9);
    }
}
