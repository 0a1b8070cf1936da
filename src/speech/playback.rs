//! Speaker playback
//!
//! A dedicated playback thread owns the cpal output stream (stream handles
//! are not `Send`) and takes commands over a channel. One track plays at a
//! time; a new play command replaces the current one. Utterance lifecycle
//! events go back over a tokio channel so the async side can observe them.

use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{RecvTimeoutError, Sender, channel};
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, Stream, StreamConfig};
use tokio::sync::mpsc;

use super::SynthesisEvent;
use crate::{Error, Result};

/// Playback sample rate (matches common TTS output)
pub const PLAYBACK_SAMPLE_RATE: u32 = 24000;

/// How often the playback thread wakes to check for track completion
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Commands handled by the playback thread
enum PlaybackCommand {
    Play {
        samples: Vec<f32>,
        utterance: u64,
        events: mpsc::Sender<SynthesisEvent>,
    },
    Pause,
    Resume,
    Cancel,
    Shutdown,
}

/// The track currently on the output stream
struct ActiveTrack {
    stream: Stream,
    utterance: u64,
    events: mpsc::Sender<SynthesisEvent>,
    finished: Arc<AtomicBool>,
}

/// Handle to the playback thread
pub struct AudioPlayback {
    commands: Sender<PlaybackCommand>,
}

impl AudioPlayback {
    /// Spawn the playback thread and open the default output device
    ///
    /// # Errors
    ///
    /// Returns error if there is no output device or no usable config
    pub fn new() -> Result<Self> {
        let (commands, command_rx) = channel();
        let (ready_tx, ready_rx) = channel();

        std::thread::Builder::new()
            .name("parley-playback".to_string())
            .spawn(move || playback_thread(&command_rx, &ready_tx))
            .map_err(|e| Error::Audio(e.to_string()))?;

        // Device probing happens on the playback thread; wait for its verdict
        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Self { commands }),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(Error::Audio("playback thread died during init".to_string())),
        }
    }

    /// Play a track, replacing whatever is currently audible
    pub fn play(&self, samples: Vec<f32>, utterance: u64, events: mpsc::Sender<SynthesisEvent>) {
        let _ = self.commands.send(PlaybackCommand::Play {
            samples,
            utterance,
            events,
        });
    }

    /// Pause the current track without discarding it
    pub fn pause(&self) {
        let _ = self.commands.send(PlaybackCommand::Pause);
    }

    /// Resume a paused track
    pub fn resume(&self) {
        let _ = self.commands.send(PlaybackCommand::Resume);
    }

    /// Drop the current track; no lifecycle event is sent
    pub fn cancel(&self) {
        let _ = self.commands.send(PlaybackCommand::Cancel);
    }
}

impl Drop for AudioPlayback {
    fn drop(&mut self) {
        let _ = self.commands.send(PlaybackCommand::Shutdown);
    }
}

/// Playback thread main loop
fn playback_thread(
    commands: &std::sync::mpsc::Receiver<PlaybackCommand>,
    ready: &Sender<Result<()>>,
) {
    let (device, config) = match open_output_device() {
        Ok(pair) => {
            let _ = ready.send(Ok(()));
            pair
        }
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };

    let mut current: Option<ActiveTrack> = None;

    loop {
        match commands.recv_timeout(POLL_INTERVAL) {
            Ok(PlaybackCommand::Play {
                samples,
                utterance,
                events,
            }) => {
                current = None;
                match start_track(&device, &config, samples, utterance, events.clone()) {
                    Ok(track) => {
                        let _ = events.blocking_send(SynthesisEvent::Started { utterance });
                        current = Some(track);
                    }
                    Err(e) => {
                        tracing::error!(utterance, error = %e, "failed to start playback");
                        let _ = events.blocking_send(SynthesisEvent::Error {
                            utterance,
                            message: e.to_string(),
                        });
                    }
                }
            }
            Ok(PlaybackCommand::Pause) => {
                if let Some(track) = &current {
                    if let Err(e) = track.stream.pause() {
                        tracing::warn!(error = %e, "pause not supported by output stream");
                    }
                }
            }
            Ok(PlaybackCommand::Resume) => {
                if let Some(track) = &current {
                    if let Err(e) = track.stream.play() {
                        tracing::warn!(error = %e, "failed to resume output stream");
                    }
                }
            }
            Ok(PlaybackCommand::Cancel) => {
                if current.take().is_some() {
                    tracing::debug!("playback cancelled");
                }
            }
            Ok(PlaybackCommand::Shutdown) | Err(RecvTimeoutError::Disconnected) => {
                tracing::debug!("playback thread shutting down");
                return;
            }
            Err(RecvTimeoutError::Timeout) => {}
        }

        let done = current
            .as_ref()
            .is_some_and(|t| t.finished.load(Ordering::SeqCst));
        if done {
            if let Some(track) = current.take() {
                drop(track.stream);
                tracing::debug!(utterance = track.utterance, "playback complete");
                let _ = track.events.blocking_send(SynthesisEvent::Ended {
                    utterance: track.utterance,
                });
            }
        }
    }
}

/// Open the default output device at the playback rate, mono then stereo
fn open_output_device() -> Result<(cpal::Device, StreamConfig)> {
    let host = cpal::default_host();

    let device = host
        .default_output_device()
        .ok_or_else(|| Error::Audio("no output device available".to_string()))?;

    let supported = device
        .supported_output_configs()
        .map_err(|e| Error::Audio(e.to_string()))?
        .find(|c| {
            c.channels() == 1
                && c.min_sample_rate() <= SampleRate(PLAYBACK_SAMPLE_RATE)
                && c.max_sample_rate() >= SampleRate(PLAYBACK_SAMPLE_RATE)
        })
        .or_else(|| {
            device.supported_output_configs().ok()?.find(|c| {
                c.channels() == 2
                    && c.min_sample_rate() <= SampleRate(PLAYBACK_SAMPLE_RATE)
                    && c.max_sample_rate() >= SampleRate(PLAYBACK_SAMPLE_RATE)
            })
        })
        .ok_or_else(|| Error::Audio("no suitable output config found".to_string()))?;

    let config = supported
        .with_sample_rate(SampleRate(PLAYBACK_SAMPLE_RATE))
        .config();

    tracing::debug!(
        device = device.name().unwrap_or_default(),
        sample_rate = PLAYBACK_SAMPLE_RATE,
        channels = config.channels,
        "speaker opened"
    );

    Ok((device, config))
}

/// Build and start an output stream feeding from `samples`
fn start_track(
    device: &cpal::Device,
    config: &StreamConfig,
    samples: Vec<f32>,
    utterance: u64,
    events: mpsc::Sender<SynthesisEvent>,
) -> Result<ActiveTrack> {
    let channels = config.channels as usize;
    let finished = Arc::new(AtomicBool::new(false));
    let finished_cb = Arc::clone(&finished);
    let mut pos = 0usize;

    let stream = device
        .build_output_stream(
            config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                for frame in data.chunks_mut(channels) {
                    let sample = if pos < samples.len() {
                        let s = samples[pos];
                        pos += 1;
                        s
                    } else {
                        finished_cb.store(true, Ordering::SeqCst);
                        0.0
                    };
                    for out in frame.iter_mut() {
                        *out = sample;
                    }
                }
            },
            |err| {
                tracing::error!(error = %err, "output stream error");
            },
            None,
        )
        .map_err(|e| Error::Audio(e.to_string()))?;

    stream.play().map_err(|e| Error::Audio(e.to_string()))?;

    Ok(ActiveTrack {
        stream,
        utterance,
        events,
        finished,
    })
}

/// Decode MP3 bytes to mono f32 samples
///
/// # Errors
///
/// Returns error if the data is not decodable MP3
pub fn decode_mp3(mp3_data: &[u8]) -> Result<Vec<f32>> {
    let mut decoder = minimp3::Decoder::new(Cursor::new(mp3_data));
    let mut samples = Vec::new();

    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                if frame.channels == 2 {
                    // Stereo: average channels
                    samples.extend(frame.data.chunks(2).map(|chunk| {
                        let left = f32::from(chunk[0]) / 32768.0;
                        let right = f32::from(chunk.get(1).copied().unwrap_or(chunk[0])) / 32768.0;
                        f32::midpoint(left, right)
                    }));
                } else {
                    samples.extend(frame.data.iter().map(|&s| f32::from(s) / 32768.0));
                }
            }
            Err(minimp3::Error::Eof) => break,
            Err(e) => return Err(Error::Audio(format!("MP3 decode error: {e}"))),
        }
    }

    Ok(samples)
}
