//! Audio-Playback via cpal
//!
//! Oeffnet einen cpal OutputStream mit 24 kHz mono. Der Callback
//! rendert direkt aus dem `PlaybackScheduler`; Bereiche ohne geplante
//! Puffer werden mit Stille gefuellt (kein Underrun-Warnspam – Stille
//! zwischen Coach-Antworten ist hier der Normalfall).

use std::sync::Arc;

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{Device, SampleFormat, Stream, StreamConfig};
use tracing::{debug, error};

use coachcall_protocol::PLAYBACK_RATE;

use crate::error::{AudioError, AudioResult};
use crate::schedule::PlaybackScheduler;

/// Konfiguration fuer den Audio-Playback (immer mono)
#[derive(Debug, Clone)]
pub struct PlaybackConfig {
    /// Abtastrate in Hz
    pub sample_rate: u32,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            sample_rate: PLAYBACK_RATE,
        }
    }
}

/// Audio-Playback-Stream
///
/// Haelt den cpal-Stream am Leben. Wird der PlaybackStream gedroppt,
/// stoppt die Wiedergabe und das Ausgabegeraet wird freigegeben.
pub struct PlaybackStream {
    _stream: Stream,
    config: PlaybackConfig,
}

impl PlaybackStream {
    pub fn config(&self) -> &PlaybackConfig {
        &self.config
    }
}

/// Oeffnet einen Mono-Playback-Stream der aus dem Scheduler rendert.
///
/// `play()` wird explizit aufgerufen – ein suspendiert startender
/// Stream wuerde die ersten Coach-Antworten lautlos verwerfen.
pub fn open_playback_stream(
    device: &Device,
    config: PlaybackConfig,
    scheduler: Arc<PlaybackScheduler>,
) -> AudioResult<PlaybackStream> {
    let stream_config = StreamConfig {
        channels: 1,
        sample_rate: config.sample_rate,
        buffer_size: cpal::BufferSize::Default,
    };

    let err_fn = |err| error!("Playback-Fehler: {}", err);

    let supported = device
        .supported_output_configs()
        .map_err(|e| AudioError::StreamFehler(e.to_string()))?
        .find(|c| {
            c.min_sample_rate() <= config.sample_rate
                && c.max_sample_rate() >= config.sample_rate
                && c.channels() >= 1
        });

    let sample_format = supported
        .map(|c| c.sample_format())
        .unwrap_or(SampleFormat::F32);

    let stream = match sample_format {
        SampleFormat::F32 => {
            let scheduler = Arc::clone(&scheduler);
            device
                .build_output_stream(
                    &stream_config,
                    move |data: &mut [f32], _| {
                        scheduler.render(data);
                    },
                    err_fn,
                    None,
                )
                .map_err(|e| AudioError::StreamFehler(e.to_string()))?
        }
        SampleFormat::I16 => {
            let scheduler = Arc::clone(&scheduler);
            device
                .build_output_stream(
                    &stream_config,
                    move |data: &mut [i16], _| {
                        let mut float_buf = vec![0.0f32; data.len()];
                        scheduler.render(&mut float_buf);
                        for (out, s) in data.iter_mut().zip(float_buf.iter()) {
                            *out = (*s * i16::MAX as f32)
                                .clamp(i16::MIN as f32, i16::MAX as f32)
                                as i16;
                        }
                    },
                    err_fn,
                    None,
                )
                .map_err(|e| AudioError::StreamFehler(e.to_string()))?
        }
        _ => {
            return Err(AudioError::StreamFehler(format!(
                "Nicht unterstuetztes Sample-Format: {:?}",
                sample_format
            )))
        }
    };

    stream
        .play()
        .map_err(|e| AudioError::StreamFehler(e.to_string()))?;

    debug!("Playback-Stream geoeffnet: {}Hz mono", config.sample_rate);

    Ok(PlaybackStream {
        _stream: stream,
        config,
    })
}
