//! coachcall-audio – Client Audio Engine
//!
//! Audio-Pipeline der Voice-Bridge:
//! - Mikrofon-Capture via cpal (16 kHz mono, lock-free Ring-Buffer)
//! - Wiedergabe via cpal (24 kHz mono) aus dem Playback-Scheduler
//! - Scheduler fuer lueckenlose, sequenzielle Wiedergabe eingehender
//!   Audio-Puffer
//! - Audio-Graph als Trait-Seam zwischen Bridge und Hardware

pub mod capture;
pub mod device;
pub mod error;
pub mod graph;
pub mod playback;
pub mod schedule;

// Bequeme Re-Exporte der wichtigsten Typen
pub use capture::{CaptureConfig, CaptureConsumer, CaptureProducer, FRAME_LAENGE};
pub use device::{list_input_devices, list_output_devices, AudioDevice};
pub use error::{AudioError, AudioResult};
pub use graph::{AudioGraph, CpalAudioGraph};
pub use playback::PlaybackConfig;
pub use schedule::{GeplanteWiedergabe, PlaybackScheduler};
