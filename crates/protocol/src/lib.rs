//! coachcall-protocol – Wire-Format fuer den Live-Endpunkt
//!
//! - PCM16LE Sample-Konvertierung (Encode mit Clipping, Decode)
//! - JSON-Nachrichten der Live-Session (Setup, RealtimeInput,
//!   Server-Events mit Transkripten und Audio-Parts)

pub mod live;
pub mod pcm;

pub use live::{
    MediaBlob, ModelTurn, Part, RealtimeInput, ServerContent, ServerMessage, SetupConfig,
    SetupMessage, Transcription,
};
pub use pcm::{
    dauer_sekunden, decode_pcm16, encode_pcm16, ProtocolError, CAPTURE_RATE, MIME_PCM_CAPTURE,
    MIME_PCM_PLAYBACK, PLAYBACK_RATE,
};
