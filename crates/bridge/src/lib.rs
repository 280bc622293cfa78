//! coachcall-bridge – Realtime Voice Bridge
//!
//! Bidirektionales Audio-Streaming zwischen lokalem Geraet und dem
//! gehosteten Voice-Coaching-Endpunkt:
//! - Sitzungs-Lifecycle (`Leerlauf -> Verbindet -> Aktiv -> Leerlauf`)
//! - Capture-Frames -> PCM16/Base64 -> Transport (fire-and-forget)
//! - Server-Events -> Transkript-Zustand + lueckenlose Wiedergabe
//! - Persona-Instruktion pro Anzeigesprache

pub mod persona;
pub mod session;
pub mod transport;

pub use session::{BridgeConfig, VoiceBridge};
pub use transport::{LiveTransport, SessionHandle, TransportEvent, WebSocketTransport};
