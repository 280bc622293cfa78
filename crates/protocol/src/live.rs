//! Live-Protokoll (WebSocket/JSON)
//!
//! Definiert die Nachrichten die mit dem gehosteten Live-Audio-Endpunkt
//! ausgetauscht werden. Alle Nachrichten sind JSON-Textframes.
//!
//! ## Design
//! - camelCase Feldnamen auf dem Draht (Vorgabe des Endpunkts)
//! - Ausgehend: einmalige Setup-Nachricht, danach pro Capture-Frame
//!   genau ein `RealtimeInput`
//! - Eingehend: lose geformte Server-Events; unbekannte Felder werden
//!   ignoriert, fehlende Felder sind `None`/leer

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};

use coachcall_core::TranskriptQuelle;

use crate::pcm::{self, ProtocolError};

// ---------------------------------------------------------------------------
// Audio-Blob (beide Richtungen)
// ---------------------------------------------------------------------------

/// Base64-kodierter PCM-Block mit MIME-Tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaBlob {
    /// Base64-kodierte PCM16LE-Nutzdaten
    pub data: String,
    /// Format-Tag, z.B. `audio/pcm;rate=16000`
    #[serde(default)]
    pub mime_type: Option<String>,
}

impl MediaBlob {
    /// Baut einen ausgehenden 16-kHz-Blob aus f32-Samples
    ///
    /// Samples werden vor der Quantisierung auf [-1, 1] begrenzt.
    pub fn aus_capture_samples(samples: &[f32]) -> Self {
        Self {
            data: BASE64.encode(pcm::encode_pcm16(samples)),
            mime_type: Some(pcm::MIME_PCM_CAPTURE.to_string()),
        }
    }

    /// Dekodiert den Blob zu f32-Samples
    pub fn samples(&self) -> Result<Vec<f32>, ProtocolError> {
        let bytes = BASE64.decode(&self.data)?;
        pcm::decode_pcm16(&bytes)
    }
}

// ---------------------------------------------------------------------------
// Ausgehende Nachrichten
// ---------------------------------------------------------------------------

/// Session-Parameter, einmalig beim Verbindungsaufbau gesendet
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupConfig {
    /// Modell-/Capability-Kennung des Endpunkts
    pub model: String,
    /// Angeforderte Antwort-Modalitaeten (hier immer `["AUDIO"]`)
    pub response_modalities: Vec<String>,
    /// Stimmprofil der synthetisierten Antwort
    pub voice: String,
    /// System-/Persona-Instruktion (sprachabhaengig)
    pub system_instruction: String,
    /// Transkription der Benutzer-Eingabe anfordern
    pub input_audio_transcription: bool,
    /// Transkription der Coach-Ausgabe anfordern
    pub output_audio_transcription: bool,
}

impl SetupConfig {
    /// Erstellt eine Audio-Session-Konfiguration mit beiden Transkripten
    pub fn audio(model: impl Into<String>, voice: impl Into<String>, instruktion: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            response_modalities: vec!["AUDIO".to_string()],
            voice: voice.into(),
            system_instruction: instruktion.into(),
            input_audio_transcription: true,
            output_audio_transcription: true,
        }
    }
}

/// Huelle der Setup-Nachricht
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetupMessage {
    pub setup: SetupConfig,
}

/// Ausgehender Audio-Frame: genau einer pro Capture-Frame
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeInput {
    pub media: MediaBlob,
}

impl RealtimeInput {
    /// Baut den Frame direkt aus Capture-Samples
    pub fn aus_capture_samples(samples: &[f32]) -> Self {
        Self {
            media: MediaBlob::aus_capture_samples(samples),
        }
    }
}

// ---------------------------------------------------------------------------
// Eingehende Nachrichten
// ---------------------------------------------------------------------------

/// Transkript-Fragment
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Transcription {
    #[serde(default)]
    pub text: String,
}

/// Ein Teil der Modell-Antwort; Audio steckt in `inline_data`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default)]
    pub inline_data: Option<MediaBlob>,
}

/// Die Modell-Antwort eines Server-Events
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelTurn {
    #[serde(default)]
    pub parts: Vec<Part>,
}

/// Inhalt eines Server-Events
///
/// Jedes Feld kann fehlen; ein Event darf Transkripte und Audio
/// gleichzeitig tragen.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerContent {
    #[serde(default)]
    pub input_transcription: Option<Transcription>,
    #[serde(default)]
    pub output_transcription: Option<Transcription>,
    #[serde(default)]
    pub model_turn: Option<ModelTurn>,
    #[serde(default)]
    pub turn_complete: bool,
}

/// Beliebig geformtes Server-Event
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerMessage {
    #[serde(default)]
    pub server_content: Option<ServerContent>,
}

impl ServerMessage {
    /// Parst ein JSON-Textframe des Endpunkts
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Transkript-Fragmente dieses Events in Ankunftsreihenfolge
    /// (Benutzer vor Coach, beide ueberschreiben den Transkript-Zustand)
    pub fn transkripte(&self) -> Vec<(TranskriptQuelle, &str)> {
        let mut fragmente = Vec::new();
        if let Some(inhalt) = &self.server_content {
            if let Some(t) = &inhalt.input_transcription {
                if !t.text.is_empty() {
                    fragmente.push((TranskriptQuelle::Benutzer, t.text.as_str()));
                }
            }
            if let Some(t) = &inhalt.output_transcription {
                if !t.text.is_empty() {
                    fragmente.push((TranskriptQuelle::Coach, t.text.as_str()));
                }
            }
        }
        fragmente
    }

    /// Audio-Blobs dieses Events in Ankunftsreihenfolge
    pub fn audio_blobs(&self) -> Vec<&MediaBlob> {
        self.server_content
            .iter()
            .flat_map(|inhalt| inhalt.model_turn.iter())
            .flat_map(|turn| turn.parts.iter())
            .filter_map(|part| part.inline_data.as_ref())
            .collect()
    }

    /// Ob der Endpunkt das Ende eines Sprecherwechsels signalisiert hat
    pub fn turn_complete(&self) -> bool {
        self.server_content
            .as_ref()
            .map(|inhalt| inhalt.turn_complete)
            .unwrap_or(false)
    }
}
