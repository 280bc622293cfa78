//! PCM16LE Sample-Konvertierung
//!
//! Der gehostete Live-Endpunkt spricht rohes PCM: 16-bit signed,
//! little-endian, mono. Aufwaerts (Mikrofon -> Endpunkt) mit 16 kHz,
//! abwaerts (Endpunkt -> Wiedergabe) mit 24 kHz.
//!
//! ## Quantisierung
//!
//! Encoder: Sample auf [-1.0, 1.0] begrenzen, mit 32768 skalieren,
//! auf den i16-Bereich saettigen (+1.0 ergibt 32767, kein Wraparound).
//! Decoder: i16 / 32768.0. Der Round-Trip-Fehler liegt damit bei
//! maximal 1/32768 pro Sample.

use thiserror::Error;

/// Abtastrate des Mikrofon-Pfads (Capture -> Endpunkt)
pub const CAPTURE_RATE: u32 = 16_000;

/// Abtastrate des Wiedergabe-Pfads (Endpunkt -> Lautsprecher)
pub const PLAYBACK_RATE: u32 = 24_000;

/// MIME-Tag fuer ausgehende Audio-Frames
pub const MIME_PCM_CAPTURE: &str = "audio/pcm;rate=16000";

/// MIME-Tag fuer eingehende Audio-Frames
pub const MIME_PCM_PLAYBACK: &str = "audio/pcm;rate=24000";

/// Fehler der Protokoll-Schicht
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("PCM-Payload hat ungerade Laenge: {0} Bytes")]
    UngeradeLaenge(usize),

    #[error("Base64-Dekodierung fehlgeschlagen: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("JSON-Fehler: {0}")]
    Json(#[from] serde_json::Error),
}

/// Kodiert f32-Samples (normalisiert -1.0..1.0) als PCM16LE-Bytes
///
/// Werte ausserhalb von [-1.0, 1.0] werden vor der Quantisierung
/// hart begrenzt; es gibt keinen Integer-Ueberlauf.
pub fn encode_pcm16(samples: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for &s in samples {
        let skaliert = (s.clamp(-1.0, 1.0) * 32768.0).round() as i32;
        let wert = skaliert.clamp(i16::MIN as i32, i16::MAX as i32) as i16;
        bytes.extend_from_slice(&wert.to_le_bytes());
    }
    bytes
}

/// Dekodiert PCM16LE-Bytes zu f32-Samples (normalisiert -1.0..1.0)
///
/// # Fehler
/// `UngeradeLaenge` wenn die Byte-Anzahl kein Vielfaches von 2 ist.
pub fn decode_pcm16(bytes: &[u8]) -> Result<Vec<f32>, ProtocolError> {
    if bytes.len() % 2 != 0 {
        return Err(ProtocolError::UngeradeLaenge(bytes.len()));
    }

    let samples = bytes
        .chunks_exact(2)
        .map(|paar| i16::from_le_bytes([paar[0], paar[1]]) as f32 / 32768.0)
        .collect();
    Ok(samples)
}

/// Dauer eines Sample-Puffers in Sekunden bei der gegebenen Abtastrate
pub fn dauer_sekunden(sample_anzahl: usize, rate: u32) -> f64 {
    sample_anzahl as f64 / rate as f64
}
