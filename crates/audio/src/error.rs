//! Fehlertypen fuer die Audio-Engine

use thiserror::Error;

/// Alle moeglichen Fehler der Audio-Engine
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("Audio-Geraet nicht gefunden: {0}")]
    GeraetNichtGefunden(String),

    #[error("Kein Standard-Eingabegeraet verfuegbar")]
    KeinStandardEingabegeraet,

    #[error("Kein Standard-Ausgabegeraet verfuegbar")]
    KeinStandardAusgabegeraet,

    #[error("Stream-Fehler: {0}")]
    StreamFehler(String),

    #[error("Graph bereits geoeffnet")]
    GraphBereitsOffen,

    #[error("Konfigurationsfehler: {0}")]
    Konfiguration(String),

    #[error("IO-Fehler: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unerwarteter Fehler: {0}")]
    Anyhow(#[from] anyhow::Error),
}

impl From<AudioError> for coachcall_core::CoachCallError {
    fn from(e: AudioError) -> Self {
        match e {
            AudioError::KeinStandardEingabegeraet => {
                coachcall_core::CoachCallError::Mikrofon(e.to_string())
            }
            andere => coachcall_core::CoachCallError::Audio(andere.to_string()),
        }
    }
}

pub type AudioResult<T> = Result<T, AudioError>;
