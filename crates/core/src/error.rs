//! Fehlertypen fuer CoachCall
//!
//! Zentraler Fehler-Enum der alle moeglichen Fehlerzustaende abdeckt.
//! Untermodule koennen eigene Fehler definieren und via `#[from]` konvertieren.

use thiserror::Error;

/// Globaler Result-Alias fuer CoachCall
pub type Result<T> = std::result::Result<T, CoachCallError>;

/// Alle moeglichen Fehler im CoachCall-System
#[derive(Debug, Error)]
pub enum CoachCallError {
    // --- Verbindung & Transport ---
    #[error("Verbindung fehlgeschlagen: {0}")]
    Verbindung(String),

    #[error("Verbindung getrennt: {0}")]
    Getrennt(String),

    #[error("Transportfehler: {0}")]
    Transport(String),

    // --- Geraete ---
    #[error("Mikrofon nicht verfuegbar: {0}")]
    Mikrofon(String),

    #[error("Audiofehler: {0}")]
    Audio(String),

    // --- Protokoll ---
    #[error("Ungueltige Nachricht: {0}")]
    UngueltigeNachricht(String),

    #[error("Dekodierfehler: {0}")]
    Dekodierung(String),

    // --- Sitzung ---
    #[error("Sitzung bereits aktiv oder im Aufbau")]
    SitzungAktiv,

    // --- Konfiguration ---
    #[error("Konfigurationsfehler: {0}")]
    Konfiguration(String),

    // --- Intern ---
    #[error("Interner Fehler: {0}")]
    Intern(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl CoachCallError {
    /// Erstellt einen internen Fehler aus einer beliebigen Nachricht
    pub fn intern(msg: impl Into<String>) -> Self {
        Self::Intern(msg.into())
    }

    /// Gibt true zurueck wenn ein erneuter Start durch den Benutzer
    /// sinnvoll sein koennte (es gibt keine automatischen Retries)
    pub fn ist_wiederholbar(&self) -> bool {
        matches!(
            self,
            Self::Verbindung(_) | Self::Getrennt(_) | Self::Transport(_)
        )
    }
}
