//! Bridge-Zustand und UI-Events
//!
//! Die Voice-Bridge meldet Zustandswechsel, Transkripte und Fehler
//! ueber einen Event-Kanal an die UI-Schicht (CLI-Client). Die Events
//! sind serde-kompatibel damit eine spaetere IPC-Schicht sie direkt
//! weiterreichen kann.

use serde::{Deserialize, Serialize};

use crate::types::SessionId;

/// Zustand der Voice-Bridge
///
/// Zustandsmaschine: `Leerlauf -> Verbindet -> Aktiv -> Leerlauf`.
/// `Verbindet -> Leerlauf` und `Aktiv -> Leerlauf` sind auch ueber
/// Fehler oder explizites Stop erreichbar. Kein Zustand erlaubt einen
/// erneuten Start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BridgeState {
    /// Keine Sitzung aktiv
    Leerlauf,
    /// Session-Aufbau laeuft (Handshake mit dem Live-Endpunkt)
    Verbindet,
    /// Bidirektionaler Audio-Strom laeuft
    Aktiv,
}

impl Default for BridgeState {
    fn default() -> Self {
        BridgeState::Leerlauf
    }
}

impl std::fmt::Display for BridgeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BridgeState::Leerlauf => "leerlauf",
            BridgeState::Verbindet => "verbindet",
            BridgeState::Aktiv => "aktiv",
        };
        f.write_str(s)
    }
}

/// Quelle eines Transkript-Fragments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TranskriptQuelle {
    /// Erkannte Sprache des Benutzers
    Benutzer,
    /// Gesprochene Antwort des Coaches
    Coach,
}

/// Events die die Voice-Bridge an die UI-Schicht meldet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum BridgeEvent {
    /// Der Bridge-Zustand hat sich geaendert
    ZustandGeaendert {
        sitzung: SessionId,
        zustand: BridgeState,
    },
    /// Neues Transkript-Fragment (ueberschreibt das vorherige)
    Transkript {
        sitzung: SessionId,
        quelle: TranskriptQuelle,
        text: String,
    },
    /// Ein Fehler wurde dem Benutzer sichtbar gemacht
    Fehler {
        sitzung: SessionId,
        meldung: String,
    },
}
