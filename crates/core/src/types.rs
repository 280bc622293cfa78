//! Gemeinsame Typen fuer CoachCall
//!
//! Session-IDs verwenden das Newtype-Pattern um Verwechslungen mit
//! anderen IDs zur Compilezeit auszuschliessen. `Language` ist die
//! Anzeigesprache des Produkts und steuert die Persona-Instruktion.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Eindeutige ID einer Voice-Call-Sitzung
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Erstellt eine neue zufaellige SessionId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Gibt die innere UUID zurueck
    pub fn inner(&self) -> Uuid {
        self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sitzung:{}", self.0)
    }
}

/// Anzeigesprache des Produkts
///
/// Die Sprache bestimmt in welcher Sprache der Coach antwortet
/// (Teil der System-Instruktion beim Session-Aufbau).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// Portugiesisch (Brasilien) – Standardsprache des Produkts
    Pt,
    /// Englisch
    En,
    /// Spanisch
    Es,
}

impl Language {
    /// Name der Sprache, wie er in der System-Instruktion erscheint
    pub fn anzeige_name(&self) -> &'static str {
        match self {
            Language::Pt => "Português do Brasil",
            Language::En => "English",
            Language::Es => "Español",
        }
    }

    /// ISO-Kurzcode (entspricht dem serde-Wire-Format)
    pub fn code(&self) -> &'static str {
        match self {
            Language::Pt => "pt",
            Language::En => "en",
            Language::Es => "es",
        }
    }

    /// Parst einen ISO-Kurzcode
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "pt" => Some(Language::Pt),
            "en" => Some(Language::En),
            "es" => Some(Language::Es),
            _ => None,
        }
    }
}

impl Default for Language {
    fn default() -> Self {
        Language::Pt
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_id_eindeutig() {
        let a = SessionId::new();
        let b = SessionId::new();
        assert_ne!(a, b, "Zwei neue SessionIds muessen verschieden sein");
    }

    #[test]
    fn session_id_display() {
        let id = SessionId(Uuid::nil());
        assert!(id.to_string().starts_with("sitzung:"));
    }

    #[test]
    fn language_code_round_trip() {
        for lang in [Language::Pt, Language::En, Language::Es] {
            assert_eq!(Language::from_code(lang.code()), Some(lang));
        }
    }

    #[test]
    fn language_unbekannter_code() {
        assert_eq!(Language::from_code("de"), None);
        assert_eq!(Language::from_code(""), None);
    }

    #[test]
    fn language_serde_kleinschreibung() {
        let json = serde_json::to_string(&Language::Pt).unwrap();
        assert_eq!(json, "\"pt\"");
        let zurueck: Language = serde_json::from_str("\"es\"").unwrap();
        assert_eq!(zurueck, Language::Es);
    }

    #[test]
    fn language_standard_ist_pt() {
        assert_eq!(Language::default(), Language::Pt);
    }
}
