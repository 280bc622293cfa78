//! Client-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! sinnvolle Standardwerte, sodass der Client ohne Konfigurationsdatei
//! lauffaehig ist. Der API-Key kommt nie aus der Datei, sondern immer
//! aus der konfigurierten Umgebungsvariable.

use serde::{Deserialize, Serialize};

use coachcall_core::{CoachCallError, Language};

/// Vollstaendige Client-Konfiguration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct ClientConfig {
    /// Gehosteter Live-Endpunkt
    pub endpunkt: EndpunktEinstellungen,
    /// Sitzungs-Einstellungen
    pub sitzung: SitzungEinstellungen,
    /// Audio-Geraete-Einstellungen
    pub audio: AudioEinstellungen,
    /// Logging-Einstellungen
    pub logging: LoggingEinstellungen,
}

/// Einstellungen fuer den gehosteten Live-Endpunkt
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpunktEinstellungen {
    /// WebSocket-URL des Live-Endpunkts
    pub url: String,
    /// Modell-/Capability-Kennung
    pub modell: String,
    /// Stimmprofil der Coach-Antworten
    pub stimme: String,
    /// Name der Umgebungsvariable mit dem API-Key
    pub api_key_env: String,
}

impl Default for EndpunktEinstellungen {
    fn default() -> Self {
        Self {
            url: "wss://live.coachcall.app/v1/voice".into(),
            modell: "gemini-2.5-flash-native-audio-preview-09-2025".into(),
            stimme: "Kore".into(),
            api_key_env: "COACHCALL_API_KEY".into(),
        }
    }
}

/// Sitzungs-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SitzungEinstellungen {
    /// Anzeigesprache: "pt", "en" oder "es"
    pub sprache: String,
}

impl Default for SitzungEinstellungen {
    fn default() -> Self {
        Self {
            sprache: "pt".into(),
        }
    }
}

impl SitzungEinstellungen {
    /// Parst die konfigurierte Sprache
    pub fn sprache(&self) -> Result<Language, CoachCallError> {
        Language::from_code(&self.sprache).ok_or_else(|| {
            CoachCallError::Konfiguration(format!("Unbekannte Sprache: '{}'", self.sprache))
        })
    }
}

/// Audio-Geraete-Einstellungen
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioEinstellungen {
    /// Eingabegeraet per Namens-Teilstring (None = Standardgeraet)
    pub eingabegeraet: Option<String>,
    /// Ausgabegeraet per Namens-Teilstring (None = Standardgeraet)
    pub ausgabegeraet: Option<String>,
}

/// Logging-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Format: "json" oder "text"
    pub format: String,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

impl ClientConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    pub fn laden(pfad: &str) -> anyhow::Result<Self> {
        match std::fs::read_to_string(pfad) {
            Ok(inhalt) => {
                let config: Self = toml::from_str(&inhalt)
                    .map_err(|e| anyhow::anyhow!("Konfigurationsfehler in '{pfad}': {e}"))?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = pfad,
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Ok(Self::default())
            }
            Err(e) => Err(anyhow::anyhow!(
                "Konfigurationsdatei '{pfad}' nicht lesbar: {e}"
            )),
        }
    }

    /// Liest den API-Key aus der konfigurierten Umgebungsvariable
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.endpunkt.api_key_env)
            .ok()
            .filter(|key| !key.is_empty())
    }
}
