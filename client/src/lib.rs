//! coachcall-client – Bibliotheks-Root
//!
//! Deklariert die Client-Module und stellt den oeffentlichen
//! Einstiegspunkt fuer Integrationstests bereit.

pub mod config;

use anyhow::Result;
use tracing::{info, warn};

use coachcall_audio::CpalAudioGraph;
use coachcall_bridge::{BridgeConfig, VoiceBridge, WebSocketTransport};
use coachcall_core::{BridgeEvent, BridgeState, TranskriptQuelle};
use config::ClientConfig;

/// Haelt den laufenden Client-Zustand zusammen
pub struct Client {
    pub config: ClientConfig,
}

impl Client {
    /// Erstellt einen neuen Client aus der gegebenen Konfiguration
    pub fn neu(config: ClientConfig) -> Self {
        Self { config }
    }

    /// Startet einen Voice-Call und laeuft bis Ctrl-C oder Sitzungsende
    ///
    /// Ablauf:
    /// 1. Transport und Audio-Graph aus der Konfiguration bauen
    /// 2. Bridge starten (Mikrofon, Handshake, Streaming)
    /// 3. Events als Live-Untertitel ausgeben
    /// 4. Auf Ctrl-C sauber stoppen
    pub async fn starten(self) -> Result<()> {
        let sprache = self.config.sitzung.sprache()?;

        let api_key = self.config.api_key();
        if api_key.is_none() {
            warn!(
                variable = %self.config.endpunkt.api_key_env,
                "Kein API-Key gesetzt, der Endpunkt wird die Verbindung vermutlich ablehnen"
            );
        }

        let transport = WebSocketTransport::neu(self.config.endpunkt.url.clone(), api_key);
        let graph = CpalAudioGraph::neu(
            self.config.audio.eingabegeraet.clone(),
            self.config.audio.ausgabegeraet.clone(),
        );
        let bridge_config = BridgeConfig {
            model: self.config.endpunkt.modell.clone(),
            voice: self.config.endpunkt.stimme.clone(),
            language: sprache,
        };

        let (bridge, mut events) =
            VoiceBridge::neu(bridge_config, Box::new(transport), Box::new(graph));

        bridge.start().await?;
        info!("Voice-Call wird aufgebaut. Beenden mit Ctrl-C.");

        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(BridgeEvent::Transkript { quelle, text, .. }) => {
                        let zeit = chrono::Local::now().format("%H:%M:%S");
                        let wer = match quelle {
                            TranskriptQuelle::Benutzer => "Du",
                            TranskriptQuelle::Coach => "Coach",
                        };
                        println!("[{zeit}] {wer}: {text}");
                    }
                    Some(BridgeEvent::ZustandGeaendert { zustand, .. }) => {
                        info!(zustand = %zustand, "Bridge-Zustand");
                        if zustand == BridgeState::Aktiv {
                            println!("Live! Sag etwas...");
                        }
                        if zustand == BridgeState::Leerlauf {
                            // Sitzung wurde beendet (Fehler oder Server-Close);
                            // ausstehende Fehlermeldungen noch ausgeben
                            while let Ok(rest) = events.try_recv() {
                                if let BridgeEvent::Fehler { meldung, .. } = rest {
                                    eprintln!("Fehler: {meldung}");
                                }
                            }
                            break;
                        }
                    }
                    Some(BridgeEvent::Fehler { meldung, .. }) => {
                        eprintln!("Fehler: {meldung}");
                    }
                    None => break,
                },
                _ = tokio::signal::ctrl_c() => {
                    info!("Ctrl-C empfangen, Sitzung wird beendet");
                    bridge.stop();
                    break;
                }
            }
        }

        // Idempotent: auch nach Fehler-Teardown harmlos
        bridge.stop();
        info!("Client beendet");
        Ok(())
    }
}
