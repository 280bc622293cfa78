//! Transport zur gehosteten Live-Session
//!
//! Der konkrete Endpunkt spricht JSON-Textframes ueber WebSocket:
//! einmalig eine Setup-Nachricht, danach pro Capture-Frame ein
//! `RealtimeInput`. Eingehende Frames sind Server-Events (Transkripte,
//! Audio-Parts).
//!
//! `LiveTransport` ist der Seam fuer Tests: die Bridge kennt nur den
//! Trait, die echte WebSocket-Implementierung haengt dahinter. Senden
//! ist fire-and-forget – der Aufrufer wartet nie auf den Versand eines
//! einzelnen Frames.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, trace, warn};

use coachcall_core::{CoachCallError, Result};
use coachcall_protocol::{RealtimeInput, ServerMessage, SetupMessage};

// ---------------------------------------------------------------------------
// Events und Session-Handle
// ---------------------------------------------------------------------------

/// Events die der Transport an die Bridge meldet
#[derive(Debug)]
pub enum TransportEvent {
    /// Session steht: Handshake und Setup erfolgreich
    Geoeffnet,
    /// Server-Event (Transkripte und/oder Audio)
    Nachricht(ServerMessage),
    /// Laufzeitfehler des Transports
    Fehler(String),
    /// Verbindung wurde geschlossen (mit optionaler Begruendung)
    Geschlossen { meldung: Option<String> },
}

/// Handle auf die offene Live-Session
///
/// Wird beim Teardown aus dem Bridge-Zustand entfernt; Frames an ein
/// geschlossenes Handle verpuffen.
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::UnboundedSender<RealtimeInput>,
}

impl SessionHandle {
    /// Erstellt ein Handle ueber dem Frame-Kanal des Transports
    pub fn neu(tx: mpsc::UnboundedSender<RealtimeInput>) -> Self {
        Self { tx }
    }

    /// Sendet einen Frame fire-and-forget
    ///
    /// Gibt false zurueck wenn die Session nicht mehr existiert;
    /// der Frame ist dann verworfen.
    pub fn send_frame(&self, frame: RealtimeInput) -> bool {
        self.tx.send(frame).is_ok()
    }
}

/// Transport-Seam der Voice-Bridge
#[async_trait]
pub trait LiveTransport: Send + Sync {
    /// Oeffnet eine Live-Session und sendet die Setup-Nachricht
    ///
    /// Gibt das Sende-Handle und den Event-Strom zurueck. Das erste
    /// Event einer erfolgreichen Session ist `Geoeffnet`.
    async fn verbinden(
        &self,
        setup: SetupMessage,
    ) -> Result<(SessionHandle, mpsc::UnboundedReceiver<TransportEvent>)>;
}

// ---------------------------------------------------------------------------
// WebSocket-Implementierung
// ---------------------------------------------------------------------------

/// Echter Transport: WebSocket mit JSON-Textframes
pub struct WebSocketTransport {
    url: String,
    api_key: Option<String>,
}

impl WebSocketTransport {
    /// Erstellt einen Transport fuer die gegebene Endpunkt-URL
    pub fn neu(url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            url: url.into(),
            api_key,
        }
    }

    /// Baut die Verbindungs-URL (API-Key als Query-Parameter)
    fn verbindungs_url(&self) -> String {
        match &self.api_key {
            Some(key) if !key.is_empty() => {
                let trenner = if self.url.contains('?') { '&' } else { '?' };
                format!("{}{}key={}", self.url, trenner, key)
            }
            _ => self.url.clone(),
        }
    }
}

#[async_trait]
impl LiveTransport for WebSocketTransport {
    async fn verbinden(
        &self,
        setup: SetupMessage,
    ) -> Result<(SessionHandle, mpsc::UnboundedReceiver<TransportEvent>)> {
        let (ws, _antwort) = connect_async(self.verbindungs_url())
            .await
            .map_err(|e| CoachCallError::Verbindung(e.to_string()))?;
        debug!(url = %self.url, "WebSocket-Verbindung hergestellt");

        let (mut sink, mut stream) = ws.split();

        // Setup-Nachricht einmalig senden
        let setup_json = serde_json::to_string(&setup)
            .map_err(|e| CoachCallError::UngueltigeNachricht(e.to_string()))?;
        sink.send(Message::Text(setup_json.into()))
            .await
            .map_err(|e| CoachCallError::Verbindung(e.to_string()))?;

        let (frame_tx, mut frame_rx) = mpsc::unbounded_channel::<RealtimeInput>();
        let (event_tx, event_rx) = mpsc::unbounded_channel::<TransportEvent>();

        // Sende-Task: Frames aus dem Kanal -> WebSocket.
        // Der Kanal entkoppelt den Versand vom Capture-Takt.
        tokio::spawn(async move {
            while let Some(frame) = frame_rx.recv().await {
                match serde_json::to_string(&frame) {
                    Ok(json) => {
                        if sink.send(Message::Text(json.into())).await.is_err() {
                            trace!("Frame-Versand fehlgeschlagen, Sende-Task endet");
                            break;
                        }
                    }
                    Err(e) => warn!("Frame nicht serialisierbar: {}", e),
                }
            }
            let _ = sink.close().await;
            debug!("Sende-Task beendet");
        });

        // Empfangs-Task: WebSocket -> TransportEvents
        let tx = event_tx.clone();
        tokio::spawn(async move {
            while let Some(nachricht) = stream.next().await {
                match nachricht {
                    Ok(Message::Text(text)) => match ServerMessage::parse(&text) {
                        Ok(msg) => {
                            let _ = tx.send(TransportEvent::Nachricht(msg));
                        }
                        Err(e) => {
                            // Unlesbare Events brechen die Session nicht ab
                            warn!("Server-Event nicht lesbar: {}", e);
                        }
                    },
                    Ok(Message::Close(frame)) => {
                        let meldung = frame
                            .map(|f| f.reason.to_string())
                            .filter(|grund| !grund.is_empty());
                        let _ = tx.send(TransportEvent::Geschlossen { meldung });
                        return;
                    }
                    Ok(_) => {
                        // Binary/Ping/Pong: fuer dieses Protokoll irrelevant
                    }
                    Err(e) => {
                        let _ = tx.send(TransportEvent::Fehler(e.to_string()));
                        return;
                    }
                }
            }
            // Stream endete ohne Close-Frame
            let _ = tx.send(TransportEvent::Geschlossen { meldung: None });
            debug!("Empfangs-Task beendet");
        });

        // Handshake und Setup sind durch: Session gilt als offen
        let _ = event_tx.send(TransportEvent::Geoeffnet);

        Ok((SessionHandle::neu(frame_tx), event_rx))
    }
}
