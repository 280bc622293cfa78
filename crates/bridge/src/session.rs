//! Voice-Bridge – End-to-End Sitzungssteuerung
//!
//! Verbindet Mikrofon-Capture, PCM-Kodierung, Live-Transport und
//! Wiedergabe-Scheduling zu einer Voice-Call-Sitzung.
//!
//! ## Sende-Pfad (Mikrofon -> Endpunkt)
//! ```text
//! cpal Capture Callback
//!     -> Ring-Buffer (lock-free, ringbuf)
//!     -> Audio-Thread: Frames sammeln (4096 Samples bei 16kHz)
//!     -> Weiterleitungs-Task: PCM16 + Base64 -> RealtimeInput
//!     -> Transport (fire-and-forget; ohne Session-Handle verworfen)
//! ```
//!
//! ## Empfangs-Pfad (Endpunkt -> Wiedergabe)
//! ```text
//! Transport-Event (Server-Nachricht)
//!     -> Transkripte: ueberschreiben den Transkript-Zustand
//!     -> Audio-Parts: Base64 -> PCM16 -> f32 -> Scheduler.planen()
//!     -> cpal Playback Callback rendert aus dem Scheduler
//! ```
//!
//! ## Zustandsmaschine
//! `Leerlauf -> Verbindet -> Aktiv -> Leerlauf`; Fehler und explizites
//! Stop fuehren aus jedem Zustand nach `Leerlauf`. Teardown invalidiert
//! alle Handles synchron (Generationszaehler), bevor spaete async
//! Fortsetzungen sie beobachten koennen.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use coachcall_audio::{AudioGraph, PlaybackScheduler};
use coachcall_core::{BridgeEvent, BridgeState, CoachCallError, Language, Result, SessionId};
use coachcall_protocol::{RealtimeInput, ServerMessage, SetupConfig, SetupMessage, PLAYBACK_RATE};

use crate::persona;
use crate::transport::{LiveTransport, SessionHandle, TransportEvent};

// ---------------------------------------------------------------------------
// Konfiguration
// ---------------------------------------------------------------------------

/// Konfiguration einer Voice-Bridge
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Modell-/Capability-Kennung des Live-Endpunkts
    pub model: String,
    /// Stimmprofil der Coach-Antworten
    pub voice: String,
    /// Anzeigesprache (steuert die Persona-Instruktion)
    pub language: Language,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-flash-native-audio-preview-09-2025".to_string(),
            voice: "Kore".to_string(),
            language: Language::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// VoiceBridge
// ---------------------------------------------------------------------------

/// Interner, Mutex-geschuetzter Sitzungszustand
struct Status {
    sitzung: SessionId,
    zustand: BridgeState,
    /// Generationszaehler: jedes Teardown invalidiert alle laufenden
    /// Tasks der alten Sitzung
    generation: u64,
    /// Handle der offenen Live-Session (None = nicht bereit)
    session: Option<SessionHandle>,
    /// Juengstes Transkript-Fragment (Benutzer oder Coach)
    transkript: Option<String>,
    /// Letzte dem Benutzer sichtbare Fehlermeldung
    fehler: Option<String>,
}

struct BridgeInner {
    config: BridgeConfig,
    transport: Box<dyn LiveTransport>,
    graph: Mutex<Box<dyn AudioGraph>>,
    scheduler: Arc<PlaybackScheduler>,
    status: Mutex<Status>,
    event_tx: mpsc::UnboundedSender<BridgeEvent>,
}

/// Realtime Voice Bridge
///
/// Lifecycle:
/// 1. `neu()` – Bridge erstellen (Leerlauf)
/// 2. `start()` – Geraete erwerben, Session oeffnen, Streaming starten
/// 3. `stop()` – Vollstaendiges, idempotentes Teardown
///
/// Nach `stop()` ist ein erneuter `start()` sicher und erzeugt eine
/// vollstaendig unabhaengige Sitzung.
#[derive(Clone)]
pub struct VoiceBridge {
    inner: Arc<BridgeInner>,
}

impl VoiceBridge {
    /// Erstellt eine neue Bridge mit Transport- und Audio-Seam
    ///
    /// Gibt zusaetzlich den Event-Empfaenger fuer die UI-Schicht zurueck.
    pub fn neu(
        config: BridgeConfig,
        transport: Box<dyn LiveTransport>,
        graph: Box<dyn AudioGraph>,
    ) -> (Self, mpsc::UnboundedReceiver<BridgeEvent>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let bridge = Self {
            inner: Arc::new(BridgeInner {
                config,
                transport,
                graph: Mutex::new(graph),
                scheduler: Arc::new(PlaybackScheduler::neu(PLAYBACK_RATE)),
                status: Mutex::new(Status {
                    sitzung: SessionId::new(),
                    zustand: BridgeState::Leerlauf,
                    generation: 0,
                    session: None,
                    transkript: None,
                    fehler: None,
                }),
                event_tx,
            }),
        };
        (bridge, event_rx)
    }

    /// Startet eine Voice-Call-Sitzung
    ///
    /// Vorbedingung: keine Sitzung aktiv oder im Aufbau. Ablauf:
    /// 1. Mikrofon + Ausgabegeraet erwerben (Fehler -> Teardown)
    /// 2. Live-Session oeffnen und Setup senden (async Handshake)
    /// 3. Nach dem `Geoeffnet`-Event des Transports laeuft der Strom
    ///
    /// Ein `stop()` waehrend des Handshakes bricht den Start ohne
    /// Fehler ab; das Mikrofon ist dann bereits wieder freigegeben.
    pub async fn start(&self) -> Result<()> {
        // Zustand pruefen und Sitzung reservieren
        let (generation, sitzung) = {
            let mut status = self.inner.status.lock();
            if status.zustand != BridgeState::Leerlauf {
                return Err(CoachCallError::SitzungAktiv);
            }
            status.zustand = BridgeState::Verbindet;
            status.sitzung = SessionId::new();
            status.fehler = None;
            (status.generation, status.sitzung)
        };
        info!(%sitzung, "Voice-Call wird aufgebaut");
        melde(
            &self.inner,
            BridgeEvent::ZustandGeaendert {
                sitzung,
                zustand: BridgeState::Verbindet,
            },
        );

        // Geraete erwerben: Mikrofon-Fehler sind Benutzer-sichtbar
        let frames = {
            let mut graph = self.inner.graph.lock();
            match graph.oeffnen(Arc::clone(&self.inner.scheduler)) {
                Ok(frames) => frames,
                Err(e) => {
                    let fehler: CoachCallError = e.into();
                    teardown_intern(&self.inner, None, Some(fehler.to_string()));
                    return Err(fehler);
                }
            }
        };

        // Live-Session oeffnen (asynchroner Handshake)
        let setup = SetupMessage {
            setup: SetupConfig::audio(
                &self.inner.config.model,
                &self.inner.config.voice,
                persona::voice_instruction(self.inner.config.language),
            ),
        };
        let verbindung = self.inner.transport.verbinden(setup).await;
        let (handle, transport_events) = match verbindung {
            Ok(paar) => paar,
            Err(e) => {
                teardown_intern(&self.inner, Some(generation), Some(e.to_string()));
                return Err(e);
            }
        };

        // Wurde waehrend des Handshakes gestoppt? Dann ist die neue
        // Session verwaist und wird durch Droppen der Handles beendet.
        {
            let mut status = self.inner.status.lock();
            if status.generation != generation {
                debug!("Start waehrend des Handshakes abgebrochen");
                return Ok(());
            }
            status.session = Some(handle);
        }

        // Event- und Weiterleitungs-Tasks der Sitzung
        tokio::spawn(event_schleife(
            Arc::clone(&self.inner),
            transport_events,
            generation,
        ));
        tokio::spawn(weiterleitungs_schleife(
            Arc::clone(&self.inner),
            frames,
            generation,
        ));

        Ok(())
    }

    /// Stoppt die Sitzung (idempotent, aus jedem Zustand erlaubt)
    ///
    /// Gibt das Mikrofon frei, stoppt alle geplanten Wiedergabe-Puffer,
    /// setzt die Zeitachse zurueck und loescht Session-Handle sowie
    /// Transkript- und Fehlerzustand.
    pub fn stop(&self) {
        teardown_intern(&self.inner, None, None);
    }

    /// Aktueller Bridge-Zustand
    pub fn zustand(&self) -> BridgeState {
        self.inner.status.lock().zustand
    }

    /// Juengstes Transkript-Fragment (None = Platzhalter anzeigen)
    pub fn transkript(&self) -> Option<String> {
        self.inner.status.lock().transkript.clone()
    }

    /// Letzte Benutzer-sichtbare Fehlermeldung
    pub fn letzter_fehler(&self) -> Option<String> {
        self.inner.status.lock().fehler.clone()
    }

    /// Anzahl aktuell geplanter/spielender Wiedergabe-Puffer
    pub fn aktive_wiedergabe(&self) -> usize {
        self.inner.scheduler.aktive_anzahl()
    }
}

// ---------------------------------------------------------------------------
// Teardown
// ---------------------------------------------------------------------------

/// Vollstaendiges Teardown der Sitzung
///
/// `nur_generation`: wenn gesetzt, wird nur abgeraeumt falls die
/// Sitzung noch dieser Generation angehoert (Schutz gegen doppeltes
/// Teardown aus spaeten Task-Fortsetzungen).
fn teardown_intern(inner: &Arc<BridgeInner>, nur_generation: Option<u64>, meldung: Option<String>) {
    let (sitzung, vorher) = {
        let mut status = inner.status.lock();
        if let Some(generation) = nur_generation {
            if status.generation != generation {
                return;
            }
        }
        // Handles synchron invalidieren bevor irgendein Task weiterlaeuft
        status.generation += 1;
        status.session = None;
        status.transkript = None;
        status.fehler = meldung.clone();
        let vorher = status.zustand;
        status.zustand = BridgeState::Leerlauf;
        (status.sitzung, vorher)
    };

    // Mikrofon und Ausgabegeraet synchron freigeben
    inner.graph.lock().schliessen();

    // Aktive Wiedergabe-Puffer stoppen, Zeitachse auf null
    inner.scheduler.alle_stoppen();
    inner.scheduler.zuruecksetzen();

    if vorher != BridgeState::Leerlauf {
        info!(%sitzung, vorher = %vorher, "Sitzung beendet");
        melde(
            inner,
            BridgeEvent::ZustandGeaendert {
                sitzung,
                zustand: BridgeState::Leerlauf,
            },
        );
    }
    if let Some(meldung) = meldung {
        melde(inner, BridgeEvent::Fehler { sitzung, meldung });
    }
}

fn melde(inner: &BridgeInner, event: BridgeEvent) {
    // UI-Schicht weg -> Events verpuffen, die Sitzung laeuft weiter
    let _ = inner.event_tx.send(event);
}

// ---------------------------------------------------------------------------
// Event-Schleife (Transport -> Bridge)
// ---------------------------------------------------------------------------

async fn event_schleife(
    inner: Arc<BridgeInner>,
    mut events: mpsc::UnboundedReceiver<TransportEvent>,
    generation: u64,
) {
    while let Some(event) = events.recv().await {
        if inner.status.lock().generation != generation {
            break;
        }
        match event {
            TransportEvent::Geoeffnet => {
                let sitzung = {
                    let mut status = inner.status.lock();
                    if status.zustand != BridgeState::Verbindet {
                        continue;
                    }
                    status.zustand = BridgeState::Aktiv;
                    status.sitzung
                };
                info!(%sitzung, "Live-Session aktiv");
                melde(
                    &inner,
                    BridgeEvent::ZustandGeaendert {
                        sitzung,
                        zustand: BridgeState::Aktiv,
                    },
                );
            }
            TransportEvent::Nachricht(msg) => {
                verarbeite_nachricht(&inner, generation, msg);
            }
            TransportEvent::Fehler(meldung) => {
                warn!("Transportfehler: {}", meldung);
                teardown_intern(&inner, Some(generation), Some(meldung));
                break;
            }
            TransportEvent::Geschlossen { meldung } => {
                debug!("Transport geschlossen");
                teardown_intern(&inner, Some(generation), meldung);
                break;
            }
        }
    }
}

/// Verarbeitet ein Server-Event: Transkripte und Audio-Parts
fn verarbeite_nachricht(inner: &Arc<BridgeInner>, generation: u64, msg: ServerMessage) {
    // Transkripte ueberschreiben den Zustand (letztes gewinnt)
    for (quelle, text) in msg.transkripte() {
        let sitzung = {
            let mut status = inner.status.lock();
            if status.generation != generation {
                return;
            }
            status.transkript = Some(text.to_string());
            status.sitzung
        };
        melde(
            inner,
            BridgeEvent::Transkript {
                sitzung,
                quelle,
                text: text.to_string(),
            },
        );
    }

    // Audio-Parts einplanen; ein defekter Part bricht die Sitzung nicht ab
    for blob in msg.audio_blobs() {
        match blob.samples() {
            Ok(samples) => {
                let info = inner.scheduler.planen(samples);
                trace!(
                    start_s = info.start_sekunden,
                    dauer_s = info.dauer_sekunden,
                    "Audio-Puffer eingeplant"
                );
            }
            Err(e) => {
                warn!("Audio-Part nicht dekodierbar, uebersprungen: {}", e);
            }
        }
    }

    if msg.turn_complete() {
        debug!("Sprecherwechsel abgeschlossen");
    }
}

// ---------------------------------------------------------------------------
// Weiterleitungs-Schleife (Capture-Frames -> Transport)
// ---------------------------------------------------------------------------

async fn weiterleitungs_schleife(
    inner: Arc<BridgeInner>,
    mut frames: mpsc::Receiver<Vec<f32>>,
    generation: u64,
) {
    // Rueckstau aus dem Handshake-Fenster verwerfen: Frames ohne
    // bereites Session-Handle werden verworfen, nie nachgereicht
    while frames.try_recv().is_ok() {
        trace!("Capture-Frame aus Handshake-Fenster verworfen");
    }

    while let Some(frame) = frames.recv().await {
        let handle = {
            let status = inner.status.lock();
            if status.generation != generation {
                break;
            }
            status.session.clone()
        };
        match handle {
            Some(session) => {
                let input = RealtimeInput::aus_capture_samples(&frame);
                if !session.send_frame(input) {
                    trace!("Frame verworfen (Session geschlossen)");
                }
            }
            None => {
                trace!("Frame verworfen (Session nicht bereit)");
            }
        }
    }
    debug!("Weiterleitungs-Schleife beendet");
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine;
    use coachcall_audio::{AudioError, AudioResult};
    use coachcall_core::TranskriptQuelle;
    use coachcall_protocol::encode_pcm16;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    // --- Mock: Audio-Graph ohne Hardware ---

    #[derive(Default)]
    struct MockGraphZustand {
        frame_tx: Mutex<Option<mpsc::Sender<Vec<f32>>>>,
    }

    struct MockGraph {
        offen: Arc<AtomicBool>,
        zustand: Arc<MockGraphZustand>,
        oeffnen_schlaegt_fehl: bool,
    }

    impl MockGraph {
        fn neu() -> (Self, Arc<AtomicBool>, Arc<MockGraphZustand>) {
            let offen = Arc::new(AtomicBool::new(false));
            let zustand = Arc::new(MockGraphZustand::default());
            (
                Self {
                    offen: Arc::clone(&offen),
                    zustand: Arc::clone(&zustand),
                    oeffnen_schlaegt_fehl: false,
                },
                offen,
                zustand,
            )
        }

        fn fehlerhaft() -> Self {
            let (mut graph, _, _) = Self::neu();
            graph.oeffnen_schlaegt_fehl = true;
            graph
        }
    }

    impl AudioGraph for MockGraph {
        fn oeffnen(
            &mut self,
            _scheduler: Arc<PlaybackScheduler>,
        ) -> AudioResult<mpsc::Receiver<Vec<f32>>> {
            if self.oeffnen_schlaegt_fehl {
                return Err(AudioError::KeinStandardEingabegeraet);
            }
            let (tx, rx) = mpsc::channel(8);
            *self.zustand.frame_tx.lock() = Some(tx);
            self.offen.store(true, Ordering::SeqCst);
            Ok(rx)
        }

        fn schliessen(&mut self) {
            self.offen.store(false, Ordering::SeqCst);
            self.zustand.frame_tx.lock().take();
        }

        fn ist_offen(&self) -> bool {
            self.offen.load(Ordering::SeqCst)
        }
    }

    // --- Mock: Transport ohne Netzwerk ---

    #[derive(Default)]
    struct MockTransportZustand {
        event_tx: Mutex<Option<mpsc::UnboundedSender<TransportEvent>>>,
        gesendet: Mutex<Vec<RealtimeInput>>,
    }

    struct MockTransport {
        zustand: Arc<MockTransportZustand>,
        /// Handshake haengt bis zum notify (fuer Stop-waehrend-Verbindet)
        haengt: Option<Arc<tokio::sync::Notify>>,
        verbinden_schlaegt_fehl: bool,
    }

    impl MockTransport {
        fn neu() -> (Self, Arc<MockTransportZustand>) {
            let zustand = Arc::new(MockTransportZustand::default());
            (
                Self {
                    zustand: Arc::clone(&zustand),
                    haengt: None,
                    verbinden_schlaegt_fehl: false,
                },
                zustand,
            )
        }

        fn haengend(notify: Arc<tokio::sync::Notify>) -> (Self, Arc<MockTransportZustand>) {
            let (mut transport, zustand) = Self::neu();
            transport.haengt = Some(notify);
            (transport, zustand)
        }

        fn fehlerhaft() -> Self {
            let (mut transport, _) = Self::neu();
            transport.verbinden_schlaegt_fehl = true;
            transport
        }
    }

    impl MockTransportZustand {
        fn feuere(&self, event: TransportEvent) {
            if let Some(tx) = &*self.event_tx.lock() {
                let _ = tx.send(event);
            }
        }
    }

    #[async_trait]
    impl LiveTransport for MockTransport {
        async fn verbinden(
            &self,
            _setup: SetupMessage,
        ) -> Result<(SessionHandle, mpsc::UnboundedReceiver<TransportEvent>)> {
            if let Some(notify) = &self.haengt {
                notify.notified().await;
            }
            if self.verbinden_schlaegt_fehl {
                return Err(CoachCallError::Verbindung("Handshake abgelehnt".into()));
            }

            let (frame_tx, mut frame_rx) = mpsc::unbounded_channel();
            let zustand = Arc::clone(&self.zustand);
            tokio::spawn(async move {
                while let Some(frame) = frame_rx.recv().await {
                    zustand.gesendet.lock().push(frame);
                }
            });

            let (event_tx, event_rx) = mpsc::unbounded_channel();
            *self.zustand.event_tx.lock() = Some(event_tx);
            Ok((SessionHandle::neu(frame_tx), event_rx))
        }
    }

    // --- Hilfsfunktionen ---

    fn audio_nachricht(samples: &[f32]) -> ServerMessage {
        let json = format!(
            r#"{{"serverContent":{{"modelTurn":{{"parts":[{{"inlineData":{{"data":"{}"}}}}]}}}}}}"#,
            BASE64.encode(encode_pcm16(samples))
        );
        ServerMessage::parse(&json).unwrap()
    }

    async fn warte_bis(mut bedingung: impl FnMut() -> bool) {
        for _ in 0..200 {
            if bedingung() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("Bedingung wurde nicht rechtzeitig erfuellt");
    }

    fn bridge_mit(
        transport: MockTransport,
        graph: MockGraph,
    ) -> (VoiceBridge, mpsc::UnboundedReceiver<BridgeEvent>) {
        VoiceBridge::neu(BridgeConfig::default(), Box::new(transport), Box::new(graph))
    }

    // --- Tests ---

    #[tokio::test]
    async fn start_wechselt_nach_verbindet_und_aktiv() {
        let (transport, transport_zustand) = MockTransport::neu();
        let (graph, mikro_offen, _) = MockGraph::neu();
        let (bridge, _events) = bridge_mit(transport, graph);

        assert_eq!(bridge.zustand(), BridgeState::Leerlauf);
        bridge.start().await.unwrap();
        assert_eq!(bridge.zustand(), BridgeState::Verbindet);
        assert!(mikro_offen.load(Ordering::SeqCst), "Mikrofon muss erworben sein");

        transport_zustand.feuere(TransportEvent::Geoeffnet);
        let b = bridge.clone();
        warte_bis(move || b.zustand() == BridgeState::Aktiv).await;

        // Transkript-Zustand ist leer -> UI zeigt Platzhalter
        assert_eq!(bridge.transkript(), None);
    }

    #[tokio::test]
    async fn erneuter_start_waehrend_aktiver_sitzung_ist_fehler() {
        let (transport, transport_zustand) = MockTransport::neu();
        let (graph, _, _) = MockGraph::neu();
        let (bridge, _events) = bridge_mit(transport, graph);

        bridge.start().await.unwrap();
        transport_zustand.feuere(TransportEvent::Geoeffnet);
        let b = bridge.clone();
        warte_bis(move || b.zustand() == BridgeState::Aktiv).await;

        let result = bridge.start().await;
        assert!(matches!(result, Err(CoachCallError::SitzungAktiv)));
    }

    #[tokio::test]
    async fn mikrofon_fehler_bricht_start_ab() {
        let (transport, _) = MockTransport::neu();
        let (bridge, mut events) = bridge_mit(transport, MockGraph::fehlerhaft());

        let result = bridge.start().await;
        assert!(matches!(result, Err(CoachCallError::Mikrofon(_))));
        assert_eq!(bridge.zustand(), BridgeState::Leerlauf);
        assert!(bridge.letzter_fehler().is_some());

        // Fehler-Event fuer die UI
        let mut fehler_gemeldet = false;
        while let Ok(event) = events.try_recv() {
            if matches!(event, BridgeEvent::Fehler { .. }) {
                fehler_gemeldet = true;
            }
        }
        assert!(fehler_gemeldet);
    }

    #[tokio::test]
    async fn handshake_fehler_raeumt_vollstaendig_ab() {
        let (graph, mikro_offen, _) = MockGraph::neu();
        let (bridge, _events) = bridge_mit(MockTransport::fehlerhaft(), graph);

        let result = bridge.start().await;
        assert!(matches!(result, Err(CoachCallError::Verbindung(_))));
        assert_eq!(bridge.zustand(), BridgeState::Leerlauf);
        assert!(!mikro_offen.load(Ordering::SeqCst), "Mikrofon muss frei sein");
    }

    #[tokio::test]
    async fn stop_waehrend_verbindet_gibt_mikrofon_frei() {
        let notify = Arc::new(tokio::sync::Notify::new());
        let (transport, _) = MockTransport::haengend(Arc::clone(&notify));
        let (graph, mikro_offen, _) = MockGraph::neu();
        let (bridge, _events) = bridge_mit(transport, graph);

        let starter = bridge.clone();
        let start_task = tokio::spawn(async move { starter.start().await });

        // Warten bis der Start im Handshake haengt (Mikrofon erworben)
        let offen = Arc::clone(&mikro_offen);
        warte_bis(move || offen.load(Ordering::SeqCst)).await;
        assert_eq!(bridge.zustand(), BridgeState::Verbindet);

        bridge.stop();
        assert_eq!(bridge.zustand(), BridgeState::Leerlauf);
        assert!(
            !mikro_offen.load(Ordering::SeqCst),
            "Mikrofon darf nach stop() nicht aktiv bleiben"
        );

        // Handshake nachtraeglich aufloesen: Start endet ohne Fehler,
        // es entsteht kein Capture-Graph und keine aktive Sitzung
        notify.notify_one();
        start_task.await.unwrap().unwrap();
        assert_eq!(bridge.zustand(), BridgeState::Leerlauf);
        assert!(!mikro_offen.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn stop_ist_idempotent() {
        let (transport, transport_zustand) = MockTransport::neu();
        let (graph, mikro_offen, _) = MockGraph::neu();
        let (bridge, _events) = bridge_mit(transport, graph);

        bridge.start().await.unwrap();
        transport_zustand.feuere(TransportEvent::Geoeffnet);
        let b = bridge.clone();
        warte_bis(move || b.zustand() == BridgeState::Aktiv).await;

        bridge.stop();
        assert_eq!(bridge.zustand(), BridgeState::Leerlauf);
        bridge.stop();
        assert_eq!(bridge.zustand(), BridgeState::Leerlauf);
        assert!(!mikro_offen.load(Ordering::SeqCst));
        assert_eq!(bridge.transkript(), None);
        assert_eq!(bridge.letzter_fehler(), None);
    }

    #[tokio::test]
    async fn neustart_nach_stop_ergibt_unabhaengige_sitzung() {
        let (transport, transport_zustand) = MockTransport::neu();
        let (graph, _, _) = MockGraph::neu();
        let (bridge, _events) = bridge_mit(transport, graph);

        bridge.start().await.unwrap();
        transport_zustand.feuere(TransportEvent::Geoeffnet);
        let b = bridge.clone();
        warte_bis(move || b.zustand() == BridgeState::Aktiv).await;
        bridge.stop();

        bridge.start().await.unwrap();
        assert_eq!(bridge.zustand(), BridgeState::Verbindet);
        transport_zustand.feuere(TransportEvent::Geoeffnet);
        let b = bridge.clone();
        warte_bis(move || b.zustand() == BridgeState::Aktiv).await;
    }

    #[tokio::test]
    async fn transkripte_ueberschreiben_den_zustand() {
        let (transport, transport_zustand) = MockTransport::neu();
        let (graph, _, _) = MockGraph::neu();
        let (bridge, mut events) = bridge_mit(transport, graph);

        bridge.start().await.unwrap();
        transport_zustand.feuere(TransportEvent::Geoeffnet);
        let b = bridge.clone();
        warte_bis(move || b.zustand() == BridgeState::Aktiv).await;

        let msg = ServerMessage::parse(
            r#"{"serverContent":{"inputTranscription":{"text":"oi coach"}}}"#,
        )
        .unwrap();
        transport_zustand.feuere(TransportEvent::Nachricht(msg));
        let b = bridge.clone();
        warte_bis(move || b.transkript() == Some("oi coach".to_string())).await;

        let msg = ServerMessage::parse(
            r#"{"serverContent":{"outputTranscription":{"text":"ola, tudo bem?"}}}"#,
        )
        .unwrap();
        transport_zustand.feuere(TransportEvent::Nachricht(msg));
        let b = bridge.clone();
        warte_bis(move || b.transkript() == Some("ola, tudo bem?".to_string())).await;

        // Beide Quellen tauchen als Events auf
        let mut quellen = Vec::new();
        while let Ok(event) = events.try_recv() {
            if let BridgeEvent::Transkript { quelle, .. } = event {
                quellen.push(quelle);
            }
        }
        assert_eq!(
            quellen,
            vec![TranskriptQuelle::Benutzer, TranskriptQuelle::Coach]
        );
    }

    #[tokio::test]
    async fn audio_part_wird_mit_korrekter_dauer_eingeplant() {
        let (transport, transport_zustand) = MockTransport::neu();
        let (graph, _, _) = MockGraph::neu();
        let (bridge, _events) = bridge_mit(transport, graph);

        bridge.start().await.unwrap();
        transport_zustand.feuere(TransportEvent::Geoeffnet);
        let b = bridge.clone();
        warte_bis(move || b.zustand() == BridgeState::Aktiv).await;

        // 2400 Samples bei 24 kHz = 0.1 s
        transport_zustand.feuere(TransportEvent::Nachricht(audio_nachricht(&[0.5; 2400])));
        let b = bridge.clone();
        warte_bis(move || b.aktive_wiedergabe() == 1).await;
        assert!(
            (bridge.inner.scheduler.naechster_start_sekunden() - 0.1).abs() < 1e-9,
            "Zeitachse muss um genau die Puffer-Dauer vorruecken"
        );

        // "Abspielen": Uhr am Puffer vorbeirendern -> deregistriert sich
        let mut block = vec![0.0f32; 2400];
        bridge.inner.scheduler.render(&mut block);
        assert_eq!(bridge.aktive_wiedergabe(), 0);
    }

    #[tokio::test]
    async fn defekter_audio_part_blockiert_folgende_nicht() {
        let (transport, transport_zustand) = MockTransport::neu();
        let (graph, _, _) = MockGraph::neu();
        let (bridge, _events) = bridge_mit(transport, graph);

        bridge.start().await.unwrap();
        transport_zustand.feuere(TransportEvent::Geoeffnet);
        let b = bridge.clone();
        warte_bis(move || b.zustand() == BridgeState::Aktiv).await;

        // Erster Part: kein gueltiges Base64; zweiter Part: gueltig
        let json = format!(
            r#"{{"serverContent":{{"modelTurn":{{"parts":[
                {{"inlineData":{{"data":"%%%kaputt%%%"}}}},
                {{"inlineData":{{"data":"{}"}}}}
            ]}}}}}}"#,
            BASE64.encode(encode_pcm16(&[0.1; 480]))
        );
        let msg = ServerMessage::parse(&json).unwrap();
        transport_zustand.feuere(TransportEvent::Nachricht(msg));
        let b = bridge.clone();
        warte_bis(move || b.aktive_wiedergabe() == 1).await;
        assert_eq!(bridge.zustand(), BridgeState::Aktiv, "Sitzung laeuft weiter");

        // Spaetere Nachrichten spielen ebenfalls
        transport_zustand.feuere(TransportEvent::Nachricht(audio_nachricht(&[0.2; 480])));
        let b = bridge.clone();
        warte_bis(move || b.aktive_wiedergabe() == 2).await;
    }

    #[tokio::test]
    async fn transportfehler_fuehrt_zu_teardown_mit_meldung() {
        let (transport, transport_zustand) = MockTransport::neu();
        let (graph, mikro_offen, _) = MockGraph::neu();
        let (bridge, _events) = bridge_mit(transport, graph);

        bridge.start().await.unwrap();
        transport_zustand.feuere(TransportEvent::Geoeffnet);
        let b = bridge.clone();
        warte_bis(move || b.zustand() == BridgeState::Aktiv).await;

        transport_zustand.feuere(TransportEvent::Fehler("Stream abgerissen".into()));
        let b = bridge.clone();
        warte_bis(move || b.zustand() == BridgeState::Leerlauf).await;
        assert!(!mikro_offen.load(Ordering::SeqCst));
        assert_eq!(bridge.letzter_fehler(), Some("Stream abgerissen".to_string()));
    }

    #[tokio::test]
    async fn transport_close_raeumt_ohne_meldung_ab() {
        let (transport, transport_zustand) = MockTransport::neu();
        let (graph, _, _) = MockGraph::neu();
        let (bridge, _events) = bridge_mit(transport, graph);

        bridge.start().await.unwrap();
        transport_zustand.feuere(TransportEvent::Geoeffnet);
        let b = bridge.clone();
        warte_bis(move || b.zustand() == BridgeState::Aktiv).await;

        transport_zustand.feuere(TransportEvent::Geschlossen { meldung: None });
        let b = bridge.clone();
        warte_bis(move || b.zustand() == BridgeState::Leerlauf).await;
        assert_eq!(bridge.letzter_fehler(), None);
    }

    #[tokio::test]
    async fn capture_frames_werden_nach_open_weitergeleitet() {
        let (transport, transport_zustand) = MockTransport::neu();
        let (graph, _, graph_zustand) = MockGraph::neu();
        let (bridge, _events) = bridge_mit(transport, graph);

        bridge.start().await.unwrap();
        transport_zustand.feuere(TransportEvent::Geoeffnet);
        let b = bridge.clone();
        warte_bis(move || b.zustand() == BridgeState::Aktiv).await;

        // Zwei Capture-Frames einspeisen
        let tx = graph_zustand.frame_tx.lock().clone().unwrap();
        tx.send(vec![0.1; 4096]).await.unwrap();
        tx.send(vec![0.2; 4096]).await.unwrap();

        let zustand = Arc::clone(&transport_zustand);
        warte_bis(move || zustand.gesendet.lock().len() == 2).await;

        // Frames tragen das richtige MIME-Tag
        let gesendet = transport_zustand.gesendet.lock();
        assert_eq!(
            gesendet[0].media.mime_type.as_deref(),
            Some("audio/pcm;rate=16000")
        );
    }
}
