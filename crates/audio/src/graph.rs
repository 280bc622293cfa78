//! Audio-Graph – Capture und Wiedergabe als eine Einheit
//!
//! Die Voice-Bridge braucht genau einen Graphen pro Sitzung: Mikrofon
//! (16 kHz mono) -> Frames fester Groesse, plus Wiedergabe (24 kHz mono)
//! aus dem Scheduler. Der Trait ist der Seam fuer Tests ohne
//! Audio-Hardware.
//!
//! ## Threading
//!
//! cpal-Streams sind !Send und leben deshalb in einem dedizierten
//! std::thread. Der Thread oeffnet beide Streams, meldet das Ergebnis
//! ueber einen Kanal zurueck und sammelt dann Capture-Samples zu
//! 4096er-Frames. Frames werden per `try_send` weitergereicht – ist
//! die Weiterleitung nicht bereit, wird der Frame verworfen, niemals
//! gepuffert oder blockiert.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, trace};

use crate::capture::{open_capture_stream, CaptureConfig, FRAME_LAENGE};
use crate::device;
use crate::error::{AudioError, AudioResult};
use crate::playback::{open_playback_stream, PlaybackConfig};
use crate::schedule::PlaybackScheduler;

/// Kapazitaet des Frame-Kanals (Frames, nicht Samples)
const FRAME_KANAL_KAPAZITAET: usize = 8;

/// Seam zwischen Voice-Bridge und Audio-Hardware
///
/// `oeffnen` erwirbt Mikrofon und Ausgabegeraet und liefert den
/// Empfaenger der Capture-Frames. `schliessen` gibt beide Geraete
/// synchron frei und ist idempotent.
pub trait AudioGraph: Send {
    /// Oeffnet Capture und Wiedergabe; Wiedergabe rendert aus dem Scheduler
    fn oeffnen(
        &mut self,
        scheduler: Arc<PlaybackScheduler>,
    ) -> AudioResult<mpsc::Receiver<Vec<f32>>>;

    /// Gibt Mikrofon und Ausgabegeraet frei (idempotent)
    fn schliessen(&mut self);

    /// Ob der Graph aktuell offen ist (Mikrofon belegt)
    fn ist_offen(&self) -> bool;
}

/// Echter Audio-Graph auf cpal-Basis
pub struct CpalAudioGraph {
    /// Eingabegeraet (None = Standard)
    eingabegeraet: Option<String>,
    /// Ausgabegeraet (None = Standard)
    ausgabegeraet: Option<String>,
    running: Arc<AtomicBool>,
    thread: Option<std::thread::JoinHandle<()>>,
}

impl CpalAudioGraph {
    /// Erstellt einen Graphen fuer die gegebenen Geraete-Namen
    pub fn neu(eingabegeraet: Option<String>, ausgabegeraet: Option<String>) -> Self {
        Self {
            eingabegeraet,
            ausgabegeraet,
            running: Arc::new(AtomicBool::new(false)),
            thread: None,
        }
    }
}

impl AudioGraph for CpalAudioGraph {
    fn oeffnen(
        &mut self,
        scheduler: Arc<PlaybackScheduler>,
    ) -> AudioResult<mpsc::Receiver<Vec<f32>>> {
        if self.thread.is_some() {
            return Err(AudioError::GraphBereitsOffen);
        }

        let (frame_tx, frame_rx) = mpsc::channel::<Vec<f32>>(FRAME_KANAL_KAPAZITAET);
        let (bereit_tx, bereit_rx) = crossbeam_channel::bounded::<AudioResult<()>>(1);

        let running = Arc::new(AtomicBool::new(true));
        self.running = Arc::clone(&running);

        let eingabe_name = self.eingabegeraet.clone();
        let ausgabe_name = self.ausgabegeraet.clone();

        // Audio-Thread: haelt die !Send cpal-Streams und bildet Frames
        let handle = std::thread::Builder::new()
            .name("coachcall-audio".to_string())
            .spawn(move || {
                let eingabe = match device::eingabegeraet(eingabe_name.as_deref()) {
                    Ok(geraet) => geraet,
                    Err(e) => {
                        let _ = bereit_tx.send(Err(e));
                        return;
                    }
                };
                let (capture, mut consumer) =
                    match open_capture_stream(&eingabe, CaptureConfig::default()) {
                        Ok(paar) => paar,
                        Err(e) => {
                            let _ = bereit_tx.send(Err(e));
                            return;
                        }
                    };

                let ausgabe = match device::ausgabegeraet(ausgabe_name.as_deref()) {
                    Ok(geraet) => geraet,
                    Err(e) => {
                        let _ = bereit_tx.send(Err(e));
                        return;
                    }
                };
                let playback =
                    match open_playback_stream(&ausgabe, PlaybackConfig::default(), scheduler) {
                        Ok(stream) => stream,
                        Err(e) => {
                            let _ = bereit_tx.send(Err(e));
                            return;
                        }
                    };

                if bereit_tx.send(Ok(())).is_err() {
                    error!("Graph-Aufrufer hat das Oeffnen nicht abgewartet");
                    return;
                }

                frame_schleife(&mut consumer, frame_tx, &running);

                // Streams werden hier gedroppt: Mikrofon und Ausgabe frei
                drop(capture);
                drop(playback);
                debug!("Audio-Thread beendet, Geraete freigegeben");
            })
            .map_err(|e| AudioError::StreamFehler(e.to_string()))?;

        match bereit_rx.recv() {
            Ok(Ok(())) => {
                self.thread = Some(handle);
                Ok(frame_rx)
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                let _ = handle.join();
                Err(AudioError::StreamFehler(
                    "Audio-Thread wurde nicht gestartet".to_string(),
                ))
            }
        }
    }

    fn schliessen(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }

    fn ist_offen(&self) -> bool {
        self.thread.is_some()
    }
}

impl Drop for CpalAudioGraph {
    fn drop(&mut self) {
        // Sicherstellen dass das Mikrofon nie haengen bleibt
        self.schliessen();
    }
}

/// Sammelt Capture-Samples zu Frames fester Groesse und reicht sie weiter
fn frame_schleife(
    consumer: &mut crate::capture::CaptureConsumer,
    frame_tx: mpsc::Sender<Vec<f32>>,
    running: &AtomicBool,
) {
    use ringbuf::traits::Consumer;

    let mut frame_puffer: Vec<f32> = Vec::with_capacity(FRAME_LAENGE * 2);
    let mut temp = vec![0.0f32; FRAME_LAENGE];

    debug!("Frame-Schleife gestartet (frame_laenge={})", FRAME_LAENGE);

    while running.load(Ordering::Relaxed) {
        let gelesen = consumer.pop_slice(&mut temp);

        if gelesen == 0 {
            // Kein Sample verfuegbar -> kurz schlafen (1/4 Frame bei 16kHz)
            std::thread::sleep(std::time::Duration::from_millis(5));
            continue;
        }

        frame_puffer.extend_from_slice(&temp[..gelesen]);

        while frame_puffer.len() >= FRAME_LAENGE {
            let frame: Vec<f32> = frame_puffer.drain(..FRAME_LAENGE).collect();
            // Fire-and-forget: Weiterleitung nicht bereit -> Frame faellt weg
            if frame_tx.try_send(frame).is_err() {
                trace!("Capture-Frame verworfen (Weiterleitung nicht bereit)");
            }
        }
    }

    debug!("Frame-Schleife beendet");
}
