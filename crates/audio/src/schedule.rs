//! Wiedergabe-Scheduling fuer eingehende Audio-Puffer
//!
//! Der Live-Endpunkt liefert Audio in Stuecken unterschiedlicher Laenge.
//! Damit die Wiedergabe luecken- und ueberlappungsfrei bleibt, fuehrt
//! der Scheduler eine monoton wachsende Zeitachse ("naechster Start")
//! gegen die Geraete-Uhr (gerenderte Samples / Abtastrate):
//!
//! - Ein neuer Puffer startet bei max(naechster Start, Geraete-Uhr)
//! - Danach rueckt der naechste Start um genau die Puffer-Dauer vor
//! - Geplante Puffer bleiben registriert bis sie fertig gerendert sind
//!   und koennen beim Teardown gesammelt gestoppt werden
//!
//! Planen (Transport-Handler) und Rendern (Geraete-Callback) laufen auf
//! verschiedenen Threads; der gesamte Zustand liegt hinter einem Mutex.
//! Der Render-Pfad haelt den Lock nur fuer das Kopieren der faelligen
//! Samples.

use parking_lot::Mutex;

/// Ergebnis einer Planung (fuer Logging und Tests)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeplanteWiedergabe {
    /// Geplanter Startzeitpunkt in Sekunden (Geraete-Zeitachse)
    pub start_sekunden: f64,
    /// Dauer des Puffers in Sekunden
    pub dauer_sekunden: f64,
}

/// Ein geplanter, noch nicht fertig gerenderter Puffer
struct Eintrag {
    /// Absoluter Start in Samples auf der Geraete-Zeitachse
    start: u64,
    samples: Vec<f32>,
}

struct Inner {
    /// Geraete-Uhr: insgesamt gerenderte Samples
    uhr: u64,
    /// Naechster Startzeitpunkt in Samples (die Playback-Timeline)
    naechster_start: u64,
    /// Aktive Wiedergabe-Menge
    eintraege: Vec<Eintrag>,
}

/// Scheduler fuer sequenzielle, lueckenlose Wiedergabe
pub struct PlaybackScheduler {
    rate: u32,
    inner: Mutex<Inner>,
}

impl PlaybackScheduler {
    /// Erstellt einen Scheduler fuer die gegebene Abtastrate
    pub fn neu(rate: u32) -> Self {
        Self {
            rate,
            inner: Mutex::new(Inner {
                uhr: 0,
                naechster_start: 0,
                eintraege: Vec::new(),
            }),
        }
    }

    /// Abtastrate der Wiedergabe-Zeitachse
    pub fn rate(&self) -> u32 {
        self.rate
    }

    /// Plant einen Puffer zur Wiedergabe ein
    ///
    /// Startzeitpunkt ist max(naechster Start, Geraete-Uhr); anschliessend
    /// rueckt der naechste Start um die Puffer-Dauer vor. Leere Puffer
    /// veraendern die Zeitachse nicht.
    pub fn planen(&self, samples: Vec<f32>) -> GeplanteWiedergabe {
        let mut inner = self.inner.lock();
        let start = inner.naechster_start.max(inner.uhr);
        let laenge = samples.len() as u64;
        inner.naechster_start = start + laenge;
        if laenge > 0 {
            inner.eintraege.push(Eintrag { start, samples });
        }
        GeplanteWiedergabe {
            start_sekunden: start as f64 / self.rate as f64,
            dauer_sekunden: laenge as f64 / self.rate as f64,
        }
    }

    /// Rendert den naechsten Ausgabe-Block und rueckt die Geraete-Uhr vor
    ///
    /// Nicht belegte Bereiche werden mit Stille gefuellt. Fertig
    /// gerenderte Puffer entfernen sich selbst aus der aktiven Menge.
    pub fn render(&self, ziel: &mut [f32]) {
        ziel.fill(0.0);

        let mut inner = self.inner.lock();
        let beginn = inner.uhr;
        let ende = beginn + ziel.len() as u64;

        inner.eintraege.retain(|eintrag| {
            let e_ende = eintrag.start + eintrag.samples.len() as u64;
            if e_ende <= beginn {
                // Bereits vollstaendig gerendert (oder Block uebersprungen)
                return false;
            }
            if eintrag.start >= ende {
                // Noch nicht faellig
                return true;
            }
            let von = eintrag.start.max(beginn);
            let bis = e_ende.min(ende);
            for t in von..bis {
                ziel[(t - beginn) as usize] += eintrag.samples[(t - eintrag.start) as usize];
            }
            e_ende > ende
        });

        inner.uhr = ende;
    }

    /// Anzahl der aktuell geplanten/spielenden Puffer
    pub fn aktive_anzahl(&self) -> usize {
        self.inner.lock().eintraege.len()
    }

    /// Stoppt alle geplanten Puffer sofort (Teardown)
    pub fn alle_stoppen(&self) {
        self.inner.lock().eintraege.clear();
    }

    /// Setzt Zeitachse und Uhr auf null zurueck (frische Sitzung)
    pub fn zuruecksetzen(&self) {
        let mut inner = self.inner.lock();
        inner.eintraege.clear();
        inner.naechster_start = 0;
        inner.uhr = 0;
    }

    /// Aktueller Stand der Geraete-Uhr in Sekunden
    pub fn uhr_sekunden(&self) -> f64 {
        self.inner.lock().uhr as f64 / self.rate as f64
    }

    /// Aktueller Stand der Zeitachse (naechster Start) in Sekunden
    pub fn naechster_start_sekunden(&self) -> f64 {
        self.inner.lock().naechster_start as f64 / self.rate as f64
    }
}
