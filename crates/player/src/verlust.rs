//! Frame-Verlustzaehler
//!
//! Zaehlt erfolgreiche und fehlgeschlagene Frame-Abrufe eines Players.
//! Reiner Zaehler ohne Einfluss auf die Wiedergabe.
//!
//! ## Minutenfenster
//! Neben den Gesamtzaehlern werden Erfolge/Verluste pro Kalenderminute
//! gefuehrt. Die Werte der letzten abgeschlossenen Minute sind nur dann
//! verwertbar, wenn die Wiedergabe in dieser Minute nicht unterbrochen war
//! (kein Trackwechsel laenger als [`WECHSEL_TOLERANZ_MS`], keine Pause).

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

/// Erwartete Frames pro Minute (ein Frame alle 20 ms)
pub const ERWARTETE_FRAMES_PRO_MINUTE: u64 = 60_000 / 20;

/// Maximale Luecke zwischen zwei Tracks, die noch als durchgehend gilt
pub const WECHSEL_TOLERANZ_MS: i64 = 100;

fn jetzt_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn minute(ms: i64) -> i64 {
    ms.div_euclid(60_000)
}

/// Zeitpunkte von Start/Ende der Wiedergabe
#[derive(Debug)]
struct Zeitfenster {
    spielt_seit: Option<i64>,
    letzter_start: Option<i64>,
    letztes_ende: Option<i64>,
}

#[derive(Debug)]
pub struct FrameVerlustZaehler {
    erfolge: AtomicU64,
    verluste: AtomicU64,
    erfolge_in_folge: AtomicU64,
    verluste_in_folge: AtomicU64,

    aktuelle_minute: AtomicU64,
    minute_erfolge: AtomicU64,
    minute_verluste: AtomicU64,
    letzte_minute_erfolge: AtomicU64,
    letzte_minute_verluste: AtomicU64,

    offen_erfolge: AtomicU64,
    offen_verluste: AtomicU64,

    zeitfenster: Mutex<Zeitfenster>,
}

impl Default for FrameVerlustZaehler {
    fn default() -> Self {
        Self::neu()
    }
}

impl FrameVerlustZaehler {
    pub fn neu() -> Self {
        Self {
            erfolge: AtomicU64::new(0),
            verluste: AtomicU64::new(0),
            erfolge_in_folge: AtomicU64::new(0),
            verluste_in_folge: AtomicU64::new(0),
            aktuelle_minute: AtomicU64::new(0),
            minute_erfolge: AtomicU64::new(0),
            minute_verluste: AtomicU64::new(0),
            letzte_minute_erfolge: AtomicU64::new(0),
            letzte_minute_verluste: AtomicU64::new(0),
            offen_erfolge: AtomicU64::new(0),
            offen_verluste: AtomicU64::new(0),
            zeitfenster: Mutex::new(Zeitfenster {
                spielt_seit: None,
                letzter_start: None,
                letztes_ende: None,
            }),
        }
    }

    // -----------------------------------------------------------------------
    // Frame-Pfad (lock-frei)
    // -----------------------------------------------------------------------

    pub fn erfolg(&self) {
        self.erfolg_bei(jetzt_ms());
    }

    pub fn verlust(&self) {
        self.verlust_bei(jetzt_ms());
    }

    pub(crate) fn erfolg_bei(&self, jetzt: i64) {
        self.minute_pruefen(jetzt);
        self.erfolge.fetch_add(1, Ordering::Relaxed);
        self.erfolge_in_folge.fetch_add(1, Ordering::Relaxed);
        self.verluste_in_folge.store(0, Ordering::Relaxed);
        self.minute_erfolge.fetch_add(1, Ordering::Relaxed);
        self.offen_erfolge.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn verlust_bei(&self, jetzt: i64) {
        self.minute_pruefen(jetzt);
        self.verluste.fetch_add(1, Ordering::Relaxed);
        self.verluste_in_folge.fetch_add(1, Ordering::Relaxed);
        self.erfolge_in_folge.store(0, Ordering::Relaxed);
        self.minute_verluste.fetch_add(1, Ordering::Relaxed);
        self.offen_verluste.fetch_add(1, Ordering::Relaxed);
    }

    /// Schliesst beim Minutenwechsel das aktuelle Fenster ab
    fn minute_pruefen(&self, jetzt: i64) {
        let aktuell = minute(jetzt) as u64;
        let vorher = self.aktuelle_minute.swap(aktuell, Ordering::AcqRel);
        if vorher != aktuell {
            // Nur ein Frame-Task pro Player, daher kein Wettlauf um das Fenster
            let erfolge = self.minute_erfolge.swap(0, Ordering::AcqRel);
            let verluste = self.minute_verluste.swap(0, Ordering::AcqRel);
            let (erfolge, verluste) = if aktuell == vorher + 1 {
                (erfolge, verluste)
            } else {
                (0, 0)
            };
            self.letzte_minute_erfolge.store(erfolge, Ordering::Release);
            self.letzte_minute_verluste.store(verluste, Ordering::Release);
        }
    }

    // -----------------------------------------------------------------------
    // Auswertung
    // -----------------------------------------------------------------------

    pub fn erfolge(&self) -> u64 {
        self.erfolge.load(Ordering::Relaxed)
    }

    pub fn verluste(&self) -> u64 {
        self.verluste.load(Ordering::Relaxed)
    }

    pub fn erfolge_in_folge(&self) -> u64 {
        self.erfolge_in_folge.load(Ordering::Relaxed)
    }

    pub fn verluste_in_folge(&self) -> u64 {
        self.verluste_in_folge.load(Ordering::Relaxed)
    }

    /// Verluste / (Verluste + Erfolge) seit dem letzten Zuruecksetzen
    pub fn verlust_rate(&self) -> f64 {
        let erfolge = self.erfolge() as f64;
        let verluste = self.verluste() as f64;
        let gesamt = erfolge + verluste;
        if gesamt == 0.0 {
            0.0
        } else {
            verluste / gesamt
        }
    }

    /// Setzt die Gesamt- und Folgezaehler zurueck (Minutenfenster bleiben)
    pub fn zuruecksetzen(&self) {
        self.erfolge.store(0, Ordering::Relaxed);
        self.verluste.store(0, Ordering::Relaxed);
        self.erfolge_in_folge.store(0, Ordering::Relaxed);
        self.verluste_in_folge.store(0, Ordering::Relaxed);
    }

    /// Erfolge und Verluste seit dem letzten Abholen, fuer monotone Zaehler
    pub fn abholen(&self) -> (u64, u64) {
        (
            self.offen_erfolge.swap(0, Ordering::AcqRel),
            self.offen_verluste.swap(0, Ordering::AcqRel),
        )
    }

    /// Erfolge und Verluste der letzten abgeschlossenen Minute
    pub fn letzte_minute(&self) -> (u64, u64) {
        (
            self.letzte_minute_erfolge.load(Ordering::Acquire),
            self.letzte_minute_verluste.load(Ordering::Acquire),
        )
    }

    pub fn daten_verwertbar(&self) -> bool {
        self.daten_verwertbar_bei(jetzt_ms())
    }

    pub(crate) fn daten_verwertbar_bei(&self, jetzt: i64) -> bool {
        let z = self.zeitfenster.lock();
        // Wiedergabe ruht laenger als ein Trackwechsel dauern darf
        if let Some(ende) = z.letztes_ende {
            if jetzt - ende > WECHSEL_TOLERANZ_MS {
                return false;
            }
        }
        match z.spielt_seit {
            Some(seit) => minute(seit) < minute(jetzt) - 1,
            None => false,
        }
    }

    // -----------------------------------------------------------------------
    // Wiedergabe-Ereignisse
    // -----------------------------------------------------------------------

    pub fn track_gestartet(&self) {
        self.track_gestartet_bei(jetzt_ms());
    }

    pub fn track_beendet(&self) {
        self.track_beendet_bei(jetzt_ms());
    }

    pub(crate) fn track_gestartet_bei(&self, jetzt: i64) {
        let mut z = self.zeitfenster.lock();
        let luecke = z.letztes_ende.map(|ende| jetzt - ende);
        z.letzter_start = Some(jetzt);
        let unterbrochen = luecke.is_some_and(|l| l > WECHSEL_TOLERANZ_MS);
        if unterbrochen || z.spielt_seit.is_none() {
            z.spielt_seit = Some(jetzt);
        }
        z.letztes_ende = None;
    }

    pub(crate) fn track_beendet_bei(&self, jetzt: i64) {
        self.zeitfenster.lock().letztes_ende = Some(jetzt);
    }

    /// Pause zaehlt wie ein Trackende
    pub fn pausiert(&self) {
        self.track_beendet();
    }

    /// Fortsetzen zaehlt wie ein Trackstart
    pub fn fortgesetzt(&self) {
        self.track_gestartet();
    }
}
