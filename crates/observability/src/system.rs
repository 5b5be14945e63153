//! Systemdaten (CPU, Speicher) fuer die Stats-Nachricht

use parking_lot::Mutex;
use sysinfo::{Pid, ProcessesToUpdate, System};

/// Momentaufnahme von CPU- und Speicherdaten
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SystemSchnappschuss {
    pub kerne: u32,
    /// Gesamtlast des Systems (0.0 bis 1.0)
    pub system_last: f64,
    /// Last dieses Prozesses, auf alle Kerne verteilt (0.0 bis 1.0)
    pub prozess_last: f64,
    pub speicher_frei: u64,
    pub speicher_benutzt: u64,
    pub speicher_zugewiesen: u64,
    pub speicher_reservierbar: u64,
}

/// Liest Systemdaten ueber sysinfo
pub struct SystemMonitor {
    system: Mutex<System>,
    pid: Option<Pid>,
}

impl Default for SystemMonitor {
    fn default() -> Self {
        Self::neu()
    }
}

impl SystemMonitor {
    pub fn neu() -> Self {
        let pid = sysinfo::get_current_pid()
            .map_err(|e| tracing::warn!(fehler = %e, "Prozess-ID nicht ermittelbar"))
            .ok();
        Self {
            system: Mutex::new(System::new_all()),
            pid,
        }
    }

    /// Aktualisiert die Daten und liefert eine Momentaufnahme
    ///
    /// CPU-Werte sind erst ab dem zweiten Aufruf aussagekraeftig, da sysinfo
    /// die Last als Differenz zwischen zwei Messungen berechnet.
    pub fn schnappschuss(&self) -> SystemSchnappschuss {
        let mut sys = self.system.lock();
        sys.refresh_memory();
        sys.refresh_cpu_usage();
        if let Some(pid) = self.pid {
            sys.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
        }

        let kerne = sys.cpus().len().max(1) as u32;
        let system_last = f64::from(sys.global_cpu_usage()) / 100.0;

        let prozess = self.pid.and_then(|pid| sys.process(pid));
        let prozess_last = prozess
            .map(|p| f64::from(p.cpu_usage()) / 100.0 / f64::from(kerne))
            .unwrap_or(0.0);
        let prozess_speicher = prozess.map(|p| p.memory()).unwrap_or(0);

        SystemSchnappschuss {
            kerne,
            system_last: system_last.clamp(0.0, 1.0),
            prozess_last: prozess_last.clamp(0.0, 1.0),
            speicher_frei: sys.available_memory(),
            speicher_benutzt: prozess_speicher,
            speicher_zugewiesen: prozess_speicher,
            speicher_reservierbar: sys.total_memory(),
        }
    }
}
