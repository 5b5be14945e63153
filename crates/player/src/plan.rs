//! Periodischer Update-Plan eines Players
//!
//! Ein Plan ist entweder aktiv oder abgebrochen. Der Abbruch unterbricht
//! keinen laufenden Tick; jeder Tick prueft das Token selbst, bevor er
//! etwas sendet.

use std::time::Duration;

use klangwerk_engine::AudioTrack;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Handle auf einen laufenden Update-Plan
#[derive(Debug)]
pub struct UpdatePlan {
    abbruch: CancellationToken,
    track: AudioTrack,
}

impl UpdatePlan {
    /// Startet den Plan; der erste Tick erfolgt sofort
    pub fn starten<F>(
        laufzeit: &tokio::runtime::Handle,
        intervall: Duration,
        track: AudioTrack,
        mut tick: F,
    ) -> Self
    where
        F: FnMut(&CancellationToken) + Send + 'static,
    {
        let intervall = if intervall.is_zero() {
            Duration::from_secs(1)
        } else {
            intervall
        };
        let abbruch = CancellationToken::new();
        let token = abbruch.clone();

        laufzeit.spawn(async move {
            let mut takt = tokio::time::interval(intervall);
            takt.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = takt.tick() => tick(&token),
                }
            }
            trace!("Update-Plan beendet");
        });

        Self { abbruch, track }
    }

    pub fn abbrechen(&self) {
        self.abbruch.cancel();
    }

    pub fn ist_aktiv(&self) -> bool {
        !self.abbruch.is_cancelled()
    }

    pub fn track(&self) -> &AudioTrack {
        &self.track
    }
}

impl Drop for UpdatePlan {
    fn drop(&mut self) {
        self.abbruch.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use klangwerk_engine::AudioTrackInfo;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn track() -> AudioTrack {
        AudioTrack::neu(
            AudioTrackInfo {
                titel: "T".into(),
                autor: "A".into(),
                laenge_ms: 10_000,
                identifier: "t".into(),
                ist_stream: false,
                uri: None,
                artwork_url: None,
                isrc: None,
            },
            "speicher",
            true,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn erster_tick_sofort_dann_periodisch() {
        let ticks = Arc::new(AtomicU32::new(0));
        let zaehler = ticks.clone();
        let plan = UpdatePlan::starten(
            &tokio::runtime::Handle::current(),
            Duration::from_secs(5),
            track(),
            move |_| {
                zaehler.fetch_add(1, Ordering::SeqCst);
            },
        );

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 3);
        assert!(plan.ist_aktiv());
    }

    #[tokio::test(start_paused = true)]
    async fn abbrechen_stoppt_ticks() {
        let ticks = Arc::new(AtomicU32::new(0));
        let zaehler = ticks.clone();
        let plan = UpdatePlan::starten(
            &tokio::runtime::Handle::current(),
            Duration::from_secs(1),
            track(),
            move |_| {
                zaehler.fetch_add(1, Ordering::SeqCst);
            },
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
        plan.abbrechen();
        assert!(!plan.ist_aktiv());

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn drop_bricht_ab() {
        let ticks = Arc::new(AtomicU32::new(0));
        let zaehler = ticks.clone();
        let plan = UpdatePlan::starten(
            &tokio::runtime::Handle::current(),
            Duration::from_secs(1),
            track(),
            move |_| {
                zaehler.fetch_add(1, Ordering::SeqCst);
            },
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
        drop(plan);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn plan_haelt_seinen_track() {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        let t = track();
        let plan = UpdatePlan::starten(rt.handle(), Duration::from_secs(1), t.clone(), |_| {});
        assert!(plan.track().ist_selber(&t));
        assert!(!plan.track().ist_selber(&t.klonen()));
    }
}
