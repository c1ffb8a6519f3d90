//! Progress ticker
//!
//! While the session is playing, a timer task posts a tick into the session's
//! signal channel once per period. The session samples its resource on each
//! tick; the timer never touches the resource itself.
//!
//! Each start gets a fresh epoch. Ticks carry their epoch, so a tick that was
//! already queued when the ticker stopped is recognised as stale and dropped.

use crate::backend::Signal;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// One progress sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSample {
    pub position_ms: u64,
    pub duration_ms: u64,
    pub progress: f64,
}

impl ProgressSample {
    /// Build a sample, clamping the position into `[0, duration]`
    ///
    /// With an unknown (zero) duration the position is reported as 0.
    pub fn new(position_ms: u64, duration_ms: u64) -> Self {
        if duration_ms == 0 {
            return Self {
                position_ms: 0,
                duration_ms: 0,
                progress: 0.0,
            };
        }
        let position_ms = position_ms.min(duration_ms);
        Self {
            position_ms,
            duration_ms,
            progress: position_ms as f64 / duration_ms as f64,
        }
    }
}

/// Periodic sampler, idempotent to start
#[derive(Debug)]
pub struct ProgressTicker {
    period: Duration,
    epoch: u64,
    running: Option<CancellationToken>,
}

impl ProgressTicker {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            epoch: 0,
            running: None,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Whether a tick of `epoch` should be honoured
    pub fn accepts(&self, epoch: u64) -> bool {
        self.running.is_some() && epoch == self.epoch
    }

    /// Start ticking into `signals`
    ///
    /// Returns `false` without doing anything if already running.
    pub(crate) fn start(&mut self, signals: &mpsc::UnboundedSender<Signal>) -> bool {
        if self.running.is_some() {
            return false;
        }

        self.epoch += 1;
        let epoch = self.epoch;
        let token = CancellationToken::new();
        let child = token.clone();
        let tx = signals.clone();
        let period = self.period;

        tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    () = child.cancelled() => break,
                    _ = interval.tick() => {
                        if tx.send(Signal::Tick { epoch }).is_err() {
                            break;
                        }
                    }
                }
            }
            trace!(epoch, "Progress ticker stopped");
        });

        self.running = Some(token);
        true
    }

    /// Stop ticking; takes effect immediately
    pub fn stop(&mut self) {
        if let Some(token) = self.running.take() {
            token.cancel();
        }
    }
}

impl Drop for ProgressTicker {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_clamps_position() {
        let sample = ProgressSample::new(200_000, 180_000);
        assert_eq!(sample.position_ms, 180_000);
        assert_eq!(sample.progress, 1.0);
    }

    #[test]
    fn sample_with_unknown_duration_is_zero() {
        let sample = ProgressSample::new(5_000, 0);
        assert_eq!(sample.position_ms, 0);
        assert_eq!(sample.progress, 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_once_per_period() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut ticker = ProgressTicker::new(Duration::from_millis(1000));

        assert!(ticker.start(&tx));
        tokio::time::sleep(Duration::from_millis(3500)).await;
        ticker.stop();

        let mut ticks = 0;
        while let Ok(Signal::Tick { epoch }) = rx.try_recv() {
            assert_eq!(epoch, 1);
            ticks += 1;
        }
        assert_eq!(ticks, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn second_start_is_a_no_op() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut ticker = ProgressTicker::new(Duration::from_millis(1000));

        assert!(ticker.start(&tx));
        assert!(!ticker.start(&tx));
        tokio::time::sleep(Duration::from_millis(2500)).await;
        ticker.stop();

        let mut ticks = 0;
        while rx.try_recv().is_ok() {
            ticks += 1;
        }
        assert_eq!(ticks, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn restart_invalidates_old_epoch() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut ticker = ProgressTicker::new(Duration::from_millis(1000));

        ticker.start(&tx);
        assert!(ticker.accepts(1));
        ticker.stop();
        assert!(!ticker.accepts(1));

        ticker.start(&tx);
        assert!(!ticker.accepts(1));
        assert!(ticker.accepts(2));
    }
}
