use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use tracing::warn;

static METRICS_LOCK_POISON_WARNED: AtomicBool = AtomicBool::new(false);

fn warn_metrics_lock_poison_once(operation: &'static str) {
    if METRICS_LOCK_POISON_WARNED
        .compare_exchange(false, true, Ordering::Relaxed, Ordering::Relaxed)
        .is_ok()
    {
        warn!(operation, "metrics lock poisoned; recovered inner value");
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LoopMetricsSnapshot {
    pub fps: f32,
    pub tps: f32,
    pub frame_time_ms: f32,
    pub frame_time_max_ms: f32,
}

/// Shared read handle for the most recent metrics window.
#[derive(Clone, Debug, Default)]
pub struct MetricsHandle {
    snapshot: Arc<RwLock<LoopMetricsSnapshot>>,
}

impl MetricsHandle {
    pub fn snapshot(&self) -> LoopMetricsSnapshot {
        match self.snapshot.read() {
            Ok(guard) => *guard,
            Err(poisoned) => {
                warn_metrics_lock_poison_once("read");
                *poisoned.into_inner()
            }
        }
    }

    pub(crate) fn publish(&self, snapshot: LoopMetricsSnapshot) {
        let mut guard = match self.snapshot.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn_metrics_lock_poison_once("write");
                poisoned.into_inner()
            }
        };
        *guard = snapshot;
    }
}

#[derive(Debug)]
pub(crate) struct MetricsWindow {
    started: Instant,
    length: Duration,
    frames: u32,
    ticks: u32,
    frame_time_total: Duration,
    frame_time_max: Duration,
}

impl MetricsWindow {
    pub(crate) fn new(length: Duration) -> Self {
        Self::starting_at(Instant::now(), length)
    }

    fn starting_at(started: Instant, length: Duration) -> Self {
        Self {
            started,
            length,
            frames: 0,
            ticks: 0,
            frame_time_total: Duration::ZERO,
            frame_time_max: Duration::ZERO,
        }
    }

    pub(crate) fn record_frame(&mut self, frame_dt: Duration) {
        self.frames = self.frames.saturating_add(1);
        self.frame_time_total = self.frame_time_total.saturating_add(frame_dt);
        self.frame_time_max = self.frame_time_max.max(frame_dt);
    }

    pub(crate) fn record_ticks(&mut self, ticks: u32) {
        self.ticks = self.ticks.saturating_add(ticks);
    }

    /// Closes the window once it has run its length and starts the next one.
    pub(crate) fn close_if_elapsed(&mut self, now: Instant) -> Option<LoopMetricsSnapshot> {
        let elapsed = now.saturating_duration_since(self.started);
        if elapsed < self.length {
            return None;
        }

        let seconds = elapsed.as_secs_f32().max(f32::EPSILON);
        let frame_time_ms = match self.frames {
            0 => 0.0,
            frames => self.frame_time_total.as_secs_f32() * 1000.0 / frames as f32,
        };
        let snapshot = LoopMetricsSnapshot {
            fps: self.frames as f32 / seconds,
            tps: self.ticks as f32 / seconds,
            frame_time_ms,
            frame_time_max_ms: self.frame_time_max.as_secs_f32() * 1000.0,
        };
        *self = Self::starting_at(now, self.length);
        Some(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    fn poison(handle: &MetricsHandle) {
        let lock = Arc::clone(&handle.snapshot);
        let _ = thread::spawn(move || {
            let _guard = lock.write().expect("write guard");
            panic!("poison metrics lock");
        })
        .join();
    }

    #[test]
    fn window_reports_rates_average_and_worst_frame() {
        let base = Instant::now();
        let mut window = MetricsWindow::starting_at(base, Duration::from_secs(1));
        window.record_frame(Duration::from_millis(10));
        window.record_frame(Duration::from_millis(30));
        window.record_ticks(3);
        window.record_ticks(1);

        let snapshot = window
            .close_if_elapsed(base + Duration::from_secs(1))
            .expect("window elapsed");
        assert!((snapshot.fps - 2.0).abs() < 0.01);
        assert!((snapshot.tps - 4.0).abs() < 0.01);
        assert!((snapshot.frame_time_ms - 20.0).abs() < 0.001);
        assert!((snapshot.frame_time_max_ms - 30.0).abs() < 0.001);
    }

    #[test]
    fn window_stays_open_until_length_elapses_then_resets() {
        let base = Instant::now();
        let mut window = MetricsWindow::starting_at(base, Duration::from_secs(1));
        window.record_frame(Duration::from_millis(16));
        assert!(window
            .close_if_elapsed(base + Duration::from_millis(500))
            .is_none());

        assert!(window
            .close_if_elapsed(base + Duration::from_secs(1))
            .is_some());
        let empty = window
            .close_if_elapsed(base + Duration::from_secs(2))
            .expect("second window");
        assert_eq!(empty.fps, 0.0);
        assert_eq!(empty.frame_time_max_ms, 0.0);
    }

    #[test]
    fn handle_recovers_from_poisoned_lock() {
        let handle = MetricsHandle::default();
        poison(&handle);
        assert_eq!(handle.snapshot(), LoopMetricsSnapshot::default());

        let expected = LoopMetricsSnapshot {
            fps: 15.0,
            tps: 60.0,
            frame_time_ms: 11.0,
            frame_time_max_ms: 40.0,
        };
        handle.publish(expected);
        assert_eq!(handle.snapshot(), expected);
    }
}
