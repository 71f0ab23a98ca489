//! Simulated platform backends.
//!
//! These stand in for the device sensor stack in tests and the CLI
//! harness: a jittered synthetic motion signal, a configurable advertiser
//! population that re-announces devices (exercising deduplication), and
//! an in-memory stepped volume sink with optional write-failure injection.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::thread;
use std::time::Duration;

use rand::Rng;
use tokio::sync::mpsc;

use super::{MotionSample, MotionSource, ProximityScanner, VolumeSink};
use crate::error::SensingError;

/// Gravity magnitude the synthetic accelerometer idles around
const REST_MAGNITUDE: f32 = 9.81;

/// Synthetic motion source emitting jittered gravity samples
///
/// Each sample sits near the rest magnitude with uniform jitter on every
/// axis, so the derived magnitude deltas look like a gently vibrating
/// floor rather than a perfectly still one.
pub struct SimMotionSource {
    sample_interval: Duration,
    jitter: f32,
    stop_flag: Mutex<Option<Arc<AtomicBool>>>,
}

impl SimMotionSource {
    pub fn new(sample_interval: Duration, jitter: f32) -> Self {
        Self {
            sample_interval,
            jitter,
            stop_flag: Mutex::new(None),
        }
    }

    fn swap_stop_flag(&self, next: Option<Arc<AtomicBool>>) {
        let mut guard = self
            .stop_flag
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(previous) = guard.take() {
            previous.store(true, Ordering::SeqCst);
        }
        *guard = next;
    }
}

impl Default for SimMotionSource {
    fn default() -> Self {
        Self::new(Duration::from_millis(50), 0.35)
    }
}

impl MotionSource for SimMotionSource {
    fn start(&self, tx: mpsc::UnboundedSender<MotionSample>) -> Result<(), SensingError> {
        let stop = Arc::new(AtomicBool::new(false));
        self.swap_stop_flag(Some(Arc::clone(&stop)));

        let interval = self.sample_interval;
        let jitter = self.jitter;
        thread::spawn(move || {
            let mut rng = rand::thread_rng();
            while !stop.load(Ordering::SeqCst) {
                let sample = MotionSample {
                    x: rng.gen_range(-jitter..=jitter),
                    y: rng.gen_range(-jitter..=jitter),
                    z: REST_MAGNITUDE + rng.gen_range(-jitter..=jitter),
                };
                if tx.send(sample).is_err() {
                    break;
                }
                thread::sleep(interval);
            }
        });

        Ok(())
    }

    fn stop(&self) {
        self.swap_stop_flag(None);
    }
}

/// Motion source for a device without an accelerometer
#[derive(Default)]
pub struct UnavailableMotionSource {
    _unit: (),
}

impl MotionSource for UnavailableMotionSource {
    fn start(&self, _tx: mpsc::UnboundedSender<MotionSample>) -> Result<(), SensingError> {
        Err(SensingError::SensorUnavailable)
    }

    fn stop(&self) {}
}

/// Synthetic proximity scanner over a configurable advertiser population
///
/// Every scan announces each advertiser several times with small gaps,
/// the way real advertisement frames repeat, so callers must deduplicate.
/// The population can be swapped between scans to simulate a filling room.
pub struct SimProximityScanner {
    advertisers: RwLock<Vec<String>>,
    announcements: usize,
    announce_gap: Duration,
    stop_flag: Mutex<Option<Arc<AtomicBool>>>,
}

impl SimProximityScanner {
    pub fn new(advertisers: Vec<String>) -> Self {
        Self {
            advertisers: RwLock::new(advertisers),
            announcements: 3,
            announce_gap: Duration::from_millis(2),
            stop_flag: Mutex::new(None),
        }
    }

    /// Replace the advertiser population seen by subsequent scans.
    pub fn set_advertisers(&self, advertisers: Vec<String>) {
        *self
            .advertisers
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = advertisers;
    }

    fn snapshot(&self) -> Vec<String> {
        self.advertisers
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    fn swap_stop_flag(&self, next: Option<Arc<AtomicBool>>) {
        let mut guard = self
            .stop_flag
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(previous) = guard.take() {
            previous.store(true, Ordering::SeqCst);
        }
        *guard = next;
    }
}

impl Default for SimProximityScanner {
    fn default() -> Self {
        Self::new(
            (1..=4)
                .map(|i| format!("aa:bb:cc:dd:ee:{:02x}", i))
                .collect(),
        )
    }
}

impl ProximityScanner for SimProximityScanner {
    fn start(&self, tx: mpsc::UnboundedSender<String>) -> Result<(), SensingError> {
        let stop = Arc::new(AtomicBool::new(false));
        self.swap_stop_flag(Some(Arc::clone(&stop)));

        let advertisers = self.snapshot();
        let announcements = self.announcements;
        let gap = self.announce_gap;
        thread::spawn(move || {
            'outer: for _ in 0..announcements {
                for id in &advertisers {
                    if stop.load(Ordering::SeqCst) {
                        break 'outer;
                    }
                    if tx.send(id.clone()).is_err() {
                        break 'outer;
                    }
                    thread::sleep(gap);
                }
            }
        });

        Ok(())
    }

    fn stop(&self) {
        self.swap_stop_flag(None);
    }
}

/// Scanner for a session without scan permission
#[derive(Default)]
pub struct DeniedProximityScanner {
    _unit: (),
}

impl ProximityScanner for DeniedProximityScanner {
    fn start(&self, _tx: mpsc::UnboundedSender<String>) -> Result<(), SensingError> {
        Err(SensingError::PermissionDenied)
    }

    fn stop(&self) {}
}

/// In-memory stepped volume sink
///
/// Level starts at the floor. `set_fail_writes` makes every subsequent
/// write fail while leaving reads intact, which is how platform rejection
/// shows up to the controller.
pub struct SimVolumeSink {
    max_step: u32,
    level: AtomicU32,
    fail_writes: AtomicBool,
}

impl SimVolumeSink {
    pub fn new(max_step: u32) -> Self {
        Self {
            max_step,
            level: AtomicU32::new(0),
            fail_writes: AtomicBool::new(false),
        }
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

impl Default for SimVolumeSink {
    fn default() -> Self {
        Self::new(15)
    }
}

impl VolumeSink for SimVolumeSink {
    fn range(&self) -> (u32, u32) {
        (0, self.max_step)
    }

    fn set_level(&self, step: u32) -> Result<(), SensingError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(SensingError::SinkWriteFailure {
                step,
                details: "write rejected by sink".to_string(),
            });
        }
        self.level.store(step.min(self.max_step), Ordering::SeqCst);
        Ok(())
    }

    fn level(&self) -> u32 {
        self.level.load(Ordering::SeqCst)
    }
}
