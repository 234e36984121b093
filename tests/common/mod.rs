use forklore::{DeadlockInfo, ForkId, OwnerInfo, RandomTempo, Tempo, TempoConfig};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, Mutex as StdMutex, mpsc};
use std::thread;
use std::time::{Duration, Instant};

#[allow(dead_code)]
pub const DEADLOCK_TIMEOUT: Duration = Duration::from_secs(3);
#[allow(dead_code)]
pub const NO_DEADLOCK_TIMEOUT: Duration = Duration::from_millis(500);

pub struct WatcherHarness {
    pub rx: mpsc::Receiver<DeadlockInfo>,
    pub detected: Arc<StdMutex<bool>>,
}

/// Harness plus the callback to hand to `Forklore::on_deadlock`
#[allow(dead_code)]
pub fn watcher() -> (WatcherHarness, impl Fn(DeadlockInfo) + Send + 'static) {
    let (tx, rx) = mpsc::channel::<DeadlockInfo>();
    let detected = Arc::new(StdMutex::new(false));
    let flag = Arc::clone(&detected);

    let callback = move |info: DeadlockInfo| {
        *flag.lock().unwrap() = true;
        let _ = tx.send(info);
    };

    (WatcherHarness { rx, detected }, callback)
}

#[allow(dead_code)]
pub fn expect_deadlock(h: &WatcherHarness, timeout: Duration) -> DeadlockInfo {
    match h.rx.recv_timeout(timeout) {
        Ok(info) => {
            assert!(*h.detected.lock().unwrap(), "Deadlock flag should be set");
            info
        }
        Err(_) => panic!("No deadlock detected within {timeout:?}"),
    }
}

#[allow(dead_code)]
pub fn assert_no_deadlock(h: &WatcherHarness, timeout: Duration) {
    assert!(
        h.rx.recv_timeout(timeout).is_err(),
        "Unexpected deadlock detected"
    );
    assert!(
        !*h.detected.lock().unwrap(),
        "Deadlock flag should not be set"
    );
}

/// Pacing quick enough to pack many rounds into a short test window
#[allow(dead_code)]
pub fn fast_tempo() -> RandomTempo {
    RandomTempo::with_config(TempoConfig {
        min_delay_ms: 1,
        max_delay_ms: 4,
        grab_probability: 0.8,
        grab_max_delay_ms: 3,
    })
}

/// One observer callback, as the tests record it
#[derive(Debug, Clone, Copy)]
#[allow(dead_code)]
pub struct ReportedEvent {
    pub fork: ForkId,
    pub owner: Option<OwnerInfo>,
    pub at: Instant,
}

/// Collects the observer stream for later assertions
#[derive(Clone)]
#[allow(dead_code)]
pub struct Recorder {
    events: Arc<StdMutex<Vec<ReportedEvent>>>,
}

#[allow(dead_code)]
impl Recorder {
    pub fn new() -> (Self, impl Fn(ForkId, Option<OwnerInfo>) + Send + Sync + 'static) {
        let recorder = Recorder {
            events: Arc::new(StdMutex::new(Vec::new())),
        };
        let sink = Arc::clone(&recorder.events);
        let observer = move |fork: ForkId, owner: Option<OwnerInfo>| {
            sink.lock().unwrap().push(ReportedEvent {
                fork,
                owner,
                at: Instant::now(),
            });
        };
        (recorder, observer)
    }

    pub fn snapshot(&self) -> Vec<ReportedEvent> {
        self.events.lock().unwrap().clone()
    }
}

/// Tempo that parks every seat at a barrier right before its second
/// fork, forcing the full circular wait in a single round
#[allow(dead_code)]
pub struct RendezvousTempo {
    barrier: Barrier,
}

#[allow(dead_code)]
impl RendezvousTempo {
    pub fn new(seats: usize) -> Self {
        RendezvousTempo {
            barrier: Barrier::new(seats),
        }
    }
}

impl Tempo for RendezvousTempo {
    fn before_fork(&self, _fork: ForkId, holding: usize) {
        // Everyone holds their first fork before anyone reaches for the second
        if holding == 1 {
            self.barrier.wait();
        }
    }

    fn hold(&self) {
        thread::sleep(Duration::from_millis(1));
    }

    fn interval(&self) {
        thread::sleep(Duration::from_millis(1));
    }
}

/// Tempo that counts `startup_jitter` calls and otherwise just keeps
/// the table moving
#[allow(dead_code)]
pub struct StaggerCounter {
    staggers: Arc<AtomicUsize>,
}

#[allow(dead_code)]
impl StaggerCounter {
    pub fn new() -> (Self, Arc<AtomicUsize>) {
        let staggers = Arc::new(AtomicUsize::new(0));
        let tempo = StaggerCounter {
            staggers: Arc::clone(&staggers),
        };
        (tempo, staggers)
    }
}

impl Tempo for StaggerCounter {
    fn startup_jitter(&self) {
        self.staggers.fetch_add(1, Ordering::SeqCst);
    }

    fn hold(&self) {
        thread::sleep(Duration::from_millis(1));
    }

    fn interval(&self) {
        thread::sleep(Duration::from_millis(1));
    }
}
