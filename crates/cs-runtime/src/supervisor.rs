use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

type DeadlineKey = (Instant, u64);

#[derive(Default)]
struct WatchState {
    next_id: u64,
    deadlines: BTreeMap<DeadlineKey, Arc<AtomicBool>>,
    shutdown: bool,
}

#[derive(Default)]
struct Watchdog {
    state: Mutex<WatchState>,
    wake: Condvar,
    fired: AtomicUsize,
}

impl Watchdog {
    fn lock(&self) -> MutexGuard<'_, WatchState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn run(&self) {
        let mut state = self.lock();
        loop {
            if state.shutdown {
                return;
            }
            let next = state.deadlines.first_key_value().map(|(key, _)| *key);
            match next {
                None => {
                    state = self.wake.wait(state).unwrap_or_else(PoisonError::into_inner);
                }
                Some((deadline, _)) => {
                    let now = Instant::now();
                    if deadline <= now {
                        if let Some((_, flag)) = state.deadlines.pop_first() {
                            flag.store(true, Ordering::SeqCst);
                            self.fired.fetch_add(1, Ordering::Relaxed);
                        }
                        continue;
                    }
                    state = self
                        .wake
                        .wait_timeout(state, deadline - now)
                        .map(|(state, _)| state)
                        .unwrap_or_else(|poisoned| poisoned.into_inner().0);
                }
            }
        }
    }
}

/// Raises an invocation's interrupt flag once its deadline passes. A single watchdog thread,
/// started on first use, serves every armed deadline.
pub struct TimeoutSupervisor {
    watchdog: Arc<Watchdog>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl Default for TimeoutSupervisor {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeoutSupervisor {
    pub fn new() -> Self {
        Self {
            watchdog: Arc::new(Watchdog::default()),
            thread: Mutex::new(None),
        }
    }

    /// Schedules `flag` to be raised after `timeout`. Dropping the guard cancels the deadline.
    /// A zero timeout arms nothing.
    pub fn arm(&self, timeout: Duration, flag: Arc<AtomicBool>) -> TimeoutGuard<'_> {
        if timeout.is_zero() || !self.ensure_started() {
            return TimeoutGuard {
                supervisor: self,
                key: None,
            };
        }

        let mut state = self.watchdog.lock();
        let id = state.next_id;
        state.next_id += 1;
        let key = (Instant::now() + timeout, id);
        state.deadlines.insert(key, flag);
        drop(state);
        self.watchdog.wake.notify_one();

        TimeoutGuard {
            supervisor: self,
            key: Some(key),
        }
    }

    /// Number of deadlines that expired before being cancelled.
    pub fn fired(&self) -> usize {
        self.watchdog.fired.load(Ordering::Relaxed)
    }

    pub fn pending(&self) -> usize {
        self.watchdog.lock().deadlines.len()
    }

    fn ensure_started(&self) -> bool {
        let mut thread = self.thread.lock().unwrap_or_else(PoisonError::into_inner);
        if thread.is_some() {
            return true;
        }
        let watchdog = Arc::clone(&self.watchdog);
        match std::thread::Builder::new()
            .name("script-watchdog".to_string())
            .spawn(move || watchdog.run())
        {
            Ok(handle) => {
                *thread = Some(handle);
                true
            }
            Err(error) => {
                tracing::error!(%error, "failed to start script watchdog; scripts run without a time limit");
                false
            }
        }
    }

    fn cancel(&self, key: DeadlineKey) {
        self.watchdog.lock().deadlines.remove(&key);
    }
}

impl Drop for TimeoutSupervisor {
    fn drop(&mut self) {
        self.watchdog.lock().shutdown = true;
        self.watchdog.wake.notify_all();
        let handle = self
            .thread
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }
}

/// Keeps a deadline armed while alive.
pub struct TimeoutGuard<'a> {
    supervisor: &'a TimeoutSupervisor,
    key: Option<DeadlineKey>,
}

impl TimeoutGuard<'_> {
    pub fn is_armed(&self) -> bool {
        self.key.is_some()
    }
}

impl Drop for TimeoutGuard<'_> {
    fn drop(&mut self) {
        if let Some(key) = self.key.take() {
            self.supervisor.cancel(key);
        }
    }
}

#[cfg(test)]
mod supervisor_tests {
    use super::*;

    fn wait_for(flag: &AtomicBool, limit: Duration) -> bool {
        let start = Instant::now();
        while start.elapsed() < limit {
            if flag.load(Ordering::SeqCst) {
                return true;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        flag.load(Ordering::SeqCst)
    }

    #[test]
    fn expired_deadline_raises_flag() {
        let supervisor = TimeoutSupervisor::new();
        let flag = Arc::new(AtomicBool::new(false));
        let guard = supervisor.arm(Duration::from_millis(10), Arc::clone(&flag));
        assert!(guard.is_armed());
        assert!(wait_for(&flag, Duration::from_secs(2)));
        assert_eq!(supervisor.fired(), 1);
        drop(guard);
        assert_eq!(supervisor.pending(), 0);
    }

    #[test]
    fn dropped_guard_cancels_deadline() {
        let supervisor = TimeoutSupervisor::new();
        let flag = Arc::new(AtomicBool::new(false));
        let guard = supervisor.arm(Duration::from_millis(30), Arc::clone(&flag));
        assert_eq!(supervisor.pending(), 1);
        drop(guard);
        assert_eq!(supervisor.pending(), 0);
        std::thread::sleep(Duration::from_millis(60));
        assert!(!flag.load(Ordering::SeqCst));
        assert_eq!(supervisor.fired(), 0);
    }

    #[test]
    fn zero_timeout_is_unarmed() {
        let supervisor = TimeoutSupervisor::new();
        let guard = supervisor.arm(Duration::ZERO, Arc::new(AtomicBool::new(false)));
        assert!(!guard.is_armed());
        assert_eq!(supervisor.pending(), 0);
    }
}
