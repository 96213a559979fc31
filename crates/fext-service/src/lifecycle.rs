//! Service lifecycle: start/pause/stop state machine driven by a periodic timer
//!
//! ```text
//!             start                pause
//!   Stopped ─────────▶ Running ─────────▶ Paused
//!      ▲                │  ▲                │
//!      │   stop / max   │  └──── start ─────┘
//!      └────────────────┘                   │
//!      ▲               stop                 │
//!      └────────────────────────────────────┘
//! ```
//!
//! All state lives in one [`ServiceState`] behind a single mutex. The timer
//! task takes the same lock before looking at the run flags, and every
//! scheduled task carries the generation it was created for. Cancelling bumps
//! the generation under the lock, so a tick that was already waiting for the
//! lock sees a stale generation and does nothing. Events are emitted inside
//! the critical section, which keeps per-listener order identical to state
//! order.

use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::Utc;
use parking_lot::{Mutex, MutexGuard};
use serde_json::{Map, Value};
use tokio::sync::broadcast;
use tokio::time::{Instant, MissedTickBehavior};

use crate::config::{validate_interval, ConfigurationUpdate, ServiceConfig};
use crate::events::{ServiceEvent, ServiceStatus, RESERVED_EVENT_NAMES};
use crate::state::{RunState, ServiceState, StatusSnapshot};
use fext_core::prelude::*;
use fext_core::{EventBus, Listener, ListenerId};

struct Inner {
    state: Mutex<ServiceState>,
    bus: EventBus<ServiceEvent>,
    config: ServiceConfig,
    initialized: Mutex<bool>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.state.get_mut().cancel_timer();
    }
}

/// Handle to one periodic counting service.
///
/// Cloning yields another handle to the same service. Timer work is spawned
/// on the ambient Tokio runtime, so [`start`](Self::start) and
/// [`initialize`](Self::initialize) with `auto_start` must run inside one.
#[derive(Clone)]
pub struct ServiceLifecycle {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for ServiceLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("ServiceLifecycle")
            .field("run_state", &state.run_state())
            .field("counter", &state.counter)
            .field("interval", &state.interval)
            .field("max_count", &state.max_count)
            .field("disposed", &state.disposed)
            .field("bus", &self.inner.bus)
            .finish()
    }
}

impl ServiceLifecycle {
    /// Create a stopped service. No events are emitted until
    /// [`initialize`](Self::initialize).
    pub fn new(config: ServiceConfig) -> Result<Self> {
        config.validate()?;
        let state = ServiceState::new(&config);
        Ok(Self {
            inner: Arc::new(Inner {
                state: Mutex::new(state),
                bus: EventBus::new(),
                config,
                initialized: Mutex::new(false),
            }),
        })
    }

    /// Emit `initialized` and honor `auto_start`.
    ///
    /// Call after listeners are registered. Returns `false` if the service
    /// was already initialized.
    pub fn initialize(&self) -> Result<bool> {
        {
            let mut initialized = self.inner.initialized.lock();
            if *initialized {
                return Ok(false);
            }
            *initialized = true;
        }

        {
            let state = self.lock_active()?;
            self.emit(ServiceEvent::status_change(&state, ServiceStatus::Initialized));
        }
        info!(
            "Service initialized (interval={}s, max_count={}, auto_start={})",
            self.inner.config.interval, self.inner.config.max_count, self.inner.config.auto_start
        );

        if self.inner.config.auto_start {
            self.start(None)?;
        }
        Ok(true)
    }

    // ─────────────────────────────────────────────────────────
    // Observers
    // ─────────────────────────────────────────────────────────

    /// Register a synchronous listener.
    ///
    /// The listener runs while the service holds its state lock and must not
    /// call back into this service.
    pub fn add_listener(&self, listener: impl Listener<ServiceEvent> + 'static) -> ListenerId {
        self.inner.bus.add_listener(listener)
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.inner.bus.remove_listener(id)
    }

    /// Subscribe to events through a broadcast channel
    pub fn subscribe(&self) -> broadcast::Receiver<ServiceEvent> {
        self.inner.bus.subscribe()
    }

    // ─────────────────────────────────────────────────────────
    // Commands
    // ─────────────────────────────────────────────────────────

    /// Start, or resume from pause.
    ///
    /// `interval` defaults to the current one. Returns `false` if the
    /// service is already running.
    pub fn start(&self, interval: Option<f64>) -> Result<bool> {
        let mut state = self.lock_active()?;
        let interval = interval.unwrap_or(state.interval);
        let period = match validate_interval(interval) {
            Ok(period) => period,
            Err(e) => return Err(self.reject(&state, e)),
        };

        match state.run_state() {
            RunState::Running => {
                debug!("start ignored: service already running");
                Ok(false)
            }
            RunState::Paused => {
                state.interval = interval;
                state.is_paused = false;
                self.schedule(&mut state, period);
                info!("Service resumed at counter {}", state.counter);
                self.emit(ServiceEvent::status_change(&state, ServiceStatus::Started));
                Ok(true)
            }
            RunState::Stopped => {
                if state.counter >= state.max_count {
                    debug!(
                        "Restarting a completed run, counter {} -> 0",
                        state.counter
                    );
                    state.counter = 0;
                }
                state.interval = interval;
                state.is_running = true;
                state.is_paused = false;
                state.start_time = Some(Utc::now());
                self.schedule(&mut state, period);
                info!("Service started (interval={}s)", interval);
                self.emit(ServiceEvent::status_change(&state, ServiceStatus::Started));
                Ok(true)
            }
        }
    }

    /// Stop the service. Returns `false` if it was already stopped.
    pub fn stop(&self) -> Result<bool> {
        let mut state = self.lock_active()?;
        if state.run_state() == RunState::Stopped {
            debug!("stop ignored: service already stopped");
            return Ok(false);
        }

        state.cancel_timer();
        state.is_running = false;
        state.is_paused = false;
        info!("Service stopped at counter {}", state.counter);
        self.emit(ServiceEvent::status_change(&state, ServiceStatus::Stopped));
        state.start_time = None;
        Ok(true)
    }

    /// Pause a running service. Returns `false` if not running or already
    /// paused.
    pub fn pause(&self) -> Result<bool> {
        let mut state = self.lock_active()?;
        if state.run_state() != RunState::Running {
            debug!("pause ignored: service is {}", state.run_state());
            return Ok(false);
        }

        state.cancel_timer();
        state.is_paused = true;
        info!("Service paused at counter {}", state.counter);
        self.emit(ServiceEvent::status_change(&state, ServiceStatus::Paused));
        Ok(true)
    }

    /// Snapshot of the current state. Still answers after disposal.
    pub fn get_status(&self) -> StatusSnapshot {
        self.inner.state.lock().snapshot()
    }

    pub fn counter(&self) -> u64 {
        self.inner.state.lock().counter
    }

    pub fn run_state(&self) -> RunState {
        self.inner.state.lock().run_state()
    }

    /// Set the counter to zero in any run state
    pub fn reset_counter(&self) -> Result<bool> {
        let mut state = self.lock_active()?;
        let previous = state.counter;
        state.counter = 0;
        debug!("Counter reset from {}", previous);
        self.emit(ServiceEvent::counter_update(&state, "Counter reset"));
        Ok(true)
    }

    /// Apply a partial reconfiguration.
    ///
    /// Every present value is validated before anything is written. A new
    /// interval on a running service reschedules the timer immediately.
    /// Lowering `max_count` to or below the counter of an active service
    /// completes it. Returns `true` if any value changed.
    pub fn set_configuration(&self, update: ConfigurationUpdate) -> Result<bool> {
        let mut state = self.lock_active()?;
        if update.is_empty() {
            debug!("set_configuration: empty update");
            return Ok(false);
        }
        let validated = match update.validate() {
            Ok(validated) => validated,
            Err(e) => return Err(self.reject(&state, e)),
        };

        let mut interval_changed = false;
        let mut changed = false;

        if let Some(interval) = validated.interval {
            if interval != state.interval {
                state.interval = interval;
                interval_changed = true;
                changed = true;
            }
        }
        if let Some(max_count) = validated.max_count {
            if max_count != state.max_count {
                state.max_count = max_count;
                changed = true;
            }
        }

        if !changed {
            debug!("set_configuration: nothing changed");
            return Ok(false);
        }

        if interval_changed && state.run_state() == RunState::Running {
            let period = validate_interval(state.interval)?;
            self.schedule(&mut state, period);
            info!("Timer rescheduled at {}s", state.interval);
        }

        info!(
            "Configuration updated (interval={}s, max_count={})",
            state.interval, state.max_count
        );
        self.emit(ServiceEvent::status_change(
            &state,
            ServiceStatus::ConfigurationUpdated,
        ));

        if state.is_running && state.counter >= state.max_count {
            info!(
                "max_count {} reached by reconfiguration, completing",
                state.max_count
            );
            self.complete(&mut state);
        }

        Ok(true)
    }

    /// Emit a caller-named event carrying `data` plus status metadata
    pub fn trigger_custom_event(
        &self,
        event_name: &str,
        data: Option<Map<String, Value>>,
    ) -> Result<bool> {
        let state = self.lock_active()?;
        if event_name.trim().is_empty() {
            return Err(self.reject(
                &state,
                Error::invalid_argument("event_name must not be empty"),
            ));
        }
        if RESERVED_EVENT_NAMES.contains(&event_name) {
            return Err(self.reject(
                &state,
                Error::invalid_argument(format!("event_name '{}' is reserved", event_name)),
            ));
        }

        debug!("Custom event '{}'", event_name);
        self.emit(ServiceEvent::custom(
            &state,
            event_name,
            data.unwrap_or_default(),
        ));
        Ok(true)
    }

    /// Stop for good. Idempotent.
    pub fn dispose(&self) {
        let mut state = self.inner.state.lock();
        if state.disposed {
            debug!("dispose ignored: already disposed");
            return;
        }

        state.cancel_timer();
        state.is_running = false;
        state.is_paused = false;
        state.counter = 0;
        state.start_time = None;
        state.disposed = true;
        info!("Service disposed");
        self.emit(ServiceEvent::status_change(&state, ServiceStatus::Disposed));
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.state.lock().disposed
    }

    /// Mirror an error onto the event feed, e.g. for a command that failed
    /// to decode. Nothing is emitted after disposal.
    pub fn report_error(&self, err: &Error) {
        let state = self.inner.state.lock();
        if state.disposed {
            return;
        }
        warn!("Service error: {}", err);
        self.emit(ServiceEvent::error(&state, err));
    }

    // ─────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────

    fn lock_active(&self) -> Result<MutexGuard<'_, ServiceState>> {
        let state = self.inner.state.lock();
        if state.disposed {
            warn!("Command rejected: service disposed");
            return Err(Error::Disposed);
        }
        Ok(state)
    }

    fn emit(&self, event: ServiceEvent) {
        self.inner.bus.emit(event);
    }

    /// Emit an `error` event for a rejected command and hand the error back
    fn reject(&self, state: &ServiceState, err: Error) -> Error {
        warn!("Command rejected: {}", err);
        self.emit(ServiceEvent::error(state, &err));
        err
    }

    /// Replace any live timer with a new one at `period`.
    ///
    /// Runs under the state lock, so no tick can interleave between the
    /// cancel and the reschedule.
    fn schedule(&self, state: &mut ServiceState, period: Duration) {
        state.cancel_timer();
        let generation = state.timer_generation;
        let inner = Arc::downgrade(&self.inner);
        state.timer = Some(tokio::spawn(run_timer(inner, generation, period)));
    }

    fn complete(&self, state: &mut ServiceState) {
        state.cancel_timer();
        state.is_running = false;
        state.is_paused = false;
        info!("Service completed at counter {}", state.counter);
        self.emit(ServiceEvent::status_change(state, ServiceStatus::Completed));
        state.start_time = None;
    }

    /// Handle one timer firing. Returns `false` when the timer should exit.
    fn on_tick(&self, generation: u64) -> bool {
        let mut state = self.inner.state.lock();
        if state.timer_generation != generation
            || !state.is_running
            || state.is_paused
            || state.disposed
        {
            trace!("Stale tick ignored (generation {})", generation);
            return false;
        }

        state.counter += 1;
        let message = format!("Counter: {}", state.counter);
        self.emit(ServiceEvent::counter_update(&state, message));

        if state.counter >= state.max_count {
            self.complete(&mut state);
            return false;
        }
        true
    }
}

/// Periodic task body. The first tick fires one full period after scheduling.
async fn run_timer(inner: Weak<Inner>, generation: u64, period: Duration) {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let Some(inner) = inner.upgrade() else {
            break;
        };
        let service = ServiceLifecycle { inner };
        if !service.on_tick(generation) {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config(interval: f64, max_count: u64) -> ServiceConfig {
        ServiceConfig {
            auto_start: false,
            interval,
            max_count,
        }
    }

    /// Service plus a recorder of every emitted event
    fn recorded(config: ServiceConfig) -> (ServiceLifecycle, Arc<Mutex<Vec<ServiceEvent>>>) {
        let service = ServiceLifecycle::new(config).unwrap();
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        service.add_listener(move |e: &ServiceEvent| sink.lock().push(e.clone()));
        (service, events)
    }

    fn statuses(events: &Mutex<Vec<ServiceEvent>>) -> Vec<ServiceStatus> {
        events.lock().iter().filter_map(|e| e.status()).collect()
    }

    fn counts(events: &Mutex<Vec<ServiceEvent>>) -> Vec<u64> {
        events
            .lock()
            .iter()
            .filter_map(|e| match e {
                ServiceEvent::CounterUpdate(update) => Some(update.count),
                _ => None,
            })
            .collect()
    }

    fn assert_paused_implies_running(service: &ServiceLifecycle) {
        let status = service.get_status();
        assert!(!status.is_paused || status.is_running);
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        assert!(ServiceLifecycle::new(config(0.0, 10)).is_err());
        assert!(ServiceLifecycle::new(config(1.0, 0)).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_initialize_emits_once() {
        let (service, events) = recorded(config(1.0, 10));
        assert!(service.initialize().unwrap());
        assert!(!service.initialize().unwrap());
        assert_eq!(statuses(&events), vec![ServiceStatus::Initialized]);
        assert_eq!(service.run_state(), RunState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_initialize_auto_starts() {
        let (service, events) = recorded(ServiceConfig {
            auto_start: true,
            interval: 1.0,
            max_count: 10,
        });
        service.initialize().unwrap();
        assert_eq!(
            statuses(&events),
            vec![ServiceStatus::Initialized, ServiceStatus::Started]
        );
        assert_eq!(service.run_state(), RunState::Running);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_with_invalid_interval_leaves_state_unchanged() {
        let (service, events) = recorded(config(1.0, 10));
        let before = service.get_status();

        for bad in [0.0, -2.5] {
            let err = service.start(Some(bad)).unwrap_err();
            assert!(matches!(err, Error::InvalidArgument { .. }));
        }

        let after = service.get_status();
        assert_eq!(after.is_running, before.is_running);
        assert_eq!(after.interval, before.interval);
        assert_eq!(after.counter, before.counter);
        assert!(after.start_time.is_none());

        let events = events.lock();
        assert_eq!(events.len(), 2);
        assert!(events
            .iter()
            .all(|e| matches!(e, ServiceEvent::Error(err) if err.code == 400)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_with_huge_interval_is_rejected() {
        let (service, events) = recorded(config(1.0, 10));
        let err = service.start(Some(1e19)).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument { .. }));
        assert_eq!(service.run_state(), RunState::Stopped);
        assert!(!statuses(&events).contains(&ServiceStatus::Started));

        // the service still runs normally afterwards
        assert!(service.start(Some(0.5)).unwrap());
        tokio::time::sleep(Duration::from_millis(1200)).await;
        assert_eq!(service.counter(), 2);

        assert!(service
            .set_configuration(ConfigurationUpdate::interval(1e19))
            .is_err());
        assert_eq!(service.get_status().interval, 0.5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_with_invalid_interval_while_running_fails() {
        let (service, _events) = recorded(config(1.0, 10));
        assert!(service.start(None).unwrap());
        assert!(service.start(Some(-1.0)).is_err());
        assert_eq!(service.run_state(), RunState::Running);
        assert_eq!(service.get_status().interval, 1.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_twice_returns_false_and_keeps_progress() {
        let (service, _events) = recorded(config(1.0, 10));
        assert!(service.start(None).unwrap());
        tokio::time::sleep(Duration::from_millis(2500)).await;
        let first = service.get_status();
        assert_eq!(first.counter, 2);

        assert!(!service.start(None).unwrap());
        let second = service.get_status();
        assert_eq!(second.counter, 2);
        assert_eq!(second.start_time, first.start_time);
    }

    #[tokio::test(start_paused = true)]
    async fn test_runs_to_completion() {
        let (service, events) = recorded(config(0.01, 3));
        assert!(service.start(None).unwrap());
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(counts(&events), vec![1, 2, 3]);
        assert_eq!(
            statuses(&events),
            vec![ServiceStatus::Started, ServiceStatus::Completed]
        );

        // completed is the very last event
        assert_eq!(
            events.lock().last().and_then(|e| e.status()),
            Some(ServiceStatus::Completed)
        );

        let status = service.get_status();
        assert!(!status.is_running);
        assert_eq!(status.counter, 3);
        assert_eq!(status.progress, 1.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_after_completion_counts_from_zero() {
        let (service, events) = recorded(config(0.01, 2));
        service.start(None).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(service.counter(), 2);

        assert!(service.start(None).unwrap());
        assert_eq!(service.counter(), 0);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(counts(&events), vec![1, 2, 1, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_and_resume_keep_counter_and_start_time() {
        let (service, events) = recorded(config(1.0, 10));
        service.start(None).unwrap();
        tokio::time::sleep(Duration::from_millis(2500)).await;
        let started = service.get_status().start_time;

        assert!(service.pause().unwrap());
        assert_paused_implies_running(&service);
        assert_eq!(service.run_state(), RunState::Paused);
        assert!(!service.pause().unwrap());

        // no ticks while paused
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(service.counter(), 2);

        assert!(service.start(None).unwrap());
        let status = service.get_status();
        assert_eq!(status.counter, 2);
        assert_eq!(status.start_time, started);
        assert_eq!(status.status, RunState::Running);

        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(service.counter(), 3);
        assert_eq!(
            statuses(&events),
            vec![
                ServiceStatus::Started,
                ServiceStatus::Paused,
                ServiceStatus::Started
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_when_stopped_is_not_applicable() {
        let (service, events) = recorded(config(1.0, 10));
        assert!(!service.pause().unwrap());
        assert_paused_implies_running(&service);
        assert!(events.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_cancels_ticks() {
        let (service, events) = recorded(config(1.0, 10));
        service.start(None).unwrap();
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(service.stop().unwrap());
        assert!(!service.stop().unwrap());

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(service.counter(), 1);
        let status = service.get_status();
        assert!(!status.is_running);
        assert!(status.start_time.is_none());
        assert_eq!(status.uptime_seconds, 0.0);
        assert_eq!(
            statuses(&events),
            vec![ServiceStatus::Started, ServiceStatus::Stopped]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_from_paused() {
        let (service, _events) = recorded(config(1.0, 10));
        service.start(None).unwrap();
        service.pause().unwrap();
        assert!(service.stop().unwrap());
        let status = service.get_status();
        assert!(!status.is_running);
        assert!(!status.is_paused);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_counter_in_any_state() {
        let (service, events) = recorded(config(1.0, 10));
        assert!(service.reset_counter().unwrap());
        assert_eq!(service.counter(), 0);

        service.start(None).unwrap();
        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert!(service.reset_counter().unwrap());
        assert_eq!(service.counter(), 0);
        assert!(service.reset_counter().unwrap());
        assert_eq!(service.counter(), 0);
        assert_eq!(service.run_state(), RunState::Running);

        service.pause().unwrap();
        assert!(service.reset_counter().unwrap());
        assert_eq!(service.run_state(), RunState::Paused);

        let reset_messages = events
            .lock()
            .iter()
            .filter(|e| matches!(e, ServiceEvent::CounterUpdate(u) if u.message == "Counter reset"))
            .count();
        assert_eq!(reset_messages, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_configuration_reschedules_running_timer() {
        let (service, _events) = recorded(config(1.0, 100));
        service.start(None).unwrap();
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(service.counter(), 1);

        let changed_at = Instant::now();
        assert!(service
            .set_configuration(ConfigurationUpdate::interval(2.0))
            .unwrap());

        // the old 1s schedule would have fired at 2.0s
        tokio::time::sleep(Duration::from_millis(1900)).await;
        assert_eq!(service.counter(), 1);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(service.counter(), 2);
        assert!(changed_at.elapsed() >= Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_configuration_rejects_negative_max_count() {
        let (service, events) = recorded(config(1.0, 10));
        let err = service
            .set_configuration(ConfigurationUpdate::max_count(-1))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument { .. }));
        assert_eq!(service.get_status().max_count, 10);

        let events = events.lock();
        assert_eq!(events.len(), 1);
        assert!(matches!(
            &events[0],
            ServiceEvent::Error(e) if e.severity == fext_core::Severity::Error
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_configuration_partial_failure_writes_nothing() {
        let (service, _events) = recorded(config(1.0, 10));
        let result = service.set_configuration(ConfigurationUpdate {
            interval: Some(3.0),
            max_count: Some(0),
        });
        assert!(result.is_err());
        let status = service.get_status();
        assert_eq!(status.interval, 1.0);
        assert_eq!(status.max_count, 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_configuration_emits_only_on_change() {
        let (service, events) = recorded(config(1.0, 10));
        assert!(!service
            .set_configuration(ConfigurationUpdate::interval(1.0))
            .unwrap());
        assert!(!service
            .set_configuration(ConfigurationUpdate::default())
            .unwrap());
        assert!(events.lock().is_empty());

        assert!(service
            .set_configuration(ConfigurationUpdate::max_count(20))
            .unwrap());
        assert_eq!(
            statuses(&events),
            vec![ServiceStatus::ConfigurationUpdated]
        );
        assert_eq!(service.get_status().max_count, 20);
    }

    #[tokio::test(start_paused = true)]
    async fn test_lowering_max_count_below_counter_completes() {
        let (service, events) = recorded(config(1.0, 10));
        service.start(None).unwrap();
        tokio::time::sleep(Duration::from_millis(3500)).await;
        assert_eq!(service.counter(), 3);

        service
            .set_configuration(ConfigurationUpdate::max_count(2))
            .unwrap();
        assert_eq!(service.run_state(), RunState::Stopped);
        assert_eq!(
            statuses(&events),
            vec![
                ServiceStatus::Started,
                ServiceStatus::ConfigurationUpdated,
                ServiceStatus::Completed
            ]
        );

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(service.counter(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_lowering_max_count_while_stopped_does_not_complete() {
        let (service, events) = recorded(config(1.0, 10));
        service.start(None).unwrap();
        tokio::time::sleep(Duration::from_millis(3500)).await;
        service.stop().unwrap();

        service
            .set_configuration(ConfigurationUpdate::max_count(2))
            .unwrap();
        assert!(!statuses(&events).contains(&ServiceStatus::Completed));
    }

    #[tokio::test(start_paused = true)]
    async fn test_trigger_custom_event() {
        let (service, events) = recorded(config(1.0, 10));
        let data = json!({ "source": "button" });
        let Value::Object(data) = data else {
            unreachable!()
        };
        assert!(service.trigger_custom_event("user_action", Some(data)).unwrap());
        assert!(service.trigger_custom_event("bare", None).unwrap());

        let events = events.lock();
        assert_eq!(events.len(), 2);
        match &events[0] {
            ServiceEvent::Custom(custom) => {
                assert_eq!(custom.name, "user_action");
                assert_eq!(custom.payload["source"], "button");
                assert_eq!(custom.payload["service_status"], "stopped");
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_trigger_custom_event_rejects_empty_name() {
        let (service, events) = recorded(config(1.0, 10));
        for name in ["", "   "] {
            let err = service.trigger_custom_event(name, None).unwrap_err();
            assert!(matches!(err, Error::InvalidArgument { .. }));
        }
        assert!(events
            .lock()
            .iter()
            .all(|e| matches!(e, ServiceEvent::Error(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_configuration_update_is_a_no_op() {
        let (service, events) = recorded(config(1.0, 10));
        assert!(!service
            .set_configuration(ConfigurationUpdate::default())
            .unwrap());
        assert!(events.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_trigger_custom_event_rejects_reserved_names() {
        let (service, events) = recorded(config(1.0, 10));
        for name in ["status_change", "counter_update", "error"] {
            let err = service.trigger_custom_event(name, None).unwrap_err();
            assert!(matches!(err, Error::InvalidArgument { .. }), "{name}");
        }
        let events = events.lock();
        assert_eq!(events.len(), 3);
        assert!(events.iter().all(|e| matches!(e, ServiceEvent::Error(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispose_twice() {
        let (service, events) = recorded(config(1.0, 10));
        service.start(None).unwrap();
        tokio::time::sleep(Duration::from_millis(2500)).await;

        service.dispose();
        let status = service.get_status();
        assert_eq!(status.counter, 0);
        assert!(!status.is_running);

        service.dispose();
        let status = service.get_status();
        assert_eq!(status.counter, 0);
        assert!(!status.is_running);
        assert!(status.start_time.is_none());

        let disposed = statuses(&events)
            .into_iter()
            .filter(|s| *s == ServiceStatus::Disposed)
            .count();
        assert_eq!(disposed, 1);

        // no ticks after disposal
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(service.counter(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_commands_rejected_after_dispose() {
        let (service, events) = recorded(config(1.0, 10));
        service.dispose();
        let emitted = events.lock().len();

        assert!(matches!(service.start(None), Err(Error::Disposed)));
        assert!(matches!(service.stop(), Err(Error::Disposed)));
        assert!(matches!(service.pause(), Err(Error::Disposed)));
        assert!(matches!(service.reset_counter(), Err(Error::Disposed)));
        assert!(matches!(
            service.set_configuration(ConfigurationUpdate::interval(2.0)),
            Err(Error::Disposed)
        ));
        assert!(matches!(
            service.trigger_custom_event("x", None),
            Err(Error::Disposed)
        ));
        service.report_error(&Error::not_found("x"));

        assert_eq!(events.lock().len(), emitted);
        assert!(service.is_disposed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_events_embed_counter_and_run_state() {
        let (service, events) = recorded(config(1.0, 10));
        service.start(None).unwrap();
        tokio::time::sleep(Duration::from_millis(1500)).await;
        service.pause().unwrap();

        let events = events.lock();
        let ServiceEvent::StatusChange(paused) = events.last().unwrap() else {
            panic!("expected status change");
        };
        assert_eq!(paused.counter, 1);
        assert!(paused.is_running);
        assert!(paused.is_paused);
    }

    #[tokio::test(start_paused = true)]
    async fn test_broadcast_subscriber_sees_ticks() {
        let service = ServiceLifecycle::new(config(0.5, 2)).unwrap();
        let mut rx = service.subscribe();
        service.start(None).unwrap();

        let mut names = Vec::new();
        for _ in 0..4 {
            let event = rx.recv().await.unwrap();
            names.push(fext_core::ControlEvent::name(&event).to_string());
        }
        assert_eq!(
            names,
            vec!["status_change", "counter_update", "counter_update", "status_change"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_last_handle_stops_timer() {
        let service = ServiceLifecycle::new(config(0.1, 100)).unwrap();
        let mut rx = service.subscribe();
        service.start(None).unwrap();
        drop(service);

        // first event is `started`; the sender is gone once Inner drops
        assert!(rx.recv().await.is_ok());
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Closed)
        ));
    }
}
