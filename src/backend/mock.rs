use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, MutexGuard};
use rustc_hash::FxHashMap;

use crate::error::GpioError;
use crate::gpio::{ChangeNotifier, PinRegisters, PinWatch, Readiness};
use crate::pin::{Level, PinId};

/// In-memory pins with change notification, for tests and the
/// `mock-gpio` build.
#[derive(Default)]
pub struct MockBackend {
    shared: Arc<Shared>,
}

#[derive(Default)]
struct Shared {
    pins: Mutex<FxHashMap<PinId, MockPinState>>,
    changed: Condvar,
}

impl Shared {
    /// Waits for a change notification; returns true once `deadline` passed.
    /// A deadline too far out to represent waits without one.
    fn wait_until(
        &self,
        pins: &mut MutexGuard<'_, FxHashMap<PinId, MockPinState>>,
        deadline: Option<Instant>,
    ) -> bool {
        match deadline {
            Some(deadline) => self.changed.wait_until(pins, deadline).timed_out(),
            None => {
                self.changed.wait(pins);
                false
            }
        }
    }
}

struct MockPinState {
    value: Level,
    generation: u64, // bumped on every level change
    hung_up: bool,
    open_handles: usize,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_pin(&self, pin: PinId, level: Level) {
        self.shared.pins.lock().insert(
            pin,
            MockPinState {
                value: level,
                generation: 0,
                hung_up: false,
                open_handles: 0,
            },
        );
    }

    /// Drives the physical level of `pin`, waking any open handles.
    pub fn set_level(&self, pin: PinId, level: Level) {
        let mut pins = self.shared.pins.lock();
        if let Some(state) = pins.get_mut(&pin)
            && state.value != level
        {
            state.value = level;
            state.generation += 1;
            self.shared.changed.notify_all();
        }
    }

    /// Makes every current and future handle on `pin` report a hangup.
    pub fn hang_up(&self, pin: PinId) {
        if let Some(state) = self.shared.pins.lock().get_mut(&pin) {
            state.hung_up = true;
            self.shared.changed.notify_all();
        }
    }

    pub fn open_handles(&self, pin: PinId) -> usize {
        self.shared
            .pins
            .lock()
            .get(&pin)
            .map(|s| s.open_handles)
            .unwrap_or(0)
    }

    /// Blocks until at least one handle on `pin` is open or `timeout` passes.
    pub fn wait_for_handle(&self, pin: PinId, timeout: Duration) -> bool {
        let deadline = Instant::now().checked_add(timeout);
        let mut pins = self.shared.pins.lock();
        loop {
            if pins.get(&pin).is_some_and(|s| s.open_handles > 0) {
                return true;
            }
            if self.shared.wait_until(&mut pins, deadline) {
                return pins.get(&pin).is_some_and(|s| s.open_handles > 0);
            }
        }
    }
}

impl PinRegisters for MockBackend {
    fn read_pin(&self, pin: PinId) -> Result<Level, GpioError> {
        self.shared
            .pins
            .lock()
            .get(&pin)
            .map(|s| s.value)
            .ok_or_else(|| GpioError::io(pin, "no such pin"))
    }

    fn write_pin(&self, pin: PinId, level: Level) -> Result<(), GpioError> {
        if !self.shared.pins.lock().contains_key(&pin) {
            return Err(GpioError::io(pin, "no such pin"));
        }
        self.set_level(pin, level);
        Ok(())
    }
}

impl ChangeNotifier for MockBackend {
    fn open(&self, pin: PinId) -> Result<Box<dyn PinWatch>, GpioError> {
        let mut pins = self.shared.pins.lock();
        let state = pins
            .get_mut(&pin)
            .ok_or_else(|| GpioError::io(pin, "no such pin"))?;
        state.open_handles += 1;
        let seen = state.generation;
        self.shared.changed.notify_all();

        Ok(Box::new(MockWatch {
            pin,
            seen,
            shared: self.shared.clone(),
        }))
    }
}

struct MockWatch {
    pin: PinId,
    seen: u64,
    shared: Arc<Shared>,
}

impl PinWatch for MockWatch {
    fn poll(&mut self, timeout: Duration) -> Result<Readiness, GpioError> {
        let deadline = Instant::now().checked_add(timeout);
        let mut pins = self.shared.pins.lock();
        let mut timed_out = false;
        loop {
            let state = pins
                .get(&self.pin)
                .ok_or_else(|| GpioError::io(self.pin, "pin removed"))?;
            if state.generation != self.seen {
                self.seen = state.generation;
                return Ok(Readiness::Ready);
            }
            if state.hung_up {
                return Ok(Readiness::HangUp);
            }
            if timed_out {
                return Ok(Readiness::Timeout);
            }
            timed_out = self.shared.wait_until(&mut pins, deadline);
        }
    }
}

impl Drop for MockWatch {
    fn drop(&mut self) {
        if let Some(state) = self.shared.pins.lock().get_mut(&self.pin) {
            state.open_handles = state.open_handles.saturating_sub(1);
        }
    }
}
