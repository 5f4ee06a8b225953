use std::sync::Arc;
use std::time::Duration;

use log::debug;

use crate::config::Timing;
use crate::error::GpioError;
use crate::lifecycle::Lifecycle;
use crate::pin::{Level, PinId};

/// Synchronous access to pin values. Direction is configured elsewhere.
pub trait PinRegisters: Send + Sync {
    fn read_pin(&self, pin: PinId) -> Result<Level, GpioError>;
    fn write_pin(&self, pin: PinId, level: Level) -> Result<(), GpioError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Timeout,
    /// Input-ready or priority-ready; the pin value changed.
    Ready,
    /// Hangup or error reported on the handle.
    HangUp,
}

/// One open change-notification handle. Closed on drop.
pub trait PinWatch: Send {
    fn poll(&mut self, timeout: Duration) -> Result<Readiness, GpioError>;
}

pub trait ChangeNotifier: Send + Sync {
    /// Opens a handle with any pending notification already consumed.
    fn open(&self, pin: PinId) -> Result<Box<dyn PinWatch>, GpioError>;
}

/// The capabilities every blocking operation needs, bundled for cloning into
/// watcher threads.
#[derive(Clone)]
pub struct Board {
    registers: Arc<dyn PinRegisters>,
    notifier: Arc<dyn ChangeNotifier>,
    lifecycle: Arc<dyn Lifecycle>,
    timing: Timing,
}

impl Board {
    pub fn new(
        registers: Arc<dyn PinRegisters>,
        notifier: Arc<dyn ChangeNotifier>,
        lifecycle: Arc<dyn Lifecycle>,
        timing: Timing,
    ) -> Self {
        Self {
            registers,
            notifier,
            lifecycle,
            timing,
        }
    }

    /// Single backend serving both register reads and change notification.
    pub fn from_backend<B>(backend: Arc<B>, lifecycle: Arc<dyn Lifecycle>, timing: Timing) -> Self
    where
        B: PinRegisters + ChangeNotifier + 'static,
    {
        Self::new(backend.clone(), backend, lifecycle, timing)
    }

    pub fn registers(&self) -> &dyn PinRegisters {
        self.registers.as_ref()
    }

    pub fn lifecycle(&self) -> &dyn Lifecycle {
        self.lifecycle.as_ref()
    }

    pub fn timing(&self) -> Timing {
        self.timing
    }

    pub fn reader(&self) -> PinReader<'_> {
        PinReader { board: self }
    }
}

/// Blocking wait for a single pin value change.
pub struct PinReader<'a> {
    board: &'a Board,
}

impl PinReader<'_> {
    /// Blocks until the pin reports a change and returns its new level.
    ///
    /// With `timeout` set, returns `Ok(None)` if nothing arrives within it.
    /// Without one, polls at the board's cadence and only returns `Ok(None)`
    /// once the lifecycle reads `Exiting`.
    pub fn wait_for_change(
        &self,
        pin: PinId,
        timeout: Option<Duration>,
    ) -> Result<Option<Level>, GpioError> {
        self.wait_for_change_unless(pin, timeout, &|| false)
    }

    /// Same as [`Self::wait_for_change`], additionally giving up with
    /// `Ok(None)` once `halted` returns true. `halted` is checked at every
    /// wake-up, so it is observed within one poll cadence.
    pub fn wait_for_change_unless(
        &self,
        pin: PinId,
        timeout: Option<Duration>,
        halted: &dyn Fn() -> bool,
    ) -> Result<Option<Level>, GpioError> {
        let board = self.board;
        let mut handle = board.notifier.open(pin)?;

        while !board.lifecycle.is_exiting() && !halted() {
            let readiness = match timeout {
                Some(t) => match handle.poll(t)? {
                    Readiness::Timeout => return Ok(None),
                    r => r,
                },
                None => handle.poll(board.timing.poll_cadence)?,
            };

            match readiness {
                Readiness::Timeout => continue,
                Readiness::Ready => return board.registers.read_pin(pin).map(Some),
                Readiness::HangUp => {
                    return Err(GpioError::io(pin, "hangup or error on value handle"));
                }
            }
        }

        debug!("wait on pin {pin} abandoned");
        Ok(None)
    }
}
