use std::thread;
use std::time::Duration;

use crate::error::GpioError;
use crate::gpio::Board;
use crate::pin::{Level, PinId};

/// A digital input with debounced level detection.
///
/// Holds no OS resources between calls; each blocking wait opens and closes
/// its own change-notification handle.
#[derive(Clone)]
pub struct Input {
    board: Board,
    pin: PinId,
}

impl Input {
    pub fn new(board: Board, pin: PinId) -> Self {
        Self { board, pin }
    }

    pub fn pin(&self) -> PinId {
        self.pin
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn level(&self) -> Result<Level, GpioError> {
        self.board.registers().read_pin(self.pin)
    }

    pub fn is_high(&self) -> Result<bool, GpioError> {
        Ok(self.level()? == Level::High)
    }

    pub fn is_low(&self) -> Result<bool, GpioError> {
        Ok(self.level()? == Level::Low)
    }

    /// Waits for a change and confirms the new level with `debounce` further
    /// samples spaced by the board's debounce interval.
    ///
    /// Returns `Ok(None)` on timeout, on exit, or when a confirming sample
    /// disagrees. Unconfirmed transitions are not retried here; callers that
    /// need a reading loop.
    pub fn wait_stable(
        &self,
        debounce: u32,
        timeout: Option<Duration>,
    ) -> Result<Option<Level>, GpioError> {
        self.wait_stable_unless(debounce, timeout, &|| false)
    }

    /// [`Self::wait_stable`] that also gives up once `halted` returns true.
    pub fn wait_stable_unless(
        &self,
        debounce: u32,
        timeout: Option<Duration>,
        halted: &dyn Fn() -> bool,
    ) -> Result<Option<Level>, GpioError> {
        let reader = self.board.reader();
        let Some(event) = reader.wait_for_change_unless(self.pin, timeout, halted)? else {
            return Ok(None);
        };

        let interval = self.board.timing().debounce_interval;
        for _ in 0..debounce {
            thread::sleep(interval);
            if self.level()? != event {
                return Ok(None);
            }
        }

        Ok(Some(event))
    }

    pub fn wait_high(
        &self,
        debounce: u32,
        timeout: Option<Duration>,
    ) -> Result<Option<bool>, GpioError> {
        Ok(self
            .wait_stable(debounce, timeout)?
            .map(|level| level == Level::High))
    }

    pub fn wait_low(
        &self,
        debounce: u32,
        timeout: Option<Duration>,
    ) -> Result<Option<bool>, GpioError> {
        Ok(self
            .wait_stable(debounce, timeout)?
            .map(|level| level == Level::Low))
    }
}

/// A digital output line, such as a status LED.
#[derive(Clone)]
pub struct Output {
    board: Board,
    pin: PinId,
}

impl Output {
    pub fn new(board: Board, pin: PinId) -> Self {
        Self { board, pin }
    }

    pub fn pin(&self) -> PinId {
        self.pin
    }

    pub fn level(&self) -> Result<Level, GpioError> {
        self.board.registers().read_pin(self.pin)
    }

    pub fn set(&self, level: Level) -> Result<(), GpioError> {
        self.board.registers().write_pin(self.pin, level)
    }

    pub fn set_high(&self) -> Result<(), GpioError> {
        self.set(Level::High)
    }

    pub fn set_low(&self) -> Result<(), GpioError> {
        self.set(Level::Low)
    }

    pub fn toggle(&self) -> Result<Level, GpioError> {
        let level = self.level()?.inverted();
        self.set(level)?;
        Ok(level)
    }
}
