use std::ops::ControlFlow;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use log::{debug, info, warn};

use crate::error::GpioError;
use crate::input::Input;
use crate::pin::{EVENT_HIGH, EVENT_LOW};

/// Watcher callback. Receives the event flag and returns `Break` to stop the
/// watcher. Runs on the watcher's own thread, so a slow callback delays the
/// next wait.
pub type EventCallback = Box<dyn FnMut(u8) -> ControlFlow<()> + Send>;

pub struct EventTarget {
    callback: EventCallback,
}

impl EventTarget {
    pub fn new<F>(callback: F) -> Self
    where
        F: FnMut(u8) -> ControlFlow<()> + Send + 'static,
    {
        Self {
            callback: Box::new(callback),
        }
    }

    pub fn fire(&mut self, event: u8) -> Result<ControlFlow<()>, GpioError> {
        if event != EVENT_LOW && event != EVENT_HIGH {
            return Err(GpioError::InvalidEvent(event));
        }
        Ok((self.callback)(event))
    }
}

/// Background watcher that invokes a callback for each debounced level
/// matching its event mask.
///
/// Created by [`InputEvent::new`], running after [`InputEvent::start`], and
/// stopped for good once [`InputEvent::stop`] is observed, the lifecycle
/// reads `Exiting`, the callback breaks, or a lower layer fails.
pub struct InputEvent {
    input: Input,
    mask: u8,
    debounce: u32,
    cancel: Arc<AtomicBool>,
    target: Option<EventTarget>,
    handle: Option<JoinHandle<Result<(), GpioError>>>,
}

impl InputEvent {
    pub fn new<F>(input: Input, mask: u8, callback: F) -> Self
    where
        F: FnMut(u8) -> ControlFlow<()> + Send + 'static,
    {
        Self {
            input,
            mask,
            debounce: 0,
            cancel: Arc::new(AtomicBool::new(false)),
            target: Some(EventTarget::new(callback)),
            handle: None,
        }
    }

    pub fn debounce(mut self, debounce: u32) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn input(&self) -> &Input {
        &self.input
    }

    pub fn mask(&self) -> u8 {
        self.mask
    }

    pub fn start(&mut self) -> Result<(), GpioError> {
        if self.cancel.load(Ordering::Acquire) {
            return Err(GpioError::InvalidState("watcher was stopped".into()));
        }
        let target = self
            .target
            .take()
            .ok_or_else(|| GpioError::InvalidState("watcher already started".into()))?;

        let input = self.input.clone();
        let mask = self.mask;
        let debounce = self.debounce;
        let cancel = self.cancel.clone();
        let pin = input.pin();

        let handle = thread::Builder::new()
            .name(format!("input-event-{pin}"))
            .spawn(move || {
                info!("watching pin {pin} with mask {mask:#04b}");
                let result = watch_loop(&input, mask, debounce, &cancel, target);
                match &result {
                    Ok(()) => debug!("watcher on pin {pin} stopped"),
                    Err(e) => warn!("watcher on pin {pin} failed: {e}"),
                }
                result
            })
            .map_err(|e| GpioError::InvalidState(format!("spawn watcher: {e}")))?;

        self.handle = Some(handle);
        Ok(())
    }

    /// Requests termination. A blocked wait observes it within one poll
    /// cadence; no callback runs afterwards. Calling it again is a no-op.
    pub fn stop(&self) {
        self.cancel.store(true, Ordering::Release);
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Waits for the watcher thread and returns how it ended. Returns `Ok`
    /// when the watcher was never started or was already joined.
    pub fn join(&mut self) -> Result<(), GpioError> {
        match self.handle.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| GpioError::InvalidState("watcher thread panicked".into()))?,
            None => Ok(()),
        }
    }
}

impl Drop for InputEvent {
    fn drop(&mut self) {
        self.stop();
        let _ = self.join();
    }
}

fn watch_loop(
    input: &Input,
    mask: u8,
    debounce: u32,
    cancel: &AtomicBool,
    mut target: EventTarget,
) -> Result<(), GpioError> {
    let lifecycle = input.board().lifecycle();
    let halted = || cancel.load(Ordering::Acquire) || lifecycle.is_exiting();

    while !halted() {
        let Some(level) = input.wait_stable_unless(debounce, None, &halted)? else {
            continue;
        };
        // stop may have been requested while blocked
        if halted() {
            break;
        }

        let event = level.event_flag();
        if event & mask != 0 && target.fire(event)?.is_break() {
            debug!("callback on pin {} requested stop", input.pin());
            cancel.store(true, Ordering::Release);
            break;
        }
    }

    Ok(())
}
