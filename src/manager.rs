use std::collections::{HashMap, VecDeque};
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use log::info;
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use serde::Serialize;
use tokio::sync::broadcast;

use crate::config::{AppConfig, EdgeDetect, InputConfig};
use crate::error::GpioError;
use crate::gpio::Board;
use crate::input::Input;
use crate::pin::{Level, PinId};
use crate::watcher::InputEvent;

#[derive(Debug, Clone, Serialize)]
pub struct EdgeEvent {
    pub input: String,
    pub pin: PinId,
    pub edge: EdgeDetect,
    pub level: Level,
    pub timestamp_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct InputDescriptor {
    pub info: InputConfig,
    pub level: Option<Level>,
}

/// Fans accepted transitions out to subscribers and keeps a bounded history
/// per input.
pub struct EventCallbackHandler {
    event_tx: broadcast::Sender<EdgeEvent>,
    event_history: FxHashMap<String, RwLock<VecDeque<EdgeEvent>>>,
    event_history_capacity: usize,
}

impl EventCallbackHandler {
    pub fn new(
        event_tx: broadcast::Sender<EdgeEvent>,
        event_history: FxHashMap<String, RwLock<VecDeque<EdgeEvent>>>,
        event_history_capacity: usize,
    ) -> Self {
        Self {
            event_tx,
            event_history,
            event_history_capacity,
        }
    }

    pub fn dispatch(&self, event: EdgeEvent) {
        if let Some(history_lock) = self.event_history.get(&event.input)
            && self.event_history_capacity > 0
        {
            let mut history = history_lock.write();
            while history.len() >= self.event_history_capacity {
                history.pop_front();
            }
            history.push_back(event.clone());
        }
        // no subscribers is fine
        let _ = self.event_tx.send(event);
    }
}

pub type EventHandler = Arc<EventCallbackHandler>;

pub struct InputManager {
    config: Arc<AppConfig>,
    inputs: FxHashMap<String, Input>,
    watchers: Mutex<FxHashMap<String, InputEvent>>,
    event_handler: EventHandler,
}

impl InputManager {
    pub fn new(config: Arc<AppConfig>, board: Board) -> Self {
        let (event_tx, _) = broadcast::channel(config.broadcast_capacity);

        let mut history = FxHashMap::default();
        let mut inputs = FxHashMap::default();
        for (name, cfg) in &config.inputs {
            history.insert(name.clone(), RwLock::new(VecDeque::new()));
            inputs.insert(name.clone(), Input::new(board.clone(), cfg.pin));
        }

        let event_handler = Arc::new(EventCallbackHandler::new(
            event_tx,
            history,
            config.event_history_capacity,
        ));

        Self {
            config,
            inputs,
            watchers: Mutex::new(FxHashMap::default()),
            event_handler,
        }
    }

    fn input_config(&self, name: &str) -> Result<&InputConfig, GpioError> {
        self.config
            .inputs
            .get(name)
            .ok_or_else(|| GpioError::NotFoundInput(name.to_string()))
    }

    pub fn input(&self, name: &str) -> Result<&Input, GpioError> {
        self.inputs
            .get(name)
            .ok_or_else(|| GpioError::NotFoundInput(name.to_string()))
    }

    /// Starts one watcher for every input with edge detection enabled.
    pub fn start(&self) -> Result<(), GpioError> {
        let mut watchers = self.watchers.lock();
        if !watchers.is_empty() {
            return Err(GpioError::InvalidState("inputs already watched".into()));
        }

        for (name, cfg) in &self.config.inputs {
            if cfg.edge == EdgeDetect::None {
                continue;
            }
            let input = self.input(name)?.clone();
            let handler = self.event_handler.clone();
            let input_name = name.clone();
            let pin = cfg.pin;

            let mut watcher = InputEvent::new(input, cfg.edge.event_mask(), move |flag| {
                let level = if flag == Level::High.event_flag() {
                    Level::High
                } else {
                    Level::Low
                };
                handler.dispatch(EdgeEvent {
                    input: input_name.clone(),
                    pin,
                    edge: match level {
                        Level::High => EdgeDetect::Rising,
                        Level::Low => EdgeDetect::Falling,
                    },
                    level,
                    timestamp_ms: epoch_millis(),
                });
                ControlFlow::Continue(())
            })
            .debounce(cfg.debounce);

            watcher.start()?;
            info!("input {name} on pin {pin} watching {:?} edges", cfg.edge);
            watchers.insert(name.clone(), watcher);
        }

        Ok(())
    }

    pub fn stop(&self) {
        for watcher in self.watchers.lock().values() {
            watcher.stop();
        }
    }

    /// Joins every watcher, returning how each ended, ordered by input name.
    pub fn join(&self) -> Vec<(String, Result<(), GpioError>)> {
        let drained: Vec<(String, InputEvent)> = self.watchers.lock().drain().collect();
        let mut outcomes: Vec<_> = drained
            .into_iter()
            .map(|(name, mut watcher)| {
                let result = watcher.join();
                (name, result)
            })
            .collect();
        outcomes.sort_by(|a, b| a.0.cmp(&b.0));
        outcomes
    }

    pub fn is_watching(&self, name: &str) -> bool {
        self.watchers
            .lock()
            .get(name)
            .is_some_and(|w| w.is_running())
    }

    pub fn list_inputs(&self) -> HashMap<String, InputDescriptor> {
        self.config
            .inputs
            .iter()
            .map(|(name, cfg)| {
                let level = self.inputs.get(name).and_then(|i| i.level().ok());
                (
                    name.clone(),
                    InputDescriptor {
                        info: cfg.clone(),
                        level,
                    },
                )
            })
            .collect()
    }

    pub fn read_level(&self, name: &str) -> Result<Level, GpioError> {
        self.input(name)?.level()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<EdgeEvent> {
        self.event_handler.event_tx.subscribe()
    }

    pub fn get_events(&self, name: &str, limit: Option<usize>) -> Result<Vec<EdgeEvent>, GpioError> {
        self.input_config(name)?;
        let map = &self.event_handler.event_history;

        Ok(map
            .get(name)
            .map(|d| {
                let events: Vec<EdgeEvent> = if let Some(lim) = limit {
                    d.read().iter().rev().take(lim).cloned().collect()
                } else {
                    d.read().iter().rev().cloned().collect()
                };
                events.into_iter().rev().collect()
            })
            .unwrap_or_default())
    }

    pub fn get_last_event(&self, name: &str) -> Result<Option<EdgeEvent>, GpioError> {
        self.input_config(name)?;
        let map = &self.event_handler.event_history;

        Ok(map.get(name).and_then(|d| d.read().back().cloned()))
    }
}

fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
