use std::{fs, path::Path, time::Duration};

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::GpioError;
use crate::pin::{EDGE_BOTH, EDGE_FALLING, EDGE_NONE, EDGE_RISING, EVENT_HIGH, EVENT_LOW, PinId};

const DEFAULT_POLL_TIMEOUT_MS: u64 = 100;
const DEFAULT_DEBOUNCE_INTERVAL_US: u64 = 500;
const DEFAULT_BROADCAST_CAPACITY: usize = 64;
const DEFAULT_EVENT_HISTORY_CAPACITY: usize = 32;

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum EdgeDetect {
    #[default]
    None,
    Rising,
    Falling,
    Both,
}

impl EdgeDetect {
    pub fn bits(self) -> u8 {
        match self {
            EdgeDetect::None => EDGE_NONE,
            EdgeDetect::Rising => EDGE_RISING,
            EdgeDetect::Falling => EDGE_FALLING,
            EdgeDetect::Both => EDGE_BOTH,
        }
    }

    /// Watchers match against the level a transition settles on, so a rising
    /// edge subscribes to the HIGH event flag and a falling edge to LOW.
    pub fn event_mask(self) -> u8 {
        match self {
            EdgeDetect::None => 0,
            EdgeDetect::Rising => EVENT_HIGH,
            EdgeDetect::Falling => EVENT_LOW,
            EdgeDetect::Both => EVENT_LOW | EVENT_HIGH,
        }
    }
}

/// Fixed cadences of the blocking layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// Poll slice used when a wait has no timeout; bounds shutdown latency.
    pub poll_cadence: Duration,
    /// Sleep between debounce confirming samples.
    pub debounce_interval: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            poll_cadence: Duration::from_millis(DEFAULT_POLL_TIMEOUT_MS),
            debounce_interval: Duration::from_micros(DEFAULT_DEBOUNCE_INTERVAL_US),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct InputConfig {
    pub pin: PinId,
    #[serde(default)]
    pub edge: EdgeDetect,
    #[serde(default)]
    pub debounce: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    #[serde(default = "default_gpio_root")]
    pub gpio_root: String,
    #[serde(default = "default_poll_timeout_ms")]
    pub poll_timeout_ms: u64,
    #[serde(default = "default_debounce_interval_us")]
    pub debounce_interval_us: u64,
    #[serde(default = "default_broadcast_capacity")]
    pub broadcast_capacity: usize,
    #[serde(default = "default_event_history_capacity")]
    pub event_history_capacity: usize,
    #[serde(default)]
    pub status_led: Option<PinId>,
    #[serde(default)]
    pub pause_input: Option<String>,
    pub inputs: FxHashMap<String, InputConfig>,
}

fn default_gpio_root() -> String {
    crate::pin::SYSFS_GPIO_DIR.to_string()
}

fn default_poll_timeout_ms() -> u64 {
    DEFAULT_POLL_TIMEOUT_MS
}

fn default_debounce_interval_us() -> u64 {
    DEFAULT_DEBOUNCE_INTERVAL_US
}

fn default_broadcast_capacity() -> usize {
    DEFAULT_BROADCAST_CAPACITY
}

fn default_event_history_capacity() -> usize {
    DEFAULT_EVENT_HISTORY_CAPACITY
}

impl AppConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, GpioError> {
        let contents = fs::read_to_string(&path)
            .map_err(|e| GpioError::Config(format!("Failed to read config: {e}")))?;
        Self::from_json(&contents)
    }

    pub fn from_json(contents: &str) -> Result<Self, GpioError> {
        let config: Self = serde_json::from_str(contents)
            .map_err(|e| GpioError::Config(format!("Invalid config json: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), GpioError> {
        if self.poll_timeout_ms == 0 {
            return Err(GpioError::Config("poll_timeout_ms must be positive".into()));
        }
        if self.broadcast_capacity == 0 {
            return Err(GpioError::Config(
                "broadcast_capacity must be positive".into(),
            ));
        }
        if let Some(name) = &self.pause_input
            && !self.inputs.contains_key(name)
        {
            return Err(GpioError::Config(format!(
                "pause_input refers to unknown input {name}"
            )));
        }
        Ok(())
    }

    pub fn timing(&self) -> Timing {
        Timing {
            poll_cadence: Duration::from_millis(self.poll_timeout_ms),
            debounce_interval: Duration::from_micros(self.debounce_interval_us),
        }
    }
}
