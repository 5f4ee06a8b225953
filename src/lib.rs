pub mod backend;
mod config;
mod error;
mod gpio;
mod input;
mod lifecycle;
mod manager;
mod pin;
mod watcher;

pub use config::{AppConfig, EdgeDetect, InputConfig, Timing};
pub use error::GpioError;
pub use gpio::{Board, ChangeNotifier, PinReader, PinRegisters, PinWatch, Readiness};
pub use input::{Input, Output};
pub use lifecycle::{Lifecycle, LifecycleState, SharedLifecycle};
pub use manager::{EdgeEvent, EventCallbackHandler, EventHandler, InputDescriptor, InputManager};
pub use pin::{
    EDGE_BOTH, EDGE_FALLING, EDGE_NONE, EDGE_RISING, EVENT_HIGH, EVENT_LOW, Level,
    PinId, SYSFS_GPIO_DIR, board,
};
pub use watcher::{EventCallback, EventTarget, InputEvent};

#[cfg(feature = "hardware-gpio")]
pub use backend::SysfsBackend;
pub use backend::MockBackend;
