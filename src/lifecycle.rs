use std::sync::atomic::{AtomicU8, Ordering};

use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum LifecycleState {
    Running = 0,
    Paused = 1,
    Exiting = 2,
}

impl LifecycleState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => LifecycleState::Running,
            1 => LifecycleState::Paused,
            _ => LifecycleState::Exiting,
        }
    }
}

/// Read side of the process-wide run state. Blocking loops poll this once per
/// wake-up and stop once it reads `Exiting`.
pub trait Lifecycle: Send + Sync {
    fn get_state(&self) -> LifecycleState;

    fn is_exiting(&self) -> bool {
        self.get_state() == LifecycleState::Exiting
    }
}

pub struct SharedLifecycle {
    state: AtomicU8,
}

impl SharedLifecycle {
    pub fn new(state: LifecycleState) -> Self {
        Self {
            state: AtomicU8::new(state as u8),
        }
    }

    pub fn set_state(&self, state: LifecycleState) {
        self.state.store(state as u8, Ordering::Release);
    }
}

impl Default for SharedLifecycle {
    fn default() -> Self {
        Self::new(LifecycleState::Running)
    }
}

impl Lifecycle for SharedLifecycle {
    fn get_state(&self) -> LifecycleState {
        LifecycleState::from_u8(self.state.load(Ordering::Acquire))
    }
}
