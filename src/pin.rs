use serde::{Deserialize, Serialize};

pub type PinId = u32;

/// Event flags delivered to watcher callbacks, `1 << level`.
pub const EVENT_LOW: u8 = 1;
pub const EVENT_HIGH: u8 = 2;

pub const EDGE_NONE: u8 = 0;
pub const EDGE_RISING: u8 = 1;
pub const EDGE_FALLING: u8 = 2;
pub const EDGE_BOTH: u8 = 3;

pub const SYSFS_GPIO_DIR: &str = "/sys/class/gpio";

#[derive(Debug, Hash, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Level {
    Low = 0,
    High = 1,
}

impl Level {
    pub const OFF: Level = Level::Low;
    pub const ON: Level = Level::High;

    pub fn event_flag(self) -> u8 {
        1 << self as u8
    }

    pub fn inverted(self) -> Level {
        match self {
            Level::Low => Level::High,
            Level::High => Level::Low,
        }
    }
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high { Level::High } else { Level::Low }
    }
}

/// Pin numbering of the BeagleBone robotics cape.
pub mod board {
    use super::PinId;

    // inputs
    pub const PAUSE_BTN: PinId = 69; // gpio2.5 P8.9
    pub const MODE_BTN: PinId = 68; // gpio2.4 P8.10
    pub const IMU_INTERRUPT_PIN: PinId = 117; // gpio3.21 P9.25

    // outputs
    pub const RED_LED: PinId = 66; // gpio2.2 P8.7
    pub const GRN_LED: PinId = 67; // gpio2.3 P8.8
    pub const MDIR1A: PinId = 60; // gpio1.28 P9.12
    pub const MDIR1A_BLUE: PinId = 64; // gpio2.0 T13
    pub const MDIR1B: PinId = 31; // gpio0.31 P9.13
    pub const MDIR2A: PinId = 48; // gpio1.16 P9.15
    pub const MDIR2B: PinId = 81; // gpio2.17 P8.34
    pub const MDIR2B_BLUE: PinId = 10; // gpio0.10 P8.31
    pub const MDIR4A: PinId = 70; // gpio2.6 P8.45
    pub const MDIR4B: PinId = 71; // gpio2.7 P8.46
    pub const MDIR3B: PinId = 72; // gpio2.8 P8.43
    pub const MDIR3A: PinId = 73; // gpio2.9 P8.44
    pub const MOT_STBY: PinId = 20; // gpio0.20 P9.41
    pub const DSM_PIN: PinId = 30; // gpio0.30 P9.11
    pub const SERVO_PWR: PinId = 80; // gpio2.16 P8.36

    pub const SPI1_SS1_GPIO_PIN: PinId = 113; // gpio3.17 P9.28
    pub const SPI1_SS2_GPIO_PIN: PinId = 49; // gpio1.17 P9.23

    pub const BLUE_GP0_PIN_4: PinId = 49; // gpio1.17 P9.23

    // battery indicator
    pub const BATT_LED_1: PinId = 27; // P8.17
    pub const BATT_LED_2: PinId = 65; // P8.18
    pub const BATT_LED_2_BLUE: PinId = 11;
    pub const BATT_LED_3: PinId = 61; // P8.26
    pub const BATT_LED_4: PinId = 26; // P8.14
}
