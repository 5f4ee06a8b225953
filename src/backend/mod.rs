pub mod mock;
#[cfg(feature = "hardware-gpio")]
pub mod sysfs;

pub use mock::MockBackend;
#[cfg(feature = "hardware-gpio")]
pub use sysfs::SysfsBackend;
