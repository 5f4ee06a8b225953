use std::fs::{self, File};
use std::io::{self, Read};
use std::os::fd::AsRawFd;
use std::path::PathBuf;
use std::time::Duration;

use log::warn;

use crate::error::GpioError;
use crate::gpio::{ChangeNotifier, PinRegisters, PinWatch, Readiness};
use crate::pin::{Level, PinId};

const SYSFS_POLL_EVENTS: libc::c_short = libc::POLLPRI | libc::POLLERR | libc::POLLHUP;

/// Pins exported under a sysfs gpio root, e.g. `/sys/class/gpio`.
pub struct SysfsBackend {
    root: PathBuf,
}

impl SysfsBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn value_path(&self, pin: PinId) -> PathBuf {
        self.root.join(format!("gpio{pin}")).join("value")
    }

    fn parse_level(pin: PinId, raw: &str) -> Result<Level, GpioError> {
        match raw.trim() {
            "0" => Ok(Level::Low),
            "1" => Ok(Level::High),
            other => Err(GpioError::io(pin, format!("unexpected value {other:?}"))),
        }
    }
}

impl PinRegisters for SysfsBackend {
    fn read_pin(&self, pin: PinId) -> Result<Level, GpioError> {
        let raw = fs::read_to_string(self.value_path(pin)).map_err(|e| GpioError::io(pin, e))?;
        Self::parse_level(pin, &raw)
    }

    fn write_pin(&self, pin: PinId, level: Level) -> Result<(), GpioError> {
        let raw = match level {
            Level::Low => "0",
            Level::High => "1",
        };
        fs::write(self.value_path(pin), raw).map_err(|e| GpioError::io(pin, e))
    }
}

impl ChangeNotifier for SysfsBackend {
    fn open(&self, pin: PinId) -> Result<Box<dyn PinWatch>, GpioError> {
        let mut file = File::open(self.value_path(pin)).map_err(|e| GpioError::io(pin, e))?;

        // the first read arms edge notification; its content is stale
        let mut stale = Vec::new();
        file.read_to_end(&mut stale)
            .map_err(|e| GpioError::io(pin, e))?;

        Ok(Box::new(SysfsWatch { pin, file }))
    }
}

struct SysfsWatch {
    pin: PinId,
    file: File,
}

impl PinWatch for SysfsWatch {
    fn poll(&mut self, timeout: Duration) -> Result<Readiness, GpioError> {
        let mut fds = [libc::pollfd {
            fd: self.file.as_raw_fd(),
            events: SYSFS_POLL_EVENTS,
            revents: 0,
        }];
        let timeout_ms = poll_timeout_ms(timeout);

        let rc = unsafe { libc::poll(fds.as_mut_ptr(), fds.len() as libc::nfds_t, timeout_ms) };
        if rc < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                warn!("poll on pin {} interrupted", self.pin);
                return Ok(Readiness::Timeout);
            }
            return Err(GpioError::io(self.pin, err));
        }
        if rc == 0 {
            return Ok(Readiness::Timeout);
        }

        let revents = fds[0].revents;
        if revents & (libc::POLLIN | libc::POLLPRI) != 0 {
            Ok(Readiness::Ready)
        } else if revents & (libc::POLLHUP | libc::POLLERR | libc::POLLNVAL) != 0 {
            Ok(Readiness::HangUp)
        } else {
            Ok(Readiness::Timeout)
        }
    }
}

/// Whole milliseconds for `poll`, rounded up so a sub-millisecond timeout
/// still waits.
fn poll_timeout_ms(timeout: Duration) -> libc::c_int {
    timeout
        .as_nanos()
        .div_ceil(1_000_000)
        .min(libc::c_int::MAX as u128) as libc::c_int
}
