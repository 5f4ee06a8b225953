#![cfg(all(feature = "hardware-gpio", target_os = "linux"))]

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use capeio::{
    Board, ChangeNotifier, GpioError, Input, Level, PinRegisters, Readiness,
    SharedLifecycle, SysfsBackend, Timing,
};

/// Fake gpio root with `gpio{pin}/value` files.
fn gpio_root(test: &str, pins: &[(u32, &str)]) -> PathBuf {
    let root = std::env::temp_dir().join(format!("capeio-{test}-{}", std::process::id()));
    let _ = fs::remove_dir_all(&root);
    for (pin, value) in pins {
        let dir = root.join(format!("gpio{pin}"));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("value"), value).unwrap();
    }
    root
}

#[test]
fn reads_and_writes_value_files() {
    let root = gpio_root("rw", &[(66, "0\n"), (69, "1\n")]);
    let backend = SysfsBackend::new(&root);

    assert_eq!(backend.read_pin(66).unwrap(), Level::Low);
    assert_eq!(backend.read_pin(69).unwrap(), Level::High);

    backend.write_pin(66, Level::High).unwrap();
    assert_eq!(fs::read_to_string(root.join("gpio66/value")).unwrap(), "1");
    assert_eq!(backend.read_pin(66).unwrap(), Level::High);

    fs::remove_dir_all(root).unwrap();
}

#[test]
fn missing_or_garbled_pins_are_io_failures() {
    let root = gpio_root("bad", &[(10, "x\n")]);
    let backend = SysfsBackend::new(&root);

    assert!(matches!(
        backend.read_pin(10),
        Err(GpioError::IoFailure { pin: 10, .. })
    ));
    assert!(matches!(
        backend.read_pin(11),
        Err(GpioError::IoFailure { pin: 11, .. })
    ));
    assert!(backend.open(11).is_err());

    fs::remove_dir_all(root).unwrap();
}

#[test]
fn value_file_without_edges_times_out() {
    let root = gpio_root("poll", &[(69, "1\n")]);
    let backend = Arc::new(SysfsBackend::new(&root));

    let mut handle = backend.open(69).unwrap();
    assert_eq!(
        handle.poll(Duration::from_millis(20)).unwrap(),
        Readiness::Timeout
    );

    // sub-millisecond timeouts still wait rather than return at once
    let started = Instant::now();
    assert_eq!(
        handle.poll(Duration::from_micros(500)).unwrap(),
        Readiness::Timeout
    );
    assert!(started.elapsed() >= Duration::from_micros(500));
    drop(handle);

    let board = Board::from_backend(
        backend,
        Arc::new(SharedLifecycle::default()),
        Timing::default(),
    );
    let input = Input::new(board, 69);
    assert!(input.is_high().unwrap());
    assert_eq!(
        input
            .wait_stable(0, Some(Duration::from_millis(20)))
            .unwrap(),
        None
    );

    fs::remove_dir_all(root).unwrap();
}
