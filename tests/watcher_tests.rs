use std::ops::ControlFlow;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::{Duration, Instant};

use capeio::{
    Board, EVENT_HIGH, EVENT_LOW, EdgeDetect, EventTarget, GpioError, Input, InputEvent, Level,
    LifecycleState, MockBackend, SharedLifecycle, Timing,
};

const BUTTON: u32 = 68;

fn setup(debounce_interval: Duration) -> (Arc<MockBackend>, Arc<SharedLifecycle>, Input) {
    let backend = Arc::new(MockBackend::new());
    backend.add_pin(BUTTON, Level::Low);
    let lifecycle = Arc::new(SharedLifecycle::default());
    let timing = Timing {
        poll_cadence: Duration::from_millis(20),
        debounce_interval,
    };
    let board = Board::from_backend(backend.clone(), lifecycle.clone(), timing);
    (backend, lifecycle, Input::new(board, BUTTON))
}

fn recording_watcher(input: Input, mask: u8, debounce: u32) -> (InputEvent, Receiver<u8>) {
    let (tx, rx) = mpsc::channel();
    let watcher = InputEvent::new(input, mask, move |event| {
        let _ = tx.send(event);
        ControlFlow::Continue(())
    })
    .debounce(debounce);
    (watcher, rx)
}

fn wait_open(backend: &MockBackend) {
    assert!(backend.wait_for_handle(BUTTON, Duration::from_secs(2)));
}

#[test]
fn held_rising_edge_fires_once() {
    let (backend, _, input) = setup(Duration::from_millis(1));
    let (mut watcher, events) = recording_watcher(input, EdgeDetect::Rising.event_mask(), 2);
    watcher.start().unwrap();

    wait_open(&backend);
    backend.set_level(BUTTON, Level::High);

    assert_eq!(events.recv_timeout(Duration::from_secs(2)), Ok(EVENT_HIGH));
    assert!(events.recv_timeout(Duration::from_millis(200)).is_err());

    watcher.stop();
    watcher.join().unwrap();
}

#[test]
fn glitch_shorter_than_debounce_fires_nothing() {
    let (backend, _, input) = setup(Duration::from_millis(50));
    let (mut watcher, events) = recording_watcher(input, EdgeDetect::Rising.event_mask(), 2);
    watcher.start().unwrap();

    wait_open(&backend);
    backend.set_level(BUTTON, Level::High);
    thread::sleep(Duration::from_millis(5));
    backend.set_level(BUTTON, Level::Low);

    assert!(events.recv_timeout(Duration::from_millis(300)).is_err());

    watcher.stop();
    watcher.join().unwrap();
}

#[test]
fn both_edges_deliver_both_flags() {
    let (backend, _, input) = setup(Duration::from_millis(1));
    let (mut watcher, events) = recording_watcher(input, EdgeDetect::Both.event_mask(), 1);
    watcher.start().unwrap();

    wait_open(&backend);
    backend.set_level(BUTTON, Level::High);
    assert_eq!(events.recv_timeout(Duration::from_secs(2)), Ok(EVENT_HIGH));

    wait_open(&backend);
    backend.set_level(BUTTON, Level::Low);
    assert_eq!(events.recv_timeout(Duration::from_secs(2)), Ok(EVENT_LOW));
}

#[test]
fn falling_mask_ignores_rising() {
    let (backend, _, input) = setup(Duration::from_millis(1));
    let (mut watcher, events) = recording_watcher(input, EdgeDetect::Falling.event_mask(), 0);
    watcher.start().unwrap();

    wait_open(&backend);
    backend.set_level(BUTTON, Level::High);
    assert!(events.recv_timeout(Duration::from_millis(150)).is_err());

    wait_open(&backend);
    backend.set_level(BUTTON, Level::Low);
    assert_eq!(events.recv_timeout(Duration::from_secs(2)), Ok(EVENT_LOW));
}

#[test]
fn stop_is_idempotent() {
    let (backend, _, input) = setup(Duration::from_millis(1));
    let (mut watcher, _events) = recording_watcher(input, EVENT_HIGH, 0);
    watcher.start().unwrap();
    wait_open(&backend);
    assert!(watcher.is_running());

    watcher.stop();
    watcher.stop();
    watcher.join().unwrap();
    watcher.stop();
    watcher.join().unwrap();

    assert!(!watcher.is_running());
}

#[test]
fn stop_on_idle_pin_ends_within_poll_cadence() {
    let (backend, _, input) = setup(Duration::from_millis(1));
    let (mut watcher, events) = recording_watcher(input, EdgeDetect::Both.event_mask(), 0);
    watcher.start().unwrap();
    wait_open(&backend);

    let stopped_at = Instant::now();
    watcher.stop();
    let (done_tx, done_rx) = mpsc::channel();
    let joiner = thread::spawn(move || {
        let result = watcher.join();
        let _ = done_tx.send(());
        result
    });

    // 20 ms cadence; allow generous scheduling slack
    assert!(done_rx.recv_timeout(Duration::from_secs(2)).is_ok());
    assert!(stopped_at.elapsed() < Duration::from_secs(2));
    joiner.join().unwrap().unwrap();
    assert_eq!(backend.open_handles(BUTTON), 0);
    assert!(events.try_recv().is_err());
}

#[test]
fn no_callback_after_stop() {
    let (backend, _, input) = setup(Duration::from_millis(1));
    let (mut watcher, events) = recording_watcher(input, EVENT_HIGH, 0);
    watcher.start().unwrap();

    wait_open(&backend);
    watcher.stop();
    backend.set_level(BUTTON, Level::High);

    assert!(events.recv_timeout(Duration::from_millis(200)).is_err());
    watcher.join().unwrap();
}

#[test]
fn start_only_from_created() {
    let (_, _, input) = setup(Duration::from_millis(1));
    let (mut watcher, _events) = recording_watcher(input.clone(), EVENT_HIGH, 0);
    watcher.start().unwrap();
    assert!(matches!(watcher.start(), Err(GpioError::InvalidState(_))));
    watcher.stop();
    watcher.join().unwrap();

    let (mut stopped, _events) = recording_watcher(input, EVENT_HIGH, 0);
    stopped.stop();
    assert!(matches!(stopped.start(), Err(GpioError::InvalidState(_))));
}

#[test]
fn exiting_ends_watcher_within_poll_cadence() {
    let (backend, lifecycle, input) = setup(Duration::from_millis(1));
    let (mut watcher, events) = recording_watcher(input, EdgeDetect::Both.event_mask(), 0);
    watcher.start().unwrap();
    wait_open(&backend);

    let exited_at = Instant::now();
    lifecycle.set_state(LifecycleState::Exiting);
    watcher.join().unwrap();

    assert!(exited_at.elapsed() < Duration::from_secs(1));
    backend.set_level(BUTTON, Level::High);
    assert!(events.recv_timeout(Duration::from_millis(100)).is_err());
    assert_eq!(backend.open_handles(BUTTON), 0);
}

#[test]
fn io_failure_terminates_watcher() {
    let (backend, _, input) = setup(Duration::from_millis(1));
    let (mut watcher, events) = recording_watcher(input, EdgeDetect::Both.event_mask(), 0);
    watcher.start().unwrap();

    wait_open(&backend);
    backend.hang_up(BUTTON);

    assert!(matches!(
        watcher.join(),
        Err(GpioError::IoFailure { pin: BUTTON, .. })
    ));
    assert!(events.try_recv().is_err());
}

#[test]
fn callback_break_stops_watcher() {
    let (backend, _, input) = setup(Duration::from_millis(1));
    let (tx, events) = mpsc::channel();
    let mut watcher = InputEvent::new(input, EdgeDetect::Both.event_mask(), move |event| {
        let _ = tx.send(event);
        ControlFlow::Break(())
    });
    watcher.start().unwrap();

    wait_open(&backend);
    backend.set_level(BUTTON, Level::High);

    assert_eq!(events.recv_timeout(Duration::from_secs(2)), Ok(EVENT_HIGH));
    watcher.join().unwrap();
    assert!(!watcher.is_running());
}

#[test]
fn dropping_running_watcher_joins_it() {
    let (backend, _, input) = setup(Duration::from_millis(1));
    let (mut watcher, _events) = recording_watcher(input, EVENT_HIGH, 0);
    watcher.start().unwrap();
    wait_open(&backend);

    drop(watcher);
    assert_eq!(backend.open_handles(BUTTON), 0);
}

#[test]
fn event_target_rejects_unknown_flags() {
    let mut seen = Vec::new();
    let (tx, rx) = mpsc::channel();
    let mut target = EventTarget::new(move |event| {
        let _ = tx.send(event);
        ControlFlow::Continue(())
    });

    assert!(matches!(target.fire(0), Err(GpioError::InvalidEvent(0))));
    assert!(matches!(target.fire(3), Err(GpioError::InvalidEvent(3))));
    assert!(target.fire(EVENT_LOW).unwrap().is_continue());
    assert!(target.fire(EVENT_HIGH).unwrap().is_continue());

    seen.extend(rx.try_iter());
    assert_eq!(seen, vec![EVENT_LOW, EVENT_HIGH]);
}
