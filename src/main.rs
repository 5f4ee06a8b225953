use log::{info, warn};
use std::sync::Arc;

use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;

use capeio::{
    AppConfig, Board, EdgeDetect, InputManager, Lifecycle, LifecycleState, Output,
    SharedLifecycle,
};

#[cfg(feature = "hardware-gpio")]
use capeio::SysfsBackend;
#[cfg(not(feature = "hardware-gpio"))]
use capeio::MockBackend;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    env_logger::init();

    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("CAPEIO_CONFIG").ok())
        .unwrap_or_else(|| "config.json".to_string());
    let config = Arc::new(
        AppConfig::load_from_file(&config_path)
            .unwrap_or_else(|e| panic!("Failed to load config: {e}")),
    );

    let backend = {
        #[cfg(feature = "hardware-gpio")]
        {
            Arc::new(SysfsBackend::new(&config.gpio_root))
        }
        #[cfg(not(feature = "hardware-gpio"))]
        {
            let backend = Arc::new(MockBackend::default());
            for input in config.inputs.values() {
                backend.add_pin(input.pin, capeio::Level::High);
            }
            if let Some(pin) = config.status_led {
                backend.add_pin(pin, capeio::Level::Low);
            }
            backend
        }
    };

    let lifecycle = Arc::new(SharedLifecycle::new(LifecycleState::Running));
    let board = Board::from_backend(backend, lifecycle.clone(), config.timing());

    let status_led = config.status_led.map(|pin| Output::new(board.clone(), pin));
    if let Some(led) = &status_led
        && let Err(e) = led.set_high()
    {
        warn!("status led: {e}");
    }

    let manager = Arc::new(InputManager::new(config.clone(), board));
    manager
        .start()
        .unwrap_or_else(|e| panic!("Failed to start input watchers: {e}"));

    info!(
        "Watching {} inputs under {}, press Ctrl-C to exit",
        config.inputs.len(),
        config.gpio_root
    );

    let mut events = BroadcastStream::new(manager.subscribe_events());
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            res = &mut shutdown => {
                res?;
                break;
            }
            event = events.next() => {
                let Some(event) = event else { break; };

                match event {
                    Ok(event) => {
                        if let Ok(text) = serde_json::to_string(&event) {
                            info!("{text}");
                        }
                        if config.pause_input.as_deref() == Some(event.input.as_str())
                            && event.edge == EdgeDetect::Falling
                        {
                            let next = match lifecycle.get_state() {
                                LifecycleState::Running => LifecycleState::Paused,
                                LifecycleState::Paused => LifecycleState::Running,
                                LifecycleState::Exiting => LifecycleState::Exiting,
                            };
                            lifecycle.set_state(next);
                            info!("state set to {next:?}");
                        }
                    }
                    Err(BroadcastStreamRecvError::Lagged(n)) => {
                        warn!("Event stream lagged by {n} messages");
                    }
                }
            }
        }
    }

    info!("Interrupted, shutting down...");
    lifecycle.set_state(LifecycleState::Exiting);
    manager.stop();

    let joiner = manager.clone();
    let outcomes = tokio::task::spawn_blocking(move || joiner.join())
        .await
        .map_err(std::io::Error::other)?;
    for (name, outcome) in outcomes {
        if let Err(e) = outcome {
            warn!("input {name} watcher ended with error: {e}");
        }
    }

    if let Some(led) = &status_led
        && let Err(e) = led.set_low()
    {
        warn!("status led: {e}");
    }

    Ok(())
}
