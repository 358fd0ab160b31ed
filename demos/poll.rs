//! Console poller: prints connect/disconnect events and a JSON snapshot once a second.
//!
//! A console process has no active window to hook, so the demo asks for a rescan
//! every few seconds through the device-change notifier instead.
//!
//! `RUST_LOG=debug cargo run --example poll [config.toml]`

#[cfg(all(feature = "native", windows))]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    use padbridge::{GamepadConfig, Manager};
    use std::time::{Duration, Instant};

    env_logger::init();

    let config = match std::env::args().nth(1) {
        Some(path) => GamepadConfig::load(path)?,
        None => GamepadConfig::default(),
    };

    let mut manager = Manager::discover(config)?;
    let rescan = manager.native().notifier();
    let mut last_print = Instant::now();
    let mut last_rescan = Instant::now();

    loop {
        if let Err(e) = manager.update() {
            eprintln!("update: {e}");
            manager.native_mut().clear_error();
        }

        for ev in manager.drain_events() {
            println!("{ev:?}");
        }

        if last_print.elapsed() >= Duration::from_secs(1) {
            println!("{}", serde_json::to_string(&manager.snapshot())?);
            last_print = Instant::now();
        }
        if last_rescan.elapsed() >= Duration::from_secs(3) {
            rescan.notify();
            last_rescan = Instant::now();
        }

        std::thread::sleep(Duration::from_millis(5));
    }
}

#[cfg(not(all(feature = "native", windows)))]
fn main() {
    eprintln!("the poll demo needs Windows and the `native` feature");
}
