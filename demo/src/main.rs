use anyhow::Context;
use mousepoll_core::{MouseState, PollerConfig};
use std::io::BufRead;
use tracing::info;

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "mousepoll=info,mousepoll_core=info,mousepoll_platform=info".into()
            }),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

fn on_mouse_input(state: &MouseState) {
    println!(
        "x: {}, y: {}, wheel: {}, left_button: {}, right_button: {}, middle_button: {}, xbutton_1: {}, xbutton_2: {}",
        state.delta_x,
        state.delta_y,
        state.delta_wheel,
        u8::from(state.button1),
        u8::from(state.button2),
        u8::from(state.button3),
        u8::from(state.button4),
        u8::from(state.button5),
    );
}

fn main() -> anyhow::Result<()> {
    init_logging();

    let config = match std::env::args().nth(1) {
        Some(path) => PollerConfig::load(&path)
            .with_context(|| format!("failed to load config from {path}"))?,
        None => PollerConfig::default(),
    };

    let mut poller = mousepoll_platform::create_poller_with_config(config, on_mouse_input);
    poller
        .start_confirmed()
        .context("failed to start raw mouse capture")?;
    info!(poller = %poller.id(), "Raw mouse capture running");
    println!("[+] Running...");

    // Press enter to exit
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;

    let stopped = poller.stop();
    info!(poller = %poller.id(), stopped, "Raw mouse capture stopped");
    println!("[-] Stopped.");
    Ok(())
}
