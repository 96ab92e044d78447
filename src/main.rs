use color_eyre::{eyre::eyre, Result};
use joyscope::config::Config;
use joyscope::joystick::{JoystickHandle, JoystickSnapshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    let config = Config::load()?;
    setup_logging_env(config.logging.level()?);
    info!("Starting joyscope with config: {:?}", config);

    let cancel = CancellationToken::new();
    let handle = JoystickHandle::spawn(
        Some(config.joystick.clone()),
        &config.dump.directory,
        cancel.clone(),
    )
    .await
    .map_err(|e| eyre!("Failed to start joystick pipeline: {}", e))?;
    info!(
        "Watching {} joystick(s), dump at {}",
        handle.roster().len(),
        handle.dump_path().display()
    );

    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received, shutting down");
        }
        shutdown.cancel();
    });

    let mut snapshots = handle.subscribe();
    display(&snapshots.borrow_and_update());
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            changed = snapshots.changed() => {
                if changed.is_err() {
                    warn!("Joystick normalizer stopped");
                    break;
                }
                let snapshot = snapshots.borrow_and_update().clone();
                display(&snapshot);
            }
        }
    }

    handle.shutdown().await;
    Ok(())
}

fn display(snapshot: &JoystickSnapshot) {
    if snapshot.is_empty() {
        warn!("No joysticks connected");
    }
    for (id, state) in snapshot.iter() {
        info!("Gamepad {}: {}", id, state.summary());
        info!("Gamepad {} channels, index: name (logical id, raw id): value", id);
        for row in state.channel_rows() {
            info!("  {}", row);
        }
        let (left, right) = (state.left_stick(), state.right_stick());
        debug!(
            "Gamepad {} sticks: left {:.2}@{:.2}rad right {:.2}@{:.2}rad",
            id, left.magnitude, left.angle, right.magnitude, right.angle
        );
    }
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    Ok(())
}

fn setup_logging_env(level: Level) {
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();
}
