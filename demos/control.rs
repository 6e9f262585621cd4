//! Connect to a speaker and print its current settings.
//!
//! Usage: cargo run --example control -- <host> [port]

use kef_wireless::{ConnectionConfig, Speaker};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let mut args = std::env::args().skip(1);
    let host = args.next().ok_or("usage: control <host> [port]")?;
    let config = match args.next() {
        Some(port) => ConnectionConfig::new(host).with_port(port.parse()?),
        None => ConnectionConfig::new(host),
    };

    let speaker = Speaker::with_config(config);

    let state = speaker.get_state().await?;
    println!("power:        {}", if state.is_on { "on" } else { "standby" });
    println!("source:       {:?}", state.source);
    println!("standby time: {:?}", state.standby_time);
    println!("orientation:  {:?}", state.orientation);

    let volume = speaker.get_volume().await?;
    println!(
        "volume:       {}{}",
        volume.volume,
        if volume.is_muted { " (muted)" } else { "" }
    );

    let mode = speaker.get_eq_mode().await?;
    println!(
        "desk mode:    {} ({} dB)",
        mode.desk_mode,
        speaker.get_desk_db().await?
    );
    println!(
        "wall mode:    {} ({} dB)",
        mode.wall_mode,
        speaker.get_wall_db().await?
    );
    println!("treble:       {} dB", speaker.get_treble_db().await?);
    println!("sub polarity: {}", mode.sub_polarity);
    println!("name:         {}", speaker.get_device_name().await?);

    speaker.close().await;
    Ok(())
}
