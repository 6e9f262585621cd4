//! Rust library for controlling KEF LS50 Wireless and LSX (gen 1) networked speakers
//!
//! This library provides an async API for the proprietary binary control
//! protocol the speakers expose on TCP port 50001. It supports:
//!
//! - Volume, mute and volume-limit control
//! - Input source selection and power control
//! - Playback control (play/pause/skip on WiFi and Bluetooth sources)
//! - EQ mode flags and the scaled EQ parameters (desk/wall/treble,
//!   high-pass, sub out, sub gain)
//! - Balance, device name, standby time and orientation
//! - Automatic session management: lazy connect with retry, serialized
//!   exchanges, idle auto-disconnect with transparent reconnect
//!
//! # Quick Start
//!
//! ```no_run
//! use kef_wireless::Speaker;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let speaker = Speaker::new("192.168.1.100");
//!
//!     let volume = speaker.get_volume().await?;
//!     println!("volume: {} (muted: {})", volume.volume, volume.is_muted);
//!
//!     speaker.set_volume(40).await?;
//!
//!     let state = speaker.get_state().await?;
//!     println!("source: {:?}, on: {}", state.source, state.is_on);
//!
//!     speaker.close().await;
//!     Ok(())
//! }
//! ```
//!
//! # Blocking Usage
//!
//! Callers without an async runtime can use [`BlockingSpeaker`], which runs
//! each operation to completion on its own runtime:
//!
//! ```no_run
//! use kef_wireless::BlockingSpeaker;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let speaker = BlockingSpeaker::new("192.168.1.100")?;
//!     println!("volume: {}", speaker.get_volume()?.volume);
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! The library is organized into several layers:
//!
//! - **Speaker**: high-level control API, one method per device operation
//! - **Connection**: TCP session lifecycle: retried connect, serialized
//!   request/response exchanges, idle keepalive
//! - **Protocol**: request building and length-aware response framing
//! - **Types**: device state records and their single-byte codecs

mod blocking;
mod connection;
mod error;
mod protocol;
mod speaker;
mod types;

// Public exports
pub use blocking::BlockingSpeaker;
pub use connection::{Connection, ConnectionConfig, DEFAULT_PORT};
pub use error::{KefError, Result};
pub use protocol::{Command, Frame, Request};
pub use speaker::Speaker;
pub use types::{
    BassExtension, CableMode, EqMode, EqSetting, Orientation, PlaybackCommand, PlaybackState,
    Source, SpeakerState, StandbyTime, SubPolarity, VolumeLimitState, VolumeState,
};
