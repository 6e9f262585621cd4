use crate::connection::ConnectionConfig;
use crate::error::{KefError, Result};
use crate::speaker::Speaker;
use crate::types::{
    CableMode, EqMode, Orientation, PlaybackState, Source, SpeakerState, StandbyTime,
    VolumeLimitState, VolumeState,
};
use std::future::Future;
use tokio::runtime::{Builder, Runtime};

/// Blocking control interface for callers without an async runtime
///
/// Wraps [`Speaker`] with one blocking method per operation. Each call runs
/// the async operation to completion on an owned single-threaded runtime and
/// then disconnects, so no idle-timer task outlives the call.
///
/// Must not be used from inside an async context; `block_on` panics there.
///
/// # Example
///
/// ```no_run
/// use kef_wireless::BlockingSpeaker;
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let speaker = BlockingSpeaker::new("192.168.1.100")?;
///     println!("volume {}", speaker.get_volume()?.volume);
///     Ok(())
/// }
/// ```
pub struct BlockingSpeaker {
    speaker: Speaker,
    runtime: Runtime,
}

impl BlockingSpeaker {
    /// Create a blocking speaker handle with default settings
    pub fn new(host: impl Into<String>) -> Result<Self> {
        Self::with_config(ConnectionConfig::new(host))
    }

    /// Create a blocking speaker handle with explicit connection settings
    pub fn with_config(config: ConnectionConfig) -> Result<Self> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| KefError::connection_io("failed to start blocking runtime", e))?;
        Ok(Self {
            speaker: Speaker::with_config(config),
            runtime,
        })
    }

    /// Host this speaker handle points at
    pub fn host(&self) -> &str {
        self.speaker.host()
    }

    /// Run one operation to completion, then disconnect
    fn run<T>(&self, operation: impl Future<Output = Result<T>>) -> Result<T> {
        let result = self.runtime.block_on(operation);
        self.runtime.block_on(self.speaker.close());
        result
    }

    pub fn get_state(&self) -> Result<SpeakerState> {
        self.run(self.speaker.get_state())
    }

    pub fn get_volume(&self) -> Result<VolumeState> {
        self.run(self.speaker.get_volume())
    }

    pub fn set_volume(&self, volume: u8) -> Result<()> {
        self.run(self.speaker.set_volume(volume))
    }

    pub fn mute(&self) -> Result<()> {
        self.run(self.speaker.mute())
    }

    pub fn unmute(&self) -> Result<()> {
        self.run(self.speaker.unmute())
    }

    pub fn get_source(&self) -> Result<Source> {
        self.run(self.speaker.get_source())
    }

    pub fn set_source(&self, source: Source) -> Result<()> {
        self.run(self.speaker.set_source(source))
    }

    pub fn get_standby_time(&self) -> Result<StandbyTime> {
        self.run(self.speaker.get_standby_time())
    }

    pub fn set_standby_time(&self, standby_time: StandbyTime) -> Result<()> {
        self.run(self.speaker.set_standby_time(standby_time))
    }

    pub fn get_orientation(&self) -> Result<Orientation> {
        self.run(self.speaker.get_orientation())
    }

    pub fn set_orientation(&self, orientation: Orientation) -> Result<()> {
        self.run(self.speaker.set_orientation(orientation))
    }

    pub fn is_on(&self) -> Result<bool> {
        self.run(self.speaker.is_on())
    }

    pub fn turn_on(&self) -> Result<()> {
        self.run(self.speaker.turn_on())
    }

    pub fn turn_off(&self) -> Result<()> {
        self.run(self.speaker.turn_off())
    }

    pub fn get_playback_state(&self) -> Result<PlaybackState> {
        self.run(self.speaker.get_playback_state())
    }

    pub fn play(&self) -> Result<()> {
        self.run(self.speaker.play())
    }

    pub fn pause(&self) -> Result<()> {
        self.run(self.speaker.pause())
    }

    pub fn next_track(&self) -> Result<()> {
        self.run(self.speaker.next_track())
    }

    pub fn previous_track(&self) -> Result<()> {
        self.run(self.speaker.previous_track())
    }

    pub fn get_eq_mode(&self) -> Result<EqMode> {
        self.run(self.speaker.get_eq_mode())
    }

    pub fn set_eq_mode(&self, mode: EqMode) -> Result<()> {
        self.run(self.speaker.set_eq_mode(mode))
    }

    pub fn get_desk_db(&self) -> Result<f64> {
        self.run(self.speaker.get_desk_db())
    }

    pub fn set_desk_db(&self, value: f64) -> Result<()> {
        self.run(self.speaker.set_desk_db(value))
    }

    pub fn get_wall_db(&self) -> Result<f64> {
        self.run(self.speaker.get_wall_db())
    }

    pub fn set_wall_db(&self, value: f64) -> Result<()> {
        self.run(self.speaker.set_wall_db(value))
    }

    pub fn get_treble_db(&self) -> Result<f64> {
        self.run(self.speaker.get_treble_db())
    }

    pub fn set_treble_db(&self, value: f64) -> Result<()> {
        self.run(self.speaker.set_treble_db(value))
    }

    pub fn get_high_pass_hz(&self) -> Result<f64> {
        self.run(self.speaker.get_high_pass_hz())
    }

    pub fn set_high_pass_hz(&self, value: f64) -> Result<()> {
        self.run(self.speaker.set_high_pass_hz(value))
    }

    pub fn get_sub_out_hz(&self) -> Result<f64> {
        self.run(self.speaker.get_sub_out_hz())
    }

    pub fn set_sub_out_hz(&self, value: f64) -> Result<()> {
        self.run(self.speaker.set_sub_out_hz(value))
    }

    pub fn get_sub_gain_db(&self) -> Result<f64> {
        self.run(self.speaker.get_sub_gain_db())
    }

    pub fn set_sub_gain_db(&self, value: f64) -> Result<()> {
        self.run(self.speaker.set_sub_gain_db(value))
    }

    pub fn get_balance(&self) -> Result<u8> {
        self.run(self.speaker.get_balance())
    }

    pub fn set_balance(&self, value: u8) -> Result<()> {
        self.run(self.speaker.set_balance(value))
    }

    pub fn get_volume_limit(&self) -> Result<VolumeLimitState> {
        self.run(self.speaker.get_volume_limit())
    }

    pub fn set_volume_limit(&self, limit: u8, enabled: bool) -> Result<()> {
        self.run(self.speaker.set_volume_limit(limit, enabled))
    }

    pub fn get_cable_mode(&self) -> Result<CableMode> {
        self.run(self.speaker.get_cable_mode())
    }

    pub fn get_device_name(&self) -> Result<String> {
        self.run(self.speaker.get_device_name())
    }

    pub fn set_device_name(&self, name: &str) -> Result<()> {
        self.run(self.speaker.set_device_name(name))
    }
}
