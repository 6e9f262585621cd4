use crate::connection::{Connection, ConnectionConfig};
use crate::error::{KefError, Result};
use crate::protocol::{Command, Request};
use crate::types::{
    CableMode, EqMode, EqSetting, Orientation, PlaybackCommand, PlaybackState, Source,
    SpeakerState, StandbyTime, VolumeLimitState, VolumeState,
};
use std::time::Duration;
use tokio::time::{sleep, Instant};

/// How long a power transition may take to settle
const POWER_SETTLE_TIMEOUT: Duration = Duration::from_secs(10);
const POWER_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Async control interface for KEF LS50 Wireless and LSX (gen 1) speakers
///
/// The `Speaker` owns the TCP session to the device and exposes one method
/// per control operation. The session is opened lazily on first use and
/// closed automatically after a short idle period; callers never need to
/// manage it explicitly.
///
/// # Example
///
/// ```no_run
/// use kef_wireless::Speaker;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let speaker = Speaker::new("192.168.1.100");
///
///     let volume = speaker.get_volume().await?;
///     println!("volume {} muted {}", volume.volume, volume.is_muted);
///
///     speaker.set_volume(40).await?;
///     speaker.close().await;
///     Ok(())
/// }
/// ```
pub struct Speaker {
    connection: Connection,
}

impl Speaker {
    /// Create a speaker handle for the given host with default settings
    pub fn new(host: impl Into<String>) -> Self {
        Self::with_config(ConnectionConfig::new(host))
    }

    /// Create a speaker handle with explicit connection settings
    pub fn with_config(config: ConnectionConfig) -> Self {
        Self {
            connection: Connection::new(config),
        }
    }

    /// Host this speaker handle points at
    pub fn host(&self) -> &str {
        &self.connection.config().host
    }

    /// Open the session eagerly. Optional; any operation connects on demand.
    pub async fn connect(&self) -> Result<()> {
        self.connection.connect().await
    }

    /// Close the session. Safe to call at any time.
    pub async fn close(&self) {
        self.connection.disconnect().await;
    }

    /// Send a SET and require the acknowledgement frame back
    async fn set(&self, request: Request, action: &str) -> Result<()> {
        let response = self.connection.send(&request).await?;
        if response.is_ack() {
            Ok(())
        } else {
            Err(KefError::Command(format!("failed to {action}")))
        }
    }

    // ========== Volume ==========

    /// Get the current volume and mute state
    pub async fn get_volume(&self) -> Result<VolumeState> {
        let response = self.connection.send(&Request::get(Command::Volume)).await?;
        Ok(VolumeState::from_raw(response.value_byte()?))
    }

    /// Set the volume (0-100, clamped), preserving the current mute state
    pub async fn set_volume(&self, volume: u8) -> Result<()> {
        let current = self.get_volume().await?;
        self.write_volume(VolumeState {
            volume: volume.min(100),
            is_muted: current.is_muted,
        })
        .await
    }

    /// Mute, keeping the volume setting
    pub async fn mute(&self) -> Result<()> {
        let current = self.get_volume().await?;
        self.write_volume(VolumeState {
            is_muted: true,
            ..current
        })
        .await
    }

    /// Unmute, keeping the volume setting
    pub async fn unmute(&self) -> Result<()> {
        let current = self.get_volume().await?;
        self.write_volume(VolumeState {
            is_muted: false,
            ..current
        })
        .await
    }

    async fn write_volume(&self, state: VolumeState) -> Result<()> {
        self.set(
            Request::set_byte(Command::Volume, state.to_raw()),
            "set volume",
        )
        .await
    }

    // ========== Speaker state ==========

    /// Get the combined source/standby/orientation/power state
    pub async fn get_state(&self) -> Result<SpeakerState> {
        let response = self.connection.send(&Request::get(Command::Source)).await?;
        SpeakerState::from_raw(response.value_byte()?)
    }

    async fn write_state(&self, state: SpeakerState, action: &str) -> Result<()> {
        self.set(Request::set_byte(Command::Source, state.to_raw()), action)
            .await
    }

    /// Get the active input source
    pub async fn get_source(&self) -> Result<Source> {
        Ok(self.get_state().await?.source)
    }

    /// Switch the input source
    pub async fn set_source(&self, source: Source) -> Result<()> {
        let state = self.get_state().await?;
        self.write_state(SpeakerState { source, ..state }, "set source")
            .await
    }

    /// Get the auto-standby duration
    pub async fn get_standby_time(&self) -> Result<StandbyTime> {
        Ok(self.get_state().await?.standby_time)
    }

    /// Set the auto-standby duration
    pub async fn set_standby_time(&self, standby_time: StandbyTime) -> Result<()> {
        let state = self.get_state().await?;
        self.write_state(
            SpeakerState {
                standby_time,
                ..state
            },
            "set standby time",
        )
        .await
    }

    /// Get the left/right orientation
    pub async fn get_orientation(&self) -> Result<Orientation> {
        Ok(self.get_state().await?.orientation)
    }

    /// Set the left/right orientation
    pub async fn set_orientation(&self, orientation: Orientation) -> Result<()> {
        let state = self.get_state().await?;
        self.write_state(
            SpeakerState {
                orientation,
                ..state
            },
            "set orientation",
        )
        .await
    }

    // ========== Power ==========

    /// Whether the speaker is powered on
    pub async fn is_on(&self) -> Result<bool> {
        Ok(self.get_state().await?.is_on)
    }

    /// Power the speaker on and wait for the transition to settle
    pub async fn turn_on(&self) -> Result<()> {
        let state = self.get_state().await?;
        if state.is_on {
            return Ok(());
        }
        self.write_state(
            SpeakerState {
                is_on: true,
                ..state
            },
            "turn on",
        )
        .await?;
        self.wait_for_power(true).await
    }

    /// Put the speaker into standby and wait for the transition to settle
    pub async fn turn_off(&self) -> Result<()> {
        let state = self.get_state().await?;
        if !state.is_on {
            return Ok(());
        }
        self.write_state(
            SpeakerState {
                is_on: false,
                ..state
            },
            "turn off",
        )
        .await?;
        self.wait_for_power(false).await
    }

    /// Poll the power bit until it reaches the wanted state
    async fn wait_for_power(&self, on: bool) -> Result<()> {
        let deadline = Instant::now() + POWER_SETTLE_TIMEOUT;
        while Instant::now() < deadline {
            if self.is_on().await? == on {
                return Ok(());
            }
            sleep(POWER_POLL_INTERVAL).await;
        }
        Err(KefError::Command(format!(
            "timeout waiting for power {}",
            if on { "on" } else { "off" }
        )))
    }

    // ========== Playback ==========

    /// Get the current playback state (WiFi/Bluetooth sources)
    pub async fn get_playback_state(&self) -> Result<PlaybackState> {
        let response = self
            .connection
            .send(&Request::get(Command::Playback))
            .await?;
        PlaybackState::try_from(response.value_byte()?)
    }

    /// Resume playback
    pub async fn play(&self) -> Result<()> {
        self.playback(PlaybackCommand::Play, "play").await
    }

    /// Pause playback
    pub async fn pause(&self) -> Result<()> {
        self.playback(PlaybackCommand::Pause, "pause").await
    }

    /// Skip to the next track
    pub async fn next_track(&self) -> Result<()> {
        self.playback(PlaybackCommand::Next, "skip track").await
    }

    /// Go back to the previous track
    pub async fn previous_track(&self) -> Result<()> {
        self.playback(PlaybackCommand::Previous, "go to previous track")
            .await
    }

    async fn playback(&self, command: PlaybackCommand, action: &str) -> Result<()> {
        self.set(Request::set_byte(Command::Playback, command as u8), action)
            .await
    }

    // ========== EQ mode ==========

    /// Get the EQ mode flags
    pub async fn get_eq_mode(&self) -> Result<EqMode> {
        let response = self.connection.send(&Request::get(Command::EqMode)).await?;
        EqMode::from_raw(response.value_byte()?)
    }

    /// Write the whole EQ mode record.
    ///
    /// For a partial update, read the current mode, change the fields of
    /// interest and write it back:
    ///
    /// ```no_run
    /// # use kef_wireless::Speaker;
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// # let speaker = Speaker::new("192.168.1.100");
    /// let mut mode = speaker.get_eq_mode().await?;
    /// mode.wall_mode = true;
    /// mode.desk_mode = false;
    /// speaker.set_eq_mode(mode).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn set_eq_mode(&self, mode: EqMode) -> Result<()> {
        self.set(
            Request::set_byte(Command::EqMode, mode.to_raw()),
            "set EQ mode",
        )
        .await
    }

    // ========== Scaled EQ parameters ==========

    async fn get_eq_setting(&self, setting: EqSetting) -> Result<f64> {
        let response = self.connection.send(&Request::get(setting.command)).await?;
        Ok(setting.decode(response.value_byte()?))
    }

    async fn set_eq_setting(&self, setting: EqSetting, value: f64) -> Result<()> {
        self.set(
            Request::set_byte(setting.command, setting.encode(value)),
            &format!("set {}", setting.name),
        )
        .await
    }

    /// Get the desk mode attenuation in dB
    pub async fn get_desk_db(&self) -> Result<f64> {
        self.get_eq_setting(EqSetting::DESK_DB).await
    }

    /// Set the desk mode attenuation (-6.0 to 0.0 dB, 0.5 dB steps)
    pub async fn set_desk_db(&self, value: f64) -> Result<()> {
        self.set_eq_setting(EqSetting::DESK_DB, value).await
    }

    /// Get the wall mode attenuation in dB
    pub async fn get_wall_db(&self) -> Result<f64> {
        self.get_eq_setting(EqSetting::WALL_DB).await
    }

    /// Set the wall mode attenuation (-6.0 to 0.0 dB, 0.5 dB steps)
    pub async fn set_wall_db(&self, value: f64) -> Result<()> {
        self.set_eq_setting(EqSetting::WALL_DB, value).await
    }

    /// Get the treble trim in dB
    pub async fn get_treble_db(&self) -> Result<f64> {
        self.get_eq_setting(EqSetting::TREBLE_DB).await
    }

    /// Set the treble trim (-2.0 to 2.0 dB, 0.5 dB steps)
    pub async fn set_treble_db(&self, value: f64) -> Result<()> {
        self.set_eq_setting(EqSetting::TREBLE_DB, value).await
    }

    /// Get the high-pass filter frequency in Hz
    pub async fn get_high_pass_hz(&self) -> Result<f64> {
        self.get_eq_setting(EqSetting::HIGH_PASS_HZ).await
    }

    /// Set the high-pass filter frequency (50 to 120 Hz, 5 Hz steps)
    pub async fn set_high_pass_hz(&self, value: f64) -> Result<()> {
        self.set_eq_setting(EqSetting::HIGH_PASS_HZ, value).await
    }

    /// Get the subwoofer output low-pass frequency in Hz
    pub async fn get_sub_out_hz(&self) -> Result<f64> {
        self.get_eq_setting(EqSetting::SUB_OUT_HZ).await
    }

    /// Set the subwoofer output low-pass frequency (40 to 250 Hz, 5 Hz steps)
    pub async fn set_sub_out_hz(&self, value: f64) -> Result<()> {
        self.set_eq_setting(EqSetting::SUB_OUT_HZ, value).await
    }

    /// Get the subwoofer gain in dB
    pub async fn get_sub_gain_db(&self) -> Result<f64> {
        self.get_eq_setting(EqSetting::SUB_GAIN_DB).await
    }

    /// Set the subwoofer gain (-10 to 10 dB, 1 dB steps)
    pub async fn set_sub_gain_db(&self, value: f64) -> Result<()> {
        self.set_eq_setting(EqSetting::SUB_GAIN_DB, value).await
    }

    // ========== Balance, limits, misc ==========

    /// Get the balance: 0 = left, 30 = center, 60 = right
    pub async fn get_balance(&self) -> Result<u8> {
        let response = self
            .connection
            .send(&Request::get(Command::Balance))
            .await?;
        Ok(response.value_byte()? & 0x3F)
    }

    /// Set the balance: 0 = left, 30 = center, 60 = right (clamped)
    pub async fn set_balance(&self, value: u8) -> Result<()> {
        self.set(
            Request::set_byte(Command::Balance, value.min(60) | 0x80),
            "set balance",
        )
        .await
    }

    /// Get the volume limit and whether it is enforced
    pub async fn get_volume_limit(&self) -> Result<VolumeLimitState> {
        let response = self
            .connection
            .send(&Request::get(Command::VolumeLimit))
            .await?;
        Ok(VolumeLimitState::from_raw(response.value_byte()?))
    }

    /// Set the volume limit (0-100, clamped)
    pub async fn set_volume_limit(&self, limit: u8, enabled: bool) -> Result<()> {
        let state = VolumeLimitState {
            limit: limit.min(100),
            enabled,
        };
        self.set(
            Request::set_byte(Command::VolumeLimit, state.to_raw()),
            "set volume limit",
        )
        .await
    }

    /// Get the inter-speaker connection mode (LSX only)
    pub async fn get_cable_mode(&self) -> Result<CableMode> {
        let response = self
            .connection
            .send(&Request::get(Command::CableMode))
            .await?;
        CableMode::try_from(response.value_byte()?)
    }

    /// Get the device name shown in the KEF apps
    pub async fn get_device_name(&self) -> Result<String> {
        let response = self
            .connection
            .send(&Request::get(Command::DeviceName))
            .await?;
        Ok(response.value_string())
    }

    /// Rename the device
    pub async fn set_device_name(&self, name: &str) -> Result<()> {
        self.set(
            Request::set_string(Command::DeviceName, name),
            "set device name",
        )
        .await
    }
}
