use crate::error::{KefError, Result};
use crate::protocol::{Command, FLAG};
use serde::{Deserialize, Serialize};

/// Input source (bits 0-3 of the source/state byte)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Source {
    Wifi = 2,
    Bluetooth = 9,
    Aux = 10,
    Optical = 11,
    Pc = 12,
}

impl TryFrom<u8> for Source {
    type Error = KefError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            2 => Ok(Source::Wifi),
            9 => Ok(Source::Bluetooth),
            10 => Ok(Source::Aux),
            11 => Ok(Source::Optical),
            12 => Ok(Source::Pc),
            _ => Err(KefError::Protocol(format!(
                "unknown source value: {value:#04x}"
            ))),
        }
    }
}

/// Playback state reported by the speaker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaybackState {
    Paused = 128,
    Playing = 129,
    Stopped = 132,
}

impl TryFrom<u8> for PlaybackState {
    type Error = KefError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            128 => Ok(PlaybackState::Paused),
            129 => Ok(PlaybackState::Playing),
            132 => Ok(PlaybackState::Stopped),
            _ => Err(KefError::Protocol(format!(
                "unknown playback state: {value:#04x}"
            ))),
        }
    }
}

/// Playback control values sent with a SET
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaybackCommand {
    Pause = 128,
    Play = 129,
    Next = 130,
    Previous = 131,
}

/// Auto-standby duration (bits 4-5 of the source/state byte)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StandbyTime {
    Minutes20 = 0,
    Minutes60 = 1,
    Never = 2,
}

impl TryFrom<u8> for StandbyTime {
    type Error = KefError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(StandbyTime::Minutes20),
            1 => Ok(StandbyTime::Minutes60),
            2 => Ok(StandbyTime::Never),
            _ => Err(KefError::Protocol(format!(
                "unknown standby time: {value:#04x}"
            ))),
        }
    }
}

/// Speaker left/right orientation (bit 6 of the source/state byte)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Orientation {
    Normal = 0,
    Inverted = 1,
}

/// Bass extension (bits 4-5 of the EQ mode byte)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BassExtension {
    Standard = 0,
    Extra = 1,
    Less = 2,
}

impl TryFrom<u8> for BassExtension {
    type Error = KefError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(BassExtension::Standard),
            1 => Ok(BassExtension::Extra),
            2 => Ok(BassExtension::Less),
            _ => Err(KefError::Protocol(format!(
                "unknown bass extension: {value:#04x}"
            ))),
        }
    }
}

/// Subwoofer polarity (bit 6 of the EQ mode byte)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubPolarity {
    Normal,
    Inverted,
}

impl SubPolarity {
    /// Sign as shown in the KEF apps
    pub fn as_str(&self) -> &'static str {
        match self {
            SubPolarity::Normal => "+",
            SubPolarity::Inverted => "-",
        }
    }
}

impl std::fmt::Display for SubPolarity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inter-speaker connection mode (LSX only)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CableMode {
    Wired = 1,
    Wireless = 129,
}

impl TryFrom<u8> for CableMode {
    type Error = KefError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            1 => Ok(CableMode::Wired),
            129 => Ok(CableMode::Wireless),
            _ => Err(KefError::Protocol(format!(
                "unknown cable mode: {value:#04x}"
            ))),
        }
    }
}

/// Speaker state byte. Bits: 0-3 source, 4-5 standby time, 6 orientation,
/// 7 power (inverted, 0 = on).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeakerState {
    pub source: Source,
    pub standby_time: StandbyTime,
    pub orientation: Orientation,
    pub is_on: bool,
}

impl SpeakerState {
    pub fn from_raw(raw: u8) -> Result<Self> {
        Ok(Self {
            source: Source::try_from(raw & 0x0F)?,
            standby_time: StandbyTime::try_from((raw >> 4) & 0x03)?,
            orientation: if (raw >> 6) & 0x01 == 1 {
                Orientation::Inverted
            } else {
                Orientation::Normal
            },
            is_on: (raw >> 7) & 0x01 == 0,
        })
    }

    pub fn to_raw(&self) -> u8 {
        let mut value = self.source as u8;
        value |= (self.standby_time as u8) << 4;
        value |= (self.orientation as u8) << 6;
        if !self.is_on {
            value |= 0x80;
        }
        value
    }
}

/// Volume byte. Bits: 0-6 volume (0-100), 7 muted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeState {
    pub volume: u8,
    pub is_muted: bool,
}

impl VolumeState {
    pub fn from_raw(raw: u8) -> Self {
        Self {
            volume: raw & 0x7F,
            is_muted: (raw >> 7) & 0x01 == 1,
        }
    }

    pub fn to_raw(&self) -> u8 {
        let mut value = self.volume & 0x7F;
        if self.is_muted {
            value |= 0x80;
        }
        value
    }
}

/// EQ mode byte. Bits: 0 desk, 1 wall, 2 phase correction, 3 high-pass,
/// 4-5 bass extension, 6 sub polarity. SETs require bit 7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EqMode {
    pub desk_mode: bool,
    pub wall_mode: bool,
    pub phase_correction: bool,
    pub high_pass: bool,
    pub bass_extension: BassExtension,
    pub sub_polarity: SubPolarity,
}

impl EqMode {
    pub fn from_raw(raw: u8) -> Result<Self> {
        Ok(Self {
            desk_mode: raw & 0x01 == 0x01,
            wall_mode: (raw >> 1) & 0x01 == 1,
            phase_correction: (raw >> 2) & 0x01 == 1,
            high_pass: (raw >> 3) & 0x01 == 1,
            bass_extension: BassExtension::try_from((raw >> 4) & 0x03)?,
            sub_polarity: if (raw >> 6) & 0x01 == 1 {
                SubPolarity::Inverted
            } else {
                SubPolarity::Normal
            },
        })
    }

    pub fn to_raw(&self) -> u8 {
        // Bit 7 required by the device for SET
        let mut value = 0x80;
        if self.desk_mode {
            value |= 0x01;
        }
        if self.wall_mode {
            value |= 0x02;
        }
        if self.phase_correction {
            value |= 0x04;
        }
        if self.high_pass {
            value |= 0x08;
        }
        value |= (self.bass_extension as u8) << 4;
        if self.sub_polarity == SubPolarity::Inverted {
            value |= 0x40;
        }
        value
    }
}

/// Volume limit byte. Bits: 0-6 limit (0-100), 7 enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeLimitState {
    pub limit: u8,
    pub enabled: bool,
}

impl VolumeLimitState {
    pub fn from_raw(raw: u8) -> Self {
        Self {
            limit: raw & 0x7F,
            enabled: (raw >> 7) & 0x01 == 1,
        }
    }

    pub fn to_raw(&self) -> u8 {
        let mut value = self.limit & 0x7F;
        if self.enabled {
            value |= 0x80;
        }
        value
    }
}

/// Scaled EQ parameter descriptor.
///
/// The wire byte carries bit 7 as a "value present" flag; the low 7 bits
/// are an index into a linear `[min, max]` range stepped by `step`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EqSetting {
    pub name: &'static str,
    pub command: Command,
    pub min: f64,
    pub max: f64,
    pub step: f64,
    pub unit: &'static str,
}

impl EqSetting {
    pub const DESK_DB: EqSetting = EqSetting {
        name: "desk_db",
        command: Command::DeskDb,
        min: -6.0,
        max: 0.0,
        step: 0.5,
        unit: "dB",
    };

    pub const WALL_DB: EqSetting = EqSetting {
        name: "wall_db",
        command: Command::WallDb,
        min: -6.0,
        max: 0.0,
        step: 0.5,
        unit: "dB",
    };

    pub const TREBLE_DB: EqSetting = EqSetting {
        name: "treble_db",
        command: Command::TrebleDb,
        min: -2.0,
        max: 2.0,
        step: 0.5,
        unit: "dB",
    };

    pub const HIGH_PASS_HZ: EqSetting = EqSetting {
        name: "high_pass_hz",
        command: Command::HighPassHz,
        min: 50.0,
        max: 120.0,
        step: 5.0,
        unit: "Hz",
    };

    pub const SUB_OUT_HZ: EqSetting = EqSetting {
        name: "sub_out_hz",
        command: Command::SubOutHz,
        min: 40.0,
        max: 250.0,
        step: 5.0,
        unit: "Hz",
    };

    pub const SUB_GAIN_DB: EqSetting = EqSetting {
        name: "sub_gain_db",
        command: Command::SubGainDb,
        min: -10.0,
        max: 10.0,
        step: 1.0,
        unit: "dB",
    };

    /// Convert a wire byte to the display value
    pub fn decode(&self, raw: u8) -> f64 {
        self.min + self.step * f64::from(raw ^ FLAG)
    }

    /// Convert a display value to the wire byte, clamped to `[min, max]`
    /// and rounded to the nearest step
    pub fn encode(&self, value: f64) -> u8 {
        let clamped = value.clamp(self.min, self.max);
        let index = ((clamped - self.min) / self.step).round() as u8;
        index | FLAG
    }
}
