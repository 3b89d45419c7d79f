//! Station and hypocenter metadata.

use std::fmt;

use crate::scaled::ScaledNumber;
use crate::time::JstTime;
use crate::{KwinError, Result};

/// Physical quantity kind of one sensor channel (low 4 bits of the unit byte).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitKind {
    /// Dimensionless (code 0).
    None,
    /// Displacement, m (code 1).
    Meter,
    /// Velocity, m/s (code 2).
    MeterPerSecond,
    /// Acceleration, m/s² (code 3).
    MeterPerSecondSquared,
}

impl UnitKind {
    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            0 => Ok(Self::None),
            1 => Ok(Self::Meter),
            2 => Ok(Self::MeterPerSecond),
            3 => Ok(Self::MeterPerSecondSquared),
            _ => Err(KwinError::UnknownUnitKind(code)),
        }
    }

    pub fn to_code(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Meter => 1,
            Self::MeterPerSecond => 2,
            Self::MeterPerSecondSquared => 3,
        }
    }
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => Ok(()),
            Self::Meter => write!(f, "m"),
            Self::MeterPerSecond => write!(f, "m/s"),
            Self::MeterPerSecondSquared => write!(f, "m/s²"),
        }
    }
}

/// Channel unit packed as `(scale << 4) | kind`; the channel's numbers are
/// in units of `10^(-scale)` of the base quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComponentUnit {
    scale: u8,
    kind: UnitKind,
}

impl ComponentUnit {
    pub fn new(scale: u8, kind: UnitKind) -> Self {
        assert!(scale <= 15, "unit scale must fit four bits");
        Self { scale, kind }
    }

    pub fn from_byte(byte: u8) -> Result<Self> {
        Ok(Self {
            scale: byte >> 4,
            kind: UnitKind::from_code(byte & 0x0F)?,
        })
    }

    pub fn to_byte(self) -> u8 {
        (self.scale << 4) | self.kind.to_code()
    }

    /// Physical scale factor `10^(-scale)`.
    pub fn factor(self) -> f64 {
        10f64.powi(-i32::from(self.scale))
    }

    pub fn scale(self) -> u8 {
        self.scale
    }

    pub fn kind(self) -> UnitKind {
        self.kind
    }
}

impl fmt::Display for ComponentUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.scale == 0 {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "10^-{} {}", self.scale, self.kind)
        }
    }
}

/// One sensor channel with its calibration.
///
/// Decoded components always have nonzero `gain` and `scale_denominator`;
/// the decoder rejects streams that violate this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StationComponent {
    pub organization: u8,
    pub network: u8,
    pub channel_id: u16,
    pub scale_numerator: i16,
    pub gain: u8,
    pub unit: ComponentUnit,
    pub scale_denominator: i32,
    pub offset: i32,
    pub measurement_range: i32,
}

impl StationComponent {
    /// Convert a digitized count to a physical value in the channel's
    /// [`unit`](Self::unit):
    /// `scale_numerator / scale_denominator × (d − offset) / gain`.
    ///
    /// Defined for every `i32` input; the subtraction is carried out in
    /// `f64` so extreme counts cannot overflow.
    pub fn to_physical(&self, digital: i32) -> f64 {
        f64::from(self.scale_numerator) / f64::from(self.scale_denominator)
            * (f64::from(digital) - f64::from(self.offset))
            / f64::from(self.gain)
    }
}

/// Observation-site metadata from an `0xE000`/`0xE001` info subrecord.
#[derive(Debug, Clone, PartialEq)]
pub struct StationInfo {
    pub latitude: Option<ScaledNumber>,
    pub longitude: Option<ScaledNumber>,
    pub altitude: Option<ScaledNumber>,
    /// Borehole sensor altitude; present only in `0xE001` subrecords.
    pub underground_altitude: Option<ScaledNumber>,
    pub station_code: String,
    pub start_time: JstTime,
    /// Measurement duration in tenths of a second.
    pub duration: u32,
    pub last_fix_time: JstTime,
    pub fix_method: u8,
    pub geodetic_system: u8,
    pub station_kind: u8,
    /// Sampling rate in Hz.
    pub sample_rate: u16,
    pub component_count: u8,
    pub redeployed: u8,
    pub components: Vec<StationComponent>,
}

/// Earthquake source metadata from an `0xE020` info subrecord.
///
/// Real-time packets carry no hypocenter; the field stays `None` on
/// [`KwinData`](crate::KwinData).
#[derive(Debug, Clone, PartialEq)]
pub struct HypocenterInfo {
    pub origin_time: JstTime,
    pub latitude: Option<ScaledNumber>,
    pub longitude: Option<ScaledNumber>,
    /// Depth in km.
    pub depth: Option<ScaledNumber>,
    pub magnitude: Option<ScaledNumber>,
    pub geodetic_system: u8,
    pub hypocenter_kind: u8,
}
