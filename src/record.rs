//! Top-level decoded WIN32 container types.
//!
//! [`KwinData`] is what [`parse_win32`](crate::parse_win32) returns and what
//! [`write_win32`](crate::write_win32) consumes: station metadata, an
//! optional hypocenter, and the per-second waveform blocks.

use std::fmt;

use crate::pack::PackMode;
use crate::station::{HypocenterInfo, StationInfo};
use crate::time::JstTime;

/// One channel's worth of samples inside a second block.
#[derive(Debug, Clone)]
pub struct ChannelData {
    pub organization: u8,
    pub network: u8,
    pub channel_id: u16,
    /// Delta width used on the wire; preserved by the decoder and honored
    /// by the writer.
    pub pack_mode: PackMode,
    pub data: Vec<i32>,
    // Encoded record length, header included. Second blocks chain channel
    // records by byte count, so the decoder tracks it for the length check.
    pub(crate) encoded_len: usize,
}

impl ChannelData {
    /// Build a channel from samples, choosing the narrowest pack mode that
    /// fits the deltas.
    pub fn new(organization: u8, network: u8, channel_id: u16, data: Vec<i32>) -> Self {
        let pack_mode = PackMode::fitting(&data);
        Self {
            organization,
            network,
            channel_id,
            pack_mode,
            data,
            encoded_len: 0,
        }
    }

    /// Same as [`new`](Self::new) with an explicit pack mode.
    pub fn with_pack_mode(mut self, pack_mode: PackMode) -> Self {
        self.pack_mode = pack_mode;
        self
    }

    pub(crate) fn encoded_len(&self) -> usize {
        self.encoded_len
    }
}

// encoded_len is decoder-side bookkeeping, not part of channel identity.
impl PartialEq for ChannelData {
    fn eq(&self, other: &Self) -> bool {
        self.organization == other.organization
            && self.network == other.network
            && self.channel_id == other.channel_id
            && self.pack_mode == other.pack_mode
            && self.data == other.data
    }
}

/// One second of waveform data across all channels.
///
/// Channel ordering matches [`StationInfo::components`].
#[derive(Debug, Clone, PartialEq)]
pub struct SecondBlock {
    pub start_time: JstTime,
    /// Frame duration in tenths of a second.
    pub frame_duration: u32,
    pub channels: Vec<ChannelData>,
}

/// A decoded Kyoshin WIN32 container.
#[derive(Debug, Clone, PartialEq)]
pub struct KwinData {
    pub organization: u8,
    pub network: u8,
    pub station_id: u16,
    pub station_info: Option<StationInfo>,
    pub hypocenter_info: Option<HypocenterInfo>,
    pub seconds: Vec<SecondBlock>,
}

impl KwinData {
    /// Create an empty container for the given station identity.
    pub fn new(organization: u8, network: u8, station_id: u16) -> Self {
        Self {
            organization,
            network,
            station_id,
            station_info: None,
            hypocenter_info: None,
            seconds: Vec::new(),
        }
    }

    pub fn with_station_info(mut self, info: StationInfo) -> Self {
        self.station_info = Some(info);
        self
    }

    pub fn with_hypocenter_info(mut self, info: HypocenterInfo) -> Self {
        self.hypocenter_info = Some(info);
        self
    }

    pub fn with_seconds(mut self, seconds: Vec<SecondBlock>) -> Self {
        self.seconds = seconds;
        self
    }

    /// Total sample count across all seconds and channels.
    pub fn sample_count(&self) -> usize {
        self.seconds
            .iter()
            .flat_map(|s| s.channels.iter())
            .map(|c| c.data.len())
            .sum()
    }
}

impl fmt::Display for KwinData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "org {} net {} station {:#06X} | {} second blocks | {} samples",
            self.organization,
            self.network,
            self.station_id,
            self.seconds.len(),
            self.sample_count(),
        )?;
        if let Some(info) = &self.station_info {
            write!(f, " | {} @ {} Hz", info.station_code, info.sample_rate)?;
        }
        Ok(())
    }
}
