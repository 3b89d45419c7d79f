//! Decode a Kyoshin WIN32 container from raw bytes.
//!
//! The main entry point is [`parse_win32()`], which parses a complete byte
//! stream into a [`KwinData`]: header, info subrecords (station and
//! hypocenter metadata) and all second blocks up to end of stream. Any
//! structural mismatch aborts the parse; there is no resynchronization.

use crate::bcd;
use crate::pack::{self, PackMode};
use crate::record::{ChannelData, KwinData, SecondBlock};
use crate::station::{ComponentUnit, HypocenterInfo, StationComponent, StationInfo};
use crate::{KwinError, Result};

pub(crate) const SUBRECORD_STATION: u16 = 0xE000;
pub(crate) const SUBRECORD_STATION_UNDERGROUND: u16 = 0xE001;
pub(crate) const SUBRECORD_HYPOCENTER: u16 = 0xE020;

/// Big-endian cursor over a byte slice.
pub(crate) struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub(crate) fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub(crate) fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(KwinError::UnexpectedEof {
                expected: n,
                actual: self.remaining(),
            });
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub(crate) fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub(crate) fn u8(&mut self) -> Result<u8> {
        Ok(self.array::<1>()?[0])
    }

    pub(crate) fn u16_be(&mut self) -> Result<u16> {
        Ok(u16::from_be_bytes(self.array()?))
    }

    pub(crate) fn u32_be(&mut self) -> Result<u32> {
        Ok(u32::from_be_bytes(self.array()?))
    }

    pub(crate) fn i16_be(&mut self) -> Result<i16> {
        Ok(i16::from_be_bytes(self.array()?))
    }

    pub(crate) fn i32_be(&mut self) -> Result<i32> {
        Ok(i32::from_be_bytes(self.array()?))
    }
}

/// Decode a complete WIN32 container.
pub fn parse_win32(data: &[u8]) -> Result<KwinData> {
    let mut r = Reader::new(data);

    // 0x0A 0x02 magic; the trailing two bytes are reserved
    let magic = r.array::<4>()?;
    if magic[0] != 0x0A || magic[1] != 0x02 {
        return Err(KwinError::InvalidMagic(magic[0], magic[1]));
    }

    // 0x0C info-block marker, three reserved bytes
    let marker = r.array::<4>()?;
    if marker[0] != 0x0C {
        return Err(KwinError::InvalidInfoMarker(marker[0]));
    }

    let organization = r.u8()?;
    let network = r.u8()?;
    let station_id = r.u16_be()?;
    let info_len = r.u32_be()?;

    let mut station_info = None;
    let mut hypocenter_info = None;
    let mut consumed: u32 = 0;
    while consumed < info_len {
        let kind = r.u16_be()?;
        let payload_len = r.u16_be()?;
        let payload = r.take(payload_len as usize)?;
        match kind {
            SUBRECORD_STATION => station_info = Some(decode_station_info(payload, false)?),
            SUBRECORD_STATION_UNDERGROUND => {
                station_info = Some(decode_station_info(payload, true)?);
            }
            SUBRECORD_HYPOCENTER => hypocenter_info = Some(decode_hypocenter(payload)?),
            _ => {} // unknown subrecords are skipped
        }
        consumed += u32::from(payload_len) + 4;
    }
    if consumed != info_len {
        return Err(KwinError::InfoLengthMismatch {
            declared: info_len,
            consumed,
        });
    }

    let mut seconds = Vec::new();
    while r.remaining() > 0 {
        seconds.push(decode_second(&mut r)?);
    }

    Ok(KwinData {
        organization,
        network,
        station_id,
        station_info,
        hypocenter_info,
        seconds,
    })
}

fn decode_station_info(payload: &[u8], underground: bool) -> Result<StationInfo> {
    let mut r = Reader::new(payload);
    let latitude = bcd::decode_coordinate(r.take(4)?, 90)?;
    let longitude = bcd::decode_coordinate(r.take(4)?, 180)?;
    let altitude = bcd::decode_signed(r.take(4)?, 5)?;
    let underground_altitude = if underground {
        bcd::decode_signed(r.take(4)?, 5)?
    } else {
        None
    };

    let code_raw = r.take(12)?;
    if !code_raw.is_ascii() {
        return Err(KwinError::InvalidStationCode);
    }
    let station_code = std::str::from_utf8(code_raw)
        .map_err(|_| KwinError::InvalidStationCode)?
        .trim_end_matches('\0')
        .to_string();

    let start_time = bcd::decode_time(&r.array()?)?;
    let duration = r.u32_be()?;
    let last_fix_time = bcd::decode_time(&r.array()?)?;
    let fix_method = r.u8()?;
    let geodetic_system = r.u8()?;
    let station_kind = r.u8()?;
    let sample_rate = r.u16_be()?;
    let component_count = r.u8()?;
    let redeployed = r.u8()?;

    let mut components = Vec::with_capacity(usize::from(component_count));
    for _ in 0..component_count {
        components.push(decode_component(&mut r)?);
    }

    Ok(StationInfo {
        latitude,
        longitude,
        altitude,
        underground_altitude,
        station_code,
        start_time,
        duration,
        last_fix_time,
        fix_method,
        geodetic_system,
        station_kind,
        sample_rate,
        component_count,
        redeployed,
        components,
    })
}

fn decode_component(r: &mut Reader<'_>) -> Result<StationComponent> {
    let organization = r.u8()?;
    let network = r.u8()?;
    let channel_id = r.u16_be()?;
    let scale_numerator = r.i16_be()?;
    let gain = r.u8()?;
    let unit = ComponentUnit::from_byte(r.u8()?)?;
    let scale_denominator = r.i32_be()?;
    let offset = r.i32_be()?;
    let measurement_range = r.i32_be()?;
    if gain == 0 || scale_denominator == 0 {
        return Err(KwinError::InvalidCalibration { channel_id });
    }
    Ok(StationComponent {
        organization,
        network,
        channel_id,
        scale_numerator,
        gain,
        unit,
        scale_denominator,
        offset,
        measurement_range,
    })
}

fn decode_hypocenter(payload: &[u8]) -> Result<HypocenterInfo> {
    let mut r = Reader::new(payload);
    Ok(HypocenterInfo {
        origin_time: bcd::decode_time(&r.array()?)?,
        latitude: bcd::decode_coordinate(r.take(4)?, 90)?,
        longitude: bcd::decode_coordinate(r.take(4)?, 180)?,
        depth: bcd::decode_scaled(r.take(4)?, 6)?,
        magnitude: bcd::decode_scaled(r.take(1)?, 1)?,
        geodetic_system: r.u8()?,
        hypocenter_kind: r.u8()?,
    })
}

fn decode_second(r: &mut Reader<'_>) -> Result<SecondBlock> {
    let start_time = bcd::decode_time(&r.array()?)?;
    let frame_duration = r.u32_be()?;
    let data_len = r.u32_be()?;

    let mut channels = Vec::new();
    let mut consumed: u32 = 0;
    while consumed < data_len {
        let channel = decode_channel(r)?;
        consumed += channel.encoded_len() as u32;
        channels.push(channel);
    }
    if consumed != data_len {
        return Err(KwinError::DataLengthMismatch {
            declared: data_len,
            consumed,
        });
    }

    Ok(SecondBlock {
        start_time,
        frame_duration,
        channels,
    })
}

fn decode_channel(r: &mut Reader<'_>) -> Result<ChannelData> {
    let organization = r.u8()?;
    let network = r.u8()?;
    let channel_id = r.u16_be()?;
    let meta = r.u16_be()?;
    let pack_mode = PackMode::from_code((meta >> 12) as u8)?;
    let sample_count = usize::from(meta & 0x0FFF);
    let first = r.i32_be()?;

    let diff_count = sample_count.saturating_sub(1);
    let delta_len = pack_mode.delta_len(diff_count);
    let deltas = r.take(delta_len)?;
    let data = if sample_count == 0 {
        Vec::new()
    } else {
        pack::decode_samples(pack_mode, first, diff_count, deltas)?
    };

    Ok(ChannelData {
        organization,
        network,
        channel_id,
        pack_mode,
        data,
        // org + net + id + meta + first sample, then the delta bytes
        encoded_len: 10 + delta_len,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::write_win32;
    use crate::scaled::ScaledNumber;
    use crate::station::UnitKind;
    use crate::time::JstTime;

    fn test_time() -> JstTime {
        JstTime {
            year: 2024,
            month: 1,
            day: 1,
            hour: 16,
            minute: 10,
            second: 9,
            millisecond: 500,
        }
    }

    fn test_component(channel_id: u16) -> StationComponent {
        StationComponent {
            organization: 1,
            network: 16,
            channel_id,
            scale_numerator: 49,
            gain: 100,
            unit: ComponentUnit::new(6, UnitKind::MeterPerSecondSquared),
            scale_denominator: 1000,
            offset: 0,
            measurement_range: 1 << 23,
        }
    }

    fn test_station_info() -> StationInfo {
        StationInfo {
            latitude: Some(ScaledNumber::new(371234, -4)),
            longitude: Some(ScaledNumber::new(1372345, -4)),
            altitude: Some(ScaledNumber::new(1250, -1)),
            underground_altitude: None,
            station_code: "ISK005".to_string(),
            start_time: test_time(),
            duration: 600,
            last_fix_time: test_time(),
            fix_method: 1,
            geodetic_system: 0,
            station_kind: 1,
            sample_rate: 100,
            component_count: 3,
            redeployed: 0,
            components: vec![
                test_component(0x1101),
                test_component(0x1102),
                test_component(0x1103),
            ],
        }
    }

    fn test_second(samples: [&[i32]; 3]) -> SecondBlock {
        SecondBlock {
            start_time: test_time(),
            frame_duration: 10,
            channels: samples
                .iter()
                .enumerate()
                .map(|(i, s)| ChannelData::new(1, 16, 0x1101 + i as u16, s.to_vec()))
                .collect(),
        }
    }

    #[test]
    fn test_container_roundtrip() {
        let data = KwinData::new(1, 16, 0x2001)
            .with_station_info(test_station_info())
            .with_seconds(vec![
                test_second([&[100, 101, 99, 102], &[-5, -6, -4, -5], &[0, 0, 1, 0]]),
                test_second([&[102, 110, 90, 70], &[-5, 300, -400, 0], &[0, 70000, -70000, 0]]),
            ]);

        let bytes = write_win32(&data).unwrap();
        let decoded = parse_win32(&bytes).unwrap();

        assert_eq!(decoded.organization, 1);
        assert_eq!(decoded.network, 16);
        assert_eq!(decoded.station_id, 0x2001);
        assert_eq!(decoded.station_info, data.station_info);
        assert_eq!(decoded.hypocenter_info, None);
        assert_eq!(decoded.seconds.len(), 2);
        for (got, want) in decoded.seconds.iter().zip(&data.seconds) {
            assert_eq!(got.start_time, want.start_time);
            assert_eq!(got.frame_duration, want.frame_duration);
            for (g, w) in got.channels.iter().zip(&want.channels) {
                assert_eq!(g.channel_id, w.channel_id);
                assert_eq!(g.pack_mode, w.pack_mode);
                assert_eq!(g.data, w.data);
            }
        }
    }

    #[test]
    fn test_hypocenter_roundtrip() {
        let hypocenter = HypocenterInfo {
            origin_time: test_time(),
            latitude: Some(ScaledNumber::new(-371, -1)),
            longitude: Some(ScaledNumber::new(1372, -1)),
            depth: Some(ScaledNumber::new(10, 0)),
            magnitude: Some(ScaledNumber::new(73, -1)),
            geodetic_system: 0,
            hypocenter_kind: 1,
        };
        let data = KwinData::new(1, 16, 0x2001).with_hypocenter_info(hypocenter.clone());

        let decoded = parse_win32(&write_win32(&data).unwrap()).unwrap();
        assert_eq!(decoded.hypocenter_info, Some(hypocenter));
        assert_eq!(decoded.station_info, None);
    }

    #[test]
    fn test_underground_station_roundtrip() {
        let mut info = test_station_info();
        info.underground_altitude = Some(ScaledNumber::new(-10300, -2));
        let data = KwinData::new(1, 16, 0x2002).with_station_info(info.clone());

        let decoded = parse_win32(&write_win32(&data).unwrap()).unwrap();
        assert_eq!(decoded.station_info, Some(info));
    }

    #[test]
    fn test_absent_coordinates_roundtrip() {
        let mut info = test_station_info();
        info.latitude = None;
        info.altitude = None;
        let data = KwinData::new(1, 16, 0x2003).with_station_info(info.clone());

        let decoded = parse_win32(&write_win32(&data).unwrap()).unwrap();
        assert_eq!(decoded.station_info, Some(info));
    }

    #[test]
    fn test_bad_magic() {
        let data = KwinData::new(1, 16, 0x2001);
        let mut bytes = write_win32(&data).unwrap();
        bytes[0] = 0x0B;
        assert!(matches!(
            parse_win32(&bytes),
            Err(KwinError::InvalidMagic(0x0B, 0x02))
        ));
    }

    #[test]
    fn test_bad_info_marker() {
        let data = KwinData::new(1, 16, 0x2001);
        let mut bytes = write_win32(&data).unwrap();
        bytes[4] = 0xFF;
        assert!(matches!(
            parse_win32(&bytes),
            Err(KwinError::InvalidInfoMarker(0xFF))
        ));
    }

    #[test]
    fn test_truncated_stream() {
        let data = KwinData::new(1, 16, 0x2001)
            .with_seconds(vec![test_second([&[1, 2], &[3, 4], &[5, 6]])]);
        let bytes = write_win32(&data).unwrap();
        assert!(parse_win32(&bytes[..bytes.len() - 1]).is_err());
        assert!(parse_win32(&bytes[..6]).is_err());
    }

    #[test]
    fn test_unknown_subrecord_skipped() {
        // Container with a single unknown subrecord in the info block
        let mut bytes = vec![
            0x0A, 0x02, 0x00, 0x00, // magic
            0x0C, 0x00, 0x00, 0x00, // info marker
            0x01, 0x10, // org, net
            0x20, 0x01, // station id
            0x00, 0x00, 0x00, 0x08, // info_len = 8
            0xE0, 0xFF, // unknown kind
            0x00, 0x04, // payload_len = 4
            0xDE, 0xAD, 0xBE, 0xEF,
        ];
        let decoded = parse_win32(&bytes).unwrap();
        assert_eq!(decoded.station_id, 0x2001);
        assert_eq!(decoded.station_info, None);
        assert_eq!(decoded.seconds.len(), 0);

        // An info_len that no subrecord boundary hits is a length mismatch
        bytes[15] = 0x07;
        assert!(matches!(
            parse_win32(&bytes),
            Err(KwinError::InfoLengthMismatch { .. })
        ));
    }

    #[test]
    fn test_unknown_pack_mode_rejected() {
        let data = KwinData::new(1, 16, 0x2001)
            .with_seconds(vec![test_second([&[1, 2], &[3, 4], &[5, 6]])]);
        let mut bytes = write_win32(&data).unwrap();
        // Sample meta word of the first channel record sits right after the
        // 16-byte header and the second block's 16-byte preamble + 4 bytes
        // of channel identity.
        let meta_offset = 16 + 16 + 4;
        bytes[meta_offset] = 0xF0 | (bytes[meta_offset] & 0x0F);
        assert!(matches!(
            parse_win32(&bytes),
            Err(KwinError::UnknownPackMode(0x0F))
        ));
    }

    #[test]
    fn test_zero_calibration_rejected() {
        // The writer refuses zero calibration, so craft the bytes by
        // patching a valid container.
        let valid = KwinData::new(1, 16, 0x2001).with_station_info(test_station_info());
        let mut bytes = write_win32(&valid).unwrap();
        // gain byte of the second component: info payload starts at offset 20,
        // fixed station fields take 4+4+4+12+8+4+8+1+1+1+2+1+1 = 51 bytes,
        // each component 20; gain sits 6 bytes into a component record.
        let gain_offset = 20 + 51 + 20 + 6;
        assert_eq!(bytes[gain_offset], 100);
        bytes[gain_offset] = 0;
        assert!(matches!(
            parse_win32(&bytes),
            Err(KwinError::InvalidCalibration { channel_id: 0x1102 })
        ));
    }
}
