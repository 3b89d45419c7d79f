//! Encode a [`KwinData`] into WIN32 container bytes.
//!
//! The main entry point is [`write_win32()`], the mirror of
//! [`parse_win32`](crate::parse_win32). It exists so callers can build
//! synthetic containers and so the codec is testable end to end.

use crate::bcd;
use crate::decode::{SUBRECORD_HYPOCENTER, SUBRECORD_STATION, SUBRECORD_STATION_UNDERGROUND};
use crate::pack;
use crate::record::{ChannelData, KwinData, SecondBlock};
use crate::station::{HypocenterInfo, StationComponent, StationInfo};
use crate::{KwinError, Result};

/// Serialize a [`KwinData`] into WIN32 container bytes.
pub fn write_win32(data: &KwinData) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&[0x0A, 0x02, 0x00, 0x00]);
    buf.extend_from_slice(&[0x0C, 0x00, 0x00, 0x00]);
    buf.push(data.organization);
    buf.push(data.network);
    buf.extend_from_slice(&data.station_id.to_be_bytes());

    let mut info = Vec::new();
    if let Some(station) = &data.station_info {
        let kind = if station.underground_altitude.is_some() {
            SUBRECORD_STATION_UNDERGROUND
        } else {
            SUBRECORD_STATION
        };
        push_subrecord(&mut info, kind, &encode_station_info(station)?)?;
    }
    if let Some(hypocenter) = &data.hypocenter_info {
        push_subrecord(&mut info, SUBRECORD_HYPOCENTER, &encode_hypocenter(hypocenter)?)?;
    }
    buf.extend_from_slice(&(info.len() as u32).to_be_bytes());
    buf.extend_from_slice(&info);

    for second in &data.seconds {
        encode_second(&mut buf, second)?;
    }

    Ok(buf)
}

fn push_subrecord(info: &mut Vec<u8>, kind: u16, payload: &[u8]) -> Result<()> {
    let len = u16::try_from(payload.len()).map_err(|_| {
        KwinError::EncodeError(format!("info subrecord payload of {} bytes", payload.len()))
    })?;
    info.extend_from_slice(&kind.to_be_bytes());
    info.extend_from_slice(&len.to_be_bytes());
    info.extend_from_slice(payload);
    Ok(())
}

fn encode_station_info(station: &StationInfo) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&bcd::encode_coordinate(station.latitude, 8, 90)?);
    buf.extend_from_slice(&bcd::encode_coordinate(station.longitude, 8, 180)?);
    buf.extend_from_slice(&bcd::encode_signed(station.altitude, 8, 5)?);
    if let Some(underground) = station.underground_altitude {
        buf.extend_from_slice(&bcd::encode_signed(Some(underground), 8, 5)?);
    }

    if !station.station_code.is_ascii() || station.station_code.len() > 12 {
        return Err(KwinError::EncodeError(format!(
            "station code {:?} is not a 12-byte ASCII field",
            station.station_code
        )));
    }
    let mut code = [0u8; 12];
    code[..station.station_code.len()].copy_from_slice(station.station_code.as_bytes());
    buf.extend_from_slice(&code);

    buf.extend_from_slice(&bcd::encode_time(&station.start_time));
    buf.extend_from_slice(&station.duration.to_be_bytes());
    buf.extend_from_slice(&bcd::encode_time(&station.last_fix_time));
    buf.push(station.fix_method);
    buf.push(station.geodetic_system);
    buf.push(station.station_kind);
    buf.extend_from_slice(&station.sample_rate.to_be_bytes());
    buf.push(station.component_count);
    buf.push(station.redeployed);

    for component in &station.components {
        encode_component(&mut buf, component)?;
    }
    Ok(buf)
}

fn encode_component(buf: &mut Vec<u8>, component: &StationComponent) -> Result<()> {
    if component.gain == 0 || component.scale_denominator == 0 {
        return Err(KwinError::EncodeError(format!(
            "component {:#06X} has zero gain or scale denominator",
            component.channel_id
        )));
    }
    buf.push(component.organization);
    buf.push(component.network);
    buf.extend_from_slice(&component.channel_id.to_be_bytes());
    buf.extend_from_slice(&component.scale_numerator.to_be_bytes());
    buf.push(component.gain);
    buf.push(component.unit.to_byte());
    buf.extend_from_slice(&component.scale_denominator.to_be_bytes());
    buf.extend_from_slice(&component.offset.to_be_bytes());
    buf.extend_from_slice(&component.measurement_range.to_be_bytes());
    Ok(())
}

fn encode_hypocenter(hypocenter: &HypocenterInfo) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&bcd::encode_time(&hypocenter.origin_time));
    buf.extend_from_slice(&bcd::encode_coordinate(hypocenter.latitude, 8, 90)?);
    buf.extend_from_slice(&bcd::encode_coordinate(hypocenter.longitude, 8, 180)?);
    buf.extend_from_slice(&bcd::encode_scaled(hypocenter.depth, 8, 6)?);
    buf.extend_from_slice(&bcd::encode_scaled(hypocenter.magnitude, 2, 1)?);
    buf.push(hypocenter.geodetic_system);
    buf.push(hypocenter.hypocenter_kind);
    Ok(buf)
}

fn encode_second(buf: &mut Vec<u8>, second: &SecondBlock) -> Result<()> {
    buf.extend_from_slice(&bcd::encode_time(&second.start_time));
    buf.extend_from_slice(&second.frame_duration.to_be_bytes());

    let mut body = Vec::new();
    for channel in &second.channels {
        encode_channel(&mut body, channel)?;
    }
    buf.extend_from_slice(&(body.len() as u32).to_be_bytes());
    buf.extend_from_slice(&body);
    Ok(())
}

fn encode_channel(body: &mut Vec<u8>, channel: &ChannelData) -> Result<()> {
    if channel.data.len() > 0x0FFF {
        return Err(KwinError::EncodeError(format!(
            "channel {:#06X} has {} samples, limit is 4095",
            channel.channel_id,
            channel.data.len()
        )));
    }
    body.push(channel.organization);
    body.push(channel.network);
    body.extend_from_slice(&channel.channel_id.to_be_bytes());
    let meta = (u16::from(channel.pack_mode.to_code()) << 12) | channel.data.len() as u16;
    body.extend_from_slice(&meta.to_be_bytes());
    let first = channel.data.first().copied().unwrap_or(0);
    body.extend_from_slice(&first.to_be_bytes());
    body.extend_from_slice(&pack::encode_deltas(channel.pack_mode, &channel.data)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::parse_win32;
    use crate::pack::PackMode;
    use crate::time::JstTime;

    fn one_channel_data(channel: ChannelData) -> KwinData {
        KwinData::new(1, 16, 0x2001).with_seconds(vec![SecondBlock {
            start_time: JstTime::epoch(),
            frame_duration: 10,
            channels: vec![channel],
        }])
    }

    #[test]
    fn test_every_pack_mode_roundtrips() {
        let cases = [
            (PackMode::Nibble, vec![5, 6, 4, 5, -2]),
            (PackMode::Int8, vec![0, 100, 0, -100]),
            (PackMode::Int16, vec![0, 20_000, -10_000]),
            (PackMode::Int24, vec![0, 4_000_000, -4_000_000]),
            (PackMode::Int32, vec![0, 100_000_000, -100_000_000]),
        ];
        for (mode, samples) in cases {
            let data = one_channel_data(
                ChannelData::new(1, 16, 0x1101, samples.clone()).with_pack_mode(mode),
            );
            let decoded = parse_win32(&write_win32(&data).unwrap())
                .unwrap_or_else(|e| panic!("{mode}: {e}"));
            let channel = &decoded.seconds[0].channels[0];
            assert_eq!(channel.pack_mode, mode);
            assert_eq!(channel.data, samples, "{mode} container roundtrip");
        }
    }

    #[test]
    fn test_empty_channel() {
        let data = one_channel_data(ChannelData::new(1, 16, 0x1101, vec![]));
        let decoded = parse_win32(&write_win32(&data).unwrap()).unwrap();
        assert!(decoded.seconds[0].channels[0].data.is_empty());
    }

    #[test]
    fn test_oversized_channel_rejected() {
        let data = one_channel_data(ChannelData::new(1, 16, 0x1101, vec![0; 0x1000]));
        assert!(matches!(
            write_win32(&data),
            Err(KwinError::EncodeError(_))
        ));
    }

    #[test]
    fn test_delta_mode_mismatch_rejected() {
        // Deltas of 300 cannot ride in nibble packing
        let data = one_channel_data(
            ChannelData::new(1, 16, 0x1101, vec![0, 300]).with_pack_mode(PackMode::Nibble),
        );
        assert!(write_win32(&data).is_err());
    }

    #[test]
    fn test_non_ascii_station_code_rejected() {
        let info = StationInfo {
            latitude: None,
            longitude: None,
            altitude: None,
            underground_altitude: None,
            station_code: "観測点".to_string(),
            start_time: JstTime::epoch(),
            duration: 0,
            last_fix_time: JstTime::epoch(),
            fix_method: 0,
            geodetic_system: 0,
            station_kind: 0,
            sample_rate: 100,
            component_count: 0,
            redeployed: 0,
            components: vec![],
        };
        let data = KwinData::new(1, 16, 0x2001).with_station_info(info);
        assert!(write_win32(&data).is_err());
    }
}
