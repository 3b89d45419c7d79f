//! Pure Rust Kyoshin WIN32 decoder and realtime strong-motion DSP.
//!
//! Zero `unsafe`, zero C dependencies. Decodes the K-NET / KiK-net WIN32
//! container (BCD geodetic and temporal fields, five differential pack
//! modes, per-channel calibration) and computes realtime JMA seismic
//! intensity and long-period ground motion (SVA) from three-component
//! acceleration streams.
//!
//! # Decoding a container
//!
//! ```
//! use kyoshin_rs::{ChannelData, JstTime, KwinData, SecondBlock, parse_win32, write_win32};
//!
//! // Build a container, write it, then parse the bytes
//! let second = SecondBlock {
//!     start_time: JstTime::epoch(),
//!     frame_duration: 10,
//!     channels: vec![ChannelData::new(0x01, 0x10, 0x1101, vec![100, 102, 99])],
//! };
//! let data = KwinData::new(0x01, 0x10, 0x2001).with_seconds(vec![second]);
//!
//! let bytes = write_win32(&data).unwrap();
//! let decoded = parse_win32(&bytes).unwrap();
//!
//! assert_eq!(decoded.station_id, 0x2001);
//! assert_eq!(decoded.seconds[0].channels[0].data, vec![100, 102, 99]);
//! ```
//!
//! # Realtime intensity
//!
//! ```
//! use kyoshin_rs::{IntensityMeter, Vec3};
//!
//! let mut meter = IntensityMeter::new(100.0);
//! let mut intensity = None;
//! for n in 0..500 {
//!     let t = n as f64 / 100.0;
//!     // 0.8 m/s² shaking at 2 Hz
//!     let a = ((2.0 * std::f64::consts::PI * 2.0 * t).sin() * 0.8) as f32;
//!     intensity = meter.push(Vec3::new(a, a, 0.0));
//! }
//! assert!(intensity.is_some());
//! ```
//!
//! # Long-period ground motion
//!
//! ```
//! use kyoshin_rs::{LpgmCalculator, Vec3};
//!
//! let mut lpgm = LpgmCalculator::new(100.0);
//! for n in 0..1000 {
//!     let t = n as f64 / 100.0;
//!     // 10 gal shaking with a 3 s period
//!     let a = ((2.0 * std::f64::consts::PI * t / 3.0).sin() * 10.0) as f32;
//!     lpgm.update(Vec3::new(a, 0.0, 0.0));
//! }
//! assert!(lpgm.max_sva() > 0.0);
//! assert_eq!(lpgm.sva().len(), 32);
//! ```

pub mod bcd;
pub mod decode;
pub mod delay;
pub mod encode;
pub mod error;
pub mod iir;
pub mod lpgm;
pub mod ops;
pub mod pack;
pub mod pipeline;
pub mod record;
pub mod scaled;
pub mod shindo;
pub mod station;
pub mod time;

pub use delay::BleedingDelayLine;
pub use error::{KwinError, Result};
pub use iir::{BiquadSection, IirFilterGroup, butterworth_highpass_2};
pub use lpgm::{LpgmCalculator, OSCILLATOR_COUNT};
pub use ops::{Vec3, VectorOps};
pub use pack::PackMode;
pub use pipeline::{IntensityMeter, LpgmMeter, StationPipeline};
pub use record::{ChannelData, KwinData, SecondBlock};
pub use scaled::ScaledNumber;
pub use shindo::{GAL_PER_MPS2, ShindoFilter, ShindoParams, jma_intensity};
pub use station::{ComponentUnit, HypocenterInfo, StationComponent, StationInfo, UnitKind};
pub use time::JstTime;

pub use decode::parse_win32;
pub use encode::write_win32;
