//! Per-station realtime processing pipelines.
//!
//! Wires the decoder output through the DSP chain: digital counts →
//! physical acceleration → intensity weighting → exceedance window → JMA
//! intensity, with the long-period oscillator bank running in parallel.
//! One pipeline per station; samples must arrive in time order.

use crate::delay::BleedingDelayLine;
use crate::lpgm::{LpgmCalculator, OSCILLATOR_COUNT};
use crate::ops::{Vec3, VectorOps};
use crate::record::SecondBlock;
use crate::shindo::{GAL_PER_MPS2, ShindoFilter, jma_intensity};
use crate::station::{StationComponent, StationInfo};
use crate::{KwinError, Result};

/// Sliding-window length for both meters, seconds.
const WINDOW_S: f64 = 60.0;
/// Exceedance span of the intensity statistic, seconds.
const BLEED_S: f64 = 0.3;
/// Samples to discard while the intensity filter's start-up transient
/// decays. Policy of this pipeline, not of the filter itself.
pub const SHINDO_WARMUP_SAMPLES: u64 = 70;

/// Realtime JMA intensity from a stream of acceleration samples.
#[derive(Debug, Clone)]
pub struct IntensityMeter {
    filter: ShindoFilter<Vec3>,
    window: BleedingDelayLine<f64>,
    seen: u64,
}

impl IntensityMeter {
    pub fn new(sample_rate: f64) -> Self {
        assert!(sample_rate > 0.0, "sample rate must be positive");
        let duration = ((WINDOW_S * sample_rate).round() as usize).max(1);
        let bleeding = (((BLEED_S * sample_rate).round() as usize).max(1)).min(duration);
        Self {
            filter: ShindoFilter::new(1.0 / sample_rate),
            window: BleedingDelayLine::new(duration, bleeding, 0.0),
            seen: 0,
        }
    }

    /// Feed one acceleration sample in m/s²; returns the current intensity
    /// as from [`intensity`](Self::intensity).
    pub fn push(&mut self, accel_mps2: Vec3) -> Option<f64> {
        let weighted = self.filter.update(accel_mps2);
        self.window.add(weighted.magnitude() * GAL_PER_MPS2);
        self.seen += 1;
        self.intensity()
    }

    /// Current JMA intensity; `None` during warm-up or while the window
    /// statistic is non-positive.
    pub fn intensity(&self) -> Option<f64> {
        if self.seen < SHINDO_WARMUP_SAMPLES {
            return None;
        }
        let peak = self.window.computed_value();
        (peak > 0.0).then(|| jma_intensity(peak))
    }
}

/// Realtime long-period ground motion with a peak-hold window.
#[derive(Debug, Clone)]
pub struct LpgmMeter {
    calculator: LpgmCalculator,
    peak: BleedingDelayLine<f64>,
}

impl LpgmMeter {
    pub fn new(sample_rate: f64) -> Self {
        let duration = ((WINDOW_S * sample_rate).round() as usize).max(1);
        Self {
            calculator: LpgmCalculator::new(sample_rate),
            peak: BleedingDelayLine::new(duration, 1, 0.0),
        }
    }

    /// Feed one acceleration sample in gal.
    pub fn push(&mut self, accel_gal: Vec3) {
        self.calculator.update(accel_gal);
        self.peak.add(self.calculator.max_sva());
    }

    /// Maximum SVA held over the sliding window (cm/s when fed gal).
    pub fn held_max_sva(&self) -> f64 {
        self.peak.computed_value()
    }

    pub fn calculator(&self) -> &LpgmCalculator {
        &self.calculator
    }
}

/// Complete per-station pipeline over decoded WIN32 data.
///
/// The first three station components are taken as NS, EW, UD, matching
/// the channel ordering of the second blocks.
#[derive(Debug, Clone)]
pub struct StationPipeline {
    components: [StationComponent; 3],
    intensity: IntensityMeter,
    lpgm: LpgmMeter,
}

impl StationPipeline {
    pub fn new(info: &StationInfo) -> Result<Self> {
        if info.components.len() < 3 {
            return Err(KwinError::MissingComponents(info.components.len()));
        }
        if info.sample_rate == 0 {
            return Err(KwinError::ZeroSampleRate);
        }
        let rate = f64::from(info.sample_rate);
        Ok(Self {
            components: [info.components[0], info.components[1], info.components[2]],
            intensity: IntensityMeter::new(rate),
            lpgm: LpgmMeter::new(rate),
        })
    }

    /// Feed one (NS, EW, UD) digital sample triple.
    pub fn push(&mut self, ns: i32, ew: i32, ud: i32) {
        let si = |c: &StationComponent, d: i32| (c.to_physical(d) * c.unit.factor()) as f32;
        let accel = Vec3::new(
            si(&self.components[0], ns),
            si(&self.components[1], ew),
            si(&self.components[2], ud),
        );
        self.intensity.push(accel);
        self.lpgm.push(Vec3::scale(GAL_PER_MPS2, accel));
    }

    /// Consume one decoded second block, matching channels to the station
    /// components by channel id. Returns how many sample triples were fed;
    /// zero when a component's channel is missing from the block.
    pub fn process_second(&mut self, second: &SecondBlock) -> usize {
        let find = |id: u16| second.channels.iter().find(|c| c.channel_id == id);
        let (Some(ns), Some(ew), Some(ud)) = (
            find(self.components[0].channel_id),
            find(self.components[1].channel_id),
            find(self.components[2].channel_id),
        ) else {
            return 0;
        };
        let n = ns.data.len().min(ew.data.len()).min(ud.data.len());
        for i in 0..n {
            self.push(ns.data[i], ew.data[i], ud.data[i]);
        }
        n
    }

    /// Current JMA intensity, if past warm-up.
    pub fn intensity(&self) -> Option<f64> {
        self.intensity.intensity()
    }

    /// Last baseline-filtered acceleration of the long-period branch, gal.
    pub fn filtered_acceleration(&self) -> Vec3 {
        self.lpgm.calculator().filtered_acceleration()
    }

    /// Integrated ground velocity of the long-period branch, cm/s.
    pub fn velocity(&self) -> Vec3 {
        self.lpgm.calculator().velocity()
    }

    /// Current per-period spectral velocities, cm/s.
    pub fn sva(&self) -> &[f64; OSCILLATOR_COUNT] {
        self.lpgm.calculator().sva()
    }

    /// Instantaneous maximum SVA, cm/s.
    pub fn max_sva(&self) -> f64 {
        self.lpgm.calculator().max_sva()
    }

    /// Peak-held long-period indicator over the sliding window, cm/s.
    pub fn long_period_indicator(&self) -> f64 {
        self.lpgm.held_max_sva()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::station::{ComponentUnit, UnitKind};
    use crate::time::JstTime;
    use std::f64::consts::PI;

    fn unit_component(channel_id: u16) -> StationComponent {
        StationComponent {
            organization: 1,
            network: 16,
            channel_id,
            scale_numerator: 1,
            gain: 1,
            unit: ComponentUnit::new(6, UnitKind::MeterPerSecondSquared),
            scale_denominator: 1,
            offset: 0,
            measurement_range: 1 << 23,
        }
    }

    fn station(sample_rate: u16, components: Vec<StationComponent>) -> StationInfo {
        StationInfo {
            latitude: None,
            longitude: None,
            altitude: None,
            underground_altitude: None,
            station_code: "TEST".to_string(),
            start_time: JstTime::epoch(),
            duration: 600,
            last_fix_time: JstTime::epoch(),
            fix_method: 0,
            geodetic_system: 0,
            station_kind: 0,
            sample_rate,
            component_count: components.len() as u8,
            redeployed: 0,
            components,
        }
    }

    fn three_components() -> Vec<StationComponent> {
        vec![
            unit_component(0x1101),
            unit_component(0x1102),
            unit_component(0x1103),
        ]
    }

    #[test]
    fn test_too_few_components_rejected() {
        let info = station(100, vec![unit_component(0x1101)]);
        assert!(matches!(
            StationPipeline::new(&info),
            Err(KwinError::MissingComponents(1))
        ));
    }

    #[test]
    fn test_zero_sample_rate_rejected() {
        let info = station(0, three_components());
        assert!(matches!(
            StationPipeline::new(&info),
            Err(KwinError::ZeroSampleRate)
        ));
    }

    #[test]
    fn test_no_intensity_before_warmup() {
        let mut meter = IntensityMeter::new(100.0);
        for _ in 0..(SHINDO_WARMUP_SAMPLES - 1) {
            assert_eq!(meter.push(Vec3::new(1.0, 0.0, 0.0)), None);
        }
    }

    #[test]
    fn test_silence_yields_no_intensity() {
        let mut meter = IntensityMeter::new(100.0);
        let mut last = None;
        for _ in 0..500 {
            last = meter.push(Vec3::ZERO);
        }
        assert_eq!(last, None);
    }

    #[test]
    fn test_strong_shaking_yields_plausible_intensity() {
        let mut meter = IntensityMeter::new(100.0);
        let mut last = None;
        for n in 0..2000 {
            let t = n as f64 / 100.0;
            // 1 m/s² (100 gal) shaking at 2 Hz
            let a = (2.0 * PI * 2.0 * t).sin() as f32;
            last = meter.push(Vec3::new(a, a, 0.0));
        }
        let intensity = last.expect("intensity after warm-up");
        assert!(
            (2.0..7.0).contains(&intensity),
            "implausible intensity {intensity}"
        );
    }

    #[test]
    fn test_pipeline_end_to_end() {
        let info = station(100, three_components());
        let mut pipeline = StationPipeline::new(&info).unwrap();
        // Unit scaling is 10^-6 m/s² per count, so 1e6 counts = 1 m/s²
        for n in 0..1000 {
            let t = n as f64 / 100.0;
            let a = ((2.0 * PI * t / 2.0).sin() * 1.0e6) as i32;
            pipeline.push(a, a / 2, -a);
        }
        assert!(pipeline.intensity().is_some());
        assert!(pipeline.max_sva() > 0.0);
        assert!(pipeline.long_period_indicator() >= pipeline.max_sva());
        assert!(pipeline.filtered_acceleration().magnitude().is_finite());
        assert!(pipeline.velocity().magnitude().is_finite());
        assert_eq!(pipeline.sva().len(), OSCILLATOR_COUNT);
    }

    #[test]
    fn test_process_second_matches_channels_by_id() {
        use crate::record::ChannelData;

        let info = station(100, three_components());
        let mut pipeline = StationPipeline::new(&info).unwrap();
        let second = SecondBlock {
            start_time: JstTime::epoch(),
            frame_duration: 10,
            // Shuffled channel order still maps by id
            channels: vec![
                ChannelData::new(1, 16, 0x1103, vec![0; 100]),
                ChannelData::new(1, 16, 0x1101, vec![1000; 100]),
                ChannelData::new(1, 16, 0x1102, vec![500; 100]),
            ],
        };
        assert_eq!(pipeline.process_second(&second), 100);

        let missing = SecondBlock {
            start_time: JstTime::epoch(),
            frame_duration: 10,
            channels: vec![ChannelData::new(1, 16, 0x1101, vec![0; 100])],
        };
        assert_eq!(pipeline.process_second(&missing), 0);
    }
}
