// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross

//! The region the reader is currently transmitting in, and where it is in its hop sequence.
use arrayvec::ArrayVec;
use embedded_hal::blocking::delay::DelayUs;
use log::{debug, warn};
use rand_core::RngCore;

use crate::error::{Error, LibraryError};
use crate::protocol::{Device, RegisterBus};
use crate::region::{OffTimeTracker, Region, RegionId, RegulatoryTimers, RfFilter};
use crate::register::{
    LastTxRampDownLoFreqKhz, LastTxRampDownTimeMs, LastTxRampUpLoFreqKhz, LastTxRampUpTimeMs,
    NominalStopTime,
};

/// The longest hop table a region can have.
pub const MAX_CHANNELS: usize = 50;

/// The dwell overshoot assumed before any ramps have been measured.
pub const DEFAULT_HW_OVERSHOOT_MS: u16 = 8;

/// R divider values, indexed by their value in the synthesizer control register.
const R_DIVIDERS: [u32; 8] = [24, 48, 96, 192, 30, 60, 120, 240];

/// Synthesizer settings for an LO frequency.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SynthesizerParams {
    pub frequency_khz: u32,
    pub r_divider_index: u8,
    pub n_divider: u16,
}

/// Channel state for the selected region.
///
/// Created with [`ActiveRegion::new`]; every ramp up uses the *next* channel, and
/// [`update_active_channel`][ActiveRegion::update_active_channel] moves the hop sequence along
/// once the ramp succeeds.
#[derive(Clone, Debug)]
pub struct ActiveRegion {
    region: Region,

    /// The usable channel numbers, empty when every channel is usable.
    usable: ArrayVec<u16, MAX_CHANNELS>,

    tcxo_frequency_khz: u32,

    /// Channel numbers in hop order.
    hop_table: ArrayVec<u16, MAX_CHANNELS>,

    /// The LO frequency of each hop table entry.
    channel_table_khz: ArrayVec<u32, MAX_CHANNELS>,

    active_index: usize,

    hw_overshoot_ms: u16,

    off_time: OffTimeTracker,
}

impl ActiveRegion {
    /// Activate one of the built in regions.
    ///
    /// `rng` shuffles the hop table for regions that hop randomly.
    pub fn new<R: RngCore>(
        region_id: RegionId,
        tcxo_frequency_khz: u32,
        rng: &mut R,
    ) -> Result<Self, LibraryError> {
        let region = Region::by_id(region_id).ok_or_else(|| {
            warn!("No region defined for ID {}", u8::from(region_id));
            LibraryError::BadParamValue("No region defined for the region ID")
        })?;
        Self::with_region(*region, tcxo_frequency_khz, rng)
    }

    /// Activate a custom region definition.
    pub fn with_region<R: RngCore>(
        region: Region,
        tcxo_frequency_khz: u32,
        rng: &mut R,
    ) -> Result<Self, LibraryError> {
        let mut active = Self {
            region,
            usable: ArrayVec::new(),
            tcxo_frequency_khz,
            hop_table: ArrayVec::new(),
            channel_table_khz: ArrayVec::new(),
            active_index: 0,
            hw_overshoot_ms: DEFAULT_HW_OVERSHOOT_MS,
            off_time: OffTimeTracker::default(),
        };
        active.load_region(region, rng)?;
        Ok(active)
    }

    /// Switch to a different built in region, resetting the hop sequence and timing history.
    pub fn set_region<R: RngCore>(
        &mut self,
        region_id: RegionId,
        tcxo_frequency_khz: u32,
        rng: &mut R,
    ) -> Result<(), LibraryError> {
        let region = Region::by_id(region_id)
            .ok_or(LibraryError::BadParamValue("No region defined for the region ID"))?;
        self.tcxo_frequency_khz = tcxo_frequency_khz;
        self.load_region(*region, rng)
    }

    fn load_region<R: RngCore>(&mut self, region: Region, rng: &mut R) -> Result<(), LibraryError> {
        if region.channels.usable.len() > MAX_CHANNELS
            || usize::from(region.channels.count) > MAX_CHANNELS
        {
            return Err(LibraryError::BadParamValue(
                "Hop table length exceeds the maximum channel count",
            ));
        }
        self.region = region;
        self.usable.clear();
        self.usable
            .try_extend_from_slice(region.channels.usable)
            .map_err(|_| LibraryError::BadParamValue("Too many usable channels"))?;
        self.build_channel_table();
        if self.region.channels.random_hop {
            shuffle(&mut self.hop_table, rng);
            self.update_channel_frequencies();
        }
        Ok(())
    }

    /// Fill the hop table in channel order and reset the per-region state.
    fn build_channel_table(&mut self) {
        self.hop_table.clear();
        if self.usable.is_empty() {
            self.hop_table
                .extend(1..=self.region.channels.count.min(MAX_CHANNELS as u16));
        } else {
            self.hop_table.extend(self.usable.iter().copied());
        }
        self.update_channel_frequencies();
        self.active_index = 0;
        self.hw_overshoot_ms = DEFAULT_HW_OVERSHOOT_MS;
        self.off_time.clear();
    }

    fn update_channel_frequencies(&mut self) {
        let channels = self.region.channels;
        self.channel_table_khz.clear();
        self.channel_table_khz.extend(
            self.hop_table
                .iter()
                .map(|channel| channels.channel_khz(*channel)),
        );
    }

    pub fn region(&self) -> &Region {
        &self.region
    }

    pub fn region_id(&self) -> RegionId {
        self.region.id
    }

    pub fn rf_filter(&self) -> RfFilter {
        self.region.rf_filter
    }

    pub fn max_regulatory_tx_power(&self) -> i16 {
        self.region.max_power_cdbm
    }

    pub fn pll_r_divider(&self) -> u32 {
        self.region.pll_divider
    }

    pub fn channel_spacing_khz(&self) -> u32 {
        self.region.channels.spacing_khz
    }

    pub fn tcxo_frequency_khz(&self) -> u32 {
        self.tcxo_frequency_khz
    }

    /// Channel numbers in hop order.
    pub fn hop_table(&self) -> &[u16] {
        &self.hop_table
    }

    pub fn channel_table_size(&self) -> usize {
        self.hop_table.len()
    }

    pub fn active_channel_index(&self) -> usize {
        self.active_index
    }

    /// The hop table index the next ramp will use.
    pub fn next_channel_index(&self) -> usize {
        let next = self.active_index + 1;
        if next >= self.hop_table.len() {
            0
        } else {
            next
        }
    }

    pub fn active_channel_khz(&self) -> u32 {
        self.channel_table_khz
            .get(self.active_index)
            .copied()
            .unwrap_or(0)
    }

    pub fn next_channel_khz(&self) -> u32 {
        self.channel_table_khz
            .get(self.next_channel_index())
            .copied()
            .unwrap_or(0)
    }

    /// Advance the hop sequence by one channel.
    pub fn update_active_channel(&mut self) {
        self.active_index = self.next_channel_index();
    }

    /// The hop table index of a frequency, if it is in the hop table.
    pub fn channel_index(&self, frequency_khz: u32) -> Option<usize> {
        self.channel_table_khz
            .iter()
            .position(|khz| *khz == frequency_khz)
    }

    /// The frequency `offset` channels away from hop table entry `index`.
    ///
    /// For regions with a usable channel list the offset moves through that list rather than the
    /// raw channel plan.
    pub fn adjacent_channel_khz(&self, index: usize, offset: i16) -> Result<u32, LibraryError> {
        let current = *self
            .hop_table
            .get(index)
            .ok_or(LibraryError::BadParamValue("Hop table index out of range"))?;
        let channels = &self.region.channels;
        if self.usable.is_empty() {
            let adjacent = i32::from(current) + i32::from(offset);
            if adjacent > 0 && adjacent <= i32::from(channels.count) {
                Ok(channels.channel_khz(adjacent as u16))
            } else {
                Err(LibraryError::BadParamValue("Adjacent channel out of range"))
            }
        } else {
            let position = self
                .usable
                .iter()
                .position(|channel| *channel == current)
                .ok_or(LibraryError::BadParamValue("Channel is not usable"))?;
            let adjacent = position as isize + offset as isize;
            if adjacent >= 0 && (adjacent as usize) < self.usable.len() {
                Ok(channels.channel_khz(self.usable[adjacent as usize]))
            } else {
                Err(LibraryError::BadParamValue("Adjacent channel out of range"))
            }
        }
    }

    /// The synthesizer N divider for `frequency_khz` with R divider `r_divider`.
    pub fn calculate_n_divider(&self, frequency_khz: u32, r_divider: u32) -> u16 {
        if self.tcxo_frequency_khz == 0 {
            return 0;
        }
        let numerator = 4 * u64::from(frequency_khz) * u64::from(r_divider)
            + u64::from(self.tcxo_frequency_khz / 2);
        (numerator / u64::from(self.tcxo_frequency_khz)) as u16
    }

    /// The register index of an R divider value.
    pub fn r_divider_index(r_divider: u32) -> Option<u8> {
        R_DIVIDERS
            .iter()
            .position(|value| *value == r_divider)
            .map(|index| index as u8)
    }

    /// Synthesizer settings for `frequency_khz` using the region's R divider.
    pub fn synthesizer_params(&self, frequency_khz: u32) -> Result<SynthesizerParams, LibraryError> {
        let r_divider = self.pll_r_divider();
        let r_divider_index = Self::r_divider_index(r_divider).ok_or_else(|| {
            warn!("Unknown R divider value {}", r_divider);
            LibraryError::BadParamValue("Unknown R divider")
        })?;
        Ok(SynthesizerParams {
            frequency_khz,
            r_divider_index,
            n_divider: self.calculate_n_divider(frequency_khz, r_divider),
        })
    }

    /// The LO frequency produced by a pair of synthesizer settings.
    pub fn synthesizer_frequency_khz(
        &self,
        r_divider_index: u8,
        n_divider: u16,
    ) -> Result<u32, LibraryError> {
        let r_divider = R_DIVIDERS
            .get(usize::from(r_divider_index))
            .ok_or(LibraryError::BadParamValue("R divider index out of range"))?;
        let numerator = u64::from(self.tcxo_frequency_khz) * u64::from(n_divider);
        Ok((numerator / (4 * u64::from(*r_divider))) as u32)
    }

    /// Transmit on a single frequency, for testing.
    ///
    /// The hop table becomes the one channel containing `frequency_khz`.
    pub fn set_single_frequency(&mut self, frequency_khz: u32) {
        let channel = self.region.channels.channel_number(frequency_khz);
        self.usable.clear();
        self.usable.push(channel);
        self.region.channels.count = 1;
        self.region.channels.random_hop = false;
        self.build_channel_table();
    }

    /// Zero the dwell timers so the transmitter can stay on indefinitely.
    pub fn disable_regulatory_timers(&mut self) {
        self.region.regulatory_timers = RegulatoryTimers::DISABLED;
        self.off_time.clear();
    }

    /// Restore the region's default dwell timers.
    ///
    /// Custom regions have no defaults to return to, so they are left as is.
    pub fn reenable_regulatory_timers(&mut self) {
        match Region::by_id(self.region.id) {
            Some(defaults) => {
                self.region.regulatory_timers = defaults.regulatory_timers;
                self.off_time.clear();
            }
            None => warn!("No default regulatory timers for region {:?}", self.region.id),
        }
    }

    /// The learned difference between the nominal dwell time and how long the device stays on.
    pub fn hw_overshoot_ms(&self) -> u16 {
        self.hw_overshoot_ms
    }

    /// Shorten the nominal dwell time by the learned overshoot.
    ///
    /// Zero (disabled) timers are left alone, and the nominal time never drops below 1 ms.
    pub fn compensate_timer_overshoot(&self, mut timers: RegulatoryTimers) -> RegulatoryTimers {
        if timers.nominal_ms == 0 {
            return timers;
        }
        if self.hw_overshoot_ms < timers.nominal_ms {
            timers.nominal_ms -= self.hw_overshoot_ms;
        } else {
            timers.nominal_ms = 1;
        }
        timers
    }

    /// Update the learned overshoot from a completed ramp.
    ///
    /// The times are the device's millisecond counter, which wraps at `u32::MAX / 1000`.
    /// `nominal_ms` is the nominal dwell time the device was using.
    pub fn record_ramp_timing(&mut self, ramp_up_ms: u32, ramp_down_ms: u32, nominal_ms: u16) {
        let total_on_ms = if ramp_down_ms < ramp_up_ms {
            (u32::MAX / 1000 - ramp_up_ms).wrapping_add(ramp_down_ms)
        } else {
            ramp_down_ms - ramp_up_ms
        };
        let expected_ms = u32::from(nominal_ms) + u32::from(self.hw_overshoot_ms);
        let overshoot = if total_on_ms >= expected_ms {
            u32::from(self.hw_overshoot_ms) + (total_on_ms - expected_ms)
        } else {
            u32::from(self.hw_overshoot_ms).saturating_sub(expected_ms - total_on_ms)
        };
        self.hw_overshoot_ms = overshoot.min(u32::from(u16::MAX)) as u16;
        debug!(
            "Ramp was on for {} ms, overshoot is now {} ms",
            total_on_ms, self.hw_overshoot_ms
        );
    }

    /// The timers for hop table entry `index` at device time `time_ms`.
    pub fn regulatory_timers_at(&self, index: usize, time_ms: u32) -> RegulatoryTimers {
        let defaults = self.region.regulatory_timers;
        let timers = if self.region.tracks_off_time {
            self.off_time.timers(index, time_ms, &defaults)
        } else {
            defaults
        };
        self.compensate_timer_overshoot(timers)
    }

    /// Record the transmitter turning on for the active channel.
    pub fn regulatory_timer_set_start(&mut self, time_ms: u32) {
        self.track_start(self.active_index, time_ms);
    }

    /// Record the transmitter turning off for the active channel.
    pub fn regulatory_timer_set_end(&mut self, time_ms: u32) {
        self.track_end(self.active_index, time_ms);
    }

    fn track_start(&mut self, index: usize, time_ms: u32) {
        if self.region.tracks_off_time {
            let timers = self.region.regulatory_timers;
            self.off_time.set_start(index, time_ms, &timers);
        }
    }

    fn track_end(&mut self, index: usize, time_ms: u32) {
        if self.region.tracks_off_time {
            self.off_time.set_end(index, time_ms);
        }
    }

    /// The per-channel on time history.
    pub fn off_time(&self) -> &OffTimeTracker {
        &self.off_time
    }

    /// The timers for the next channel, using the device's clock.
    pub fn next_channel_regulatory_timers<B, D>(
        &self,
        device: &mut Device<B, D>,
    ) -> Result<RegulatoryTimers, Error<B>>
    where
        B: RegisterBus,
        D: DelayUs<u32>,
    {
        let time_ms = device.timestamp_us()? / 1000;
        Ok(self.regulatory_timers_at(self.next_channel_index(), time_ms))
    }

    /// The timers for the active channel, using the device's clock.
    pub fn regulatory_timers<B, D>(
        &self,
        device: &mut Device<B, D>,
    ) -> Result<RegulatoryTimers, Error<B>>
    where
        B: RegisterBus,
        D: DelayUs<u32>,
    {
        let time_ms = device.timestamp_us()? / 1000;
        Ok(self.regulatory_timers_at(self.active_index, time_ms))
    }

    /// Learn from the last ramp's timing.
    ///
    /// Only call this after a ramp down caused by the nominal timer; early ramp downs would
    /// teach the wrong overshoot.
    pub fn update_timer_overshoot<B, D>(&mut self, device: &mut Device<B, D>) -> Result<(), Error<B>>
    where
        B: RegisterBus,
        D: DelayUs<u32>,
    {
        let ramp_up: LastTxRampUpTimeMs = device.read_register()?;
        let ramp_down: LastTxRampDownTimeMs = device.read_register()?;
        let nominal: NominalStopTime = device.read_register()?;
        self.record_ramp_timing(ramp_up.time_ms(), ramp_down.time_ms(), nominal.dwell_time_ms());
        Ok(())
    }

    /// Feed the device's record of the last ramp into the off time tracking.
    ///
    /// Nothing is recorded unless both ramp frequencies are in the hop table.
    pub fn update_channel_time_tracking<B, D>(
        &mut self,
        device: &mut Device<B, D>,
    ) -> Result<(), Error<B>>
    where
        B: RegisterBus,
        D: DelayUs<u32>,
    {
        let up_time: LastTxRampUpTimeMs = device.read_register()?;
        let up_khz: LastTxRampUpLoFreqKhz = device.read_register()?;
        let down_time: LastTxRampDownTimeMs = device.read_register()?;
        let down_khz: LastTxRampDownLoFreqKhz = device.read_register()?;

        let up_index = self.channel_index(up_khz.frequency_khz());
        let down_index = self.channel_index(down_khz.frequency_khz());
        if let (Some(up_index), Some(down_index)) = (up_index, down_index) {
            self.track_start(up_index, up_time.time_ms());
            self.track_end(down_index, down_time.time_ms());
        }
        Ok(())
    }
}

/// Swap each entry with a random pick from the first `count - index` entries.
fn shuffle<R: RngCore>(deck: &mut [u16], rng: &mut R) {
    let count = deck.len();
    for index in 0..count {
        let pick = (rng.next_u32() % (count - index) as u32) as usize;
        deck.swap(index, pick);
    }
}

#[cfg(test)]
mod test {
    extern crate alloc;

    use alloc::vec::Vec;

    use crate::protocol::Device;
    use crate::region::{Region, RegionId, RegulatoryTimers, RfFilter};
    use crate::register::*;
    use crate::test::{CountingRng, MockDelay, MockDevice};

    use super::{ActiveRegion, SynthesizerParams, DEFAULT_HW_OVERSHOOT_MS};

    fn etsi() -> ActiveRegion {
        ActiveRegion::new(RegionId::EtsiLower, 24_000, &mut CountingRng(0)).unwrap()
    }

    #[test]
    fn unknown_region() {
        assert!(ActiveRegion::new(RegionId::Korea, 24_000, &mut CountingRng(0)).is_err());
        let mut active = etsi();
        assert!(active
            .set_region(RegionId::NotDefined, 24_000, &mut CountingRng(0))
            .is_err());
        // A failed switch leaves the old region in place
        assert_eq!(active.region_id(), RegionId::EtsiLower);
    }

    #[test]
    fn linear_hop_table() {
        let active = etsi();
        assert_eq!(active.hop_table(), &[4, 7, 10, 13]);
        assert_eq!(active.channel_table_size(), 4);
        assert_eq!(active.rf_filter(), RfFilter::LowerBand);
        assert_eq!(active.active_channel_khz(), 865_700);
        assert_eq!(active.next_channel_khz(), 866_300);
    }

    #[test]
    fn channel_advance_wraps() {
        let mut active = etsi();
        for expected in [1, 2, 3, 0, 1] {
            active.update_active_channel();
            assert_eq!(active.active_channel_index(), expected);
        }
        assert_eq!(active.next_channel_index(), 2);
    }

    #[test]
    fn random_hop_is_a_permutation() {
        let active = ActiveRegion::new(RegionId::Fcc, 24_000, &mut CountingRng(7)).unwrap();
        let mut channels: Vec<u16> = active.hop_table().to_vec();
        channels.sort_unstable();
        assert_eq!(channels, (1..=50).collect::<Vec<u16>>());
        // The frequency table follows the shuffled order
        let first = active.hop_table()[0];
        assert_eq!(active.active_channel_khz(), 902_750 + (u32::from(first) - 1) * 500);
    }

    #[test]
    fn shuffle_order() {
        // With a counter the picks are 1 % 4, 2 % 3, 3 % 2, 4 % 1
        let mut deck = [1u16, 2, 3, 4];
        super::shuffle(&mut deck, &mut CountingRng(0));
        assert_eq!(deck, [4, 1, 3, 2]);
    }

    #[test]
    fn channel_lookup() {
        let active = etsi();
        assert_eq!(active.channel_index(866_900), Some(2));
        assert_eq!(active.channel_index(866_000), None);
    }

    #[test]
    fn adjacent_channels() {
        let etsi = etsi();
        assert_eq!(etsi.adjacent_channel_khz(1, 1), Ok(866_900));
        assert_eq!(etsi.adjacent_channel_khz(1, -1), Ok(865_700));
        assert!(etsi.adjacent_channel_khz(3, 1).is_err());
        assert!(etsi.adjacent_channel_khz(9, 0).is_err());

        let philippines =
            ActiveRegion::new(RegionId::Philippines, 24_000, &mut CountingRng(0)).unwrap();
        assert_eq!(philippines.hop_table(), &[1, 2, 3, 4]);
        assert_eq!(philippines.adjacent_channel_khz(0, 3), Ok(919_750));
        assert!(philippines.adjacent_channel_khz(0, -1).is_err());
        assert!(philippines.adjacent_channel_khz(3, 1).is_err());
    }

    #[test]
    fn synthesizer_dividers() {
        let etsi = etsi();
        // (4 * 865700 * 120 + 12000) / 24000
        assert_eq!(
            etsi.synthesizer_params(865_700),
            Ok(SynthesizerParams {
                frequency_khz: 865_700,
                r_divider_index: 6,
                n_divider: 17314,
            })
        );
        assert_eq!(etsi.synthesizer_frequency_khz(6, 17314), Ok(865_700));
        assert!(etsi.synthesizer_frequency_khz(8, 17314).is_err());
        assert_eq!(ActiveRegion::r_divider_index(48), Some(1));
        assert_eq!(ActiveRegion::r_divider_index(50), None);
    }

    #[test]
    fn bad_r_divider() {
        let mut region = *Region::by_id(RegionId::Philippines).unwrap();
        region.pll_divider = 100;
        let active = ActiveRegion::with_region(region, 24_000, &mut CountingRng(0)).unwrap();
        assert!(active.synthesizer_params(918_250).is_err());
    }

    #[test]
    fn single_frequency() {
        let mut active = etsi();
        active.update_active_channel();
        active.set_single_frequency(866_900);
        assert_eq!(active.hop_table(), &[10]);
        assert_eq!(active.active_channel_index(), 0);
        assert_eq!(active.next_channel_khz(), 866_900);
        active.update_active_channel();
        assert_eq!(active.active_channel_khz(), 866_900);
    }

    #[test]
    fn overshoot_compensation() {
        let mut active = etsi();
        assert_eq!(active.hw_overshoot_ms(), DEFAULT_HW_OVERSHOOT_MS);
        let timers = active.regulatory_timers_at(0, 0);
        assert_eq!(timers.nominal_ms, 3792);
        assert_eq!(timers.extended_ms, 3980);

        // On for 3810 ms against an expected 3800 + 8
        active.record_ramp_timing(1000, 4810, 3800);
        assert_eq!(active.hw_overshoot_ms(), 10);
        // On for 3803 ms against an expected 3810
        active.record_ramp_timing(1000, 4803, 3800);
        assert_eq!(active.hw_overshoot_ms(), 3);
        // Ramped down early, overshoot bottoms out
        active.record_ramp_timing(1000, 2000, 3800);
        assert_eq!(active.hw_overshoot_ms(), 0);
    }

    #[test]
    fn overshoot_counter_rollover() {
        let mut active = etsi();
        let max_ms = u32::MAX / 1000;
        // 3 ms before the rollover through 3805 ms after
        active.record_ramp_timing(max_ms - 3, 3805, 3800);
        assert_eq!(active.hw_overshoot_ms(), 8);
    }

    #[test]
    fn overshoot_never_zeroes_nominal() {
        let mut active = etsi();
        active.record_ramp_timing(0, 9000, 3800);
        assert_eq!(active.regulatory_timers_at(0, 0).nominal_ms, 1);
    }

    #[test]
    fn disabled_timers() {
        let mut active = etsi();
        active.disable_regulatory_timers();
        assert_eq!(active.regulatory_timers_at(0, 0), RegulatoryTimers::DISABLED);
        active.reenable_regulatory_timers();
        assert_eq!(active.regulatory_timers_at(0, 0).regulatory_ms, 4000);
    }

    #[test]
    fn off_time_tracked_per_channel() {
        let mut active = etsi();
        active.update_active_channel();
        active.regulatory_timer_set_start(1000);
        active.regulatory_timer_set_end(4800);
        // Hop index 1 is owed the rest of its off time, others are not.
        assert_eq!(active.regulatory_timers_at(1, 4850).off_same_channel_ms, 50);
        assert_eq!(active.regulatory_timers_at(2, 4850).off_same_channel_ms, 0);
    }

    #[test]
    fn untracked_region_keeps_off_time() {
        let mut active = ActiveRegion::new(RegionId::Russia, 24_000, &mut CountingRng(0)).unwrap();
        active.regulatory_timer_set_start(0);
        active.regulatory_timer_set_end(4000);
        assert_eq!(active.off_time().total_ms(0), 0);
        assert_eq!(active.regulatory_timers_at(0, 4010).off_same_channel_ms, 100);
    }

    #[test]
    fn device_timers_use_timestamp() {
        let mut device = Device::new(MockDevice::new(), MockDelay);
        device.write_register(&Timestamp::new(4_850_000)).unwrap();
        let mut active = etsi();
        active.regulatory_timer_set_start(1000);
        active.regulatory_timer_set_end(4800);
        let timers = active.regulatory_timers(&mut device).unwrap();
        assert_eq!(timers.off_same_channel_ms, 50);
        let next = active.next_channel_regulatory_timers(&mut device).unwrap();
        assert_eq!(next.off_same_channel_ms, 0);
        assert_eq!(next.nominal_ms, 3792);
    }

    #[test]
    fn device_ramp_history() {
        let mut device = Device::new(MockDevice::new(), MockDelay);
        device.write_register(&LastTxRampUpTimeMs::new(1000)).unwrap();
        device
            .write_register(&LastTxRampUpLoFreqKhz::new(866_300))
            .unwrap();
        device.write_register(&LastTxRampDownTimeMs::new(4810)).unwrap();
        device
            .write_register(&LastTxRampDownLoFreqKhz::new(866_300))
            .unwrap();
        device.write_register(&NominalStopTime::new(3800)).unwrap();

        let mut active = etsi();
        active.update_channel_time_tracking(&mut device).unwrap();
        assert_eq!(active.off_time().total_ms(1), 3810);
        active.update_timer_overshoot(&mut device).unwrap();
        assert_eq!(active.hw_overshoot_ms(), 10);

        // Frequencies outside the hop table are ignored
        device
            .write_register(&LastTxRampUpLoFreqKhz::new(915_000))
            .unwrap();
        let mut fresh = etsi();
        fresh.update_channel_time_tracking(&mut device).unwrap();
        assert_eq!(fresh.off_time().total_ms(1), 0);
    }
}
