// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross

//! Regulatory region definitions.
//!
//! A [`Region`] describes the channel plan and dwell limits a reader has to obey. Regions that
//! require the transmitter to stay off a channel for a while after using it (ETSI lower band) also
//! carry an [`OffTimeTracker`] in the active region, which shortens the dwell timers handed to the
//! device when a channel has already used part of its budget.
use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Numeric region identifiers.
#[derive(Clone, Copy, Debug, Eq, PartialEq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum RegionId {
    Fcc = 0,
    Hk = 3,
    Taiwan = 4,
    EtsiLower = 7,
    Korea = 8,
    Malaysia = 9,
    China = 10,
    SouthAfrica = 12,
    Brazil = 13,
    Thailand = 14,
    Singapore = 15,
    Australia = 16,
    India = 17,
    Uruguay = 18,
    Vietnam = 19,
    Israel = 20,
    Philippines = 21,
    Indonesia = 23,
    NewZealand = 24,
    Japan916921Mhz = 25,
    Peru = 27,
    EtsiUpper = 29,
    Russia = 100,
    Custom = 254,
    NotDefined = 255,
}

/// The RF filter a region's channels pass through.
#[derive(Clone, Copy, Debug, Eq, PartialEq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum RfFilter {
    Undefined = 0,
    /// 865 to 868 MHz.
    LowerBand = 1,
    /// 900 to 930 MHz.
    UpperBand = 2,
}

impl Default for RfFilter {
    fn default() -> Self {
        Self::Undefined
    }
}

/// Dwell limits for a single transmission, in milliseconds.
///
/// A zero nominal time disables the device's dwell timers.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct RegulatoryTimers {
    /// When the device starts ramping down.
    pub nominal_ms: u16,

    /// When the device ramps down if an inventory round is still finishing.
    pub extended_ms: u16,

    /// The hard regulatory limit.
    pub regulatory_ms: u16,

    /// How long the transmitter must stay off before reusing the same channel.
    pub off_same_channel_ms: u16,
}

impl RegulatoryTimers {
    /// Timers that let the transmitter stay on indefinitely.
    pub const DISABLED: Self = Self {
        nominal_ms: 0,
        extended_ms: 0,
        regulatory_ms: 0,
        off_same_channel_ms: 0,
    };
}

/// The channel plan of a region.
///
/// Channels are numbered from 1, with channel 1 at `start_freq_khz`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RegulatoryChannels {
    pub start_freq_khz: u32,
    pub spacing_khz: u32,

    /// The number of channels used by the region.
    pub count: u16,

    /// The channel numbers that may be used. Empty when every channel from 1 through `count` is
    /// usable.
    pub usable: &'static [u16],

    /// Whether the hop table is shuffled.
    pub random_hop: bool,
}

impl RegulatoryChannels {
    /// The LO frequency of a channel number.
    pub fn channel_khz(&self, channel: u16) -> u32 {
        self.start_freq_khz + u32::from(channel.saturating_sub(1)) * self.spacing_khz
    }

    /// The channel number a frequency falls in.
    pub fn channel_number(&self, frequency_khz: u32) -> u16 {
        if self.spacing_khz == 0 {
            return 0;
        }
        let offset = frequency_khz.saturating_sub(self.start_freq_khz);
        (offset / self.spacing_khz + 1) as u16
    }
}

/// Everything needed to transmit within a regulatory region.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Region {
    pub id: RegionId,
    pub regulatory_timers: RegulatoryTimers,
    pub channels: RegulatoryChannels,

    /// The synthesizer R divider, not its register index.
    pub pll_divider: u32,
    pub rf_filter: RfFilter,
    pub max_power_cdbm: i16,

    /// Whether per-channel on time is tracked to enforce `off_same_channel_ms`.
    ///
    /// Regions that don't track simply request the full off time before every ramp.
    pub tracks_off_time: bool,
}

impl Region {
    /// Look up one of the built in regions.
    pub fn by_id(id: RegionId) -> Option<&'static Region> {
        REGIONS.iter().find(|region| region.id == id)
    }
}

static BRAZIL_USABLE_CHANNELS: [u16; 35] = [
    1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 26, 27, 28, 29, 30, 31, 32, 33, 34, 35, 36, 37, 38, 39, 40, 41,
    42, 43, 44, 45, 46, 47, 48, 49, 50,
];

static ETSI_LOWER_USABLE_CHANNELS: [u16; 4] = [4, 7, 10, 13];

static RUSSIA_USABLE_CHANNELS: [u16; 4] = [1, 2, 3, 4];

/// The built in regions.
pub static REGIONS: [Region; 5] = [
    Region {
        id: RegionId::Fcc,
        regulatory_timers: RegulatoryTimers {
            nominal_ms: 380,
            extended_ms: 395,
            regulatory_ms: 400,
            off_same_channel_ms: 0,
        },
        channels: RegulatoryChannels {
            start_freq_khz: 902_750,
            spacing_khz: 500,
            count: 50,
            usable: &[],
            random_hop: true,
        },
        pll_divider: 48,
        rf_filter: RfFilter::UpperBand,
        max_power_cdbm: 3000,
        tracks_off_time: false,
    },
    Region {
        id: RegionId::EtsiLower,
        regulatory_timers: RegulatoryTimers {
            nominal_ms: 3800,
            extended_ms: 3980,
            regulatory_ms: 4000,
            off_same_channel_ms: 100,
        },
        channels: RegulatoryChannels {
            start_freq_khz: 865_100,
            spacing_khz: 200,
            count: 4,
            usable: &ETSI_LOWER_USABLE_CHANNELS,
            random_hop: false,
        },
        pll_divider: 120,
        rf_filter: RfFilter::LowerBand,
        max_power_cdbm: 3000,
        tracks_off_time: true,
    },
    Region {
        id: RegionId::Brazil,
        regulatory_timers: RegulatoryTimers {
            nominal_ms: 200,
            extended_ms: 380,
            regulatory_ms: 400,
            off_same_channel_ms: 0,
        },
        channels: RegulatoryChannels {
            start_freq_khz: 902_750,
            spacing_khz: 500,
            count: 35,
            usable: &BRAZIL_USABLE_CHANNELS,
            random_hop: true,
        },
        pll_divider: 24,
        rf_filter: RfFilter::UpperBand,
        max_power_cdbm: 3000,
        tracks_off_time: false,
    },
    Region {
        id: RegionId::Philippines,
        regulatory_timers: RegulatoryTimers {
            nominal_ms: 3800,
            extended_ms: 3980,
            regulatory_ms: 4000,
            off_same_channel_ms: 0,
        },
        channels: RegulatoryChannels {
            start_freq_khz: 918_250,
            spacing_khz: 500,
            count: 4,
            usable: &[],
            random_hop: false,
        },
        pll_divider: 24,
        rf_filter: RfFilter::UpperBand,
        max_power_cdbm: 3000,
        tracks_off_time: false,
    },
    Region {
        id: RegionId::Russia,
        regulatory_timers: RegulatoryTimers {
            nominal_ms: 3800,
            extended_ms: 3980,
            regulatory_ms: 4000,
            off_same_channel_ms: 100,
        },
        channels: RegulatoryChannels {
            start_freq_khz: 916_200,
            spacing_khz: 1200,
            count: 4,
            usable: &RUSSIA_USABLE_CHANNELS,
            random_hop: false,
        },
        pll_divider: 60,
        rf_filter: RfFilter::UpperBand,
        max_power_cdbm: 3000,
        tracks_off_time: false,
    },
];

/// The most hop table entries that on time is tracked for.
pub const MAX_TRACKED_CHANNELS: usize = 4;

/// Per-channel on time bookkeeping, indexed by hop table position.
///
/// All times are device milliseconds and wrap the same way the device's counter does.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct OffTimeTracker {
    last_start: [u32; MAX_TRACKED_CHANNELS],
    last_end: [u32; MAX_TRACKED_CHANNELS],
    total: [u32; MAX_TRACKED_CHANNELS],
}

impl OffTimeTracker {
    /// Record the transmitter turning on at `time_ms`.
    ///
    /// If the channel wasn't left off for the full off time, the gap counts as on time.
    pub fn set_start(&mut self, index: usize, time_ms: u32, timers: &RegulatoryTimers) {
        if index >= MAX_TRACKED_CHANNELS {
            return;
        }
        self.last_start[index] = time_ms;
        let time_since_off = time_ms.wrapping_sub(self.last_end[index]);
        if time_since_off >= u32::from(timers.off_same_channel_ms) {
            self.total[index] = 0;
        } else {
            self.total[index] = self.total[index].saturating_add(time_since_off);
        }
    }

    /// Record the transmitter turning off at `time_ms`.
    pub fn set_end(&mut self, index: usize, time_ms: u32) {
        if index >= MAX_TRACKED_CHANNELS {
            return;
        }
        self.last_end[index] = time_ms;
        let time_on = time_ms.wrapping_sub(self.last_start[index]);
        self.total[index] = self.total[index].saturating_add(time_on);
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// The accumulated on time of a channel.
    pub fn total_ms(&self, index: usize) -> u32 {
        self.total.get(index).copied().unwrap_or(0)
    }

    /// Adjust `defaults` for a ramp on channel `index` at `time_ms`.
    ///
    /// Either the remaining off time is requested (the channel used its whole budget and hasn't
    /// rested yet), or the dwell timers are shortened by the on time already used.
    pub fn timers(&self, index: usize, time_ms: u32, defaults: &RegulatoryTimers) -> RegulatoryTimers {
        let mut timers = *defaults;
        if index >= MAX_TRACKED_CHANNELS {
            return timers;
        }
        // Still transmitting on this channel
        if self.last_start[index] > self.last_end[index] {
            timers.off_same_channel_ms = 0;
            return timers;
        }
        let time_since_off = time_ms.wrapping_sub(self.last_end[index]);
        if time_since_off >= u32::from(defaults.off_same_channel_ms) {
            timers.off_same_channel_ms = 0;
            return timers;
        }
        let total = self.total[index].min(u32::from(u16::MAX)) as u16;
        if total >= defaults.nominal_ms {
            // time_since_off is less than the off time, so this can't underflow.
            timers.off_same_channel_ms = defaults.off_same_channel_ms - time_since_off as u16;
        } else {
            let remaining = |limit: u16| if limit > total { limit - total } else { 1 };
            timers.off_same_channel_ms = 0;
            timers.nominal_ms = remaining(defaults.nominal_ms);
            timers.extended_ms = remaining(defaults.extended_ms);
            timers.regulatory_ms = remaining(defaults.regulatory_ms);
        }
        timers
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn etsi_timers() -> RegulatoryTimers {
        Region::by_id(RegionId::EtsiLower).unwrap().regulatory_timers
    }

    #[test]
    fn region_lookup() {
        let etsi = Region::by_id(RegionId::EtsiLower).unwrap();
        assert_eq!(etsi.rf_filter, RfFilter::LowerBand);
        assert!(etsi.tracks_off_time);
        assert_eq!(Region::by_id(RegionId::Russia).unwrap().pll_divider, 60);
        assert!(Region::by_id(RegionId::Japan916921Mhz).is_none());
        assert!(Region::by_id(RegionId::NotDefined).is_none());
    }

    #[test]
    fn region_ids() {
        assert_eq!(RegionId::try_from(100u8).ok(), Some(RegionId::Russia));
        assert_eq!(u8::from(RegionId::EtsiLower), 7);
        assert!(RegionId::try_from(1u8).is_err());
    }

    #[test]
    fn channel_frequencies() {
        let etsi = Region::by_id(RegionId::EtsiLower).unwrap().channels;
        assert_eq!(etsi.channel_khz(4), 865_700);
        assert_eq!(etsi.channel_khz(13), 867_500);
        assert_eq!(etsi.channel_number(867_500), 13);
        let brazil = Region::by_id(RegionId::Brazil).unwrap().channels;
        assert_eq!(brazil.channel_khz(1), 902_750);
        assert_eq!(brazil.channel_khz(26), 915_250);
        assert_eq!(brazil.channel_number(915_250), 26);
        // Frequencies between channels round down
        assert_eq!(brazil.channel_number(915_400), 26);
    }

    #[test]
    fn untouched_channel_keeps_defaults() {
        let tracker = OffTimeTracker::default();
        // Channel has never been used, so the off time has been observed.
        assert_eq!(
            tracker.timers(0, 5000, &etsi_timers()),
            RegulatoryTimers {
                off_same_channel_ms: 0,
                ..etsi_timers()
            }
        );
    }

    #[test]
    fn transmitting_needs_no_off_time() {
        let mut tracker = OffTimeTracker::default();
        tracker.set_start(1, 1000, &etsi_timers());
        let timers = tracker.timers(1, 1500, &etsi_timers());
        assert_eq!(timers.off_same_channel_ms, 0);
        assert_eq!(timers.nominal_ms, 3800);
    }

    #[test]
    fn partial_dwell_shortens_timers() {
        let mut tracker = OffTimeTracker::default();
        tracker.set_start(0, 1000, &etsi_timers());
        tracker.set_end(0, 2000);
        assert_eq!(tracker.total_ms(0), 1000);
        let timers = tracker.timers(0, 2050, &etsi_timers());
        assert_eq!(
            timers,
            RegulatoryTimers {
                nominal_ms: 2800,
                extended_ms: 2980,
                regulatory_ms: 3000,
                off_same_channel_ms: 0,
            }
        );
    }

    #[test]
    fn full_dwell_requires_remaining_off_time() {
        let mut tracker = OffTimeTracker::default();
        tracker.set_start(2, 1000, &etsi_timers());
        tracker.set_end(2, 4800);
        let timers = tracker.timers(2, 4830, &etsi_timers());
        assert_eq!(timers.off_same_channel_ms, 70);
        assert_eq!(timers.nominal_ms, 3800);
        // Once the off time has passed the channel is fresh again.
        let timers = tracker.timers(2, 4900, &etsi_timers());
        assert_eq!(timers.off_same_channel_ms, 0);
    }

    #[test]
    fn short_gap_counts_as_on_time() {
        let mut tracker = OffTimeTracker::default();
        tracker.set_start(0, 0, &etsi_timers());
        tracker.set_end(0, 1000);
        tracker.set_start(0, 1040, &etsi_timers());
        assert_eq!(tracker.total_ms(0), 1040);
        tracker.set_end(0, 2040);
        assert_eq!(tracker.total_ms(0), 2040);
        // A long enough rest resets the total.
        tracker.set_start(0, 2200, &etsi_timers());
        assert_eq!(tracker.total_ms(0), 0);
    }

    #[test]
    fn used_up_limits_floor_at_one() {
        let mut tracker = OffTimeTracker::default();
        let timers = RegulatoryTimers {
            nominal_ms: 500,
            extended_ms: 600,
            regulatory_ms: 700,
            off_same_channel_ms: 100,
        };
        tracker.set_start(3, 0, &timers);
        tracker.set_end(3, 499);
        let adjusted = tracker.timers(3, 520, &timers);
        assert_eq!(adjusted.nominal_ms, 1);
        assert_eq!(adjusted.extended_ms, 101);
        assert_eq!(adjusted.regulatory_ms, 201);
    }

    #[test]
    fn untracked_indices_are_ignored() {
        let mut tracker = OffTimeTracker::default();
        tracker.set_start(7, 100, &etsi_timers());
        tracker.set_end(7, 200);
        assert_eq!(tracker, OffTimeTracker::default());
        assert_eq!(tracker.timers(7, 300, &etsi_timers()), etsi_timers());
        tracker.set_start(0, 100, &etsi_timers());
        tracker.clear();
        assert_eq!(tracker, OffTimeTracker::default());
    }
}
