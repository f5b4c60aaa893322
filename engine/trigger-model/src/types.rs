use core::fmt;

use serde::{Deserialize, Serialize};

/// Discrete time unit of one clock domain.
pub type Clocktick = u32;
pub const INVALID_CLOCKTICK: Clocktick = u32::MAX;

pub const MAIN_CLOCKTICK_NS: u32 = 25;
pub const TRACKER_CLOCKTICK_NS: u32 = 800;
pub const TRIGGER_CLOCKTICK_NS: u32 = 1600;

pub const NSIDES: usize = 2;

#[repr(u8)]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClockDomain {
    /// 25 ns calorimeter clock
    Calo = 0,
    /// 800 ns tracker front-end clock
    Tracker = 1,
    /// 1600 ns trigger clock (two tracker ticks)
    Trigger = 2,
}

impl ClockDomain {
    pub const ALL: [ClockDomain; 3] = [ClockDomain::Calo, ClockDomain::Tracker, ClockDomain::Trigger];

    /// Nominal tick width in nanoseconds
    pub fn nominal_width_ns(&self) -> u32 {
        match self {
            ClockDomain::Calo => MAIN_CLOCKTICK_NS,
            ClockDomain::Tracker => TRACKER_CLOCKTICK_NS,
            ClockDomain::Trigger => TRIGGER_CLOCKTICK_NS,
        }
    }

    #[inline]
    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn name(&self) -> &'static str {
        match self {
            ClockDomain::Calo => "calo",
            ClockDomain::Tracker => "tracker",
            ClockDomain::Trigger => "trigger",
        }
    }
}

impl fmt::Display for ClockDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ns", self.nominal_width_ns())
    }
}

/// 25 ns tick to the 1600 ns trigger tick containing it.
#[inline]
pub fn ct25_to_ct1600(ct25: Clocktick) -> Clocktick {
    ((ct25 as u64 * MAIN_CLOCKTICK_NS as u64) / TRIGGER_CLOCKTICK_NS as u64) as Clocktick
}

/// 800 ns tick to the 1600 ns trigger tick containing it.
#[inline]
pub fn ct800_to_ct1600(ct800: Clocktick) -> Clocktick {
    ct800 / 2
}

#[repr(u8)]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Side {
    Back = 0,
    Front = 1,
}

impl Side {
    pub const BOTH: [Side; NSIDES] = [Side::Back, Side::Front];

    #[inline]
    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn from_index(i: usize) -> Option<Side> {
        match i {
            0 => Some(Side::Back),
            1 => Some(Side::Front),
            _ => None,
        }
    }

    pub fn opposite(&self) -> Side {
        match self {
            Side::Back => Side::Front,
            Side::Front => Side::Back,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_conversions() {
        assert_eq!(ct25_to_ct1600(0), 0);
        assert_eq!(ct25_to_ct1600(63), 0);
        assert_eq!(ct25_to_ct1600(64), 1);
        assert_eq!(ct25_to_ct1600(6400), 100);
        assert_eq!(ct800_to_ct1600(7), 3);
        assert_eq!(ct800_to_ct1600(8), 4);
    }

    #[test]
    fn side_index_roundtrip() {
        for s in Side::BOTH {
            assert_eq!(Side::from_index(s.index()), Some(s));
        }
        assert_eq!(Side::from_index(2), None);
        assert_eq!(Side::Back.opposite(), Side::Front);
    }
}
