//! Clock reference: per-event time origin and random reference shift used to
//! quantize continuous hit times into clockticks of each domain.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{trace, warn};
use trigger_model::{ClockDomain, Clocktick, Result, TriggerError};

/// Tick width per clock domain. A domain left out of the configuration is
/// rejected by [`ClockConfig::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClocktickWidths {
    pub calo: Option<f64>,
    pub tracker: Option<f64>,
    pub trigger: Option<f64>,
}

impl Default for ClocktickWidths {
    fn default() -> Self {
        Self {
            calo: Some(ClockDomain::Calo.nominal_width_ns() as f64),
            tracker: Some(ClockDomain::Tracker.nominal_width_ns() as f64),
            trigger: Some(ClockDomain::Trigger.nominal_width_ns() as f64),
        }
    }
}

impl ClocktickWidths {
    pub fn get(&self, domain: ClockDomain) -> Option<f64> {
        match domain {
            ClockDomain::Calo => self.calo,
            ClockDomain::Tracker => self.tracker,
            ClockDomain::Trigger => self.trigger,
        }
    }

    /// Width of `domain`, or a configuration error when it was never set.
    pub fn require(&self, domain: ClockDomain) -> Result<f64> {
        self.get(domain).ok_or_else(|| {
            TriggerError::config(format!("clock.clocktick_width_ns.{} is not configured", domain.name()))
        })
    }
}

/// Clock reference configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClockConfig {
    /// Quantization step per domain in nanoseconds
    pub clocktick_width_ns: ClocktickWidths,

    /// The per-event reference time is drawn uniformly in [0, window)
    #[serde(default = "default_reference_window_ns")]
    pub reference_window_ns: f64,

    /// Base seed; each event uses `seed ^ event_id`
    #[serde(default = "default_seed")]
    pub seed: u64,
}

fn default_reference_window_ns() -> f64 {
    ClockDomain::Trigger.nominal_width_ns() as f64
}

fn default_seed() -> u64 {
    314_159
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            clocktick_width_ns: ClocktickWidths::default(),
            reference_window_ns: default_reference_window_ns(),
            seed: default_seed(),
        }
    }
}

impl ClockConfig {
    pub fn validate(&self) -> Result<()> {
        for domain in ClockDomain::ALL {
            let width = self.clocktick_width_ns.require(domain)?;
            if !(width.is_finite() && width > 0.0) {
                return Err(TriggerError::config(format!(
                    "clock.clocktick_width_ns.{} must be positive, got {width}",
                    domain.name()
                )));
            }
            if width != domain.nominal_width_ns() as f64 {
                warn!("Clocktick width of domain {} is {} ns (nominal {})", domain.name(), width, domain);
            }
        }
        if !(self.reference_window_ns.is_finite() && self.reference_window_ns >= 0.0) {
            return Err(TriggerError::config("clock.reference_window_ns must be a non-negative number"));
        }
        Ok(())
    }
}

/// Clock state fixed for the lifetime of one event.
///
/// `tick(time) = floor((time - t0) / width) + reference_clocktick`, where the
/// reference clocktick of a domain is `floor(reference_time / width)`. The
/// sub-tick remainder `reference_time mod width` is kept as the domain shift
/// and does not move tick boundaries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EventClock {
    widths: [f64; 3],
    time_zero_ns: f64,
    reference_time_ns: f64,
}

impl EventClock {
    /// Explicit clock; all widths must be configured.
    pub fn new(widths: &ClocktickWidths, time_zero_ns: f64, reference_time_ns: f64) -> Result<Self> {
        Ok(Self {
            widths: [
                widths.require(ClockDomain::Calo)?,
                widths.require(ClockDomain::Tracker)?,
                widths.require(ClockDomain::Trigger)?,
            ],
            time_zero_ns,
            reference_time_ns,
        })
    }

    /// Clock for one event: `time_zero_ns` is the earliest signal time, the
    /// reference time is drawn from a generator seeded by the event id so a
    /// rerun of the same event quantizes identically.
    pub fn for_event(config: &ClockConfig, event_id: u64, time_zero_ns: f64) -> Result<Self> {
        let mut rng = StdRng::seed_from_u64(config.seed ^ event_id);
        let reference_time_ns = if config.reference_window_ns > 0.0 {
            rng.gen_range(0.0..config.reference_window_ns)
        } else {
            0.0
        };
        trace!("Event {} clock: t0={} ns, reference={} ns", event_id, time_zero_ns, reference_time_ns);
        Self::new(&config.clocktick_width_ns, time_zero_ns, reference_time_ns)
    }

    #[inline]
    pub fn width_ns(&self, domain: ClockDomain) -> f64 {
        self.widths[domain.index()]
    }

    pub fn time_zero_ns(&self) -> f64 {
        self.time_zero_ns
    }

    pub fn reference_time_ns(&self) -> f64 {
        self.reference_time_ns
    }

    /// Reference clocktick of a domain
    pub fn reference_clocktick(&self, domain: ClockDomain) -> Clocktick {
        (self.reference_time_ns / self.width_ns(domain)).floor() as Clocktick
    }

    /// Sub-tick shift of a domain, in [0, width)
    pub fn shift_ns(&self, domain: ClockDomain) -> f64 {
        self.reference_time_ns.rem_euclid(self.width_ns(domain))
    }

    /// Quantize a continuous time into a clocktick of `domain`.
    pub fn quantize(&self, domain: ClockDomain, time_ns: f64) -> Result<Clocktick> {
        if !time_ns.is_finite() {
            return Err(TriggerError::invariant(format!("non-finite hit time {time_ns}")));
        }
        let elapsed = ((time_ns - self.time_zero_ns) / self.width_ns(domain)).floor();
        let ticks = elapsed + self.reference_clocktick(domain) as f64;
        if elapsed < 0.0 || ticks >= Clocktick::MAX as f64 {
            return Err(TriggerError::range("clocktick", ticks.max(0.0) as u64, Clocktick::MAX as u64));
        }
        Ok(elapsed as Clocktick + self.reference_clocktick(domain))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_width_is_configuration_error() {
        let mut config = ClockConfig::default();
        config.clocktick_width_ns.tracker = None;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, TriggerError::Configuration(_)));
        assert!(err.to_string().contains("tracker"));
        assert!(EventClock::for_event(&config, 1, 0.0).is_err());
    }

    #[test]
    fn zero_width_is_rejected() {
        let mut config = ClockConfig::default();
        config.clocktick_width_ns.calo = Some(0.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn quantize_uses_reference_and_shift() {
        let clock = EventClock::new(&ClocktickWidths::default(), 1000.0, 60.0).unwrap();
        assert_eq!(clock.reference_clocktick(ClockDomain::Calo), 2);
        assert_eq!(clock.shift_ns(ClockDomain::Calo), 10.0);
        assert_eq!(clock.quantize(ClockDomain::Calo, 1000.0).unwrap(), 2);
        // the 10 ns shift does not move the boundary: 15 and 20 ns after t0 are still tick 0 + 2
        assert_eq!(clock.quantize(ClockDomain::Calo, 1015.0).unwrap(), 2);
        assert_eq!(clock.quantize(ClockDomain::Calo, 1020.0).unwrap(), 2);
        assert_eq!(clock.quantize(ClockDomain::Calo, 1025.0).unwrap(), 3);
        // tracker reference clocktick is floor(60 / 800) = 0
        assert_eq!(clock.quantize(ClockDomain::Tracker, 1799.0).unwrap(), 0);
        assert_eq!(clock.quantize(ClockDomain::Tracker, 1800.0).unwrap(), 1);
        assert!(clock.quantize(ClockDomain::Calo, 900.0).is_err());
    }

    #[test]
    fn event_clock_is_reproducible() {
        let config = ClockConfig::default();
        let a = EventClock::for_event(&config, 42, 0.0).unwrap();
        let b = EventClock::for_event(&config, 42, 0.0).unwrap();
        assert_eq!(a, b);
        assert!(a.reference_time_ns() >= 0.0 && a.reference_time_ns() < config.reference_window_ns);
        let c = EventClock::for_event(&config, 43, 0.0).unwrap();
        assert_ne!(a.reference_time_ns(), c.reference_time_ns());
    }

    #[test]
    fn partial_width_table_deserializes_as_missing() {
        let config: ClockConfig = toml::from_str(
            r#"
            [clocktick_width_ns]
            calo = 25.0
            trigger = 1600.0
            "#,
        )
        .unwrap();
        assert_eq!(config.clocktick_width_ns.tracker, None);
        assert_eq!(config.seed, 314_159);
        assert!(config.validate().is_err());
    }
}
