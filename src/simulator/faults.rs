//! Injectable sources of latency and failure.
//!
//! The simulator asks a [`FaultSource`] for one [`FaultPlan`] per request.
//! [`RandomFaults`] draws plans from a [`SimulatorConfig`]; [`ScriptedFaults`]
//! replays a fixed sequence so tests can reproduce exact failure bursts.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::config::{ConfigError, DelayRange, SimulatorConfig};

/// How a single simulated request behaves.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FaultPlan {
    /// Time spent before the request completes.
    pub delay: Duration,
    /// Whether the request ends in a server error instead of a result.
    pub fail: bool,
}

impl FaultPlan {
    pub const fn succeed() -> Self {
        Self {
            delay: Duration::ZERO,
            fail: false,
        }
    }

    pub const fn fail() -> Self {
        Self {
            delay: Duration::ZERO,
            fail: true,
        }
    }

    pub const fn after(self, delay: Duration) -> Self {
        Self {
            delay,
            fail: self.fail,
        }
    }
}

pub trait FaultSource: Send + Sync {
    fn next_plan(&self) -> FaultPlan;
}

/// Plans drawn from a [`SimulatorConfig`].
#[derive(Debug)]
pub struct RandomFaults {
    config: SimulatorConfig,
    rng: Mutex<StdRng>,
}

impl RandomFaults {
    pub fn new(config: SimulatorConfig) -> Result<Self, ConfigError> {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Reproducible plans for a given seed.
    pub fn seeded(config: SimulatorConfig, seed: u64) -> Result<Self, ConfigError> {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: SimulatorConfig, rng: StdRng) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            rng: Mutex::new(rng),
        })
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }
}

impl FaultSource for RandomFaults {
    fn next_plan(&self) -> FaultPlan {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);

        let range = if rng.gen_bool(self.config.long_delay_probability) {
            self.config.long_delay
        } else {
            self.config.short_delay
        };
        let delay = sample_delay(&mut *rng, range);
        let fail = rng.gen_bool(self.config.error_probability);

        FaultPlan { delay, fail }
    }
}

fn sample_delay<R: Rng>(rng: &mut R, range: DelayRange) -> Duration {
    rng.gen_range(range.min..=range.max)
}

/// Replays a fixed list of plans, then succeeds instantly.
#[derive(Debug, Default)]
pub struct ScriptedFaults {
    plans: Mutex<VecDeque<FaultPlan>>,
    drawn: AtomicUsize,
}

impl ScriptedFaults {
    pub fn new(plans: impl IntoIterator<Item = FaultPlan>) -> Self {
        Self {
            plans: Mutex::new(plans.into_iter().collect()),
            drawn: AtomicUsize::new(0),
        }
    }

    /// `failures` instant server errors followed by instant successes.
    pub fn failing(failures: usize) -> Self {
        Self::new(std::iter::repeat(FaultPlan::fail()).take(failures))
    }

    pub fn push(&self, plan: FaultPlan) {
        self.plans
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(plan);
    }

    /// Number of plans handed out so far, i.e. requests received.
    pub fn drawn(&self) -> usize {
        self.drawn.load(Ordering::SeqCst)
    }

    pub fn remaining(&self) -> usize {
        self.plans
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl FaultSource for ScriptedFaults {
    fn next_plan(&self) -> FaultPlan {
        self.drawn.fetch_add(1, Ordering::SeqCst);
        self.plans
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or_else(FaultPlan::succeed)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{FaultPlan, FaultSource, RandomFaults, ScriptedFaults};
    use crate::simulator::{DelayRange, SimulatorConfig};

    #[test]
    fn error_probability_extremes_are_absolute() {
        let always = RandomFaults::seeded(SimulatorConfig::instant(1.0), 7).expect("valid");
        let never = RandomFaults::seeded(SimulatorConfig::instant(0.0), 7).expect("valid");

        for _ in 0..200 {
            assert!(always.next_plan().fail);
            assert!(!never.next_plan().fail);
        }
    }

    #[test]
    fn delays_stay_within_their_regime() {
        let config = SimulatorConfig {
            short_delay: DelayRange::from_millis(5, 10),
            long_delay: DelayRange::from_millis(100, 150),
            long_delay_probability: 0.3,
            error_probability: 0.5,
        };
        let faults = RandomFaults::seeded(config, 42).expect("valid");

        let (mut short, mut long) = (0, 0);
        for _ in 0..1_000 {
            let delay = faults.next_plan().delay;
            if delay <= Duration::from_millis(10) {
                assert!(delay >= Duration::from_millis(5));
                short += 1;
            } else {
                assert!(delay >= Duration::from_millis(100));
                assert!(delay <= Duration::from_millis(150));
                long += 1;
            }
        }
        assert!(short > long);
        assert!(long > 0);
    }

    #[test]
    fn sub_millisecond_bounds_are_respected() {
        let fixed = DelayRange::fixed(Duration::from_micros(1_500));
        let narrow = DelayRange {
            min: Duration::from_micros(250),
            max: Duration::from_micros(750),
        };
        let config = SimulatorConfig {
            short_delay: narrow,
            long_delay: fixed,
            long_delay_probability: 0.5,
            error_probability: 0.0,
        };
        let faults = RandomFaults::seeded(config, 5).expect("valid");

        for _ in 0..500 {
            let delay = faults.next_plan().delay;
            let in_narrow = delay >= narrow.min && delay <= narrow.max;
            assert!(in_narrow || delay == fixed.min, "delay {delay:?} outside both ranges");
        }
    }

    #[test]
    fn same_seed_same_plans() {
        let first = RandomFaults::seeded(SimulatorConfig::default(), 99).expect("valid");
        let second = RandomFaults::seeded(SimulatorConfig::default(), 99).expect("valid");
        for _ in 0..50 {
            assert_eq!(first.next_plan(), second.next_plan());
        }
    }

    #[test]
    fn invalid_config_is_rejected() {
        assert!(RandomFaults::new(SimulatorConfig::instant(-0.1)).is_err());
    }

    #[test]
    fn scripted_plans_replay_in_order_then_succeed() {
        let slow = FaultPlan::succeed().after(Duration::from_millis(30));
        let faults = ScriptedFaults::new([FaultPlan::fail(), slow]);
        faults.push(FaultPlan::fail());

        assert_eq!(faults.remaining(), 3);
        assert_eq!(faults.next_plan(), FaultPlan::fail());
        assert_eq!(faults.next_plan(), slow);
        assert_eq!(faults.next_plan(), FaultPlan::fail());
        assert_eq!(faults.next_plan(), FaultPlan::succeed());
        assert_eq!(faults.drawn(), 4);
    }
}
