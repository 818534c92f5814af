//! Load profiles
//!
//! A scenario decides, for a given worker at a given moment, whether that
//! worker should start another iteration. Decisions are pure functions of
//! the worker index, its completed iteration count and the elapsed time, so
//! workers never have to coordinate.

use std::time::Duration;

/// How often an idle ramping worker re-checks whether it is needed
pub const RAMP_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// One leg of a ramping profile: move linearly to `target` workers over `duration`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stage {
    pub duration: Duration,
    pub target: usize,
}

impl Stage {
    pub const fn new(secs: u64, target: usize) -> Self {
        Self {
            duration: Duration::from_secs(secs),
            target,
        }
    }
}

/// What a worker should do next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Run,
    Idle(Duration),
    Stop,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scenario {
    /// A fixed number of workers looping for a fixed duration
    ConstantVus { vus: usize, duration: Duration },
    /// Worker count follows a piecewise-linear profile
    RampingVus { start_vus: usize, stages: Vec<Stage> },
    /// Each worker runs a fixed number of iterations, bounded by `max_duration`
    PerVuIterations {
        vus: usize,
        iterations: u64,
        max_duration: Duration,
    },
}

impl Default for Scenario {
    fn default() -> Self {
        Self::ConstantVus {
            vus: 50,
            duration: Duration::from_secs(60),
        }
    }
}

impl Scenario {
    /// Ramp 1 → 5 → 10 → 20, hold, then back to 0 over 70 seconds
    pub fn default_ramping() -> Self {
        Self::RampingVus {
            start_vus: 1,
            stages: vec![
                Stage::new(10, 5),
                Stage::new(20, 10),
                Stage::new(10, 20),
                Stage::new(20, 20),
                Stage::new(10, 0),
            ],
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Scenario::ConstantVus { .. } => "constant",
            Scenario::RampingVus { .. } => "ramping",
            Scenario::PerVuIterations { .. } => "iterations",
        }
    }

    /// Number of workers that must be spawned
    pub fn max_vus(&self) -> usize {
        match self {
            Scenario::ConstantVus { vus, .. } | Scenario::PerVuIterations { vus, .. } => *vus,
            Scenario::RampingVus { start_vus, stages } => stages
                .iter()
                .map(|s| s.target)
                .fold(*start_vus, usize::max),
        }
    }

    /// Wall-clock budget of the scenario, excluding graceful stop
    pub fn duration(&self) -> Duration {
        match self {
            Scenario::ConstantVus { duration, .. } => *duration,
            Scenario::RampingVus { stages, .. } => stages.iter().map(|s| s.duration).sum(),
            Scenario::PerVuIterations { max_duration, .. } => *max_duration,
        }
    }

    /// Workers that should be active `elapsed` into the run
    pub fn target_vus_at(&self, elapsed: Duration) -> usize {
        match self {
            Scenario::ConstantVus { vus, duration } => {
                if elapsed < *duration {
                    *vus
                } else {
                    0
                }
            }
            Scenario::PerVuIterations {
                vus, max_duration, ..
            } => {
                if elapsed < *max_duration {
                    *vus
                } else {
                    0
                }
            }
            Scenario::RampingVus { start_vus, stages } => {
                let mut from = *start_vus;
                let mut stage_start = Duration::ZERO;
                for stage in stages {
                    let stage_end = stage_start + stage.duration;
                    if elapsed < stage_end {
                        let progress = (elapsed - stage_start).as_secs_f64()
                            / stage.duration.as_secs_f64();
                        let delta = stage.target as f64 - from as f64;
                        return (from as f64 + delta * progress).round() as usize;
                    }
                    from = stage.target;
                    stage_start = stage_end;
                }
                from
            }
        }
    }

    /// Whether `worker` should start its next iteration now
    pub fn decide(&self, worker: usize, completed: u64, elapsed: Duration) -> Decision {
        if worker >= self.max_vus() || elapsed >= self.duration() {
            return Decision::Stop;
        }

        match self {
            Scenario::ConstantVus { .. } => Decision::Run,
            Scenario::PerVuIterations { iterations, .. } => {
                if completed >= *iterations {
                    Decision::Stop
                } else {
                    Decision::Run
                }
            }
            Scenario::RampingVus { .. } => {
                if worker < self.target_vus_at(elapsed) {
                    Decision::Run
                } else {
                    Decision::Idle(RAMP_POLL_INTERVAL)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: f64) -> Duration {
        Duration::from_secs_f64(s)
    }

    #[test]
    fn test_default_is_constant_50_for_60s() {
        let scenario = Scenario::default();
        assert_eq!(scenario.name(), "constant");
        assert_eq!(scenario.max_vus(), 50);
        assert_eq!(scenario.duration(), Duration::from_secs(60));
    }

    #[test]
    fn test_constant_decisions() {
        let scenario = Scenario::ConstantVus {
            vus: 2,
            duration: Duration::from_secs(10),
        };
        assert_eq!(scenario.decide(0, 100, secs(9.9)), Decision::Run);
        assert_eq!(scenario.decide(1, 0, secs(0.0)), Decision::Run);
        assert_eq!(scenario.decide(2, 0, secs(0.0)), Decision::Stop);
        assert_eq!(scenario.decide(0, 0, secs(10.0)), Decision::Stop);
    }

    #[test]
    fn test_per_vu_iterations_stops_after_count() {
        let scenario = Scenario::PerVuIterations {
            vus: 1,
            iterations: 3,
            max_duration: Duration::from_secs(600),
        };
        assert_eq!(scenario.decide(0, 2, secs(1.0)), Decision::Run);
        assert_eq!(scenario.decide(0, 3, secs(1.0)), Decision::Stop);
        assert_eq!(scenario.decide(0, 0, secs(600.0)), Decision::Stop);
    }

    #[test]
    fn test_ramping_profile_shape() {
        let scenario = Scenario::default_ramping();
        assert_eq!(scenario.max_vus(), 20);
        assert_eq!(scenario.duration(), Duration::from_secs(70));

        assert_eq!(scenario.target_vus_at(secs(0.0)), 1);
        assert_eq!(scenario.target_vus_at(secs(5.0)), 3);
        assert_eq!(scenario.target_vus_at(secs(10.0)), 5);
        assert_eq!(scenario.target_vus_at(secs(20.0)), 8);
        assert_eq!(scenario.target_vus_at(secs(30.0)), 10);
        assert_eq!(scenario.target_vus_at(secs(40.0)), 20);
        assert_eq!(scenario.target_vus_at(secs(55.0)), 20);
        assert_eq!(scenario.target_vus_at(secs(65.0)), 10);
        assert_eq!(scenario.target_vus_at(secs(70.0)), 0);
    }

    #[test]
    fn test_ramping_idle_workers_wait() {
        let scenario = Scenario::default_ramping();
        assert_eq!(scenario.decide(0, 0, secs(1.0)), Decision::Run);
        assert_eq!(
            scenario.decide(10, 0, secs(1.0)),
            Decision::Idle(RAMP_POLL_INTERVAL)
        );
        assert_eq!(scenario.decide(10, 0, secs(45.0)), Decision::Run);
        assert_eq!(scenario.decide(25, 0, secs(45.0)), Decision::Stop);
        assert_eq!(scenario.decide(0, 0, secs(70.0)), Decision::Stop);
    }

    #[test]
    fn test_zero_length_stage_jumps() {
        let scenario = Scenario::RampingVus {
            start_vus: 0,
            stages: vec![Stage::new(0, 4), Stage::new(10, 4)],
        };
        assert_eq!(scenario.target_vus_at(secs(0.0)), 4);
        assert_eq!(scenario.target_vus_at(secs(5.0)), 4);
    }
}
