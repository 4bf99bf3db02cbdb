//! Fast-forward / slow-motion state machine
//!
//! Both controls are edge-triggered and mutually exclusive. Each press of a
//! control steps through its list of speeds and back to normal; pressing one
//! control always cancels the other. When both edges land on the same tick
//! the fast-forward edge is evaluated first, so the tick ends in slow motion.

use super::input::{EdgeTrigger, JoypadButtons, SpeedCombos};

/// Default fast-forward multipliers
pub const DEFAULT_FAST_FORWARD_MULTIPLIERS: [u32; 2] = [3, 5];

/// Default slow-motion divisors (1/2 and 1/5 speed)
pub const DEFAULT_SLOW_MOTION_DIVISORS: [u32; 2] = [2, 5];

/// Default multiplier from which intermediate fast-forward frames are not rendered
pub const DEFAULT_FRAMESKIP_MIN_MULTIPLIER: u32 = 5;

/// Emulation speed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpeedMode {
    /// One super-step per tick
    #[default]
    Normal,
    /// `k` super-steps per tick
    FastForward(u32),
    /// One super-step every `d` ticks
    SlowMotion(u32),
}

impl SpeedMode {
    /// True for anything but [`SpeedMode::Normal`]
    pub fn is_altered(&self) -> bool {
        !matches!(self, SpeedMode::Normal)
    }
}

/// Mode transition reported by [`SpeedModeController::update`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpeedChange {
    /// Mode before the tick's edges
    pub from: SpeedMode,
    /// Mode after the tick's edges
    pub to: SpeedMode,
}

/// Work scheduled for one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepPlan {
    /// Emulation super-steps to run (0 = hold the previous frame)
    pub super_steps: u32,
    /// Render only the final super-step's video
    pub skip_intermediate_video: bool,
}

/// Speed-mode controller
#[derive(Debug, Clone)]
pub struct SpeedModeController {
    combos: SpeedCombos,
    fast_forward_edge: EdgeTrigger,
    slow_motion_edge: EdgeTrigger,
    multipliers: Vec<u32>,
    divisors: Vec<u32>,
    /// Index into `multipliers` while fast-forwarding
    fast_forward: Option<usize>,
    /// Index into `divisors` while in slow motion
    slow_motion: Option<usize>,
    /// Ticks since slow motion was (re)entered
    slow_counter: u64,
    frameskip_min_multiplier: u32,
}

impl SpeedModeController {
    /// Create a controller with the given speed lists.
    ///
    /// Zero entries are ignored.
    pub fn new(multipliers: &[u32], divisors: &[u32]) -> Self {
        SpeedModeController {
            combos: SpeedCombos::default(),
            fast_forward_edge: EdgeTrigger::new(),
            slow_motion_edge: EdgeTrigger::new(),
            multipliers: multipliers.iter().copied().filter(|&k| k > 0).collect(),
            divisors: divisors.iter().copied().filter(|&d| d > 0).collect(),
            fast_forward: None,
            slow_motion: None,
            slow_counter: 0,
            frameskip_min_multiplier: DEFAULT_FRAMESKIP_MIN_MULTIPLIER,
        }
    }

    /// Rebind the speed combos
    pub fn with_combos(mut self, combos: SpeedCombos) -> Self {
        self.combos = combos;
        self
    }

    /// Set the multiplier from which intermediate frames are skipped
    pub fn with_frameskip_min_multiplier(mut self, multiplier: u32) -> Self {
        self.set_frameskip_min_multiplier(multiplier);
        self
    }

    /// Change the frameskip threshold in place
    pub fn set_frameskip_min_multiplier(&mut self, multiplier: u32) {
        self.frameskip_min_multiplier = multiplier;
    }

    /// Current mode
    pub fn mode(&self) -> SpeedMode {
        if let Some(i) = self.fast_forward {
            SpeedMode::FastForward(self.multipliers[i])
        } else if let Some(i) = self.slow_motion {
            SpeedMode::SlowMotion(self.divisors[i])
        } else {
            SpeedMode::Normal
        }
    }

    /// Replace the speed lists; an active mode that no longer exists drops to normal
    pub fn set_speed_lists(&mut self, multipliers: &[u32], divisors: &[u32]) {
        let mode = self.mode();
        self.multipliers = multipliers.iter().copied().filter(|&k| k > 0).collect();
        self.divisors = divisors.iter().copied().filter(|&d| d > 0).collect();
        self.fast_forward = match mode {
            SpeedMode::FastForward(k) => self.multipliers.iter().position(|&m| m == k),
            _ => None,
        };
        self.slow_motion = match mode {
            SpeedMode::SlowMotion(d) => self.divisors.iter().position(|&v| v == d),
            _ => None,
        };
    }

    /// Feed this tick's buttons; returns the transition if the mode changed
    pub fn update(&mut self, buttons: JoypadButtons) -> Option<SpeedChange> {
        let from = self.mode();

        if self
            .fast_forward_edge
            .update(buttons.holds(self.combos.fast_forward))
        {
            self.slow_motion = None;
            self.slow_counter = 0;
            self.fast_forward = next_index(self.fast_forward, self.multipliers.len());
        }

        if self
            .slow_motion_edge
            .update(buttons.holds(self.combos.slow_motion))
        {
            self.fast_forward = None;
            self.slow_motion = next_index(self.slow_motion, self.divisors.len());
            self.slow_counter = 0;
        }

        let to = self.mode();
        if from != to {
            tracing::info!(?from, ?to, "speed mode changed");
            Some(SpeedChange { from, to })
        } else {
            None
        }
    }

    /// Schedule this tick's super-steps
    pub fn plan(&mut self) -> StepPlan {
        match self.mode() {
            SpeedMode::Normal => StepPlan {
                super_steps: 1,
                skip_intermediate_video: false,
            },
            SpeedMode::FastForward(k) => StepPlan {
                super_steps: k,
                skip_intermediate_video: k >= self.frameskip_min_multiplier,
            },
            SpeedMode::SlowMotion(d) => {
                let run = self.slow_counter % d as u64 == 0;
                self.slow_counter += 1;
                StepPlan {
                    super_steps: u32::from(run),
                    skip_intermediate_video: false,
                }
            }
        }
    }

    /// Whether this tick's audio should be withheld from the host
    pub fn mutes_audio(&self, deliver_during_altered_speed: bool) -> bool {
        self.mode().is_altered() && !deliver_during_altered_speed
    }
}

impl Default for SpeedModeController {
    fn default() -> Self {
        Self::new(
            &DEFAULT_FAST_FORWARD_MULTIPLIERS,
            &DEFAULT_SLOW_MOTION_DIVISORS,
        )
    }
}

/// Step `None -> 0 -> 1 -> ... -> len-1 -> None`
fn next_index(current: Option<usize>, len: usize) -> Option<usize> {
    match current {
        None if len > 0 => Some(0),
        Some(i) if i + 1 < len => Some(i + 1),
        _ => None,
    }
}
