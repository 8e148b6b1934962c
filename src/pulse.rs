//! The Nikon remote trigger waveform as a table of pulse steps.
//!
//! A trigger is a header pulse, a long pause and three short sync pulses,
//! followed by an idle gap before the whole train repeats. Only that idle
//! gap is configurable at runtime.

use crate::global_settings::LATENCY_CORRECTION_US;

/// Number of steps in one cycle, including the repeat gap.
pub const STEP_COUNT: usize = 8;
/// Index of the trailing repeat gap step.
pub const REPEAT_GAP_STEP: usize = STEP_COUNT - 1;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Level {
    On,
    Off,
}

impl Level {
    pub const fn is_on(self) -> bool {
        matches!(self, Level::On)
    }
}

impl From<Level> for bool {
    fn from(level: Level) -> Self {
        level.is_on()
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PulseStep {
    pub level: Level,
    pub duration_us: u32,
}

impl PulseStep {
    /// Step with the dispatch latency taken off the protocol width.
    const fn corrected(level: Level, nominal_us: u32) -> Self {
        PulseStep {
            level,
            duration_us: nominal_us - LATENCY_CORRECTION_US,
        }
    }
}

/// Fixed part of the trigger, nominal widths from the Nikon ML-L3 protocol.
pub const NIKON_TRIGGER: [PulseStep; REPEAT_GAP_STEP] = [
    PulseStep::corrected(Level::On, 2_000),
    PulseStep::corrected(Level::Off, 27_830),
    PulseStep::corrected(Level::On, 400),
    PulseStep::corrected(Level::Off, 1_500),
    PulseStep::corrected(Level::On, 400),
    PulseStep::corrected(Level::Off, 3_500),
    PulseStep::corrected(Level::On, 400),
];

/// Level and hold time of a single step, gap included.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Step {
    pub level: Level,
    pub hold_us: u64,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PulseTable {
    fixed_steps: [PulseStep; REPEAT_GAP_STEP],
    repeat_gap_us: u64,
}

impl PulseTable {
    pub const fn nikon(repeat_gap_us: u64) -> Self {
        PulseTable {
            fixed_steps: NIKON_TRIGGER,
            repeat_gap_us,
        }
    }

    pub fn repeat_gap_us(&self) -> u64 {
        self.repeat_gap_us
    }

    pub fn set_repeat_gap_us(&mut self, repeat_gap_us: u64) {
        self.repeat_gap_us = repeat_gap_us;
    }

    /// Step at `index`, wrapping around the cycle.
    pub fn step(&self, index: usize) -> Step {
        match self.fixed_steps.get(index % STEP_COUNT) {
            Some(step) => Step {
                level: step.level,
                hold_us: u64::from(step.duration_us),
            },
            None => Step {
                level: Level::Off,
                hold_us: self.repeat_gap_us,
            },
        }
    }

    /// Offsets of every level change within one cycle, relative to the
    /// header edge.
    pub fn transition_offsets_us(&self) -> [u64; STEP_COUNT] {
        let mut offsets = [0; STEP_COUNT];
        for i in 1..STEP_COUNT {
            offsets[i] = offsets[i - 1] + self.step(i - 1).hold_us;
        }
        offsets
    }

    /// Header edge to header edge.
    pub fn cycle_us(&self) -> u64 {
        (0..STEP_COUNT).map(|i| self.step(i).hold_us).sum()
    }
}

impl Default for PulseTable {
    fn default() -> Self {
        PulseTable::nikon(0)
    }
}
