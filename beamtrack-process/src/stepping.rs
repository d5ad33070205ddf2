//! Per-element stepping protocol shared by every bunch process.
//!
//! A process is handed each component in turn. If it has work to do on the
//! component it arms one or more trigger stages (entrance, centre, exit) and
//! reports how far the integrator may step before the next trigger. The run
//! loop then calls [`BunchProcess::do_process`] with each step taken; when
//! the accumulated offset reaches the trigger the process acts and arms the
//! next stage. With no stage left it goes inactive for the rest of the
//! element.

use std::ops::{BitOr, BitOrAssign};

use beamtrack_core::{Bunch, Component, RngHandle};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::Result;

/// Tolerance used when comparing the accumulated offset with a trigger.
pub const TRIGGER_TOLERANCE: f64 = 1.0e-12;

/// Set of trigger stages armed on an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CollimationStages(u8);

impl CollimationStages {
    /// No stage.
    pub const NONE: Self = Self(0);
    /// Offset 0.
    pub const AT_ENTRANCE: Self = Self(1);
    /// Offset `length / 2`.
    pub const AT_CENTER: Self = Self(2);
    /// Offset `length`.
    pub const AT_EXIT: Self = Self(4);
    /// Every stage.
    pub const ALL: Self = Self(7);

    /// Returns `true` if every stage in `other` is set.
    #[must_use]
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns `true` if no stage is set.
    #[must_use]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }
}

impl BitOr for CollimationStages {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for CollimationStages {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// A single trigger point on an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Element entrance.
    Entrance,
    /// Element centre.
    Center,
    /// Element exit.
    Exit,
}

impl Stage {
    const ORDER: [(Stage, CollimationStages); 3] = [
        (Stage::Entrance, CollimationStages::AT_ENTRANCE),
        (Stage::Center, CollimationStages::AT_CENTER),
        (Stage::Exit, CollimationStages::AT_EXIT),
    ];

    /// Offset of this stage on an element of the given length.
    #[must_use]
    pub fn offset(self, length: f64) -> f64 {
        match self {
            Stage::Entrance => 0.0,
            Stage::Center => length / 2.0,
            Stage::Exit => length,
        }
    }
}

/// Step bookkeeping for one process on the current element.
#[derive(Debug, Clone, Default)]
pub struct StepState {
    s: f64,
    next_s: f64,
    active: bool,
    pending: CollimationStages,
    stage: Option<Stage>,
    length: f64,
    s_total: f64,
}

impl StepState {
    /// Arms `stages` on an element of the given length and selects the first
    /// trigger. An empty stage set leaves the state inactive.
    pub fn arm(&mut self, length: f64, stages: CollimationStages) {
        self.length = length;
        self.s = 0.0;
        self.pending = stages;
        self.active = true;
        self.next_stage();
        if !self.active {
            self.s_total += length;
        }
    }

    /// Marks the state inactive for an element the process ignores.
    pub fn skip(&mut self, length: f64) {
        self.active = false;
        self.pending = CollimationStages::NONE;
        self.stage = None;
        self.s_total += length;
    }

    /// Adds `ds` to the offset and returns `true` if the armed trigger is
    /// reached or passed. A step past the trigger fires it late, once.
    pub fn advance(&mut self, ds: f64) -> bool {
        self.s += ds;
        self.active && self.s >= self.next_s - TRIGGER_TOLERANCE
    }

    /// Arms the next trigger after an action; once none are left the
    /// element length is added to the running total.
    pub fn finish_trigger(&mut self) {
        self.next_stage();
        if !self.active {
            self.s_total += self.length;
        }
    }

    fn next_stage(&mut self) {
        for (stage, flag) in Stage::ORDER {
            if self.pending.contains(flag) {
                self.pending.remove(flag);
                self.stage = Some(stage);
                self.next_s = stage.offset(self.length);
                return;
            }
        }
        self.stage = None;
        self.active = false;
    }

    /// Distance to the armed trigger.
    #[must_use]
    pub fn max_allowed_step(&self) -> f64 {
        self.next_s - self.s
    }

    /// Returns `true` while a trigger is armed.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Offset from the element entrance.
    #[must_use]
    pub fn s(&self) -> f64 {
        self.s
    }

    /// Stage of the armed trigger.
    #[must_use]
    pub fn stage(&self) -> Option<Stage> {
        self.stage
    }

    /// Length of every element completed so far.
    #[must_use]
    pub fn total_length(&self) -> f64 {
        self.s_total
    }

    /// Clears the running length.
    pub fn reset_total(&mut self) {
        self.s_total = 0.0;
    }
}

/// Everything a process may touch while acting on a step.
#[derive(Debug)]
pub struct StepContext<'a> {
    /// Element being tracked.
    pub component: &'a mut Component,
    /// Bunch being tracked.
    pub bunch: &'a mut Bunch,
    /// Shared random source.
    pub rng: &'a mut RngHandle,
}

/// A process applied to the bunch while it moves through the beamline.
pub trait BunchProcess {
    /// Process name, for diagnostics.
    fn name(&self) -> &str;

    /// Ordering key; processes with lower values act first.
    fn priority(&self) -> i32;

    /// Resets per-run state for a new tracking run.
    fn initialise(&mut self, bunch: &mut Bunch);

    /// Arms the process for the next element, or marks it inactive.
    fn set_current_component(&mut self, component: &mut Component, bunch: &mut Bunch);

    /// Accounts for a step of length `ds` and acts if a trigger is reached.
    ///
    /// # Errors
    /// Any error aborts the tracking run.
    fn do_process(&mut self, ds: f64, ctx: &mut StepContext<'_>) -> Result<()>;

    /// Largest step that does not overshoot the next trigger.
    fn max_allowed_step(&self) -> f64;

    /// Returns `true` while the process has a trigger armed on this element.
    fn is_active(&self) -> bool;

    /// Length of every element completed so far.
    fn total_length(&self) -> f64;
}
