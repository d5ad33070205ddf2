//! Reference run loop driving bunch processes through a beamline.

use beamtrack_core::{Bunch, Component, RngHandle};

use crate::stepping::{BunchProcess, StepContext};
use crate::Result;

/// Tracks a bunch through a beamline, turn by turn, applying processes.
///
/// Between process triggers the bunch is transported as through a
/// field-free drift. The tracker owns the bunch and the random source and
/// lends both to one process at a time.
pub struct ParticleTracker {
    beamline: Vec<Component>,
    bunch: Bunch,
    processes: Vec<Box<dyn BunchProcess>>,
    rng: RngHandle,
    turn: u64,
    initialised: bool,
}

impl ParticleTracker {
    /// Creates a tracker. Element lattice positions are assigned from the
    /// cumulative element lengths.
    #[must_use]
    pub fn new(mut beamline: Vec<Component>, bunch: Bunch, seed: u64) -> Self {
        let mut position = 0.0;
        for component in &mut beamline {
            component.set_position(position);
            position += component.length();
        }
        Self {
            beamline,
            bunch,
            processes: Vec::new(),
            rng: RngHandle::from_seed(seed),
            turn: 0,
            initialised: false,
        }
    }

    /// Adds a process; processes act in ascending priority order.
    pub fn add_process(&mut self, process: Box<dyn BunchProcess>) {
        self.processes.push(process);
        self.processes.sort_by_key(|p| p.priority());
    }

    /// Initialises every process and tracks one turn.
    ///
    /// # Errors
    /// Returns the first error raised by a process; tracking stops there.
    pub fn run(&mut self) -> Result<()> {
        for process in &mut self.processes {
            process.initialise(&mut self.bunch);
        }
        self.initialised = true;
        self.turn = 0;
        log::info!(
            "tracking {} particles through {} elements",
            self.bunch.len(),
            self.beamline.len()
        );
        self.track_turn()
    }

    /// Tracks one more turn without re-initialising the processes.
    ///
    /// # Errors
    /// Returns the first error raised by a process; tracking stops there.
    pub fn continue_tracking(&mut self) -> Result<()> {
        if !self.initialised {
            return self.run();
        }
        self.track_turn()
    }

    fn track_turn(&mut self) -> Result<()> {
        self.turn += 1;
        for i in 0..self.beamline.len() {
            self.track_component(i)?;
        }
        log::debug!("turn {} complete, {} particles remain", self.turn, self.bunch.len());
        Ok(())
    }

    fn track_component(&mut self, i: usize) -> Result<()> {
        let component = &mut self.beamline[i];
        let bunch = &mut self.bunch;
        let rng = &mut self.rng;

        for process in &mut self.processes {
            process.set_current_component(component, bunch);
        }

        let length = component.length();
        let mut s = 0.0;
        loop {
            let remaining = (length - s).max(0.0);
            let ds = self
                .processes
                .iter()
                .filter(|p| p.is_active())
                .map(|p| p.max_allowed_step().max(0.0))
                .fold(None, |acc: Option<f64>, step| {
                    Some(acc.map_or(step, |a| a.min(step)))
                });
            let Some(ds) = ds else {
                drift(bunch, remaining);
                return Ok(());
            };
            let ds = ds.min(remaining);
            drift(bunch, ds);
            s += ds;

            let mut ctx = StepContext {
                component: &mut *component,
                bunch: &mut *bunch,
                rng: &mut *rng,
            };
            for process in &mut self.processes {
                if process.is_active() {
                    process.do_process(ds, &mut ctx)?;
                }
            }
        }
    }

    /// Turns tracked since the last [`ParticleTracker::run`].
    #[must_use]
    pub fn turn(&self) -> u64 {
        self.turn
    }

    /// The tracked bunch.
    #[must_use]
    pub fn bunch(&self) -> &Bunch {
        &self.bunch
    }

    /// Mutable access to the tracked bunch.
    pub fn bunch_mut(&mut self) -> &mut Bunch {
        &mut self.bunch
    }

    /// The beamline.
    #[must_use]
    pub fn beamline(&self) -> &[Component] {
        &self.beamline
    }

    /// The registered processes, in the order they act.
    #[must_use]
    pub fn processes(&self) -> &[Box<dyn BunchProcess>] {
        &self.processes
    }

    /// Total beamline length.
    #[must_use]
    pub fn beamline_length(&self) -> f64 {
        self.beamline.iter().map(Component::length).sum()
    }

    /// Consumes the tracker and returns the bunch.
    #[must_use]
    pub fn into_bunch(self) -> Bunch {
        self.bunch
    }
}

fn drift(bunch: &mut Bunch, ds: f64) {
    if ds <= 0.0 {
        return;
    }
    for particle in bunch.iter_mut() {
        *particle.x_mut() += particle.xp() * ds;
        *particle.y_mut() += particle.yp() * ds;
    }
}
