//! System trait, the ordered scheduler, and the fixed-step tick driver.

use tracing::debug;

use crate::render_context::RenderContext;
use crate::world::World;

/// Maximum number of fixed steps one frame may produce. Past this the
/// backlog is discarded: better to lose simulation time than to spiral when
/// a frame takes longer than the ticks it owes.
const MAX_TICKS_PER_FRAME: u32 = 10;

/// A unit of simulation logic invoked once per tick.
///
/// Systems fetch entities through the world's query modes and mutate
/// components through the store API; they hold no entity state of their own
/// beyond explicit side tables.
pub trait System: 'static {
    /// Stable identifier used in logs and diagnostics.
    fn name(&self) -> &'static str;

    /// Advances this system by `dt` seconds of simulation time.
    fn update(&mut self, world: &mut World, dt: f32);

    /// Presentation hook. Most simulation systems leave this empty.
    fn render(&mut self, _world: &mut World, _ctx: &mut RenderContext) {}
}

/// Runs systems in the fixed order declared at construction.
///
/// The order is part of the correctness contract (reconciliation before
/// render, staging consumption after network drain), so there is no API to
/// insert, remove, or reorder systems on a built scheduler.
pub struct SystemScheduler {
    systems: Vec<Box<dyn System>>,
}

/// Assembles a [`SystemScheduler`]. Declare the execution order once, here.
pub struct SchedulerBuilder {
    systems: Vec<Box<dyn System>>,
}

impl SchedulerBuilder {
    /// Appends a system; it will run after everything added before it.
    pub fn with_system(mut self, system: impl System) -> Self {
        self.systems.push(Box::new(system));
        self
    }

    /// Finalizes the order.
    pub fn build(self) -> SystemScheduler {
        let names: Vec<&str> = self.systems.iter().map(|s| s.name()).collect();
        debug!(?names, "system order fixed");
        SystemScheduler {
            systems: self.systems,
        }
    }
}

impl SystemScheduler {
    /// Starts declaring a scheduler.
    pub fn builder() -> SchedulerBuilder {
        SchedulerBuilder {
            systems: Vec::new(),
        }
    }

    /// Runs one tick: advances the world clock, then every system's
    /// `update` strictly in declaration order.
    pub fn update(&mut self, world: &mut World, dt: f32) {
        world.advance_clock(f64::from(dt));
        for system in &mut self.systems {
            system.update(world, dt);
        }
    }

    /// Runs every system's `render` hook in the same fixed order.
    pub fn render(&mut self, world: &mut World, ctx: &mut RenderContext) {
        for system in &mut self.systems {
            system.render(world, ctx);
        }
    }

    /// Declared system names, in execution order.
    pub fn system_names(&self) -> Vec<&'static str> {
        self.systems.iter().map(|s| s.name()).collect()
    }

    /// Number of registered systems.
    pub fn len(&self) -> usize {
        self.systems.len()
    }

    /// Returns `true` if no systems are registered.
    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }
}

/// Fixed-rate step accumulator for the outer frame loop.
///
/// Feeds wall time in, yields whole simulation steps out, so the simulation
/// advances at a stable rate regardless of frame timing.
pub struct TickDriver {
    accumulator: f64,
    tick_duration: f64,
    total_ticks: u64,
}

impl TickDriver {
    /// Creates a driver stepping at `hz` ticks per second.
    pub fn new(hz: u32) -> Self {
        Self {
            accumulator: 0.0,
            tick_duration: 1.0 / f64::from(hz.max(1)),
            total_ticks: 0,
        }
    }

    /// Accumulates `frame_dt` seconds and returns the number of fixed steps
    /// to run now (0..=[`MAX_TICKS_PER_FRAME`]). Backlog beyond the cap is
    /// dropped.
    pub fn accumulate(&mut self, frame_dt: f64) -> u32 {
        self.accumulator += frame_dt.max(0.0);
        let mut steps = 0u32;
        while self.accumulator >= self.tick_duration {
            self.accumulator -= self.tick_duration;
            if steps == MAX_TICKS_PER_FRAME {
                debug!("tick backlog exceeded cap, dropping remainder");
                self.accumulator = 0.0;
                break;
            }
            steps += 1;
            self.total_ticks += 1;
        }
        steps
    }

    /// Seconds of simulation advanced per step.
    pub fn tick_duration(&self) -> f64 {
        self.tick_duration
    }

    /// Total fixed steps yielded since creation.
    pub fn total_ticks(&self) -> u64 {
        self.total_ticks
    }
}
