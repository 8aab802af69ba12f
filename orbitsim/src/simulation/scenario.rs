//! Build a populated simulation from configuration
//!
//! Takes a `ScenarioConfig` (YAML-facing) and produces a runtime `Scenario`
//! holding:
//! - validated `Parameters`
//! - the population recipe (anchor, moon, random satellites, hand-placed bodies)
//!
//! `Scenario::populate` then registers the bodies on a `Simulation`, and
//! `reset_positions` re-scatters a running population.

use std::thread;

use rand::Rng;
use serde::Deserialize;
use tracing::info;

use crate::configuration::config::{BodyConfig, ScenarioConfig};
use crate::error::{ConfigError, SimError};
use crate::simulation::anchor::ANCHOR_NAME;
use crate::simulation::engine::Simulation;
use crate::simulation::params::{Parameters, VelocityPolicy, World};
use crate::simulation::states::{BodyFlags, BodyHandle, BodyKind, BodySpec, NVec2};

pub const MOON_NAME: &str = "Luna";
pub const MOON_MASS: f64 = 50.0;
pub const MOON_RADIUS: f64 = 23.9;
/// Moon start point relative to the world center.
pub const MOON_OFFSET: (f64, f64) = (-200.0, 100.0);

pub const SATELLITE_MASS_RANGE: (u32, u32) = (2, 12);

/// Region in which random satellites are scattered.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    /// All around, extending half a world beyond each edge
    AllAroundBeyond,
    /// All around, inside the world
    AllAroundInside,
    #[default]
    Above,
    Below,
    Left,
    Right,
}

/// Inclusive scatter bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl Placement {
    pub fn bounds(&self, world: &World) -> Bounds {
        let (w, h) = (world.width, world.height);
        let (min_x, max_x, min_y, max_y) = match self {
            Self::AllAroundBeyond => (-w / 2.0, w * 1.5, -h / 2.0, h * 1.5),
            Self::AllAroundInside => (0.0, w, 0.0, h),
            Self::Above => (-w / 3.0, w * 4.0 / 3.0, -h * 2.0 / 3.0, h / 3.0),
            Self::Below => (-w / 3.0, w * 4.0 / 3.0, h / 2.0, h * 1.5),
            Self::Left => (-w * 2.0 / 3.0, w / 3.0, -h / 3.0, h * 4.0 / 3.0),
            Self::Right => (w / 2.0, w * 1.5, -h / 3.0, h * 4.0 / 3.0),
        };
        Bounds { min_x, max_x, min_y, max_y }
    }
}

impl Bounds {
    /// Random whole-pixel point inside the bounds.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> NVec2 {
        NVec2::new(
            rng.gen_range(self.min_x..=self.max_x).round(),
            rng.gen_range(self.min_y..=self.max_y).round(),
        )
    }
}

/// Runtime population recipe.
#[derive(Debug, Clone)]
pub struct Population {
    pub satellites: usize,
    pub use_earth: bool,
    pub use_moon: bool,
    pub placement: Placement,
    pub velocity_x: VelocityPolicy,
    pub velocity_y: VelocityPolicy,
    pub flags: BodyFlags, // applied to the moon and every satellite
    pub extra: Vec<BodyConfig>,
}

/// A validated scenario, ready to populate a `Simulation`
#[derive(Debug, Clone)]
pub struct Scenario {
    pub parameters: Parameters,
    pub population: Population,
}

impl Scenario {
    pub fn build_scenario(cfg: ScenarioConfig) -> Result<Self, ConfigError> {
        cfg.validate()?;

        // World + parameters (runtime) from config
        let world = World::new(cfg.world.width, cfg.world.height)
            .map_err(|e| ConfigError::invalid("world", e.to_string()))?;
        let p_cfg = &cfg.parameters;
        let mut parameters = Parameters::new(world);
        parameters.G = p_cfg.gravitational_constant;
        parameters.tick = std::time::Duration::from_millis(p_cfg.tick_ms);
        parameters.gravity_divisor = p_cfg.gravity_divisor;
        parameters.flash = std::time::Duration::from_millis(p_cfg.flash_ms);
        parameters.detection = p_cfg.detection;
        parameters.seed = p_cfg.seed;
        parameters
            .validate()
            .map_err(|e| ConfigError::invalid("parameters", e.to_string()))?;

        // Population recipe
        let pop = &cfg.population;
        let population = Population {
            satellites: pop.satellites,
            use_earth: pop.use_earth,
            use_moon: pop.use_moon,
            placement: pop.placement,
            velocity_x: pop.velocity_x.to_policy("population.velocity_x")?,
            velocity_y: pop.velocity_y.to_policy("population.velocity_y")?,
            flags: BodyFlags {
                wrap_mode: pop.wrap_mode,
                use_collisions: pop.use_collisions,
                use_sound: pop.use_sound,
                ..BodyFlags::default()
            },
            extra: cfg.bodies.clone(),
        };

        Ok(Self { parameters, population })
    }

    /// Register the anchor, the moon, the random satellites and any
    /// hand-placed bodies, in that order.
    pub fn populate(&self, sim: &Simulation) -> Result<Vec<BodyHandle>, SimError> {
        let pop = &self.population;
        let world = sim.params().world;
        let divisor = sim.params().gravity_divisor;
        let (cx, cy) = world.center();
        let mut handles = Vec::new();

        if pop.use_earth {
            handles.push(sim.create_anchor()?);
        }

        let mut remaining = pop.satellites;
        if pop.use_moon {
            let velocity = self.initial_velocity(sim);
            handles.push(sim.add_body(BodySpec {
                name: MOON_NAME.to_string(),
                mass: MOON_MASS,
                radius: MOON_RADIUS,
                position: NVec2::new(cx + MOON_OFFSET.0, cy + MOON_OFFSET.1),
                velocity,
                gravity_divisor: divisor,
                flags: pop.flags,
            })?);
            remaining = remaining.saturating_sub(1);
        }

        let bounds = pop.placement.bounds(&world);
        for _ in 0..remaining {
            let (position, mass) = {
                let mut rng = sim.rng();
                let position = bounds.sample(&mut *rng);
                let mass = rng.gen_range(SATELLITE_MASS_RANGE.0..=SATELLITE_MASS_RANGE.1) as f64;
                (position, mass)
            };
            let velocity = self.initial_velocity(sim);
            handles.push(sim.add_body(BodySpec {
                name: format!("Satellite {mass}"),
                mass,
                radius: 1.0 + mass,
                position,
                velocity,
                gravity_divisor: divisor,
                flags: pop.flags,
            })?);
        }

        for b in &pop.extra {
            let v = if b.v.len() == 2 { NVec2::new(b.v[0], b.v[1]) } else { NVec2::zeros() };
            handles.push(sim.add_body(BodySpec {
                name: b.name.clone(),
                mass: b.m,
                radius: b.radius,
                position: NVec2::new(b.x[0], b.x[1]),
                velocity: v,
                gravity_divisor: divisor,
                flags: pop.flags,
            })?);
        }

        info!(
            bodies = handles.len(),
            earth = pop.use_earth,
            moon = pop.use_moon,
            placement = ?pop.placement,
            "population created"
        );
        Ok(handles)
    }

    fn initial_velocity(&self, sim: &Simulation) -> NVec2 {
        let mut rng = sim.rng();
        NVec2::new(
            self.population.velocity_x.sample(&mut *rng),
            self.population.velocity_y.sample(&mut *rng),
        )
    }
}

/// Put every body back at a start point.
///
/// Motion is frozen first (gravity and inertia off), the anchor is
/// re-centered, the moon returns to its start point and satellites are
/// re-scattered within `placement`. After two tick periods, so that ticks
/// already in flight finish without measuring the jump as velocity, gravity
/// and inertia come back on with freshly randomized velocities. The anchor
/// only gets gravity back.
pub fn reset_positions(sim: &Simulation, placement: Placement) {
    let world = sim.params().world;
    let bounds = placement.bounds(&world);
    let (cx, cy) = world.center();
    let members = sim.members();

    for body in &members {
        let position = match (body.kind(), body.name()) {
            (BodyKind::Anchor, _) => NVec2::new(cx, cy),
            (_, MOON_NAME) => NVec2::new(cx + MOON_OFFSET.0, cy + MOON_OFFSET.1),
            _ => bounds.sample(&mut *sim.rng()),
        };
        let mut state = body.lock();
        state.flags.use_gravity = false;
        state.flags.use_inertia = false;
        state.set_position(position);
        state.velocity = NVec2::zeros();
    }

    thread::sleep(sim.params().tick * 2);

    for body in &members {
        let velocity = {
            let mut rng = sim.rng();
            NVec2::new(
                VelocityPolicy::Random.sample(&mut *rng),
                VelocityPolicy::Random.sample(&mut *rng),
            )
        };
        let mut state = body.lock();
        state.flags.use_gravity = true;
        if !body.is_anchor() {
            state.flags.use_inertia = true;
            state.velocity = velocity;
        }
    }

    info!(bodies = members.len(), anchor = ANCHOR_NAME, ?placement, "positions reset");
}
