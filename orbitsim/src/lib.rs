pub mod error;
pub mod simulation;
pub mod configuration;
pub mod benchmark;

pub use error::{ConfigError, SimError};

pub use simulation::states::{BodyFlags, BodyHandle, BodyId, BodyKind, BodySnapshot, BodySpec, Color, NVec2};
pub use simulation::params::{DetectionPolicy, Parameters, VelocityPolicy, World};
pub use simulation::forces::NewtonianGravity;
pub use simulation::collision::CollisionModel;
pub use simulation::hooks::{impact_intensity, ImpactHooks, NoHooks};
pub use simulation::engine::Simulation;
pub use simulation::scenario::{reset_positions, Placement, Scenario};

pub use configuration::config::{BodyConfig, ParametersConfig, PopulationConfig, ScenarioConfig, WorldConfig};

pub use benchmark::benchmark::bench_tick;
