pub mod states;
pub mod params;
pub mod registry;
pub mod forces;
pub mod collision;
pub mod integrator;
pub mod hooks;
pub mod anchor;
pub mod scheduler;
pub mod engine;
pub mod scenario;
