pub mod config;
pub mod energy_engine;
pub mod engine;
pub mod processor;
pub mod state;
pub mod types;

pub use config::VadConfig;
pub use energy_engine::EnergyVad;
pub use engine::VadEngine;
pub use processor::VadProcessor;
pub use state::VadStateMachine;
pub use types::{VadEvent, VadMetrics, VadState, VadUpdate};
