//! # Postal Network Simulation Core
//!
//! Deterministic simulation of a procedurally generated postal
//! network: towns connected by roads, streets of houses, residents who
//! write to each other, and the mail that moves between them one hop
//! per day.
//!
//! The crate is the core engine only. A UI, narrative layer or
//! multiplayer transport sits on top of [`Orchestrator`] and the types
//! re-exported here.
//!
//! ## Example
//! ```
//! use postal_simulator_core_rs::{DayRuleset, Orchestrator, SimulationConfig};
//!
//! let mut sim = Orchestrator::new(SimulationConfig::new(12345)).unwrap();
//! let result = sim.run_day(&DayRuleset::default()).unwrap();
//! assert_eq!(result.day, 0);
//!
//! // Review queues are now open; every player town must sign off
//! // before the next day can run.
//! for zip in sim.world().player_zips() {
//!     sim.end_day(zip).unwrap();
//! }
//! sim.run_day(&DayRuleset::default()).unwrap();
//! ```

pub mod engine;
pub mod models;
pub mod orchestrator;
pub mod routing;
pub mod rng;
pub mod worldgen;

pub use engine::{AdvanceOutcome, MailProbabilities};
pub use models::{
    HouseRef, Location, MailError, MailId, MailItem, NoteKind, Notification, SenderId,
    SimulationState, Stamp, Town, World, Zip,
};
pub use orchestrator::{
    DayResult, DayRuleset, MailSummary, Orchestrator, RouteTarget, SimulationConfig,
    SimulationError,
};
pub use routing::RoutingTable;
pub use rng::RngManager;
pub use worldgen::{GenerationReport, WorldGenSettings};
