//! Simulation orchestration
//!
//! The [`Orchestrator`] owns a generated world and drives the day
//! loop: leftovers, decide-all, commit-all, queue admission, top-up,
//! notification drain. The shared types it exposes to the outside
//! (configuration, day reports, queue summaries, the error taxonomy)
//! live here.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::MailProbabilities;
use crate::models::event::Notification;
use crate::models::mail::{MailError, MailId, Stamp};
use crate::models::town::{HouseRef, Zip};
use crate::worldgen::WorldGenSettings;

pub mod engine;

pub use engine::Orchestrator;

/// Everything needed to reproduce a simulation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Seed for all randomness. Same seed, same run.
    pub rng_seed: u64,

    pub world: WorldGenSettings,

    pub probabilities: MailProbabilities,
}

impl SimulationConfig {
    /// Config with default world and probability settings.
    pub fn new(rng_seed: u64) -> Self {
        Self {
            rng_seed,
            world: WorldGenSettings::default(),
            probabilities: MailProbabilities::default(),
        }
    }
}

/// Queue quota rules for one day. The orchestrator requires
/// `new_mail_quota <= mail_quota <= mail_limit`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayRuleset {
    /// Hard cap on a review queue's length.
    pub mail_limit: usize,

    /// How many age-zero items a queue may take in one day.
    pub new_mail_quota: usize,

    /// Soft target; aged admissions and top-up stop at this length.
    pub mail_quota: usize,
}

impl Default for DayRuleset {
    fn default() -> Self {
        Self {
            mail_limit: 8,
            new_mail_quota: 3,
            mail_quota: 6,
        }
    }
}

/// Where an operator wants a queued item sent next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RouteTarget {
    /// A directly connected town.
    Town(Zip),

    /// A house inside the operator's own town.
    House(HouseRef),
}

/// Read-only view of one queued item for the operator UI.
#[derive(Debug, Clone, Serialize)]
pub struct MailSummary {
    pub id: MailId,
    pub origin: String,
    pub destination: String,
    pub damage: u8,
    pub repair: u8,
    pub stamp: Stamp,
    pub previous: String,
    pub next: Option<String>,
    pub age: u32,
    pub is_story: bool,
}

impl fmt::Display for MailSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | {} -> {} | {}/{} | {}",
            self.id,
            self.origin,
            self.destination,
            self.damage,
            self.repair,
            self.stamp.level()
        )
    }
}

/// What one simulated day produced.
#[derive(Debug, Clone)]
pub struct DayResult {
    /// The day that just ran (first day is 0).
    pub day: u32,

    /// Notifications drained from every town's pending queue.
    pub notifications: HashMap<Zip, Vec<Notification>>,

    /// Per player town, how many queued items the operator never
    /// routed and the post office handled automatically.
    pub leftovers: HashMap<Zip, usize>,

    /// Items delivered today.
    pub delivered: usize,

    /// Items synthesized by queue top-up today.
    pub generated: usize,

    /// Per-item engine failures. A failing item skips its turn; it
    /// does not abort the day.
    pub failures: Vec<(MailId, MailError)>,
}

/// Errors from the orchestration layer.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SimulationError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The review phase is still open; these towns have not called
    /// `end_day` yet.
    #[error("{} operator(s) have not ended their day", .remaining.len())]
    OperatorsPending { remaining: Vec<Zip> },

    #[error("town {zip} is not player controlled")]
    NotPlayerControlled { zip: Zip },

    #[error("mail {id} is not in the review queue of town {zip}")]
    NotInQueue { zip: Zip, id: MailId },

    #[error("invalid route from town {zip}: {reason}")]
    InvalidRoute { zip: Zip, reason: String },

    #[error(transparent)]
    Mail(#[from] MailError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mail_summary_display() {
        let summary = MailSummary {
            id: MailId(42),
            origin: "Ada Hart, 2 Main Street, Roothaven, 10000".to_string(),
            destination: "Silas Thorne, 1 Mill Road, Milltown, 10001".to_string(),
            damage: 2,
            repair: 1,
            stamp: Stamp::InterTown,
            previous: "Roothaven, 10000".to_string(),
            next: None,
            age: 3,
            is_story: false,
        };
        assert_eq!(
            summary.to_string(),
            "#00042 | Ada Hart, 2 Main Street, Roothaven, 10000 -> \
             Silas Thorne, 1 Mill Road, Milltown, 10001 | 2/1 | 2"
        );
    }

    #[test]
    fn test_default_ruleset_is_coherent() {
        let rules = DayRuleset::default();
        assert!(rules.new_mail_quota <= rules.mail_quota);
        assert!(rules.mail_quota <= rules.mail_limit);
    }

    #[test]
    fn test_config_round_trips_through_json() {
        let config = SimulationConfig::new(12345);
        let json = serde_json::to_string(&config).unwrap();
        let back: SimulationConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.rng_seed, 12345);
        assert_eq!(back.world.num_connecting_towns, config.world.num_connecting_towns);
    }
}
