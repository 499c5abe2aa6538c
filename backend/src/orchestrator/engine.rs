//! The day-loop orchestrator
//!
//! Owns the world, the routing table, the mail state and the RNG, and
//! runs whole days. A day is:
//!
//! 1. Leftovers: queued items the operator never routed fall back to
//!    automatic handling; queues and new-mail counters reset.
//! 2. Decide-all: the in-flight order is shuffled, then every item
//!    either keeps its operator override or runs the automatic decide
//!    phase. Per-item failures are collected, never fatal for the day.
//! 3. Commit-all: every decided item is advanced. No decision observes
//!    a same-day commit.
//! 4. Admission: items sitting at player towns enter review queues
//!    under the quota rules, story mail unconditionally.
//! 5. Top-up: under-quota queues are fed with freshly synthesized mail
//!    from the town's own citizens, bounded attempts.
//! 6. The day counter advances, notification queues drain into the
//!    report and the operator barrier re-arms.
//!
//! Between days the orchestrator refuses `run_day` until every player
//! town has called [`Orchestrator::end_day`].

use std::collections::{HashMap, HashSet};

use crate::engine::{self, AdvanceOutcome};
use crate::models::mail::{Location, MailError, MailId, MailItem};
use crate::models::state::SimulationState;
use crate::models::town::{SenderId, Town, World, Zip};
use crate::orchestrator::{
    DayResult, DayRuleset, MailSummary, RouteTarget, SimulationConfig, SimulationError,
};
use crate::routing::RoutingTable;
use crate::rng::RngManager;
use crate::worldgen::{self, GenerationReport};

/// Top-up stops after this many synthesis attempts per town per day.
const TOPUP_ATTEMPTS: usize = 32;

/// Drives the simulation day by day. See the module docs for the
/// phase breakdown.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    config: SimulationConfig,
    rng: RngManager,
    world: World,
    routing: RoutingTable,
    state: SimulationState,
    report: GenerationReport,
}

impl Orchestrator {
    /// Validate the configuration, generate the world and build the
    /// routing table.
    pub fn new(config: SimulationConfig) -> Result<Self, SimulationError> {
        validate_config(&config)?;

        let mut rng = RngManager::new(config.rng_seed);
        let (world, report) = worldgen::generate(&config.world, &mut rng)?;
        let routing = RoutingTable::build(&world);

        Ok(Self {
            config,
            rng,
            world,
            routing,
            state: SimulationState::new(),
            report,
        })
    }

    /// Run on a hand-built world instead of a generated one. Meant for
    /// scripted scenarios; the generation report stays empty.
    pub fn with_world(config: SimulationConfig, world: World) -> Result<Self, SimulationError> {
        if world.towns().is_empty() {
            return Err(SimulationError::InvalidConfig(
                "world has no towns".to_string(),
            ));
        }
        let probs = &config.probabilities;
        for p in [
            probs.sender_shortpays,
            probs.sender_damages_mail,
            probs.router_damages_mail,
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(SimulationError::InvalidConfig(format!(
                    "probability must be within [0, 1], got {}",
                    p
                )));
            }
        }
        let rng = RngManager::new(config.rng_seed);
        let routing = RoutingTable::build(&world);
        Ok(Self {
            config,
            rng,
            world,
            routing,
            state: SimulationState::new(),
            report: GenerationReport {
                connecting_requested: 0,
                connecting_placed: 0,
                additional_requested: 0,
                additional_placed: 0,
            },
        })
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn routing(&self) -> &RoutingTable {
        &self.routing
    }

    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    pub fn generation_report(&self) -> &GenerationReport {
        &self.report
    }

    /// Completed day count.
    pub fn current_day(&self) -> u32 {
        self.state.day()
    }

    /// Recompute the routing table. Required after any road change.
    pub fn rebuild_routing(&mut self) {
        self.routing = RoutingTable::build(&self.world);
    }

    /// Run one full day under the given quota rules.
    ///
    /// Refuses to run while any player town still owes an `end_day`
    /// call from the previous review phase.
    pub fn run_day(&mut self, ruleset: &DayRuleset) -> Result<DayResult, SimulationError> {
        if !self.state.pending_operators.is_empty() {
            let mut remaining: Vec<Zip> = self.state.pending_operators.iter().copied().collect();
            remaining.sort_unstable();
            return Err(SimulationError::OperatorsPending { remaining });
        }
        if ruleset.new_mail_quota > ruleset.mail_quota || ruleset.mail_quota > ruleset.mail_limit {
            return Err(SimulationError::InvalidConfig(format!(
                "quotas must satisfy new_mail_quota <= mail_quota <= mail_limit, got {}/{}/{}",
                ruleset.new_mail_quota, ruleset.mail_quota, ruleset.mail_limit
            )));
        }

        let day = self.state.day();
        let player_zips = self.world.player_zips();

        // Phase 1: leftovers.
        let mut leftovers = HashMap::new();
        for &zip in &player_zips {
            let queued: Vec<MailId> = self
                .world
                .town(zip)
                .map(|t| t.review_queue().to_vec())
                .unwrap_or_default();
            let mut left = 0;
            for id in queued {
                if let Some(item) = self.state.mail_mut(id) {
                    if !item.action.is_routed() {
                        left += 1;
                        item.is_auto = true;
                    }
                }
            }
            if let Some(town) = self.world.town_mut(zip) {
                town.review_queue.clear();
                town.new_in_queue = 0;
            }
            leftovers.insert(zip, left);
        }

        // Phase 2: decide-all over a shuffled order.
        self.rng.shuffle(&mut self.state.in_flight);
        let order = self.state.in_flight.clone();
        let mut failures = Vec::new();
        let mut failed = HashSet::new();
        for &id in &order {
            let Some(item) = self.state.mail(id) else {
                continue;
            };
            if !item.is_auto() && item.action().is_routed() {
                // Operator override stands for exactly one day.
                if let Some(item) = self.state.mail_mut(id) {
                    item.is_auto = true;
                }
                continue;
            }
            if let Err(err) = engine::handle(
                &self.world,
                &mut self.state,
                &self.routing,
                &self.config.probabilities,
                &mut self.rng,
                id,
            ) {
                log::warn!("decide failed for mail {}: {}", id, err);
                failed.insert(id);
                failures.push((id, err));
            }
        }

        // Phase 3: commit-all.
        let mut delivered = 0;
        for &id in &order {
            if failed.contains(&id) || self.state.mail(id).is_none() {
                continue;
            }
            match engine::advance(&mut self.world, &mut self.state, id) {
                Ok(AdvanceOutcome::Delivered) => delivered += 1,
                Ok(AdvanceOutcome::Moved) => {}
                Err(err) => {
                    log::warn!("commit failed for mail {}: {}", id, err);
                    failures.push((id, err));
                }
            }
        }

        // Phase 4: admission.
        for &zip in &player_zips {
            self.admit_for_town(zip, ruleset);
        }

        // Phase 5: top-up from the town's own citizens.
        let mut generated = 0;
        for &zip in &player_zips {
            let citizens = self.world.citizens_of(zip);
            if citizens.is_empty() {
                continue;
            }
            for _ in 0..TOPUP_ATTEMPTS {
                let (queued, fresh_queued) = self.queue_counts(zip);
                if queued >= ruleset.mail_limit
                    || queued >= ruleset.mail_quota
                    || fresh_queued >= ruleset.new_mail_quota
                {
                    break;
                }
                let sender = *self.rng.pick(&citizens);
                let Some(id) = engine::generate_mail_from(
                    &mut self.world,
                    &mut self.state,
                    &self.config.probabilities,
                    &mut self.rng,
                    sender,
                ) else {
                    break;
                };
                generated += 1;
                self.admit(zip, id);
            }
        }

        // Phase 6: close the day out.
        self.state.advance_day();
        let mut notifications = HashMap::new();
        for town in self.world.towns.iter_mut() {
            if town.notes.is_empty() {
                continue;
            }
            notifications.insert(town.zip(), std::mem::take(&mut town.notes));
        }
        self.state.pending_operators = player_zips.iter().copied().collect();

        Ok(DayResult {
            day,
            notifications,
            leftovers,
            delivered,
            generated,
            failures,
        })
    }

    /// The review queue of a player town as operator-facing summaries.
    pub fn list_queue(&self, zip: Zip) -> Result<Vec<MailSummary>, SimulationError> {
        let town = self.player_town(zip)?;
        Ok(town
            .review_queue()
            .iter()
            .filter_map(|&id| self.state.mail(id))
            .map(|item| self.summarize(item))
            .collect())
    }

    /// Route a queued item by hand. The target must be a directly
    /// connected town or a house inside this town.
    pub fn override_route(
        &mut self,
        zip: Zip,
        id: MailId,
        target: RouteTarget,
    ) -> Result<(), SimulationError> {
        self.queued_here(zip, id)?;
        let next = match target {
            RouteTarget::Town(t) => {
                if !self.world.are_connected(zip, t) {
                    return Err(SimulationError::InvalidRoute {
                        zip,
                        reason: format!("town {} is not a neighbor", t),
                    });
                }
                Location::Town(t)
            }
            RouteTarget::House(href) => {
                if href.zip != zip {
                    return Err(SimulationError::InvalidRoute {
                        zip,
                        reason: format!("house is in town {}, not here", href.zip),
                    });
                }
                if self.world.house(href).is_none() {
                    return Err(SimulationError::InvalidRoute {
                        zip,
                        reason: "no such house".to_string(),
                    });
                }
                Location::House(href)
            }
        };
        let item = self
            .state
            .mail_mut(id)
            .ok_or(MailError::UnknownMail { id })?;
        item.action.reset();
        item.action.next = Some(next);
        Ok(())
    }

    /// Repair a queued item by one level.
    pub fn repair_item(&mut self, zip: Zip, id: MailId) -> Result<(), SimulationError> {
        self.queued_here(zip, id)?;
        let item = self
            .state
            .mail_mut(id)
            .ok_or(MailError::UnknownMail { id })?;
        item.repair();
        Ok(())
    }

    /// Confirm the end of this town's review phase. Calling again in
    /// the same phase is a no-op.
    pub fn end_day(&mut self, zip: Zip) -> Result<(), SimulationError> {
        self.player_town(zip)?;
        self.state.pending_operators.remove(&zip);
        Ok(())
    }

    /// Inject a narrative letter between two known senders.
    pub fn inject_story_mail(
        &mut self,
        sender: SenderId,
        recipient: SenderId,
    ) -> Result<MailId, SimulationError> {
        Ok(engine::inject_story_mail(
            &mut self.world,
            &mut self.state,
            &self.config.probabilities,
            &mut self.rng,
            sender,
            recipient,
        )?)
    }

    fn player_town(&self, zip: Zip) -> Result<&Town, SimulationError> {
        let town = self
            .world
            .town(zip)
            .ok_or(MailError::UnknownTown { zip })?;
        if !town.is_player() {
            return Err(SimulationError::NotPlayerControlled { zip });
        }
        Ok(town)
    }

    fn queued_here(&self, zip: Zip, id: MailId) -> Result<(), SimulationError> {
        let town = self.player_town(zip)?;
        if !town.review_queue().contains(&id) {
            return Err(SimulationError::NotInQueue { zip, id });
        }
        Ok(())
    }

    fn queue_counts(&self, zip: Zip) -> (usize, usize) {
        self.world
            .town(zip)
            .map(|t| (t.review_queue().len(), t.new_in_queue))
            .unwrap_or((0, 0))
    }

    /// Queue admission for one player town: story mail first and
    /// unconditionally, then fresh items while the new-mail quota
    /// holds, then aged items while the queue stays under the overall
    /// quota. Candidates are taken in in-flight order.
    fn admit_for_town(&mut self, zip: Zip, ruleset: &DayRuleset) {
        let candidates: Vec<(MailId, bool, bool)> = self
            .state
            .in_flight
            .iter()
            .filter_map(|&id| self.state.mail(id))
            .filter(|m| m.location() == Location::Town(zip))
            .map(|m| (m.id(), m.is_story(), m.age() == 0))
            .collect();

        for &(id, story, _) in &candidates {
            if story {
                self.admit(zip, id);
            }
        }
        for &(id, story, fresh) in &candidates {
            if story || !fresh {
                continue;
            }
            let (queued, fresh_queued) = self.queue_counts(zip);
            if queued < ruleset.mail_limit && fresh_queued < ruleset.new_mail_quota {
                self.admit(zip, id);
            }
        }
        for &(id, story, fresh) in &candidates {
            if story || fresh {
                continue;
            }
            let (queued, _) = self.queue_counts(zip);
            if queued < ruleset.mail_limit && queued < ruleset.mail_quota {
                self.admit(zip, id);
            }
        }
    }

    /// Put an item into a town's review queue and hand control to the
    /// operator for the next day.
    fn admit(&mut self, zip: Zip, id: MailId) {
        let Some(item) = self.state.mail_mut(id) else {
            return;
        };
        item.is_auto = false;
        item.action.reset();
        let fresh = item.age() == 0;
        if let Some(town) = self.world.town_mut(zip) {
            town.review_queue.push(id);
            if fresh {
                town.new_in_queue += 1;
            }
        }
    }

    fn summarize(&self, item: &MailItem) -> MailSummary {
        MailSummary {
            id: item.id(),
            origin: item.origin().to_string(),
            destination: item.destination().to_string(),
            damage: item.damage_level(),
            repair: item.repair_level(),
            stamp: item.stamp(),
            previous: self.world.location_address(item.previous()),
            next: item.action().next.map(|loc| self.world.location_address(loc)),
            age: item.age(),
            is_story: item.is_story(),
        }
    }
}

fn validate_config(config: &SimulationConfig) -> Result<(), SimulationError> {
    if config.world.num_connecting_towns + config.world.num_additional_towns == 0 {
        return Err(SimulationError::InvalidConfig(
            "at least one town besides the root is required".to_string(),
        ));
    }
    if config.world.min_town_sep <= 0.0 {
        return Err(SimulationError::InvalidConfig(
            "min_town_sep must be positive".to_string(),
        ));
    }
    if config.world.min_town_sep >= worldgen::CONNECT_RADIUS_MAX {
        return Err(SimulationError::InvalidConfig(format!(
            "min_town_sep must be below {}, got {}",
            worldgen::CONNECT_RADIUS_MAX,
            config.world.min_town_sep
        )));
    }
    if config.world.town_size_mul <= 0.0 {
        return Err(SimulationError::InvalidConfig(
            "town_size_mul must be positive".to_string(),
        ));
    }
    let probs = &config.probabilities;
    for (name, p) in [
        ("sender_shortpays", probs.sender_shortpays),
        ("sender_damages_mail", probs.sender_damages_mail),
        ("router_damages_mail", probs.router_damages_mail),
    ] {
        if !(0.0..=1.0).contains(&p) {
            return Err(SimulationError::InvalidConfig(format!(
                "{} must be within [0, 1], got {}",
                name, p
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::mail::Stamp;
    use crate::models::town::{House, HouseRef, Street};

    /// One player town with two senders, for staging queue scenarios.
    fn scripted_town() -> (World, HouseRef, SenderId, SenderId) {
        let mut world = World::new();
        let mut town = Town::new(10000, "Roothaven".to_string(), (0.0, 0.0), true);
        town.add_street(Street::new(
            "Main Street".to_string(),
            vec![House::new(1), House::new(2)],
        ));
        world.add_town(town);
        let home0 = HouseRef { zip: 10000, street: 0, house: 0 };
        let home1 = HouseRef { zip: 10000, street: 0, house: 1 };
        let s0 = world.add_sender("Ada Hart", home0);
        let s1 = world.add_sender("Silas Thorne", home1);
        (world, home0, s0, s1)
    }

    #[test]
    fn test_admission_respects_quotas() {
        let (world, home, s0, s1) = scripted_town();
        let mut orch = Orchestrator::with_world(SimulationConfig::new(1), world).unwrap();

        // Three fresh items then three aged ones, all waiting at the
        // post office.
        for i in 0..6u32 {
            let mut item = MailItem::new(
                MailId(i),
                s0,
                s1,
                "from".to_string(),
                "to".to_string(),
                10000,
                10000,
                home,
                Stamp::Local,
                0,
                false,
            );
            if i >= 3 {
                item.age = 1;
            }
            orch.state.insert_mail(item, &mut orch.world);
        }

        let ruleset = DayRuleset {
            mail_limit: 5,
            new_mail_quota: 2,
            mail_quota: 4,
        };
        orch.admit_for_town(10000, &ruleset);

        // Two fresh under the new-mail quota, then aged items up to
        // the overall quota of four.
        let queue = orch.world.town(10000).unwrap().review_queue().to_vec();
        assert_eq!(
            queue,
            vec![MailId(0), MailId(1), MailId(3), MailId(4)]
        );
        for &id in &queue {
            let item = orch.state.mail(id).unwrap();
            assert!(!item.is_auto());
            assert!(!item.action().is_routed());
        }
    }

    #[test]
    fn test_story_mail_ignores_quotas() {
        let (world, home, s0, s1) = scripted_town();
        let mut orch = Orchestrator::with_world(SimulationConfig::new(1), world).unwrap();

        for i in 0..3u32 {
            let mut item = MailItem::new(
                MailId(i),
                s0,
                s1,
                "from".to_string(),
                "to".to_string(),
                10000,
                10000,
                home,
                Stamp::Local,
                0,
                i == 2, // the last one is story mail
            );
            item.age = 1;
            orch.state.insert_mail(item, &mut orch.world);
        }

        // A quota of zero admits nothing but the story item.
        let ruleset = DayRuleset {
            mail_limit: 1,
            new_mail_quota: 0,
            mail_quota: 0,
        };
        orch.admit_for_town(10000, &ruleset);

        let queue = orch.world.town(10000).unwrap().review_queue().to_vec();
        assert_eq!(queue, vec![MailId(2)]);
    }

    #[test]
    fn test_story_mail_rejects_unknown_sender() {
        let (world, _home, s0, _s1) = scripted_town();
        let mut orch = Orchestrator::with_world(SimulationConfig::new(1), world).unwrap();
        let bad = orch.world().senders().len();
        assert_eq!(
            orch.inject_story_mail(bad, s0),
            Err(SimulationError::Mail(MailError::UnknownSender { id: bad }))
        );
        assert_eq!(orch.state().mail_count(), 0);
    }

    #[test]
    fn test_new_rejects_rootless_world() {
        let mut config = SimulationConfig::new(1);
        config.world.num_connecting_towns = 0;
        config.world.num_additional_towns = 0;
        assert!(matches!(
            Orchestrator::new(config),
            Err(SimulationError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_new_rejects_bad_probability() {
        let mut config = SimulationConfig::new(1);
        config.probabilities.router_damages_mail = 1.5;
        assert!(matches!(
            Orchestrator::new(config),
            Err(SimulationError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_new_rejects_separation_wider_than_connecting_ring() {
        let mut config = SimulationConfig::new(1);
        config.world.num_connecting_towns = 1;
        config.world.min_town_sep = 350.0;
        assert!(matches!(
            Orchestrator::new(config),
            Err(SimulationError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_run_day_rejects_incoherent_quotas() {
        let mut orch = Orchestrator::new(SimulationConfig::new(12345)).unwrap();
        let ruleset = DayRuleset {
            mail_limit: 4,
            new_mail_quota: 3,
            mail_quota: 6,
        };
        assert!(matches!(
            orch.run_day(&ruleset),
            Err(SimulationError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_operator_calls_reject_npc_towns() {
        let orch = Orchestrator::new(SimulationConfig::new(12345)).unwrap();
        let npc = orch
            .world()
            .towns()
            .iter()
            .find(|t| !t.is_player())
            .map(|t| t.zip())
            .unwrap();
        assert_eq!(
            orch.list_queue(npc).unwrap_err(),
            SimulationError::NotPlayerControlled { zip: npc }
        );
    }
}
