//! Simulation state
//!
//! [`SimulationState`] owns every live mail item and the bookkeeping
//! around it: the in-flight id list that drives deterministic
//! processing order, the day counter, the sequential id allocator and
//! the set of player towns that still owe an end-of-day confirmation.
//!
//! Every mail item appears in exactly three places while in flight:
//! the `mail` arena (owning record), the `in_flight` list, and its
//! sender's `in_transit` list. Insertion and removal touch all three
//! or none.

use std::collections::{HashMap, HashSet};

use crate::models::mail::{MailError, MailId, MailItem};
use crate::models::town::{World, Zip};
use crate::rng::RngManager;

/// Mail ids wrap at this bound.
const MAIL_ID_MODULUS: u32 = 100_000;

/// Owns all mail in flight plus the day-loop bookkeeping.
#[derive(Debug, Clone, Default)]
pub struct SimulationState {
    /// Owning arena of live mail items.
    mail: HashMap<MailId, MailItem>,

    /// Ids of all items in flight. This list, not the map, defines
    /// processing order.
    pub(crate) in_flight: Vec<MailId>,

    /// Completed day count. Day 0 is the state before any day has run.
    day: u32,

    /// Last allocated mail id. `None` until the first allocation,
    /// which is seeded randomly.
    last_mail_id: Option<u32>,

    /// Player towns that have not yet confirmed the end of the current
    /// review phase.
    pub(crate) pending_operators: HashSet<Zip>,
}

impl SimulationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn day(&self) -> u32 {
        self.day
    }

    /// Number of items currently in flight.
    pub fn mail_count(&self) -> usize {
        self.in_flight.len()
    }

    pub fn in_flight(&self) -> &[MailId] {
        &self.in_flight
    }

    pub fn pending_operators(&self) -> &HashSet<Zip> {
        &self.pending_operators
    }

    pub fn mail(&self, id: MailId) -> Option<&MailItem> {
        self.mail.get(&id)
    }

    pub(crate) fn mail_mut(&mut self, id: MailId) -> Option<&mut MailItem> {
        self.mail.get_mut(&id)
    }

    /// Allocate the next mail id. The first id of a run is drawn from
    /// the RNG; every later id is the previous plus one, wrapping at
    /// 100 000. Ids still held by a live item are skipped so a
    /// long-lived item never collides with a wrapped-around allocation.
    pub(crate) fn allocate_mail_id(&mut self, rng: &mut RngManager) -> MailId {
        let mut next = match self.last_mail_id {
            Some(prev) => (prev + 1) % MAIL_ID_MODULUS,
            None => rng.range(0, 1000) as u32,
        };
        while self.mail.contains_key(&MailId(next)) {
            next = (next + 1) % MAIL_ID_MODULUS;
        }
        self.last_mail_id = Some(next);
        MailId(next)
    }

    /// Register a freshly created item: into the arena, the in-flight
    /// list and its sender's in-transit list.
    pub(crate) fn insert_mail(&mut self, item: MailItem, world: &mut World) {
        let id = item.id();
        let sender = item.sender();
        assert!(
            !self.mail.contains_key(&id),
            "mail id {} already in flight",
            id
        );

        self.mail.insert(id, item);
        self.in_flight.push(id);
        if let Some(s) = world.sender_mut(sender) {
            s.in_transit.push(id);
        }
    }

    /// Remove a delivered item from every collection that tracks it.
    ///
    /// The item must be present in the arena, the in-flight list and
    /// its sender's in-transit list; a missing entry means the
    /// lifecycle bookkeeping has already gone wrong and is reported
    /// rather than patched over.
    pub(crate) fn remove_delivered(
        &mut self,
        id: MailId,
        world: &mut World,
    ) -> Result<MailItem, MailError> {
        let sender = self
            .mail
            .get(&id)
            .map(|m| m.sender())
            .ok_or(MailError::UnknownMail { id })?;

        let flight_pos = self
            .in_flight
            .iter()
            .position(|&m| m == id)
            .ok_or(MailError::NotInFlight { id })?;

        let transit_pos = world
            .sender(sender)
            .and_then(|s| s.in_transit.iter().position(|&m| m == id))
            .ok_or(MailError::NotInFlight { id })?;

        // All three memberships verified; now remove atomically.
        self.in_flight.remove(flight_pos);
        if let Some(s) = world.sender_mut(sender) {
            s.in_transit.remove(transit_pos);
        }
        Ok(self.mail.remove(&id).expect("membership checked above"))
    }

    /// Advance to the next day.
    pub(crate) fn advance_day(&mut self) {
        self.day += 1;
    }
}
