//! Mail item model
//!
//! A [`MailItem`] is the unit that moves through the postal network.
//! Each item carries:
//! - Sender and recipient ids plus the origin/destination addresses
//!   captured at creation
//! - A location that is either "at a town" or "at a house", plus the
//!   location one step back
//! - Damage (0..=3) and repair (0..=damage) levels
//! - A postage stamp level reflecting under/correct payment
//! - An ephemeral [`MailAction`] recomputed every day by the decide
//!   phase and consumed by the commit phase
//!
//! The owned record lives in exactly one place (the state's mail arena);
//! every queue and list elsewhere holds [`MailId`]s only.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::town::{HouseRef, SenderId, Zip};

/// Damage level ceiling. Repair can never exceed the current damage.
pub const MAX_DAMAGE: u8 = 3;

/// Unique sequential mail identifier.
///
/// Ids wrap at 100 000 and render in the `#00042` style used by the
/// operator-facing detail line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MailId(pub u32);

impl fmt::Display for MailId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:05}", self.0)
    }
}

/// Where a piece of mail currently sits. Exactly one of the two,
/// never both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Location {
    /// At a town's post office.
    Town(Zip),

    /// At a specific house.
    House(HouseRef),
}

/// Postage level on a mail item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stamp {
    /// No postage paid.
    Unpaid,

    /// Paid for delivery within one town.
    Local,

    /// Paid for delivery between towns.
    InterTown,
}

impl Stamp {
    /// Numeric level: 0 unpaid, 1 local, 2 inter-town.
    pub fn level(&self) -> u8 {
        match self {
            Stamp::Unpaid => 0,
            Stamp::Local => 1,
            Stamp::InterTown => 2,
        }
    }
}

/// Errors raised by the mail state machine.
///
/// The four mishandling flags on [`MailAction`] are *not* errors; they
/// are expected domain outcomes surfaced as notifications. These
/// variants mark genuine inconsistencies.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MailError {
    /// No neighbor of the current town is strictly closer to the
    /// destination: the graph is disconnected or the routing table is
    /// stale. Must never be silently ignored.
    #[error("mail {id} unroutable at {at} toward {dest}: no closer neighbor")]
    Unrouted { id: MailId, at: Zip, dest: Zip },

    /// Commit was attempted on an item whose decide phase produced no
    /// next hop.
    #[error("mail {id} advanced without a routed next hop")]
    NotRouted { id: MailId },

    /// The item was missing from the in-flight collection or its
    /// sender's in-transit list during removal: a double-delivery or
    /// double-removal lifecycle bug.
    #[error("mail {id} not present in an in-flight collection")]
    NotInFlight { id: MailId },

    /// No mail item with this id exists.
    #[error("unknown mail item {id}")]
    UnknownMail { id: MailId },

    /// A referenced sender does not exist in the world.
    #[error("unknown sender {id}")]
    UnknownSender { id: SenderId },

    /// A referenced town does not exist in the world.
    #[error("unknown town {zip}")]
    UnknownTown { zip: Zip },
}

/// Ephemeral per-day decision record for one mail item.
///
/// Reset at the start of every decide phase and applied (then left
/// behind) by the commit phase; never persisted across days, so stale
/// flags cannot leak into the next decision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MailAction {
    /// Decided next hop, if any.
    pub next: Option<Location>,

    /// Terminal: the item is at its recipient's house and must be
    /// removed instead of advanced.
    pub deliver: bool,

    /// The previous hop forwarded this item back toward where it came
    /// from.
    pub routing_error: bool,

    /// The item sits at a house that is not the recipient's.
    pub delivery_error: bool,

    /// The item reached a post office with unrepaired damage.
    pub routed_damaged: bool,

    /// The item reached a residence with unrepaired damage.
    pub delivered_damaged: bool,
}

impl MailAction {
    /// Clear all flags and the next hop.
    pub fn reset(&mut self) {
        *self = MailAction::default();
    }

    /// Whether a next hop has been decided (by the engine or an
    /// operator override).
    pub fn is_routed(&self) -> bool {
        self.next.is_some()
    }
}

/// A single piece of mail in transit.
#[derive(Debug, Clone)]
pub struct MailItem {
    id: MailId,
    sender: SenderId,
    recipient: SenderId,

    /// Origin address, captured at creation.
    origin: String,

    /// Destination address, captured at creation.
    destination: String,

    origin_zip: Zip,
    dest_zip: Zip,

    pub(crate) location: Location,
    pub(crate) previous: Location,

    pub(crate) damage: u8,
    pub(crate) repair: u8,

    stamp: Stamp,

    /// Days since creation. Incremented once per commit.
    pub(crate) age: u32,

    /// Narrative mail bypasses the normal queue quotas.
    is_story: bool,

    /// Whether today's handling is automatic (true) or awaiting a human
    /// decision (false).
    pub(crate) is_auto: bool,

    pub(crate) action: MailAction,
}

impl MailItem {
    /// Create a new mail item sitting at its sender's town, one step
    /// after leaving the sender's house.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: MailId,
        sender: SenderId,
        recipient: SenderId,
        origin: String,
        destination: String,
        origin_zip: Zip,
        dest_zip: Zip,
        sender_home: HouseRef,
        stamp: Stamp,
        initial_damage: u8,
        is_story: bool,
    ) -> Self {
        Self {
            id,
            sender,
            recipient,
            origin,
            destination,
            origin_zip,
            dest_zip,
            location: Location::Town(origin_zip),
            previous: Location::House(sender_home),
            damage: initial_damage.min(MAX_DAMAGE),
            repair: 0,
            stamp,
            age: 0,
            is_story,
            is_auto: true,
            action: MailAction::default(),
        }
    }

    pub fn id(&self) -> MailId {
        self.id
    }

    pub fn sender(&self) -> SenderId {
        self.sender
    }

    pub fn recipient(&self) -> SenderId {
        self.recipient
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    pub fn origin_zip(&self) -> Zip {
        self.origin_zip
    }

    pub fn dest_zip(&self) -> Zip {
        self.dest_zip
    }

    pub fn location(&self) -> Location {
        self.location
    }

    pub fn previous(&self) -> Location {
        self.previous
    }

    pub fn damage_level(&self) -> u8 {
        self.damage
    }

    pub fn repair_level(&self) -> u8 {
        self.repair
    }

    pub fn stamp(&self) -> Stamp {
        self.stamp
    }

    pub fn age(&self) -> u32 {
        self.age
    }

    pub fn is_story(&self) -> bool {
        self.is_story
    }

    pub fn is_auto(&self) -> bool {
        self.is_auto
    }

    pub fn action(&self) -> &MailAction {
        &self.action
    }

    /// Increment the damage level, capped at [`MAX_DAMAGE`].
    pub fn inflict_damage(&mut self) {
        if self.damage < MAX_DAMAGE {
            self.damage += 1;
        }
    }

    /// Increment the repair level, capped at the current damage level.
    /// Over-repair is a no-op, not an error.
    pub fn repair(&mut self) {
        if self.repair < self.damage {
            self.repair += 1;
        }
    }

    /// Operator-facing one-line detail string:
    /// `#00042 | origin -> destination | damage/repair | stamp`.
    pub fn details(&self) -> String {
        format!(
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
