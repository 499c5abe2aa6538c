//! Per-mail state machine
//!
//! Every in-flight item goes through two phases each day:
//!
//! 1. **Decide** ([`handle`]): inspect the item's surroundings and
//!    record what should happen in its [`MailAction`] without touching
//!    any shared state. At a house the choice is deliver or bounce
//!    back to the town; at a post office it is hand to the recipient's
//!    house or greedy-forward to the first neighbor strictly closer to
//!    the destination.
//! 2. **Commit** ([`advance`]): apply the recorded action, file
//!    notifications for anything that went wrong, and move or remove
//!    the item.
//!
//! The split means no decision in a day can observe another item's
//! movement from the same day.
//!
//! Mail creation lives here too: stamp assignment, sender-side damage
//! and recipient selection.

use serde::{Deserialize, Serialize};

use crate::models::event::NoteKind;
use crate::models::mail::{Location, MailAction, MailError, MailId, MailItem, Stamp};
use crate::models::state::SimulationState;
use crate::models::town::{SenderId, World};
use crate::routing::RoutingTable;
use crate::rng::RngManager;

/// Mishap probabilities applied during mail creation and routing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailProbabilities {
    /// Chance a sender pays less postage than the letter needs.
    pub sender_shortpays: f64,

    /// Chance a letter is already damaged when posted.
    pub sender_damages_mail: f64,

    /// Chance a post office damages a letter while handling it.
    pub router_damages_mail: f64,
}

impl Default for MailProbabilities {
    fn default() -> Self {
        Self {
            sender_shortpays: 0.15,
            sender_damages_mail: 0.05,
            router_damages_mail: 0.02,
        }
    }
}

/// What the commit phase did with one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceOutcome {
    /// The item reached its recipient and left the system.
    Delivered,

    /// The item moved one hop and stays in flight.
    Moved,
}

/// Decide phase: recompute the item's [`MailAction`] from scratch.
///
/// Greedy routing takes the first stored neighbor strictly closer to
/// the destination. No such neighbor means the graph or routing table
/// is broken and the item is reported as [`MailError::Unrouted`]
/// rather than parked silently.
pub fn handle(
    world: &World,
    state: &mut SimulationState,
    table: &RoutingTable,
    probs: &MailProbabilities,
    rng: &mut RngManager,
    id: MailId,
) -> Result<(), MailError> {
    let item = state.mail(id).ok_or(MailError::UnknownMail { id })?;
    let location = item.location();
    let previous = item.previous();
    let damage = item.damage_level();
    let repair = item.repair_level();
    let dest_zip = item.dest_zip();
    let recipient = item.recipient();
    let recipient_home = world
        .sender(recipient)
        .ok_or(MailError::UnknownSender { id: recipient })?
        .home();

    let mut action = MailAction::default();
    let mut router_damage = false;

    match location {
        Location::House(href) => {
            if damage > repair {
                action.delivered_damaged = true;
            }
            if href == recipient_home {
                action.deliver = true;
            } else {
                action.next = Some(Location::Town(href.zip));
                action.delivery_error = true;
            }
        }
        Location::Town(zip) => {
            if damage > repair {
                action.routed_damaged = true;
            }
            if rng.chance(probs.router_damages_mail) {
                router_damage = true;
            }
            if zip == dest_zip {
                action.next = Some(Location::House(recipient_home));
            } else {
                let here = table.distance(zip, dest_zip).ok_or(MailError::Unrouted {
                    id,
                    at: zip,
                    dest: dest_zip,
                })?;
                let town = world.town(zip).ok_or(MailError::UnknownTown { zip })?;
                let next = town
                    .neighbors()
                    .iter()
                    .copied()
                    .find(|&n| table.distance(n, dest_zip).is_some_and(|d| d < here))
                    .ok_or(MailError::Unrouted {
                        id,
                        at: zip,
                        dest: dest_zip,
                    })?;
                action.next = Some(Location::Town(next));
                if previous == Location::Town(next) {
                    action.routing_error = true;
                }
            }
        }
    }

    let item = state.mail_mut(id).ok_or(MailError::UnknownMail { id })?;
    if router_damage {
        item.inflict_damage();
    }
    item.action = action;
    Ok(())
}

/// Commit phase: apply the item's decided action.
///
/// Delivery removes the item from every tracking collection and
/// records the correspondent in the recipient's history. Any other
/// action files the due notifications and moves the item one hop.
pub fn advance(
    world: &mut World,
    state: &mut SimulationState,
    id: MailId,
) -> Result<AdvanceOutcome, MailError> {
    let item = state.mail(id).ok_or(MailError::UnknownMail { id })?;
    let action = *item.action();
    let location = item.location();
    let previous = item.previous();
    let sender = item.sender();
    let recipient = item.recipient();

    if action.deliver {
        state.remove_delivered(id, world)?;
        if let Some(r) = world.sender_mut(recipient) {
            r.record_received_from(sender);
        }
        return Ok(AdvanceOutcome::Delivered);
    }

    let next = action.next.ok_or(MailError::NotRouted { id })?;
    let reporter = world.location_address(location);

    if action.delivery_error {
        if let Location::House(href) = location {
            notify(world, Location::Town(href.zip), &reporter, NoteKind::MisdeliveredResidence);
        }
    }
    if action.routing_error {
        notify(world, next, &reporter, NoteKind::RoutedInError);
    }
    if action.delivered_damaged {
        notify(world, previous, &reporter, NoteKind::ArrivedResidenceDamaged);
    }
    if action.routed_damaged {
        notify(world, previous, &reporter, NoteKind::ArrivedPostOfficeDamaged);
        // The reporting post office patches the item up one level.
        if let Some(item) = state.mail_mut(id) {
            item.repair();
        }
    }

    let item = state.mail_mut(id).ok_or(MailError::UnknownMail { id })?;
    item.previous = item.location;
    item.location = next;
    item.age += 1;
    Ok(AdvanceOutcome::Moved)
}

/// File a notification at a town. Houses have nobody on duty and
/// ignore notifications.
fn notify(world: &mut World, at: Location, reporter: &str, kind: NoteKind) {
    if let Location::Town(zip) = at {
        if let Some(town) = world.town_mut(zip) {
            town.notes
                .push(crate::models::event::Notification::new(reporter.to_string(), kind));
        }
    }
}

/// Pick someone for `sender` to write to.
///
/// Half the time a reply to a recent correspondent, when any exist;
/// otherwise usually a neighbor from the same town, falling back to
/// anyone in the world. `None` when no valid recipient exists.
pub fn choose_recipient(
    world: &World,
    rng: &mut RngManager,
    sender: SenderId,
) -> Option<SenderId> {
    if world.senders().len() < 2 {
        return None;
    }
    let s = world.sender(sender)?;

    if rng.chance(0.5) && !s.recv_from().is_empty() {
        return Some(*rng.pick(s.recv_from()));
    }

    if rng.chance(0.6) {
        let locals = world.citizens_of(s.home().zip);
        if locals.len() >= 2 {
            for _ in 0..32 {
                let candidate = *rng.pick(&locals);
                if candidate != sender {
                    return Some(candidate);
                }
            }
        }
    }

    for _ in 0..64 {
        let candidate = rng.range(0, world.senders().len() as i64) as usize;
        if candidate != sender {
            return Some(candidate);
        }
    }
    None
}

/// Create a letter from `sender` to a recipient of their choosing.
/// Returns `None` when no recipient can be found.
pub fn generate_mail_from(
    world: &mut World,
    state: &mut SimulationState,
    probs: &MailProbabilities,
    rng: &mut RngManager,
    sender: SenderId,
) -> Option<MailId> {
    // An unknown sender yields no recipient, so the create step cannot
    // fail here.
    let recipient = choose_recipient(world, rng, sender)?;
    create_mail(world, state, probs, rng, sender, recipient, false).ok()
}

/// Create a narrative letter with a fixed sender and recipient. Story
/// mail follows the normal stamp and damage rules but bypasses queue
/// quotas later.
pub fn inject_story_mail(
    world: &mut World,
    state: &mut SimulationState,
    probs: &MailProbabilities,
    rng: &mut RngManager,
    sender: SenderId,
    recipient: SenderId,
) -> Result<MailId, MailError> {
    create_mail(world, state, probs, rng, sender, recipient, true)
}

fn create_mail(
    world: &mut World,
    state: &mut SimulationState,
    probs: &MailProbabilities,
    rng: &mut RngManager,
    sender: SenderId,
    recipient: SenderId,
    is_story: bool,
) -> Result<MailId, MailError> {
    let sender_home = world
        .sender(sender)
        .ok_or(MailError::UnknownSender { id: sender })?
        .home();
    let origin_zip = sender_home.zip;
    let dest_zip = world
        .sender(recipient)
        .ok_or(MailError::UnknownSender { id: recipient })?
        .home()
        .zip;
    let inter_town = origin_zip != dest_zip;

    let stamp = if rng.chance(probs.sender_shortpays) {
        if inter_town && rng.chance(0.5) {
            Stamp::Local
        } else {
            Stamp::Unpaid
        }
    } else if inter_town {
        Stamp::InterTown
    } else {
        Stamp::Local
    };
    let initial_damage = if rng.chance(probs.sender_damages_mail) { 1 } else { 0 };

    let origin = world
        .sender_address(sender)
        .unwrap_or_else(|| format!("sender {}", sender));
    let destination = world
        .sender_address(recipient)
        .unwrap_or_else(|| format!("sender {}", recipient));

    let id = state.allocate_mail_id(rng);
    let item = MailItem::new(
        id,
        sender,
        recipient,
        origin,
        destination,
        origin_zip,
        dest_zip,
        sender_home,
        stamp,
        initial_damage,
        is_story,
    );
    state.insert_mail(item, world);
    Ok(id)
}
