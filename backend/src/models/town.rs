//! Town, street, house and sender models
//!
//! The world is a flat arena: [`World`] owns every [`Town`] and every
//! [`Sender`], and everything else refers to them by id. Towns refer to
//! each other by zip code, houses refer to their resident by
//! [`SenderId`], and a sender's home is a [`HouseRef`] index triple.
//! No shared-ownership pointers anywhere.
//!
//! Invariants maintained here:
//! - Zip codes are unique across the world
//! - Street names are unique within a town, house numbers within a
//!   street
//! - The road graph is undirected: `a` lists `b` iff `b` lists `a`
//! - A resident's `home` points back at the house that holds them

use serde::{Deserialize, Serialize};

use crate::models::event::Notification;
use crate::models::mail::{Location, MailError, MailId};

/// Town identifier: a five-digit zip code in `10000..=99999`.
pub type Zip = u32;

/// Index into [`World::senders`].
pub type SenderId = usize;

/// Maximum houses per street.
pub const MAX_HOUSES_PER_STREET: usize = 55;

/// How many past correspondents a sender remembers.
pub const RECV_HISTORY_LEN: usize = 5;

/// Index triple locating one house: town zip, street index within the
/// town, house index within the street.
///
/// Street and house indices are positional and only valid against the
/// world that produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HouseRef {
    pub zip: Zip,
    pub street: usize,
    pub house: usize,
}

/// One house on a street.
#[derive(Debug, Clone)]
pub struct House {
    /// Street number, unique within the street.
    number: u32,

    /// Residents, empty for a vacant house.
    residents: Vec<SenderId>,
}

impl House {
    pub fn new(number: u32) -> Self {
        Self {
            number,
            residents: Vec::new(),
        }
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn residents(&self) -> &[SenderId] {
        &self.residents
    }

    pub(crate) fn add_resident(&mut self, resident: SenderId) {
        self.residents.push(resident);
    }
}

/// One named street holding a run of houses sorted by number.
#[derive(Debug, Clone)]
pub struct Street {
    name: String,
    houses: Vec<House>,
}

impl Street {
    pub fn new(name: String, houses: Vec<House>) -> Self {
        Self { name, houses }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn houses(&self) -> &[House] {
        &self.houses
    }

    pub(crate) fn houses_mut(&mut self) -> &mut [House] {
        &mut self.houses
    }
}

/// A town: post office, streets, road links and (for player towns) the
/// daily review queue.
#[derive(Debug, Clone)]
pub struct Town {
    zip: Zip,
    name: String,

    /// World-plane position, used for edge-length comparisons.
    position: (f64, f64),

    /// Whether a human operator runs this post office.
    is_player: bool,

    streets: Vec<Street>,

    /// Directly connected towns, in insertion order. Greedy routing
    /// scans this order, so it is part of the deterministic state.
    pub(crate) neighbors: Vec<Zip>,

    /// Mail ids held for operator review today. Player towns only.
    pub(crate) review_queue: Vec<MailId>,

    /// How many of today's queue entries arrived with age zero.
    pub(crate) new_in_queue: usize,

    /// Notifications filed against this town, drained once per day.
    pub(crate) notes: Vec<Notification>,
}

impl Town {
    pub fn new(zip: Zip, name: String, position: (f64, f64), is_player: bool) -> Self {
        Self {
            zip,
            name,
            position,
            is_player,
            streets: Vec::new(),
            neighbors: Vec::new(),
            review_queue: Vec::new(),
            new_in_queue: 0,
            notes: Vec::new(),
        }
    }

    pub fn zip(&self) -> Zip {
        self.zip
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn position(&self) -> (f64, f64) {
        self.position
    }

    pub fn is_player(&self) -> bool {
        self.is_player
    }

    pub fn streets(&self) -> &[Street] {
        &self.streets
    }

    pub(crate) fn streets_mut(&mut self) -> &mut Vec<Street> {
        &mut self.streets
    }

    /// Add a street for a scripted scenario.
    ///
    /// # Panics
    /// Panics if the town already has a street with this name.
    pub fn add_street(&mut self, street: Street) {
        assert!(
            self.streets.iter().all(|s| s.name() != street.name()),
            "duplicate street {} in {}",
            street.name(),
            self.name
        );
        self.streets.push(street);
    }

    pub fn neighbors(&self) -> &[Zip] {
        &self.neighbors
    }

    pub fn review_queue(&self) -> &[MailId] {
        &self.review_queue
    }

    pub fn notes(&self) -> &[Notification] {
        &self.notes
    }

    /// Postal address of the town itself: `"Name, 12345"`.
    pub fn address(&self) -> String {
        format!("{}, {}", self.name, self.zip)
    }

    /// Squared straight-line distance to another town.
    pub fn distance_squared(&self, other: &Town) -> f64 {
        let dx = self.position.0 - other.position.0;
        let dy = self.position.1 - other.position.1;
        dx * dx + dy * dy
    }
}

/// A person who sends and receives mail. Lives in exactly one house.
#[derive(Debug, Clone)]
pub struct Sender {
    id: SenderId,
    name: String,
    home: HouseRef,

    /// Senders this one has received mail from, most recent last,
    /// capped at [`RECV_HISTORY_LEN`].
    pub(crate) recv_from: Vec<SenderId>,

    /// Mail this sender currently has in flight.
    pub(crate) in_transit: Vec<MailId>,
}

impl Sender {
    pub fn new(id: SenderId, name: String, home: HouseRef) -> Self {
        Self {
            id,
            name,
            home,
            recv_from: Vec::new(),
            in_transit: Vec::new(),
        }
    }

    pub fn id(&self) -> SenderId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn home(&self) -> HouseRef {
        self.home
    }

    pub fn recv_from(&self) -> &[SenderId] {
        &self.recv_from
    }

    pub fn in_transit(&self) -> &[MailId] {
        &self.in_transit
    }

    /// Record a received letter's sender, evicting the oldest entry
    /// once the history is full.
    pub(crate) fn record_received_from(&mut self, from: SenderId) {
        self.recv_from.push(from);
        if self.recv_from.len() > RECV_HISTORY_LEN {
            self.recv_from.remove(0);
        }
    }
}

/// The whole postal world: every town and every sender.
#[derive(Debug, Clone, Default)]
pub struct World {
    pub(crate) towns: Vec<Town>,
    pub(crate) senders: Vec<Sender>,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn towns(&self) -> &[Town] {
        &self.towns
    }

    pub fn senders(&self) -> &[Sender] {
        &self.senders
    }

    pub fn town(&self, zip: Zip) -> Option<&Town> {
        self.towns.iter().find(|t| t.zip == zip)
    }

    pub(crate) fn town_mut(&mut self, zip: Zip) -> Option<&mut Town> {
        self.towns.iter_mut().find(|t| t.zip == zip)
    }

    pub fn sender(&self, id: SenderId) -> Option<&Sender> {
        self.senders.get(id)
    }

    /// Add a town for a scripted scenario.
    ///
    /// # Panics
    /// Panics if the zip code is already taken.
    pub fn add_town(&mut self, town: Town) {
        assert!(
            self.town(town.zip()).is_none(),
            "duplicate zip {}",
            town.zip()
        );
        self.towns.push(town);
    }

    /// Add a sender living in the given house and register them as a
    /// resident. Returns the new sender's id.
    ///
    /// # Panics
    /// Panics if the house does not exist.
    pub fn add_sender(&mut self, name: &str, home: HouseRef) -> SenderId {
        assert!(
            self.house(home).is_some(),
            "no house at {:?} for sender {}",
            home,
            name
        );
        let id = self.senders.len();
        self.senders.push(Sender::new(id, name.to_string(), home));
        if let Some(town) = self.town_mut(home.zip) {
            if let Some(street) = town.streets.get_mut(home.street) {
                if let Some(house) = street.houses_mut().get_mut(home.house) {
                    house.add_resident(id);
                }
            }
        }
        id
    }

    pub(crate) fn sender_mut(&mut self, id: SenderId) -> Option<&mut Sender> {
        self.senders.get_mut(id)
    }

    pub fn house(&self, href: HouseRef) -> Option<&House> {
        self.town(href.zip)?
            .streets
            .get(href.street)?
            .houses()
            .get(href.house)
    }

    /// Zip codes of all player-controlled towns, in world order.
    pub fn player_zips(&self) -> Vec<Zip> {
        self.towns
            .iter()
            .filter(|t| t.is_player)
            .map(|t| t.zip)
            .collect()
    }

    /// All senders living in the given town, in sender-id order.
    pub fn citizens_of(&self, zip: Zip) -> Vec<SenderId> {
        self.senders
            .iter()
            .filter(|s| s.home.zip == zip)
            .map(|s| s.id)
            .collect()
    }

    /// Whether a direct road exists between two towns.
    pub fn are_connected(&self, a: Zip, b: Zip) -> bool {
        self.town(a).is_some_and(|t| t.neighbors.contains(&b))
    }

    /// Add an undirected road between two towns. Adding an existing
    /// road is a no-op.
    pub fn connect(&mut self, a: Zip, b: Zip) -> Result<(), MailError> {
        if a == b {
            return Ok(());
        }
        self.town(a).ok_or(MailError::UnknownTown { zip: a })?;
        self.town(b).ok_or(MailError::UnknownTown { zip: b })?;

        let ta = self.town_mut(a).ok_or(MailError::UnknownTown { zip: a })?;
        if !ta.neighbors.contains(&b) {
            ta.neighbors.push(b);
        }
        let tb = self.town_mut(b).ok_or(MailError::UnknownTown { zip: b })?;
        if !tb.neighbors.contains(&a) {
            tb.neighbors.push(a);
        }
        Ok(())
    }

    /// Remove the road between two towns, both directions. Removing a
    /// missing road is a no-op.
    pub fn disconnect(&mut self, a: Zip, b: Zip) -> Result<(), MailError> {
        self.town(a).ok_or(MailError::UnknownTown { zip: a })?;
        self.town(b).ok_or(MailError::UnknownTown { zip: b })?;

        if let Some(ta) = self.town_mut(a) {
            ta.neighbors.retain(|&z| z != b);
        }
        if let Some(tb) = self.town_mut(b) {
            tb.neighbors.retain(|&z| z != a);
        }
        Ok(())
    }

    /// Postal address of a house: `"12 Main Street, Roothaven, 10000"`.
    pub fn house_address(&self, href: HouseRef) -> Option<String> {
        let town = self.town(href.zip)?;
        let street = town.streets.get(href.street)?;
        let house = street.houses().get(href.house)?;
        Some(format!(
            "{} {}, {}, {}",
            house.number(),
            street.name(),
            town.name(),
            town.zip()
        ))
    }

    /// Postal address of a sender:
    /// `"Ada Hart, 12 Main Street, Roothaven, 10000"`.
    pub fn sender_address(&self, id: SenderId) -> Option<String> {
        let sender = self.sender(id)?;
        let house = self.house_address(sender.home)?;
        Some(format!("{}, {}", sender.name(), house))
    }

    /// Human-readable address of any location. Falls back to a raw
    /// rendering when the reference no longer resolves.
    pub fn location_address(&self, loc: Location) -> String {
        match loc {
            Location::Town(zip) => self
                .town(zip)
                .map(|t| t.address())
                .unwrap_or_else(|| format!("unknown town {}", zip)),
            Location::House(href) => self
                .house_address(href)
                .unwrap_or_else(|| format!("unknown house in {}", href.zip)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_town_world() -> World {
        let mut world = World::new();
        world
            .towns
            .push(Town::new(10000, "Roothaven".to_string(), (0.0, 0.0), true));
        world
            .towns
            .push(Town::new(10001, "Milltown".to_string(), (100.0, 0.0), false));
        world
    }

    #[test]
    fn test_connect_is_symmetric_and_idempotent() {
        let mut world = two_town_world();
        world.connect(10000, 10001).unwrap();
        world.connect(10000, 10001).unwrap();

        assert!(world.are_connected(10000, 10001));
        assert!(world.are_connected(10001, 10000));
        assert_eq!(world.town(10000).unwrap().neighbors(), &[10001]);
        assert_eq!(world.town(10001).unwrap().neighbors(), &[10000]);
    }

    #[test]
    fn test_disconnect_removes_both_directions() {
        let mut world = two_town_world();
        world.connect(10000, 10001).unwrap();
        world.disconnect(10000, 10001).unwrap();

        assert!(!world.are_connected(10000, 10001));
        assert!(!world.are_connected(10001, 10000));

        // Removing again is a no-op.
        world.disconnect(10000, 10001).unwrap();
    }

    #[test]
    fn test_connect_unknown_town_errors() {
        let mut world = two_town_world();
        let err = world.connect(10000, 99999).unwrap_err();
        assert_eq!(err, MailError::UnknownTown { zip: 99999 });
    }

    #[test]
    fn test_self_connect_is_a_noop() {
        let mut world = two_town_world();
        world.connect(10000, 10000).unwrap();
        assert!(world.town(10000).unwrap().neighbors().is_empty());
    }

    #[test]
    fn test_addresses() {
        let mut world = two_town_world();
        let street = Street::new(
            "Main Street".to_string(),
            vec![House::new(1), House::new(2)],
        );
        world.town_mut(10000).unwrap().streets_mut().push(street);

        let href = HouseRef {
            zip: 10000,
            street: 0,
            house: 1,
        };
        world.towns[0].streets_mut()[0].houses_mut()[1].add_resident(0);
        world
            .senders
            .push(Sender::new(0, "Ada Hart".to_string(), href));

        assert_eq!(
            world.house_address(href).unwrap(),
            "2 Main Street, Roothaven, 10000"
        );
        assert_eq!(
            world.sender_address(0).unwrap(),
            "Ada Hart, 2 Main Street, Roothaven, 10000"
        );
        assert_eq!(
            world.location_address(Location::Town(10001)),
            "Milltown, 10001"
        );
    }

    #[test]
    fn test_recv_history_is_capped() {
        let mut sender = Sender::new(
            0,
            "Ada Hart".to_string(),
            HouseRef {
                zip: 10000,
                street: 0,
                house: 0,
            },
        );
        for i in 1..=8 {
            sender.record_received_from(i);
        }
        assert_eq!(sender.recv_from(), &[4, 5, 6, 7, 8]);
    }

    #[test]
    fn test_citizens_of_filters_by_town() {
        let mut world = two_town_world();
        let home_a = HouseRef {
            zip: 10000,
            street: 0,
            house: 0,
        };
        let home_b = HouseRef {
            zip: 10001,
            street: 0,
            house: 0,
        };
        world.senders.push(Sender::new(0, "A".to_string(), home_a));
        world.senders.push(Sender::new(1, "B".to_string(), home_b));
        world.senders.push(Sender::new(2, "C".to_string(), home_a));

        assert_eq!(world.citizens_of(10000), vec![0, 2]);
        assert_eq!(world.citizens_of(10001), vec![1]);
    }
}
