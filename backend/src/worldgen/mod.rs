//! Procedural world generation
//!
//! Builds the town graph by rejection sampling in polar coordinates:
//! a player-controlled root town at the origin, a ring of connecting
//! towns linked directly to the root, then an outer spread of
//! additional towns each linked to its nearest non-root neighbor. A
//! final edge-rewriting pass shortens detours by stealing edges from
//! neighbors that sit further away.
//!
//! Placement can run out of room. That is recoverable: generation
//! stops the affected phase, logs a warning and records the shortfall
//! in the [`GenerationReport`] instead of failing the run.
//!
//! All randomness flows through the caller's [`RngManager`], so a seed
//! fully determines the world.

use std::collections::HashSet;
use std::f64::consts::TAU;

use serde::{Deserialize, Serialize};

use crate::models::mail::MailError;
use crate::models::town::{House, HouseRef, Sender, Street, Town, World, Zip, MAX_HOUSES_PER_STREET};
use crate::rng::RngManager;

pub mod names;

/// Sampling attempts per town before the phase gives up.
const PLACEMENT_ATTEMPTS: usize = 400;

/// Connecting towns are placed within this radius of the root. A
/// `min_town_sep` at or beyond this leaves no room for any connecting
/// town.
pub const CONNECT_RADIUS_MAX: f64 = 300.0;

/// Additional towns are placed in this radial band...
const ADDITIONAL_RADIUS_MIN: f64 = 280.0;
const ADDITIONAL_RADIUS_MAX: f64 = 1060.0;

/// ...clipped to this rectangle around the origin.
const RECT_HALF_WIDTH: f64 = 930.0;
const RECT_HALF_HEIGHT: f64 = 510.0;

/// The root town is deliberately small.
const ROOT_POP_MUL: f64 = 0.5;

/// Chance that a generated house stays vacant.
const VACANCY_RATE: f64 = 0.05;

/// Normal-distribution parameters for town population, scaled by the
/// cube root of the combined size multiplier.
const STREET_MEAN: f64 = 5.5;
const STREET_STD: f64 = 0.7;
const HOUSE_MEAN: f64 = 8.0;
const HOUSE_STD: f64 = 1.3;
const RESIDENT_MEAN: f64 = 2.0;
const RESIDENT_STD: f64 = 0.3;

/// Tunables for world generation.
///
/// # Example
/// ```
/// use postal_simulator_core_rs::worldgen::WorldGenSettings;
///
/// let settings = WorldGenSettings {
///     num_connecting_towns: 3,
///     ..Default::default()
/// };
/// assert_eq!(settings.min_town_sep, 50.0);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldGenSettings {
    /// Towns placed around and linked directly to the root.
    pub num_connecting_towns: usize,

    /// Towns placed in the outer band, linked to their nearest
    /// non-root neighbor.
    pub num_additional_towns: usize,

    /// Minimum straight-line distance between any two non-root towns.
    pub min_town_sep: f64,

    /// Global scale factor on town populations.
    pub town_size_mul: f64,
}

impl Default for WorldGenSettings {
    fn default() -> Self {
        Self {
            num_connecting_towns: 5,
            num_additional_towns: 12,
            min_town_sep: 50.0,
            town_size_mul: 1.0,
        }
    }
}

/// How many towns each generation phase asked for versus placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationReport {
    pub connecting_requested: usize,
    pub connecting_placed: usize,
    pub additional_requested: usize,
    pub additional_placed: usize,
}

impl GenerationReport {
    /// Total towns requested but never placed.
    pub fn shortfall(&self) -> usize {
        (self.connecting_requested - self.connecting_placed)
            + (self.additional_requested - self.additional_placed)
    }
}

/// Generate a complete world: towns, roads, streets, houses and
/// residents.
pub fn generate(
    settings: &WorldGenSettings,
    rng: &mut RngManager,
) -> Result<(World, GenerationReport), MailError> {
    let mut world = World::new();
    let mut used_zips = HashSet::new();
    let mut used_names = HashSet::new();

    let root_zip = alloc_zip(rng, &mut used_zips);
    let root_name = pick_unique(rng, names::TOWN_NAMES, &mut used_names);
    world
        .towns
        .push(Town::new(root_zip, root_name, (0.0, 0.0), true));
    populate_town(&mut world, root_zip, ROOT_POP_MUL, settings.town_size_mul, rng);

    let mut report = GenerationReport {
        connecting_requested: settings.num_connecting_towns,
        connecting_placed: 0,
        additional_requested: settings.num_additional_towns,
        additional_placed: 0,
    };

    for i in 0..settings.num_connecting_towns {
        let Some(pos) = sample_connecting_position(&world, settings, rng) else {
            log::warn!(
                "placed {} of {} connecting towns before running out of room",
                i,
                settings.num_connecting_towns
            );
            break;
        };
        let zip = alloc_zip(rng, &mut used_zips);
        let name = pick_unique(rng, names::TOWN_NAMES, &mut used_names);
        world.towns.push(Town::new(zip, name, pos, false));
        populate_town(
            &mut world,
            zip,
            connecting_pop_mul(i),
            settings.town_size_mul,
            rng,
        );
        world.connect(root_zip, zip)?;
        report.connecting_placed += 1;
    }

    for i in 0..settings.num_additional_towns {
        let Some(pos) = sample_additional_position(&world, settings, rng) else {
            log::warn!(
                "placed {} of {} additional towns before running out of room",
                i,
                settings.num_additional_towns
            );
            break;
        };
        let link_to = nearest_non_root(&world, pos).unwrap_or(root_zip);
        let pop_mul = rng.uniform(0.3, 1.2);
        let zip = alloc_zip(rng, &mut used_zips);
        let name = pick_unique(rng, names::TOWN_NAMES, &mut used_names);
        world.towns.push(Town::new(zip, name, pos, false));
        populate_town(&mut world, zip, pop_mul, settings.town_size_mul, rng);
        world.connect(link_to, zip)?;
        report.additional_placed += 1;
    }

    optimize_routes(&mut world)?;

    log::info!(
        "generated world: {} towns, {} senders, shortfall {}",
        world.towns().len(),
        world.senders().len(),
        report.shortfall()
    );
    Ok((world, report))
}

/// The second and third connecting towns break the size pattern, one
/// large and one small.
fn connecting_pop_mul(i: usize) -> f64 {
    match i {
        1 => 1.8,
        2 => 0.8,
        _ => 0.5,
    }
}

fn alloc_zip(rng: &mut RngManager, used: &mut HashSet<Zip>) -> Zip {
    loop {
        let zip = rng.range(10000, 100_000) as Zip;
        if used.insert(zip) {
            return zip;
        }
    }
}

/// Draw an unused name from the pool, falling back to numbered
/// variants once the pool itself is exhausted.
fn pick_unique(rng: &mut RngManager, pool: &[&str], used: &mut HashSet<String>) -> String {
    for _ in 0..100 {
        let candidate = (*rng.pick(pool)).to_string();
        if used.insert(candidate.clone()) {
            return candidate;
        }
    }
    let mut suffix = 2;
    loop {
        let candidate = format!("{} {}", rng.pick(pool), suffix);
        if used.insert(candidate.clone()) {
            return candidate;
        }
        suffix += 1;
    }
}

/// Whether `pos` keeps the minimum separation from every non-root
/// town. The root is exempt; radial sampling already bounds the
/// distance to it.
fn far_enough(world: &World, pos: (f64, f64), min_sep: f64) -> bool {
    let min_sep_sq = min_sep * min_sep;
    world.towns().iter().skip(1).all(|t| {
        let (tx, ty) = t.position();
        let (dx, dy) = (pos.0 - tx, pos.1 - ty);
        dx * dx + dy * dy >= min_sep_sq
    })
}

fn sample_connecting_position(
    world: &World,
    settings: &WorldGenSettings,
    rng: &mut RngManager,
) -> Option<(f64, f64)> {
    // Separation at or beyond the ring radius leaves an empty sampling
    // band; that is an immediate shortfall, not a panic.
    if settings.min_town_sep >= CONNECT_RADIUS_MAX {
        return None;
    }
    for _ in 0..PLACEMENT_ATTEMPTS {
        let angle = rng.uniform(0.0, TAU);
        let radius = rng.uniform(settings.min_town_sep, CONNECT_RADIUS_MAX);
        let pos = (radius * angle.cos(), radius * angle.sin());
        if far_enough(world, pos, settings.min_town_sep) {
            return Some(pos);
        }
    }
    None
}

fn sample_additional_position(
    world: &World,
    settings: &WorldGenSettings,
    rng: &mut RngManager,
) -> Option<(f64, f64)> {
    for _ in 0..PLACEMENT_ATTEMPTS {
        let angle = rng.uniform(0.0, TAU);
        let radius = rng.uniform(ADDITIONAL_RADIUS_MIN, ADDITIONAL_RADIUS_MAX);
        let pos = (radius * angle.cos(), radius * angle.sin());
        if pos.0.abs() > RECT_HALF_WIDTH || pos.1.abs() > RECT_HALF_HEIGHT {
            continue;
        }
        if far_enough(world, pos, settings.min_town_sep) {
            return Some(pos);
        }
    }
    None
}

/// Closest non-root town to `pos`. Ties break toward earlier world
/// order.
fn nearest_non_root(world: &World, pos: (f64, f64)) -> Option<Zip> {
    world
        .towns()
        .iter()
        .skip(1)
        .min_by(|a, b| {
            dist_sq(a.position(), pos).total_cmp(&dist_sq(b.position(), pos))
        })
        .map(|t| t.zip())
}

fn dist_sq(a: (f64, f64), b: (f64, f64)) -> f64 {
    let (dx, dy) = (a.0 - b.0, a.1 - b.1);
    dx * dx + dy * dy
}

/// Build the streets, houses and residents of one town. Streets end up
/// sorted by name and houses by number before any resident is placed,
/// so every [`HouseRef`] handed out is final.
fn populate_town(world: &mut World, zip: Zip, pop_mul: f64, size_mul: f64, rng: &mut RngManager) {
    let k = (size_mul * pop_mul).cbrt();

    let n_streets = ((rng.normal(STREET_MEAN, STREET_STD) * k).round() as i64).max(2) as usize;
    let mut used_names = HashSet::new();
    let mut streets = Vec::with_capacity(n_streets);
    for _ in 0..n_streets {
        let name = pick_unique(rng, names::STREET_NAMES, &mut used_names);
        let n_houses = (((rng.normal(HOUSE_MEAN, HOUSE_STD) * k).round() as i64).max(2) as usize)
            .min(MAX_HOUSES_PER_STREET);
        let mut used_numbers = HashSet::new();
        let mut houses = Vec::with_capacity(n_houses);
        for _ in 0..n_houses {
            let number = loop {
                let n = rng.range(1, MAX_HOUSES_PER_STREET as i64 + 1) as u32;
                if used_numbers.insert(n) {
                    break n;
                }
            };
            houses.push(House::new(number));
        }
        houses.sort_by_key(House::number);
        streets.push(Street::new(name, houses));
    }
    streets.sort_by(|a, b| a.name().cmp(b.name()));

    for si in 0..streets.len() {
        for hi in 0..streets[si].houses().len() {
            if rng.chance(VACANCY_RATE) {
                continue;
            }
            let n_residents =
                ((rng.normal(RESIDENT_MEAN, RESIDENT_STD) * k).round() as i64).max(1) as usize;
            for _ in 0..n_residents {
                let id = world.senders.len();
                let name = format!(
                    "{} {}",
                    rng.pick(names::FIRST_NAMES),
                    rng.pick(names::LAST_NAMES)
                );
                let home = HouseRef {
                    zip,
                    street: si,
                    house: hi,
                };
                world.senders.push(Sender::new(id, name, home));
                streets[si].houses_mut()[hi].add_resident(id);
            }
        }
    }

    if let Some(town) = world.town_mut(zip) {
        *town.streets_mut() = streets;
    }
}

/// Edge-rewriting pass: when a town A has a neighbor B whose own
/// neighbor C is closer to A than to B, move the B-C edge to A-C.
/// Edges touching the root are never rewritten. Neighbor lists are
/// snapshotted so removals cannot invalidate the iteration; the edge
/// is re-checked before each rewrite because an earlier rewrite may
/// already have removed it.
fn optimize_routes(world: &mut World) -> Result<(), MailError> {
    let Some(root) = world.towns().first().map(Town::zip) else {
        return Ok(());
    };
    let zips: Vec<Zip> = world.towns().iter().skip(1).map(Town::zip).collect();

    for &a in &zips {
        let a_neighbors: Vec<Zip> = match world.town(a) {
            Some(t) => t.neighbors().to_vec(),
            None => continue,
        };
        for &b in a_neighbors.iter().filter(|&&z| z != root) {
            let b_neighbors: Vec<Zip> = match world.town(b) {
                Some(t) => t.neighbors().to_vec(),
                None => continue,
            };
            for &c in b_neighbors.iter().filter(|&&z| z != root && z != a) {
                if !world.are_connected(b, c) {
                    continue;
                }
                let (Some(ta), Some(tb), Some(tc)) = (world.town(a), world.town(b), world.town(c))
                else {
                    continue;
                };
                if ta.distance_squared(tc) < tb.distance_squared(tc) {
                    world.disconnect(b, c)?;
                    if !world.are_connected(a, c) {
                        world.connect(a, c)?;
                    }
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_town_is_player_controlled_at_origin() {
        let settings = WorldGenSettings::default();
        let mut rng = RngManager::new(12345);
        let (world, _) = generate(&settings, &mut rng).unwrap();

        let root = &world.towns()[0];
        assert!(root.is_player());
        assert_eq!(root.position(), (0.0, 0.0));
        assert!((10000..=99999).contains(&root.zip()));
        assert_eq!(world.player_zips(), vec![root.zip()]);
    }

    #[test]
    fn test_every_town_is_populated() {
        let settings = WorldGenSettings::default();
        let mut rng = RngManager::new(777);
        let (world, _) = generate(&settings, &mut rng).unwrap();

        for town in world.towns() {
            assert!(town.streets().len() >= 2, "{} has too few streets", town.name());
            for street in town.streets() {
                assert!(street.houses().len() >= 2);
            }
            assert!(
                !world.citizens_of(town.zip()).is_empty(),
                "{} has no residents",
                town.name()
            );
        }
    }

    #[test]
    fn test_street_names_and_house_numbers_are_unique() {
        let settings = WorldGenSettings::default();
        let mut rng = RngManager::new(31337);
        let (world, _) = generate(&settings, &mut rng).unwrap();

        for town in world.towns() {
            let mut names = HashSet::new();
            for street in town.streets() {
                assert!(names.insert(street.name()), "duplicate street in {}", town.name());
                let mut numbers = HashSet::new();
                for house in street.houses() {
                    assert!((1..=55).contains(&house.number()));
                    assert!(numbers.insert(house.number()));
                }
            }
        }
    }

    #[test]
    fn test_shortfall_is_reported_when_space_runs_out() {
        // A 290-unit separation inside a 300-unit ring fits only a
        // handful of towns.
        let settings = WorldGenSettings {
            num_connecting_towns: 20,
            num_additional_towns: 0,
            min_town_sep: 290.0,
            town_size_mul: 1.0,
        };
        let mut rng = RngManager::new(42);
        let (world, report) = generate(&settings, &mut rng).unwrap();

        assert!(report.connecting_placed < 20);
        assert!(report.shortfall() > 0);
        assert_eq!(world.towns().len(), 1 + report.connecting_placed);
    }

    #[test]
    fn test_separation_wider_than_ring_is_a_shortfall() {
        // No radius in the connecting ring satisfies a 350-unit
        // separation, so the phase places nothing.
        let settings = WorldGenSettings {
            num_connecting_towns: 1,
            num_additional_towns: 0,
            min_town_sep: 350.0,
            town_size_mul: 1.0,
        };
        let mut rng = RngManager::new(7);
        let (world, report) = generate(&settings, &mut rng).unwrap();

        assert_eq!(report.connecting_placed, 0);
        assert_eq!(report.shortfall(), 1);
        assert_eq!(world.towns().len(), 1);
    }

    #[test]
    fn test_generation_is_deterministic() {
        let settings = WorldGenSettings::default();
        let (world_a, report_a) = generate(&settings, &mut RngManager::new(999)).unwrap();
        let (world_b, report_b) = generate(&settings, &mut RngManager::new(999)).unwrap();

        assert_eq!(report_a, report_b);
        assert_eq!(world_a.towns().len(), world_b.towns().len());
        for (ta, tb) in world_a.towns().iter().zip(world_b.towns()) {
            assert_eq!(ta.zip(), tb.zip());
            assert_eq!(ta.name(), tb.name());
            assert_eq!(ta.neighbors(), tb.neighbors());
        }
        assert_eq!(world_a.senders().len(), world_b.senders().len());
    }
}
