//! All-pairs hop routing table
//!
//! A breadth-first search from every town yields the minimum hop count
//! between each ordered pair. Greedy mail routing only ever asks "is
//! this neighbor strictly closer to the destination than I am", so hop
//! counts are all the table stores.
//!
//! The table is a snapshot. Any change to the road graph invalidates
//! it and callers must rebuild; a pair with no entry means the two
//! towns are disconnected, which consumers treat as a routing failure,
//! never a panic.

use std::collections::{HashMap, VecDeque};

use crate::models::town::{World, Zip};

/// Minimum hop counts between every connected pair of towns.
#[derive(Debug, Clone, Default)]
pub struct RoutingTable {
    distances: HashMap<(Zip, Zip), u32>,
}

impl RoutingTable {
    /// Compute the table for the world's current road graph.
    pub fn build(world: &World) -> Self {
        let mut distances = HashMap::new();

        for origin in world.towns() {
            let start = origin.zip();
            let mut queue = VecDeque::new();
            distances.insert((start, start), 0);
            queue.push_back(start);

            while let Some(zip) = queue.pop_front() {
                let here = distances[&(start, zip)];
                let Some(town) = world.town(zip) else {
                    continue;
                };
                for &next in town.neighbors() {
                    if distances.contains_key(&(start, next)) {
                        continue;
                    }
                    distances.insert((start, next), here + 1);
                    queue.push_back(next);
                }
            }
        }

        log::info!(
            "routing table built: {} towns, {} reachable pairs",
            world.towns().len(),
            distances.len()
        );
        Self { distances }
    }

    /// Hop count from `a` to `b`. `None` means the towns are not
    /// connected.
    pub fn distance(&self, a: Zip, b: Zip) -> Option<u32> {
        self.distances.get(&(a, b)).copied()
    }

    /// Number of reachable ordered pairs, diagonal included.
    pub fn len(&self) -> usize {
        self.distances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.distances.is_empty()
    }
}
