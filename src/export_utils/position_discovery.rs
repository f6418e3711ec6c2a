use crate::store::CanonicalStore;
use crate::tx_record::Address;
use std::collections::{HashMap, HashSet, VecDeque};

/// Position reported for addresses outside the discovered set.
pub const OUT_OF_SCOPE: i64 = -1;

/// Addresses in the order a traversal discovered them; the index is the position.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PositionAssignment {
    positions: Vec<Address>,
    depths: Vec<u32>,
    address_to_position: HashMap<Address, usize>,
}

impl PositionAssignment {
    fn push(&mut self, address: Address, depth: u32) {
        self.address_to_position
            .insert(address.clone(), self.positions.len());
        self.positions.push(address);
        self.depths.push(depth);
    }

    pub fn positions(&self) -> &[Address] {
        &self.positions
    }

    pub fn address_to_position(&self) -> &HashMap<Address, usize> {
        &self.address_to_position
    }

    /// BFS depth at which each position was reached, indexed like `positions`.
    pub fn depths(&self) -> &[u32] {
        &self.depths
    }

    /// Depth of the last discovered position, which is the deepest level reached.
    pub fn deepest(&self) -> u32 {
        self.depths.last().copied().unwrap_or_default()
    }

    pub fn position_of(&self, address: &str) -> i64 {
        self.address_to_position
            .get(address)
            .map(|position| *position as i64)
            .unwrap_or(OUT_OF_SCOPE)
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Breadth-first walk from `start` over funding edges, up to `max_depth` hops.
///
/// Position 0 is always `start`. A neighbour is enqueued only the first time it
/// is seen and only when the store holds a record for it; addresses without a
/// record are leaves.
pub fn discover(store: &CanonicalStore, start: &str, max_depth: u32) -> PositionAssignment {
    tracing::info!("discovering positions from {} with depth {}", start, max_depth);

    let mut assignment = PositionAssignment::default();
    let mut explored = HashSet::<Address>::new();
    let mut queue = VecDeque::<(Address, u32)>::new();

    explored.insert(start.to_string());
    queue.push_back((start.to_string(), 0));

    while let Some((address, depth)) = queue.pop_front() {
        if depth < max_depth {
            if let Some(record) = store.get(&address) {
                for source in record.sources(&address) {
                    if store.contains(source) && !explored.contains(source) {
                        explored.insert(source.clone());
                        queue.push_back((source.clone(), depth + 1));
                    }
                }
            }
        }
        assignment.push(address, depth);
    }

    tracing::debug!(
        "discovered {} positions, deepest level {}",
        assignment.len(),
        assignment.deepest()
    );
    assignment
}
