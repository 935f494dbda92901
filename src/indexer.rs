use std::hash::Hash;

use crate::primitives::{map_new, HashMap};

/// Hands out dense indices in first-seen order and remembers the reverse mapping.
pub struct Indexer<Id, Index, F>
where
    Id: Eq + Hash + Clone,
    Index: Copy,
    F: Fn(usize) -> Index,
{
    ids: Vec<Id>,
    index_by_id: HashMap<Id, Index>,
    to_index: F,
}

impl<Id: Eq + Hash + Clone, Index: Copy, F: Fn(usize) -> Index> Indexer<Id, Index, F> {
    pub fn new(to_index: F) -> Self {
        Self {
            ids: vec![],
            index_by_id: map_new(),
            to_index,
        }
    }

    pub fn index(&mut self, id: &Id) -> Index {
        if let Some(&index) = self.index_by_id.get(id) {
            return index;
        }
        let index = (self.to_index)(self.ids.len());
        self.ids.push(id.clone());
        self.index_by_id.insert(id.clone(), index);
        index
    }

    pub fn get(&self, id: &Id) -> Option<Index> {
        self.index_by_id.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Returns the ids ordered by their index, and the lookup table.
    pub fn drain(self) -> (Vec<Id>, HashMap<Id, Index>) {
        (self.ids, self.index_by_id)
    }
}
