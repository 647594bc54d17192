//! # Sparse-Set Component Storage
//!
//! One sparse set per component type: a dense value array for iteration,
//! a sparse id-to-dense-index map, and a reverse dense-index-to-id array
//! so removal can fix up the swapped element in O(1).

/// Marks an id as absent in the sparse map.
const ABSENT: u32 = u32::MAX;

/// Dense storage for one component type, keyed by entity id.
///
/// Iteration is in dense-array order: **not** id order, and **not**
/// stable across insert/remove.
#[derive(Debug)]
pub struct SparseSet<T> {
    dense: Vec<T>,
    /// Dense index per id, `ABSENT` when the id has no component.
    sparse: Vec<u32>,
    /// Entity id per dense slot.
    ids: Vec<u32>,
}

impl<T> Default for SparseSet<T> {
    fn default() -> Self {
        Self {
            dense: Vec::new(),
            sparse: Vec::new(),
            ids: Vec::new(),
        }
    }
}

impl<T> SparseSet<T> {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored components.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.dense.len()
    }

    /// True if nothing is stored.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dense.is_empty()
    }

    /// True if `id` has a component.
    #[inline]
    #[must_use]
    pub fn contains(&self, id: u32) -> bool {
        matches!(self.sparse.get(id as usize), Some(&slot) if slot != ABSENT)
    }

    /// Inserts a component for `id`.
    ///
    /// Idempotent: if the id already has one, the existing value is left
    /// unchanged and returned.
    pub fn insert(&mut self, id: u32, value: T) -> &mut T {
        let idx = id as usize;
        if idx >= self.sparse.len() {
            self.sparse.resize(idx + 1, ABSENT);
        }
        let slot = self.sparse[idx];
        if slot != ABSENT {
            return &mut self.dense[slot as usize];
        }
        let slot = self.dense.len() as u32;
        self.sparse[idx] = slot;
        self.dense.push(value);
        self.ids.push(id);
        &mut self.dense[slot as usize]
    }

    /// Removes and returns the component for `id`, if present.
    ///
    /// Swap-with-last: the last dense element moves into the vacated
    /// slot and its sparse entry is fixed up. O(1), invalidates any
    /// iteration order assumptions.
    pub fn remove(&mut self, id: u32) -> Option<T> {
        let idx = id as usize;
        let slot = *self.sparse.get(idx)?;
        if slot == ABSENT {
            return None;
        }
        let slot = slot as usize;
        let value = self.dense.swap_remove(slot);
        self.ids.swap_remove(slot);
        if slot < self.dense.len() {
            let moved_id = self.ids[slot];
            self.sparse[moved_id as usize] = slot as u32;
        }
        self.sparse[idx] = ABSENT;
        Some(value)
    }

    /// Shared access to `id`'s component.
    #[inline]
    #[must_use]
    pub fn get(&self, id: u32) -> Option<&T> {
        match *self.sparse.get(id as usize)? {
            ABSENT => None,
            slot => self.dense.get(slot as usize),
        }
    }

    /// Mutable access to `id`'s component.
    #[inline]
    pub fn get_mut(&mut self, id: u32) -> Option<&mut T> {
        match *self.sparse.get(id as usize)? {
            ABSENT => None,
            slot => self.dense.get_mut(slot as usize),
        }
    }

    /// Iterates `(id, &value)` pairs in dense order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &T)> {
        self.ids.iter().copied().zip(self.dense.iter())
    }

    /// Iterates `(id, &mut value)` pairs in dense order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (u32, &mut T)> {
        self.ids.iter().copied().zip(self.dense.iter_mut())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_get_remove_round_trip() {
        let mut set = SparseSet::new();
        set.insert(5, "five");
        set.insert(2, "two");

        assert_eq!(set.len(), 2);
        assert!(set.contains(5));
        assert_eq!(set.get(2), Some(&"two"));
        assert_eq!(set.remove(5), Some("five"));
        assert!(!set.contains(5));
        assert_eq!(set.get(2), Some(&"two"));
    }

    #[test]
    fn insert_is_idempotent() {
        let mut set = SparseSet::new();
        set.insert(1, 10);
        let existing = set.insert(1, 99);
        assert_eq!(*existing, 10);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn swap_remove_fixes_moved_element() {
        let mut set = SparseSet::new();
        set.insert(0, 'a');
        set.insert(1, 'b');
        set.insert(2, 'c');

        // Removing the first dense slot moves 'c' into it.
        assert_eq!(set.remove(0), Some('a'));
        assert_eq!(set.get(2), Some(&'c'));
        assert_eq!(set.get(1), Some(&'b'));
        assert_eq!(set.len(), 2);

        // The moved element can still be removed by id.
        assert_eq!(set.remove(2), Some('c'));
        assert_eq!(set.get(1), Some(&'b'));
    }

    #[test]
    fn remove_absent_is_none() {
        let mut set: SparseSet<u8> = SparseSet::new();
        assert_eq!(set.remove(7), None);
        set.insert(1, 1);
        assert_eq!(set.remove(7), None);
    }

    #[test]
    fn iteration_is_dense_order() {
        let mut set = SparseSet::new();
        set.insert(9, 9);
        set.insert(3, 3);
        set.insert(7, 7);
        set.remove(9);

        // 7 was swapped into slot 0; order reflects mutation history.
        let ids: Vec<u32> = set.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![7, 3]);
        for (id, value) in set.iter() {
            assert_eq!(id, *value);
        }
    }
}
