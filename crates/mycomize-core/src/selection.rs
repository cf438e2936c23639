// ── Multi-select state ──
//
// Pure state holder shared by the link and unlink flows. One instance per
// flow; nothing here touches the network or disk.

use std::collections::BTreeSet;

use crate::model::EntityRef;

/// Selection set plus bulk-mode flag.
///
/// Outside bulk mode the selection holds at most one item: toggling a
/// second item replaces the first. Leaving bulk mode clears the selection.
#[derive(Debug, Clone)]
pub struct SelectionController<K: Ord + Clone = EntityRef> {
    selected: BTreeSet<K>,
    bulk: bool,
}

impl<K: Ord + Clone> Default for SelectionController<K> {
    fn default() -> Self {
        Self {
            selected: BTreeSet::new(),
            bulk: false,
        }
    }
}

impl<K: Ord + Clone> SelectionController<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip `key`'s membership. Returns whether it is now selected.
    pub fn toggle(&mut self, key: K) -> bool {
        if self.selected.remove(&key) {
            return false;
        }
        if !self.bulk {
            self.selected.clear();
        }
        self.selected.insert(key);
        true
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    pub fn enter_bulk_mode(&mut self) {
        self.bulk = true;
    }

    pub fn exit_bulk_mode(&mut self) {
        self.bulk = false;
        self.selected.clear();
    }

    /// Select every key in `keys` (bulk mode only; ignored otherwise).
    pub fn select_all(&mut self, keys: impl IntoIterator<Item = K>) {
        if self.bulk {
            self.selected.extend(keys);
        }
    }

    /// Drop selected keys that no longer satisfy `keep`, e.g. after the
    /// visible pool shrank because a filter changed.
    pub fn retain(&mut self, keep: impl FnMut(&K) -> bool) {
        self.selected.retain(keep);
    }

    pub fn is_bulk_mode(&self) -> bool {
        self.bulk
    }

    pub fn is_selected(&self, key: &K) -> bool {
        self.selected.contains(key)
    }

    pub fn selected(&self) -> &BTreeSet<K> {
        &self.selected
    }

    /// Selection in stable order, ready to hand to the link manager.
    pub fn to_vec(&self) -> Vec<K> {
        self.selected.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_adds_then_removes() {
        let mut sel: SelectionController<u32> = SelectionController::new();
        assert!(sel.toggle(1));
        assert!(sel.is_selected(&1));
        assert!(!sel.toggle(1));
        assert!(sel.is_empty());
    }

    #[test]
    fn single_mode_keeps_one_item() {
        let mut sel: SelectionController<u32> = SelectionController::new();
        sel.toggle(1);
        sel.toggle(2);
        assert_eq!(sel.to_vec(), vec![2]);
    }

    #[test]
    fn bulk_mode_accumulates() {
        let mut sel: SelectionController<u32> = SelectionController::new();
        sel.enter_bulk_mode();
        sel.toggle(3);
        sel.toggle(1);
        sel.toggle(2);
        assert_eq!(sel.to_vec(), vec![1, 2, 3]);
        assert!(sel.is_bulk_mode());
    }

    #[test]
    fn exit_bulk_mode_clears() {
        let mut sel: SelectionController<u32> = SelectionController::new();
        sel.enter_bulk_mode();
        sel.select_all([1, 2, 3]);
        sel.exit_bulk_mode();
        assert!(sel.is_empty());
        assert!(!sel.is_bulk_mode());
    }

    #[test]
    fn select_all_requires_bulk_mode() {
        let mut sel: SelectionController<u32> = SelectionController::new();
        sel.select_all([1, 2]);
        assert!(sel.is_empty());
    }

    #[test]
    fn link_and_unlink_flows_do_not_share_state() {
        let mut link_sel: SelectionController<u32> = SelectionController::new();
        let unlink_sel: SelectionController<u32> = SelectionController::new();
        link_sel.toggle(7);
        assert!(unlink_sel.is_empty());
    }

    #[test]
    fn retain_prunes_hidden_items() {
        let mut sel: SelectionController<u32> = SelectionController::new();
        sel.enter_bulk_mode();
        sel.select_all([1, 2, 3, 4]);
        sel.retain(|k| k % 2 == 0);
        assert_eq!(sel.to_vec(), vec![2, 4]);
    }
}
