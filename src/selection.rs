//! Throttle selection
//!
//! At most one throttle column is the selection target at a time. Selecting
//! a column implicitly deselects the previous one; callers get the previous
//! column back so they can refresh its select button.

use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionManager {
    selected: Option<usize>,
}

impl SelectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn is_selected(&self, column: usize) -> bool {
        self.selected == Some(column)
    }

    /// Make `column` the selection target, returning the column it replaced
    pub fn select(&mut self, column: usize) -> Option<usize> {
        let previous = self.selected.replace(column).filter(|&p| p != column);
        debug!("Selected column {} (previous: {:?})", column, previous);
        previous
    }

    /// Clear the selection if `column` holds it; returns whether it did
    pub fn deselect(&mut self, column: usize) -> bool {
        if self.selected == Some(column) {
            self.selected = None;
            debug!("Deselected column {}", column);
            true
        } else {
            false
        }
    }

    /// Replace the selection wholesale (page restore)
    pub fn restore(&mut self, selected: Option<usize>) {
        self.selected = selected;
    }

    pub fn clear(&mut self) {
        self.selected = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_replaces_previous() {
        let mut sel = SelectionManager::new();
        assert_eq!(sel.select(2), None);
        assert_eq!(sel.select(5), Some(2));
        assert!(sel.is_selected(5));
        assert!(!sel.is_selected(2));
    }

    #[test]
    fn test_reselect_same_column_reports_nothing_replaced() {
        let mut sel = SelectionManager::new();
        sel.select(1);
        assert_eq!(sel.select(1), None);
        assert_eq!(sel.selected(), Some(1));
    }

    #[test]
    fn test_deselect_only_clears_owner() {
        let mut sel = SelectionManager::new();
        sel.select(3);
        assert!(!sel.deselect(4));
        assert_eq!(sel.selected(), Some(3));
        assert!(sel.deselect(3));
        assert_eq!(sel.selected(), None);
    }
}
