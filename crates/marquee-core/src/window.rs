use marquee_models::{RawEntry, WatchlistSnapshot};
use serde::{Deserialize, Serialize};

/// The revealed prefix of a snapshot, in snapshot order. Only ever grows.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VisibleWindow {
    entries: Vec<RawEntry>,
}

/// How much of a snapshot the consumer has revealed so far
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowCursor {
    pub revealed: usize,
}

impl VisibleWindow {
    pub fn entries(&self) -> &[RawEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn covers(&self, snapshot: &WatchlistSnapshot) -> bool {
        self.entries.len() >= snapshot.len()
    }

    pub fn cursor(&self) -> WindowCursor {
        WindowCursor {
            revealed: self.entries.len(),
        }
    }
}

/// The first `size` entries of the snapshot, in order
pub fn initial_window(snapshot: &WatchlistSnapshot, size: usize) -> VisibleWindow {
    window_at(snapshot, WindowCursor { revealed: size })
}

/// Append the next `size` unrevealed entries. Returns the window unchanged
/// once it already covers the whole snapshot.
pub fn expand(mut current: VisibleWindow, snapshot: &WatchlistSnapshot, size: usize) -> VisibleWindow {
    if current.covers(snapshot) {
        return current;
    }
    let start = current.len();
    let end = start.saturating_add(size).min(snapshot.len());
    current.entries.extend_from_slice(&snapshot.entries[start..end]);
    current
}

/// Rebuild the window a consumer had reached, clamped to the snapshot
pub fn window_at(snapshot: &WatchlistSnapshot, cursor: WindowCursor) -> VisibleWindow {
    let end = cursor.revealed.min(snapshot.len());
    VisibleWindow {
        entries: snapshot.entries[..end].to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::entries;

    fn snapshot(count: usize) -> WatchlistSnapshot {
        let mut snapshot = WatchlistSnapshot::new("viewer");
        snapshot.entries = entries(count);
        snapshot.mark_exhausted();
        snapshot
    }

    #[test]
    fn test_windows_grow_to_snapshot_length() {
        let snapshot = snapshot(45);

        let window = initial_window(&snapshot, 20);
        assert_eq!(window.len(), 20);
        let window = expand(window, &snapshot, 20);
        assert_eq!(window.len(), 40);
        let window = expand(window, &snapshot, 20);
        assert_eq!(window.len(), 45);

        assert_eq!(window.entries(), &snapshot.entries[..]);
    }

    #[test]
    fn test_expand_on_full_window_is_idempotent() {
        let snapshot = snapshot(12);
        let full = initial_window(&snapshot, 20);
        assert!(full.covers(&snapshot));

        let again = expand(full.clone(), &snapshot, 20);
        assert_eq!(again, full);
        assert_eq!(expand(again, &snapshot, 5), full);
    }

    #[test]
    fn test_expand_preserves_order() {
        let snapshot = snapshot(7);
        let window = expand(initial_window(&snapshot, 3), &snapshot, 3);
        let titles: Vec<&str> = window.entries().iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["Movie 1", "Movie 2", "Movie 3", "Movie 4", "Movie 5", "Movie 6"]);
    }

    #[test]
    fn test_zero_size_reveals_nothing() {
        let snapshot = snapshot(5);
        let window = initial_window(&snapshot, 0);
        assert!(window.is_empty());
        assert!(expand(window, &snapshot, 0).is_empty());
    }

    #[test]
    fn test_cursor_restores_window() {
        let snapshot = snapshot(30);
        let window = expand(initial_window(&snapshot, 10), &snapshot, 10);
        assert_eq!(window_at(&snapshot, window.cursor()), window);
        assert_eq!(window_at(&snapshot, WindowCursor { revealed: 99 }).len(), 30);
    }

    #[test]
    fn test_empty_snapshot() {
        let snapshot = snapshot(0);
        let window = initial_window(&snapshot, 20);
        assert!(window.covers(&snapshot));
        assert!(expand(window, &snapshot, 20).is_empty());
    }
}
