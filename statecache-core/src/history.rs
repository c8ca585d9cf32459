use serde_json::Value;

/// Linear undo/redo history of whole-store snapshots.
///
/// `entries[cursor]` is always the state the store was last recorded or
/// restored to. Recording after an undo discards the redo tail.
///
/// # Examples
///
/// ```
/// use statecache_core::History;
/// use serde_json::json;
///
/// let mut history = History::new(10);
/// history.enable(&json!({}));
/// history.record(&json!({"counter": 1}));
/// history.record(&json!({"counter": 2}));
///
/// assert_eq!(history.undo(), Some(&json!({"counter": 1})));
/// assert_eq!(history.redo(), Some(&json!({"counter": 2})));
/// assert_eq!(history.redo(), None);
/// ```
#[derive(Debug, Clone)]
pub struct History {
    enabled: bool,
    entries: Vec<Value>,
    cursor: usize,
    limit: usize,
}

impl History {
    /// `limit` caps the number of snapshots kept (minimum 1); the oldest
    /// are dropped first.
    pub fn new(limit: usize) -> Self {
        Self {
            enabled: false,
            entries: Vec::new(),
            cursor: 0,
            limit: limit.max(1),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Starts recording with `baseline` as the oldest state. No-op if
    /// already recording.
    pub fn enable(&mut self, baseline: &Value) {
        if self.enabled {
            return;
        }
        self.enabled = true;
        self.reset(baseline);
    }

    /// Stops recording and drops every snapshot.
    pub fn disable(&mut self) {
        self.enabled = false;
        self.entries.clear();
        self.cursor = 0;
    }

    /// Replaces the history with a single baseline snapshot.
    pub fn reset(&mut self, baseline: &Value) {
        self.entries.clear();
        self.entries.push(baseline.clone());
        self.cursor = 0;
    }

    /// Appends `state` unless recording is off or it equals the current
    /// snapshot. Returns whether anything was recorded.
    pub fn record(&mut self, state: &Value) -> bool {
        if !self.enabled || self.entries.get(self.cursor) == Some(state) {
            return false;
        }
        self.entries.truncate(self.cursor + 1);
        self.entries.push(state.clone());
        if self.entries.len() > self.limit {
            let overflow = self.entries.len() - self.limit;
            self.entries.drain(..overflow);
        }
        self.cursor = self.entries.len() - 1;
        true
    }

    /// Steps back one snapshot and returns it.
    pub fn undo(&mut self) -> Option<&Value> {
        if !self.can_undo() {
            return None;
        }
        self.cursor -= 1;
        self.entries.get(self.cursor)
    }

    /// Steps forward one snapshot and returns it.
    pub fn redo(&mut self) -> Option<&Value> {
        if !self.can_redo() {
            return None;
        }
        self.cursor += 1;
        self.entries.get(self.cursor)
    }

    pub fn can_undo(&self) -> bool {
        self.enabled && self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.enabled && self.cursor + 1 < self.entries.len()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn entries(&self) -> &[Value] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_disabled_history_records_nothing() {
        let mut history = History::new(10);
        assert!(!history.record(&json!({"a": 1})));
        assert!(history.entries().is_empty());
        assert_eq!(history.undo(), None);
    }

    #[test]
    fn test_undo_floor_and_redo_ceiling() {
        let mut history = History::new(10);
        history.enable(&json!({}));
        history.record(&json!({"c": 1}));

        assert!(history.undo().is_some());
        assert_eq!(history.undo(), None);
        assert_eq!(history.cursor(), 0);

        assert!(history.redo().is_some());
        assert_eq!(history.redo(), None);
        assert_eq!(history.cursor(), 1);
    }

    #[test]
    fn test_record_after_undo_drops_redo_tail() {
        let mut history = History::new(10);
        history.enable(&json!({}));
        history.record(&json!({"c": 1}));
        history.record(&json!({"c": 2}));
        history.undo();

        history.record(&json!({"c": 9}));
        assert_eq!(
            history.entries(),
            &[json!({}), json!({"c": 1}), json!({"c": 9})]
        );
        assert!(!history.can_redo());
    }

    #[test]
    fn test_identical_state_is_not_recorded() {
        let mut history = History::new(10);
        history.enable(&json!({"c": 1}));
        assert!(!history.record(&json!({"c": 1})));
        assert_eq!(history.entries().len(), 1);
    }

    #[test]
    fn test_limit_drops_oldest() {
        let mut history = History::new(3);
        history.enable(&json!(0));
        for i in 1..=5 {
            history.record(&json!(i));
        }
        assert_eq!(history.entries(), &[json!(3), json!(4), json!(5)]);
        assert_eq!(history.cursor(), 2);
    }

    #[test]
    fn test_enable_twice_keeps_entries() {
        let mut history = History::new(10);
        history.enable(&json!({}));
        history.record(&json!({"a": 1}));
        history.enable(&json!({"ignored": true}));
        assert_eq!(history.entries().len(), 2);

        history.disable();
        assert!(!history.is_enabled());
        assert!(history.entries().is_empty());
    }
}
