//! Equality gate in front of the assemble/execute pipeline.

/// Remembers the last text that started a cycle.
///
/// The slot is updated as soon as a change is seen, before assembly is
/// attempted. A text that fails to assemble is therefore reported once and
/// not retried on every tick.
#[derive(Debug, Default, Clone)]
pub struct ChangeDetector {
    last_processed: String,
}

impl ChangeDetector {
    /// Starts with an empty slot, so an empty surface never starts a cycle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` exactly when `current` differs from the last processed text.
    pub fn should_process(&mut self, current: &str) -> bool {
        if self.last_processed == current {
            return false;
        }
        self.last_processed.clear();
        self.last_processed.push_str(current);
        true
    }

    pub fn last_processed(&self) -> &str {
        &self.last_processed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_is_not_a_change() {
        let mut detector = ChangeDetector::new();
        assert!(!detector.should_process(""));
        assert_eq!(detector.last_processed(), "");
    }

    #[test]
    fn fires_once_per_distinct_value() {
        let mut detector = ChangeDetector::new();
        let texts = ["a", "a", "b", "b", "b", "a", "", ""];
        let fired: Vec<bool> = texts
            .iter()
            .map(|text| detector.should_process(text))
            .collect();
        assert_eq!(
            fired,
            [true, false, true, false, false, true, true, false]
        );
        assert_eq!(detector.last_processed(), "");
    }

    #[test]
    fn unchanged_text_has_no_side_effect() {
        let mut detector = ChangeDetector::new();
        assert!(detector.should_process("(module)"));
        assert!(!detector.should_process("(module)"));
        assert_eq!(detector.last_processed(), "(module)");
    }
}
