//! Typed result of one relay iteration

use std::fmt;

/// Which dependency call failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Receive,
    Store,
    Ack,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Receive => "receive",
            Stage::Store => "store",
            Stage::Ack => "ack",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened during one poll
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// The body was written and the message deleted
    Stored { key: String, message_id: String },

    /// Nothing arrived within the wait time
    Empty,

    /// The body was not JSON; the message stays on the queue
    ParseError { message_id: String, reason: String },

    /// A queue or store call failed
    DependencyError { stage: Stage, error: String },
}

impl PollOutcome {
    pub fn is_dependency_error(&self) -> bool {
        matches!(self, PollOutcome::DependencyError { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            PollOutcome::Stored { .. } => "stored",
            PollOutcome::Empty => "empty",
            PollOutcome::ParseError { .. } => "parse_error",
            PollOutcome::DependencyError { .. } => "dependency_error",
        }
    }
}

/// Running totals over the life of a relay loop
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayStats {
    pub iterations: u64,
    pub stored: u64,
    pub empty: u64,
    pub parse_errors: u64,
    pub dependency_errors: u64,
}

impl RelayStats {
    pub fn record(&mut self, outcome: &PollOutcome) {
        self.iterations += 1;
        match outcome {
            PollOutcome::Stored { .. } => self.stored += 1,
            PollOutcome::Empty => self.empty += 1,
            PollOutcome::ParseError { .. } => self.parse_errors += 1,
            PollOutcome::DependencyError { .. } => self.dependency_errors += 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_count_each_outcome() {
        let mut stats = RelayStats::default();
        stats.record(&PollOutcome::Empty);
        stats.record(&PollOutcome::Stored {
            key: "data/1.json".to_string(),
            message_id: "m1".to_string(),
        });
        stats.record(&PollOutcome::DependencyError {
            stage: Stage::Ack,
            error: "boom".to_string(),
        });

        assert_eq!(stats.iterations, 3);
        assert_eq!(stats.stored, 1);
        assert_eq!(stats.empty, 1);
        assert_eq!(stats.dependency_errors, 1);
        assert_eq!(stats.parse_errors, 0);
    }

    #[test]
    fn test_labels() {
        assert_eq!(PollOutcome::Empty.label(), "empty");
        assert!(!PollOutcome::Empty.is_dependency_error());
        assert_eq!(Stage::Store.to_string(), "store");
    }
}
