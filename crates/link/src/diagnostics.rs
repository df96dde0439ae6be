//! Bounded log of FCU diagnostic text

use std::collections::VecDeque;

/// Ring buffer of the most recent STATUSTEXT messages
#[derive(Debug, Clone)]
pub struct DiagnosticLog {
    capacity: usize,
    messages: VecDeque<String>,
}

impl DiagnosticLog {
    /// Messages retained per link
    pub const DEFAULT_CAPACITY: usize = 50;

    /// Create a log holding at most `capacity` messages
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            messages: VecDeque::with_capacity(capacity),
        }
    }

    /// Append a message, evicting the oldest when full
    pub fn push(&mut self, message: impl Into<String>) {
        if self.capacity == 0 {
            return;
        }
        if self.messages.len() == self.capacity {
            self.messages.pop_front();
        }
        self.messages.push_back(message.into());
    }

    /// The last `n` messages, oldest first
    pub fn recent(&self, n: usize) -> Vec<String> {
        let skip = self.messages.len().saturating_sub(n);
        self.messages.iter().skip(skip).cloned().collect()
    }

    /// Number of retained messages
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether nothing has been received yet
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl Default for DiagnosticLog {
    fn default() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_evicts_oldest() {
        let mut log = DiagnosticLog::default();
        for i in 0..60 {
            log.push(format!("msg {}", i));
        }

        assert_eq!(log.len(), 50);
        let all = log.recent(50);
        assert_eq!(all.first().map(String::as_str), Some("msg 10"));
        assert_eq!(all.last().map(String::as_str), Some("msg 59"));
    }

    #[test]
    fn test_recent_returns_tail_in_order() {
        let mut log = DiagnosticLog::with_capacity(5);
        log.push("PreArm: GPS not healthy");
        log.push("PreArm: Compass not calibrated");
        log.push("Arm: Mode not armable");

        assert_eq!(
            log.recent(2),
            vec!["PreArm: Compass not calibrated", "Arm: Mode not armable"]
        );
        assert_eq!(log.recent(10).len(), 3);
    }
}
