//! Distributor event log
//!
//! Every state change appends one record with a monotonically increasing
//! sequence number. Consumers poll with `events_since`.

use serde::{Deserialize, Serialize};

use rewardcraft_core::{Address, Amount, EpochId, Hash, TokenId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistributorEvent {
    /// An updater voted for a root of the open epoch
    RootProposed {
        updater: Address,
        epoch: EpochId,
        root: Hash,
        votes: usize,
    },
    /// A root reached the threshold and became live
    RootFinalized {
        epoch: EpochId,
        root: Hash,
        uri: String,
        finalized_by: Address,
    },
    /// A leaf was (partially) settled
    Claimed {
        index: u64,
        account: Address,
        payee: Address,
        amount: Amount,
    },
    ThresholdChanged { old: usize, new: usize },
    GovernanceChanged,
    ReceiptTransferred {
        token_id: TokenId,
        from: Address,
        to: Address,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub seq: u64,
    pub event: DistributorEvent,
}

#[derive(Debug, Clone, Default)]
pub struct EventLog {
    records: Vec<EventRecord>,
    next_seq: u64,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event, returning its sequence number.
    pub fn emit(&mut self, event: DistributorEvent) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.records.push(EventRecord { seq, event });
        seq
    }

    /// Records with `seq >= since`, oldest first.
    pub fn since(&self, since: u64) -> &[EventRecord] {
        let start = self.records.partition_point(|r| r.seq < since);
        &self.records[start..]
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn next_seq(&self) -> u64 {
        self.next_seq
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_numbers() {
        let mut log = EventLog::new();
        assert_eq!(log.emit(DistributorEvent::GovernanceChanged), 0);
        assert_eq!(log.emit(DistributorEvent::ThresholdChanged { old: 1, new: 2 }), 1);
        assert_eq!(log.next_seq(), 2);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_since() {
        let mut log = EventLog::new();
        for i in 0..5 {
            log.emit(DistributorEvent::ThresholdChanged { old: i, new: i + 1 });
        }
        assert_eq!(log.since(0).len(), 5);
        assert_eq!(log.since(3).len(), 2);
        assert_eq!(log.since(3)[0].seq, 3);
        assert!(log.since(5).is_empty());
        assert!(log.since(100).is_empty());
    }

    #[test]
    fn test_event_json_shape() {
        let json = serde_json::to_value(DistributorEvent::ThresholdChanged { old: 1, new: 2 }).unwrap();
        assert_eq!(json["threshold_changed"]["new"], 2);
    }
}
