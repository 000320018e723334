//! Record sinks and the bounded in-memory transparency log.

use std::collections::VecDeque;
use std::io::Write;

use parking_lot::RwLock;
use uuid::Uuid;

use super::record::TransparencyRecord;

/// Receives every transparency record the router emits.
///
/// Implementations must not block for long: the call happens while the
/// session's turn lock is held. Persistence layers should buffer.
pub trait TransparencySink: Send + Sync {
    fn accept(&self, record: &TransparencyRecord);
}

/// Append-only, bounded, in-memory record store.
///
/// When full, the oldest record is evicted.
#[derive(Debug)]
pub struct TransparencyLog {
    records: RwLock<VecDeque<TransparencyRecord>>,
    max_records: usize,
}

impl TransparencyLog {
    pub fn new(max_records: usize) -> Self {
        Self {
            records: RwLock::new(VecDeque::new()),
            max_records: max_records.max(1),
        }
    }

    pub fn append(&self, record: TransparencyRecord) {
        let mut records = self.records.write();
        if records.len() >= self.max_records {
            records.pop_front();
        }
        records.push_back(record);
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.max_records
    }

    /// Snapshot of every retained record, oldest first.
    pub fn records(&self) -> Vec<TransparencyRecord> {
        self.records.read().iter().cloned().collect()
    }

    /// Retained records of one session, oldest first.
    pub fn records_for_session(&self, session_id: &str) -> Vec<TransparencyRecord> {
        self.records
            .read()
            .iter()
            .filter(|r| r.session_id == session_id)
            .cloned()
            .collect()
    }

    pub fn get(&self, record_id: &Uuid) -> Option<TransparencyRecord> {
        self.records
            .read()
            .iter()
            .rev()
            .find(|r| r.record_id == *record_id)
            .cloned()
    }

    pub fn latest(&self) -> Option<TransparencyRecord> {
        self.records.read().back().cloned()
    }

    /// Write every retained record as one JSON object per line.
    ///
    /// Returns the number of records written.
    pub fn export_jsonl<W: Write>(&self, mut writer: W) -> std::io::Result<usize> {
        let records = self.records.read();
        for record in records.iter() {
            serde_json::to_writer(&mut writer, record)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        Ok(records.len())
    }

    pub fn clear(&self) {
        self.records.write().clear();
    }
}

impl Default for TransparencyLog {
    fn default() -> Self {
        Self::new(10_000)
    }
}

impl TransparencySink for TransparencyLog {
    fn accept(&self, record: &TransparencyRecord) {
        self.append(record.clone());
    }
}

/// Forwards records to the `log` facade at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl TransparencySink for LogSink {
    fn accept(&self, record: &TransparencyRecord) {
        log::debug!(
            "Turn {} of {}: primary={} confidence={:.3} basis={} frameworks={:?} fallback={}",
            record.turn,
            record.session_id,
            record.result.primary_persona,
            record.result.confidence,
            record.basis,
            record.result.active_frameworks,
            record.fallback_used,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::ActivationResult;
    use crate::selection::ActivationBasis;
    use chrono::Utc;
    use std::collections::BTreeSet;

    fn record(session: &str, turn: u64) -> TransparencyRecord {
        let record_id = TransparencyRecord::id_for(session, turn);
        TransparencyRecord {
            record_id,
            timestamp: Utc::now(),
            session_id: session.to_string(),
            turn,
            scores: vec![],
            result: ActivationResult {
                primary_persona: "fallback".into(),
                contextual_personas: vec![],
                active_frameworks: vec![],
                confidence: 0.0,
                switched: false,
                basis: ActivationBasis::Fallback,
                fallback_used: true,
                record_id,
            },
            fallback_used: true,
            fallback_reason: None,
            basis: ActivationBasis::Fallback,
            keyword_hits: vec![],
            explicit_mentions: BTreeSet::new(),
            detected_domains: BTreeSet::new(),
            notes: vec![],
        }
    }

    #[test]
    fn test_bounded_append_evicts_oldest() {
        let log = TransparencyLog::new(2);
        log.accept(&record("a", 1));
        log.accept(&record("a", 2));
        log.accept(&record("a", 3));
        assert_eq!(log.len(), 2);
        let turns: Vec<u64> = log.records().iter().map(|r| r.turn).collect();
        assert_eq!(turns, vec![2, 3]);
        assert_eq!(log.latest().unwrap().turn, 3);
    }

    #[test]
    fn test_session_queries_and_lookup() {
        let log = TransparencyLog::default();
        log.append(record("a", 1));
        log.append(record("b", 1));
        log.append(record("a", 2));
        assert_eq!(log.records_for_session("a").len(), 2);
        assert_eq!(log.records_for_session("c").len(), 0);
        let id = TransparencyRecord::id_for("b", 1);
        assert_eq!(log.get(&id).unwrap().session_id, "b");
        log.clear();
        assert!(log.is_empty());
    }

    #[test]
    fn test_export_jsonl() {
        let log = TransparencyLog::default();
        log.append(record("a", 1));
        log.append(record("a", 2));
        let mut buf = Vec::new();
        assert_eq!(log.export_jsonl(&mut buf).unwrap(), 2);
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let parsed: TransparencyRecord = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(parsed.turn, 2);
        assert_eq!(parsed.result.basis, ActivationBasis::Fallback);
    }
}
