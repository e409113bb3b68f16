//! User documents and the list rules applied to them.
//!
//! A user owns two most-recent-first lists of translation pairs:
//! `history` (bounded, filled automatically after a successful translation)
//! and `saved` (unbounded, curated by the user). Both reject a pair whose
//! source and target text are identical to an existing entry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// One translated pair, immutable once stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationRecord {
    #[serde(rename = "english")]
    pub source_text: String,
    #[serde(rename = "telugu")]
    pub target_text: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl TranslationRecord {
    pub fn new(source_text: impl Into<String>, target_text: impl Into<String>) -> Self {
        Self {
            source_text: source_text.into(),
            target_text: target_text.into(),
            created_at: Utc::now(),
        }
    }

    /// Same pair regardless of when it was created
    pub fn same_pair(&self, other: &TranslationRecord) -> bool {
        self.source_text == other.source_text && self.target_text == other.target_text
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListName {
    History,
    Saved,
}

impl fmt::Display for ListName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListName::History => write!(f, "history"),
            ListName::Saved => write!(f, "saved"),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("Invalid index {index} for {list} list of length {len}")]
    InvalidIndex {
        list: ListName,
        index: i64,
        len: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryOutcome {
    Inserted,
    Duplicate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SavedOutcome {
    Saved,
    AlreadySaved,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub username: String,
    pub password_hash: String,
    pub history: Vec<TranslationRecord>,
    pub saved: Vec<TranslationRecord>,
}

impl User {
    pub fn new(username: impl Into<String>, password_hash: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password_hash: password_hash.into(),
            history: Vec::new(),
            saved: Vec::new(),
        }
    }

    pub fn list(&self, list: ListName) -> &[TranslationRecord] {
        match list {
            ListName::History => &self.history,
            ListName::Saved => &self.saved,
        }
    }

    fn list_mut(&mut self, list: ListName) -> &mut Vec<TranslationRecord> {
        match list {
            ListName::History => &mut self.history,
            ListName::Saved => &mut self.saved,
        }
    }

    /// Push to the front of history, keeping at most `cap` entries
    pub fn record_history(&mut self, record: TranslationRecord, cap: usize) -> HistoryOutcome {
        if self.history.iter().any(|r| r.same_pair(&record)) {
            return HistoryOutcome::Duplicate;
        }

        self.history.insert(0, record);
        self.history.truncate(cap);
        HistoryOutcome::Inserted
    }

    pub fn record_saved(&mut self, record: TranslationRecord) -> SavedOutcome {
        if self.saved.iter().any(|r| r.same_pair(&record)) {
            return SavedOutcome::AlreadySaved;
        }

        self.saved.insert(0, record);
        SavedOutcome::Saved
    }

    /// Remove the entry at `index` (0 is the most recent)
    pub fn delete_one(
        &mut self,
        list: ListName,
        index: i64,
    ) -> Result<TranslationRecord, RecordError> {
        let entries = self.list_mut(list);
        let len = entries.len();

        match usize::try_from(index) {
            Ok(i) if i < len => Ok(entries.remove(i)),
            _ => Err(RecordError::InvalidIndex { list, index, len }),
        }
    }

    pub fn clear_all(&mut self, list: ListName) {
        self.list_mut(list).clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn user() -> User {
        User::new("ravi", "hash")
    }

    #[test]
    fn test_record_history_inserts_at_front() {
        let mut user = user();
        user.record_history(TranslationRecord::new("hello", "హలో"), 5);
        user.record_history(TranslationRecord::new("water", "నీరు"), 5);

        assert_eq!(user.history[0].source_text, "water");
        assert_eq!(user.history[1].source_text, "hello");
    }

    #[test]
    fn test_record_history_truncates_oldest() {
        let mut user = user();
        for i in 0..7 {
            user.record_history(TranslationRecord::new(format!("s{}", i), "t"), 5);
        }

        assert_eq!(user.history.len(), 5);
        assert_eq!(user.history[0].source_text, "s6");
        assert_eq!(user.history[4].source_text, "s2");
    }

    #[test]
    fn test_record_history_skips_identical_pair() {
        let mut user = user();
        assert_eq!(
            user.record_history(TranslationRecord::new("hello", "హలో"), 5),
            HistoryOutcome::Inserted
        );
        assert_eq!(
            user.record_history(TranslationRecord::new("hello", "హలో"), 5),
            HistoryOutcome::Duplicate
        );
        assert_eq!(user.history.len(), 1);
    }

    #[test]
    fn test_record_history_keeps_pairs_that_differ_in_one_field() {
        let mut user = user();
        user.record_history(TranslationRecord::new("hello", "హలో"), 5);
        user.record_history(TranslationRecord::new("hello", "నమస్తే"), 5);

        assert_eq!(user.history.len(), 2);
    }

    #[test]
    fn test_record_saved_is_idempotent() {
        let mut user = user();
        assert_eq!(
            user.record_saved(TranslationRecord::new("a", "b")),
            SavedOutcome::Saved
        );
        assert_eq!(
            user.record_saved(TranslationRecord::new("a", "b")),
            SavedOutcome::AlreadySaved
        );
        assert_eq!(user.saved.len(), 1);
    }

    #[test]
    fn test_record_saved_is_unbounded() {
        let mut user = user();
        for i in 0..50 {
            user.record_saved(TranslationRecord::new(format!("s{}", i), "t"));
        }
        assert_eq!(user.saved.len(), 50);
        assert_eq!(user.saved[0].source_text, "s49");
    }

    #[test]
    fn test_save_then_delete_leaves_saved_empty() {
        let mut user = user();
        user.record_saved(TranslationRecord::new("a", "b"));

        let removed = user.delete_one(ListName::Saved, 0).expect("index 0 exists");

        assert_eq!(removed.source_text, "a");
        assert!(user.saved.is_empty());
    }

    #[test]
    fn test_delete_one_out_of_bounds() {
        let mut user = user();
        user.record_history(TranslationRecord::new("a", "b"), 5);

        let error = user.delete_one(ListName::History, 1).unwrap_err();
        assert_eq!(
            error,
            RecordError::InvalidIndex {
                list: ListName::History,
                index: 1,
                len: 1
            }
        );
        assert!(user.delete_one(ListName::History, -1).is_err());
        assert_eq!(user.history.len(), 1);
    }

    #[test]
    fn test_delete_one_on_empty_list() {
        let mut user = user();
        assert!(user.delete_one(ListName::Saved, 0).is_err());
    }

    #[test]
    fn test_clear_all_is_idempotent() {
        let mut user = user();
        user.record_saved(TranslationRecord::new("a", "b"));
        user.record_history(TranslationRecord::new("a", "b"), 5);

        user.clear_all(ListName::Saved);
        user.clear_all(ListName::Saved);

        assert!(user.saved.is_empty());
        assert_eq!(user.history.len(), 1);
    }

    #[test]
    fn test_record_serializes_with_wire_names() {
        let record = TranslationRecord::new("hello", "హలో");
        let json = serde_json::to_value(&record).expect("serialize");

        assert_eq!(json["english"], "hello");
        assert_eq!(json["telugu"], "హలో");
        assert!(json["createdAt"].is_string());
    }

    #[test]
    fn test_list_name_display() {
        assert_eq!(ListName::History.to_string(), "history");
        assert_eq!(ListName::Saved.to_string(), "saved");
    }

    #[derive(Debug, Clone)]
    enum Op {
        History(u8, u8),
        Saved(u8, u8),
        Delete(bool, i64),
        Clear(bool),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0u8..6, 0u8..3).prop_map(|(s, t)| Op::History(s, t)),
            (0u8..6, 0u8..3).prop_map(|(s, t)| Op::Saved(s, t)),
            (any::<bool>(), -2i64..8).prop_map(|(h, i)| Op::Delete(h, i)),
            any::<bool>().prop_map(Op::Clear),
        ]
    }

    fn list_for(history: bool) -> ListName {
        if history {
            ListName::History
        } else {
            ListName::Saved
        }
    }

    proptest! {
        #[test]
        fn prop_history_never_exceeds_cap(
            cap in 1usize..6,
            ops in proptest::collection::vec(op_strategy(), 0..60),
        ) {
            let mut user = user();
            for op in ops {
                match op {
                    Op::History(s, t) => {
                        let record = TranslationRecord::new(s.to_string(), t.to_string());
                        user.record_history(record, cap);
                    }
                    Op::Saved(s, t) => {
                        user.record_saved(TranslationRecord::new(s.to_string(), t.to_string()));
                    }
                    Op::Delete(h, i) => {
                        let _ = user.delete_one(list_for(h), i);
                    }
                    Op::Clear(h) => user.clear_all(list_for(h)),
                }
                prop_assert!(user.history.len() <= cap);
            }
        }

        #[test]
        fn prop_saved_never_holds_duplicates(
            pairs in proptest::collection::vec((0u8..4, 0u8..4), 0..40),
        ) {
            let mut user = user();
            for (s, t) in pairs {
                user.record_saved(TranslationRecord::new(s.to_string(), t.to_string()));
            }
            for (i, a) in user.saved.iter().enumerate() {
                for b in user.saved.iter().skip(i + 1) {
                    prop_assert!(!a.same_pair(b));
                }
            }
        }

        #[test]
        fn prop_invalid_delete_leaves_list_untouched(
            len in 0usize..6,
            index in prop_oneof![-5i64..0, 6i64..20],
        ) {
            let mut user = user();
            for i in 0..len {
                user.record_saved(TranslationRecord::new(i.to_string(), "t"));
            }
            let before = user.saved.clone();

            prop_assert!(user.delete_one(ListName::Saved, index).is_err());
            prop_assert_eq!(before, user.saved);
        }
    }
}
