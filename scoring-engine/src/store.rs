//! In-memory transaction store and analysis-window slicing
//!
//! Transactions are grouped by customer and held for the lifetime of the
//! analysis session. Window slicing is always relative to a reference
//! instant the engine supplies, so the same store yields identical slices
//! for identical references.

use std::collections::HashMap;

use chrono::{Duration, NaiveDateTime};
use detector_core::types::{CustomerInfo, Transaction};

/// Recent and historical slices for one customer, each sorted by timestamp
#[derive(Debug, Clone)]
pub struct WindowSlices {
    /// Transactions inside the recent window
    pub recent: Vec<Transaction>,
    /// Transactions inside the historical window, ending before the recent one
    pub historical: Vec<Transaction>,
}

/// Append-only per-customer transaction store
#[derive(Debug, Default)]
pub struct TransactionStore {
    transactions: HashMap<String, Vec<Transaction>>,
    customer_info: HashMap<String, CustomerInfo>,
}

impl TransactionStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Append transactions, grouping them by customer id
    pub fn add_transactions(&mut self, transactions: Vec<Transaction>) {
        for txn in transactions {
            self.transactions
                .entry(txn.customer_id.clone())
                .or_default()
                .push(txn);
        }
    }

    /// Upsert per-customer context
    pub fn set_customer_info(&mut self, info: CustomerInfo) {
        self.customer_info.insert(info.customer_id.clone(), info);
    }

    /// Context for one customer, if any was supplied
    pub fn customer_info(&self, customer_id: &str) -> Option<&CustomerInfo> {
        self.customer_info.get(customer_id)
    }

    /// All customer ids, sorted for deterministic iteration
    pub fn customer_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.transactions.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Raw transactions of one customer in insertion order
    pub fn transactions_of(&self, customer_id: &str) -> &[Transaction] {
        self.transactions
            .get(customer_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every transaction across all customers (for peer comparisons)
    pub fn all_transactions(&self) -> Vec<Transaction> {
        let mut all: Vec<Transaction> = Vec::new();
        for id in self.customer_ids() {
            all.extend_from_slice(self.transactions_of(&id));
        }
        all
    }

    /// Newest timestamp across the whole store
    pub fn latest_timestamp(&self) -> Option<NaiveDateTime> {
        self.transactions
            .values()
            .flatten()
            .filter_map(|t| t.timestamp)
            .max()
    }

    /// True when the newest transaction is older than `threshold_days`
    /// relative to `now`; such datasets are analysed against their own end
    pub fn is_historical_data(&self, now: NaiveDateTime, threshold_days: i64) -> bool {
        match self.latest_timestamp() {
            Some(latest) => (now - latest).num_days() > threshold_days,
            None => false,
        }
    }

    /// Slice one customer's transactions into recent and historical windows
    ///
    /// When the recent window is at least as long as the historical one the
    /// two would overlap entirely; the timestamped sequence is then split
    /// 50/50 into an older (historical) and a newer (recent) half instead.
    pub fn window_slices(
        &self,
        customer_id: &str,
        recent_days: i64,
        historical_days: i64,
        reference: NaiveDateTime,
    ) -> WindowSlices {
        if recent_days >= historical_days {
            let mut all = self.timestamped_within(customer_id, historical_days, reference);
            all.sort_by_key(|t| t.timestamp);
            if all.len() > 1 {
                let split = all.len() / 2;
                let recent = all.split_off(split);
                return WindowSlices {
                    recent,
                    historical: all,
                };
            }
            // Too few transactions to split: keep the full recent window,
            // which covers at least the historical one here
            let mut recent = self.timestamped_within(customer_id, recent_days, reference);
            recent.sort_by_key(|t| t.timestamp);
            return WindowSlices {
                recent,
                historical: Vec::new(),
            };
        }

        let recent_cutoff = reference - Duration::days(recent_days);
        let historical_cutoff = reference - Duration::days(historical_days);

        let mut recent = Vec::new();
        let mut historical = Vec::new();
        for txn in self.transactions_of(customer_id) {
            let Some(ts) = txn.timestamp else { continue };
            if ts >= recent_cutoff {
                recent.push(txn.clone());
            } else if ts >= historical_cutoff {
                historical.push(txn.clone());
            }
        }
        recent.sort_by_key(|t| t.timestamp);
        historical.sort_by_key(|t| t.timestamp);

        WindowSlices { recent, historical }
    }

    fn timestamped_within(
        &self,
        customer_id: &str,
        days: i64,
        reference: NaiveDateTime,
    ) -> Vec<Transaction> {
        let cutoff = reference - Duration::days(days);
        self.transactions_of(customer_id)
            .iter()
            .filter(|t| t.timestamp.is_some_and(|ts| ts >= cutoff))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use detector_core::types::{PaymentMethod, TransactionType};
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn ts(year: i32, month: u32, day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(year, month, day)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    fn txn(customer: &str, id: &str, timestamp: Option<NaiveDateTime>) -> Transaction {
        Transaction {
            customer_id: customer.to_string(),
            transaction_id: id.to_string(),
            customer_name: "Test".to_string(),
            amount: Decimal::from(100),
            payment_method: PaymentMethod::Sepa,
            transaction_type: TransactionType::Investment,
            timestamp,
        }
    }

    #[test]
    fn test_transactions_group_by_customer() {
        let mut store = TransactionStore::new();
        store.add_transactions(vec![
            txn("A", "T1", Some(ts(2024, 3, 1))),
            txn("B", "T2", Some(ts(2024, 3, 2))),
            txn("A", "T3", Some(ts(2024, 3, 3))),
        ]);

        assert_eq!(store.customer_ids(), vec!["A".to_string(), "B".to_string()]);
        assert_eq!(store.transactions_of("A").len(), 2);
        assert_eq!(store.transactions_of("B").len(), 1);
        assert_eq!(store.all_transactions().len(), 3);
    }

    #[test]
    fn test_latest_timestamp_ignores_missing() {
        let mut store = TransactionStore::new();
        store.add_transactions(vec![
            txn("A", "T1", Some(ts(2024, 3, 1))),
            txn("A", "T2", None),
            txn("A", "T3", Some(ts(2024, 2, 1))),
        ]);
        assert_eq!(store.latest_timestamp(), Some(ts(2024, 3, 1)));
    }

    #[test]
    fn test_historical_data_heuristic() {
        let mut store = TransactionStore::new();
        store.add_transactions(vec![txn("A", "T1", Some(ts(2024, 1, 1)))]);

        assert!(store.is_historical_data(ts(2024, 7, 1), 90));
        assert!(!store.is_historical_data(ts(2024, 2, 1), 90));
    }

    #[test]
    fn test_window_slices_split_recent_and_historical() {
        let mut store = TransactionStore::new();
        store.add_transactions(vec![
            txn("A", "OLD", Some(ts(2023, 8, 1))),
            txn("A", "MID", Some(ts(2024, 2, 1))),
            txn("A", "NEW", Some(ts(2024, 5, 20))),
            txn("A", "UNDATED", None),
        ]);

        let slices = store.window_slices("A", 30, 365, ts(2024, 6, 1));
        assert_eq!(slices.recent.len(), 1);
        assert_eq!(slices.recent[0].transaction_id, "NEW");
        // OLD sits outside the historical window, UNDATED has no timestamp
        assert_eq!(slices.historical.len(), 1);
        assert_eq!(slices.historical[0].transaction_id, "MID");
    }

    #[test]
    fn test_overlapping_windows_split_fifty_fifty() {
        let mut store = TransactionStore::new();
        store.add_transactions(
            (0..6)
                .map(|i| {
                    txn(
                        "A",
                        &format!("T{i}"),
                        Some(ts(2024, 1, 1) + Duration::days(i * 30)),
                    )
                })
                .collect(),
        );

        let slices = store.window_slices("A", 365, 365, ts(2024, 7, 1));
        assert_eq!(slices.historical.len(), 3);
        assert_eq!(slices.recent.len(), 3);
        // Older half is historical
        assert_eq!(slices.historical[0].transaction_id, "T0");
        assert_eq!(slices.recent[0].transaction_id, "T3");
    }

    #[test]
    fn test_overlapping_windows_too_sparse_to_split_keep_recent_window() {
        let mut store = TransactionStore::new();
        // Only NEW falls inside the 365-day population used for splitting;
        // OLD sits between the 365-day and 400-day cutoffs
        store.add_transactions(vec![
            txn("A", "OLD", Some(ts(2023, 6, 1))),
            txn("A", "NEW", Some(ts(2024, 5, 20))),
        ]);

        let slices = store.window_slices("A", 400, 365, ts(2024, 6, 1));
        // With nothing to split, the recent slice falls back to the full
        // recent window and keeps both transactions
        assert_eq!(slices.recent.len(), 2);
        assert_eq!(slices.recent[0].transaction_id, "OLD");
        assert_eq!(slices.recent[1].transaction_id, "NEW");
        assert!(slices.historical.is_empty());
    }

    #[test]
    fn test_customer_info_upsert() {
        let mut store = TransactionStore::new();
        store.set_customer_info(CustomerInfo {
            customer_id: "A".to_string(),
            source_of_funds: Some(Decimal::from(50_000)),
            monthly_income: None,
        });
        store.set_customer_info(CustomerInfo {
            customer_id: "A".to_string(),
            source_of_funds: Some(Decimal::from(80_000)),
            monthly_income: Some(Decimal::from(3_000)),
        });

        let info = store.customer_info("A").unwrap();
        assert_eq!(info.source_of_funds, Some(Decimal::from(80_000)));
        assert_eq!(info.monthly_income, Some(Decimal::from(3_000)));
    }
}
