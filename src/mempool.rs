//! Pending transaction pool

use crate::transaction::Transaction;

/// Transactions awaiting the next seal, kept in arrival order.
#[derive(Debug, Clone, Default)]
pub struct Mempool {
    transactions: Vec<Transaction>,
}

impl Mempool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_transaction(&mut self, tx: Transaction) {
        self.transactions.push(tx);
    }

    pub fn get_all_transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Hands over the whole pool by value and leaves it empty.
    pub fn drain(&mut self) -> Vec<Transaction> {
        std::mem::take(&mut self.transactions)
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_preserves_arrival_order_and_empties() {
        let mut pool = Mempool::new();
        pool.add_transaction(Transaction::new("a", "r1", "1"));
        pool.add_transaction(Transaction::new("b", "r2", "2"));
        pool.add_transaction(Transaction::new("a", "r3", "3"));
        assert_eq!(pool.len(), 3);

        let drained = pool.drain();
        let ids: Vec<_> = drained.iter().map(|t| t.transaction_id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
        assert!(pool.is_empty());
    }

    #[test]
    fn test_duplicate_ids_are_kept() {
        let mut pool = Mempool::new();
        pool.add_transaction(Transaction::new("a", "r", "same"));
        pool.add_transaction(Transaction::new("a", "r", "same"));
        assert_eq!(pool.get_all_transactions().len(), 2);
    }
}
