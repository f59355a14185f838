use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use super::{ensure_writable, non_empty_matches, OfferStore, StoreError};
use crate::models::Offer;

#[derive(Debug)]
struct StoredOffer {
    row_id: i64,
    offer: Offer,
    touched: bool,
}

#[derive(Debug, Default)]
struct MemoryState {
    rows: HashMap<String, StoredOffer>,
    next_row_id: i64,
}

impl MemoryState {
    /// Stored offers in insertion order.
    fn ordered(&self) -> Vec<&StoredOffer> {
        let mut rows: Vec<&StoredOffer> = self.rows.values().collect();
        rows.sort_by_key(|r| r.row_id);
        rows
    }
}

/// In-process offer store with the same semantics as the SQL backends.
///
/// Nothing survives the process. Useful for tests and for running the
/// server without a database.
#[derive(Debug, Default)]
pub struct MemoryOfferStore {
    state: Mutex<MemoryState>,
    closed: AtomicBool,
    list_limit: u32,
}

impl MemoryOfferStore {
    pub fn new(list_limit: u32) -> Self {
        Self {
            list_limit,
            ..Self::default()
        }
    }

    fn state(&self) -> Result<MutexGuard<'_, MemoryState>, StoreError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        Ok(self.state.lock().unwrap_or_else(|e| e.into_inner()))
    }

    #[cfg(test)]
    pub(crate) fn is_touched(&self, id: &str) -> Option<bool> {
        self.state().ok()?.rows.get(id).map(|r| r.touched)
    }
}

#[async_trait]
impl OfferStore for MemoryOfferStore {
    async fn list(&self) -> Result<Vec<Offer>, StoreError> {
        let state = self.state()?;
        Ok(state
            .ordered()
            .into_iter()
            .take(self.list_limit as usize)
            .map(|r| r.offer.clone())
            .collect())
    }

    async fn get(&self, id: &str) -> Result<Offer, StoreError> {
        let state = self.state()?;
        state
            .rows
            .get(id)
            .map(|r| r.offer.clone())
            .ok_or_else(|| StoreError::NotFound(format!("offer '{id}'")))
    }

    async fn search(&self, text: &str) -> Result<Vec<Offer>, StoreError> {
        let matches = {
            let state = self.state()?;
            state
                .ordered()
                .into_iter()
                .filter(|r| r.offer.description_contains(text))
                .map(|r| r.offer.clone())
                .collect()
        };
        non_empty_matches(text, matches)
    }

    async fn upsert(&self, offer: &Offer) -> Result<i64, StoreError> {
        ensure_writable(offer)?;

        let mut state = self.state()?;
        if let Some(existing) = state.rows.get_mut(&offer.id) {
            existing.offer = offer.clone();
            existing.touched = true;
            return Ok(existing.row_id);
        }

        state.next_row_id += 1;
        let row_id = state.next_row_id;
        state.rows.insert(
            offer.id.clone(),
            StoredOffer {
                row_id,
                offer: offer.clone(),
                touched: true,
            },
        );
        Ok(row_id)
    }

    async fn begin_pass(&self) -> Result<(), StoreError> {
        let mut state = self.state()?;
        for row in state.rows.values_mut() {
            row.touched = false;
        }
        Ok(())
    }

    async fn sweep_untouched(&self) -> Result<u64, StoreError> {
        let mut state = self.state()?;
        let before = state.rows.len();
        state.rows.retain(|_, r| r.touched);
        Ok((before - state.rows.len()) as u64)
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}
