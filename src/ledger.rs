//! Score ledger
//!
//! Persisted to the key-value store, tracks the running total and which
//! coins have already paid out. The key layout is shared with the result
//! page, so it stays flat: `score`, one `"true"` flag per claimed target id,
//! and a one-shot `repeated` flag.

use crate::error::Result;
use crate::persistence::{KeyValueStore, keys};
use crate::targets::TrackableTarget;

const FLAG_SET: &str = "true";

/// Result of awarding a catch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddOutcome {
    /// Total after the award
    pub total: u64,
    /// The target had already paid out, nothing was added
    pub already_claimed: bool,
}

/// Total score and claimed set on top of a key-value store
pub struct ScoreLedger<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> ScoreLedger<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Current total. Absent or unreadable totals count as 0.
    pub fn score(&self) -> u64 {
        match self.store.get(keys::SCORE) {
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                log::warn!("Unreadable score `{}`, treating as 0", raw);
                0
            }),
            None => 0,
        }
    }

    /// Whether `target_id` has already paid out
    pub fn is_claimed(&self, target_id: &str) -> bool {
        self.store.get(target_id).is_some()
    }

    /// The subset of `targets` already claimed, in table order
    pub fn claimed<'a>(&self, targets: &'a [TrackableTarget]) -> Vec<&'a str> {
        targets
            .iter()
            .filter(|t| self.is_claimed(&t.id))
            .map(|t| t.id.as_str())
            .collect()
    }

    /// Award `amount` for catching `target_id`, at most once per id ever.
    ///
    /// A repeat catch leaves the total untouched and raises the `repeated`
    /// flag for the result view. A new award is only claimed once its total
    /// is stored; on a storage error nothing is claimed and the stored total
    /// is left as it was.
    pub fn add_points(&mut self, target_id: &str, amount: u64) -> Result<AddOutcome> {
        let previous = self.score();

        if self.is_claimed(target_id) {
            if let Err(e) = self.store.set(keys::REPEATED, FLAG_SET) {
                log::warn!("Failed to flag repeated catch: {}", e);
            }
            log::info!("Coin {} already hunted, score stays {}", target_id, previous);
            return Ok(AddOutcome {
                total: previous,
                already_claimed: true,
            });
        }

        let total = previous.saturating_add(amount);
        self.store.set(keys::SCORE, &total.to_string())?;
        if let Err(e) = self.store.set(target_id, FLAG_SET) {
            // Unclaimed points must not stay in the total
            if let Err(undo) = self.store.set(keys::SCORE, &previous.to_string()) {
                log::error!("Failed to roll back score to {}: {}", previous, undo);
            }
            return Err(e);
        }
        // A stale flag from an earlier repeat must not leak into this result
        self.clear_repeated();

        log::info!("Caught {} for {} points, total {}", target_id, amount, total);
        Ok(AddOutcome {
            total,
            already_claimed: false,
        })
    }

    /// Read and clear the `repeated` flag
    pub fn take_repeated(&mut self) -> bool {
        let repeated = self.store.get(keys::REPEATED).is_some();
        if repeated {
            self.clear_repeated();
        }
        repeated
    }

    fn clear_repeated(&mut self) {
        if let Err(e) = self.store.remove(keys::REPEATED) {
            log::warn!("Failed to clear repeated flag: {}", e);
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }
}
