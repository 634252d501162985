use std::collections::HashSet;
use std::time::Duration;

use chrono::{DateTime, Utc};

use super::OutboxMessage;
use crate::ledger::{LedgerStore, StoreError, Versioned, WriteBatch};

/// Outbox queries and state changes on any [`LedgerStore`].
pub trait OutboxStoreExt: LedgerStore + Sized {
    /// Claim up to `limit` claimable messages in sequence order.
    ///
    /// Each channel is relayed strictly in order: a channel whose oldest
    /// undelivered message is dead-lettered, leased by another worker, or
    /// lost to a concurrent claim (version conflict) yields nothing further
    /// in this call.
    fn claim_outbox(
        &self,
        worker_id: &str,
        limit: usize,
        lease: Duration,
        now: DateTime<Utc>,
    ) -> Result<Vec<OutboxMessage>, StoreError> {
        let mut candidates = self.find_records::<OutboxMessage>(&|m| !m.is_published())?;
        candidates.sort_by_key(|m| m.data.sequence);

        let mut blocked: HashSet<String> = HashSet::new();
        let mut claimed = Vec::new();
        for Versioned { mut data, version } in candidates {
            if claimed.len() >= limit {
                break;
            }
            if blocked.contains(&data.channel) {
                continue;
            }
            if !data.is_claimable(now) {
                blocked.insert(data.channel);
                continue;
            }
            data.claim(worker_id, lease, now);
            let mut batch = WriteBatch::new();
            batch.update(&data, version)?;
            match self.commit(batch) {
                Ok(()) => claimed.push(data),
                Err(StoreError::Conflict { .. }) => {
                    blocked.insert(data.channel);
                }
                Err(err) => return Err(err),
            }
        }
        Ok(claimed)
    }

    fn complete_outbox(&self, id: &str, now: DateTime<Utc>) -> Result<(), StoreError> {
        modify(self, id, |m| m.complete(now))
    }

    fn release_outbox(&self, id: &str, error: &str) -> Result<(), StoreError> {
        modify(self, id, |m| m.release(error))
    }

    fn fail_outbox(&self, id: &str, error: &str) -> Result<(), StoreError> {
        modify(self, id, |m| m.fail(error))
    }

    /// Hand a claimed but unsent message back without counting the attempt.
    fn unclaim_outbox(&self, id: &str) -> Result<(), StoreError> {
        modify(self, id, OutboxMessage::unclaim)
    }

    /// Put a dead-lettered message back in the queue.
    fn redrive_outbox(&self, id: &str) -> Result<(), StoreError> {
        modify(self, id, OutboxMessage::redrive)
    }

    fn outbox_messages(&self) -> Result<Vec<OutboxMessage>, StoreError> {
        let mut all: Vec<_> = self
            .find_records::<OutboxMessage>(&|_| true)?
            .into_iter()
            .map(|v| v.data)
            .collect();
        all.sort_by_key(|m| m.sequence);
        Ok(all)
    }

    /// Messages not yet published or dead-lettered.
    fn undelivered_outbox(&self) -> Result<Vec<OutboxMessage>, StoreError> {
        Ok(self
            .outbox_messages()?
            .into_iter()
            .filter(|m| m.is_pending() || m.is_in_flight())
            .collect())
    }

    fn dead_letters(&self) -> Result<Vec<OutboxMessage>, StoreError> {
        Ok(self
            .outbox_messages()?
            .into_iter()
            .filter(OutboxMessage::is_failed)
            .collect())
    }

    /// Delete messages published at or before `older_than`, in one commit.
    /// Returns how many were removed.
    fn purge_published(&self, older_than: DateTime<Utc>) -> Result<usize, StoreError> {
        let expired = self.find_records::<OutboxMessage>(&|m| {
            m.is_published() && m.published_at.map_or(false, |at| at <= older_than)
        })?;
        if expired.is_empty() {
            return Ok(0);
        }

        let mut batch = WriteBatch::new();
        for Versioned { data, version } in &expired {
            batch.delete::<OutboxMessage>(&data.id, *version);
        }
        self.commit(batch)?;
        Ok(expired.len())
    }
}

impl<S: LedgerStore> OutboxStoreExt for S {}

fn modify<S: LedgerStore>(
    store: &S,
    id: &str,
    change: impl FnOnce(&mut OutboxMessage),
) -> Result<(), StoreError> {
    let Versioned { mut data, version } =
        store
            .get_record::<OutboxMessage>(id)?
            .ok_or_else(|| StoreError::NotFound {
                collection: "outbox".into(),
                id: id.to_string(),
            })?;
    change(&mut data);
    let mut batch = WriteBatch::new();
    batch.update(&data, version)?;
    store.commit(batch)
}
