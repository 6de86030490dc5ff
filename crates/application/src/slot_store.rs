//! Slot allocator on top of the panel.
//!
//! Slot records are named `<prefix><index>` and kept dense: indices always
//! form `0..count`. Removal uses tail-swap recompaction: the last slot's
//! contents move into the freed index and the last record is deleted.
//! Every mutating operation holds the store's write lock for its whole
//! list-then-mutate sequence.

use std::fmt;

use qrslot_domain::{Credential, NewRecord, OwnerId, Record, Slot, SlotConfig, SlotNaming};
use thiserror::Error;
use tokio::sync::Mutex;

use crate::ports::{PanelError, PanelStore, PanelToken};

/// Slot store failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SlotError {
    /// The owner has no slot.
    #[error("no slot is held by owner {0}")]
    NotFound(OwnerId),

    /// The pool is full and the owner has no slot to update.
    #[error("slot pool is full ({count}/{capacity})")]
    CapacityExceeded {
        /// Slots currently in use.
        count: usize,
        /// Configured maximum.
        capacity: usize,
    },

    /// A panel call failed before anything was changed.
    #[error(transparent)]
    Panel(#[from] PanelError),
}

/// What [`SlotStore::upsert`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertAction {
    /// A new slot was appended.
    Created,
    /// The owner's existing slot was overwritten.
    Updated,
}

/// Result of a successful upsert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsertOutcome {
    /// Created or updated.
    pub action: UpsertAction,
    /// Record name of the slot.
    pub name: String,
}

/// Result of a successful removal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoveOutcome {
    /// Name of the slot that was freed.
    pub removed: String,
    /// `(from, to)` record names when the tail slot was moved.
    pub relocated: Option<(String, String)>,
    /// Moved tail record that could not be deleted, with the delete
    /// failure. The pool holds that credential twice until it is removed.
    pub leftover: Option<(String, PanelError)>,
    /// Slots left afterwards, `None` if the recount failed.
    pub remaining: Option<usize>,
}

impl fmt::Display for RemoveOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "removed {}", self.removed)?;
        if let Some((from, to)) = &self.relocated {
            write!(f, ", moved {from} to {to}")?;
        }
        if let Some((name, error)) = &self.leftover {
            write!(f, "; could not delete {name}: {error}")?;
        }
        match self.remaining {
            Some(count) => write!(f, "; {count} slot(s) remaining"),
            None => f.write_str("; remaining slot count unavailable"),
        }
    }
}

/// Dense slot pool kept in the panel.
pub struct SlotStore<P> {
    panel: P,
    naming: SlotNaming,
    capacity: usize,
    write_lock: Mutex<()>,
}

impl<P: PanelStore> SlotStore<P> {
    /// Creates a store over `panel`.
    pub fn new(panel: P, config: &SlotConfig) -> Self {
        Self {
            panel,
            naming: SlotNaming::new(&config.prefix, &config.owner_tag_prefix),
            capacity: config.capacity,
            write_lock: Mutex::new(()),
        }
    }

    /// The underlying panel transport.
    pub const fn panel(&self) -> &P {
        &self.panel
    }

    /// Configured maximum number of slots.
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slot naming rules.
    pub const fn naming(&self) -> &SlotNaming {
        &self.naming
    }

    /// Lists slot records ordered by index; unparsable names sort last.
    ///
    /// # Errors
    /// Propagates the panel failure.
    pub async fn list_owned(&self, token: &PanelToken) -> Result<Vec<Slot>, SlotError> {
        let records = self
            .panel
            .list_records(token, Some(self.naming.prefix()))
            .await?;
        let mut slots: Vec<Slot> = records
            .into_iter()
            .filter(|r| self.naming.is_slot_name(&r.name))
            .map(|r| Slot::from_record(r, &self.naming))
            .collect();
        slots.sort_by_key(Slot::sort_key);
        Ok(slots)
    }

    /// The slot held by `owner`, if any.
    ///
    /// # Errors
    /// Propagates the panel failure.
    pub async fn find(&self, token: &PanelToken, owner: &OwnerId) -> Result<Option<Slot>, SlotError> {
        let tag = self.naming.owner_tag(owner);
        Ok(self
            .list_owned(token)
            .await?
            .into_iter()
            .find(|s| s.is_tagged(&tag)))
    }

    /// Number of slots in use.
    ///
    /// # Errors
    /// Propagates the panel failure.
    pub async fn occupancy(&self, token: &PanelToken) -> Result<usize, SlotError> {
        Ok(self.list_owned(token).await?.len())
    }

    /// Checks that an upsert for `owner` would not exceed capacity.
    ///
    /// # Errors
    /// [`SlotError::CapacityExceeded`] when the pool is full and `owner`
    /// holds no slot, or the panel failure.
    pub async fn ensure_room_for(&self, token: &PanelToken, owner: &OwnerId) -> Result<(), SlotError> {
        let slots = self.list_owned(token).await?;
        let tag = self.naming.owner_tag(owner);
        if slots.iter().any(|s| s.is_tagged(&tag)) || slots.len() < self.capacity {
            return Ok(());
        }
        Err(SlotError::CapacityExceeded {
            count: slots.len(),
            capacity: self.capacity,
        })
    }

    /// Stores `credential` for `owner`.
    ///
    /// Overwrites the owner's slot in place if it has one, otherwise
    /// appends a slot at index `count`. Records under the prefix whose
    /// suffix is not an index still count, so `[0, 1, x]` appends `3`.
    ///
    /// # Errors
    /// [`SlotError::CapacityExceeded`] without any panel mutation when the
    /// pool is full, or the panel failure.
    pub async fn upsert(
        &self,
        token: &PanelToken,
        owner: &OwnerId,
        credential: &Credential,
    ) -> Result<UpsertOutcome, SlotError> {
        let _guard = self.write_lock.lock().await;
        let slots = self.list_owned(token).await?;
        let count = slots.len();
        let tag = self.naming.owner_tag(owner);
        let value = credential.to_cookie_header();

        if let Some(slot) = slots.into_iter().find(|s| s.is_tagged(&tag)) {
            let record = Record {
                value,
                ..slot.record
            };
            self.panel.update_record(token, &record).await.inspect_err(|e| {
                tracing::error!(slot = %record.name, error = %e, "slot update failed");
            })?;
            tracing::info!(slot = %record.name, "credential slot updated");
            return Ok(UpsertOutcome {
                action: UpsertAction::Updated,
                name: record.name,
            });
        }

        if count >= self.capacity {
            tracing::warn!(count, capacity = self.capacity, "slot pool is full");
            return Err(SlotError::CapacityExceeded {
                count,
                capacity: self.capacity,
            });
        }

        let record = NewRecord {
            name: self.naming.name_for(count),
            value,
            remarks: tag,
        };
        self.panel
            .create_records(token, std::slice::from_ref(&record))
            .await
            .inspect_err(|e| tracing::error!(slot = %record.name, error = %e, "slot create failed"))?;
        tracing::info!(slot = %record.name, "credential slot created");
        Ok(UpsertOutcome {
            action: UpsertAction::Created,
            name: record.name,
        })
    }

    /// Frees the slot held by `owner` and re-packs the pool.
    ///
    /// If the slot is the last one it is deleted. Otherwise the last slot's
    /// value and remarks are written into it and the last record is
    /// deleted. A failed update leaves the pool untouched. Once the update
    /// has landed the owner's credential is gone, so a failed tail delete
    /// is reported in [`RemoveOutcome::leftover`].
    ///
    /// # Errors
    /// - [`SlotError::NotFound`] when the owner has no slot
    /// - [`SlotError::Panel`] when listing, the swap update or a plain
    ///   delete fails; nothing was changed
    pub async fn remove(&self, token: &PanelToken, owner: &OwnerId) -> Result<RemoveOutcome, SlotError> {
        let _guard = self.write_lock.lock().await;
        let mut slots = self.list_owned(token).await?;
        let tag = self.naming.owner_tag(owner);
        let position = slots
            .iter()
            .position(|s| s.is_tagged(&tag))
            .ok_or_else(|| SlotError::NotFound(owner.clone()))?;
        let removed = slots[position].record.name.clone();

        let Some(tail) = slots.pop() else {
            return Err(SlotError::NotFound(owner.clone()));
        };
        let mut leftover = None;
        let relocated = if position == slots.len() {
            self.panel
                .delete_records(token, std::slice::from_ref(&tail.record.id))
                .await
                .inspect_err(|e| tracing::error!(slot = %tail.record.name, error = %e, "slot delete failed"))?;
            None
        } else {
            let target = &slots[position].record;
            let moved = Record {
                id: target.id.clone(),
                name: target.name.clone(),
                value: tail.record.value.clone(),
                remarks: tail.record.remarks.clone(),
            };
            self.panel.update_record(token, &moved).await.inspect_err(|e| {
                tracing::error!(slot = %moved.name, error = %e, "swap update failed, nothing removed");
            })?;
            if let Err(source) = self
                .panel
                .delete_records(token, std::slice::from_ref(&tail.record.id))
                .await
            {
                tracing::warn!(
                    duplicate = %tail.record.name,
                    error = %source,
                    "tail slot moved but not deleted"
                );
                leftover = Some((tail.record.name.clone(), source));
            }
            Some((tail.record.name.clone(), moved.name))
        };

        let remaining = match self.list_owned(token).await {
            Ok(slots) => Some(slots.len()),
            Err(e) => {
                tracing::warn!(error = %e, "slot recount failed after removal");
                None
            }
        };
        tracing::info!(slot = %removed, ?remaining, "credential slot removed");
        Ok(RemoveOutcome {
            removed,
            relocated,
            leftover,
            remaining,
        })
    }
}
