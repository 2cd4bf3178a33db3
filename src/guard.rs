//! Transaction Guard
//!
//! Owns the last applied transaction number and the cached snapshot, and
//! decides which change events trigger a rebuild.
//!
//! An event with transaction `T` is accepted only when `T` is above every
//! transaction already applied or currently rebuilding. The decision and the
//! claim on `T` happen under one short lock; the rebuild itself runs outside
//! it, so later events are decided while an earlier rebuild is still running.
//! A failed rebuild releases its claim and leaves state untouched.

use crate::error::ApiError;
use crate::event::ChangeEvent;
use crate::pipeline::{Published, SnapshotSource};
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Value of `last_transaction` before any event has been applied.
pub const NO_TRANSACTION: i64 = -1;

/// What the guard did with a change event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    /// Rebuilt and cached; `previous` was the last applied transaction.
    Applied { transaction: i64, previous: i64 },
    /// Duplicate or out-of-order delivery; nothing happened.
    Stale { transaction: i64, last_transaction: i64 },
    /// Rebuilt, but a newer transaction was applied first; the result was dropped.
    Superseded { transaction: i64, last_transaction: i64 },
    /// Would have been applied, but the caller failed the credential check.
    Unauthorized { transaction: i64 },
    /// Not a capability update.
    Ignored,
}

#[derive(Debug)]
struct GuardState {
    last_transaction: i64,
    in_flight: BTreeSet<i64>,
    cached: Option<Arc<Published>>,
}

impl GuardState {
    fn high_water(&self) -> i64 {
        self.in_flight
            .last()
            .copied()
            .map_or(self.last_transaction, |t| t.max(self.last_transaction))
    }
}

/// Single owner of transaction state and the cached snapshot
pub struct TransactionGuard {
    source: Arc<dyn SnapshotSource>,
    state: Mutex<GuardState>,
    cold_fill: tokio::sync::Mutex<()>,
}

impl TransactionGuard {
    pub fn new(source: Arc<dyn SnapshotSource>) -> Self {
        Self {
            source,
            state: Mutex::new(GuardState {
                last_transaction: NO_TRANSACTION,
                in_flight: BTreeSet::new(),
                cached: None,
            }),
            cold_fill: tokio::sync::Mutex::new(()),
        }
    }

    pub fn last_transaction(&self) -> i64 {
        self.state.lock().last_transaction
    }

    pub fn cached(&self) -> Option<Arc<Published>> {
        self.state.lock().cached.clone()
    }

    /// Current snapshot, built on first use.
    ///
    /// A cold fill never advances `last_transaction`. If an event rebuild lands
    /// while the fill runs, the event's snapshot wins.
    pub async fn current(&self) -> Result<Arc<Published>, ApiError> {
        if let Some(cached) = self.cached() {
            return Ok(cached);
        }

        let _fill = self.cold_fill.lock().await;
        if let Some(cached) = self.cached() {
            return Ok(cached);
        }

        debug!("No cached snapshot, building one");
        let published = Arc::new(self.source.rebuild(None).await?);
        let mut state = self.state.lock();
        Ok(state.cached.get_or_insert(published).clone())
    }

    /// Apply a change event from a trusted caller.
    pub async fn apply(&self, event: &ChangeEvent) -> Result<EventOutcome, ApiError> {
        self.apply_authorized(event, true).await
    }

    /// Apply a change event whose credentials were checked as `authorized`.
    ///
    /// Credentials only matter for an event that would be accepted: stale and
    /// duplicate deliveries are ignored whatever they carry.
    pub async fn apply_authorized(
        &self,
        event: &ChangeEvent,
        authorized: bool,
    ) -> Result<EventOutcome, ApiError> {
        match event.actionable_transaction() {
            Some(transaction) => self.run_transaction(transaction, authorized).await,
            None => {
                debug!(
                    event_type = event.event_type.as_deref().unwrap_or("-"),
                    "Ignoring event that is not a capability update"
                );
                Ok(EventOutcome::Ignored)
            }
        }
    }

    /// Rebuild for `transaction` unless it is not newer than what is applied
    /// or already rebuilding.
    pub async fn apply_transaction(&self, transaction: i64) -> Result<EventOutcome, ApiError> {
        self.run_transaction(transaction, true).await
    }

    async fn run_transaction(
        &self,
        transaction: i64,
        authorized: bool,
    ) -> Result<EventOutcome, ApiError> {
        let previous = {
            let mut state = self.state.lock();
            let high_water = state.high_water();
            if transaction <= high_water {
                debug!(transaction, high_water, "Ignoring stale or duplicate transaction");
                return Ok(EventOutcome::Stale {
                    transaction,
                    last_transaction: state.last_transaction,
                });
            }
            if !authorized {
                return Ok(EventOutcome::Unauthorized { transaction });
            }
            state.in_flight.insert(transaction);
            state.last_transaction
        };

        let result = self.source.rebuild(Some(transaction)).await;

        let mut state = self.state.lock();
        state.in_flight.remove(&transaction);
        match result {
            Ok(published) if transaction > state.last_transaction => {
                state.last_transaction = transaction;
                state.cached = Some(Arc::new(published));
                info!(
                    "bcMaps.json updated! #{} (last was #{})",
                    transaction, previous
                );
                Ok(EventOutcome::Applied {
                    transaction,
                    previous,
                })
            }
            Ok(_) => {
                info!(
                    transaction,
                    last_transaction = state.last_transaction,
                    "Discarding rebuild superseded by a newer transaction"
                );
                Ok(EventOutcome::Superseded {
                    transaction,
                    last_transaction: state.last_transaction,
                })
            }
            Err(e) => {
                error!(transaction, error = %e, "Rebuild failed, transaction not applied");
                Err(e)
            }
        }
    }
}
