//! Storage collaborator for transaction loops.
//!
//! Every call carries a [`LoopFilter`] built around a [`TenantScope`]; stores
//! never see an unscoped query.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::cmp::Ordering;
use uuid::Uuid;

use super::model::{
    LoopChanges, LoopSort, LoopSortField, LoopStatus, SortOrder, TransactionLoop, TransactionType,
};
use crate::error::{Result, StriveError};
use crate::tenant::TenantScope;

// ═══════════════════════════════════════════════════════════════════════════════
// Filter
// ═══════════════════════════════════════════════════════════════════════════════

/// A tenant scope plus optional narrowing conditions.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopFilter {
    pub scope: TenantScope,
    pub id: Option<Uuid>,
    pub status: Option<LoopStatus>,
    pub transaction_type: Option<TransactionType>,
    /// Case-insensitive substring of the property address.
    pub address_contains: Option<String>,
    /// Half-open `[from, until)` window on the expected closing date.
    pub expected_closing: Option<(DateTime<Utc>, DateTime<Utc>)>,
}

impl LoopFilter {
    pub fn new(scope: TenantScope) -> Self {
        Self {
            scope,
            id: None,
            status: None,
            transaction_type: None,
            address_contains: None,
            expected_closing: None,
        }
    }

    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_status(mut self, status: LoopStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_transaction_type(mut self, kind: TransactionType) -> Self {
        self.transaction_type = Some(kind);
        self
    }

    pub fn with_address_containing(mut self, term: impl Into<String>) -> Self {
        self.address_contains = Some(term.into());
        self
    }

    pub fn closing_between(mut self, from: DateTime<Utc>, until: DateTime<Utc>) -> Self {
        self.expected_closing = Some((from, until));
        self
    }

    pub fn matches(&self, record: &TransactionLoop) -> bool {
        if !self.scope.admits(record) {
            return false;
        }
        if self.id.is_some_and(|id| id != record.id) {
            return false;
        }
        if self.status.is_some_and(|status| status != record.status) {
            return false;
        }
        if self
            .transaction_type
            .is_some_and(|kind| kind != record.transaction_type)
        {
            return false;
        }
        if let Some(term) = &self.address_contains {
            if !record
                .property_address
                .to_lowercase()
                .contains(&term.to_lowercase())
            {
                return false;
            }
        }
        if let Some((from, until)) = self.expected_closing {
            match record.expected_closing {
                Some(date) if date >= from && date < until => {}
                _ => return false,
            }
        }
        true
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Store trait
// ═══════════════════════════════════════════════════════════════════════════════

/// Persistence for transaction loops.
///
/// Writes take the scope as well as the id, so a store can refuse to touch a
/// record outside the caller's organization.
#[async_trait]
pub trait LoopStore: Send + Sync {
    async fn find_first(&self, filter: &LoopFilter) -> Result<Option<TransactionLoop>>;

    async fn find_many(
        &self,
        filter: &LoopFilter,
        sort: LoopSort,
        take: u64,
        skip: u64,
    ) -> Result<Vec<TransactionLoop>>;

    async fn count(&self, filter: &LoopFilter) -> Result<u64>;

    /// `None` when nothing matches.
    async fn sum_listing_price(&self, filter: &LoopFilter) -> Result<Option<f64>>;

    async fn create(&self, record: TransactionLoop) -> Result<TransactionLoop>;

    async fn update(
        &self,
        scope: &TenantScope,
        id: Uuid,
        changes: &LoopChanges,
    ) -> Result<TransactionLoop>;

    async fn delete(&self, scope: &TenantScope, id: Uuid) -> Result<()>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// In-memory store
// ═══════════════════════════════════════════════════════════════════════════════

/// A [`LoopStore`] over a concurrent map.
#[derive(Debug, Default)]
pub struct InMemoryLoopStore {
    loops: DashMap<Uuid, TransactionLoop>,
}

impl InMemoryLoopStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record as-is, bypassing every check.
    pub fn seed(&self, record: TransactionLoop) {
        self.loops.insert(record.id, record);
    }

    pub fn len(&self) -> usize {
        self.loops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loops.is_empty()
    }

    fn matching(&self, filter: &LoopFilter) -> Vec<TransactionLoop> {
        self.loops
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect()
    }
}

fn compare(a: &TransactionLoop, b: &TransactionLoop, field: LoopSortField) -> Ordering {
    match field {
        LoopSortField::CreatedAt => a.created_at.cmp(&b.created_at),
        LoopSortField::ExpectedClosing => a.expected_closing.cmp(&b.expected_closing),
        LoopSortField::ListingPrice => a.listing_price.total_cmp(&b.listing_price),
        LoopSortField::PropertyAddress => a.property_address.cmp(&b.property_address),
    }
}

#[async_trait]
impl LoopStore for InMemoryLoopStore {
    async fn find_first(&self, filter: &LoopFilter) -> Result<Option<TransactionLoop>> {
        Ok(self
            .loops
            .iter()
            .find(|entry| filter.matches(entry.value()))
            .map(|entry| entry.value().clone()))
    }

    async fn find_many(
        &self,
        filter: &LoopFilter,
        sort: LoopSort,
        take: u64,
        skip: u64,
    ) -> Result<Vec<TransactionLoop>> {
        let mut rows = self.matching(filter);
        rows.sort_by(|a, b| {
            let ordering = compare(a, b, sort.field);
            match sort.order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        });

        let skip = usize::try_from(skip).unwrap_or(usize::MAX);
        let take = usize::try_from(take).unwrap_or(usize::MAX);
        Ok(rows.into_iter().skip(skip).take(take).collect())
    }

    async fn count(&self, filter: &LoopFilter) -> Result<u64> {
        Ok(self
            .loops
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .count() as u64)
    }

    async fn sum_listing_price(&self, filter: &LoopFilter) -> Result<Option<f64>> {
        let prices: Vec<f64> = self
            .matching(filter)
            .iter()
            .map(|record| record.listing_price)
            .collect();
        if prices.is_empty() {
            return Ok(None);
        }
        Ok(Some(prices.iter().sum()))
    }

    async fn create(&self, record: TransactionLoop) -> Result<TransactionLoop> {
        self.loops.insert(record.id, record.clone());
        Ok(record)
    }

    async fn update(
        &self,
        scope: &TenantScope,
        id: Uuid,
        changes: &LoopChanges,
    ) -> Result<TransactionLoop> {
        match self.loops.get_mut(&id) {
            Some(mut entry) if scope.admits_write(entry.value()) => {
                changes.apply(entry.value_mut());
                Ok(entry.value().clone())
            }
            _ => Err(StriveError::not_found("Loop")),
        }
    }

    async fn delete(&self, scope: &TenantScope, id: Uuid) -> Result<()> {
        match self.loops.remove_if(&id, |_, record| scope.admits_write(record)) {
            Some(_) => Ok(()),
            None => Err(StriveError::not_found("Loop")),
        }
    }
}
