//! Transaction loops: one real-estate deal per loop, owned by an organization.
//!
//! [`TransactionService`] runs every operation through the tenant context and
//! the query guard before it touches a [`LoopStore`]. Two stores ship with the
//! crate:
//!
//! - [`InMemoryLoopStore`] for tests and embedded use
//! - [`PgLoopStore`] over the `transaction_loops` table
//!
//! Reads need an authenticated member of an organization; listing also needs
//! a non-client global role. Mutations additionally need the configured
//! subscription tier on both the user and the organization.

pub mod model;
pub mod postgres;
pub mod service;
pub mod store;

pub use model::{
    CreateLoopInput, LoopChanges, LoopList, LoopQuery, LoopSort, LoopSortField, LoopStats,
    LoopStatus, SortOrder, TransactionLoop, TransactionType,
};
pub use postgres::PgLoopStore;
pub use service::TransactionService;
pub use store::{InMemoryLoopStore, LoopFilter, LoopStore};
