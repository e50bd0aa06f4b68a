//! Integration tests for guarded transaction-loop operations.
//!
//! Every test runs the real service against the in-memory store. A recording
//! wrapper counts store calls so tests can assert that denied requests never
//! reach storage.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use uuid::Uuid;

use strive_core::audit::{AuditAction, AuditTrail, MemoryAuditSink};
use strive_core::config::AuditPolicy;
use strive_core::error::{ErrorCode, Result};
use strive_core::rbac::{AccessPolicy, CurrentUser, GlobalRole, OrganizationRole, SubscriptionTier};
use strive_core::tenant::{QueryGuard, StaticAuthProvider, TenantScope};
use strive_core::transactions::{
    CreateLoopInput, InMemoryLoopStore, LoopChanges, LoopFilter, LoopQuery, LoopSort,
    LoopSortField, LoopStatus, LoopStore, SortOrder, TransactionLoop, TransactionService,
    TransactionType,
};

// ============================================================================
// Test Utilities
// ============================================================================

/// Forwards to an inner store and counts every call.
#[derive(Default)]
struct RecordingStore {
    inner: InMemoryLoopStore,
    calls: AtomicUsize,
}

impl RecordingStore {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl LoopStore for RecordingStore {
    async fn find_first(&self, filter: &LoopFilter) -> Result<Option<TransactionLoop>> {
        self.hit();
        self.inner.find_first(filter).await
    }

    async fn find_many(
        &self,
        filter: &LoopFilter,
        sort: LoopSort,
        take: u64,
        skip: u64,
    ) -> Result<Vec<TransactionLoop>> {
        self.hit();
        self.inner.find_many(filter, sort, take, skip).await
    }

    async fn count(&self, filter: &LoopFilter) -> Result<u64> {
        self.hit();
        self.inner.count(filter).await
    }

    async fn sum_listing_price(&self, filter: &LoopFilter) -> Result<Option<f64>> {
        self.hit();
        self.inner.sum_listing_price(filter).await
    }

    async fn create(&self, record: TransactionLoop) -> Result<TransactionLoop> {
        self.hit();
        self.inner.create(record).await
    }

    async fn update(
        &self,
        scope: &TenantScope,
        id: Uuid,
        changes: &LoopChanges,
    ) -> Result<TransactionLoop> {
        self.hit();
        self.inner.update(scope, id, changes).await
    }

    async fn delete(&self, scope: &TenantScope, id: Uuid) -> Result<()> {
        self.hit();
        self.inner.delete(scope, id).await
    }
}

struct Harness {
    store: Arc<RecordingStore>,
    audit: Arc<MemoryAuditSink>,
    service: TransactionService,
}

fn harness_with(policy: AuditPolicy, audit: MemoryAuditSink) -> Harness {
    let store = Arc::new(RecordingStore::default());
    let audit = Arc::new(audit);
    let service = TransactionService::new(
        store.clone(),
        QueryGuard::new(AccessPolicy::standard()),
        AuditTrail::new(audit.clone(), policy),
    );
    Harness {
        store,
        audit,
        service,
    }
}

fn harness() -> Harness {
    harness_with(AuditPolicy::BestEffort, MemoryAuditSink::new())
}

fn user(
    id: &str,
    role: GlobalRole,
    org: &str,
    org_role: OrganizationRole,
    tier: SubscriptionTier,
) -> StaticAuthProvider {
    StaticAuthProvider::new(
        CurrentUser::new(id, format!("{}@example.com", id), role, tier)
            .with_membership(org, org_role, tier),
    )
}

fn member(id: &str, org: &str) -> StaticAuthProvider {
    user(id, GlobalRole::User, org, OrganizationRole::Member, SubscriptionTier::Growth)
}

fn new_loop(address: &str, price: f64) -> CreateLoopInput {
    CreateLoopInput {
        property_address: address.to_string(),
        transaction_type: TransactionType::PurchaseAgreement,
        listing_price: price,
        expected_closing: None,
    }
}

// ============================================================================
// End-to-end scenarios
// ============================================================================

#[tokio::test]
async fn test_creator_updates_progress() {
    let h = harness();
    let alice = member("alice", "org-1");

    let created = h
        .service
        .create_loop(&alice, new_loop("123 Main Street", 450_000.0))
        .await
        .unwrap();
    assert_eq!(created.status, LoopStatus::Draft);
    assert_eq!(created.progress, 0);

    let progress = h
        .service
        .update_loop_progress(&alice, created.id, 65)
        .await
        .unwrap();
    assert_eq!(progress, 65);

    let stored = h.service.get_loop_by_id(&alice, created.id).await.unwrap();
    assert_eq!(stored.progress, 65);
}

#[tokio::test]
async fn test_progress_out_of_range_never_reaches_storage() {
    let h = harness();
    let alice = member("alice", "org-1");
    let created = h
        .service
        .create_loop(&alice, new_loop("123 Main Street", 450_000.0))
        .await
        .unwrap();
    let before = h.store.calls();

    for bad in [-10, 101] {
        let err = h
            .service
            .update_loop_progress(&alice, created.id, bad)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);
        assert!(err.user_message().contains("Progress must be between 0 and 100"));
    }
    assert_eq!(h.store.calls(), before);
}

#[tokio::test]
async fn test_non_creator_member_cannot_update() {
    let h = harness();
    let alice = member("alice", "org-1");
    let bob = member("bob", "org-1");

    let created = h
        .service
        .create_loop(&alice, new_loop("123 Main Street", 450_000.0))
        .await
        .unwrap();

    let err = h
        .service
        .update_loop(&bob, created.id, LoopChanges::progress(10))
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::Unauthorized);
    assert!(err.user_message().contains("Unauthorized"));

    let err = h.service.delete_loop(&bob, created.id).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::Unauthorized);
}

#[tokio::test]
async fn test_foreign_loop_reads_as_not_found() {
    let h = harness();
    let alice = member("alice", "org-1");
    let mallory = member("mallory", "org-2");

    let created = h
        .service
        .create_loop(&alice, new_loop("123 Main Street", 450_000.0))
        .await
        .unwrap();

    let foreign = h
        .service
        .get_loop_by_id(&mallory, created.id)
        .await
        .unwrap_err();
    let missing = h
        .service
        .get_loop_by_id(&mallory, Uuid::new_v4())
        .await
        .unwrap_err();

    assert_eq!(foreign.user_message(), "Loop not found");
    assert_eq!(foreign.code(), ErrorCode::RecordNotFound);
    assert_eq!(foreign.code(), missing.code());
    assert_eq!(foreign.user_message(), missing.user_message());

    let err = h
        .service
        .update_loop_progress(&mallory, created.id, 50)
        .await
        .unwrap_err();
    assert_eq!(err.user_message(), "Loop not found");
}

#[tokio::test]
async fn test_unauthenticated_reads_never_reach_storage() {
    let h = harness();
    let anonymous = StaticAuthProvider::anonymous();

    let err = h
        .service
        .get_loops(&anonymous, LoopQuery::default())
        .await
        .unwrap_err();
    assert_eq!(err.user_message(), "Not authenticated");
    assert_eq!(err.code(), ErrorCode::Unauthenticated);

    let err = h.service.get_loop_stats(&anonymous).await.unwrap_err();
    assert_eq!(err.user_message(), "Not authenticated");

    let err = h
        .service
        .create_loop(&anonymous, new_loop("123 Main Street", 1.0))
        .await
        .unwrap_err();
    assert_eq!(err.user_message(), "Not authenticated");

    assert_eq!(h.store.calls(), 0);
}

// ============================================================================
// Gates
// ============================================================================

#[tokio::test]
async fn test_user_without_organization() {
    let h = harness();
    let loner = StaticAuthProvider::new(CurrentUser::new(
        "loner",
        "loner@example.com",
        GlobalRole::User,
        SubscriptionTier::Growth,
    ));

    let err = h.service.get_loop_stats(&loner).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::OrganizationRequired);
    assert_eq!(h.store.calls(), 0);
}

#[tokio::test]
async fn test_tier_gate_on_mutations() {
    let h = harness();
    let starter = user(
        "sam",
        GlobalRole::User,
        "org-1",
        OrganizationRole::Member,
        SubscriptionTier::Starter,
    );

    let err = h
        .service
        .create_loop(&starter, new_loop("123 Main Street", 450_000.0))
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::TierInsufficient);
    assert_eq!(err.user_message(), "Transaction Management requires GROWTH tier");
    assert_eq!(h.store.calls(), 0);

    // Reads are not tier-gated.
    let list = h.service.get_loops(&starter, LoopQuery::default()).await.unwrap();
    assert!(list.loops.is_empty());
}

#[tokio::test]
async fn test_viewer_cannot_create() {
    let h = harness();
    let viewer = user(
        "vic",
        GlobalRole::User,
        "org-1",
        OrganizationRole::Viewer,
        SubscriptionTier::Growth,
    );
    let err = h
        .service
        .create_loop(&viewer, new_loop("123 Main Street", 450_000.0))
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::Unauthorized);
}

#[tokio::test]
async fn test_client_cannot_list() {
    let h = harness();
    let client = user(
        "cli",
        GlobalRole::Client,
        "org-1",
        OrganizationRole::Member,
        SubscriptionTier::Growth,
    );
    let err = h
        .service
        .get_loops(&client, LoopQuery::default())
        .await
        .unwrap_err();
    assert_eq!(err.user_message(), "Unauthorized: No permission to view loops");
    assert_eq!(h.store.calls(), 0);
}

#[tokio::test]
async fn test_org_admin_and_owner_may_modify_any_loop() {
    let h = harness();
    let alice = member("alice", "org-1");
    let created = h
        .service
        .create_loop(&alice, new_loop("123 Main Street", 450_000.0))
        .await
        .unwrap();

    for (id, org_role) in [("ada", OrganizationRole::Admin), ("otto", OrganizationRole::Owner)] {
        let actor = user(id, GlobalRole::User, "org-1", org_role, SubscriptionTier::Growth);
        let updated = h
            .service
            .update_loop(
                &actor,
                created.id,
                LoopChanges {
                    status: Some(LoopStatus::Active),
                    ..LoopChanges::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.status, LoopStatus::Active);
    }
}

#[tokio::test]
async fn test_platform_admin_with_viewer_membership() {
    let h = harness();
    let alice = member("alice", "org-1");
    let created = h
        .service
        .create_loop(&alice, new_loop("123 Main Street", 450_000.0))
        .await
        .unwrap();

    let platform_admin = user(
        "root",
        GlobalRole::Admin,
        "org-1",
        OrganizationRole::Viewer,
        SubscriptionTier::Growth,
    );

    let own = h
        .service
        .create_loop(&platform_admin, new_loop("9 Harbor Road", 300_000.0))
        .await
        .unwrap();
    assert_eq!(own.status, LoopStatus::Draft);

    let progress = h
        .service
        .update_loop_progress(&platform_admin, created.id, 40)
        .await
        .unwrap();
    assert_eq!(progress, 40);

    h.service.delete_loop(&platform_admin, created.id).await.unwrap();
    let err = h
        .service
        .get_loop_by_id(&alice, created.id)
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::RecordNotFound);
}

#[tokio::test]
async fn test_create_validates_input() {
    let h = harness();
    let alice = member("alice", "org-1");

    let err = h
        .service
        .create_loop(&alice, new_loop("1 A", 450_000.0))
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::ValidationError);

    let err = h
        .service
        .create_loop(&alice, new_loop("123 Main Street", 0.0))
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::ValidationError);
    assert_eq!(h.store.calls(), 0);
}

// ============================================================================
// Listing and stats
// ============================================================================

#[tokio::test]
async fn test_list_filters_sorts_and_paginates() {
    let h = harness();
    let alice = member("alice", "org-1");
    let mallory = member("mallory", "org-2");

    for (address, price) in [
        ("10 Oak Street", 300_000.0),
        ("20 Pine Street", 100_000.0),
        ("30 Elm Avenue", 200_000.0),
    ] {
        h.service.create_loop(&alice, new_loop(address, price)).await.unwrap();
    }
    h.service
        .create_loop(&mallory, new_loop("99 Oak Street", 1.0))
        .await
        .unwrap();

    let query = LoopQuery {
        limit: 2,
        sort_by: LoopSortField::ListingPrice,
        sort_order: SortOrder::Asc,
        ..LoopQuery::default()
    };
    let first = h.service.get_loops(&alice, query.clone()).await.unwrap();
    let prices: Vec<f64> = first.loops.iter().map(|l| l.listing_price).collect();
    assert_eq!(prices, vec![100_000.0, 200_000.0]);
    assert_eq!(first.pagination.total, 3);
    assert_eq!(first.pagination.pages, 2);

    let second = h
        .service
        .get_loops(&alice, LoopQuery { page: 2, ..query })
        .await
        .unwrap();
    assert_eq!(second.loops.len(), 1);

    let search = LoopQuery {
        search: Some("oak".into()),
        ..LoopQuery::default()
    };
    let found = h.service.get_loops(&alice, search).await.unwrap();
    assert_eq!(found.loops.len(), 1);
    assert_eq!(found.loops[0].property_address, "10 Oak Street");

    let bad_page = LoopQuery {
        limit: 500,
        ..LoopQuery::default()
    };
    assert!(h.service.get_loops(&alice, bad_page).await.is_err());
}

#[tokio::test]
async fn test_stats() {
    let h = harness();
    let alice = member("alice", "org-1");

    let empty = h.service.get_loop_stats(&alice).await.unwrap();
    assert_eq!(empty.total_loops, 0);
    assert_eq!(empty.total_value, 0.0);

    let a = h
        .service
        .create_loop(&alice, new_loop("10 Oak Street", 300_000.0))
        .await
        .unwrap();
    h.service
        .create_loop(
            &alice,
            CreateLoopInput {
                expected_closing: Some(chrono::Utc::now()),
                ..new_loop("20 Pine Street", 100_000.0)
            },
        )
        .await
        .unwrap();
    h.service
        .update_loop(
            &alice,
            a.id,
            LoopChanges {
                status: Some(LoopStatus::Active),
                ..LoopChanges::default()
            },
        )
        .await
        .unwrap();

    let stats = h.service.get_loop_stats(&alice).await.unwrap();
    assert_eq!(stats.total_loops, 2);
    assert_eq!(stats.active_loops, 1);
    assert_eq!(stats.closing_this_month, 1);
    assert_eq!(stats.total_value, 400_000.0);

    let json = serde_json::to_value(stats).unwrap();
    assert_eq!(json["totalLoops"], 2);
    assert_eq!(json["closingThisMonth"], 1);
}

// ============================================================================
// Audit
// ============================================================================

#[tokio::test]
async fn test_mutations_are_audited() {
    let h = harness();
    let alice = member("alice", "org-1");

    let created = h
        .service
        .create_loop(&alice, new_loop("123 Main Street", 450_000.0))
        .await
        .unwrap();
    h.service
        .update_loop(&alice, created.id, LoopChanges::progress(40))
        .await
        .unwrap();
    h.service.delete_loop(&alice, created.id).await.unwrap();

    let actions: Vec<AuditAction> = h.audit.entries().iter().map(|e| e.action).collect();
    assert_eq!(
        actions,
        vec![AuditAction::Created, AuditAction::Updated, AuditAction::Deleted]
    );

    let update = &h.audit.entries()[1];
    assert_eq!(update.old_values.as_ref().unwrap()["progress"], 0);
    assert_eq!(update.new_values.as_ref().unwrap()["progress"], 40);
    assert_eq!(update.organization_id.as_str(), "org-1");
}

#[tokio::test]
async fn test_best_effort_audit_keeps_primary_write() {
    let h = harness_with(AuditPolicy::BestEffort, MemoryAuditSink::failing());
    let alice = member("alice", "org-1");

    let created = h
        .service
        .create_loop(&alice, new_loop("123 Main Street", 450_000.0))
        .await
        .unwrap();
    assert!(h.service.get_loop_by_id(&alice, created.id).await.is_ok());
}

#[tokio::test]
async fn test_required_audit_surfaces_failure_without_rollback() {
    let h = harness_with(AuditPolicy::Required, MemoryAuditSink::failing());
    let alice = member("alice", "org-1");

    let err = h
        .service
        .create_loop(&alice, new_loop("123 Main Street", 450_000.0))
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::AuditWriteFailed);

    // The loop itself was written.
    let list = h.service.get_loops(&alice, LoopQuery::default()).await.unwrap();
    assert_eq!(list.loops.len(), 1);
}
