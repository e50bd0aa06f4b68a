//! Transaction loop records and their inputs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{ErrorCode, Result, StriveError};
use crate::pagination::{self, PageInfo, PageRequest};
use crate::rbac::models::{OrganizationId, UserId};
use crate::tenant::{Authored, TenantContext, TenantScoped};

/// Minimum length of a property address.
pub const MIN_ADDRESS_LEN: usize = 5;

// ═══════════════════════════════════════════════════════════════════════════════
// Enums
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoopStatus {
    Draft,
    Active,
    UnderContract,
    Closing,
    Closed,
    Cancelled,
    Archived,
}

impl LoopStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Active => "ACTIVE",
            Self::UnderContract => "UNDER_CONTRACT",
            Self::Closing => "CLOSING",
            Self::Closed => "CLOSED",
            Self::Cancelled => "CANCELLED",
            Self::Archived => "ARCHIVED",
        }
    }
}

impl fmt::Display for LoopStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LoopStatus {
    type Err = StriveError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "DRAFT" => Ok(Self::Draft),
            "ACTIVE" => Ok(Self::Active),
            "UNDER_CONTRACT" => Ok(Self::UnderContract),
            "CLOSING" => Ok(Self::Closing),
            "CLOSED" => Ok(Self::Closed),
            "CANCELLED" => Ok(Self::Cancelled),
            "ARCHIVED" => Ok(Self::Archived),
            other => Err(StriveError::new(
                ErrorCode::InvalidInput,
                format!("Unknown loop status: {}", other),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    PurchaseAgreement,
    ListingAgreement,
    LeaseAgreement,
    Other,
}

impl TransactionType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::PurchaseAgreement => "PURCHASE_AGREEMENT",
            Self::ListingAgreement => "LISTING_AGREEMENT",
            Self::LeaseAgreement => "LEASE_AGREEMENT",
            Self::Other => "OTHER",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = StriveError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "PURCHASE_AGREEMENT" => Ok(Self::PurchaseAgreement),
            "LISTING_AGREEMENT" => Ok(Self::ListingAgreement),
            "LEASE_AGREEMENT" => Ok(Self::LeaseAgreement),
            "OTHER" => Ok(Self::Other),
            other => Err(StriveError::new(
                ErrorCode::InvalidInput,
                format!("Unknown transaction type: {}", other),
            )),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Transaction Loop
// ═══════════════════════════════════════════════════════════════════════════════

/// One real-estate transaction tracked by an organization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionLoop {
    pub id: Uuid,
    pub property_address: String,
    pub transaction_type: TransactionType,
    pub listing_price: f64,
    pub status: LoopStatus,
    pub expected_closing: Option<DateTime<Utc>>,
    pub actual_closing: Option<DateTime<Utc>>,
    /// Percent complete, 0 to 100.
    pub progress: i32,
    pub organization_id: OrganizationId,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TransactionLoop {
    /// A new DRAFT loop at 0% owned by the context's organization and user.
    pub fn draft(input: CreateLoopInput, ctx: &TenantContext) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            property_address: input.property_address,
            transaction_type: input.transaction_type,
            listing_price: input.listing_price,
            status: LoopStatus::Draft,
            expected_closing: input.expected_closing,
            actual_closing: None,
            progress: 0,
            organization_id: ctx.organization_id().clone(),
            created_by: ctx.user_id().clone(),
            created_at: now,
            updated_at: now,
        }
    }
}

impl TenantScoped for TransactionLoop {
    fn organization_id(&self) -> &OrganizationId {
        &self.organization_id
    }
}

impl Authored for TransactionLoop {
    fn created_by(&self) -> &UserId {
        &self.created_by
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Inputs
// ═══════════════════════════════════════════════════════════════════════════════

fn validate_address(address: &str) -> Result<()> {
    if address.trim().chars().count() < MIN_ADDRESS_LEN {
        return Err(StriveError::validation(format!(
            "Property address must be at least {} characters",
            MIN_ADDRESS_LEN
        )));
    }
    Ok(())
}

fn validate_price(price: f64) -> Result<()> {
    if !price.is_finite() || price <= 0.0 {
        return Err(StriveError::validation("Listing price must be positive"));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLoopInput {
    pub property_address: String,
    pub transaction_type: TransactionType,
    pub listing_price: f64,
    #[serde(default)]
    pub expected_closing: Option<DateTime<Utc>>,
}

impl CreateLoopInput {
    pub fn validate(&self) -> Result<()> {
        validate_address(&self.property_address)?;
        validate_price(self.listing_price)
    }
}

/// A partial update. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoopChanges {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_type: Option<TransactionType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listing_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<LoopStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_closing: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_closing: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<i32>,
}

impl LoopChanges {
    pub fn progress(progress: i32) -> Self {
        Self {
            progress: Some(progress),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Field checks only. Progress range is checked by the caller's guard.
    pub fn validate(&self) -> Result<()> {
        if let Some(address) = &self.property_address {
            validate_address(address)?;
        }
        if let Some(price) = self.listing_price {
            validate_price(price)?;
        }
        Ok(())
    }

    /// Apply the present fields and bump `updated_at`.
    pub fn apply(&self, record: &mut TransactionLoop) {
        if let Some(address) = &self.property_address {
            record.property_address = address.clone();
        }
        if let Some(kind) = self.transaction_type {
            record.transaction_type = kind;
        }
        if let Some(price) = self.listing_price {
            record.listing_price = price;
        }
        if let Some(status) = self.status {
            record.status = status;
        }
        if let Some(date) = self.expected_closing {
            record.expected_closing = Some(date);
        }
        if let Some(date) = self.actual_closing {
            record.actual_closing = Some(date);
        }
        if let Some(progress) = self.progress {
            record.progress = progress;
        }
        record.updated_at = Utc::now();
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Listing query
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LoopSortField {
    #[default]
    CreatedAt,
    ExpectedClosing,
    ListingPrice,
    PropertyAddress,
}

impl LoopSortField {
    pub const fn column(&self) -> &'static str {
        match self {
            Self::CreatedAt => "created_at",
            Self::ExpectedClosing => "expected_closing",
            Self::ListingPrice => "listing_price",
            Self::PropertyAddress => "property_address",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub const fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopSort {
    pub field: LoopSortField,
    pub order: SortOrder,
}

/// Caller-facing list parameters, as sent on the query string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoopQuery {
    // Kept as direct fields: `Query` cannot parse numbers through `flatten`.
    #[serde(default = "pagination::default_page")]
    pub page: u64,
    #[serde(default = "pagination::default_limit")]
    pub limit: u64,
    #[serde(default)]
    pub status: Option<LoopStatus>,
    #[serde(default)]
    pub transaction_type: Option<TransactionType>,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub sort_by: LoopSortField,
    #[serde(default)]
    pub sort_order: SortOrder,
}

impl Default for LoopQuery {
    fn default() -> Self {
        Self {
            page: pagination::default_page(),
            limit: pagination::default_limit(),
            status: None,
            transaction_type: None,
            search: None,
            sort_by: LoopSortField::default(),
            sort_order: SortOrder::default(),
        }
    }
}

impl LoopQuery {
    pub fn page_request(&self) -> Result<PageRequest> {
        PageRequest::new(self.page, self.limit)
    }

    pub fn sort(&self) -> LoopSort {
        LoopSort {
            field: self.sort_by,
            order: self.sort_order,
        }
    }

    /// The search term, if it is not blank.
    pub fn search_term(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|term| !term.is_empty())
    }
}

/// One page of loops.
#[derive(Debug, Clone, Serialize)]
pub struct LoopList {
    pub loops: Vec<TransactionLoop>,
    pub pagination: PageInfo,
}

/// Dashboard counters for one organization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoopStats {
    pub total_loops: u64,
    pub active_loops: u64,
    pub closing_this_month: u64,
    /// Sum of listing prices, 0 when there are no loops.
    pub total_value: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(address: &str, price: f64) -> CreateLoopInput {
        CreateLoopInput {
            property_address: address.into(),
            transaction_type: TransactionType::PurchaseAgreement,
            listing_price: price,
            expected_closing: None,
        }
    }

    #[test]
    fn test_create_input_validation() {
        assert!(input("123 Main St", 450_000.0).validate().is_ok());

        let short = input("1 A", 450_000.0).validate().unwrap_err();
        assert_eq!(short.code(), ErrorCode::ValidationError);
        assert!(input("123 Main St", 0.0).validate().is_err());
        assert!(input("123 Main St", -5.0).validate().is_err());
        assert!(input("123 Main St", f64::NAN).validate().is_err());
    }

    #[test]
    fn test_create_input_wire_format() {
        let parsed: CreateLoopInput = serde_json::from_value(serde_json::json!({
            "propertyAddress": "42 Elm Road",
            "transactionType": "LEASE_AGREEMENT",
            "listingPrice": 2500.0
        }))
        .unwrap();
        assert_eq!(parsed.transaction_type, TransactionType::LeaseAgreement);
        assert!(parsed.expected_closing.is_none());
    }

    #[test]
    fn test_status_strings() {
        for status in [
            LoopStatus::Draft,
            LoopStatus::Active,
            LoopStatus::UnderContract,
            LoopStatus::Closing,
            LoopStatus::Closed,
            LoopStatus::Cancelled,
            LoopStatus::Archived,
        ] {
            assert_eq!(status.as_str().parse::<LoopStatus>().unwrap(), status);
            assert_eq!(serde_json::to_value(status).unwrap(), status.as_str());
        }
        assert!("PENDING".parse::<LoopStatus>().is_err());
    }

    #[test]
    fn test_changes_apply_only_present_fields() {
        let user = crate::rbac::models::CurrentUser::new(
            "u1",
            "u1@example.com",
            crate::rbac::models::GlobalRole::User,
            crate::rbac::models::SubscriptionTier::Growth,
        )
        .with_membership(
            "org-1",
            crate::rbac::models::OrganizationRole::Member,
            crate::rbac::models::SubscriptionTier::Growth,
        );
        let ctx = TenantContext::establish(&user).unwrap();
        let mut record = TransactionLoop::draft(input("123 Main St", 450_000.0), &ctx);

        let changes = LoopChanges {
            status: Some(LoopStatus::Active),
            ..LoopChanges::default()
        };
        assert!(!changes.is_empty());
        changes.apply(&mut record);

        assert_eq!(record.status, LoopStatus::Active);
        assert_eq!(record.property_address, "123 Main St");
        assert_eq!(record.progress, 0);
        assert!(LoopChanges::default().is_empty());
    }

    #[test]
    fn test_query_defaults() {
        let query: LoopQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(query, LoopQuery::default());
        assert_eq!(query.sort(), LoopSort::default());
        assert_eq!(query.page_request().unwrap().limit, 20);

        let blank = LoopQuery {
            search: Some("   ".into()),
            ..LoopQuery::default()
        };
        assert!(blank.search_term().is_none());
    }
}
