//! PostgreSQL-backed [`LoopStore`].

use async_trait::async_trait;
use sqlx::{postgres::PgRow, PgPool, Postgres, QueryBuilder, Row};
use uuid::Uuid;

use super::model::{LoopChanges, LoopSort, TransactionLoop};
use super::store::{LoopFilter, LoopStore};
use crate::error::{Result, StriveError};
use crate::rbac::models::{OrganizationId, UserId};
use crate::tenant::TenantScope;

const LOOP_COLUMNS: &str = "id, property_address, transaction_type, listing_price, status, \
     expected_closing, actual_closing, progress, organization_id, created_by, created_at, updated_at";

/// Transaction loops in the `transaction_loops` table.
#[derive(Clone)]
pub struct PgLoopStore {
    pool: PgPool,
}

impl PgLoopStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Append ` WHERE ...` for `filter`. Loops are never public, so a
/// public-or-owned scope still narrows to the organization.
fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &LoopFilter) {
    builder.push(" WHERE organization_id = ");
    builder.push_bind(filter.scope.organization_id().as_str().to_owned());

    if let Some(id) = filter.id {
        builder.push(" AND id = ");
        builder.push_bind(id);
    }
    if let Some(status) = filter.status {
        builder.push(" AND status = ");
        builder.push_bind(status.as_str());
    }
    if let Some(kind) = filter.transaction_type {
        builder.push(" AND transaction_type = ");
        builder.push_bind(kind.as_str());
    }
    if let Some(term) = &filter.address_contains {
        builder.push(" AND property_address ILIKE ");
        builder.push_bind(format!("%{}%", escape_like(term)));
    }
    if let Some((from, until)) = filter.expected_closing {
        builder.push(" AND expected_closing >= ");
        builder.push_bind(from);
        builder.push(" AND expected_closing < ");
        builder.push_bind(until);
    }
}

fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

fn loop_from_row(row: &PgRow) -> Result<TransactionLoop> {
    let transaction_type: String = row.try_get("transaction_type")?;
    let status: String = row.try_get("status")?;
    let organization_id: String = row.try_get("organization_id")?;
    let created_by: String = row.try_get("created_by")?;

    Ok(TransactionLoop {
        id: row.try_get("id")?,
        property_address: row.try_get("property_address")?,
        transaction_type: transaction_type.parse()?,
        listing_price: row.try_get("listing_price")?,
        status: status.parse()?,
        expected_closing: row.try_get("expected_closing")?,
        actual_closing: row.try_get("actual_closing")?,
        progress: row.try_get("progress")?,
        organization_id: OrganizationId::new(organization_id),
        created_by: UserId::new(created_by),
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[async_trait]
impl LoopStore for PgLoopStore {
    async fn find_first(&self, filter: &LoopFilter) -> Result<Option<TransactionLoop>> {
        let mut builder = QueryBuilder::new(format!("SELECT {} FROM transaction_loops", LOOP_COLUMNS));
        push_filter(&mut builder, filter);
        builder.push(" LIMIT 1");

        let row = builder.build().fetch_optional(&self.pool).await?;
        row.as_ref().map(loop_from_row).transpose()
    }

    async fn find_many(
        &self,
        filter: &LoopFilter,
        sort: LoopSort,
        take: u64,
        skip: u64,
    ) -> Result<Vec<TransactionLoop>> {
        let mut builder = QueryBuilder::new(format!("SELECT {} FROM transaction_loops", LOOP_COLUMNS));
        push_filter(&mut builder, filter);
        builder.push(format!(
            " ORDER BY {} {}, id ASC",
            sort.field.column(),
            sort.order.as_sql()
        ));
        builder.push(" LIMIT ");
        builder.push_bind(to_i64(take));
        builder.push(" OFFSET ");
        builder.push_bind(to_i64(skip));

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter().map(loop_from_row).collect()
    }

    async fn count(&self, filter: &LoopFilter) -> Result<u64> {
        let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM transaction_loops");
        push_filter(&mut builder, filter);

        let row = builder.build().fetch_one(&self.pool).await?;
        let count: i64 = row.try_get(0)?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn sum_listing_price(&self, filter: &LoopFilter) -> Result<Option<f64>> {
        let mut builder = QueryBuilder::new("SELECT SUM(listing_price) FROM transaction_loops");
        push_filter(&mut builder, filter);

        let row = builder.build().fetch_one(&self.pool).await?;
        Ok(row.try_get::<Option<f64>, _>(0)?)
    }

    async fn create(&self, record: TransactionLoop) -> Result<TransactionLoop> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO transaction_loops ({})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {}
            "#,
            LOOP_COLUMNS, LOOP_COLUMNS
        ))
        .bind(record.id)
        .bind(&record.property_address)
        .bind(record.transaction_type.as_str())
        .bind(record.listing_price)
        .bind(record.status.as_str())
        .bind(record.expected_closing)
        .bind(record.actual_closing)
        .bind(record.progress)
        .bind(record.organization_id.as_str())
        .bind(record.created_by.as_str())
        .bind(record.created_at)
        .bind(record.updated_at)
        .fetch_one(&self.pool)
        .await?;

        loop_from_row(&row)
    }

    async fn update(
        &self,
        scope: &TenantScope,
        id: Uuid,
        changes: &LoopChanges,
    ) -> Result<TransactionLoop> {
        let mut builder = QueryBuilder::<Postgres>::new("UPDATE transaction_loops SET updated_at = NOW()");

        if let Some(address) = &changes.property_address {
            builder.push(", property_address = ");
            builder.push_bind(address.clone());
        }
        if let Some(kind) = changes.transaction_type {
            builder.push(", transaction_type = ");
            builder.push_bind(kind.as_str());
        }
        if let Some(price) = changes.listing_price {
            builder.push(", listing_price = ");
            builder.push_bind(price);
        }
        if let Some(status) = changes.status {
            builder.push(", status = ");
            builder.push_bind(status.as_str());
        }
        if let Some(date) = changes.expected_closing {
            builder.push(", expected_closing = ");
            builder.push_bind(date);
        }
        if let Some(date) = changes.actual_closing {
            builder.push(", actual_closing = ");
            builder.push_bind(date);
        }
        if let Some(progress) = changes.progress {
            builder.push(", progress = ");
            builder.push_bind(progress);
        }

        builder.push(" WHERE id = ");
        builder.push_bind(id);
        builder.push(" AND organization_id = ");
        builder.push_bind(scope.organization_id().as_str().to_owned());
        builder.push(format!(" RETURNING {}", LOOP_COLUMNS));

        match builder.build().fetch_optional(&self.pool).await? {
            Some(row) => loop_from_row(&row),
            None => Err(StriveError::not_found("Loop")),
        }
    }

    async fn delete(&self, scope: &TenantScope, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM transaction_loops WHERE id = $1 AND organization_id = $2")
            .bind(id)
            .bind(scope.organization_id().as_str())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StriveError::not_found("Loop"));
        }
        Ok(())
    }
}
