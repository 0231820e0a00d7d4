//! PostgreSQL billing store.
//!
//! Each `commit_*` call runs in one transaction. Version and status checks are
//! folded into the `UPDATE ... WHERE` clause, so a row changed by another
//! writer matches zero rows and the whole transaction rolls back as a
//! `Conflict`.

mod convert;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbBackend, EntityTrait,
    QueryFilter, QueryOrder, Statement, TransactionTrait,
};
use tracing::debug;
use tuition_core::bursary::{Bursary, RecipientAdjustment};
use tuition_core::fee_structure::{BillingFrequency, FeeStructure};
use tuition_core::payment::Payment;
use tuition_core::proration::ActivityFee;
use tuition_core::student_fee::StudentFee;
use tuition_core::{FeeError, FeeResult};
use tuition_shared::types::{
    ActivityFeeId, BursaryId, FeeStructureId, PaymentId, SchoolId, StudentFeeId, StudentId,
    TenantId, UserId,
};

use crate::entities::{activity_fees, bursaries, fee_structures, payments, student_fees};
use crate::store::{BillingStore, PaymentCommit, StudentFeeCommit};

pub(crate) use convert::store_err;

const NEXT_RECEIPT_SQL: &str = r"
INSERT INTO receipt_sequences (tenant_id, year, last_value)
VALUES ($1, $2, 1)
ON CONFLICT (tenant_id, year)
DO UPDATE SET last_value = receipt_sequences.last_value + 1
RETURNING last_value
";

/// Billing store backed by PostgreSQL through `SeaORM`.
#[derive(Debug, Clone)]
pub struct PgBillingStore {
    db: DatabaseConnection,
}

impl PgBillingStore {
    /// Creates a store over an open connection.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// The underlying connection.
    #[must_use]
    pub const fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

async fn write_student_fee(
    txn: &DatabaseTransaction,
    fee: &StudentFee,
    expected_version: Option<i64>,
) -> FeeResult<()> {
    let model = convert::student_fee_model(fee)?;
    match expected_version {
        None => {
            student_fees::Entity::insert(model)
                .exec_without_returning(txn)
                .await
                .map_err(store_err)?;
        }
        Some(expected) => {
            let result = student_fees::Entity::update_many()
                .set(model)
                .filter(student_fees::Column::Id.eq(fee.id.into_inner()))
                .filter(student_fees::Column::TenantId.eq(fee.tenant_id.into_inner()))
                .filter(student_fees::Column::Version.eq(expected))
                .exec(txn)
                .await
                .map_err(store_err)?;
            if result.rows_affected == 0 {
                return Err(FeeError::conflict(
                    "student_fee",
                    fee.id,
                    format!("version {expected}"),
                    "a newer version",
                ));
            }
        }
    }
    Ok(())
}

async fn adjust_recipients(
    txn: &DatabaseTransaction,
    tenant_id: TenantId,
    adjustment: RecipientAdjustment,
    at: DateTime<Utc>,
    actor: UserId,
) -> FeeResult<()> {
    let current = Expr::col(bursaries::Column::CurrentRecipients);
    let (next, guard, expected) = match adjustment {
        RecipientAdjustment::Increment(_) => (
            current.clone().add(1),
            current.lt(Expr::col(bursaries::Column::MaxRecipients)),
            "current_recipients < max_recipients",
        ),
        RecipientAdjustment::Decrement(_) => {
            (current.clone().sub(1), current.gt(0), "current_recipients > 0")
        }
    };
    let id = adjustment.bursary_id();
    let result = bursaries::Entity::update_many()
        .col_expr(bursaries::Column::CurrentRecipients, next)
        .col_expr(
            bursaries::Column::Version,
            Expr::col(bursaries::Column::Version).add(1),
        )
        .col_expr(bursaries::Column::UpdatedAt, Expr::value(at))
        .col_expr(bursaries::Column::UpdatedBy, Expr::value(actor.into_inner()))
        .filter(bursaries::Column::Id.eq(id.into_inner()))
        .filter(bursaries::Column::TenantId.eq(tenant_id.into_inner()))
        .filter(guard)
        .exec(txn)
        .await
        .map_err(store_err)?;
    if result.rows_affected == 0 {
        return Err(FeeError::conflict("bursary", id, expected, "not satisfied"));
    }
    Ok(())
}

#[async_trait]
impl BillingStore for PgBillingStore {
    async fn insert_fee_structure(&self, structure: &FeeStructure) -> FeeResult<()> {
        fee_structures::Entity::insert(convert::fee_structure_model(structure))
            .exec_without_returning(&self.db)
            .await
            .map_err(store_err)?;
        Ok(())
    }

    async fn get_fee_structure(
        &self,
        tenant_id: TenantId,
        id: FeeStructureId,
    ) -> FeeResult<Option<FeeStructure>> {
        fee_structures::Entity::find_by_id(id.into_inner())
            .filter(fee_structures::Column::TenantId.eq(tenant_id.into_inner()))
            .one(&self.db)
            .await
            .map_err(store_err)?
            .map(convert::fee_structure)
            .transpose()
    }

    async fn active_fee_structures(
        &self,
        tenant_id: TenantId,
        school_id: SchoolId,
        grade_level: u8,
        academic_year: &str,
    ) -> FeeResult<Vec<FeeStructure>> {
        fee_structures::Entity::find()
            .filter(fee_structures::Column::TenantId.eq(tenant_id.into_inner()))
            .filter(fee_structures::Column::SchoolId.eq(school_id.into_inner()))
            .filter(fee_structures::Column::GradeLevel.eq(i16::from(grade_level)))
            .filter(fee_structures::Column::AcademicYear.eq(academic_year))
            .filter(fee_structures::Column::IsActive.eq(true))
            .all(&self.db)
            .await
            .map_err(store_err)?
            .into_iter()
            .map(convert::fee_structure)
            .collect()
    }

    async fn deactivate_fee_structure(
        &self,
        tenant_id: TenantId,
        id: FeeStructureId,
        actor: UserId,
        at: DateTime<Utc>,
    ) -> FeeResult<Option<FeeStructure>> {
        fee_structures::Entity::update_many()
            .col_expr(fee_structures::Column::IsActive, Expr::value(false))
            .col_expr(fee_structures::Column::UpdatedAt, Expr::value(at))
            .col_expr(fee_structures::Column::UpdatedBy, Expr::value(actor.into_inner()))
            .filter(fee_structures::Column::Id.eq(id.into_inner()))
            .filter(fee_structures::Column::TenantId.eq(tenant_id.into_inner()))
            .exec(&self.db)
            .await
            .map_err(store_err)?;
        self.get_fee_structure(tenant_id, id).await
    }

    async fn insert_bursary(&self, bursary: &Bursary) -> FeeResult<()> {
        bursaries::Entity::insert(convert::bursary_model(bursary)?)
            .exec_without_returning(&self.db)
            .await
            .map_err(store_err)?;
        Ok(())
    }

    async fn get_bursary(&self, tenant_id: TenantId, id: BursaryId) -> FeeResult<Option<Bursary>> {
        bursaries::Entity::find_by_id(id.into_inner())
            .filter(bursaries::Column::TenantId.eq(tenant_id.into_inner()))
            .one(&self.db)
            .await
            .map_err(store_err)?
            .map(convert::bursary)
            .transpose()
    }

    async fn insert_activity_fee(&self, fee: &ActivityFee) -> FeeResult<()> {
        activity_fees::Entity::insert(convert::activity_fee_model(fee))
            .exec_without_returning(&self.db)
            .await
            .map_err(store_err)?;
        Ok(())
    }

    async fn activity_fees(
        &self,
        tenant_id: TenantId,
        ids: &[ActivityFeeId],
    ) -> FeeResult<Vec<ActivityFee>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        activity_fees::Entity::find()
            .filter(activity_fees::Column::TenantId.eq(tenant_id.into_inner()))
            .filter(activity_fees::Column::Id.is_in(ids.iter().map(|id| id.into_inner())))
            .all(&self.db)
            .await
            .map_err(store_err)?
            .into_iter()
            .map(convert::activity_fee)
            .collect()
    }

    async fn get_student_fee(
        &self,
        tenant_id: TenantId,
        id: StudentFeeId,
    ) -> FeeResult<Option<StudentFee>> {
        student_fees::Entity::find_by_id(id.into_inner())
            .filter(student_fees::Column::TenantId.eq(tenant_id.into_inner()))
            .one(&self.db)
            .await
            .map_err(store_err)?
            .map(convert::student_fee)
            .transpose()
    }

    async fn find_student_fee(
        &self,
        tenant_id: TenantId,
        student_id: StudentId,
        academic_year: &str,
        frequency: BillingFrequency,
    ) -> FeeResult<Option<StudentFee>> {
        student_fees::Entity::find()
            .filter(student_fees::Column::TenantId.eq(tenant_id.into_inner()))
            .filter(student_fees::Column::StudentId.eq(student_id.into_inner()))
            .filter(student_fees::Column::AcademicYear.eq(academic_year))
            .filter(student_fees::Column::Frequency.eq(frequency.as_str()))
            .one(&self.db)
            .await
            .map_err(store_err)?
            .map(convert::student_fee)
            .transpose()
    }

    async fn list_student_fees(
        &self,
        tenant_id: TenantId,
        student_id: StudentId,
    ) -> FeeResult<Vec<StudentFee>> {
        student_fees::Entity::find()
            .filter(student_fees::Column::TenantId.eq(tenant_id.into_inner()))
            .filter(student_fees::Column::StudentId.eq(student_id.into_inner()))
            .order_by_asc(student_fees::Column::AcademicYear)
            .order_by_asc(student_fees::Column::Frequency)
            .all(&self.db)
            .await
            .map_err(store_err)?
            .into_iter()
            .map(convert::student_fee)
            .collect()
    }

    async fn get_payment(&self, tenant_id: TenantId, id: PaymentId) -> FeeResult<Option<Payment>> {
        payments::Entity::find_by_id(id.into_inner())
            .filter(payments::Column::TenantId.eq(tenant_id.into_inner()))
            .one(&self.db)
            .await
            .map_err(store_err)?
            .map(convert::payment)
            .transpose()
    }

    async fn list_payments(
        &self,
        tenant_id: TenantId,
        student_fee_id: StudentFeeId,
    ) -> FeeResult<Vec<Payment>> {
        payments::Entity::find()
            .filter(payments::Column::TenantId.eq(tenant_id.into_inner()))
            .filter(payments::Column::StudentFeeId.eq(student_fee_id.into_inner()))
            .order_by_asc(payments::Column::CreatedAt)
            .order_by_asc(payments::Column::Id)
            .all(&self.db)
            .await
            .map_err(store_err)?
            .into_iter()
            .map(convert::payment)
            .collect()
    }

    async fn next_receipt_sequence(&self, tenant_id: TenantId, year: i32) -> FeeResult<u64> {
        let row = self
            .db
            .query_one(Statement::from_sql_and_values(
                DbBackend::Postgres,
                NEXT_RECEIPT_SQL,
                [tenant_id.into_inner().into(), year.into()],
            ))
            .await
            .map_err(store_err)?
            .ok_or_else(|| FeeError::Store("receipt sequence returned no row".to_string()))?;
        let last: i64 = row.try_get("", "last_value").map_err(store_err)?;
        u64::try_from(last).map_err(|_| FeeError::Store(format!("receipt sequence {last}")))
    }

    async fn commit_student_fee(&self, commit: StudentFeeCommit) -> FeeResult<StudentFee> {
        let StudentFeeCommit {
            mut fee,
            expected_version,
            adjustments,
        } = commit;
        fee.version = expected_version.map_or(1, |v| v + 1);

        let txn = self.db.begin().await.map_err(store_err)?;
        write_student_fee(&txn, &fee, expected_version).await?;
        for adjustment in adjustments {
            adjust_recipients(
                &txn,
                fee.tenant_id,
                adjustment,
                fee.audit.updated_at,
                fee.audit.updated_by,
            )
            .await?;
        }
        txn.commit().await.map_err(store_err)?;

        debug!(student_fee_id = %fee.id, version = fee.version, "Student fee committed");
        Ok(fee)
    }

    async fn commit_payment(&self, commit: PaymentCommit) -> FeeResult<(Payment, StudentFee)> {
        let PaymentCommit {
            payment,
            expected_status,
            mut fee,
            expected_fee_version,
        } = commit;
        fee.version = expected_fee_version + 1;

        let txn = self.db.begin().await.map_err(store_err)?;
        let model = convert::payment_model(&payment);
        match expected_status {
            None => {
                payments::Entity::insert(model)
                    .exec_without_returning(&txn)
                    .await
                    .map_err(store_err)?;
            }
            Some(expected) => {
                let result = payments::Entity::update_many()
                    .set(model)
                    .filter(payments::Column::Id.eq(payment.id.into_inner()))
                    .filter(payments::Column::TenantId.eq(payment.tenant_id.into_inner()))
                    .filter(payments::Column::Status.eq(expected.as_str()))
                    .exec(&txn)
                    .await
                    .map_err(store_err)?;
                if result.rows_affected == 0 {
                    return Err(FeeError::conflict(
                        "payment",
                        payment.id,
                        expected,
                        "a different status",
                    ));
                }
            }
        }
        write_student_fee(&txn, &fee, Some(expected_fee_version)).await?;
        txn.commit().await.map_err(store_err)?;

        debug!(payment_id = %payment.id, status = %payment.status, "Payment committed");
        Ok((payment, fee))
    }
}
