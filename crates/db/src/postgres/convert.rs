//! Conversions between entity rows and domain records.
//!
//! Enums are stored as their lowercase names. A row that no longer parses
//! is reported as a storage error rather than silently defaulted.

use std::fmt::Display;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{DbErr, Set, SqlErr};
use tuition_core::audit::AuditStamp;
use tuition_core::bursary::{Bursary, BursaryType, Coverage, CoverageType};
use tuition_core::discount::SiblingDiscountTable;
use tuition_core::fee_structure::{BillingFrequency, FeeStructure, FrequencyPricing};
use tuition_core::payment::{Payment, PaymentMethod, PaymentStatus};
use tuition_core::proration::{ActivityFee, ActivityFrequency};
use tuition_core::student_fee::{ActivityCharge, FeeStatus, StudentFee};
use tuition_core::{FeeError, FeeResult};
use tuition_shared::types::{
    ActivityFeeId, ActivityId, BursaryId, FeeStructureId, Money, PaymentId, Percent, SchoolId,
    StudentFeeId, StudentId, TenantId, UserId,
};

use crate::entities::{activity_fees, bursaries, fee_structures, payments, student_fees};

/// Maps a database error onto the billing error space. Unique violations
/// become `DataIntegrity` on the invariant the index protects.
pub(crate) fn store_err(err: DbErr) -> FeeError {
    if let Some(SqlErr::UniqueConstraintViolation(detail)) = err.sql_err() {
        let constraint = if detail.contains("uq_fee_structures_active") {
            "one_active_fee_structure"
        } else if detail.contains("uq_student_fees_frequency") {
            "one_student_fee_per_frequency"
        } else if detail.contains("uq_payments_receipt") {
            "unique_receipt_number"
        } else {
            "unique"
        };
        return FeeError::DataIntegrity { constraint, detail };
    }
    FeeError::Store(err.to_string())
}

fn corrupt(column: &str, value: impl Display) -> FeeError {
    FeeError::Store(format!("unreadable {column} value {value}"))
}

fn percent(column: &str, value: Decimal) -> FeeResult<Percent> {
    Percent::new(value).map_err(|_| corrupt(column, value))
}

fn grade(column: &str, value: i16) -> FeeResult<u8> {
    u8::try_from(value).map_err(|_| corrupt(column, value))
}

fn count(column: &str, value: i32) -> FeeResult<u32> {
    u32::try_from(value).map_err(|_| corrupt(column, value))
}

fn utc(at: sea_orm::prelude::DateTimeWithTimeZone) -> DateTime<Utc> {
    at.with_timezone(&Utc)
}

fn audit(
    created_at: sea_orm::prelude::DateTimeWithTimeZone,
    created_by: uuid::Uuid,
    updated_at: sea_orm::prelude::DateTimeWithTimeZone,
    updated_by: uuid::Uuid,
) -> AuditStamp {
    AuditStamp {
        created_at: utc(created_at),
        created_by: UserId::from_uuid(created_by),
        updated_at: utc(updated_at),
        updated_by: UserId::from_uuid(updated_by),
    }
}

fn pricing(
    frequency: &str,
    base: Option<Decimal>,
    discount: Option<Decimal>,
) -> FeeResult<Option<FrequencyPricing>> {
    match (base, discount) {
        (Some(base), Some(discount)) => Ok(Some(FrequencyPricing {
            base_amount: Money::new(base),
            discount_percent: percent(frequency, discount)?,
        })),
        (None, None) => Ok(None),
        _ => Err(corrupt(frequency, "pricing with a missing half")),
    }
}

fn pricing_parts(pricing: Option<FrequencyPricing>) -> (Option<Decimal>, Option<Decimal>) {
    pricing.map_or((None, None), |p| {
        (Some(p.base_amount.amount()), Some(p.discount_percent.value()))
    })
}

pub(crate) fn fee_structure(m: fee_structures::Model) -> FeeResult<FeeStructure> {
    Ok(FeeStructure {
        id: FeeStructureId::from_uuid(m.id),
        tenant_id: TenantId::from_uuid(m.tenant_id),
        school_id: SchoolId::from_uuid(m.school_id),
        grade_level: grade("fee_structures.grade_level", m.grade_level)?,
        academic_year: m.academic_year,
        monthly: pricing("monthly", m.monthly_base_amount, m.monthly_discount_percent)?,
        termly: pricing("termly", m.termly_base_amount, m.termly_discount_percent)?,
        yearly: pricing("yearly", m.yearly_base_amount, m.yearly_discount_percent)?,
        material_fee: Money::new(m.material_fee),
        other_fees: Money::new(m.other_fees),
        sibling_discounts: SiblingDiscountTable {
            second: percent("sibling_discount_second", m.sibling_discount_second)?,
            third: percent("sibling_discount_third", m.sibling_discount_third)?,
            fourth_plus: percent("sibling_discount_fourth_plus", m.sibling_discount_fourth_plus)?,
        },
        apply_sibling_to_all: m.apply_sibling_to_all,
        is_active: m.is_active,
        audit: audit(m.created_at, m.created_by, m.updated_at, m.updated_by),
    })
}

pub(crate) fn fee_structure_model(s: &FeeStructure) -> fee_structures::ActiveModel {
    let (monthly_base, monthly_discount) = pricing_parts(s.monthly);
    let (termly_base, termly_discount) = pricing_parts(s.termly);
    let (yearly_base, yearly_discount) = pricing_parts(s.yearly);
    fee_structures::ActiveModel {
        id: Set(s.id.into_inner()),
        tenant_id: Set(s.tenant_id.into_inner()),
        school_id: Set(s.school_id.into_inner()),
        grade_level: Set(i16::from(s.grade_level)),
        academic_year: Set(s.academic_year.clone()),
        monthly_base_amount: Set(monthly_base),
        monthly_discount_percent: Set(monthly_discount),
        termly_base_amount: Set(termly_base),
        termly_discount_percent: Set(termly_discount),
        yearly_base_amount: Set(yearly_base),
        yearly_discount_percent: Set(yearly_discount),
        material_fee: Set(s.material_fee.amount()),
        other_fees: Set(s.other_fees.amount()),
        sibling_discount_second: Set(s.sibling_discounts.second.value()),
        sibling_discount_third: Set(s.sibling_discounts.third.value()),
        sibling_discount_fourth_plus: Set(s.sibling_discounts.fourth_plus.value()),
        apply_sibling_to_all: Set(s.apply_sibling_to_all),
        is_active: Set(s.is_active),
        created_at: Set(s.audit.created_at.into()),
        created_by: Set(s.audit.created_by.into_inner()),
        updated_at: Set(s.audit.updated_at.into()),
        updated_by: Set(s.audit.updated_by.into_inner()),
    }
}

pub(crate) fn bursary(m: bursaries::Model) -> FeeResult<Bursary> {
    let bursary_type =
        BursaryType::parse(&m.bursary_type).ok_or_else(|| corrupt("bursary_type", &m.bursary_type))?;
    let coverage_type = CoverageType::parse(&m.coverage_type)
        .ok_or_else(|| corrupt("coverage_type", &m.coverage_type))?;
    Ok(Bursary {
        id: BursaryId::from_uuid(m.id),
        tenant_id: TenantId::from_uuid(m.tenant_id),
        name: m.name,
        bursary_type,
        coverage: Coverage::from_parts(coverage_type, m.coverage_value)
            .map_err(|_| corrupt("coverage_value", m.coverage_value))?,
        min_grade: grade("min_grade", m.min_grade)?,
        max_grade: grade("max_grade", m.max_grade)?,
        academic_year: m.academic_year,
        application_deadline: m.application_deadline,
        max_recipients: count("max_recipients", m.max_recipients)?,
        current_recipients: count("current_recipients", m.current_recipients)?,
        is_active: m.is_active,
        version: m.version,
        audit: audit(m.created_at, m.created_by, m.updated_at, m.updated_by),
    })
}

pub(crate) fn bursary_model(b: &Bursary) -> FeeResult<bursaries::ActiveModel> {
    let max_recipients = i32::try_from(b.max_recipients)
        .map_err(|_| FeeError::validation("max_recipients", "too large", b.max_recipients))?;
    let current_recipients = i32::try_from(b.current_recipients)
        .map_err(|_| FeeError::validation("current_recipients", "too large", b.current_recipients))?;
    Ok(bursaries::ActiveModel {
        id: Set(b.id.into_inner()),
        tenant_id: Set(b.tenant_id.into_inner()),
        name: Set(b.name.clone()),
        bursary_type: Set(b.bursary_type.as_str().to_string()),
        coverage_type: Set(b.coverage.coverage_type().as_str().to_string()),
        coverage_value: Set(b.coverage.value()),
        min_grade: Set(i16::from(b.min_grade)),
        max_grade: Set(i16::from(b.max_grade)),
        academic_year: Set(b.academic_year.clone()),
        application_deadline: Set(b.application_deadline),
        max_recipients: Set(max_recipients),
        current_recipients: Set(current_recipients),
        is_active: Set(b.is_active),
        version: Set(b.version),
        created_at: Set(b.audit.created_at.into()),
        created_by: Set(b.audit.created_by.into_inner()),
        updated_at: Set(b.audit.updated_at.into()),
        updated_by: Set(b.audit.updated_by.into_inner()),
    })
}

pub(crate) fn activity_fee(m: activity_fees::Model) -> FeeResult<ActivityFee> {
    let frequency = ActivityFrequency::parse(&m.frequency)
        .ok_or_else(|| corrupt("activity_fees.frequency", &m.frequency))?;
    Ok(ActivityFee {
        id: ActivityFeeId::from_uuid(m.id),
        tenant_id: TenantId::from_uuid(m.tenant_id),
        activity_id: ActivityId::from_uuid(m.activity_id),
        activity_name: m.activity_name,
        academic_year: m.academic_year,
        amount: Money::new(m.amount),
        frequency,
        prorate: m.prorate,
        period_start: m.period_start,
        period_end: m.period_end,
        audit: audit(m.created_at, m.created_by, m.updated_at, m.updated_by),
    })
}

pub(crate) fn activity_fee_model(f: &ActivityFee) -> activity_fees::ActiveModel {
    activity_fees::ActiveModel {
        id: Set(f.id.into_inner()),
        tenant_id: Set(f.tenant_id.into_inner()),
        activity_id: Set(f.activity_id.into_inner()),
        activity_name: Set(f.activity_name.clone()),
        academic_year: Set(f.academic_year.clone()),
        amount: Set(f.amount.amount()),
        frequency: Set(f.frequency.as_str().to_string()),
        prorate: Set(f.prorate),
        period_start: Set(f.period_start),
        period_end: Set(f.period_end),
        created_at: Set(f.audit.created_at.into()),
        created_by: Set(f.audit.created_by.into_inner()),
        updated_at: Set(f.audit.updated_at.into()),
        updated_by: Set(f.audit.updated_by.into_inner()),
    }
}

pub(crate) fn student_fee(m: student_fees::Model) -> FeeResult<StudentFee> {
    let frequency = BillingFrequency::parse(&m.frequency)
        .ok_or_else(|| corrupt("student_fees.frequency", &m.frequency))?;
    let status = FeeStatus::parse(&m.status).ok_or_else(|| corrupt("student_fees.status", &m.status))?;
    let activity_charges: Vec<ActivityCharge> = serde_json::from_value(m.activity_charges)
        .map_err(|e| corrupt("activity_charges", e))?;
    Ok(StudentFee {
        id: StudentFeeId::from_uuid(m.id),
        tenant_id: TenantId::from_uuid(m.tenant_id),
        student_id: StudentId::from_uuid(m.student_id),
        academic_year: m.academic_year,
        frequency,
        fee_structure_id: FeeStructureId::from_uuid(m.fee_structure_id),
        grade_level: grade("student_fees.grade_level", m.grade_level)?,
        base_tuition: Money::new(m.base_tuition),
        activity_fees: Money::new(m.activity_fees),
        material_fees: Money::new(m.material_fees),
        other_fees: Money::new(m.other_fees),
        frequency_discount_percent: percent(
            "frequency_discount_percent",
            m.frequency_discount_percent,
        )?,
        frequency_discount_amount: Money::new(m.frequency_discount_amount),
        sibling_order: count("sibling_order", m.sibling_order)?,
        sibling_discount_percent: percent("sibling_discount_percent", m.sibling_discount_percent)?,
        sibling_discount_amount: Money::new(m.sibling_discount_amount),
        apply_sibling_to_all: m.apply_sibling_to_all,
        bursary_id: m.bursary_id.map(BursaryId::from_uuid),
        bursary_amount: Money::new(m.bursary_amount),
        total_before_discounts: Money::new(m.total_before_discounts),
        total_discounts: Money::new(m.total_discounts),
        total_due: Money::new(m.total_due),
        total_paid: Money::new(m.total_paid),
        balance: Money::new(m.balance),
        credit_balance: Money::new(m.credit_balance),
        status,
        due_date: m.due_date,
        activity_charges,
        version: m.version,
        audit: audit(m.created_at, m.created_by, m.updated_at, m.updated_by),
    })
}

pub(crate) fn student_fee_model(f: &StudentFee) -> FeeResult<student_fees::ActiveModel> {
    let sibling_order = i32::try_from(f.sibling_order)
        .map_err(|_| FeeError::validation("sibling_order", "too large", f.sibling_order))?;
    let activity_charges =
        serde_json::to_value(&f.activity_charges).map_err(|e| FeeError::Store(e.to_string()))?;
    Ok(student_fees::ActiveModel {
        id: Set(f.id.into_inner()),
        tenant_id: Set(f.tenant_id.into_inner()),
        student_id: Set(f.student_id.into_inner()),
        academic_year: Set(f.academic_year.clone()),
        frequency: Set(f.frequency.as_str().to_string()),
        fee_structure_id: Set(f.fee_structure_id.into_inner()),
        grade_level: Set(i16::from(f.grade_level)),
        base_tuition: Set(f.base_tuition.amount()),
        activity_fees: Set(f.activity_fees.amount()),
        material_fees: Set(f.material_fees.amount()),
        other_fees: Set(f.other_fees.amount()),
        frequency_discount_percent: Set(f.frequency_discount_percent.value()),
        frequency_discount_amount: Set(f.frequency_discount_amount.amount()),
        sibling_order: Set(sibling_order),
        sibling_discount_percent: Set(f.sibling_discount_percent.value()),
        sibling_discount_amount: Set(f.sibling_discount_amount.amount()),
        apply_sibling_to_all: Set(f.apply_sibling_to_all),
        bursary_id: Set(f.bursary_id.map(BursaryId::into_inner)),
        bursary_amount: Set(f.bursary_amount.amount()),
        total_before_discounts: Set(f.total_before_discounts.amount()),
        total_discounts: Set(f.total_discounts.amount()),
        total_due: Set(f.total_due.amount()),
        total_paid: Set(f.total_paid.amount()),
        balance: Set(f.balance.amount()),
        credit_balance: Set(f.credit_balance.amount()),
        status: Set(f.status.as_str().to_string()),
        due_date: Set(f.due_date),
        activity_charges: Set(activity_charges),
        version: Set(f.version),
        created_at: Set(f.audit.created_at.into()),
        created_by: Set(f.audit.created_by.into_inner()),
        updated_at: Set(f.audit.updated_at.into()),
        updated_by: Set(f.audit.updated_by.into_inner()),
    })
}

pub(crate) fn payment(m: payments::Model) -> FeeResult<Payment> {
    let method = PaymentMethod::parse(&m.method).ok_or_else(|| corrupt("payments.method", &m.method))?;
    let status = PaymentStatus::parse(&m.status).ok_or_else(|| corrupt("payments.status", &m.status))?;
    Ok(Payment {
        id: PaymentId::from_uuid(m.id),
        tenant_id: TenantId::from_uuid(m.tenant_id),
        student_fee_id: StudentFeeId::from_uuid(m.student_fee_id),
        amount: Money::new(m.amount),
        method,
        payment_date: m.payment_date,
        status,
        receipt_number: m.receipt_number,
        external_reference: m.external_reference,
        notes: m.notes,
        failure_reason: m.failure_reason,
        refund_reason: m.refund_reason,
        completed_at: m.completed_at.map(utc),
        cancelled_at: m.cancelled_at.map(utc),
        refunded_at: m.refunded_at.map(utc),
        audit: audit(m.created_at, m.created_by, m.updated_at, m.updated_by),
    })
}

pub(crate) fn payment_model(p: &Payment) -> payments::ActiveModel {
    payments::ActiveModel {
        id: Set(p.id.into_inner()),
        tenant_id: Set(p.tenant_id.into_inner()),
        student_fee_id: Set(p.student_fee_id.into_inner()),
        amount: Set(p.amount.amount()),
        method: Set(p.method.as_str().to_string()),
        payment_date: Set(p.payment_date),
        status: Set(p.status.as_str().to_string()),
        receipt_number: Set(p.receipt_number.clone()),
        external_reference: Set(p.external_reference.clone()),
        notes: Set(p.notes.clone()),
        failure_reason: Set(p.failure_reason.clone()),
        refund_reason: Set(p.refund_reason.clone()),
        completed_at: Set(p.completed_at.map(Into::into)),
        cancelled_at: Set(p.cancelled_at.map(Into::into)),
        refunded_at: Set(p.refunded_at.map(Into::into)),
        created_at: Set(p.audit.created_at.into()),
        created_by: Set(p.audit.created_by.into_inner()),
        updated_at: Set(p.audit.updated_at.into()),
        updated_by: Set(p.audit.updated_by.into_inner()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use sea_orm::ActiveValue;
    use tuition_core::payment::{NewPayment, PaymentIntent};
    use tuition_core::proration::CreateActivityFeeInput;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-09-01T08:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn take<T: Into<sea_orm::Value>>(value: ActiveValue<T>) -> T {
        match value {
            ActiveValue::Set(v) | ActiveValue::Unchanged(v) => v,
            ActiveValue::NotSet => panic!("column not set"),
        }
    }

    #[test]
    fn test_unreadable_enum_is_store_error() {
        let err = corrupt("payments.status", "settled");
        assert_eq!(err.error_code(), "STORAGE_ERROR");
        assert!(err.to_string().contains("settled"));
    }

    #[test]
    fn test_pricing_requires_both_halves() {
        assert_eq!(pricing("monthly", None, None), Ok(None));
        assert!(pricing("monthly", Some(dec!(800)), None).is_err());
        let p = pricing("yearly", Some(dec!(8000)), Some(dec!(10))).unwrap().unwrap();
        assert_eq!(p.base_amount, Money::new(dec!(8000)));
        assert_eq!(p.discount_percent.value(), dec!(10));
        assert!(pricing("yearly", Some(dec!(8000)), Some(dec!(120))).is_err());
    }

    #[test]
    fn test_negative_grade_is_rejected() {
        assert!(grade("grade_level", -1).is_err());
        assert_eq!(grade("grade_level", 7), Ok(7));
    }

    #[test]
    fn test_payment_model_stores_lowercase_names() {
        let payment = Payment::new(
            TenantId::new(),
            NewPayment {
                student_fee_id: StudentFeeId::new(),
                amount: Money::new(dec!(75)),
                method: PaymentMethod::BankTransfer,
                payment_date: NaiveDate::from_ymd_opt(2025, 9, 1).unwrap(),
                intent: PaymentIntent::Settle,
                external_reference: None,
                notes: None,
            },
            PaymentStatus::Completed,
            UserId::new(),
            now(),
        );
        let model = payment_model(&payment);
        assert_eq!(take(model.method), "bank_transfer");
        assert_eq!(take(model.status), "completed");
        assert_eq!(take(model.amount), dec!(75.00));
        assert!(take(model.completed_at).is_some());
    }

    #[test]
    fn test_activity_fee_model_roundtrip_fields() {
        let fee = ActivityFee::create(
            TenantId::new(),
            CreateActivityFeeInput {
                activity_id: ActivityId::new(),
                activity_name: "Swimming".to_string(),
                academic_year: "2025-2026".to_string(),
                amount: Money::new(dec!(1000)),
                frequency: ActivityFrequency::Yearly,
                prorate: true,
                period_start: NaiveDate::from_ymd_opt(2025, 9, 1).unwrap(),
                period_end: NaiveDate::from_ymd_opt(2026, 6, 30).unwrap(),
            },
            UserId::new(),
            now(),
        )
        .unwrap();
        let model = activity_fee_model(&fee);
        assert_eq!(take(model.frequency), "yearly");
        assert_eq!(take(model.id), fee.id.into_inner());
        assert_eq!(take(model.created_at), now().fixed_offset());
    }
}
