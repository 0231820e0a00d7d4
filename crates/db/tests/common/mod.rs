//! Fixtures shared by the billing integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{Days, NaiveDate, Utc};
use rust_decimal::Decimal;
use tuition_core::bursary::{BursaryType, Coverage, CreateBursaryInput};
use tuition_core::discount::SiblingDiscountTable;
use tuition_core::fee_structure::{BillingFrequency, CreateFeeStructureInput, FrequencyPricing};
use tuition_core::student_fee::GenerateStudentFeeInput;
use tuition_db::{
    ActivityFeeRepository, BillingStore, BursaryRepository, FeeStructureRepository, MemoryStore,
    PaymentRepository, StudentFeeRepository,
};
use tuition_shared::BillingConfig;
use tuition_shared::types::{Money, Percent, SchoolId, StudentId, TenantId, UserId};

pub const YEAR: &str = "2025-2026";

pub fn money(amount: Decimal) -> Money {
    Money::new(amount)
}

pub fn pct(value: Decimal) -> Percent {
    Percent::new(value).unwrap()
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

pub fn days_from_today(days: u64) -> NaiveDate {
    today().checked_add_days(Days::new(days)).unwrap()
}

pub fn days_before_today(days: u64) -> NaiveDate {
    today().checked_sub_days(Days::new(days)).unwrap()
}

/// Every repository over one shared store, for one tenant and one school.
pub struct Billing<S> {
    pub store: Arc<S>,
    pub tenant_id: TenantId,
    pub actor: UserId,
    pub school_id: SchoolId,
    pub fee_structures: FeeStructureRepository<S>,
    pub bursaries: BursaryRepository<S>,
    pub activity_fees: ActivityFeeRepository<S>,
    pub student_fees: StudentFeeRepository<S>,
    pub payments: PaymentRepository<S>,
}

impl Billing<MemoryStore> {
    pub fn in_memory() -> Self {
        Self::with_store(Arc::new(MemoryStore::new()), BillingConfig::default())
    }
}

impl<S: BillingStore> Billing<S> {
    pub fn with_store(store: Arc<S>, config: BillingConfig) -> Self {
        Self {
            tenant_id: TenantId::new(),
            actor: UserId::new(),
            school_id: SchoolId::new(),
            fee_structures: FeeStructureRepository::new(Arc::clone(&store)),
            bursaries: BursaryRepository::new(Arc::clone(&store)),
            activity_fees: ActivityFeeRepository::new(Arc::clone(&store), config.clone()),
            student_fees: StudentFeeRepository::new(Arc::clone(&store), config.clone()),
            payments: PaymentRepository::new(Arc::clone(&store), config),
            store,
        }
    }

    /// Creates the standard grade-3 structure.
    pub async fn grade_three(&self) {
        self.fee_structures
            .create(self.tenant_id, self.actor, grade_three(self.school_id))
            .await
            .unwrap();
    }

    pub fn fee_input(&self, student_id: StudentId) -> GenerateStudentFeeInput {
        GenerateStudentFeeInput {
            student_id,
            school_id: self.school_id,
            grade_level: 3,
            academic_year: YEAR.to_string(),
            frequency: BillingFrequency::Yearly,
            sibling_order: 1,
            bursary_id: None,
            activities: Vec::new(),
            material_fee_override: None,
            other_fees_override: None,
            due_date: Some(days_from_today(30)),
        }
    }
}

/// Grade 3: monthly 800 at 0%, termly 2800 at 5%, yearly 8000 at 10%.
/// Siblings: 10%, 15%, 20%, tuition only.
pub fn grade_three(school_id: SchoolId) -> CreateFeeStructureInput {
    CreateFeeStructureInput {
        school_id,
        grade_level: 3,
        academic_year: YEAR.to_string(),
        monthly: Some(FrequencyPricing {
            base_amount: Money::from_cents(80_000),
            discount_percent: Percent::ZERO,
        }),
        termly: Some(FrequencyPricing {
            base_amount: Money::from_cents(280_000),
            discount_percent: pct(Decimal::from(5)),
        }),
        yearly: Some(FrequencyPricing {
            base_amount: Money::from_cents(800_000),
            discount_percent: pct(Decimal::from(10)),
        }),
        material_fee: Money::ZERO,
        other_fees: Money::ZERO,
        sibling_discounts: SiblingDiscountTable {
            second: pct(Decimal::from(10)),
            third: pct(Decimal::from(15)),
            fourth_plus: pct(Decimal::from(20)),
        },
        apply_sibling_to_all: false,
    }
}

pub fn bursary_input(coverage: Coverage, max_recipients: u32) -> CreateBursaryInput {
    CreateBursaryInput {
        name: "Founders' award".to_string(),
        bursary_type: BursaryType::NeedBased,
        coverage,
        min_grade: 1,
        max_grade: 6,
        academic_year: YEAR.to_string(),
        application_deadline: Some(days_from_today(30)),
        max_recipients,
    }
}
