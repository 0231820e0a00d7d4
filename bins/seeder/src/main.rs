//! Database seeder for Tuition development and testing.
//!
//! Seeds one demo tenant with fee structures for grades 1 to 6, a bursary,
//! two activity fees and one billed student with a cash payment. Running it
//! again against a seeded database changes nothing.
//!
//! Usage: cargo run --bin seeder (after `migrator up`)

use std::sync::Arc;

use anyhow::Context;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use tuition_core::FeeError;
use tuition_core::bursary::{BursaryType, Coverage, CreateBursaryInput};
use tuition_core::discount::SiblingDiscountTable;
use tuition_core::fee_structure::{BillingFrequency, CreateFeeStructureInput, FrequencyPricing};
use tuition_core::payment::{NewPayment, PaymentIntent, PaymentMethod};
use tuition_core::proration::{ActivityFrequency, CreateActivityFeeInput};
use tuition_core::student_fee::{ActivityEnrollment, GenerateStudentFeeInput};
use tuition_db::{
    ActivityFeeRepository, BursaryRepository, FeeStructureRepository, PaymentRepository,
    PgBillingStore, StudentFeeRepository,
};
use tuition_shared::AppConfig;
use tuition_shared::types::{
    ActivityId, Money, Percent, SchoolId, StudentId, TenantId, UserId,
};

/// Demo tenant (consistent for all seeds)
const DEMO_TENANT_ID: u128 = 1;
/// Demo school
const DEMO_SCHOOL_ID: u128 = 2;
/// Bursar who owns the seeded records
const DEMO_USER_ID: u128 = 3;
/// Demo student billed by the seeder
const DEMO_STUDENT_ID: u128 = 4;

const ACADEMIC_YEAR: &str = "2025-2026";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "seeder=info,tuition_db=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load().context("failed to load configuration")?;
    let db = tuition_db::connect(&config.database)
        .await
        .context("failed to connect to database")?;
    info!("Connected to database");

    let store = Arc::new(PgBillingStore::new(db));
    let seeder = Seeder {
        tenant_id: TenantId::from_uuid(Uuid::from_u128(DEMO_TENANT_ID)),
        school_id: SchoolId::from_uuid(Uuid::from_u128(DEMO_SCHOOL_ID)),
        actor: UserId::from_uuid(Uuid::from_u128(DEMO_USER_ID)),
        fee_structures: FeeStructureRepository::new(Arc::clone(&store)),
        bursaries: BursaryRepository::new(Arc::clone(&store)),
        activity_fees: ActivityFeeRepository::new(Arc::clone(&store), config.billing.clone()),
        student_fees: StudentFeeRepository::new(Arc::clone(&store), config.billing.clone()),
        payments: PaymentRepository::new(store, config.billing),
    };

    if seeder.seed_fee_structures().await? == 0 {
        info!("Demo tenant already seeded, nothing to do");
        return Ok(());
    }
    seeder.seed_demo_student().await?;

    info!("Seeding complete");
    Ok(())
}

struct Seeder {
    tenant_id: TenantId,
    school_id: SchoolId,
    actor: UserId,
    fee_structures: FeeStructureRepository<PgBillingStore>,
    bursaries: BursaryRepository<PgBillingStore>,
    activity_fees: ActivityFeeRepository<PgBillingStore>,
    student_fees: StudentFeeRepository<PgBillingStore>,
    payments: PaymentRepository<PgBillingStore>,
}

impl Seeder {
    /// Seeds one structure per grade. Returns how many were created.
    async fn seed_fee_structures(&self) -> anyhow::Result<usize> {
        let mut created = 0;
        for grade in 1..=6 {
            match self
                .fee_structures
                .create(self.tenant_id, self.actor, grade_structure(self.school_id, grade)?)
                .await
            {
                Ok(structure) => {
                    info!(grade, fee_structure_id = %structure.id, "Seeded fee structure");
                    created += 1;
                }
                Err(FeeError::DataIntegrity { .. }) => {
                    info!(grade, "Fee structure already exists, skipping");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(created)
    }

    async fn seed_demo_student(&self) -> anyhow::Result<()> {
        let bursary = self
            .bursaries
            .create(
                self.tenant_id,
                self.actor,
                CreateBursaryInput {
                    name: "Community scholarship".to_string(),
                    bursary_type: BursaryType::NeedBased,
                    coverage: Coverage::Percentage(Percent::new(Decimal::from(50))?),
                    min_grade: 1,
                    max_grade: 6,
                    academic_year: ACADEMIC_YEAR.to_string(),
                    application_deadline: None,
                    max_recipients: 20,
                },
            )
            .await?;
        info!(bursary_id = %bursary.id, "Seeded bursary");

        let swimming = self
            .activity_fees
            .create(
                self.tenant_id,
                self.actor,
                CreateActivityFeeInput {
                    activity_id: ActivityId::new(),
                    activity_name: "Swimming".to_string(),
                    academic_year: ACADEMIC_YEAR.to_string(),
                    amount: Money::from_cents(100_000),
                    frequency: ActivityFrequency::Yearly,
                    prorate: true,
                    period_start: date(2025, 9, 1)?,
                    period_end: date(2026, 6, 30)?,
                },
            )
            .await?;
        let chess = self
            .activity_fees
            .create(
                self.tenant_id,
                self.actor,
                CreateActivityFeeInput {
                    activity_id: ActivityId::new(),
                    activity_name: "Chess club".to_string(),
                    academic_year: ACADEMIC_YEAR.to_string(),
                    amount: Money::from_cents(12_000),
                    frequency: ActivityFrequency::OneTime,
                    prorate: false,
                    period_start: date(2025, 9, 1)?,
                    period_end: date(2026, 6, 30)?,
                },
            )
            .await?;
        info!(swimming = %swimming.id, chess = %chess.id, "Seeded activity fees");

        let fee = self
            .student_fees
            .generate(
                self.tenant_id,
                self.actor,
                GenerateStudentFeeInput {
                    student_id: StudentId::from_uuid(Uuid::from_u128(DEMO_STUDENT_ID)),
                    school_id: self.school_id,
                    grade_level: 3,
                    academic_year: ACADEMIC_YEAR.to_string(),
                    frequency: BillingFrequency::Yearly,
                    sibling_order: 2,
                    bursary_id: Some(bursary.id),
                    activities: vec![
                        ActivityEnrollment {
                            activity_fee_id: swimming.id,
                            enrolled_on: date(2026, 1, 15)?,
                        },
                        ActivityEnrollment {
                            activity_fee_id: chess.id,
                            enrolled_on: date(2025, 9, 1)?,
                        },
                    ],
                    material_fee_override: None,
                    other_fees_override: None,
                    due_date: None,
                },
            )
            .await?;
        info!(student_fee_id = %fee.id, total_due = %fee.total_due, "Seeded student fee");

        let settled = self
            .payments
            .record(
                self.tenant_id,
                self.actor,
                NewPayment {
                    student_fee_id: fee.id,
                    amount: Money::from_cents(50_000),
                    method: PaymentMethod::Cash,
                    payment_date: chrono::Utc::now().date_naive(),
                    intent: PaymentIntent::Settle,
                    external_reference: None,
                    notes: Some("Seeded deposit".to_string()),
                },
            )
            .await?;
        info!(
            receipt_number = ?settled.payment.receipt_number,
            balance = %settled.student_fee.balance,
            "Seeded payment"
        );
        Ok(())
    }
}

/// Monthly tuition rises by 50.00 per grade; a term costs three and a half
/// months and a year ten.
fn grade_structure(school_id: SchoolId, grade: u8) -> anyhow::Result<CreateFeeStructureInput> {
    let monthly_cents = 60_000 + i64::from(grade) * 5_000;
    Ok(CreateFeeStructureInput {
        school_id,
        grade_level: grade,
        academic_year: ACADEMIC_YEAR.to_string(),
        monthly: Some(FrequencyPricing {
            base_amount: Money::from_cents(monthly_cents),
            discount_percent: Percent::ZERO,
        }),
        termly: Some(FrequencyPricing {
            base_amount: Money::from_cents(monthly_cents * 7 / 2),
            discount_percent: Percent::new(Decimal::from(5))?,
        }),
        yearly: Some(FrequencyPricing {
            base_amount: Money::from_cents(monthly_cents * 10),
            discount_percent: Percent::new(Decimal::from(10))?,
        }),
        material_fee: Money::from_cents(15_000),
        other_fees: Money::ZERO,
        sibling_discounts: SiblingDiscountTable {
            second: Percent::new(Decimal::from(10))?,
            third: Percent::new(Decimal::from(15))?,
            fourth_plus: Percent::new(Decimal::from(20))?,
        },
        apply_sibling_to_all: false,
    })
}

fn date(year: i32, month: u32, day: u32) -> anyhow::Result<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day)
        .with_context(|| format!("invalid date {year}-{month:02}-{day:02}"))
}
