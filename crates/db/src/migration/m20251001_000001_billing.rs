//! Billing schema.
//!
//! Creates fee structures, bursaries, activity fees, student fees, payments
//! and the per-tenant receipt counters. Uniqueness and capacity rules are
//! enforced here as well as in the repositories, so concurrent writers that
//! slip past an application check still fail at commit.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(BILLING_SQL).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(
            "DROP TABLE IF EXISTS receipt_sequences, payments, student_fees, activity_fees, bursaries, fee_structures CASCADE;",
        )
        .await?;
        Ok(())
    }
}

const BILLING_SQL: &str = r"
-- Grade/year pricing templates
CREATE TABLE fee_structures (
    id UUID PRIMARY KEY,
    tenant_id UUID NOT NULL,
    school_id UUID NOT NULL,
    grade_level SMALLINT NOT NULL CHECK (grade_level >= 0),
    academic_year VARCHAR(20) NOT NULL,
    monthly_base_amount NUMERIC(14, 2),
    monthly_discount_percent NUMERIC(5, 2),
    termly_base_amount NUMERIC(14, 2),
    termly_discount_percent NUMERIC(5, 2),
    yearly_base_amount NUMERIC(14, 2),
    yearly_discount_percent NUMERIC(5, 2),
    material_fee NUMERIC(14, 2) NOT NULL DEFAULT 0,
    other_fees NUMERIC(14, 2) NOT NULL DEFAULT 0,
    sibling_discount_second NUMERIC(5, 2) NOT NULL DEFAULT 0,
    sibling_discount_third NUMERIC(5, 2) NOT NULL DEFAULT 0,
    sibling_discount_fourth_plus NUMERIC(5, 2) NOT NULL DEFAULT 0,
    apply_sibling_to_all BOOLEAN NOT NULL DEFAULT false,
    is_active BOOLEAN NOT NULL DEFAULT true,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    created_by UUID NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_by UUID NOT NULL,
    CONSTRAINT chk_fee_structure_priced CHECK (
        monthly_base_amount IS NOT NULL
        OR termly_base_amount IS NOT NULL
        OR yearly_base_amount IS NOT NULL
    )
);

-- At most one active structure per school, grade and year
CREATE UNIQUE INDEX uq_fee_structures_active
    ON fee_structures(tenant_id, school_id, grade_level, academic_year)
    WHERE is_active;

-- Bursaries with a recipient capacity
CREATE TABLE bursaries (
    id UUID PRIMARY KEY,
    tenant_id UUID NOT NULL,
    name VARCHAR(200) NOT NULL,
    bursary_type VARCHAR(20) NOT NULL,
    coverage_type VARCHAR(20) NOT NULL,
    coverage_value NUMERIC(14, 2) NOT NULL DEFAULT 0,
    min_grade SMALLINT NOT NULL,
    max_grade SMALLINT NOT NULL,
    academic_year VARCHAR(20) NOT NULL,
    application_deadline DATE,
    max_recipients INTEGER NOT NULL,
    current_recipients INTEGER NOT NULL DEFAULT 0,
    is_active BOOLEAN NOT NULL DEFAULT true,
    version BIGINT NOT NULL DEFAULT 1,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    created_by UUID NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_by UUID NOT NULL,
    CONSTRAINT chk_bursary_grades CHECK (min_grade <= max_grade),
    CONSTRAINT chk_bursary_capacity CHECK (
        current_recipients >= 0 AND current_recipients <= max_recipients
    )
);

CREATE INDEX idx_bursaries_year ON bursaries(tenant_id, academic_year) WHERE is_active;

-- Activity fee schedules
CREATE TABLE activity_fees (
    id UUID PRIMARY KEY,
    tenant_id UUID NOT NULL,
    activity_id UUID NOT NULL,
    activity_name VARCHAR(200) NOT NULL,
    academic_year VARCHAR(20) NOT NULL,
    amount NUMERIC(14, 2) NOT NULL CHECK (amount >= 0),
    frequency VARCHAR(20) NOT NULL,
    prorate BOOLEAN NOT NULL DEFAULT true,
    period_start DATE NOT NULL,
    period_end DATE NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    created_by UUID NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_by UUID NOT NULL,
    CONSTRAINT chk_activity_period CHECK (period_start <= period_end)
);

-- Student fee snapshots
CREATE TABLE student_fees (
    id UUID PRIMARY KEY,
    tenant_id UUID NOT NULL,
    student_id UUID NOT NULL,
    academic_year VARCHAR(20) NOT NULL,
    frequency VARCHAR(20) NOT NULL,
    fee_structure_id UUID NOT NULL REFERENCES fee_structures(id),
    grade_level SMALLINT NOT NULL,
    base_tuition NUMERIC(14, 2) NOT NULL,
    activity_fees NUMERIC(14, 2) NOT NULL,
    material_fees NUMERIC(14, 2) NOT NULL,
    other_fees NUMERIC(14, 2) NOT NULL,
    frequency_discount_percent NUMERIC(5, 2) NOT NULL,
    frequency_discount_amount NUMERIC(14, 2) NOT NULL,
    sibling_order INTEGER NOT NULL CHECK (sibling_order >= 1),
    sibling_discount_percent NUMERIC(5, 2) NOT NULL,
    sibling_discount_amount NUMERIC(14, 2) NOT NULL,
    apply_sibling_to_all BOOLEAN NOT NULL,
    bursary_id UUID REFERENCES bursaries(id),
    bursary_amount NUMERIC(14, 2) NOT NULL,
    total_before_discounts NUMERIC(14, 2) NOT NULL,
    total_discounts NUMERIC(14, 2) NOT NULL,
    total_due NUMERIC(14, 2) NOT NULL CHECK (total_due >= 0),
    total_paid NUMERIC(14, 2) NOT NULL DEFAULT 0,
    balance NUMERIC(14, 2) NOT NULL CHECK (balance >= 0),
    credit_balance NUMERIC(14, 2) NOT NULL DEFAULT 0 CHECK (credit_balance >= 0),
    status VARCHAR(20) NOT NULL,
    due_date DATE NOT NULL,
    activity_charges JSONB NOT NULL DEFAULT '[]',
    version BIGINT NOT NULL DEFAULT 1,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    created_by UUID NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_by UUID NOT NULL,
    CONSTRAINT uq_student_fees_frequency
        UNIQUE (tenant_id, student_id, academic_year, frequency)
);

CREATE INDEX idx_student_fees_student ON student_fees(tenant_id, student_id);
CREATE INDEX idx_student_fees_bursary ON student_fees(bursary_id) WHERE bursary_id IS NOT NULL;

-- Payments against student fees
CREATE TABLE payments (
    id UUID PRIMARY KEY,
    tenant_id UUID NOT NULL,
    student_fee_id UUID NOT NULL REFERENCES student_fees(id),
    amount NUMERIC(14, 2) NOT NULL CHECK (amount > 0),
    method VARCHAR(20) NOT NULL,
    payment_date DATE NOT NULL,
    status VARCHAR(20) NOT NULL,
    receipt_number VARCHAR(40),
    external_reference VARCHAR(200),
    notes TEXT,
    failure_reason TEXT,
    refund_reason TEXT,
    completed_at TIMESTAMPTZ,
    cancelled_at TIMESTAMPTZ,
    refunded_at TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    created_by UUID NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_by UUID NOT NULL,
    CONSTRAINT chk_refund_reason CHECK (status <> 'refunded' OR refund_reason IS NOT NULL)
);

CREATE UNIQUE INDEX uq_payments_receipt
    ON payments(tenant_id, receipt_number)
    WHERE receipt_number IS NOT NULL;

CREATE INDEX idx_payments_fee ON payments(student_fee_id, created_at);

-- Receipt counters per tenant and year
CREATE TABLE receipt_sequences (
    tenant_id UUID NOT NULL,
    year INTEGER NOT NULL,
    last_value BIGINT NOT NULL,
    PRIMARY KEY (tenant_id, year)
);
";
