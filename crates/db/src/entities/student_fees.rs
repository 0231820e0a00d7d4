//! `SeaORM` Entity for student_fees table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "student_fees")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub student_id: Uuid,
    pub academic_year: String,
    pub frequency: String,
    pub fee_structure_id: Uuid,
    pub grade_level: i16,
    pub base_tuition: Decimal,
    pub activity_fees: Decimal,
    pub material_fees: Decimal,
    pub other_fees: Decimal,
    pub frequency_discount_percent: Decimal,
    pub frequency_discount_amount: Decimal,
    pub sibling_order: i32,
    pub sibling_discount_percent: Decimal,
    pub sibling_discount_amount: Decimal,
    pub apply_sibling_to_all: bool,
    pub bursary_id: Option<Uuid>,
    pub bursary_amount: Decimal,
    pub total_before_discounts: Decimal,
    pub total_discounts: Decimal,
    pub total_due: Decimal,
    pub total_paid: Decimal,
    pub balance: Decimal,
    pub credit_balance: Decimal,
    pub status: String,
    pub due_date: Date,
    #[sea_orm(column_type = "JsonBinary")]
    pub activity_charges: Json,
    pub version: i64,
    pub created_at: DateTimeWithTimeZone,
    pub created_by: Uuid,
    pub updated_at: DateTimeWithTimeZone,
    pub updated_by: Uuid,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::fee_structures::Entity",
        from = "Column::FeeStructureId",
        to = "super::fee_structures::Column::Id"
    )]
    FeeStructures,
    #[sea_orm(
        belongs_to = "super::bursaries::Entity",
        from = "Column::BursaryId",
        to = "super::bursaries::Column::Id"
    )]
    Bursaries,
    #[sea_orm(has_many = "super::payments::Entity")]
    Payments,
}

impl Related<super::fee_structures::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FeeStructures.def()
    }
}

impl Related<super::bursaries::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Bursaries.def()
    }
}

impl Related<super::payments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
