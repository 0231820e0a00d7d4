//! `SeaORM` Entity for fee_structures table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "fee_structures")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub school_id: Uuid,
    pub grade_level: i16,
    pub academic_year: String,
    pub monthly_base_amount: Option<Decimal>,
    pub monthly_discount_percent: Option<Decimal>,
    pub termly_base_amount: Option<Decimal>,
    pub termly_discount_percent: Option<Decimal>,
    pub yearly_base_amount: Option<Decimal>,
    pub yearly_discount_percent: Option<Decimal>,
    pub material_fee: Decimal,
    pub other_fees: Decimal,
    pub sibling_discount_second: Decimal,
    pub sibling_discount_third: Decimal,
    pub sibling_discount_fourth_plus: Decimal,
    pub apply_sibling_to_all: bool,
    pub is_active: bool,
    pub created_at: DateTimeWithTimeZone,
    pub created_by: Uuid,
    pub updated_at: DateTimeWithTimeZone,
    pub updated_by: Uuid,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::student_fees::Entity")]
    StudentFees,
}

impl Related<super::student_fees::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StudentFees.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
