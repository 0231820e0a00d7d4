//! `SeaORM` Entity for bursaries table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "bursaries")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub bursary_type: String,
    pub coverage_type: String,
    pub coverage_value: Decimal,
    pub min_grade: i16,
    pub max_grade: i16,
    pub academic_year: String,
    pub application_deadline: Option<Date>,
    pub max_recipients: i32,
    pub current_recipients: i32,
    pub is_active: bool,
    pub version: i64,
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
