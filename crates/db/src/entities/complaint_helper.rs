//! Complaint helper entity (NGO engagement on a report).

use std::str::FromStr;

use civic_common::AppError;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Helper engagement status.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[derive(Default)]
pub enum HelperStatus {
    #[sea_orm(string_value = "HELPING")]
    #[default]
    Helping,
    #[sea_orm(string_value = "CONTACTED")]
    Contacted,
    #[sea_orm(string_value = "DECLINED")]
    Declined,
}

impl HelperStatus {
    /// Wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Helping => "HELPING",
            Self::Contacted => "CONTACTED",
            Self::Declined => "DECLINED",
        }
    }
}

impl FromStr for HelperStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HELPING" => Ok(Self::Helping),
            "CONTACTED" => Ok(Self::Contacted),
            "DECLINED" => Ok(Self::Declined),
            other => Err(AppError::Validation(format!("Invalid helper status: {other}"))),
        }
    }
}

/// At most one row per (`complaint_id`, `ngo_id`); enforced by a unique index.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "complaint_helper")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub complaint_id: String,

    pub ngo_id: String,

    pub status: HelperStatus,

    #[sea_orm(column_type = "Text", nullable)]
    pub message: Option<String>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::complaint::Entity",
        from = "Column::ComplaintId",
        to = "super::complaint::Column::Id",
        on_delete = "Cascade"
    )]
    Complaint,

    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::NgoId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Ngo,
}

impl Related<super::complaint::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Complaint.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Ngo.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
