//! User entity.

use std::str::FromStr;

use civic_common::AppError;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Platform role. Every authorization decision matches on this exhaustively.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    #[sea_orm(string_value = "CITIZEN")]
    Citizen,
    #[sea_orm(string_value = "NGO")]
    Ngo,
    #[sea_orm(string_value = "ADMIN")]
    Admin,
}

impl UserRole {
    /// Wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Citizen => "CITIZEN",
            Self::Ngo => "NGO",
            Self::Admin => "ADMIN",
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CITIZEN" => Ok(Self::Citizen),
            "NGO" => Ok(Self::Ngo),
            "ADMIN" => Ok(Self::Admin),
            other => Err(AppError::Validation(format!("Unknown role: {other}"))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub name: String,

    #[sea_orm(unique)]
    pub email: String,

    /// Argon2 PHC string. Operator-provisioned admins may hold plaintext here.
    #[serde(skip_serializing)]
    pub password_hash: String,

    #[sea_orm(nullable)]
    pub phone: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub address: Option<String>,

    pub role: UserRole,

    /// NGO only
    #[sea_orm(nullable)]
    pub organization: Option<String>,

    /// NGO only. Captured at registration, not applied as a report filter.
    #[sea_orm(nullable)]
    pub service_area: Option<String>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::complaint::Entity")]
    Complaints,

    #[sea_orm(has_many = "super::complaint_helper::Entity")]
    Helping,
}

impl Related<super::complaint::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Complaints.def()
    }
}

impl Related<super::complaint_helper::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Helping.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
