use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Database entity for shopper accounts
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    #[sea_orm(unique)]
    pub email: String,
    #[sea_orm(column_type = "Text")]
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "crate::entities::commerce::cart_item::Entity")]
    CartItem,
    #[sea_orm(has_many = "crate::entities::commerce::payment_order::Entity")]
    PaymentOrder,
}

impl Related<crate::entities::commerce::cart_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CartItem.def()
    }
}

impl Related<crate::entities::commerce::payment_order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PaymentOrder.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
