use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Live order record. Deleted by the admin delete path; the permanent copy
/// lives in `order_log`.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    /// Format `ORD-<unix-millis>`, generated at creation, immutable.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub customer_name: String,
    pub phone_number: String,
    pub location: String,
    pub lat: Option<String>,
    pub lng: Option<String>,
    pub notes: Option<String>,

    pub subtotal: Decimal,
    pub discount_amount: Decimal,
    pub delivery_fee: Decimal,
    pub total_amount: Decimal,
    pub promo_code: Option<String>,

    pub payment_method: String,
    pub status: String,
    pub payment_status: String,

    pub assigned_rider_id: Option<String>,
    pub estimated_time: Option<String>,
    pub rating: Option<i32>,
    pub feedback: Option<String>,

    pub date: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_item::Entity")]
    OrderItem,
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItem.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
