use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Permanent audit mirror of an order. Created in the same transaction as
/// the live record, field-updated (never re-appended) on every order
/// mutation, and retained forever — deleting the live order only stamps
/// this row with the "Deleted (Admin)" status.
///
/// Read by reporting/export collaborators only; the storefront never sees it.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "order_log")]
pub struct Model {
    /// Same natural key as the live order.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub customer_name: String,
    pub phone_number: String,
    pub location: String,
    pub lat: Option<String>,
    pub lng: Option<String>,
    pub notes: Option<String>,

    /// Item snapshot as JSON; the log is self-contained once the live
    /// order and its item rows are gone.
    pub items: Json,

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
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
