use crate::{
    cart::CartLine,
    entities::{order, promo_code},
    errors::ServiceError,
};
use rust_decimal::{Decimal, RoundingStrategy};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};

/// Automatic loyalty reward: granted once a phone number has this many
/// prior successfully-paid orders.
pub const LOYALTY_ORDER_THRESHOLD: u64 = 5;
pub const LOYALTY_DISCOUNT_PERCENT: i32 = 15;

/// Authoritative price breakdown for a cart. Always recomputed server-side;
/// client-submitted totals are informational only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBreakdown {
    pub subtotal: Decimal,
    pub discount_amount: Decimal,
    pub delivery_fee: Decimal,
    pub total: Decimal,
}

/// Resolved discount source. At most one applies per order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Discount {
    /// Customer-supplied promo code, matched case-insensitively.
    Promo { code: String, percent: i32 },
    /// Automatic reward from purchase history.
    Loyalty { percent: i32 },
    None,
}

impl Discount {
    pub fn percent(&self) -> i32 {
        match self {
            Discount::Promo { percent, .. } | Discount::Loyalty { percent } => *percent,
            Discount::None => 0,
        }
    }

    /// Label recorded on the order (`promoCode` field): the matched code in
    /// upper case, or `LOYALTY` for the automatic reward.
    pub fn label(&self) -> Option<String> {
        match self {
            Discount::Promo { code, .. } => Some(code.to_uppercase()),
            Discount::Loyalty { .. } => Some("LOYALTY".to_string()),
            Discount::None => None,
        }
    }
}

/// Computes the payable total for a set of line snapshots.
///
/// `total = subtotal - discount + delivery fee`, with the discount rounded
/// half-up to whole currency units (KES has no cents in this model).
pub fn price(items: &[CartLine], discount_percent: i32, delivery_fee: Decimal) -> PriceBreakdown {
    let subtotal: Decimal = items
        .iter()
        .map(|line| line.price * Decimal::from(line.quantity))
        .sum();

    let discount_amount = (subtotal * Decimal::from(discount_percent) / Decimal::from(100))
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);

    PriceBreakdown {
        subtotal,
        discount_amount,
        delivery_fee,
        total: subtotal - discount_amount + delivery_fee,
    }
}

/// Resolves which discount (if any) applies to a checkout.
#[derive(Clone)]
pub struct PricingService {
    db: Arc<DatabaseConnection>,
}

impl PricingService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Precedence rule: an explicit code is resolved first and is final —
    /// a valid code yields its configured percentage, an invalid one is a
    /// hard failure (the storefront must show it, not silently fall back).
    /// Loyalty is consulted only when no code was supplied.
    #[instrument(skip(self))]
    pub async fn resolve_discount(
        &self,
        code: Option<&str>,
        phone: Option<&str>,
    ) -> Result<Discount, ServiceError> {
        let code = code.map(str::trim).filter(|c| !c.is_empty());
        let phone = phone.map(str::trim).filter(|p| !p.is_empty());

        if let Some(code) = code {
            return match self.find_promo_code(code).await? {
                Some(promo) => {
                    info!(code = %promo.code, percent = promo.discount_percent, "promo code applied");
                    Ok(Discount::Promo {
                        code: promo.code,
                        percent: promo.discount_percent,
                    })
                }
                None => Err(ServiceError::InvalidPromoCode),
            };
        }

        if let Some(phone) = phone {
            let successful = self.count_successful_orders(phone).await?;
            if successful >= LOYALTY_ORDER_THRESHOLD {
                info!(successful, "loyalty discount applied");
                return Ok(Discount::Loyalty {
                    percent: LOYALTY_DISCOUNT_PERCENT,
                });
            }
        }

        Ok(Discount::None)
    }

    /// Case-insensitive promo lookup. The code table is tiny (admin-curated),
    /// so the comparison happens in-process rather than in SQL.
    async fn find_promo_code(
        &self,
        code: &str,
    ) -> Result<Option<promo_code::Model>, ServiceError> {
        let codes = promo_code::Entity::find().all(&*self.db).await?;
        Ok(codes
            .into_iter()
            .find(|p| p.code.eq_ignore_ascii_case(code)))
    }

    async fn count_successful_orders(&self, phone: &str) -> Result<u64, ServiceError> {
        let count = order::Entity::find()
            .filter(order::Column::PhoneNumber.eq(phone))
            .filter(order::Column::PaymentStatus.eq("Successful"))
            .count(&*self.db)
            .await?;
        Ok(count)
    }
}
