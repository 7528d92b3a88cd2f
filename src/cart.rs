//! Shopper cart model.
//!
//! The storefront keeps the cart in browser-local storage between page
//! loads; the checkout request ships the full line snapshot to the server.
//! This module is the shared shape of that snapshot plus the mutation rules
//! the storefront applies. All operations are total: unknown product ids and
//! missing lines are no-ops, never errors.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single cart line, unique by `product_id` within a cart. Carries the
/// catalog snapshot (name, price, image, category) taken when the line was
/// added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: String,
    pub name: String,
    pub price: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub quantity: i32,
}

/// Catalog entry as the storefront sees it; the source of line snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    pub product_id: String,
    pub name: String,
    pub price: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one unit of `product_id`. Inserts a new line with quantity 1 on
    /// first add, increments the quantity afterwards. Unknown ids are
    /// silently ignored.
    pub fn add(&mut self, catalog: &[CatalogItem], product_id: &str) {
        if let Some(line) = self.line_mut(product_id) {
            line.quantity += 1;
            return;
        }
        if let Some(item) = catalog.iter().find(|i| i.product_id == product_id) {
            self.lines.push(CartLine {
                product_id: item.product_id.clone(),
                name: item.name.clone(),
                price: item.price,
                image: item.image.clone(),
                category: item.category.clone(),
                quantity: 1,
            });
        }
    }

    /// Drops the line entirely regardless of quantity. Absent lines are a
    /// no-op.
    pub fn remove(&mut self, product_id: &str) {
        self.lines.retain(|l| l.product_id != product_id);
    }

    /// Adds `delta` to the line's quantity; a result of zero or less removes
    /// the line. Absent lines are a no-op.
    pub fn set_quantity(&mut self, product_id: &str, delta: i32) {
        if let Some(line) = self.line_mut(product_id) {
            line.quantity += delta;
            if line.quantity <= 0 {
                self.remove(product_id);
            }
        }
    }

    /// Sum of `price * quantity` across all lines.
    pub fn total(&self) -> Decimal {
        self.lines
            .iter()
            .map(|l| l.price * Decimal::from(l.quantity))
            .sum()
    }

    /// Sum of quantities (the badge counter).
    pub fn count(&self) -> i32 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn into_lines(self) -> Vec<CartLine> {
        self.lines
    }

    fn line_mut(&mut self, product_id: &str) -> Option<&mut CartLine> {
        self.lines.iter_mut().find(|l| l.product_id == product_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn catalog() -> Vec<CatalogItem> {
        vec![
            CatalogItem {
                product_id: "1".into(),
                name: "Chicken Burger".into(),
                price: dec!(1000),
                image: None,
                category: Some("Fast Food".into()),
            },
            CatalogItem {
                product_id: "4".into(),
                name: "Pizza Pie".into(),
                price: dec!(300),
                image: None,
                category: Some("Snacks".into()),
            },
        ]
    }

    #[test]
    fn add_inserts_then_increments() {
        let mut cart = Cart::new();
        cart.add(&catalog(), "1");
        cart.add(&catalog(), "1");
        cart.add(&catalog(), "4");

        assert_eq!(cart.lines().len(), 2);
        assert_eq!(cart.lines()[0].quantity, 2);
        assert_eq!(cart.count(), 3);
        assert_eq!(cart.total(), dec!(2300));
    }

    #[test]
    fn add_unknown_product_is_a_no_op() {
        let mut cart = Cart::new();
        cart.add(&catalog(), "999");
        assert!(cart.is_empty());
    }

    #[test]
    fn remove_is_idempotent_for_missing_lines() {
        let mut cart = Cart::new();
        cart.add(&catalog(), "1");
        let before = cart.lines().to_vec();

        cart.remove("does-not-exist");
        assert_eq!(cart.lines(), before.as_slice());

        cart.remove("1");
        cart.remove("1");
        assert!(cart.is_empty());
    }

    #[test]
    fn set_quantity_removes_at_zero_or_below() {
        let mut cart = Cart::new();
        cart.add(&catalog(), "1");
        cart.set_quantity("1", 2);
        assert_eq!(cart.count(), 3);

        cart.set_quantity("1", -3);
        assert!(cart.is_empty());

        // delta against a missing line does nothing
        cart.set_quantity("1", 1);
        assert!(cart.is_empty());
    }

    #[test]
    fn totals_of_empty_cart_are_zero() {
        let cart = Cart::new();
        assert_eq!(cart.total(), Decimal::ZERO);
        assert_eq!(cart.count(), 0);
    }
}
