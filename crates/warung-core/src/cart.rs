//! # Cart / Pricing Engine
//!
//! The in-memory cart for the active POS session and its pricing math.
//!
//! ## Behavior
//! ```text
//! add_line(product, qty)   merge into existing line or append; rejects
//!                          quantities the stock snapshot cannot cover
//! decrement_line(id)       qty − 1; drops the line at zero; missing id
//!                          is a no-op
//! remove_line(id)          drops the line; missing id is a no-op
//! totals(discount, tax)    discount = 10% of subtotal (toggle)
//!                          tax      = 10% of (subtotal − discount) (toggle)
//!                          total    = subtotal − discount + tax
//! ```
//!
//! The discount-before-tax order is fixed: tax is always computed on the
//! post-discount amount. Both are flat 10% toggles, not a general pricing
//! engine.
//!
//! The cart never touches persistent storage. Stock checks here run against
//! the snapshot taken when the product was added; the checkout committer
//! re-checks live inventory at commit time.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{PaymentMethod, Product};
use crate::{DISCOUNT_BPS, TAX_BPS};

// =============================================================================
// Cart Line
// =============================================================================

/// A product snapshot plus a quantity (≥ 1).
///
/// Prices and the available stock count are frozen at the moment the
/// product is added, so a concurrent product edit cannot change an open
/// cart under the cashier's hands.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: String,

    /// Product name at time of adding (frozen).
    pub name: String,

    /// Unit sell price at time of adding (frozen).
    pub unit_price: i64,

    /// Unit cost at time of adding (frozen, for profit).
    pub unit_cost: i64,

    /// Stock snapshot at time of adding; upper bound for the quantity.
    pub available: i64,

    pub quantity: i64,
}

impl CartLine {
    fn from_product(product: &Product, quantity: i64) -> Self {
        CartLine {
            product_id: product.id.clone(),
            name: product.name.clone(),
            unit_price: product.sell_price,
            unit_cost: product.cost_price,
            available: product.stock,
            quantity,
        }
    }

    /// unit_price × quantity.
    #[inline]
    pub fn line_total(&self) -> Money {
        Money::new(self.unit_price).times(self.quantity)
    }

    /// (sell − cost) × quantity.
    #[inline]
    pub fn line_profit(&self) -> Money {
        Money::new(self.unit_price - self.unit_cost).times(self.quantity)
    }
}

// =============================================================================
// Totals
// =============================================================================

/// Aggregates for the current cart under the active toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartTotals {
    pub subtotal: Money,
    pub discount: Money,
    pub tax: Money,
    pub total: Money,
}

// =============================================================================
// Cart
// =============================================================================

/// The ordered cart of the active session. One cart per terminal; owned
/// exclusively by the session, so no locking is needed inside.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    pub fn new() -> Self {
        Cart { lines: Vec::new() }
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Total quantity across all lines.
    pub fn total_quantity(&self) -> i64 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    /// Adds a product, merging into an existing line for the same product.
    ///
    /// Fails with [`CoreError::OutOfStock`] when the product has no stock
    /// or the merged quantity would exceed the stock snapshot.
    pub fn add_line(&mut self, product: &Product, quantity: i64) -> CoreResult<()> {
        if quantity < 1 {
            return Err(CoreError::InvalidQuantity(quantity));
        }
        if product.stock <= 0 {
            return Err(CoreError::OutOfStock {
                name: product.name.clone(),
                available: product.stock,
                requested: quantity,
            });
        }

        if let Some(line) = self.lines.iter_mut().find(|l| l.product_id == product.id) {
            let merged = line.quantity + quantity;
            if merged > line.available {
                return Err(CoreError::OutOfStock {
                    name: line.name.clone(),
                    available: line.available,
                    requested: merged,
                });
            }
            line.quantity = merged;
            return Ok(());
        }

        if quantity > product.stock {
            return Err(CoreError::OutOfStock {
                name: product.name.clone(),
                available: product.stock,
                requested: quantity,
            });
        }

        self.lines.push(CartLine::from_product(product, quantity));
        Ok(())
    }

    /// Reduces a line's quantity by one, dropping it at zero. A missing
    /// product id is a no-op.
    pub fn decrement_line(&mut self, product_id: &str) {
        if let Some(pos) = self.lines.iter().position(|l| l.product_id == product_id) {
            if self.lines[pos].quantity > 1 {
                self.lines[pos].quantity -= 1;
            } else {
                self.lines.remove(pos);
            }
        }
    }

    /// Deletes a line. A missing product id is a no-op.
    pub fn remove_line(&mut self, product_id: &str) {
        self.lines.retain(|l| l.product_id != product_id);
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Sum of line totals, before discount and tax.
    pub fn subtotal(&self) -> Money {
        self.lines.iter().map(|l| l.line_total()).sum()
    }

    /// Realized profit if this cart sells: Σ (sell − cost) × qty.
    pub fn profit(&self) -> Money {
        self.lines.iter().map(|l| l.line_profit()).sum()
    }

    /// Computes the aggregates under the given toggles. Discount applies
    /// to the subtotal; tax applies to the post-discount amount.
    pub fn totals(&self, discount_active: bool, tax_active: bool) -> CartTotals {
        let subtotal = self.subtotal();
        let discount = if discount_active {
            subtotal.percentage(DISCOUNT_BPS)
        } else {
            Money::zero()
        };
        let taxable = subtotal - discount;
        let tax = if tax_active {
            taxable.percentage(TAX_BPS)
        } else {
            Money::zero()
        };
        CartTotals {
            subtotal,
            discount,
            tax,
            total: taxable + tax,
        }
    }

    /// Validates payment input and freezes the cart into a commit-ready
    /// draft. The cart itself is left untouched; the committer clears it
    /// only after the database transaction succeeds.
    pub fn checkout_draft(
        &self,
        discount_active: bool,
        tax_active: bool,
        payment_method: PaymentMethod,
        cash_received: Money,
    ) -> CoreResult<CheckoutDraft> {
        if self.is_empty() {
            return Err(CoreError::EmptyCart);
        }

        let totals = self.totals(discount_active, tax_active);

        // Cash must cover the total; every other method settles exactly at
        // the total, so the received amount is coerced and change is zero.
        let (received, change) = if payment_method.is_cash() {
            if cash_received < totals.total {
                return Err(CoreError::InsufficientPayment {
                    total: totals.total,
                    received: cash_received,
                });
            }
            (cash_received, cash_received - totals.total)
        } else {
            (totals.total, Money::zero())
        };

        Ok(CheckoutDraft {
            lines: self.lines.clone(),
            totals,
            payment_method,
            cash_received: received,
            change,
            profit: self.profit(),
        })
    }
}

// =============================================================================
// Checkout Draft
// =============================================================================

/// Everything the committer needs, computed purely. Ids and timestamps are
/// assigned at commit time.
#[derive(Debug, Clone)]
pub struct CheckoutDraft {
    pub lines: Vec<CartLine>,
    pub totals: CartTotals,
    pub payment_method: PaymentMethod,
    pub cash_received: Money,
    pub change: Money,
    pub profit: Money,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn product(id: &str, sell: i64, cost: i64, stock: i64) -> Product {
        Product {
            id: id.to_string(),
            name: format!("Product {id}"),
            category: "umum".to_string(),
            barcode: None,
            sell_price: sell,
            cost_price: cost,
            stock,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn add_merges_existing_line() {
        let mut cart = Cart::new();
        let p = product("a", 10_000, 7_000, 10);

        cart.add_line(&p, 2).unwrap();
        cart.add_line(&p, 3).unwrap();

        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.total_quantity(), 5);
        assert_eq!(cart.subtotal().amount(), 50_000);
    }

    #[test]
    fn add_rejects_zero_stock() {
        let mut cart = Cart::new();
        let p = product("a", 10_000, 7_000, 0);

        let err = cart.add_line(&p, 1).unwrap_err();
        assert!(matches!(err, CoreError::OutOfStock { available: 0, .. }));
    }

    #[test]
    fn merged_quantity_cannot_exceed_snapshot() {
        let mut cart = Cart::new();
        let p = product("a", 10_000, 7_000, 3);

        cart.add_line(&p, 2).unwrap();
        let err = cart.add_line(&p, 2).unwrap_err();
        assert_eq!(
            err,
            CoreError::OutOfStock {
                name: "Product a".to_string(),
                available: 3,
                requested: 4,
            }
        );
        // Failed add leaves the line unchanged.
        assert_eq!(cart.total_quantity(), 2);
    }

    #[test]
    fn decrement_and_remove_never_fail() {
        let mut cart = Cart::new();
        let p = product("a", 10_000, 7_000, 5);
        cart.add_line(&p, 2).unwrap();

        cart.decrement_line("a");
        assert_eq!(cart.total_quantity(), 1);
        cart.decrement_line("a");
        assert!(cart.is_empty());

        // No-ops on missing ids.
        cart.decrement_line("ghost");
        cart.remove_line("ghost");
    }

    #[test]
    fn totals_discount_before_tax() {
        let mut cart = Cart::new();
        let p = product("a", 100_000, 60_000, 10);
        cart.add_line(&p, 1).unwrap();

        // subtotal 100.000 → discount 10.000 → tax 10% of 90.000 = 9.000
        let t = cart.totals(true, true);
        assert_eq!(t.subtotal.amount(), 100_000);
        assert_eq!(t.discount.amount(), 10_000);
        assert_eq!(t.tax.amount(), 9_000);
        assert_eq!(t.total.amount(), 99_000);

        // Tax alone is computed on the raw subtotal only because the
        // discount is zero, not because the order changed.
        let t = cart.totals(false, true);
        assert_eq!(t.tax.amount(), 10_000);
        assert_eq!(t.total.amount(), 110_000);

        let t = cart.totals(false, false);
        assert_eq!(t.total.amount(), 100_000);
    }

    #[test]
    fn totals_identity_holds() {
        let mut cart = Cart::new();
        cart.add_line(&product("a", 12_345, 9_000, 99), 3).unwrap();
        cart.add_line(&product("b", 6_789, 5_000, 99), 7).unwrap();

        for (d, t) in [(false, false), (true, false), (false, true), (true, true)] {
            let totals = cart.totals(d, t);
            assert_eq!(
                totals.total,
                totals.subtotal - totals.discount + totals.tax,
                "identity must hold for toggles ({d}, {t})"
            );
        }
    }

    #[test]
    fn draft_rejects_empty_cart() {
        let cart = Cart::new();
        let err = cart
            .checkout_draft(false, false, PaymentMethod::Cash, Money::new(10_000))
            .unwrap_err();
        assert_eq!(err, CoreError::EmptyCart);
    }

    #[test]
    fn draft_rejects_short_cash() {
        let mut cart = Cart::new();
        cart.add_line(&product("a", 100_000, 60_000, 10), 1).unwrap();

        let err = cart
            .checkout_draft(true, true, PaymentMethod::Cash, Money::new(90_000))
            .unwrap_err();
        assert_eq!(
            err,
            CoreError::InsufficientPayment {
                total: Money::new(99_000),
                received: Money::new(90_000),
            }
        );
    }

    #[test]
    fn draft_computes_change_for_cash() {
        let mut cart = Cart::new();
        cart.add_line(&product("a", 30_000, 20_000, 10), 1).unwrap();

        let draft = cart
            .checkout_draft(false, false, PaymentMethod::Cash, Money::new(50_000))
            .unwrap();
        assert_eq!(draft.cash_received.amount(), 50_000);
        assert_eq!(draft.change.amount(), 20_000);
        assert_eq!(draft.profit.amount(), 10_000);
        // The cart survives until the commit succeeds.
        assert!(!cart.is_empty());
    }

    #[test]
    fn draft_coerces_non_cash_to_total() {
        let mut cart = Cart::new();
        cart.add_line(&product("a", 30_000, 20_000, 10), 2).unwrap();

        let draft = cart
            .checkout_draft(false, false, PaymentMethod::Qris, Money::new(1))
            .unwrap();
        assert_eq!(draft.cash_received.amount(), 60_000);
        assert_eq!(draft.change.amount(), 0);
    }
}
