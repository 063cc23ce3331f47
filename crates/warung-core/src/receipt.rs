//! # Receipt Protocol Encoder
//!
//! Renders committed transactions and shift-close summaries into the raw
//! byte stream a thermal printer consumes: UTF-8 text interleaved with
//! ESC/POS control sequences for alignment, emphasis and paper feed.
//!
//! ## Row Layout
//! Given paper width `W` (32 columns on common 58mm stock), a label and a
//! right-aligned value:
//!
//! ```text
//! |Subtotal                Rp100.000|   label, gap spaces, value
//! |A very long product labe Rp9.000|   label truncated to W-len(value)-1
//! ```
//!
//! The value's last character always lands at column `W`; exactly one row
//! and one trailing `\n` per call. Totals printed here come straight off
//! the stored transaction, never recomputed, so a receipt can never
//! disagree with the ledger.

use chrono::{DateTime, Utc};

use crate::money::Money;
use crate::shift::{ShiftReconciliation, ShiftSession};
use crate::types::{PaymentMethod, Transaction, TransactionItem};

// =============================================================================
// Control Sequences
// =============================================================================

/// ESC @ - reset the printer to its power-on state.
pub const INIT: &[u8] = &[0x1B, 0x40];
/// ESC a 0 - left alignment.
pub const ALIGN_LEFT: &[u8] = &[0x1B, 0x61, 0x00];
/// ESC a 1 - center alignment.
pub const ALIGN_CENTER: &[u8] = &[0x1B, 0x61, 0x01];
/// ESC E 1 - emphasis on.
pub const BOLD_ON: &[u8] = &[0x1B, 0x45, 0x01];
/// ESC E 0 - emphasis off.
pub const BOLD_OFF: &[u8] = &[0x1B, 0x45, 0x00];

/// Default column count for narrow thermal stock.
pub const DEFAULT_WIDTH: usize = 32;

// =============================================================================
// Profile
// =============================================================================

/// Static store header/footer printed on every document.
#[derive(Debug, Clone)]
pub struct ReceiptProfile {
    pub store_name: String,
    pub address: Option<String>,
    pub footer: Option<String>,
    /// Paper width in columns; 30-32 in practice.
    pub width: usize,
}

impl Default for ReceiptProfile {
    fn default() -> Self {
        ReceiptProfile {
            store_name: "WARUNG".to_string(),
            address: None,
            footer: Some("Terima kasih".to_string()),
            width: DEFAULT_WIDTH,
        }
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Accumulates text and control bytes. All width math is in characters,
/// not bytes, so multi-byte names line up on the paper.
#[derive(Debug)]
pub struct ReceiptBuilder {
    width: usize,
    buf: Vec<u8>,
}

impl ReceiptBuilder {
    pub fn new(width: usize) -> Self {
        ReceiptBuilder {
            width,
            buf: Vec::with_capacity(512),
        }
    }

    pub fn init(&mut self) -> &mut Self {
        self.buf.extend_from_slice(INIT);
        self
    }

    pub fn center(&mut self) -> &mut Self {
        self.buf.extend_from_slice(ALIGN_CENTER);
        self
    }

    pub fn left(&mut self) -> &mut Self {
        self.buf.extend_from_slice(ALIGN_LEFT);
        self
    }

    pub fn bold_on(&mut self) -> &mut Self {
        self.buf.extend_from_slice(BOLD_ON);
        self
    }

    pub fn bold_off(&mut self) -> &mut Self {
        self.buf.extend_from_slice(BOLD_OFF);
        self
    }

    /// One line of text plus the terminator.
    pub fn line(&mut self, text: &str) -> &mut Self {
        self.buf.extend_from_slice(text.as_bytes());
        self.buf.push(b'\n');
        self
    }

    /// Full-width dashed divider.
    pub fn divider(&mut self) -> &mut Self {
        let dashes: String = std::iter::repeat('-').take(self.width).collect();
        self.line(&dashes)
    }

    /// `n` blank feed lines (paper advance before tear-off).
    pub fn feed(&mut self, n: usize) -> &mut Self {
        for _ in 0..n {
            self.buf.push(b'\n');
        }
        self
    }

    /// Label on the left, value right-aligned so its last character lands
    /// at the final column. The label is truncated when the pair would
    /// overflow; the value is never shortened.
    pub fn row(&mut self, label: &str, value: &str) -> &mut Self {
        let value_len = value.chars().count();
        let label_budget = self.width.saturating_sub(value_len + 1);
        let label: String = label.chars().take(label_budget).collect();
        let pad = self.width.saturating_sub(label.chars().count() + value_len);
        let spaces: String = std::iter::repeat(' ').take(pad).collect();
        self.buf.extend_from_slice(label.as_bytes());
        self.buf.extend_from_slice(spaces.as_bytes());
        self.buf.extend_from_slice(value.as_bytes());
        self.buf.push(b'\n');
        self
    }

    pub fn take(self) -> Vec<u8> {
        self.buf
    }
}

// =============================================================================
// Documents
// =============================================================================

/// Encodes a sale receipt for a committed transaction.
pub fn render_transaction(
    profile: &ReceiptProfile,
    tx: &Transaction,
    items: &[TransactionItem],
) -> Vec<u8> {
    let mut b = ReceiptBuilder::new(profile.width);
    b.init();

    b.center().bold_on().line(&profile.store_name).bold_off();
    if let Some(address) = &profile.address {
        b.line(address);
    }
    b.left().divider();
    b.row(
        &tx.created_at.format("%d/%m/%Y %H:%M").to_string(),
        &short_id(&tx.id),
    );
    b.divider();

    for item in items {
        b.line(&item.name);
        b.row(
            &format!("  {} x {}", item.quantity, item.unit_price_money()),
            &item.line_total_money().to_string(),
        );
    }

    b.divider();
    b.row("Subtotal", &Money::new(tx.subtotal).to_string());
    if tx.discount != 0 {
        // Discounts are shown as a negative amount, not parentheses.
        b.row("Diskon", &(-Money::new(tx.discount)).to_string());
    }
    if tx.tax != 0 {
        b.row("Pajak", &Money::new(tx.tax).to_string());
    }
    b.bold_on().row("TOTAL", &tx.total_money().to_string()).bold_off();
    b.row(tx.payment_method.label(), &Money::new(tx.cash_received).to_string());
    if tx.payment_method.is_cash() {
        b.row("Kembali", &tx.change_money().to_string());
    }

    if let Some(footer) = &profile.footer {
        b.divider();
        b.center().line(footer).left();
    }
    b.feed(3);
    b.take()
}

/// Encodes the shift-close summary slip: per-method totals plus the cash
/// reconciliation.
pub fn render_shift_close(
    profile: &ReceiptProfile,
    session: &ShiftSession,
    recon: &ShiftReconciliation,
    closed_at: DateTime<Utc>,
) -> Vec<u8> {
    let mut b = ReceiptBuilder::new(profile.width);
    b.init();

    b.center()
        .bold_on()
        .line(&profile.store_name)
        .line("TUTUP SHIFT")
        .bold_off()
        .left()
        .divider();

    b.row("Kasir", &session.cashier);
    b.row("Buka", &session.opened_at.format("%d/%m/%Y %H:%M").to_string());
    b.row("Tutup", &closed_at.format("%d/%m/%Y %H:%M").to_string());
    b.row("Transaksi", &session.transaction_count.to_string());
    b.divider();

    b.row("Modal", &session.opening_float.to_string());
    b.row(PaymentMethod::Cash.label(), &session.totals.cash.to_string());
    b.row(PaymentMethod::Qris.label(), &session.totals.qris.to_string());
    b.row(PaymentMethod::Debit.label(), &session.totals.debit.to_string());
    b.row(
        PaymentMethod::Transfer.label(),
        &session.totals.transfer.to_string(),
    );
    b.row("BON lunas", &session.totals.receivable_paid.to_string());
    b.row("BON belum", &session.totals.receivable_unpaid.to_string());
    b.divider();

    b.row("Kas seharusnya", &recon.expected.to_string());
    b.row("Kas dihitung", &recon.actual.to_string());
    b.bold_on()
        .row("Selisih", &recon.difference.to_string())
        .bold_off();

    b.feed(3);
    b.take()
}

/// First segment of a UUID, enough to match a receipt to its row.
fn short_id(id: &str) -> String {
    id.split('-').next().unwrap_or(id).to_uppercase()
}

// =============================================================================
// Unit Tests
// =============================================================================
