//! Outbound reply texts. WhatsApp renders `*bold*` natively, so these are
//! plain strings with WhatsApp markdown, no HTML.

use crate::domain::VendorCode;
use crate::ports::{Confirmation, SubmitError};

fn field(v: &Option<String>) -> &str {
    v.as_deref().filter(|s| !s.trim().is_empty()).unwrap_or("-")
}

/// Confirmation sent back to the originating sender after a successful
/// catalog submission.
pub fn format_confirmation(c: &Confirmation) -> String {
    format!(
        "✅ *Product uploaded to the catalog!*\n\
         \n\
         🛍️ *Title*: {title}\n\
         🏷️ *Category*: {category}\n\
         📦 *Collections*: {collections}\n\
         💰 *Price*: ₹{price} (Compare at ₹{compare})\n\
         📏 *Size*: {size}\n\
         🔖 *Tags*: {tags}\n\
         🔢 *SKU*: {sku}\n\
         🛠️ *Vendor*: {vendor}\n\
         📌 *Status*: {status}",
        title = field(&c.title),
        category = field(&c.category),
        collections = field(&c.collections),
        price = field(&c.price),
        compare = field(&c.compare_at_price),
        size = field(&c.size),
        tags = field(&c.tags),
        sku = field(&c.sku),
        vendor = field(&c.vendor),
        status = field(&c.status),
    )
}

/// Failure notice. Senders are always told when a product did not make it
/// to the catalog; the record itself is gone either way.
pub fn format_submit_failure(err: &SubmitError) -> String {
    match err {
        SubmitError::Rejected(msg) => {
            format!("❌ *Product not saved*\n\nThe catalog rejected it: {msg}")
        }
        SubmitError::Transport(msg) => {
            format!("❌ *Product not saved*\n\nCould not reach the catalog ({msg}). Please resend later.")
        }
    }
}

/// Acknowledgment for the explicit start command.
pub fn format_start_ack(vendor: &VendorCode, discarded_previous: bool) -> String {
    if discarded_previous {
        format!("🆕 Previous draft discarded. New product started (vendor: {vendor}).")
    } else {
        format!("🆕 New product started (vendor: {vendor}).")
    }
}
