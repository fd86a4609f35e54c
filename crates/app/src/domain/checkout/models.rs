//! Checkout Models

use std::fmt;

use atelier::{ids::TypedId, records::ProductId};
use serde::Serialize;

use crate::domain::carts::models::UserId;

/// Order identifier.
pub type OrderId = TypedId<Order>;

/// Payment methods accepted by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PaymentMethod {
    #[serde(rename = "CASH_ON_DELIVERY")]
    CashOnDelivery,
    #[serde(rename = "PAYMENT_SLIP")]
    PaymentSlip,
}

/// Shipping and payment details for order creation.
///
/// Serializes directly as the store's order-creation body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderForm {
    pub user_id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub country: String,
    pub postal_code: String,
    pub phone_number: String,
    pub home_address: String,
    pub email_address: String,
    pub payment_method: PaymentMethod,
}

impl OrderForm {
    /// Check that every required field is present, mirroring the store's
    /// own validation so bad input never reaches a mutating step.
    pub(crate) fn validate(&self) -> Result<(), String> {
        let required = [
            (&self.first_name, "first name"),
            (&self.last_name, "last name"),
            (&self.country, "country"),
            (&self.postal_code, "postal code"),
            (&self.phone_number, "phone number"),
            (&self.home_address, "home address"),
            (&self.email_address, "email address"),
        ];

        for (value, label) in required {
            if value.trim().is_empty() {
                return Err(format!("{label} is required"));
            }
        }

        Ok(())
    }
}

/// A payment slip reference, submitted against a created order either as an
/// uploaded file or as an external URL.
#[derive(Clone)]
pub enum PaymentSlip {
    Upload { filename: String, bytes: Vec<u8> },
    Url(String),
}

const SLIP_EXTENSIONS: [&str; 4] = [".pdf", ".png", ".jpg", ".jpeg"];

impl PaymentSlip {
    /// Check the slip against the store's accepted formats.
    pub(crate) fn validate(&self) -> Result<(), String> {
        match self {
            Self::Upload { filename, bytes } => {
                if bytes.is_empty() {
                    return Err("payment slip file is empty".to_string());
                }

                let lower = filename.to_lowercase();

                if SLIP_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)) {
                    Ok(())
                } else {
                    Err("payment slip must be a PDF, PNG, or JPG file".to_string())
                }
            }
            Self::Url(url) => {
                let trimmed = url.trim();

                if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
                    Ok(())
                } else {
                    Err("payment slip url must start with http:// or https://".to_string())
                }
            }
        }
    }
}

impl fmt::Debug for PaymentSlip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Upload { filename, bytes } => f
                .debug_struct("Upload")
                .field("filename", filename)
                .field("bytes", &bytes.len())
                .finish(),
            Self::Url(url) => f.debug_tuple("Url").field(url).finish(),
        }
    }
}

/// A created order as returned by the store.
#[derive(Debug, Clone)]
pub struct Order {
    pub order_id: OrderId,
    pub items: Vec<OrderLineItem>,
}

/// One line of a created order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderLineItem {
    pub product_id: ProductId,
    pub quantity: u32,
    pub color: Option<String>,
    pub size: Option<String>,
}

/// States of the checkout transaction machine. Transitions are strictly
/// forward; any side-effecting step can escape to `Failed` through its
/// compensating action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutState {
    Init,
    SnapshotTaken,
    Isolated,
    OrderCreated,
    SlipSubmitted,
    Restored,
    Failed,
}

impl CheckoutState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::SnapshotTaken => "snapshot_taken",
            Self::Isolated => "isolation",
            Self::OrderCreated => "order_creation",
            Self::SlipSubmitted => "slip_submission",
            Self::Restored => "restoration",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for CheckoutState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of the optional payment-slip step.
#[derive(Debug)]
pub enum SlipOutcome {
    /// No slip was supplied.
    NotRequested,
    /// The slip was registered against the order.
    Submitted,
    /// Submission failed. The order stands; this is reported, not unwound.
    Failed(crate::client::StoreError),
}

/// A completed checkout: the created order plus the slip step's outcome.
#[derive(Debug)]
pub struct CheckoutReceipt {
    pub order: Order,
    pub slip: SlipOutcome,
}
