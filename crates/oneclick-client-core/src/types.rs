//! Core records shared by every surface of the client.
//!
//! These mirror the backend's row shapes. Field names follow the wire format
//! where the two disagree (`isAdmin`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user row as the directory stores it. Writers always replace the whole
/// snapshot, so there are no partial-update variants of this type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub email: String,
    pub name: String,
    #[serde(rename = "isAdmin", default)]
    pub is_admin: bool,
    #[serde(default)]
    pub tokens: u64,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default)]
    pub is_banned: bool,
    /// Inline Data-URI blob, not an object-storage reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A purchasable token bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    pub id: String,
    pub name: String,
    pub tokens: u64,
    /// Price in whole currency units (BDT).
    pub price: u64,
}

/// Editable fields of a package, used for both create and update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageDraft {
    pub name: String,
    pub tokens: u64,
    pub price: u64,
}

/// The closed set of mobile-payment providers the checkout form offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentMethod {
    Bkash,
    Nagad,
    Rocket,
    Upay,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 4] = [
        PaymentMethod::Bkash,
        PaymentMethod::Nagad,
        PaymentMethod::Rocket,
        PaymentMethod::Upay,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Bkash => "Bkash",
            PaymentMethod::Nagad => "Nagad",
            PaymentMethod::Rocket => "Rocket",
            PaymentMethod::Upay => "Upay",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "Bkash" => Some(PaymentMethod::Bkash),
            "Nagad" => Some(PaymentMethod::Nagad),
            "Rocket" => Some(PaymentMethod::Rocket),
            "Upay" => Some(PaymentMethod::Upay),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Rejected,
}

/// A payment-proof submission as the directory stores it. Approval happens
/// out of band in the admin console; the client never settles anything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub user_id: String,
    pub user_email: String,
    pub package_id: String,
    pub package_name: String,
    /// Claimed amount, copied from the package price at submission time.
    pub amount: u64,
    pub tokens: u64,
    pub payment_method: PaymentMethod,
    /// User-entered provider transaction reference.
    pub trx_id: String,
    /// Inline Data-URI screenshot of the payment, if attached.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
}

/// Draft for a new payment submission. Id, status, and timestamp are assigned
/// by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTransaction {
    pub user_id: String,
    pub user_email: String,
    pub package_id: String,
    pub package_name: String,
    pub amount: u64,
    pub tokens: u64,
    pub payment_method: PaymentMethod,
    pub trx_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// One audit-trail entry. Every admin mutation appends exactly one of these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityLog {
    pub id: String,
    pub admin_email: String,
    pub action: String,
    pub detail: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityLogDraft {
    pub admin_email: String,
    pub action: String,
    pub detail: String,
}

/// Aggregates for the admin analytics tab.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminStats {
    pub total_revenue: u64,
    pub users_today: u64,
    pub sales_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_package: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity_json() -> &'static str {
        r#"{
            "id": "u1",
            "email": "a@b.c",
            "name": "Ana",
            "isAdmin": true,
            "tokens": 7,
            "is_verified": true,
            "is_banned": false,
            "created_at": "2026-01-15T10:00:00Z"
        }"#
    }

    #[test]
    fn identity_reads_wire_admin_flag() {
        let id: Identity = serde_json::from_str(identity_json()).expect("parse");
        assert!(id.is_admin);
        assert_eq!(id.tokens, 7);
        assert_eq!(id.avatar_url, None);
    }

    #[test]
    fn identity_defaults_optional_flags() {
        let raw = r#"{
            "id": "u2",
            "email": "x@y.z",
            "name": "Max",
            "created_at": "2026-01-15T10:00:00Z"
        }"#;
        let id: Identity = serde_json::from_str(raw).expect("parse");
        assert!(!id.is_admin);
        assert!(!id.is_banned);
        assert_eq!(id.tokens, 0);
    }

    #[test]
    fn payment_method_round_trips_labels() {
        for method in PaymentMethod::ALL {
            assert_eq!(PaymentMethod::parse(method.as_str()), Some(method));
        }
        assert_eq!(PaymentMethod::parse(" Bkash "), Some(PaymentMethod::Bkash));
        assert_eq!(PaymentMethod::parse("PayPal"), None);
    }

    #[test]
    fn transaction_status_uses_lowercase_wire_names() {
        let status: TransactionStatus = serde_json::from_str("\"pending\"").expect("parse");
        assert_eq!(status, TransactionStatus::Pending);
        assert_eq!(
            serde_json::to_string(&TransactionStatus::Completed).expect("serialize"),
            "\"completed\""
        );
    }
}
