//! Defines the payment read model, write model and client input types.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    category::{CategoryId, CategoryName},
    validation::{Violations, validate},
};

/// Database identifier for a payment.
pub type PaymentId = i64;

/// The longest payment name allowed, in bytes.
pub const MAX_NAME_BYTES: usize = 500;

/// A payment as read back from the database.
///
/// `category_name` is joined in from the category table when the payment is
/// read and is never written back. To change a payment, convert it into a
/// [PaymentDraft] with [Payment::to_draft].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    /// The ID of the payment.
    pub id: PaymentId,
    /// What the payment was for.
    pub name: String,
    /// The amount paid.
    pub price: i32,
    /// When the payment was recorded. Set by the database on insert.
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    /// How the payment was made, e.g. "card" or "cash".
    pub payment_type: String,
    /// A free text note.
    pub comment: String,
    /// The ID of the category the payment belongs to.
    pub category_id: CategoryId,
    /// The name of the category the payment belongs to.
    pub category_name: CategoryName,
}

impl Payment {
    /// The mutable fields of the payment.
    pub fn to_draft(&self) -> PaymentDraft {
        PaymentDraft {
            name: self.name.clone(),
            payment_type: self.payment_type.clone(),
            comment: self.comment.clone(),
            category_id: self.category_id,
            price: self.price,
        }
    }
}

/// The fields of a payment that are written to the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentDraft {
    /// What the payment was for.
    pub name: String,
    /// How the payment was made.
    pub payment_type: String,
    /// A free text note.
    pub comment: String,
    /// The resolved ID of the category the payment belongs to.
    pub category_id: CategoryId,
    /// The amount paid.
    pub price: i32,
}

impl PaymentDraft {
    /// Overwrite the fields that are present in `patch`.
    pub fn apply(self, patch: PaymentPatch) -> Self {
        Self {
            name: patch.name.unwrap_or(self.name),
            payment_type: patch.payment_type.unwrap_or(self.payment_type),
            comment: patch.comment.unwrap_or(self.comment),
            category_id: patch.category_id.unwrap_or(self.category_id),
            price: patch.price.unwrap_or(self.price),
        }
    }

    /// Check the field rules for a payment.
    ///
    /// # Errors
    /// Returns [Violations] if the name is empty or longer than [MAX_NAME_BYTES].
    pub fn validate(&self) -> Result<(), Violations> {
        validate(name_checks(&self.name))
    }
}

fn name_checks(name: &str) -> [(bool, &'static str, &'static str); 2] {
    [
        (!name.is_empty(), "name", "must be provided"),
        (
            name.len() <= MAX_NAME_BYTES,
            "name",
            "must not be more than 500 bytes long",
        ),
    ]
}

/// Client input for creating a payment.
///
/// Missing fields default to empty values so that they are reported by
/// [NewPayment::validate] rather than rejected as malformed JSON.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NewPayment {
    /// What the payment was for.
    pub name: String,
    /// How the payment was made.
    pub payment_type: String,
    /// A free text note.
    pub comment: String,
    /// The name of the category, created if it does not exist yet.
    pub category_name: String,
    /// The amount paid.
    pub price: i32,
}

impl NewPayment {
    /// Check the field rules for a new payment.
    ///
    /// # Errors
    /// Returns [Violations] for an empty or overlong name and an empty category name.
    pub fn validate(&self) -> Result<(), Violations> {
        validate(name_checks(&self.name).into_iter().chain([(
            !self.category_name.trim().is_empty(),
            "category_name",
            "must be provided",
        )]))
    }
}

/// Client input for partially updating a payment.
///
/// Only fields that are present overwrite the stored payment, an absent field
/// keeps its current value. An explicit `null` counts as absent.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PaymentPatch {
    /// The new name.
    pub name: Option<String>,
    /// The new payment type.
    pub payment_type: Option<String>,
    /// The new comment.
    pub comment: Option<String>,
    /// The ID of an existing category to move the payment to.
    pub category_id: Option<CategoryId>,
    /// The new price.
    pub price: Option<i32>,
}

/// Filters for listing payments. Empty strings match every payment.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PaymentQuery {
    /// Case-insensitive text that must appear in the payment name.
    pub name: String,
    /// The exact name of the category payments must belong to.
    pub category_name: String,
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use crate::{
        category::CategoryName,
        payment::{NewPayment, Payment, PaymentDraft, PaymentPatch},
    };

    fn rent() -> Payment {
        Payment {
            id: 1,
            name: "Rent".to_owned(),
            price: 1000,
            date: datetime!(2025-10-05 12:00 UTC),
            payment_type: "card".to_owned(),
            comment: "October".to_owned(),
            category_id: 3,
            category_name: CategoryName::new_unchecked("Housing"),
        }
    }

    #[test]
    fn apply_overwrites_only_present_fields() {
        let patch = PaymentPatch {
            price: Some(1200),
            ..Default::default()
        };

        let got = rent().to_draft().apply(patch);

        assert_eq!(
            got,
            PaymentDraft {
                name: "Rent".to_owned(),
                payment_type: "card".to_owned(),
                comment: "October".to_owned(),
                category_id: 3,
                price: 1200,
            }
        );
    }

    #[test]
    fn apply_distinguishes_empty_from_absent() {
        let patch = PaymentPatch {
            comment: Some(String::new()),
            price: Some(0),
            ..Default::default()
        };

        let got = rent().to_draft().apply(patch);

        assert_eq!(got.comment, "");
        assert_eq!(got.price, 0);
        assert_eq!(got.name, "Rent");
    }

    #[test]
    fn patch_deserializes_missing_and_null_as_absent() {
        let patch: PaymentPatch = serde_json::from_str(r#"{"price": 1200, "comment": null}"#)
            .expect("could not parse patch");

        assert_eq!(
            patch,
            PaymentPatch {
                price: Some(1200),
                ..Default::default()
            }
        );
    }

    #[test]
    fn patch_rejects_unknown_fields() {
        let result = serde_json::from_str::<PaymentPatch>(r#"{"amount": 1}"#);

        assert!(result.is_err());
    }

    #[test]
    fn draft_rejects_empty_name() {
        let draft = PaymentDraft {
            name: String::new(),
            ..rent().to_draft()
        };

        let violations = draft.validate().expect_err("want violations");
        assert_eq!(violations.get("name"), Some("must be provided"));
    }

    #[test]
    fn draft_rejects_overlong_name() {
        let draft = PaymentDraft {
            name: "a".repeat(501),
            ..rent().to_draft()
        };

        let violations = draft.validate().expect_err("want violations");
        assert_eq!(
            violations.get("name"),
            Some("must not be more than 500 bytes long")
        );
    }

    #[test]
    fn draft_accepts_name_of_exactly_500_bytes() {
        let draft = PaymentDraft {
            name: "a".repeat(500),
            ..rent().to_draft()
        };

        assert_eq!(draft.validate(), Ok(()));
    }

    #[test]
    fn name_limit_counts_bytes_not_characters() {
        // Each '€' is three bytes long.
        let draft = PaymentDraft {
            name: "€".repeat(167),
            ..rent().to_draft()
        };

        assert!(draft.validate().is_err());
    }

    #[test]
    fn new_payment_reports_every_invalid_field() {
        let new_payment = NewPayment {
            name: String::new(),
            category_name: "  ".to_owned(),
            ..Default::default()
        };

        let violations = new_payment.validate().expect_err("want violations");
        assert_eq!(violations.get("name"), Some("must be provided"));
        assert_eq!(violations.get("category_name"), Some("must be provided"));
    }

    #[test]
    fn payment_serializes_date_as_rfc3339() {
        let json = serde_json::to_value(rent()).expect("could not serialize payment");

        assert_eq!(json["date"], "2025-10-05T12:00:00Z");
        assert_eq!(json["category_name"], "Housing");
    }
}
