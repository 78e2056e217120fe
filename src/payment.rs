//! Payment form validation.
//!
//! No charge is made anywhere — the step collects and validates card
//! details for the free-trial subscription, and warns when auto-renewal is
//! switched off.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ValidationErrors;

static EXPIRY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(0[1-9]|1[0-2])/\d{2}$").unwrap());

/// Card details submitted at the payment step.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaymentForm {
    pub card_number: String,
    pub card_name: String,
    /// `MM/YY`.
    pub expiry_date: String,
    pub cvc: String,
    /// Renew automatically after the free trial.
    pub auto_renew: bool,
}

/// What a valid submission leads to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentOutcome {
    /// Details accepted, the workflow may advance.
    Accepted,
    /// Details are valid but auto-renewal is off; the caller must resolve
    /// the warning (enable renewal, or continue without) before advancing.
    AutoRenewalWarning,
}

impl PaymentForm {
    pub fn validate(&self) -> std::result::Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let digits: String = self
            .card_number
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        if digits.is_empty() {
            errors.add("card_number", "Card number is required");
        } else if digits.len() != 16 || !digits.chars().all(|c| c.is_ascii_digit()) {
            errors.add("card_number", "Card number must be 16 digits");
        }

        if self.card_name.is_empty() {
            errors.add("card_name", "Name on card is required");
        }

        if self.expiry_date.is_empty() {
            errors.add("expiry_date", "Expiry date is required");
        } else if !EXPIRY_RE.is_match(&self.expiry_date) {
            errors.add("expiry_date", "Must be in MM/YY format");
        }

        if self.cvc.is_empty() {
            errors.add("cvc", "CVC is required");
        } else if self.cvc.len() < 3 || self.cvc.len() > 4 {
            errors.add("cvc", "CVC must be 3 or 4 digits");
        }

        errors.into_result()
    }

    /// Validate and decide the outcome.
    pub fn submit(&self) -> std::result::Result<PaymentOutcome, ValidationErrors> {
        self.validate()?;
        if self.auto_renew {
            Ok(PaymentOutcome::Accepted)
        } else {
            Ok(PaymentOutcome::AutoRenewalWarning)
        }
    }
}

/// Group card digits in fours for display, dropping everything else.
pub fn format_card_number(raw: &str) -> String {
    let digits: Vec<char> = raw.chars().filter(char::is_ascii_digit).collect();
    digits
        .chunks(4)
        .map(|chunk| chunk.iter().collect::<String>())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_form() -> PaymentForm {
        PaymentForm {
            card_number: "4111 1111 1111 1111".to_string(),
            card_name: "John Smith".to_string(),
            expiry_date: "09/27".to_string(),
            cvc: "123".to_string(),
            auto_renew: true,
        }
    }

    #[test]
    fn valid_form_is_accepted() {
        assert_eq!(valid_form().submit().unwrap(), PaymentOutcome::Accepted);
    }

    #[test]
    fn auto_renew_off_warns_instead_of_accepting() {
        let form = PaymentForm {
            auto_renew: false,
            ..valid_form()
        };
        assert_eq!(form.submit().unwrap(), PaymentOutcome::AutoRenewalWarning);
    }

    #[test]
    fn empty_form_reports_every_field() {
        let errors = PaymentForm::default().validate().unwrap_err();
        assert_eq!(errors.get("card_number"), Some("Card number is required"));
        assert_eq!(errors.get("card_name"), Some("Name on card is required"));
        assert_eq!(errors.get("expiry_date"), Some("Expiry date is required"));
        assert_eq!(errors.get("cvc"), Some("CVC is required"));
    }

    #[test]
    fn short_card_number_rejected() {
        let form = PaymentForm {
            card_number: "4111 1111".to_string(),
            ..valid_form()
        };
        let errors = form.validate().unwrap_err();
        assert_eq!(
            errors.get("card_number"),
            Some("Card number must be 16 digits")
        );
    }

    #[test]
    fn expiry_format_enforced() {
        for bad in ["13/25", "9/27", "09-27", "0927"] {
            let form = PaymentForm {
                expiry_date: bad.to_string(),
                ..valid_form()
            };
            let errors = form.validate().unwrap_err();
            assert_eq!(errors.get("expiry_date"), Some("Must be in MM/YY format"));
        }
    }

    #[test]
    fn cvc_length_bounds() {
        for (cvc, ok) in [("12", false), ("123", true), ("1234", true), ("12345", false)] {
            let form = PaymentForm {
                cvc: cvc.to_string(),
                ..valid_form()
            };
            assert_eq!(form.validate().is_ok(), ok, "cvc {cvc:?}");
        }
    }

    #[test]
    fn card_number_formatting() {
        assert_eq!(format_card_number("4111111111111111"), "4111 1111 1111 1111");
        assert_eq!(format_card_number("41x11"), "4111");
        assert_eq!(format_card_number(""), "");
    }
}
