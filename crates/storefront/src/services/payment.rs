//! Simulated card payments.
//!
//! No money moves. Cards are validated the way a real processor would
//! (Luhn checksum, expiry, CVV) and a fixed set of test numbers decline.

use chrono::{Datelike, NaiveDate};
use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

/// Card numbers that always decline.
const DECLINED_CARDS: &[&str] = &["4000000000000002", "4000000000009995"];

/// Card validation failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PaymentError {
    #[error("invalid card number")]
    InvalidCardNumber,

    #[error("expiry must be in MM/YY format")]
    InvalidExpiry,

    #[error("card has expired")]
    CardExpired,

    #[error("CVV must be 3 or 4 digits")]
    InvalidCvv,

    #[error("cardholder name is required")]
    MissingCardholder,
}

/// Card details submitted with a payment.
#[derive(Clone, Deserialize)]
pub struct CardDetails {
    pub card_number: String,
    /// `MM/YY`
    pub expiry: String,
    pub cvv: String,
    pub cardholder: String,
}

impl std::fmt::Debug for CardDetails {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CardDetails")
            .field("card_number", &mask(&digits(&self.card_number)))
            .field("expiry", &self.expiry)
            .field("cvv", &"***")
            .field("cardholder", &self.cardholder)
            .finish()
    }
}

/// Result of a simulated charge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentOutcome {
    Approved { reference: String },
    Declined,
}

/// Stateless card processor simulator.
#[derive(Debug, Clone, Copy, Default)]
pub struct PaymentSimulator;

impl PaymentSimulator {
    /// Validate a card and decide the outcome.
    ///
    /// # Errors
    ///
    /// Returns a `PaymentError` if any card field is invalid. A valid card
    /// that declines is an `Ok(PaymentOutcome::Declined)`.
    pub fn charge(&self, card: &CardDetails, today: NaiveDate) -> Result<PaymentOutcome, PaymentError> {
        let number = validate_card(card, today)?;

        if DECLINED_CARDS.contains(&number.as_str()) {
            return Ok(PaymentOutcome::Declined);
        }

        Ok(PaymentOutcome::Approved {
            reference: format!("SIM-{}", Uuid::new_v4()),
        })
    }
}

/// Validate every card field. Returns the normalized card number.
///
/// # Errors
///
/// Returns the first `PaymentError` found.
pub fn validate_card(card: &CardDetails, today: NaiveDate) -> Result<String, PaymentError> {
    if card.cardholder.trim().is_empty() {
        return Err(PaymentError::MissingCardholder);
    }

    let stripped: String = card
        .card_number
        .chars()
        .filter(|c| !matches!(c, ' ' | '-'))
        .collect();
    if !(12..=19).contains(&stripped.len())
        || !stripped.chars().all(|c| c.is_ascii_digit())
        || !luhn_valid(&stripped)
    {
        return Err(PaymentError::InvalidCardNumber);
    }

    let (month, year) = parse_expiry(&card.expiry)?;
    if (year, month) < (today.year(), today.month()) {
        return Err(PaymentError::CardExpired);
    }

    let cvv = card.cvv.trim();
    if !(3..=4).contains(&cvv.len()) || !cvv.chars().all(|c| c.is_ascii_digit()) {
        return Err(PaymentError::InvalidCvv);
    }

    Ok(stripped)
}

/// Luhn checksum over a string of ASCII digits.
#[must_use]
pub fn luhn_valid(number: &str) -> bool {
    let mut sum = 0;
    for (i, c) in number.chars().rev().enumerate() {
        let Some(mut d) = c.to_digit(10) else {
            return false;
        };
        if i % 2 == 1 {
            d *= 2;
            if d > 9 {
                d -= 9;
            }
        }
        sum += d;
    }
    !number.is_empty() && sum % 10 == 0
}

/// Parse `MM/YY` into (month, four-digit year).
fn parse_expiry(expiry: &str) -> Result<(u32, i32), PaymentError> {
    let (mm, yy) = expiry
        .trim()
        .split_once('/')
        .ok_or(PaymentError::InvalidExpiry)?;
    if mm.len() != 2 || yy.len() != 2 {
        return Err(PaymentError::InvalidExpiry);
    }

    let month: u32 = mm.parse().map_err(|_| PaymentError::InvalidExpiry)?;
    let year: i32 = yy.parse().map_err(|_| PaymentError::InvalidExpiry)?;
    if !(1..=12).contains(&month) {
        return Err(PaymentError::InvalidExpiry);
    }
    Ok((month, 2000 + year))
}

fn digits(s: &str) -> String {
    s.chars().filter(char::is_ascii_digit).collect()
}

/// Show only the last four digits.
#[must_use]
pub fn mask(number: &str) -> String {
    let tail: String = number
        .chars()
        .rev()
        .take(4)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    format!("**** {tail}")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 6, 15).unwrap()
    }

    fn card(number: &str) -> CardDetails {
        CardDetails {
            card_number: number.to_owned(),
            expiry: "12/28".to_owned(),
            cvv: "123".to_owned(),
            cardholder: "Sari Wijaya".to_owned(),
        }
    }

    #[test]
    fn test_luhn() {
        assert!(luhn_valid("4242424242424242"));
        assert!(luhn_valid("4000000000000002"));
        assert!(!luhn_valid("4242424242424241"));
        assert!(!luhn_valid(""));
    }

    #[test]
    fn test_approved_card_gets_reference() {
        let outcome = PaymentSimulator.charge(&card("4242 4242 4242 4242"), today()).unwrap();
        match outcome {
            PaymentOutcome::Approved { reference } => assert!(reference.starts_with("SIM-")),
            PaymentOutcome::Declined => panic!("expected approval"),
        }
    }

    #[test]
    fn test_decline_card() {
        assert_eq!(
            PaymentSimulator.charge(&card("4000-0000-0000-0002"), today()).unwrap(),
            PaymentOutcome::Declined
        );
    }

    #[test]
    fn test_invalid_fields() {
        assert_eq!(
            validate_card(&card("4242424242424241"), today()),
            Err(PaymentError::InvalidCardNumber)
        );
        assert_eq!(validate_card(&card("4242"), today()), Err(PaymentError::InvalidCardNumber));

        let mut expired = card("4242424242424242");
        expired.expiry = "05/26".to_owned();
        assert_eq!(validate_card(&expired, today()), Err(PaymentError::CardExpired));

        let mut this_month = card("4242424242424242");
        this_month.expiry = "06/26".to_owned();
        assert!(validate_card(&this_month, today()).is_ok());

        let mut bad_expiry = card("4242424242424242");
        bad_expiry.expiry = "13/30".to_owned();
        assert_eq!(validate_card(&bad_expiry, today()), Err(PaymentError::InvalidExpiry));

        let mut bad_cvv = card("4242424242424242");
        bad_cvv.cvv = "12a".to_owned();
        assert_eq!(validate_card(&bad_cvv, today()), Err(PaymentError::InvalidCvv));

        let mut anonymous = card("4242424242424242");
        anonymous.cardholder = " ".to_owned();
        assert_eq!(validate_card(&anonymous, today()), Err(PaymentError::MissingCardholder));
    }

    #[test]
    fn test_debug_masks_card() {
        let rendered = format!("{:?}", card("4242 4242 4242 4242"));
        assert!(rendered.contains("**** 4242"));
        assert!(!rendered.contains("4242424242424242"));
        assert!(!rendered.contains("123"));
    }
}
