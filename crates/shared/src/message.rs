//! Retry message model shared by the dispatcher and the retry engine
//!
//! Messages are enqueued by the gateway when a payment call fails and are
//! consumed by the retry poller. The payment type is attached as envelope
//! metadata at enqueue time, so consumers never re-parse the payload to
//! classify a message.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{Error, Result};

/// Default queue name for failed payment requests
pub const PAYMENT_RETRY_QUEUE: &str = "payment_status_queue";

/// Default dead letter queue for requests that exhausted the retry policy
pub const PAYMENT_RETRY_DLQ: &str = "payment_status_dlq";

/// Payment type enum for type safety
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentType {
    Card,
    Mobile,
}

impl fmt::Display for PaymentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PaymentType::Card => "card",
            PaymentType::Mobile => "mobile",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for PaymentType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "card" => Ok(PaymentType::Card),
            // The mobile money providers tag their method in several ways
            "mobile" | "mpesa" | "m-pesa" => Ok(PaymentType::Mobile),
            _ => anyhow::bail!("Invalid payment type: {}", s),
        }
    }
}

/// Queue envelope for a failed payment request
///
/// `payload` holds the original client request body byte-for-byte; the
/// retry path never re-serializes it. `cycle` counts how many times the
/// message has been republished after exhausting its attempt budget.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryMessage {
    /// Unique message identifier, stable across republish cycles
    pub id: String,
    /// Which downstream endpoint a retry targets
    pub payment_type: PaymentType,
    /// Raw JSON request body as received from the client
    pub payload: String,
    /// Republish count, 0 on first enqueue
    pub cycle: u32,
    /// When this envelope was (re)published
    pub enqueued_at: DateTime<Utc>,
}

impl RetryMessage {
    /// Create a first-cycle message for a failed payment request
    pub fn new(payment_type: PaymentType, payload: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            payment_type,
            payload: payload.into(),
            cycle: 0,
            enqueued_at: Utc::now(),
        }
    }

    /// Republished copy: same id and payload, next cycle, fresh timestamp
    pub fn next_cycle(&self) -> Self {
        Self {
            id: self.id.clone(),
            payment_type: self.payment_type,
            payload: self.payload.clone(),
            cycle: self.cycle + 1,
            enqueued_at: Utc::now(),
        }
    }
}

/// Extract and classify the `payment_method` field of a request body
///
/// The body must be valid JSON with a recognized `payment_method` value.
/// The gateway rejects anything else before forwarding, so unclassifiable
/// payloads never reach the queue.
pub fn classify_payload(payload: &[u8]) -> Result<PaymentType> {
    let value: serde_json::Value = serde_json::from_slice(payload)
        .map_err(|e| Error::validation(format!("Body is not valid JSON: {}", e)))?;

    let method = value
        .get("payment_method")
        .and_then(|v| v.as_str())
        .ok_or_else(|| Error::validation("Missing payment_method field"))?;

    method
        .parse::<PaymentType>()
        .map_err(|_| Error::validation(format!("Unrecognized payment_method: {}", method)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_message_new() {
        let message = RetryMessage::new(PaymentType::Card, r#"{"payment_method":"card"}"#);

        assert!(!message.id.is_empty());
        assert_eq!(message.payment_type, PaymentType::Card);
        assert_eq!(message.payload, r#"{"payment_method":"card"}"#);
        assert_eq!(message.cycle, 0);
    }

    #[test]
    fn test_retry_message_ids_are_unique() {
        let m1 = RetryMessage::new(PaymentType::Card, "{}");
        let m2 = RetryMessage::new(PaymentType::Card, "{}");

        assert_ne!(m1.id, m2.id);
    }

    #[test]
    fn test_next_cycle_preserves_identity_and_payload() {
        let original = RetryMessage::new(PaymentType::Mobile, r#"{"amount": 100}"#);
        let republished = original.next_cycle();

        assert_eq!(republished.id, original.id);
        assert_eq!(republished.payment_type, original.payment_type);
        assert_eq!(republished.payload, original.payload);
        assert_eq!(republished.cycle, 1);

        assert_eq!(republished.next_cycle().cycle, 2);
    }

    #[test]
    fn test_retry_message_serialization_round_trip() {
        let message = RetryMessage::new(PaymentType::Mobile, r#"{"payment_method":"mpesa"}"#);

        let json = serde_json::to_string(&message).unwrap();
        let decoded: RetryMessage = serde_json::from_str(&json).unwrap();

        assert_eq!(decoded.id, message.id);
        assert_eq!(decoded.payment_type, message.payment_type);
        assert_eq!(decoded.payload, message.payload);
        assert_eq!(decoded.cycle, message.cycle);
        assert_eq!(decoded.enqueued_at, message.enqueued_at);
    }

    #[test]
    fn test_payment_type_display() {
        assert_eq!(PaymentType::Card.to_string(), "card");
        assert_eq!(PaymentType::Mobile.to_string(), "mobile");
    }

    #[test]
    fn test_payment_type_from_str() {
        assert_eq!("card".parse::<PaymentType>().unwrap(), PaymentType::Card);
        assert_eq!("mobile".parse::<PaymentType>().unwrap(), PaymentType::Mobile);
        assert_eq!("mpesa".parse::<PaymentType>().unwrap(), PaymentType::Mobile);
        assert_eq!("m-pesa".parse::<PaymentType>().unwrap(), PaymentType::Mobile);
        assert!("wire".parse::<PaymentType>().is_err());
    }

    #[test]
    fn test_payment_type_case_insensitive() {
        assert_eq!("CARD".parse::<PaymentType>().unwrap(), PaymentType::Card);
        assert_eq!("Mobile".parse::<PaymentType>().unwrap(), PaymentType::Mobile);
    }

    #[test]
    fn test_classify_payload_card() {
        let payload = br#"{"payment_method":"card","amount":100}"#;
        assert_eq!(classify_payload(payload).unwrap(), PaymentType::Card);
    }

    #[test]
    fn test_classify_payload_mobile_tags() {
        for method in ["mobile", "mpesa", "m-pesa"] {
            let payload = format!(r#"{{"payment_method":"{}"}}"#, method);
            assert_eq!(
                classify_payload(payload.as_bytes()).unwrap(),
                PaymentType::Mobile
            );
        }
    }

    #[test]
    fn test_classify_payload_missing_field() {
        let result = classify_payload(br#"{"foo":"bar"}"#);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("payment_method"));
    }

    #[test]
    fn test_classify_payload_invalid_json() {
        assert!(classify_payload(b"not json").is_err());
    }

    #[test]
    fn test_classify_payload_non_string_field() {
        assert!(classify_payload(br#"{"payment_method":42}"#).is_err());
    }

    #[test]
    fn test_classify_payload_unrecognized_value() {
        assert!(classify_payload(br#"{"payment_method":"wire"}"#).is_err());
    }
}
