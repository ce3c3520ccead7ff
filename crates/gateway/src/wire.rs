//! Request and response bodies of the processor's REST API.
//!
//! Amounts are integers in minor units. Responses share the envelope
//! `{ "status": bool, "message": string, "data": ... }`.

use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    pub status: bool,
    #[serde(default)]
    pub message: String,
    pub data: Option<T>,
}

/// Error bodies only carry a message.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct InitializeBody<'a> {
    pub email: &'a str,
    pub amount: i64,
    pub currency: &'a str,
    pub reference: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<&'a str>,
    pub metadata: &'a serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub(crate) struct InitializeData {
    pub authorization_url: String,
    pub access_code: String,
    pub reference: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct ChargeBody<'a> {
    pub email: &'a str,
    pub amount: i64,
    pub currency: &'a str,
    pub authorization_code: &'a str,
    pub reference: &'a str,
    pub metadata: &'a serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TransactionData {
    pub reference: String,
    pub status: String,
    pub amount: i64,
    #[serde(default)]
    pub channel: String,
    pub customer: Option<CustomerData>,
    pub authorization: Option<AuthorizationData>,
    #[serde(default, deserialize_with = "metadata_or_null")]
    pub metadata: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CustomerData {
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AuthorizationData {
    pub authorization_code: Option<String>,
    #[serde(default)]
    pub reusable: bool,
    pub card_type: Option<String>,
    pub last4: Option<String>,
    pub bank: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct TransferBody<'a> {
    pub source: &'a str,
    pub amount: i64,
    pub currency: &'a str,
    pub recipient: &'a str,
    pub reason: &'a str,
    pub reference: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TransferData {
    pub reference: String,
    pub transfer_code: String,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct RecipientBody<'a> {
    #[serde(rename = "type")]
    pub kind: &'a str,
    pub name: &'a str,
    pub account_number: &'a str,
    pub bank_code: &'a str,
    pub currency: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RecipientData {
    pub recipient_code: String,
    #[serde(default)]
    pub name: String,
    pub details: Option<RecipientDetails>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RecipientDetails {
    pub account_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResolveData {
    pub account_number: String,
    pub account_name: String,
}

/// The processor sends `""` when no metadata was attached.
fn metadata_or_null<'de, D>(deserializer: D) -> Result<serde_json::Value, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) if s.is_empty() => serde_json::Value::Null,
        other => other,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_string_metadata_becomes_null() {
        let data: TransactionData = serde_json::from_str(
            r#"{"reference":"R","status":"success","amount":5000000,"metadata":""}"#,
        )
        .unwrap();
        assert!(data.metadata.is_null());
        assert!(data.customer.is_none());
    }

    #[test]
    fn test_envelope_without_data() {
        let envelope: Envelope<TransferData> =
            serde_json::from_str(r#"{"status":false,"message":"Transfer not found"}"#).unwrap();
        assert!(!envelope.status);
        assert!(envelope.data.is_none());
        assert_eq!(envelope.message, "Transfer not found");
    }
}
