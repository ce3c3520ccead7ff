//! REST client for the payment processor.

use std::time::Duration;

use async_trait::async_trait;
use rentflow_core::gateway::{
    AccountDetails, Authorization, ChargeAuthorization, GatewayError, InitializeTransaction,
    InitializedTransaction, PaymentGateway, ResolvedAccount, TransactionStatus, TransferReceipt,
    TransferRecipient, TransferRequest, TransferStatus, VerifiedTransaction,
};
use rentflow_shared::config::GatewayConfig;
use rentflow_shared::types::{Currency, Money};
use reqwest::{Client, RequestBuilder, StatusCode};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::reference::generate_reference;
use crate::wire::{
    ChargeBody, Envelope, ErrorBody, InitializeBody, InitializeData, RecipientBody, RecipientData,
    ResolveData, TransactionData, TransferBody, TransferData,
};

/// [`PaymentGateway`] over the processor's HTTPS API.
#[derive(Clone)]
pub struct PaystackClient {
    http: Client,
    base_url: String,
    secret_key: String,
    currency: Currency,
}

impl std::fmt::Debug for PaystackClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaystackClient")
            .field("base_url", &self.base_url)
            .field("currency", &self.currency)
            .finish_non_exhaustive()
    }
}

fn transport_error(err: &reqwest::Error) -> GatewayError {
    if err.is_timeout() {
        GatewayError::Timeout(err.to_string())
    } else {
        GatewayError::Unavailable(err.to_string())
    }
}

impl PaystackClient {
    /// Builds a client from `gateway.*` settings. Amounts are sent in `currency`.
    pub fn new(config: &GatewayConfig, currency: Currency) -> Result<Self, GatewayError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GatewayError::Unavailable(format!("HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            secret_key: config.secret_key.clone(),
            currency,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn minor(&self, amount: Decimal) -> Result<i64, GatewayError> {
        Money::new(amount, self.currency)
            .to_minor_units()
            .map_err(|e| GatewayError::InvalidAmount(e.to_string()))
    }

    fn major(&self, minor: i64) -> Decimal {
        Money::from_minor_units(minor, self.currency).amount
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        operation: &str,
    ) -> Result<T, GatewayError> {
        let response = request
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(|e| transport_error(&e))?;
        let status = response.status();
        let body = response.bytes().await.map_err(|e| transport_error(&e))?;

        if !status.is_success() {
            let message = serde_json::from_slice::<ErrorBody>(&body)
                .unwrap_or_default()
                .message;
            warn!(operation, status = status.as_u16(), message, "Gateway call failed");
            let detail = format!("{operation}: {message}");
            return Err(
                if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
                    GatewayError::Unavailable(detail)
                } else if status == StatusCode::NOT_FOUND
                    || message.to_ascii_lowercase().contains("not found")
                {
                    GatewayError::NotFound(detail)
                } else {
                    GatewayError::Rejected(detail)
                },
            );
        }

        let envelope: Envelope<T> = serde_json::from_slice(&body)
            .map_err(|e| GatewayError::InvalidResponse(format!("{operation}: {e}")))?;
        if !envelope.status {
            return Err(GatewayError::Rejected(format!(
                "{operation}: {}",
                envelope.message
            )));
        }
        envelope
            .data
            .ok_or_else(|| GatewayError::InvalidResponse(format!("{operation}: missing data")))
    }

    fn verified(&self, data: TransactionData) -> VerifiedTransaction {
        let authorization = data.authorization.and_then(|a| {
            a.authorization_code.map(|code| Authorization {
                authorization_code: code,
                reusable: a.reusable,
                card_type: a.card_type,
                last4: a.last4,
                bank: a.bank,
            })
        });
        VerifiedTransaction {
            status: TransactionStatus::parse(&data.status),
            amount: self.major(data.amount),
            reference: data.reference,
            channel: data.channel,
            customer_email: data.customer.and_then(|c| c.email),
            authorization,
            metadata: data.metadata,
        }
    }
}

fn receipt(data: TransferData) -> TransferReceipt {
    TransferReceipt {
        status: TransferStatus::parse(&data.status),
        reference: data.reference,
        transfer_code: data.transfer_code,
    }
}

#[async_trait]
impl PaymentGateway for PaystackClient {
    fn new_reference(&self, prefix: &str) -> String {
        generate_reference(prefix)
    }

    async fn initialize_transaction(
        &self,
        request: InitializeTransaction,
    ) -> Result<InitializedTransaction, GatewayError> {
        let currency = self.currency.to_string();
        let body = InitializeBody {
            email: &request.email,
            amount: self.minor(request.amount)?,
            currency: &currency,
            reference: &request.reference,
            callback_url: request.callback_url.as_deref(),
            metadata: &request.metadata,
        };
        debug!(reference = %request.reference, "Initializing transaction");
        let data: InitializeData = self
            .send(
                self.http.post(self.url("transaction/initialize")).json(&body),
                "initialize",
            )
            .await?;
        Ok(InitializedTransaction {
            authorization_url: data.authorization_url,
            access_code: data.access_code,
            reference: data.reference,
        })
    }

    async fn verify_transaction(
        &self,
        reference: &str,
    ) -> Result<VerifiedTransaction, GatewayError> {
        debug!(reference, "Verifying transaction");
        let data: TransactionData = self
            .send(
                self.http
                    .get(self.url(&format!("transaction/verify/{reference}"))),
                "verify",
            )
            .await?;
        Ok(self.verified(data))
    }

    async fn charge_authorization(
        &self,
        request: ChargeAuthorization,
    ) -> Result<VerifiedTransaction, GatewayError> {
        let currency = self.currency.to_string();
        let body = ChargeBody {
            email: &request.email,
            amount: self.minor(request.amount)?,
            currency: &currency,
            authorization_code: &request.authorization_code,
            reference: &request.reference,
            metadata: &request.metadata,
        };
        debug!(reference = %request.reference, "Charging stored authorization");
        let data: TransactionData = self
            .send(
                self.http
                    .post(self.url("transaction/charge_authorization"))
                    .json(&body),
                "charge_authorization",
            )
            .await?;
        Ok(self.verified(data))
    }

    async fn initiate_transfer(
        &self,
        request: TransferRequest,
    ) -> Result<TransferReceipt, GatewayError> {
        let currency = self.currency.to_string();
        let body = TransferBody {
            source: "balance",
            amount: self.minor(request.amount)?,
            currency: &currency,
            recipient: &request.recipient_code,
            reason: &request.reason,
            reference: &request.reference,
        };
        debug!(reference = %request.reference, amount = %request.amount, "Initiating transfer");
        let data: TransferData = self
            .send(self.http.post(self.url("transfer")).json(&body), "transfer")
            .await?;
        Ok(receipt(data))
    }

    async fn verify_transfer(&self, reference: &str) -> Result<TransferReceipt, GatewayError> {
        debug!(reference, "Verifying transfer");
        let data: TransferData = self
            .send(
                self.http
                    .get(self.url(&format!("transfer/verify/{reference}"))),
                "verify_transfer",
            )
            .await?;
        Ok(receipt(data))
    }

    async fn create_transfer_recipient(
        &self,
        details: AccountDetails,
    ) -> Result<TransferRecipient, GatewayError> {
        let body = RecipientBody {
            kind: "nuban",
            name: &details.account_name,
            account_number: &details.account_number,
            bank_code: &details.bank_code,
            currency: &details.currency,
        };
        let data: RecipientData = self
            .send(
                self.http.post(self.url("transferrecipient")).json(&body),
                "create_recipient",
            )
            .await?;
        let account_name = data
            .details
            .and_then(|d| d.account_name)
            .unwrap_or(data.name);
        Ok(TransferRecipient {
            recipient_code: data.recipient_code,
            account_name,
        })
    }

    async fn resolve_account_number(
        &self,
        account_number: &str,
        bank_code: &str,
    ) -> Result<ResolvedAccount, GatewayError> {
        let data: ResolveData = self
            .send(
                self.http
                    .get(self.url("bank/resolve"))
                    .query(&[("account_number", account_number), ("bank_code", bank_code)]),
                "resolve_account",
            )
            .await?;
        Ok(ResolvedAccount {
            account_number: data.account_number,
            account_name: data.account_name,
        })
    }
}
