use super::CheckoutBackend;
use crate::error::{AppError, AppResult};
use crate::models::{
    CashPaymentRequest, CashPaymentResponse, CreateOrderRequest, EmailNotificationRequest,
    EmailSendResponse, MobileMoneyPaymentRequest, MobileMoneyPaymentResponse, OrderResponse,
    PaymentStatusResponse, PickupLocationResponse,
};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

/// Talks to this service's own `/api/v1` endpoints with a buyer's bearer token.
#[derive(Clone)]
pub struct HttpCheckoutBackend {
    client: Client,
    base_url: String,
    token: Option<String>,
}

#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

impl HttpCheckoutBackend {
    /// `base_url` is the server root, e.g. `http://localhost:8080`.
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.base_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn read<T: DeserializeOwned>(response: Response) -> AppResult<T> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .map(|body| body.error.message)
            .unwrap_or_else(|_| format!("HTTP {}: {}", status.as_u16(), text));
        Err(error_for_status(status, message))
    }

    async fn read_data<T: DeserializeOwned>(response: Response) -> AppResult<T> {
        Self::read::<Envelope<T>>(response).await.map(|e| e.data)
    }
}

/// Rebuild the server-side error from a failed response.
fn error_for_status(status: StatusCode, message: String) -> AppError {
    match status {
        StatusCode::BAD_REQUEST => AppError::ValidationError(message),
        StatusCode::UNAUTHORIZED => AppError::AuthError(message),
        StatusCode::FORBIDDEN => AppError::Forbidden,
        StatusCode::NOT_FOUND => AppError::NotFound(message),
        StatusCode::CONFLICT => AppError::Conflict(message),
        _ => AppError::ExternalApiError(message),
    }
}

#[async_trait]
impl CheckoutBackend for HttpCheckoutBackend {
    fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    async fn pickup_locations(&self) -> AppResult<Vec<PickupLocationResponse>> {
        let response = self
            .client
            .get(self.url("/pickup-locations"))
            .send()
            .await?;
        Self::read_data(response).await
    }

    async fn create_order(&self, request: CreateOrderRequest) -> AppResult<OrderResponse> {
        let response = self
            .authorized(self.client.post(self.url("/orders")))
            .json(&request)
            .send()
            .await?;
        Self::read_data(response).await
    }

    async fn pay_mobile_money(
        &self,
        request: MobileMoneyPaymentRequest,
    ) -> AppResult<MobileMoneyPaymentResponse> {
        let response = self
            .authorized(self.client.post(self.url("/payments/momo")))
            .json(&request)
            .send()
            .await?;
        Self::read(response).await
    }

    async fn pay_cash(&self, request: CashPaymentRequest) -> AppResult<CashPaymentResponse> {
        let response = self
            .authorized(self.client.post(self.url("/payments/cash")))
            .json(&request)
            .send()
            .await?;
        Self::read(response).await
    }

    async fn payment_status(&self, payment_id: Uuid) -> AppResult<PaymentStatusResponse> {
        let response = self
            .authorized(self.client.get(self.url(&format!("/payments/{payment_id}"))))
            .send()
            .await?;
        Self::read_data(response).await
    }

    async fn send_email(&self, request: EmailNotificationRequest) -> AppResult<EmailSendResponse> {
        let response = self
            .authorized(self.client.post(self.url("/notifications/email")))
            .json(&request)
            .send()
            .await?;
        Self::read_data(response).await
    }
}
