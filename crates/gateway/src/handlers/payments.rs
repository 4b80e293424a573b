//! Payment route handlers
//!
//! The payment-mutating routes publish the original request body to the
//! retry queue when the downstream call fails, then still return the
//! failure response to the client. The client never waits on retry
//! outcomes. The status route is read-only and never enqueues.

use actix_web::{web, HttpResponse};

use shared::{classify_payload, PaymentType, RetryMessage};

use crate::downstream::DownstreamClient;
use crate::handlers::helpers::{relay, transport_error};
use crate::models::ErrorResponse;
use crate::queue::RetryQueue;

/// POST /payments/initiate
pub async fn initiate_payment(
    downstream: web::Data<dyn DownstreamClient>,
    queue: web::Data<dyn RetryQueue>,
    body: web::Bytes,
) -> HttpResponse {
    forward_payment(PaymentType::Card, &**downstream, &**queue, body).await
}

/// POST /payments/send-to-mobile
pub async fn send_to_mobile(
    downstream: web::Data<dyn DownstreamClient>,
    queue: web::Data<dyn RetryQueue>,
    body: web::Bytes,
) -> HttpResponse {
    forward_payment(PaymentType::Mobile, &**downstream, &**queue, body).await
}

/// GET /payments/status/{id}
pub async fn payment_status(
    downstream: web::Data<dyn DownstreamClient>,
    path: web::Path<String>,
) -> HttpResponse {
    let id = path.into_inner();
    match downstream.payment_status(&id).await {
        Ok(response) => relay(response),
        Err(e) => {
            tracing::error!(payment_id = %id, error = %e, "Failed to read payment status");
            transport_error()
        }
    }
}

/// Forward one payment-mutating request and enqueue a retry on failure
///
/// The body is buffered in full so the exact bytes can be republished.
/// Validation happens before the downstream call: an unclassifiable body
/// is a client error and is neither forwarded nor enqueued.
async fn forward_payment(
    payment_type: PaymentType,
    downstream: &dyn DownstreamClient,
    queue: &dyn RetryQueue,
    body: web::Bytes,
) -> HttpResponse {
    if let Err(e) = classify_payload(&body) {
        return HttpResponse::BadRequest()
            .json(ErrorResponse::new("invalid_payment", e.to_string()));
    }

    let result = match payment_type {
        PaymentType::Card => downstream.initiate_payment(&body).await,
        PaymentType::Mobile => downstream.send_to_mobile(&body).await,
    };

    match result {
        Ok(response) if response.is_success() => relay(response),
        Ok(response) => {
            tracing::warn!(
                payment_type = %payment_type,
                status = response.status,
                "Payment call failed, enqueueing retry"
            );
            enqueue_retry(queue, payment_type, &body).await;
            relay(response)
        }
        Err(e) => {
            tracing::error!(
                payment_type = %payment_type,
                error = %e,
                "Failed to reach payment backend, enqueueing retry"
            );
            enqueue_retry(queue, payment_type, &body).await;
            transport_error()
        }
    }
}

/// Fire-and-forget publish: a broker error drops the message
async fn enqueue_retry(queue: &dyn RetryQueue, payment_type: PaymentType, body: &[u8]) {
    let payload = String::from_utf8_lossy(body).into_owned();
    let message = RetryMessage::new(payment_type, payload);

    if let Err(e) = queue.publish(&message).await {
        tracing::error!(
            message_id = %message.id,
            error = %e,
            "Failed to publish retry message, dropping"
        );
    }
}
