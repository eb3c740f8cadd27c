use axum::{Json, body::Bytes, extract::State, http::HeaderMap};
use chrono::Utc;
use sea_orm::TransactionTrait;
use tracing::{Span, info, instrument, warn};

use crate::error::{AppError, ErrorBody};
use crate::ledger::{OrderLedger, RecordOutcome};
use crate::models::{FulfillmentOutcome, WebhookAck};
use crate::payments::{
    CHECKOUT_SESSION_COMPLETED, CheckoutOutcome, StripeCheckoutSession, StripeEvent,
    WebhookVerifier,
};
use crate::state::AppState;

/// Receive a Stripe webhook and record the paid order exactly once.
#[utoipa::path(
    post,
    path = "/webhooks/stripe",
    tag = "Webhooks",
    operation_id = "stripeWebhook",
    summary = "Stripe webhook receiver",
    description = "Verifies the `Stripe-Signature` header over the raw body, then records an order for `checkout.session.completed` events. Redeliveries of an already recorded payment intent are acknowledged as `duplicate`. Other event types are acknowledged as `ignored`.",
    params(("Stripe-Signature" = String, Header, description = "`t=<unix>,v1=<hex>` signature header")),
    request_body(content = serde_json::Value, description = "Raw Stripe event"),
    responses(
        (status = 200, description = "Event acknowledged", body = WebhookAck),
        (status = 400, description = "Bad signature (SIGNATURE_INVALID) or malformed event (VALIDATION_ERROR)", body = ErrorBody),
        (status = 500, description = "Storage failure; the provider should retry", body = ErrorBody),
    ),
)]
#[instrument(skip(state, headers, body), fields(event_id, event_type))]
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, AppError> {
    let stripe = &state.config.stripe;
    let verifier = WebhookVerifier::new(&stripe.webhook_secret, stripe.signature_tolerance_secs);
    let signature = headers.get("Stripe-Signature").and_then(|v| v.to_str().ok());

    if let Err(e) = verifier.verify(signature, &body, Utc::now()) {
        warn!(error = %e, "Stripe webhook rejected");
        return Err(AppError::SignatureInvalid);
    }

    let event: StripeEvent = serde_json::from_slice(&body)
        .map_err(|e| AppError::Validation(format!("Malformed event: {e}")))?;

    let span = Span::current();
    span.record("event_type", event.event_type.as_str());
    if let Some(id) = &event.id {
        span.record("event_id", id.as_str());
    }

    if event.event_type != CHECKOUT_SESSION_COMPLETED {
        info!("Ignoring unhandled event type");
        return Ok(Json(WebhookAck::new(FulfillmentOutcome::Ignored, None)));
    }

    let session = StripeCheckoutSession::from_object(event.data.object).map_err(AppError::Validation)?;
    let checkout = match session.into_outcome().map_err(AppError::Validation)? {
        CheckoutOutcome::Paid(checkout) => checkout,
        CheckoutOutcome::NotPaid(status) => {
            info!(payment_status = %status, "Checkout not paid yet, ignoring");
            return Ok(Json(WebhookAck::new(FulfillmentOutcome::Ignored, None)));
        }
    };

    let txn = state.db.begin().await?;
    let outcome = OrderLedger::new(&txn).record(&checkout).await?;

    match outcome {
        RecordOutcome::Created(order) => {
            txn.commit().await?;
            info!(
                order_id = %order.id,
                user_id = %order.user_id,
                product_id = order.product_id,
                "order fulfilled"
            );
            Ok(Json(WebhookAck::new(FulfillmentOutcome::Fulfilled, Some(order.id))))
        }
        RecordOutcome::Duplicate(order) => {
            txn.commit().await?;
            info!(
                order_id = %order.id,
                payment_intent_id = %checkout.payment_intent_id,
                "Duplicate delivery suppressed"
            );
            Ok(Json(WebhookAck::new(FulfillmentOutcome::Duplicate, Some(order.id))))
        }
        RecordOutcome::UnknownProduct => {
            txn.rollback().await?;
            warn!(product_id = checkout.product_id, "Checkout references unknown product");
            Err(AppError::Validation(format!(
                "Product {} does not exist",
                checkout.product_id
            )))
        }
    }
}
