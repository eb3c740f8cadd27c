use serde::Serialize;
use uuid::Uuid;

/// How a webhook delivery was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum FulfillmentOutcome {
    /// A new order was recorded.
    Fulfilled,
    /// The payment intent was already recorded; nothing was written.
    Duplicate,
    /// The event needs no fulfillment (other event type, unpaid session).
    Ignored,
}

/// Acknowledgement returned to the payment provider.
#[derive(Serialize, utoipa::ToSchema)]
pub struct WebhookAck {
    #[schema(example = true)]
    pub received: bool,
    pub outcome: FulfillmentOutcome,
    /// Order created or matched by this delivery.
    pub order_id: Option<Uuid>,
}

impl WebhookAck {
    pub fn new(outcome: FulfillmentOutcome, order_id: Option<Uuid>) -> Self {
        Self {
            received: true,
            outcome,
            order_id,
        }
    }
}
