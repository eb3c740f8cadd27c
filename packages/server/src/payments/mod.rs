pub mod stripe;

pub use stripe::{
    CHECKOUT_SESSION_COMPLETED, CheckoutOutcome, PaidCheckout, SignatureError, StripeCheckoutSession,
    StripeEvent, WebhookVerifier,
};
