use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event, logging instead of failing when the processor is gone.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            error!("{}", e);
        }
    }
}

/// Domain events emitted by the storefront services
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    UserRegistered(Uuid),
    UserProfileUpdated(Uuid),

    ProductCreated(Uuid),

    CartItemAdded {
        user_id: Uuid,
        product_id: Uuid,
    },
    CartItemRemoved {
        user_id: Uuid,
        product_id: Uuid,
    },
    CartItemQuantityChanged {
        user_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    },
    CartCleared(Uuid),

    CheckoutOrderCreated {
        user_id: Uuid,
        provider_order_id: String,
        amount_minor: i64,
        currency: String,
    },
    PaymentVerified {
        user_id: Uuid,
        provider_order_id: String,
        simulated: bool,
    },
    PaymentRejected {
        user_id: Uuid,
        provider_order_id: String,
    },
}

pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::PaymentRejected {
                user_id,
                provider_order_id,
            } => {
                warn!(
                    %user_id,
                    provider_order_id = %provider_order_id,
                    "Payment rejected"
                );
            }
            Event::PaymentVerified {
                user_id,
                provider_order_id,
                simulated,
            } => {
                info!(
                    %user_id,
                    provider_order_id = %provider_order_id,
                    simulated,
                    "Payment verified"
                );
            }
            Event::CheckoutOrderCreated {
                user_id,
                provider_order_id,
                amount_minor,
                currency,
            } => {
                info!(
                    %user_id,
                    provider_order_id = %provider_order_id,
                    amount_minor,
                    currency = %currency,
                    "Checkout order created"
                );
            }
            other => {
                info!("Received event: {:?}", other);
            }
        }
    }

    warn!("Event processing loop has ended");
}
