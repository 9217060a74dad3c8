/// Commerce services module - catalog, cart and checkout
pub mod cart_service;
pub mod checkout_service;
pub mod order_intent;
pub mod product_catalog_service;

// Re-export services for convenience
pub use cart_service::{AddItemOutcome, CartLine, CartService, CartView};
pub use checkout_service::{CheckoutRequest, CheckoutResponse, CheckoutService, ClientCartItem};
pub use order_intent::{build_order_intent, PaymentOrderIntent, PricedLine};
pub use product_catalog_service::{CreateProductInput, ProductCatalogService};
