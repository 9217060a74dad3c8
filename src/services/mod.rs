// Shopper accounts
pub mod accounts;

// Catalog, cart and checkout
pub mod commerce;

// Payment provider adapters and confirmation
pub mod payments;
