/// Commerce entities module
pub mod cart_item;
pub mod payment_order;
pub mod product;

// Re-export entities
pub use cart_item::{Entity as CartItem, Model as CartItemModel};
pub use payment_order::{Entity as PaymentOrder, Model as PaymentOrderModel, PaymentOrderStatus};
pub use product::{Entity as Product, Model as ProductModel};
