use crate::{
    entities::{
        commerce::{cart_item, CartItem, CartItemModel, Product},
        User,
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, SqlErr,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

/// Per-user shopping cart backed by the `cart_items` table.
///
/// Quantity changes are single conditional `UPDATE` statements so two
/// concurrent requests can never lose an increment or push a line below 1.
#[derive(Clone)]
pub struct CartService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

/// Line item as returned to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CartLine {
    pub id: Uuid,
    pub product_id: Uuid,
    pub title: String,
    pub description: String,
    pub image: String,
    pub unit_price: Decimal,
    pub category: String,
    pub quantity: i32,
    pub line_total: Decimal,
}

impl From<CartItemModel> for CartLine {
    fn from(item: CartItemModel) -> Self {
        let line_total = item.unit_price * Decimal::from(item.quantity);
        Self {
            id: item.id,
            product_id: item.product_id,
            title: item.title,
            description: item.description,
            image: item.image,
            unit_price: item.unit_price,
            category: item.category,
            quantity: item.quantity,
            line_total,
        }
    }
}

/// Snapshot of a cart after a read or mutation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CartView {
    pub items: Vec<CartLine>,
    /// Sum of quantities across lines
    pub item_count: i64,
    /// Display subtotal from the snapshot prices; checkout reprices from the catalog
    pub subtotal: Decimal,
}

impl CartView {
    fn from_items(items: Vec<CartItemModel>) -> Self {
        let items: Vec<CartLine> = items.into_iter().map(CartLine::from).collect();
        let item_count = items.iter().map(|l| i64::from(l.quantity)).sum();
        let subtotal = items.iter().map(|l| l.line_total).sum();
        Self {
            items,
            item_count,
            subtotal,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Outcome of adding a product. Adding a product that is already in the
/// cart is not an error; the caller gets the unchanged cart back.
#[derive(Debug, Clone, PartialEq)]
pub enum AddItemOutcome {
    Added(CartView),
    AlreadyPresent(CartView),
}

impl AddItemOutcome {
    pub fn cart(&self) -> &CartView {
        match self {
            AddItemOutcome::Added(cart) | AddItemOutcome::AlreadyPresent(cart) => cart,
        }
    }
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

impl CartService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self))]
    pub async fn get_cart(&self, user_id: Uuid) -> Result<CartView, ServiceError> {
        self.ensure_user(user_id).await?;
        self.load_cart(user_id).await
    }

    /// Adds one unit of a catalog product with a snapshot of its fields.
    #[instrument(skip(self))]
    pub async fn add_item(
        &self,
        user_id: Uuid,
        product_id: Uuid,
    ) -> Result<AddItemOutcome, ServiceError> {
        self.ensure_user(user_id).await?;

        let product = Product::find_by_id(product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;

        if self.find_line(user_id, product_id).await?.is_some() {
            debug!(%user_id, %product_id, "Product already in cart");
            return Ok(AddItemOutcome::AlreadyPresent(self.load_cart(user_id).await?));
        }

        let now = Utc::now();
        let line = cart_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            product_id: Set(product_id),
            title: Set(product.title),
            description: Set(product.description),
            image: Set(product.image),
            unit_price: Set(product.price),
            category: Set(product.category),
            quantity: Set(1),
            created_at: Set(now),
            updated_at: Set(now),
        };

        // A concurrent add of the same product trips the unique index
        match line.insert(&*self.db).await {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => {
                return Ok(AddItemOutcome::AlreadyPresent(self.load_cart(user_id).await?));
            }
            Err(e) => return Err(e.into()),
        }

        self.event_sender
            .send_or_log(Event::CartItemAdded {
                user_id,
                product_id,
            })
            .await;

        info!(%user_id, %product_id, "Added product to cart");
        Ok(AddItemOutcome::Added(self.load_cart(user_id).await?))
    }

    #[instrument(skip(self))]
    pub async fn remove_item(
        &self,
        user_id: Uuid,
        product_id: Uuid,
    ) -> Result<CartView, ServiceError> {
        self.ensure_user(user_id).await?;

        let result = CartItem::delete_many()
            .filter(cart_item::Column::UserId.eq(user_id))
            .filter(cart_item::Column::ProductId.eq(product_id))
            .exec(&*self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(not_in_cart(product_id));
        }

        self.event_sender
            .send_or_log(Event::CartItemRemoved {
                user_id,
                product_id,
            })
            .await;

        self.load_cart(user_id).await
    }

    #[instrument(skip(self))]
    pub async fn increment_quantity(
        &self,
        user_id: Uuid,
        product_id: Uuid,
    ) -> Result<CartView, ServiceError> {
        self.ensure_user(user_id).await?;

        let result = CartItem::update_many()
            .col_expr(
                cart_item::Column::Quantity,
                Expr::col(cart_item::Column::Quantity).add(1),
            )
            .col_expr(cart_item::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(cart_item::Column::UserId.eq(user_id))
            .filter(cart_item::Column::ProductId.eq(product_id))
            .exec(&*self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(not_in_cart(product_id));
        }

        self.quantity_changed(user_id, product_id).await
    }

    /// Decrements by one. A line at quantity 1 is left alone and the call
    /// fails with `InvalidOperation`; removal is a separate operation.
    #[instrument(skip(self))]
    pub async fn decrement_quantity(
        &self,
        user_id: Uuid,
        product_id: Uuid,
    ) -> Result<CartView, ServiceError> {
        self.ensure_user(user_id).await?;

        let result = CartItem::update_many()
            .col_expr(
                cart_item::Column::Quantity,
                Expr::col(cart_item::Column::Quantity).sub(1),
            )
            .col_expr(cart_item::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(cart_item::Column::UserId.eq(user_id))
            .filter(cart_item::Column::ProductId.eq(product_id))
            .filter(cart_item::Column::Quantity.gt(1))
            .exec(&*self.db)
            .await?;

        if result.rows_affected == 0 {
            return match self.find_line(user_id, product_id).await? {
                Some(_) => Err(ServiceError::InvalidOperation(
                    "Quantity cannot be less than 1".to_string(),
                )),
                None => Err(not_in_cart(product_id)),
            };
        }

        self.quantity_changed(user_id, product_id).await
    }

    /// Removes every line. Clearing an empty cart succeeds.
    #[instrument(skip(self))]
    pub async fn clear_cart(&self, user_id: Uuid) -> Result<CartView, ServiceError> {
        self.ensure_user(user_id).await?;

        let result = CartItem::delete_many()
            .filter(cart_item::Column::UserId.eq(user_id))
            .exec(&*self.db)
            .await?;

        if result.rows_affected > 0 {
            self.event_sender
                .send_or_log(Event::CartCleared(user_id))
                .await;
        }

        info!(%user_id, removed = result.rows_affected, "Cleared cart");
        self.load_cart(user_id).await
    }

    async fn quantity_changed(
        &self,
        user_id: Uuid,
        product_id: Uuid,
    ) -> Result<CartView, ServiceError> {
        let cart = self.load_cart(user_id).await?;
        if let Some(line) = cart.items.iter().find(|l| l.product_id == product_id) {
            self.event_sender
                .send_or_log(Event::CartItemQuantityChanged {
                    user_id,
                    product_id,
                    quantity: line.quantity,
                })
                .await;
        }
        Ok(cart)
    }

    async fn ensure_user(&self, user_id: Uuid) -> Result<(), ServiceError> {
        let exists = User::find_by_id(user_id).count(&*self.db).await? > 0;
        if exists {
            Ok(())
        } else {
            Err(ServiceError::NotFound(format!("User {} not found", user_id)))
        }
    }

    async fn find_line(
        &self,
        user_id: Uuid,
        product_id: Uuid,
    ) -> Result<Option<CartItemModel>, ServiceError> {
        Ok(CartItem::find()
            .filter(cart_item::Column::UserId.eq(user_id))
            .filter(cart_item::Column::ProductId.eq(product_id))
            .one(&*self.db)
            .await?)
    }

    async fn load_cart(&self, user_id: Uuid) -> Result<CartView, ServiceError> {
        let items = CartItem::find()
            .filter(cart_item::Column::UserId.eq(user_id))
            .order_by_asc(cart_item::Column::CreatedAt)
            .all(&*self.db)
            .await?;
        Ok(CartView::from_items(items))
    }
}

fn not_in_cart(product_id: Uuid) -> ServiceError {
    ServiceError::NotFound(format!("Product {} not in cart", product_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn item(price: Decimal, quantity: i32) -> CartItemModel {
        CartItemModel {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            title: "Mug".into(),
            description: String::new(),
            image: String::new(),
            unit_price: price,
            category: "kitchen".into(),
            quantity,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn cart_view_totals() {
        let view = CartView::from_items(vec![item(dec!(10.00), 2), item(dec!(2.50), 1)]);

        assert_eq!(view.item_count, 3);
        assert_eq!(view.subtotal, dec!(22.50));
        assert_eq!(view.items[0].line_total, dec!(20.00));
    }

    #[test]
    fn empty_cart_view() {
        let view = CartView::from_items(vec![]);
        assert!(view.is_empty());
        assert_eq!(view.subtotal, Decimal::ZERO);
    }
}
