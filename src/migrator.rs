use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240601_000001_create_users_table::Migration),
            Box::new(m20240601_000002_create_products_table::Migration),
            Box::new(m20240601_000003_create_cart_items_table::Migration),
            Box::new(m20240601_000004_create_payment_orders_table::Migration),
        ]
    }
}

// Migration implementations

mod m20240601_000001_create_users_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000001_create_users_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Users::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Users::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Users::Name).string().not_null())
                        .col(
                            ColumnDef::new(Users::Email)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Users::PasswordHash).text().not_null())
                        .col(
                            ColumnDef::new(Users::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Users::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Users::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Users {
        Table,
        Id,
        Name,
        Email,
        PasswordHash,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240601_000002_create_products_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000002_create_products_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Products::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Products::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Products::Title).string().not_null())
                        .col(
                            ColumnDef::new(Products::Price)
                                .decimal_len(19, 4)
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Products::Description).text().not_null())
                        .col(ColumnDef::new(Products::Category).string().not_null())
                        .col(ColumnDef::new(Products::Image).string().not_null())
                        .col(
                            ColumnDef::new(Products::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Products::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_products_category")
                        .table(Products::Table)
                        .col(Products::Category)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Products::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Products {
        Table,
        Id,
        Title,
        Price,
        Description,
        Category,
        Image,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240601_000003_create_cart_items_table {
    use super::m20240601_000001_create_users_table::Users;
    use super::m20240601_000002_create_products_table::Products;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000003_create_cart_items_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(CartItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(CartItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(CartItems::UserId).uuid().not_null())
                        .col(ColumnDef::new(CartItems::ProductId).uuid().not_null())
                        .col(ColumnDef::new(CartItems::Title).string().not_null())
                        .col(ColumnDef::new(CartItems::Description).text().not_null())
                        .col(ColumnDef::new(CartItems::Image).string().not_null())
                        .col(
                            ColumnDef::new(CartItems::UnitPrice)
                                .decimal_len(19, 4)
                                .not_null(),
                        )
                        .col(ColumnDef::new(CartItems::Category).string().not_null())
                        .col(
                            ColumnDef::new(CartItems::Quantity)
                                .integer()
                                .not_null()
                                .default(1)
                                .check(Expr::col(CartItems::Quantity).gte(1)),
                        )
                        .col(
                            ColumnDef::new(CartItems::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CartItems::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_cart_items_user_id")
                                .from(CartItems::Table, CartItems::UserId)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_cart_items_product_id")
                                .from(CartItems::Table, CartItems::ProductId)
                                .to(Products::Table, Products::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            // One line per product per shopper
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_cart_items_user_product")
                        .table(CartItems::Table)
                        .col(CartItems::UserId)
                        .col(CartItems::ProductId)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(CartItems::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum CartItems {
        Table,
        Id,
        UserId,
        ProductId,
        Title,
        Description,
        Image,
        UnitPrice,
        Category,
        Quantity,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240601_000004_create_payment_orders_table {
    use super::m20240601_000001_create_users_table::Users;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000004_create_payment_orders_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(PaymentOrders::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PaymentOrders::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PaymentOrders::ProviderOrderId)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(PaymentOrders::UserId).uuid().not_null())
                        .col(
                            ColumnDef::new(PaymentOrders::AmountMinor)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PaymentOrders::Currency)
                                .string_len(3)
                                .not_null(),
                        )
                        .col(ColumnDef::new(PaymentOrders::Receipt).string().not_null())
                        .col(
                            ColumnDef::new(PaymentOrders::PaymentMethod)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PaymentOrders::Status)
                                .string_len(20)
                                .not_null()
                                .default("pending"),
                        )
                        .col(
                            ColumnDef::new(PaymentOrders::ProviderPaymentId)
                                .string()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(PaymentOrders::Simulated)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(PaymentOrders::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PaymentOrders::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_payment_orders_user_id")
                                .from(PaymentOrders::Table, PaymentOrders::UserId)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_payment_orders_user_id")
                        .table(PaymentOrders::Table)
                        .col(PaymentOrders::UserId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(PaymentOrders::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum PaymentOrders {
        Table,
        Id,
        ProviderOrderId,
        UserId,
        AmountMinor,
        Currency,
        Receipt,
        PaymentMethod,
        Status,
        ProviderPaymentId,
        Simulated,
        CreatedAt,
        UpdatedAt,
    }
}
