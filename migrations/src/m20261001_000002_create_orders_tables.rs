use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m20261001_000002_create_orders_tables"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Orders::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Orders::Id).uuid().not_null().primary_key())
                    .col(
                        ColumnDef::new(Orders::OrderNumber)
                            .string_len(50)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Orders::UserId).uuid().not_null())
                    .col(ColumnDef::new(Orders::Status).string_len(32).not_null())
                    .col(ColumnDef::new(Orders::Subtotal).decimal_len(16, 4).not_null())
                    .col(ColumnDef::new(Orders::Tax).decimal_len(16, 4).not_null())
                    .col(ColumnDef::new(Orders::ShippingCost).decimal_len(16, 4).not_null())
                    .col(ColumnDef::new(Orders::Discount).decimal_len(16, 4).not_null())
                    .col(ColumnDef::new(Orders::Total).decimal_len(16, 4).not_null())
                    .col(ColumnDef::new(Orders::CouponCode).string_len(64).null())
                    .col(ColumnDef::new(Orders::CouponDiscount).decimal_len(16, 4).null())
                    .col(ColumnDef::new(Orders::CouponType).string_len(32).null())
                    .col(ColumnDef::new(Orders::PaymentMethod).string_len(32).not_null())
                    .col(ColumnDef::new(Orders::PaymentStatus).string_len(32).not_null())
                    .col(ColumnDef::new(Orders::TransactionId).string_len(255).null())
                    .col(ColumnDef::new(Orders::PaidAt).timestamp_with_time_zone().null())
                    .col(ColumnDef::new(Orders::ShippingMethod).string_len(32).not_null())
                    .col(ColumnDef::new(Orders::Carrier).string_len(128).null())
                    .col(ColumnDef::new(Orders::TrackingNumber).string_len(128).null())
                    .col(ColumnDef::new(Orders::ShippedAt).timestamp_with_time_zone().null())
                    .col(
                        ColumnDef::new(Orders::DeliveredAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(Orders::ShippingAddress).text().not_null())
                    .col(ColumnDef::new(Orders::BillingAddress).text().not_null())
                    .col(ColumnDef::new(Orders::CancellationReason).text().null())
                    .col(
                        ColumnDef::new(Orders::CancelledAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(Orders::CancelledBy).uuid().null())
                    .col(ColumnDef::new(Orders::RefundStatus).string_len(32).null())
                    .col(
                        ColumnDef::new(Orders::StockReleased)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Orders::Version)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(
                        ColumnDef::new(Orders::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Orders::UpdatedAt)
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
                    .name("idx_orders_user_id_status")
                    .table(Orders::Table)
                    .col(Orders::UserId)
                    .col(Orders::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(OrderLines::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(OrderLines::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(OrderLines::OrderId).uuid().not_null())
                    .col(ColumnDef::new(OrderLines::Position).integer().not_null())
                    .col(ColumnDef::new(OrderLines::ProductId).uuid().not_null())
                    .col(ColumnDef::new(OrderLines::Name).string_len(255).not_null())
                    .col(ColumnDef::new(OrderLines::Sku).string_len(100).not_null())
                    .col(ColumnDef::new(OrderLines::Image).string_len(1024).null())
                    .col(ColumnDef::new(OrderLines::UnitPrice).decimal_len(16, 4).not_null())
                    .col(ColumnDef::new(OrderLines::Quantity).integer().not_null())
                    .col(
                        ColumnDef::new(OrderLines::LineSubtotal)
                            .decimal_len(16, 4)
                            .not_null(),
                    )
                    .col(ColumnDef::new(OrderLines::TaxRate).decimal_len(9, 4).not_null())
                    .col(ColumnDef::new(OrderLines::LineTax).decimal_len(16, 4).not_null())
                    .col(ColumnDef::new(OrderLines::Size).string_len(64).null())
                    .col(ColumnDef::new(OrderLines::Color).string_len(64).null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_order_lines_order_id")
                            .from(OrderLines::Table, OrderLines::OrderId)
                            .to(Orders::Table, Orders::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(OrderStatusHistory::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OrderStatusHistory::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(OrderStatusHistory::OrderId).uuid().not_null())
                    .col(ColumnDef::new(OrderStatusHistory::Sequence).integer().not_null())
                    .col(
                        ColumnDef::new(OrderStatusHistory::Status)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(OrderStatusHistory::Note).text().null())
                    .col(ColumnDef::new(OrderStatusHistory::ActorId).uuid().null())
                    .col(
                        ColumnDef::new(OrderStatusHistory::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_order_status_history_order_id")
                            .from(OrderStatusHistory::Table, OrderStatusHistory::OrderId)
                            .to(Orders::Table, Orders::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // A sequence number can only be taken once per order.
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_order_status_history_order_sequence")
                    .table(OrderStatusHistory::Table)
                    .col(OrderStatusHistory::OrderId)
                    .col(OrderStatusHistory::Sequence)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(OrderStatusHistory::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(OrderLines::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Orders::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Orders {
    Table,
    Id,
    OrderNumber,
    UserId,
    Status,
    Subtotal,
    Tax,
    ShippingCost,
    Discount,
    Total,
    CouponCode,
    CouponDiscount,
    CouponType,
    PaymentMethod,
    PaymentStatus,
    TransactionId,
    PaidAt,
    ShippingMethod,
    Carrier,
    TrackingNumber,
    ShippedAt,
    DeliveredAt,
    ShippingAddress,
    BillingAddress,
    CancellationReason,
    CancelledAt,
    CancelledBy,
    RefundStatus,
    StockReleased,
    Version,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum OrderLines {
    Table,
    Id,
    OrderId,
    Position,
    ProductId,
    Name,
    Sku,
    Image,
    UnitPrice,
    Quantity,
    LineSubtotal,
    TaxRate,
    LineTax,
    Size,
    Color,
}

#[derive(DeriveIden)]
enum OrderStatusHistory {
    Table,
    Id,
    OrderId,
    Sequence,
    Status,
    Note,
    ActorId,
    CreatedAt,
}
