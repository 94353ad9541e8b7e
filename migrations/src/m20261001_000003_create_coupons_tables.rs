use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m20261001_000003_create_coupons_tables"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Coupons::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Coupons::Id).uuid().not_null().primary_key())
                    .col(
                        ColumnDef::new(Coupons::Code)
                            .string_len(64)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Coupons::Description).text().null())
                    .col(ColumnDef::new(Coupons::CouponType).string_len(32).not_null())
                    .col(ColumnDef::new(Coupons::Value).decimal_len(16, 4).not_null())
                    .col(
                        ColumnDef::new(Coupons::MinimumOrderAmount)
                            .decimal_len(16, 4)
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Coupons::MaximumDiscountAmount)
                            .decimal_len(16, 4)
                            .null(),
                    )
                    .col(ColumnDef::new(Coupons::UsageLimit).integer().null())
                    .col(
                        ColumnDef::new(Coupons::UsageLimitPerUser)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(
                        ColumnDef::new(Coupons::UsedCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Coupons::ValidFrom)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Coupons::ValidUntil)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Coupons::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Coupons::FirstTimeUserOnly)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Coupons::CreatedBy).uuid().null())
                    .col(
                        ColumnDef::new(Coupons::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Coupons::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CouponTargets::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(CouponTargets::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(CouponTargets::CouponId).uuid().not_null())
                    .col(ColumnDef::new(CouponTargets::Kind).string_len(32).not_null())
                    .col(ColumnDef::new(CouponTargets::TargetId).uuid().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_coupon_targets_coupon_id")
                            .from(CouponTargets::Table, CouponTargets::CouponId)
                            .to(Coupons::Table, Coupons::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CouponUsages::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(CouponUsages::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(CouponUsages::CouponId).uuid().not_null())
                    .col(ColumnDef::new(CouponUsages::UserId).uuid().not_null())
                    .col(ColumnDef::new(CouponUsages::OrderId).uuid().not_null())
                    .col(
                        ColumnDef::new(CouponUsages::DiscountAmount)
                            .decimal_len(16, 4)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CouponUsages::UsedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_coupon_usages_coupon_id")
                            .from(CouponUsages::Table, CouponUsages::CouponId)
                            .to(Coupons::Table, Coupons::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // One redemption per (coupon, order).
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_coupon_usages_coupon_order")
                    .table(CouponUsages::Table)
                    .col(CouponUsages::CouponId)
                    .col(CouponUsages::OrderId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_coupon_usages_coupon_user")
                    .table(CouponUsages::Table)
                    .col(CouponUsages::CouponId)
                    .col(CouponUsages::UserId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CouponUsages::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(CouponTargets::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Coupons::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Coupons {
    Table,
    Id,
    Code,
    Description,
    CouponType,
    Value,
    MinimumOrderAmount,
    MaximumDiscountAmount,
    UsageLimit,
    UsageLimitPerUser,
    UsedCount,
    ValidFrom,
    ValidUntil,
    IsActive,
    FirstTimeUserOnly,
    CreatedBy,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum CouponTargets {
    Table,
    Id,
    CouponId,
    Kind,
    TargetId,
}

#[derive(DeriveIden)]
enum CouponUsages {
    Table,
    Id,
    CouponId,
    UserId,
    OrderId,
    DiscountAmount,
    UsedAt,
}
