use sea_orm_migration::{prelude::*, schema};

#[derive(DeriveMigrationName)]
pub(crate) struct Migration;

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Username,
    PasswordHash,
    Email,
    Role,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum ApiTokens {
    Table,
    Id,
    UserId,
    Name,
    Token,
    TokenLength,
    IsActive,
    ExpiresAt,
    LastUsed,
    CreatedAt,
    UpdatedAt,
    CanReadProducts,
    CanManageCart,
    CanPlaceOrders,
    CanManageWishlist,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let users_table = Table::create()
            .table(Users::Table)
            .if_not_exists()
            .col(schema::uuid(Users::Id).primary_key())
            .col(schema::string_uniq(Users::Username))
            .col(schema::string(Users::PasswordHash))
            .col(schema::string(Users::Email))
            .col(schema::string_len(Users::Role, 16))
            .col(schema::timestamp_with_time_zone(Users::CreatedAt))
            .col(schema::timestamp_with_time_zone(Users::UpdatedAt))
            .to_owned();

        // api_tokens 依赖 users, 删除用户时级联删除其 token
        let tokens_table = Table::create()
            .table(ApiTokens::Table)
            .if_not_exists()
            .col(schema::pk_auto(ApiTokens::Id))
            .col(schema::uuid(ApiTokens::UserId))
            .col(schema::string_len(ApiTokens::Name, 100))
            .col(schema::text_null(ApiTokens::Token))
            .col(schema::integer(ApiTokens::TokenLength))
            .col(schema::boolean(ApiTokens::IsActive))
            .col(schema::timestamp_with_time_zone_null(ApiTokens::ExpiresAt))
            .col(schema::timestamp_with_time_zone_null(ApiTokens::LastUsed))
            .col(schema::timestamp_with_time_zone(ApiTokens::CreatedAt))
            .col(schema::timestamp_with_time_zone(ApiTokens::UpdatedAt))
            .col(schema::boolean(ApiTokens::CanReadProducts))
            .col(schema::boolean(ApiTokens::CanManageCart))
            .col(schema::boolean(ApiTokens::CanPlaceOrders))
            .col(schema::boolean(ApiTokens::CanManageWishlist))
            .foreign_key(
                ForeignKey::create()
                    .name("fk_api_tokens_user_id")
                    .from(ApiTokens::Table, ApiTokens::UserId)
                    .to(Users::Table, Users::Id)
                    .on_delete(ForeignKeyAction::Cascade),
            )
            .to_owned();

        let token_index = Index::create()
            .if_not_exists()
            .name("idx_api_tokens_token")
            .table(ApiTokens::Table)
            .col(ApiTokens::Token)
            .to_owned();

        manager.create_table(users_table).await?;
        manager.create_table(tokens_table).await?;
        manager.create_index(token_index).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ApiTokens::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await
    }
}
