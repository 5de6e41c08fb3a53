//! Initial migration: profiles and the follow edges between them.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        self.create_profiles(manager).await?;
        self.create_follow_edges(manager).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(FollowEdges::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Profiles::Table).to_owned())
            .await?;
        Ok(())
    }
}

impl Migration {
    async fn create_profiles(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Profiles::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Profiles::Id).uuid().not_null().primary_key())
                    // Identity
                    .col(ColumnDef::new(Profiles::ExternalId).string().not_null())
                    .col(ColumnDef::new(Profiles::Username).string().not_null())
                    // Descriptive
                    .col(
                        ColumnDef::new(Profiles::Name)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Profiles::Location)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(Profiles::Bio).text().not_null().default(""))
                    .col(ColumnDef::new(Profiles::Url).text().not_null().default(""))
                    .col(
                        ColumnDef::new(Profiles::Email)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Profiles::ProfileBannerUrl)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Profiles::ProfileImageUrl)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    // Flags
                    .col(
                        ColumnDef::new(Profiles::Verified)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Profiles::Protected)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Profiles::DefaultProfile)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Profiles::DefaultProfileImage)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    // Counters
                    .col(
                        ColumnDef::new(Profiles::FollowersCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Profiles::FollowingsCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Profiles::FavouritesCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Profiles::ListedCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Profiles::PostsCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    // Source metadata
                    .col(
                        ColumnDef::new(Profiles::Entities)
                            .text()
                            .not_null()
                            .default("{}"),
                    )
                    .col(
                        ColumnDef::new(Profiles::JoinedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    // Audit
                    .col(
                        ColumnDef::new(Profiles::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Profiles::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_profiles_username")
                    .table(Profiles::Table)
                    .col(Profiles::Username)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_profiles_external_id")
                    .table(Profiles::Table)
                    .col(Profiles::ExternalId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Top-N reads rank connections by their follower count
        manager
            .create_index(
                Index::create()
                    .name("idx_profiles_followers_count")
                    .table(Profiles::Table)
                    .col((Profiles::FollowersCount, IndexOrder::Desc))
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn create_follow_edges(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(FollowEdges::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(FollowEdges::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(FollowEdges::FollowerId).uuid().not_null())
                    .col(ColumnDef::new(FollowEdges::FolloweeId).uuid().not_null())
                    .col(
                        ColumnDef::new(FollowEdges::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_follow_edges_follower")
                            .from(FollowEdges::Table, FollowEdges::FollowerId)
                            .to(Profiles::Table, Profiles::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_follow_edges_followee")
                            .from(FollowEdges::Table, FollowEdges::FolloweeId)
                            .to(Profiles::Table, Profiles::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // At most one edge per ordered pair
        manager
            .create_index(
                Index::create()
                    .name("idx_follow_edges_pair")
                    .table(FollowEdges::Table)
                    .col(FollowEdges::FollowerId)
                    .col(FollowEdges::FolloweeId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_follow_edges_followee")
                    .table(FollowEdges::Table)
                    .col(FollowEdges::FolloweeId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
#[sea_orm(iden = "profiles")]
enum Profiles {
    Table,
    Id,
    ExternalId,
    Username,
    Name,
    Location,
    Bio,
    Url,
    Email,
    ProfileBannerUrl,
    ProfileImageUrl,
    Verified,
    Protected,
    DefaultProfile,
    DefaultProfileImage,
    FollowersCount,
    FollowingsCount,
    FavouritesCount,
    ListedCount,
    PostsCount,
    Entities,
    JoinedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
#[sea_orm(iden = "follow_edges")]
enum FollowEdges {
    Table,
    Id,
    FollowerId,
    FolloweeId,
    CreatedAt,
}
