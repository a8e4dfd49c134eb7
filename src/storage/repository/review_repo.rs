use crate::storage::entity::review::{self, ActiveModel as ReviewActiveModel, Entity as Review};
use chrono::Utc;
use sea_orm::{ConnectionTrait, DatabaseConnection, EntityTrait, PaginatorTrait, Set};

#[derive(Debug, Clone)]
pub struct ReviewSeed {
    pub review_id: String,
    pub restaurant_id: String,
    pub stars: i32,
    pub text: String,
    pub date: String,
}

pub struct ReviewRepository;

impl ReviewRepository {
    /// review_id 为主键，重复摄取是 no-op
    pub async fn insert_or_ignore_batch<C: ConnectionTrait>(
        conn: &C,
        seeds: Vec<ReviewSeed>,
    ) -> Result<u64, sea_orm::DbErr> {
        if seeds.is_empty() {
            return Ok(0);
        }
        let now = Utc::now().timestamp();
        let models: Vec<ReviewActiveModel> = seeds
            .into_iter()
            .map(|s| ReviewActiveModel {
                review_id: Set(s.review_id),
                restaurant_id: Set(s.restaurant_id),
                stars: Set(s.stars),
                text: Set(s.text),
                date: Set(s.date),
                created_at: Set(now),
            })
            .collect();

        Review::insert_many(models)
            .on_conflict(
                sea_orm::sea_query::OnConflict::column(review::Column::ReviewId)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(conn)
            .await
    }

    pub async fn count(db: &DatabaseConnection) -> Result<u64, sea_orm::DbErr> {
        Review::find().count(db).await
    }
}
