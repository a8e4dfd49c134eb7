use crate::storage::entity::menu_item::{self, Entity as MenuItem};
use crate::storage::entity::restaurant::{
    self, ActiveModel as RestaurantActiveModel, Entity as Restaurant, Model as RestaurantModel,
};
use crate::storage::entity::restaurant_feature::{self, Entity as RestaurantFeature};
use crate::storage::entity::review::{self, Entity as Review};
use crate::storage::entity::tip_prediction::{self, Entity as TipPrediction};
use chrono::Utc;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QuerySelect, Set, TransactionTrait,
};
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct RestaurantSeed {
    pub restaurant_id: String,
    pub name: String,
    pub city: String,
    pub state: String,
    pub stars: f64,
    pub price_tier: i32,
}

pub struct RestaurantRepository;

impl RestaurantRepository {
    pub async fn insert_or_ignore_batch<C: ConnectionTrait>(
        conn: &C,
        seeds: Vec<RestaurantSeed>,
    ) -> Result<u64, sea_orm::DbErr> {
        if seeds.is_empty() {
            return Ok(0);
        }
        let now = Utc::now().timestamp();
        let models: Vec<RestaurantActiveModel> = seeds
            .into_iter()
            .map(|s| RestaurantActiveModel {
                restaurant_id: Set(s.restaurant_id),
                name: Set(s.name),
                city: Set(s.city),
                state: Set(s.state),
                stars: Set(s.stars),
                review_count: Set(0),
                price_tier: Set(s.price_tier),
                created_at: Set(now),
            })
            .collect();

        Restaurant::insert_many(models)
            .on_conflict(
                sea_orm::sea_query::OnConflict::column(restaurant::Column::RestaurantId)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(conn)
            .await
    }

    pub async fn exists(db: &DatabaseConnection, id: &str) -> Result<bool, sea_orm::DbErr> {
        Ok(Restaurant::find_by_id(id).one(db).await?.is_some())
    }

    pub async fn all_ids(db: &DatabaseConnection) -> Result<Vec<String>, sea_orm::DbErr> {
        Restaurant::find()
            .select_only()
            .column(restaurant::Column::RestaurantId)
            .into_tuple::<String>()
            .all(db)
            .await
    }

    pub async fn count(db: &DatabaseConnection) -> Result<u64, sea_orm::DbErr> {
        Restaurant::find().count(db).await
    }

    /// 模型输入需要 stars / price_tier，按 id 做内存 join
    pub async fn load_by_ids(
        db: &DatabaseConnection,
        ids: Vec<String>,
    ) -> Result<HashMap<String, RestaurantModel>, sea_orm::DbErr> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let models = Restaurant::find()
            .filter(restaurant::Column::RestaurantId.is_in(ids))
            .all(db)
            .await?;
        Ok(models
            .into_iter()
            .map(|m| (m.restaurant_id.clone(), m))
            .collect())
    }

    /// 用 reviews 表重算 review_count（摄取结束时执行一次）
    pub async fn refresh_review_counts(db: &DatabaseConnection) -> Result<u64, sea_orm::DbErr> {
        let backend = db.get_database_backend();
        let res = db
            .execute(sea_orm::Statement::from_string(
                backend,
                "UPDATE restaurants SET review_count = (SELECT COUNT(*) FROM reviews WHERE reviews.restaurant_id = restaurants.restaurant_id);"
                    .to_string(),
            ))
            .await?;
        Ok(res.rows_affected())
    }

    /// 级联删除: 子表先删，同一事务内完成
    pub async fn delete_cascade(
        db: &DatabaseConnection,
        restaurant_id: &str,
    ) -> Result<(), sea_orm::DbErr> {
        let txn = db.begin().await?;

        TipPrediction::delete_many()
            .filter(tip_prediction::Column::RestaurantId.eq(restaurant_id))
            .exec(&txn)
            .await?;
        RestaurantFeature::delete_many()
            .filter(restaurant_feature::Column::RestaurantId.eq(restaurant_id))
            .exec(&txn)
            .await?;
        MenuItem::delete_many()
            .filter(menu_item::Column::RestaurantId.eq(restaurant_id))
            .exec(&txn)
            .await?;
        Review::delete_many()
            .filter(review::Column::RestaurantId.eq(restaurant_id))
            .exec(&txn)
            .await?;
        Restaurant::delete_many()
            .filter(restaurant::Column::RestaurantId.eq(restaurant_id))
            .exec(&txn)
            .await?;

        txn.commit().await?;
        Ok(())
    }
}
