use crate::aggregate::model::FeatureVector;
use crate::storage::entity::restaurant_feature::{
    self, ActiveModel as FeatureActiveModel, Entity as RestaurantFeature, Model as FeatureModel,
};
use crate::storage::repository::RestaurantRepository;
use chrono::Utc;
use sea_orm::{
    ConnectionTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryOrder, QuerySelect,
    Set,
};

/// aggregate 阶段结束后打印的情感榜单行
#[derive(Debug, Clone)]
pub struct SentimentReportRow {
    pub name: String,
    pub city: String,
    pub avg_sentiment: f64,
    pub service_mentions: i32,
}

pub struct FeatureRepository;

impl FeatureRepository {
    /// Replace-on-conflict: 最近一次计算整行覆盖旧行
    pub async fn upsert<C: ConnectionTrait>(
        conn: &C,
        restaurant_id: &str,
        features: &FeatureVector,
    ) -> Result<(), sea_orm::DbErr> {
        let now = Utc::now().timestamp();
        let model = FeatureActiveModel {
            restaurant_id: Set(restaurant_id.to_string()),
            avg_sentiment: Set(features.avg_sentiment),
            positive_reviews: Set(features.positive_reviews),
            negative_reviews: Set(features.negative_reviews),
            service_mentions: Set(features.service_mentions),
            avg_price: Set(features.avg_price),
            updated_at: Set(now),
        };

        RestaurantFeature::insert(model)
            .on_conflict(
                sea_orm::sea_query::OnConflict::column(restaurant_feature::Column::RestaurantId)
                    .update_columns([
                        restaurant_feature::Column::AvgSentiment,
                        restaurant_feature::Column::PositiveReviews,
                        restaurant_feature::Column::NegativeReviews,
                        restaurant_feature::Column::ServiceMentions,
                        restaurant_feature::Column::AvgPrice,
                        restaurant_feature::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(conn)
            .await?;
        Ok(())
    }

    pub async fn load_all(db: &DatabaseConnection) -> Result<Vec<FeatureModel>, sea_orm::DbErr> {
        RestaurantFeature::find().all(db).await
    }

    pub async fn get(
        db: &DatabaseConnection,
        restaurant_id: &str,
    ) -> Result<Option<FeatureModel>, sea_orm::DbErr> {
        RestaurantFeature::find_by_id(restaurant_id).one(db).await
    }

    pub async fn count(db: &DatabaseConnection) -> Result<u64, sea_orm::DbErr> {
        RestaurantFeature::find().count(db).await
    }

    pub async fn top_by_sentiment(
        db: &DatabaseConnection,
        limit: u64,
    ) -> Result<Vec<SentimentReportRow>, sea_orm::DbErr> {
        let features = RestaurantFeature::find()
            .order_by_desc(restaurant_feature::Column::AvgSentiment)
            .limit(limit)
            .all(db)
            .await?;
        let ids: Vec<String> = features.iter().map(|f| f.restaurant_id.clone()).collect();
        let restaurants = RestaurantRepository::load_by_ids(db, ids).await?;

        Ok(features
            .into_iter()
            .filter_map(|f| {
                restaurants.get(&f.restaurant_id).map(|r| SentimentReportRow {
                    name: r.name.clone(),
                    city: r.city.clone(),
                    avg_sentiment: f.avg_sentiment,
                    service_mentions: f.service_mentions,
                })
            })
            .collect())
    }
}
