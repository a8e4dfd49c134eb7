use crate::predict::label::TipCategory;
use crate::storage::entity::tip_prediction::{
    self, ActiveModel as PredictionActiveModel, Entity as TipPrediction,
    Model as PredictionModel,
};
use crate::storage::repository::RestaurantRepository;
use chrono::Utc;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};

#[derive(Debug, Clone)]
pub struct PredictionRow {
    pub restaurant_id: String,
    pub predicted_tip_pct: f64,
    pub tip_category: TipCategory,
}

/// predict 阶段结束后打印的小费榜单行
#[derive(Debug, Clone)]
pub struct TipReportRow {
    pub name: String,
    pub city: String,
    pub stars: f64,
    pub predicted_tip_pct: f64,
}

pub struct PredictionRepository;

impl PredictionRepository {
    pub async fn upsert_batch<C: ConnectionTrait>(
        conn: &C,
        rows: &[PredictionRow],
    ) -> Result<u64, sea_orm::DbErr> {
        if rows.is_empty() {
            return Ok(0);
        }
        let now = Utc::now().timestamp();
        let models: Vec<PredictionActiveModel> = rows
            .iter()
            .map(|r| PredictionActiveModel {
                restaurant_id: Set(r.restaurant_id.clone()),
                predicted_tip_pct: Set(r.predicted_tip_pct),
                tip_category: Set(r.tip_category.as_str().to_string()),
                updated_at: Set(now),
            })
            .collect();

        TipPrediction::insert_many(models)
            .on_conflict(
                sea_orm::sea_query::OnConflict::column(tip_prediction::Column::RestaurantId)
                    .update_columns([
                        tip_prediction::Column::PredictedTipPct,
                        tip_prediction::Column::TipCategory,
                        tip_prediction::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(conn)
            .await?;
        Ok(rows.len() as u64)
    }

    pub async fn load_all(
        db: &DatabaseConnection,
    ) -> Result<Vec<PredictionModel>, sea_orm::DbErr> {
        TipPrediction::find().all(db).await
    }

    pub async fn count(db: &DatabaseConnection) -> Result<u64, sea_orm::DbErr> {
        TipPrediction::find().count(db).await
    }

    pub async fn top_high(
        db: &DatabaseConnection,
        limit: u64,
    ) -> Result<Vec<TipReportRow>, sea_orm::DbErr> {
        let predictions = TipPrediction::find()
            .filter(tip_prediction::Column::TipCategory.eq(TipCategory::High.as_str()))
            .order_by_desc(tip_prediction::Column::PredictedTipPct)
            .limit(limit)
            .all(db)
            .await?;
        let ids: Vec<String> = predictions
            .iter()
            .map(|p| p.restaurant_id.clone())
            .collect();
        let restaurants = RestaurantRepository::load_by_ids(db, ids).await?;

        Ok(predictions
            .into_iter()
            .filter_map(|p| {
                restaurants.get(&p.restaurant_id).map(|r| TipReportRow {
                    name: r.name.clone(),
                    city: r.city.clone(),
                    stars: r.stars,
                    predicted_tip_pct: p.predicted_tip_pct,
                })
            })
            .collect())
    }
}
