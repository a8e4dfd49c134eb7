pub mod label;
pub mod ml;
pub mod trainer;
pub mod writer;

pub use trainer::{train, TrainedModels, TrainerService};
pub use writer::PredictionWriter;

use crate::error::PipelineError;
use crate::storage::repository::{FeatureRepository, RestaurantRepository};
use log::warn;
use sea_orm::DatabaseConnection;

/// 一家餐厅喂给模型的全部输入：特征行 + 餐厅自身属性
#[derive(Debug, Clone)]
pub struct ModelInput {
    pub restaurant_id: String,
    pub stars: f64,
    pub price_tier: i32,
    pub avg_sentiment: f64,
    pub service_mentions: i32,
    pub avg_price: f64,
}

impl ModelInput {
    /// 固定特征顺序: stars, price_tier, avg_sentiment,
    /// service_mentions, avg_price。训练与推断共用。
    pub fn features(&self) -> Vec<f64> {
        vec![
            self.stars,
            f64::from(self.price_tier),
            self.avg_sentiment,
            f64::from(self.service_mentions),
            self.avg_price,
        ]
    }
}

/// 特征表与餐厅表按 id 内存 join；没有特征行的餐厅自然缺席
pub async fn load_model_inputs(
    db: &DatabaseConnection,
) -> Result<Vec<ModelInput>, PipelineError> {
    let features = FeatureRepository::load_all(db).await?;
    let ids: Vec<String> = features.iter().map(|f| f.restaurant_id.clone()).collect();
    let restaurants = RestaurantRepository::load_by_ids(db, ids).await?;

    let mut inputs = Vec::with_capacity(features.len());
    for f in features {
        let Some(r) = restaurants.get(&f.restaurant_id) else {
            warn!(
                "feature row {} has no restaurant, skipping",
                f.restaurant_id
            );
            continue;
        };
        inputs.push(ModelInput {
            restaurant_id: f.restaurant_id,
            stars: r.stars,
            price_tier: r.price_tier,
            avg_sentiment: f.avg_sentiment,
            service_mentions: f.service_mentions,
            avg_price: f.avg_price,
        });
    }
    Ok(inputs)
}
