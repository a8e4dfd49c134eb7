use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "restaurant_features")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub restaurant_id: String,
    /// Mean of per-review sentiment scores, in [-1, 1].
    pub avg_sentiment: f64,
    /// Reviews rated >= 4. Together with negative_reviews this never
    /// exceeds the total review count; 3-star reviews count in neither.
    pub positive_reviews: i32,
    /// Reviews rated <= 2.
    pub negative_reviews: i32,
    pub service_mentions: i32,
    /// 0 means the restaurant has no menu items, not a free menu.
    pub avg_price: f64,
    pub updated_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
