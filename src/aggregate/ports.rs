use crate::error::PipelineError;
use crate::storage::entity::review::{self, Entity as Review};
use crate::storage::repository::{MenuItemRepository, RestaurantRepository};
use async_trait::async_trait;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QuerySelect};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct ReviewRecord {
    pub stars: i32,
    pub text: String,
}

/// 聚合器的读端口。分页拉取让单店评论数不设上限。
#[async_trait]
pub trait ReviewSource: Send + Sync {
    async fn restaurant_exists(&self, restaurant_id: &str) -> Result<bool, PipelineError>;
    async fn fetch_reviews(
        &self,
        restaurant_id: &str,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<ReviewRecord>, PipelineError>;
    async fn fetch_menu_prices(&self, restaurant_id: &str) -> Result<Vec<f64>, PipelineError>;
}

#[derive(Clone)]
pub struct DbReviewSource {
    db: Arc<DatabaseConnection>,
}

impl DbReviewSource {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ReviewSource for DbReviewSource {
    async fn restaurant_exists(&self, restaurant_id: &str) -> Result<bool, PipelineError> {
        Ok(RestaurantRepository::exists(&self.db, restaurant_id).await?)
    }

    async fn fetch_reviews(
        &self,
        restaurant_id: &str,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<ReviewRecord>, PipelineError> {
        let models = Review::find()
            .filter(review::Column::RestaurantId.eq(restaurant_id))
            .offset(offset)
            .limit(limit)
            .all(self.db.as_ref())
            .await?;
        Ok(models
            .into_iter()
            .map(|m| ReviewRecord {
                stars: m.stars,
                text: m.text,
            })
            .collect())
    }

    async fn fetch_menu_prices(&self, restaurant_id: &str) -> Result<Vec<f64>, PipelineError> {
        Ok(MenuItemRepository::fetch_prices_for(&self.db, restaurant_id).await?)
    }
}
