use crate::aggregate::model::{FeatureAccumulator, FeatureVector};
use crate::aggregate::ports::{DbReviewSource, ReviewSource};
use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::sentiment::SentimentScorer;
use crate::stage::StageSummary;
use crate::storage::repository::{FeatureRepository, RestaurantRepository};
use futures::stream::{self, StreamExt};
use log::{info, warn};
use sea_orm::{DatabaseConnection, TransactionTrait};
use std::sync::Arc;
use tokio::time::{sleep, Duration};

const REVIEW_PAGE_SIZE: u64 = 500;

/// 读端口 + 纯累加器；本身不做持久化
#[derive(Clone)]
pub struct Aggregator {
    source: Arc<dyn ReviewSource>,
    scorer: Arc<dyn SentimentScorer>,
}

impl Aggregator {
    pub fn new(source: Arc<dyn ReviewSource>, scorer: Arc<dyn SentimentScorer>) -> Self {
        Self { source, scorer }
    }

    /// 0 条评论 -> None；餐厅不存在 -> NotFound
    pub async fn aggregate(
        &self,
        restaurant_id: &str,
    ) -> Result<Option<FeatureVector>, PipelineError> {
        if !self.source.restaurant_exists(restaurant_id).await? {
            return Err(PipelineError::NotFound(format!(
                "restaurant {}",
                restaurant_id
            )));
        }

        let mut acc = FeatureAccumulator::new();
        let mut offset = 0u64;
        loop {
            let page = self
                .source
                .fetch_reviews(restaurant_id, offset, REVIEW_PAGE_SIZE)
                .await?;
            let fetched = page.len() as u64;
            for review in page {
                acc.add_review(review.stars, &review.text, self.scorer.as_ref());
            }
            if fetched < REVIEW_PAGE_SIZE {
                break;
            }
            offset += fetched;
        }

        if acc.review_count() == 0 {
            return Ok(None);
        }

        let prices = self.source.fetch_menu_prices(restaurant_id).await?;
        acc.finish(&prices)
    }
}

/// 批量驱动: 全量餐厅 -> 有界并发聚合 -> 按批落库。
/// 每批一个事务，崩溃最多丢未提交的尾批，重跑是纯覆盖。
pub struct AggregateService {
    db: Arc<DatabaseConnection>,
    aggregator: Aggregator,
    batch_size: usize,
    worker_count: usize,
    max_commit_retries: u32,
}

impl AggregateService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        scorer: Arc<dyn SentimentScorer>,
        cfg: &PipelineConfig,
    ) -> Self {
        let source = Arc::new(DbReviewSource::new(db.clone()));
        Self {
            db,
            aggregator: Aggregator::new(source, scorer),
            batch_size: cfg.commit_batch_size,
            worker_count: cfg.worker_count,
            max_commit_retries: cfg.max_commit_retries,
        }
    }

    pub async fn run(&self) -> Result<StageSummary, PipelineError> {
        let ids = RestaurantRepository::all_ids(&self.db).await?;
        info!("aggregating features for {} restaurants", ids.len());

        let mut summary = StageSummary::default();
        for chunk in ids.chunks(self.batch_size) {
            let results: Vec<(String, Result<Option<FeatureVector>, PipelineError>)> =
                stream::iter(chunk.to_vec())
                    .map(|id| {
                        let aggregator = self.aggregator.clone();
                        async move {
                            let result = aggregator.aggregate(&id).await;
                            (id, result)
                        }
                    })
                    .buffer_unordered(self.worker_count)
                    .collect()
                    .await;

            let mut rows: Vec<(String, FeatureVector)> = Vec::new();
            for (id, result) in results {
                match result {
                    Ok(Some(features)) => rows.push((id, features)),
                    Ok(None) => {
                        // 无评论的餐厅不写特征行
                        summary.skipped += 1;
                    }
                    Err(PipelineError::Validation(msg)) => {
                        warn!("skipping restaurant {}: {}", id, msg);
                        summary.skipped += 1;
                    }
                    Err(e) => {
                        // 单店失败不拖垮整批
                        warn!("aggregation failed for restaurant {}: {}", id, e);
                        summary.failed += 1;
                    }
                }
            }

            self.commit_batch(&rows).await?;
            summary.processed += rows.len() as u64;
        }

        Ok(summary)
    }

    /// 瞬时存储错误按批重放，指数退避；重试耗尽则阶段失败
    async fn commit_batch(&self, rows: &[(String, FeatureVector)]) -> Result<(), PipelineError> {
        if rows.is_empty() {
            return Ok(());
        }
        let mut attempt = 0u32;
        loop {
            match self.try_commit(rows).await {
                Ok(()) => return Ok(()),
                Err(e) if attempt < self.max_commit_retries => {
                    attempt += 1;
                    let delay = (1u64 << attempt.min(5)).min(30);
                    warn!(
                        "batch commit failed (attempt {}/{}), replaying in {}s: {}",
                        attempt, self.max_commit_retries, delay, e
                    );
                    sleep(Duration::from_secs(delay)).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn try_commit(&self, rows: &[(String, FeatureVector)]) -> Result<(), sea_orm::DbErr> {
        let txn = self.db.begin().await?;
        for (id, features) in rows {
            FeatureRepository::upsert(&txn, id, features).await?;
        }
        txn.commit().await
    }
}
