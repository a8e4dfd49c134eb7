use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::predict::trainer::TrainedModels;
use crate::predict::load_model_inputs;
use crate::stage::StageSummary;
use crate::storage::repository::{PredictionRepository, PredictionRow};
use log::{info, warn};
use sea_orm::{DatabaseConnection, TransactionTrait};
use std::sync::Arc;
use tokio::time::{sleep, Duration};

/// 把训练好的模型套到所有特征行上并落预测表。
/// 模型是传入的不可变值对象，写入契约与特征表相同：
/// 按主键 replace-on-conflict，按批提交。
pub struct PredictionWriter {
    db: Arc<DatabaseConnection>,
    batch_size: usize,
    max_commit_retries: u32,
}

impl PredictionWriter {
    pub fn new(db: Arc<DatabaseConnection>, cfg: &PipelineConfig) -> Self {
        Self {
            db,
            batch_size: cfg.commit_batch_size,
            max_commit_retries: cfg.max_commit_retries,
        }
    }

    pub async fn run(&self, models: &TrainedModels) -> Result<StageSummary, PipelineError> {
        let inputs = load_model_inputs(&self.db).await?;
        if inputs.is_empty() {
            // 没有特征行的餐厅只是被跳过，不是错误
            info!("no feature vectors to predict on");
            return Ok(StageSummary::default());
        }

        let mut summary = StageSummary::default();
        for chunk in inputs.chunks(self.batch_size) {
            let rows: Vec<PredictionRow> = chunk
                .iter()
                .map(|input| {
                    let features = input.features();
                    PredictionRow {
                        restaurant_id: input.restaurant_id.clone(),
                        predicted_tip_pct: models.regressor.predict(&features),
                        // 存的档位由分类器决定，不做阈值反推
                        tip_category: models.classifier.predict(&features),
                    }
                })
                .collect();

            self.commit_batch(&rows).await?;
            summary.processed += rows.len() as u64;
        }

        info!("wrote {} predictions", summary.processed);
        Ok(summary)
    }

    async fn commit_batch(&self, rows: &[PredictionRow]) -> Result<(), PipelineError> {
        let mut attempt = 0u32;
        loop {
            match self.try_commit(rows).await {
                Ok(()) => return Ok(()),
                Err(e) if attempt < self.max_commit_retries => {
                    attempt += 1;
                    let delay = (1u64 << attempt.min(5)).min(30);
                    warn!(
                        "prediction batch commit failed (attempt {}/{}), replaying in {}s: {}",
                        attempt, self.max_commit_retries, delay, e
                    );
                    sleep(Duration::from_secs(delay)).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn try_commit(&self, rows: &[PredictionRow]) -> Result<(), sea_orm::DbErr> {
        let txn = self.db.begin().await?;
        PredictionRepository::upsert_batch(&txn, rows).await?;
        txn.commit().await
    }
}
