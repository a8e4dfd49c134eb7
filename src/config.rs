use crate::predict::label::TipThresholds;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub database_url: String,
    /// 每批落库的行数上限；崩溃最多丢这一批
    pub commit_batch_size: usize,
    pub worker_count: usize,
    pub max_commit_retries: u32,
    pub label_seed: u64,
    pub split_seed: u64,
    /// 摄取时合成餐厅属性用的种子；同一文件重放得到同样的属性
    pub ingest_seed: u64,
    pub model_path: PathBuf,
    /// 训练标签与任何按阈值派生的报表共用的分档表
    pub thresholds: TipThresholds,
}

impl PipelineConfig {
    pub fn from_env() -> Self {
        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://tipcast.db?mode=rwc".to_string());
        let worker_count = std::env::var("TIPCAST_WORKERS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(|| {
                std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(4)
            });
        // dashboard 阈值与训练阈值并不一致，这里只选一套作为
        // 标配，差异本身保留为配置项
        let thresholds = match std::env::var("TIPCAST_THRESHOLDS").as_deref() {
            Ok("dashboard") => TipThresholds::DASHBOARD,
            _ => TipThresholds::TRAINING,
        };

        Self {
            database_url,
            commit_batch_size: env_parse("TIPCAST_COMMIT_BATCH", 500),
            worker_count,
            max_commit_retries: env_parse("TIPCAST_COMMIT_RETRIES", 3),
            label_seed: env_parse("TIPCAST_LABEL_SEED", 7),
            split_seed: env_parse("TIPCAST_SPLIT_SEED", 42),
            ingest_seed: env_parse("TIPCAST_INGEST_SEED", 11),
            model_path: PathBuf::from(
                std::env::var("TIPCAST_MODEL_PATH")
                    .unwrap_or_else(|_| "models/tip_models.json".to_string()),
            ),
            thresholds,
        }
    }
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}
