mod aggregate;
mod config;
mod error;
mod ingest;
mod predict;
mod sentiment;
mod stage;
mod storage;
#[cfg(test)]
mod tests;

use crate::aggregate::AggregateService;
use crate::config::PipelineConfig;
use crate::ingest::IngestService;
use crate::predict::{PredictionWriter, TrainedModels, TrainerService};
use crate::sentiment::{LexiconScorer, SentimentScorer};
use crate::stage::Stage;
use crate::storage::repository::{FeatureRepository, PredictionRepository};
use sea_orm::DatabaseConnection;
use std::path::Path;
use std::sync::Arc;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Warn)
        .filter_module("tipcast", log::LevelFilter::Info)
        .filter_module("sqlx", log::LevelFilter::Error)
        .filter_module("sea_orm", log::LevelFilter::Error)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let stage: Stage = match args.join(" ").parse() {
        Ok(stage) => stage,
        Err(usage) => {
            eprintln!("{}", usage);
            std::process::exit(2);
        }
    };

    let cfg = PipelineConfig::from_env();
    let db = Arc::new(storage::establish_connection(&cfg.database_url).await?);

    // 顺序驱动：第一个失败的阶段让进程以非零码退出，后续跳过
    match stage {
        Stage::Ingest { path } => run_ingest(&db, &cfg, Path::new(&path)).await?,
        Stage::Aggregate => run_aggregate(&db, &cfg).await?,
        Stage::Train => run_train(&db, &cfg).await?,
        Stage::Predict => run_predict(&db, &cfg).await?,
        Stage::All { ingest_path } => {
            if let Some(path) = ingest_path {
                run_ingest(&db, &cfg, Path::new(&path)).await?;
            }
            run_aggregate(&db, &cfg).await?;
            run_train(&db, &cfg).await?;
            run_predict(&db, &cfg).await?;
        }
    }

    Ok(())
}

async fn run_ingest(
    db: &Arc<DatabaseConnection>,
    cfg: &PipelineConfig,
    path: &Path,
) -> anyhow::Result<()> {
    let summary = IngestService::new(db.clone(), cfg).run(path).await?;
    println!("ingest: {}", summary);
    Ok(())
}

async fn run_aggregate(db: &Arc<DatabaseConnection>, cfg: &PipelineConfig) -> anyhow::Result<()> {
    let scorer: Arc<dyn SentimentScorer> = Arc::new(LexiconScorer::new());
    let summary = AggregateService::new(db.clone(), scorer, cfg).run().await?;
    println!("aggregate: {}", summary);

    let top = FeatureRepository::top_by_sentiment(db, 10).await?;
    if !top.is_empty() {
        println!("\nTop {} by sentiment:", top.len());
        for row in top {
            println!(
                "  {} ({}) - Sentiment: {:.3}, Service: {}",
                row.name, row.city, row.avg_sentiment, row.service_mentions
            );
        }
    }
    Ok(())
}

async fn run_train(db: &Arc<DatabaseConnection>, cfg: &PipelineConfig) -> anyhow::Result<()> {
    let (_models, summary) = TrainerService::new(db.clone(), cfg).run().await?;
    println!("train: {}", summary);
    Ok(())
}

async fn run_predict(db: &Arc<DatabaseConnection>, cfg: &PipelineConfig) -> anyhow::Result<()> {
    let models = TrainedModels::load(&cfg.model_path)?;
    let summary = PredictionWriter::new(db.clone(), cfg).run(&models).await?;
    println!("predict: {}", summary);

    let top = PredictionRepository::top_high(db, 10).await?;
    if !top.is_empty() {
        println!("\nTop {} restaurants for tips:", top.len());
        for row in top {
            println!(
                "  {} ({}) - {} stars - {:.1}%",
                row.name, row.city, row.stars, row.predicted_tip_pct
            );
        }
    }
    Ok(())
}
