use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::predict::label::{HeuristicLabeler, LabelSynthesizer, TipCategory, TipThresholds};
use crate::predict::ml::{LinearRegressor, SoftmaxClassifier};
use crate::predict::{load_model_inputs, ModelInput};
use crate::stage::StageSummary;
use log::info;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// 固定 80/20 切分
pub const HOLDOUT_RATIO: f64 = 0.2;

/// 训练产物：两个模型 + 产出标签时用的阈值表，一起序列化，
/// 保证 serving 端分档口径与训练标签一致。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainedModels {
    pub regressor: LinearRegressor,
    pub classifier: SoftmaxClassifier,
    pub thresholds: TipThresholds,
}

impl TrainedModels {
    pub fn save(&self, path: &Path) -> Result<(), PipelineError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

/// 纯训练函数，不碰存储；空数据集直接失败，绝不训练 0 行。
pub fn train(
    inputs: &[ModelInput],
    labeler: &mut dyn LabelSynthesizer,
    split_seed: u64,
    thresholds: TipThresholds,
) -> Result<TrainedModels, PipelineError> {
    if inputs.is_empty() {
        return Err(PipelineError::InsufficientData(
            "training dataset is empty".to_string(),
        ));
    }

    let labels: Vec<f64> = inputs.iter().map(|i| labeler.label(i)).collect();
    let features: Vec<Vec<f64>> = inputs.iter().map(ModelInput::features).collect();

    let mut order: Vec<usize> = (0..inputs.len()).collect();
    order.shuffle(&mut StdRng::seed_from_u64(split_seed));
    // 训练分区必须非空，小数据集下压缩留出集
    let holdout =
        ((inputs.len() as f64 * HOLDOUT_RATIO).round() as usize).min(inputs.len() - 1);
    let (test_idx, train_idx) = order.split_at(holdout);

    let x_train: Vec<Vec<f64>> = train_idx.iter().map(|&i| features[i].clone()).collect();
    let y_train: Vec<f64> = train_idx.iter().map(|&i| labels[i]).collect();
    let x_test: Vec<Vec<f64>> = test_idx.iter().map(|&i| features[i].clone()).collect();
    let y_test: Vec<f64> = test_idx.iter().map(|&i| labels[i]).collect();

    let regressor = LinearRegressor::fit(&x_train, &y_train)?;
    if x_test.is_empty() {
        info!("held-out partition is empty, skipping diagnostics");
    } else {
        // 诊断值，不构成错误条件
        info!(
            "linear regression held-out MAE: {:.2}%",
            regressor.mean_absolute_error(&x_test, &y_test)
        );
    }

    let cat_train: Vec<TipCategory> = y_train.iter().map(|&t| thresholds.categorize(t)).collect();
    let classifier = SoftmaxClassifier::fit(&x_train, &cat_train)?;
    if !x_test.is_empty() {
        let cat_test: Vec<TipCategory> =
            y_test.iter().map(|&t| thresholds.categorize(t)).collect();
        info!(
            "logistic classifier held-out accuracy: {:.1}%",
            classifier.accuracy(&x_test, &cat_test) * 100.0
        );
    }

    Ok(TrainedModels {
        regressor,
        classifier,
        thresholds,
    })
}

pub struct TrainerService {
    db: Arc<DatabaseConnection>,
    label_seed: u64,
    split_seed: u64,
    thresholds: TipThresholds,
    model_path: PathBuf,
}

impl TrainerService {
    pub fn new(db: Arc<DatabaseConnection>, cfg: &PipelineConfig) -> Self {
        Self {
            db,
            label_seed: cfg.label_seed,
            split_seed: cfg.split_seed,
            thresholds: cfg.thresholds,
            model_path: cfg.model_path.clone(),
        }
    }

    pub async fn run(&self) -> Result<(TrainedModels, StageSummary), PipelineError> {
        let inputs = load_model_inputs(&self.db).await?;
        let mut labeler = HeuristicLabeler::new(self.label_seed);
        let models = train(&inputs, &mut labeler, self.split_seed, self.thresholds)?;
        models.save(&self.model_path)?;
        info!("model artifact written to {}", self.model_path.display());
        Ok((
            models,
            StageSummary {
                processed: inputs.len() as u64,
                ..Default::default()
            },
        ))
    }
}
