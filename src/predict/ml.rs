use crate::error::PipelineError;
use crate::predict::label::TipCategory;
use serde::{Deserialize, Serialize};

// 参考实现: 最小二乘线性回归 + softmax 多分类。管线只依赖
// fit/predict 契约，换别的模型不影响其余阶段。

const SOFTMAX_LEARNING_RATE: f64 = 0.5;
const SOFTMAX_EPOCHS: usize = 1500;

/// 正规方程求解的线性回归。weights[0] 是截距。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearRegressor {
    weights: Vec<f64>,
}

impl LinearRegressor {
    pub fn fit(x: &[Vec<f64>], y: &[f64]) -> Result<Self, PipelineError> {
        if x.is_empty() || x.len() != y.len() {
            return Err(PipelineError::ModelFit(format!(
                "regressor needs matching non-empty samples, got {} features / {} targets",
                x.len(),
                y.len()
            )));
        }
        let d = x[0].len() + 1;
        let mut xtx = vec![vec![0.0; d]; d];
        let mut xty = vec![0.0; d];
        for (row, &target) in x.iter().zip(y) {
            let aug = augment(row);
            for i in 0..d {
                xty[i] += aug[i] * target;
                for j in 0..d {
                    xtx[i][j] += aug[i] * aug[j];
                }
            }
        }
        // 微小岭项防共线列（比如常数特征撞上截距列）
        let scale = (0..d).map(|i| xtx[i][i]).fold(1.0f64, f64::max);
        for (i, row) in xtx.iter_mut().enumerate() {
            row[i] += 1e-8 * scale;
        }

        let weights = solve_linear_system(xtx, xty)?;
        Ok(Self { weights })
    }

    pub fn predict(&self, features: &[f64]) -> f64 {
        self.weights[0]
            + features
                .iter()
                .zip(&self.weights[1..])
                .map(|(f, w)| f * w)
                .sum::<f64>()
    }

    pub fn mean_absolute_error(&self, x: &[Vec<f64>], y: &[f64]) -> f64 {
        if x.is_empty() {
            return 0.0;
        }
        let total: f64 = x
            .iter()
            .zip(y)
            .map(|(row, &target)| (self.predict(row) - target).abs())
            .sum();
        total / x.len() as f64
    }
}

/// 拟合时捕获的 z-score 标准化参数，随模型一起序列化
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Scaler {
    mean: Vec<f64>,
    std_dev: Vec<f64>,
}

impl Scaler {
    fn fit(x: &[Vec<f64>]) -> Self {
        let d = x[0].len();
        let n = x.len() as f64;
        let mut mean = vec![0.0; d];
        for row in x {
            for (m, v) in mean.iter_mut().zip(row) {
                *m += v;
            }
        }
        for m in &mut mean {
            *m /= n;
        }
        let mut std_dev = vec![0.0; d];
        for row in x {
            for (s, (v, m)) in std_dev.iter_mut().zip(row.iter().zip(&mean)) {
                *s += (v - m) * (v - m);
            }
        }
        for s in &mut std_dev {
            *s = (*s / n).sqrt();
            if *s < 1e-12 {
                *s = 1.0;
            }
        }
        Self { mean, std_dev }
    }

    fn transform(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .zip(self.mean.iter().zip(&self.std_dev))
            .map(|(v, (m, s))| (v - m) / s)
            .collect()
    }
}

/// 多分类 logistic 回归（softmax），确定性全批梯度下降。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoftmaxClassifier {
    scaler: Scaler,
    /// 每类一行，长度 = 特征数 + 1（截距在前）
    weights: Vec<Vec<f64>>,
}

impl SoftmaxClassifier {
    pub fn fit(x: &[Vec<f64>], labels: &[TipCategory]) -> Result<Self, PipelineError> {
        if x.is_empty() || x.len() != labels.len() {
            return Err(PipelineError::ModelFit(format!(
                "classifier needs matching non-empty samples, got {} features / {} labels",
                x.len(),
                labels.len()
            )));
        }
        let scaler = Scaler::fit(x);
        let rows: Vec<Vec<f64>> = x.iter().map(|r| augment(&scaler.transform(r))).collect();
        let d = rows[0].len();
        let n = rows.len() as f64;

        let mut weights = vec![vec![0.0; d]; TipCategory::COUNT];
        for _ in 0..SOFTMAX_EPOCHS {
            let mut grad = vec![vec![0.0; d]; TipCategory::COUNT];
            for (row, label) in rows.iter().zip(labels) {
                let probs = softmax(&logits(&weights, row));
                for (k, grad_k) in grad.iter_mut().enumerate() {
                    let err = probs[k] - if k == label.index() { 1.0 } else { 0.0 };
                    for (g, v) in grad_k.iter_mut().zip(row) {
                        *g += err * v;
                    }
                }
            }
            for (w_k, grad_k) in weights.iter_mut().zip(&grad) {
                for (w, g) in w_k.iter_mut().zip(grad_k) {
                    *w -= SOFTMAX_LEARNING_RATE * g / n;
                }
            }
        }

        if weights
            .iter()
            .any(|w_k| w_k.iter().any(|w| !w.is_finite()))
        {
            return Err(PipelineError::ModelFit(
                "classifier weights diverged".to_string(),
            ));
        }

        Ok(Self { scaler, weights })
    }

    pub fn predict(&self, features: &[f64]) -> TipCategory {
        let row = augment(&self.scaler.transform(features));
        let scores = logits(&self.weights, &row);
        let mut best = 0;
        for (k, score) in scores.iter().enumerate() {
            if *score > scores[best] {
                best = k;
            }
        }
        TipCategory::from_index(best)
    }

    pub fn accuracy(&self, x: &[Vec<f64>], labels: &[TipCategory]) -> f64 {
        if x.is_empty() {
            return 0.0;
        }
        let correct = x
            .iter()
            .zip(labels)
            .filter(|(row, label)| self.predict(row.as_slice()) == **label)
            .count();
        correct as f64 / x.len() as f64
    }
}

fn augment(row: &[f64]) -> Vec<f64> {
    let mut aug = Vec::with_capacity(row.len() + 1);
    aug.push(1.0);
    aug.extend_from_slice(row);
    aug
}

fn logits(weights: &[Vec<f64>], row: &[f64]) -> Vec<f64> {
    weights
        .iter()
        .map(|w_k| w_k.iter().zip(row).map(|(w, v)| w * v).sum())
        .collect()
}

fn softmax(scores: &[f64]) -> Vec<f64> {
    let max = scores.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));
    let exps: Vec<f64> = scores.iter().map(|s| (s - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.iter().map(|e| e / sum).collect()
}

/// 高斯消元（部分主元）。岭项保证系数阵正定，奇异即报错。
fn solve_linear_system(
    mut a: Vec<Vec<f64>>,
    mut b: Vec<f64>,
) -> Result<Vec<f64>, PipelineError> {
    let n = b.len();
    for col in 0..n {
        let mut pivot = col;
        for row in col + 1..n {
            if a[row][col].abs() > a[pivot][col].abs() {
                pivot = row;
            }
        }
        if a[pivot][col].abs() < 1e-12 {
            return Err(PipelineError::ModelFit(
                "singular normal-equation matrix".to_string(),
            ));
        }
        a.swap(col, pivot);
        b.swap(col, pivot);

        for row in col + 1..n {
            let factor = a[row][col] / a[col][col];
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let mut sum = b[row];
        for col in row + 1..n {
            sum -= a[row][col] * x[col];
        }
        x[row] = sum / a[row][row];
    }
    Ok(x)
}
