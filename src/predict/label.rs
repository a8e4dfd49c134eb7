use crate::predict::ModelInput;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TipCategory {
    Low,
    Medium,
    High,
}

impl TipCategory {
    pub const COUNT: usize = 3;

    pub fn as_str(&self) -> &'static str {
        match self {
            TipCategory::Low => "low",
            TipCategory::Medium => "medium",
            TipCategory::High => "high",
        }
    }

    pub fn index(&self) -> usize {
        match self {
            TipCategory::Low => 0,
            TipCategory::Medium => 1,
            TipCategory::High => 2,
        }
    }

    pub fn from_index(index: usize) -> Self {
        match index {
            0 => TipCategory::Low,
            1 => TipCategory::Medium,
            _ => TipCategory::High,
        }
    }
}

/// 小费百分比 -> 档位。
///
/// 训练标签与 dashboard 各有一套阈值且互不一致（历史遗留，
/// 待产品侧定夺），因此两套都以命名常量保留，绝不静默统一。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TipThresholds {
    /// 低于此值为 low
    pub low_below: f64,
    /// 高于此值为 high；(low_below ..= high_above) 为 medium
    pub high_above: f64,
}

impl TipThresholds {
    /// 训练标签用的阈值: <16 low, 16..=22 medium, >22 high
    pub const TRAINING: Self = Self {
        low_below: 16.0,
        high_above: 22.0,
    };

    /// dashboard 展示用的阈值: <15 low, 15..=18 medium, >18 high
    pub const DASHBOARD: Self = Self {
        low_below: 15.0,
        high_above: 18.0,
    };

    pub fn categorize(&self, tip_pct: f64) -> TipCategory {
        if tip_pct < self.low_below {
            TipCategory::Low
        } else if tip_pct <= self.high_above {
            TipCategory::Medium
        } else {
            TipCategory::High
        }
    }
}

/// 无真实小费数据，训练目标由此合成。实现必须显式注入种子，
/// 不允许读进程级随机状态。
pub trait LabelSynthesizer {
    fn label(&mut self, input: &ModelInput) -> f64;
}

/// 原始启发式: 基准 15%，情感/星级/服务提及/价位各自加减，
/// 再叠加高斯噪声后截断到 [8, 30]。
pub struct HeuristicLabeler {
    rng: StdRng,
}

impl HeuristicLabeler {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Box-Muller；rand 本体没有正态分布
    fn gaussian(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1: f64 = self.rng.gen::<f64>().max(f64::MIN_POSITIVE);
        let u2: f64 = self.rng.gen();
        mean + std_dev * (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
    }
}

impl LabelSynthesizer for HeuristicLabeler {
    fn label(&mut self, input: &ModelInput) -> f64 {
        let mut tip = 15.0;
        tip += input.avg_sentiment * 5.0;
        tip += (input.stars - 3.0) * 1.2;
        tip += f64::from(input.service_mentions.min(6)) * 0.3;

        // avg_price 的 0 是"没有菜单"哨兵，不是免费菜单；
        // 套用价位规则前先替换成中性价
        let avg_price = if input.avg_price > 0.0 {
            input.avg_price
        } else {
            15.0
        };
        if avg_price > 25.0 {
            tip += 1.0;
        }
        if avg_price < 10.0 {
            tip -= 1.0;
        }

        tip += self.gaussian(0.0, 2.0);
        tip.clamp(8.0, 30.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(stars: f64, sentiment: f64, service: i32, price: f64) -> ModelInput {
        ModelInput {
            restaurant_id: "r".to_string(),
            stars,
            price_tier: 2,
            avg_sentiment: sentiment,
            service_mentions: service,
            avg_price: price,
        }
    }

    #[test]
    fn training_threshold_boundaries() {
        let t = TipThresholds::TRAINING;
        assert_eq!(t.categorize(15.9), TipCategory::Low);
        assert_eq!(t.categorize(16.0), TipCategory::Medium);
        assert_eq!(t.categorize(22.0), TipCategory::Medium);
        assert_eq!(t.categorize(22.1), TipCategory::High);
    }

    #[test]
    fn dashboard_thresholds_disagree_with_training() {
        let tip = 15.5;
        assert_eq!(TipThresholds::TRAINING.categorize(tip), TipCategory::Low);
        assert_eq!(
            TipThresholds::DASHBOARD.categorize(tip),
            TipCategory::Medium
        );
    }

    #[test]
    fn labels_are_reproducible_for_a_seed() {
        let rows: Vec<ModelInput> = (0..20)
            .map(|i| input(3.0 + (i % 3) as f64 * 0.5, 0.1 * (i % 5) as f64, i % 4, 12.0))
            .collect();
        let a: Vec<f64> = {
            let mut labeler = HeuristicLabeler::new(7);
            rows.iter().map(|r| labeler.label(r)).collect()
        };
        let b: Vec<f64> = {
            let mut labeler = HeuristicLabeler::new(7);
            rows.iter().map(|r| labeler.label(r)).collect()
        };
        assert_eq!(a, b);
    }

    #[test]
    fn labels_stay_clamped() {
        let mut labeler = HeuristicLabeler::new(1);
        for i in 0..200 {
            let tip = labeler.label(&input(5.0, 1.0, 10, 40.0 + i as f64));
            assert!((8.0..=30.0).contains(&tip));
        }
    }

    #[test]
    fn missing_menu_is_not_priced_as_cheap() {
        // avg_price 0 走中性价，不应触发 <10 的降档
        let mut a = HeuristicLabeler::new(3);
        let mut b = HeuristicLabeler::new(3);
        let with_sentinel = a.label(&input(4.0, 0.5, 2, 0.0));
        let with_neutral = b.label(&input(4.0, 0.5, 2, 15.0));
        assert!((with_sentinel - with_neutral).abs() < 1e-9);
    }
}
