use crate::error::PipelineError;
use crate::sentiment::{mentions_service, SentimentScorer};
use serde::{Deserialize, Serialize};

/// 一家餐厅全部评论 + 菜单折叠出的固定维度特征
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub avg_sentiment: f64,
    pub positive_reviews: i32,
    pub negative_reviews: i32,
    pub service_mentions: i32,
    pub avg_price: f64,
}

/// 流式累加器: 只保留 count/sum，不持有评论文本，
/// 评论数不设上限也不增长内存。
#[derive(Debug, Default)]
pub struct FeatureAccumulator {
    review_count: u64,
    sentiment_sum: f64,
    positive: i32,
    negative: i32,
    service: i32,
}

impl FeatureAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_review(&mut self, stars: i32, text: &str, scorer: &dyn SentimentScorer) {
        self.review_count += 1;
        self.sentiment_sum += scorer.score(text);
        // 3 星两边都不算
        if stars >= 4 {
            self.positive += 1;
        }
        if stars <= 2 {
            self.negative += 1;
        }
        if mentions_service(text) {
            self.service += 1;
        }
    }

    pub fn review_count(&self) -> u64 {
        self.review_count
    }

    /// 0 条评论没有定义情感，返回 None。avg_price 为 0 表示没有
    /// 菜单项（哨兵值），负价格在这里拒绝。
    pub fn finish(self, menu_prices: &[f64]) -> Result<Option<FeatureVector>, PipelineError> {
        if self.review_count == 0 {
            return Ok(None);
        }
        if let Some(bad) = menu_prices.iter().find(|p| **p < 0.0) {
            return Err(PipelineError::Validation(format!(
                "negative menu price {}",
                bad
            )));
        }
        let avg_price = if menu_prices.is_empty() {
            0.0
        } else {
            menu_prices.iter().sum::<f64>() / menu_prices.len() as f64
        };
        Ok(Some(FeatureVector {
            avg_sentiment: self.sentiment_sum / self.review_count as f64,
            positive_reviews: self.positive,
            negative_reviews: self.negative,
            service_mentions: self.service,
            avg_price,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sentiment::LexiconScorer;

    fn fold(reviews: &[(i32, &str)], prices: &[f64]) -> Option<FeatureVector> {
        let scorer = LexiconScorer::new();
        let mut acc = FeatureAccumulator::new();
        for (stars, text) in reviews {
            acc.add_review(*stars, text, &scorer);
        }
        acc.finish(prices).unwrap()
    }

    #[test]
    fn zero_reviews_yields_none() {
        assert_eq!(fold(&[], &[12.0]), None);
    }

    #[test]
    fn three_review_scenario() {
        let fv = fold(
            &[
                (5, "great service here"),
                (5, "ok food"),
                (1, "terrible, rude staff"),
            ],
            &[],
        )
        .unwrap();
        assert_eq!(fv.service_mentions, 1);
        assert_eq!(fv.positive_reviews, 2);
        assert_eq!(fv.negative_reviews, 1);
        assert!((-1.0..=1.0).contains(&fv.avg_sentiment));
    }

    #[test]
    fn neutral_ratings_count_in_neither_bucket() {
        let fv = fold(&[(3, "fine"), (3, "fine"), (4, "good"), (2, "meh")], &[]).unwrap();
        assert_eq!(fv.positive_reviews, 1);
        assert_eq!(fv.negative_reviews, 1);
        assert!(fv.positive_reviews + fv.negative_reviews <= 4);
    }

    #[test]
    fn empty_menu_is_zero_sentinel() {
        let fv = fold(&[(4, "good")], &[]).unwrap();
        assert_eq!(fv.avg_price, 0.0);
    }

    #[test]
    fn negative_price_is_rejected() {
        let scorer = LexiconScorer::new();
        let mut acc = FeatureAccumulator::new();
        acc.add_review(4, "good", &scorer);
        let err = acc.finish(&[10.0, -1.0]).unwrap_err();
        assert!(matches!(err, PipelineError::Validation(_)));
    }

    #[test]
    fn empty_text_scores_zero_not_error() {
        let fv = fold(&[(4, ""), (4, "")], &[]).unwrap();
        assert_eq!(fv.avg_sentiment, 0.0);
    }
}
