use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::stage::StageSummary;
use crate::storage::repository::{
    MenuItemRepository, MenuItemSeed, RestaurantRepository, RestaurantSeed, ReviewRepository,
    ReviewSeed,
};
use log::{info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sea_orm::{DatabaseConnection, TransactionTrait};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;
use tokio::time::{sleep, Duration};

const CITIES: &[(&str, &str)] = &[
    ("Las Vegas", "NV"),
    ("Phoenix", "AZ"),
    ("Charlotte", "NC"),
    ("Pittsburgh", "PA"),
    ("Toronto", "ON"),
    ("Montreal", "QC"),
    ("Cleveland", "OH"),
    ("Madison", "WI"),
    ("Scottsdale", "AZ"),
    ("Henderson", "NV"),
];

const MENU_TEMPLATE: &[(&str, f64)] = &[
    ("Burger", 12.99),
    ("Pasta", 14.99),
    ("Salad", 9.99),
    ("Pizza", 13.99),
    ("Steak", 24.99),
];

/// 没带 business_id 的评论按行号取模分桶
const BUSINESS_MODULUS: usize = 5000;
const DEFAULT_REVIEW_DATE: &str = "2015-01-01";

fn tier_multiplier(tier: i32) -> f64 {
    match tier {
        1 => 1.0,
        2 => 1.5,
        3 => 2.5,
        _ => 4.0,
    }
}

/// JSON Lines 一行一条评论。stars 或 Yelp 导出的 label(0..4)
/// 二选一，label 自动 +1。
#[derive(Debug, Deserialize)]
struct RawReview {
    #[serde(default)]
    business_id: Option<String>,
    #[serde(default)]
    stars: Option<i32>,
    #[serde(default)]
    label: Option<i32>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    date: Option<String>,
}

pub struct IngestService {
    db: Arc<DatabaseConnection>,
    batch_size: usize,
    max_commit_retries: u32,
    seed: u64,
}

impl IngestService {
    pub fn new(db: Arc<DatabaseConnection>, cfg: &PipelineConfig) -> Self {
        Self {
            db,
            batch_size: cfg.commit_batch_size,
            max_commit_retries: cfg.max_commit_retries,
            seed: cfg.ingest_seed,
        }
    }

    /// review_id 取行号、餐厅属性取种子随机，同一文件重放
    /// 产生完全相同的行，全程 insert-or-ignore。
    pub async fn run(&self, path: &Path) -> Result<StageSummary, PipelineError> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut seen: HashSet<String> = HashSet::new();
        let mut restaurants: Vec<RestaurantSeed> = Vec::new();
        let mut menu_items: Vec<MenuItemSeed> = Vec::new();
        let mut reviews: Vec<ReviewSeed> = Vec::new();
        let mut summary = StageSummary::default();

        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let raw: RawReview = match serde_json::from_str(&line) {
                Ok(raw) => raw,
                Err(e) => {
                    warn!("skipping malformed line {}: {}", line_no + 1, e);
                    summary.failed += 1;
                    continue;
                }
            };

            let stars = raw.stars.or_else(|| raw.label.map(|l| l + 1));
            let Some(stars) = stars.filter(|s| (1..=5).contains(s)) else {
                warn!("skipping line {}: star rating missing or out of range", line_no + 1);
                summary.failed += 1;
                continue;
            };

            let business_id = raw
                .business_id
                .unwrap_or_else(|| format!("business_{}", line_no % BUSINESS_MODULUS));

            if seen.insert(business_id.clone()) {
                let (city, state) = CITIES[rng.gen_range(0..CITIES.len())];
                let price_tier = rng.gen_range(1..=4);
                let restaurant_stars = (rng.gen_range(2.5..=5.0) * 10.0f64).round() / 10.0;
                let display_name = format!(
                    "Restaurant {}",
                    business_id.strip_prefix("business_").unwrap_or(&business_id)
                );
                restaurants.push(RestaurantSeed {
                    restaurant_id: business_id.clone(),
                    name: display_name,
                    city: city.to_string(),
                    state: state.to_string(),
                    stars: restaurant_stars,
                    price_tier,
                });
                let mult = tier_multiplier(price_tier);
                for (item, base) in MENU_TEMPLATE {
                    menu_items.push(MenuItemSeed {
                        restaurant_id: business_id.clone(),
                        item_name: item.to_string(),
                        price: base * mult,
                    });
                }
            }

            reviews.push(ReviewSeed {
                review_id: format!("review_{}", line_no),
                restaurant_id: business_id,
                stars,
                text: raw.text.unwrap_or_default(),
                date: raw.date.unwrap_or_else(|| DEFAULT_REVIEW_DATE.to_string()),
            });
            summary.processed += 1;

            if reviews.len() >= self.batch_size {
                self.commit_batch(&mut restaurants, &mut menu_items, &mut reviews)
                    .await?;
                info!(
                    "loaded {} reviews, {} restaurants...",
                    summary.processed,
                    seen.len()
                );
            }
        }

        self.commit_batch(&mut restaurants, &mut menu_items, &mut reviews)
            .await?;

        let updated = RestaurantRepository::refresh_review_counts(&self.db).await?;
        info!(
            "ingest finished: {} reviews, {} restaurants ({} review counts refreshed)",
            summary.processed,
            seen.len(),
            updated
        );

        Ok(summary)
    }

    /// 一批一个事务；瞬时失败重放整批，成功后才清空暂存
    async fn commit_batch(
        &self,
        restaurants: &mut Vec<RestaurantSeed>,
        menu_items: &mut Vec<MenuItemSeed>,
        reviews: &mut Vec<ReviewSeed>,
    ) -> Result<(), PipelineError> {
        if restaurants.is_empty() && menu_items.is_empty() && reviews.is_empty() {
            return Ok(());
        }
        let mut attempt = 0u32;
        loop {
            match self
                .try_commit(restaurants.as_slice(), menu_items.as_slice(), reviews.as_slice())
                .await
            {
                Ok(()) => {
                    restaurants.clear();
                    menu_items.clear();
                    reviews.clear();
                    return Ok(());
                }
                Err(e) if attempt < self.max_commit_retries => {
                    attempt += 1;
                    let delay = (1u64 << attempt.min(5)).min(30);
                    warn!(
                        "ingest batch commit failed (attempt {}/{}), replaying in {}s: {}",
                        attempt, self.max_commit_retries, delay, e
                    );
                    sleep(Duration::from_secs(delay)).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn try_commit(
        &self,
        restaurants: &[RestaurantSeed],
        menu_items: &[MenuItemSeed],
        reviews: &[ReviewSeed],
    ) -> Result<(), sea_orm::DbErr> {
        let txn = self.db.begin().await?;
        // 父表在前
        RestaurantRepository::insert_or_ignore_batch(&txn, restaurants.to_vec()).await?;
        MenuItemRepository::insert_or_ignore_batch(&txn, menu_items.to_vec()).await?;
        ReviewRepository::insert_or_ignore_batch(&txn, reviews.to_vec()).await?;
        txn.commit().await
    }
}
