use crate::aggregate::service::Aggregator;
use crate::aggregate::AggregateService;
use crate::aggregate::ports::DbReviewSource;
use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::predict::label::TipThresholds;
use crate::predict::{PredictionWriter, TrainerService};
use crate::sentiment::{LexiconScorer, SentimentScorer};
use crate::storage;
use crate::storage::repository::{
    FeatureRepository, MenuItemRepository, MenuItemSeed, PredictionRepository,
    RestaurantRepository, RestaurantSeed, ReviewRepository, ReviewSeed,
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tempfile::TempDir;

fn test_config(dir: &TempDir) -> PipelineConfig {
    PipelineConfig {
        database_url: format!(
            "sqlite://{}?mode=rwc",
            dir.path().join("tipcast.db").display()
        ),
        commit_batch_size: 50,
        worker_count: 4,
        max_commit_retries: 1,
        label_seed: 7,
        split_seed: 42,
        ingest_seed: 11,
        model_path: dir.path().join("models/tip_models.json"),
        thresholds: TipThresholds::TRAINING,
    }
}

async fn setup() -> (TempDir, Arc<DatabaseConnection>, PipelineConfig) {
    let dir = TempDir::new().unwrap();
    let cfg = test_config(&dir);
    let db = Arc::new(storage::establish_connection(&cfg.database_url).await.unwrap());
    (dir, db, cfg)
}

async fn seed_restaurant(db: &DatabaseConnection, id: &str, stars: f64, price_tier: i32) {
    RestaurantRepository::insert_or_ignore_batch(
        db,
        vec![RestaurantSeed {
            restaurant_id: id.to_string(),
            name: format!("Restaurant {}", id),
            city: "Madison".to_string(),
            state: "WI".to_string(),
            stars,
            price_tier,
        }],
    )
    .await
    .unwrap();
}

async fn seed_reviews(db: &DatabaseConnection, id: &str, reviews: &[(i32, &str)]) {
    let seeds: Vec<ReviewSeed> = reviews
        .iter()
        .enumerate()
        .map(|(i, (stars, text))| ReviewSeed {
            review_id: format!("{}_review_{}", id, i),
            restaurant_id: id.to_string(),
            stars: *stars,
            text: text.to_string(),
            date: "2015-01-01".to_string(),
        })
        .collect();
    ReviewRepository::insert_or_ignore_batch(db, seeds).await.unwrap();
}

async fn seed_menu(db: &DatabaseConnection, id: &str, prices: &[f64]) {
    let seeds: Vec<MenuItemSeed> = prices
        .iter()
        .enumerate()
        .map(|(i, price)| MenuItemSeed {
            restaurant_id: id.to_string(),
            item_name: format!("Item {}", i),
            price: *price,
        })
        .collect();
    MenuItemRepository::insert_or_ignore_batch(db, seeds).await.unwrap();
}

fn scorer() -> Arc<dyn SentimentScorer> {
    Arc::new(LexiconScorer::new())
}

async fn feature_rows(db: &DatabaseConnection) -> Vec<(String, f64, i32, i32, i32, f64)> {
    let mut rows: Vec<_> = FeatureRepository::load_all(db)
        .await
        .unwrap()
        .into_iter()
        .map(|f| {
            (
                f.restaurant_id,
                f.avg_sentiment,
                f.positive_reviews,
                f.negative_reviews,
                f.service_mentions,
                f.avg_price,
            )
        })
        .collect();
    rows.sort_by(|a, b| a.0.cmp(&b.0));
    rows
}

async fn prediction_rows(db: &DatabaseConnection) -> Vec<(String, f64, String)> {
    let mut rows: Vec<_> = PredictionRepository::load_all(db)
        .await
        .unwrap()
        .into_iter()
        .map(|p| (p.restaurant_id, p.predicted_tip_pct, p.tip_category))
        .collect();
    rows.sort_by(|a, b| a.0.cmp(&b.0));
    rows
}

#[tokio::test]
async fn aggregate_writes_scenario_features() {
    let (_dir, db, cfg) = setup().await;
    seed_restaurant(&db, "b1", 4.0, 2).await;
    seed_reviews(
        &db,
        "b1",
        &[
            (5, "great service here"),
            (5, "ok food"),
            (1, "terrible, rude staff"),
        ],
    )
    .await;
    seed_menu(&db, "b1", &[10.0, 20.0]).await;

    let summary = AggregateService::new(db.clone(), scorer(), &cfg)
        .run()
        .await
        .unwrap();
    assert_eq!(summary.processed, 1);
    assert_eq!(summary.failed, 0);

    let row = FeatureRepository::get(&db, "b1").await.unwrap().unwrap();
    assert_eq!(row.service_mentions, 1);
    assert_eq!(row.positive_reviews, 2);
    assert_eq!(row.negative_reviews, 1);
    assert!((-1.0..=1.0).contains(&row.avg_sentiment));
    assert!((row.avg_price - 15.0).abs() < 1e-9);
}

#[tokio::test]
async fn restaurant_without_reviews_gets_no_feature_row() {
    let (_dir, db, cfg) = setup().await;
    seed_restaurant(&db, "b1", 3.5, 1).await;

    let summary = AggregateService::new(db.clone(), scorer(), &cfg)
        .run()
        .await
        .unwrap();
    assert_eq!(summary.processed, 0);
    assert_eq!(summary.skipped, 1);
    assert!(FeatureRepository::get(&db, "b1").await.unwrap().is_none());
}

#[tokio::test]
async fn restaurant_without_menu_gets_zero_price_sentinel() {
    let (_dir, db, cfg) = setup().await;
    seed_restaurant(&db, "b1", 3.5, 1).await;
    seed_reviews(&db, "b1", &[(4, "good food")]).await;

    AggregateService::new(db.clone(), scorer(), &cfg)
        .run()
        .await
        .unwrap();
    let row = FeatureRepository::get(&db, "b1").await.unwrap().unwrap();
    assert_eq!(row.avg_price, 0.0);
}

#[tokio::test]
async fn negative_menu_price_skips_restaurant() {
    let (_dir, db, cfg) = setup().await;
    seed_restaurant(&db, "b1", 3.5, 1).await;
    seed_reviews(&db, "b1", &[(4, "good")]).await;
    seed_menu(&db, "b1", &[12.0, -3.0]).await;

    let summary = AggregateService::new(db.clone(), scorer(), &cfg)
        .run()
        .await
        .unwrap();
    assert_eq!(summary.processed, 0);
    assert_eq!(summary.skipped, 1);
    assert!(FeatureRepository::get(&db, "b1").await.unwrap().is_none());
}

#[tokio::test]
async fn aggregator_surfaces_missing_restaurant() {
    let (_dir, db, _cfg) = setup().await;
    let aggregator = Aggregator::new(Arc::new(DbReviewSource::new(db.clone())), scorer());
    let err = aggregator.aggregate("missing").await.unwrap_err();
    assert!(matches!(err, PipelineError::NotFound(_)));
}

#[tokio::test]
async fn feature_upsert_replaces_prior_row() {
    use crate::aggregate::FeatureVector;

    let (_dir, db, _cfg) = setup().await;
    seed_restaurant(&db, "b1", 4.0, 2).await;

    let first = FeatureVector {
        avg_sentiment: 0.2,
        positive_reviews: 1,
        negative_reviews: 0,
        service_mentions: 0,
        avg_price: 10.0,
    };
    let second = FeatureVector {
        avg_sentiment: -0.4,
        positive_reviews: 3,
        negative_reviews: 2,
        service_mentions: 1,
        avg_price: 0.0,
    };
    FeatureRepository::upsert(db.as_ref(), "b1", &first).await.unwrap();
    FeatureRepository::upsert(db.as_ref(), "b1", &second).await.unwrap();

    assert_eq!(FeatureRepository::count(&db).await.unwrap(), 1);
    let row = FeatureRepository::get(&db, "b1").await.unwrap().unwrap();
    assert_eq!(row.avg_sentiment, -0.4);
    assert_eq!(row.positive_reviews, 3);
    assert_eq!(row.negative_reviews, 2);
    assert_eq!(row.service_mentions, 1);
    assert_eq!(row.avg_price, 0.0);
}

#[tokio::test]
async fn empty_training_set_aborts_before_writing() {
    let (_dir, db, cfg) = setup().await;

    let err = TrainerService::new(db.clone(), &cfg).run().await.unwrap_err();
    assert!(matches!(err, PipelineError::InsufficientData(_)));
    assert!(!cfg.model_path.exists());
    assert_eq!(PredictionRepository::count(&db).await.unwrap(), 0);
}

#[tokio::test]
async fn full_pipeline_is_idempotent() {
    let (_dir, db, cfg) = setup().await;

    let texts = [
        "great service here",
        "ok food",
        "terrible, rude staff",
        "friendly staff and delicious pasta",
    ];
    for i in 0usize..20 {
        let id = format!("business_{}", i);
        seed_restaurant(&db, &id, 2.5 + (i % 5) as f64 * 0.5, 1 + (i % 4) as i32).await;
        let reviews: Vec<(i32, &str)> = (0..(3 + i % 3))
            .map(|j| ((1 + (i + j) % 5) as i32, texts[(i + j) % 4]))
            .collect();
        seed_reviews(&db, &id, &reviews).await;
        if i % 3 != 0 {
            seed_menu(&db, &id, &[9.99, 14.99, 24.99]).await;
        }
    }

    let aggregate = AggregateService::new(db.clone(), scorer(), &cfg);
    let first = aggregate.run().await.unwrap();
    assert_eq!(first.processed, 20);
    let features_first = feature_rows(&db).await;
    for row in &features_first {
        assert!((-1.0..=1.0).contains(&row.1));
    }

    aggregate.run().await.unwrap();
    let features_second = feature_rows(&db).await;
    assert_eq!(features_first, features_second);

    let (models, train_summary) = TrainerService::new(db.clone(), &cfg).run().await.unwrap();
    assert_eq!(train_summary.processed, 20);

    let writer = PredictionWriter::new(db.clone(), &cfg);
    let write_summary = writer.run(&models).await.unwrap();
    assert_eq!(write_summary.processed, 20);
    let predictions_first = prediction_rows(&db).await;

    // 重训 + 重写：种子固定，逐位一致
    let (models_again, _) = TrainerService::new(db.clone(), &cfg).run().await.unwrap();
    writer.run(&models_again).await.unwrap();
    let predictions_second = prediction_rows(&db).await;
    assert_eq!(predictions_first, predictions_second);

    assert_eq!(
        PredictionRepository::count(&db).await.unwrap(),
        FeatureRepository::count(&db).await.unwrap()
    );
    for (restaurant_id, tip_pct, category) in &predictions_first {
        assert!(RestaurantRepository::exists(&db, restaurant_id).await.unwrap());
        assert!(tip_pct.is_finite());
        assert!(["low", "medium", "high"].contains(&category.as_str()));
    }
}

#[tokio::test]
async fn ingest_is_idempotent_and_skips_bad_lines() {
    use crate::ingest::IngestService;
    use crate::storage::entity::restaurant::Entity as Restaurant;
    use sea_orm::EntityTrait;

    let (dir, db, cfg) = setup().await;
    let path = dir.path().join("reviews.jsonl");
    std::fs::write(
        &path,
        concat!(
            "{\"stars\": 5, \"text\": \"great service here\", \"business_id\": \"b1\"}\n",
            "{\"stars\": 1, \"text\": \"terrible, rude staff\", \"business_id\": \"b1\"}\n",
            "{\"label\": 3, \"text\": \"good food\", \"business_id\": \"b2\"}\n",
            "{\"text\": \"no rating at all\"}\n",
            "this is not json\n",
            "{\"stars\": 4, \"text\": \"friendly staff\"}\n",
        ),
    )
    .unwrap();

    let ingest = IngestService::new(db.clone(), &cfg);
    let summary = ingest.run(&path).await.unwrap();
    assert_eq!(summary.processed, 4);
    assert_eq!(summary.failed, 2);

    assert_eq!(RestaurantRepository::count(&db).await.unwrap(), 3);
    assert_eq!(ReviewRepository::count(&db).await.unwrap(), 4);

    // 重放同一文件不产生新行
    ingest.run(&path).await.unwrap();
    assert_eq!(RestaurantRepository::count(&db).await.unwrap(), 3);
    assert_eq!(ReviewRepository::count(&db).await.unwrap(), 4);

    let b1 = Restaurant::find_by_id("b1").one(db.as_ref()).await.unwrap().unwrap();
    assert_eq!(b1.review_count, 2);
    assert!((1..=4).contains(&b1.price_tier));

    let prices = MenuItemRepository::fetch_prices_for(&db, "b1").await.unwrap();
    assert_eq!(prices.len(), 5);
}

#[tokio::test]
async fn deleting_a_restaurant_cascades() {
    use crate::aggregate::FeatureVector;
    use crate::storage::repository::PredictionRow;
    use crate::predict::label::TipCategory;

    let (_dir, db, _cfg) = setup().await;
    seed_restaurant(&db, "b1", 4.0, 2).await;
    seed_reviews(&db, "b1", &[(5, "great"), (2, "bad")]).await;
    seed_menu(&db, "b1", &[10.0]).await;
    FeatureRepository::upsert(
        db.as_ref(),
        "b1",
        &FeatureVector {
            avg_sentiment: 0.5,
            positive_reviews: 1,
            negative_reviews: 1,
            service_mentions: 0,
            avg_price: 10.0,
        },
    )
    .await
    .unwrap();
    PredictionRepository::upsert_batch(
        db.as_ref(),
        &[PredictionRow {
            restaurant_id: "b1".to_string(),
            predicted_tip_pct: 17.5,
            tip_category: TipCategory::Medium,
        }],
    )
    .await
    .unwrap();

    RestaurantRepository::delete_cascade(&db, "b1").await.unwrap();

    assert!(!RestaurantRepository::exists(&db, "b1").await.unwrap());
    assert_eq!(ReviewRepository::count(&db).await.unwrap(), 0);
    assert!(MenuItemRepository::fetch_prices_for(&db, "b1").await.unwrap().is_empty());
    assert!(FeatureRepository::get(&db, "b1").await.unwrap().is_none());
    assert_eq!(PredictionRepository::count(&db).await.unwrap(), 0);
}
