pub mod feature_repo;
pub mod menu_item_repo;
pub mod prediction_repo;
pub mod restaurant_repo;
pub mod review_repo;

pub use feature_repo::{FeatureRepository, SentimentReportRow};
pub use menu_item_repo::{MenuItemRepository, MenuItemSeed};
pub use prediction_repo::{PredictionRepository, PredictionRow, TipReportRow};
pub use restaurant_repo::{RestaurantRepository, RestaurantSeed};
pub use review_repo::{ReviewRepository, ReviewSeed};
