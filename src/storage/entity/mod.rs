pub mod menu_item;
pub mod restaurant;
pub mod restaurant_feature;
pub mod review;
pub mod tip_prediction;

pub use menu_item::Entity as MenuItem;
pub use restaurant::Entity as Restaurant;
pub use restaurant_feature::Entity as RestaurantFeature;
pub use review::Entity as Review;
pub use tip_prediction::Entity as TipPrediction;
