use crate::storage::entity::menu_item::{
    self, ActiveModel as MenuItemActiveModel, Entity as MenuItem,
};
use chrono::Utc;
use sea_orm::{ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, NotSet, QueryFilter, QuerySelect, Set};

#[derive(Debug, Clone)]
pub struct MenuItemSeed {
    pub restaurant_id: String,
    pub item_name: String,
    pub price: f64,
}

pub struct MenuItemRepository;

impl MenuItemRepository {
    /// (restaurant_id, item_name) 上有唯一索引，重复摄取是 no-op
    pub async fn insert_or_ignore_batch<C: ConnectionTrait>(
        conn: &C,
        seeds: Vec<MenuItemSeed>,
    ) -> Result<u64, sea_orm::DbErr> {
        if seeds.is_empty() {
            return Ok(0);
        }
        let now = Utc::now().timestamp();
        let models: Vec<MenuItemActiveModel> = seeds
            .into_iter()
            .map(|s| MenuItemActiveModel {
                id: NotSet,
                restaurant_id: Set(s.restaurant_id),
                item_name: Set(s.item_name),
                price: Set(s.price),
                created_at: Set(now),
            })
            .collect();

        MenuItem::insert_many(models)
            .on_conflict(
                sea_orm::sea_query::OnConflict::columns([
                    menu_item::Column::RestaurantId,
                    menu_item::Column::ItemName,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(conn)
            .await
    }

    pub async fn fetch_prices_for(
        db: &DatabaseConnection,
        restaurant_id: &str,
    ) -> Result<Vec<f64>, sea_orm::DbErr> {
        MenuItem::find()
            .select_only()
            .column(menu_item::Column::Price)
            .filter(menu_item::Column::RestaurantId.eq(restaurant_id))
            .into_tuple::<f64>()
            .all(db)
            .await
    }
}
