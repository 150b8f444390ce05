//! Shared fixtures for database-backed unit tests. Every call gets a fresh
//! in-memory SQLite database with the real migrations applied.

use crate::config::DatabaseConfig;
use crate::database::{DbPool, create_pool, run_migrations};
use crate::entities::{
    AppRole, pickup_location_entity as locations, product_entity as products,
    user_role_entity as roles,
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, Set};
use uuid::Uuid;

pub async fn setup_db() -> DbPool {
    // One connection: every pooled connection to :memory: would be its own database
    let pool = create_pool(&DatabaseConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
    })
    .await
    .unwrap();
    run_migrations(&pool).await.unwrap();
    pool
}

pub async fn seed_product(pool: &DbPool, name: &str, price: i64, stock: i32) -> products::Model {
    products::ActiveModel {
        id: Set(Uuid::new_v4()),
        artisan_id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        price: Set(price),
        stock_quantity: Set(stock),
        is_active: Set(true),
        image_url: Set(None),
        created_at: Set(Utc::now()),
    }
    .insert(pool)
    .await
    .unwrap()
}

pub async fn seed_pickup_location(pool: &DbPool, name: &str, active: bool) -> locations::Model {
    locations::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        address: Set("Plot 12, Kampala Road".to_string()),
        city: Set("Kampala".to_string()),
        hours: Set(Some("Mon-Sat 9:00-18:00".to_string())),
        phone: Set(Some("+256700000001".to_string())),
        is_active: Set(active),
        created_at: Set(Utc::now()),
    }
    .insert(pool)
    .await
    .unwrap()
}

pub async fn grant_role(pool: &DbPool, user_id: Uuid, role: AppRole) {
    roles::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        role: Set(role),
        created_at: Set(Utc::now()),
    }
    .insert(pool)
    .await
    .unwrap();
}
