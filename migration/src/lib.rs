pub use sea_orm_migration::prelude::*;

mod m20250901_000001_initial;
mod m20250905_000001_add_pickup_locations;
mod m20250912_000001_add_checkout_idempotency;
mod m20250915_000001_add_order_fingerprint;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250901_000001_initial::Migration),
            Box::new(m20250905_000001_add_pickup_locations::Migration),
            Box::new(m20250912_000001_add_checkout_idempotency::Migration),
            Box::new(m20250915_000001_add_order_fingerprint::Migration),
        ]
    }
}
