use super::CartItem;
use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Key the cart is persisted under.
pub const CART_STORAGE_KEY: &str = "artisan-cart";

pub const CART_SCHEMA_VERSION: u32 = 1;

/// String key-value persistence for client state.
pub trait CartStorage: Send + Sync {
    fn load(&self, key: &str) -> AppResult<Option<String>>;
    fn save(&self, key: &str, value: &str) -> AppResult<()>;
    fn remove(&self, key: &str) -> AppResult<()>;
}

/// Process-local storage. Clones share the same entries.
#[derive(Clone, Default)]
pub struct MemoryCartStorage {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryCartStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> AppResult<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| AppError::InternalError("cart storage lock poisoned".to_string()))
    }
}

impl CartStorage for MemoryCartStorage {
    fn load(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn save(&self, key: &str, value: &str) -> AppResult<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> AppResult<()> {
        self.lock()?.remove(key);
        Ok(())
    }
}

/// One JSON file per key inside `dir`.
#[derive(Debug, Clone)]
pub struct JsonFileCartStorage {
    dir: PathBuf,
}

impl JsonFileCartStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

fn io_error(e: std::io::Error) -> AppError {
    AppError::InternalError(format!("cart storage: {e}"))
}

impl CartStorage for JsonFileCartStorage {
    fn load(&self, key: &str) -> AppResult<Option<String>> {
        match std::fs::read_to_string(self.path(key)) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(e)),
        }
    }

    fn save(&self, key: &str, value: &str) -> AppResult<()> {
        std::fs::create_dir_all(&self.dir).map_err(io_error)?;
        std::fs::write(self.path(key), value).map_err(io_error)
    }

    fn remove(&self, key: &str) -> AppResult<()> {
        match std::fs::remove_file(self.path(key)) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(io_error(e)),
            _ => Ok(()),
        }
    }
}

#[derive(Serialize)]
struct CartEnvelopeRef<'a> {
    version: u32,
    items: &'a [CartItem],
}

#[derive(Deserialize)]
struct CartEnvelope {
    version: u32,
    items: serde_json::Value,
}

/// Version 0: a bare array of lines without line ids.
#[derive(Deserialize)]
struct LegacyCartItem {
    product: super::ProductSnapshot,
    quantity: i32,
    #[serde(default)]
    personalization: Option<String>,
}

pub fn encode_cart(items: &[CartItem]) -> AppResult<String> {
    Ok(serde_json::to_string(&CartEnvelopeRef {
        version: CART_SCHEMA_VERSION,
        items,
    })?)
}

/// Decode a persisted cart, migrating older layouts.
///
/// Payloads that cannot be read, including ones written by a newer version,
/// yield an empty cart.
pub fn decode_cart(raw: &str) -> Vec<CartItem> {
    let value: serde_json::Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(e) => {
            log::warn!("Discarding unreadable cart payload: {e}");
            return Vec::new();
        }
    };

    let decoded = if value.is_array() {
        migrate_v0(value)
    } else {
        serde_json::from_value::<CartEnvelope>(value)
            .map_err(|e| e.to_string())
            .and_then(|envelope| match envelope.version {
                CART_SCHEMA_VERSION => {
                    serde_json::from_value(envelope.items).map_err(|e| e.to_string())
                }
                other => Err(format!("unsupported cart schema version {other}")),
            })
    };

    decoded.unwrap_or_else(|e| {
        log::warn!("Starting with an empty cart: {e}");
        Vec::new()
    })
}

fn migrate_v0(value: serde_json::Value) -> Result<Vec<CartItem>, String> {
    let legacy: Vec<LegacyCartItem> = serde_json::from_value(value).map_err(|e| e.to_string())?;
    log::info!("Migrating {} legacy cart lines", legacy.len());
    Ok(legacy
        .into_iter()
        .map(|item| CartItem {
            line_id: Uuid::new_v4(),
            product: item.product,
            quantity: item.quantity,
            personalization: item.personalization,
        })
        .collect())
}
