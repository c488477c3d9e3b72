//! Product catalog client
//!
//! The order core does not own product data; it consults the marketplace
//! catalog service for the sellable status, list price, and owner of each
//! product referenced by an order.

use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::models::SellerType;
use std::time::Duration;
use uuid::Uuid;

use crate::config::CatalogConfig;
use crate::error::{AppError, AppResult};

/// Catalog API client
#[derive(Clone)]
pub struct CatalogClient {
    client: Client,
    base_url: String,
}

/// A product as the catalog reports it
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogProduct {
    pub id: Uuid,
    pub name: String,
    pub status: String,
    pub base_price: Decimal,
    pub unit: String,
    pub owner_id: Uuid,
    #[serde(default)]
    pub owner_type: SellerType,
}

impl CatalogProduct {
    /// Only products in `active` status are sellable
    pub fn is_sellable(&self) -> bool {
        self.status == "active"
    }
}

impl CatalogClient {
    pub fn new(config: &CatalogConfig) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| AppError::Configuration(format!("catalog client: {e}")))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Fetch one product by id. `NotFound` when the catalog has no such
    /// product.
    pub async fn get_product(&self, product_id: Uuid) -> AppResult<CatalogProduct> {
        let url = format!("{}/products/{}", self.base_url, product_id);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::CatalogError(e.to_string()))?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(AppError::NotFound(format!("Product {product_id}"))),
            status if status.is_success() => response
                .json::<CatalogProduct>()
                .await
                .map_err(|e| AppError::CatalogError(format!("invalid product payload: {e}"))),
            status => Err(AppError::CatalogError(format!(
                "catalog returned {status} for product {product_id}"
            ))),
        }
    }
}
