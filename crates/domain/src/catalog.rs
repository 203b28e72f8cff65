//! Catalog and cart payloads carried through the pass-through endpoints.

use serde::{Deserialize, Serialize};

/// A product as listed by `GET /products`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Backend product id.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Long description.
    pub description: String,
    /// Product image.
    pub image_url: String,
    /// Unit price.
    pub price: f64,
    /// URL slug used by the detail page.
    pub slug: String,
}

/// Body of `POST /cart/item`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemRequest {
    /// Product being added.
    pub product_id: String,
    /// Quantity to add.
    pub quantity: u32,
}

impl CartItemRequest {
    /// Creates a cart line request.
    #[must_use]
    pub fn new(product_id: impl Into<String>, quantity: u32) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
        }
    }
}
