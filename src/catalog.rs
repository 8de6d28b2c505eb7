use anyhow::Result;
use serde::{Deserialize, Serialize};

/// A featured product as shown on a sidebar card. Read-only data.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Product {
    pub name: String,
    pub price: String,
    pub features: Vec<String>,
    pub support: String,
    pub delivery: String,
    pub image: String,
}

/// External link rendered under the product cards.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StoreLink {
    pub label: String,
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Catalog {
    pub store_name: String,
    pub tagline: String,
    pub products: Vec<Product>,
    pub links: Vec<StoreLink>,
}

impl Catalog {
    /// The catalog shipped inside the binary.
    pub fn builtin() -> Result<Self> {
        let catalog = serde_json::from_str(include_str!("../catalog.json"))?;
        Ok(catalog)
    }

    /// Render the fixed system instruction the chat session is seeded with.
    /// The assistant answers from the same records the sidebar shows.
    pub fn system_instruction(&self) -> String {
        let mut prompt = String::new();

        prompt.push_str(&format!(
            "You are the friendly store assistant for {}. ",
            self.store_name
        ));
        prompt.push_str(
            "Answer questions about the products below, their pricing, \
             compatibility and delivery. Keep answers short and concrete. \
             If a question is outside the store's catalog, say so and point \
             the customer at the store links.\n\n",
        );

        prompt.push_str("Products:\n");
        for product in &self.products {
            prompt.push_str(&format!("- {} ({})\n", product.name, product.price));
            for feature in &product.features {
                prompt.push_str(&format!("  - {}\n", feature));
            }
            prompt.push_str(&format!("  - Support: {}\n", product.support));
            prompt.push_str(&format!("  - Delivery: {}\n", product.delivery));
        }

        if !self.links.is_empty() {
            prompt.push('\n');
            prompt.push_str("Store links:\n");
            for link in &self.links {
                prompt.push_str(&format!("- {}: {}\n", link.label, link.url));
            }
        }

        prompt
    }
}
