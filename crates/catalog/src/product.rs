use serde::{Deserialize, Serialize};

use storefront_core::validate::{max_len, optional_text, required};
use storefront_core::{CategoryId, DomainError, DomainResult, Entity, Money, ProductId};

use crate::{MAX_IMAGE_URL_LEN, MAX_PRODUCT_DESCRIPTION_LEN, MAX_PRODUCT_NAME_LEN, PRODUCT_SUMMARY_LEN};

/// Product offered in the storefront.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    pub price: Money,
    pub stock: i64,
    pub image_url: Option<String>,
    pub category_id: CategoryId,
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Product {
    /// Build a product from a draft. Category existence is checked by the caller.
    pub fn create(id: ProductId, draft: ProductDraft) -> DomainResult<Self> {
        let d = draft.validated()?;
        Ok(Self {
            id,
            name: d.name,
            description: d.description,
            price: d.price,
            stock: d.stock,
            image_url: d.image_url,
            category_id: d.category_id,
        })
    }

    /// Replace all editable fields.
    pub fn update(&mut self, draft: ProductDraft) -> DomainResult<()> {
        let d = draft.validated()?;
        self.name = d.name;
        self.description = d.description;
        self.price = d.price;
        self.stock = d.stock;
        self.image_url = d.image_url;
        self.category_id = d.category_id;
        Ok(())
    }

    pub fn in_stock(&self) -> bool {
        self.stock > 0
    }

    /// Short description for product cards.
    pub fn summary(&self) -> String {
        let Some(description) = self.description.as_deref() else {
            return String::new();
        };
        if description.chars().count() <= PRODUCT_SUMMARY_LEN {
            return description.to_string();
        }
        let cut: String = description.chars().take(PRODUCT_SUMMARY_LEN).collect();
        format!("{}...", cut.trim_end())
    }

    pub fn lite(&self) -> ProductLite {
        ProductLite {
            id: self.id,
            name: self.name.clone(),
            price: self.price,
            image_url: self.image_url.clone(),
        }
    }
}

/// Editable product fields (admin create/update payload).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDraft {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Money,
    pub stock: i64,
    #[serde(default)]
    pub image_url: Option<String>,
    pub category_id: CategoryId,
}

impl ProductDraft {
    pub fn validated(self) -> DomainResult<Self> {
        let name = required(&self.name, "product name is required")?.to_string();
        max_len(&name, MAX_PRODUCT_NAME_LEN, "product name")?;

        let description = optional_text(self.description.as_deref());
        if let Some(d) = &description {
            max_len(d, MAX_PRODUCT_DESCRIPTION_LEN, "product description")?;
        }

        if self.price.is_negative() {
            return Err(DomainError::validation("price must not be negative"));
        }
        if self.stock < 0 {
            return Err(DomainError::validation("stock must not be negative"));
        }

        let image_url = optional_text(self.image_url.as_deref());
        if let Some(url) = &image_url {
            max_len(url, MAX_IMAGE_URL_LEN, "image url")?;
        }

        Ok(Self {
            name,
            description,
            price: self.price,
            stock: self.stock,
            image_url,
            category_id: self.category_id,
        })
    }
}

/// Minimal product projection used by cart refreshes and by-ids lookups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductLite {
    pub id: ProductId,
    pub name: String,
    pub price: Money,
    pub image_url: Option<String>,
}
