use serde::{Deserialize, Serialize};

use storefront_core::validate::{max_len, optional_text, required};
use storefront_core::{CategoryId, DomainResult, Entity};

use crate::{MAX_CATEGORY_DESCRIPTION_LEN, MAX_CATEGORY_NAME_LEN};

/// Product category used to organise the storefront.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub description: Option<String>,
}

impl Entity for Category {
    type Id = CategoryId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Category {
    /// Build a category from a validated draft.
    pub fn create(id: CategoryId, draft: CategoryDraft) -> DomainResult<Self> {
        let draft = draft.validated()?;
        Ok(Self {
            id,
            name: draft.name,
            description: draft.description,
        })
    }

    /// Replace the editable fields.
    pub fn update(&mut self, draft: CategoryDraft) -> DomainResult<()> {
        let draft = draft.validated()?;
        self.name = draft.name;
        self.description = draft.description;
        Ok(())
    }
}

/// Editable category fields (create/update payload).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryDraft {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl CategoryDraft {
    /// Trim and check the draft; blank description becomes `None`.
    pub fn validated(self) -> DomainResult<Self> {
        let name = required(&self.name, "category name is required")?.to_string();
        max_len(&name, MAX_CATEGORY_NAME_LEN, "category name")?;

        let description = optional_text(self.description.as_deref());
        if let Some(d) = &description {
            max_len(d, MAX_CATEGORY_DESCRIPTION_LEN, "category description")?;
        }

        Ok(Self { name, description })
    }
}

/// Category listing row with the number of products it holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryWithCount {
    #[serde(flatten)]
    pub category: Category,
    pub product_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use storefront_core::DomainError;

    fn draft(name: &str, description: Option<&str>) -> CategoryDraft {
        CategoryDraft {
            name: name.to_string(),
            description: description.map(str::to_string),
        }
    }

    #[test]
    fn create_trims_fields() {
        let c = Category::create(CategoryId::new(), draft("  Acessórios ", Some("   "))).unwrap();
        assert_eq!(c.name, "Acessórios");
        assert_eq!(c.description, None);
    }

    #[test]
    fn create_rejects_blank_name() {
        let err = Category::create(CategoryId::new(), draft("  ", None)).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn name_and_description_have_length_limits() {
        let long_name = "x".repeat(MAX_CATEGORY_NAME_LEN + 1);
        assert!(Category::create(CategoryId::new(), draft(&long_name, None)).is_err());

        let long_desc = "d".repeat(MAX_CATEGORY_DESCRIPTION_LEN + 1);
        assert!(Category::create(CategoryId::new(), draft("ok", Some(&long_desc))).is_err());
    }

    #[test]
    fn update_keeps_id() {
        let id = CategoryId::new();
        let mut c = Category::create(id, draft("Old", None)).unwrap();
        c.update(draft("New", Some("desc"))).unwrap();
        assert_eq!(c.id, id);
        assert_eq!(c.name, "New");
        assert_eq!(c.description.as_deref(), Some("desc"));
    }
}
