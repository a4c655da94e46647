use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storefront_core::validate::{max_len, optional_text, required};
use storefront_core::{AddressId, DomainResult, Entity, UserId};

const MAX_STREET_LEN: usize = 200;
const MAX_NUMBER_LEN: usize = 20;
const MAX_CITY_LEN: usize = 100;
const MAX_NEIGHBORHOOD_LEN: usize = 100;
const MAX_COMPLEMENT_LEN: usize = 200;

/// Saved delivery address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub id: AddressId,
    pub user_id: UserId,
    pub street: String,
    pub number: Option<String>,
    pub city: String,
    pub neighborhood: String,
    pub complement: Option<String>,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

impl Entity for Address {
    type Id = AddressId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Address {
    fn apply(&mut self, input: &AddressInput) {
        self.street = input.street.clone();
        self.number = input.number.clone();
        self.city = input.city.clone();
        self.neighborhood = input.neighborhood.clone();
        self.complement = input.complement.clone();
    }

    pub(crate) fn from_input(
        id: AddressId,
        user_id: UserId,
        input: &AddressInput,
        now: DateTime<Utc>,
    ) -> Self {
        let mut address = Self {
            id,
            user_id,
            street: String::new(),
            number: None,
            city: String::new(),
            neighborhood: String::new(),
            complement: None,
            is_default: input.is_default,
            created_at: now,
        };
        address.apply(input);
        address
    }

    pub(crate) fn with_fields(mut self, input: &AddressInput) -> Self {
        self.apply(input);
        self
    }
}

/// Create/update payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressInput {
    pub street: String,
    #[serde(default)]
    pub number: Option<String>,
    pub city: String,
    pub neighborhood: String,
    #[serde(default)]
    pub complement: Option<String>,
    #[serde(default)]
    pub is_default: bool,
}

impl AddressInput {
    pub fn validated(self) -> DomainResult<Self> {
        let street = required(&self.street, "street is required")?.to_string();
        max_len(&street, MAX_STREET_LEN, "street")?;
        let city = required(&self.city, "city is required")?.to_string();
        max_len(&city, MAX_CITY_LEN, "city")?;
        let neighborhood = required(&self.neighborhood, "neighborhood is required")?.to_string();
        max_len(&neighborhood, MAX_NEIGHBORHOOD_LEN, "neighborhood")?;

        let number = optional_text(self.number.as_deref());
        if let Some(n) = &number {
            max_len(n, MAX_NUMBER_LEN, "number")?;
        }
        let complement = optional_text(self.complement.as_deref());
        if let Some(c) = &complement {
            max_len(c, MAX_COMPLEMENT_LEN, "complement")?;
        }

        Ok(Self {
            street,
            number,
            city,
            neighborhood,
            complement,
            is_default: self.is_default,
        })
    }
}
