use std::sync::Arc;

use chrono::Utc;
use tracing::instrument;

use storefront_core::{AddressId, DomainResult, UserId};
use storefront_customers::{Address, AddressBook, AddressChange, AddressInput};

use super::{ServiceError, ServiceResult};
use crate::store::AddressStore;

/// Saved delivery addresses, always scoped to one user.
#[derive(Clone)]
pub struct AddressService {
    store: Arc<dyn AddressStore>,
}

impl AddressService {
    pub fn new(store: Arc<dyn AddressStore>) -> Self {
        Self { store }
    }

    async fn book(&self, user: UserId) -> ServiceResult<AddressBook> {
        Ok(AddressBook::new(user, self.store.addresses_of(user).await?))
    }

    /// Default first, then oldest first.
    pub async fn list(&self, user: UserId) -> ServiceResult<Vec<Address>> {
        Ok(self.book(user).await?.listing())
    }

    pub async fn get(&self, user: UserId, id: AddressId) -> ServiceResult<Address> {
        self.book(user)
            .await?
            .listing()
            .into_iter()
            .find(|a| a.id == id)
            .ok_or_else(|| ServiceError::not_found("address", id))
    }

    pub async fn default_address(&self, user: UserId) -> ServiceResult<Option<Address>> {
        Ok(self.book(user).await?.default_address().cloned())
    }

    #[instrument(skip(self, input), fields(user_id = %user), err)]
    pub async fn create(&self, user: UserId, input: AddressInput) -> ServiceResult<Address> {
        let id = AddressId::new();
        self.apply(user, id, |book| book.create(id, input, Utc::now()))
            .await
    }

    #[instrument(skip(self, input), fields(user_id = %user, address_id = %id), err)]
    pub async fn update(
        &self,
        user: UserId,
        id: AddressId,
        input: AddressInput,
    ) -> ServiceResult<Address> {
        self.apply(user, id, |book| book.update(id, input)).await
    }

    #[instrument(skip(self), fields(user_id = %user, address_id = %id), err)]
    pub async fn make_default(&self, user: UserId, id: AddressId) -> ServiceResult<Address> {
        self.apply(user, id, |book| book.make_default(id)).await
    }

    /// Deleting the default promotes the oldest remaining address.
    #[instrument(skip(self), fields(user_id = %user, address_id = %id), err)]
    pub async fn delete(&self, user: UserId, id: AddressId) -> ServiceResult<()> {
        let book = self.book(user).await?;
        let change = book.delete(id)?;
        self.store.apply_address_change(user, &change).await?;
        if let Some(promoted) = change.upserts.first() {
            tracing::info!(promoted = %promoted.id, "default address moved");
        }
        Ok(())
    }

    /// Plan a change against the user's current book, persist it and return
    /// the written row for `id`.
    async fn apply(
        &self,
        user: UserId,
        id: AddressId,
        plan: impl FnOnce(&AddressBook) -> DomainResult<AddressChange>,
    ) -> ServiceResult<Address> {
        let book = self.book(user).await?;
        let change = plan(&book)?;
        self.store.apply_address_change(user, &change).await?;
        change
            .get(id)
            .cloned()
            .ok_or_else(|| ServiceError::not_found("address", id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Services;
    use storefront_core::DomainError;

    fn input(street: &str, is_default: bool) -> AddressInput {
        AddressInput {
            street: street.into(),
            number: Some("10".into()),
            city: "Campinas".into(),
            neighborhood: "Centro".into(),
            complement: None,
            is_default,
        }
    }

    #[tokio::test]
    async fn new_default_replaces_the_old_one() {
        let services = Services::in_memory();
        let user = UserId::new();
        let first = services.addresses.create(user, input("Rua A", true)).await.unwrap();
        let second = services.addresses.create(user, input("Rua B", true)).await.unwrap();

        let listed = services.addresses.list(user).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, second.id);
        assert!(listed[0].is_default);
        assert!(!services.addresses.get(user, first.id).await.unwrap().is_default);
    }

    #[tokio::test]
    async fn deleting_default_promotes_oldest() {
        let services = Services::in_memory();
        let user = UserId::new();
        let oldest = services.addresses.create(user, input("Rua A", false)).await.unwrap();
        services.addresses.create(user, input("Rua B", false)).await.unwrap();
        let default = services.addresses.create(user, input("Rua C", true)).await.unwrap();

        services.addresses.delete(user, default.id).await.unwrap();

        let now_default = services.addresses.default_address(user).await.unwrap();
        assert_eq!(now_default.map(|a| a.id), Some(oldest.id));
        assert_eq!(services.addresses.list(user).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn make_default_and_update() {
        let services = Services::in_memory();
        let user = UserId::new();
        let a = services.addresses.create(user, input("Rua A", true)).await.unwrap();
        let b = services.addresses.create(user, input("Rua B", false)).await.unwrap();

        let b = services.addresses.make_default(user, b.id).await.unwrap();
        assert!(b.is_default);
        assert!(!services.addresses.get(user, a.id).await.unwrap().is_default);

        let edited = services
            .addresses
            .update(user, a.id, input("Rua Nova", false))
            .await
            .unwrap();
        assert_eq!(edited.street, "Rua Nova");
        assert_eq!(services.addresses.default_address(user).await.unwrap().map(|d| d.id), Some(b.id));
    }

    #[tokio::test]
    async fn other_users_addresses_are_not_found() {
        let services = Services::in_memory();
        let owner = UserId::new();
        let stranger = UserId::new();
        let a = services.addresses.create(owner, input("Rua A", true)).await.unwrap();

        for result in [
            services.addresses.get(stranger, a.id).await.map(|_| ()),
            services.addresses.update(stranger, a.id, input("X", false)).await.map(|_| ()),
            services.addresses.delete(stranger, a.id).await,
            services.addresses.make_default(stranger, a.id).await.map(|_| ()),
        ] {
            assert!(matches!(result, Err(ServiceError::Domain(DomainError::NotFound(_)))));
        }
        assert!(services.addresses.list(stranger).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn blank_street_is_rejected() {
        let services = Services::in_memory();
        let err = services
            .addresses
            .create(UserId::new(), input("  ", false))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::Validation(_))));
    }
}
