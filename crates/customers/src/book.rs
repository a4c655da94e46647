use chrono::{DateTime, Utc};

use storefront_core::{AddressId, DomainError, DomainResult, UserId};

use crate::{Address, AddressInput};

/// Rows to write and the row to delete for one address-book operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressChange {
    pub upserts: Vec<Address>,
    pub removed: Option<AddressId>,
}

impl AddressChange {
    pub fn get(&self, id: AddressId) -> Option<&Address> {
        self.upserts.iter().find(|a| a.id == id)
    }

    fn upsert(&mut self, address: Address) {
        match self.upserts.iter_mut().find(|a| a.id == address.id) {
            Some(existing) => *existing = address,
            None => self.upserts.push(address),
        }
    }
}

/// One user's addresses, oldest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressBook {
    user_id: UserId,
    addresses: Vec<Address>,
}

impl AddressBook {
    /// Foreign addresses are dropped so they can never be touched.
    pub fn new(user_id: UserId, mut addresses: Vec<Address>) -> Self {
        addresses.retain(|a| a.user_id == user_id);
        addresses.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Self { user_id, addresses }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Default first, then creation order.
    pub fn listing(&self) -> Vec<Address> {
        let mut listed = self.addresses.clone();
        listed.sort_by_key(|a| !a.is_default);
        listed
    }

    pub fn default_address(&self) -> Option<&Address> {
        self.addresses.iter().find(|a| a.is_default)
    }

    fn find(&self, id: AddressId) -> DomainResult<&Address> {
        self.addresses
            .iter()
            .find(|a| a.id == id)
            .ok_or_else(|| DomainError::not_found("address", id))
    }

    /// Clear the current default (other than `keep`).
    fn unset_default(&self, change: &mut AddressChange, keep: AddressId) {
        for a in self.addresses.iter().filter(|a| a.is_default && a.id != keep) {
            let mut cleared = a.clone();
            cleared.is_default = false;
            change.upsert(cleared);
        }
    }

    pub fn create(
        &self,
        id: AddressId,
        input: AddressInput,
        now: DateTime<Utc>,
    ) -> DomainResult<AddressChange> {
        let input = input.validated()?;
        let mut change = AddressChange::default();
        if input.is_default {
            self.unset_default(&mut change, id);
        }
        change.upsert(Address::from_input(id, self.user_id, &input, now));
        Ok(change)
    }

    /// Edit fields. Becoming default unsets the previous one; un-flagging
    /// only clears this address.
    pub fn update(&self, id: AddressId, input: AddressInput) -> DomainResult<AddressChange> {
        let input = input.validated()?;
        let existing = self.find(id)?;
        let mut change = AddressChange::default();

        let mut updated = existing.clone().with_fields(&input);
        if input.is_default && !existing.is_default {
            self.unset_default(&mut change, id);
            updated.is_default = true;
        } else if !input.is_default && existing.is_default {
            updated.is_default = false;
        }
        change.upsert(updated);
        Ok(change)
    }

    /// Deleting the default promotes the oldest remaining address.
    pub fn delete(&self, id: AddressId) -> DomainResult<AddressChange> {
        let existing = self.find(id)?;
        let mut change = AddressChange {
            upserts: Vec::new(),
            removed: Some(id),
        };
        if existing.is_default {
            if let Some(oldest) = self.addresses.iter().find(|a| a.id != id) {
                let mut promoted = oldest.clone();
                promoted.is_default = true;
                change.upsert(promoted);
            }
        }
        Ok(change)
    }

    pub fn make_default(&self, id: AddressId) -> DomainResult<AddressChange> {
        let existing = self.find(id)?;
        let mut change = AddressChange::default();
        self.unset_default(&mut change, id);
        let mut target = existing.clone();
        target.is_default = true;
        change.upsert(target);
        Ok(change)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use proptest::prelude::*;

    fn input(street: &str, is_default: bool) -> AddressInput {
        AddressInput {
            street: street.to_string(),
            number: None,
            city: "Campinas".into(),
            neighborhood: "Centro".into(),
            complement: None,
            is_default,
        }
    }

    /// Apply a change to an in-memory list, as a store would.
    fn apply(mut rows: Vec<Address>, change: AddressChange) -> Vec<Address> {
        if let Some(id) = change.removed {
            rows.retain(|a| a.id != id);
        }
        for up in change.upserts {
            match rows.iter_mut().find(|a| a.id == up.id) {
                Some(r) => *r = up,
                None => rows.push(up),
            }
        }
        rows
    }

    fn seeded(user: UserId) -> Vec<Address> {
        let start = Utc::now() - Duration::hours(1);
        let mut rows = Vec::new();
        for (i, (street, default)) in [("A", false), ("B", true), ("C", false)].iter().enumerate() {
            let book = AddressBook::new(user, rows.clone());
            let change = book
                .create(AddressId::new(), input(street, *default), start + Duration::minutes(i as i64))
                .unwrap();
            rows = apply(rows, change);
        }
        rows
    }

    fn streets(list: &[Address]) -> Vec<&str> {
        list.iter().map(|a| a.street.as_str()).collect()
    }

    #[test]
    fn listing_puts_default_first_then_creation_order() {
        let user = UserId::new();
        let book = AddressBook::new(user, seeded(user));
        assert_eq!(streets(&book.listing()), vec!["B", "A", "C"]);
    }

    #[test]
    fn creating_a_default_unsets_the_previous_one() {
        let user = UserId::new();
        let rows = seeded(user);
        let book = AddressBook::new(user, rows.clone());
        let change = book.create(AddressId::new(), input("D", true), Utc::now()).unwrap();
        let book = AddressBook::new(user, apply(rows, change));

        let defaults: Vec<_> = book.listing().into_iter().filter(|a| a.is_default).collect();
        assert_eq!(defaults.len(), 1);
        assert_eq!(defaults[0].street, "D");
    }

    #[test]
    fn deleting_the_default_promotes_the_oldest_remaining() {
        let user = UserId::new();
        let rows = seeded(user);
        let book = AddressBook::new(user, rows.clone());
        let b = book.default_address().unwrap().id;

        let book = AddressBook::new(user, apply(rows, book.delete(b).unwrap()));
        assert_eq!(book.default_address().map(|a| a.street.as_str()), Some("A"));
        assert_eq!(book.listing().len(), 2);
    }

    #[test]
    fn deleting_the_last_address_leaves_no_default() {
        let user = UserId::new();
        let rows = AddressBook::new(user, vec![])
            .create(AddressId::new(), input("Only", true), Utc::now())
            .unwrap()
            .upserts;
        let book = AddressBook::new(user, rows.clone());
        let id = rows[0].id;
        let change = book.delete(id).unwrap();
        assert!(change.upserts.is_empty());
        assert_eq!(change.removed, Some(id));
    }

    #[test]
    fn update_unflagging_default_just_clears_it() {
        let user = UserId::new();
        let rows = seeded(user);
        let book = AddressBook::new(user, rows.clone());
        let b = book.default_address().unwrap().id;

        let change = book.update(b, input("B2", false)).unwrap();
        assert_eq!(change.upserts.len(), 1);
        let book = AddressBook::new(user, apply(rows, change));
        assert!(book.default_address().is_none());
    }

    #[test]
    fn make_default_moves_the_flag() {
        let user = UserId::new();
        let rows = seeded(user);
        let book = AddressBook::new(user, rows.clone());
        let c = book.listing()[2].id;
        let book = AddressBook::new(user, apply(rows, book.make_default(c).unwrap()));
        assert_eq!(book.default_address().map(|a| a.id), Some(c));
        assert_eq!(book.listing().iter().filter(|a| a.is_default).count(), 1);
    }

    #[test]
    fn foreign_addresses_are_not_found() {
        let owner = UserId::new();
        let rows = seeded(owner);
        let stranger = AddressBook::new(UserId::new(), rows.clone());
        let err = stranger.delete(rows[0].id).unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
        assert!(stranger.listing().is_empty());
    }

    #[test]
    fn create_requires_street_city_and_neighborhood() {
        let book = AddressBook::new(UserId::new(), vec![]);
        let mut bad = input("  ", false);
        assert_eq!(
            book.create(AddressId::new(), bad.clone(), Utc::now()).unwrap_err(),
            DomainError::validation("street is required")
        );
        bad.street = "Rua".into();
        bad.neighborhood = String::new();
        assert!(book.create(AddressId::new(), bad, Utc::now()).is_err());
    }

    proptest! {
        #[test]
        fn at_most_one_default_after_any_sequence(ops in proptest::collection::vec((0u8..4, any::<bool>(), 0usize..8), 1..40)) {
            let user = UserId::new();
            let mut rows: Vec<Address> = Vec::new();
            let mut clock = Utc::now();
            for (op, flag, pick) in ops {
                clock += Duration::seconds(1);
                let book = AddressBook::new(user, rows.clone());
                let target = (!rows.is_empty()).then(|| book.listing()[pick % rows.len()].id);
                let change = match (op, target) {
                    (0, _) | (_, None) => book.create(AddressId::new(), input("S", flag), clock),
                    (1, Some(id)) => book.update(id, input("U", flag)),
                    (2, Some(id)) => book.delete(id),
                    (_, Some(id)) => book.make_default(id),
                };
                rows = apply(rows, change.unwrap());
                prop_assert!(rows.iter().filter(|a| a.is_default).count() <= 1);
            }
        }
    }
}
