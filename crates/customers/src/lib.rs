//! Customer address book.
//!
//! Pure policy: every operation returns an [`AddressChange`] that the store
//! applies in one transaction, so "at most one default address per user"
//! never depends on two separate writes.

pub mod address;
pub mod book;

pub use address::{Address, AddressInput};
pub use book::{AddressBook, AddressChange};
