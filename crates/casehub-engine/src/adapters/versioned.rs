//! Versioned entity plumbing shared by the store adapters

use chrono::Utc;
use uuid::Uuid;

use casehub::{Account, Case, Company, DomainError, Notification};

/// Entity persisted with an optimistic-concurrency version
pub trait Versioned: Clone + Send + Sync + 'static {
    const ENTITY: &'static str;

    fn id(&self) -> Uuid;
    fn version(&self) -> u64;
    fn set_version(&mut self, version: u64);
    fn touch(&mut self);
}

/// Check the CAS precondition and return the entity as it will be stored
pub fn prepare_write<T: Versioned>(
    entity: &T,
    stored_version: Option<u64>,
    expected_version: u64,
) -> Result<T, DomainError> {
    match stored_version {
        None => Err(DomainError::not_found(T::ENTITY, entity.id())),
        Some(actual) if actual != expected_version => Err(DomainError::lock_conflict(
            T::ENTITY,
            entity.id(),
            expected_version,
            actual,
        )),
        Some(_) => {
            let mut next = entity.clone();
            next.set_version(expected_version + 1);
            next.touch();
            Ok(next)
        }
    }
}

macro_rules! impl_versioned {
    ($ty:ty, $name:literal) => {
        impl Versioned for $ty {
            const ENTITY: &'static str = $name;

            fn id(&self) -> Uuid {
                self.id
            }

            fn version(&self) -> u64 {
                self.version
            }

            fn set_version(&mut self, version: u64) {
                self.version = version;
            }

            fn touch(&mut self) {
                self.updated_at = Utc::now();
            }
        }
    };
}

impl_versioned!(Case, "Case");
impl_versioned!(Account, "Account");
impl_versioned!(Company, "Company");
impl_versioned!(Notification, "Notification");
