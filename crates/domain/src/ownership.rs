//! Load-then-assert ownership, shared by cart and order lookups.
//!
//! A record owned by someone else is reported exactly like a missing one, so
//! callers cannot discover the existence of other users' carts or orders.

use common::UserId;
use shop_store::{CartLineRecord, CartRecord, OrderRecord};

use crate::error::{Entity, ShopError};

/// A record that belongs to a single user.
pub trait Owned {
    fn owner(&self) -> UserId;
}

impl Owned for CartRecord {
    fn owner(&self) -> UserId {
        self.user_id
    }
}

impl Owned for CartLineRecord {
    fn owner(&self) -> UserId {
        self.user_id
    }
}

impl Owned for OrderRecord {
    fn owner(&self) -> UserId {
        self.user_id
    }
}

/// Returns the record if it exists and belongs to `user_id`, otherwise
/// `NotFound` for `entity`/`id`.
pub fn assert_owned<T: Owned>(
    record: Option<T>,
    user_id: UserId,
    entity: Entity,
    id: impl std::fmt::Display,
) -> Result<T, ShopError> {
    match record {
        Some(record) if record.owner() == user_id => Ok(record),
        _ => Err(ShopError::not_found(entity, id)),
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use common::CartId;

    use super::*;

    fn cart(user_id: UserId) -> CartRecord {
        CartRecord {
            id: CartId::new(),
            user_id,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_owner_gets_record() {
        let user_id = UserId::new();
        let record = cart(user_id);
        let id = record.id;

        let owned = assert_owned(Some(record), user_id, Entity::Cart, id).unwrap();
        assert_eq!(owned.id, id);
    }

    #[test]
    fn test_foreign_and_missing_look_the_same() {
        let user_id = UserId::new();
        let record = cart(UserId::new());
        let id = record.id;

        let foreign = assert_owned(Some(record), user_id, Entity::Cart, id).unwrap_err();
        let missing = assert_owned(None::<CartRecord>, user_id, Entity::Cart, id).unwrap_err();

        assert_eq!(foreign.to_string(), missing.to_string());
        assert_eq!(foreign.kind(), missing.kind());
    }
}
