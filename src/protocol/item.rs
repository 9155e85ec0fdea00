//! Remote item handles
//!
//! An [`Item`] is an opaque reference to a node of the RoboDK station tree
//! (robot, frame, tool, object, target, program, ...). It caches nothing:
//! every property read is a fresh round trip through the [`Link`] that
//! produced it.
//!
//! [`Link`]: crate::link::Link

use std::fmt;
use std::hash::{Hash, Hasher};

use super::enums::ItemType;

/// Handle to a server-side station item
///
/// Equality and hashing use the id only; the type tag is informational.
/// `id == 0` is the null item returned by unsuccessful lookups.
///
/// Items are only produced by link operations and stay bound to the
/// [`Link`](crate::link::Link) that produced them.
#[derive(Clone, Copy)]
pub struct Item {
    id: u64,
    item_type: i32,
    session: u64,
}

impl Item {
    /// The null item (`id == 0`), accepted by every link as "no item"
    pub const fn null() -> Self {
        Item {
            id: 0,
            item_type: -1,
            session: 0,
        }
    }

    pub(crate) fn new(id: u64, item_type: i32, session: u64) -> Self {
        Item {
            id,
            item_type,
            session,
        }
    }

    /// Server-assigned identifier
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Raw type tag received with the handle
    pub fn type_code(&self) -> i32 {
        self.item_type
    }

    /// Decoded type tag, if it is a known item type
    pub fn item_type(&self) -> Option<ItemType> {
        ItemType::from_code(self.item_type)
    }

    /// False for the null item
    pub fn is_valid(&self) -> bool {
        self.id != 0
    }

    pub(crate) fn session(&self) -> u64 {
        self.session
    }

    pub(crate) fn invalidate(&mut self) {
        self.id = 0;
    }
}

impl Default for Item {
    fn default() -> Self {
        Item::null()
    }
}

impl PartialEq for Item {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Item {}

impl Hash for Item {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "Item({} of type {})", self.id, self.item_type)
        } else {
            write!(f, "Item(INVALID)")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_null_item() {
        let item = Item::null();
        assert!(!item.is_valid());
        assert_eq!(item.id(), 0);
        assert_eq!(format!("{:?}", item), "Item(INVALID)");
    }

    #[test]
    fn test_equality_ignores_type() {
        let a = Item::new(42, 2, 1);
        let b = Item::new(42, 5, 1);
        let c = Item::new(43, 2, 1);
        assert_eq!(a, b);
        assert_ne!(a, c);

        let set: HashSet<Item> = [a, b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_type_decoding() {
        let robot = Item::new(7, 2, 1);
        assert_eq!(robot.item_type(), Some(ItemType::Robot));
        assert_eq!(Item::new(7, 99, 1).item_type(), None);
    }

    #[test]
    fn test_invalidate() {
        let mut item = Item::new(7, 5, 1);
        item.invalidate();
        assert!(!item.is_valid());
    }
}
