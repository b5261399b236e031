//! Process-wide identifiers for pixel storage, images and special images.

use std::sync::atomic::{AtomicU32, Ordering};

/// Reserved id meaning "allocate a fresh id during construction".
pub const NEED_NEW_UNIQUE_ID: u32 = 0;

static NEXT_ID: AtomicU32 = AtomicU32::new(1);

/// Return a new process-unique, non-zero id.
pub fn next_unique_id() -> u32 {
    loop {
        let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
        if id != NEED_NEW_UNIQUE_ID {
            return id;
        }
    }
}

/// Resolve `id`, minting a fresh one if it is [`NEED_NEW_UNIQUE_ID`].
pub fn resolve_unique_id(id: u32) -> u32 {
    if id == NEED_NEW_UNIQUE_ID {
        next_unique_id()
    } else {
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique_and_non_zero() {
        let a = next_unique_id();
        let b = next_unique_id();
        assert_ne!(a, b);
        assert_ne!(a, NEED_NEW_UNIQUE_ID);
    }

    #[test]
    fn test_resolve_keeps_existing() {
        assert_eq!(resolve_unique_id(42), 42);
        assert_ne!(resolve_unique_id(NEED_NEW_UNIQUE_ID), NEED_NEW_UNIQUE_ID);
    }
}
