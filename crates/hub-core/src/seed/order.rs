//! UI ordering of seeded catalogs.
//!
//! Users may reorder targets (and rule sets) in the UI; the order is stored
//! as an id list in a setting. Reseeding keeps the user's order and places
//! newcomers next to their neighbours in seed order.

use crate::error::{HubError, Result};
use crate::model::setting;
use rusqlite::Connection;
use std::collections::HashMap;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, Default)]
struct Link {
    prev: Option<u64>,
    next: Option<u64>,
}

/// Doubly linked list of ids, linked through a map keyed by id.
#[derive(Debug, Default)]
struct OrderList {
    head: Option<u64>,
    tail: Option<u64>,
    links: HashMap<u64, Link>,
}

impl OrderList {
    fn contains(&self, id: u64) -> bool {
        self.links.contains_key(&id)
    }

    fn push_back(&mut self, id: u64) {
        let link = Link {
            prev: self.tail,
            next: None,
        };
        match self.tail {
            Some(tail) => self.set_next(tail, Some(id)),
            None => self.head = Some(id),
        }
        self.tail = Some(id);
        self.links.insert(id, link);
    }

    fn push_front(&mut self, id: u64) {
        let link = Link {
            prev: None,
            next: self.head,
        };
        match self.head {
            Some(head) => self.set_prev(head, Some(id)),
            None => self.tail = Some(id),
        }
        self.head = Some(id);
        self.links.insert(id, link);
    }

    /// Insert `id` right after `anchor`, which must be present.
    fn insert_after(&mut self, anchor: u64, id: u64) {
        let next = self.links.get(&anchor).and_then(|l| l.next);
        self.set_next(anchor, Some(id));
        match next {
            Some(next) => self.set_prev(next, Some(id)),
            None => self.tail = Some(id),
        }
        self.links.insert(
            id,
            Link {
                prev: Some(anchor),
                next,
            },
        );
    }

    fn set_next(&mut self, id: u64, next: Option<u64>) {
        if let Some(link) = self.links.get_mut(&id) {
            link.next = next;
        }
    }

    fn set_prev(&mut self, id: u64, prev: Option<u64>) {
        if let Some(link) = self.links.get_mut(&id) {
            link.prev = prev;
        }
    }

    fn into_vec(self) -> Vec<u64> {
        let mut out = Vec::with_capacity(self.links.len());
        let mut cursor = self.head;
        while let Some(id) = cursor {
            out.push(id);
            cursor = self.links.get(&id).and_then(|l| l.next);
        }
        out
    }
}

/// Merge seeded ids into the user's order.
///
/// - `user`: ids in the user's order; ids no longer present are dropped.
/// - `seed`: ids in seed file order. An id missing from the user order goes
///   right after its predecessor in seed order, or first when it leads.
/// - `present`: every id in the table; the rest are appended in this order.
pub fn merge_order(user: &[u64], seed: &[u64], present: &[u64]) -> Vec<u64> {
    let mut list = OrderList::default();
    for &id in user {
        if present.contains(&id) && !list.contains(id) {
            list.push_back(id);
        }
    }
    for (i, &id) in seed.iter().enumerate() {
        if list.contains(id) {
            continue;
        }
        match i.checked_sub(1).map(|prev| seed[prev]) {
            None => list.push_front(id),
            Some(anchor) if list.contains(anchor) => list.insert_after(anchor, id),
            Some(_) => list.push_back(id),
        }
    }
    for &id in present {
        if !list.contains(id) {
            list.push_back(id);
        }
    }
    list.into_vec()
}

/// Rewrite the order stored under `key` after seeding.
pub(crate) fn reorder(conn: &Connection, key: &str, seed: &[u64], present: &[u64]) -> Result<()> {
    let user: Vec<u64> = match setting::get(conn, key) {
        Ok(order) => order.unwrap_or_default(),
        Err(HubError::Json { message, .. }) => {
            warn!("Ignoring malformed {}: {}", key, message);
            Vec::new()
        }
        Err(err) => return Err(err),
    };
    let merged = merge_order(&user, seed, present);
    debug!("{} = {:?}", key, merged);
    setting::set(conn, key, &merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;

    #[test]
    fn test_user_order_kept() {
        let merged = merge_order(&[3, 1, 2], &[1, 2, 3], &[1, 2, 3]);
        assert_eq!(merged, vec![3, 1, 2]);
    }

    #[test]
    fn test_newcomers_follow_seed_anchor() {
        let merged = merge_order(&[3, 1, 2], &[1, 2, 4, 5], &[1, 2, 3, 4, 5, 6]);
        assert_eq!(merged, vec![3, 1, 2, 4, 5, 6]);

        let merged = merge_order(&[2, 1], &[1, 7, 2], &[1, 2, 7]);
        assert_eq!(merged, vec![2, 1, 7]);
    }

    #[test]
    fn test_leading_newcomer_goes_first() {
        let merged = merge_order(&[1, 2], &[9, 1, 2], &[1, 2, 9]);
        assert_eq!(merged, vec![9, 1, 2]);
    }

    #[test]
    fn test_stale_and_duplicate_ids_dropped() {
        let merged = merge_order(&[5, 1, 1, 2], &[1, 2], &[1, 2]);
        assert_eq!(merged, vec![1, 2]);
    }

    #[test]
    fn test_empty_user_order() {
        let merged = merge_order(&[], &[2, 1], &[1, 2, 3]);
        assert_eq!(merged, vec![2, 1, 3]);
    }

    #[test]
    fn test_reorder_setting() {
        let db = Database::open_in_memory().unwrap();
        db.write(|tx| {
            setting::set(tx, "ui.target.order", &vec![2u64, 1])?;
            reorder(tx, "ui.target.order", &[1, 2, 3], &[1, 2, 3])?;
            let order: Option<Vec<u64>> = setting::get(tx, "ui.target.order")?;
            assert_eq!(order, Some(vec![2, 1, 3]));

            setting::set(tx, "ui.target.order", &"garbage")?;
            reorder(tx, "ui.target.order", &[1, 2], &[1, 2])?;
            let order: Option<Vec<u64>> = setting::get(tx, "ui.target.order")?;
            assert_eq!(order, Some(vec![1, 2]));
            Ok(())
        })
        .unwrap();
    }
}
