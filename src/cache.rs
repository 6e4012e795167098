//! Client-side task cache.
//!
//! Tasks live in one id-indexed arena. List pages merge into it by id, so
//! overlapping or out-of-order pages never produce duplicates, and a mutation
//! patches the single affected entry instead of refetching whole lists.

use crate::types::{Keyed, Page, Task, TaskId};
use std::collections::HashMap;

/// Ordered, id-deduplicated accumulation of paginated results.
#[derive(Debug, Clone)]
pub struct Accumulator<T> {
    items: Vec<T>,
    index: HashMap<i64, usize>,
    count: u64,
    next_page: Option<u32>,
}

impl<T> Default for Accumulator<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            index: HashMap::new(),
            count: 0,
            next_page: Some(1),
        }
    }
}

impl<T: Keyed> Accumulator<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge page `page_number` into the list. Known ids are replaced in
    /// place, new ids are appended. Returns how many ids were new.
    pub fn merge_page(&mut self, page_number: u32, page: Page<T>) -> usize {
        let has_more = page.has_more();
        self.count = self.count.max(page.count);
        let mut added = 0;
        for item in page.results {
            if self.upsert(item) {
                added += 1;
            }
        }
        let following = page_number.max(1) + 1;
        self.next_page = match (has_more, self.next_page) {
            (false, _) => None,
            (true, Some(next)) => Some(next.max(following)),
            (true, None) => Some(following),
        };
        added
    }

    /// Insert or replace one item. Returns true when the id was new.
    pub fn upsert(&mut self, item: T) -> bool {
        let key = item.key();
        match self.index.get(&key) {
            Some(&pos) => {
                self.items[pos] = item;
                false
            }
            None => {
                self.index.insert(key, self.items.len());
                self.items.push(item);
                true
            }
        }
    }

    /// Replace an existing entry. Returns false if the id is not held.
    pub fn patch(&mut self, item: T) -> bool {
        match self.index.get(&item.key()) {
            Some(&pos) => {
                self.items[pos] = item;
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, key: i64) -> Option<T> {
        let pos = self.index.remove(&key)?;
        let item = self.items.remove(pos);
        for slot in self.index.values_mut() {
            if *slot > pos {
                *slot -= 1;
            }
        }
        self.count = self.count.saturating_sub(1);
        Some(item)
    }

    pub fn get(&self, key: i64) -> Option<&T> {
        self.index.get(&key).map(|&pos| &self.items[pos])
    }

    pub fn contains(&self, key: i64) -> bool {
        self.index.contains_key(&key)
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total reported by the server, which may exceed what is loaded.
    pub fn total(&self) -> u64 {
        self.count.max(self.items.len() as u64)
    }

    /// Next page to request, `None` once the last page has been seen.
    pub fn next_page(&self) -> Option<u32> {
        self.next_page
    }

    pub fn has_more(&self) -> bool {
        self.next_page.is_some()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Authoritative task map: the accumulated list plus tasks opened directly.
#[derive(Debug, Clone, Default)]
pub struct TaskCache {
    list: Accumulator<Task>,
    detached: HashMap<TaskId, Task>,
}

impl TaskCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn merge_page(&mut self, page_number: u32, page: Page<Task>) -> usize {
        for task in &page.results {
            self.detached.remove(&task.id);
        }
        self.list.merge_page(page_number, page)
    }

    /// Store a fresh copy of one task wherever it is held.
    pub fn patch(&mut self, task: Task) {
        if self.list.contains(task.id) {
            self.list.patch(task);
        } else {
            self.detached.insert(task.id, task);
        }
    }

    /// A newly created task joins the list view.
    pub fn insert_new(&mut self, task: Task) {
        self.detached.remove(&task.id);
        self.list.upsert(task);
    }

    pub fn remove(&mut self, task_id: TaskId) -> Option<Task> {
        self.list
            .remove(task_id)
            .or_else(|| self.detached.remove(&task_id))
    }

    pub fn get(&self, task_id: TaskId) -> Option<&Task> {
        self.list.get(task_id).or_else(|| self.detached.get(&task_id))
    }

    pub fn list(&self) -> &[Task] {
        self.list.items()
    }

    pub fn total(&self) -> u64 {
        self.list.total()
    }

    pub fn next_page(&self) -> Option<u32> {
        self.list.next_page()
    }

    pub fn has_more(&self) -> bool {
        self.list.has_more()
    }

    /// Drop the list (new filters); opened tasks stay.
    pub fn reset_list(&mut self) {
        let tasks = std::mem::take(&mut self.list);
        for task in tasks.items {
            self.detached.insert(task.id, task);
        }
    }
}

/// Ticket identifying the detail view a request was issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewTicket {
    generation: u64,
    task_id: Option<TaskId>,
}

impl ViewTicket {
    pub fn task_id(&self) -> Option<TaskId> {
        self.task_id
    }
}

/// Tracks which detail view is open so late responses for a closed view can
/// be recognised and dropped.
#[derive(Debug, Clone, Default)]
pub struct ViewTracker {
    generation: u64,
    open: Option<TaskId>,
}

impl ViewTracker {
    pub fn open(&mut self, task_id: TaskId) -> ViewTicket {
        self.generation += 1;
        self.open = Some(task_id);
        self.ticket()
    }

    pub fn close(&mut self) {
        self.generation += 1;
        self.open = None;
    }

    pub fn open_task(&self) -> Option<TaskId> {
        self.open
    }

    pub fn ticket(&self) -> ViewTicket {
        ViewTicket {
            generation: self.generation,
            task_id: self.open,
        }
    }

    /// True while the view the ticket was issued for is still showing.
    pub fn is_current(&self, ticket: ViewTicket) -> bool {
        ticket.generation == self.generation && ticket.task_id == self.open
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Department;

    fn dept(id: i64, name: &str) -> Department {
        Department {
            id,
            name: name.into(),
        }
    }

    fn page(items: Vec<Department>, next: bool) -> Page<Department> {
        Page {
            count: 3,
            results: items,
            next: next.then(|| "next".to_string()),
        }
    }

    #[test]
    fn test_overlapping_pages_deduplicate() {
        let mut acc = Accumulator::new();
        assert_eq!(acc.merge_page(1, page(vec![dept(1, "A"), dept(2, "B")], true)), 2);
        assert_eq!(acc.merge_page(2, page(vec![dept(2, "B2"), dept(3, "C")], false)), 1);

        let ids: Vec<i64> = acc.items().iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(acc.get(2).unwrap().name, "B2");
        assert!(!acc.has_more());
    }

    #[test]
    fn test_out_of_order_pages() {
        let mut acc = Accumulator::new();
        acc.merge_page(2, page(vec![dept(3, "C")], false));
        acc.merge_page(1, page(vec![dept(1, "A"), dept(3, "C")], true));
        assert_eq!(acc.len(), 2);
        assert_eq!(acc.next_page(), Some(2));
    }

    #[test]
    fn test_remove_keeps_index_consistent() {
        let mut acc = Accumulator::new();
        acc.merge_page(1, page(vec![dept(1, "A"), dept(2, "B"), dept(3, "C")], false));
        assert_eq!(acc.remove(1).unwrap().name, "A");
        assert_eq!(acc.get(3).unwrap().name, "C");
        assert!(acc.patch(dept(2, "B'")));
        assert_eq!(acc.items()[0].name, "B'");
        assert!(!acc.patch(dept(9, "nope")));
    }

    #[test]
    fn test_view_tracker_rejects_stale_tickets() {
        let mut views = ViewTracker::default();
        let first = views.open(1);
        assert!(views.is_current(first));

        views.close();
        assert!(!views.is_current(first));

        let second = views.open(1);
        assert!(!views.is_current(first));
        assert!(views.is_current(second));
    }
}
