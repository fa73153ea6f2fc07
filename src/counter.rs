use std::{collections::HashMap, sync::Arc};

use parking_lot::RwLock;

pub type PageId = String;
pub type UserId = String;

type PageVisits = HashMap<UserId, u64>;

/// Counts each user visit per page.
///
/// Cloning is cheap and every clone shares the same table.
#[derive(Clone, Debug, Default)]
pub struct VisitCounter {
    // page -> user -> visits
    visits: Arc<RwLock<HashMap<PageId, PageVisits>>>,
}

impl VisitCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a page visit by the user.
    pub fn increment(&self, page: &str, user: &str) {
        let mut state = self.visits.write();

        match state.get_mut(page) {
            Some(page_visits) => *page_visits.entry(user.to_owned()).or_insert(0) += 1,
            None => {
                state.insert(page.to_owned(), HashMap::from([(user.to_owned(), 1)]));
            }
        }
    }

    /// Number of visits of the page by the user.
    pub fn page_user_visits(&self, page: &str, user: &str) -> u64 {
        let state = self.visits.read();

        state
            .get(page)
            .and_then(|page_visits| page_visits.get(user))
            .copied()
            .unwrap_or(0)
    }

    /// Number of visits of the page by all users.
    pub fn page_total_visits(&self, page: &str) -> u64 {
        let state = self.visits.read();

        state
            .get(page)
            .map(|page_visits| page_visits.values().sum())
            .unwrap_or(0)
    }

    /// Number of visits by the user across all pages.
    pub fn user_total_visits(&self, user: &str) -> u64 {
        let state = self.visits.read();

        state
            .values()
            .filter_map(|page_visits| page_visits.get(user))
            .sum()
    }

    pub fn total_visits(&self) -> u64 {
        let state = self.visits.read();

        state
            .values()
            .flat_map(|page_visits| page_visits.values())
            .sum()
    }
}
