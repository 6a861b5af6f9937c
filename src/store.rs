//! store.rs: authoritative collection + active criteria, with the derived view
//! kept in lockstep. All mutation goes through [`ResultStore::apply`].

use metrics::gauge;

use crate::filter::{filter, FilterCriteria};
use crate::ingest::types::NewsRecord;

/// Inputs to the store. Each one replaces its target wholesale.
#[derive(Debug, Clone)]
pub enum StoreEvent {
    CollectionUpdated(Vec<NewsRecord>),
    CriteriaUpdated(FilterCriteria),
}

#[derive(Debug, Default)]
pub struct ResultStore {
    collection: Vec<NewsRecord>,
    criteria: FilterCriteria,
    view: Vec<NewsRecord>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single reducer. The view is recomputed before this returns, so no
    /// caller ever observes a stale view next to fresh inputs.
    pub fn apply(&mut self, event: StoreEvent) {
        match event {
            StoreEvent::CollectionUpdated(records) => {
                self.collection = records;
                gauge!("news_collection_size").set(self.collection.len() as f64);
            }
            StoreEvent::CriteriaUpdated(criteria) => {
                self.criteria = criteria;
            }
        }
        self.recompute();
    }

    pub fn set_collection(&mut self, records: Vec<NewsRecord>) {
        self.apply(StoreEvent::CollectionUpdated(records));
    }

    pub fn set_criteria(&mut self, criteria: FilterCriteria) {
        self.apply(StoreEvent::CriteriaUpdated(criteria));
    }

    fn recompute(&mut self) {
        self.view = filter(&self.collection, &self.criteria);
        tracing::trace!(
            target: "store",
            collection = self.collection.len(),
            view = self.view.len(),
            "view recomputed"
        );
    }

    pub fn collection(&self) -> &[NewsRecord] {
        &self.collection
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    pub fn view(&self) -> &[NewsRecord] {
        &self.view
    }
}
