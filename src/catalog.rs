use std::sync::Arc;

use tracing::{debug, warn};

use crate::filter::{self, CategoryFilter, EventFilter};
use crate::models::{Event, EventId};
use crate::scope::ScreenScope;
use crate::store::EventStore;

/// Events held by the explore screen, plus its filter controls.
pub struct Catalog {
    store: Arc<dyn EventStore>,
    scope: ScreenScope,
    events: Vec<Event>,
    load_failed: bool,
    pub filter: EventFilter,
    pub category: CategoryFilter,
}

impl Catalog {
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self::with_scope(store, ScreenScope::new())
    }

    pub fn with_scope(store: Arc<dyn EventStore>, scope: ScreenScope) -> Self {
        Self {
            store,
            scope,
            events: Vec::new(),
            load_failed: false,
            filter: EventFilter::default(),
            category: CategoryFilter::All,
        }
    }

    /// Replaces the held events with a fresh fetch.
    ///
    /// A failed fetch leaves the catalog empty; a fetch that finishes after
    /// the screen was left changes nothing.
    pub async fn refresh(&mut self) -> &[Event] {
        let store = Arc::clone(&self.store);
        match self.scope.run(store.list_events()).await {
            Ok(Ok(events)) => {
                debug!(count = events.len(), store = store.name(), "catalog loaded");
                self.events = events;
                self.load_failed = false;
            }
            Ok(Err(err)) => {
                warn!(error = %err, store = store.name(), "catalog load failed");
                self.events.clear();
                self.load_failed = true;
            }
            Err(_) => debug!("catalog load discarded after leaving"),
        }
        &self.events
    }

    pub fn leave(&self) {
        self.scope.leave();
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn load_failed(&self) -> bool {
        self.load_failed
    }

    pub fn find(&self, id: &EventId) -> Option<&Event> {
        self.events.iter().find(|event| &event.id == id)
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.filter.query = query.into();
    }

    pub fn set_date(&mut self, date: impl Into<String>) {
        self.filter.date = date.into();
    }

    pub fn toggle_tag(&mut self, tag: &str) {
        self.filter.toggle_tag(tag);
    }

    pub fn clear_filters(&mut self) {
        self.filter.clear();
        self.category = CategoryFilter::All;
    }

    /// Events passing both the explore filter and the category chip.
    pub fn results(&self) -> Vec<Event> {
        let narrowed = self.filter.apply(&self.events);
        filter::filter(&narrowed, "", &self.category)
    }

    pub fn summary(&self) -> String {
        filter::result_summary(self.results().len())
    }

    pub fn tags(&self) -> Vec<String> {
        let mut tags: Vec<String> = filter::DEFAULT_TAGS.iter().map(|t| t.to_string()).collect();
        for tag in filter::available_tags(&self.events) {
            if !tags.contains(&tag) {
                tags.push(tag);
            }
        }
        tags
    }
}

/// Outcome of opening the detail screen for one event.
#[derive(Clone, Debug, PartialEq)]
pub enum EventDetails {
    Found(Event),
    NotFound,
}

pub async fn load_details(
    store: &dyn EventStore,
    scope: &ScreenScope,
    id: &EventId,
) -> Option<EventDetails> {
    match scope.run(store.get_event(id)).await {
        Ok(Ok(event)) => Some(EventDetails::Found(event)),
        Ok(Err(err)) => {
            warn!(%id, error = %err, "event details unavailable");
            Some(EventDetails::NotFound)
        }
        Err(_) => None,
    }
}
