//! Client-side event filtering.
//!
//! Every function here is pure: the result is the subsequence of the input
//! that passes the predicate, in input order.

use crate::models::Event;
use crate::utils::fold_text;

/// Tag chips offered on the explore screen.
pub const DEFAULT_TAGS: [&str; 10] = [
    "Today",
    "Fitness",
    "Social",
    "Outdoors",
    "Family",
    "Music",
    "Athletics",
    "Popular",
    "Dance",
    "Indoors",
];

const ALL_LABEL: &str = "All";

/// Coarse temporal bucket an event can be labelled with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DateBucket {
    Today,
    ThisWeek,
    Weekend,
}

impl DateBucket {
    pub const ALL: [DateBucket; 3] = [DateBucket::Today, DateBucket::ThisWeek, DateBucket::Weekend];

    pub fn label(self) -> &'static str {
        match self {
            DateBucket::Today => "Today",
            DateBucket::ThisWeek => "This Week",
            DateBucket::Weekend => "Weekend",
        }
    }

    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        Self::ALL
            .into_iter()
            .find(|bucket| bucket.label().eq_ignore_ascii_case(text))
    }

    /// A bucket matches on the date label or, for records that only carry
    /// it as a tag, on the tag list.
    pub fn matches(self, event: &Event) -> bool {
        event.date_label.trim().eq_ignore_ascii_case(self.label()) || event.has_tag(self.label())
    }
}

/// The single active category chip.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum CategoryFilter {
    #[default]
    All,
    Bucket(DateBucket),
    Tag(String),
}

impl CategoryFilter {
    pub fn parse(text: &str) -> Self {
        let trimmed = text.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(ALL_LABEL) {
            return CategoryFilter::All;
        }
        match DateBucket::parse(trimmed) {
            Some(bucket) => CategoryFilter::Bucket(bucket),
            None => CategoryFilter::Tag(trimmed.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            CategoryFilter::All => ALL_LABEL,
            CategoryFilter::Bucket(bucket) => bucket.label(),
            CategoryFilter::Tag(tag) => tag,
        }
    }

    pub fn matches(&self, event: &Event) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Bucket(bucket) => bucket.matches(event),
            CategoryFilter::Tag(tag) => event.has_tag(tag),
        }
    }
}

/// `folded_query` must already be trimmed and lower-cased.
pub fn matches_text(event: &Event, folded_query: &str) -> bool {
    if folded_query.is_empty() {
        return true;
    }
    let description = event.description.as_deref().unwrap_or_default();
    [
        event.title.as_str(),
        event.location.as_str(),
        description,
    ]
    .iter()
    .any(|field| field.to_lowercase().contains(folded_query))
        || event.tags.join(" ").to_lowercase().contains(folded_query)
}

/// Filters by free text and a single category.
pub fn filter(events: &[Event], query: &str, active: &CategoryFilter) -> Vec<Event> {
    let folded = fold_text(query);
    events
        .iter()
        .filter(|event| matches_text(event, &folded) && active.matches(event))
        .cloned()
        .collect()
}

/// Explore-screen filter: free text, every selected tag, and an optional
/// date fragment matched against the date label.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EventFilter {
    pub query: String,
    pub tags: Vec<String>,
    pub date: String,
}

impl EventFilter {
    pub fn with_tags<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tags: tags.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Adds the tag when absent, removes it when present.
    pub fn toggle_tag(&mut self, tag: &str) {
        if let Some(pos) = self.tags.iter().position(|existing| existing == tag) {
            self.tags.remove(pos);
        } else {
            self.tags.push(tag.to_string());
        }
    }

    pub fn is_selected(&self, tag: &str) -> bool {
        self.tags.iter().any(|existing| existing == tag)
    }

    pub fn clear(&mut self) {
        self.query.clear();
        self.tags.clear();
        self.date.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.query.trim().is_empty() && self.tags.is_empty() && self.date.trim().is_empty()
    }

    pub fn matches(&self, event: &Event) -> bool {
        self.matches_folded(event, &fold_text(&self.query), &fold_text(&self.date))
    }

    fn matches_folded(&self, event: &Event, query: &str, date: &str) -> bool {
        let tags_match = self.tags.iter().all(|tag| event.has_tag(tag));
        let date_match = date.is_empty() || event.date_label.to_lowercase().contains(date);
        matches_text(event, query) && tags_match && date_match
    }

    pub fn apply(&self, events: &[Event]) -> Vec<Event> {
        let query = fold_text(&self.query);
        let date = fold_text(&self.date);
        events
            .iter()
            .filter(|event| self.matches_folded(event, &query, &date))
            .cloned()
            .collect()
    }
}

pub fn result_summary(count: usize) -> String {
    let plural = if count == 1 { "" } else { "s" };
    format!("Showing {count} result{plural}")
}

/// Distinct tags across `events`, in first-seen order.
pub fn available_tags(events: &[Event]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for tag in events.iter().flat_map(|event| event.tags.iter()) {
        if !out.iter().any(|existing| existing == tag) {
            out.push(tag.clone());
        }
    }
    out
}
