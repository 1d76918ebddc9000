//! In-memory filtering over the event listing.

use super::entities::EventRecord;

/// Free-text and category filter for the home listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFilter {
    search: Option<String>,
    event_type: Option<String>,
}

impl EventFilter {
    /// Build a filter, treating blank inputs as "no constraint".
    pub fn new(search: Option<&str>, event_type: Option<&str>) -> Self {
        Self {
            search: non_blank(search).map(str::to_lowercase),
            event_type: non_blank(event_type).map(str::to_string),
        }
    }

    pub fn search(&self) -> Option<&str> {
        self.search.as_deref()
    }

    pub fn event_type(&self) -> Option<&str> {
        self.event_type.as_deref()
    }

    pub fn is_active(&self) -> bool {
        self.search.is_some() || self.event_type.is_some()
    }

    pub fn matches(&self, event: &EventRecord) -> bool {
        self.matches_search(event) && self.matches_type(event)
    }

    pub fn apply<'a>(&self, events: &'a [EventRecord]) -> Vec<&'a EventRecord> {
        events.iter().filter(|event| self.matches(event)).collect()
    }

    fn matches_search(&self, event: &EventRecord) -> bool {
        let Some(needle) = self.search.as_deref() else {
            return true;
        };

        let venue = event.venue.as_ref().map(|venue| venue.name.as_str());
        let headline = event.headline.as_ref().map(|artist| artist.name.as_str());

        std::iter::once(Some(event.name.as_str()))
            .chain([venue, headline])
            .flatten()
            .any(|haystack| haystack.to_lowercase().contains(needle))
    }

    fn matches_type(&self, event: &EventRecord) -> bool {
        match self.event_type.as_deref() {
            Some(wanted) => event.event_type.as_deref() == Some(wanted),
            None => true,
        }
    }
}

/// Distinct non-empty categories in first-seen order.
pub fn event_types(events: &[EventRecord]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for kind in events.iter().filter_map(|event| non_blank(event.event_type.as_deref())) {
        if !seen.iter().any(|existing| existing == kind) {
            seen.push(kind.to_string());
        }
    }
    seen
}

/// Human label for a category key such as `live-music`.
pub fn category_label(kind: &str) -> String {
    kind.replace('-', " ")
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}
