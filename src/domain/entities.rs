//! Domain entities mirrored from the content store.
//!
//! Field names follow the store's JSON projection; this crate never writes
//! them back.

use serde::{Deserialize, Deserializer};
use time::{Duration, OffsetDateTime};

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EventRecord {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    pub slug: Slug,
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    #[serde(rename = "eventType", default)]
    pub event_type: Option<String>,
    #[serde(rename = "ticketsPrice", default)]
    pub tickets_price: Option<f64>,
    #[serde(default)]
    pub venue: Option<Venue>,
    #[serde(default)]
    pub headline: Option<Artist>,
    #[serde(default)]
    pub image: Option<ImageRef>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub details: Vec<RichTextBlock>,
    /// Minutes between doors opening and the start of the event.
    #[serde(rename = "doorsOpen", default)]
    pub doors_open: Option<i64>,
    #[serde(default)]
    pub tickets: Option<String>,
    /// Free-text directions shown under the venue name.
    #[serde(rename = "partyLocation", default)]
    pub party_location: Option<String>,
}

impl EventRecord {
    pub fn slug(&self) -> &str {
        &self.slug.current
    }

    /// Price, ignoring values the store should never hold.
    pub fn price(&self) -> Option<f64> {
        self.tickets_price
            .filter(|price| price.is_finite() && *price >= 0.0)
    }

    /// When doors open; a missing or negative offset means the start time.
    ///
    /// `None` when the offset is too large to represent.
    pub fn doors_open_at(&self) -> Option<OffsetDateTime> {
        let minutes = self.doors_open.unwrap_or(0).max(0);
        let seconds = minutes.checked_mul(60)?;
        self.date.checked_sub(Duration::seconds(seconds))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Slug {
    pub current: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Venue {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Artist {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
}

/// Reference to a stored image asset.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ImageRef {
    #[serde(default)]
    pub asset: Option<AssetRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AssetRef {
    #[serde(rename = "_ref")]
    pub reference: String,
}

/// One Portable Text block. Only text-bearing blocks are rendered.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RichTextBlock {
    #[serde(rename = "_type", default)]
    pub kind: String,
    #[serde(default)]
    pub style: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub children: Vec<RichTextSpan>,
}

impl RichTextBlock {
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|span| span.text.as_deref())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RichTextSpan {
    #[serde(default)]
    pub text: Option<String>,
}

/// Result of the detail query: the requested event and its neighbours.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EventDetailRecord {
    #[serde(default)]
    pub event: Option<EventRecord>,
    #[serde(rename = "relatedEvents", default, deserialize_with = "null_as_default")]
    pub related_events: Vec<EventRecord>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
