//! View models and template rendering for the public pages.
//!
//! Builders here are pure: they take records, an explicit "now" and the
//! site offset, and return the structs the askama templates read.

use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;
use time::{OffsetDateTime, UtcOffset, format_description::BorrowedFormatItem, macros::format_description};
use url::Url;

use crate::application::error::{ErrorReport, HttpError};
use crate::domain::entities::{EventRecord, RichTextBlock};
use crate::domain::listing::{EventFilter, category_label, event_types};
use crate::domain::pricing::{PriceLevel, format_price};
use crate::domain::status::{countdown, event_status};

const LONG_DATE_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[weekday repr:long], [month repr:long] [day padding:none], [year]");
const SHORT_DATE_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[month repr:short] [day padding:none], [year]");
const TIME_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[hour repr:12 padding:none]:[minute] [period]");
const ISO_FORMAT: &[BorrowedFormatItem<'static>] = format_description!(
    "[year]-[month]-[day]T[hour]:[minute]:[second][offset_hour sign:mandatory]:[offset_minute]"
);

pub const CARD_IMAGE_SIZE: (u32, u32) = (400, 225);
pub const HERO_IMAGE_SIZE: (u32, u32) = (550, 310);

const MAP_SEARCH_URL: &str = "https://www.google.com/maps/search/";

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;

        HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            public_message,
            &error,
        )
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_template",
            "Template rendering failed",
            err,
        )
        .into()
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

pub fn render_not_found_response(chrome: LayoutChrome) -> Response {
    let view = LayoutContext::new(
        chrome.with_title("Event not found"),
        ErrorPageView::not_found(),
    );
    let mut response = render_template_response(ErrorTemplate { view }, StatusCode::NOT_FOUND);
    ErrorReport::from_message(
        "presentation::views::render_not_found_response",
        StatusCode::NOT_FOUND,
        "Resource not found",
    )
    .attach(&mut response);
    response
}

/// Render an HTML error page for a failed request, keeping its report.
pub fn render_error_response(chrome: LayoutChrome, error: HttpError) -> Response {
    if error.status() == StatusCode::NOT_FOUND {
        return render_not_found_response(chrome);
    }

    let (status, public_message, report) = error.into_parts();
    let view = LayoutContext::new(
        chrome.with_title("Something went wrong"),
        ErrorPageView::failure(public_message),
    );
    let mut response = render_template_response(ErrorTemplate { view }, status);
    report.attach(&mut response);
    response
}

/// Site-wide values every page needs.
#[derive(Clone)]
pub struct LayoutChrome {
    pub site_title: String,
    pub public_url: Url,
    pub meta: PageMetaView,
}

impl LayoutChrome {
    pub fn new(site_title: impl Into<String>, public_url: Url) -> Self {
        let site_title = site_title.into();
        Self {
            meta: PageMetaView {
                title: site_title.clone(),
                description: format!("Upcoming events at {site_title}"),
                canonical: public_url.to_string(),
            },
            site_title,
            public_url,
        }
    }

    pub fn with_title(self, title: &str) -> Self {
        let meta = PageMetaView {
            title: format!("{title} | {}", self.site_title),
            ..self.meta
        };
        Self { meta, ..self }
    }

    pub fn with_canonical_path(self, path: &str) -> Self {
        let canonical = self
            .public_url
            .join(path)
            .map(|url| url.to_string())
            .unwrap_or_else(|_| self.meta.canonical.clone());
        Self {
            meta: self.meta.with_canonical(canonical),
            ..self
        }
    }
}

#[derive(Clone)]
pub struct PageMetaView {
    pub title: String,
    pub description: String,
    pub canonical: String,
}

impl PageMetaView {
    pub fn with_canonical(self, canonical: String) -> Self {
        Self { canonical, ..self }
    }
}

pub struct LayoutContext<T> {
    pub site_title: String,
    pub meta: PageMetaView,
    pub content: T,
}

impl<T> LayoutContext<T> {
    pub fn new(chrome: LayoutChrome, content: T) -> Self {
        Self {
            site_title: chrome.site_title,
            meta: chrome.meta,
            content,
        }
    }
}

/// Listing and related-event card.
#[derive(Clone)]
pub struct EventCard {
    pub href: String,
    pub name: String,
    pub iso_date: String,
    pub date_label: String,
    pub short_date_label: String,
    pub time_label: String,
    pub venue: Option<String>,
    pub headline: Option<String>,
    pub category: Option<CategoryView>,
    pub status: StatusView,
    pub price: Option<PriceView>,
    pub image_url: String,
}

#[derive(Clone)]
pub struct CategoryView {
    pub value: String,
    pub label: String,
}

#[derive(Clone)]
pub struct StatusView {
    pub label: String,
    pub css_class: &'static str,
}

#[derive(Clone)]
pub struct PriceView {
    pub label: String,
    pub level: u8,
    /// One CSS class per band, filled up to `level`.
    pub bands: Vec<&'static str>,
}

/// Category chip in the listing filter bar.
#[derive(Clone)]
pub struct FilterChip {
    pub label: String,
    pub href: String,
    pub is_active: bool,
}

pub struct IndexContext {
    pub events: Vec<EventCard>,
    pub event_count: usize,
    pub total_count: usize,
    pub has_results: bool,
    pub is_filtered: bool,
    pub search: String,
    pub active_type: String,
    pub chips: Vec<FilterChip>,
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub view: LayoutContext<IndexContext>,
}

/// One rendered Portable Text block.
#[derive(Clone)]
pub struct DetailBlockView {
    pub kind: DetailBlockKind,
    pub text: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DetailBlockKind {
    Paragraph,
    Heading,
    Subheading,
    Quote,
}

#[derive(Clone)]
pub struct ShareLink {
    pub network: &'static str,
    pub label: &'static str,
    pub href: String,
}

/// "Getting There" panel under the event details.
pub struct VenueView {
    pub name: Option<String>,
    pub location: Option<String>,
    pub map_href: Option<String>,
}

pub struct CountdownUnit {
    pub value: String,
    pub label: &'static str,
}

/// Time until the start, as of the render.
pub struct CountdownView {
    pub units: Vec<CountdownUnit>,
}

pub struct EventDetailContext {
    pub card: EventCard,
    pub hero_image_url: String,
    pub doors_open_label: Option<String>,
    pub countdown: Option<CountdownView>,
    pub venue: Option<VenueView>,
    pub tickets_url: Option<String>,
    pub details: Vec<DetailBlockView>,
    pub share_links: Vec<ShareLink>,
    pub related: Vec<EventCard>,
}

#[derive(Template)]
#[template(path = "event.html")]
pub struct EventTemplate {
    pub view: LayoutContext<EventDetailContext>,
}

pub struct ErrorPageView {
    pub title: String,
    pub message: String,
    pub primary_action: Option<ErrorAction>,
}

impl ErrorPageView {
    pub fn not_found() -> Self {
        Self {
            title: "Event Not Found".to_string(),
            message: "The event you are looking for does not exist or is no longer listed."
                .to_string(),
            primary_action: Some(ErrorAction::home()),
        }
    }

    pub fn failure(public_message: &str) -> Self {
        Self {
            title: "Something Went Wrong".to_string(),
            message: format!("{public_message}. Please try again in a moment."),
            primary_action: Some(ErrorAction::home()),
        }
    }
}

pub struct ErrorAction {
    pub href: String,
    pub label: String,
}

impl ErrorAction {
    pub fn home() -> Self {
        Self {
            href: "/".to_string(),
            label: "Back to events".to_string(),
        }
    }
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub view: LayoutContext<ErrorPageView>,
}

/// Build a card for `event` as seen at `now`, displayed in `offset`.
pub fn build_event_card(
    event: &EventRecord,
    now: OffsetDateTime,
    offset: UtcOffset,
    image_url: Option<String>,
) -> EventCard {
    let local = event.date.checked_to_offset(offset).unwrap_or(event.date);
    let status = event_status(event.date, now.checked_to_offset(offset).unwrap_or(now));

    EventCard {
        href: format!("/events/{}", event.slug()),
        name: display_name(&event.name),
        iso_date: format_or_empty(local, ISO_FORMAT),
        date_label: format_or_empty(local, LONG_DATE_FORMAT),
        short_date_label: format_or_empty(local, SHORT_DATE_FORMAT),
        time_label: format_or_empty(local, TIME_FORMAT),
        venue: non_empty(event.venue.as_ref().map(|venue| venue.name.as_str())),
        headline: non_empty(event.headline.as_ref().map(|artist| artist.name.as_str())),
        category: non_empty(event.event_type.as_deref()).map(|value| CategoryView {
            label: category_label(&value),
            value,
        }),
        status: StatusView {
            label: status.label(),
            css_class: status.css_class(),
        },
        price: event.price().map(|price| {
            let level = PriceLevel::for_price(price);
            PriceView {
                label: format_price(price),
                level: level.get(),
                bands: level
                    .bands()
                    .into_iter()
                    .map(|filled| if filled { "band band-filled" } else { "band" })
                    .collect(),
            }
        }),
        image_url: image_url.unwrap_or_else(|| placeholder_image(CARD_IMAGE_SIZE)),
    }
}

/// Listing page model: filtered cards plus the filter bar state.
pub fn build_index_context(
    events: &[EventRecord],
    filter: &EventFilter,
    now: OffsetDateTime,
    offset: UtcOffset,
    image_for: impl Fn(&EventRecord) -> Option<String>,
) -> IndexContext {
    let cards: Vec<EventCard> = filter
        .apply(events)
        .into_iter()
        .map(|event| build_event_card(event, now, offset, image_for(event)))
        .collect();

    IndexContext {
        event_count: cards.len(),
        total_count: events.len(),
        has_results: !cards.is_empty(),
        is_filtered: filter.is_active(),
        search: filter.search().unwrap_or_default().to_string(),
        active_type: filter.event_type().unwrap_or_default().to_string(),
        chips: build_filter_chips(&event_types(events), filter),
        events: cards,
    }
}

/// Detail page model. `image_for` receives the wanted size.
pub fn build_detail_context(
    event: &EventRecord,
    related: &[EventRecord],
    page_url: &str,
    now: OffsetDateTime,
    offset: UtcOffset,
    image_for: impl Fn(&EventRecord, (u32, u32)) -> Option<String>,
) -> EventDetailContext {
    let card = build_event_card(event, now, offset, image_for(event, CARD_IMAGE_SIZE));
    let hero_image_url =
        image_for(event, HERO_IMAGE_SIZE).unwrap_or_else(|| placeholder_image(HERO_IMAGE_SIZE));
    let doors_open_label = event
        .doors_open_at()
        .and_then(|doors| format_time(doors, offset));
    let share_links = build_share_links(page_url, &card.name);

    EventDetailContext {
        hero_image_url,
        doors_open_label,
        countdown: build_countdown(event.date, now),
        venue: build_venue_view(event),
        tickets_url: non_empty(event.tickets.as_deref()),
        details: build_detail_blocks(&event.details),
        share_links,
        related: related
            .iter()
            .map(|other| build_event_card(other, now, offset, image_for(other, CARD_IMAGE_SIZE)))
            .collect(),
        card,
    }
}

/// Category chips for the filter bar; "All" first.
pub fn build_filter_chips(types: &[String], filter: &EventFilter) -> Vec<FilterChip> {
    let search = filter.search().unwrap_or_default();
    let mut chips = vec![FilterChip {
        label: "All".to_string(),
        href: listing_href(search, None),
        is_active: filter.event_type().is_none(),
    }];
    chips.extend(types.iter().map(|kind| FilterChip {
        label: category_label(kind),
        href: listing_href(search, Some(kind)),
        is_active: filter.event_type() == Some(kind.as_str()),
    }));
    chips
}

pub fn build_detail_blocks(blocks: &[RichTextBlock]) -> Vec<DetailBlockView> {
    blocks
        .iter()
        .filter(|block| block.kind == "block")
        .filter_map(|block| {
            let text = block.text();
            if text.trim().is_empty() {
                return None;
            }
            let kind = match block.style.as_deref() {
                Some("h1") | Some("h2") => DetailBlockKind::Heading,
                Some("h3") | Some("h4") | Some("h5") | Some("h6") => DetailBlockKind::Subheading,
                Some("blockquote") => DetailBlockKind::Quote,
                _ => DetailBlockKind::Paragraph,
            };
            Some(DetailBlockView { kind, text })
        })
        .collect()
}

pub fn build_share_links(page_url: &str, title: &str) -> Vec<ShareLink> {
    let targets: [(&'static str, &'static str, &str, Vec<(&str, &str)>); 3] = [
        (
            "x",
            "Share on X",
            "https://twitter.com/intent/tweet",
            vec![("text", title), ("url", page_url)],
        ),
        (
            "facebook",
            "Share on Facebook",
            "https://www.facebook.com/sharer/sharer.php",
            vec![("u", page_url)],
        ),
        (
            "linkedin",
            "Share on LinkedIn",
            "https://www.linkedin.com/shareArticle",
            vec![("mini", "true"), ("url", page_url), ("title", title)],
        ),
    ];

    targets
        .into_iter()
        .filter_map(|(network, label, base, params)| {
            Url::parse_with_params(base, params)
                .ok()
                .map(|href| ShareLink {
                    network,
                    label,
                    href: href.to_string(),
                })
        })
        .collect()
}

/// `None` until the event has started.
pub fn build_countdown(date: OffsetDateTime, now: OffsetDateTime) -> Option<CountdownView> {
    let remaining = countdown(date, now);
    if remaining.is_elapsed() {
        return None;
    }

    let units = [
        (remaining.days, "Days"),
        (remaining.hours, "Hours"),
        (remaining.minutes, "Minutes"),
        (remaining.seconds, "Seconds"),
    ]
    .into_iter()
    .map(|(value, label)| CountdownUnit {
        value: format!("{value:02}"),
        label,
    })
    .collect();

    Some(CountdownView { units })
}

/// Shown only for events with a venue. The map link searches the directions
/// when given, the venue name otherwise.
pub fn build_venue_view(event: &EventRecord) -> Option<VenueView> {
    let venue = event.venue.as_ref()?;
    let name = non_empty(Some(venue.name.as_str()));
    let location = non_empty(event.party_location.as_deref());
    let map_href = location
        .as_deref()
        .or(name.as_deref())
        .and_then(|query| Url::parse_with_params(MAP_SEARCH_URL, [("api", "1"), ("query", query)]).ok())
        .map(|href| href.to_string());

    Some(VenueView {
        name,
        location,
        map_href,
    })
}

/// Clock time in `offset`; `None` when the instant cannot be shown there.
pub fn format_time(value: OffsetDateTime, offset: UtcOffset) -> Option<String> {
    value
        .checked_to_offset(offset)
        .and_then(|local| local.format(TIME_FORMAT).ok())
}

pub fn placeholder_image((width, height): (u32, u32)) -> String {
    format!("https://placehold.co/{width}x{height}/png")
}

fn listing_href(search: &str, kind: Option<&str>) -> String {
    let mut params: Vec<(&str, &str)> = Vec::new();
    if !search.is_empty() {
        params.push(("q", search));
    }
    if let Some(kind) = kind {
        params.push(("type", kind));
    }
    if params.is_empty() {
        return "/".to_string();
    }

    let query = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params)
        .finish();
    format!("/?{query}")
}

fn format_or_empty(value: OffsetDateTime, format: &[BorrowedFormatItem<'_>]) -> String {
    value.format(format).unwrap_or_default()
}

fn display_name(name: &str) -> String {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        "Untitled event".to_string()
    } else {
        trimmed.to_string()
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
