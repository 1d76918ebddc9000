//! HTTP surface: public pages, health check and the revalidation webhook.

mod middleware;
mod public;
mod webhook;

use std::sync::Arc;

pub use middleware::RequestContext;
pub use public::build_router;

use crate::application::{clock::Clock, events::EventService, revalidate::RevalidationService};
use crate::cache::CacheState;
use crate::config::SiteSettings;
use crate::presentation::views::LayoutChrome;

#[derive(Clone)]
pub struct HttpState {
    pub events: EventService,
    pub revalidation: RevalidationService,
    pub clock: Arc<dyn Clock>,
    pub site: SiteSettings,
    /// `None` disables the response cache layer.
    pub cache: Option<CacheState>,
}

impl HttpState {
    pub(crate) fn chrome(&self) -> LayoutChrome {
        LayoutChrome::new(self.site.title.clone(), self.site.public_url.clone())
    }
}
