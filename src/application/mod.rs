//! Application services: page data fetching and webhook revalidation.

pub mod clock;
pub mod error;
pub mod events;
pub mod repos;
pub mod revalidate;
