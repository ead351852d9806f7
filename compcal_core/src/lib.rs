//! This crate turns a region selector path into an iCalendar feed of upcoming competitions.
//!
//! The competitions are read from a DynamoDB table filled by a separate crawler.
//! Every competition yields two events: the competition itself and the opening of its
//! registration, the latter with a display reminder 15 minutes ahead.

pub use ical;

pub mod calendar;
pub mod config;
pub mod error;
pub mod query;
pub mod record;
pub mod region_filter;
pub mod store;

use ical::generator::IcalCalendar;
use tracing::{debug, info};

pub use crate::{
    config::Config,
    error::{Error, Result},
    region_filter::RegionFilter,
    store::CompetitionStore,
};

/// Get the competition calendar for a selector path like `/calendar/DE+US/Texas`.
///
/// Without a path the calendar covers the default region.
pub async fn get<S>(store: &S, config: &Config, path: Option<&str>) -> Result<IcalCalendar>
where
    S: CompetitionStore + ?Sized,
{
    let filter = RegionFilter::from_path(path);
    info!(
        regions = ?filter.regions(),
        subregions = ?filter.subregions(),
        "fetching competitions"
    );
    let query = query::build(&filter, &config.table);
    debug!(expression = %query.expression(), "built filter query");
    let records = record::normalize(store.scan(&query).await?);
    let calendar = calendar::get_calendar(&config.calendar, &filter.display_name(), &records)?;
    info!(
        records = records.len(),
        events = calendar.events.len(),
        "rendered calendar"
    );
    Ok(calendar)
}
