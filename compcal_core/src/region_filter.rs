//! Parses the requested regions out of a calendar path.
//!
//! The path looks like `/calendar/DE+US/Texas`: selectors are separated by `/` or `+`,
//! two character selectors are regions, everything else is a sub-region.

use std::sync::LazyLock;

use regex::Regex;

pub static PATH_PREFIX: &str = "/calendar";
pub static DEFAULT_REGION: &str = "DE";

static SEPARATOR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[/+]").unwrap());

/// The regions and sub-regions requested in a single calendar request.
///
/// Both lists keep the order of the path and contain no duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegionFilter {
    regions: Vec<String>,
    subregions: Vec<String>,
}

impl RegionFilter {
    /// Build the filter from a request path.
    ///
    /// Region codes are not validated. Without any region selector the filter falls back to
    /// [`DEFAULT_REGION`].
    pub fn from_path(path: Option<&str>) -> Self {
        let mut filter = Self::default();
        if let Some(path) = path {
            for selector in SEPARATOR
                .split(strip_prefix(path))
                .filter(|selector| !selector.is_empty())
            {
                filter.push(selector);
            }
        }
        if filter.regions.is_empty() {
            filter.regions.push(String::from(DEFAULT_REGION));
        }
        filter
    }

    fn push(&mut self, selector: &str) {
        // Counted in Unicode scalar values, not UTF-16 units.
        let selectors = if selector.chars().count() == 2 {
            &mut self.regions
        } else {
            &mut self.subregions
        };
        if !selectors.iter().any(|known| known == selector) {
            selectors.push(String::from(selector));
        }
    }

    pub fn regions(&self) -> &[String] {
        &self.regions
    }

    pub fn subregions(&self) -> &[String] {
        &self.subregions
    }

    /// The calendar name, which shows what was requested.
    pub fn display_name(&self) -> String {
        format!(
            "Competition Calendar for {},{}",
            self.regions.join(","),
            self.subregions.join(",")
        )
    }
}

fn strip_prefix(path: &str) -> &str {
    match path.strip_prefix(PATH_PREFIX) {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
        _ => path,
    }
}
