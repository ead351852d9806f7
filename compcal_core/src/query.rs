//! Builds the filter query for a scan of the competition store.
//!
//! User input never ends up in the expression itself: every value is bound to a
//! placeholder, and the key attribute is referenced through the `#key` name placeholder.

use std::collections::BTreeMap;

use crate::{config::TableConfig, region_filter::RegionFilter};

pub static KEY_PLACEHOLDER: &str = "#key";
pub static SUB_REGION_ATTRIBUTE: &str = "sub_region";
/// Stored sub-regions start with a space, e.g. `" New York"`.
///
/// The crawler splits `"City, Sub Region"` at the comma and keeps the space. Matching has to
/// keep doing this until the stored data is migrated.
pub static SUB_REGION_PREFIX: &str = " ";

static REGION_PLACEHOLDER_PREFIX: &str = "r";
static SUB_REGION_PLACEHOLDER_PREFIX: &str = "s";

/// `attribute IN(:p0,:p1,…)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InClause {
    attribute: String,
    placeholders: Vec<String>,
}

impl InClause {
    /// The attribute name or its `#` placeholder.
    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    pub fn placeholders(&self) -> &[String] {
        &self.placeholders
    }
}

/// A filter expression with its name and value bindings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterQuery {
    clauses: Vec<InClause>,
    names: Vec<(String, String)>,
    values: Vec<(String, String)>,
}

impl FilterQuery {
    /// Render the expression, e.g. `#key IN(:r0,:r1) AND sub_region IN(:s0)`.
    pub fn expression(&self) -> String {
        self.clauses
            .iter()
            .map(|clause| {
                format!(
                    "{} IN({})",
                    clause.attribute,
                    clause.placeholders.join(",")
                )
            })
            .collect::<Vec<String>>()
            .join(" AND ")
    }

    pub fn clauses(&self) -> &[InClause] {
        &self.clauses
    }

    /// `(placeholder, attribute name)` pairs in order of appearance.
    pub fn names(&self) -> &[(String, String)] {
        &self.names
    }

    /// `(placeholder, value)` pairs in order of appearance.
    pub fn values(&self) -> &[(String, String)] {
        &self.values
    }

    pub fn name(&self, placeholder: &str) -> Option<&str> {
        lookup(&self.names, placeholder)
    }

    pub fn value(&self, placeholder: &str) -> Option<&str> {
        lookup(&self.values, placeholder)
    }
}

fn lookup<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(placeholder, _)| placeholder == key)
        .map(|(_, value)| value.as_str())
}

/// Accumulates clauses and their bindings.
///
/// Value placeholders are `:<prefix><index>`, the index counting per prefix over all
/// clauses, so they are unique within a query.
#[derive(Debug, Default)]
pub struct QueryBuilder {
    query: FilterQuery,
    counters: BTreeMap<String, usize>,
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind an attribute name to a `#` placeholder.
    pub fn name(mut self, placeholder: &str, attribute: &str) -> Self {
        if self.query.name(placeholder).is_none() {
            self.query
                .names
                .push((String::from(placeholder), String::from(attribute)));
        }
        self
    }

    /// Add `attribute IN(…)` with one bound placeholder per value.
    ///
    /// Without values no clause is added.
    pub fn is_in<I>(mut self, attribute: &str, prefix: &str, values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let counter = self.counters.entry(String::from(prefix)).or_default();
        let mut placeholders = vec![];
        for value in values {
            let placeholder = format!(":{prefix}{counter}");
            *counter += 1;
            self.query.values.push((placeholder.clone(), value.into()));
            placeholders.push(placeholder);
        }
        if !placeholders.is_empty() {
            self.query.clauses.push(InClause {
                attribute: String::from(attribute),
                placeholders,
            });
        }
        self
    }

    pub fn build(self) -> FilterQuery {
        self.query
    }
}

/// Build the query selecting the competitions of a region filter.
pub fn build(filter: &RegionFilter, table: &TableConfig) -> FilterQuery {
    QueryBuilder::new()
        .name(KEY_PLACEHOLDER, &table.partition_key)
        .is_in(
            KEY_PLACEHOLDER,
            REGION_PLACEHOLDER_PREFIX,
            filter.regions().iter().cloned(),
        )
        .is_in(
            SUB_REGION_ATTRIBUTE,
            SUB_REGION_PLACEHOLDER_PREFIX,
            filter
                .subregions()
                .iter()
                .map(|subregion| format!("{SUB_REGION_PREFIX}{subregion}")),
        )
        .build()
}
