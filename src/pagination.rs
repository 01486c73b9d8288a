/// Paginated listing pipeline
///
/// Every listing endpoint goes through the same four stages in the same
/// order: filter, sort, skip, limit. The total count re-runs the filter
/// stage alone, so `total_count` always describes the same predicate as
/// the page it accompanies.
use crate::{
    config::PaginationConfig,
    error::{HubError, HubResult},
};
use serde::Serialize;
use sqlx::{sqlite::SqliteRow, FromRow, QueryBuilder, Sqlite, SqliteConnection, SqlitePool};

/// Requested page, 1-based
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl PageRequest {
    pub fn new(page: u32, page_size: u32, config: &PaginationConfig) -> HubResult<Self> {
        if page == 0 {
            return Err(HubError::Validation("page must be a positive integer".to_string()));
        }
        if page_size == 0 {
            return Err(HubError::Validation("limit must be a positive integer".to_string()));
        }
        if page_size > config.max_page_size {
            return Err(HubError::Validation(format!(
                "limit cannot exceed {}",
                config.max_page_size
            )));
        }
        Ok(Self { page, page_size })
    }

    /// Coerce raw query-string values
    ///
    /// Defaults apply only when a value is absent. Anything present must
    /// parse as a positive integer.
    pub fn from_raw(
        page: Option<&str>,
        limit: Option<&str>,
        config: &PaginationConfig,
    ) -> HubResult<Self> {
        let page = match page {
            None => 1,
            Some(raw) => parse_positive("page", raw)?,
        };
        let page_size = match limit {
            None => config.default_page_size,
            Some(raw) => parse_positive("limit", raw)?,
        };
        Self::new(page, page_size, config)
    }

    pub fn offset(&self) -> i64 {
        (i64::from(self.page) - 1) * i64::from(self.page_size)
    }
}

fn parse_positive(name: &str, raw: &str) -> HubResult<u32> {
    match raw.trim().parse::<i64>() {
        Ok(value) if value > 0 => u32::try_from(value)
            .map_err(|_| HubError::Validation(format!("{} is too large", name))),
        _ => Err(HubError::Validation(format!(
            "{} must be a positive integer",
            name
        ))),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn parse(raw: &str) -> HubResult<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            other => Err(HubError::Validation(format!(
                "sortType must be asc or desc, got {:?}",
                other
            ))),
        }
    }

    fn as_sql(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// One predicate of the filter stage
///
/// Column names are always compile-time constants; only values are bound.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(&'static str, String),
    ContainsIgnoreCase(&'static str, String),
}

/// Static description of a listable collection
#[derive(Debug, Clone, Copy)]
pub struct Listing {
    /// Selected columns, qualified when `source` joins
    pub columns: &'static str,
    /// FROM clause, optionally with joins
    pub source: &'static str,
    /// Public sort keys and the column each maps to
    pub sortable: &'static [(&'static str, &'static str)],
    pub default_sort: (&'static str, SortDirection),
    /// Secondary order key so equal sort values page deterministically
    pub tiebreak: &'static str,
}

/// Resolved sort stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sort {
    pub column: &'static str,
    pub direction: SortDirection,
}

impl Listing {
    /// Resolve `sortBy` / `sortType`, falling back to the listing defaults
    pub fn sort(&self, sort_by: Option<&str>, sort_type: Option<&str>) -> HubResult<Sort> {
        let key = sort_by.map(str::trim).filter(|s| !s.is_empty());
        let key = key.unwrap_or(self.default_sort.0);

        let column = self
            .sortable
            .iter()
            .find(|(name, _)| *name == key)
            .map(|(_, column)| *column)
            .ok_or_else(|| HubError::Validation(format!("cannot sort by {:?}", key)))?;

        let direction = match sort_type.map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => SortDirection::parse(raw)?,
            None => self.default_sort.1,
        };

        Ok(Sort { column, direction })
    }
}

/// A fully specified listing request
#[derive(Debug, Clone)]
pub struct ListQuery {
    pub filters: Vec<Filter>,
    pub sort: Sort,
    pub page: PageRequest,
}

impl ListQuery {
    pub fn new(sort: Sort, page: PageRequest) -> Self {
        Self {
            filters: Vec::new(),
            sort,
            page,
        }
    }

    /// Add an exact-match predicate; `None` leaves the stage untouched
    pub fn eq(mut self, column: &'static str, value: Option<String>) -> Self {
        if let Some(value) = value {
            self.filters.push(Filter::Eq(column, value));
        }
        self
    }

    /// Add a case-insensitive substring predicate; blank input is treated as absent
    pub fn contains(mut self, column: &'static str, value: Option<String>) -> Self {
        if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
            self.filters.push(Filter::ContainsIgnoreCase(column, value));
        }
        self
    }
}

/// One page of results with its metadata
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_count: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total_count: u64, request: PageRequest) -> Self {
        Self {
            items,
            total_count,
            page: request.page,
            page_size: request.page_size,
            total_pages: total_pages(total_count, request.page_size),
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total_count: self.total_count,
            page: self.page,
            page_size: self.page_size,
            total_pages: self.total_pages,
        }
    }
}

/// `ceil(total / page_size)`, zero for an empty collection
pub fn total_pages(total_count: u64, page_size: u32) -> u64 {
    if page_size == 0 {
        return 0;
    }
    total_count.div_ceil(u64::from(page_size))
}

fn push_filters(builder: &mut QueryBuilder<'_, Sqlite>, filters: &[Filter]) {
    for (i, filter) in filters.iter().enumerate() {
        builder.push(if i == 0 { " WHERE " } else { " AND " });
        match filter {
            Filter::Eq(column, value) => {
                builder.push(*column).push(" = ").push_bind(value.clone());
            }
            Filter::ContainsIgnoreCase(column, value) => {
                builder
                    .push("instr(lower(")
                    .push(*column)
                    .push("), lower(")
                    .push_bind(value.clone())
                    .push(")) > 0");
            }
        }
    }
}

/// Count rows matching the filter stage alone
pub async fn count(
    conn: &mut SqliteConnection,
    listing: &Listing,
    filters: &[Filter],
) -> HubResult<u64> {
    let mut builder = QueryBuilder::<Sqlite>::new(format!("SELECT COUNT(*) FROM {}", listing.source));
    push_filters(&mut builder, filters);

    let total: i64 = builder.build_query_scalar().fetch_one(&mut *conn).await?;
    Ok(u64::try_from(total).unwrap_or(0))
}

/// Run the full filter, sort, skip, limit pipeline
pub async fn fetch_page<T>(pool: &SqlitePool, listing: &Listing, query: &ListQuery) -> HubResult<Page<T>>
where
    T: for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
{
    let mut builder =
        QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM {}", listing.columns, listing.source));
    push_filters(&mut builder, &query.filters);

    let direction = query.sort.direction.as_sql();
    builder.push(format!(
        " ORDER BY {} {}, {} {}",
        query.sort.column, direction, listing.tiebreak, direction
    ));
    builder
        .push(" LIMIT ")
        .push_bind(i64::from(query.page.page_size))
        .push(" OFFSET ")
        .push_bind(query.page.offset());

    // Page and count share one read snapshot so the totals describe the items
    let mut tx = pool.begin().await?;
    let items: Vec<T> = builder.build_query_as().fetch_all(&mut *tx).await?;
    let total_count = count(&mut tx, listing, &query.filters).await?;
    tx.commit().await?;

    tracing::debug!(
        source = listing.source,
        page = query.page.page,
        returned = items.len(),
        total_count,
        "listing fetched"
    );

    Ok(Page::new(items, total_count, query.page))
}
