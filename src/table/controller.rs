//! Sort/filter state and derived view for one result table

use crate::table::export::{export_csv, write_csv, CsvStyle};
use crate::table::filter::{filter_records, FilterState, StatusFilter};
use crate::table::record::{Record, TableSpec};
use crate::table::sort::{sort_records, SortConfig};
use crate::table::stats::{compute_stats, TableStats};
use crate::Result;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableState {
    /// No lookup has completed yet
    Empty,
    /// A record set is held (possibly with zero rows)
    Populated,
}

/// Owns one table's record set together with its sort and filter state.
///
/// The displayed view is always `filter(sort(records))` and is recomputed on
/// every change; stats only ever look at the full record set.
#[derive(Debug, Clone)]
pub struct TableController<R: Record> {
    records: Vec<R>,
    sort: SortConfig,
    filter: FilterState,
    displayed: Vec<R>,
    stats: TableStats,
    state: TableState,
}

impl<R: Record> Default for TableController<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Record> TableController<R> {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            sort: SortConfig::default(),
            filter: FilterState::default(),
            displayed: Vec::new(),
            stats: TableStats::default(),
            state: TableState::Empty,
        }
    }

    pub fn spec(&self) -> &'static TableSpec {
        R::table()
    }

    pub fn state(&self) -> TableState {
        self.state
    }

    /// Replace the record set wholesale; sort and filter return to defaults
    pub fn set_records(&mut self, records: Vec<R>) {
        self.records = records;
        self.sort = SortConfig::default();
        self.filter = FilterState::default();
        self.stats = compute_stats(&self.records, &R::table().status_rule);
        self.state = TableState::Populated;
        self.recompute_view();
    }

    /// Header click on `key`
    pub fn click_sort(&mut self, key: &str) {
        self.sort.toggle(key);
        self.recompute_view();
    }

    pub fn set_sort(&mut self, sort: SortConfig) {
        self.sort = sort;
        self.recompute_view();
    }

    pub fn set_search(&mut self, term: impl Into<String>) {
        self.filter.search_term = term.into();
        self.recompute_view();
    }

    /// Has no effect on the view of tables without a status axis
    pub fn set_status_filter(&mut self, status_filter: StatusFilter) {
        self.filter.status_filter = status_filter;
        self.recompute_view();
    }

    pub fn records(&self) -> &[R] {
        &self.records
    }

    pub fn displayed(&self) -> &[R] {
        &self.displayed
    }

    pub fn stats(&self) -> TableStats {
        self.stats
    }

    pub fn sort_config(&self) -> &SortConfig {
        &self.sort
    }

    pub fn filter_state(&self) -> &FilterState {
        &self.filter
    }

    /// CSV of the displayed view, `None` when it is empty
    pub fn export(&self, style: CsvStyle) -> Result<Option<Vec<u8>>> {
        export_csv(&self.displayed, R::table().csv_columns, style)
    }

    /// Write the displayed view to the table's CSV file in `dir`
    pub fn export_to(&self, dir: &Path, style: CsvStyle) -> Result<Option<PathBuf>> {
        write_csv(dir, &self.displayed, style)
    }

    fn recompute_view(&mut self) {
        let spec = R::table();
        let rule = spec.status_filter.then_some(&spec.status_rule);
        let sorted = sort_records(&self.records, &self.sort);
        self.displayed = filter_records(&sorted, &self.filter, rule);
    }
}
