use crate::api::types::{ResultSet, SortMode};
use regex::Regex;
use std::sync::OnceLock;
use std::time::{Duration, Instant};

pub const PAGE_SIZE: u32 = 50;
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// A cancellable delayed value. Scheduling again replaces (and so restarts) the pending one.
#[derive(Debug)]
pub struct Debounce<T> {
    delay: Duration,
    pending: Option<(T, Instant)>,
}

impl<T> Debounce<T> {
    pub fn new(delay: Duration) -> Self {
        Debounce {
            delay,
            pending: None,
        }
    }

    pub fn schedule(&mut self, value: T, now: Instant) {
        self.pending = Some((value, now + self.delay));
    }

    pub fn cancel(&mut self) -> bool {
        self.pending.take().is_some()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Take the value if its settle period has elapsed by `now`.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        match &self.pending {
            Some((_, deadline)) if *deadline <= now => self.pending.take().map(|(v, _)| v),
            _ => None,
        }
    }
}

/// The parameters that decide which fetch is authoritative.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FetchKey {
    pub page: u32,
    pub search: Option<String>,
    pub after_date: Option<String>,
    pub sort: SortMode,
}

fn date_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\d{4}-(0[1-9]|1[0-2])-(0[1-9]|[12]\d|3[01])$").expect("valid date regex")
    })
}

pub struct EmailQueryState {
    page: u32,
    search_input: String,
    debounced_search: String,
    search_debounce: Debounce<String>,
    after_date: Option<String>,
    sort: SortMode,
    requested: Option<FetchKey>,
    results: ResultSet,
    results_sort: SortMode,
    loading: bool,
    error: Option<String>,
}

impl EmailQueryState {
    pub fn new(debounce: Duration) -> Self {
        let sort = SortMode::default();
        EmailQueryState {
            page: 1,
            search_input: String::new(),
            debounced_search: String::new(),
            search_debounce: Debounce::new(debounce),
            after_date: None,
            sort,
            requested: None,
            results: ResultSet::empty(sort),
            results_sort: sort,
            loading: true,
            error: None,
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn search_input(&self) -> &str {
        &self.search_input
    }

    pub fn debounced_search(&self) -> &str {
        &self.debounced_search
    }

    pub fn after_date(&self) -> Option<&str> {
        self.after_date.as_deref()
    }

    pub fn sort(&self) -> SortMode {
        self.sort
    }

    pub fn results(&self) -> &ResultSet {
        &self.results
    }

    /// Sort mode the displayed results were fetched with.
    pub fn results_sort(&self) -> SortMode {
        self.results_sort
    }

    pub fn total(&self) -> u64 {
        self.results.total
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn debounce_delay(&self) -> Duration {
        self.search_debounce.delay()
    }

    pub fn search_pending(&self) -> bool {
        self.search_debounce.is_pending()
    }

    pub fn fetch_key(&self) -> FetchKey {
        FetchKey {
            page: self.page,
            search: Some(self.debounced_search.clone()).filter(|s| !s.is_empty()),
            after_date: self.after_date.clone(),
            sort: self.sort,
        }
    }

    pub fn total_pages(&self) -> u32 {
        let pages = self.results.total.div_ceil(PAGE_SIZE as u64);
        pages.clamp(1, u32::MAX as u64) as u32
    }

    pub fn has_prev_page(&self) -> bool {
        self.page > 1
    }

    pub fn has_next_page(&self) -> bool {
        self.page < self.total_pages()
    }

    pub fn pagination_label(&self) -> String {
        let first = (self.page as u64 - 1) * PAGE_SIZE as u64 + 1;
        let last = (self.page as u64 * PAGE_SIZE as u64).min(self.results.total);
        format!(
            "Showing {} to {} of {} results",
            first, last, self.results.total
        )
    }

    /// Edit the raw search text. The fetch key only changes once the debounce settles.
    pub fn set_search_input(&mut self, text: impl Into<String>, now: Instant) {
        self.search_input = text.into();
        self.search_debounce.schedule(self.search_input.clone(), now);
    }

    pub fn push_search_char(&mut self, c: char, now: Instant) {
        let mut text = self.search_input.clone();
        text.push(c);
        self.set_search_input(text, now);
    }

    pub fn pop_search_char(&mut self, now: Instant) {
        let mut text = self.search_input.clone();
        if text.pop().is_some() {
            self.set_search_input(text, now);
        }
    }

    /// Drop any search edit that has not settled yet.
    pub fn cancel_pending_search(&mut self) {
        if self.search_debounce.cancel() {
            log_debug!("[Query] pending search edit canceled");
        }
    }

    /// Advance the debounce timer. Returns true if the debounced search changed.
    pub fn tick(&mut self, now: Instant) -> bool {
        match self.search_debounce.poll(now) {
            Some(value) if value != self.debounced_search => {
                log_debug!("[Query] search settled: {:?}", value);
                self.debounced_search = value;
                true
            }
            _ => false,
        }
    }

    /// Set or clear (empty input) the received-after filter. Expects `YYYY-MM-DD`.
    pub fn set_after_date(&mut self, input: &str) -> Result<(), String> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            self.after_date = None;
            return Ok(());
        }
        if !date_regex().is_match(trimmed) {
            return Err(format!(
                "Invalid date '{}': use ISO format (YYYY-MM-DD)",
                trimmed
            ));
        }
        self.after_date = Some(trimmed.to_string());
        Ok(())
    }

    pub fn set_sort(&mut self, sort: SortMode) {
        self.sort = sort;
    }

    pub fn cycle_sort(&mut self) {
        self.sort = self.sort.cycle();
    }

    pub fn set_page(&mut self, page: u32) {
        self.page = page.max(1);
    }

    pub fn next_page(&mut self) -> bool {
        if self.has_next_page() {
            self.page += 1;
            true
        } else {
            false
        }
    }

    pub fn prev_page(&mut self) -> bool {
        if self.has_prev_page() {
            self.page -= 1;
            true
        } else {
            false
        }
    }

    /// Return the key to fetch if it differs from the last one requested.
    pub fn poll_fetch(&mut self) -> Option<FetchKey> {
        let key = self.fetch_key();
        if self.requested.as_ref() == Some(&key) {
            return None;
        }
        self.requested = Some(key.clone());
        self.loading = true;
        Some(key)
    }

    /// Re-request the current key even if it was already fetched.
    pub fn refresh(&mut self) -> FetchKey {
        let key = self.fetch_key();
        self.requested = Some(key.clone());
        self.loading = true;
        key
    }

    /// Apply a completed fetch. Results for a key other than the current one are
    /// discarded. Returns true if state changed.
    pub fn apply_result(&mut self, key: &FetchKey, result: Result<ResultSet, String>) -> bool {
        if *key != self.fetch_key() {
            log_debug!("[Query] discarding stale result for {:?}", key);
            return false;
        }
        self.loading = false;
        match result {
            Ok(set) => {
                self.results = set;
                self.results_sort = key.sort;
                self.error = None;
            }
            Err(e) => {
                log_warn!("[Query] fetch failed for {:?}: {}", key, e);
                self.error = Some(format!("Failed to fetch emails: {}", e));
            }
        }
        true
    }
}
