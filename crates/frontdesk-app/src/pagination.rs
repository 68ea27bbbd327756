// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Offset/limit pagination as an explicit state value.
//!
//! Every transition is a plain method: callers get a [`PageRequest`] back when
//! a read should be issued and feed the response into [`PageState::complete`].
//! Requests carry a generation number so a late response for an older request
//! is dropped instead of overwriting a newer page.

use anyhow::{Result, bail};

use crate::model::Record;

pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const MAX_PAGE_SIZE: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub generation: u64,
    pub offset: usize,
    pub limit: usize,
}

/// What the backend produced for one [`PageRequest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome<T> {
    Loaded(Vec<T>),
    NotFound,
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageCompletion {
    /// The page was replaced with the response.
    Applied,
    /// A forward page came back empty; the current page stays displayed.
    EndReached,
    /// The request failed; the current page stays displayed.
    Failed,
    /// The response belongs to a superseded request and was ignored.
    Stale,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageState<T> {
    offset: usize,
    limit: usize,
    items: Vec<T>,
    has_more: bool,
    loading: bool,
    error: Option<String>,
    generation: u64,
    pending: Option<PageRequest>,
}

impl<T> PageState<T> {
    pub fn new(limit: usize) -> Result<Self> {
        if limit == 0 {
            bail!("page size must be positive");
        }
        if limit > MAX_PAGE_SIZE {
            bail!("page size {limit} exceeds the maximum of {MAX_PAGE_SIZE}");
        }
        Ok(Self {
            offset: 0,
            limit,
            items: Vec::new(),
            has_more: false,
            loading: false,
            error: None,
            generation: 0,
            pending: None,
        })
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn pending(&self) -> Option<PageRequest> {
        self.pending
    }

    pub fn page_number(&self) -> usize {
        self.offset / self.limit + 1
    }

    pub fn can_next(&self) -> bool {
        self.has_more && !self.loading
    }

    pub fn can_previous(&self) -> bool {
        self.offset > 0
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    /// Human range of the displayed rows, e.g. `21-25`.
    pub fn range_label(&self) -> String {
        if self.items.is_empty() {
            return "0".to_owned();
        }
        format!("{}-{}", self.offset + 1, self.offset + self.items.len())
    }

    /// Starts a read for the page containing `offset`.
    pub fn load_page(&mut self, offset: usize) -> PageRequest {
        let offset = offset - offset % self.limit;
        self.generation = self.generation.wrapping_add(1);
        self.loading = true;
        let request = PageRequest {
            generation: self.generation,
            offset,
            limit: self.limit,
        };
        self.pending = Some(request);
        request
    }

    pub fn next(&mut self) -> Option<PageRequest> {
        if !self.can_next() {
            return None;
        }
        Some(self.load_page(self.offset + self.limit))
    }

    pub fn previous(&mut self) -> Option<PageRequest> {
        if !self.can_previous() {
            return None;
        }
        Some(self.load_page(self.offset.saturating_sub(self.limit)))
    }

    pub fn reload(&mut self) -> PageRequest {
        self.load_page(self.offset)
    }

    /// Back to the first page. Used after a create, where the new row's
    /// position in server order is unknown.
    pub fn reset(&mut self) -> PageRequest {
        self.load_page(0)
    }

    /// Drops the displayed page and invalidates any load in flight.
    pub fn clear(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        self.offset = 0;
        self.items.clear();
        self.has_more = false;
        self.loading = false;
        self.error = None;
        self.pending = None;
    }

    pub fn complete(&mut self, request: PageRequest, outcome: PageOutcome<T>) -> PageCompletion {
        if request.generation != self.generation {
            return PageCompletion::Stale;
        }
        self.loading = false;
        self.pending = None;

        let items = match outcome {
            PageOutcome::Loaded(items) => items,
            PageOutcome::NotFound => Vec::new(),
            PageOutcome::Failed(message) => {
                self.error = Some(message);
                return PageCompletion::Failed;
            }
        };
        self.error = None;

        if items.is_empty() && request.offset > self.offset {
            self.has_more = false;
            return PageCompletion::EndReached;
        }

        self.has_more = items.len() == self.limit;
        self.offset = request.offset;
        self.items = items;
        PageCompletion::Applied
    }
}

impl<T: Record> PageState<T> {
    pub fn find(&self, key: &T::Key) -> Option<&T> {
        self.items.iter().find(|item| item.key() == *key)
    }

    /// Applies `patch` to the displayed row with `key`. Returns false when the
    /// row is not on the current page.
    pub fn patch<F>(&mut self, key: &T::Key, patch: F) -> bool
    where
        F: FnOnce(&mut T),
    {
        match self.items.iter_mut().find(|item| item.key() == *key) {
            Some(item) => {
                patch(item);
                true
            }
            None => false,
        }
    }
}
