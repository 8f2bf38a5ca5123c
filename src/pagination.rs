use serde::Serialize;

/// One window of a larger sorted result set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub limit: usize,
    /// Size of the full result set, independent of the window.
    pub total: usize,
}

/// Page request after defaults and bounds have been applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: usize,
    pub limit: usize,
}

impl PageRequest {
    /// Normalize caller input: pages start at 1, a missing or zero limit
    /// falls back to `default_limit`, and limits are capped at `max_limit`.
    pub fn new(
        page: Option<usize>,
        limit: Option<usize>,
        default_limit: usize,
        max_limit: usize,
    ) -> Self {
        let page = page.unwrap_or(1).max(1);
        let limit = match limit {
            Some(0) | None => default_limit,
            Some(n) => n,
        }
        .clamp(1, max_limit.max(1));

        Self { page, limit }
    }

    pub fn offset(&self) -> usize {
        (self.page - 1).saturating_mul(self.limit)
    }
}

/// Slice `items` (already sorted) to the requested window.
pub fn paginate<T>(items: Vec<T>, request: PageRequest) -> Page<T> {
    let total = items.len();
    let items = items
        .into_iter()
        .skip(request.offset())
        .take(request.limit)
        .collect();

    Page {
        items,
        page: request.page,
        limit: request.limit,
        total,
    }
}
