//! Page slicing and page-control layout.

/// Number of page buttons shown around the current page.
pub const PAGE_WINDOW: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginated<'a, T> {
    pub items: &'a [T],
    pub total_pages: usize,
}

/// Returns the `page`-th (1-based) slice of `items` and the page count.
///
/// Out-of-range pages, including page 0, yield an empty slice with the real
/// page count. A zero `page_size` yields no pages.
pub fn paginate<T>(items: &[T], page: usize, page_size: usize) -> Paginated<'_, T> {
    if page_size == 0 {
        return Paginated {
            items: &[],
            total_pages: 0,
        };
    }

    let total_pages = items.len().div_ceil(page_size);
    let slice = page
        .checked_sub(1)
        .and_then(|index| index.checked_mul(page_size))
        .filter(|start| *start < items.len())
        .map(|start| {
            let end = start.saturating_add(page_size).min(items.len());
            &items[start..end]
        })
        .unwrap_or(&[]);

    Paginated {
        items: slice,
        total_pages,
    }
}

pub fn clamp_page(page: usize, total_pages: usize) -> usize {
    page.clamp(1, total_pages.max(1))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageEntry {
    Page { number: usize, current: bool },
    Gap,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PageControls {
    pub previous: Option<usize>,
    pub next: Option<usize>,
    pub entries: Vec<PageEntry>,
}

impl PageControls {
    pub fn page_numbers(&self) -> Vec<usize> {
        self.entries
            .iter()
            .filter_map(|entry| match entry {
                PageEntry::Page { number, .. } => Some(*number),
                PageEntry::Gap => None,
            })
            .collect()
    }
}

/// Lays out numbered page buttons: a window of at most [`PAGE_WINDOW`] pages
/// around `current`, with the first and last page pinned and gaps between.
pub fn page_controls(current: usize, total_pages: usize) -> PageControls {
    if total_pages == 0 {
        return PageControls::default();
    }

    let current = clamp_page(current, total_pages);
    let span = PAGE_WINDOW - 1;
    let mut start = current.saturating_sub(2).max(1);
    let end = (start + span).min(total_pages);
    if end - start < span {
        start = end.saturating_sub(span).max(1);
    }

    let page = |number: usize| PageEntry::Page {
        number,
        current: number == current,
    };

    let mut entries = Vec::with_capacity(PAGE_WINDOW + 4);
    if start > 1 {
        entries.push(page(1));
        if start > 2 {
            entries.push(PageEntry::Gap);
        }
    }
    entries.extend((start..=end).map(page));
    if end < total_pages {
        if end < total_pages - 1 {
            entries.push(PageEntry::Gap);
        }
        entries.push(page(total_pages));
    }

    PageControls {
        previous: (current > 1).then(|| current - 1),
        next: (current < total_pages).then(|| current + 1),
        entries,
    }
}

#[cfg(test)]
#[path = "tests/paginate_tests.rs"]
mod tests;
