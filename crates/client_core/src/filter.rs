use shared::domain::{Category, Word};

/// Category value that means "every category".
pub const ALL_CATEGORIES: &str = "all";

/// A record a [`crate::ListController`] can hold, filter and page through.
pub trait ListItem: Clone + Send + Sync + 'static {
    fn item_id(&self) -> &str;

    /// Category used by the category filter. Items without one never match a
    /// concrete category.
    fn item_category(&self) -> Option<&str>;

    /// Text fields the search term is matched against.
    fn search_fields(&self) -> Vec<&str>;
}

impl ListItem for Word {
    fn item_id(&self) -> &str {
        self.id.as_str()
    }

    fn item_category(&self) -> Option<&str> {
        Some(self.category.as_str())
    }

    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.japanese.as_str(), self.primary_meaning.as_str()];
        if let Some(reading) = &self.reading {
            fields.push(reading.as_str());
        }
        fields
    }
}

impl ListItem for Category {
    fn item_id(&self) -> &str {
        &self.name
    }

    fn item_category(&self) -> Option<&str> {
        Some(self.name.as_str())
    }

    fn search_fields(&self) -> Vec<&str> {
        vec![self.name.as_str()]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    pub category: Option<String>,
    pub search: Option<String>,
}

impl FilterState {
    pub fn new(category: Option<String>, search: Option<String>) -> Self {
        Self { category, search }.normalized()
    }

    pub fn category(category: impl Into<String>) -> Self {
        Self {
            category: Some(category.into()),
            search: None,
        }
        .normalized()
    }

    pub fn search(term: impl Into<String>) -> Self {
        Self {
            category: None,
            search: Some(term.into()),
        }
        .normalized()
    }

    /// Maps the "all" sentinel and blank values to `None`.
    pub fn normalized(self) -> Self {
        let category = self
            .category
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty() && value != ALL_CATEGORIES);
        let search = self
            .search
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
        Self { category, search }
    }

    pub fn is_empty(&self) -> bool {
        let normalized = self.clone().normalized();
        normalized.category.is_none() && normalized.search.is_none()
    }
}

/// Applies `filter` to `collection`, preserving order.
///
/// Category is an exact match; the search term is a case-insensitive
/// substring match against any of the item's search fields. Both must hold.
pub fn filter_collection<T: ListItem>(collection: &[T], filter: &FilterState) -> Vec<T> {
    let filter = filter.clone().normalized();
    let needle = filter.search.as_deref().map(str::to_lowercase);

    collection
        .iter()
        .filter(|item| match filter.category.as_deref() {
            Some(category) => item.item_category() == Some(category),
            None => true,
        })
        .filter(|item| match needle.as_deref() {
            Some(needle) => item
                .search_fields()
                .iter()
                .any(|field| field.to_lowercase().contains(needle)),
            None => true,
        })
        .cloned()
        .collect()
}

#[cfg(test)]
#[path = "tests/filter_tests.rs"]
mod tests;
