//! Client-side core of the vocabulary dictionary: list controllers over the
//! dictionary REST backend.

pub mod api;
pub mod backend;
pub mod config;
pub mod controller;
pub mod error;
pub mod filter;
pub mod paginate;

pub use api::{DictionaryApi, HttpDictionaryClient, MissingDictionaryApi};
pub use backend::{
    CategoryListBackend, CategoryMutation, ListBackend, ListMutation, MutationAck,
    WordListBackend, WordMutation,
};
pub use config::{load_settings, ClientSettings};
pub use controller::{
    reconcile_policy, FetchTicket, ListController, ListEvent, LoadOutcome, LoadStatus,
    MutationOutcome, Neighbors, PageView, ReconcilePolicy,
};
pub use error::{ListError, MutationKind};
pub use filter::{filter_collection, FilterState, ListItem, ALL_CATEGORIES};
pub use paginate::{clamp_page, page_controls, paginate, PageControls, PageEntry, Paginated};

pub type WordListController = ListController<WordListBackend>;
pub type CategoryListController = ListController<CategoryListBackend>;
