//! Adapters from [`DictionaryApi`] to the [`ListBackend`] seam used by
//! [`crate::ListController`].

use std::{collections::BTreeMap, fmt, sync::Arc};

use anyhow::Result;
use async_trait::async_trait;
use shared::{
    domain::{Category, Word, WordId, WordPatch},
    error::{ApiException, ErrorCode},
};

use crate::{
    api::DictionaryApi,
    error::{ListError, MutationKind},
    filter::ListItem,
};

/// A mutation request a list backend knows how to execute.
pub trait ListMutation: fmt::Debug + Send + Sync {
    fn kind(&self) -> MutationKind;

    /// Item targeted by an update or delete.
    fn target_id(&self) -> Option<&str>;

    /// Rejects obviously bad input before anything reaches the network.
    fn validate(&self) -> Result<(), ListError>;
}

/// What the backend returned for a successful mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationAck<T> {
    pub returned: Vec<T>,
}

impl<T> MutationAck<T> {
    pub fn empty() -> Self {
        Self {
            returned: Vec::new(),
        }
    }
}

#[async_trait]
pub trait ListBackend: Send + Sync {
    type Item: ListItem;
    type Mutation: ListMutation;

    async fn fetch(&self) -> Result<Vec<Self::Item>>;

    /// Runs `mutation`. A backend that reports failure must return `Err`.
    async fn mutate(&self, mutation: &Self::Mutation) -> Result<MutationAck<Self::Item>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WordMutation {
    Add { raw_text: String, category: String },
    Update { id: WordId, patch: WordPatch },
    Delete { id: WordId },
}

impl ListMutation for WordMutation {
    fn kind(&self) -> MutationKind {
        match self {
            Self::Add { .. } => MutationKind::Add,
            Self::Update { .. } => MutationKind::Update,
            Self::Delete { .. } => MutationKind::Delete,
        }
    }

    fn target_id(&self) -> Option<&str> {
        match self {
            Self::Add { .. } => None,
            Self::Update { id, .. } | Self::Delete { id } => Some(id.as_str()),
        }
    }

    fn validate(&self) -> Result<(), ListError> {
        match self {
            Self::Add { raw_text, category } => {
                if raw_text.trim().is_empty() {
                    return Err(ListError::validation("word text must not be empty"));
                }
                if category.trim().is_empty() {
                    return Err(ListError::validation("a category must be selected"));
                }
            }
            Self::Update { id, patch } => {
                if id.as_str().trim().is_empty() {
                    return Err(ListError::validation("word id must not be empty"));
                }
                if patch.is_empty() {
                    return Err(ListError::validation("update contains no changes"));
                }
                if patch
                    .japanese
                    .as_deref()
                    .is_some_and(|value| value.trim().is_empty())
                {
                    return Err(ListError::validation("word text must not be empty"));
                }
                if patch
                    .primary_meaning
                    .as_deref()
                    .is_some_and(|value| value.trim().is_empty())
                {
                    return Err(ListError::validation("primary meaning must not be empty"));
                }
                if patch.additional_notes.is_some() && patch.primary_meaning.is_none() {
                    return Err(ListError::validation(
                        "additional notes require the primary meaning",
                    ));
                }
            }
            Self::Delete { id } => {
                if id.as_str().trim().is_empty() {
                    return Err(ListError::validation("word id must not be empty"));
                }
            }
        }
        Ok(())
    }
}

/// Words, optionally scoped to a single category.
pub struct WordListBackend {
    api: Arc<dyn DictionaryApi>,
    category: Option<String>,
}

impl WordListBackend {
    pub fn new(api: Arc<dyn DictionaryApi>) -> Self {
        Self {
            api,
            category: None,
        }
    }

    pub fn for_category(api: Arc<dyn DictionaryApi>, category: impl Into<String>) -> Self {
        Self {
            api,
            category: Some(category.into()),
        }
    }
}

#[async_trait]
impl ListBackend for WordListBackend {
    type Item = Word;
    type Mutation = WordMutation;

    async fn fetch(&self) -> Result<Vec<Word>> {
        match &self.category {
            Some(category) => self.api.fetch_words_by_category(category).await,
            None => self.api.fetch_words().await,
        }
    }

    async fn mutate(&self, mutation: &WordMutation) -> Result<MutationAck<Word>> {
        match mutation {
            WordMutation::Add { raw_text, category } => {
                let returned = self.api.add_words(raw_text, category.trim()).await?;
                Ok(MutationAck { returned })
            }
            WordMutation::Update { id, patch } => {
                if !self.api.update_word(id, patch).await? {
                    return Err(rejected(format!("backend rejected update of word {id}")));
                }
                Ok(MutationAck::empty())
            }
            WordMutation::Delete { id } => {
                if !self.api.delete_word(id).await? {
                    return Err(rejected(format!("backend rejected delete of word {id}")));
                }
                Ok(MutationAck::empty())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryMutation {
    Add { name: String },
}

impl ListMutation for CategoryMutation {
    fn kind(&self) -> MutationKind {
        MutationKind::Add
    }

    fn target_id(&self) -> Option<&str> {
        None
    }

    fn validate(&self) -> Result<(), ListError> {
        match self {
            Self::Add { name } if name.trim().is_empty() => {
                Err(ListError::validation("category name must not be empty"))
            }
            Self::Add { .. } => Ok(()),
        }
    }
}

/// Category names, with per-category word counts when `with_counts` is set.
pub struct CategoryListBackend {
    api: Arc<dyn DictionaryApi>,
    with_counts: bool,
}

impl CategoryListBackend {
    pub fn new(api: Arc<dyn DictionaryApi>) -> Self {
        Self {
            api,
            with_counts: false,
        }
    }

    pub fn with_counts(mut self) -> Self {
        self.with_counts = true;
        self
    }
}

#[async_trait]
impl ListBackend for CategoryListBackend {
    type Item = Category;
    type Mutation = CategoryMutation;

    async fn fetch(&self) -> Result<Vec<Category>> {
        let names = self.api.fetch_categories().await?;
        if !self.with_counts {
            return Ok(names.into_iter().map(Category::new).collect());
        }

        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for word in self.api.fetch_words().await? {
            *counts.entry(word.category).or_default() += 1;
        }
        Ok(names
            .into_iter()
            .map(|name| Category {
                word_count: Some(counts.get(&name).copied().unwrap_or(0)),
                name,
            })
            .collect())
    }

    async fn mutate(&self, mutation: &CategoryMutation) -> Result<MutationAck<Category>> {
        match mutation {
            CategoryMutation::Add { name } => {
                let name = name.trim();
                if !self.api.add_category(name).await? {
                    return Err(rejected(format!("backend rejected category {name}")));
                }
                Ok(MutationAck {
                    returned: vec![Category::new(name)],
                })
            }
        }
    }
}

fn rejected(message: String) -> anyhow::Error {
    ApiException::new(ErrorCode::Rejected, message).into()
}

#[cfg(test)]
#[path = "tests/backend_tests.rs"]
mod tests;
