use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    config::load_settings, CategoryListBackend, CategoryListController, CategoryMutation,
    DictionaryApi, FilterState, HttpDictionaryClient, ListController, ListEvent, PageControls,
    PageEntry, PageView, WordListBackend, WordListController, WordMutation,
};
use shared::domain::{Word, WordId, WordPatch};
use tokio::sync::broadcast;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "tuvung-admin", about = "Admin client for the vocabulary dictionary")]
struct Cli {
    /// Backend base url; overrides dictionary.toml and env.
    #[arg(long, global = true)]
    api_url: Option<String>,
    #[arg(long, global = true)]
    page_size: Option<usize>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List words, optionally filtered.
    Words {
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        search: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: usize,
    },
    /// List categories with their word counts.
    Categories {
        #[arg(long)]
        search: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: usize,
    },
    AddCategory {
        name: String,
    },
    /// Add words; one per line or comma-separated.
    AddWords {
        #[arg(long)]
        category: String,
        text: String,
    },
    UpdateWord {
        id: String,
        #[arg(long)]
        japanese: Option<String>,
        #[arg(long)]
        reading: Option<String>,
        #[arg(long)]
        meaning: Option<String>,
        #[arg(long)]
        notes: Option<String>,
        #[arg(long)]
        mnemonic: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        jlpt: Option<String>,
    },
    DeleteWord {
        id: String,
    },
    /// Show the words before and after a word.
    Neighbors {
        id: String,
        #[arg(long)]
        category: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
    let cli = Cli::parse();

    let mut settings = load_settings().context("failed to load settings")?;
    if let Some(api_url) = cli.api_url {
        settings.api_url = api_url;
    }
    if let Some(page_size) = cli.page_size.filter(|size| *size > 0) {
        settings.page_size = page_size;
    }
    let api: Arc<dyn DictionaryApi> = Arc::new(HttpDictionaryClient::from_settings(&settings)?);
    info!(api_url = %settings.api_url, page_size = settings.page_size, "using dictionary backend");

    match cli.command {
        Command::Words {
            category,
            search,
            page,
        } => {
            let words = word_controller(&api, settings.page_size);
            words.load().await?;
            words.set_filter(FilterState::new(category, search)).await?;
            words.set_page(page).await?;
            report_words(&words).await;
        }
        Command::Categories { search, page } => {
            let categories = category_controller(&api, settings.page_size);
            categories.load().await?;
            categories.set_filter(FilterState::new(None, search)).await?;
            categories.set_page(page).await?;
            report_categories(&categories).await;
        }
        Command::AddCategory { name } => {
            let categories = category_controller(&api, settings.page_size);
            let events = categories.subscribe_events();
            categories.load().await?;
            categories
                .request_mutation(CategoryMutation::Add { name: name.clone() })
                .await?;
            log_events(events);
            println!("added category \"{}\"", name.trim());
            report_categories(&categories).await;
        }
        Command::AddWords { category, text } => {
            let words = word_controller(&api, settings.page_size);
            let events = words.subscribe_events();
            words.load().await?;
            let outcome = words
                .request_mutation(WordMutation::Add {
                    raw_text: text,
                    category: category.clone(),
                })
                .await?;
            log_events(events);
            println!("{outcome:?}");
            words.set_filter(FilterState::category(category)).await?;
            report_words(&words).await;
        }
        Command::UpdateWord {
            id,
            japanese,
            reading,
            meaning,
            notes,
            mnemonic,
            category,
            jlpt,
        } => {
            let patch = WordPatch {
                japanese,
                reading,
                primary_meaning: meaning,
                additional_notes: notes,
                mnemonic,
                category,
                jlpt,
                ..WordPatch::default()
            };
            let words = word_controller(&api, settings.page_size);
            let events = words.subscribe_events();
            words.load().await?;
            let outcome = words
                .request_mutation(WordMutation::Update {
                    id: WordId::new(id.clone()),
                    patch,
                })
                .await?;
            log_events(events);
            println!("{outcome:?}");
            match words
                .collection()
                .await
                .into_iter()
                .find(|word| word.id.as_str() == id)
            {
                Some(word) => print_word_line(&word),
                None => warn!(%id, "updated word missing after reload"),
            }
        }
        Command::DeleteWord { id } => {
            let words = word_controller(&api, settings.page_size);
            let events = words.subscribe_events();
            words.load().await?;
            let outcome = words
                .request_mutation(WordMutation::Delete {
                    id: WordId::new(id),
                })
                .await?;
            log_events(events);
            println!("{outcome:?}");
            report_words(&words).await;
        }
        Command::Neighbors { id, category } => {
            let words = word_controller(&api, settings.page_size);
            words.load().await?;
            words.set_filter(FilterState::new(category, None)).await?;
            let neighbors = words.neighbors(&id).await;
            for (label, word) in [("previous", neighbors.previous), ("next", neighbors.next)] {
                match word {
                    Some(word) => {
                        print!("{label:>8}: ");
                        print_word_line(&word);
                    }
                    None => println!("{label:>8}: -"),
                }
            }
        }
    }

    Ok(())
}

fn word_controller(api: &Arc<dyn DictionaryApi>, page_size: usize) -> WordListController {
    ListController::new(Arc::new(WordListBackend::new(Arc::clone(api))), page_size)
}

fn category_controller(api: &Arc<dyn DictionaryApi>, page_size: usize) -> CategoryListController {
    ListController::new(
        Arc::new(CategoryListBackend::new(Arc::clone(api)).with_counts()),
        page_size,
    )
}

fn log_events(mut events: broadcast::Receiver<ListEvent>) {
    while let Ok(event) = events.try_recv() {
        match event {
            ListEvent::LoadFailed { error, .. } | ListEvent::MutationFailed { error, .. } => {
                warn!(%error, "list operation failed")
            }
            other => info!(event = ?other, "list event"),
        }
    }
}

fn print_word_line(word: &Word) {
    let reading = word.reading.as_deref().unwrap_or("-");
    let jlpt = word.jlpt.as_deref().unwrap_or("-");
    println!(
        "{:>6}  {}  [{}]  {}  ({}, {})",
        word.id, word.japanese, reading, word.primary_meaning, word.category, jlpt
    );
    if let Some(notes) = &word.additional_notes {
        println!("        notes: {notes}");
    }
}

async fn report_words(words: &WordListController) {
    let view = words.page().await;
    if view.items.is_empty() {
        println!("no words");
    }
    for word in &view.items {
        print_word_line(word);
    }
    print_footer(&view, words.page_size(), &words.page_controls().await);
    log_filter(&words.filter().await);
}

async fn report_categories(categories: &CategoryListController) {
    let view = categories.page().await;
    if view.items.is_empty() {
        println!("no categories");
    }
    for category in &view.items {
        match category.word_count {
            Some(count) => println!("{}  ({count} words)", category.name),
            None => println!("{}", category.name),
        }
    }
    print_footer(&view, categories.page_size(), &categories.page_controls().await);
    log_filter(&categories.filter().await);
}

fn log_filter(filter: &FilterState) {
    if !filter.is_empty() {
        info!(category = ?filter.category, search = ?filter.search, "filter applied");
    }
}

fn print_footer<T>(view: &PageView<T>, page_size: usize, controls: &PageControls) {
    let buttons: Vec<String> = controls
        .entries
        .iter()
        .map(|entry| match entry {
            PageEntry::Page {
                number,
                current: true,
            } => format!("[{number}]"),
            PageEntry::Page { number, .. } => number.to_string(),
            PageEntry::Gap => "...".to_string(),
        })
        .collect();
    println!(
        "page {}/{} ({} items, {page_size} per page)  {}{}{}",
        view.page_number,
        view.total_pages,
        view.total_items,
        if controls.previous.is_some() { "< " } else { "" },
        buttons.join(" "),
        if controls.next.is_some() { " >" } else { "" },
    );
}
