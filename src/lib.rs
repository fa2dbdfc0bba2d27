pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod filter;
mod logging;
pub mod models;
pub mod registration;
pub mod scope;
pub mod store;
mod utils;

use std::sync::Arc;

use clap::Parser;
use serde::Serialize;

use catalog::{Catalog, EventDetails};
use cli::{Cli, Command};
use config::{AppConfig, ConfigStore};
use filter::CategoryFilter;
use models::{Event, EventId};
use registration::{Registration, RegistrationForm, RegistrationState, SUCCESS_MESSAGE};
use scope::ScreenScope;
use store::EventStore;

const LOAD_FAILED: &str = "Could not load events. Pull to refresh.";

pub struct AppState {
    store: Arc<dyn EventStore>,
}

impl AppState {
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self { store }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, String> {
        let store = store::open_store(config).map_err(|e| e.to_string())?;
        Ok(Self::new(store))
    }

    pub fn store(&self) -> Arc<dyn EventStore> {
        Arc::clone(&self.store)
    }
}

#[derive(Debug, Default, Clone)]
pub struct ListQuery {
    pub query: String,
    pub category: String,
    pub tags: Vec<String>,
    pub date: String,
}

#[derive(Debug, Serialize)]
pub struct EventListing {
    pub summary: String,
    pub events: Vec<Event>,
}

#[derive(Debug, Serialize)]
pub struct RegistrationReceipt {
    pub message: &'static str,
    pub hints: Vec<&'static str>,
    pub event: Event,
}

pub async fn list_events(state: &AppState, query: ListQuery) -> Result<EventListing, String> {
    let mut catalog = Catalog::new(state.store());
    catalog.refresh().await;
    if catalog.load_failed() {
        return Err(LOAD_FAILED.into());
    }
    catalog.set_query(query.query);
    catalog.set_date(query.date);
    for tag in &query.tags {
        if !catalog.filter.is_selected(tag) {
            catalog.toggle_tag(tag);
        }
    }
    catalog.category = CategoryFilter::parse(&query.category);

    let events = catalog.results();
    Ok(EventListing {
        summary: filter::result_summary(events.len()),
        events,
    })
}

pub async fn event_details(state: &AppState, id: String) -> Result<Event, String> {
    let store = state.store();
    let scope = ScreenScope::new();
    match catalog::load_details(store.as_ref(), &scope, &EventId::from(id)).await {
        Some(EventDetails::Found(event)) => Ok(event),
        Some(EventDetails::NotFound) | None => Err("Event not found.".into()),
    }
}

pub async fn register_for_event(
    state: &AppState,
    id: String,
    form: RegistrationForm,
) -> Result<RegistrationReceipt, String> {
    let mut registration = Registration::new(state.store(), id);
    registration.form = form;
    if matches!(registration.load().await, RegistrationState::NotFound) {
        return Err("Event not found.".into());
    }

    let hints = registration
        .form
        .hints()
        .into_iter()
        .map(|hint| hint.message())
        .collect();
    let event = registration
        .confirm()
        .await
        .map_err(|e| e.user_message().to_string())?;

    Ok(RegistrationReceipt {
        message: SUCCESS_MESSAGE,
        hints,
        event,
    })
}

pub async fn list_tags(state: &AppState) -> Result<Vec<String>, String> {
    let mut catalog = Catalog::new(state.store());
    catalog.refresh().await;
    if catalog.load_failed() {
        return Err(LOAD_FAILED.into());
    }
    Ok(catalog.tags())
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let config_store = ConfigStore::load();
    let mut config = config_store.read()?;
    config.apply_env()?;
    cli.apply_to(&mut config);
    tracing::debug!(?config, "effective configuration");

    if let Command::Config { save } = &cli.command {
        if *save {
            let saved = config_store.update(|stored| cli.apply_to(stored))?;
            tracing::info!(path = ?config_store.path(), "configuration saved");
            print_json(&saved)?;
        } else {
            print_json(&config)?;
        }
        return Ok(());
    }

    let state = AppState::from_config(&config).map_err(anyhow::Error::msg)?;
    match cli.command {
        Command::List {
            query,
            category,
            tags,
            date,
        } => {
            let listing = list_events(
                &state,
                ListQuery {
                    query: query.unwrap_or_default(),
                    category: category.unwrap_or_default(),
                    tags,
                    date: date.unwrap_or_default(),
                },
            )
            .await
            .map_err(anyhow::Error::msg)?;
            if cli.json {
                print_json(&listing)?;
            } else {
                println!("{}", listing.summary);
                for event in &listing.events {
                    print_card(event);
                }
            }
        }
        Command::Show { id } => {
            let event = event_details(&state, id).await.map_err(anyhow::Error::msg)?;
            if cli.json {
                print_json(&event)?;
            } else {
                print_details(&event);
            }
        }
        Command::Register {
            id,
            name,
            email,
            phone,
        } => {
            let form = RegistrationForm {
                full_name: name.unwrap_or_default(),
                email: email.unwrap_or_default(),
                phone: phone.unwrap_or_default(),
            };
            let receipt = register_for_event(&state, id, form)
                .await
                .map_err(anyhow::Error::msg)?;
            if cli.json {
                print_json(&receipt)?;
            } else {
                for hint in &receipt.hints {
                    eprintln!("note: {hint}");
                }
                println!("{}", receipt.message);
                println!("{}", receipt.event.spots_line());
            }
        }
        Command::Tags => {
            let tags = list_tags(&state).await.map_err(anyhow::Error::msg)?;
            if cli.json {
                print_json(&tags)?;
            } else {
                println!("{}", tags.join(", "));
            }
        }
        Command::Config { .. } => {}
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_card(event: &Event) {
    println!();
    println!("[{}] {}", event.id, event.title);
    println!("  {} • {}", event.time, event.location);
    println!("  {}", event.spots_line());
    if !event.tags.is_empty() {
        println!("  {}", event.preview_tags().join(" · "));
    }
}

fn print_details(event: &Event) {
    println!("{}", event.title);
    println!("⏱ {}", event.time);
    println!("📍 {}", event.location);
    println!("👥 {}", event.spots_line());
    if !event.date_label.is_empty() {
        println!("📅 {}", event.date_label);
    }
    println!();
    println!("Categories: {}", event.tags.join(", "));
    println!();
    println!("{}", event.description_or_default());
}
