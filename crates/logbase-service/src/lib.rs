use std::sync::Arc;

use axum::Router;
use reqwest::Client;

pub mod blog;
pub mod collector;
pub mod config;
pub mod db;
pub mod errors;
pub mod keywords;
pub mod leads;
pub mod models;
pub mod newsletter;
pub mod repositories;
pub mod routes;
pub mod schema;
pub mod shutdown;
pub mod storage;
pub mod validation;

use collector::FeedFetcher;
use config::Config;
use leads::SlackNotifier;
use newsletter::{MailerLiteClient, PreviewFetcher};
use repositories::{
    ItemRepository, SharedConnection, SqliteItemRepository, SqliteSubscriberRepository,
    SubscriberRepository,
};
use storage::{LocalObjectStore, ObjectStore};

const USER_AGENT: &str = concat!("logbase-service/", env!("CARGO_PKG_VERSION"));

/// Everything a handler or background job needs, behind one trait so tests
/// can swap implementations.
pub trait AppState: Clone + Send + Sync + 'static {
    type Items: ItemRepository;
    type Subscribers: SubscriberRepository;
    type Store: ObjectStore;

    fn items(&self) -> Self::Items;
    fn subscribers(&self) -> Self::Subscribers;
    fn store(&self) -> Self::Store;
    fn config(&self) -> &Config;
    fn fetcher(&self) -> &FeedFetcher;
    fn previews(&self) -> &PreviewFetcher;
    fn slack(&self) -> &SlackNotifier;
    /// `None` when `MAILERLITE_API_KEY` is not set.
    fn mailerlite(&self) -> Option<&MailerLiteClient>;
}

struct Services {
    config: Config,
    fetcher: FeedFetcher,
    previews: PreviewFetcher,
    slack: SlackNotifier,
    mailerlite: Option<MailerLiteClient>,
}

#[derive(Clone)]
pub struct DefaultAppState {
    items: SqliteItemRepository,
    subscribers: SqliteSubscriberRepository,
    store: LocalObjectStore,
    services: Arc<Services>,
}

impl DefaultAppState {
    pub fn new(db: SharedConnection, config: Config) -> Result<Self, reqwest::Error> {
        let client = Client::builder().user_agent(USER_AGENT).build()?;
        let store = LocalObjectStore::new(
            config.storage_root.clone(),
            config.storage_public_url.clone(),
        );
        let mailerlite = MailerLiteClient::from_config(client.clone(), &config.mailerlite);

        Ok(Self {
            items: SqliteItemRepository::new(db.clone()),
            subscribers: SqliteSubscriberRepository::new(db),
            store,
            services: Arc::new(Services {
                fetcher: FeedFetcher::new(client.clone()),
                previews: PreviewFetcher::new(USER_AGENT)?,
                slack: SlackNotifier::new(client),
                mailerlite,
                config,
            }),
        })
    }
}

impl AppState for DefaultAppState {
    type Items = SqliteItemRepository;
    type Subscribers = SqliteSubscriberRepository;
    type Store = LocalObjectStore;

    fn items(&self) -> Self::Items {
        self.items.clone()
    }

    fn subscribers(&self) -> Self::Subscribers {
        self.subscribers.clone()
    }

    fn store(&self) -> Self::Store {
        self.store.clone()
    }

    fn config(&self) -> &Config {
        &self.services.config
    }

    fn fetcher(&self) -> &FeedFetcher {
        &self.services.fetcher
    }

    fn previews(&self) -> &PreviewFetcher {
        &self.services.previews
    }

    fn slack(&self) -> &SlackNotifier {
        &self.services.slack
    }

    fn mailerlite(&self) -> Option<&MailerLiteClient> {
        self.services.mailerlite.as_ref()
    }
}

pub fn create_app<S: AppState>(state: S) -> Router {
    routes::create_router().with_state(state)
}
