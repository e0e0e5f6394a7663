//! Client-side rendering of `/search` results: a page view model, a search
//! orchestrator, a detail renderer and theme/font preferences.

pub mod config;
pub mod detail;
pub mod model;
pub mod navigator;
pub mod page;
pub mod prefs;
pub mod search;
pub mod slug;
pub mod store;
pub mod transport;

#[cfg(feature = "web")]
pub mod web;

pub use config::ClientConfig;
pub use detail::{DetailRenderer, DetailView, PendingReveal, detail_id};
pub use model::{Article, Section, SectionOrigin};
pub use navigator::{NavigationError, Navigator, ScrollPosition, Viewport};
pub use page::{ElementId, Key, KeyDispatch, Page, ResultEntry, ResultsArea};
pub use prefs::{FontSize, PreferenceStore, Theme};
pub use search::{SearchError, SearchOrchestrator, SearchRequest, open_article, select_section};
pub use slug::slugify;
pub use store::{JsonFileStore, KeyValueStore, MemoryStore, StoreError};
pub use transport::{HttpTransport, RawResponse, SearchTransport, TransportError};
