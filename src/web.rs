use crate::detail::{DetailView, detail_id};
use crate::navigator::Viewport;
use crate::page::{Page, ResultsArea};
use crate::prefs::{PreferenceStore, Theme, current_theme};
use crate::search::{SearchOrchestrator, encode_component, select_section};
use crate::store::{KeyValueStore, StoreError};
use crate::transport::{HttpTransport, SearchTransport};
use askama::Template;
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
};
use cookie::{Cookie, SameSite};
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::compression::CompressionLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{debug, info};

type SharedState<T> = Arc<AppState<T>>;

pub struct AppState<T> {
    pub search: SearchOrchestrator<T>,
    pub base_url: String,
}

#[derive(Debug, Clone, Copy)]
struct Chrome {
    body_class: &'static str,
    main_class: &'static str,
    card_class: &'static str,
    eyebrow_class: &'static str,
    headline_class: &'static str,
    lede_class: &'static str,
    button_class: &'static str,
    section_class: &'static str,
    section_match_class: &'static str,
}

impl Chrome {
    fn new(theme: Theme) -> Self {
        match theme {
            Theme::Dark => Self {
                body_class: "bg-slate-900 text-slate-100",
                main_class: "min-h-screen flex flex-col items-center justify-start py-10 px-4",
                card_class: "max-w-4xl w-full space-y-6",
                eyebrow_class: "uppercase tracking-wide text-sm text-slate-400",
                headline_class: "text-3xl font-extrabold tracking-tight",
                lede_class: "text-base text-slate-300",
                button_class: "inline-flex items-center rounded-md bg-slate-100 px-3 py-1 text-slate-900 font-semibold hover:bg-white",
                section_class: "px-2 py-1 rounded border border-slate-600 text-slate-200",
                section_match_class: "px-2 py-1 rounded border border-amber-400 bg-amber-400 text-slate-900",
            },
            Theme::Light => Self {
                body_class: "bg-slate-50 text-slate-900",
                main_class: "min-h-screen flex flex-col items-center justify-start py-10 px-4",
                card_class: "max-w-4xl w-full space-y-6",
                eyebrow_class: "uppercase tracking-wide text-sm text-slate-500",
                headline_class: "text-3xl font-extrabold tracking-tight",
                lede_class: "text-base text-slate-600",
                button_class: "inline-flex items-center rounded-md bg-slate-900 px-3 py-1 text-white font-semibold hover:bg-slate-800",
                section_class: "px-2 py-1 rounded border border-slate-300 text-slate-700",
                section_match_class: "px-2 py-1 rounded border border-amber-500 bg-amber-200 text-slate-900",
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct WebConfig {
    pub addr: SocketAddr,
    pub endpoint: String,
    pub base_url: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            endpoint: crate::config::DEFAULT_ENDPOINT.to_string(),
            base_url: "http://127.0.0.1:8080".to_string(),
        }
    }
}

#[derive(Debug)]
pub enum WebError {
    Io(std::io::Error),
}

impl fmt::Display for WebError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WebError::Io(err) => write!(f, "io error: {err}"),
        }
    }
}

impl std::error::Error for WebError {}

impl From<std::io::Error> for WebError {
    fn from(value: std::io::Error) -> Self {
        WebError::Io(value)
    }
}

pub async fn serve(config: WebConfig) -> Result<(), WebError> {
    let state = Arc::new(AppState {
        search: SearchOrchestrator::new(HttpTransport::new(), config.endpoint.clone()),
        base_url: config.base_url.clone(),
    });
    let router = build_router(state);
    info!(
        %config.addr,
        endpoint = %config.endpoint,
        base = %config.base_url,
        "Binding HTTP listener"
    );
    let listener = TcpListener::bind(config.addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("HTTP server exited");
    Ok(())
}

fn build_router<T>(state: SharedState<T>) -> Router
where
    T: SearchTransport + Send + Sync + 'static,
{
    Router::new()
        .route("/", get(home::<T>))
        .route("/prefs/theme/toggle", get(toggle_theme))
        .route("/prefs/font/:action", get(change_font))
        .route("/healthz", get(health))
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(true))
                .on_response(DefaultOnResponse::new().include_headers(true)),
        )
        .layer(CompressionLayer::new())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        if let Ok(mut stream) = signal(SignalKind::terminate()) {
            let _ = stream.recv().await;
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[derive(Debug, Default)]
pub struct CookieStore {
    values: Mutex<BTreeMap<String, String>>,
    pending: Mutex<BTreeMap<String, String>>,
}

impl CookieStore {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut values = BTreeMap::new();
        for raw in headers.get_all(header::COOKIE) {
            let Ok(raw) = raw.to_str() else {
                continue;
            };
            for cookie in Cookie::split_parse(raw).flatten() {
                values.insert(cookie.name().to_string(), cookie.value().to_string());
            }
        }
        Self {
            values: Mutex::new(values),
            pending: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn take_set_cookies(&self) -> Vec<String> {
        std::mem::take(&mut *self.pending.lock())
            .into_values()
            .collect()
    }

    fn apply_to(&self, response: impl IntoResponse) -> Response {
        let mut response = response.into_response();
        for cookie in self.take_set_cookies() {
            match HeaderValue::from_str(&cookie) {
                Ok(value) => {
                    response.headers_mut().append(header::SET_COOKIE, value);
                }
                Err(err) => debug!(%cookie, error = %err, "unencodable cookie dropped"),
            }
        }
        response
    }
}

impl KeyValueStore for CookieStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.values.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let previous = self
            .values
            .lock()
            .insert(key.to_string(), value.to_string());
        if previous.as_deref() != Some(value) {
            let cookie = Cookie::build((key.to_string(), value.to_string()))
                .path("/")
                .same_site(SameSite::Lax)
                .permanent()
                .build();
            self.pending
                .lock()
                .insert(key.to_string(), cookie.to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
struct HomeParams {
    query: Option<String>,
    exact: Option<String>,
    section: Option<String>,
}

impl HomeParams {
    fn exact_only(&self) -> bool {
        matches!(self.exact.as_deref(), Some("1" | "true" | "on"))
    }
}

#[derive(Debug, Default, Deserialize)]
struct BackParams {
    back: Option<String>,
}

async fn home<T>(
    State(state): State<SharedState<T>>,
    Query(params): Query<HomeParams>,
    headers: HeaderMap,
) -> Response
where
    T: SearchTransport + Send + Sync + 'static,
{
    let cookies = CookieStore::from_headers(&headers);
    let prefs = PreferenceStore::new(&cookies);
    let mut page = Page::new();
    prefs.init(&mut page);

    if let Some(query) = params.query.as_deref() {
        page.search_input = query.to_string();
        page.exact_only = Some(params.exact_only());
        state.search.run_search(&mut page).await;
    }
    if let Some(position) = params.section.as_deref() {
        let mut viewport = Viewport::new();
        let shown = parse_position(position)
            .and_then(|(a, s)| select_section(&mut page, &mut viewport, a, s));
        if shown.is_none() {
            debug!(position, "requested section not in results");
        }
    }

    let theme = current_theme(&page);
    let html = render_page(&page, &params, &state.base_url).unwrap_or_else(|err| {
        render_error_page(theme, err.to_string())
    });
    cookies.apply_to(Html(html))
}

async fn toggle_theme(Query(params): Query<BackParams>, headers: HeaderMap) -> Response {
    let cookies = CookieStore::from_headers(&headers);
    let prefs = PreferenceStore::new(&cookies);
    let mut page = Page::new();
    prefs.init(&mut page);
    let theme = prefs.toggle_theme(&mut page);
    debug!(%theme, "theme toggled");
    cookies.apply_to(Redirect::to(safe_back(params.back.as_deref())))
}

async fn change_font(
    Path(action): Path<String>,
    Query(params): Query<BackParams>,
    headers: HeaderMap,
) -> Response {
    let cookies = CookieStore::from_headers(&headers);
    let prefs = PreferenceStore::new(&cookies);
    let mut page = Page::new();
    prefs.init(&mut page);
    let size = match action.as_str() {
        "increase" => prefs.increase_text(&mut page),
        "decrease" => prefs.decrease_text(&mut page),
        "reset" => prefs.reset_text(&mut page),
        other => {
            let html = render_error_page(
                current_theme(&page),
                format!("Unknown font action \"{other}\"."),
            );
            return (StatusCode::NOT_FOUND, Html(html)).into_response();
        }
    };
    debug!(%size, "font size changed");
    cookies.apply_to(Redirect::to(safe_back(params.back.as_deref())))
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok", "service": "sectionscope-web" }))
}

fn safe_back(back: Option<&str>) -> &str {
    match back {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => {
            path
        }
        _ => "/",
    }
}

fn parse_position(raw: &str) -> Option<(usize, usize)> {
    let (article, section) = raw.split_once('.')?;
    let article = article.trim().parse::<usize>().ok()?.checked_sub(1)?;
    let section = section.trim().parse::<usize>().ok()?.checked_sub(1)?;
    Some((article, section))
}

fn page_path(query: &str, exact: bool, section: Option<&str>) -> String {
    let mut path = format!("/?query={}", encode_component(query));
    if exact {
        path.push_str("&exact=1");
    }
    if let Some(section) = section {
        path.push_str("&section=");
        path.push_str(&encode_component(section));
    }
    path
}

struct ResultRow<'a> {
    number: usize,
    label: &'a str,
    href: &'a str,
    meta: &'a str,
    sections: Vec<SectionLink<'a>>,
}

struct SectionLink<'a> {
    label: &'a str,
    link: String,
    highlighted: bool,
}

fn render_page(page: &Page, params: &HomeParams, base_url: &str) -> askama::Result<String> {
    let theme = current_theme(page);
    let exact = page.exact_only_checked();
    let query = params.query.as_deref();
    let rows = page
        .entries()
        .iter()
        .enumerate()
        .map(|(a, entry)| ResultRow {
            number: a + 1,
            label: &entry.link.label,
            href: &entry.link.href,
            meta: &entry.meta,
            sections: entry
                .buttons
                .iter()
                .zip(&entry.article.sections)
                .enumerate()
                .map(|(s, (button, section))| {
                    let position = format!("{}.{}", a + 1, s + 1);
                    SectionLink {
                        label: &button.label,
                        link: format!(
                            "{}#{}",
                            page_path(&page.search_input, exact, Some(&position)),
                            detail_id(&entry.article, section)
                        ),
                        highlighted: button.highlighted,
                    }
                })
                .collect(),
        })
        .collect();
    let current = match query {
        Some(query) => page_path(query, exact, params.section.as_deref()),
        None => "/".to_string(),
    };
    let status = match &page.results {
        ResultsArea::Text(text) if !text.is_empty() => Some(text.as_str()),
        _ => None,
    };
    let body_classes = page
        .body_classes
        .iter()
        .map(String::as_str)
        .chain(std::iter::once(Chrome::new(theme).body_class))
        .collect::<Vec<_>>()
        .join(" ");
    let template = PageTemplate {
        chrome: Chrome::new(theme),
        body_classes,
        font_size: page.root_font_size.as_deref().unwrap_or(""),
        query: &page.search_input,
        exact,
        summary: page.summary().filter(|summary| !summary.is_empty()),
        status,
        rows,
        detail: page.detail(),
        theme_label: page.theme_toggle.as_deref().unwrap_or(""),
        back: encode_component(&current),
        base_url,
    };
    template.render()
}

fn render_error_page(theme: Theme, message: impl Into<String>) -> String {
    let template = ErrorTemplate {
        chrome: Chrome::new(theme),
        message: message.into(),
    };
    template
        .render()
        .unwrap_or_else(|_| "<h1>Something went wrong</h1>".to_string())
}

#[derive(Template)]
#[template(
    source = r##"<!DOCTYPE html>
<html lang="en"{% if !font_size.is_empty() %} style="font-size: {{ font_size }}"{% endif %}>
  <head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <title>{% if query.is_empty() %}Section search{% else %}{{ query }} • Section search{% endif %}</title>
    <script src="https://cdn.jsdelivr.net/npm/@tailwindcss/browser@4"></script>
    <link rel="canonical" href="{{ base_url }}/">
  </head>
  <body class="{{ body_classes }}">
    <main class="{{ chrome.main_class }}">
      <div class="{{ chrome.card_class }}">
        <div class="flex flex-wrap gap-2 justify-end text-sm">
          <a id="themeToggle" href="/prefs/theme/toggle?back={{ back }}" class="{{ chrome.button_class }}">{{ theme_label }}</a>
          <a href="/prefs/font/decrease?back={{ back }}" class="{{ chrome.button_class }}" aria-label="Smaller text">A-</a>
          <a href="/prefs/font/reset?back={{ back }}" class="{{ chrome.button_class }}" aria-label="Reset text size">A</a>
          <a href="/prefs/font/increase?back={{ back }}" class="{{ chrome.button_class }}" aria-label="Larger text">A+</a>
        </div>
        <div>
          <p class="{{ chrome.eyebrow_class }}">Section search</p>
          <h1 class="{{ chrome.headline_class }}">Find the sections that match</h1>
        </div>
        <form method="get" action="/" class="flex flex-wrap gap-3 items-center">
          <input id="searchInput" name="query" type="search" value="{{ query }}" autofocus class="flex-1 rounded border px-3 py-2 text-slate-900" />
          <label class="text-sm"><input id="exactOnly" name="exact" type="checkbox" value="1"{% if exact %} checked{% endif %} /> Exact matches only</label>
          <button type="submit" class="{{ chrome.button_class }}">Search</button>
        </form>
        <p id="resultsSummary" class="{{ chrome.lede_class }}">{% if let Some(summary) = summary %}{{ summary }}{% endif %}</p>
        <div id="results">
          {% if let Some(status) = status %}
          <p class="{{ chrome.lede_class }}">{{ status }}</p>
          {% endif %}
          {% if !rows.is_empty() %}
          <ol class="space-y-4">
            {% for row in rows %}
            <li>
              <a href="{{ row.href }}" target="_blank" rel="noopener" class="font-semibold underline">{{ row.label }}</a>
              <p class="text-sm {{ chrome.lede_class }}">{{ row.meta }}</p>
              {% if !row.sections.is_empty() %}
              <div class="flex flex-wrap gap-2 mt-2">
                {% for section in row.sections %}
                <a href="{{ section.link }}" class="{% if section.highlighted %}{{ chrome.section_match_class }} highlight{% else %}{{ chrome.section_class }}{% endif %}">{{ section.label }}</a>
                {% endfor %}
              </div>
              {% endif %}
            </li>
            {% endfor %}
          </ol>
          {% endif %}
        </div>
        <section id="detailPanel" tabindex="-1">
          {% if let Some(view) = detail %}
          <article id="{{ view.id }}" data-article="{{ view.data_article }}" data-section="{{ view.data_section }}">
            <h2 class="text-2xl font-bold">{{ view.heading }}</h2>
            <h3 class="text-lg font-semibold">{{ view.section_heading }}</h3>
            <div class="whitespace-pre-wrap mt-2">{{ view.body }}</div>
            <div class="flex gap-3 mt-4">
              <a href="{{ view.open_href }}" target="_blank" rel="noopener" class="{{ chrome.button_class }}">Open full article</a>
              <a href="#" class="{{ chrome.button_class }}">Scroll to top</a>
            </div>
          </article>
          {% endif %}
        </section>
      </div>
    </main>
  </body>
</html>"##,
    ext = "html"
)]
struct PageTemplate<'a> {
    chrome: Chrome,
    body_classes: String,
    font_size: &'a str,
    query: &'a str,
    exact: bool,
    summary: Option<&'a str>,
    status: Option<&'a str>,
    rows: Vec<ResultRow<'a>>,
    detail: Option<&'a DetailView>,
    theme_label: &'a str,
    back: String,
    base_url: &'a str,
}

#[derive(Template)]
#[template(
    source = r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <title>Section search • Error</title>
    <script src="https://cdn.jsdelivr.net/npm/@tailwindcss/browser@4"></script>
  </head>
  <body class="{{ chrome.body_class }}">
    <main class="{{ chrome.main_class }}">
      <div class="{{ chrome.card_class }}">
        <h1 class="{{ chrome.headline_class }}">Something went wrong</h1>
        <p class="{{ chrome.lede_class }}">{{ message }}</p>
        <a href="/" class="{{ chrome.button_class }}">Back to search</a>
      </div>
    </main>
  </body>
</html>"#,
    ext = "html"
)]
struct ErrorTemplate {
    chrome: Chrome,
    message: String,
}
