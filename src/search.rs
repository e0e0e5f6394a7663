//! Search orchestration: validate the input, query the endpoint, render the
//! result list and route list interactions to the detail renderer.

use crate::config::ClientConfig;
use crate::detail::DetailRenderer;
use crate::model::{Article, articles_from_value};
use crate::navigator::Navigator;
use crate::page::{ElementId, Key, KeyDispatch, Page, ResultEntry, ResultsArea};
use crate::transport::{RawResponse, SearchTransport, TransportError};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde_json::Value;
use std::fmt;
use tracing::{debug, info, warn};

pub const PROMPT_MESSAGE: &str = "Please enter a search term.";
pub const SEARCHING_MESSAGE: &str = "Searching...";
pub const NO_RESULTS_MESSAGE: &str = "No results.";
pub const EMPTY_SUMMARY: &str = "Found 0 articles.";

/// Characters `encodeURIComponent` leaves alone besides alphanumerics.
const QUERY_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchError {
    /// Non-2xx answer; `message` is the server's text or `HTTP <status>`.
    Http { status: u16, message: String },
    Transport(String),
    /// A 2xx answer whose body was not JSON.
    Body(String),
}

impl fmt::Display for SearchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchError::Http { message, .. } => f.write_str(message),
            SearchError::Transport(message) => f.write_str(message),
            SearchError::Body(message) => f.write_str(message),
        }
    }
}

impl std::error::Error for SearchError {}

impl From<TransportError> for SearchError {
    fn from(value: TransportError) -> Self {
        SearchError::Transport(value.message().to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub term: String,
    pub exact_only: bool,
}

impl SearchRequest {
    pub fn query_string(&self) -> String {
        let mut query = format!("query={}", encode_component(&self.term));
        if self.exact_only {
            query.push_str("&exact=1");
        }
        query
    }
}

pub type SearchOutcome = Result<Vec<Article>, SearchError>;

pub fn encode_component(value: &str) -> String {
    utf8_percent_encode(value, QUERY_COMPONENT).to_string()
}

/// Turns a completed HTTP exchange into articles or an error message.
pub fn interpret_response(response: RawResponse) -> SearchOutcome {
    if !response.is_success() {
        let message = error_message(&response.body)
            .unwrap_or_else(|| format!("HTTP {}", response.status));
        return Err(SearchError::Http {
            status: response.status,
            message,
        });
    }
    let value: Value =
        serde_json::from_str(&response.body).map_err(|err| SearchError::Body(err.to_string()))?;
    Ok(articles_from_value(value))
}

fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    ["detail", "error"].iter().find_map(|key| match value.get(*key) {
        Some(Value::String(text)) if !text.is_empty() => Some(text.clone()),
        _ => None,
    })
}

/// Runs searches against one endpoint through a [`SearchTransport`].
#[derive(Debug, Clone)]
pub struct SearchOrchestrator<T> {
    transport: T,
    endpoint: String,
}

impl<T: SearchTransport> SearchOrchestrator<T> {
    pub fn new(transport: T, endpoint: impl Into<String>) -> Self {
        Self {
            transport,
            endpoint: endpoint.into(),
        }
    }

    pub fn from_config(transport: T, config: &ClientConfig) -> Self {
        Self::new(transport, config.endpoint.clone())
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn request_url(&self, request: &SearchRequest) -> String {
        let separator = if self.endpoint.contains('?') { '&' } else { '?' };
        format!("{}{}{}", self.endpoint, separator, request.query_string())
    }

    /// Validates the input fields and shows the in-progress state.
    ///
    /// Returns `None`, after showing the prompt, when the term is blank; no
    /// request should be issued then.
    pub fn begin(&self, page: &mut Page) -> Option<SearchRequest> {
        let term = page.search_input.trim();
        if term.is_empty() {
            page.set_results_text(PROMPT_MESSAGE);
            return None;
        }
        let request = SearchRequest {
            term: term.to_string(),
            exact_only: page.exact_only_checked(),
        };
        page.set_results_text(SEARCHING_MESSAGE);
        page.clear_detail();
        Some(request)
    }

    pub async fn fetch(&self, request: &SearchRequest) -> SearchOutcome {
        let url = self.request_url(request);
        info!(%url, exact = request.exact_only, "issuing search");
        let response = self.transport.get(&url).await?;
        interpret_response(response)
    }

    /// Replaces the results (and summary) with `outcome`. Whichever outcome
    /// is rendered last is what the page shows.
    pub fn render(&self, page: &mut Page, outcome: SearchOutcome) {
        let articles = match outcome {
            Ok(articles) => articles,
            Err(err) => {
                warn!(error = %err, "search failed");
                let message = format!("Error during search: {err}");
                page.set_summary(message.clone());
                page.set_results_text(message);
                return;
            }
        };
        if articles.is_empty() {
            page.set_results_text(NO_RESULTS_MESSAGE);
            page.set_summary(EMPTY_SUMMARY);
            return;
        }
        let matched = articles
            .iter()
            .map(|article| article.match_count)
            .fold(0u64, u64::saturating_add);
        page.set_summary(format!(
            "Found {} articles — {} matched sections (shown per item)",
            articles.len(),
            matched
        ));
        debug!(articles = articles.len(), matched, "rendering results");
        page.results = ResultsArea::List(
            articles
                .into_iter()
                .map(ResultEntry::from_article)
                .collect(),
        );
    }

    pub async fn run_search(&self, page: &mut Page) {
        let Some(request) = self.begin(page) else {
            return;
        };
        let outcome = self.fetch(&request).await;
        self.render(page, outcome);
    }

    /// Keyboard handling for the page: Enter in the search field submits.
    pub async fn handle_key(
        &self,
        page: &mut Page,
        focused: Option<ElementId>,
        key: Key,
    ) -> KeyDispatch {
        if key != Key::Enter || focused != Some(ElementId::SearchInput) {
            return KeyDispatch::default();
        }
        self.run_search(page).await;
        KeyDispatch {
            default_prevented: true,
            submitted: true,
        }
    }
}

/// The "Open article" action of result `index`. Returns false when there is
/// no such entry.
pub fn open_article<N: Navigator + ?Sized>(page: &Page, nav: &mut N, index: usize) -> bool {
    let Some(entry) = page.entries().get(index) else {
        return false;
    };
    if let Err(err) = nav.open_external(&entry.link.href) {
        debug!(href = %entry.link.href, error = %err, "open article failed");
    }
    true
}

/// Clicks section button `section` of result `article`, showing it in the
/// detail panel. Returns the detail view id, or `None` for a missing button.
pub fn select_section<N: Navigator + ?Sized>(
    page: &mut Page,
    nav: &mut N,
    article: usize,
    section: usize,
) -> Option<String> {
    let entry = page.entries().get(article)?;
    let chosen = entry.article.sections.get(section)?.clone();
    let owner = entry.article.clone();
    Some(DetailRenderer::show_section(page, nav, &owner, &chosen))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigator::Viewport;
    use crate::transport::testing::ScriptedTransport;

    const ENDPOINT: &str = "http://search.test/search";

    fn orchestrator(transport: ScriptedTransport) -> SearchOrchestrator<ScriptedTransport> {
        SearchOrchestrator::new(transport, ENDPOINT)
    }

    fn page_with(term: &str) -> Page {
        let mut page = Page::new();
        page.search_input = term.to_string();
        page
    }

    #[tokio::test]
    async fn blank_term_never_hits_the_network() {
        let search = orchestrator(ScriptedTransport::replying(200, "[]"));
        for term in ["", "   ", "\t\n"] {
            let mut page = page_with(term);
            search.run_search(&mut page).await;
            assert_eq!(page.results_text(), Some(PROMPT_MESSAGE));
        }
        assert_eq!(search.transport().request_count(), 0);
    }

    #[tokio::test]
    async fn blank_term_keeps_detail_open() {
        let search = orchestrator(ScriptedTransport::default());
        let mut page = page_with(" ");
        DetailRenderer::show_section(
            &mut page,
            &mut Viewport::new(),
            &Article::default(),
            &Default::default(),
        );
        search.run_search(&mut page).await;
        assert!(page.detail().is_some());
    }

    #[test]
    fn begin_shows_searching_and_clears_detail() {
        let search = orchestrator(ScriptedTransport::default());
        let mut page = page_with("  mars rover ");
        page.exact_only = Some(true);
        DetailRenderer::show_section(
            &mut page,
            &mut Viewport::new(),
            &Article::default(),
            &Default::default(),
        );
        let request = search.begin(&mut page).unwrap();
        assert_eq!(request.term, "mars rover");
        assert!(request.exact_only);
        assert_eq!(page.results_text(), Some(SEARCHING_MESSAGE));
        assert!(page.detail().is_none());
    }

    #[test]
    fn url_encoding_matches_encode_uri_component() {
        let search = orchestrator(ScriptedTransport::default());
        let request = SearchRequest {
            term: "a b&c=d/é (x)!*'~._-".into(),
            exact_only: false,
        };
        assert_eq!(
            search.request_url(&request),
            "http://search.test/search?query=a%20b%26c%3Dd%2F%C3%A9%20(x)!*'~._-"
        );
        let exact = SearchRequest {
            term: "orbit".into(),
            exact_only: true,
        };
        assert_eq!(
            search.request_url(&exact),
            "http://search.test/search?query=orbit&exact=1"
        );
    }

    #[tokio::test]
    async fn success_renders_summary_and_buttons() {
        let body = r#"[{"name":"A","link":"http://x","match_count":2,"sections":[{"title":"S1","matched":true}]}]"#;
        let search = orchestrator(ScriptedTransport::replying(200, body));
        let mut page = page_with("a");
        search.run_search(&mut page).await;

        assert_eq!(
            page.summary(),
            Some("Found 1 articles — 2 matched sections (shown per item)")
        );
        let entries = page.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].link.href, "http://x");
        assert_eq!(entries[0].link.label, "A");
        assert_eq!(entries[0].meta, "2 matches");
        assert_eq!(entries[0].buttons.len(), 1);
        assert!(entries[0].buttons[0].highlighted);
        assert_eq!(
            search.transport().requests.lock().as_slice(),
            ["http://search.test/search?query=a"]
        );
    }

    #[test]
    fn huge_match_counts_saturate_the_total() {
        let search = orchestrator(ScriptedTransport::default());
        let mut page = Page::new();
        let outcome = interpret_response(RawResponse::new(
            200,
            r#"[{"match_count":1e20},{"match_count":1e20},{"match_count":1}]"#,
        ));
        search.render(&mut page, outcome);
        assert_eq!(page.entries().len(), 3);
        assert_eq!(
            page.summary(),
            Some(
                format!(
                    "Found 3 articles — {} matched sections (shown per item)",
                    u64::MAX
                )
                .as_str()
            )
        );
    }

    #[tokio::test]
    async fn matched_sections_are_summed() {
        let body = r#"[{"match_count":2},{"match_count":3,"occurrence_count":7},{"word_match_count":1}]"#;
        let search = orchestrator(ScriptedTransport::replying(200, body));
        let mut page = page_with("x");
        search.run_search(&mut page).await;
        assert_eq!(
            page.summary(),
            Some("Found 3 articles — 5 matched sections (shown per item)")
        );
        let metas: Vec<_> = page.entries().iter().map(|e| e.meta.as_str()).collect();
        assert_eq!(
            metas,
            ["2 matches", "3 matches • 7 occurrences", "0 matches • 1 words"]
        );
    }

    #[tokio::test]
    async fn empty_array_shows_no_results() {
        let search = orchestrator(ScriptedTransport::replying(200, "[]"));
        let mut page = page_with("nothing");
        search.run_search(&mut page).await;
        assert_eq!(page.results_text(), Some(NO_RESULTS_MESSAGE));
        assert_eq!(page.summary(), Some(EMPTY_SUMMARY));
    }

    #[tokio::test]
    async fn non_array_body_is_treated_as_empty() {
        let search = orchestrator(ScriptedTransport::replying(200, r#"{"items":[]}"#));
        let mut page = page_with("q");
        search.run_search(&mut page).await;
        assert_eq!(page.results_text(), Some(NO_RESULTS_MESSAGE));
    }

    #[tokio::test]
    async fn http_error_uses_detail() {
        let search = orchestrator(ScriptedTransport::replying(404, r#"{"detail":"not found"}"#));
        let mut page = page_with("q");
        search.run_search(&mut page).await;
        assert_eq!(page.results_text(), Some("Error during search: not found"));
        assert_eq!(page.summary(), Some("Error during search: not found"));
    }

    #[tokio::test]
    async fn http_error_uses_error_field() {
        let search = orchestrator(ScriptedTransport::replying(400, r#"{"error":"bad query"}"#));
        let mut page = page_with("q");
        search.run_search(&mut page).await;
        assert_eq!(page.results_text(), Some("Error during search: bad query"));
    }

    #[tokio::test]
    async fn unparsable_error_body_uses_status() {
        let search = orchestrator(ScriptedTransport::replying(500, "<html>oops</html>"));
        let mut page = page_with("q");
        search.run_search(&mut page).await;
        assert_eq!(page.results_text(), Some("Error during search: HTTP 500"));
    }

    #[test]
    fn structured_detail_falls_back_to_status() {
        let outcome = interpret_response(RawResponse::new(
            422,
            r#"{"detail":[{"loc":["query"],"msg":"field required"}]}"#,
        ));
        assert_eq!(
            outcome,
            Err(SearchError::Http {
                status: 422,
                message: "HTTP 422".into()
            })
        );
    }

    #[tokio::test]
    async fn transport_failure_uses_its_message() {
        let search = orchestrator(ScriptedTransport::failing("connection refused"));
        let mut page = Page::minimal();
        page.search_input = "q".into();
        search.run_search(&mut page).await;
        assert_eq!(
            page.results_text(),
            Some("Error during search: connection refused")
        );
        assert_eq!(page.summary(), None);
    }

    #[tokio::test]
    async fn invalid_json_success_body_is_an_error() {
        let search = orchestrator(ScriptedTransport::replying(200, "not json"));
        let mut page = page_with("q");
        search.run_search(&mut page).await;
        let text = page.results_text().unwrap();
        assert!(text.starts_with("Error during search: "), "{text}");
    }

    #[tokio::test]
    async fn last_render_wins() {
        let transport = ScriptedTransport::default();
        transport.push(Ok(RawResponse::new(200, r#"[{"name":"first"}]"#)));
        transport.push(Ok(RawResponse::new(200, "[]")));
        let search = orchestrator(transport);
        let mut page = page_with("race");

        let first = search.begin(&mut page).unwrap();
        let second = search.begin(&mut page).unwrap();
        let first_outcome = search.fetch(&first).await;
        let second_outcome = search.fetch(&second).await;

        search.render(&mut page, second_outcome);
        search.render(&mut page, first_outcome);
        assert_eq!(page.entries()[0].link.label, "first");
    }

    #[tokio::test]
    async fn enter_in_search_field_submits() {
        let search = orchestrator(ScriptedTransport::replying(200, "[]"));
        let mut page = page_with("comet");

        let ignored = search
            .handle_key(&mut page, Some(ElementId::DetailPanel), Key::Enter)
            .await;
        assert_eq!(ignored, KeyDispatch::default());
        let ignored = search
            .handle_key(&mut page, Some(ElementId::SearchInput), Key::Char('x'))
            .await;
        assert!(!ignored.submitted);
        assert_eq!(search.transport().request_count(), 0);

        let dispatch = search
            .handle_key(&mut page, Some(ElementId::SearchInput), Key::Enter)
            .await;
        assert!(dispatch.default_prevented);
        assert!(dispatch.submitted);
        assert_eq!(search.transport().request_count(), 1);
        assert_eq!(page.results_text(), Some(NO_RESULTS_MESSAGE));
    }

    #[tokio::test]
    async fn selecting_a_section_shows_its_detail() {
        let body = r#"[{"name":"Mars","link":"http://mars","match_count":1,
            "sections":[{"title":"Moons","content":"","excerpt":"Phobos and Deimos"}]}]"#;
        let search = orchestrator(ScriptedTransport::replying(200, body));
        let mut page = page_with("mars");
        search.run_search(&mut page).await;

        let mut nav = Viewport::new();
        assert_eq!(select_section(&mut page, &mut nav, 0, 5), None);
        assert_eq!(select_section(&mut page, &mut nav, 3, 0), None);

        let id = select_section(&mut page, &mut nav, 0, 0).unwrap();
        assert_eq!(id, "detail-mars-moons");
        let view = page.detail().unwrap();
        assert_eq!(view.body, "Phobos and Deimos");
        assert_eq!(nav.fragment.as_deref(), Some("detail-mars-moons"));
        // The list stays in place underneath the detail view.
        assert_eq!(page.entries().len(), 1);
    }

    #[tokio::test]
    async fn open_article_uses_link_or_hash() {
        let body = r#"[{"name":"A","link":"http://a"},{"name":"B"}]"#;
        let search = orchestrator(ScriptedTransport::replying(200, body));
        let mut page = page_with("x");
        search.run_search(&mut page).await;
        let mut nav = Viewport::new();
        assert!(open_article(&page, &mut nav, 0));
        assert!(open_article(&page, &mut nav, 1));
        assert!(!open_article(&page, &mut nav, 2));
        assert_eq!(nav.opened, vec!["http://a", "#"]);
    }
}
