use crate::model::{Article, Section};
use crate::navigator::Navigator;
use crate::page::{ElementId, Page};
use crate::slug::slugify;
use serde::Serialize;
use tracing::{debug, warn};

pub const DETAIL_ID_PREFIX: &str = "detail-";

/// The single article+section view shown in the detail panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetailView {
    pub id: String,
    pub data_article: String,
    pub data_section: String,
    pub heading: String,
    pub section_heading: String,
    pub body: String,
    pub open_href: String,
}

impl DetailView {
    pub fn build(article: &Article, section: &Section) -> Self {
        let base = article.anchor_base();
        let label = section.label();
        Self {
            id: detail_id(article, section),
            data_article: base.to_string(),
            data_section: label.to_string(),
            heading: article
                .name
                .clone()
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| "Article".to_string()),
            section_heading: label.to_string(),
            body: section.body().to_string(),
            open_href: article.href().to_string(),
        }
    }
}

pub fn detail_id(article: &Article, section: &Section) -> String {
    let raw = format!("{}-{}", article.anchor_base(), section.label());
    format!("{DETAIL_ID_PREFIX}{}", slugify(Some(&raw)))
}

/// Proof that a view was inserted and is waiting for its reveal step.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "an inserted detail view should be revealed"]
pub struct PendingReveal {
    id: String,
}

impl PendingReveal {
    pub fn id(&self) -> &str {
        &self.id
    }
}

/// Renders the detail panel in two ordered steps: [`insert`] places the
/// view in the page, [`reveal`] then navigates to it. [`show_section`] runs
/// both in that order.
///
/// [`insert`]: DetailRenderer::insert
/// [`reveal`]: DetailRenderer::reveal
/// [`show_section`]: DetailRenderer::show_section
#[derive(Debug, Clone, Copy, Default)]
pub struct DetailRenderer;

impl DetailRenderer {
    pub fn insert(page: &mut Page, article: &Article, section: &Section) -> PendingReveal {
        page.clear_detail();
        let view = DetailView::build(article, section);
        let id = view.id.clone();
        page.detail_panel.view = Some(view);
        PendingReveal { id }
    }

    /// Sets the fragment to the inserted view and focuses the panel.
    /// Failures are logged, never returned.
    pub fn reveal<N: Navigator + ?Sized>(page: &mut Page, nav: &mut N, pending: PendingReveal) {
        if let Err(err) = nav.set_fragment(&pending.id) {
            warn!(id = %pending.id, error = %err, "anchor navigation failed");
        }
        focus_panel(page, nav);
    }

    /// Replaces the detail panel with `section` of `article` and jumps to it.
    /// Returns the new view's id.
    pub fn show_section<N: Navigator + ?Sized>(
        page: &mut Page,
        nav: &mut N,
        article: &Article,
        section: &Section,
    ) -> String {
        let pending = Self::insert(page, article, section);
        let id = pending.id.clone();
        Self::reveal(page, nav, pending);
        id
    }

    pub fn open_full_article<N: Navigator + ?Sized>(page: &Page, nav: &mut N) -> bool {
        let Some(view) = page.detail() else {
            return false;
        };
        if let Err(err) = nav.open_external(&view.open_href) {
            debug!(href = %view.open_href, error = %err, "open article failed");
        }
        true
    }

    /// The "Scroll to top" action: jump to the origin, then hand focus back
    /// to the panel. Either step may fail silently.
    pub fn scroll_to_top<N: Navigator + ?Sized>(page: &mut Page, nav: &mut N) {
        if let Err(err) = nav.scroll_to_origin() {
            debug!(error = %err, "scroll to top failed");
        }
        focus_panel(page, nav);
    }
}

fn focus_panel<N: Navigator + ?Sized>(page: &mut Page, nav: &mut N) {
    page.detail_panel.tabindex = Some(-1);
    if let Err(err) = nav.focus(ElementId::DetailPanel) {
        debug!(error = %err, "focus on detail panel failed");
    }
}
