use std::error::Error;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use atty::Stream;
use clap::{Parser, Subcommand};
use sectionscope::{
    ClientConfig, DetailRenderer, DetailView, ElementId, HttpTransport, JsonFileStore, Key,
    KeyValueStore, MemoryStore, Navigator, Page, PreferenceStore, ResultsArea, SearchOrchestrator,
    Theme, Viewport, open_article, select_section,
};
use serde_json::json;
use termimad::{FmtText, MadSkin, terminal_size};
use tokio::runtime::Builder;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "sectionscope", about = "Search articles and read matched sections", version)]
pub struct Cli {
    /// Emit JSON instead of human-readable output.
    #[arg(long, global = true)]
    json: bool,

    /// Preferences file (defaults to ~/.sectionscope-prefs.json).
    #[arg(long, global = true)]
    prefs: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one search and print the result list.
    Search {
        /// Search term; multiple words are joined with spaces.
        #[arg(required = true)]
        terms: Vec<String>,
        /// Only request exact matches.
        #[arg(long)]
        exact: bool,
        /// Search endpoint URL.
        #[arg(long)]
        endpoint: Option<String>,
        /// Show a section in the detail view, as ARTICLE.SECTION (1-based).
        #[arg(long, value_name = "A.S")]
        open: Option<String>,
    },
    /// Line-based session: type a term and press Enter to search.
    Interactive {
        /// Search endpoint URL.
        #[arg(long)]
        endpoint: Option<String>,
    },
    /// Show or change the theme: `toggle`, `light` or `dark`.
    Theme { action: Option<String> },
    /// Change the text size: `increase`, `decrease`, `reset` or a size name.
    Font { action: String },
    /// Serve the server-rendered search page.
    #[cfg(feature = "web")]
    Serve {
        /// Address to bind.
        #[arg(long, default_value = "127.0.0.1:8080")]
        addr: std::net::SocketAddr,
        /// Upstream search endpoint URL.
        #[arg(long)]
        endpoint: Option<String>,
        /// Public base URL used in absolute links.
        #[arg(long)]
        base_url: Option<String>,
    },
}

pub fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_tracing();
    let config = ClientConfig::default().with_prefs_path(cli.prefs.clone());
    match cli.command {
        Command::Search {
            terms,
            exact,
            endpoint,
            open,
        } => handle_search(
            config.with_endpoint(endpoint),
            terms.join(" "),
            exact,
            open,
            cli.json,
        ),
        Command::Interactive { endpoint } => {
            handle_interactive(config.with_endpoint(endpoint), cli.json)
        }
        Command::Theme { action } => handle_theme(&config, action, cli.json),
        Command::Font { action } => handle_font(&config, &action, cli.json),
        #[cfg(feature = "web")]
        Command::Serve {
            addr,
            endpoint,
            base_url,
        } => handle_serve(config.with_endpoint(endpoint), addr, base_url),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn open_store(config: &ClientConfig) -> Box<dyn KeyValueStore> {
    match JsonFileStore::open(&config.prefs_path) {
        Ok(store) => Box::new(store),
        Err(err) => {
            warn!(path = %config.prefs_path.display(), error = %err, "preferences unavailable, using defaults");
            Box::new(MemoryStore::new())
        }
    }
}

fn handle_search(
    config: ClientConfig,
    term: String,
    exact: bool,
    open: Option<String>,
    as_json: bool,
) -> Result<(), Box<dyn Error>> {
    let selection = open.as_deref().map(parse_position).transpose()?;
    let store = open_store(&config);
    let prefs = PreferenceStore::new(store.as_ref());
    let search = SearchOrchestrator::from_config(HttpTransport::new(), &config);

    let mut page = Page::new();
    let mut viewport = Viewport::with_search_focus();
    prefs.init(&mut page);
    page.search_input = term;
    page.exact_only = Some(exact);

    let runtime = Builder::new_current_thread().enable_all().build()?;
    runtime.block_on(search.run_search(&mut page));

    if let Some((article, section)) = selection {
        if select_section(&mut page, &mut viewport, article, section).is_none() {
            return Err(format!("No section {} of article {}", section + 1, article + 1).into());
        }
    }

    if as_json {
        let payload = json!({ "page": page, "viewport": viewport });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        print_page(&page);
    }
    Ok(())
}

fn handle_interactive(config: ClientConfig, as_json: bool) -> Result<(), Box<dyn Error>> {
    let store = open_store(&config);
    let prefs = PreferenceStore::new(store.as_ref());
    let search = SearchOrchestrator::from_config(HttpTransport::new(), &config);
    let runtime = Builder::new_current_thread().enable_all().build()?;

    let mut page = Page::new();
    let mut viewport = Viewport::with_search_focus();
    prefs.init(&mut page);
    println!("Type a search term and press Enter. `:help` lists commands.");

    let stdin = io::stdin();
    loop {
        print!("search> ");
        io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim_end_matches(['\r', '\n']);
        let Some(command) = line.strip_prefix(':') else {
            page.search_input = line.to_string();
            focus_search_field(&mut viewport);
            runtime.block_on(search.handle_key(&mut page, viewport.focused, Key::Enter));
            emit(&page, &viewport, as_json)?;
            continue;
        };
        let mut parts = command.split_whitespace();
        match (parts.next(), parts.next()) {
            (Some("quit" | "q"), _) => break,
            (Some("help"), _) => print_help(),
            (Some("open"), Some(position)) => match parse_position(position) {
                Ok((article, section)) => {
                    if select_section(&mut page, &mut viewport, article, section).is_none() {
                        println!("No such section: {position}");
                    }
                    emit(&page, &viewport, as_json)?;
                }
                Err(err) => println!("{err}"),
            },
            (Some("article"), Some(index)) => {
                let opened = index
                    .parse::<usize>()
                    .ok()
                    .filter(|n| *n > 0)
                    .is_some_and(|n| open_article(&page, &mut viewport, n - 1));
                if opened {
                    print_opened(&mut viewport);
                } else {
                    println!("No such article: {index}");
                }
            }
            (Some("full"), _) => {
                if DetailRenderer::open_full_article(&page, &mut viewport) {
                    print_opened(&mut viewport);
                } else {
                    println!("No section is open.");
                }
            }
            (Some("top"), _) => {
                DetailRenderer::scroll_to_top(&mut page, &mut viewport);
                println!("Scrolled to top; focus on {}.", focus_label(&viewport));
            }
            (Some("exact"), _) => {
                let next = !page.exact_only_checked();
                page.exact_only = Some(next);
                println!("Exact matches only: {next}");
            }
            (Some("theme"), _) => {
                let theme = prefs.toggle_theme(&mut page);
                println!("Theme: {theme}");
            }
            (Some("bigger"), _) => println!("Text size: {}", prefs.increase_text(&mut page)),
            (Some("smaller"), _) => println!("Text size: {}", prefs.decrease_text(&mut page)),
            (Some("reset"), _) => println!("Text size: {}", prefs.reset_text(&mut page)),
            _ => println!("Unknown command `:{command}`. Try `:help`."),
        }
    }
    Ok(())
}

fn handle_theme(
    config: &ClientConfig,
    action: Option<String>,
    as_json: bool,
) -> Result<(), Box<dyn Error>> {
    let store = open_store(config);
    let prefs = PreferenceStore::new(store.as_ref());
    let mut page = Page::new();
    prefs.init(&mut page);
    let theme = match action.as_deref() {
        None => sectionscope::prefs::current_theme(&page),
        Some("toggle") => prefs.toggle_theme(&mut page),
        Some(name) => {
            let theme: Theme = name.parse()?;
            prefs.set_theme(&mut page, theme);
            theme
        }
    };
    print_preferences(&page, theme.as_str(), as_json)
}

fn handle_font(config: &ClientConfig, action: &str, as_json: bool) -> Result<(), Box<dyn Error>> {
    let store = open_store(config);
    let prefs = PreferenceStore::new(store.as_ref());
    let mut page = Page::new();
    prefs.init(&mut page);
    let size = match action {
        "increase" | "+" => prefs.increase_text(&mut page),
        "decrease" | "-" => prefs.decrease_text(&mut page),
        "reset" => prefs.reset_text(&mut page),
        name => {
            // Validate here so a typo is reported instead of silently applying medium.
            let size: sectionscope::FontSize = name.parse()?;
            prefs.apply_font_size(&mut page, size.as_str())
        }
    };
    print_preferences(&page, size.as_str(), as_json)
}

#[cfg(feature = "web")]
fn handle_serve(
    config: ClientConfig,
    addr: std::net::SocketAddr,
    base_url: Option<String>,
) -> Result<(), Box<dyn Error>> {
    use sectionscope::web::{WebConfig, serve};

    let base_url = base_url.unwrap_or_else(|| format!("http://{addr}"));
    let web_config = WebConfig {
        addr,
        endpoint: config.endpoint,
        base_url,
    };
    let runtime = Builder::new_multi_thread().enable_all().build()?;
    runtime.block_on(serve(web_config))?;
    Ok(())
}

/// Parses `A.S` (1-based) into zero-based article and section indices.
fn parse_position(raw: &str) -> Result<(usize, usize), String> {
    let (article, section) = raw
        .split_once('.')
        .ok_or_else(|| format!("Expected ARTICLE.SECTION, got {raw:?}"))?;
    let parse = |value: &str| {
        value
            .trim()
            .parse::<usize>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| format!("Invalid position {raw:?}: indices start at 1"))
    };
    Ok((parse(article)? - 1, parse(section)? - 1))
}

/// Typing into the field focuses it, so Enter reaches the search handler.
fn focus_search_field<N: Navigator>(nav: &mut N) {
    if let Err(err) = nav.focus(ElementId::SearchInput) {
        warn!(error = %err, "could not focus the search field");
    }
}

fn emit(page: &Page, viewport: &Viewport, as_json: bool) -> Result<(), Box<dyn Error>> {
    if as_json {
        let payload = json!({ "page": page, "viewport": viewport });
        println!("{}", serde_json::to_string(&payload)?);
    } else {
        print_page(page);
    }
    Ok(())
}

fn print_help() {
    println!("  <term>        search for <term>");
    println!("  :open A.S     show section S of article A");
    println!("  :article A    open article A");
    println!("  :full         open the article of the detail view");
    println!("  :top          scroll to top");
    println!("  :exact        toggle exact matches only");
    println!("  :theme        toggle light/dark");
    println!("  :bigger :smaller :reset   change text size");
    println!("  :quit");
}

fn print_opened(viewport: &mut Viewport) {
    for url in viewport.take_opened() {
        println!("Open in new window: {url}");
    }
}

fn focus_label(viewport: &Viewport) -> &'static str {
    viewport
        .focused
        .map(|id| id.dom_id())
        .unwrap_or("nothing")
}

fn print_preferences(page: &Page, value: &str, as_json: bool) -> Result<(), Box<dyn Error>> {
    if as_json {
        let payload = json!({
            "value": value,
            "body_classes": page.body_classes,
            "root_font_size": page.root_font_size,
            "theme_toggle": page.theme_toggle,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        println!("{value}");
        if let Some(label) = page.theme_toggle.as_deref() {
            println!("Theme toggle: {label}");
        }
        if let Some(size) = page.root_font_size.as_deref() {
            println!("Root font size: {size}");
        }
    }
    Ok(())
}

fn print_page(page: &Page) {
    if let Some(summary) = page.summary().filter(|s| !s.is_empty()) {
        println!("{summary}");
    }
    match &page.results {
        ResultsArea::Text(text) => {
            if !text.is_empty() && Some(text.as_str()) != page.summary() {
                println!("{text}");
            }
        }
        ResultsArea::List(entries) => {
            let width = entries.len().to_string().len();
            for (idx, entry) in entries.iter().enumerate() {
                println!(
                    "{:>width$}. {}  <{}>  {}",
                    idx + 1,
                    entry.link.label,
                    entry.link.href,
                    entry.meta,
                    width = width
                );
                if entry.buttons.is_empty() {
                    continue;
                }
                let buttons = entry
                    .buttons
                    .iter()
                    .enumerate()
                    .map(|(s, button)| {
                        let mark = if button.highlighted { '*' } else { ' ' };
                        format!("[{mark}{}.{} {}]", idx + 1, s + 1, button.label)
                    })
                    .collect::<Vec<_>>();
                println!("{:width$}  {}", "", buttons.join(" "), width = width);
            }
        }
    }
    if let Some(view) = page.detail() {
        print_detail(view);
    }
}

fn print_detail(view: &DetailView) {
    println!();
    if stdout_is_tty() {
        let skin = markdown_skin();
        let heading = format!(
            "## {}\n### {}",
            escape_markdown(&view.heading),
            escape_markdown(&view.section_heading)
        );
        let formatted = FmtText::from(&skin, &heading, Some(markdown_width()));
        print!("{formatted}");
    } else {
        println!("{}", view.heading);
        println!("{}", view.section_heading);
    }
    println!("#{}", view.id);
    let body = view.body.trim();
    if !body.is_empty() {
        println!("\n{body}");
    }
    println!("\n[Open full article: {}]  [Scroll to top]", view.open_href);
}

fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, '*' | '_' | '`' | '#' | '[' | ']' | '|' | '~') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

fn stdout_is_tty() -> bool {
    atty::is(Stream::Stdout)
}

fn markdown_width() -> usize {
    let (width, _) = terminal_size();
    width.max(60) as usize
}

fn markdown_skin() -> MadSkin {
    MadSkin::default()
}
