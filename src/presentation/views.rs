use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;
use time::{Date, macros::format_description};

use crate::application::{
    contact::{ContactSubmission, FieldErrors, MESSAGE_MAX_CHARS},
    error::{ErrorReport, HttpError},
    feed::{BlogView, GalleryView, HomeView, PostView, SearchResults},
};
use crate::domain::{catalog::SortKey, posts::Post, types::Theme};

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;

        HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            public_message,
            &error,
        )
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_template",
            "Template rendering failed",
            err,
        )
        .into()
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

pub fn render_not_found_response(chrome: LayoutChrome) -> Response {
    render_error_page_response(chrome, ErrorPageView::not_found())
}

pub fn render_error_page_response(chrome: LayoutChrome, content: ErrorPageView) -> Response {
    let detail = content.message.clone();
    let view = LayoutContext::new(chrome, content);
    let mut response = render_template_response(ErrorTemplate { view }, StatusCode::NOT_FOUND);
    ErrorReport::from_message(
        "presentation::views::render_error_page_response",
        StatusCode::NOT_FOUND,
        detail,
    )
    .attach(&mut response);
    response
}

#[derive(Clone)]
pub struct NavigationView {
    pub entries: Vec<NavigationLinkView>,
}

#[derive(Clone)]
pub struct NavigationLinkView {
    pub label: String,
    pub href: String,
    pub is_active: bool,
}

#[derive(Clone)]
pub struct BrandView {
    pub title: String,
    pub tagline: String,
    pub href: String,
}

#[derive(Clone)]
pub struct FooterView {
    pub copy: String,
}

#[derive(Clone)]
pub struct PageMetaView {
    pub title: String,
    pub description: String,
    pub canonical: String,
}

/// Everything the base layout needs besides the page content: brand,
/// navigation, footer, meta, and the reader's theme preference.
#[derive(Clone)]
pub struct LayoutChrome {
    pub brand: BrandView,
    pub navigation: NavigationView,
    pub footer: FooterView,
    pub meta: PageMetaView,
    pub theme: Theme,
}

impl LayoutChrome {
    pub fn with_title(self, title: String) -> Self {
        Self {
            meta: PageMetaView { title, ..self.meta },
            ..self
        }
    }
}

#[derive(Clone)]
pub struct LayoutContext<T> {
    pub brand: BrandView,
    pub navigation: NavigationView,
    pub footer: FooterView,
    pub meta: PageMetaView,
    pub theme: Theme,
    pub content: T,
}

impl<T> LayoutContext<T> {
    pub fn new(chrome: LayoutChrome, content: T) -> Self {
        Self {
            brand: chrome.brand,
            navigation: chrome.navigation,
            footer: chrome.footer,
            meta: chrome.meta,
            theme: chrome.theme,
            content,
        }
    }
}

#[derive(Clone)]
pub struct PostCard {
    pub href: String,
    pub title: String,
    pub excerpt: String,
    pub category: String,
    pub tags: Vec<String>,
    pub iso_date: String,
    pub published: String,
    pub read_time: String,
    pub views: u64,
    pub thumbnail: String,
}

impl PostCard {
    pub fn from_post(post: &Post) -> Self {
        Self {
            href: format!("/post?slug={}", post.slug),
            title: post.title.clone(),
            excerpt: post.excerpt.clone(),
            category: post.category.clone(),
            tags: post.tags.clone(),
            iso_date: iso_date(post.date),
            published: display_date(post.date),
            read_time: post.read_time.clone(),
            views: post.views,
            thumbnail: post.thumbnail.clone(),
        }
    }
}

pub fn iso_date(date: Date) -> String {
    date.format(format_description!("[year]-[month]-[day]"))
        .unwrap_or_default()
}

pub fn display_date(date: Date) -> String {
    date.format(format_description!(
        "[month repr:short] [day padding:none], [year]"
    ))
    .unwrap_or_default()
}

pub struct HomeContext {
    pub latest: Vec<PostCard>,
    pub total_posts: usize,
}

impl HomeContext {
    pub fn from_view(view: &HomeView) -> Self {
        Self {
            latest: view.latest.iter().map(PostCard::from_post).collect(),
            total_posts: view.total_posts,
        }
    }
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub view: LayoutContext<HomeContext>,
}

#[derive(Clone)]
pub struct CategoryLink {
    pub label: String,
    pub href: String,
    pub is_active: bool,
}

#[derive(Clone)]
pub struct SortOption {
    pub value: &'static str,
    pub label: &'static str,
    pub is_selected: bool,
}

pub struct BlogContext {
    pub cards: Vec<PostCard>,
    pub categories: Vec<CategoryLink>,
    pub sort_options: Vec<SortOption>,
    pub category: String,
    pub query: String,
    pub shown: usize,
    pub total: usize,
    pub remaining: usize,
    pub load_more_href: Option<String>,
}

impl BlogContext {
    pub fn from_view(view: &BlogView) -> Self {
        let state = &view.state;
        let categories = view
            .categories
            .iter()
            .map(|category| CategoryLink {
                label: category.clone(),
                href: listing_href(category, state.sort(), 1, state.query()),
                is_active: category == state.category(),
            })
            .collect();

        let sort_options = [
            (SortKey::Newest, "Newest First"),
            (SortKey::Oldest, "Oldest First"),
            (SortKey::Popular, "Most Popular"),
            (SortKey::Title, "By Title"),
        ]
        .into_iter()
        .map(|(key, label)| SortOption {
            value: key.as_str(),
            label,
            is_selected: key == state.sort(),
        })
        .collect();

        let load_more_href = (view.remaining > 0).then(|| {
            listing_href(
                state.category(),
                state.sort(),
                state.page() + 1,
                state.query(),
            )
        });

        Self {
            cards: view.cards.iter().map(PostCard::from_post).collect(),
            categories,
            sort_options,
            category: state.category().to_string(),
            query: state.query().to_string(),
            shown: view.shown(),
            total: view.total,
            remaining: view.remaining,
            load_more_href,
        }
    }
}

/// Listing URL preserving the whole filter state. Default values are
/// omitted to keep the canonical listing at a bare `/blog`.
pub fn listing_href(category: &str, sort: SortKey, page: usize, query: &str) -> String {
    let mut href = String::from("/blog");
    let mut params: Vec<String> = Vec::new();
    if category != crate::domain::catalog::ALL_CATEGORIES {
        params.push(format!("category={}", urlencode(category)));
    }
    if sort != SortKey::default() {
        params.push(format!("sort={}", sort.as_str()));
    }
    if page > 1 {
        params.push(format!("page={page}"));
    }
    if !query.trim().is_empty() {
        params.push(format!("q={}", urlencode(query.trim())));
    }
    if !params.is_empty() {
        href.push('?');
        href.push_str(&params.join("&"));
    }
    href
}

/// Minimal query-component encoding for values we generate ourselves.
fn urlencode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char);
            }
            b' ' => out.push_str("%20"),
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

#[derive(Template)]
#[template(path = "blog.html")]
pub struct BlogTemplate {
    pub view: LayoutContext<BlogContext>,
}

pub struct PostNav {
    pub href: String,
    pub title: String,
}

pub struct PostContext {
    pub card: PostCard,
    pub body_html: Option<String>,
    pub language_label: String,
    pub other_language_code: String,
    pub other_language_label: String,
    pub related: Vec<PostCard>,
    pub previous: Option<PostNav>,
    pub next: Option<PostNav>,
}

impl PostContext {
    pub fn from_view(view: &PostView) -> Self {
        let other = view.language.other();
        Self {
            card: PostCard::from_post(&view.post),
            body_html: view.body.clone(),
            language_label: view.language.label().to_string(),
            other_language_code: other.code().to_string(),
            other_language_label: other.label().to_string(),
            related: view.related.iter().map(PostCard::from_post).collect(),
            previous: view.previous.as_ref().map(|p| PostNav {
                href: format!("/post?slug={}", p.slug),
                title: p.title.clone(),
            }),
            next: view.next.as_ref().map(|p| PostNav {
                href: format!("/post?slug={}", p.slug),
                title: p.title.clone(),
            }),
        }
    }
}

#[derive(Template)]
#[template(path = "post.html")]
pub struct PostTemplate {
    pub view: LayoutContext<PostContext>,
}

#[derive(Template)]
#[template(path = "about.html")]
pub struct AboutTemplate {
    pub view: LayoutContext<()>,
}

/// Contact page state: the (possibly re-rendered) form values, per-field
/// errors, and the outcome banner after a submit.
pub struct ContactContext {
    pub name: String,
    pub email: String,
    pub message: String,
    pub errors: FieldErrors,
    pub sent: bool,
    pub failure: Option<String>,
    pub message_max: usize,
}

impl ContactContext {
    pub fn blank() -> Self {
        Self {
            name: String::new(),
            email: String::new(),
            message: String::new(),
            errors: FieldErrors::default(),
            sent: false,
            failure: None,
            message_max: MESSAGE_MAX_CHARS,
        }
    }

    pub fn rejected(submission: &ContactSubmission, errors: FieldErrors) -> Self {
        Self {
            name: submission.name.clone(),
            email: submission.email.clone(),
            message: submission.message.clone(),
            errors,
            ..Self::blank()
        }
    }

    pub fn sent() -> Self {
        Self {
            sent: true,
            ..Self::blank()
        }
    }

    pub fn failed(submission: &ContactSubmission, message: String) -> Self {
        Self {
            name: submission.name.clone(),
            email: submission.email.clone(),
            message: submission.message.clone(),
            failure: Some(message),
            ..Self::blank()
        }
    }
}

#[derive(Template)]
#[template(path = "contact.html")]
pub struct ContactTemplate {
    pub view: LayoutContext<ContactContext>,
}

pub struct GalleryTileView {
    pub id: u32,
    pub title: String,
    pub description: String,
    pub image: String,
    pub prev_id: u32,
    pub next_id: u32,
}

pub struct GalleryVideoView {
    pub title: String,
    pub description: String,
    pub embed_url: String,
    pub thumbnail: String,
}

pub struct GalleryContext {
    pub tiles: Vec<GalleryTileView>,
    pub videos: Vec<GalleryVideoView>,
}

impl GalleryContext {
    pub fn from_view(view: &GalleryView) -> Self {
        Self {
            tiles: view
                .cards
                .iter()
                .map(|card| GalleryTileView {
                    id: card.photo.id,
                    title: card.photo.title.clone(),
                    description: card.photo.description.clone(),
                    image: card.photo.image.clone(),
                    prev_id: card.prev_id,
                    next_id: card.next_id,
                })
                .collect(),
            videos: view
                .videos
                .iter()
                .map(|video| GalleryVideoView {
                    title: video.title.clone(),
                    description: video.description.clone(),
                    embed_url: format!("https://www.youtube.com/embed/{}", video.video_id),
                    thumbnail: video.thumbnail.clone(),
                })
                .collect(),
        }
    }
}

#[derive(Template)]
#[template(path = "gallery.html")]
pub struct GalleryTemplate {
    pub view: LayoutContext<GalleryContext>,
}

pub struct SearchContext {
    pub query: String,
    pub results: SearchResultsView,
}

pub enum SearchResultsView {
    EmptyQuery,
    Matches {
        cards: Vec<PostCard>,
        total: usize,
        overflow: usize,
    },
}

impl SearchContext {
    pub fn from_results(query: &str, results: &SearchResults) -> Self {
        let view = match results {
            SearchResults::EmptyQuery => SearchResultsView::EmptyQuery,
            SearchResults::Matches { visible, total } => SearchResultsView::Matches {
                cards: visible.iter().map(PostCard::from_post).collect(),
                total: *total,
                overflow: results.overflow(),
            },
        };
        Self {
            query: query.trim().to_string(),
            results: view,
        }
    }
}

#[derive(Template)]
#[template(path = "search.html")]
pub struct SearchTemplate {
    pub view: LayoutContext<SearchContext>,
}

pub struct ErrorPageView {
    pub title: String,
    pub message: String,
    pub primary_action: Option<ErrorAction>,
}

impl ErrorPageView {
    pub fn not_found() -> Self {
        Self {
            title: "Page Not Found".to_string(),
            message: "The page you requested does not exist. Try returning to the homepage to continue exploring.".to_string(),
            primary_action: Some(ErrorAction::home()),
        }
    }

    pub fn missing_post_selection() -> Self {
        Self {
            title: "No Post Selected".to_string(),
            message: "No post was specified. Pick one from the blog listing.".to_string(),
            primary_action: Some(ErrorAction::blog()),
        }
    }

    pub fn unknown_post() -> Self {
        Self {
            title: "Post Not Found".to_string(),
            message: "That post does not exist or has been removed.".to_string(),
            primary_action: Some(ErrorAction::blog()),
        }
    }
}

pub struct ErrorAction {
    pub href: String,
    pub label: String,
}

impl ErrorAction {
    pub fn home() -> Self {
        Self {
            href: "/".to_string(),
            label: "Back to home".to_string(),
        }
    }

    pub fn blog() -> Self {
        Self {
            href: "/blog".to_string(),
            label: "Browse the blog".to_string(),
        }
    }
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub view: LayoutContext<ErrorPageView>,
}
