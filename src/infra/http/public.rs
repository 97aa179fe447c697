use std::{io::ErrorKind, sync::Arc};

use axum::{
    Form, Router,
    body::Body,
    extract::{Path, Query, State},
    http::{
        HeaderMap, HeaderValue, Request, StatusCode,
        header::{CACHE_CONTROL, CONTENT_TYPE, LOCATION, SET_COOKIE},
    },
    middleware,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;
use tracing::error;

use crate::{
    application::{
        contact::{ContactError, ContactService, ContactSubmission},
        error::{ErrorReport, HttpError},
        feed::FeedService,
    },
    config::SiteSettings,
    domain::{
        catalog::{FilterState, SortKey},
        types::{Language, Theme},
    },
    infra::store::StoreError,
    presentation::views::{
        AboutTemplate, BlogContext, BlogTemplate, BrandView, ContactContext, ContactTemplate,
        ErrorPageView, FooterView, GalleryContext, GalleryTemplate, HomeContext, IndexTemplate,
        LayoutChrome, LayoutContext, NavigationLinkView, NavigationView, PageMetaView,
        PostContext, PostTemplate, SearchContext, SearchTemplate, render_error_page_response,
        render_not_found_response, render_template_response,
    },
    util::prefs::{LANGUAGE_COOKIE, Preferences, THEME_COOKIE, set_cookie_value},
};

use super::middleware::{log_responses, set_request_context};

#[derive(Clone)]
pub struct HttpState {
    pub feed: Arc<FeedService>,
    pub contact: Arc<ContactService>,
    pub site: Arc<SiteSettings>,
}

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/blog", get(blog))
        .route("/post", get(post_detail))
        .route("/about", get(about))
        .route("/contact", get(contact_form).post(contact_submit))
        .route("/gallery", get(gallery))
        .route("/search", get(search))
        .route("/prefs", axum::routing::post(set_preferences))
        .route("/_health", get(health))
        .route("/static/{*path}", get(serve_static))
        .fallback(fallback)
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

/// Layout chrome for a page: brand, navigation with the active entry
/// marked, footer, and meta seeded from site settings.
fn chrome(site: &SiteSettings, prefs: Preferences, active: &str, path: &str) -> LayoutChrome {
    let entries = [
        ("Home", "/"),
        ("Blog", "/blog"),
        ("Gallery", "/gallery"),
        ("About", "/about"),
        ("Contact", "/contact"),
    ]
    .into_iter()
    .map(|(label, href)| NavigationLinkView {
        label: label.to_string(),
        href: href.to_string(),
        is_active: href == active,
    })
    .collect();

    let canonical = match site.base_url.as_deref() {
        Some(base) => format!("{base}{path}"),
        None => path.to_string(),
    };

    LayoutChrome {
        brand: BrandView {
            title: site.title.clone(),
            tagline: site.tagline.clone(),
            href: "/".to_string(),
        },
        navigation: NavigationView { entries },
        footer: FooterView {
            copy: site.footer.clone(),
        },
        meta: PageMetaView {
            title: site.title.clone(),
            description: site.tagline.clone(),
            canonical,
        },
        theme: prefs.theme,
    }
}

async fn index(State(state): State<HttpState>, headers: HeaderMap) -> Response {
    let prefs = Preferences::from_headers(&headers);
    let chrome = chrome(&state.site, prefs, "/", "/");

    let content = HomeContext::from_view(&state.feed.home().await);
    let view = LayoutContext::new(chrome, content);
    render_template_response(IndexTemplate { view }, StatusCode::OK)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct BlogQuery {
    category: Option<String>,
    sort: Option<String>,
    page: Option<usize>,
    q: Option<String>,
}

impl BlogQuery {
    fn filter_state(&self) -> FilterState {
        let mut state = FilterState::new();
        if let Some(category) = self.category.as_deref() {
            state.set_category(category);
        }
        if let Some(sort) = self.sort.as_deref() {
            state.set_sort(SortKey::parse_or_default(sort));
        }
        if let Some(page) = self.page {
            state.set_page(page);
        }
        if let Some(query) = self.q.as_deref() {
            state.set_query(query);
        }
        state
    }
}

async fn blog(
    State(state): State<HttpState>,
    headers: HeaderMap,
    Query(query): Query<BlogQuery>,
) -> Response {
    let prefs = Preferences::from_headers(&headers);
    let chrome = chrome(&state.site, prefs, "/blog", "/blog")
        .with_title(format!("Blog · {}", state.site.title));

    let view = state.feed.blog(query.filter_state()).await;
    let content = BlogContext::from_view(&view);
    let view = LayoutContext::new(chrome, content);
    render_template_response(BlogTemplate { view }, StatusCode::OK)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PostQuery {
    slug: Option<String>,
    lang: Option<String>,
}

async fn post_detail(
    State(state): State<HttpState>,
    headers: HeaderMap,
    Query(query): Query<PostQuery>,
) -> Response {
    let prefs = Preferences::from_headers(&headers);

    let Some(slug) = query.slug.as_deref().filter(|s| !s.is_empty()) else {
        let chrome = chrome(&state.site, prefs, "/blog", "/post");
        return render_error_page_response(chrome, ErrorPageView::missing_post_selection());
    };

    // An explicit `lang` in the URL wins over the cookie preference.
    let language = query
        .lang
        .as_deref()
        .and_then(Language::parse)
        .unwrap_or(prefs.language);

    match state.feed.post(slug, language).await {
        Ok(view) => {
            let path = format!("/post?slug={slug}");
            let chrome = chrome(&state.site, prefs, "/blog", &path)
                .with_title(format!("{} · {}", view.post.title, state.site.title));
            let content = PostContext::from_view(&view);
            let view = LayoutContext::new(chrome, content);
            render_template_response(PostTemplate { view }, StatusCode::OK)
        }
        Err(crate::application::feed::FeedError::UnknownPost { .. }) => {
            let chrome = chrome(&state.site, prefs, "/blog", "/post");
            render_error_page_response(chrome, ErrorPageView::unknown_post())
        }
        Err(err) => HttpError::from(err).into_response(),
    }
}

async fn about(State(state): State<HttpState>, headers: HeaderMap) -> Response {
    let prefs = Preferences::from_headers(&headers);
    let chrome = chrome(&state.site, prefs, "/about", "/about")
        .with_title(format!("About · {}", state.site.title));
    let view = LayoutContext::new(chrome, ());
    render_template_response(AboutTemplate { view }, StatusCode::OK)
}

async fn contact_form(State(state): State<HttpState>, headers: HeaderMap) -> Response {
    let prefs = Preferences::from_headers(&headers);
    let chrome = chrome(&state.site, prefs, "/contact", "/contact")
        .with_title(format!("Contact · {}", state.site.title));
    let view = LayoutContext::new(chrome, ContactContext::blank());
    render_template_response(ContactTemplate { view }, StatusCode::OK)
}

async fn contact_submit(
    State(state): State<HttpState>,
    headers: HeaderMap,
    Form(submission): Form<ContactSubmission>,
) -> Response {
    const SOURCE: &str = "infra::http::public::contact_submit";

    let prefs = Preferences::from_headers(&headers);
    let chrome = chrome(&state.site, prefs, "/contact", "/contact")
        .with_title(format!("Contact · {}", state.site.title));

    if let Err(errors) = submission.validate() {
        let content = ContactContext::rejected(&submission, errors);
        let view = LayoutContext::new(chrome, content);
        let mut response = render_template_response(
            ContactTemplate { view },
            StatusCode::UNPROCESSABLE_ENTITY,
        );
        ErrorReport::from_message(
            SOURCE,
            StatusCode::UNPROCESSABLE_ENTITY,
            "contact submission failed validation",
        )
        .attach(&mut response);
        return response;
    }

    match state.contact.submit(&submission).await {
        Ok(()) => {
            let view = LayoutContext::new(chrome, ContactContext::sent());
            render_template_response(ContactTemplate { view }, StatusCode::OK)
        }
        Err(err) => {
            let (status, message) = match &err {
                ContactError::NotConfigured => (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "The contact form is not set up yet. Please try again later.".to_string(),
                ),
                ContactError::Rejected { message } => {
                    (StatusCode::BAD_GATEWAY, message.clone())
                }
                ContactError::Relay(_) => (
                    StatusCode::BAD_GATEWAY,
                    "The message could not be sent. Please try again later.".to_string(),
                ),
            };
            let content = ContactContext::failed(&submission, message);
            let view = LayoutContext::new(chrome, content);
            let mut response = render_template_response(ContactTemplate { view }, status);
            ErrorReport::from_error(SOURCE, status, &err).attach(&mut response);
            response
        }
    }
}

async fn gallery(State(state): State<HttpState>, headers: HeaderMap) -> Response {
    let prefs = Preferences::from_headers(&headers);
    let chrome = chrome(&state.site, prefs, "/gallery", "/gallery")
        .with_title(format!("Gallery · {}", state.site.title));
    let content = GalleryContext::from_view(&state.feed.gallery().await);
    let view = LayoutContext::new(chrome, content);
    render_template_response(GalleryTemplate { view }, StatusCode::OK)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SearchQuery {
    q: Option<String>,
}

async fn search(
    State(state): State<HttpState>,
    headers: HeaderMap,
    Query(query): Query<SearchQuery>,
) -> Response {
    let prefs = Preferences::from_headers(&headers);
    let chrome = chrome(&state.site, prefs, "/blog", "/search")
        .with_title(format!("Search · {}", state.site.title));

    let q = query.q.as_deref().unwrap_or_default();
    let results = state.feed.search(q).await;
    let content = SearchContext::from_results(q, &results);
    let view = LayoutContext::new(chrome, content);
    render_template_response(SearchTemplate { view }, StatusCode::OK)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PrefsForm {
    theme: Option<String>,
    language: Option<String>,
    redirect: Option<String>,
}

/// Persist theme/language preferences in cookies and bounce back to the
/// page the form was on. Only same-site redirect targets are honored.
async fn set_preferences(Form(form): Form<PrefsForm>) -> Response {
    let mut response = StatusCode::SEE_OTHER.into_response();

    let redirect = form
        .redirect
        .as_deref()
        .filter(|target| target.starts_with('/') && !target.starts_with("//"))
        .unwrap_or("/");
    if let Ok(location) = HeaderValue::from_str(redirect) {
        response.headers_mut().insert(LOCATION, location);
    } else {
        response
            .headers_mut()
            .insert(LOCATION, HeaderValue::from_static("/"));
    }

    if let Some(theme) = form.theme.as_deref().and_then(Theme::parse) {
        append_cookie(&mut response, THEME_COOKIE, theme.as_str());
    }
    if let Some(language) = form.language.as_deref().and_then(Language::parse) {
        append_cookie(&mut response, LANGUAGE_COOKIE, language.code());
    }

    response
}

fn append_cookie(response: &mut Response, name: &str, value: &str) {
    if let Ok(header) = HeaderValue::from_str(&set_cookie_value(name, value)) {
        response.headers_mut().append(SET_COOKIE, header);
    }
}

async fn health() -> Response {
    StatusCode::NO_CONTENT.into_response()
}

async fn serve_static(State(state): State<HttpState>, Path(path): Path<String>) -> Response {
    const SOURCE: &str = "infra::http::public::serve_static";

    match state.feed.store().static_asset(&path).await {
        Ok(Some(bytes)) => {
            let mime = mime_guess::from_path(&path).first_or_octet_stream();
            let mut response = (StatusCode::OK, bytes).into_response();
            if let Ok(content_type) = HeaderValue::from_str(mime.as_ref()) {
                response.headers_mut().insert(CONTENT_TYPE, content_type);
            }
            response.headers_mut().insert(
                CACHE_CONTROL,
                HeaderValue::from_static("public, max-age=3600"),
            );
            response
        }
        Ok(None) | Err(StoreError::InvalidPath) => HttpError::new(
            SOURCE,
            StatusCode::NOT_FOUND,
            "Asset not found",
            "The requested asset is not available",
        )
        .into_response(),
        Err(StoreError::Io { ref source, .. }) if source.kind() == ErrorKind::NotFound => {
            HttpError::new(
                SOURCE,
                StatusCode::NOT_FOUND,
                "Asset not found",
                "The requested asset is not available",
            )
            .into_response()
        }
        Err(err) => {
            error!(
                target = "brezza::http::static",
                path = %path,
                error = %err,
                "failed to read static asset"
            );
            HttpError::new(
                SOURCE,
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to read asset",
                err.to_string(),
            )
            .into_response()
        }
    }
}

async fn fallback(State(state): State<HttpState>, request: Request<Body>) -> Response {
    let prefs = Preferences::from_headers(request.headers());
    let chrome = chrome(&state.site, prefs, "", request.uri().path());
    render_not_found_response(chrome)
}
