//! Page assembly over the loaded content snapshot.
//!
//! Each method takes the current [`SiteContent`] generation, runs the
//! domain pipeline, and returns an owned view model the templates render
//! directly. Fragment bodies are the only per-request I/O.

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::domain::{
    catalog::{self, ALL_CATEGORIES, FilterState, SearchOutcome},
    gallery::{Lightbox, Photo, Video},
    posts::Post,
    types::Language,
};
use crate::infra::store::{SiteStore, StoreError};

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("unknown post `{slug}`")]
    UnknownPost { slug: String },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Limits applied when assembling pages. Loaded from configuration.
#[derive(Debug, Clone, Copy)]
pub struct FeedLimits {
    pub page_size: usize,
    pub home_posts: usize,
    pub related_posts: usize,
}

impl Default for FeedLimits {
    fn default() -> Self {
        Self {
            page_size: 9,
            home_posts: 3,
            related_posts: 3,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HomeView {
    pub latest: Vec<Post>,
    pub total_posts: usize,
}

#[derive(Debug, Clone)]
pub struct BlogView {
    pub cards: Vec<Post>,
    /// `All` followed by categories in catalog first-appearance order.
    pub categories: Vec<String>,
    pub state: FilterState,
    pub total: usize,
    pub remaining: usize,
}

impl BlogView {
    pub fn shown(&self) -> usize {
        self.cards.len()
    }

    pub fn has_more(&self) -> bool {
        self.remaining > 0
    }
}

/// Slim reference for previous/next navigation.
#[derive(Debug, Clone)]
pub struct PostRef {
    pub slug: String,
    pub title: String,
}

#[derive(Debug, Clone)]
pub struct PostView {
    pub post: Post,
    /// Rendered body for the selected language, or `None` when no fragment
    /// exists for it.
    pub body: Option<String>,
    pub language: Language,
    pub related: Vec<Post>,
    pub previous: Option<PostRef>,
    pub next: Option<PostRef>,
}

/// Owned mirror of [`SearchOutcome`], capped for display.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchResults {
    EmptyQuery,
    Matches { visible: Vec<Post>, total: usize },
}

impl SearchResults {
    pub fn overflow(&self) -> usize {
        match self {
            SearchResults::EmptyQuery => 0,
            SearchResults::Matches { visible, total } => total - visible.len(),
        }
    }
}

/// One gallery tile with its precomputed lightbox neighbors.
#[derive(Debug, Clone)]
pub struct GalleryCard {
    pub photo: Photo,
    pub prev_id: u32,
    pub next_id: u32,
}

#[derive(Debug, Clone)]
pub struct GalleryView {
    pub cards: Vec<GalleryCard>,
    pub videos: Vec<Video>,
}

pub struct FeedService {
    store: Arc<SiteStore>,
    limits: FeedLimits,
}

impl FeedService {
    pub fn new(store: Arc<SiteStore>, limits: FeedLimits) -> Self {
        Self { store, limits }
    }

    pub fn store(&self) -> &Arc<SiteStore> {
        &self.store
    }

    pub fn limits(&self) -> FeedLimits {
        self.limits
    }

    /// Home page: the newest posts, independent of any filter state.
    pub async fn home(&self) -> HomeView {
        let content = self.store.snapshot().await;
        let mut latest: Vec<&Post> = content.catalog.posts().iter().collect();
        catalog::sort_posts(&mut latest, catalog::SortKey::Newest);
        latest.truncate(self.limits.home_posts);

        HomeView {
            latest: latest.into_iter().cloned().collect(),
            total_posts: content.catalog.len(),
        }
    }

    /// Blog listing for a filter state parsed from the request.
    pub async fn blog(&self, state: FilterState) -> BlogView {
        let content = self.store.snapshot().await;
        let slice = catalog::view_slice(&content.catalog, &state, self.limits.page_size);

        let mut categories = vec![ALL_CATEGORIES.to_string()];
        for post in content.catalog.posts() {
            if !categories.iter().any(|c| c == &post.category) {
                categories.push(post.category.clone());
            }
        }

        BlogView {
            total: slice.total,
            remaining: slice.remaining(),
            cards: slice.posts.into_iter().cloned().collect(),
            categories,
            state,
        }
    }

    /// Full post page: body fragment for the selected language, related
    /// posts, and previous/next neighbors in catalog order.
    pub async fn post(&self, slug: &str, language: Language) -> Result<PostView, FeedError> {
        let content = self.store.snapshot().await;
        let index = content
            .catalog
            .position_of(slug)
            .ok_or_else(|| FeedError::UnknownPost {
                slug: slug.to_string(),
            })?;
        let posts = content.catalog.posts();
        let post = posts[index].clone();

        let body = self.store.fragment(slug, language).await?;
        if body.is_none() {
            debug!(
                target = "brezza::feed",
                slug,
                language = language.code(),
                "post body fragment missing"
            );
        }

        let related = related_posts(posts, &post, self.limits.related_posts);
        let previous = index.checked_sub(1).map(|i| post_ref(&posts[i]));
        let next = posts.get(index + 1).map(post_ref);

        Ok(PostView {
            post,
            body,
            language,
            related,
            previous,
            next,
        })
    }

    pub async fn search(&self, query: &str) -> SearchResults {
        let content = self.store.snapshot().await;
        match catalog::search(&content.catalog, query) {
            SearchOutcome::EmptyQuery => SearchResults::EmptyQuery,
            SearchOutcome::Matches { visible, total } => SearchResults::Matches {
                visible: visible.into_iter().cloned().collect(),
                total,
            },
        }
    }

    /// Gallery page with lightbox neighbors baked into each tile, so the
    /// client needs no catalog knowledge to step through photos.
    pub async fn gallery(&self) -> GalleryView {
        let content = self.store.snapshot().await;
        let lightbox = Lightbox::new(content.photos.clone());

        let cards = lightbox
            .photos()
            .iter()
            .enumerate()
            .filter_map(|(index, photo)| {
                let (prev, next) = lightbox.neighbors_of(index)?;
                Some(GalleryCard {
                    photo: photo.clone(),
                    prev_id: lightbox.photos()[prev].id,
                    next_id: lightbox.photos()[next].id,
                })
            })
            .collect();

        GalleryView {
            cards,
            videos: content.videos.clone(),
        }
    }
}

/// Same-category companions excluding the post itself; when the category
/// has no other members, fall back to the newest posts overall.
fn related_posts(posts: &[Post], current: &Post, limit: usize) -> Vec<Post> {
    let same_category: Vec<&Post> = posts
        .iter()
        .filter(|p| p.category == current.category && p.slug != current.slug)
        .collect();

    let picked = if same_category.is_empty() {
        let mut latest: Vec<&Post> = posts.iter().filter(|p| p.slug != current.slug).collect();
        catalog::sort_posts(&mut latest, catalog::SortKey::Newest);
        latest
    } else {
        same_category
    };

    picked.into_iter().take(limit).cloned().collect()
}

fn post_ref(post: &Post) -> PostRef {
    PostRef {
        slug: post.slug.clone(),
        title: post.title.clone(),
    }
}
