//! Disk-backed content store.
//!
//! The content root holds everything the site serves: `posts.json` (the
//! post index), `gallery.json`, per-post HTML fragments under
//! `blog-posts/`, and verbatim files under `static/`. The indexes are
//! loaded into an immutable snapshot swapped in atomically; a load failure
//! degrades to empty content so every page still renders its empty state.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use metrics::counter;
use serde::Deserialize;
use thiserror::Error;
use tokio::{fs, sync::RwLock};
use tracing::{info, warn};

use crate::domain::{
    error::DomainError,
    gallery::{Photo, Video},
    posts::{Catalog, Post},
    types::Language,
};

pub const POST_INDEX_FILE: &str = "posts.json";
pub const GALLERY_INDEX_FILE: &str = "gallery.json";
const FRAGMENT_DIR: &str = "blog-posts";
const STATIC_DIR: &str = "static";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read `{path}`: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse `{path}`: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("invalid content path")]
    InvalidPath,
}

#[derive(Debug, Default, Deserialize)]
struct PostIndex {
    #[serde(default)]
    posts: Vec<Post>,
}

#[derive(Debug, Default, Deserialize)]
struct GalleryIndex {
    #[serde(default)]
    photos: Vec<Photo>,
    #[serde(default)]
    videos: Vec<Video>,
}

/// One immutable generation of loaded site content.
#[derive(Debug, Clone, Default)]
pub struct SiteContent {
    pub catalog: Catalog,
    pub photos: Vec<Photo>,
    pub videos: Vec<Video>,
}

/// Content store with generation-tokened reloads.
///
/// Reloads can overlap (a second reload may start before the first finishes
/// reading); each reload captures a token up front and only the result
/// belonging to the newest token is installed. Stale results are discarded.
pub struct SiteStore {
    root: PathBuf,
    content: RwLock<Arc<SiteContent>>,
    generation: AtomicU64,
}

impl SiteStore {
    /// Load the store at startup. A failed read logs a warning and serves
    /// empty content rather than refusing to start.
    pub async fn load(root: PathBuf) -> Arc<Self> {
        let store = Arc::new(Self {
            root,
            content: RwLock::new(Arc::new(SiteContent::default())),
            generation: AtomicU64::new(0),
        });
        store.reload().await;
        store
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The current content generation; cheap to clone, immutable.
    pub async fn snapshot(&self) -> Arc<SiteContent> {
        self.content.read().await.clone()
    }

    /// Read the indexes and install them if no newer reload started in the
    /// meantime. Returns whether the result was installed.
    pub async fn reload(&self) -> bool {
        let token = self.begin_reload();
        let content = match Self::inspect(&self.root).await {
            Ok(content) => content,
            Err(err) => {
                counter!("brezza_content_load_error_total").increment(1);
                warn!(
                    target = "brezza::store",
                    root = %self.root.display(),
                    error = %err,
                    "content load failed; serving empty catalog"
                );
                SiteContent::default()
            }
        };
        self.install(token, content).await
    }

    /// Reserve a reload token. Exposed separately from [`Self::install`] so
    /// overlapping reloads are testable without racing real I/O.
    pub fn begin_reload(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Install content for a previously reserved token. A token that is no
    /// longer the newest loses the race and the content is dropped.
    pub async fn install(&self, token: u64, content: SiteContent) -> bool {
        if self.generation.load(Ordering::SeqCst) != token {
            counter!("brezza_content_reload_stale_total").increment(1);
            warn!(
                target = "brezza::store",
                token, "discarding stale content reload"
            );
            return false;
        }

        info!(
            target = "brezza::store",
            posts = content.catalog.len(),
            photos = content.photos.len(),
            videos = content.videos.len(),
            "content installed"
        );
        counter!("brezza_content_reload_total").increment(1);
        *self.content.write().await = Arc::new(content);
        true
    }

    /// Read and validate the content root without touching any store state.
    /// Used by reloads and by the `check` subcommand, where errors must
    /// surface instead of degrading.
    pub async fn inspect(root: &Path) -> Result<SiteContent, StoreError> {
        let post_index: PostIndex = read_json(&root.join(POST_INDEX_FILE)).await?;
        let catalog = Catalog::new(post_index.posts)?;

        // The gallery index is optional; many installs never add one.
        let gallery_path = root.join(GALLERY_INDEX_FILE);
        let gallery: GalleryIndex = if fs::try_exists(&gallery_path).await.unwrap_or(false) {
            read_json(&gallery_path).await?
        } else {
            GalleryIndex::default()
        };

        Ok(SiteContent {
            catalog,
            photos: gallery.photos,
            videos: gallery.videos,
        })
    }

    /// Per-post HTML fragment for a slug and language. Absence is
    /// recoverable and reported as `None`.
    pub async fn fragment(
        &self,
        slug: &str,
        language: Language,
    ) -> Result<Option<String>, StoreError> {
        let name = format!("{slug}-{}.html", language.code());
        let path = self.resolve(Path::new(FRAGMENT_DIR), &name)?;
        match fs::read_to_string(&path).await {
            Ok(html) => Ok(Some(html)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                counter!("brezza_fragment_miss_total").increment(1);
                Ok(None)
            }
            Err(source) => Err(StoreError::Io { path, source }),
        }
    }

    /// Verbatim file under `static/`, for thumbnails and gallery images.
    pub async fn static_asset(&self, rel: &str) -> Result<Option<Bytes>, StoreError> {
        let path = self.resolve(Path::new(STATIC_DIR), rel)?;
        match fs::read(&path).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Io { path, source }),
        }
    }

    fn resolve(&self, dir: &Path, rel: &str) -> Result<PathBuf, StoreError> {
        let relative = Path::new(rel);
        if relative.is_absolute()
            || relative
                .components()
                .any(|component| matches!(component, Component::ParentDir | Component::Prefix(_)))
        {
            return Err(StoreError::InvalidPath);
        }
        Ok(self.root.join(dir).join(relative))
    }
}

async fn read_json<T>(path: &Path) -> Result<T, StoreError>
where
    T: serde::de::DeserializeOwned,
{
    let raw = fs::read(path).await.map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&raw).map_err(|source| StoreError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_index(dir: &Path, json: &str) {
        std::fs::write(dir.join(POST_INDEX_FILE), json).expect("write index");
    }

    const TWO_POSTS: &str = r#"{
        "posts": [
            {"slug": "go-basics", "title": "Go Basics", "excerpt": "e", "category": "Tech",
             "tags": ["go"], "date": "2024-01-01", "readTime": "5 min read", "views": 10},
            {"slug": "art-tips", "title": "Art Tips", "excerpt": "e", "category": "Art",
             "tags": [], "date": "2024-02-01", "readTime": "3 min read", "views": 50}
        ]
    }"#;

    #[tokio::test]
    async fn loads_index_and_serves_snapshot() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_index(dir.path(), TWO_POSTS);

        let store = SiteStore::load(dir.path().to_path_buf()).await;
        let snapshot = store.snapshot().await;
        assert_eq!(snapshot.catalog.len(), 2);
        assert!(snapshot.catalog.find_by_slug("art-tips").is_some());
    }

    #[tokio::test]
    async fn missing_index_degrades_to_empty_content() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = SiteStore::load(dir.path().to_path_buf()).await;
        let snapshot = store.snapshot().await;
        assert!(snapshot.catalog.is_empty());
        assert!(snapshot.photos.is_empty());
    }

    #[tokio::test]
    async fn inspect_surfaces_duplicate_slugs() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_index(
            dir.path(),
            r#"{"posts": [
                {"slug": "a", "title": "A", "excerpt": "e", "category": "Tech",
                 "date": "2024-01-01", "readTime": "1 min read"},
                {"slug": "a", "title": "A again", "excerpt": "e", "category": "Tech",
                 "date": "2024-01-02", "readTime": "1 min read"}
            ]}"#,
        );

        let err = SiteStore::inspect(dir.path()).await.expect_err("duplicate slug");
        assert!(matches!(err, StoreError::Domain(DomainError::Invariant { .. })));
    }

    #[tokio::test]
    async fn stale_reload_is_discarded() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_index(dir.path(), TWO_POSTS);
        let store = SiteStore::load(dir.path().to_path_buf()).await;

        let older = store.begin_reload();
        let newer = store.begin_reload();

        assert!(!store.install(older, SiteContent::default()).await);
        // The original content survives the stale install.
        assert_eq!(store.snapshot().await.catalog.len(), 2);

        assert!(store.install(newer, SiteContent::default()).await);
        assert!(store.snapshot().await.catalog.is_empty());
    }

    #[tokio::test]
    async fn fragment_lookup_reports_absence_as_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_index(dir.path(), TWO_POSTS);
        let fragments = dir.path().join("blog-posts");
        std::fs::create_dir_all(&fragments).expect("fragment dir");
        std::fs::write(fragments.join("go-basics-en.html"), "<p>hello</p>").expect("fragment");

        let store = SiteStore::load(dir.path().to_path_buf()).await;
        let html = store
            .fragment("go-basics", Language::En)
            .await
            .expect("fragment read");
        assert_eq!(html.as_deref(), Some("<p>hello</p>"));

        let missing = store
            .fragment("go-basics", Language::Bn)
            .await
            .expect("fragment read");
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn traversal_components_are_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = SiteStore::load(dir.path().to_path_buf()).await;
        let err = store
            .fragment("../secrets", Language::En)
            .await
            .expect_err("traversal rejected");
        assert!(matches!(err, StoreError::InvalidPath));

        let err = store
            .static_asset("../../etc/passwd")
            .await
            .expect_err("traversal rejected");
        assert!(matches!(err, StoreError::InvalidPath));
    }
}
