//! Post records and the loaded catalog.

use serde::Deserialize;
use time::Date;

use crate::domain::error::DomainError;

time::serde::format_description!(publish_date, Date, "[year]-[month]-[day]");

/// One article as described by the post index. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Post {
    pub slug: String,
    pub title: String,
    pub excerpt: String,
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(with = "publish_date")]
    pub date: Date,
    #[serde(rename = "readTime")]
    pub read_time: String,
    #[serde(default)]
    pub views: u64,
    #[serde(default)]
    pub thumbnail: String,
}

/// The full ordered post collection for a load generation.
///
/// Slugs are unique within a catalog; construction enforces it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    posts: Vec<Post>,
}

impl Catalog {
    pub fn new(posts: Vec<Post>) -> Result<Self, DomainError> {
        let mut seen = std::collections::HashSet::with_capacity(posts.len());
        for post in &posts {
            if post.slug.trim().is_empty() {
                return Err(DomainError::validation(format!(
                    "post `{}` has an empty slug",
                    post.title
                )));
            }
            if !seen.insert(post.slug.as_str()) {
                return Err(DomainError::invariant(format!(
                    "duplicate post slug `{}`",
                    post.slug
                )));
            }
        }
        Ok(Self { posts })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    pub fn find_by_slug(&self, slug: &str) -> Option<&Post> {
        self.posts.iter().find(|post| post.slug == slug)
    }

    pub fn position_of(&self, slug: &str) -> Option<usize> {
        self.posts.iter().position(|post| post.slug == slug)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use time::macros::date;

    pub fn post(slug: &str, title: &str, category: &str, views: u64, day: u8) -> Post {
        Post {
            slug: slug.to_string(),
            title: title.to_string(),
            excerpt: format!("{title} excerpt"),
            category: category.to_string(),
            tags: vec!["notes".to_string()],
            date: date!(2024 - 01 - 01).replace_day(day).expect("valid day"),
            read_time: "5 min read".to_string(),
            views,
            thumbnail: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::post;
    use super::*;

    #[test]
    fn catalog_rejects_duplicate_slugs() {
        let posts = vec![
            post("go-basics", "Go Basics", "Tech", 10, 1),
            post("go-basics", "Go Basics Again", "Tech", 20, 2),
        ];
        let err = Catalog::new(posts).expect_err("duplicate slug rejected");
        assert!(matches!(err, DomainError::Invariant { .. }));
    }

    #[test]
    fn catalog_rejects_empty_slug() {
        let err = Catalog::new(vec![post("", "Untitled", "Tech", 0, 1)])
            .expect_err("empty slug rejected");
        assert!(matches!(err, DomainError::Validation { .. }));
    }

    #[test]
    fn lookup_by_slug() {
        let catalog = Catalog::new(vec![
            post("go-basics", "Go Basics", "Tech", 10, 1),
            post("art-tips", "Art Tips", "Art", 50, 2),
        ])
        .expect("valid catalog");

        assert_eq!(
            catalog.find_by_slug("art-tips").map(|p| p.title.as_str()),
            Some("Art Tips")
        );
        assert_eq!(catalog.position_of("go-basics"), Some(0));
        assert!(catalog.find_by_slug("missing").is_none());
    }

    #[test]
    fn publish_date_parses_from_index_format() {
        let json = r#"{
            "slug": "go-basics",
            "title": "Go Basics",
            "excerpt": "e",
            "category": "Tech",
            "tags": ["go"],
            "date": "2024-01-15",
            "readTime": "5 min read",
            "views": 10,
            "thumbnail": "images/go.jpg"
        }"#;
        let post: Post = serde_json::from_str(json).expect("post parses");
        assert_eq!(post.date.to_string(), "2024-01-15");
        assert_eq!(post.read_time, "5 min read");
    }
}
