//! Articles: an insertion-only, in-memory collection with text search.

mod seed;

use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ApiError, ApiResult};

/// Maximum number of content characters kept in an excerpt.
pub const EXCERPT_CHARS: usize = 150;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: u64,
    pub title: String,
    pub content: String,
    pub author: String,
    /// Publication date, `YYYY-MM-DD`.
    pub published_at: String,
    pub tags: Vec<String>,
    pub excerpt: String,
}

/// List projection of an [`Article`]; omits the full content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleSummary {
    pub id: u64,
    pub title: String,
    pub excerpt: String,
    pub author: String,
    pub published_at: String,
    pub tags: Vec<String>,
}

impl From<&Article> for ArticleSummary {
    fn from(article: &Article) -> Self {
        Self {
            id: article.id,
            title: article.title.clone(),
            excerpt: article.excerpt.clone(),
            author: article.author.clone(),
            published_at: article.published_at.clone(),
            tags: article.tags.clone(),
        }
    }
}

/// Body of `POST /articles`. Fields are optional here so that a missing
/// field produces the domain's own validation message instead of a JSON
/// decoding error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewArticle {
    pub title: Option<String>,
    pub content: Option<String>,
    pub author: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

impl Article {
    /// Case-insensitive substring match over title, content, author and tags.
    /// `needle` must already be lowercase.
    fn matches(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(needle)
            || self.content.to_lowercase().contains(needle)
            || self.author.to_lowercase().contains(needle)
            || self.tags.iter().any(|t| t.to_lowercase().contains(needle))
    }
}

/// First [`EXCERPT_CHARS`] characters of `content`, with `...` appended when
/// anything was cut.
pub fn excerpt(content: &str) -> String {
    match content.char_indices().nth(EXCERPT_CHARS) {
        Some((cut, _)) => format!("{}...", &content[..cut]),
        None => content.to_owned(),
    }
}

/// Filters `articles` by `query`. A blank query returns everything.
pub fn search<'a>(articles: &'a [Article], query: &str) -> Vec<&'a Article> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return articles.iter().collect();
    }
    articles.iter().filter(|a| a.matches(&needle)).collect()
}

/// Owner of the article list.
///
/// New articles are placed at the front, so listing order is newest first
/// followed by the seed articles in their original order.
pub struct ArticleStore {
    articles: Mutex<Vec<Article>>,
}

impl Default for ArticleStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ArticleStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::with_articles(Vec::new())
    }

    /// A store preloaded with the demo articles.
    pub fn seeded() -> Self {
        Self::with_articles(seed::articles())
    }

    pub fn with_articles(articles: Vec<Article>) -> Self {
        Self {
            articles: Mutex::new(articles),
        }
    }

    fn articles(&self) -> MutexGuard<'_, Vec<Article>> {
        self.articles.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Summaries of every article matching `query`.
    pub fn search(&self, query: &str) -> Vec<ArticleSummary> {
        let articles = self.articles();
        search(&articles, query)
            .into_iter()
            .map(ArticleSummary::from)
            .collect()
    }

    pub fn find(&self, id: u64) -> Option<Article> {
        self.articles().iter().find(|a| a.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.articles().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Validates `input`, assigns the next id and today's date, and inserts
    /// the article at the front of the list.
    pub fn create(&self, input: NewArticle) -> ApiResult<Article> {
        let (Some(title), Some(content), Some(author)) = (
            non_blank(input.title),
            non_blank(input.content),
            non_blank(input.author),
        ) else {
            return Err(ApiError::bad_request(
                "Title, content, and author are required",
            ));
        };

        let mut articles = self.articles();
        let id = articles.iter().map(|a| a.id).max().unwrap_or(0) + 1;
        let article = Article {
            id,
            excerpt: excerpt(&content),
            title,
            content,
            author,
            published_at: Utc::now().format("%Y-%m-%d").to_string(),
            tags: input.tags.unwrap_or_default(),
        };
        articles.insert(0, article.clone());
        info!(article_id = id, "created article");
        Ok(article)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_article(title: &str) -> NewArticle {
        NewArticle {
            title: Some(title.into()),
            content: Some("Body text".into()),
            author: Some("Ada".into()),
            tags: Some(vec!["Rust".into()]),
        }
    }

    #[test]
    fn excerpt_truncates_long_content() {
        let long = "a".repeat(200);
        let cut = excerpt(&long);
        assert_eq!(cut.len(), EXCERPT_CHARS + 3);
        assert!(cut.ends_with("..."));

        assert_eq!(excerpt("short"), "short");
        assert_eq!(excerpt(&"b".repeat(150)), "b".repeat(150));
    }

    #[test]
    fn excerpt_counts_characters_not_bytes() {
        let text = "é".repeat(151);
        assert_eq!(excerpt(&text), format!("{}...", "é".repeat(150)));
    }

    #[test]
    fn seed_has_eight_articles() {
        let store = ArticleStore::seeded();
        assert_eq!(store.len(), 8);
        assert_eq!(store.find(1).unwrap().title, "Introduction to React Hooks");
    }

    #[test]
    fn blank_query_returns_everything() {
        let store = ArticleStore::seeded();
        assert_eq!(store.search("").len(), 8);
        assert_eq!(store.search("   ").len(), 8);
    }

    #[test]
    fn search_is_case_insensitive_across_fields() {
        let store = ArticleStore::seeded();

        let by_title: Vec<_> = store.search("TYPESCRIPT best").iter().map(|a| a.id).collect();
        assert_eq!(by_title, vec![3]);

        let by_author: Vec<_> = store.search("jane smith").iter().map(|a| a.id).collect();
        assert_eq!(by_author, vec![2]);

        let by_tag: Vec<_> = store.search("es2024").iter().map(|a| a.id).collect();
        assert_eq!(by_tag, vec![6]);

        let by_content = store.search("circuit breakers");
        assert_eq!(by_content.len(), 1);
        assert_eq!(by_content[0].id, 7);
    }

    #[test]
    fn every_title_substring_finds_its_article() {
        let store = ArticleStore::seeded();
        for id in 1..=8 {
            let title = store.find(id).unwrap().title;
            let fragment: String = title.chars().skip(2).take(6).collect();
            assert!(
                store.search(&fragment).iter().any(|a| a.id == id),
                "{fragment:?} did not find article {id}"
            );
        }
    }

    #[test]
    fn create_assigns_next_id_and_prepends() {
        let store = ArticleStore::seeded();
        let article = store.create(new_article("Ownership in Rust")).unwrap();

        assert_eq!(article.id, 9);
        assert_eq!(article.excerpt, "Body text");
        assert_eq!(article.published_at.len(), 10);
        assert_eq!(store.search("").first().map(|a| a.id), Some(9));
        assert_eq!(store.search("ownership").len(), 1);
    }

    #[test]
    fn create_in_empty_store_starts_at_one() {
        let store = ArticleStore::new();
        assert_eq!(store.create(new_article("First")).unwrap().id, 1);
        assert_eq!(store.create(new_article("Second")).unwrap().id, 2);
    }

    #[test]
    fn create_requires_title_content_author() {
        let store = ArticleStore::new();
        let mut input = new_article("x");
        input.author = None;
        let err = store.create(input).unwrap_err();
        assert_eq!(err.to_string(), "Title, content, and author are required");

        let mut input = new_article("x");
        input.content = Some("  ".into());
        assert!(store.create(input).is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn missing_tags_default_to_empty() {
        let store = ArticleStore::new();
        let mut input = new_article("x");
        input.tags = None;
        assert!(store.create(input).unwrap().tags.is_empty());
    }

    #[test]
    fn summaries_omit_content() {
        let store = ArticleStore::seeded();
        let json = serde_json::to_value(&store.search("")[0]).unwrap();
        assert!(json.get("content").is_none());
        assert!(json.get("publishedAt").is_some());
        assert!(json.get("excerpt").is_some());
    }
}
