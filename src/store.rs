//! The blog data context: list/create/update/delete posts.
//!
//! When no real backend is configured (or the configuration still carries
//! the `demo` placeholder) the store serves a fixed demo data set and keeps
//! writes in memory. Otherwise it talks to the Supabase REST interface.
//! Read errors are logged and swallowed so the reader keeps whatever data
//! was last known; write errors come back as structured results.

use crate::config::SetupConfig;
use crate::db::{Post, PostStatus};
use chrono::{Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("a post with slug '{0}' already exists")]
    DuplicateSlug(String),
    #[error("post {0} not found")]
    NotFound(i64),
    #[error("backend request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("backend returned status {status}: {message}")]
    Remote { status: u16, message: String },
}

/// Partial update applied to an existing post.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<PostStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub featured: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub likes: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub views: Option<i64>,
}

impl PostUpdate {
    fn apply(&self, post: &mut Post) {
        if let Some(title) = &self.title {
            post.title = title.clone();
        }
        if let Some(slug) = &self.slug {
            post.slug = slug.clone();
        }
        if let Some(content) = &self.content {
            post.content = content.clone();
        }
        if let Some(excerpt) = &self.excerpt {
            post.excerpt = excerpt.clone();
        }
        if let Some(status) = self.status {
            post.status = status;
        }
        if let Some(featured) = self.featured {
            post.featured = featured;
        }
        if let Some(likes) = self.likes {
            post.likes = likes;
        }
        if let Some(views) = self.views {
            post.views = views;
        }
    }
}

/// The two fixed posts served when no backend is configured.
pub fn demo_posts() -> Vec<Post> {
    let now = Utc::now();
    let yesterday = now - ChronoDuration::days(1);
    vec![
        Post {
            id: 1,
            title: "Welcome to ZMime CMS".to_string(),
            slug: "welcome-to-zmime-cms".to_string(),
            content: "# Welcome to ZMime\n\nThis is your first blog post! ZMime is a powerful, \
                      open-source blogging CMS that makes it easy to create beautiful blogs.\n\n\
                      ## Features\n\n- Easy to use admin dashboard\n- Markdown support\n\
                      - SEO optimized\n- Mobile responsive\n- And much more!"
                .to_string(),
            excerpt: "Welcome to ZMime CMS - a powerful, open-source blogging platform that \
                      makes creating beautiful blogs effortless."
                .to_string(),
            status: PostStatus::Published,
            featured: true,
            author: "Admin".to_string(),
            created_at: now,
            published_at: Some(now),
            likes: 12,
            views: 156,
        },
        Post {
            id: 2,
            title: "Getting Started with Your Blog".to_string(),
            slug: "getting-started-with-your-blog".to_string(),
            content: "# Getting Started\n\nNow that you have ZMime set up, here are some tips to \
                      get you started:\n\n## Create Your First Post\n\n1. Go to the admin \
                      dashboard\n2. Click on \"New Post\"\n3. Write your content\n4. Publish \
                      when ready\n\n## Customize Your Blog\n\nYou can customize your blog \
                      appearance, settings, and more from the admin panel."
                .to_string(),
            excerpt: "Learn how to create your first post and customize your ZMime blog to \
                      match your style."
                .to_string(),
            status: PostStatus::Published,
            featured: false,
            author: "Admin".to_string(),
            created_at: yesterday,
            published_at: Some(yesterday),
            likes: 8,
            views: 89,
        },
    ]
}

pub struct BlogStore {
    http: reqwest::Client,
    supabase_url: Option<String>,
    supabase_key: Option<String>,
    // Last known posts; demo seed until a remote read succeeds.
    cache: Mutex<Vec<Post>>,
}

impl BlogStore {
    pub fn from_config(config: &SetupConfig, http: reqwest::Client) -> Self {
        Self {
            http,
            supabase_url: config.supabase_url.clone(),
            supabase_key: config.supabase_key.clone(),
            cache: Mutex::new(demo_posts()),
        }
    }

    /// True when the backend configuration is absent, blank, or still the
    /// demo placeholder.
    pub fn is_demo_mode(&self) -> bool {
        fn unset(value: &Option<String>) -> bool {
            match value {
                None => true,
                Some(v) => v.trim().is_empty() || v.contains("demo"),
            }
        }
        unset(&self.supabase_url) || unset(&self.supabase_key)
    }

    fn rest_url(&self, suffix: &str) -> String {
        let base = self.supabase_url.as_deref().unwrap_or_default();
        format!("{}/rest/v1/posts{suffix}", base.trim_end_matches('/'))
    }

    fn key(&self) -> &str {
        self.supabase_key.as_deref().unwrap_or_default()
    }

    /// Lists posts. Demo mode serves the fixed set; remote errors keep the
    /// previous data.
    pub async fn fetch_posts(&self) -> Vec<Post> {
        if self.is_demo_mode() {
            log::info!("Using demo data - Supabase not configured");
            return self.cache.lock().await.clone();
        }

        let result = async {
            let response = self
                .http
                .get(self.rest_url("?select=*&order=created_at.desc"))
                .header("apikey", self.key())
                .bearer_auth(self.key())
                .send()
                .await?;
            check_remote(response).await?.json::<Vec<Post>>().await.map_err(StoreError::from)
        }
        .await;

        match result {
            Ok(posts) => {
                let mut cache = self.cache.lock().await;
                *cache = posts.clone();
                posts
            }
            Err(err) => {
                log::error!("Error fetching posts: {err}");
                self.cache.lock().await.clone()
            }
        }
    }

    pub async fn create_post(&self, mut post: Post) -> Result<Post, StoreError> {
        if self.is_demo_mode() {
            let mut cache = self.cache.lock().await;
            if cache.iter().any(|p| p.slug == post.slug) {
                return Err(StoreError::DuplicateSlug(post.slug));
            }
            post.id = cache.iter().map(|p| p.id).max().unwrap_or(0) + 1;
            cache.insert(0, post.clone());
            return Ok(post);
        }

        // Best-effort duplicate check against last-known data; the backend's
        // UNIQUE constraint is the authority. Lock dropped before the call.
        {
            let cache = self.cache.lock().await;
            if cache.iter().any(|p| p.slug == post.slug) {
                return Err(StoreError::DuplicateSlug(post.slug));
            }
        }

        let response = self
            .http
            .post(self.rest_url(""))
            .header("apikey", self.key())
            .bearer_auth(self.key())
            .header("Prefer", "return=representation")
            .json(&post)
            .send()
            .await?;
        let mut created: Vec<Post> = check_remote(response).await?.json().await?;
        let created = created.pop().unwrap_or(post);
        let mut cache = self.cache.lock().await;
        cache.insert(0, created.clone());
        Ok(created)
    }

    /// In configured mode the backend decides whether the post exists: the
    /// representation it returns drives both the result and the cache, so a
    /// post never read through [`Self::fetch_posts`] can still be updated.
    pub async fn update_post(&self, id: i64, updates: PostUpdate) -> Result<Post, StoreError> {
        if self.is_demo_mode() {
            let mut cache = self.cache.lock().await;
            let position = cache
                .iter()
                .position(|p| p.id == id)
                .ok_or(StoreError::NotFound(id))?;
            updates.apply(&mut cache[position]);
            return Ok(cache[position].clone());
        }

        let response = self
            .http
            .patch(self.rest_url(&format!("?id=eq.{id}")))
            .header("apikey", self.key())
            .bearer_auth(self.key())
            .header("Prefer", "return=representation")
            .json(&updates)
            .send()
            .await?;
        let mut rows: Vec<Post> = check_remote(response).await?.json().await?;
        // An empty representation means the id matched nothing remotely.
        let updated = rows.pop().ok_or(StoreError::NotFound(id))?;

        let mut cache = self.cache.lock().await;
        match cache.iter().position(|p| p.id == id) {
            Some(position) => cache[position] = updated.clone(),
            None => cache.insert(0, updated.clone()),
        }
        Ok(updated)
    }

    pub async fn delete_post(&self, id: i64) -> Result<(), StoreError> {
        if self.is_demo_mode() {
            let mut cache = self.cache.lock().await;
            let position = cache
                .iter()
                .position(|p| p.id == id)
                .ok_or(StoreError::NotFound(id))?;
            cache.remove(position);
            return Ok(());
        }

        let response = self
            .http
            .delete(self.rest_url(&format!("?id=eq.{id}")))
            .header("apikey", self.key())
            .bearer_auth(self.key())
            .header("Prefer", "return=representation")
            .send()
            .await?;
        let removed: Vec<Post> = check_remote(response).await?.json().await?;
        if removed.is_empty() {
            return Err(StoreError::NotFound(id));
        }

        let mut cache = self.cache.lock().await;
        cache.retain(|p| p.id != id);
        Ok(())
    }
}

async fn check_remote(response: reqwest::Response) -> Result<reqwest::Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(StoreError::Remote {
            status: status.as_u16(),
            message: response.text().await.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn demo_store() -> BlogStore {
        BlogStore::from_config(&SetupConfig::default(), reqwest::Client::new())
    }

    fn remote_store(server: &MockServer) -> BlogStore {
        let config = SetupConfig {
            supabase_url: Some(server.uri()),
            supabase_key: Some("real-anon-key".to_string()),
            ..Default::default()
        };
        BlogStore::from_config(&config, reqwest::Client::new())
    }

    #[tokio::test]
    async fn unconfigured_store_serves_the_two_demo_posts() {
        let store = demo_store();
        assert!(store.is_demo_mode());

        let posts = store.fetch_posts().await;
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].slug, "welcome-to-zmime-cms");
        assert_eq!(posts[1].slug, "getting-started-with-your-blog");
        assert_eq!(posts[0].likes, 12);
        assert_eq!(posts[1].views, 89);
    }

    #[tokio::test]
    async fn placeholder_key_still_counts_as_demo() {
        let config = SetupConfig {
            supabase_url: Some("https://demo.supabase.co".to_string()),
            supabase_key: Some("demo-key".to_string()),
            ..Default::default()
        };
        let store = BlogStore::from_config(&config, reqwest::Client::new());
        assert!(store.is_demo_mode());
    }

    #[tokio::test]
    async fn configured_store_reads_from_the_backend() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/posts"))
            .and(header("apikey", "real-anon-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([{
                "id": 7,
                "title": "Remote",
                "slug": "remote",
                "content": "body",
                "status": "published",
                "created_at": "2025-01-15T10:00:00Z",
            }])))
            .expect(1)
            .mount(&server)
            .await;

        let store = remote_store(&server);
        assert!(!store.is_demo_mode());

        let posts = store.fetch_posts().await;
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].slug, "remote");
    }

    #[tokio::test]
    async fn read_errors_keep_previous_data() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/posts"))
            .respond_with(ResponseTemplate::new(500).set_body_string("oops"))
            .mount(&server)
            .await;

        let store = remote_store(&server);
        let posts = store.fetch_posts().await;
        // The demo seed is the last known data.
        assert_eq!(posts.len(), 2);
    }

    #[tokio::test]
    async fn demo_create_rejects_duplicate_slugs() {
        let store = demo_store();
        let err = store
            .create_post(Post::new("Again", "welcome-to-zmime-cms", "dup"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateSlug(_)));
    }

    #[tokio::test]
    async fn demo_crud_mutates_the_in_memory_set() {
        let store = demo_store();

        let created = store
            .create_post(Post::new("Third", "third", "three"))
            .await
            .unwrap();
        assert_eq!(created.id, 3);
        assert_eq!(store.fetch_posts().await.len(), 3);

        let updated = store
            .update_post(
                created.id,
                PostUpdate {
                    title: Some("Third, revised".to_string()),
                    status: Some(PostStatus::Published),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.title, "Third, revised");
        assert!(updated.is_published());

        store.delete_post(created.id).await.unwrap();
        assert_eq!(store.fetch_posts().await.len(), 2);
    }

    #[tokio::test]
    async fn configured_update_does_not_need_a_prior_read() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/rest/v1/posts"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([{
                "id": 42,
                "title": "Remote",
                "slug": "remote",
                "content": "body",
                "status": "published",
                "created_at": "2025-01-15T10:00:00Z",
                "likes": 5,
            }])))
            .expect(1)
            .mount(&server)
            .await;

        // Id 42 is not in the local cache (only the demo seed is), but the
        // backend knows it; its representation wins.
        let store = remote_store(&server);
        let updated = store
            .update_post(
                42,
                PostUpdate {
                    likes: Some(5),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.id, 42);
        assert_eq!(updated.likes, 5);

        let cached = store.cache.lock().await;
        assert!(cached.iter().any(|p| p.id == 42));
    }

    #[tokio::test]
    async fn configured_update_of_missing_remote_row_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/rest/v1/posts"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;

        // Id 1 exists in the demo-seeded cache, but the backend is the
        // authority in configured mode.
        let store = remote_store(&server);
        let err = store
            .update_post(
                1,
                PostUpdate {
                    likes: Some(1),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(1)));
    }

    #[tokio::test]
    async fn configured_delete_follows_the_remote_result() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/rest/v1/posts"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([{
                "id": 42,
                "title": "Remote",
                "slug": "remote",
                "content": "body",
                "status": "published",
                "created_at": "2025-01-15T10:00:00Z",
            }])))
            .expect(1)
            .mount(&server)
            .await;

        let store = remote_store(&server);
        store.delete_post(42).await.unwrap();
    }

    #[tokio::test]
    async fn configured_delete_of_missing_remote_row_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/rest/v1/posts"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;

        let store = remote_store(&server);
        let err = store.delete_post(2).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(2)));
    }

    #[tokio::test]
    async fn write_errors_come_back_structured() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/rest/v1/posts"))
            .respond_with(ResponseTemplate::new(403).set_body_string("row level security"))
            .mount(&server)
            .await;

        let store = remote_store(&server);
        let err = store
            .update_post(
                1,
                PostUpdate {
                    likes: Some(13),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Remote { status: 403, .. }));
    }

    #[tokio::test]
    async fn update_of_unknown_post_is_not_found() {
        let store = demo_store();
        let err = store.update_post(99, PostUpdate::default()).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(99)));
    }
}
