use async_sqlite::{
    Pool, rusqlite,
    rusqlite::{Error, Row},
};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Creates every table the CMS needs in the local database.
///
/// `settings` is the durable key-value store the wizard and config layer
/// write to, `posts` is the local post cache, and `provision_step` holds
/// the completion markers for the resumable provisioning flow.
pub async fn create_tables(pool: &Pool) -> Result<(), async_sqlite::Error> {
    pool.conn(move |conn| {
        conn.execute("PRAGMA foreign_keys = ON", [])?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS posts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            slug TEXT NOT NULL UNIQUE,
            content TEXT NOT NULL,
            excerpt TEXT NOT NULL DEFAULT '',
            status TEXT NOT NULL DEFAULT 'draft',
            featured INTEGER NOT NULL DEFAULT 0,
            author TEXT NOT NULL DEFAULT 'Admin',
            createdAt INTEGER NOT NULL,
            publishedAt INTEGER,
            likes INTEGER NOT NULL DEFAULT 0,
            views INTEGER NOT NULL DEFAULT 0
        )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS provision_step (
            step TEXT PRIMARY KEY,
            payload TEXT NOT NULL,
            completedAt INTEGER NOT NULL
        )",
            [],
        )?;

        Ok(())
    })
    .await?;
    Ok(())
}

/// Publication status of a [Post].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Draft,
    Published,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::Published => "published",
        }
    }

    fn from_db(value: &str, idx: usize) -> Result<Self, Error> {
        match value {
            "draft" => Ok(PostStatus::Draft),
            "published" => Ok(PostStatus::Published),
            other => Err(Error::InvalidColumnType(
                idx,
                format!("unknown post status '{other}'"),
                Type::Text,
            )),
        }
    }
}

fn default_author() -> String {
    "Admin".to_string()
}

/// A blog post, shared between the local cache, the remote REST backend
/// and the JSON API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    #[serde(default)]
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub content: String,
    #[serde(default)]
    pub excerpt: String,
    #[serde(default = "Post::default_status")]
    pub status: PostStatus,
    #[serde(default)]
    pub featured: bool,
    #[serde(default = "default_author")]
    pub author: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub likes: i64,
    #[serde(default)]
    pub views: i64,
}

impl Post {
    fn default_status() -> PostStatus {
        PostStatus::Draft
    }

    /// Creates a new draft [Post]
    pub fn new(
        title: impl Into<String>,
        slug: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: 0,
            title: title.into(),
            slug: slug.into(),
            content: content.into(),
            excerpt: String::new(),
            status: PostStatus::Draft,
            featured: false,
            author: default_author(),
            created_at: Utc::now(),
            published_at: None,
            likes: 0,
            views: 0,
        }
    }

    pub fn is_published(&self) -> bool {
        self.status == PostStatus::Published
    }

    /// Helper to map from [Row] to [Post]
    fn map_from_row(row: &Row) -> Result<Self, Error> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            slug: row.get(2)?,
            content: row.get(3)?,
            excerpt: row.get(4)?,
            status: {
                let raw: String = row.get(5)?;
                PostStatus::from_db(&raw, 5)?
            },
            featured: row.get::<_, i64>(6)? != 0,
            author: row.get(7)?,
            //DateTimes are stored as INTEGERS then parsed into a DateTime<UTC>
            created_at: {
                let timestamp: i64 = row.get(8)?;
                DateTime::from_timestamp(timestamp, 0).ok_or_else(|| {
                    Error::InvalidColumnType(8, "Invalid timestamp".to_string(), Type::Integer)
                })?
            },
            published_at: {
                let timestamp: Option<i64> = row.get(9)?;
                match timestamp {
                    Some(ts) => Some(DateTime::from_timestamp(ts, 0).ok_or_else(|| {
                        Error::InvalidColumnType(9, "Invalid timestamp".to_string(), Type::Integer)
                    })?),
                    None => None,
                }
            },
            likes: row.get(10)?,
            views: row.get(11)?,
        })
    }

    /// Saves the post and returns it with the row id filled in.
    /// Fails when the slug is already taken (UNIQUE constraint).
    pub async fn save(&self, pool: &Arc<Pool>) -> Result<Self, async_sqlite::Error> {
        let mut cloned_self = self.clone();
        pool.conn(move |conn| {
            conn.execute(
                "INSERT INTO posts (title, slug, content, excerpt, status, featured, author, createdAt, publishedAt, likes, views)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                rusqlite::params![
                    cloned_self.title,
                    cloned_self.slug,
                    cloned_self.content,
                    cloned_self.excerpt,
                    cloned_self.status.as_str(),
                    cloned_self.featured as i64,
                    cloned_self.author,
                    cloned_self.created_at.timestamp(),
                    cloned_self.published_at.map(|dt| dt.timestamp()),
                    cloned_self.likes,
                    cloned_self.views,
                ],
            )?;
            cloned_self.id = conn.last_insert_rowid();
            Ok(cloned_self)
        })
        .await
    }

    /// Saves or updates a post by its id
    pub async fn save_or_update(&self, pool: &Pool) -> Result<(), async_sqlite::Error> {
        let cloned_self = self.clone();
        pool.conn(move |conn| {
            //We check to see if the post already exists, if so we need to update not insert
            let mut stmt = conn.prepare("SELECT COUNT(*) FROM posts WHERE id = ?1")?;
            let count: i64 = stmt.query_row([cloned_self.id], |row| row.get(0))?;
            match count > 0 {
                true => {
                    conn.execute(
                        "UPDATE posts SET title = ?2, slug = ?3, content = ?4, excerpt = ?5, status = ?6,
                         featured = ?7, author = ?8, publishedAt = ?9, likes = ?10, views = ?11 WHERE id = ?1",
                        rusqlite::params![
                            cloned_self.id,
                            cloned_self.title,
                            cloned_self.slug,
                            cloned_self.content,
                            cloned_self.excerpt,
                            cloned_self.status.as_str(),
                            cloned_self.featured as i64,
                            cloned_self.author,
                            cloned_self.published_at.map(|dt| dt.timestamp()),
                            cloned_self.likes,
                            cloned_self.views,
                        ],
                    )?;
                    Ok(())
                }
                false => {
                    conn.execute(
                        "INSERT INTO posts (id, title, slug, content, excerpt, status, featured, author, createdAt, publishedAt, likes, views)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                        rusqlite::params![
                            cloned_self.id,
                            cloned_self.title,
                            cloned_self.slug,
                            cloned_self.content,
                            cloned_self.excerpt,
                            cloned_self.status.as_str(),
                            cloned_self.featured as i64,
                            cloned_self.author,
                            cloned_self.created_at.timestamp(),
                            cloned_self.published_at.map(|dt| dt.timestamp()),
                            cloned_self.likes,
                            cloned_self.views,
                        ],
                    )?;
                    Ok(())
                }
            }
        })
        .await?;
        Ok(())
    }

    pub async fn delete_by_id(pool: &Pool, id: i64) -> Result<usize, async_sqlite::Error> {
        pool.conn(move |conn| {
            let mut stmt = conn.prepare("DELETE FROM posts WHERE id = ?1")?;
            stmt.execute([id])
        })
        .await
    }

    /// Loads every cached post, newest first
    pub async fn load_latest_posts(pool: &Arc<Pool>) -> Result<Vec<Self>, async_sqlite::Error> {
        pool.conn(move |conn| {
            let mut stmt = conn.prepare("SELECT * FROM posts ORDER BY createdAt DESC")?;
            let post_iter = stmt.query_map([], |row| Self::map_from_row(row))?;

            let mut posts = Vec::new();
            for post in post_iter {
                posts.push(post?);
            }
            Ok(posts)
        })
        .await
    }

    /// Loads published posts only, newest first
    pub async fn load_published_posts(pool: &Arc<Pool>) -> Result<Vec<Self>, async_sqlite::Error> {
        pool.conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT * FROM posts WHERE status = 'published' ORDER BY createdAt DESC",
            )?;
            let post_iter = stmt.query_map([], |row| Self::map_from_row(row))?;

            let mut posts = Vec::new();
            for post in post_iter {
                posts.push(post?);
            }
            Ok(posts)
        })
        .await
    }

    pub async fn find_by_slug(
        pool: &Arc<Pool>,
        slug: String,
    ) -> Result<Option<Self>, async_sqlite::Error> {
        pool.conn(move |conn| {
            let mut stmt = conn.prepare("SELECT * FROM posts WHERE slug = ?1")?;
            stmt.query_row([slug.as_str()], |row| Self::map_from_row(row))
                .map(Some)
                .or_else(|err| {
                    if err == Error::QueryReturnedNoRows {
                        Ok(None)
                    } else {
                        Err(err)
                    }
                })
        })
        .await
    }
}

/// Completion marker for one provisioning step. The payload keeps whatever
/// descriptor the step produced (project, site, deploy) so a re-run can
/// pick up where the last one stopped.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProvisionStep {
    pub step: String,
    pub payload: String,
    pub completed_at: DateTime<Utc>,
}

impl ProvisionStep {
    /// Creates a new [ProvisionStep] marker with a JSON payload
    pub fn new<V>(step: &str, payload: &V) -> Result<Self, serde_json::Error>
    where
        V: Serialize,
    {
        Ok(Self {
            step: step.to_string(),
            payload: serde_json::to_string(payload)?,
            completed_at: Utc::now(),
        })
    }

    /// Helper to map from [Row] to [ProvisionStep]
    fn map_from_row(row: &Row) -> Result<Self, Error> {
        Ok(Self {
            step: row.get(0)?,
            payload: row.get(1)?,
            completed_at: {
                let timestamp: i64 = row.get(2)?;
                DateTime::from_timestamp(timestamp, 0).ok_or_else(|| {
                    Error::InvalidColumnType(2, "Invalid timestamp".to_string(), Type::Integer)
                })?
            },
        })
    }

    /// Gets the marker for a step, if the step already completed
    pub async fn get_by_step(
        pool: &Pool,
        step: String,
    ) -> Result<Option<Self>, async_sqlite::Error> {
        pool.conn(move |conn| {
            let mut stmt = conn.prepare("SELECT * FROM provision_step WHERE step = ?1")?;
            stmt.query_row([step.as_str()], |row| Self::map_from_row(row))
                .map(Some)
                .or_else(|err| {
                    if err == Error::QueryReturnedNoRows {
                        Ok(None)
                    } else {
                        Err(err)
                    }
                })
        })
        .await
    }

    /// Saves or updates the marker by its step name
    pub async fn save_or_update(&self, pool: &Pool) -> Result<(), async_sqlite::Error> {
        let cloned_self = self.clone();
        pool.conn(move |conn| {
            conn.execute(
                "INSERT INTO provision_step (step, payload, completedAt) VALUES (?1, ?2, ?3)
                 ON CONFLICT(step) DO UPDATE SET payload = ?2, completedAt = ?3",
                rusqlite::params![
                    cloned_self.step,
                    cloned_self.payload,
                    cloned_self.completed_at.timestamp(),
                ],
            )?;
            Ok(())
        })
        .await?;
        Ok(())
    }

    /// Deletes all the markers, forcing the next run to start from scratch
    pub async fn delete_all(pool: &Pool) -> Result<(), async_sqlite::Error> {
        pool.conn(move |conn| {
            let mut stmt = conn.prepare("DELETE FROM provision_step")?;
            stmt.execute([])
        })
        .await?;
        Ok(())
    }
}
