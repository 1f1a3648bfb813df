use askama::Template;

use crate::db::Post;

/// Public blog index.
#[derive(Template)]
#[template(path = "blog_list.html")]
pub struct BlogListTemplate {
    pub blog_title: String,
    pub blog_description: String,
    pub posts: Vec<PostView>,
}

/// Single-post page.
#[derive(Template)]
#[template(path = "post.html")]
pub struct PostTemplate {
    pub blog_title: String,
    pub post: PostView,
}

/// Setup wizard page; `step` is 1-based to match the progress bar.
#[derive(Template)]
#[template(path = "setup.html")]
pub struct SetupTemplate {
    pub step: u8,
    pub error: Option<String>,
    pub supabase_url: String,
    pub supabase_key: String,
    pub blog_title: String,
    pub blog_description: String,
    pub admin_email: String,
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub title: String,
    pub message: String,
}

/// Post fields preformatted for rendering.
pub struct PostView {
    pub title: String,
    pub slug: String,
    pub content: String,
    pub excerpt: String,
    pub author: String,
    pub featured: bool,
    pub published_at: String,
    pub likes: i64,
    pub views: i64,
}

impl From<&Post> for PostView {
    fn from(post: &Post) -> Self {
        Self {
            title: post.title.clone(),
            slug: post.slug.clone(),
            content: post.content.clone(),
            excerpt: post.excerpt.clone(),
            author: post.author.clone(),
            featured: post.featured,
            published_at: post
                .published_at
                .unwrap_or(post.created_at)
                .format("%Y-%m-%d")
                .to_string(),
            likes: post.likes,
            views: post.views,
        }
    }
}
