//! The fixed informational document served by the blog-info endpoint:
//! announcements, release history, community links and featured blogs.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Announcement {
    pub id: u32,
    pub title: String,
    pub content: String,
    pub image: String,
    pub link: String,
    pub created_at: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatestVersion {
    pub version: String,
    pub release_date: String,
    pub changelog_url: String,
    pub breaking_changes: bool,
    pub auto_update_available: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateEntry {
    pub version: String,
    pub features: Vec<String>,
    pub bug_fixes: Vec<String>,
    pub date: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Community {
    pub discord_url: String,
    pub github_url: String,
    pub documentation_url: String,
    pub support_email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stats {
    pub total_blogs: u64,
    pub active_users: u64,
    pub posts_published: u64,
    pub countries: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeaturedBlog {
    pub title: String,
    pub url: String,
    pub description: String,
    pub screenshot: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tip {
    pub title: String,
    pub content: String,
    pub category: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlogInfo {
    pub announcements: Vec<Announcement>,
    pub version: String,
    pub latest_version: LatestVersion,
    pub updates: Vec<UpdateEntry>,
    pub community: Community,
    pub stats: Stats,
    pub featured_blogs: Vec<FeaturedBlog>,
    pub tips: Vec<Tip>,
}

impl BlogInfo {
    /// The document as currently published.
    pub fn current() -> Self {
        Self {
            announcements: vec![
                Announcement {
                    id: 1,
                    title: "🎉 New Minimalist Theme Available".to_string(),
                    content: "We've just released a beautiful new minimalist theme perfect for \
                              writers and content creators. Clean typography, distraction-free \
                              reading experience, and mobile-optimized design."
                        .to_string(),
                    image: "https://images.unsplash.com/photo-1486312338219-ce68d2c6f44d?w=800&h=400&fit=crop".to_string(),
                    link: "https://zmime.com/themes/minimalist".to_string(),
                    created_at: "2025-01-15T10:00:00Z".to_string(),
                    kind: "feature".to_string(),
                },
                Announcement {
                    id: 2,
                    title: "📱 Mobile App Coming Soon".to_string(),
                    content: "Manage your ZMime blog on the go! Our mobile app is in beta \
                              testing. Sign up to be notified when it's available."
                        .to_string(),
                    image: "https://images.unsplash.com/photo-1512941937669-90a1b58e7e9c?w=800&h=400&fit=crop".to_string(),
                    link: "https://zmime.com/mobile-beta".to_string(),
                    created_at: "2025-01-12T14:30:00Z".to_string(),
                    kind: "announcement".to_string(),
                },
                Announcement {
                    id: 3,
                    title: "💰 Monetization Features Enhanced".to_string(),
                    content: "New Stripe integration improvements, better subscription \
                              management, and advanced analytics for paid content creators."
                        .to_string(),
                    image: "https://images.unsplash.com/photo-1460925895917-afdab827c52f?w=800&h=400&fit=crop".to_string(),
                    link: "https://zmime.com/features/monetization".to_string(),
                    created_at: "2025-01-10T09:15:00Z".to_string(),
                    kind: "update".to_string(),
                },
            ],
            version: "1.2.0".to_string(),
            latest_version: LatestVersion {
                version: "1.2.0".to_string(),
                release_date: "2025-01-15".to_string(),
                changelog_url: "https://github.com/zmime/zmime-cms/releases/tag/v1.2.0"
                    .to_string(),
                breaking_changes: false,
                auto_update_available: true,
            },
            updates: vec![
                UpdateEntry {
                    version: "1.2.0".to_string(),
                    features: vec![
                        "New minimalist theme".to_string(),
                        "Enhanced mobile responsiveness".to_string(),
                        "Improved SEO optimization".to_string(),
                        "Better comment moderation tools".to_string(),
                    ],
                    bug_fixes: vec![
                        "Fixed image upload issues".to_string(),
                        "Resolved authentication edge cases".to_string(),
                        "Improved performance on large blogs".to_string(),
                    ],
                    date: "2025-01-15".to_string(),
                    kind: "minor".to_string(),
                },
                UpdateEntry {
                    version: "1.1.5".to_string(),
                    features: vec![
                        "Dark mode support".to_string(),
                        "Advanced analytics dashboard".to_string(),
                        "Email newsletter improvements".to_string(),
                    ],
                    bug_fixes: vec![
                        "Fixed deployment issues".to_string(),
                        "Resolved Stripe webhook handling".to_string(),
                    ],
                    date: "2025-01-08".to_string(),
                    kind: "patch".to_string(),
                },
                UpdateEntry {
                    version: "1.1.0".to_string(),
                    features: vec![
                        "Multi-language support".to_string(),
                        "Advanced SEO tools".to_string(),
                        "Custom domain SSL automation".to_string(),
                        "Enhanced media library".to_string(),
                    ],
                    bug_fixes: vec![
                        "Performance optimizations".to_string(),
                        "Security improvements".to_string(),
                    ],
                    date: "2025-01-01".to_string(),
                    kind: "minor".to_string(),
                },
            ],
            community: Community {
                discord_url: "https://discord.gg/zmime".to_string(),
                github_url: "https://github.com/zmime/zmime-cms".to_string(),
                documentation_url: "https://docs.zmime.com".to_string(),
                support_email: "support@zmime.com".to_string(),
            },
            stats: Stats {
                total_blogs: 15420,
                active_users: 8930,
                posts_published: 125000,
                countries: 89,
            },
            featured_blogs: vec![
                FeaturedBlog {
                    title: "Tech Insights Daily".to_string(),
                    url: "https://techinsights.blog".to_string(),
                    description: "Latest technology trends and insights".to_string(),
                    screenshot: "https://images.unsplash.com/photo-1519389950473-47ba0277781c?w=400&h=300&fit=crop".to_string(),
                },
                FeaturedBlog {
                    title: "Creative Writing Hub".to_string(),
                    url: "https://creativewriting.space".to_string(),
                    description: "Stories, poems, and writing tips".to_string(),
                    screenshot: "https://images.unsplash.com/photo-1455390582262-044cdead277a?w=400&h=300&fit=crop".to_string(),
                },
                FeaturedBlog {
                    title: "Food & Travel Adventures".to_string(),
                    url: "https://foodtravel.blog".to_string(),
                    description: "Culinary journeys around the world".to_string(),
                    screenshot: "https://images.unsplash.com/photo-1414235077428-338989a2e8c0?w=400&h=300&fit=crop".to_string(),
                },
            ],
            tips: vec![
                Tip {
                    title: "Optimize Your Blog for SEO".to_string(),
                    content: "Use descriptive titles, meta descriptions, and proper heading \
                              structure to improve your search rankings."
                        .to_string(),
                    category: "seo".to_string(),
                },
                Tip {
                    title: "Engage Your Audience".to_string(),
                    content: "Respond to comments promptly and create content that encourages \
                              discussion and sharing."
                        .to_string(),
                    category: "engagement".to_string(),
                },
                Tip {
                    title: "Consistent Publishing Schedule".to_string(),
                    content: "Regular posting keeps your audience engaged and helps with SEO. \
                              Use the scheduling feature to maintain consistency."
                        .to_string(),
                    category: "content".to_string(),
                },
            ],
        }
    }
}
