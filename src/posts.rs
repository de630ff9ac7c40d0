use crate::error::{LookupError, Result};
use chrono::{DateTime, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Debug, Clone, Serialize)]
pub struct PostSummary {
    pub slug: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostPayload {
    #[serde(flatten)]
    pub summary: PostSummary,
    pub content: String,
}

static FRONT_MATTER_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z_]+):\s*(.*)$").unwrap());

/// Markdown blog posts loaded from a local directory. Each `<slug>.md` file
/// may open with a `---`-delimited front matter block carrying `title:`,
/// `date:` and `summary:` keys.
pub struct PostStore {
    dir: PathBuf,
}

impl PostStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        PostStore { dir: dir.into() }
    }

    pub fn list_posts(&self) -> Result<Vec<PostSummary>> {
        let mut posts = Vec::new();
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(err) => {
                warn!("Posts directory unreadable ({}): {}", self.dir.display(), err);
                return Ok(posts);
            }
        };
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("md") {
                continue;
            }
            let Some(slug) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match self.load(slug, &path) {
                Ok(post) => posts.push(post.summary),
                Err(err) => warn!("Skipping unreadable post {}: {}", path.display(), err),
            }
        }
        // Newest first; undated posts sort last, ties break on slug.
        posts.sort_by(|a, b| {
            b.date
                .cmp(&a.date)
                .then_with(|| a.slug.cmp(&b.slug))
        });
        Ok(posts)
    }

    pub fn get_post(&self, slug: &str) -> Result<PostPayload> {
        // Slugs are file stems; path separators would escape the posts dir.
        if slug.is_empty() || slug.contains(|c| c == '/' || c == '\\' || c == '.') {
            return Err(LookupError::NotFound("Post not found".to_string()));
        }
        let path = self.dir.join(format!("{}.md", slug));
        if !path.exists() {
            return Err(LookupError::NotFound("Post not found".to_string()));
        }
        self.load(slug, &path)
    }

    fn load(&self, slug: &str, path: &Path) -> Result<PostPayload> {
        let raw = fs::read_to_string(path)?;
        Ok(parse_post(slug, &raw))
    }
}

fn parse_post(slug: &str, raw: &str) -> PostPayload {
    let (front, content) = split_front_matter(raw);

    let mut title = None;
    let mut date = None;
    let mut summary = None;
    for line in front.lines() {
        if let Some(caps) = FRONT_MATTER_LINE.captures(line.trim_end()) {
            let value = caps[2].trim().trim_matches('"').to_string();
            if value.is_empty() {
                continue;
            }
            match &caps[1] {
                "title" => title = Some(value),
                "date" => date = normalize_date(&value),
                "summary" => summary = Some(value),
                _ => {}
            }
        }
    }

    PostPayload {
        summary: PostSummary {
            slug: slug.to_string(),
            title: title.unwrap_or_else(|| title_from_slug(slug)),
            date,
            summary,
        },
        content: content.trim_start().to_string(),
    }
}

fn split_front_matter(raw: &str) -> (&str, &str) {
    let Some(rest) = raw.strip_prefix("---") else {
        return ("", raw);
    };
    let Some(rest) = rest.strip_prefix('\n').or_else(|| rest.strip_prefix("\r\n")) else {
        return ("", raw);
    };
    for marker in ["\n---\n", "\n---\r\n"] {
        if let Some(end) = rest.find(marker) {
            return (&rest[..end], &rest[end + marker.len()..]);
        }
    }
    if let Some(stripped) = rest.strip_suffix("\n---") {
        return (stripped, "");
    }
    ("", raw)
}

fn normalize_date(value: &str) -> Option<String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc).to_rfc3339());
    }
    if let Ok(d) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        let dt = d.and_hms_opt(0, 0, 0)?.and_utc();
        return Some(dt.to_rfc3339());
    }
    None
}

fn title_from_slug(slug: &str) -> String {
    slug.split('-')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
