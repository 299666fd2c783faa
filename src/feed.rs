use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Which kind of content a leaf belongs to. Serialized as `type` on the wire
/// to match the backend schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Post,
    Reply,
}

impl std::fmt::Display for ContentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContentKind::Post => write!(f, "post"),
            ContentKind::Reply => write!(f, "reply"),
        }
    }
}

/// Stable address of a single translatable text leaf.
///
/// Post ids and reply ids are independent sequences assigned by the backend,
/// so the kind is part of the key: `(post, 1)` and `(reply, 1)` are distinct
/// leaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentKey {
    pub kind: ContentKind,
    pub id: i64,
}

impl ContentKey {
    pub fn post(id: i64) -> Self {
        Self {
            kind: ContentKind::Post,
            id,
        }
    }

    pub fn reply(id: i64) -> Self {
        Self {
            kind: ContentKind::Reply,
            id,
        }
    }
}

impl std::fmt::Display for ContentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.kind, self.id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reply {
    pub id: i64,
    /// Back-reference to the parent post. Lookup relation only.
    pub post_id: i64,
    #[serde(rename = "user_id")]
    pub author_id: i64,
    pub original_text: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    #[serde(rename = "user_id")]
    pub author_id: i64,
    pub original_text: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub replies: Vec<Reply>,
}

/// Ordered collection of posts, newest first, each owning its replies in
/// arrival order. Content is only ever inserted, never removed.
#[derive(Debug, Default)]
pub struct ContentStore {
    posts: Vec<Post>,
}

impl ContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the store contents with the initial timeline.
    pub fn load(&mut self, posts: Vec<Post>) {
        self.posts = posts;
    }

    /// Insert a freshly created post at the front (newest-first ordering).
    /// The backend-assigned id is trusted, no uniqueness check is made.
    pub fn prepend_post(&mut self, post: Post) {
        self.posts.insert(0, post);
    }

    /// Append a reply to the named post. Returns false and drops the reply
    /// if `post_id` does not match any known post; that can only happen if
    /// the backend and the local timeline have diverged, so it is logged.
    pub fn append_reply(&mut self, post_id: i64, reply: Reply) -> bool {
        match self.posts.iter_mut().find(|p| p.id == post_id) {
            Some(post) => {
                post.replies.push(reply);
                true
            }
            None => {
                warn!(
                    post_id,
                    reply_id = reply.id,
                    "dropping reply for unknown post"
                );
                false
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    pub fn post_count(&self) -> usize {
        self.posts.len()
    }

    /// Total number of text leaves (posts plus replies).
    pub fn leaf_count(&self) -> usize {
        self.posts.iter().map(|p| 1 + p.replies.len()).sum()
    }

    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    /// Enumerate every text leaf in current store order: each post followed
    /// by its replies. Borrows the store, so it always reflects the contents
    /// at call time.
    pub fn leaves(&self) -> impl Iterator<Item = (ContentKey, &str)> + '_ {
        self.posts.iter().flat_map(|post| {
            std::iter::once((ContentKey::post(post.id), post.original_text.as_str())).chain(
                post.replies
                    .iter()
                    .map(|reply| (ContentKey::reply(reply.id), reply.original_text.as_str())),
            )
        })
    }

    /// Original (untranslated) text of a leaf, if the key is known.
    pub fn original_text(&self, key: &ContentKey) -> Option<&str> {
        match key.kind {
            ContentKind::Post => self
                .posts
                .iter()
                .find(|p| p.id == key.id)
                .map(|p| p.original_text.as_str()),
            ContentKind::Reply => self
                .posts
                .iter()
                .flat_map(|p| p.replies.iter())
                .find(|r| r.id == key.id)
                .map(|r| r.original_text.as_str()),
        }
    }
}
