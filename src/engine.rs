//! Refresh engine: issues dialect refresh cycles and owns the feed state.
//!
//! A cycle walks `Requesting -> Committing | Discarding`: it snapshots the
//! content store, asks the translation service for the batch under the next
//! dialect, and commits the result into the overlay. Overlapping cycles are
//! allowed (a manual trigger may race the timer); the generation counter is
//! the only arbitration mechanism. The state lock is never held across an
//! await point.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};

use crate::api::ApiError;
use crate::config::Config;
use crate::dialect::{self, DialectSet, STANDARD};
use crate::feed::{ContentKey, ContentStore, Post, Reply};
use crate::overlay::TranslationOverlay;
use crate::translate::{self, TranslationItem};

/// Terminal state of one refresh cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The cycle's results replaced the overlay and the dialect switched.
    Committed { generation: u64, dialect: String },
    /// A newer cycle committed first; this cycle's results were dropped.
    Discarded { generation: u64 },
    /// The store was empty, no request was issued.
    Skipped,
}

struct EngineState {
    store: ContentStore,
    overlay: TranslationOverlay,
    current_dialect: String,
    issued_generation: u64,
}

/// Overlay-aware view of a post, ready for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPost {
    pub id: i64,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub replies: Vec<RenderedReply>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedReply {
    pub id: i64,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// Merge function for a single leaf: overlay text when the last committed
/// cycle translated it, the original text otherwise. Reads only, cheap
/// enough to call per-leaf per-render.
pub fn resolve_text<'a>(
    store: &'a ContentStore,
    overlay: &'a TranslationOverlay,
    key: &ContentKey,
) -> Option<&'a str> {
    overlay.lookup(key).or_else(|| store.original_text(key))
}

pub struct RefreshEngine {
    client: reqwest::Client,
    config: Arc<Config>,
    dialects: DialectSet,
    state: Mutex<EngineState>,
    rng: Mutex<StdRng>,
}

impl RefreshEngine {
    pub fn new(client: reqwest::Client, config: Arc<Config>) -> anyhow::Result<Self> {
        Self::with_rng(client, config, StdRng::from_entropy())
    }

    /// Construct with a caller-supplied random source, so tests can pin the
    /// dialect selection sequence.
    pub fn with_rng(
        client: reqwest::Client,
        config: Arc<Config>,
        rng: StdRng,
    ) -> anyhow::Result<Self> {
        let dialects = DialectSet::new(config.dialects.clone())?;
        Ok(Self {
            client,
            config,
            dialects,
            state: Mutex::new(EngineState {
                store: ContentStore::new(),
                overlay: TranslationOverlay::new(),
                current_dialect: STANDARD.to_string(),
                issued_generation: 0,
            }),
            rng: Mutex::new(rng),
        })
    }

    /// Replace the store contents with the initial timeline.
    pub fn load(&self, posts: Vec<Post>) {
        let mut state = self.state.lock().unwrap();
        state.store.load(posts);
        info!(posts = state.store.post_count(), "timeline loaded");
    }

    /// Insert a freshly authored post at the front of the feed.
    pub fn insert_post(&self, post: Post) {
        let mut state = self.state.lock().unwrap();
        debug!(post_id = post.id, "post inserted");
        state.store.prepend_post(post);
    }

    /// Append a freshly authored reply to its parent post. Returns false if
    /// the parent is unknown and the reply was dropped.
    pub fn insert_reply(&self, post_id: i64, reply: Reply) -> bool {
        let mut state = self.state.lock().unwrap();
        state.store.append_reply(post_id, reply)
    }

    pub fn has_content(&self) -> bool {
        !self.state.lock().unwrap().store.is_empty()
    }

    /// Dialect of the most recently committed cycle (`standard` initially).
    pub fn current_dialect(&self) -> String {
        self.state.lock().unwrap().current_dialect.clone()
    }

    pub fn issued_generation(&self) -> u64 {
        self.state.lock().unwrap().issued_generation
    }

    pub fn committed_generation(&self) -> u64 {
        self.state.lock().unwrap().overlay.committed_generation()
    }

    /// Run one refresh cycle end to end.
    ///
    /// Does nothing on an empty store. Otherwise claims the next generation,
    /// snapshots the leaves, picks the next dialect and calls the translation
    /// service. On success the results are committed unless a newer cycle
    /// already won; the dialect only advances with an accepted commit. On
    /// failure the overlay and dialect are left exactly as they were.
    pub async fn run_cycle(&self) -> Result<CycleOutcome, ApiError> {
        let (generation, next_dialect, batch) = {
            let mut state = self.state.lock().unwrap();
            if state.store.is_empty() {
                debug!("refresh cycle skipped, store is empty");
                return Ok(CycleOutcome::Skipped);
            }
            state.issued_generation += 1;
            let generation = state.issued_generation;
            let next = {
                let mut rng = self.rng.lock().unwrap();
                dialect::next_dialect(&state.current_dialect, &self.dialects, &mut *rng)
            };
            let batch: Vec<TranslationItem> = state
                .store
                .leaves()
                .map(|(key, text)| TranslationItem::new(key, text))
                .collect();
            (generation, next, batch)
        };

        debug!(
            generation,
            dialect = %next_dialect,
            leaves = batch.len(),
            "refresh cycle requesting"
        );

        // The lock is released while the request is in flight; newer cycles
        // and content inserts proceed freely in the meantime.
        match translate::translate_batch(&self.client, &self.config, &next_dialect, &batch).await {
            Ok(results) => {
                let mut state = self.state.lock().unwrap();
                if state.overlay.commit(generation, results) {
                    state.current_dialect = next_dialect.clone();
                    info!(generation, dialect = %next_dialect, "refresh cycle committed");
                    Ok(CycleOutcome::Committed {
                        generation,
                        dialect: next_dialect,
                    })
                } else {
                    debug!(generation, "refresh cycle lost to a newer commit");
                    Ok(CycleOutcome::Discarded { generation })
                }
            }
            Err(e) => {
                warn!(generation, error = %e, "refresh cycle failed, keeping previous overlay");
                Err(e)
            }
        }
    }

    /// Text to display for one leaf, or None if the key is unknown.
    pub fn display_text(&self, key: &ContentKey) -> Option<String> {
        let state = self.state.lock().unwrap();
        resolve_text(&state.store, &state.overlay, key).map(|s| s.to_string())
    }

    /// Resolve the whole feed for rendering.
    pub fn rendered_feed(&self) -> Vec<RenderedPost> {
        let state = self.state.lock().unwrap();
        state
            .store
            .posts()
            .iter()
            .map(|post| RenderedPost {
                id: post.id,
                text: resolve_text(&state.store, &state.overlay, &ContentKey::post(post.id))
                    .unwrap_or(&post.original_text)
                    .to_string(),
                created_at: post.created_at,
                replies: post
                    .replies
                    .iter()
                    .map(|reply| RenderedReply {
                        id: reply.id,
                        text: resolve_text(
                            &state.store,
                            &state.overlay,
                            &ContentKey::reply(reply.id),
                        )
                        .unwrap_or(&reply.original_text)
                        .to_string(),
                        created_at: reply.created_at,
                    })
                    .collect(),
            })
            .collect()
    }
}
