//! Published events
//!
//! An `Event` is created once per `publish` and then shared by reference
//! between live deliveries and offline caches.

use std::fmt;
use std::hash::{DefaultHasher, Hash, Hasher};

use chrono::{DateTime, Utc};

use crate::broker::topic::{Topic, TopicId};

/// One published event.
///
/// Events are immutable; the notification path shares them behind `Arc`
/// between every cache that holds a pending copy.
///
/// # Fields
///
/// - `id` - Hash of the title. Advisory only, two events may share it.
/// - `topic_id` / `topic` - The owning topic and its name at publish time.
/// - `title` - Single word title.
/// - `content` - Free text, may contain spaces.
/// - `published_at` - When the broker accepted the event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub id: u64,
    pub topic_id: TopicId,
    pub topic: String,
    pub title: String,
    pub content: String,
    pub published_at: DateTime<Utc>,
}

impl Event {
    pub fn new(topic: &Topic, title: &str, content: &str) -> Self {
        Self {
            id: Self::id_for(title),
            topic_id: topic.id,
            topic: topic.name.clone(),
            title: title.to_string(),
            content: content.to_string(),
            published_at: Utc::now(),
        }
    }

    /// Deterministic id derived from the title.
    pub fn id_for(title: &str) -> u64 {
        let mut hasher = DefaultHasher::new();
        title.hash(&mut hasher);
        hasher.finish()
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Event [{}] for [{}]: {}",
            self.title, self.topic, self.content
        )
    }
}
