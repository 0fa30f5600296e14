//! List items as seen by the engine.
//!
//! The engine never owns the item sequence. Hosts hand it slices of anything
//! implementing [`ListItem`]; [`ChatItem`] is the concrete item used by the
//! bundled terminal viewer and by tests.

use super::identifiers::ItemId;
use serde::{Deserialize, Serialize};

/// Author role of a chat item, used to pick a base height before any
/// measurement exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Message typed by the user.
    User,
    /// Message produced by the assistant (often streamed).
    Assistant,
    /// System or status notice.
    System,
    /// Tool call or tool result block.
    Tool,
}

impl Role {
    /// All roles, in display order.
    pub const ALL: [Role; 4] = [Role::User, Role::Assistant, Role::System, Role::Tool];

    /// Lowercase name, matching the serialized form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
            Role::Tool => "tool",
        }
    }
}

/// An item in the ordered, dense, 0-indexed item source.
///
/// Implementations must keep `id` stable for the item's lifetime. `content`
/// is hashed to detect stale cache entries, so it should be exactly the text
/// the renderer paints.
pub trait ListItem {
    /// Stable item identifier.
    fn id(&self) -> &ItemId;
    /// Role used for height estimation.
    fn role(&self) -> Role;
    /// Content the item renders.
    fn content(&self) -> &str;
}

/// A chat message: the concrete item type for transcripts.
///
/// Deserializes from one JSONL line: `{"id": "...", "role": "user", "content": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatItem {
    /// Stable message id.
    pub id: ItemId,
    /// Author role.
    pub role: Role,
    /// Message text.
    #[serde(default)]
    pub content: String,
}

impl ChatItem {
    /// Create a chat item.
    pub fn new(id: ItemId, role: Role, content: impl Into<String>) -> Self {
        Self {
            id,
            role,
            content: content.into(),
        }
    }

    /// Append streamed text to the message.
    pub fn push_str(&mut self, chunk: &str) {
        self.content.push_str(chunk);
    }
}

impl ListItem for ChatItem {
    fn id(&self) -> &ItemId {
        &self.id
    }

    fn role(&self) -> Role {
        self.role
    }

    fn content(&self) -> &str {
        &self.content
    }
}

impl<T: ListItem + ?Sized> ListItem for &T {
    fn id(&self) -> &ItemId {
        (**self).id()
    }

    fn role(&self) -> Role {
        (**self).role()
    }

    fn content(&self) -> &str {
        (**self).content()
    }
}

/// A post-paint measurement delivered by the rendering layer.
///
/// `content` is the content that was actually painted; it is compared
/// against the item's current content to reject stale measurements.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    /// Measured item.
    pub id: ItemId,
    /// Real rendered height.
    pub height: f64,
    /// Content that produced `height`.
    pub content: String,
}

impl Measurement {
    /// Create a measurement.
    pub fn new(id: ItemId, height: f64, content: impl Into<String>) -> Self {
        Self {
            id,
            height,
            content: content.into(),
        }
    }

    /// Measurement of an item as it currently is.
    pub fn of(item: &impl ListItem, height: f64) -> Self {
        Self::new(item.id().clone(), height, item.content())
    }
}
