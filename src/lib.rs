//! streamlist
//!
//! Virtualized list engine for long, growing chat transcripts whose items
//! have unknown, variable heights.
//!
//! The pure core lives in [`model`], [`height_cache`] and [`view_state`]:
//! items are estimated before they are measured, only the visible window
//! (plus overscan) is materialized, measurements arrive in batches and
//! relayout the list once per batch while keeping the scroll anchor, and
//! the view follows new content only while the reader sits at the bottom.
//!
//! The impure shell ([`config`], [`logging`], [`view`] and the binary) is a
//! terminal host that exercises the engine with ratatui.
//!
//! # Examples
//!
//! ```
//! use streamlist::height_cache::{EstimateConfig, HeightCache, HeightCacheConfig};
//! use streamlist::model::{ChatItem, ItemId, Measurement, Role};
//! use streamlist::view_state::{
//!     HeadlessContainer, ScrollBehavior, ScrollConfig, ScrollController, Virtualizer,
//!     VirtualizerConfig,
//! };
//!
//! let cache = HeightCache::new(EstimateConfig::uniform(120.0), HeightCacheConfig::default());
//! let virtualizer = Virtualizer::new(cache, VirtualizerConfig::default());
//! let mut controller =
//!     ScrollController::with_container(virtualizer, ScrollConfig::default(), HeadlessContainer::new(600.0));
//!
//! let items: Vec<ChatItem> = (0..500)
//!     .map(|i| ChatItem::new(ItemId::new(format!("m{i}")).unwrap(), Role::Assistant, "hi"))
//!     .collect();
//! controller.append_items(&items);
//!
//! let window = controller.window();
//! assert_eq!(window.visible.map(|r| (r.start, r.end)), Some((0, 4)));
//! assert_eq!(window.items.len(), 15);
//!
//! controller.apply_measurements(&[Measurement::of(&items[0], 200.0)]);
//! assert_eq!(controller.virtualizer().total_size(), 499.0 * 120.0 + 200.0);
//!
//! controller.scroll_to_bottom(ScrollBehavior::Instant);
//! assert!(controller.check_position().is_at_bottom);
//! ```

pub mod config;
pub mod height_cache;
pub mod logging;
pub mod model;
pub mod view;
pub mod view_state;
