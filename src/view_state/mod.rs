//! View-state layer - Layout, windowing and scrolling
//!
//! Pure engine state: no terminal, no I/O. Hosts feed it item changes,
//! measurements and container events, and render the windows it produces.
//!
//! # Module Structure
//!
//! - `types`: Core value types (IndexRange, VirtualItem)
//! - `offset_table`: OffsetTable - cumulative offsets with incremental relayout
//! - `virtualizer`: Virtualizer - windowing with anchor-preserving relayout
//! - `scroll`: Scroll intents (ScrollCommand, ScrollOptions) and ScrollState
//! - `container`: ScrollContainer boundary and HeadlessContainer
//! - `controller`: ScrollController - intents, boundary checks, auto-follow

pub mod container;
pub mod controller;
pub mod offset_table;
pub mod scroll;
pub mod types;
pub mod virtualizer;

pub use container::{ContainerMetrics, HeadlessContainer, ScrollContainer};
pub use controller::{ScrollConfig, ScrollController, ScrollObserver};
pub use offset_table::OffsetTable;
pub use scroll::{ScrollAlign, ScrollBehavior, ScrollCommand, ScrollOptions, ScrollOutcome, ScrollState};
pub use types::{IndexRange, VirtualItem};
pub use virtualizer::{LayoutChange, Virtualizer, VirtualizerConfig, Window};
