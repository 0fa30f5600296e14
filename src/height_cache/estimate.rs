//! Height estimation for items that have never been measured.
//!
//! The model is deliberately simple: a per-role base height plus one line of
//! extra height for every wrapped line beyond the first. Only two properties
//! matter to the rest of the engine:
//!
//! - every estimate lies in `[min_height, max_height]`
//! - appending content never lowers the estimate

use crate::model::{ListItem, Role};
use serde::{Deserialize, Serialize};
use tracing::warn;
use unicode_width::UnicodeWidthStr;

/// Estimation parameters and global height guardrails.
///
/// Loaded from the `[estimate]` config section; `roles` is the
/// `[estimate.roles]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EstimateConfig {
    /// Base height for roles without an entry in `roles`.
    pub default_height: f64,
    /// Lower bound for every height the engine returns.
    pub min_height: f64,
    /// Upper bound for every height the engine returns.
    pub max_height: f64,
    /// Per-role base heights.
    pub roles: RoleHeights,
    /// Display columns per wrapped line.
    pub chars_per_line: usize,
    /// Height added per wrapped line after the first.
    pub line_height: f64,
}

impl Default for EstimateConfig {
    fn default() -> Self {
        Self {
            default_height: 80.0,
            min_height: 24.0,
            max_height: 4000.0,
            roles: RoleHeights {
                user: Some(64.0),
                assistant: Some(96.0),
                system: Some(40.0),
                tool: Some(120.0),
            },
            chars_per_line: 80,
            line_height: 20.0,
        }
    }
}

impl EstimateConfig {
    /// Config where every short item estimates to exactly `height`.
    ///
    /// Role base heights are cleared and the bounds widened around `height`.
    pub fn uniform(height: f64) -> Self {
        Self {
            default_height: height,
            min_height: 1.0,
            max_height: height.max(1.0) * 100.0,
            roles: RoleHeights::default(),
            ..Self::default()
        }
        .sanitized()
    }

    /// Repair invalid parameters so every operation stays total.
    ///
    /// Invalid bounds fall back to the defaults; out-of-range role heights
    /// are dropped; `default_height` is clamped into the bounds.
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();

        let bounds_ok = self.min_height.is_finite()
            && self.max_height.is_finite()
            && self.min_height > 0.0
            && self.max_height >= self.min_height;
        if !bounds_ok {
            warn!(
                min = self.min_height,
                max = self.max_height,
                "Invalid estimate bounds, using defaults"
            );
            self.min_height = defaults.min_height;
            self.max_height = defaults.max_height;
        }

        if !self.default_height.is_finite() || self.default_height <= 0.0 {
            warn!(
                default_height = self.default_height,
                "Invalid default height, using default"
            );
            self.default_height = defaults.default_height;
        }
        self.default_height = self.clamp_height(self.default_height);

        for role in Role::ALL {
            if let Some(height) = self.roles.get(role) {
                if !height.is_finite() || height <= 0.0 {
                    warn!(role = role.as_str(), height, "Dropping invalid role height");
                    self.roles.set(role, None);
                }
            }
        }

        if self.chars_per_line == 0 {
            self.chars_per_line = defaults.chars_per_line;
        }
        if !self.line_height.is_finite() || self.line_height < 0.0 {
            self.line_height = defaults.line_height;
        }
        self
    }

    /// Clamp `height` into `[min_height, max_height]`.
    ///
    /// NaN maps to `min_height`.
    pub fn clamp_height(&self, height: f64) -> f64 {
        height.max(self.min_height).min(self.max_height)
    }

    /// Base height for `role` before content adjustment.
    pub fn base_height(&self, role: Role) -> f64 {
        self.roles.get(role).unwrap_or(self.default_height)
    }

    /// Estimate the height of content with the given role.
    ///
    /// Pure: identical inputs always give identical results.
    pub fn estimate(&self, role: Role, content: &str) -> f64 {
        let lines = wrapped_line_count(content, self.chars_per_line);
        let extra = lines.saturating_sub(1) as f64 * self.line_height;
        self.clamp_height(self.base_height(role) + extra)
    }

    /// Estimate the height of `item`.
    pub fn estimate_item(&self, item: &impl ListItem) -> f64 {
        self.estimate(item.role(), item.content())
    }
}

/// Base heights keyed by role (the `[estimate.roles]` table).
///
/// A missing role uses `EstimateConfig::default_height`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RoleHeights {
    /// Base height for user messages.
    pub user: Option<f64>,
    /// Base height for assistant messages.
    pub assistant: Option<f64>,
    /// Base height for system notices.
    pub system: Option<f64>,
    /// Base height for tool blocks.
    pub tool: Option<f64>,
}

impl RoleHeights {
    /// Base height configured for `role`, if any.
    pub fn get(&self, role: Role) -> Option<f64> {
        match role {
            Role::User => self.user,
            Role::Assistant => self.assistant,
            Role::System => self.system,
            Role::Tool => self.tool,
        }
    }

    /// Set or clear the base height for `role`.
    pub fn set(&mut self, role: Role, height: Option<f64>) {
        let slot = match role {
            Role::User => &mut self.user,
            Role::Assistant => &mut self.assistant,
            Role::System => &mut self.system,
            Role::Tool => &mut self.tool,
        };
        *slot = height;
    }
}

/// Number of lines `content` occupies when hard-wrapped at `columns`.
///
/// Every `\n`-separated segment takes at least one line.
pub fn wrapped_line_count(content: &str, columns: usize) -> usize {
    let columns = columns.max(1);
    content
        .split('\n')
        .map(|segment| segment.width().div_ceil(columns).max(1))
        .sum()
}
