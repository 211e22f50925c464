/// Shared types used across the codebase

use serde::{Deserialize, Serialize};

/// Visual weight of a badge, mirrors the front-end component variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BadgeVariant {
    Default,
    Secondary,
    Outline,
}

/// Display descriptor attached to closed enumerations (roles, order statuses)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Badge {
    pub label: &'static str,
    pub variant: BadgeVariant,
    pub class_name: &'static str,
}

impl Badge {
    pub const fn new(label: &'static str, variant: BadgeVariant, class_name: &'static str) -> Self {
        Self { label, variant, class_name }
    }
}

/// Anything that has a fixed badge for each of its cases
pub trait Badged {
    fn badge(&self) -> Badge;
}
