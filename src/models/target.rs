// src/models/target.rs

//! Harvest targets and the destination accounts that publish for them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A named audience with the keywords used to harvest for it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TargetDescriptor {
    pub name: String,

    /// Search keywords; an empty list harvests the home feed
    #[serde(default)]
    pub keywords: Vec<String>,

    #[serde(default)]
    pub min_likes: u64,

    #[serde(default = "default_per_keyword")]
    pub max_posts_per_keyword: usize,

    #[serde(default = "default_total")]
    pub max_posts_total: usize,
}

fn default_per_keyword() -> usize {
    10
}

fn default_total() -> usize {
    30
}

impl TargetDescriptor {
    /// A target with default caps and no keywords.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            keywords: Vec::new(),
            min_likes: 0,
            max_posts_per_keyword: default_per_keyword(),
            max_posts_total: default_total(),
        }
    }
}

/// A destination account that receives scheduled posts for one target.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccountDescriptor {
    pub username: String,
    pub target: String,
    #[serde(default)]
    pub reply_content: String,
    #[serde(default)]
    pub reply_image: String,
}

/// Group accounts by the target they serve, keeping file order within a target.
pub fn accounts_by_target(
    accounts: &[AccountDescriptor],
) -> BTreeMap<String, Vec<AccountDescriptor>> {
    let mut grouped: BTreeMap<String, Vec<AccountDescriptor>> = BTreeMap::new();
    for account in accounts {
        grouped
            .entry(account.target.clone())
            .or_default()
            .push(account.clone());
    }
    grouped
}
