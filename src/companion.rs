//! Problem data pushed by the Competitive Companion browser extension.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanionData {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub url: String,
    /// Megabytes.
    #[serde(default)]
    pub memory_limit: u64,
    /// Milliseconds.
    #[serde(default)]
    pub time_limit: u64,
    #[serde(default)]
    pub tests: Vec<CompanionTest>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CompanionTest {
    #[serde(default)]
    pub input: String,
    #[serde(default)]
    pub output: String,
}

impl CompanionData {
    pub fn from_json(payload: &str) -> Result<Self> {
        serde_json::from_str(payload).context("Failed to parse companion payload")
    }

    /// Problem summary, one field per line.
    pub fn to_meta_string(&self) -> String {
        format!(
            "Problem: {}\nContest: {}\nURL: {}\nMemory Limit: {} MB\nTime Limit: {} ms\n",
            self.name, self.group, self.url, self.memory_limit, self.time_limit
        )
    }
}
