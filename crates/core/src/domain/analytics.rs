use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AnalyticsId(pub String);

/// A cost center (budget analytics account) a transaction line can be attributed to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyticsAccount {
    pub id: AnalyticsId,
    pub name: String,
    pub description: Option<String>,
    /// Free-form classification such as `project`, `event` or `department`.
    pub kind: String,
    pub archived: bool,
}

impl fmt::Display for AnalyticsId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
