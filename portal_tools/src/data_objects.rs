use serde::Deserialize;
use serde_json::{Map, Value};

/// One loosely-typed record returned by a portal endpoint. Portals are only contractually bound
/// on the join-key fields; everything else is passed through untouched, with field order
/// preserved for report output.
pub type PortalRecord = Map<String, Value>;

/// The JSON envelope every paginated portal endpoint responds with.
#[derive(Debug, Clone, Deserialize)]
pub struct PageEnvelope {
    pub success: bool,
    #[serde(default)]
    pub data: Vec<PortalRecord>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub error: Option<String>,
}
