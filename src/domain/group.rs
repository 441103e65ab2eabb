//! Restructuring groups link OUT and IN transactions for cost-basis
//! transfer.

use serde::{Deserialize, Serialize};

use super::{GroupId, TimeMs, UserId};

/// A restructuring group. Members are the transactions whose
/// `restructure_group` field references this group's id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestructureGroup {
    pub id: GroupId,
    pub user: UserId,
    pub description: Option<String>,
    pub created_ms: TimeMs,
}

impl RestructureGroup {
    pub fn new(id: GroupId, user: UserId, description: Option<String>, created_ms: TimeMs) -> Self {
        RestructureGroup {
            id,
            user,
            description,
            created_ms,
        }
    }
}
