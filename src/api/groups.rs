use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::transactions::parse_user;
use super::AppState;
use crate::domain::{GroupId, RestructureGroup, TimeMs, TransactionId, TransactionType};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct UserQuery {
    pub user: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupsResponse {
    pub groups: Vec<GroupDto>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupDto {
    #[serde(flatten)]
    pub group: RestructureGroup,
    pub member_count: i64,
}

pub async fn list_groups(
    Query(params): Query<UserQuery>,
    State(state): State<AppState>,
) -> Result<Json<GroupsResponse>, AppError> {
    let user = parse_user(&params.user)?;
    let groups = state.repo.list_groups(&user).await?;

    let mut dtos = Vec::with_capacity(groups.len());
    for group in groups {
        let member_count = state.repo.count_group_members(&group.id).await?;
        dtos.push(GroupDto {
            group,
            member_count,
        });
    }

    Ok(Json(GroupsResponse { groups: dtos }))
}

/// One member of a new group: a transaction id and its restructuring role.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupMemberRequest {
    pub transaction_id: String,
    pub role: MemberRole,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberRole {
    Out,
    In,
}

impl MemberRole {
    fn txn_type(self) -> TransactionType {
        match self {
            MemberRole::Out => TransactionType::RestructureOut,
            MemberRole::In => TransactionType::RestructureIn,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGroupRequest {
    pub user: String,
    pub description: Option<String>,
    pub members: Vec<GroupMemberRequest>,
}

/// Create a group and stamp its members in one operation. Member stamping is
/// atomic: an unknown transaction id fails the whole request.
pub async fn create_group(
    State(state): State<AppState>,
    Json(body): Json<CreateGroupRequest>,
) -> Result<(StatusCode, Json<RestructureGroup>), AppError> {
    let user = parse_user(&body.user)?;
    if body.members.is_empty() {
        return Err(AppError::BadRequest(
            "a group needs at least one member".to_string(),
        ));
    }

    let mut members = Vec::with_capacity(body.members.len());
    for member in &body.members {
        let id = TransactionId::new(member.transaction_id.clone());
        let txn = state
            .repo
            .get_transaction(&id)
            .await?
            .ok_or_else(|| AppError::BadRequest(format!("unknown transaction {}", id)))?;
        if txn.user != user {
            return Err(AppError::BadRequest(format!(
                "transaction {} belongs to another user",
                id
            )));
        }
        if txn.restructure_group.is_some() {
            return Err(AppError::Conflict(format!(
                "transaction {} already belongs to a group",
                id
            )));
        }
        members.push((id, member.role.txn_type()));
    }

    let group = RestructureGroup::new(
        GroupId::generate(),
        user,
        body.description,
        TimeMs::now(),
    );
    state.repo.insert_group(&group).await?;
    state.repo.assign_group_members(&group.id, &members).await?;

    Ok((StatusCode::CREATED, Json(group)))
}

/// Delete a group. Rejected while members remain, so basis flow is never
/// silently orphaned.
pub async fn delete_group(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    let id = GroupId::new(id);
    if state.repo.get_group(&id).await?.is_none() {
        return Err(AppError::NotFound(format!("group {}", id)));
    }

    let member_count = state.repo.count_group_members(&id).await?;
    if member_count > 0 {
        return Err(AppError::Conflict(format!(
            "group {} still has {} member(s); unlink them first",
            id, member_count
        )));
    }

    state.repo.delete_group(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
