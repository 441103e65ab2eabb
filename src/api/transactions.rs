use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::domain::{
    Decimal, Symbol, TimeMs, Transaction, TransactionId, TransactionType, UserId,
};
use crate::error::AppError;
use crate::ledger::{recompute, LedgerWarning};

#[derive(Debug, Deserialize)]
pub struct UserQuery {
    pub user: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionsResponse {
    pub transactions: Vec<Transaction>,
    pub warnings: Vec<LedgerWarning>,
}

/// List a user's transactions with derived cost-basis fields populated.
pub async fn list_transactions(
    Query(params): Query<UserQuery>,
    State(state): State<AppState>,
) -> Result<Json<TransactionsResponse>, AppError> {
    let user = parse_user(&params.user)?;
    let transactions = state.repo.list_transactions(&user).await?;
    let groups = state.repo.list_groups(&user).await?;

    let output = recompute(&transactions, &groups)?;
    Ok(Json(TransactionsResponse {
        transactions: output.transactions,
        warnings: output.warnings,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTransactionRequest {
    pub user: String,
    pub asset: String,
    pub quantity: Decimal,
    pub price: Decimal,
    pub time_ms: Option<i64>,
    /// Explicit classification; inferred from the quantity sign when absent.
    pub txn_type: Option<TransactionType>,
}

pub async fn create_transaction(
    State(state): State<AppState>,
    Json(body): Json<CreateTransactionRequest>,
) -> Result<(StatusCode, Json<Transaction>), AppError> {
    let user = parse_user(&body.user)?;
    let asset = parse_asset(&body.asset)?;
    if body.price.is_negative() {
        return Err(AppError::BadRequest("price must not be negative".to_string()));
    }

    let txn_type = body
        .txn_type
        .unwrap_or_else(|| TransactionType::infer_from_quantity(body.quantity));

    let txn = Transaction::new(
        TransactionId::generate(),
        user,
        asset,
        body.quantity,
        body.price,
        body.time_ms.map(TimeMs::new).unwrap_or_else(TimeMs::now),
        txn_type,
        None,
    );

    state.repo.insert_transaction(&txn).await?;
    Ok((StatusCode::CREATED, Json(txn)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTransactionRequest {
    pub asset: Option<String>,
    pub quantity: Option<Decimal>,
    pub price: Option<Decimal>,
    pub time_ms: Option<i64>,
    pub txn_type: Option<TransactionType>,
}

/// Partial update of the editable fields. The group link is managed through
/// group creation and unlink, not here.
pub async fn update_transaction(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Json(body): Json<UpdateTransactionRequest>,
) -> Result<Json<Transaction>, AppError> {
    let id = TransactionId::new(id);
    let mut txn = state
        .repo
        .get_transaction(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("transaction {}", id)))?;

    if let Some(asset) = body.asset {
        txn.asset = parse_asset(&asset)?;
    }
    if let Some(quantity) = body.quantity {
        txn.quantity = quantity;
    }
    if let Some(price) = body.price {
        if price.is_negative() {
            return Err(AppError::BadRequest("price must not be negative".to_string()));
        }
        txn.price = price;
    }
    if let Some(time_ms) = body.time_ms {
        txn.time_ms = TimeMs::new(time_ms);
    }
    if let Some(txn_type) = body.txn_type {
        txn.txn_type = txn_type;
    }

    state.repo.update_transaction(&txn).await?;
    Ok(Json(txn))
}

/// Delete a transaction. Grouped transactions are rejected; they must be
/// unlinked first so a group is never left with dangling basis flow.
pub async fn delete_transaction(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    let id = TransactionId::new(id);
    let txn = state
        .repo
        .get_transaction(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("transaction {}", id)))?;

    if let Some(group) = &txn.restructure_group {
        return Err(AppError::Conflict(format!(
            "transaction {} belongs to group {}; unlink it first",
            id, group
        )));
    }

    state.repo.delete_transaction(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Remove a transaction from its group and reclassify it from its quantity
/// sign.
pub async fn unlink_transaction(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Transaction>, AppError> {
    let id = TransactionId::new(id);
    let txn = state
        .repo
        .unlink_transaction(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("transaction {}", id)))?;
    Ok(Json(txn))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResponse {
    pub imported: usize,
}

/// CSV import: columns `asset,quantity,price,time_ms[,type]`. All rows are
/// inserted atomically; one malformed row rejects the whole file.
pub async fn import_transactions(
    Query(params): Query<UserQuery>,
    State(state): State<AppState>,
    body: String,
) -> Result<(StatusCode, Json<ImportResponse>), AppError> {
    let user = parse_user(&params.user)?;

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(body.as_bytes());

    let mut txns = Vec::new();
    for (line, record) in reader.deserialize::<CsvRow>().enumerate() {
        let row = record
            .map_err(|e| AppError::BadRequest(format!("row {}: {}", line + 1, e)))?;
        txns.push(row.into_transaction(&user).map_err(|e| {
            AppError::BadRequest(format!("row {}: {}", line + 1, e))
        })?);
    }

    if txns.is_empty() {
        return Err(AppError::BadRequest("no rows to import".to_string()));
    }

    let imported = state.repo.insert_transactions_batch(&txns).await?;
    Ok((StatusCode::CREATED, Json(ImportResponse { imported })))
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    asset: String,
    quantity: String,
    price: String,
    time_ms: i64,
    #[serde(rename = "type")]
    txn_type: Option<String>,
}

impl CsvRow {
    fn into_transaction(self, user: &UserId) -> Result<Transaction, String> {
        let asset = parse_asset(&self.asset).map_err(|e| e.to_string())?;
        let quantity = Decimal::from_str_canonical(&self.quantity)
            .map_err(|e| format!("invalid quantity: {}", e))?;
        let price = Decimal::from_str_canonical(&self.price)
            .map_err(|e| format!("invalid price: {}", e))?;

        let txn_type = match self.txn_type.as_deref() {
            None | Some("") => TransactionType::infer_from_quantity(quantity),
            Some(s) => s.parse().map_err(|e| format!("{}", e))?,
        };

        Ok(Transaction::new(
            TransactionId::generate(),
            user.clone(),
            asset,
            quantity,
            price,
            TimeMs::new(self.time_ms),
            txn_type,
            None,
        ))
    }
}

pub(super) fn parse_user(raw: &str) -> Result<UserId, AppError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AppError::BadRequest("user must not be empty".to_string()));
    }
    Ok(UserId::new(trimmed.to_string()))
}

pub(super) fn parse_asset(raw: &str) -> Result<Symbol, AppError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AppError::BadRequest("asset must not be empty".to_string()));
    }
    Ok(Symbol::new(trimmed))
}
