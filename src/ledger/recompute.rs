//! Cost-basis recomputation across restructuring groups.
//!
//! `recompute` takes a transaction set and its restructuring groups and
//! returns the transactions with adjusted purchase prices populated. The
//! function is pure: it never mutates its inputs, and running it twice on
//! the same input yields identical output.
//!
//! Basis flows from a group's RESTRUCTURE_OUT members to its RESTRUCTURE_IN
//! members. Groups are processed in timestamp order so that a chain of
//! restructurings (A sold into B, B later sold into C) carries the original
//! capital all the way through: an OUT member whose asset was acquired by an
//! earlier group's IN uses that IN's adjusted price as its basis price.
//!
//! Distribution policy for groups with multiple IN members: proportional to
//! each IN transaction's share of the group's total IN quantity.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;
use thiserror::Error;

use crate::domain::{Decimal, GroupId, RestructureGroup, TimeMs, Transaction, TransactionId};
use crate::domain::TransactionType;

/// Structural error: the input references a group that does not exist.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("transaction {transaction_id} references unknown group {group_id}")]
    UnknownGroup {
        transaction_id: TransactionId,
        group_id: GroupId,
    },
}

/// Data-quality warning. Surfaced to the caller, never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LedgerWarning {
    /// A RESTRUCTURE_IN transaction with no group: its adjusted price falls
    /// back to the stated price. Usually a data-entry mistake.
    UngroupedRestructureIn { transaction_id: TransactionId },
    /// A group with IN members but no OUT members: nothing to transfer, the
    /// IN members keep their stated prices.
    GroupMissingOut { group_id: GroupId },
    /// A group whose IN members carry zero total quantity; distribution is
    /// undefined and skipped.
    GroupZeroInQuantity { group_id: GroupId },
}

/// Result of a recomputation: adjusted transactions plus warnings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecomputeOutput {
    pub transactions: Vec<Transaction>,
    pub warnings: Vec<LedgerWarning>,
}

/// Recompute adjusted purchase prices for a transaction set.
///
/// # Errors
/// Returns `LedgerError::UnknownGroup` when a transaction references a group
/// id not present in `groups`. All other irregularities are reported as
/// warnings on a best-effort result.
pub fn recompute(
    transactions: &[Transaction],
    groups: &[RestructureGroup],
) -> Result<RecomputeOutput, LedgerError> {
    let known_groups: HashSet<&GroupId> = groups.iter().map(|g| &g.id).collect();
    for txn in transactions {
        if let Some(group_id) = &txn.restructure_group {
            if !known_groups.contains(group_id) {
                return Err(LedgerError::UnknownGroup {
                    transaction_id: txn.id.clone(),
                    group_id: group_id.clone(),
                });
            }
        }
    }

    let mut output: Vec<Transaction> = transactions.to_vec();
    let mut warnings = Vec::new();

    // Derived fields are recomputed from scratch each run.
    for txn in &mut output {
        txn.adjusted_purchase_price = None;
        txn.cost_basis_transferred = None;

        if txn.txn_type == TransactionType::RestructureIn && txn.restructure_group.is_none() {
            warnings.push(LedgerWarning::UngroupedRestructureIn {
                transaction_id: txn.id.clone(),
            });
        }
    }

    for group_id in group_processing_order(&output) {
        apply_group(&mut output, &group_id, &mut warnings);
    }

    Ok(RecomputeOutput {
        transactions: output,
        warnings,
    })
}

/// Group ids ordered by their earliest member timestamp. Groups without
/// members never reach the distribution step.
fn group_processing_order(transactions: &[Transaction]) -> Vec<GroupId> {
    let mut earliest: BTreeMap<GroupId, TimeMs> = BTreeMap::new();
    for txn in transactions {
        if let Some(group_id) = &txn.restructure_group {
            earliest
                .entry(group_id.clone())
                .and_modify(|t| {
                    if txn.time_ms < *t {
                        *t = txn.time_ms;
                    }
                })
                .or_insert(txn.time_ms);
        }
    }

    let mut ordered: Vec<(GroupId, TimeMs)> = earliest.into_iter().collect();
    ordered.sort_by_key(|(_, time)| *time);
    ordered.into_iter().map(|(id, _)| id).collect()
}

/// Transfer basis from a group's OUT members to its IN members.
fn apply_group(
    transactions: &mut [Transaction],
    group_id: &GroupId,
    warnings: &mut Vec<LedgerWarning>,
) {
    let member_idx: Vec<usize> = transactions
        .iter()
        .enumerate()
        .filter(|(_, t)| t.restructure_group.as_ref() == Some(group_id))
        .map(|(i, _)| i)
        .collect();

    let out_idx: Vec<usize> = member_idx
        .iter()
        .copied()
        .filter(|&i| transactions[i].txn_type == TransactionType::RestructureOut)
        .collect();
    let in_idx: Vec<usize> = member_idx
        .iter()
        .copied()
        .filter(|&i| transactions[i].txn_type == TransactionType::RestructureIn)
        .collect();

    if in_idx.is_empty() {
        // Proceeds left the portfolio; OUT members stay excluded from value
        // and there is nothing to distribute.
        return;
    }
    if out_idx.is_empty() {
        warnings.push(LedgerWarning::GroupMissingOut {
            group_id: group_id.clone(),
        });
        return;
    }

    // Total basis leaving the group. Earlier groups have already been
    // applied, so an OUT member of a chained position carries its upstream
    // basis here.
    let total_basis: Decimal = out_idx
        .iter()
        .map(|&i| {
            let out = &transactions[i];
            out.quantity.abs() * out_basis_price(transactions, i)
        })
        .sum();

    let total_in_quantity: Decimal = in_idx.iter().map(|&i| transactions[i].quantity.abs()).sum();
    if total_in_quantity.is_zero() {
        warnings.push(LedgerWarning::GroupZeroInQuantity {
            group_id: group_id.clone(),
        });
        return;
    }

    for &i in &in_idx {
        let quantity = transactions[i].quantity.abs();
        if quantity.is_zero() {
            continue;
        }
        let share = total_basis * (quantity / total_in_quantity);
        transactions[i].cost_basis_transferred = Some(share);
        transactions[i].adjusted_purchase_price = Some(share / quantity);
    }
}

/// Basis price for an OUT member: the adjusted price of the most recent
/// earlier RESTRUCTURE_IN of the same asset when one exists (chained
/// restructuring), otherwise the OUT's own stated price.
fn out_basis_price(transactions: &[Transaction], out_index: usize) -> Decimal {
    let out = &transactions[out_index];
    transactions
        .iter()
        .filter(|t| {
            t.txn_type == TransactionType::RestructureIn
                && t.asset == out.asset
                && t.time_ms <= out.time_ms
                && t.adjusted_purchase_price.is_some()
        })
        .max_by_key(|t| t.time_ms)
        .and_then(|t| t.adjusted_purchase_price)
        .unwrap_or(out.price)
}
