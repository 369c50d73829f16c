// Balance mutations for wallets and points.
//
// Every function here expects to run inside a caller-owned transaction. The
// owning row (wallet or user) is locked first, then the (source, reference)
// pair is checked so a replayed movement returns the row already written.

use chrono::Utc;
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    models::{
        points::{NewPointTransaction, PointSource, PointTransaction},
        user::User,
        wallet::{
            LedgerEntry, NewWalletTransaction, TransactionKind, Wallet, WalletTransaction,
        },
    },
    schema::{point_transactions, users, wallet_transactions, wallets},
    utils::service_error::ServiceError,
};

/// Result of a wallet movement together with the wallet state after it.
#[derive(Debug, Clone)]
pub struct WalletMovement {
    pub transaction: WalletTransaction,
    pub balance: i64,
    /// `false` when the reference had already been applied
    pub applied: bool,
}

pub struct WalletLedger;

impl WalletLedger {
    pub async fn apply(
        conn: &mut AsyncPgConnection,
        user_id: Uuid,
        entry: LedgerEntry,
    ) -> Result<WalletMovement, ServiceError> {
        if entry.amount <= 0 {
            return Err(ServiceError::validation("Ledger amount must be positive"));
        }

        let wallet = Wallet::lock_by_user(conn, user_id)
            .await
            .map_err(ServiceError::not_found("Wallet"))?;

        if let Some(reference) = entry.reference.as_deref() {
            if let Some(existing) =
                WalletTransaction::find_by_reference(conn, entry.source, reference).await?
            {
                debug!(
                    "Wallet movement {}:{} already applied as {}",
                    entry.source.as_str(),
                    reference,
                    existing.id
                );
                return Ok(WalletMovement {
                    transaction: existing,
                    balance: wallet.balance,
                    applied: false,
                });
            }
        }

        let new_balance = entry.apply_to(wallet.balance).ok_or_else(|| match entry.kind {
            TransactionKind::Debit => ServiceError::InsufficientFunds {
                balance: wallet.balance,
                required: entry.amount,
            },
            TransactionKind::Credit => ServiceError::validation("Wallet balance overflow"),
        })?;

        let transaction = diesel::insert_into(wallet_transactions::table)
            .values(NewWalletTransaction {
                wallet_id: wallet.id,
                kind: entry.kind.as_str().to_string(),
                amount: entry.amount,
                balance_after: new_balance,
                source: entry.source.as_str().to_string(),
                reference: entry.reference.clone(),
                description: entry.description.clone(),
            })
            .returning(WalletTransaction::as_returning())
            .get_result(conn)
            .await?;

        diesel::update(wallets::table.find(wallet.id))
            .set((
                wallets::balance.eq(new_balance),
                wallets::updated_at.eq(Utc::now()),
            ))
            .execute(conn)
            .await?;

        info!(
            "Wallet {} {} {} ({}), balance {} -> {}",
            wallet.id,
            entry.kind.as_str(),
            entry.amount,
            entry.source.as_str(),
            wallet.balance,
            new_balance
        );

        Ok(WalletMovement {
            transaction,
            balance: new_balance,
            applied: true,
        })
    }
}

#[derive(Debug, Clone)]
pub struct PointsMovement {
    pub transaction: PointTransaction,
    pub balance: i64,
    pub applied: bool,
}

pub struct PointsLedger;

impl PointsLedger {
    /// Apply a signed points change to a user's balance.
    pub async fn apply(
        conn: &mut AsyncPgConnection,
        user_id: Uuid,
        amount: i64,
        source: PointSource,
        reference: Option<String>,
        description: Option<String>,
    ) -> Result<PointsMovement, ServiceError> {
        if amount == 0 {
            return Err(ServiceError::validation("Points change must not be zero"));
        }

        let user = User::lock_for_update(conn, user_id)
            .await
            .map_err(ServiceError::not_found("User"))?;

        if let Some(reference) = reference.as_deref() {
            if let Some(existing) =
                PointTransaction::find_by_reference(conn, source, reference).await?
            {
                debug!(
                    "Points movement {}:{} already applied as {}",
                    source.as_str(),
                    reference,
                    existing.id
                );
                return Ok(PointsMovement {
                    transaction: existing,
                    balance: user.points_balance,
                    applied: false,
                });
            }
        }

        let new_balance = user
            .points_balance
            .checked_add(amount)
            .filter(|b| *b >= 0)
            .ok_or(ServiceError::InsufficientPoints {
                balance: user.points_balance,
                required: amount.saturating_neg(),
            })?;

        let transaction = diesel::insert_into(point_transactions::table)
            .values(NewPointTransaction {
                user_id,
                amount,
                balance_after: new_balance,
                source: source.as_str().to_string(),
                reference,
                description,
            })
            .returning(PointTransaction::as_returning())
            .get_result(conn)
            .await?;

        diesel::update(users::table.find(user_id))
            .set((
                users::points_balance.eq(new_balance),
                users::updated_at.eq(Utc::now()),
            ))
            .execute(conn)
            .await?;

        info!(
            "User {} points {:+} ({}), balance {} -> {}",
            user_id,
            amount,
            source.as_str(),
            user.points_balance,
            new_balance
        );

        Ok(PointsMovement {
            transaction,
            balance: new_balance,
            applied: true,
        })
    }
}
