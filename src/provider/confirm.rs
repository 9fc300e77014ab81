use std::time::Duration;

use serde::{Deserialize, Serialize};
use tycho_types::models::StdAddr;

use super::{ContractProvider, ContractStatus, ProviderError, TransactionInfo};
use tycho_util::serde_helpers;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfirmationPolicy {
    /// Number of polls before giving up.
    pub attempts: u32,
    /// Delay before each poll.
    #[serde(with = "serde_helpers::humantime")]
    pub interval: Duration,
}

impl Default for ConfirmationPolicy {
    fn default() -> Self {
        Self {
            attempts: 10,
            interval: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Confirmation {
    Confirmed(TransactionInfo),
    TimedOut { attempts: u32 },
}

impl Confirmation {
    pub fn transaction(&self) -> Option<&TransactionInfo> {
        match self {
            Self::Confirmed(tx) => Some(tx),
            Self::TimedOut { .. } => None,
        }
    }
}

/// Polls the account until its last transaction lt is strictly greater than `prev_lt`.
///
/// A provider reporting an older transaction (e.g. a lagging node) is treated
/// as "not yet".
///
/// Provider errors are logged and count as failed attempts.
pub async fn wait_for_transaction<P: ContractProvider>(
    provider: &P,
    address: &StdAddr,
    prev_lt: u64,
    policy: &ConfirmationPolicy,
) -> Confirmation {
    for attempt in 1..=policy.attempts {
        tokio::time::sleep(policy.interval).await;

        match poll_new_transaction(provider, address, prev_lt).await {
            Ok(Some(tx)) => {
                tracing::info!(
                    %address,
                    lt = tx.id.lt,
                    aborted = tx.aborted,
                    exit_code = ?tx.exit_code,
                    attempt,
                    "transaction confirmed"
                );
                return Confirmation::Confirmed(tx);
            }
            Ok(None) => tracing::debug!(%address, attempt, "no new transactions yet"),
            Err(e) => tracing::warn!(%address, attempt, "failed to poll transactions: {e}"),
        }
    }

    tracing::warn!(%address, prev_lt, attempts = policy.attempts, "transaction was not confirmed");
    Confirmation::TimedOut {
        attempts: policy.attempts,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployConfirmation {
    Deployed { attempt: u32 },
    TimedOut { attempts: u32 },
}

impl DeployConfirmation {
    pub fn is_deployed(&self) -> bool {
        matches!(self, Self::Deployed { .. })
    }
}

/// Polls the account until it becomes active.
pub async fn wait_for_deploy<P: ContractProvider>(
    provider: &P,
    address: &StdAddr,
    policy: &ConfirmationPolicy,
) -> DeployConfirmation {
    for attempt in 1..=policy.attempts {
        tokio::time::sleep(policy.interval).await;

        match provider.get_contract_state(address).await {
            Ok(state) if state.status == ContractStatus::Active => {
                tracing::info!(%address, attempt, "contract deployed");
                return DeployConfirmation::Deployed { attempt };
            }
            Ok(state) => tracing::debug!(%address, attempt, status = %state.status, "not active yet"),
            Err(e) => tracing::warn!(%address, attempt, "failed to get contract state: {e}"),
        }
    }

    tracing::warn!(%address, attempts = policy.attempts, "contract was not deployed");
    DeployConfirmation::TimedOut {
        attempts: policy.attempts,
    }
}

async fn poll_new_transaction<P: ContractProvider>(
    provider: &P,
    address: &StdAddr,
    prev_lt: u64,
) -> Result<Option<TransactionInfo>, ProviderError> {
    let Some(last) = provider.get_last_transaction(address).await? else {
        return Ok(None);
    };
    if last.lt <= prev_lt {
        return Ok(None);
    }

    let transactions = provider.get_transactions(address, 1).await?;
    Ok(transactions.into_iter().find(|tx| tx.id.lt == last.lt))
}
