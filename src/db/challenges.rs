use crate::db::kv::KvStore;
use crate::db::models::{CeremonyKind, PendingChallenge, UserRecord};
use crate::db::users;
use crate::error::{AppError, AppResult};
use chrono::{Duration, Utc};

/// Store `pending` as the user's only outstanding challenge, replacing any earlier one
pub async fn save_challenge(
    store: &dyn KvStore,
    username: &str,
    pending: PendingChallenge,
) -> AppResult<()> {
    users::update_user(store, username, |user| {
        if let Some(previous) = &user.current_challenge {
            tracing::debug!(username, kind = ?previous.kind, "Replacing pending challenge");
        }
        user.current_challenge = Some(pending.clone());
        Ok(())
    })
    .await
}

/// Atomically remove the user's pending challenge of the given kind
///
/// The challenge is gone once this returns, whatever happens to the
/// verification that follows. Returns the user as it was stored (minus
/// the challenge) alongside the taken challenge.
///
/// ## Errors
/// - BadRequest: unknown user, or no pending challenge of this kind
/// - BadRequest: the challenge was found but had expired (it is still removed)
pub async fn take_challenge(
    store: &dyn KvStore,
    username: &str,
    kind: CeremonyKind,
    ttl: Duration,
) -> AppResult<(UserRecord, PendingChallenge)> {
    let taken = users::update_user(store, username, |user| {
        match user.current_challenge.take() {
            Some(pending) if pending.kind == kind => Ok((user.clone(), pending)),
            _ => Err(AppError::BadRequest(kind.not_in_progress().to_string())),
        }
    })
    .await;

    let (user, pending) = match taken {
        Err(AppError::UnknownUser(_)) => {
            return Err(AppError::BadRequest(kind.not_in_progress().to_string()))
        }
        other => other?,
    };

    if pending.is_expired(Utc::now(), ttl) {
        tracing::info!(username, kind = ?kind, "Rejected expired challenge");
        return Err(AppError::BadRequest("Challenge expired.".to_string()));
    }

    Ok((user, pending))
}
