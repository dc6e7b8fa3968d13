use crate::db::kv::KvStore;
use crate::db::models::UserRecord;
use crate::error::{AppError, AppResult};

/// How many times an optimistic update re-reads after losing a race
pub const MAX_UPDATE_ATTEMPTS: usize = 8;

/// Read a user together with the raw stored value it was parsed from
async fn load(store: &dyn KvStore, username: &str) -> AppResult<Option<(UserRecord, String)>> {
    match store.get(username).await? {
        Some(raw) => {
            let user = serde_json::from_str(&raw)?;
            Ok(Some((user, raw)))
        }
        None => Ok(None),
    }
}

pub async fn get_user(store: &dyn KvStore, username: &str) -> AppResult<Option<UserRecord>> {
    Ok(load(store, username).await?.map(|(user, _)| user))
}

pub async fn get_or_create_user(store: &dyn KvStore, username: &str) -> AppResult<UserRecord> {
    for _ in 0..MAX_UPDATE_ATTEMPTS {
        if let Some(user) = get_user(store, username).await? {
            return Ok(user);
        }

        let user = UserRecord::new(username.to_string());
        let raw = serde_json::to_string(&user)?;
        if store.compare_and_swap(username, None, &raw).await? {
            tracing::info!(username, user_id = %user.id, "Created user");
            return Ok(user);
        }
        // someone else created it first; read theirs
    }

    Err(AppError::Conflict(format!(
        "could not create user '{}' under concurrent writes",
        username
    )))
}

/// Apply `mutate` to the stored user and write it back atomically
///
/// The write only lands if the stored value is still the one that was
/// read; otherwise the user is re-read and `mutate` runs again. An error
/// from `mutate` aborts without writing.
pub async fn update_user<T, F>(store: &dyn KvStore, username: &str, mut mutate: F) -> AppResult<T>
where
    F: FnMut(&mut UserRecord) -> AppResult<T> + Send,
    T: Send,
{
    for attempt in 1..=MAX_UPDATE_ATTEMPTS {
        let (mut user, raw) = load(store, username)
            .await?
            .ok_or_else(|| AppError::UnknownUser(username.to_string()))?;

        let output = mutate(&mut user)?;
        let updated = serde_json::to_string(&user)?;

        if store.compare_and_swap(username, Some(&raw), &updated).await? {
            return Ok(output);
        }
        tracing::debug!(username, attempt, "User record changed during update, retrying");
    }

    Err(AppError::Conflict(format!(
        "user '{}' is being modified concurrently",
        username
    )))
}
