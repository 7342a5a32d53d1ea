use thiserror::Error;

use crate::auth::password;
use crate::auth::validation::{validate_signup, FieldErrors, SignupForm};
use crate::db::models::User;
use crate::db::{BlogStore, StoreError};

#[derive(Debug, Error)]
pub enum AuthError {
    /// Deliberately does not say whether the name or the password was wrong.
    #[error("Invalid login")]
    InvalidCredentials,

    #[error("That user already exists.")]
    DuplicateUsername,

    #[error("Invalid signup form")]
    Validation(FieldErrors),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// What a validated signup turns into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignupCompletion {
    /// Create the account; the caller then logs the new user in.
    Register,
}

impl SignupCompletion {
    pub fn complete<S: BlogStore + ?Sized>(
        self,
        store: &S,
        form: &SignupForm,
    ) -> Result<User, AuthError> {
        match self {
            SignupCompletion::Register => register(store, form),
        }
    }
}

/// Validate the form, then hand it to the completion strategy.
pub fn signup<S: BlogStore + ?Sized>(
    store: &S,
    form: &SignupForm,
    completion: SignupCompletion,
) -> Result<User, AuthError> {
    validate_signup(form).map_err(AuthError::Validation)?;
    completion.complete(store, form)
}

fn register<S: BlogStore + ?Sized>(store: &S, form: &SignupForm) -> Result<User, AuthError> {
    if store.find_user_by_name(&form.username)?.is_some() {
        return Err(AuthError::DuplicateUsername);
    }

    let pw_hash = password::make_pw_hash(&form.username, &form.password, None);
    let email = Some(form.email.as_str()).filter(|e| !e.is_empty());

    match store.create_user(&form.username, &pw_hash, email) {
        Ok(user) => {
            tracing::info!(user_id = user.id, username = %user.name, "Registered new user");
            Ok(user)
        }
        // lost a race with another signup for the same name
        Err(StoreError::Conflict(_)) => Err(AuthError::DuplicateUsername),
        Err(e) => Err(e.into()),
    }
}

/// Well-formed credential that no password matches. Unknown usernames are
/// checked against it so both login failures cost one hash.
const DUMMY_PW_HASH: &str =
    "AAAAAAAAAAAAAAAA,0000000000000000000000000000000000000000000000000000000000000000";

/// Check a username/password pair.
pub fn login<S: BlogStore + ?Sized>(
    store: &S,
    username: &str,
    password: &str,
) -> Result<User, AuthError> {
    let user = store.find_user_by_name(username)?;
    let stored = user.as_ref().map_or(DUMMY_PW_HASH, |u| u.pw_hash.as_str());
    let matches = password::verify(username, password, stored);

    match user {
        Some(user) if matches => Ok(user),
        _ => Err(AuthError::InvalidCredentials),
    }
}
