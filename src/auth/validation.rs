//! Signup input validation as an ordered pipeline of field checks.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

static USER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_-]{3,20}$").unwrap());
static PASS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^.{3,20}$").unwrap());
static EMAIL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\S]+@[\S]+\.[\S]+$").unwrap());

pub fn is_valid_username(username: &str) -> bool {
    USER_RE.is_match(username)
}

pub fn is_valid_password(password: &str) -> bool {
    PASS_RE.is_match(password)
}

/// Email is optional, so empty is valid.
pub fn is_valid_email(email: &str) -> bool {
    email.is_empty() || EMAIL_RE.is_match(email)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Username,
    Password,
    Verify,
    Email,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: Field,
    pub message: &'static str,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(pub Vec<FieldError>);

impl FieldErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: Field) -> Option<&'static str> {
        self.0.iter().find(|e| e.field == field).map(|e| e.message)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignupForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub verify: String,
    #[serde(default)]
    pub email: String,
}

type Check = fn(&SignupForm) -> Option<FieldError>;

fn check_username(form: &SignupForm) -> Option<FieldError> {
    (!is_valid_username(&form.username)).then_some(FieldError {
        field: Field::Username,
        message: "That's not a valid username.",
    })
}

fn check_password(form: &SignupForm) -> Option<FieldError> {
    if !is_valid_password(&form.password) {
        Some(FieldError {
            field: Field::Password,
            message: "That wasn't a valid password.",
        })
    } else if form.password != form.verify {
        Some(FieldError {
            field: Field::Verify,
            message: "Your passwords didn't match.",
        })
    } else {
        None
    }
}

fn check_email(form: &SignupForm) -> Option<FieldError> {
    (!is_valid_email(&form.email)).then_some(FieldError {
        field: Field::Email,
        message: "That's not a valid email.",
    })
}

const SIGNUP_CHECKS: &[Check] = &[check_username, check_password, check_email];

/// Run every signup check and collect all failures.
pub fn validate_signup(form: &SignupForm) -> Result<(), FieldErrors> {
    let errors: Vec<FieldError> = SIGNUP_CHECKS.iter().filter_map(|check| check(form)).collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(FieldErrors(errors))
    }
}
