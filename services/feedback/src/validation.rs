//! Input validation utilities
//!
//! Every field of the register, login and feedback forms is required; lengths
//! follow the column sizes of `schema.sql`.

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

use crate::models::{FeedbackForm, LoginCredentials, RegisterForm};

/// Field name to error message, one entry per failing field
pub type FieldErrors = BTreeMap<&'static str, String>;

const REQUIRED: &str = "This field is required.";

fn required(value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(REQUIRED.to_string());
    }
    Ok(())
}

fn at_most(value: &str, max: usize, label: &str) -> Result<(), String> {
    if value.chars().count() > max {
        return Err(format!("{} must be at most {} characters long", label, max));
    }
    Ok(())
}

/// Validate username
pub fn validate_username(username: &str) -> Result<(), String> {
    required(username)?;
    at_most(username, 20, "Username")
}

/// Validate email
pub fn validate_email(email: &str) -> Result<(), String> {
    required(email)?;
    at_most(email, 50, "Email")?;

    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = EMAIL_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .expect("Failed to compile email regex")
    });

    if !regex.is_match(email) {
        return Err("Invalid email address.".to_string());
    }

    Ok(())
}

/// Validate password
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.is_empty() {
        return Err(REQUIRED.to_string());
    }
    at_most(password, 128, "Password")
}

/// Validate a first or last name
pub fn validate_name(name: &str, label: &str) -> Result<(), String> {
    required(name)?;
    at_most(name, 30, label)
}

/// Validate a feedback title
pub fn validate_title(title: &str) -> Result<(), String> {
    required(title)?;
    at_most(title, 100, "Title")
}

/// Validate feedback content
pub fn validate_content(content: &str) -> Result<(), String> {
    required(content)
}

fn collect(checks: Vec<(&'static str, Result<(), String>)>) -> Result<(), FieldErrors> {
    let errors: FieldErrors = checks
        .into_iter()
        .filter_map(|(field, result)| result.err().map(|message| (field, message)))
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate a registration form, reporting every failing field
pub fn validate_register(form: &RegisterForm) -> Result<(), FieldErrors> {
    collect(vec![
        ("username", validate_username(&form.username)),
        ("password", validate_password(&form.password)),
        ("email", validate_email(&form.email)),
        ("first_name", validate_name(&form.first_name, "First name")),
        ("last_name", validate_name(&form.last_name, "Last name")),
    ])
}

/// Validate a login form; only presence is checked
pub fn validate_login(form: &LoginCredentials) -> Result<(), FieldErrors> {
    collect(vec![
        ("username", required(&form.username)),
        ("password", validate_password(&form.password)),
    ])
}

/// Validate an add/update feedback form
pub fn validate_feedback(form: &FeedbackForm) -> Result<(), FieldErrors> {
    collect(vec![
        ("title", validate_title(&form.title)),
        ("content", validate_content(&form.content)),
    ])
}
