//! Field validation for a registration form.
//!
//! Every check runs on every submission so that a single attempt reports all
//! violations at once. Errors come back in a fixed order: first name, last
//! name, email, confirm email, password, confirm password, date of birth,
//! gender, department.

use std::fmt;
use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use serde::Serialize;

use crate::models::{Department, Gender, RegistrationForm};

/// Youngest accepted age in whole years, inclusive.
pub const MIN_AGE: u32 = 16;

/// Oldest accepted age in whole years, inclusive.
pub const MAX_AGE: u32 = 60;

pub const PASSWORD_MIN_LEN: usize = 8;
pub const PASSWORD_MAX_LEN: usize = 20;

/// `local-part@domain.tld`, with a top-level label of at least two letters.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9+_.-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").expect("valid regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    FirstName,
    LastName,
    Email,
    ConfirmEmail,
    Password,
    ConfirmPassword,
    DateOfBirth,
    Gender,
    Department,
}

impl Field {
    pub fn label(self) -> &'static str {
        match self {
            Field::FirstName => "First name",
            Field::LastName => "Last name",
            Field::Email => "Email",
            Field::ConfirmEmail => "Confirm email",
            Field::Password => "Password",
            Field::ConfirmPassword => "Confirm password",
            Field::DateOfBirth => "Date of birth",
            Field::Gender => "Gender",
            Field::Department => "Department",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationErrorKind {
    Required,
    InvalidFormat,
    Mismatch,
    PolicyViolation,
    Incomplete,
    OutOfRange,
}

/// A single rejected field. `Display` yields the message shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct FieldError {
    pub field: Field,
    pub kind: ValidationErrorKind,
}

impl FieldError {
    pub fn new(field: Field, kind: ValidationErrorKind) -> Self {
        Self { field, kind }
    }

    pub fn message(&self) -> String {
        use ValidationErrorKind::*;

        match (self.field, self.kind) {
            (Field::Email, InvalidFormat) => "Invalid email format".to_string(),
            (Field::ConfirmEmail, Mismatch) => "Emails do not match".to_string(),
            (Field::Password, PolicyViolation) => format!(
                "Password must be {PASSWORD_MIN_LEN}-{PASSWORD_MAX_LEN} chars with at least 1 letter and 1 digit"
            ),
            (Field::ConfirmPassword, Mismatch) => "Passwords do not match".to_string(),
            (Field::DateOfBirth, Incomplete) => "Complete date of birth is required".to_string(),
            (Field::DateOfBirth, InvalidFormat) => "Date of birth is not a valid date".to_string(),
            (Field::DateOfBirth, OutOfRange) => {
                format!("Age must be between {MIN_AGE} and {MAX_AGE} years")
            }
            (field, Required) => format!("{} is required", field.label()),
            (field, Mismatch) => format!("{} does not match", field.label()),
            (field, _) => format!("{} is invalid", field.label()),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

impl std::error::Error for FieldError {}

/// Field values that passed every check, trimmed and typed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub gender: Gender,
    pub department: Department,
    pub date_of_birth: NaiveDate,
}

/// Run all checks against `form` as of `today`.
///
/// Returns the typed field values when nothing failed, otherwise every
/// failure in canonical field order.
pub fn validate(form: &RegistrationForm, today: NaiveDate) -> Result<ValidForm, Vec<FieldError>> {
    let mut errors = Vec::new();
    let mut record = |result: Result<(), FieldError>| {
        if let Err(e) = result {
            errors.push(e);
        }
    };

    let first_name = form.first_name.trim();
    let last_name = form.last_name.trim();
    let email = form.email.trim();
    let confirm_email = form.confirm_email.trim();

    record(check_required(Field::FirstName, first_name));
    record(check_required(Field::LastName, last_name));
    record(check_email(email));
    record(check_confirmation(Field::ConfirmEmail, email, confirm_email));
    record(check_password(&form.password));
    record(check_confirmation(
        Field::ConfirmPassword,
        &form.password,
        &form.confirm_password,
    ));

    let date_of_birth = match check_date_of_birth(
        form.birth_year,
        form.birth_month,
        form.birth_day,
        today,
    ) {
        Ok(date) => Some(date),
        Err(e) => {
            record(Err(e));
            None
        }
    };

    let gender = form.gender;
    if gender.is_none() {
        record(Err(FieldError::new(Field::Gender, ValidationErrorKind::Required)));
    }
    let department = form.department;
    if department.is_none() {
        record(Err(FieldError::new(
            Field::Department,
            ValidationErrorKind::Required,
        )));
    }

    match (date_of_birth, gender, department) {
        (Some(date_of_birth), Some(gender), Some(department)) if errors.is_empty() => {
            Ok(ValidForm {
                first_name: first_name.to_string(),
                last_name: last_name.to_string(),
                email: email.to_string(),
                gender,
                department,
                date_of_birth,
            })
        }
        _ => Err(errors),
    }
}

/// Fails `Required` when the (already trimmed) value is empty.
pub fn check_required(field: Field, value: &str) -> Result<(), FieldError> {
    if value.is_empty() {
        Err(FieldError::new(field, ValidationErrorKind::Required))
    } else {
        Ok(())
    }
}

pub fn check_email(email: &str) -> Result<(), FieldError> {
    check_required(Field::Email, email)?;
    if EMAIL_PATTERN.is_match(email) {
        Ok(())
    } else {
        Err(FieldError::new(Field::Email, ValidationErrorKind::InvalidFormat))
    }
}

/// Confirmation fields must be non-empty and equal to the original,
/// byte for byte.
pub fn check_confirmation(
    field: Field,
    original: &str,
    confirmation: &str,
) -> Result<(), FieldError> {
    check_required(field, confirmation)?;
    if original == confirmation {
        Ok(())
    } else {
        Err(FieldError::new(field, ValidationErrorKind::Mismatch))
    }
}

/// 8 to 20 characters with at least one letter and one digit.
pub fn check_password(password: &str) -> Result<(), FieldError> {
    check_required(Field::Password, password)?;

    let len = password.chars().count();
    let has_letter = password.chars().any(|c| c.is_ascii_alphabetic());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());

    if (PASSWORD_MIN_LEN..=PASSWORD_MAX_LEN).contains(&len) && has_letter && has_digit {
        Ok(())
    } else {
        Err(FieldError::new(
            Field::Password,
            ValidationErrorKind::PolicyViolation,
        ))
    }
}

pub fn check_date_of_birth(
    year: Option<i32>,
    month: Option<u32>,
    day: Option<u32>,
    today: NaiveDate,
) -> Result<NaiveDate, FieldError> {
    let (Some(year), Some(month), Some(day)) = (year, month, day) else {
        return Err(FieldError::new(
            Field::DateOfBirth,
            ValidationErrorKind::Incomplete,
        ));
    };

    let date = NaiveDate::from_ymd_opt(year, month, day).ok_or(FieldError::new(
        Field::DateOfBirth,
        ValidationErrorKind::InvalidFormat,
    ))?;

    match age_on(date, today) {
        Some(age) if (MIN_AGE..=MAX_AGE).contains(&age) => Ok(date),
        _ => Err(FieldError::new(
            Field::DateOfBirth,
            ValidationErrorKind::OutOfRange,
        )),
    }
}

/// Whole years elapsed between `birth` and `today`; `None` if `birth` is in
/// the future.
pub fn age_on(birth: NaiveDate, today: NaiveDate) -> Option<u32> {
    today.years_since(birth)
}

/// Number of selectable days for a month, honouring leap years.
pub fn days_in_month(year: i32, month: u32) -> Option<u32> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    u32::try_from(next.signed_duration_since(first).num_days()).ok()
}

/// Birth years a form should offer, newest first.
pub fn birth_year_range(today: NaiveDate) -> impl Iterator<Item = i32> {
    let newest = today.year() - MIN_AGE as i32;
    let oldest = today.year() - MAX_AGE as i32;
    (oldest..=newest).rev()
}
