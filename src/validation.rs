//! Input checks for participant registration.

use std::collections::BTreeMap;

use crate::constants::{MAX_ANSWER_CHARS, MAX_PARTICIPANT_AGE, MAX_PARTICIPANT_NAME_CHARS};

/// Accepts `local@domain.tld` with a conservative character set.
pub fn is_valid_email(email: &str) -> bool {
    if email.len() > 254 {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };

    let local_ok = !local.is_empty()
        && local.len() <= 64
        && local
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'+' | b'-'))
        && !local.starts_with('.')
        && !local.ends_with('.')
        && !local.contains("..");
    if !local_ok {
        return false;
    }

    domain.contains('.')
        && domain
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'.')
        && domain
            .split('.')
            .all(|label| !label.is_empty() && !label.starts_with('-') && !label.ends_with('-'))
}

pub fn validate_participant_name(name: &str) -> Result<(), &'static str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err("Name is required");
    }
    if trimmed.chars().count() > MAX_PARTICIPANT_NAME_CHARS {
        return Err("Name is too long");
    }
    if trimmed.chars().any(char::is_control) {
        return Err("Name contains control characters");
    }
    Ok(())
}

pub fn validate_age(age: u32) -> Result<(), &'static str> {
    if age == 0 || age > MAX_PARTICIPANT_AGE {
        return Err("Age is out of range");
    }
    Ok(())
}

pub fn validate_answers(answers: &BTreeMap<String, String>) -> Result<(), &'static str> {
    for (question, answer) in answers {
        if question.trim().is_empty() {
            return Err("Answer keys must not be empty");
        }
        if answer.chars().count() > MAX_ANSWER_CHARS {
            return Err("Answer is too long");
        }
    }
    Ok(())
}
