//! Password strength rules applied to every non-empty password.

use zxcvbn::{zxcvbn, Score};

use super::FieldError;

pub const MIN_LENGTH: usize = 8;

/// Scores at or above this are "too similar" to a user attribute.
const MAX_SIMILARITY: f64 = 0.7;

/// Weakest zxcvbn score still accepted.
const MIN_STRENGTH: Score = Score::Three;

/// User fields a password must not resemble.
#[derive(Debug, Default, Clone, Copy)]
pub struct UserAttributes<'a> {
    pub username: Option<&'a str>,
    pub email: Option<&'a str>,
    pub first_name: Option<&'a str>,
    pub last_name: Option<&'a str>,
}

impl<'a> UserAttributes<'a> {
    fn values(&self) -> impl Iterator<Item = &'a str> {
        [self.username, self.email, self.first_name, self.last_name]
            .into_iter()
            .flatten()
    }
}

pub fn validate_password(password: &str, user: &UserAttributes<'_>) -> Vec<FieldError> {
    let mut errors = Vec::new();

    if let Some(error) = similarity_error(password, user) {
        errors.push(error);
    }

    if password.chars().count() < MIN_LENGTH {
        errors.push(FieldError::new(
            format!(
                "This password is too short. It must contain at least {} characters.",
                MIN_LENGTH
            ),
            "password_too_short",
        ));
    }

    if !password.is_empty() && strength(password, user) < MIN_STRENGTH {
        errors.push(FieldError::new(
            "This password is too common.",
            "password_too_common",
        ));
    }

    if !password.is_empty() && password.chars().all(|c| c.is_ascii_digit()) {
        errors.push(FieldError::new(
            "This password is entirely numeric.",
            "password_entirely_numeric",
        ));
    }

    errors
}

/// zxcvbn estimate, penalising guesses built from the user's own details.
fn strength(password: &str, user: &UserAttributes<'_>) -> Score {
    let inputs: Vec<String> = user
        .values()
        .flat_map(|value| {
            let value = value.to_lowercase();
            let parts: Vec<String> = value
                .split(|c: char| !c.is_alphanumeric())
                .filter(|part| !part.is_empty())
                .map(str::to_string)
                .collect();
            std::iter::once(value).chain(parts)
        })
        .collect();
    let inputs: Vec<&str> = inputs.iter().map(String::as_str).collect();

    zxcvbn(password, &inputs).score()
}

fn similarity_error(password: &str, user: &UserAttributes<'_>) -> Option<FieldError> {
    let password = password.to_lowercase();
    let attributes = [
        (user.username, "username"),
        (user.email, "email address"),
        (user.first_name, "first name"),
        (user.last_name, "last name"),
    ];

    for (value, label) in attributes {
        let Some(value) = value else { continue };
        let value = value.to_lowercase();

        let too_similar = std::iter::once(value.as_str())
            .chain(value.split(|c: char| !c.is_alphanumeric()))
            .filter(|part| !part.is_empty())
            .any(|part| similarity(&password, part) >= MAX_SIMILARITY);

        if too_similar {
            return Some(FieldError::new(
                format!("The password is too similar to the {}.", label),
                "password_too_similar",
            ));
        }
    }

    None
}

/// 2 * LCS / (len(a) + len(b)), in 0.0..=1.0.
fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }

    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for ca in &a {
        for (j, cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    2.0 * prev[b.len()] as f64 / (a.len() + b.len()) as f64
}
