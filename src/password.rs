//! Password strength assessment. Pure and deterministic: five checks, one
//! point each, with a violation message appended for every failed check in a
//! fixed order so UI lists render stably.

use std::fmt;

/// Characters accepted by the special-character check.
const SPECIAL_CHARACTERS: &str = "!@#$%^&*(),.?\":{}|<>";

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Strength {
    Weak,
    Medium,
    Strong,
}

impl fmt::Display for Strength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Weak => "weak",
            Self::Medium => "medium",
            Self::Strong => "strong",
        };
        f.write_str(label)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PasswordAssessment {
    /// True iff every check passed. Independent of the strength bucket.
    pub is_valid: bool,
    /// One message per failed check, in check order.
    pub violations: Vec<String>,
    pub strength: Strength,
}

/// Score a password out of 5: length >= 8, an uppercase letter, a lowercase
/// letter, a digit, and a special character. Score >= 4 is strong, >= 2 is
/// medium, anything less is weak.
#[must_use]
pub fn assess(password: &str) -> PasswordAssessment {
    let checks = [
        (
            password.chars().count() >= 8,
            "Password must be at least 8 characters long",
        ),
        (
            password.chars().any(|c| c.is_ascii_uppercase()),
            "Password must contain at least one uppercase letter",
        ),
        (
            password.chars().any(|c| c.is_ascii_lowercase()),
            "Password must contain at least one lowercase letter",
        ),
        (
            password.chars().any(|c| c.is_ascii_digit()),
            "Password must contain at least one number",
        ),
        (
            password.chars().any(|c| SPECIAL_CHARACTERS.contains(c)),
            "Password must contain at least one special character",
        ),
    ];

    let mut violations = Vec::new();
    let mut score = 0u8;
    for (passed, message) in checks {
        if passed {
            score += 1;
        } else {
            violations.push(message.to_string());
        }
    }

    let strength = if score >= 4 {
        Strength::Strong
    } else if score >= 2 {
        Strength::Medium
    } else {
        Strength::Weak
    };

    PasswordAssessment {
        is_valid: violations.is_empty(),
        violations,
        strength,
    }
}
