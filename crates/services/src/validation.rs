//! Signup and login input rules.

use domains::AppError;

pub const MIN_PASSWORD_LEN: usize = 8;
const PASSWORD_SPECIALS: &[char] = &['@', '$', '!', '%', '*', '?', '&'];

/// Trims and lowercases so lookups are case-insensitive.
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !email.chars().any(char::is_whitespace)
        && domain.split('.').count() >= 2
        && domain.split('.').all(|label| !label.is_empty())
}

/// Every password rule the input breaks, in a stable order.
pub fn password_problems(password: &str) -> Vec<String> {
    let mut problems = Vec::new();
    if password.chars().count() < MIN_PASSWORD_LEN {
        problems.push(format!("Password must be at least {MIN_PASSWORD_LEN} characters long"));
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        problems.push("Password must contain at least one uppercase letter".to_string());
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        problems.push("Password must contain at least one lowercase letter".to_string());
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        problems.push("Password must contain at least one number".to_string());
    }
    if !password.chars().any(|c| PASSWORD_SPECIALS.contains(&c)) {
        problems.push("Password must contain at least one special character (@, $, !, %, *, ?, &)".to_string());
    }
    if password.chars().any(char::is_whitespace) {
        problems.push("Password must not contain whitespace".to_string());
    }
    problems
}

pub fn check_signup(name: &str, email: &str, password: &str) -> Result<(), AppError> {
    let mut errors = Vec::new();
    if name.trim().is_empty() {
        errors.push("Name is required".to_string());
    }
    if !is_valid_email(email) {
        errors.push("Invalid email format".to_string());
    }
    errors.extend(password_problems(password));
    finish(errors)
}

pub fn check_login(email: &str, password: &str) -> Result<(), AppError> {
    let mut errors = Vec::new();
    if !is_valid_email(email) {
        errors.push("Invalid email format".to_string());
    }
    if password.is_empty() {
        errors.push("Password is required".to_string());
    }
    finish(errors)
}

fn finish(errors: Vec<String>) -> Result<(), AppError> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::ValidationFailed(errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_is_normalized() {
        assert_eq!(normalize_email("  Ann@Example.COM "), "ann@example.com");
    }

    #[test]
    fn email_shapes() {
        assert!(is_valid_email("ann@example.com"));
        assert!(!is_valid_email("ann@localhost"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("ann@@example.com"));
        assert!(!is_valid_email("an n@example.com"));
    }

    #[test]
    fn strong_password_passes() {
        assert!(password_problems("Str0ng!pass").is_empty());
    }

    #[test]
    fn weak_password_lists_every_rule() {
        let problems = password_problems("abc def");
        assert_eq!(problems.len(), 5);
        assert!(problems.contains(&"Password must not contain whitespace".to_string()));
    }

    #[test]
    fn signup_requires_name() {
        let err = check_signup(" ", "ann@example.com", "Str0ng!pass").unwrap_err();
        assert_eq!(err, AppError::ValidationFailed(vec!["Name is required".into()]));
    }
}
