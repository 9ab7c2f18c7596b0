use super::User;
use crate::utils::error::UserError;

fn valid() -> User {
    User::new("Alice", "alice@example.com", "alice")
}

#[test]
fn test_valid_user() {
    assert_eq!(valid().validate(), Ok(()));
    let user = valid().into_validated().unwrap();
    assert_eq!(user.id(), "alice");
    assert_eq!(user.name(), "Alice");
    assert_eq!(user.email(), "alice@example.com");
}

#[test]
fn test_name_rules() {
    let mut user = valid();
    user.name = String::new();
    assert_eq!(user.validate(), Err(UserError::InvalidName));

    user.name = "a".repeat(31);
    assert_eq!(user.validate(), Err(UserError::InvalidName));

    user.name = "a".repeat(30);
    assert_eq!(user.validate(), Ok(()));
}

#[test]
fn test_name_limit_counts_bytes() {
    let mut user = valid();
    // 16 two-byte characters: 16 chars but 32 bytes.
    user.name = "é".repeat(16);
    assert_eq!(user.validate(), Err(UserError::InvalidName));

    user.name = "é".repeat(15);
    assert_eq!(user.validate(), Ok(()));
}

#[test]
fn test_email_rules() {
    for email in ["", "alice", "alice@", "alice@example", "alice@example.c", "a b@example.com"] {
        let mut user = valid();
        user.email = email.to_string();
        assert_eq!(user.validate(), Err(UserError::InvalidEmail), "{email}");
    }

    let mut user = valid();
    user.email = "first.last+chat@mail.example.org".to_string();
    assert_eq!(user.validate(), Ok(()));
}

#[test]
fn test_empty_id_rejected() {
    let mut user = valid();
    user.id = String::new();
    assert_eq!(user.into_validated(), Err(UserError::InvalidId));
}

#[test]
fn test_name_checked_before_email() {
    let user = User::new("", "not-an-email", "");
    assert_eq!(user.validate(), Err(UserError::InvalidName));
}
