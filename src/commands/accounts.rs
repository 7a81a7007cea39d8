//! Operator commands for users and credits
//!
//! Stand-ins for the registration and purchase systems: they write straight
//! to the database the server uses.

use crate::error::Result;
use crate::storage::SqliteStorage;
use colored::Colorize;

/// Register a user and print the bearer token
///
/// The token is shown once; only its hash is stored.
pub fn add_user(storage: &SqliteStorage, name: &str, credits: u32) -> Result<()> {
    let (user, token) = storage.create_user(name, credits)?;

    println!("{}", format!("Created user {}", user.name).green());
    println!("  id:      {}", user.id);
    println!("  credits: {}", user.credits);
    println!("  token:   {}", token.cyan());
    println!(
        "\nSave it with {}",
        format!("creditchat login --token {}", token).cyan()
    );
    Ok(())
}

/// Add credits to a user's balance and print the new balance
pub fn grant_credits(storage: &SqliteStorage, user_id: &str, amount: u32) -> Result<()> {
    let balance = storage.grant_credits(user_id, amount)?;
    println!(
        "{}",
        format!("Granted {} credits to {}; balance is now {}", amount, user_id, balance).green()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::UserDirectory;
    use tempfile::tempdir;

    #[test]
    fn test_grant_credits_updates_balance() {
        let dir = tempdir().unwrap();
        let storage = SqliteStorage::new_with_path(dir.path().join("c.db")).unwrap();
        let (user, _) = storage.create_user("Alice", 1).unwrap();

        grant_credits(&storage, &user.id, 4).unwrap();

        assert_eq!(storage.find_user(&user.id).unwrap().unwrap().credits, 5);
    }

    #[test]
    fn test_grant_credits_to_unknown_user_fails() {
        let dir = tempdir().unwrap();
        let storage = SqliteStorage::new_with_path(dir.path().join("c.db")).unwrap();
        assert!(grant_credits(&storage, "ghost", 4).is_err());
    }
}
