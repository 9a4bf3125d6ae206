//! Client scope checker port: backs §4.3 step 3. Token introspection itself
//! is out of scope (an external collaborator); this port and its adapters
//! exist so the create-or-get flow has a real authorization seam to call.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScopeError {
    #[error("client lacks required scope(s): {0:?}")]
    Mismatch(Vec<String>),
}

pub trait ScopeChecker: Send + Sync {
    /// `token_scopes` is whatever the (external) authentication layer
    /// resolved for the caller; `required_scopes` comes from the resolved
    /// event type's `readScopes`. Any event type with an unsatisfied scope
    /// fails the whole request (§4.3 step 3).
    fn check(&self, token_scopes: &[String], required_scopes: &[String]) -> Result<(), ScopeError>;
}

/// Minimal stand-in policy: passes when every required scope is present in
/// the token's scopes, or when no scopes are required at all.
pub struct AllowAllMatchingScopeChecker;

impl ScopeChecker for AllowAllMatchingScopeChecker {
    fn check(&self, token_scopes: &[String], required_scopes: &[String]) -> Result<(), ScopeError> {
        let missing: Vec<String> = required_scopes
            .iter()
            .filter(|scope| !token_scopes.contains(scope))
            .cloned()
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ScopeError::Mismatch(missing))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passes_when_required_scopes_are_a_subset() {
        let checker = AllowAllMatchingScopeChecker;
        let token = vec!["event-type:read".to_string(), "other".to_string()];
        assert!(checker.check(&token, &["event-type:read".to_string()]).is_ok());
    }

    #[test]
    fn fails_when_a_required_scope_is_missing() {
        let checker = AllowAllMatchingScopeChecker;
        let token = vec!["other".to_string()];
        assert!(checker.check(&token, &["event-type:read".to_string()]).is_err());
    }
}
