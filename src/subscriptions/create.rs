//! Subscription create-or-get (C8): the second core piece alongside the
//! stream engine. Validate, authorize, then create-or-recover idempotently
//! against a concurrent creator racing on the same uniqueness key.

use chrono::{DateTime, Utc};

use crate::error::ApiError;
use crate::model::{Subscription, SubscriptionBase};
use crate::ports::app_existence::ApplicationExistenceChecker;
use crate::ports::event_type_repo::EventTypeRepository;
use crate::ports::scope_checker::{ScopeChecker, ScopeError};
use crate::ports::subscription_store::{StoreError, SubscriptionStore};

/// Whether the returned subscription was just created or already existed
/// under the same uniqueness key — the handler uses this to pick 201 vs.
/// 200 and which headers to set.
pub enum CreateOutcome {
    Created(Subscription),
    AlreadyExists(Subscription),
}

pub struct CreateRequest<'a> {
    pub base: SubscriptionBase,
    pub token_scopes: &'a [String],
    pub check_owning_application: bool,
}

pub async fn create_or_get(
    request: CreateRequest<'_>,
    store: &dyn SubscriptionStore,
    event_types: &dyn EventTypeRepository,
    app_existence: &dyn ApplicationExistenceChecker,
    scope_checker: &dyn ScopeChecker,
    now: DateTime<Utc>,
) -> Result<CreateOutcome, ApiError> {
    let CreateRequest { base, token_scopes, check_owning_application } = request;

    // Step 1: owning-application existence, gated by CHECK_OWNING_APPLICATION.
    if check_owning_application {
        let exists = app_existence
            .exists(&base.owning_application)
            .await
            .map_err(|e| ApiError::StoreUnavailable(e.to_string()))?;
        if !exists {
            return Err(ApiError::ClientInput("owning_application doesn't exist".to_string()));
        }
    }

    // Step 2: resolve every requested event type; collect what's missing.
    let mut resolved = Vec::with_capacity(base.event_types.len());
    let mut missing: Vec<&String> = Vec::new();
    for name in &base.event_types {
        match event_types.find(name).await.map_err(|e| ApiError::StoreUnavailable(e.to_string()))? {
            Some(info) => resolved.push(info),
            None => missing.push(name),
        }
    }
    if !missing.is_empty() {
        missing.sort();
        let joined = missing.iter().map(|n| format!("'{n}'")).collect::<Vec<_>>().join(",");
        return Err(ApiError::ClientInput(format!(
            "Failed to create subscription, event type(s) not found: {joined}"
        )));
    }

    // Step 3: every resolved event type's read scopes must be satisfied.
    for info in &resolved {
        if let Err(ScopeError::Mismatch(missing)) = scope_checker.check(token_scopes, &info.read_scopes) {
            return Err(ApiError::AuthorizationMismatch(missing));
        }
    }

    // Step 4/5: create, or recover the existing subscription on collision.
    match store.create(base.clone(), now).await {
        Ok(subscription) => Ok(CreateOutcome::Created(subscription)),
        Err(StoreError::DuplicatedSubscription) => match store.get_by_base(&base).await {
            Ok(Some(existing)) => Ok(CreateOutcome::AlreadyExists(existing)),
            Ok(None) => {
                tracing::error!("create collided with a duplicate that vanished before recovery lookup");
                Err(ApiError::Internal("subscription creation raced with a concurrent delete".to_string()))
            }
            Err(lookup_err) => {
                tracing::error!(error = %lookup_err, "failed to recover existing subscription after duplication signal");
                Err(ApiError::Internal("failed to resolve a concurrent subscription create".to_string()))
            }
        },
        Err(StoreError::Unavailable(detail)) => Err(ApiError::StoreUnavailable(detail)),
        Err(StoreError::Internal(detail)) => Err(ApiError::Internal(detail)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::app_existence::InMemoryApplicationExistenceChecker;
    use crate::ports::event_type_repo::InMemoryEventTypeRepository;
    use crate::ports::scope_checker::AllowAllMatchingScopeChecker;
    use crate::ports::subscription_store::memory::InMemorySubscriptionStore;

    fn base(group: &str) -> SubscriptionBase {
        SubscriptionBase::new("app-a", vec!["orders.placed".to_string()], group)
    }

    fn event_types() -> InMemoryEventTypeRepository {
        let repo = InMemoryEventTypeRepository::new();
        repo.register("orders.placed", vec!["orders.read".to_string()]);
        repo
    }

    #[tokio::test]
    async fn first_create_succeeds() {
        let store = InMemorySubscriptionStore::new();
        let event_types = event_types();
        let app_existence = InMemoryApplicationExistenceChecker::new();
        let scope_checker = AllowAllMatchingScopeChecker;
        let token = vec!["orders.read".to_string()];

        let request = CreateRequest { base: base("g1"), token_scopes: &token, check_owning_application: false };
        let outcome = create_or_get(request, &store, &event_types, &app_existence, &scope_checker, Utc::now())
            .await
            .unwrap();

        assert!(matches!(outcome, CreateOutcome::Created(_)));
    }

    #[tokio::test]
    async fn second_create_of_same_u_is_idempotent() {
        let store = InMemorySubscriptionStore::new();
        let event_types = event_types();
        let app_existence = InMemoryApplicationExistenceChecker::new();
        let scope_checker = AllowAllMatchingScopeChecker;
        let token = vec!["orders.read".to_string()];

        let first = create_or_get(
            CreateRequest { base: base("g1"), token_scopes: &token, check_owning_application: false },
            &store,
            &event_types,
            &app_existence,
            &scope_checker,
            Utc::now(),
        )
        .await
        .unwrap();
        let first_id = match first {
            CreateOutcome::Created(s) => s.id,
            _ => panic!("expected Created"),
        };

        let second = create_or_get(
            CreateRequest { base: base("g1"), token_scopes: &token, check_owning_application: false },
            &store,
            &event_types,
            &app_existence,
            &scope_checker,
            Utc::now(),
        )
        .await
        .unwrap();

        match second {
            CreateOutcome::AlreadyExists(s) => assert_eq!(s.id, first_id),
            _ => panic!("expected AlreadyExists"),
        }
    }

    #[tokio::test]
    async fn missing_event_types_are_reported_lexicographically() {
        let store = InMemorySubscriptionStore::new();
        let event_types = InMemoryEventTypeRepository::new();
        event_types.register("x", vec![]);
        let app_existence = InMemoryApplicationExistenceChecker::new();
        let scope_checker = AllowAllMatchingScopeChecker;
        let base = SubscriptionBase::new("app-a", vec!["x".to_string(), "y".to_string(), "z".to_string()], "g1");

        let err = create_or_get(
            CreateRequest { base, token_scopes: &[], check_owning_application: false },
            &store,
            &event_types,
            &app_existence,
            &scope_checker,
            Utc::now(),
        )
        .await
        .unwrap_err();

        let message = err.to_string();
        assert!(message.contains("'y','z'"), "message was: {message}");
    }

    #[tokio::test]
    async fn unknown_owning_application_is_rejected_when_gate_enabled() {
        let store = InMemorySubscriptionStore::new();
        let event_types = event_types();
        let app_existence = InMemoryApplicationExistenceChecker::new();
        let scope_checker = AllowAllMatchingScopeChecker;

        let err = create_or_get(
            CreateRequest { base: base("g1"), token_scopes: &[], check_owning_application: true },
            &store,
            &event_types,
            &app_existence,
            &scope_checker,
            Utc::now(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ApiError::ClientInput(_)));
    }

    #[tokio::test]
    async fn missing_scope_is_rejected() {
        let store = InMemorySubscriptionStore::new();
        let event_types = event_types();
        let app_existence = InMemoryApplicationExistenceChecker::new();
        let scope_checker = AllowAllMatchingScopeChecker;

        let err = create_or_get(
            CreateRequest { base: base("g1"), token_scopes: &[], check_owning_application: false },
            &store,
            &event_types,
            &app_existence,
            &scope_checker,
            Utc::now(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ApiError::AuthorizationMismatch(_)));
    }
}
