//! # Circuit Breaker Integration Tests
//!
//! Properties that must hold across the stores, evaluator, command handlers
//! and admission filter.
//!
//! | Property | Test |
//! |----------|------|
//! | Get after Set returns the stored permission | `test_get_after_set_*` |
//! | Non-SUPER_ADMIN cannot authorize, at any level | `test_authorize_requires_super_admin_for_every_level` |
//! | SOME_MSGS without type urls is invalid, for any granter | `test_scoped_grant_without_urls_invalid_for_any_granter` |
//! | Trip succeeds iff every type url is authorized | `test_trip_all_or_nothing_*` |
//! | Trip then Reset flips admission | `test_trip_then_reset_flips_admission` |
//! | Reset on an enabled type is a no-op success | `test_reset_enabled_is_noop` |

use circuit_core::{
    evaluator, AuthorizeRequest, CircuitBreaker, CircuitConfig, CircuitError, Operation,
    Permission, PermissionLevel, ResetRequest, Storage, TripRequest,
};

const AUTHORITY: &str = "gov";

/// Creates a breaker over a temporary store with one bootstrap authority.
fn breaker() -> CircuitBreaker {
    let mut config = CircuitConfig::default();
    config.authority.bootstrap_authorities = vec![AUTHORITY.to_string()];
    CircuitBreaker::with_storage(config, Storage::temporary().unwrap()).unwrap()
}

fn grant(breaker: &CircuitBreaker, grantee: &str, level: PermissionLevel, urls: &[&str]) {
    breaker
        .authorize(&AuthorizeRequest::new(
            AUTHORITY,
            grantee,
            level,
            urls.iter().map(|s| s.to_string()).collect(),
        ))
        .unwrap();
}

fn urls_for(level: PermissionLevel) -> Vec<String> {
    match level {
        PermissionLevel::SomeMsgs => vec!["bank.Send".to_string()],
        _ => vec![],
    }
}

// =============================================================================
// PERMISSION STORE
// =============================================================================

#[test]
fn test_get_after_set_every_level() {
    let breaker = breaker();

    for (i, level) in PermissionLevel::ALL.into_iter().enumerate() {
        let account = format!("account-{i}");
        breaker
            .authorize(&AuthorizeRequest::new(AUTHORITY, &account, level, urls_for(level)))
            .unwrap();
        assert_eq!(breaker.permission(&account).unwrap().level(), level);
    }
}

#[test]
fn test_get_after_set_keeps_allow_list() {
    let breaker = breaker();
    grant(&breaker, "guardian", PermissionLevel::SomeMsgs, &["gov.Vote", "bank.Send"]);

    let permission = breaker.permission("guardian").unwrap();
    assert_eq!(permission, Permission::some_msgs(["bank.Send", "gov.Vote"]).unwrap());
    assert_eq!(permission.limit_type_urls(), vec!["bank.Send", "gov.Vote"]);
}

#[test]
fn test_unknown_account_has_no_access() {
    let breaker = breaker();
    let permission = breaker.permission("stranger").unwrap();
    assert_eq!(permission.level(), PermissionLevel::None);
    assert!(permission.limit_type_urls().is_empty());
}

#[test]
fn test_reauthorize_overwrites() {
    let breaker = breaker();
    grant(&breaker, "ops", PermissionLevel::AllMsgs, &[]);
    grant(&breaker, "ops", PermissionLevel::SomeMsgs, &["bank.Send"]);

    assert_eq!(
        breaker.permission("ops").unwrap(),
        Permission::some_msgs(["bank.Send"]).unwrap()
    );
}

// =============================================================================
// AUTHORIZE
// =============================================================================

#[test]
fn test_authorize_requires_super_admin_for_every_level() {
    let breaker = breaker();
    grant(&breaker, "ops", PermissionLevel::AllMsgs, &[]);
    grant(&breaker, "guardian", PermissionLevel::SomeMsgs, &["bank.Send"]);

    for granter in ["ops", "guardian", "stranger"] {
        for level in PermissionLevel::ALL {
            let request = AuthorizeRequest::new(granter, "target", level, urls_for(level));
            match breaker.authorize(&request) {
                Err(CircuitError::Unauthorized { actor, .. }) => assert_eq!(actor, granter),
                other => panic!("{granter} granting {level}: expected Unauthorized, got {other:?}"),
            }
        }
    }

    assert_eq!(breaker.permission("target").unwrap(), Permission::NoAccess);
}

#[test]
fn test_scoped_grant_without_urls_invalid_for_any_granter() {
    let breaker = breaker();
    grant(&breaker, "admin", PermissionLevel::SuperAdmin, &[]);
    grant(&breaker, "ops", PermissionLevel::AllMsgs, &[]);

    for granter in [AUTHORITY, "admin", "ops", "stranger"] {
        let request = AuthorizeRequest::new(granter, "target", PermissionLevel::SomeMsgs, vec![]);
        assert!(
            matches!(breaker.authorize(&request), Err(CircuitError::InvalidArgument(_))),
            "granter {granter} should get InvalidArgument"
        );
    }
}

#[test]
fn test_authorize_event() {
    let breaker = breaker();
    let event = breaker
        .authorize(&AuthorizeRequest::new(
            AUTHORITY,
            "guardian",
            PermissionLevel::SomeMsgs,
            vec!["bank.Send".to_string()],
        ))
        .unwrap();

    assert_eq!(event.actor, AUTHORITY);
    assert_eq!(event.operation, Operation::Authorize);
    assert_eq!(event.grantee.as_deref(), Some("guardian"));
    assert_eq!(event.level, Some(PermissionLevel::SomeMsgs));
    assert_eq!(event.type_urls, vec!["bank.Send"]);
}

// =============================================================================
// TRIP / RESET
// =============================================================================

#[test]
fn test_trip_empty_list_invalid() {
    let breaker = breaker();
    let err = breaker
        .trip(&TripRequest::new(AUTHORITY, Vec::<String>::new()))
        .unwrap_err();
    assert!(matches!(err, CircuitError::InvalidArgument(_)));

    let err = breaker
        .reset(&ResetRequest::new(AUTHORITY, Vec::<String>::new()))
        .unwrap_err();
    assert!(matches!(err, CircuitError::InvalidArgument(_)));
}

#[test]
fn test_trip_all_or_nothing_matches_evaluator() {
    let requests: [&[&str]; 4] = [
        &["bank.Send"],
        &["bank.Send", "staking.Delegate"],
        &["gov.Vote"],
        &["staking.Delegate", "bank.Send", "gov.Vote"],
    ];
    let actors = [
        ("guardian", Permission::some_msgs(["bank.Send", "staking.Delegate"]).unwrap()),
        ("ops", Permission::AllMsgs),
        ("admin", Permission::SuperAdmin),
        ("stranger", Permission::NoAccess),
    ];

    for (actor, permission) in &actors {
        for type_urls in requests {
            let breaker = breaker();
            if !permission.is_no_access() {
                let scope = permission.limit_type_urls();
                let scope: Vec<&str> = scope.iter().map(String::as_str).collect();
                grant(&breaker, actor, permission.level(), &scope);
            }

            let expected = type_urls
                .iter()
                .all(|type_url| evaluator::can_trip_or_reset(permission, type_url));
            let result = breaker.trip(&TripRequest::new(*actor, type_urls.to_vec()));

            assert_eq!(result.is_ok(), expected, "{actor} tripping {type_urls:?}");
            for type_url in type_urls {
                assert_eq!(breaker.is_disabled(type_url).unwrap(), expected);
            }
            if !expected {
                assert!(matches!(result, Err(CircuitError::Unauthorized { .. })));
            }
        }
    }
}

#[test]
fn test_trip_all_or_nothing_preserves_prior_state() {
    let breaker = breaker();
    grant(&breaker, "guardian", PermissionLevel::SomeMsgs, &["bank.Send", "gov.Vote"]);

    breaker.trip(&TripRequest::new(AUTHORITY, vec!["gov.Vote"])).unwrap();

    // Rejected reset must leave gov.Vote disabled and bank.Send enabled.
    let err = breaker
        .reset(&ResetRequest::new("guardian", vec!["gov.Vote", "staking.Delegate"]))
        .unwrap_err();
    assert!(matches!(err, CircuitError::Unauthorized { .. }));
    assert!(breaker.is_disabled("gov.Vote").unwrap());
    assert!(!breaker.is_disabled("bank.Send").unwrap());
}

#[test]
fn test_trip_then_reset_flips_admission() {
    let breaker = breaker();
    let filter = breaker.admission_filter();

    breaker.trip(&TripRequest::new(AUTHORITY, vec!["bank.Send"])).unwrap();
    assert!(breaker.is_disabled("bank.Send").unwrap());
    match filter.check("bank.Send") {
        Err(CircuitError::CircuitBreakerTripped { type_url }) => assert_eq!(type_url, "bank.Send"),
        other => panic!("expected CircuitBreakerTripped, got {other:?}"),
    }

    breaker.reset(&ResetRequest::new(AUTHORITY, vec!["bank.Send"])).unwrap();
    assert!(!breaker.is_disabled("bank.Send").unwrap());
    assert!(filter.check("bank.Send").is_ok());
}

#[test]
fn test_reset_enabled_is_noop() {
    let breaker = breaker();
    grant(&breaker, "ops", PermissionLevel::AllMsgs, &[]);

    let event = breaker
        .reset(&ResetRequest::new("ops", vec!["bank.Send"]))
        .unwrap();
    assert_eq!(event.operation, Operation::Reset);
    assert!(!breaker.is_disabled("bank.Send").unwrap());
    assert!(breaker.disabled_list().unwrap().is_empty());
}

#[test]
fn test_trip_twice_is_idempotent() {
    let breaker = breaker();
    breaker.trip(&TripRequest::new(AUTHORITY, vec!["bank.Send"])).unwrap();
    breaker.trip(&TripRequest::new(AUTHORITY, vec!["bank.Send"])).unwrap();
    assert_eq!(breaker.disabled_list().unwrap(), vec!["bank.Send"]);
}

#[test]
fn test_malformed_type_url_invalid_before_authorization() {
    let breaker = breaker();
    let err = breaker
        .trip(&TripRequest::new("stranger", vec!["bank Send"]))
        .unwrap_err();
    assert!(matches!(err, CircuitError::InvalidArgument(_)));
}
