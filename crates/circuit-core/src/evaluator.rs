//! # Authorization Evaluator
//!
//! Pure predicates deciding what a [`Permission`] allows. No storage access
//! and no logging: callers load the permission, ask the evaluator, and act.
//!
//! ## Rules
//!
//! | Permission | Authorize | Trip / Reset `t` |
//! |------------|-----------|------------------|
//! | `NONE` | denied | denied |
//! | `SOME_MSGS(list)` | denied | allowed iff `t ∈ list` |
//! | `ALL_MSGS` | denied | allowed |
//! | `SUPER_ADMIN` | allowed | allowed |
//!
//! Multi-identifier requests are evaluated per identifier; a request passes
//! only if every identifier passes.

use circuit_store::Permission;

/// Returns true if `granter` may grant permissions to other accounts.
pub fn can_authorize(granter: &Permission) -> bool {
    matches!(granter, Permission::SuperAdmin)
}

/// Returns true if `actor` may trip or reset `type_url`.
pub fn can_trip_or_reset(actor: &Permission, type_url: &str) -> bool {
    match actor {
        Permission::SuperAdmin | Permission::AllMsgs => true,
        Permission::SomeMsgs(allowed) => allowed.contains(type_url),
        Permission::NoAccess => false,
    }
}

/// Returns the first entry of `type_urls` that `actor` may not trip or reset.
///
/// `None` means the whole request is authorized.
pub fn first_unauthorized<'a, S: AsRef<str>>(
    actor: &Permission,
    type_urls: &'a [S],
) -> Option<&'a str> {
    type_urls
        .iter()
        .map(|type_url| type_url.as_ref())
        .find(|type_url| !can_trip_or_reset(actor, type_url))
}
