/// Router Module Index
///
/// Routes are grouped by the protection they need, and the protection is applied
/// at the module level so a new endpoint cannot silently skip it.

/// Routes reachable without any credentials: health and the login/unauthorized pages.
pub mod public;

/// Routes that need a token: the backend proxy catalog and the session endpoint.
pub mod authenticated;

/// Console page sections, each behind its own role gate.
pub mod admin;
