//! Role gates for console page sections.
//!
//! A gated section goes through `Loading` (session being resolved) and then lands
//! in exactly one of `Unauthenticated` (redirect to `/login`), `Unauthorized`
//! (redirect to `/unauthorized`) or `Authorized` (the section is served).

use axum::{
    Router,
    extract::{Request, State},
    middleware::{self, Next},
    response::{IntoResponse, Redirect, Response},
};

use crate::{
    auth::token_from_headers,
    session::{Role, SessionState, SessionUser},
};

pub const LOGIN_PATH: &str = "/login";
pub const UNAUTHORIZED_PATH: &str = "/unauthorized";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    Loading,
    Unauthenticated,
    Unauthorized,
    Authorized,
}

impl GuardState {
    pub fn evaluate(session: Option<&SessionUser>, gate: &RoleGate) -> GuardState {
        match session {
            None => GuardState::Unauthenticated,
            Some(user) if gate.allows(&user.role) => GuardState::Authorized,
            Some(_) => GuardState::Unauthorized,
        }
    }

    pub fn redirect_target(&self) -> Option<&'static str> {
        match self {
            GuardState::Unauthenticated | GuardState::Loading => Some(LOGIN_PATH),
            GuardState::Unauthorized => Some(UNAUTHORIZED_PATH),
            GuardState::Authorized => None,
        }
    }
}

/// RoleGate
///
/// An allow-list of roles under a name used in logs. An empty list admits any
/// signed-in user. The presets mirror the console's access tiers; `super_admin`
/// is part of every one of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleGate {
    name: &'static str,
    roles: Vec<Role>,
}

impl RoleGate {
    pub fn new(name: &'static str, roles: &[Role]) -> Self {
        Self {
            name,
            roles: roles.to_vec(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    pub fn allows(&self, role: &Role) -> bool {
        self.roles.is_empty() || self.roles.contains(role)
    }

    pub fn super_admin_only() -> Self {
        Self::new("super_admin", &[Role::SuperAdmin])
    }

    pub fn admin() -> Self {
        Self::new("admin", &[Role::SuperAdmin, Role::Admin])
    }

    pub fn finance() -> Self {
        Self::new("finance", &[Role::SuperAdmin, Role::Admin, Role::Finance])
    }

    pub fn marketing() -> Self {
        Self::new("marketing", &[Role::SuperAdmin, Role::Admin, Role::Marketing])
    }

    pub fn moderator() -> Self {
        Self::new("moderator", &[Role::SuperAdmin, Role::Admin, Role::Moderator])
    }

    pub fn support() -> Self {
        Self::new("support", &[Role::SuperAdmin, Role::Admin, Role::Support])
    }

    /// Every console role. Hosts and travellers are not staff.
    pub fn staff() -> Self {
        Self::new(
            "staff",
            &[
                Role::SuperAdmin,
                Role::Admin,
                Role::Finance,
                Role::Marketing,
                Role::Moderator,
                Role::Support,
            ],
        )
    }
}

#[derive(Clone)]
pub struct GuardContext {
    pub sessions: SessionState,
    pub gate: RoleGate,
}

/// auth_guard
///
/// Middleware body of a gated section. On `Authorized` the resolved `SessionUser`
/// is put into the request extensions before the inner service runs.
pub async fn auth_guard(
    State(ctx): State<GuardContext>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    tracing::debug!(gate = ctx.gate.name(), state = ?GuardState::Loading, %path);

    let session = match token_from_headers(request.headers()) {
        None => None,
        Some(token) => match ctx.sessions.resolve(&token).await {
            Ok(user) => user,
            Err(e) => {
                tracing::warn!(error = %e, gate = ctx.gate.name(), "session lookup failed");
                None
            }
        },
    };

    let state = GuardState::evaluate(session.as_ref(), &ctx.gate);
    tracing::debug!(gate = ctx.gate.name(), ?state, %path);

    match (state.redirect_target(), session) {
        (None, Some(user)) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        (Some(target), _) => Redirect::temporary(target).into_response(),
        (None, None) => Redirect::temporary(LOGIN_PATH).into_response(),
    }
}

/// with_role_gate
///
/// Wraps the routes of `section` in `auth_guard` for `gate`. The fallback stays
/// ungated, so unknown paths elsewhere in the merged app still answer 404.
pub fn with_role_gate<S>(section: Router<S>, sessions: SessionState, gate: RoleGate) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    section.route_layer(middleware::from_fn_with_state(
        GuardContext { sessions, gate },
        auth_guard,
    ))
}
