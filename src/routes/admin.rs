use crate::{
    AppState,
    guard::{RoleGate, with_role_gate},
};
use axum::Router;
use tower_http::services::ServeDir;

/// Console sections and the gate in front of each.
pub fn sections() -> Vec<(&'static str, RoleGate)> {
    vec![
        ("/dashboard", RoleGate::staff()),
        ("/finance", RoleGate::finance()),
        ("/marketing", RoleGate::marketing()),
        ("/moderation", RoleGate::moderator()),
        ("/support", RoleGate::support()),
        ("/users", RoleGate::admin()),
        ("/settings", RoleGate::super_admin_only()),
    ]
}

/// Admin Router Module
///
/// Serves each console section from `pages_dir/<section>/` behind its role gate.
/// Visitors without a session are redirected to `/login`, visitors whose role is
/// not on the section's list to `/unauthorized`; the files are only read for
/// authorized visitors.
pub fn admin_routes(state: &AppState) -> Router<AppState> {
    sections()
        .into_iter()
        .fold(Router::new(), |router, (path, gate)| {
            let dir = state.config.pages_dir.join(path.trim_start_matches('/'));
            let section = Router::new()
                .nest_service(path, ServeDir::new(dir).append_index_html_on_directories(true));
            router.merge(with_role_gate(section, state.sessions.clone(), gate))
        })
}
