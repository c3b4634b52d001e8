use std::fmt;

use super::SessionStore;
use crate::db::SlotStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Login,
    Register,
    Dashboard,
    RegisterPatient,
}

impl Route {
    pub fn path(self) -> &'static str {
        match self {
            Route::Login => "/login",
            Route::Register => "/register",
            Route::Dashboard => "/dashboard",
            Route::RegisterPatient => "/patients/register",
        }
    }

    pub fn is_protected(self) -> bool {
        matches!(self, Route::Dashboard | Route::RegisterPatient)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Render(Route),
    Redirect(Route),
}

/// Decides, right before rendering, whether `route` may be shown.
pub fn guard<S: SlotStore>(route: Route, session: &SessionStore<S>) -> Access {
    if route.is_protected() && session.current_identity().is_none() {
        Access::Redirect(Route::Login)
    } else {
        Access::Render(route)
    }
}
