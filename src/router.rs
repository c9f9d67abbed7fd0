//! Client routes and the auth guard in front of them

use std::fmt;

use log::{info, warn};
use tokio::sync::broadcast::{self, error::TryRecvError};

use crate::error::Result;
use crate::session::{SessionEvent, SessionStore};

/// Screens of the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    /// `/login`
    Login,
    /// `/register`
    Register,
    /// `/`, also reachable as `/home`
    Home,
    /// `/emergency-doctors`
    EmergencyDoctors,
}

impl Route {
    /// Map a path to a route; anything unknown lands on the login screen
    pub fn parse(path: &str) -> Self {
        let trimmed = path.split(['?', '#']).next().unwrap_or_default();
        let trimmed = trimmed.trim_end_matches('/');
        match trimmed {
            "" | "/home" => Route::Home,
            "/login" => Route::Login,
            "/register" => Route::Register,
            "/emergency-doctors" => Route::EmergencyDoctors,
            _ => Route::Login,
        }
    }

    /// Canonical path
    pub fn path(&self) -> &'static str {
        match self {
            Route::Login => "/login",
            Route::Register => "/register",
            Route::Home => "/",
            Route::EmergencyDoctors => "/emergency-doctors",
        }
    }

    /// Whether the screen needs a stored session
    pub fn requires_auth(&self) -> bool {
        matches!(self, Route::Home | Route::EmergencyDoctors)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Current screen plus the auth guard.
///
/// The router subscribes to [`SessionEvent`]s, so a 401 seen by any
/// controller moves it back to the login screen on the next poll.
pub struct Router {
    current: Route,
    sessions: SessionStore,
    events: broadcast::Receiver<SessionEvent>,
}

impl Router {
    /// Start on the login screen
    pub fn new(sessions: SessionStore) -> Self {
        let events = sessions.subscribe();
        Self {
            current: Route::Login,
            sessions,
            events,
        }
    }

    /// The screen currently shown
    pub fn current(&self) -> Route {
        self.current
    }

    /// Move to `route`, redirecting privileged routes to login without a session
    pub fn navigate(&mut self, route: Route) -> Result<Route> {
        let resolved = if route.requires_auth() && self.sessions.load()?.is_none() {
            info!("No session for {}, redirecting to {}", route, Route::Login);
            Route::Login
        } else {
            route
        };
        self.current = resolved;
        Ok(resolved)
    }

    /// Navigate by path
    pub fn navigate_to(&mut self, path: &str) -> Result<Route> {
        self.navigate(Route::parse(path))
    }

    /// Apply pending session events; returns the route afterwards
    pub fn poll_events(&mut self) -> Route {
        loop {
            match self.events.try_recv() {
                Ok(SessionEvent::Invalidated) | Ok(SessionEvent::LoggedOut) => {
                    self.current = Route::Login;
                }
                Ok(SessionEvent::Established) => {}
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!("Router skipped {} session events", skipped);
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
        self.current
    }
}
