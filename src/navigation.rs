//! Page navigation
//!
//! The game only ever leaves in two directions: to the result page after a
//! catch, or to registration when no player identity is stored.

/// Where the game can send the player
pub trait Navigator {
    /// Result view for the caught coin
    fn show_result(&mut self, target_id: &str);
    /// Registration view, returning to `target_id` afterwards
    fn show_registration(&mut self, target_id: &str);
}

/// A navigation request, as recorded by [`RecordingNavigator`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Result(String),
    Registration(String),
}

impl Route {
    /// Page path for this route
    pub fn path(&self) -> String {
        match self {
            Route::Result(id) => format!("/score/{}", id),
            Route::Registration(id) => format!("/register?from={}", id),
        }
    }
}

/// Navigator that remembers requests instead of leaving the page
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    pub routes: Vec<Route>,
}

impl Navigator for RecordingNavigator {
    fn show_result(&mut self, target_id: &str) {
        self.routes.push(Route::Result(target_id.to_string()));
    }

    fn show_registration(&mut self, target_id: &str) {
        self.routes.push(Route::Registration(target_id.to_string()));
    }
}

/// Navigator backed by `window.location`
#[cfg(target_arch = "wasm32")]
#[derive(Debug, Default)]
pub struct BrowserNavigator;

#[cfg(target_arch = "wasm32")]
impl BrowserNavigator {
    fn go(&self, route: Route) {
        let path = route.path();
        let Some(window) = web_sys::window() else {
            return;
        };
        if let Err(e) = window.location().set_href(&path) {
            log::error!(
                "Navigation to {} failed: {}",
                path,
                crate::error::GameError::js_reason(&e)
            );
        }
    }
}

#[cfg(target_arch = "wasm32")]
impl Navigator for BrowserNavigator {
    fn show_result(&mut self, target_id: &str) {
        self.go(Route::Result(target_id.to_string()));
    }

    fn show_registration(&mut self, target_id: &str) {
        self.go(Route::Registration(target_id.to_string()));
    }
}
