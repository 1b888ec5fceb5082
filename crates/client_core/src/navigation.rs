//! Master-detail navigation, sidebar flag and role-derived affordances.

use shared::domain::{Employee, User};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewMode {
    #[default]
    Grid,
    Tile,
}

impl ViewMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ViewMode::Grid => "grid",
            ViewMode::Tile => "tile",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Screen {
    #[default]
    Listing,
    Detail(Box<Employee>),
}

#[derive(Debug, Clone, Default)]
pub struct Navigation {
    screen: Screen,
    view_mode: ViewMode,
    sidebar_open: bool,
}

impl Navigation {
    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    pub fn view_mode(&self) -> ViewMode {
        self.view_mode
    }

    pub fn sidebar_open(&self) -> bool {
        self.sidebar_open
    }

    pub fn is_listing(&self) -> bool {
        matches!(self.screen, Screen::Listing)
    }

    pub fn selected(&self) -> Option<&Employee> {
        match &self.screen {
            Screen::Detail(employee) => Some(employee),
            Screen::Listing => None,
        }
    }

    pub fn select(&mut self, employee: Employee) {
        debug!(employee_id = %employee.id, "showing employee detail");
        self.screen = Screen::Detail(Box::new(employee));
    }

    pub fn back(&mut self) {
        self.screen = Screen::Listing;
    }

    /// Header or sidebar "home": back to the listing and close the sidebar.
    pub fn navigate_home(&mut self) {
        self.screen = Screen::Listing;
        self.sidebar_open = false;
    }

    /// No effect while a record is shown.
    pub fn set_view_mode(&mut self, mode: ViewMode) -> bool {
        if !self.is_listing() {
            return false;
        }
        self.view_mode = mode;
        true
    }

    pub fn choose_view_mode_from_sidebar(&mut self, mode: ViewMode) -> bool {
        let applied = self.set_view_mode(mode);
        self.sidebar_open = false;
        applied
    }

    pub fn view_mode_toggle_visible(&self) -> bool {
        self.is_listing()
    }

    pub fn toggle_sidebar(&mut self) {
        self.sidebar_open = !self.sidebar_open;
    }

    pub fn close_sidebar(&mut self) {
        self.sidebar_open = false;
    }
}

/// Row/tile-level controls a listing may offer to the current user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Affordances {
    pub can_create: bool,
    pub can_edit: bool,
    pub can_delete: bool,
}

impl Affordances {
    pub fn for_user(user: Option<&User>) -> Self {
        let admin = user.is_some_and(User::is_admin);
        Self {
            can_create: admin,
            can_edit: admin,
            can_delete: admin,
        }
    }

    pub fn read_only(&self) -> bool {
        !(self.can_create || self.can_edit || self.can_delete)
    }
}

#[cfg(test)]
#[path = "tests/navigation_tests.rs"]
mod tests;
