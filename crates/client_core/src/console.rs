//! Composition root tying session, collections, navigation and mutations
//! together.

use std::sync::Arc;

use shared::domain::{EmployeeId, SortField, User};
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::{
    api::RosterApi,
    collection::{CollectionView, FetchTicket, GRID_PAGE_SIZE, TILE_PAGE_SIZE},
    error::ClientError,
    mutation::{self, ConfirmedDelete, DeleteRequest, MutationForm, MutationOutcome},
    navigation::{Affordances, Navigation, ViewMode},
    session::{AccessGate, SessionStatus, SessionStore, TokenSlot, ValidationTicket},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsoleOptions {
    pub grid_page_size: u32,
    pub tile_page_size: u32,
}

impl Default for ConsoleOptions {
    fn default() -> Self {
        Self {
            grid_page_size: GRID_PAGE_SIZE,
            tile_page_size: TILE_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleEvent {
    SessionChanged(SessionStatus),
    SessionExpired,
    PageLoaded {
        view_mode: ViewMode,
        page: u32,
        total_pages: u32,
    },
    FetchFailed(String),
    MutationSucceeded(MutationOutcome),
    MutationFailed(String),
}

pub struct RosterConsole {
    api: Arc<dyn RosterApi>,
    session: SessionStore,
    startup_validation: Option<ValidationTicket>,
    navigation: Navigation,
    grid: CollectionView,
    tile: CollectionView,
    form: Option<MutationForm>,
    events: broadcast::Sender<ConsoleEvent>,
}

impl RosterConsole {
    pub fn new(api: Arc<dyn RosterApi>, slot: Arc<dyn TokenSlot>, options: ConsoleOptions) -> Self {
        let (session, startup_validation) = SessionStore::start(slot);
        let (events, _) = broadcast::channel(256);
        Self {
            api,
            session,
            startup_validation,
            navigation: Navigation::default(),
            grid: CollectionView::grid(options.grid_page_size),
            tile: CollectionView::tile(options.tile_page_size),
            form: None,
            events,
        }
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ConsoleEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: ConsoleEvent) {
        let _ = self.events.send(event);
    }

    /// Validates a token restored from the slot. No-op when nothing was
    /// persisted or validation already ran.
    pub async fn restore_session(&mut self) -> SessionStatus {
        if let Some(ticket) = self.startup_validation.take() {
            let result = self.api.me(ticket.token()).await;
            self.session.complete_validation(ticket, result);
            self.emit(ConsoleEvent::SessionChanged(self.session.status()));
        }
        self.session.status()
    }

    pub async fn sign_in(&mut self, email: &str, password: &str) -> Result<&User, ClientError> {
        let payload = self.api.login(email, password).await.map_err(|err| {
            warn!("sign in failed: {err}");
            err
        })?;
        self.session.login(payload.token, payload.user)?;
        self.reset_views();
        self.emit(ConsoleEvent::SessionChanged(self.session.status()));
        self.session.user().ok_or(ClientError::NotAuthenticated)
    }

    pub fn sign_out(&mut self) -> Result<(), ClientError> {
        let result = self.session.logout();
        self.reset_views();
        self.emit(ConsoleEvent::SessionChanged(self.session.status()));
        result
    }

    fn reset_views(&mut self) {
        self.navigation = Navigation::default();
        self.form = None;
        self.grid.reset();
        self.tile.reset();
    }

    fn expire_session(&mut self) {
        self.session.expire();
        self.reset_views();
        self.emit(ConsoleEvent::SessionExpired);
        self.emit(ConsoleEvent::SessionChanged(self.session.status()));
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn gate(&self) -> AccessGate {
        self.session.gate()
    }

    pub fn navigation(&self) -> &Navigation {
        &self.navigation
    }

    pub fn affordances(&self) -> Affordances {
        Affordances::for_user(self.session.user())
    }

    pub fn collection(&self, mode: ViewMode) -> &CollectionView {
        match mode {
            ViewMode::Grid => &self.grid,
            ViewMode::Tile => &self.tile,
        }
    }

    pub fn active_collection(&self) -> &CollectionView {
        self.collection(self.navigation.view_mode())
    }

    fn collection_mut(&mut self, mode: ViewMode) -> &mut CollectionView {
        match mode {
            ViewMode::Grid => &mut self.grid,
            ViewMode::Tile => &mut self.tile,
        }
    }

    fn token(&self) -> Result<String, ClientError> {
        self.session
            .token()
            .map(str::to_owned)
            .ok_or(ClientError::NotAuthenticated)
    }

    fn require_admin(&self, action: &str) -> Result<(), ClientError> {
        self.token()?;
        if self.session.is_admin() {
            Ok(())
        } else {
            Err(ClientError::Forbidden(format!(
                "only administrators can {action}"
            )))
        }
    }

    async fn drive(
        &mut self,
        mode: ViewMode,
        token: String,
        ticket: FetchTicket,
    ) -> Result<(), ClientError> {
        let api = Arc::clone(&self.api);
        let result = self
            .collection_mut(mode)
            .run(api.as_ref(), &token, ticket)
            .await;
        match result {
            Ok(_) => {
                let view = self.collection(mode);
                self.emit(ConsoleEvent::PageLoaded {
                    view_mode: mode,
                    page: view.page(),
                    total_pages: view.total_pages(),
                });
                Ok(())
            }
            Err(err) => {
                if err.requires_reauth() {
                    self.expire_session();
                }
                self.emit(ConsoleEvent::FetchFailed(err.message()));
                Err(err)
            }
        }
    }

    /// Re-fetches the active presentation with unchanged parameters.
    pub async fn refresh(&mut self) -> Result<(), ClientError> {
        let token = self.token()?;
        let mode = self.navigation.view_mode();
        let ticket = self.collection_mut(mode).invalidate();
        self.drive(mode, token, ticket).await
    }

    pub async fn set_page(&mut self, page: u32) -> Result<(), ClientError> {
        let token = self.token()?;
        let mode = self.navigation.view_mode();
        let ticket = self.collection_mut(mode).set_page(page);
        self.drive(mode, token, ticket).await
    }

    pub async fn next_page(&mut self) -> Result<(), ClientError> {
        let view = self.active_collection();
        if !view.has_next() {
            return Ok(());
        }
        let page = view.page() + 1;
        self.set_page(page).await
    }

    pub async fn previous_page(&mut self) -> Result<(), ClientError> {
        let view = self.active_collection();
        if !view.has_previous() {
            return Ok(());
        }
        let page = view.page() - 1;
        self.set_page(page).await
    }

    /// Column click. Returns `false` when the active presentation does not sort.
    pub async fn sort_by(&mut self, field: SortField) -> Result<bool, ClientError> {
        let token = self.token()?;
        let mode = self.navigation.view_mode();
        match self.collection_mut(mode).set_sort(field) {
            Some(ticket) => self.drive(mode, token, ticket).await.map(|()| true),
            None => Ok(false),
        }
    }

    pub async fn set_view_mode(&mut self, mode: ViewMode) -> Result<bool, ClientError> {
        if !self.navigation.set_view_mode(mode) {
            return Ok(false);
        }
        self.refresh().await.map(|()| true)
    }

    pub fn select(&mut self, id: &EmployeeId) -> Result<(), ClientError> {
        let employee = self
            .active_collection()
            .find(id)
            .cloned()
            .ok_or_else(|| ClientError::NotFound(format!("employee {id} is not on this page")))?;
        self.navigation.select(employee);
        Ok(())
    }

    pub fn back(&mut self) {
        self.navigation.back();
    }

    pub fn navigate_home(&mut self) {
        self.navigation.navigate_home();
    }

    pub fn toggle_sidebar(&mut self) {
        self.navigation.toggle_sidebar();
    }

    pub fn open_create_form(&mut self) -> Result<&mut MutationForm, ClientError> {
        self.require_admin("add employees")?;
        Ok(self.form.insert(MutationForm::create()))
    }

    pub fn open_edit_form(&mut self, id: &EmployeeId) -> Result<&mut MutationForm, ClientError> {
        self.require_admin("edit employees")?;
        let form = self
            .active_collection()
            .find(id)
            .map(MutationForm::edit)
            .ok_or_else(|| ClientError::NotFound(format!("employee {id} is not on this page")))?;
        Ok(self.form.insert(form))
    }

    pub fn form(&self) -> Option<&MutationForm> {
        self.form.as_ref()
    }

    pub fn form_mut(&mut self) -> Option<&mut MutationForm> {
        self.form.as_mut()
    }

    pub fn cancel_form(&mut self) {
        self.form = None;
    }

    /// Submits the open form. On success the form closes and the active
    /// collection is re-fetched before returning; on failure the form stays
    /// open with its draft intact.
    pub async fn submit_form(&mut self) -> Result<MutationOutcome, ClientError> {
        self.require_admin("add or edit employees")?;
        let token = self.token()?;
        let api = Arc::clone(&self.api);
        let form = self
            .form
            .as_mut()
            .ok_or_else(|| ClientError::NotFound("no form is open".to_string()))?;
        let result = form.submit(api.as_ref(), &token).await;
        match result {
            Ok(outcome) => {
                self.form = None;
                self.after_mutation(outcome.clone()).await;
                Ok(outcome)
            }
            Err(err) => Err(self.mutation_failed(err)),
        }
    }

    pub fn request_delete(&self, id: &EmployeeId) -> Result<DeleteRequest, ClientError> {
        self.require_admin("delete employees")?;
        self.active_collection()
            .find(id)
            .map(DeleteRequest::new)
            .ok_or_else(|| ClientError::NotFound(format!("employee {id} is not on this page")))
    }

    pub async fn confirm_delete(
        &mut self,
        confirmed: ConfirmedDelete,
    ) -> Result<MutationOutcome, ClientError> {
        self.require_admin("delete employees")?;
        let token = self.token()?;
        let api = Arc::clone(&self.api);
        let result = mutation::delete(api.as_ref(), &token, confirmed).await;
        match result {
            Ok(outcome) => {
                self.after_mutation(outcome.clone()).await;
                Ok(outcome)
            }
            Err(err) => Err(self.mutation_failed(err)),
        }
    }

    async fn after_mutation(&mut self, outcome: MutationOutcome) {
        self.emit(ConsoleEvent::MutationSucceeded(outcome));
        if let Err(err) = self.refresh().await {
            warn!("re-fetch after mutation failed: {err}");
        } else {
            info!("collection re-synchronized after mutation");
        }
    }

    fn mutation_failed(&mut self, err: ClientError) -> ClientError {
        if err.requires_reauth() {
            self.expire_session();
        }
        self.emit(ConsoleEvent::MutationFailed(err.message()));
        err
    }
}

#[cfg(test)]
#[path = "tests/console_tests.rs"]
mod tests;
