use super::*;
use crate::{
    collection::PageView,
    session::MemoryTokenSlot,
    test_support::{admin_user, member_user, roster, FakeRosterApi, VALID_TOKEN},
};
use shared::domain::SortSpec;

fn console_with(api: &Arc<FakeRosterApi>, slot: Arc<MemoryTokenSlot>) -> RosterConsole {
    RosterConsole::new(api.clone(), slot, ConsoleOptions::default())
}

async fn signed_in(user: User, records: usize) -> (RosterConsole, Arc<FakeRosterApi>, Arc<MemoryTokenSlot>) {
    let email = user.email.clone();
    let api = Arc::new(FakeRosterApi::new(roster(records), user));
    let slot = Arc::new(MemoryTokenSlot::default());
    let mut console = console_with(&api, slot.clone());
    console.sign_in(&email, "secret").await.expect("sign in");
    console.refresh().await.expect("initial fetch");
    (console, api, slot)
}

fn drain(rx: &mut broadcast::Receiver<ConsoleEvent>) -> Vec<ConsoleEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn restore_session_validates_persisted_token() {
    let api = Arc::new(FakeRosterApi::new(Vec::new(), admin_user()));
    let mut console = console_with(&api, Arc::new(MemoryTokenSlot::with_token(VALID_TOKEN)));
    let mut rx = console.subscribe_events();
    assert_eq!(console.gate(), AccessGate::Wait);

    let status = console.restore_session().await;

    assert_eq!(status, SessionStatus::Authenticated);
    assert_eq!(console.gate(), AccessGate::Proceed);
    assert_eq!(
        drain(&mut rx),
        vec![ConsoleEvent::SessionChanged(SessionStatus::Authenticated)]
    );

    console.restore_session().await;
    assert_eq!(*api.me_calls.lock().expect("lock"), 1);
}

#[tokio::test]
async fn failed_sign_in_leaves_session_unauthenticated() {
    let api = Arc::new(FakeRosterApi::new(Vec::new(), admin_user()));
    let slot = Arc::new(MemoryTokenSlot::default());
    let mut console = console_with(&api, slot.clone());

    let err = console
        .sign_in("admin@example.com", "wrong")
        .await
        .expect_err("bad password");

    assert_eq!(err.message(), "Invalid credentials");
    assert_eq!(console.session().status(), SessionStatus::Unauthenticated);
    assert_eq!(slot.read().expect("read"), None);
    assert_eq!(console.gate(), AccessGate::RedirectToLogin);
}

#[tokio::test]
async fn fetching_without_a_session_sends_nothing() {
    let api = Arc::new(FakeRosterApi::new(roster(3), admin_user()));
    let mut console = console_with(&api, Arc::new(MemoryTokenSlot::default()));

    let err = console.refresh().await.expect_err("no session");

    assert_eq!(err, ClientError::NotAuthenticated);
    assert_eq!(api.query_count(), 0);
}

#[tokio::test]
async fn grid_loads_first_page_with_default_sort() {
    let (console, api, _) = signed_in(admin_user(), 15).await;

    let query = api.last_query().expect("query sent");
    assert_eq!(query.page, 1);
    assert_eq!(query.page_size, 10);
    assert_eq!(query.sort, Some(SortSpec::default()));
    assert!(matches!(console.active_collection().current_page(), PageView::Ready(page) if page.employees.len() == 10));
    assert_eq!(console.active_collection().summary(), "Page 1 of 2 (15 total)");
}

#[tokio::test]
async fn switching_to_tiles_refetches_unsorted_with_tile_page_size() {
    let (mut console, api, _) = signed_in(admin_user(), 15).await;

    assert!(console.set_view_mode(ViewMode::Tile).await.expect("tile"));

    let query = api.last_query().expect("query sent");
    assert_eq!(query.page_size, 12);
    assert_eq!(query.sort, None);
    assert_eq!(console.active_collection().records().len(), 12);
    assert!(!console.sort_by(SortField::Name).await.expect("sort"));
    assert_eq!(api.query_count(), 2);
}

#[tokio::test]
async fn view_mode_switch_is_ignored_on_detail_screen() {
    let (mut console, api, _) = signed_in(admin_user(), 3).await;
    let id = console.active_collection().records()[0].id.clone();
    console.select(&id).expect("select");

    assert!(!console.set_view_mode(ViewMode::Tile).await.expect("ignored"));
    assert_eq!(console.navigation().view_mode(), ViewMode::Grid);
    assert_eq!(api.query_count(), 1);

    console.back();
    assert!(console.navigation().is_listing());
}

#[tokio::test]
async fn sorting_the_grid_requests_the_toggled_order() {
    let (mut console, api, _) = signed_in(admin_user(), 5).await;

    assert!(console.sort_by(SortField::Name).await.expect("sort"));

    let sort = api.last_query().and_then(|query| query.sort).expect("sort sent");
    assert_eq!(sort.field, SortField::Name);
    assert_eq!(console.active_collection().records()[0].name, "Employee 01");
}

#[tokio::test]
async fn paging_moves_between_pages_within_bounds() {
    let (mut console, api, _) = signed_in(admin_user(), 15).await;

    console.previous_page().await.expect("no-op");
    assert_eq!(api.query_count(), 1);

    console.next_page().await.expect("next");
    assert_eq!(console.active_collection().page(), 2);
    assert_eq!(console.active_collection().records().len(), 5);

    console.next_page().await.expect("no-op");
    assert_eq!(api.query_count(), 2);

    console.previous_page().await.expect("previous");
    assert_eq!(console.active_collection().page(), 1);
}

#[tokio::test]
async fn non_admins_cannot_open_forms_or_delete() {
    let (mut console, api, _) = signed_in(member_user(), 3).await;
    let id = console.active_collection().records()[0].id.clone();

    assert!(console.affordances().read_only());
    assert!(matches!(console.open_create_form(), Err(ClientError::Forbidden(_))));
    assert!(matches!(console.open_edit_form(&id), Err(ClientError::Forbidden(_))));
    assert!(matches!(console.request_delete(&id), Err(ClientError::Forbidden(_))));
    assert!(console.form().is_none());
    assert!(api.deleted.lock().expect("lock").is_empty());
}

#[tokio::test]
async fn create_closes_form_and_refetches_the_collection() {
    let (mut console, api, _) = signed_in(admin_user(), 2).await;
    let mut rx = console.subscribe_events();

    let form = console.open_create_form().expect("admin form");
    form.draft_mut().name = "Katherine".to_string();
    form.draft_mut().age = "33".to_string();
    form.draft_mut().class = "B".to_string();
    let outcome = console.submit_form().await.expect("create");

    assert!(matches!(outcome, MutationOutcome::Created(_)));
    assert!(console.form().is_none());
    assert_eq!(api.query_count(), 2);
    assert_eq!(console.active_collection().total_count(), 3);

    let events = drain(&mut rx);
    assert!(matches!(events.first(), Some(ConsoleEvent::MutationSucceeded(_))));
    assert!(events
        .iter()
        .any(|event| matches!(event, ConsoleEvent::PageLoaded { .. })));
}

#[tokio::test]
async fn edit_refetch_shows_the_updated_record() {
    let (mut console, _api, _) = signed_in(admin_user(), 2).await;
    let id = console.active_collection().records()[0].id.clone();

    console
        .open_edit_form(&id)
        .expect("edit form")
        .draft_mut()
        .name = "Updated Name".to_string();
    console.submit_form().await.expect("update");

    let record = console.active_collection().find(&id).expect("still listed");
    assert_eq!(record.name, "Updated Name");
}

#[tokio::test]
async fn failed_submission_keeps_the_form_open() {
    let (mut console, api, _) = signed_in(admin_user(), 2).await;
    let mut rx = console.subscribe_events();
    let form = console.open_create_form().expect("admin form");
    form.draft_mut().name = "Bad Age".to_string();
    form.draft_mut().age = "abc".to_string();

    let err = console.submit_form().await.expect_err("rejected");

    let form = console.form().expect("form still open");
    assert_eq!(form.draft().name, "Bad Age");
    assert_eq!(form.last_error(), Some(err.message().as_str()));
    assert_eq!(api.query_count(), 1);
    assert_eq!(drain(&mut rx), vec![ConsoleEvent::MutationFailed(err.message())]);
}

#[tokio::test]
async fn confirmed_delete_refetches_and_clamps_an_emptied_page() {
    let (mut console, api, _) = signed_in(admin_user(), 11).await;
    console.next_page().await.expect("page 2");
    let id = console.active_collection().records()[0].id.clone();

    let request = console.request_delete(&id).expect("admin delete");
    let confirmed = request.resolve(true).expect("confirmed");
    let outcome = console.confirm_delete(confirmed).await.expect("delete");

    assert_eq!(outcome, MutationOutcome::Deleted(id.clone()));
    assert_eq!(api.roster.lock().expect("lock").len(), 10);
    assert_eq!(console.active_collection().page(), 1);
    assert_eq!(console.active_collection().records().len(), 10);
    assert!(console.active_collection().find(&id).is_none());
}

#[tokio::test]
async fn rejected_token_mid_session_expires_the_session() {
    let (mut console, api, slot) = signed_in(admin_user(), 5).await;
    let mut rx = console.subscribe_events();
    api.fail_next(ClientError::Unauthenticated("Token expired".to_string()));

    let err = console.refresh().await.expect_err("expired");

    assert!(err.requires_reauth());
    assert_eq!(console.gate(), AccessGate::RedirectToLogin);
    assert_eq!(slot.read().expect("read"), None);
    assert_eq!(console.active_collection().current_page(), PageView::Idle);

    let events = drain(&mut rx);
    assert!(events.contains(&ConsoleEvent::SessionExpired));
    assert!(events.contains(&ConsoleEvent::FetchFailed("Token expired".to_string())));
}

#[tokio::test]
async fn transport_failure_keeps_the_session() {
    let (mut console, api, _) = signed_in(admin_user(), 5).await;
    api.fail_next(ClientError::Transport("connection reset".to_string()));

    console.refresh().await.expect_err("transport failure");

    assert_eq!(console.gate(), AccessGate::Proceed);
    assert!(matches!(console.active_collection().current_page(), PageView::Failed(_)));
}

#[tokio::test]
async fn sign_out_clears_session_and_views() {
    let (mut console, _api, slot) = signed_in(admin_user(), 5).await;
    console.toggle_sidebar();

    console.sign_out().expect("sign out");

    assert_eq!(console.gate(), AccessGate::RedirectToLogin);
    assert_eq!(slot.read().expect("read"), None);
    assert!(!console.navigation().sidebar_open());
    assert!(console.active_collection().last_loaded().is_none());
}

#[tokio::test]
async fn mutations_recheck_role_after_the_session_changes_hands() {
    let (mut console, api, _) = signed_in(admin_user(), 3).await;
    let id = console.active_collection().records()[0].id.clone();
    console.open_create_form().expect("admin form").draft_mut().name = "Late Hire".to_string();
    let confirmed = console.request_delete(&id).expect("admin delete").confirm();

    console
        .session
        .login(VALID_TOKEN.to_string(), member_user())
        .expect("member login");

    let submit = console.submit_form().await.expect_err("member submit");
    let delete = console.confirm_delete(confirmed).await.expect_err("member delete");

    assert!(matches!(submit, ClientError::Forbidden(_)));
    assert!(matches!(delete, ClientError::Forbidden(_)));
    assert!(api.created.lock().expect("lock").is_empty());
    assert!(api.deleted.lock().expect("lock").is_empty());
    assert_eq!(api.roster.lock().expect("lock").len(), 3);
}

#[tokio::test]
async fn sign_in_discards_views_from_the_previous_session() {
    let (mut console, _api, _) = signed_in(admin_user(), 3).await;
    console.toggle_sidebar();
    console.open_create_form().expect("admin form").draft_mut().name = "Draft".to_string();

    console.sign_in("admin@example.com", "secret").await.expect("sign in again");

    assert!(console.form().is_none());
    assert!(!console.navigation().sidebar_open());
    assert!(console.active_collection().last_loaded().is_none());
}
