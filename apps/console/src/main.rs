mod config;
mod render;

use std::{
    io::{self, BufRead, Write},
    path::PathBuf,
    sync::Arc,
};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use client_core::{
    AccessGate, ConsoleEvent, Draft, FileTokenSlot, GraphqlClient, MutationOutcome, PageView,
    RosterConsole, ViewMode,
};
use shared::domain::{EmployeeId, EmployeeStatus, SortField};
use tokio::sync::broadcast;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use config::{load_settings, validate_api_url};

#[derive(Parser, Debug)]
#[command(name = "roster-console", about = "Administrative console for the employee roster")]
struct Args {
    /// GraphQL endpoint, overriding configuration.
    #[arg(long, global = true)]
    api_url: Option<String>,
    /// Directory holding the persisted session.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum ViewArg {
    Grid,
    Tile,
}

impl From<ViewArg> for ViewMode {
    fn from(value: ViewArg) -> Self {
        match value {
            ViewArg::Grid => ViewMode::Grid,
            ViewArg::Tile => ViewMode::Tile,
        }
    }
}

#[derive(ClapArgs, Debug)]
struct PageArgs {
    #[arg(long, value_enum, default_value_t = ViewArg::Grid)]
    view: ViewArg,
    #[arg(long, default_value_t = 1)]
    page: u32,
}

#[derive(ClapArgs, Debug)]
struct FieldArgs {
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    age: Option<String>,
    #[arg(long)]
    class: Option<String>,
    #[arg(long)]
    email: Option<String>,
    #[arg(long)]
    phone: Option<String>,
    #[arg(long)]
    department: Option<String>,
    #[arg(long)]
    position: Option<String>,
    /// active, inactive or on_leave
    #[arg(long)]
    status: Option<String>,
    /// NAME:CODE[:CREDITS], repeatable
    #[arg(long = "subject")]
    subjects: Vec<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    Login {
        #[arg(long)]
        email: String,
        /// Read from stdin when omitted.
        #[arg(long)]
        password: Option<String>,
    },
    Logout,
    Whoami,
    List {
        #[command(flatten)]
        paging: PageArgs,
        /// Column to sort by; repeating a column flips its order.
        #[arg(long = "sort")]
        sort: Vec<String>,
    },
    Show {
        id: String,
        #[command(flatten)]
        paging: PageArgs,
    },
    Add {
        #[command(flatten)]
        fields: FieldArgs,
    },
    Edit {
        id: String,
        #[command(flatten)]
        paging: PageArgs,
        #[command(flatten)]
        fields: FieldArgs,
    },
    Delete {
        id: String,
        #[command(flatten)]
        paging: PageArgs,
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },
}

fn read_line(prompt: &str) -> Result<String> {
    print!("{prompt}");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed to read from stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn apply_fields(draft: &mut Draft, fields: &FieldArgs) -> Result<()> {
    let scalars = [
        (&mut draft.name, &fields.name),
        (&mut draft.age, &fields.age),
        (&mut draft.class, &fields.class),
        (&mut draft.email, &fields.email),
        (&mut draft.phone, &fields.phone),
        (&mut draft.department, &fields.department),
        (&mut draft.position, &fields.position),
    ];
    for (target, value) in scalars {
        if let Some(value) = value {
            *target = value.clone();
        }
    }

    if let Some(raw) = &fields.status {
        let status =
            EmployeeStatus::parse(raw).ok_or_else(|| anyhow!("unknown status '{raw}'"))?;
        draft.status = Some(status);
    }

    if !fields.subjects.is_empty() {
        draft.subjects.clear();
    }
    for raw in &fields.subjects {
        let mut parts = raw.splitn(3, ':');
        let name = parts.next().unwrap_or_default();
        let code = parts.next().unwrap_or_default();
        let credits = parts.next().unwrap_or_default();
        if !draft.add_subject(name, code, credits) {
            bail!("subject '{raw}' needs both a name and a code");
        }
    }
    Ok(())
}

async fn load_listing(console: &mut RosterConsole, paging: &PageArgs) -> Result<()> {
    let mode = ViewMode::from(paging.view);
    if mode != console.navigation().view_mode() {
        console.set_view_mode(mode).await?;
    }
    let page = paging.page.max(1);
    let view = console.active_collection();
    if page != view.page() || view.last_loaded().is_none() {
        console.set_page(page).await?;
    }
    Ok(())
}

fn print_listing(console: &RosterConsole) -> Result<()> {
    let view = console.active_collection();
    match view.current_page() {
        PageView::Ready(page) => {
            let text = match console.navigation().view_mode() {
                ViewMode::Grid => render::render_grid(page, view.sort(), console.affordances()),
                ViewMode::Tile => render::render_tiles(page, console.affordances()),
            };
            println!("{text}\n\n{}", view.summary());
            Ok(())
        }
        PageView::Failed(message) => bail!("Error: {message}"),
        PageView::Idle | PageView::Loading => bail!("no page loaded"),
    }
}

fn report_events(events: &mut broadcast::Receiver<ConsoleEvent>) {
    while let Ok(event) = events.try_recv() {
        debug!(?event, "console event");
        if event == ConsoleEvent::SessionExpired {
            eprintln!("Session expired; run `roster-console login` to sign in again.");
        }
    }
}

async fn run(console: &mut RosterConsole, command: Command) -> Result<()> {
    let command = match command {
        Command::Login { email, password } => {
            let password = match password {
                Some(password) => password,
                None => read_line("Password: ")?,
            };
            let user = console.sign_in(&email, &password).await?;
            println!("Signed in as {}", render::render_user(user));
            return Ok(());
        }
        Command::Logout => {
            console.sign_out()?;
            println!("Signed out.");
            return Ok(());
        }
        other => other,
    };

    console.restore_session().await;
    if console.gate() != AccessGate::Proceed {
        bail!("not signed in; run `roster-console login --email <EMAIL>` first");
    }

    match command {
        Command::Login { .. } | Command::Logout => {}
        Command::Whoami => {
            if let Some(user) = console.session().user() {
                println!("{}", render::render_user(user));
            }
        }
        Command::List { paging, sort } => {
            load_listing(console, &paging).await?;
            for raw in &sort {
                let field =
                    SortField::parse(raw).ok_or_else(|| anyhow!("unknown sort column '{raw}'"))?;
                if !console.sort_by(field).await? {
                    bail!("the {} view cannot be sorted", console.navigation().view_mode().as_str());
                }
            }
            print_listing(console)?;
        }
        Command::Show { id, paging } => {
            load_listing(console, &paging).await?;
            console.select(&EmployeeId(id))?;
            if let Some(employee) = console.navigation().selected() {
                println!("{}", render::render_detail(employee));
            }
        }
        Command::Add { fields } => {
            let form = console.open_create_form()?;
            apply_fields(form.draft_mut(), &fields)?;
            if let MutationOutcome::Created(employee) = console.submit_form().await? {
                println!("Created employee {} ({})", employee.name, employee.id);
            }
        }
        Command::Edit { id, paging, fields } => {
            load_listing(console, &paging).await?;
            let form = console.open_edit_form(&EmployeeId(id))?;
            apply_fields(form.draft_mut(), &fields)?;
            if let MutationOutcome::Updated(employee) = console.submit_form().await? {
                println!("Updated employee {} ({})", employee.name, employee.id);
            }
        }
        Command::Delete { id, paging, yes } => {
            load_listing(console, &paging).await?;
            let request = console.request_delete(&EmployeeId(id))?;
            let answer = yes || {
                let reply = read_line(&format!("{} ({}) [y/N] ", request.prompt(), request.name()))?;
                matches!(reply.trim(), "y" | "Y" | "yes")
            };
            match request.resolve(answer) {
                Some(confirmed) => {
                    console.confirm_delete(confirmed).await?;
                    println!("Deleted.");
                }
                None => println!("Delete cancelled."),
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();
    let args = Args::parse();

    let mut settings = load_settings();
    if let Some(api_url) = args.api_url {
        settings.api_url = api_url;
    }
    if let Some(data_dir) = args.data_dir {
        settings.data_dir = Some(data_dir);
    }

    let endpoint = validate_api_url(&settings.api_url)?;
    let data_dir = settings.resolve_data_dir()?;
    debug!(endpoint = %endpoint, data_dir = %data_dir.display(), "starting roster console");

    let api = GraphqlClient::with_timeout(endpoint.as_str(), settings.request_timeout())?;
    let slot = Arc::new(FileTokenSlot::in_dir(&data_dir));
    let mut console = RosterConsole::new(Arc::new(api), slot, settings.console_options());
    let mut events = console.subscribe_events();

    let result = run(&mut console, args.command).await;
    report_events(&mut events);
    result
}
