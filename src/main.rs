//! `afya`: command-line front end for the AfyaAccess clinic API.
//!
//! Each invocation restores the saved session, checks the route guard for
//! protected commands, and performs one action.

use std::process::ExitCode;

use anyhow::Context;
use clap::{ArgGroup, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use afya_access::api::ClinicApi;
use afya_access::api::models::{Credentials, NewPatient, NewUser, STAFF_ROLES};
use afya_access::app::AppState;
use afya_access::config::Config;
use afya_access::session::guard::{Access, Route};
use afya_access::workflow::Advance;

#[derive(Parser, Debug)]
#[command(name = "afya")]
#[command(about = "Clinic workflow client: sign in, view patients, advance their status")]
struct Cli {
    /// Clinic API base URL (overrides AFYA_API_URL)
    #[arg(long)]
    api_url: Option<String>,

    /// Session database URL (overrides AFYA_SESSION_DB)
    #[arg(long)]
    session_db: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in and remember the session
    Login {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },
    /// Forget the saved session
    Logout,
    /// Show who is signed in
    Whoami,
    /// Create a staff account
    #[command(group(ArgGroup::new("kind").required(true).args(["role", "email"])))]
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        role: Option<String>,
        #[arg(long)]
        email: Option<String>,
    },
    /// List the staff roles accepted at registration
    Roles,
    /// Show the patient dashboard
    Patients,
    /// Move a patient to the next stage
    Advance { id: i64 },
    /// Register a new patient
    Admit {
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: Option<String>,
        /// Date of birth, YYYY-MM-DD
        #[arg(long)]
        dob: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        address: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load()?;
    if let Some(api_url) = cli.api_url {
        config.api_url = api_url;
    }
    if let Some(session_db) = cli.session_db {
        config.session_db = session_db;
    }

    let app = AppState::start(&config)
        .await
        .context("Failed to start client")?;

    match cli.command {
        Command::Login { username, password } => {
            let identity = app
                .session
                .login(&app.api, &Credentials::new(username, password))
                .await?;
            println!("Welcome, {identity}");
        }
        Command::Logout => {
            app.session.logout().await;
            println!("Logged out");
        }
        Command::Whoami => match app.session.current_identity() {
            Some(identity) => println!("Welcome, {identity}"),
            None => println!("Not logged in"),
        },
        Command::Register {
            username,
            password,
            role,
            email,
        } => {
            let user = match (role, email) {
                (Some(role), _) => NewUser::with_role(username, password, role),
                (None, Some(email)) => NewUser::with_email(username, password, email),
                (None, None) => anyhow::bail!("Either --role or --email is required"),
            };
            app.api.register_user(&user).await?;
            println!("Registration successful! Please login.");
        }
        Command::Roles => {
            for role in STAFF_ROLES {
                println!("{role}");
            }
        }
        Command::Patients => {
            if !allowed(&app, Route::Dashboard) {
                return Ok(());
            }
            app.board.load(&app.api, app.bearer().as_deref()).await?;
            print_dashboard(&app);
        }
        Command::Advance { id } => {
            if !allowed(&app, Route::Dashboard) {
                return Ok(());
            }
            let bearer = app.bearer();
            app.board.load(&app.api, bearer.as_deref()).await?;
            match app.board.advance(&app.api, bearer.as_deref(), id).await? {
                Advance::Advanced(record) => {
                    println!("Patient {id} moved to \"{}\"", record.status_label())
                }
                Advance::AlreadyFinal => println!("Patient {id} is already at the final stage"),
                Advance::Pending => println!("Patient {id} already has an update in progress"),
            }
        }
        Command::Admit {
            first_name,
            last_name,
            dob,
            phone,
            address,
        } => {
            if !allowed(&app, Route::RegisterPatient) {
                return Ok(());
            }
            let patient = NewPatient {
                first_name: Some(first_name),
                last_name,
                date_of_birth: dob,
                phone,
                address,
                status: None,
            };
            let created = app
                .board
                .admit(&app.api, app.bearer().as_deref(), &patient)
                .await?;
            println!("Registered patient {} ({})", created.id, created.full_name());
        }
    }

    Ok(())
}

fn allowed(app: &AppState, route: Route) -> bool {
    match app.guard(route) {
        Access::Render(_) => true,
        Access::Redirect(to) => {
            println!("Not logged in. Go to {to} first: afya login --username <name> --password <password>");
            false
        }
    }
}

fn print_dashboard(app: &AppState) {
    let patients = app.board.patients();
    if patients.is_empty() {
        println!("No patients yet");
        return;
    }

    for p in patients {
        println!(
            "{:>5}  {:<28} {:<20} DOB: {}  Phone: {}  Address: {}",
            p.id,
            p.full_name(),
            p.status_label(),
            p.date_of_birth.as_deref().unwrap_or("N/A"),
            p.phone.as_deref().unwrap_or("N/A"),
            p.address.as_deref().unwrap_or("N/A"),
        );
    }
}
