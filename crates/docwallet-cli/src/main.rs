//! docwallet: personal document wallet on the command line.
//!
//! Set DOCWALLET_GATEWAY_URL and DOCWALLET_GATEWAY_KEY (or SUPABASE_URL and
//! SUPABASE_ANON_KEY). The session is kept in DOCWALLET_SESSION_FILE between runs.

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use docwallet_cli::{
    init_tracing, print_json, render_documents_table, render_stats, render_upload_report,
};
use docwallet_client::{
    overview_documents, shows_view_all, tab_after_upload, DashboardTab, DirectorySink,
    UploadFile, WalletContext,
};
use docwallet_core::constants::OVERVIEW_DOCUMENT_LIMIT;
use docwallet_core::models::User;
use docwallet_core::{
    AppError, DocumentQuery, ErrorMetadata, SortDirection, SortKey, SortState, TypeFilter,
    WalletConfig,
};
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "docwallet", about = "Personal document wallet")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account
    SignUp {
        #[arg(long)]
        email: String,
        #[arg(long, env = "DOCWALLET_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Sign in with email and password
    SignIn {
        #[arg(long)]
        email: String,
        #[arg(long, env = "DOCWALLET_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Sign out and forget the stored session
    SignOut,
    /// Show the signed-in user
    Whoami,
    /// Statistics and the most recent documents
    Overview {
        /// Case-insensitive filename search
        #[arg(long, default_value = "")]
        search: String,
        /// all, image, or a type tag such as pdf
        #[arg(long, default_value = "all")]
        filter: TypeFilter,
    },
    /// List documents
    List {
        #[arg(long, default_value = "")]
        search: String,
        #[arg(long, default_value = "all")]
        filter: TypeFilter,
        /// Sort key: name, date, size or type
        #[arg(long, default_value = "date")]
        sort: SortKey,
        /// Sort ascending instead of descending
        #[arg(long)]
        asc: bool,
        /// Output format: json or table
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Document statistics
    Stats {
        /// Output format: json or table
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Upload one or more files
    Upload {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Download a document by ID
    Download {
        id: Uuid,
        /// Target directory
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
    /// Delete a document by ID
    Delete { id: Uuid },
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        match err.downcast_ref::<AppError>() {
            Some(app_err) => {
                eprintln!("Error: {}", app_err.client_message());
                if let Some(action) = app_err.suggested_action() {
                    eprintln!("Hint: {}", action);
                }
                tracing::debug!(error = %app_err.detailed_message(), "Command failed");
            }
            None => eprintln!("Error: {:#}", err),
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = WalletConfig::from_env().context(
        "Failed to load configuration. Set DOCWALLET_GATEWAY_URL and DOCWALLET_GATEWAY_KEY",
    )?;
    let ctx = WalletContext::from_config(config).await?;

    let result = execute(&ctx, cli.command).await;
    ctx.shutdown();
    result
}

async fn execute(ctx: &WalletContext, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::SignUp { email, password } => {
            match ctx.session().sign_up(&email, &password).await? {
                Some(user) => println!("Account created. Signed in as {}", user.email),
                None => println!("Account created. Check {} to confirm it, then sign in.", email),
            }
        }
        Commands::SignIn { email, password } => {
            ctx.sign_in(&email, &password).await?;
            println!("Signed in as {}", email);
        }
        Commands::SignOut => {
            ctx.sign_out().await?;
            println!("Signed out");
        }
        Commands::Whoami => match ctx.session().current_user() {
            Some(user) => println!("{} ({})", user.email, user.id),
            None => println!("Not signed in"),
        },
        Commands::Overview { search, filter } => {
            require_user(ctx)?;
            ensure_loaded(ctx)?;
            let documents = ctx.documents().documents();

            print!("{}", render_stats(&ctx.documents().stats(Utc::now())));
            println!();
            print!(
                "{}",
                render_documents_table(&overview_documents(&documents, &search, &filter))
            );
            if shows_view_all(documents.len()) {
                println!(
                    "\nShowing {} of {} documents. Run `docwallet list` to view all.",
                    OVERVIEW_DOCUMENT_LIMIT,
                    documents.len()
                );
            }
        }
        Commands::List {
            search,
            filter,
            sort,
            asc,
            format,
        } => {
            require_user(ctx)?;
            ensure_loaded(ctx)?;
            let query = DocumentQuery {
                search,
                filter,
                sort: SortState {
                    key: sort,
                    direction: if asc {
                        SortDirection::Asc
                    } else {
                        SortDirection::Desc
                    },
                },
            };
            let documents = ctx.documents().view(&query);

            match format.as_str() {
                "json" => print_json(&documents)?,
                _ => print!("{}", render_documents_table(&documents)),
            }
        }
        Commands::Stats { format } => {
            require_user(ctx)?;
            ensure_loaded(ctx)?;
            let stats = ctx.documents().stats(Utc::now());

            match format.as_str() {
                "json" => print_json(&stats)?,
                _ => print!("{}", render_stats(&stats)),
            }
        }
        Commands::Upload { files } => {
            require_user(ctx)?;
            let mut prepared = Vec::with_capacity(files.len());
            for path in &files {
                prepared.push(UploadFile::from_path(path).await?);
            }

            let report = ctx.uploads().submit(&prepared).await;
            print!("{}", render_upload_report(&report));

            let total = ctx.documents().documents().len();
            if tab_after_upload(DashboardTab::Upload, total, report.succeeded())
                == DashboardTab::AllDocuments
            {
                println!("You now have {} documents. Run `docwallet list` to view all.", total);
            }

            if report.failed() > 0 {
                anyhow::bail!("{} of {} uploads failed", report.failed(), files.len());
            }
        }
        Commands::Download { id, out } => {
            require_user(ctx)?;
            ensure_loaded(ctx)?;
            let document = ctx
                .documents()
                .find(id)
                .ok_or_else(|| AppError::NotFound(format!("Document {} not found", id)))?;

            let sink = DirectorySink::new(out, ctx.config().request_timeout())?;
            let downloaded = ctx.documents().download(&document, &sink).await?;
            println!("Saved {}", downloaded.path.display());
        }
        Commands::Delete { id } => {
            require_user(ctx)?;
            ensure_loaded(ctx)?;
            let document = ctx
                .documents()
                .find(id)
                .ok_or_else(|| AppError::NotFound(format!("Document {} not found", id)))?;

            ctx.documents().delete(&document).await?;
            println!("Deleted {}", document.filename);
        }
    }

    Ok(())
}

fn require_user(ctx: &WalletContext) -> Result<User, AppError> {
    ctx.session()
        .current_user()
        .ok_or(AppError::NotAuthenticated)
}

/// Surface a failed initial fetch instead of printing an empty list.
fn ensure_loaded(ctx: &WalletContext) -> Result<(), AppError> {
    match ctx.documents().snapshot().error {
        Some(message) => Err(AppError::Gateway(message)),
        None => Ok(()),
    }
}
