use clap::{Parser, Subcommand};
use dialoguer::{Input, Password};
use dotenvy::dotenv;
use rollbook_cli::{AccountInput, create_admin, create_school, create_superuser, issue_pins};
use rollbook_db::{init_db_pool, run_migrations};
use rollbook_models::SchoolId;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "rollbook-cli")]
#[command(about = "Rollbook CLI - Administrative tools for Rollbook", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct AccountArgs {
    /// Email address (login)
    #[arg(short = 'e', long)]
    email: Option<String>,

    #[arg(short = 'f', long)]
    first_name: Option<String>,

    #[arg(short = 'l', long)]
    last_name: Option<String>,

    /// Password (prompted securely if not provided)
    #[arg(short = 'p', long)]
    password: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a superuser account
    CreateSuperuser {
        #[command(flatten)]
        account: AccountArgs,
    },
    /// Create an administrator for an existing school
    CreateAdmin {
        /// School the administrator manages
        #[arg(short = 's', long)]
        school: Uuid,

        #[command(flatten)]
        account: AccountArgs,
    },
    /// Create a school
    CreateSchool {
        #[arg(short = 'n', long)]
        name: Option<String>,

        #[arg(short = 'a', long)]
        address: Option<String>,
    },
    /// Issue registration PINs and print their codes
    IssuePins {
        /// teacher or student
        #[arg(short = 'c', long)]
        category: String,

        #[arg(short = 'n', long, default_value = "1")]
        count: i64,

        /// Owning school
        #[arg(short = 's', long)]
        school: Option<Uuid>,
    },
    /// Apply pending database migrations
    Migrate,
}

#[tokio::main]
async fn main() {
    dotenv().ok();
    rollbook_observability::init_basic_console_logging();

    let cli = Cli::parse();

    let pool = match init_db_pool().await {
        Ok(pool) => pool,
        Err(e) => {
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::CreateSuperuser { account } => match prompt_account(account) {
            Ok(input) => create_superuser(&pool, &input).await.map(|user| {
                println!("\n✅ Superuser created: {} ({})", user.email, user.id);
            }),
            Err(e) => Err(e),
        },
        Commands::CreateAdmin { school, account } => match prompt_account(account) {
            Ok(input) => create_admin(&pool, &input, SchoolId::from(school))
                .await
                .map(|user| {
                    println!("\n✅ Admin created: {} ({})", user.email, user.id);
                }),
            Err(e) => Err(e),
        },
        Commands::CreateSchool { name, address } => {
            match prompt_or("School name", name) {
                Ok(name) => create_school(&pool, &name, address.as_deref())
                    .await
                    .map(|school| {
                        println!("\n✅ School created: {} ({})", school.name, school.id);
                    }),
                Err(e) => Err(e),
            }
        }
        Commands::IssuePins {
            category,
            count,
            school,
        } => issue_pins(&pool, &category, count, school.map(SchoolId::from))
            .await
            .map(|pins| {
                for pin in &pins {
                    let expires = pin
                        .expires_at
                        .map(|at| at.to_rfc3339())
                        .unwrap_or_else(|| "never".to_string());
                    println!("{}  {}  expires {}", pin.code, pin.category, expires);
                }
                println!("\n✅ Issued {} {} PIN(s)", pins.len(), category);
            }),
        Commands::Migrate => run_migrations(&pool)
            .await
            .map(|_| println!("✅ Migrations applied"))
            .map_err(anyhow::Error::from),
    };

    if let Err(e) = result {
        eprintln!("\n❌ {:#}", e);
        std::process::exit(1);
    }
}

fn prompt_or(prompt: &str, value: Option<String>) -> anyhow::Result<String> {
    match value {
        Some(value) => Ok(value),
        None => Ok(Input::<String>::new().with_prompt(prompt).interact_text()?),
    }
}

fn prompt_account(args: AccountArgs) -> anyhow::Result<AccountInput> {
    let email = prompt_or("Email address", args.email)?;
    let first_name = prompt_or("First name", args.first_name)?;
    let last_name = prompt_or("Last name", args.last_name)?;
    let password = match args.password {
        Some(password) => password,
        None => Password::new()
            .with_prompt("Password")
            .with_confirmation("Confirm password", "Passwords don't match")
            .interact()?,
    };

    Ok(AccountInput {
        email,
        first_name,
        last_name,
        password,
    })
}
