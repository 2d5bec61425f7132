//! HIREBASE CLI

use clap::{Parser, Subcommand};
use colored::Colorize;
use hirebase_app::{AppBuilder, AppRuntime};
use hirebase_core::{AppConfig, UserId};
use hirebase_marketplace::{CompanyPatch, RecruitmentPatch, WishlistJob};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hirebase")]
#[command(about = "HIREBASE - inspect and edit local marketplace state")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,
    
    /// Data directory (overrides the configuration file)
    #[arg(long)]
    data_dir: Option<PathBuf>,
    
    /// Log filter, e.g. "info" or "hirebase_state=debug"
    #[arg(long)]
    log_level: Option<String>,
    
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Employer settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
    
    /// Saved jobs
    Wishlist {
        #[command(subcommand)]
        action: WishlistAction,
    },
    
    /// Direct messages
    Messages {
        #[command(subcommand)]
        action: MessagesAction,
    },
    
    /// Print the effective configuration
    Config,
}

#[derive(Subcommand)]
enum SettingsAction {
    /// Show current settings
    Show,
    
    /// Update company fields
    SetCompany {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        industry: Option<String>,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        website: Option<String>,
    },
    
    /// Set the application deadline in days
    SetDeadline { days: u32 },
    
    /// Restore default settings
    Reset,
}

#[derive(Subcommand)]
enum WishlistAction {
    /// List saved jobs
    List,
    
    /// Save a job
    Add {
        #[arg(long)]
        id: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        company: String,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        salary: Option<String>,
    },
    
    /// Unsave a job
    Remove { id: String },
    
    /// Save or unsave a job
    Toggle {
        #[arg(long)]
        id: String,
        #[arg(long, default_value = "")]
        title: String,
        #[arg(long, default_value = "")]
        company: String,
    },
    
    /// Remove every saved job
    Clear,
}

#[derive(Subcommand)]
enum MessagesAction {
    /// Send a message
    Send {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        /// Message text
        text: String,
    },
    
    /// Show the conversation between two users
    Thread { a: String, b: String },
    
    /// Show one user's conversations
    Inbox { user: String },
    
    /// Count unread messages for a user
    Unread { user: String },
    
    /// Mark a conversation as read
    Read {
        #[arg(long)]
        reader: String,
        #[arg(long)]
        partner: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    
    let mut config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig {
            data_dir: default_data_dir(),
            ..AppConfig::default()
        },
    };
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }
    
    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
    
    if let Commands::Config = cli.command {
        println!("{}", config.to_json()?);
        return Ok(());
    }
    
    let runtime = AppBuilder::new().config(config).build().await?;
    
    let result = match cli.command {
        Commands::Settings { action } => settings(&runtime, action).await,
        Commands::Wishlist { action } => wishlist(&runtime, action).await,
        Commands::Messages { action } => messages(&runtime, action).await,
        Commands::Config => Ok(()),
    };
    
    // Reported on failure too: earlier changes of this run may be session-only
    for (key, status) in runtime.persistence_report() {
        if status != hirebase_core::PersistenceStatus::Durable {
            eprintln!("{} {} changes were not saved ({})", "warning:".yellow(), key, status);
        }
    }
    
    result
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("hirebase"))
        .unwrap_or_else(|| PathBuf::from("./data"))
}

async fn settings(runtime: &AppRuntime, action: SettingsAction) -> anyhow::Result<()> {
    let store = runtime.settings();
    
    match action {
        SettingsAction::Show => {}
        SettingsAction::SetCompany {
            name,
            industry,
            location,
            email,
            website,
        } => {
            store
                .update_company(CompanyPatch {
                    company_name: name,
                    industry,
                    location,
                    email,
                    website,
                    ..Default::default()
                })
                .await?;
            println!("{} company updated", "✓".green());
        }
        SettingsAction::SetDeadline { days } => {
            store
                .update_recruitment(RecruitmentPatch {
                    application_deadline_days: Some(days),
                    ..Default::default()
                })
                .await?;
            println!("{} deadline set to {} days", "✓".green(), days);
        }
        SettingsAction::Reset => {
            store.reset().await?;
            println!("{} settings reset", "✓".green());
        }
    }
    
    let settings = store.read();
    let company = &settings.company;
    let recruitment = &settings.recruitment;
    println!("{}", "Company".bold());
    println!("  name:      {}", company.company_name);
    println!("  industry:  {}", company.industry);
    println!("  size:      {}", company.company_size);
    println!("  location:  {}", company.location);
    println!("  email:     {}", company.email);
    println!("  website:   {}", company.website);
    println!("{}", "Recruitment".bold());
    println!("  deadline:       {} days", recruitment.application_deadline_days);
    println!("  auto reply:     {}", recruitment.auto_reply_enabled);
    println!("  cover letter:   {}", recruitment.require_cover_letter);
    println!("  notify:         {}", recruitment.notify_on_application);
    println!("  visibility:     {:?}", recruitment.default_job_visibility);
    Ok(())
}

async fn wishlist(runtime: &AppRuntime, action: WishlistAction) -> anyhow::Result<()> {
    let store = runtime.wishlist();
    
    match action {
        WishlistAction::List => {
            let wishlist = store.read();
            if wishlist.is_empty() {
                println!("{}", "No saved jobs".dimmed());
            }
            for job in wishlist.iter() {
                println!(
                    "{}  {} at {}{}",
                    job.id.cyan(),
                    job.title.bold(),
                    job.company,
                    job.salary
                        .as_deref()
                        .map(|s| format!(" ({})", s))
                        .unwrap_or_default()
                );
            }
        }
        WishlistAction::Add {
            id,
            title,
            company,
            location,
            salary,
        } => {
            let mut job = WishlistJob::new(id, title, company);
            if let Some(location) = location {
                job = job.with_location(location);
            }
            if let Some(salary) = salary {
                job = job.with_salary(salary);
            }
            let wishlist = store.add(job).await?;
            println!("{} {} saved jobs", "✓".green(), wishlist.len());
        }
        WishlistAction::Remove { id } => {
            let wishlist = store.remove(&id).await?;
            println!("{} {} saved jobs", "✓".green(), wishlist.len());
        }
        WishlistAction::Toggle { id, title, company } => {
            let saved = store.toggle(WishlistJob::new(id.clone(), title, company)).await?;
            let state = if saved { "saved" } else { "removed" };
            println!("{} {} {}", "✓".green(), id, state);
        }
        WishlistAction::Clear => {
            store.clear().await?;
            println!("{} wishlist cleared", "✓".green());
        }
    }
    Ok(())
}

async fn messages(runtime: &AppRuntime, action: MessagesAction) -> anyhow::Result<()> {
    let store = runtime.messaging();
    
    match action {
        MessagesAction::Send { from, to, text } => {
            match store.send_message(UserId::new(from), UserId::new(to), text).await {
                Ok(message) => println!("{} sent {}", "✓".green(), message.id.dimmed()),
                Err(e) => anyhow::bail!("message not sent: {}", e),
            }
        }
        MessagesAction::Thread { a, b } => {
            let (a, b) = (UserId::new(a), UserId::new(b));
            for message in store.conversation_between(&a, &b) {
                let marker = if message.read { " " } else { "*" };
                println!(
                    "{} {} {}: {}",
                    marker,
                    message.timestamp.to_rfc3339().dimmed(),
                    message.sender_id.to_string().bold(),
                    message.content
                );
            }
        }
        MessagesAction::Inbox { user } => {
            let user = UserId::new(user);
            for summary in store.conversations_for(&user) {
                let unread = if summary.unread > 0 {
                    format!("{} unread", summary.unread).yellow().to_string()
                } else {
                    String::new()
                };
                println!(
                    "{}  {}  {}",
                    summary.partner.to_string().bold(),
                    summary.last_message.content,
                    unread
                );
            }
        }
        MessagesAction::Unread { user } => {
            println!("{}", store.unread_count_for(&UserId::new(user)));
        }
        MessagesAction::Read { reader, partner } => {
            let reader = UserId::new(reader);
            store
                .mark_conversation_read(&reader, &UserId::new(partner))
                .await?;
            println!("{} {} unread", "✓".green(), store.unread_count_for(&reader));
        }
    }
    Ok(())
}
