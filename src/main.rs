use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use contactbook::cli::{
    handle_attachment_command, handle_backup_command, handle_contact_command,
    handle_link_command, handle_note_command,
};
use contactbook::config::{paths::ContactbookPaths, settings::Settings};
use contactbook::delivery::PlatformCapability;
use contactbook::storage::Storage;

#[derive(Parser)]
#[command(
    name = "contactbook",
    version,
    about = "Personal contact manager with portable backups",
    long_about = "Contactbook keeps contacts with their notes, links and file \
                  attachments, and exports everything to a single backup file \
                  (lossless JSON, optionally password-protected, or a \
                  spreadsheet-friendly workbook)."
)]
struct Cli {
    /// Override platform detection for backup delivery
    #[arg(long, global = true, value_enum)]
    platform: Option<PlatformCapability>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Contact management commands
    #[command(subcommand)]
    Contact(contactbook::cli::ContactCommands),

    /// Note commands
    #[command(subcommand)]
    Note(contactbook::cli::NoteCommands),

    /// Link commands
    #[command(subcommand)]
    Link(contactbook::cli::LinkCommands),

    /// Attachment commands
    #[command(subcommand, alias = "file")]
    Attachment(contactbook::cli::AttachmentCommands),

    /// Backup export, import and inspection
    #[command(subcommand)]
    Backup(contactbook::cli::BackupCommands),

    /// Initialize the data directory and settings
    Init,

    /// Show current configuration and paths
    Config,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Initialize paths and settings
    let paths = ContactbookPaths::new()?;
    let settings = Settings::load_or_create(&paths)?;
    settings.backup.truncation.validate()?;

    // Initialize storage
    let mut storage = Storage::new(paths.clone(), settings.backup.inline_threshold_bytes)?;
    storage.load_all()?;

    match cli.command {
        Some(Commands::Contact(cmd)) => handle_contact_command(&storage, cmd)?,
        Some(Commands::Note(cmd)) => handle_note_command(&storage, cmd)?,
        Some(Commands::Link(cmd)) => handle_link_command(&storage, cmd)?,
        Some(Commands::Attachment(cmd)) => handle_attachment_command(&storage, cmd)?,
        Some(Commands::Backup(cmd)) => {
            let platform = PlatformCapability::detect(cli.platform)?;
            handle_backup_command(&storage, &settings, &paths, platform, cmd)?;
        }
        Some(Commands::Init) => {
            println!("Initializing Contactbook at: {}", paths.base_dir().display());
            storage.save_all()?;
            settings.save(&paths)?;
            println!("Initialization complete!");
            println!();
            println!("Run 'contactbook contact add <NAME>' to add your first contact.");
        }
        Some(Commands::Config) => {
            let platform = PlatformCapability::detect(cli.platform)?;
            println!("Contactbook Configuration");
            println!("=========================");
            println!("Base directory:    {}", paths.base_dir().display());
            println!("Data directory:    {}", paths.data_dir().display());
            println!("Overflow storage:  {}", paths.blob_dir().display());
            println!("Settings file:     {}", paths.settings_file().display());
            println!("Audit log:         {}", paths.audit_log().display());
            println!();
            println!("Delivery:");
            println!("  Platform:        {}", platform);
            println!("  Documents:       {}", paths.documents_dir().display());
            println!("  Cache:           {}", paths.cache_dir().display());
            println!("  App-private:     {}", paths.private_dir().display());
            println!("  Downloads:       {}", paths.downloads_dir().display());
            println!();
            println!("Settings:");
            println!("  Default format:  {}", settings.backup.default_format);
            println!(
                "  Inline limit:    {} bytes",
                settings.backup.inline_threshold_bytes
            );
            println!(
                "  Cell budgets:    picture {}, file {}, thumbnail {}",
                settings.backup.truncation.profile_picture,
                settings.backup.truncation.file_data,
                settings.backup.truncation.thumbnail
            );
            println!(
                "  Key derivation:  Argon2id {} KiB, {} iterations, {} lanes",
                settings.encryption.kdf.memory_kib,
                settings.encryption.kdf.iterations,
                settings.encryption.kdf.parallelism
            );
            println!(
                "  Initialized:     {}",
                if storage.is_initialized() { "Yes" } else { "No" }
            );
        }
        None => {
            println!("Contactbook - contacts, notes, links and attachments");
            println!();
            println!("Run 'contactbook --help' for usage information.");
        }
    }

    Ok(())
}
