//! mediabucket CLI - browse, import and export media in S3-compatible buckets.
//!
//! Credentials are read from the settings document named in the
//! configuration; sealed values are opened with the configured key or with
//! the passphrase in `MEDIABUCKET_PASSPHRASE`.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use mediabucket_app::{AppConfig, MediaBucket, PASSPHRASE_ENV};
use mediabucket_common::{AttachmentRef, UserId};
use mediabucket_credentials::{store_fields, CredentialScope, SettingsSnapshot};
use mediabucket_crypto::{Salt, SecretKey};
use mediabucket_export::ExportRequest;
use mediabucket_platform::create_default_registry;
use mediabucket_tree::{Lookup, TreeNode};

#[derive(Parser)]
#[command(name = "mediabucket")]
#[command(about = "mediabucket - Media from S3-compatible buckets")]
#[command(version)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Configuration file (default: $MEDIABUCKET_CONFIG or the user config directory).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// User whose credentials are used when stored per user.
    #[arg(short, long, global = true)]
    user: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Scope {
    Global,
    User,
}

impl From<Scope> for CredentialScope {
    fn from(scope: Scope) -> Self {
        match scope {
            Scope::Global => CredentialScope::Global,
            Scope::User => CredentialScope::User,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create a configuration with a fresh sealing key.
    Init {
        /// Derive the key from $MEDIABUCKET_PASSPHRASE instead of storing it.
        #[arg(long)]
        passphrase: bool,

        /// Replace an existing configuration.
        #[arg(long)]
        force: bool,
    },

    /// Show the supported platforms and their fields.
    Platforms,

    /// Store fields of a platform in the settings document.
    Configure {
        /// Platform name, e.g. "aws-s3".
        #[arg(short, long)]
        platform: String,

        /// Where the fields are kept.
        #[arg(short, long, value_enum, default_value = "global")]
        scope: Scope,

        /// Field values as name=value.
        #[arg(short, long = "field", value_parser = parse_field)]
        fields: Vec<(String, String)>,
    },

    /// Check the stored credentials against the bucket.
    Login {
        #[arg(short, long)]
        platform: String,
    },

    /// List a directory of a bucket.
    List {
        #[arg(short, long)]
        platform: String,

        /// Directory to show (default: bucket root).
        #[arg(short, long)]
        dir: Option<String>,

        /// Print the tree as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Plan the import of a directory in batches.
    Import {
        #[arg(short, long)]
        platform: String,

        #[arg(short, long)]
        dir: Option<String>,

        /// Include sub-directories.
        #[arg(short, long)]
        recursive: bool,
    },

    /// Upload a local file and print its public URL.
    Export {
        /// Attachment identifier the export is recorded for.
        #[arg(short, long)]
        attachment: String,

        /// Local file to upload.
        #[arg(short, long)]
        file: PathBuf,

        /// Target directory, e.g. "aws-s3://media/2024/".
        #[arg(short, long)]
        target: String,
    },

    /// Delete the object an attachment was exported to.
    Delete {
        #[arg(short, long)]
        attachment: String,

        /// Public URL of the exported object.
        #[arg(long)]
        url: String,
    },

    /// Show which platform a URL belongs to and its object key.
    Resolve {
        #[arg(long)]
        url: String,
    },

    /// Seal a single value with the configured key.
    EncryptSecret {
        #[arg(long)]
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config_path = cli.config.clone().unwrap_or_else(AppConfig::default_path);
    let user = cli
        .user
        .as_deref()
        .map(UserId::new)
        .transpose()
        .context("Invalid user")?;
    let user = user.as_ref();

    match cli.command {
        Commands::Init { passphrase, force } => cmd_init(&config_path, passphrase, force),

        Commands::Platforms => cmd_platforms(),

        Commands::Configure {
            platform,
            scope,
            fields,
        } => cmd_configure(&config_path, &platform, scope.into(), user, &fields),

        Commands::Login { platform } => cmd_login(&config_path, &platform, user).await,

        Commands::List {
            platform,
            dir,
            json,
        } => cmd_list(&config_path, &platform, dir.as_deref(), json, user).await,

        Commands::Import {
            platform,
            dir,
            recursive,
        } => cmd_import(&config_path, &platform, dir.as_deref(), recursive, user).await,

        Commands::Export {
            attachment,
            file,
            target,
        } => cmd_export(&config_path, &attachment, file, &target, user).await,

        Commands::Delete { attachment, url } => {
            cmd_delete(&config_path, &attachment, &url, user).await
        }

        Commands::Resolve { url } => cmd_resolve(&config_path, &url, user),

        Commands::EncryptSecret { value } => cmd_encrypt_secret(&config_path, &value),
    }
}

fn parse_field(raw: &str) -> std::result::Result<(String, String), String> {
    raw.split_once('=')
        .map(|(name, value)| (name.trim().to_string(), value.to_string()))
        .ok_or_else(|| format!("Expected name=value, got '{}'", raw))
}

fn passphrase() -> Option<String> {
    std::env::var(PASSPHRASE_ENV).ok().filter(|p| !p.is_empty())
}

fn load_config(path: &Path) -> Result<AppConfig> {
    AppConfig::load(path).with_context(|| format!("Failed to load {}", path.display()))
}

fn open_bucket(config_path: &Path) -> Result<MediaBucket> {
    let config = load_config(config_path)?;
    MediaBucket::from_config(&config, passphrase().as_deref()).context("Failed to set up media bucket")
}

/// Write a new configuration.
fn cmd_init(path: &Path, use_passphrase: bool, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!("{} already exists, use --force to replace it", path.display());
    }

    let mut config = AppConfig::default();
    if use_passphrase {
        if passphrase().is_none() {
            anyhow::bail!("Set {} to derive the key from a passphrase", PASSPHRASE_ENV);
        }
        config.salt = Some(Salt::generate().to_base64());
    } else {
        config.secret_key = Some(SecretKey::generate().to_base64());
    }

    config.save(path).context("Failed to write configuration")?;
    println!("Configuration written to {}", path.display());
    println!("  Settings: {}", config.settings_path.display());
    println!("  Records:  {}", config.records_path.display());
    Ok(())
}

/// Print the built-in platforms.
fn cmd_platforms() -> Result<()> {
    let registry = create_default_registry();
    for descriptor in registry.descriptors() {
        println!("{} ({})", descriptor.name, descriptor.label);
        println!("  Public URL: {}", descriptor.public_url_template);
        for field in descriptor.fields {
            let mut notes = Vec::new();
            if field.is_secret() {
                notes.push("secret".to_string());
            }
            if !field.required {
                notes.push("optional".to_string());
            }
            if let Some(default) = field.default {
                notes.push(format!("default {}", default));
            }
            let notes = if notes.is_empty() {
                String::new()
            } else {
                format!(" [{}]", notes.join(", "))
            };
            println!("  {:<14} {}{}", field.name, field.label, notes);
        }
        if !descriptor.regions.is_empty() {
            println!("  Regions: {}", descriptor.regions.join(", "));
        }
    }
    Ok(())
}

/// Store platform fields.
fn cmd_configure(
    config_path: &Path,
    platform: &str,
    scope: CredentialScope,
    user: Option<&UserId>,
    fields: &[(String, String)],
) -> Result<()> {
    let config = load_config(config_path)?;
    let secrets = config
        .secret_store(passphrase().as_deref())
        .context("Failed to open secret store")?;
    let descriptor = create_default_registry()
        .descriptor(platform)
        .context("Unknown platform")?;

    let mut settings =
        SettingsSnapshot::load(&config.settings_path).context("Failed to load settings")?;
    store_fields(&mut settings, descriptor, scope, user, fields, secrets.as_ref())
        .context("Failed to store fields")?;
    settings
        .save(&config.settings_path)
        .context("Failed to save settings")?;

    println!("{} configured ({} fields)", descriptor.label, fields.len());
    Ok(())
}

/// Check credentials.
async fn cmd_login(config_path: &Path, platform: &str, user: Option<&UserId>) -> Result<()> {
    let bucket = open_bucket(config_path)?;
    bucket
        .login(platform, user)
        .await
        .context("Login failed")?;

    println!("Credentials for {} are valid.", platform);
    Ok(())
}

/// List a directory.
async fn cmd_list(
    config_path: &Path,
    platform: &str,
    dir: Option<&str>,
    json: bool,
    user: Option<&UserId>,
) -> Result<()> {
    let bucket = open_bucket(config_path)?;
    let located = bucket
        .list(platform, dir, user)
        .await
        .context("Failed to list directory")?;

    if json {
        println!("{}", located.tree.to_json()?);
        return Ok(());
    }

    if located.lookup == Lookup::NotFound {
        println!("Directory not found, showing the whole bucket.");
    }
    if located.tree.is_empty() {
        println!("Directory is empty.");
    } else {
        println!("Contents of {}:", located.tree.key);
        print_tree(&located.tree, 1);
    }
    Ok(())
}

fn print_tree(node: &TreeNode, depth: usize) {
    let indent = "  ".repeat(depth);
    for dir in &node.dirs {
        println!("{}[DIR]  {}/", indent, dir.title);
        print_tree(dir, depth + 1);
    }
    for file in &node.files {
        println!(
            "{}[FILE] {} ({}, {} bytes)",
            indent, file.title, file.mime_type, file.size
        );
    }
}

/// Plan an import.
async fn cmd_import(
    config_path: &Path,
    platform: &str,
    dir: Option<&str>,
    recursive: bool,
    user: Option<&UserId>,
) -> Result<()> {
    let bucket = open_bucket(config_path)?;
    let job = bucket
        .import_plan(platform, dir, recursive, user)
        .await
        .context("Failed to plan import")?;

    if job.plan.is_empty() {
        println!("Nothing to import from {}.", job.plan.directory);
        return Ok(());
    }

    println!(
        "{} files from {} in batches of {}:",
        job.plan.len(),
        job.plan.directory,
        job.batch_size
    );
    for (index, batch) in job.batches().enumerate() {
        println!("Batch {}:", index + 1);
        for item in batch {
            println!("  {} ({})", item.url, item.mime_type);
        }
    }
    Ok(())
}

/// Export a file.
async fn cmd_export(
    config_path: &Path,
    attachment: &str,
    file: PathBuf,
    target: &str,
    user: Option<&UserId>,
) -> Result<()> {
    info!("Exporting {} to {}", file.display(), target);

    let attachment = AttachmentRef::new(attachment).context("Invalid attachment")?;
    let bucket = open_bucket(config_path)?;
    let request = ExportRequest::new(attachment, file, target);

    let (platform, url) = bucket
        .export_file(&request, user)
        .await
        .context("Export failed")?;

    println!("Exported to {}: {}", platform, url);
    Ok(())
}

/// Delete an exported file.
async fn cmd_delete(
    config_path: &Path,
    attachment: &str,
    url: &str,
    user: Option<&UserId>,
) -> Result<()> {
    let attachment = AttachmentRef::new(attachment).context("Invalid attachment")?;
    let bucket = open_bucket(config_path)?;

    bucket
        .delete_exported_file(url, &attachment, user)
        .await
        .context("Delete failed")?;

    println!("Deleted {}", url);
    Ok(())
}

/// Explain a URL.
fn cmd_resolve(config_path: &Path, url: &str, user: Option<&UserId>) -> Result<()> {
    let bucket = open_bucket(config_path)?;
    let resolved = bucket
        .resolve_url(url, user)
        .context("URL does not belong to a supported platform")?;

    println!("Platform:  {}", resolved.platform);
    println!("Key:       {}", resolved.key);
    println!("Requested: {}", resolved.requested);
    println!(
        "Mime type: {}",
        resolved.mime_type.as_deref().unwrap_or("unknown")
    );
    Ok(())
}

/// Seal a value for manual entry in the settings document.
fn cmd_encrypt_secret(config_path: &Path, value: &str) -> Result<()> {
    let config = load_config(config_path)?;
    let secrets = config
        .secret_store(passphrase().as_deref())
        .context("Failed to open secret store")?;
    println!("{}", secrets.encrypt(value).context("Failed to seal value")?);
    Ok(())
}
