//! ALFA Notes Vault - CLI
//!
//! Command-line interface for vault operations.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand};
use zeroize::Zeroizing;

use alfa_notes_vault::{
    generate_mnemonic, AppConfig, Note, NotesVault, SqliteStore, VaultError, VaultId,
};

/// Environment variable that may carry the recovery phrase
const ENV_MNEMONIC: &str = "ALFA_NOTES_MNEMONIC";

#[derive(Parser)]
#[command(name = "alfa-notes")]
#[command(author = "Karen Tonoyan")]
#[command(version = alfa_notes_vault::VERSION)]
#[command(about = "ALFA Notes Vault - Encrypted notes behind a 12-word phrase")]
struct Cli {
    /// Config file (defaults to <data_dir>/config.json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a recovery phrase and create its vault
    New {
        /// Display name
        #[arg(short, long)]
        name: Option<String>,
    },

    /// List vaults known on this device
    Profiles,

    /// Rename a vault
    Rename {
        /// Vault ID
        id: String,

        /// New display name
        name: String,
    },

    /// Permanently destroy a vault and everything stored for it
    Destroy {
        /// Vault ID
        id: String,

        /// Confirm destruction
        #[arg(long)]
        yes: bool,
    },

    /// Add a note
    Add {
        title: String,

        text: String,

        /// Tag (repeatable)
        #[arg(short, long = "tag")]
        tags: Vec<String>,

        #[arg(short, long)]
        summary: Option<String>,
    },

    /// List notes
    List {
        /// Only notes carrying every given tag
        #[arg(short, long = "tag")]
        tags: Vec<String>,
    },

    /// Delete a note
    Delete {
        /// Note ID
        id: String,
    },

    /// Search notes
    Search {
        query: String,

        #[arg(short, long = "tag")]
        tags: Vec<String>,

        /// Rank by embedding similarity instead of substring match
        #[arg(long)]
        semantic: bool,
    },

    /// Embed every note that has no vector yet
    Index,

    /// Export notes as plaintext JSON
    Export {
        /// Output path
        output: PathBuf,
    },

    /// Merge notes from an exported JSON file
    Import {
        /// Input path
        input: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = AppConfig::load(cli.config.as_deref()).context("loading config")?;
    let store = Arc::new(
        SqliteStore::open(&config.database_path())
            .with_context(|| format!("opening {}", config.database_path().display()))?,
    );
    let vault = NotesVault::new(store);

    match cli.command {
        Commands::New { name } => {
            println!("🔐 Creating new ALFA Notes Vault...");
            let phrase = generate_mnemonic()?;
            let profile = vault.unlock_with(phrase.clone(), name.as_deref())?;
            vault.persist()?;

            println!("✅ Vault created: {} ({})", profile.display_name, profile.vault_id);
            println!();
            println!("📝 Recovery phrase - write it down, it is the only way in:");
            println!();
            println!("   {}", phrase.expose());
            println!();
        }

        Commands::Profiles => {
            let profiles = vault.registry().list_profiles()?;

            if profiles.is_empty() {
                println!("📭 No vaults on this device");
            } else {
                println!("🗂️ Vaults ({}):", profiles.len());
                println!("{:-<60}", "");
                for p in profiles {
                    let bio = if p.has_biometric { "👆" } else { "  " };
                    println!(
                        "{} {}  {:<24} last active {}",
                        bio,
                        p.vault_id,
                        p.display_name,
                        p.last_active.format("%Y-%m-%d %H:%M")
                    );
                }
            }
        }

        Commands::Rename { id, name } => {
            let id = VaultId::parse(&id)?;
            let profile = vault.registry().rename_profile(&id, &name)?;
            println!("✅ Renamed to: {}", profile.display_name);
        }

        Commands::Destroy { id, yes } => {
            let id = VaultId::parse(&id)?;
            if !yes {
                bail!("refusing to destroy {} without --yes", id);
            }

            print!("⚠️ This permanently deletes vault {}. Type its ID to confirm: ", id);
            io::stdout().flush()?;
            let mut typed = String::new();
            io::stdin().lock().read_line(&mut typed)?;
            if typed.trim() != id.as_str() {
                bail!("confirmation did not match, nothing deleted");
            }

            vault.destroy(&id)?;
            println!("🗑️ Vault {} destroyed", id);
        }

        Commands::Add {
            title,
            text,
            tags,
            summary,
        } => {
            open(&vault)?;
            let mut note = Note::new(title, text).with_tags(tags);
            note.summary = summary;
            let id = vault.add_note(note)?;
            println!("✅ Note added with ID: {}", id);
        }

        Commands::List { tags } => {
            open(&vault)?;
            let ranked = vault.search(None, "", &tags)?;

            if ranked.is_empty() {
                println!("📭 No notes");
            } else {
                println!("📒 Notes ({}):", ranked.len());
                println!("{:-<60}", "");
                for r in ranked {
                    print_note(&r.note, None);
                }
            }
        }

        Commands::Delete { id } => {
            open(&vault)?;
            let note = vault.delete_note(&id)?;
            println!("🗑️ Deleted: {}", note.title);
        }

        Commands::Search {
            query,
            tags,
            semantic,
        } => {
            open(&vault)?;

            let ranked = if semantic {
                let vector = embedding::indexer(&config)?.embed_query(&query).await?;
                vault.search(Some(vector.as_slice()), &query, &tags)?
            } else {
                vault.search(None, &query, &tags)?
            };

            if ranked.is_empty() {
                println!("🔍 No matches");
            }
            for r in ranked {
                print_note(&r.note, r.score);
            }
        }

        Commands::Index => {
            open(&vault)?;
            let report = embedding::indexer(&config)?.index_vault(&vault).await?;

            println!("✅ Embedded: {}", report.embedded.len());
            if !report.is_complete() {
                println!("⚠️ Failed: {}", report.failed.len());
                for (id, e) in &report.failed {
                    println!("   - {}: {}", id, e);
                }
            }
        }

        Commands::Export { output } => {
            open(&vault)?;
            let json = Zeroizing::new(vault.export()?);
            std::fs::write(&output, json.as_bytes())
                .with_context(|| format!("writing {}", output.display()))?;
            println!("📤 Notes exported to: {} (plaintext!)", output.display());
        }

        Commands::Import { input } => {
            open(&vault)?;
            let json = Zeroizing::new(
                std::fs::read_to_string(&input)
                    .with_context(|| format!("reading {}", input.display()))?,
            );
            let report = vault.import(&json)?;
            println!(
                "📥 Imported: {} added, {} updated, {} unchanged",
                report.added, report.updated, report.skipped
            );
        }
    }

    vault.lock();
    Ok(())
}

/// Unlock with a phrase from the environment or an interactive prompt
fn open(vault: &NotesVault<SqliteStore>) -> anyhow::Result<()> {
    let phrase = match std::env::var(ENV_MNEMONIC) {
        Ok(p) if !p.trim().is_empty() => Zeroizing::new(p),
        _ => Zeroizing::new(rpassword::prompt_password("🔑 Recovery phrase: ")?),
    };

    match vault.unlock(&phrase, None) {
        Ok(profile) => {
            log::debug!("Opened {}", profile.display_name);
            Ok(())
        }
        Err(e @ (VaultError::InvalidMnemonic | VaultError::AuthenticationFailed)) => {
            Err(anyhow!(e.unlock_message()))
        }
        Err(e) => Err(e.into()),
    }
}

fn print_note(note: &Note, score: Option<f32>) {
    let indexed = if note.vector.is_some() { "🧠" } else { "  " };
    let score = score.map(|s| format!("{:.3} ", s)).unwrap_or_default();
    let tags = if note.tags.is_empty() {
        String::new()
    } else {
        format!(" [{}]", note.tags.join(", "))
    };
    println!("{} {}{} - {}{}", indexed, score, note.id, note.title, tags);
}

#[cfg(feature = "http-embeddings")]
mod embedding {
    use alfa_notes_vault::embeddings::HttpEmbeddingClient;
    use alfa_notes_vault::{AppConfig, SemanticIndexer};

    pub fn indexer(config: &AppConfig) -> anyhow::Result<SemanticIndexer<HttpEmbeddingClient>> {
        let client = HttpEmbeddingClient::new(&config.embedding)?;
        Ok(SemanticIndexer::new(client, config.retry.clone()))
    }
}

#[cfg(not(feature = "http-embeddings"))]
mod embedding {
    use std::future::Future;

    use alfa_notes_vault::embeddings::EmbeddingError;
    use alfa_notes_vault::{AppConfig, EmbeddingService, SemanticIndexer};

    /// Service type for builds without an HTTP client
    pub struct Disabled;

    impl EmbeddingService for Disabled {
        fn embed(&self, _: &str) -> impl Future<Output = Result<Vec<f32>, EmbeddingError>> + Send {
            async { Err(EmbeddingError::Permanent("no embedding client in this build".into())) }
        }
    }

    pub fn indexer(_: &AppConfig) -> anyhow::Result<SemanticIndexer<Disabled>> {
        anyhow::bail!("built without the http-embeddings feature")
    }
}
