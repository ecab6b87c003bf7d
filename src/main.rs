use clap::{Parser, Subcommand};
use simple_avatar::imaging::RustBackend;
use simple_avatar::pipeline::{self, PipelineConfig};
use simple_avatar::profile::ProfileTable;
use simple_avatar::storage::LocalStore;
use simple_avatar::{config, output, package, validate};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "simple-avatar")]
#[command(about = "Profile image pipeline: validate, crop, compress, store")]
#[command(long_about = "\
Profile image pipeline: validate, crop, compress, store

Every image goes through the same steps:

  1. Validate   JPEG, PNG, GIF or WebP, at most 2 MiB
  2. Crop       centered square on the shorter side
  3. Compress   512x512 WebP, quality 0.85 down to 0.5 until <= 100 KiB
  4. Store      {user}/avatar-{unix_millis}.webp, old avatars removed

Run 'simple-avatar gen-config' to generate a documented avatar.toml.")]
#[command(version)]
struct Cli {
    /// Config file (missing file = stock defaults)
    #[arg(long, default_value = "avatar.toml", global = true)]
    config: PathBuf,

    /// Override the bucket root directory from the config
    #[arg(long, global = true)]
    storage_root: Option<PathBuf>,

    /// Debug-level logging
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate a file without processing it
    Check {
        file: PathBuf,
        /// Declared MIME type (default: guessed from the extension)
        #[arg(long)]
        mime: Option<String>,
    },
    /// Optimize images into a directory
    Optimize {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Directory for the .webp outputs
        #[arg(long, default_value = "avatars")]
        out_dir: PathBuf,
    },
    /// Optimize an image and store it as a user's avatar
    Upload {
        file: PathBuf,
        /// Owner of the avatar; becomes the storage folder
        #[arg(long)]
        user: String,
        /// Declared MIME type (default: guessed from the extension)
        #[arg(long)]
        mime: Option<String>,
    },
    /// Print a stock avatar.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let Cli {
        config: config_path,
        storage_root,
        verbose,
        command,
    } = Cli::parse();
    init_logging(verbose);

    let load = || -> Result<config::AvatarConfig, config::ConfigError> {
        let mut avatar_config = config::load_config(&config_path)?;
        if let Some(root) = &storage_root {
            avatar_config.storage.root = root.clone();
        }
        Ok(avatar_config)
    };

    match command {
        Command::Check { file, mime } => {
            let avatar_config = load()?;
            let mime = declared_mime(&file, mime.as_deref());
            let size = std::fs::metadata(&file)?.len();
            let error = validate::validate_input(&avatar_config.input_policy(), &mime, size)
                .err()
                .map(|e| e.to_string());
            output::print_check_output(&file, &mime, size, error.as_deref());
            if error.is_some() {
                std::process::exit(1);
            }
        }
        Command::Optimize { files, out_dir } => {
            let avatar_config = load()?;
            init_thread_pool(&avatar_config.processing);
            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_batch_event(&event) {
                        println!("{}", line);
                    }
                }
            });
            let items = pipeline::optimize_batch(
                &RustBackend::new(),
                &files,
                &out_dir,
                &PipelineConfig::from_config(&avatar_config),
                Some(tx),
            )?;
            printer
                .join()
                .map_err(|_| "progress printer thread panicked")?;

            let failed = items.iter().filter(|i| i.result.is_err()).count();
            println!(
                "{}",
                output::format_batch_summary(items.len() - failed, failed)
            );
            if failed > 0 {
                std::process::exit(1);
            }
        }
        Command::Upload { file, user, mime } => {
            let avatar_config = load()?;
            let mime = declared_mime(&file, mime.as_deref());
            let bytes = pipeline::read_checked(&file, &mime, &avatar_config.input_policy())?;
            let storage = &avatar_config.storage;
            let store = LocalStore::new(&storage.root, &storage.bucket, &storage.public_base_url);
            let mut profiles = ProfileTable::load(&storage.profiles)?;

            let outcome = pipeline::upload_and_record(
                &RustBackend::new(),
                &store,
                &mut profiles,
                &bytes,
                &mime,
                &user,
                package::unix_millis_now(),
                &PipelineConfig::from_config(&avatar_config),
            )?;
            output::print_upload_output(&outcome);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// MIME type the upload is declared as: the flag if given, else from the extension.
fn declared_mime(file: &Path, flag: Option<&str>) -> String {
    flag.map(str::to_string)
        .unwrap_or_else(|| validate::mime_from_path(file).to_string())
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "simple_avatar=debug"
    } else {
        "simple_avatar=warn"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Capped at the number of available CPU cores.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
