use clap::Parser;
use envlink::link;
use envlink::store::{self, SetOutcome, StoreRoot};
use envlink::sync::{self, Action};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(
  name = "envlink",
  about = "Keep one central copy of each project's env files, symlinked into place",
  version,
  author
)]
struct Cli {
  /// Name of the project; used as the directory name under the central root
  project_name: String,

  /// Move the project's env files into the central store and symlink them back
  #[arg(long, alias = "mv")]
  r#move: bool,

  /// Reconcile the project directory with its central counterpart in both directions
  #[arg(long)]
  sync: bool,

  /// Name of the environment variable to set (requires --value)
  #[arg(short, long)]
  key: Option<String>,

  /// Value of the environment variable to set (requires --key)
  #[arg(short, long)]
  value: Option<String>,

  /// Central store root (defaults to ~/env)
  #[arg(long, env = "ENVLINK_ROOT")]
  root: Option<PathBuf>,

  /// Verbose output (--verbose for debug, twice for trace)
  #[arg(long, action = clap::ArgAction::Count)]
  verbose: u8,
}

enum Mode {
  Move,
  Sync,
  Set { key: String, value: String },
}

impl Cli {
  fn mode(&self) -> Result<Mode, String> {
    match (self.r#move, self.sync, &self.key, &self.value) {
      (true, false, None, None) => Ok(Mode::Move),
      (false, true, None, None) => Ok(Mode::Sync),
      (false, false, Some(key), Some(value)) => Ok(Mode::Set {
        key: key.clone(),
        value: value.clone(),
      }),
      (false, false, Some(_), None) | (false, false, None, Some(_)) => {
        Err("--key and --value must be supplied together".into())
      }
      (false, false, None, None) => {
        Err("Specify --move, --sync, or both --key and --value".into())
      }
      _ => Err("Pick exactly one of --move, --sync, or --key/--value".into()),
    }
  }
}

fn setup_tracing(verbose: u8) {
  use tracing_subscriber::fmt;
  use tracing_subscriber::prelude::*;

  let log_level = match verbose {
    1 => "debug",
    2 => "trace",
    _ => "info",
  };

  tracing_subscriber::registry()
    .with(fmt::layer())
    .with(tracing_subscriber::EnvFilter::new(
      std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.into()),
    ))
    .init();
}

fn main() -> ExitCode {
  let cli = Cli::parse();

  setup_tracing(cli.verbose);

  let mode = match cli.mode() {
    Ok(mode) => mode,
    Err(message) => {
      eprintln!("Error: {message}");
      return ExitCode::FAILURE;
    }
  };

  match run(&cli, mode) {
    Ok(()) => ExitCode::SUCCESS,
    Err(e) => {
      eprintln!("Error: {e}");
      ExitCode::FAILURE
    }
  }
}

fn run(cli: &Cli, mode: Mode) -> Result<(), Box<dyn std::error::Error>> {
  let root = match &cli.root {
    Some(path) => StoreRoot::new(path.clone()),
    None => StoreRoot::from_home()?,
  };

  let project_root = std::env::current_dir()?;
  let env_dir = root.project_dir(&cli.project_name)?;

  match mode {
    Mode::Move => report(sync::migrate(&project_root, &env_dir)?),
    Mode::Sync => report(sync::sync(&project_root, &env_dir)?),
    Mode::Set { key, value } => {
      let env_file = env_dir.join(store::DEFAULT_ENV_FILENAME);
      match store::upsert(&env_file, &key, &value, prompt_overwrite)? {
        SetOutcome::Declined => {
          println!("Exiting without making changes.");
          return Ok(());
        }
        SetOutcome::Added | SetOutcome::Updated => {}
      }

      let target = link::link(&project_root, &env_dir, store::DEFAULT_ENV_FILENAME)?;
      println!(
        "Symlink created: {} -> {}",
        project_root.join(store::DEFAULT_ENV_FILENAME).display(),
        target.display()
      );
    }
  }

  Ok(())
}

fn report(actions: Vec<Action>) {
  for action in actions {
    println!("{action}");
  }
}

fn prompt_overwrite(key: &str) -> std::io::Result<bool> {
  print!(
    "The environment variable {key} already exists. Do you want to update the value? (yes/no): "
  );
  std::io::stdout().flush()?;

  let mut answer = String::new();
  std::io::stdin().lock().read_line(&mut answer)?;

  Ok(matches!(
    answer.trim().to_lowercase().as_str(),
    "y" | "yes"
  ))
}
