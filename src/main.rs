use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use projtree::app::Session;
use projtree::kernel::services::adapters::{ensure_config_file, load_config, load_config_from};
use projtree::kernel::{Action, Notice};

mod logging;

const PUMP_INTERVAL: Duration = Duration::from_millis(50);

struct Args {
    config: Option<PathBuf>,
    dirs: Vec<PathBuf>,
}

fn parse_args() -> Result<Args, String> {
    let mut config = None;
    let mut dirs = Vec::new();
    let mut args = std::env::args_os().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            let path = args.next().ok_or("--config needs a file argument")?;
            config = Some(PathBuf::from(path));
        } else if arg == "-h" || arg == "--help" {
            return Err(String::new());
        } else {
            dirs.push(PathBuf::from(arg));
        }
    }
    if dirs.is_empty() {
        return Err("no project directory given".to_string());
    }
    Ok(Args { config, dirs })
}

fn main() -> ExitCode {
    let args = match parse_args() {
        Ok(args) => args,
        Err(message) => {
            if !message.is_empty() {
                eprintln!("projtree: {message}");
            }
            eprintln!("usage: projtree [--config FILE] <DIR>...");
            return ExitCode::from(2);
        }
    };

    let mut default_file_error = None;
    let config = match &args.config {
        Some(path) => load_config_from(path),
        None => {
            default_file_error = ensure_config_file().err();
            load_config()
        }
    };
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            eprintln!("projtree: invalid config: {e}");
            return ExitCode::FAILURE;
        }
    };

    let logging = logging::init(&config);
    match &logging {
        Some(guard) => eprintln!("projtree: logging to {}", guard.log_dir().display()),
        None => eprintln!("projtree: file logging unavailable"),
    }
    if let Some(e) = default_file_error {
        tracing::warn!(error = %e, "could not write default config");
    }

    let mut session = match Session::new(config) {
        Ok(session) => session,
        Err(e) => {
            tracing::error!(error = %e, "session start failed");
            eprintln!("projtree: {e}");
            return ExitCode::FAILURE;
        }
    };
    let notices = session.subscribe();

    for (index, dir) in args.dirs.into_iter().enumerate() {
        session.dispatch(Action::OpenRoot {
            path: dir,
            activate: index == 0,
        });
    }

    loop {
        session.pump();
        while let Ok(notice) = notices.try_recv() {
            log_notice(&session, &notice);
        }
        if session.store().tree().roots().is_empty() {
            tracing::info!("no open projects left");
            return ExitCode::SUCCESS;
        }
        std::thread::sleep(PUMP_INTERVAL);
    }
}

fn log_notice(session: &Session, notice: &Notice) {
    let tree = session.store().tree();
    match notice {
        Notice::TreeChanged(root) => match tree.path_of(*root) {
            Some(path) => tracing::info!(root = %path.display(), nodes = tree.len(), "tree changed"),
            None => tracing::info!(nodes = tree.len(), "project removed"),
        },
        Notice::ScanProgress { root, staged } => {
            tracing::debug!(root = ?tree.path_of(*root), staged, "loading project")
        }
        Notice::RootLost {
            root_path,
            new_path,
        } => tracing::warn!(
            root = %root_path.display(),
            moved_to = ?new_path,
            "project directory is gone"
        ),
        Notice::Warning(message) => tracing::warn!("{message}"),
        other => tracing::info!(notice = ?other, "notice"),
    }
}
