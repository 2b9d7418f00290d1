use clap::Parser;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use vi_engine::{Editor, Interface, RcLoader};

#[derive(Parser, Debug)]
#[command(
    name = "vi-engine",
    version,
    about = "Run vi keys and ex commands against a file, without a screen"
)]
struct Args {
    /// File to edit. A missing file starts an empty buffer with that name.
    file: Option<PathBuf>,

    /// Key sequence in vi notation (`dd`, `ifoo<Esc>`), fed before any ex command.
    #[arg(short = 'k', long = "keys")]
    keys: Vec<String>,

    /// Ex command to run. Repeatable; commands run in order.
    #[arg(short = 'c', long = "command")]
    commands: Vec<String>,

    /// File of ex commands, one per line, run after the `-c` commands.
    #[arg(short = 's', long = "script")]
    script: Option<PathBuf>,

    /// Read options from this file instead of looking for `.exvirc`.
    #[arg(long = "rc")]
    rc: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset (e.g. `debug`, `editor.ex=trace`).
    #[arg(long = "log-level", default_value = "warn")]
    log_level: String,

    /// Print a sample `.exvirc` and exit.
    #[arg(long = "sample-rc")]
    sample_rc: bool,
}

/// Errors go to stderr; everything else the engine says is dropped, except
/// printed lines, which `main` copies to stdout.
struct StderrInterface;

impl Interface for StderrInterface {
    fn show_error(&mut self, message: &str) {
        eprintln!("vi-engine: {message}");
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    // A second init (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn flush_output(editor: &mut Editor) {
    for line in editor.take_output() {
        println!("{line}");
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(&args.log_level);

    if args.sample_rc {
        print!("{}", RcLoader::generate_sample_rc());
        return ExitCode::SUCCESS;
    }

    let settings = match &args.rc {
        Some(path) => {
            let mut settings = vi_engine::Settings::default();
            RcLoader::load_from(path, &mut settings);
            settings
        }
        None => RcLoader::load_config(),
    };
    let mut editor = Editor::with_interface(Box::new(StderrInterface)).with_settings(settings);

    if let Some(path) = &args.file {
        if path.exists() {
            if !editor.load(path) {
                return ExitCode::FAILURE;
            }
        } else {
            info!(target: "editor.io", path = %path.display(), "new file");
            editor.document_mut().filename = Some(path.clone());
        }
    }

    for keys in &args.keys {
        let ok = editor.process_keys(keys);
        flush_output(&mut editor);
        if !ok {
            return ExitCode::FAILURE;
        }
    }

    let mut lines = args.commands.clone();
    if let Some(script) = &args.script {
        match fs::read_to_string(script) {
            Ok(content) => lines.extend(content.lines().map(str::to_string)),
            Err(e) => {
                eprintln!("vi-engine: {}: {e}", script.display());
                return ExitCode::FAILURE;
            }
        }
    }

    for line in &lines {
        debug!(target: "editor.ex", line = %line, "script line");
        let ok = editor.run_ex_command(line);
        flush_output(&mut editor);
        if !ok {
            return ExitCode::FAILURE;
        }
        if editor.has_quit() {
            break;
        }
    }
    ExitCode::SUCCESS
}
