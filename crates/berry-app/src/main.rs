//! BerryOS file-system shell.
//!
//! Opens the configured user's tree from the data directory and reads
//! commands from stdin, one per line. Type `help` for the command list and
//! `exit` (or end input) to save and quit.

mod commands;
mod shell;

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Instant;

use anyhow::Result;

use berry_vfs::config::BerryConfig;
use berry_vfs::{DirStore, FsSession, NodeId, Notice};
use shell::{CommandOutput, CommandRegistry, Environment};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Resolve config from CLI arg, BERRY_CONFIG env var, or ./berry.toml.
    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("BERRY_CONFIG").ok())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("berry.toml"));
    let config = BerryConfig::load(&config_path)?;
    let user = std::env::var("BERRY_USER").unwrap_or_else(|_| config.session.default_user.clone());
    log::info!("Starting BerryOS file shell for {user}");

    let store = DirStore::open(&config.storage.data_dir)?;
    let mut session = FsSession::open(Box::new(store), &config, &user);
    let window = session.open_folder_window(&NodeId::root())?;

    let mut registry = CommandRegistry::new();
    commands::register_all(&mut registry);

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut lines = stdin.lock().lines();
    loop {
        let folder = session.current_folder(window);
        let cwd = session
            .tree()
            .path_of(&folder)
            .unwrap_or_else(|_| "/".to_string());
        write!(stdout, "{user}@berry:{cwd}$ ")?;
        stdout.flush()?;

        let Some(line) = lines.next() else {
            writeln!(stdout)?;
            break;
        };
        let line = line?;

        let mut env = Environment {
            session: &mut session,
            window,
            now: Instant::now(),
        };
        let result = registry.execute(&line, &mut env);
        print_notices(&mut stdout, session.drain_notices())?;
        match result {
            Ok(CommandOutput::Exit) => break,
            Ok(output) => print_output(&mut stdout, &output)?,
            Err(e) => writeln!(stdout, "error: {e}")?,
        }
        session.tick(Instant::now());
    }

    session.close();
    Ok(())
}

fn print_notices(out: &mut impl Write, notices: Vec<Notice>) -> io::Result<()> {
    for notice in notices {
        writeln!(out, "[{notice}]")?;
    }
    Ok(())
}

fn print_output(out: &mut impl Write, output: &CommandOutput) -> io::Result<()> {
    match output {
        CommandOutput::Text(text) => writeln!(out, "{text}"),
        CommandOutput::Table { headers, rows } => {
            let mut widths: Vec<usize> = headers.iter().map(String::len).collect();
            for row in rows {
                for (w, cell) in widths.iter_mut().zip(row) {
                    *w = (*w).max(cell.len());
                }
            }
            let render = |cells: &[String]| {
                cells
                    .iter()
                    .zip(&widths)
                    .map(|(c, w)| format!("{c:<w$}"))
                    .collect::<Vec<_>>()
                    .join("  ")
                    .trim_end()
                    .to_string()
            };
            writeln!(out, "{}", render(headers))?;
            for row in rows {
                writeln!(out, "{}", render(row))?;
            }
            Ok(())
        },
        CommandOutput::None | CommandOutput::Exit => Ok(()),
    }
}
