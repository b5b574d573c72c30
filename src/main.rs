use clap::Parser;
use log::debug;

use memstat::process_list;
use memstat::snapshot::Snapshot;
use memstat::summary::Summary;

#[derive(Parser, Debug)]
#[command(version, about)]
struct CliArgs {
    /// PID or short executable name of the process to inspect.
    process: String,

    /// Serve snapshots to one TCP client instead of printing a summary.
    #[arg(long)]
    server: bool,

    /// Port to listen on in server mode.
    #[arg(long, default_value_t = 5550)]
    port: u16,
}

fn resolve_pid(arg: &str) -> Option<u32> {
    if let Ok(pid) = arg.parse::<u32>() {
        if pid != 0 {
            return Some(pid);
        }
    }
    match process_list::find_by_name(arg) {
        Ok(found) => found.map(|p| p.pid),
        Err(err) => {
            debug!("process list unavailable: {}", err);
            None
        }
    }
}

fn main() {
    env_logger::init();
    let cli = CliArgs::parse();

    let pid = match resolve_pid(&cli.process) {
        Some(pid) => pid,
        None => {
            eprintln!("Found no such PID or process {}!", cli.process);
            std::process::exit(1);
        }
    };

    if cli.server {
        if let Err(err) = memstat::server::run(cli.port, pid) {
            eprintln!("server failed: {}", err);
            std::process::exit(1);
        }
        return;
    }

    let snapshot = Snapshot::capture(pid);
    if snapshot.regions.is_empty() {
        eprintln!("Could not read page information. Run as a privileged user, or use server mode from one.");
        std::process::exit(1);
    }
    print!("{}", Summary::compute(&snapshot));
}
