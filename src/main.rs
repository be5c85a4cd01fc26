fn main() {
    if handle_cli_flags() {
        return;
    }

    if let Err(err) = vidtube_tui::run() {
        eprintln!("error: {err:?}");
        std::process::exit(1);
    }
}

fn handle_cli_flags() -> bool {
    let mut args = std::env::args().skip(1);
    let mut saw_flag = false;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--version" | "-V" => {
                println!("VidTube TUI {}", vidtube_tui::VERSION);
                saw_flag = true;
            }
            "--help" | "-h" => {
                println!(
                    "VidTube TUI — Browse and manage VidTube from the terminal.\n\n  --version, -V        Show version and exit\n  --help,    -h        Show this help message\n  --server <url>       Save the API server URL to the config and exit\n  --check-updates      Check for updates and exit"
                );
                saw_flag = true;
            }
            "--server" => {
                saw_flag = true;
                let Some(url) = args.next() else {
                    eprintln!("--server requires a URL");
                    std::process::exit(2);
                };
                match vidtube_tui::config::save_server(None, &url) {
                    Ok(path) => println!("Server saved to {}", path.display()),
                    Err(err) => {
                        eprintln!("error: {err:?}");
                        std::process::exit(1);
                    }
                }
            }
            "--check-updates" => {
                saw_flag = true;
                if let Err(err) = check_updates_once() {
                    eprintln!("Update check failed: {err:?}");
                    std::process::exit(1);
                }
            }
            _ => {}
        }
    }
    saw_flag
}

fn check_updates_once() -> anyhow::Result<()> {
    use semver::Version;

    let skip_env = vidtube_tui::update::SKIP_UPDATE_ENV;
    if std::env::var(skip_env).is_ok() {
        println!("Update check skipped: {skip_env} is set.");
        return Ok(());
    }

    let current = Version::parse(vidtube_tui::VERSION)?;
    match vidtube_tui::update::check_for_update(&current)? {
        Some(info) => {
            println!("Update available: {current} -> {}\n{}", info.version, info.url);
        }
        None => {
            println!("VidTube TUI {current} is up to date.");
        }
    }
    Ok(())
}
