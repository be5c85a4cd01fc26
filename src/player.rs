use std::fs::OpenOptions;
use std::io::Write;
use std::process::{Command, Stdio};
use std::sync::Mutex;

use anyhow::{anyhow, Context, Result};
use once_cell::sync::OnceCell;

fn player_debug_enabled() -> bool {
    static FLAG: OnceCell<bool> = OnceCell::new();
    *FLAG.get_or_init(|| {
        std::env::var("VIDTUBE_DEBUG_PLAYER")
            .map(|val| {
                let trimmed = val.trim();
                !(trimmed.is_empty()
                    || trimmed.eq_ignore_ascii_case("0")
                    || trimmed.eq_ignore_ascii_case("false")
                    || trimmed.eq_ignore_ascii_case("no")
                    || trimmed.eq_ignore_ascii_case("off"))
            })
            .unwrap_or(false)
    })
}

fn player_debug_writer() -> Option<&'static Mutex<std::fs::File>> {
    static WRITER: OnceCell<Option<Mutex<std::fs::File>>> = OnceCell::new();
    WRITER
        .get_or_init(|| {
            std::env::var("VIDTUBE_DEBUG_PLAYER_LOG")
                .ok()
                .and_then(|path| {
                    OpenOptions::new()
                        .create(true)
                        .append(true)
                        .open(path)
                        .map(Mutex::new)
                        .ok()
                })
        })
        .as_ref()
}

pub fn debug_log(message: impl AsRef<str>) {
    if !player_debug_enabled() {
        return;
    }
    if let Some(writer) = player_debug_writer() {
        if let Ok(mut file) = writer.lock() {
            let _ = writeln!(file, "{}", message.as_ref());
            return;
        }
    }
    eprintln!("{}", message.as_ref());
}

pub struct LaunchOptions<'a> {
    pub command: &'a [String],
    pub url: &'a str,
    pub title: &'a str,
    pub detach: bool,
}

/// Hands the video URL to the configured player command. `%URL%` and
/// `%TITLE%` in the argument template are substituted; a template without
/// `%URL%` gets the URL appended. The player runs on its own, the terminal
/// stays with us.
pub fn spawn_player(opts: LaunchOptions<'_>) -> Result<()> {
    if opts.url.trim().is_empty() {
        return Err(anyhow!("video url missing"));
    }
    let (program, args) = build_invocation(opts.command, opts.url, opts.title)?;

    debug_log(format!("spawning player: {} {:?}", program, args));

    let mut command = Command::new(&program);
    command.args(&args);
    command.stdin(Stdio::null());
    if opts.detach {
        command.stdout(Stdio::null());
        command.stderr(Stdio::null());
    } else {
        command.stdout(Stdio::null());
        command.stderr(Stdio::inherit());
    }
    command
        .spawn()
        .with_context(|| format!("launch {} to play {}", program, opts.url))?;
    Ok(())
}

fn build_invocation(command: &[String], url: &str, title: &str) -> Result<(String, Vec<String>)> {
    let mut parts = command.iter();
    let program = parts
        .next()
        .ok_or_else(|| anyhow!("player command not configured"))?
        .clone();

    let mut args = Vec::new();
    let mut has_url = false;
    for arg in parts {
        if arg.contains("%URL%") {
            has_url = true;
            args.push(arg.replace("%URL%", url));
        } else if arg.contains("%TITLE%") {
            args.push(arg.replace("%TITLE%", title));
        } else {
            args.push(arg.clone());
        }
    }
    if !has_url {
        args.push(url.to_string());
    }
    Ok((program, args))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn substitutes_url_placeholder() {
        let (program, args) = build_invocation(
            &command(&["mpv", "--fs", "%URL%"]),
            "https://cdn.test/clip.mp4",
            "Clip",
        )
        .unwrap();
        assert_eq!(program, "mpv");
        assert_eq!(args, vec!["--fs", "https://cdn.test/clip.mp4"]);
    }

    #[test]
    fn appends_url_when_template_has_no_placeholder() {
        let (_, args) = build_invocation(
            &command(&["vlc", "--play-and-exit"]),
            "https://cdn.test/clip.mp4",
            "Clip",
        )
        .unwrap();
        assert_eq!(args, vec!["--play-and-exit", "https://cdn.test/clip.mp4"]);
    }

    #[test]
    fn substitutes_title_placeholder() {
        let (_, args) = build_invocation(
            &command(&["mpv", "--force-media-title=%TITLE%", "%URL%"]),
            "https://cdn.test/clip.mp4",
            "My clip",
        )
        .unwrap();
        assert_eq!(
            args,
            vec!["--force-media-title=My clip", "https://cdn.test/clip.mp4"]
        );
    }

    #[test]
    fn empty_command_is_rejected() {
        assert!(build_invocation(&[], "https://cdn.test/clip.mp4", "Clip").is_err());
    }
}
