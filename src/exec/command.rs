// src/exec/command.rs

//! Shell command construction.

use tokio::process::Command;

/// Build a shell command appropriate for the platform.
///
/// `args` are passed to the shell as positional parameters and expanded
/// with `"$@"` after `command`, so they reach the program verbatim without
/// any re-quoting.
pub fn shell_command(command: &str, args: &[String]) -> Command {
    if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(command).args(args);
        c
    } else {
        let mut c = Command::new("sh");
        if args.is_empty() {
            c.arg("-c").arg(command);
        } else {
            c.arg("-c")
                .arg(format!("{command} \"$@\""))
                .arg("sh")
                .args(args);
        }
        c
    }
}

/// Human-readable form of `command` with `args` appended, for logs and
/// dry runs.
pub fn display_command(command: &str, args: &[String]) -> String {
    if args.is_empty() {
        return command.to_string();
    }

    let quoted: Vec<String> = args.iter().map(|a| quote_arg(a)).collect();
    format!("{command} {}", quoted.join(" "))
}

fn quote_arg(arg: &str) -> String {
    let safe = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:,+@%".contains(c));
    if safe {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}
