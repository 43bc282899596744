//! Common utilities shared between harness and surrogate modes

pub mod config;
pub mod error;
pub mod logging;
pub mod paths;

pub use error::{Error, ErrorKind, Result};

/// Render an argv as a single shell-like line for progress output
pub fn display_command(argv: &[String]) -> String {
    argv.iter()
        .map(|arg| {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                format!("'{}'", arg)
            } else {
                arg.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_command_quotes_spaces() {
        let argv = vec![
            "git".to_string(),
            "clone".to_string(),
            "/path with space".to_string(),
        ];
        assert_eq!(display_command(&argv), "git clone '/path with space'");
    }
}
