//! Chat command parser.
//!
//! Parses `!command arg1 arg2 ...` chat content into a [`ParsedCommand`]
//! that the dispatcher can look up by name.

/// Prefix that marks chat content as a command invocation.
pub const TRIGGER: char = '!';

/// A command invocation found in chat content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    /// First token after the trigger. Case-sensitive.
    pub name: String,
    /// Everything after the name, `None` when nothing follows it.
    pub params: Option<String>,
}

/// Parse chat content into a [`ParsedCommand`].
///
/// Returns `None` if the content does not start with [`TRIGGER`]. Repeated
/// trigger characters are stripped, so `!!ping` names `ping`.
pub fn parse_command(content: &str) -> Option<ParsedCommand> {
    if !content.starts_with(TRIGGER) {
        return None;
    }
    let body = content.trim_start_matches(TRIGGER);
    let (name, params) = match body.split_once(' ') {
        Some((name, rest)) if !rest.is_empty() => (name, Some(rest.to_string())),
        Some((name, _)) => (name, None),
        None => (body, None),
    };
    Some(ParsedCommand {
        name: name.to_string(),
        params,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command() {
        assert_eq!(
            parse_command("!ping"),
            Some(ParsedCommand { name: "ping".into(), params: None })
        );
        assert_eq!(
            parse_command("!unknown arg1"),
            Some(ParsedCommand { name: "unknown".into(), params: Some("arg1".into()) })
        );
        assert_eq!(
            parse_command("!so  two spaces"),
            Some(ParsedCommand { name: "so".into(), params: Some(" two spaces".into()) })
        );
        assert_eq!(
            parse_command("!!Ping"),
            Some(ParsedCommand { name: "Ping".into(), params: None })
        );
        assert_eq!(
            parse_command("!ping "),
            Some(ParsedCommand { name: "ping".into(), params: None })
        );
        assert_eq!(parse_command("ping"), None);
        assert_eq!(parse_command(" !ping"), None);
    }
}
