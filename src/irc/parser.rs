//! Chat line parser.
//!
//! Turns one raw protocol line into a [`ChatMessage`]. A line looks like
//!
//! ```text
//! @badge-info=;badges=broadcaster/1;color=;display-name=foo;mod=0;user-id=1;id=x :foo!foo@foo.tmi.twitch.tv PRIVMSG #chan :hello: world
//! ```
//!
//! The tag block runs from `@` to the first space. After it, the first `:`
//! opens the prefix and the next `:` opens the payload; the payload keeps any
//! further colons verbatim.

use crate::error::{BotError, Result};
use std::collections::HashMap;

/// Keepalive probe sent by the server.
pub const PING_LINE: &str = "PING :tmi.twitch.tv";
/// Exact response expected for [`PING_LINE`].
pub const PONG_LINE: &str = "PONG :tmi.twitch.tv";

/// Coarse category of a received line, decided by its command token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Ping,
    PrivMsg,
    Numeric(u16),
    Other,
}

/// Classify a line without fully parsing it.
pub fn classify(line: &str) -> LineKind {
    if line == PING_LINE {
        return LineKind::Ping;
    }
    match command_token(line) {
        Some("PRIVMSG") => LineKind::PrivMsg,
        Some(cmd) if cmd.len() == 3 && cmd.bytes().all(|b| b.is_ascii_digit()) => {
            cmd.parse().map(LineKind::Numeric).unwrap_or(LineKind::Other)
        }
        _ => LineKind::Other,
    }
}

/// Command token of a line: the first word after the optional tag block and
/// the optional `:prefix`.
pub fn command_token(line: &str) -> Option<&str> {
    let mut rest = line.trim_start();
    if rest.starts_with('@') {
        rest = rest.split_once(' ')?.1.trim_start();
    }
    if rest.starts_with(':') {
        rest = rest.split_once(' ')?.1.trim_start();
    }
    rest.split_whitespace().next()
}

/// Badge set carried in the `badges` tag, e.g. `broadcaster/1,subscriber/12`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Badges(HashMap<String, String>);

impl Badges {
    pub fn parse(raw: &str) -> Result<Self> {
        let mut badges = HashMap::new();
        for entry in raw.split(',').filter(|e| !e.is_empty()) {
            let (name, version) = entry
                .split_once('/')
                .ok_or_else(|| BotError::MalformedMessage(format!("bad badge entry '{}'", entry)))?;
            badges.insert(name.to_string(), version.to_string());
        }
        Ok(Self(badges))
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn has(&self, name: &str, version: &str) -> bool {
        self.get(name) == Some(version)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Tag block with the fields this client depends on pulled out by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tags {
    pub display_name: String,
    pub color: String,
    pub is_mod: bool,
    pub user_id: String,
    pub badges: Badges,
    pub badge_info: String,
    pub id: Option<String>,
    /// Everything else the server sent, unescaped.
    pub extra: HashMap<String, String>,
}

impl Tags {
    /// Parse the tag block (with or without its leading `@`).
    pub fn parse(block: &str) -> Result<Self> {
        let block = block.strip_prefix('@').unwrap_or(block).trim_end();
        let mut map = HashMap::new();
        for pair in block.split(';') {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| BotError::MalformedMessage(format!("bad tag '{}'", pair)))?;
            map.insert(key.to_string(), unescape_tag_value(value));
        }

        let mut take = |key: &str| {
            map.remove(key)
                .ok_or_else(|| BotError::MalformedMessage(format!("missing tag '{}'", key)))
        };

        let display_name = take("display-name")?;
        let color = take("color")?;
        let is_mod = take("mod")? == "1";
        let user_id = take("user-id")?;
        let badges = Badges::parse(&take("badges")?)?;
        let badge_info = take("badge-info")?;
        let id = map.remove("id");

        Ok(Self {
            display_name,
            color,
            is_mod,
            user_id,
            badges,
            badge_info,
            id,
            extra: map,
        })
    }
}

/// Reverse IRCv3 tag value escaping.
fn unescape_tag_value(value: &str) -> String {
    if !value.contains('\\') {
        return value.to_string();
    }
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some(':') => out.push(';'),
            Some('s') => out.push(' '),
            Some('\\') => out.push('\\'),
            Some('r') => out.push('\r'),
            Some('n') => out.push('\n'),
            Some(other) => out.push(other),
            None => break,
        }
    }
    out
}

/// Snapshot of the author of one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatUser {
    pub display_name: String,
    /// Hex color chosen by the user; empty when unset.
    pub color: String,
    pub is_mod: bool,
    pub id: String,
    /// Months subscribed, 0 when `badge-info` is empty. Signed, since the
    /// server value is passed through as any integer.
    pub sub_length: i64,
    pub broadcaster: bool,
    pub badges: Badges,
}

impl ChatUser {
    pub fn from_tags(tags: &Tags) -> Result<Self> {
        let badge_info = tags.badge_info.trim();
        let sub_length: i64 = if badge_info.is_empty() {
            0
        } else {
            badge_info.parse().map_err(|_| {
                BotError::MalformedMessage(format!("badge-info '{}' is not a number", tags.badge_info))
            })?
        };
        Ok(Self {
            display_name: tags.display_name.clone(),
            color: tags.color.clone(),
            is_mod: tags.is_mod,
            id: tags.user_id.clone(),
            sub_length,
            broadcaster: tags.badges.has("broadcaster", "1"),
            badges: tags.badges.clone(),
        })
    }
}

/// One received chat line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub raw: String,
    pub user: ChatUser,
    pub id: String,
    /// Login taken from the `login!login@host` prefix.
    pub login: String,
    pub channel: String,
    pub content: String,
    pub is_from_self: bool,
    pub tags: Tags,
}

impl ChatMessage {
    /// Parse a `PRIVMSG` line. `own_name` is the session's resolved display
    /// name and decides [`ChatMessage::is_from_self`].
    pub fn parse(line: &str, own_name: &str) -> Result<Self> {
        let (tag_block, rest) = match line.strip_prefix('@') {
            Some(tagged) => tagged
                .split_once(' ')
                .ok_or_else(|| BotError::MalformedMessage("unterminated tag block".into()))?,
            None => return Err(BotError::MalformedMessage("missing tag block".into())),
        };

        let (_, after_prefix_colon) = rest
            .split_once(':')
            .ok_or_else(|| BotError::MalformedMessage("missing prefix".into()))?;
        let (head, content) = after_prefix_colon
            .split_once(':')
            .ok_or_else(|| BotError::MalformedMessage("missing payload".into()))?;

        let mut words = head.split_whitespace();
        let prefix = words.next().unwrap_or_default();
        let login = prefix.split('!').next().unwrap_or_default().to_string();
        let _command = words.next();
        let channel = words.next().unwrap_or_default().to_string();

        let tags = Tags::parse(tag_block)?;
        let user = ChatUser::from_tags(&tags)?;
        let id = tags
            .id
            .clone()
            .ok_or_else(|| BotError::MalformedMessage("missing tag 'id'".into()))?;

        Ok(Self {
            raw: line.to_string(),
            is_from_self: user.display_name == own_name,
            user,
            id,
            login,
            channel,
            content: content.to_string(),
            tags,
        })
    }
}

/// Extract the session's own name from a join acknowledgement such as
/// `:sturdy_bot!sturdy_bot@sturdy_bot.tmi.twitch.tv JOIN #chan`.
pub fn parse_join_name(ack: &str) -> Option<String> {
    let (_, after_colon) = ack.split_once(':')?;
    let (name, _) = after_colon.split_once('!')?;
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINE: &str = "@badge-info=;badges=broadcaster/1;color=;display-name=foo;mod=0;user-id=1;id=x :foo!foo@foo.tmi.example PRIVMSG #chan :!ping";

    fn line_with(tags: &str, content: &str) -> String {
        format!("@{} :foo!foo@foo.tmi.example PRIVMSG #chan :{}", tags, content)
    }

    #[test]
    fn test_parse_privmsg() {
        let msg = ChatMessage::parse(LINE, "bot").unwrap();
        assert_eq!(msg.user.display_name, "foo");
        assert_eq!(msg.user.color, "");
        assert!(!msg.user.is_mod);
        assert_eq!(msg.user.id, "1");
        assert_eq!(msg.user.sub_length, 0);
        assert!(msg.user.broadcaster);
        assert_eq!(msg.id, "x");
        assert_eq!(msg.login, "foo");
        assert_eq!(msg.channel, "#chan");
        assert_eq!(msg.content, "!ping");
        assert!(!msg.is_from_self);
    }

    #[test]
    fn test_parse_is_deterministic() {
        let a = ChatMessage::parse(LINE, "bot").unwrap();
        let b = ChatMessage::parse(LINE, "bot").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_payload_keeps_colons() {
        let line = line_with(
            "badge-info=;badges=;color=#FF0000;display-name=foo;mod=1;user-id=1;id=x",
            "time is 12:30: ok",
        );
        let msg = ChatMessage::parse(&line, "bot").unwrap();
        assert_eq!(msg.content, "time is 12:30: ok");
        assert!(msg.user.is_mod);
        assert_eq!(msg.user.color, "#FF0000");
        assert!(msg.user.badges.is_empty());
    }

    #[test]
    fn test_is_from_self() {
        let msg = ChatMessage::parse(LINE, "foo").unwrap();
        assert!(msg.is_from_self);
    }

    #[test]
    fn test_sub_length() {
        let base = "badges=;color=;display-name=foo;mod=0;user-id=1;id=x";
        let msg = ChatMessage::parse(&line_with(&format!("badge-info=14;{}", base), "hi"), "b").unwrap();
        assert_eq!(msg.user.sub_length, 14);

        let msg = ChatMessage::parse(&line_with(&format!("badge-info=-3;{}", base), "hi"), "b").unwrap();
        assert_eq!(msg.user.sub_length, -3);

        let err = ChatMessage::parse(&line_with(&format!("badge-info=abc;{}", base), "hi"), "b");
        assert!(matches!(err, Err(BotError::MalformedMessage(_))));
    }

    #[test]
    fn test_broadcaster_badge() {
        let base = "badge-info=;color=;display-name=foo;mod=0;user-id=1;id=x";
        let cases = [
            ("badges=broadcaster/1", true),
            ("badges=broadcaster/0", false),
            ("badges=subscriber/1,broadcaster/1", true),
            ("badges=subscriber/1", false),
            ("badges=", false),
        ];
        for (badges, expected) in cases {
            let line = line_with(&format!("{};{}", badges, base), "hi");
            let msg = ChatMessage::parse(&line, "b").unwrap();
            assert_eq!(msg.user.broadcaster, expected, "{}", badges);
        }
    }

    #[test]
    fn test_missing_required_tags() {
        let full = [
            "badge-info=",
            "badges=",
            "color=",
            "display-name=foo",
            "mod=0",
            "user-id=1",
            "id=x",
        ];
        for skip in 0..full.len() {
            let tags: Vec<&str> = full
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != skip)
                .map(|(_, t)| *t)
                .collect();
            let line = line_with(&tags.join(";"), "hi");
            assert!(
                matches!(ChatMessage::parse(&line, "b"), Err(BotError::MalformedMessage(_))),
                "accepted line without {}",
                full[skip]
            );
        }
    }

    #[test]
    fn test_malformed_shapes() {
        assert!(ChatMessage::parse(":foo!foo@foo PRIVMSG #chan :hi", "b").is_err());
        assert!(ChatMessage::parse("@display-name", "b").is_err());
        let line = line_with("badge-info=;badges=broadcaster;color=;display-name=foo;mod=0;user-id=1;id=x", "hi");
        assert!(ChatMessage::parse(&line, "b").is_err());
    }

    #[test]
    fn test_tag_unescaping_and_extra() {
        let tags = Tags::parse(
            "@badge-info=;badges=;color=;display-name=foo;mod=0;user-id=1;system-msg=hello\\sthere;flags=",
        )
        .unwrap();
        assert_eq!(tags.extra.get("system-msg").map(String::as_str), Some("hello there"));
        assert_eq!(tags.extra.get("flags").map(String::as_str), Some(""));
        assert_eq!(tags.id, None);
    }

    #[test]
    fn test_tag_value_keeps_trailing_at() {
        let tags = Tags::parse("@badge-info=;badges=;color=;display-name=foo;mod=0;user-id=1;flags=a@").unwrap();
        assert_eq!(tags.extra.get("flags").map(String::as_str), Some("a@"));

        let bare = Tags::parse("badge-info=;badges=;color=;display-name=foo;mod=0;user-id=1;client-nonce=@").unwrap();
        assert_eq!(bare.extra.get("client-nonce").map(String::as_str), Some("@"));
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify(PING_LINE), LineKind::Ping);
        assert_eq!(classify(LINE), LineKind::PrivMsg);
        assert_eq!(classify(":tmi.twitch.tv 421 bot FOO :Unknown command"), LineKind::Numeric(421));
        assert_eq!(classify(":tmi.twitch.tv CAP * ACK :twitch.tv/tags"), LineKind::Other);
        assert_eq!(classify("PING :somewhere.else"), LineKind::Other);
    }

    #[test]
    fn test_parse_join_name() {
        assert_eq!(
            parse_join_name(":sturdy_bot!sturdy_bot@sturdy_bot.tmi.twitch.tv JOIN #chan"),
            Some("sturdy_bot".to_string())
        );
        assert_eq!(parse_join_name(":tmi.twitch.tv NOTICE * :Login failed"), None);
        assert_eq!(parse_join_name("garbage"), None);
    }
}
