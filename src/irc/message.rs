//! Minimal IRC wire message parsing.
//!
//! Only the client subset the session manager needs: optional IRCv3 tags are
//! skipped, the prefix keeps its nick, the trailing parameter lands as the
//! last entry of `params`.

/// Sender prefix (`nick!user@host`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prefix {
    pub raw: String,
    pub nick: String,
}

impl Prefix {
    fn parse(raw: &str) -> Self {
        let nick = raw.split(['!', '@']).next().unwrap_or(raw);
        Self {
            raw: raw.to_string(),
            nick: nick.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub prefix: Option<Prefix>,
    pub command: String,
    pub params: Vec<String>,
}

impl Message {
    /// Parses one line (without CRLF). Returns `None` for empty input.
    #[must_use]
    pub fn parse(line: &str) -> Option<Self> {
        let mut rest = line.trim_end_matches(['\r', '\n']);
        if rest.is_empty() {
            return None;
        }

        // IRCv3 message tags are not used for announce routing
        if rest.starts_with('@') {
            let (_, after) = rest.split_once(' ')?;
            rest = after;
        }

        let prefix = if let Some(stripped) = rest.strip_prefix(':') {
            let (prefix, after) = stripped.split_once(' ')?;
            rest = after;
            Some(Prefix::parse(prefix))
        } else {
            None
        };

        let (head, trailing) = match rest.split_once(" :") {
            Some((head, trailing)) => (head, Some(trailing)),
            None => (rest, None),
        };

        let mut parts = head.split_ascii_whitespace();
        let command = parts.next()?.to_uppercase();
        let mut params: Vec<String> = parts.map(ToString::to_string).collect();
        if let Some(trailing) = trailing {
            params.push(trailing.to_string());
        }

        Some(Self {
            prefix,
            command,
            params,
        })
    }

    #[must_use]
    pub fn sender_nick(&self) -> Option<&str> {
        self.prefix.as_ref().map(|p| p.nick.as_str())
    }

    /// First parameter, the target of PRIVMSG/NOTICE/INVITE style commands.
    #[must_use]
    pub fn target(&self) -> Option<&str> {
        self.params.first().map(String::as_str)
    }

    /// Last parameter, the message body for PRIVMSG/NOTICE.
    #[must_use]
    pub fn body(&self) -> Option<&str> {
        self.params.last().map(String::as_str)
    }
}
