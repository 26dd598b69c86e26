//! Notification templates
//!
//! Templates use `{{ ... }}` actions over the four fields of a
//! [`NotificationEvent`]:
//!
//! | action | renders |
//! |---|---|
//! | `{{.Hostname}}` | device hostname |
//! | `{{.Connected}}` | `true` or `false` |
//! | `{{.IP}}` | IP address (empty on disconnect) |
//! | `{{.MAC}}` | hardware address (empty on disconnect) |
//! | `{{if .Field}}a{{else}}b{{end}}` | `a` when the field is truthy, otherwise `b` |
//!
//! `{{else}}` is optional, `{{else if .Field}}` chains another condition and
//! `if` blocks nest. `Connected` is truthy when true; the string fields are
//! truthy when non-empty.
//!
//! A `-` followed by whitespace just inside the braces trims the adjacent
//! text: `{{- .IP}}` drops whitespace before the action, `{{.IP -}}` after it.
//!
//! Templates are compiled once; every malformed form is rejected by
//! [`NotificationTemplate::compile`], so rendering itself cannot fail.

use crate::error::{Error, Result};
use crate::traits::NotificationEvent;
use std::str::FromStr;

/// Template used when none is configured
pub const DEFAULT_TEMPLATE: &str =
    "{{.Hostname}} {{if .Connected}}connected{{else}}disconnected{{end}}.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Hostname,
    Connected,
    Ip,
    Mac,
}

impl Field {
    fn parse(name: &str) -> Result<Self> {
        match name {
            ".Hostname" => Ok(Field::Hostname),
            ".Connected" => Ok(Field::Connected),
            ".IP" => Ok(Field::Ip),
            ".MAC" => Ok(Field::Mac),
            other => Err(Error::template(format!(
                "unknown field '{}' (expected .Hostname, .Connected, .IP or .MAC)",
                other
            ))),
        }
    }

    fn value<'a>(&self, event: &'a NotificationEvent) -> &'a str {
        match self {
            Field::Hostname => event.hostname.as_str(),
            Field::Connected => {
                if event.connected {
                    "true"
                } else {
                    "false"
                }
            }
            Field::Ip => event.ip.as_str(),
            Field::Mac => event.mac.as_str(),
        }
    }

    fn is_truthy(&self, event: &NotificationEvent) -> bool {
        match self {
            Field::Connected => event.connected,
            _ => !self.value(event).is_empty(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Node {
    Text(String),
    Field(Field),
    If {
        condition: Field,
        then: Vec<Node>,
        otherwise: Vec<Node>,
    },
}

enum Action {
    Field(Field),
    If(Field),
    ElseIf(Field),
    Else,
    End,
}

impl Action {
    fn parse(action: &str) -> Result<Self> {
        let (keyword, args) = match action.split_once(char::is_whitespace) {
            Some((keyword, args)) => (keyword, args.trim()),
            None => (action, ""),
        };

        match keyword {
            "if" => Ok(Action::If(Field::parse(args)?)),
            "else" if args.is_empty() => Ok(Action::Else),
            "else" => match args.strip_prefix("if") {
                Some(condition)
                    if condition.is_empty() || condition.starts_with(char::is_whitespace) =>
                {
                    Ok(Action::ElseIf(Field::parse(condition.trim())?))
                }
                _ => Err(unknown_action(action)),
            },
            "end" if args.is_empty() => Ok(Action::End),
            field if args.is_empty() && field.starts_with('.') => {
                Ok(Action::Field(Field::parse(field)?))
            }
            _ => Err(unknown_action(action)),
        }
    }
}

fn unknown_action(action: &str) -> Error {
    Error::template(format!("unknown action '{{{{{}}}}}'", action))
}

/// Split trim markers off the raw text between `{{` and `}}`
///
/// Returns `(trim_before, action, trim_after)`.
fn trim_markers(raw: &str) -> (bool, &str, bool) {
    let mut action = raw;

    let trim_before = action
        .strip_prefix('-')
        .is_some_and(|rest| rest.starts_with(char::is_whitespace));
    if trim_before {
        action = &action[1..];
    }

    let trim_after = action
        .strip_suffix('-')
        .is_some_and(|rest| rest.ends_with(char::is_whitespace));
    if trim_after {
        action = &action[..action.len() - 1];
    }

    (trim_before, action.trim(), trim_after)
}

/// An `if` block still waiting for its `{{end}}`
struct OpenBlock {
    condition: Field,
    then: Vec<Node>,
    otherwise: Option<Vec<Node>>,
    /// Opened by `{{else if}}`; closed by the same `{{end}}` as its parent
    chained: bool,
}

impl OpenBlock {
    fn new(condition: Field, chained: bool) -> Self {
        Self {
            condition,
            then: Vec::new(),
            otherwise: None,
            chained,
        }
    }

    fn branch_mut(&mut self) -> &mut Vec<Node> {
        match self.otherwise {
            Some(ref mut otherwise) => otherwise,
            None => &mut self.then,
        }
    }
}

fn innermost<'a>(root: &'a mut Vec<Node>, open: &'a mut [OpenBlock]) -> &'a mut Vec<Node> {
    match open.last_mut() {
        Some(block) => block.branch_mut(),
        None => root,
    }
}

fn push_text(nodes: &mut Vec<Node>, text: &str) {
    if !text.is_empty() {
        nodes.push(Node::Text(text.to_string()));
    }
}

/// A compiled notification template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationTemplate {
    source: String,
    nodes: Vec<Node>,
}

impl NotificationTemplate {
    /// Compile a template
    ///
    /// # Errors
    ///
    /// [`Error::Template`] for an unterminated action, an unknown action or
    /// field, an `{{else}}`/`{{else if}}`/`{{end}}` without `{{if}}`, a
    /// branch after `{{else}}` in one block, or an `{{if}}` that is never
    /// closed.
    pub fn compile(source: &str) -> Result<Self> {
        let mut root = Vec::new();
        let mut open: Vec<OpenBlock> = Vec::new();
        let mut rest = source;
        let mut trim_next = false;

        while let Some(start) = rest.find("{{") {
            let offset = source.len() - rest.len() + start;

            let after = &rest[start + 2..];
            let end = after
                .find("}}")
                .ok_or_else(|| Error::template(format!("unterminated action at byte {}", offset)))?;
            let (trim_before, action, trim_after) = trim_markers(&after[..end]);

            let mut text = &rest[..start];
            if trim_next {
                text = text.trim_start();
            }
            if trim_before {
                text = text.trim_end();
            }
            push_text(innermost(&mut root, &mut open), text);

            trim_next = trim_after;
            rest = &after[end + 2..];

            match Action::parse(action)? {
                Action::Field(field) => {
                    innermost(&mut root, &mut open).push(Node::Field(field));
                }
                Action::If(condition) => open.push(OpenBlock::new(condition, false)),
                Action::ElseIf(condition) => {
                    let block = open.last_mut().ok_or_else(|| {
                        Error::template(format!("{{{{else if}}}} without {{{{if}}}} at byte {}", offset))
                    })?;
                    if block.otherwise.is_some() {
                        return Err(Error::template(format!(
                            "{{{{else if}}}} after {{{{else}}}} at byte {}",
                            offset
                        )));
                    }
                    block.otherwise = Some(Vec::new());
                    open.push(OpenBlock::new(condition, true));
                }
                Action::Else => {
                    let block = open.last_mut().ok_or_else(|| {
                        Error::template(format!("{{{{else}}}} without {{{{if}}}} at byte {}", offset))
                    })?;
                    if block.otherwise.is_some() {
                        return Err(Error::template(format!(
                            "second {{{{else}}}} in one block at byte {}",
                            offset
                        )));
                    }
                    block.otherwise = Some(Vec::new());
                }
                Action::End => loop {
                    let block = open.pop().ok_or_else(|| {
                        Error::template(format!("{{{{end}}}} without {{{{if}}}} at byte {}", offset))
                    })?;
                    let chained = block.chained;
                    innermost(&mut root, &mut open).push(Node::If {
                        condition: block.condition,
                        then: block.then,
                        otherwise: block.otherwise.unwrap_or_default(),
                    });
                    if !chained {
                        break;
                    }
                },
            }
        }

        let text = if trim_next { rest.trim_start() } else { rest };
        push_text(innermost(&mut root, &mut open), text);

        let unclosed = open.iter().filter(|block| !block.chained).count();
        if unclosed > 0 {
            return Err(Error::template(format!(
                "{} unclosed {{{{if}}}} block(s)",
                unclosed
            )));
        }

        Ok(Self {
            source: source.to_string(),
            nodes: root,
        })
    }

    /// The text this template was compiled from
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Render a notification message for an event
    pub fn render(&self, event: &NotificationEvent) -> String {
        let mut out = String::with_capacity(self.source.len() + event.hostname.len());
        render_nodes(&self.nodes, event, &mut out);
        out
    }
}

fn render_nodes(nodes: &[Node], event: &NotificationEvent, out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Field(field) => out.push_str(field.value(event)),
            Node::If {
                condition,
                then,
                otherwise,
            } => {
                let branch = if condition.is_truthy(event) { then } else { otherwise };
                render_nodes(branch, event, out);
            }
        }
    }
}

impl Default for NotificationTemplate {
    fn default() -> Self {
        Self {
            source: DEFAULT_TEMPLATE.to_string(),
            nodes: vec![
                Node::Field(Field::Hostname),
                Node::Text(" ".to_string()),
                Node::If {
                    condition: Field::Connected,
                    then: vec![Node::Text("connected".to_string())],
                    otherwise: vec![Node::Text("disconnected".to_string())],
                },
                Node::Text(".".to_string()),
            ],
        }
    }
}

impl FromStr for NotificationTemplate {
    type Err = Error;

    fn from_str(source: &str) -> Result<Self> {
        Self::compile(source)
    }
}
