//! The values a log call accepts and how they are rendered to text.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

/// A value that could not be sent as plain text.
///
/// The indented JSON is rendered up front, keeping field declaration order.
/// If serialization failed, only the `Debug` rendering is kept so formatting
/// can never fail later.
#[derive(Debug, Clone, PartialEq)]
pub struct Structured {
    pretty: Option<String>,
    text: String,
}

impl Structured {
    pub fn new<T: Serialize + fmt::Debug + ?Sized>(value: &T) -> Self {
        Self {
            pretty: serde_json::to_string_pretty(value).ok(),
            text: format!("{value:?}"),
        }
    }

    pub fn from_json(value: Value) -> Self {
        Self {
            pretty: serde_json::to_string_pretty(&value).ok(),
            text: value.to_string(),
        }
    }

    /// A value with no JSON form, shown as `text` everywhere.
    pub fn textual(text: impl Into<String>) -> Self {
        Self {
            pretty: None,
            text: text.into(),
        }
    }

    /// Indented JSON, or the textual form when the value did not serialize.
    pub fn pretty(&self) -> &str {
        self.pretty.as_deref().unwrap_or(&self.text)
    }

    /// The generic one-line rendering used when several values are joined.
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// One operand of a plain log call.
#[derive(Debug, Clone, PartialEq)]
pub enum LogArg {
    Text(String),
    Structured(Structured),
}

impl LogArg {
    /// Wraps any serializable value.
    pub fn value<T: Serialize + fmt::Debug + ?Sized>(value: &T) -> Self {
        LogArg::Structured(Structured::new(value))
    }

    fn is_text(&self) -> bool {
        matches!(self, LogArg::Text(_))
    }

    fn plain(&self) -> &str {
        match self {
            LogArg::Text(text) => text,
            LogArg::Structured(value) => value.text(),
        }
    }
}

impl From<&str> for LogArg {
    fn from(text: &str) -> Self {
        LogArg::Text(text.to_string())
    }
}

impl From<String> for LogArg {
    fn from(text: String) -> Self {
        LogArg::Text(text)
    }
}

impl From<Value> for LogArg {
    fn from(value: Value) -> Self {
        LogArg::Structured(Structured::from_json(value))
    }
}

macro_rules! structured_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for LogArg {
                fn from(value: $ty) -> Self {
                    LogArg::value(&value)
                }
            }

            impl From<$ty> for Message {
                fn from(value: $ty) -> Self {
                    Message::Args(vec![LogArg::from(value)])
                }
            }
        )*
    };
}

structured_from!(bool, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

// JSON has no NaN or infinity; serde_json would write `null` for them.
macro_rules! float_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for LogArg {
                fn from(value: $ty) -> Self {
                    if value.is_finite() {
                        LogArg::value(&value)
                    } else {
                        LogArg::Structured(Structured::textual(value.to_string()))
                    }
                }
            }

            impl From<$ty> for Message {
                fn from(value: $ty) -> Self {
                    Message::Args(vec![LogArg::from(value)])
                }
            }
        )*
    };
}

float_from!(f32, f64);

/// Everything a log call can carry.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Zero or more operands, rendered by [`Message::render`].
    Args(Vec<LogArg>),
    /// Output of a format string and its arguments, used verbatim.
    Formatted(String),
}

impl Message {
    pub fn empty() -> Self {
        Message::Args(Vec::new())
    }

    /// Renders the message text.
    ///
    /// - no operands: empty string;
    /// - a single string: the string itself, unquoted;
    /// - a single other value: indented JSON, or its textual form if it does
    ///   not serialize;
    /// - several operands: concatenated, with a space inserted only between
    ///   two adjacent operands that are both non-strings.
    pub fn render(&self) -> String {
        match self {
            Message::Formatted(text) => text.clone(),
            Message::Args(args) => match args.as_slice() {
                [] => String::new(),
                [LogArg::Text(text)] => text.clone(),
                [LogArg::Structured(value)] => value.pretty().to_string(),
                many => join(many),
            },
        }
    }
}

fn join(args: &[LogArg]) -> String {
    let mut out = String::new();
    let mut previous: Option<&LogArg> = None;
    for arg in args {
        if let Some(prev) = previous {
            if !prev.is_text() && !arg.is_text() {
                out.push(' ');
            }
        }
        out.push_str(arg.plain());
        previous = Some(arg);
    }
    out
}

impl From<&str> for Message {
    fn from(text: &str) -> Self {
        Message::Args(vec![LogArg::from(text)])
    }
}

impl From<String> for Message {
    fn from(text: String) -> Self {
        Message::Args(vec![LogArg::Text(text)])
    }
}

impl From<Value> for Message {
    fn from(value: Value) -> Self {
        Message::Args(vec![LogArg::from(value)])
    }
}

impl From<LogArg> for Message {
    fn from(arg: LogArg) -> Self {
        Message::Args(vec![arg])
    }
}

impl From<Vec<LogArg>> for Message {
    fn from(args: Vec<LogArg>) -> Self {
        Message::Args(args)
    }
}

impl<const N: usize> From<[LogArg; N]> for Message {
    fn from(args: [LogArg; N]) -> Self {
        Message::Args(args.into())
    }
}

impl From<fmt::Arguments<'_>> for Message {
    fn from(args: fmt::Arguments<'_>) -> Self {
        Message::Formatted(fmt::format(args))
    }
}
