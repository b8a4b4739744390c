//! Key/value log-line builder
//!
//! Stateless string-assembly helper for composing a single log message out of
//! ordered parts. Parts are separated by `|`, keys and values by `:`, and the
//! finished line carries a trailing space so callers can append free text.

use std::fmt::Display;

struct Part {
    key: Option<String>,
    value: String,
}

/// Fluent builder for one log message.
#[derive(Default)]
pub struct LineBuilder {
    parts: Vec<Part>,
}

impl LineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a bare value part. Empty strings are dropped.
    pub fn add(mut self, value: impl Display) -> Self {
        let value = value.to_string();
        if !value.is_empty() {
            self.parts.push(Part { key: None, value });
        }
        self
    }

    /// Append a `key:value` part. Empty keys are dropped.
    pub fn pair(mut self, key: &str, value: impl Display) -> Self {
        if !key.is_empty() {
            self.parts.push(Part {
                key: Some(key.to_string()),
                value: value.to_string(),
            });
        }
        self
    }

    /// Append an `instance:<addr>` part identifying an object by address.
    pub fn instance<T>(self, instance: &T) -> Self {
        let addr = instance as *const T as usize;
        self.pair("instance", format_args!("{addr:#x}"))
    }

    /// Start a new line within the message.
    pub fn next_line(self) -> Self {
        self.add("\r\n")
    }

    pub fn clear(mut self) -> Self {
        self.parts.clear();
        self
    }

    /// Assemble the final message. An empty builder yields an empty string.
    pub fn build(&self) -> String {
        if self.parts.is_empty() {
            return String::new();
        }

        let mut out = String::new();
        for (index, part) in self.parts.iter().enumerate() {
            out.push('|');
            if let Some(key) = &part.key {
                out.push_str(key);
                out.push(':');
            }
            out.push_str(&part.value);
            if index == self.parts.len() - 1 {
                out.push(' ');
            }
        }
        out
    }
}

impl Display for LineBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_builder_yields_empty_string() {
        assert_eq!(LineBuilder::new().build(), "");
    }

    #[test]
    fn test_parts_and_pairs() {
        let line = LineBuilder::new()
            .add("connect")
            .pair("host", "example.com")
            .pair("port", 443)
            .build();
        assert_eq!(line, "|connect|host:example.com|port:443 ");
    }

    #[test]
    fn test_empty_values_dropped() {
        let line = LineBuilder::new().add("").pair("", "x").add("ok").build();
        assert_eq!(line, "|ok ");
    }

    #[test]
    fn test_clear_resets() {
        let line = LineBuilder::new().add("a").clear().add("b").build();
        assert_eq!(line, "|b ");
    }
}
