/*
 * vPEC certified mail agent
 *
 * Copyright (C) 2003 - viridIT SAS
 * Licensed under the Elastic License 2.0
 *
 * You should have received a copy of the Elastic License 2.0 along with
 * this program. If not, see https://www.elastic.co/licensing/elastic-license.
 *
 */

/// Header of a mime section.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct Header {
    ///
    pub name: String,
    ///
    body: String,
    /// parameter ordering does not matter.
    args: Vec<Arg>,
}

/// Parameter of a mime header.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct Arg {
    /// Raw name of the parameter.
    name: String,
    /// Value of the parameter, possibly wrapped in quotes.
    value: String,
    /// Start of the value without the non-desired characters, like quotes.
    value_start: usize,
    /// End of the value without the non-desired characters, like quotes and CRLF.
    value_end: usize,
}

impl Header {
    /// Create a header from already raw fields, nothing added nor checked.
    pub fn new_unchecked(name: impl Into<String>, body: impl Into<String>, args: Vec<Arg>) -> Self {
        Self {
            name: name.into(),
            body: body.into(),
            args,
        }
    }

    /// Create a header the builder way: a space is prepended to the body,
    /// the serializer takes care of the line terminator.
    pub fn new(name: impl Into<String>, body: impl AsRef<str>, args: Vec<Arg>) -> Self {
        Self {
            name: name.into(),
            body: format!(" {}", body.as_ref()),
            args,
        }
    }

    /// Get the trimmed body of the header.
    #[must_use]
    pub fn body(&self) -> &str {
        self.body.trim()
    }

    /// Find a parameter of the current header.
    #[must_use]
    pub fn arg(&self, needle: &str) -> Option<&Arg> {
        self.args
            .iter()
            .find(|arg| arg.name().eq_ignore_ascii_case(needle))
    }

    /// Everything after the colon, raw, line terminator included.
    #[must_use]
    pub fn raw_body(&self) -> String {
        let mut out = self.body.clone();
        for arg in &self.args {
            out.push(';');
            out.push_str(&arg.name);
            out.push('=');
            out.push_str(&arg.value);
        }
        if !out.ends_with("\r\n") {
            out.push_str("\r\n");
        }
        out
    }
}

impl std::fmt::Display for Header {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)?;
        f.write_str(":")?;
        f.write_str(&self.raw_body())
    }
}

impl std::str::FromStr for Arg {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((name, value)) = s.split_once('=') else {
            return Err(());
        };

        let name = name.to_string();
        let value = value.to_string();

        let mut value_start = 0;
        let mut value_end = value.len();

        // Give access to the parameter value without its quotes. A plain
        // `trim` is not enough because quotes are not WSPs.
        match (value.find('"'), value.rfind('"')) {
            (Some(start), Some(end)) if start < end => {
                value_start = start + 1;
                value_end = end;
            }
            _ => {
                // No quotes: still strip a trailing CRLF.
                if let Some(end) = value.rfind("\r\n") {
                    value_end = end;
                }
            }
        };

        Ok(Self {
            name,
            value,
            value_start,
            value_end,
        })
    }
}

impl Arg {
    /// Create a parameter with a double-quoted value.
    #[must_use]
    pub fn quoted(name: impl Into<String>, value: impl AsRef<str>) -> Self {
        let value = format!("\"{}\"", value.as_ref());
        let value_end = value.len() - 1;
        Self {
            name: format!(" {}", name.into()),
            value,
            value_start: 1,
            value_end,
        }
    }

    /// Create a parameter with a bare value.
    #[must_use]
    pub fn unquoted(name: impl Into<String>, value: impl Into<String>) -> Self {
        let value = value.into();
        let value_end = value.len();
        Self {
            name: format!(" {}", name.into()),
            value,
            value_start: 0,
            value_end,
        }
    }

    /// Get the trimmed name of the parameter.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.trim()
    }

    /// Get the value of the parameter, quotes excluded.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value[self.value_start..self.value_end]
    }

    /// Get the full value of the parameter, quotes and CRLF included.
    #[must_use]
    pub fn raw_value(&self) -> &str {
        &self.value
    }

    /// Get the full mutable value of the parameter.
    pub fn mut_value(&mut self) -> &mut String {
        &mut self.value
    }
}
