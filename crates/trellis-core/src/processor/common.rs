//! Building blocks shared by the dialect processors.
//!
//! Every `process` call creates its own [`Scratch`], so nothing generated
//! for one bag leaks into the next.

use serde_json::Value;

/// Issues short lowercase variable names: `a`, `b`, ..., `z`, `aa`, `ab`, ...
#[derive(Debug, Default)]
pub struct VariableGenerator {
    prefix: String,
    next_index: usize,
    issued: Vec<String>,
    reserved: Vec<String>,
}

impl VariableGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next_index: 0,
            issued: Vec::new(),
            reserved: Vec::new(),
        }
    }

    /// Issue the next unused variable name
    pub fn next_var(&mut self) -> String {
        loop {
            let candidate = format!("{}{}", self.prefix, index_to_token(self.next_index));
            self.next_index += 1;
            if !self.issued.contains(&candidate) && !self.reserved.contains(&candidate) {
                self.issued.push(candidate.clone());
                return candidate;
            }
        }
    }

    /// Mark names as taken so they are never issued. Reserved names are
    /// not bound variables and never show up in [`issued`](Self::issued).
    pub fn reserve<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            let name = name.into();
            if !self.reserved.contains(&name) {
                self.reserved.push(name);
            }
        }
    }

    /// The most recently issued variable
    pub fn last(&self) -> Option<&str> {
        self.issued.last().map(String::as_str)
    }

    /// Every issued variable, in generation order
    pub fn issued(&self) -> &[String] {
        &self.issued
    }
}

/// Bijective base-26 token for `index` (0 -> `a`, 25 -> `z`, 26 -> `aa`).
fn index_to_token(index: usize) -> String {
    let mut n = index + 1;
    let mut chars = Vec::new();
    while n > 0 {
        n -= 1;
        chars.push((b'a' + (n % 26) as u8) as char);
        n /= 26;
    }
    chars.iter().rev().collect()
}

/// Accumulates script fragments separated by single spaces.
#[derive(Debug, Default)]
pub struct ScriptBuffer {
    fragments: Vec<String>,
}

impl ScriptBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, fragment: impl Into<String>) {
        let fragment = fragment.into();
        if !fragment.is_empty() {
            self.fragments.push(fragment);
        }
    }

    pub fn finish(self) -> String {
        self.fragments.join(" ")
    }
}

/// Per-call working state of a processor.
#[derive(Debug, Default)]
pub struct Scratch {
    pub vars: VariableGenerator,
    pub script: ScriptBuffer,
}

impl Scratch {
    pub fn new(var_prefix: impl Into<String>) -> Self {
        Self {
            vars: VariableGenerator::new(var_prefix),
            script: ScriptBuffer::new(),
        }
    }
}

/// Single-quote a string, escaping backslashes and quotes.
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        if c == '\\' || c == '\'' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('\'');
    out
}

/// Whether a string reads as a plain decimal number (`12`, `-3.5`, `1e3`).
pub fn is_numeric(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'))
        && s.chars().any(|c| c.is_ascii_digit())
        && s.parse::<f64>().is_ok()
}

/// Render a value as a script literal.
///
/// Booleans render bare, numeric-looking strings render unquoted, other
/// strings are single-quoted, and arrays/maps become `[..]`/`{k: v}`
/// literals with their members cast the same way.
pub fn cast_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) if is_numeric(s) => s.clone(),
        Value::String(s) => quote(s),
        Value::Array(items) => format!(
            "[{}]",
            items.iter().map(cast_value).collect::<Vec<_>>().join(", ")
        ),
        Value::Object(map) => format!(
            "{{{}}}",
            map.iter()
                .map(|(k, v)| format!("{}: {}", identifier_token(k), cast_value(v)))
                .collect::<Vec<_>>()
                .join(", ")
        ),
    }
}

/// Identifiers that are not plain `[A-Za-z_][A-Za-z0-9_]*` are backtick-quoted
pub fn identifier_token(name: &str) -> String {
    let plain = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if plain {
        name.to_string()
    } else {
        format!("`{}`", name.replace('`', "``"))
    }
}

/// Qualify a bare field with `var`; dotted fields pass through.
pub fn alias_field(field: &str, var: &str) -> String {
    if field.contains('.') {
        field.to_string()
    } else {
        format!("{}.{}", var, field)
    }
}
