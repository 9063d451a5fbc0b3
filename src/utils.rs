//! Pure rendering helpers shared by statements and builders.
//!
//! Nothing here performs I/O; every helper turns structured input into shell
//! text for one [`OsFamily`].

use shell_escape::unix::escape;

use crate::error::RenderError;
use crate::family::OsFamily;
use crate::statement::Variables;
use crate::token::{ShellToken, resolve_variable_alias};

const UNIX_ZERO_PATH: &str = "/usr/ucb/bin:/bin:/sbin:/usr/bin:/usr/sbin";
const WINDOWS_ZERO_PATH: &str = "c:\\windows\\;C:\\windows\\system32;c:\\windows\\system32\\wbem";

/// Label closing the Windows dispatch block.
const WINDOWS_END_SWITCH: &str = "END_SWITCH";
/// Prefix of the numbered Windows dispatch arms.
const WINDOWS_CASE_PREFIX: &str = "CASE_";
/// Label of the subroutine wrapping a captured run-script body.
pub(crate) const CAPTURED_BODY_LABEL: &str = "CAPTURED_BODY";
/// Label closing the Windows function section, from `{endFunctions}`.
const WINDOWS_FUNCTION_END: &str = "FUNCTION_END";

/// Replaces every `{token}` placeholder with its literal for `family`.
///
/// Substitution is a single left-to-right pass: inserted literals are never
/// rescanned. Braces that do not enclose a plain alphanumeric name are copied
/// through unchanged.
///
/// # Errors
///
/// Returns [`RenderError::UnresolvedToken`] when a placeholder has no entry in
/// the token table.
pub fn replace_tokens(text: &str, family: OsFamily) -> Result<String, RenderError> {
    let mut rendered = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(open) = rest.find('{') {
        let (before, tail) = rest.split_at(open);
        rendered.push_str(before);
        let after_brace = tail.strip_prefix('{').unwrap_or(tail);

        let name_len = after_brace
            .find(|ch: char| !ch.is_ascii_alphanumeric())
            .unwrap_or(after_brace.len());
        let (name, remainder) = after_brace.split_at(name_len);

        match remainder.strip_prefix('}') {
            Some(after_token) if !name.is_empty() => {
                let token =
                    ShellToken::from_name(name).ok_or_else(|| RenderError::UnresolvedToken {
                        token: name.to_owned(),
                        family,
                    })?;
                rendered.push_str(token.to(family));
                rest = after_token;
            }
            _ => {
                rendered.push('{');
                rest = after_brace;
            }
        }
    }

    rendered.push_str(rest);
    Ok(rendered)
}

/// Converts a lowerCamelCase key to `UPPER_SNAKE_CASE`.
///
/// Keys without lowercase letters are returned verbatim so names that are
/// already shell style survive untouched.
#[must_use]
pub fn to_upper_snake(key: &str) -> String {
    if !key.chars().any(|ch| ch.is_ascii_lowercase()) {
        return key.to_owned();
    }

    let mut converted = String::with_capacity(key.len() + 4);
    let mut previous: Option<char> = None;
    for ch in key.chars() {
        if ch.is_ascii_uppercase()
            && previous.is_some_and(|prev| prev.is_ascii_lowercase() || prev.is_ascii_digit())
        {
            converted.push('_');
        }
        converted.push(ch.to_ascii_uppercase());
        previous = Some(ch);
    }
    converted
}

/// Turns an arbitrary name into an identifier usable as a shell function or
/// batch label.
#[must_use]
pub fn function_name(name: &str) -> String {
    let mut sanitized: String = name
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                ch
            } else {
                '_'
            }
        })
        .collect();
    if sanitized.chars().next().is_none_or(|ch| ch.is_ascii_digit()) {
        sanitized.insert(0, '_');
    }
    sanitized
}

/// Renders a reference to `variable`; purely numeric names are positional
/// arguments.
#[must_use]
pub fn variable_reference(variable: &str, family: OsFamily) -> String {
    let positional = !variable.is_empty() && variable.chars().all(|ch| ch.is_ascii_digit());
    match (family, positional) {
        (OsFamily::Unix, _) => format!("${variable}"),
        (OsFamily::Windows, true) => format!("%{variable}"),
        (OsFamily::Windows, false) => format!("%{variable}%"),
    }
}

/// Renders one export line per variable, keys converted to shell style.
///
/// # Errors
///
/// Returns [`RenderError`] when a value references an unknown token.
pub fn write_variable_exporters(
    variables: &Variables,
    family: OsFamily,
) -> Result<String, RenderError> {
    let mut exports = String::new();
    for (key, value) in variables.iter() {
        let name = to_upper_snake(key);
        let resolved = replace_tokens(value, family)?;
        match family {
            OsFamily::Unix => {
                exports.push_str(&format!(
                    "export {name}=\"{}\"\n",
                    escape_double_quoted(&resolved)
                ));
            }
            OsFamily::Windows => exports.push_str(&format!("set {name}={resolved}\r\n")),
        }
    }
    Ok(exports)
}

fn escape_double_quoted(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '"' | '\\' | '`') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Wraps `body` in a function definition named after `name`.
#[must_use]
pub fn write_function(name: &str, body: &str, family: OsFamily) -> String {
    let label = function_name(name);
    match family {
        OsFamily::Unix => format!("{label}() {{\n{body}   return 0\n}}\n"),
        OsFamily::Windows => format!(":{label}\r\n{body}   exit /b 0\r\n"),
    }
}

/// Renders a dispatch on `variable` over already rendered case bodies.
///
/// There is no default arm: a value that matches no case runs nothing.
#[must_use]
pub fn write_switch(variable: &str, cases: &[(String, String)], family: OsFamily) -> String {
    let reference = variable_reference(variable, family);
    let mut switch = String::new();
    match family {
        OsFamily::Unix => {
            switch.push_str(&format!("case {reference} in\n"));
            for (value, body) in cases {
                switch.push_str(&format!("{})\n{body}   ;;\n", escape(value.as_str().into())));
            }
            switch.push_str("esac\n");
        }
        OsFamily::Windows => {
            // Labels are numbered: cmd matches them case-insensitively.
            for (index, (value, _)) in cases.iter().enumerate() {
                switch.push_str(&format!(
                    "if \"{reference}\" == \"{value}\" goto {WINDOWS_CASE_PREFIX}{index}\r\n"
                ));
            }
            switch.push_str(&format!("goto {WINDOWS_END_SWITCH}\r\n"));
            for (index, (_, body)) in cases.iter().enumerate() {
                switch.push_str(&format!(
                    ":{WINDOWS_CASE_PREFIX}{index}\r\n{body}goto {WINDOWS_END_SWITCH}\r\n"
                ));
            }
            switch.push_str(&format!(":{WINDOWS_END_SWITCH}\r\n"));
        }
    }
    switch
}

/// Renders statements clearing `variables` before anything else runs.
///
/// Names that match an OS alias (`path`, `javaHome`, `libraryPath`) are
/// replaced by the family's real variable name; duplicates after resolution
/// are dropped.
#[must_use]
pub fn write_unset_variables(variables: &[String], family: OsFamily) -> String {
    let mut resolved: Vec<&str> = Vec::with_capacity(variables.len());
    for variable in variables {
        let name = resolve_variable_alias(variable, family).unwrap_or(variable.as_str());
        if !resolved.contains(&name) {
            resolved.push(name);
        }
    }

    if resolved.is_empty() {
        return String::new();
    }

    match family {
        OsFamily::Unix => format!("unset {}\n", resolved.join(" ")),
        OsFamily::Windows => resolved
            .iter()
            .map(|name| format!("set {name}=\r\n"))
            .collect(),
    }
}

/// Renders a statement resetting `PATH` to the system defaults.
#[must_use]
pub fn write_zero_path(family: OsFamily) -> String {
    match family {
        OsFamily::Unix => format!("export PATH={UNIX_ZERO_PATH}\n"),
        OsFamily::Windows => format!("set PATH={WINDOWS_ZERO_PATH}\r\n"),
    }
}

/// Replaces every whole-word occurrence of `word` with `replacement`.
///
/// A match counts only when the characters on either side are not part of an
/// identifier, so `return` inside `returned` is left alone.
#[must_use]
pub fn replace_whole_word(text: &str, word: &str, replacement: &str) -> String {
    if word.is_empty() || word == replacement {
        return text.to_owned();
    }

    let mut replaced = String::with_capacity(text.len());
    let mut rest = text;
    let mut previous: Option<char> = None;

    while let Some(position) = rest.find(word) {
        let (before, tail) = rest.split_at(position);
        let after = tail.get(word.len()..).unwrap_or_default();
        let left = before.chars().next_back().or(previous);
        let right = after.chars().next();

        replaced.push_str(before);
        if !left.is_some_and(is_word_char) && !right.is_some_and(is_word_char) {
            replaced.push_str(replacement);
        } else {
            replaced.push_str(word);
        }
        previous = word.chars().next_back();
        rest = after;
    }

    replaced.push_str(rest);
    replaced
}

/// Counts whole-word occurrences of `word`, matching [`replace_whole_word`].
#[must_use]
pub fn count_whole_word(text: &str, word: &str) -> usize {
    let marker = "\u{0}";
    replace_whole_word(text, word, marker).matches(marker).count()
}

const fn is_word_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}

/// Escapes a line so `echo` in a batch file writes it verbatim.
///
/// Inside double quotes cmd keeps carets literally, so metacharacters there
/// are copied as is; `%` is doubled everywhere.
#[must_use]
pub fn escape_batch_echo(line: &str) -> String {
    let mut escaped = String::with_capacity(line.len());
    let mut quoted = false;
    for ch in line.chars() {
        match ch {
            '"' => {
                quoted = !quoted;
                escaped.push(ch);
            }
            '%' => escaped.push_str("%%"),
            '^' | '&' | '|' | '<' | '>' | '(' | ')' if !quoted => {
                escaped.push('^');
                escaped.push(ch);
            }
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Whether `name` would render to a label the Windows renderer emits itself.
///
/// Batch labels compare case-insensitively, so the check does too.
#[must_use]
pub fn is_reserved_label(name: &str) -> bool {
    let label = function_name(name).to_ascii_uppercase();
    [WINDOWS_END_SWITCH, WINDOWS_FUNCTION_END, CAPTURED_BODY_LABEL].contains(&label.as_str())
        || label
            .strip_prefix(WINDOWS_CASE_PREFIX)
            .is_some_and(|rest| !rest.is_empty() && rest.chars().all(|ch| ch.is_ascii_digit()))
}
