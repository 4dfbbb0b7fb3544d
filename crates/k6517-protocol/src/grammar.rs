//! Request grammar
//!
//! The accepted command set is a fixed, ordered list of rules. Each rule is a
//! pure function from a request line (terminator already stripped) to an
//! optional [`ScpiCommand`]. Rules are tried in order and the first match
//! wins; a line no rule accepts becomes [`ScpiCommand::Unknown`].
//!
//! | Rule                         | Case                      |
//! |------------------------------|---------------------------|
//! | `FUNC?`                      | any                       |
//! | `READ?`                      | exact                     |
//! | `<mode>:DC:RANGE?`           | exact                     |
//! | `*CLS`                       | exact                     |
//! | `FUNC '<mode>:DC'`           | exact                     |
//! | `<mode>:DC:RANG <float>`     | all upper or all lower    |
//! | `:SYST[EM]:ERR[OR]?`         | any                       |
//! | `:STAT[US]:QUE[UE]?`         | any                       |
//!
//! `<mode>` is `CURR` or `VOLT`.

use tracing::debug;

use crate::command::ScpiCommand;
use crate::error::ParseError;

/// A grammar rule matcher
pub type Matcher = fn(&str) -> Option<ScpiCommand>;

/// Grammar rules in priority order
pub const RULES: &[(&str, Matcher)] = &[
    ("FUNC?", match_get_function),
    ("READ?", match_read),
    ("<mode>:DC:RANGE?", match_get_range),
    ("*CLS", match_clear_status),
    ("FUNC '<mode>:DC'", match_set_function),
    ("<mode>:DC:RANG <float>", match_set_range),
    (":SYST[EM]:ERR[OR]?", match_system_error),
    (":STAT[US]:QUE[UE]?", match_status_queue),
];

const UPPER_MODES: [&str; 2] = ["CURR", "VOLT"];
const LOWER_MODES: [&str; 2] = ["curr", "volt"];

/// Parse one request line
pub fn parse_line(line: &str) -> ScpiCommand {
    RULES
        .iter()
        .find_map(|(_, matcher)| matcher(line))
        .unwrap_or_else(|| ScpiCommand::Unknown(line.to_string()))
}

/// Name of the first rule that accepts `line`, if any
pub fn matching_rule(line: &str) -> Option<&'static str> {
    RULES
        .iter()
        .find(|(_, matcher)| matcher(line).is_some())
        .map(|(name, _)| *name)
}

fn match_get_function(line: &str) -> Option<ScpiCommand> {
    line.eq_ignore_ascii_case("FUNC?")
        .then_some(ScpiCommand::GetFunction)
}

fn match_read(line: &str) -> Option<ScpiCommand> {
    (line == "READ?").then_some(ScpiCommand::Read)
}

fn match_get_range(line: &str) -> Option<ScpiCommand> {
    let mode = line.strip_suffix(":DC:RANGE?")?;
    UPPER_MODES.contains(&mode).then(|| ScpiCommand::GetRange {
        mode: mode.to_string(),
    })
}

fn match_clear_status(line: &str) -> Option<ScpiCommand> {
    (line == "*CLS").then_some(ScpiCommand::ClearStatus)
}

fn match_set_function(line: &str) -> Option<ScpiCommand> {
    let mode = line.strip_prefix("FUNC '")?.strip_suffix(":DC'")?;
    UPPER_MODES.contains(&mode).then(|| ScpiCommand::SetFunction {
        mode: mode.to_string(),
    })
}

fn match_set_range(line: &str) -> Option<ScpiCommand> {
    let (mode, value) = split_mode_argument(line, &UPPER_MODES, ":DC:RANG ")
        .or_else(|| split_mode_argument(line, &LOWER_MODES, ":dc:rang "))?;

    match parse_float(value) {
        Ok(value) => Some(ScpiCommand::SetRange {
            mode: mode.to_string(),
            value,
        }),
        Err(e) => {
            debug!("Range argument rejected: {}", e);
            None
        }
    }
}

fn match_system_error(line: &str) -> Option<ScpiCommand> {
    match_abbreviated(line, &[(":SYST", "EM"), (":ERR", "OR")]).then_some(ScpiCommand::SystemError)
}

fn match_status_queue(line: &str) -> Option<ScpiCommand> {
    match_abbreviated(line, &[(":STAT", "US"), (":QUE", "UE")]).then_some(ScpiCommand::StatusQueue)
}

/// Split `<mode><separator><argument>` where mode is one of `modes`
fn split_mode_argument<'a>(
    line: &'a str,
    modes: &[&str],
    separator: &str,
) -> Option<(&'a str, &'a str)> {
    modes.iter().find_map(|mode| {
        let argument = line.strip_prefix(mode)?.strip_prefix(separator)?;
        Some((&line[..mode.len()], argument))
    })
}

/// Match a case-insensitive query built from `(required, optional)` keyword
/// pairs, followed by a single `?`
fn match_abbreviated(line: &str, keywords: &[(&str, &str)]) -> bool {
    let upper = line.to_ascii_uppercase();
    let mut rest = upper.as_str();

    for (required, optional) in keywords {
        let Some(after) = rest.strip_prefix(required) else {
            return false;
        };
        rest = after.strip_prefix(optional).unwrap_or(after);
    }

    rest == "?"
}

/// Parse a generic floating-point literal: `[+-]digits[.digits][e[+-]digits]`
///
/// Rejects the special spellings (`inf`, `nan`) `f64::from_str` would accept.
pub fn parse_float(text: &str) -> Result<f64, ParseError> {
    let invalid = || ParseError::InvalidNumber(text.to_string());
    let bytes = text.as_bytes();
    let mut pos = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        pos += 1;
    }

    let int_digits = count_digits(&bytes[pos..]);
    pos += int_digits;

    let mut frac_digits = 0;
    if bytes.get(pos) == Some(&b'.') {
        pos += 1;
        frac_digits = count_digits(&bytes[pos..]);
        pos += frac_digits;
    }

    if int_digits == 0 && frac_digits == 0 {
        return Err(invalid());
    }

    if matches!(bytes.get(pos), Some(b'e' | b'E')) {
        pos += 1;
        if matches!(bytes.get(pos), Some(b'+' | b'-')) {
            pos += 1;
        }
        let exp_digits = count_digits(&bytes[pos..]);
        if exp_digits == 0 {
            return Err(invalid());
        }
        pos += exp_digits;
    }

    if pos != bytes.len() {
        return Err(invalid());
    }

    text.parse::<f64>().map_err(|_| invalid())
}

fn count_digits(bytes: &[u8]) -> usize {
    bytes.iter().take_while(|b| b.is_ascii_digit()).count()
}
