use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

pub const AUTO_MOVE_DELAY: &str = "AutoMoveDelay";
pub const AUTO_MOVE: &str = "AutoMove";
pub const SHOW_MARKS: &str = "ShowMarks";

/// A session setting, settable from the shell with
/// `setoption name <Name> value <v>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOption {
    BoolValue {
        name: String,
        value: bool,
        default: bool,
    },
    IntValue {
        name: String,
        value: i64,
        default: i64,
        min: i64,
        max: i64,
    },
}

impl SessionOption {
    pub fn name(&self) -> &str {
        match self {
            Self::BoolValue { name, .. } | Self::IntValue { name, .. } => name,
        }
    }

    /// Unparseable values leave the option untouched, numbers are clamped
    pub fn set_value(&mut self, v: &str) {
        match self {
            Self::BoolValue { value, .. } => *value = v.parse::<bool>().unwrap_or(*value),
            Self::IntValue { value, min, max, .. } => {
                let parsed = v.parse::<i64>().unwrap_or(*value);
                *value = parsed.clamp(*min, *max)
            }
        }
    }
}

impl Display for SessionOption {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BoolValue { name, value, default } => {
                write!(f, "name {} type check default {} value {}", name, default, value)
            }
            Self::IntValue {
                name,
                value,
                default,
                min,
                max,
            } => write!(
                f,
                "name {} type spin default {} min {} max {} value {}",
                name, default, min, max, value
            ),
        }
    }
}

/// Every option the shell knows, by name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options(BTreeMap<String, SessionOption>);

impl Default for Options {
    fn default() -> Self {
        let options = [
            SessionOption::IntValue {
                name: AUTO_MOVE_DELAY.to_string(),
                value: 1000,
                default: 1000,
                min: 0,
                max: 10_000,
            },
            SessionOption::BoolValue {
                name: AUTO_MOVE.to_string(),
                value: true,
                default: true,
            },
            SessionOption::BoolValue {
                name: SHOW_MARKS.to_string(),
                value: true,
                default: true,
            },
        ];
        Options(options.into_iter().map(|o| (o.name().to_string(), o)).collect())
    }
}

impl Options {
    pub fn get(&self, name: &str) -> Option<&SessionOption> {
        self.0.get(name)
    }

    /// Returns false for an unknown option
    pub fn set(&mut self, name: &str, value: &str) -> bool {
        match self.0.get_mut(name) {
            Some(option) => {
                option.set_value(value);
                true
            }
            None => false,
        }
    }

    pub fn flag(&self, name: &str) -> bool {
        matches!(self.get(name), Some(SessionOption::BoolValue { value: true, .. }))
    }

    pub fn int(&self, name: &str) -> Option<i64> {
        match self.get(name) {
            Some(SessionOption::IntValue { value, .. }) => Some(*value),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &SessionOption> {
        self.0.values()
    }
}
