use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::data::schema::SchemaError;

/// A systemd release number such as `257`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SystemdVersion(pub u32);

impl SystemdVersion {
    /// Extract the first decimal run of a version string.
    ///
    /// Accepts `"257"`, `"v258"`, `"257-rc2"` and `networkctl --version`
    /// output such as `"systemd 257 (257.1-1)"`.
    pub fn parse(s: &str) -> Option<Self> {
        let start = s.find(|c: char| c.is_ascii_digit())?;
        let digits = &s[start..];
        let end = digits
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(digits.len());
        digits[..end].parse().ok().map(SystemdVersion)
    }

    /// Read a version marker stored as a JSON number or string.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_u64().and_then(|v| u32::try_from(v).ok()).map(SystemdVersion),
            Value::String(s) => Self::parse(s),
            _ => None,
        }
    }

    /// The release number.
    pub fn number(self) -> u32 {
        self.0
    }

    /// Name of the schema directory for this version (`v257`).
    pub fn dir_name(self) -> String {
        format!("v{}", self.0)
    }
}

impl fmt::Display for SystemdVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SystemdVersion {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| SchemaError::InvalidVersion(s.to_string()))
    }
}

/// Choose which schema release to load for a running systemd.
///
/// Below the oldest available schema the oldest is used, above the newest
/// the newest is used, otherwise the highest release not newer than
/// `target`. Without a target the newest schema is chosen.
pub fn select_schema_version(
    available: &[u32],
    target: Option<SystemdVersion>,
) -> Option<SystemdVersion> {
    let mut sorted = available.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    let (&min, &max) = (sorted.first()?, sorted.last()?);
    let Some(target) = target else {
        return Some(SystemdVersion(max));
    };

    let chosen = if target.0 <= min {
        min
    } else if target.0 >= max {
        max
    } else {
        sorted
            .iter()
            .copied()
            .take_while(|v| *v <= target.0)
            .last()
            .unwrap_or(min)
    };
    Some(SystemdVersion(chosen))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_version_strings() {
        assert_eq!(SystemdVersion::parse("257"), Some(SystemdVersion(257)));
        assert_eq!(SystemdVersion::parse("v258"), Some(SystemdVersion(258)));
        assert_eq!(SystemdVersion::parse("261-rc1"), Some(SystemdVersion(261)));
        assert_eq!(
            SystemdVersion::parse("systemd 257 (257.1-1)"),
            Some(SystemdVersion(257))
        );
        assert_eq!(SystemdVersion::parse("unknown"), None);
        assert!("".parse::<SystemdVersion>().is_err());
    }

    #[test]
    fn version_from_json() {
        assert_eq!(SystemdVersion::from_value(&json!(258)), Some(SystemdVersion(258)));
        assert_eq!(SystemdVersion::from_value(&json!("v255")), Some(SystemdVersion(255)));
        assert_eq!(SystemdVersion::from_value(&json!(true)), None);
    }

    #[test]
    fn select_clamps_and_rounds_down() {
        let available = [259, 255, 257];
        let pick = |t| select_schema_version(&available, Some(SystemdVersion(t)));
        assert_eq!(pick(250), Some(SystemdVersion(255)));
        assert_eq!(pick(256), Some(SystemdVersion(255)));
        assert_eq!(pick(257), Some(SystemdVersion(257)));
        assert_eq!(pick(258), Some(SystemdVersion(257)));
        assert_eq!(pick(300), Some(SystemdVersion(259)));
        assert_eq!(
            select_schema_version(&available, None),
            Some(SystemdVersion(259))
        );
        assert_eq!(select_schema_version(&[], Some(SystemdVersion(257))), None);
    }
}
