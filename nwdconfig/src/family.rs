use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::data::{
    record::{ConfigRecord, scalar_text},
    schema::SchemaError,
};

/// The kinds of file systemd-networkd reads, each with its own schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConfigFamily {
    Network,
    Netdev,
    Link,
    NetworkdConf,
}

impl ConfigFamily {
    pub const ALL: [ConfigFamily; 4] = [
        ConfigFamily::Network,
        ConfigFamily::Netdev,
        ConfigFamily::Link,
        ConfigFamily::NetworkdConf,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ConfigFamily::Network => "network",
            ConfigFamily::Netdev => "netdev",
            ConfigFamily::Link => "link",
            ConfigFamily::NetworkdConf => "networkd-conf",
        }
    }

    /// File name of the family's schema inside a version directory.
    pub fn schema_file(self) -> &'static str {
        match self {
            ConfigFamily::Network => "systemd.network.schema.json",
            ConfigFamily::Netdev => "systemd.netdev.schema.json",
            ConfigFamily::Link => "systemd.link.schema.json",
            ConfigFamily::NetworkdConf => "systemd.networkd.conf.schema.json",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ConfigFamily::Network => "Network",
            ConfigFamily::Netdev => "Virtual Device",
            ConfigFamily::Link => "Link",
            ConfigFamily::NetworkdConf => "networkd.conf",
        }
    }

    /// Section an editor opens first.
    pub fn first_section(self) -> &'static str {
        match self {
            ConfigFamily::Network | ConfigFamily::Link => "Match",
            ConfigFamily::Netdev => "NetDev",
            ConfigFamily::NetworkdConf => "Network",
        }
    }

    /// Section holding the fields the file name is derived from.
    pub fn filename_section(self) -> Option<&'static str> {
        match self {
            ConfigFamily::Network | ConfigFamily::Link => Some("Match"),
            ConfigFamily::Netdev => Some("NetDev"),
            ConfigFamily::NetworkdConf => None,
        }
    }

    /// Whether the family's schema carries a device kind dependency graph.
    pub fn has_kinds(self) -> bool {
        self == ConfigFamily::Netdev
    }
}

impl fmt::Display for ConfigFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConfigFamily {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ConfigFamily::ALL
            .into_iter()
            .find(|family| family.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| SchemaError::UnknownFamily(s.to_string()))
    }
}

/// Starter record for a new file of the family.
pub fn default_record(family: ConfigFamily, match_name: Option<&str>, kind: Option<&str>) -> ConfigRecord {
    let value = match family {
        ConfigFamily::Network => json!({
            "Match": {"Name": match_name.unwrap_or_default()},
            "Network": {"DHCP": "yes"}
        }),
        ConfigFamily::Netdev => json!({
            "NetDev": {"Kind": kind.filter(|k| !k.is_empty()).unwrap_or("bridge")}
        }),
        ConfigFamily::Link => json!({
            "Match": {"OriginalName": match_name.unwrap_or_default()}
        }),
        ConfigFamily::NetworkdConf => json!({}),
    };
    match value {
        Value::Object(map) => ConfigRecord::from(map),
        _ => ConfigRecord::new(),
    }
}

/// Conventional file name for a record, `None` while the deciding field is empty.
///
/// `.network` files sort early (`10-`), `.netdev` files after them (`25-`)
/// and `.link` files last (`99-`).
pub fn suggest_filename(family: ConfigFamily, record: &ConfigRecord) -> Option<String> {
    let field = |key: &str| {
        let section = family.filename_section()?;
        let text = scalar_text(record.get(section)?.get(key)?);
        let text = text.trim();
        (!text.is_empty()).then(|| text.to_string())
    };
    match family {
        ConfigFamily::Network => field("Name")
            .map(|name| format!("10-{name}.network"))
            .or_else(|| field("MACAddress").map(|mac| format!("10-{}.network", mac.replace(':', "")))),
        ConfigFamily::Netdev => field("Name").map(|name| format!("25-{name}.netdev")),
        ConfigFamily::Link => field("OriginalName").map(|name| format!("99-{name}.link")),
        ConfigFamily::NetworkdConf => Some("networkd.conf".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn family_names_round_trip() {
        for family in ConfigFamily::ALL {
            assert_eq!(family.as_str().parse::<ConfigFamily>().unwrap(), family);
        }
        assert!(matches!(
            "bogus".parse::<ConfigFamily>(),
            Err(SchemaError::UnknownFamily(_))
        ));
        assert_eq!(
            serde_json::to_string(&ConfigFamily::NetworkdConf).unwrap(),
            "\"networkd-conf\""
        );
    }

    #[test]
    fn default_records() {
        assert_eq!(
            Value::from(default_record(ConfigFamily::Network, Some("eth0"), None)),
            json!({"Match": {"Name": "eth0"}, "Network": {"DHCP": "yes"}})
        );
        assert_eq!(
            Value::from(default_record(ConfigFamily::Netdev, None, None)),
            json!({"NetDev": {"Kind": "bridge"}})
        );
        assert_eq!(
            Value::from(default_record(ConfigFamily::Netdev, None, Some("vlan"))),
            json!({"NetDev": {"Kind": "vlan"}})
        );
        assert_eq!(
            Value::from(default_record(ConfigFamily::Link, None, None)),
            json!({"Match": {"OriginalName": ""}})
        );
        assert!(default_record(ConfigFamily::NetworkdConf, None, None).is_empty());
    }

    #[test]
    fn filenames() {
        let network = default_record(ConfigFamily::Network, Some("eth0"), None);
        assert_eq!(
            suggest_filename(ConfigFamily::Network, &network).as_deref(),
            Some("10-eth0.network")
        );

        let by_mac = ConfigRecord::from_json(json!({
            "Match": {"Name": "", "MACAddress": "00:11:22:33:44:55"}
        }))
        .unwrap();
        assert_eq!(
            suggest_filename(ConfigFamily::Network, &by_mac).as_deref(),
            Some("10-001122334455.network")
        );

        let netdev = ConfigRecord::from_json(json!({"NetDev": {"Name": "br0", "Kind": "bridge"}})).unwrap();
        assert_eq!(
            suggest_filename(ConfigFamily::Netdev, &netdev).as_deref(),
            Some("25-br0.netdev")
        );

        let link = default_record(ConfigFamily::Link, None, None);
        assert_eq!(suggest_filename(ConfigFamily::Link, &link), None);

        assert_eq!(
            suggest_filename(ConfigFamily::NetworkdConf, &ConfigRecord::new()).as_deref(),
            Some("networkd.conf")
        );
    }
}
