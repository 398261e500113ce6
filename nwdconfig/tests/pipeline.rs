use nwdconfig::{
    CategoryTier, ConfigFamily, ConfigRecord, FieldType, SchemaMap, SystemdVersion, Value, build,
    coerce, data::kinds::common_kinds, extract_kind_map, family, parse, serialize,
    validate_record,
};
use pretty_assertions::assert_eq;
use serde_json::json;

fn network_document() -> Value {
    serde_json::from_str(include_str!("fixtures/systemd.network.schema.json")).unwrap()
}

fn netdev_document() -> Value {
    serde_json::from_str(include_str!("fixtures/systemd.netdev.schema.json")).unwrap()
}

fn network_model() -> SchemaMap {
    build(&network_document(), Some(SystemdVersion(257))).unwrap()
}

fn sample_record() -> ConfigRecord {
    ConfigRecord::from_json(json!({
        "Route": [
            {"Destination": "10.0.0.0/8", "Gateway": "192.168.1.254", "Metric": "100"},
            {"Table": "main", "Destination": "0.0.0.0/0"},
            {"Metric": ""}
        ],
        "Network": {
            "DNS": ["1.1.1.1", "8.8.8.8"],
            "DHCP": "no",
            "Address": ["192.168.1.10/24"],
            "Gateway": [],
            "LLDP": true
        },
        "Match": {"Name": "enp1s0"},
        "Link": {"MTUBytes": "", "ARP": null},
        "DHCPServer": {"PoolOffset": "", "PoolSize": ""},
        "Address": {"Label": "lan", "Address": "10.1.0.1/16"}
    }))
    .unwrap()
}

const SAMPLE_INI: &str = "\
[Match]
Name=enp1s0

[Network]
DHCP=no
Address=192.168.1.10/24
DNS=1.1.1.1
DNS=8.8.8.8
LLDP=true

[Address]
Address=10.1.0.1/16
Label=lan

[Route]
Gateway=192.168.1.254
Destination=10.0.0.0/8
Metric=100

[Route]
Destination=0.0.0.0/0
Table=main";

#[test]
fn network_model_shape() {
    let model = network_model();
    let names: Vec<_> = model.names().collect();
    assert_eq!(
        names,
        ["Match", "Link", "Network", "Address", "Route", "DHCPServer"]
    );

    let matcher = model.get("Match").unwrap();
    assert_eq!(matcher.tier, CategoryTier::Basic);
    assert!(matcher.doc_url.is_some());
    assert_eq!(
        matcher.option("MACAddress").unwrap().primary_type,
        FieldType::Mac
    );
    assert_eq!(matcher.option("Type").unwrap().tier, CategoryTier::Advanced);

    let network = model.get("Network").unwrap();
    let dhcp = network.option("DHCP").unwrap();
    assert_eq!(dhcp.primary_type, FieldType::Select);
    assert_eq!(dhcp.default, Some(json!("no")));
    assert_eq!(
        network.option("DNS").unwrap().element_type,
        Some(FieldType::Ip)
    );
    assert!(network.option("IPv6LinkLocalAddressGenerationMode").is_none());

    assert!(model.get("Address").unwrap().multiple);
    assert!(model.get("Route").unwrap().multiple);
    assert!(!model.get("DHCPServer").unwrap().multiple);
    assert_eq!(model.get("DHCPServer").unwrap().tier, CategoryTier::Expert);
    assert_eq!(
        model.get("Link").unwrap().option("MTUBytes").unwrap().primary_type,
        FieldType::Bytes
    );

    let route = model.get("Route").unwrap();
    let table = route.option("Table").unwrap();
    assert_eq!(table.primary_type, FieldType::Select);
    assert!(table.is_numeric());
    assert_eq!(
        route.option("Metric").unwrap().validation.as_ref().unwrap().maximum,
        Some(4294967295.0)
    );
}

#[test]
fn newer_targets_see_newer_options() {
    let model = build(&network_document(), Some(SystemdVersion(259))).unwrap();
    assert!(model.contains("IPv6SendRA"));
    assert!(
        model
            .get("Network")
            .unwrap()
            .option("IPv6LinkLocalAddressGenerationMode")
            .is_some()
    );
    let ungated = build(&network_document(), None).unwrap();
    assert_eq!(ungated, model);
}

#[test]
fn render_full_record() {
    let model = network_model();
    let text = serialize(&coerce(&sample_record(), &model), &model);
    assert_eq!(text, SAMPLE_INI);
}

#[test]
fn insertion_order_does_not_matter() {
    let model = network_model();
    let reordered = ConfigRecord::from_json(json!({
        "Address": {"Address": "10.1.0.1/16", "Label": "lan"},
        "Match": {"Name": "enp1s0"},
        "Network": {
            "LLDP": true,
            "Address": ["192.168.1.10/24"],
            "DHCP": "no",
            "DNS": ["1.1.1.1", "8.8.8.8"]
        },
        "Route": [
            {"Metric": 100, "Gateway": "192.168.1.254", "Destination": "10.0.0.0/8"},
            {"Destination": "0.0.0.0/0", "Table": "main"}
        ]
    }))
    .unwrap();
    assert_eq!(
        serialize(&reordered, &model),
        serialize(&coerce(&sample_record(), &model), &model)
    );
}

#[test]
fn coercion_is_pure_and_idempotent() {
    let model = network_model();
    let record = sample_record();
    let snapshot = record.clone();
    let once = coerce(&record, &model);
    assert_eq!(record, snapshot);
    assert_eq!(coerce(&once, &model), once);

    let routes = once.get("Route").unwrap();
    assert_eq!(routes[0]["Metric"], json!(100));
    assert_eq!(routes[1]["Table"], json!("main"));
    assert_eq!(routes[2]["Metric"], json!(""));
}

#[test]
fn rendered_text_round_trips() {
    let model = network_model();
    let loaded = parse(SAMPLE_INI, &model).unwrap();
    assert_eq!(loaded.get("Route").unwrap()[0]["Metric"], json!(100));
    assert_eq!(serialize(&loaded, &model), SAMPLE_INI);
    assert_eq!(coerce(&loaded, &model), loaded);
}

#[test]
fn netdev_kind_map() {
    let map = extract_kind_map(&netdev_document());
    for (kind, sections) in map.iter() {
        assert_eq!(sections[0], "NetDev", "kind {kind}");
    }
    assert_eq!(map.get("bridge").unwrap(), ["NetDev", "Bridge"]);
    assert_eq!(map.get("macvlan").unwrap(), ["NetDev", "MACVLAN"]);
    assert_eq!(map.get("macvtap").unwrap(), ["NetDev", "MACVLAN"]);
    assert_eq!(map.get("dummy").unwrap(), ["NetDev"]);
    assert_eq!(map.get("veth").unwrap(), ["NetDev", "Peer"]);
    assert_eq!(map.get("ipip").unwrap(), ["NetDev", "Tunnel"]);
    assert_eq!(map.get("sit").unwrap(), ["NetDev", "Tunnel"]);
    assert_eq!(
        map.get("wireguard").unwrap(),
        ["NetDev", "WireGuard", "WireGuardPeer"]
    );
    assert!(!map.contains("tun"));
    assert_eq!(
        common_kinds(&map),
        ["bridge", "bond", "vlan", "vxlan", "wireguard", "macvlan", "dummy", "veth"]
    );
}

#[test]
fn netdev_model_and_starter_file() {
    let model = build(&netdev_document(), None).unwrap();
    let netdev = model.get("NetDev").unwrap();
    assert!(netdev.option("Name").unwrap().required);
    assert_eq!(
        netdev.option("Kind").unwrap().enum_values.as_ref().unwrap().len(),
        10
    );
    assert!(model.get("WireGuardPeer").unwrap().multiple);

    let mut record = family::default_record(ConfigFamily::Netdev, None, Some("vlan"));
    record.set_field("NetDev", "Name", json!("vlan10")).unwrap();
    record.set_field("VLAN", "Id", json!("10")).unwrap();
    assert_eq!(
        family::suggest_filename(ConfigFamily::Netdev, &record).as_deref(),
        Some("25-vlan10.netdev")
    );
    assert_eq!(
        serialize(&coerce(&record, &model), &model),
        "[NetDev]\nName=vlan10\nKind=vlan\n\n[VLAN]\nId=10"
    );
}

#[test]
fn validation_reports_bad_values() {
    let model = network_model();
    let record = ConfigRecord::from_json(json!({
        "Match": {"MACAddress": "00:11:22:33:44"},
        "Address": [{"Label": "averyverylonglabel"}],
        "Route": [{"Metric": "-1", "Gateway": "not-an-ip"}]
    }))
    .unwrap();
    let issues: Vec<String> = validate_record(&record, &model)
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(
        issues,
        [
            "[Match] MACAddress=00:11:22:33:44: expected MAC",
            "[Address]#0 Address: required",
            "[Address]#0 Label=averyverylonglabel: must be at most 15 characters",
            "[Route]#0 Gateway=not-an-ip: expected IP",
            "[Route]#0 Metric=-1: must be at least 0",
        ]
    );

    assert!(validate_record(&sample_record(), &model).is_empty());
}

#[test]
fn unusable_schema_is_reported() {
    let err = build(&json!({"title": "broken"}), None).unwrap_err();
    assert!(err.to_string().starts_with("schema unusable"));
}
