use serde_json::{Map, Value};

use crate::data::{
    resolve::resolve,
    schema::{
        Definitions, Result, SchemaError, collect_properties, collect_required, has_union,
        is_internal_key, since_of, tier_of,
    },
    types::{CategoryTier, OptionDef, SchemaMap, Section},
    version::SystemdVersion,
};

/// Sections that repeat per entry, whatever shape the schema gives them.
///
/// Schema authors do not always model multiplicity; names listed here are
/// treated as repeatable unconditionally. Add a name here when a new
/// repeatable section is found rather than inferring it.
pub const REPEATABLE_SECTIONS: &[&str] = &[
    "Address",
    "Route",
    "RoutingPolicyRule",
    "Neighbor",
    "IPv6AddressLabel",
    "IPv6Prefix",
    "IPv6RoutePrefix",
    "DHCPv4",
    "DHCPv6",
    // netdev/network entries that repeat once per peer, lease or entry.
    "WireGuardPeer",
    "BridgeFDB",
    "BridgeMDB",
    "BridgeVLAN",
    "NextHop",
    "DHCPServerStaticLease",
    "SR-IOV",
];

/// Compile a schema document into its section model.
///
/// With a `target` version, sections and options introduced after it are
/// left out entirely. Fails only when the document has no usable
/// `properties` table.
pub fn build(document: &Value, target: Option<SystemdVersion>) -> Result<SchemaMap> {
    let root = document
        .as_object()
        .ok_or_else(|| SchemaError::unusable("schema document is not a JSON object"))?;
    let properties = root
        .get("properties")
        .and_then(Value::as_object)
        .ok_or_else(|| SchemaError::unusable("schema document has no `properties` object"))?;
    if properties.is_empty() {
        return Err(SchemaError::unusable("schema document declares no sections"));
    }

    let definitions = Definitions::of(document);
    let mut map = SchemaMap::new();
    for (name, node) in properties {
        if is_internal_key(name) {
            continue;
        }
        if let Some(section) = build_section(name, node, &definitions, target) {
            map.insert(section);
        }
    }
    Ok(map)
}

struct SectionShape<'a> {
    multiple: bool,
    object: &'a Map<String, Value>,
}

impl<'a> SectionShape<'a> {
    fn detect(outer: &'a Map<String, Value>, definitions: &Definitions<'a>) -> Self {
        let deref_obj = |v: &'a Value| definitions.deref(v).as_object();

        if is_array(outer) {
            if let Some(items) = outer.get("items").and_then(deref_obj) {
                return Self {
                    multiple: true,
                    object: items,
                };
            }
        }

        let arms: Vec<&Map<String, Value>> = ["oneOf", "anyOf"]
            .into_iter()
            .filter_map(|key| outer.get(key).and_then(Value::as_array))
            .flatten()
            .filter_map(deref_obj)
            .collect();

        if let Some(items) = arms
            .iter()
            .filter(|arm| is_array(arm))
            .find_map(|arm| arm.get("items").and_then(deref_obj))
        {
            return Self {
                multiple: true,
                object: items,
            };
        }

        let object = arms
            .iter()
            .find(|arm| arm.get("type").and_then(Value::as_str) == Some("object"))
            .or_else(|| arms.iter().find(|arm| arm.contains_key("properties")))
            .copied()
            .unwrap_or(outer);
        Self {
            multiple: false,
            object,
        }
    }
}

fn is_array(node: &Map<String, Value>) -> bool {
    node.get("type").and_then(Value::as_str) == Some("array")
}

fn build_section(
    name: &str,
    node: &Value,
    definitions: &Definitions<'_>,
    target: Option<SystemdVersion>,
) -> Option<Section> {
    let Some(outer) = definitions.deref(node).as_object() else {
        debug!("section {name}: not an object node, skipped");
        return None;
    };
    let shape = SectionShape::detect(outer, definitions);
    let object = shape.object;

    let since = since_of(outer).or_else(|| since_of(object));
    if let (Some(target), Some(since)) = (target, since) {
        if since > target {
            debug!("section {name}: introduced in {since}, target is {target}, omitted");
            return None;
        }
    }

    if !object.contains_key("properties") && !has_union(object) {
        debug!("section {name}: no properties, skipped");
        return None;
    }

    let mut multiple = shape.multiple;
    if REPEATABLE_SECTIONS.contains(&name) && !multiple {
        debug!("section {name}: repeatable by allow-list");
        multiple = true;
    } else if multiple && !REPEATABLE_SECTIONS.contains(&name) {
        warn!("section {name}: array in the schema but not in REPEATABLE_SECTIONS");
    }

    let tier = tier_of(outer)
        .or_else(|| tier_of(object))
        .unwrap_or(CategoryTier::Expert);
    let required = collect_required(object, definitions);

    let mut options = Vec::new();
    for (key, prop) in collect_properties(object, definitions) {
        if is_internal_key(key) {
            continue;
        }
        let prop_obj = prop.as_object();
        let field_since = prop_obj.and_then(since_of);
        if let (Some(target), Some(field_since)) = (target, field_since) {
            if field_since > target {
                debug!("option {name}.{key}: introduced in {field_since}, omitted");
                continue;
            }
        }
        options.push(build_option(
            key,
            prop,
            definitions,
            tier,
            required.contains(&key),
        ));
    }

    Some(Section {
        name: name.to_string(),
        label: title_of(outer)
            .or_else(|| title_of(object))
            .unwrap_or(name)
            .to_string(),
        description: text_of(object, "description").or_else(|| text_of(outer, "description")),
        doc_url: text_of(object, "documentation").or_else(|| text_of(outer, "documentation")),
        multiple,
        tier,
        since: since.map(SystemdVersion::number),
        options,
    })
}

fn build_option(
    key: &str,
    prop: &Value,
    definitions: &Definitions<'_>,
    section_tier: CategoryTier,
    required: bool,
) -> OptionDef {
    let resolved = resolve(prop, definitions);
    let prop_obj = prop.as_object();

    OptionDef {
        key: key.to_string(),
        label: prop_obj.and_then(title_of).unwrap_or(key).to_string(),
        description: resolved.description,
        primary_type: resolved.primary_type,
        candidate_types: resolved.candidate_types,
        element_type: resolved.element_type,
        element_types: resolved.element_types,
        tier: prop_obj.and_then(tier_of).unwrap_or(section_tier),
        required,
        default: resolved.default,
        validation: (!resolved.constraints.is_empty()).then_some(resolved.constraints),
        enum_values: resolved.enum_values,
        since: prop_obj.and_then(since_of).map(SystemdVersion::number),
    }
}

fn title_of(node: &Map<String, Value>) -> Option<&str> {
    node.get("title").and_then(Value::as_str)
}

fn text_of(node: &Map<String, Value>, key: &str) -> Option<String> {
    node.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
