//! Enhanced-format document decoder
//!
//! Transcribes the station's XML into typed, unit-tagged fields without any
//! channel semantics. The document root is `<oriondata>` and every
//! measurement is a `<meas name=".." unit="..">value</meas>` leaf; some
//! firmware revisions group measurements under section elements, in which
//! case a recurring name is keyed by its dotted section path instead of
//! being overwritten.

use crate::DecodeError;
use orion_core::{DecodedDocument, DecodedField, Unit};
use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};

const ROOT_TAG: &str = "oriondata";
const MEAS_TAG: &str = "meas";

/// The station's own sample timestamp rides along without a unit attribute.
const SAMPLE_TIME_FIELD: &str = "mtSampTime";

/// Decode one raw document into a field map. Decoding is pure: the same
/// bytes always produce the same map.
pub fn decode(raw: &[u8]) -> Result<DecodedDocument, DecodeError> {
    let text =
        std::str::from_utf8(raw).map_err(|e| DecodeError::Malformed(format!("not UTF-8: {e}")))?;
    let text = repair_tail(text);
    let doc = roxmltree::Document::parse(&text)
        .map_err(|e| DecodeError::Malformed(e.to_string()))?;

    let root = doc.root_element();
    if root.tag_name().name() != ROOT_TAG {
        return Err(DecodeError::Malformed(format!(
            "unexpected root element <{}>",
            root.tag_name().name()
        )));
    }

    let mut out = DecodedDocument::default();
    // Section path of each field stored under its plain name, plus the set
    // of names already re-keyed to composite form.
    let mut sections: BTreeMap<String, String> = BTreeMap::new();
    let mut rekeyed: BTreeSet<String> = BTreeSet::new();
    let mut saw_meas = false;

    for node in root
        .descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == MEAS_TAG)
    {
        saw_meas = true;
        let name = node
            .attribute("name")
            .ok_or_else(|| DecodeError::Malformed("<meas> without a name attribute".to_string()))?;
        let raw_value = node.text().unwrap_or("").trim().to_string();

        if name == SAMPLE_TIME_FIELD {
            out.sample_time = Some(raw_value);
            continue;
        }

        // A field without a unit attribute cannot be unit-resolved; it is
        // left out of the map and surfaces downstream as source_missing.
        let Some(unit_attr) = node.attribute("unit") else {
            continue;
        };
        let unit = Unit::from_attr(unit_attr).ok_or_else(|| DecodeError::UnrecognizedUnit {
            field: name.to_string(),
            unit: unit_attr.to_string(),
        })?;
        let value: f64 = raw_value.parse().map_err(|_| {
            DecodeError::Malformed(format!("non-numeric value {raw_value:?} for {name}"))
        })?;
        let attributes: BTreeMap<String, String> = node
            .attributes()
            .filter(|a| a.name() != "name" && a.name() != "unit")
            .map(|a| (a.name().to_string(), a.value().to_string()))
            .collect();

        let field = DecodedField {
            name: name.to_string(),
            raw_value,
            value,
            unit,
            attributes,
        };

        let section = section_path(&node);
        insert_field(&mut out.fields, &mut sections, &mut rekeyed, section, field)?;
    }

    if !saw_meas {
        return Err(DecodeError::Malformed(
            "no <meas> elements in document".to_string(),
        ));
    }
    Ok(out)
}

/// Dotted ancestor-element path from the root down to the field's parent.
fn section_path(node: &roxmltree::Node<'_, '_>) -> String {
    let mut parts: Vec<&str> = node
        .ancestors()
        .skip(1) // ancestors() yields the node itself first
        .filter(|n| n.is_element())
        .map(|n| n.tag_name().name())
        .collect();
    parts.reverse();
    parts.join(".")
}

fn insert_field(
    fields: &mut BTreeMap<String, DecodedField>,
    sections: &mut BTreeMap<String, String>,
    rekeyed: &mut BTreeSet<String>,
    section: String,
    field: DecodedField,
) -> Result<(), DecodeError> {
    let name = field.name.clone();

    if rekeyed.contains(&name) {
        let key = format!("{section}.{name}");
        if fields.insert(key, field).is_some() {
            return Err(DecodeError::DuplicateField(name));
        }
        return Ok(());
    }

    match sections.get(&name).cloned() {
        None => {
            sections.insert(name.clone(), section);
            fields.insert(name, field);
        }
        Some(existing_section) if existing_section == section => {
            // Same name, same section: a real duplicate, never overwrite
            return Err(DecodeError::DuplicateField(name));
        }
        Some(existing_section) => {
            // Same name in distinct sections: re-key both by section path
            sections.remove(&name);
            if let Some(existing) = fields.remove(&name) {
                fields.insert(format!("{existing_section}.{name}"), existing);
            }
            fields.insert(format!("{section}.{name}"), field);
            rekeyed.insert(name);
        }
    }
    Ok(())
}

/// Some firmware truncates the closing tag or appends junk bytes after it.
/// Rewrite the tail to a clean `</oriondata>` before parsing, as the
/// original console does.
fn repair_tail(text: &str) -> Cow<'_, str> {
    if text.starts_with("<oriondata") && !text.trim_end().ends_with("</oriondata>") {
        if let Some(pos) = text.rfind("</ori") {
            let mut fixed = text[..pos].to_string();
            fixed.push_str("</oriondata>");
            tracing::warn!("repaired truncated document tail");
            return Cow::Owned(fixed);
        }
    }
    Cow::Borrowed(text)
}
