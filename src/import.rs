//! Classifier payload import: records to a canonical diagram.

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::detect::{self, Link, LinkSet, Verdict};
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::model::{Attribute, ClassEntity, Diagram, Multiplicity, Primitive, RelationEdge, RelationKind, Visibility};
use crate::naming;
use crate::relation;
use crate::rules::DetectionRules;

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("Classifier payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Classifier payload must be a JSON object with a classes list")]
    NotAnObject,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClassifiedClass {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub attributes: Vec<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClassifiedAttribute {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub typ: Option<String>,
    #[serde(default)]
    pub visibility: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClassifiedRelation {
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub multiplicity: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ImportOutcome {
    pub diagram: Diagram,
    pub diagnostics: Diagnostics,
}

/// Parse and import a classifier payload.
///
/// Only a payload that is not a JSON object fails; bad individual records
/// are dropped with a `MalformedPayload` diagnostic.
pub fn import_json(json: &str, rules: &DetectionRules) -> Result<ImportOutcome, ImportError> {
    let value: Value = serde_json::from_str(json)?;
    let Value::Object(map) = value else {
        return Err(ImportError::NotAnObject);
    };
    let records = |key: &str| match map.get(key) {
        Some(Value::Array(items)) => items.clone(),
        _ => Vec::new(),
    };
    Ok(import(&records("classes"), &records("relationships"), rules))
}

/// Mapping of classifier type strings, by containment.
pub fn primitive_from_label(label: &str) -> Primitive {
    let label = label.to_lowercase();
    let any = |needles: &[&str]| needles.iter().any(|n| label.contains(n));
    if any(&["int", "number", "long"]) {
        Primitive::Integer
    } else if any(&["float", "double", "decimal", "real"]) {
        Primitive::Real
    } else if any(&["bool"]) {
        Primitive::Boolean
    } else if any(&["date", "time"]) {
        Primitive::Date
    } else {
        Primitive::String
    }
}

pub fn import(classes: &[Value], relationships: &[Value], rules: &DetectionRules) -> ImportOutcome {
    let mut diagnostics = Diagnostics::new();

    let mut entities: Vec<(String, Vec<Attribute>)> = Vec::new();
    for (i, value) in classes.iter().enumerate() {
        let subject = format!("classes[{}]", i);
        let record: ClassifiedClass = match serde_json::from_value(value.clone()) {
            Ok(r) => r,
            Err(e) => {
                diagnostics.push(DiagnosticKind::MalformedPayload, subject, e.to_string());
                continue;
            }
        };
        let Some(name) = record.name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()) else {
            diagnostics.push(DiagnosticKind::MalformedPayload, subject, "class without a name");
            continue;
        };
        if entities.iter().any(|(n, _)| *n == name) {
            diagnostics.push(DiagnosticKind::MalformedPayload, subject, format!("duplicate class {}", name));
            continue;
        }
        let attributes = import_attributes(&name, &record.attributes, &mut diagnostics);
        entities.push((name, attributes));
    }

    let names: Vec<String> = entities.iter().map(|(n, _)| n.clone()).collect();

    let mut links = LinkSet::new();
    for (i, value) in relationships.iter().enumerate() {
        let subject = format!("relationships[{}]", i);
        let record: ClassifiedRelation = match serde_json::from_value(value.clone()) {
            Ok(r) => r,
            Err(e) => {
                diagnostics.push(DiagnosticKind::MalformedPayload, subject, e.to_string());
                continue;
            }
        };
        let (Some(source), Some(target)) = (record.source, record.target) else {
            diagnostics.push(DiagnosticKind::MalformedPayload, subject, "relationship without both endpoints");
            continue;
        };
        let (source, target) = (source.trim().to_string(), target.trim().to_string());
        if !names.contains(&source) || !names.contains(&target) {
            diagnostics.push(
                DiagnosticKind::MalformedPayload,
                subject,
                format!("{} -> {} names an unknown class", source, target),
            );
            continue;
        }
        if source == target {
            diagnostics.push(DiagnosticKind::MalformedPayload, subject, format!("self relationship on {}", source));
            continue;
        }

        let kind = record.kind.as_deref().map(relation::kind_from_label).unwrap_or_default();
        let mut link = Link::new(source, target, kind);
        link.multiplicity = record.multiplicity;
        correct_direction(&mut link, rules, &mut diagnostics);
        links.insert(link);
    }

    detect::repair_single_links(&names, &mut links, rules, &mut diagnostics);

    let junctions: Vec<(String, String, String)> = names
        .iter()
        .filter_map(|name| match detect::heuristic(name, &links, rules) {
            Verdict::Associative { owner_a, owner_b } => Some((name.clone(), owner_a, owner_b)),
            Verdict::NotAssociative => None,
        })
        .collect();

    let diagram = build_diagram(entities, links, &junctions);
    info!(
        classes = diagram.classes.len(),
        relations = diagram.relations.len(),
        junctions = junctions.len(),
        diagnostics = diagnostics.len(),
        "imported classifier payload"
    );
    ImportOutcome { diagram, diagnostics }
}

fn import_attributes(class: &str, values: &[Value], diagnostics: &mut Diagnostics) -> Vec<Attribute> {
    let mut attributes: Vec<Attribute> = Vec::new();
    for (i, value) in values.iter().enumerate() {
        let subject = format!("{}.attributes[{}]", class, i);
        let record: ClassifiedAttribute = match value {
            // bare attribute names are common in classifier output
            Value::String(name) => ClassifiedAttribute {
                name: Some(name.clone()),
                ..Default::default()
            },
            other => match serde_json::from_value(other.clone()) {
                Ok(r) => r,
                Err(e) => {
                    diagnostics.push(DiagnosticKind::MalformedPayload, subject, e.to_string());
                    continue;
                }
            },
        };
        let Some(name) = record.name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()) else {
            diagnostics.push(DiagnosticKind::MalformedPayload, subject, "attribute without a name");
            continue;
        };
        let attribute = Attribute {
            name,
            primitive_type: record.typ.as_deref().map(primitive_from_label).unwrap_or_default(),
            visibility: record
                .visibility
                .as_deref()
                .and_then(Visibility::from_str)
                .unwrap_or_default(),
        };
        if attribute.is_identifier() {
            continue;
        }
        if attributes.iter().any(|a| a.name == attribute.name) {
            debug!(class = %class, attribute = %attribute.name, "dropping repeated attribute");
            continue;
        }
        attributes.push(attribute);
    }
    attributes
}

/// Orient a relation the conventional way round (category -> product,
/// header -> detail, actor -> action). Leaves it as supplied when no rule
/// applies or the reading is ambiguous.
fn correct_direction(link: &mut Link, rules: &DetectionRules, diagnostics: &mut Diagnostics) {
    for pattern in &rules.direction_patterns {
        let forward = pattern.source.matches(&link.source) && pattern.target.matches(&link.target);
        let reverse = pattern.source.matches(&link.target) && pattern.target.matches(&link.source);
        match (forward, reverse) {
            (true, true) => {
                diagnostics.push(
                    DiagnosticKind::Ambiguous,
                    format!("{} - {}", link.source, link.target),
                    format!("{} pattern matches both orientations, keeping as supplied", pattern.name),
                );
                return;
            }
            (true, false) => return,
            (false, true) => {
                debug!(pattern = %pattern.name, source = %link.source, target = %link.target, "flipping relation");
                flip(link);
                return;
            }
            (false, false) => {}
        }
    }

    let source = naming::normalize(&link.source);
    let target = naming::normalize(&link.target);
    let contained = source.len() < target.len() && target.contains(source.as_str());
    let plural = !source.ends_with('s') && target.ends_with('s');
    if !(contained || plural) {
        return;
    }
    if rules.is_junction_name(&link.source) || rules.is_junction_name(&link.target) {
        diagnostics.push(
            DiagnosticKind::Ambiguous,
            format!("{} - {}", link.source, link.target),
            "naming heuristics suggest flipping a junction relation, keeping as supplied",
        );
        return;
    }
    debug!(source = %link.source, target = %link.target, "flipping relation by naming heuristic");
    flip(link);
}

fn flip(link: &mut Link) {
    std::mem::swap(&mut link.source, &mut link.target);
}

fn build_diagram(
    entities: Vec<(String, Vec<Attribute>)>,
    links: LinkSet,
    junctions: &[(String, String, String)],
) -> Diagram {
    let id_of = |name: &str| {
        entities
            .iter()
            .position(|(n, _)| n == name)
            .map(|i| format!("imported_n{}", i + 1))
            .unwrap_or_default()
    };

    let classes: Vec<ClassEntity> = entities
        .iter()
        .enumerate()
        .map(|(i, (name, attributes))| {
            let id = format!("imported_n{}", i + 1);
            match junctions.iter().find(|(j, _, _)| j == name) {
                Some((_, a, b)) => {
                    // the junction's owner columns are derived, not declared
                    let owner_fields: Vec<String> = [a, b]
                        .iter()
                        .filter_map(|o| naming::type_name(o))
                        .map(|t| naming::foreign_key_field(&naming::escape_type(t)))
                        .collect();
                    let attributes = attributes
                        .iter()
                        .filter(|attr| !owner_fields.contains(&attr.name))
                        .cloned()
                        .collect();
                    ClassEntity::associative(id, name, attributes, id_of(a), id_of(b))
                }
                None => ClassEntity::regular(id, name, attributes.clone()),
            }
        })
        .collect();

    let mut relations = Vec::new();
    let mut next_id = {
        let mut n = 0;
        move || {
            n += 1;
            format!("imported_e{}", n)
        }
    };

    for (junction, a, b) in junctions {
        for owner in [a, b] {
            relations.push(
                RelationEdge::new(next_id(), id_of(owner), id_of(junction), RelationKind::Association)
                    .with_multiplicity(Multiplicity::One, Multiplicity::Many),
            );
        }
    }

    for link in links.into_links() {
        let through_junction = junctions.iter().any(|(j, _, _)| link.touches(j));
        let between_owners = junctions
            .iter()
            .any(|(_, a, b)| link.touches(a) && link.touches(b));
        if through_junction || between_owners {
            continue;
        }
        let (source_multiplicity, target_multiplicity) =
            relation::multiplicity_from_label(link.multiplicity.as_deref());
        let edge = RelationEdge::new(next_id(), id_of(&link.source), id_of(&link.target), link.kind)
            .with_multiplicity(source_multiplicity, target_multiplicity);
        let (source_multiplicity, target_multiplicity) = relation::multiplicities(&edge);
        relations.push(edge.with_multiplicity(source_multiplicity, target_multiplicity));
    }

    Diagram { classes, relations }
}
