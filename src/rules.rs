use serde::{Deserialize, Serialize};

use crate::naming;

/// Matches a normalized (lowercase, accent-folded) class name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NamePattern {
    /// Whole-name matches.
    pub exact: Vec<String>,
    /// Name starts with one of these and has something after it.
    pub prefixes: Vec<String>,
}

impl NamePattern {
    pub fn matches(&self, name: &str) -> bool {
        let name = naming::normalize(name);
        self.exact.iter().any(|w| *w == name)
            || self
                .prefixes
                .iter()
                .any(|p| name.len() > p.len() && name.starts_with(p.as_str()))
    }
}

/// A conventional `source -> target` orientation, e.g. header -> detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectionPattern {
    pub name: String,
    pub source: NamePattern,
    pub target: NamePattern,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DetectionRules {
    pub junction_prefixes: Vec<String>,
    pub junction_keywords: Vec<String>,
    /// Generic entity stems tried, in order, when repairing a junction
    /// candidate with a single connection.
    pub entity_stems: Vec<String>,
    pub direction_patterns: Vec<DirectionPattern>,
}

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn pattern(exact: &[&str], prefixes: &[&str]) -> NamePattern {
    NamePattern {
        exact: words(exact),
        prefixes: words(prefixes),
    }
}

impl Default for DetectionRules {
    fn default() -> Self {
        Self {
            junction_prefixes: words(&["detalle", "detail"]),
            junction_keywords: words(&[
                "intermedia",
                "relacion",
                "asociacion",
                "inscripcion",
                "union",
                "conexion",
                "enrollment",
                "membership",
                "junction",
                "association",
                "connection",
            ]),
            entity_stems: words(&[
                "producto", "product", "item", "articulo", "elemento", "objeto", "usuario", "user",
                "cliente", "client", "customer", "persona", "agente", "servicio", "service",
                "tarea", "task", "actividad", "operacion", "documento", "document", "archivo",
                "registro", "entrada", "categoria", "category", "tipo", "clase", "grupo",
            ]),
            direction_patterns: vec![
                DirectionPattern {
                    name: "classification".into(),
                    source: pattern(
                        &["categoria", "tipo", "clase", "clasificacion", "grupo", "familia", "category", "type"],
                        &[],
                    ),
                    target: pattern(
                        &["producto", "item", "elemento", "articulo", "objeto", "product"],
                        &[],
                    ),
                },
                DirectionPattern {
                    name: "header-detail".into(),
                    source: pattern(
                        &["venta", "compra", "factura", "pedido", "orden", "documento", "order", "invoice", "sale"],
                        &[],
                    ),
                    target: pattern(&[], &["detalle", "detail"]),
                },
                DirectionPattern {
                    name: "actor-action".into(),
                    source: pattern(
                        &["cliente", "usuario", "persona", "empleado", "proveedor", "vendedor", "comprador", "customer", "user"],
                        &[],
                    ),
                    target: pattern(
                        &["venta", "compra", "pedido", "orden", "transaccion", "operacion", "solicitud", "order"],
                        &[],
                    ),
                },
                DirectionPattern {
                    name: "product-detail".into(),
                    source: pattern(
                        &["producto", "item", "articulo", "elemento", "servicio", "product"],
                        &[],
                    ),
                    target: pattern(&[], &["detalle", "detail"]),
                },
            ],
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RulesError {
    #[error("Invalid rules JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl DetectionRules {
    /// Parse a rule file. Missing tables keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, RulesError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn is_junction_name(&self, name: &str) -> bool {
        let name = naming::normalize(name);
        self.junction_prefixes.iter().any(|p| name.starts_with(p.as_str()))
            || self.junction_keywords.iter().any(|k| name.contains(k.as_str()))
    }

    /// Position of the first stem contained in `name`, lower is preferred.
    pub fn stem_rank(&self, name: &str) -> Option<usize> {
        let name = naming::normalize(name);
        self.entity_stems.iter().position(|s| name.contains(s.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_junction_names() {
        let rules = DetectionRules::default();
        assert!(rules.is_junction_name("DetalleVenta"));
        assert!(rules.is_junction_name("Inscripción"));
        assert!(rules.is_junction_name("Enrollment"));
        assert!(rules.is_junction_name("ProyectoUnion"));
        assert!(!rules.is_junction_name("Producto"));
        assert!(!rules.is_junction_name("Course"));
    }

    #[test]
    fn test_stem_rank_prefers_table_order() {
        let rules = DetectionRules::default();
        assert_eq!(rules.stem_rank("Producto"), Some(0));
        assert!(rules.stem_rank("Usuario").unwrap() > rules.stem_rank("Producto").unwrap());
        assert_eq!(rules.stem_rank("Venta"), None);
    }

    #[test]
    fn test_name_pattern() {
        let p = pattern(&["categoria"], &["detalle"]);
        assert!(p.matches("Categoría"));
        assert!(p.matches("DetalleVenta"));
        assert!(!p.matches("Detalle"));
        assert!(!p.matches("Subcategoria"));
    }

    #[test]
    fn test_partial_rule_file_keeps_defaults() {
        let rules = DetectionRules::from_json(r#"{"junctionKeywords": ["bridge"]}"#).unwrap();
        assert!(rules.is_junction_name("UserBridge"));
        assert!(!rules.is_junction_name("Enrollment"));
        assert!(rules.is_junction_name("DetalleX"));
        assert_eq!(rules.direction_patterns.len(), 4);
    }
}
