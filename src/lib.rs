pub mod archive;
pub mod ast;
pub mod config;
pub mod detect;
pub mod diagnostics;
pub mod emit;
pub mod import;
pub mod lexer;
pub mod model;
pub mod naming;
pub mod parser;
pub mod pipeline;
pub mod relation;
pub mod report;
pub mod rules;
pub mod schema;
pub mod serializer;

use wasm_bindgen::prelude::*;

use config::{GeneratorConfig, PersistenceProfile};
use model::Diagram;
use pipeline::{Generator, Target};

/// Initialize panic hook for better error messages in WASM
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();
}

fn generator(persistence: Option<&str>) -> Result<Generator, String> {
    let persistence = match persistence {
        Some(p) => PersistenceProfile::from_str(p).ok_or_else(|| format!("Unknown persistence profile: {}", p))?,
        None => PersistenceProfile::default(),
    };
    Ok(Generator::new(GeneratorConfig {
        persistence,
        ..GeneratorConfig::default()
    }))
}

fn package(diagram_json: &str, target: Target, persistence: Option<&str>) -> Result<js_sys::Uint8Array, String> {
    let diagram = Diagram::from_json(diagram_json).map_err(|e| e.to_string())?;
    let packaged = generator(persistence)?
        .package(&diagram, target)
        .map_err(|e| e.to_string())?;
    Ok(js_sys::Uint8Array::from(packaged.bytes.as_slice()))
}

/// Zip of the server project for a diagram snapshot
#[wasm_bindgen(js_name = "generateServer")]
pub fn generate_server(diagram_json: &str, persistence: Option<String>) -> Result<js_sys::Uint8Array, String> {
    package(diagram_json, Target::Server, persistence.as_deref())
}

/// Zip of the mobile client project for a diagram snapshot
#[wasm_bindgen(js_name = "generateClient")]
pub fn generate_client(diagram_json: &str) -> Result<js_sys::Uint8Array, String> {
    package(diagram_json, Target::Client, None)
}

/// API collection document, as JSON text
#[wasm_bindgen(js_name = "generateCollection")]
pub fn generate_collection(diagram_json: &str) -> Result<String, String> {
    let diagram = Diagram::from_json(diagram_json).map_err(|e| e.to_string())?;
    let generator = generator(None)?;
    let prepared = generator.prepare(&diagram).map_err(|e| e.to_string())?;
    emit::collection::render(&prepared.schema, generator.config()).map_err(|e| e.to_string())
}

/// Normalized diagram, derived schema and diagnostics, as JSON text
#[wasm_bindgen(js_name = "deriveSchema")]
pub fn derive_schema(diagram_json: &str) -> Result<String, String> {
    let diagram = Diagram::from_json(diagram_json).map_err(|e| e.to_string())?;
    let prepared = generator(None)?.prepare(&diagram).map_err(|e| e.to_string())?;
    serde_json::to_string(&prepared).map_err(|e| e.to_string())
}

/// Classifier payload to `{diagram, diagnostics}` JSON text
#[wasm_bindgen(js_name = "importClassification")]
pub fn import_classification(payload: &str) -> Result<String, String> {
    let outcome = import::import_json(payload, &GeneratorConfig::default().rules).map_err(|e| e.to_string())?;
    serde_json::to_string(&serde_json::json!({
        "diagram": outcome.diagram,
        "diagnostics": outcome.diagnostics,
    }))
    .map_err(|e| e.to_string())
}

/// Text notation to `{diagram, diagnostics}` JSON text
#[wasm_bindgen(js_name = "parseDiagram")]
pub fn parse_diagram(source: &str) -> Result<String, String> {
    let (diagram, diagnostics) = Diagram::parse(source).map_err(|e| e.to_string())?;
    serde_json::to_string(&serde_json::json!({
        "diagram": diagram,
        "diagnostics": diagnostics,
    }))
    .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    const DIAGRAM: &str = r#"{
        "classes": [
            {"id": "c1", "name": "Course", "attributes": [{"name": "title", "primitiveType": "String"}]},
            {"id": "c2", "name": "Student", "attributes": []},
            {"id": "c3", "name": "Enrollment", "isAssociative": true, "associatesPair": ["c1", "c2"]}
        ],
        "relations": []
    }"#;

    #[test]
    fn test_derive_schema_json() {
        let out: Value = serde_json::from_str(&derive_schema(DIAGRAM).unwrap()).unwrap();
        let classes = out["schema"]["classes"].as_array().unwrap();
        assert_eq!(classes.len(), 3);
        assert!(out["diagnostics"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_generate_collection_json() {
        let out: Value = serde_json::from_str(&generate_collection(DIAGRAM).unwrap()).unwrap();
        assert_eq!(out["item"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_errors_are_messages() {
        assert!(derive_schema("not json").unwrap_err().starts_with("Invalid diagram JSON"));
        assert_eq!(derive_schema(r#"{"classes": []}"#).unwrap_err(), "Diagram has no classes");
        assert!(generator(Some("oracle")).is_err());
    }

    #[test]
    fn test_parse_diagram_json() {
        let out: Value = serde_json::from_str(&parse_diagram("class A { x Integer }").unwrap()).unwrap();
        assert_eq!(out["diagram"]["classes"][0]["name"], "A");
        assert_eq!(out["diagram"]["classes"][0]["attributes"][0]["primitiveType"], "Integer");
    }
}
