use serde::Serialize;
use tracing::info;

use crate::archive::{self, PackageError};
use crate::config::GeneratorConfig;
use crate::detect;
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::emit::{self, OutputTree};
use crate::model::Diagram;
use crate::schema::{self, DerivedSchema};

#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("Diagram has no classes")]
    EmptyDiagram,
    #[error("Failed to render API collection: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Package(#[from] PackageError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Server,
    Client,
    Collection,
}

impl Target {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "server" | "backend" | "spring" => Some(Self::Server),
            "client" | "frontend" | "flutter" => Some(Self::Client),
            "collection" | "postman" => Some(Self::Collection),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Server => "server",
            Self::Client => "client",
            Self::Collection => "collection",
        }
    }
}

/// Normalized diagram and derived schema of one run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Prepared {
    pub diagram: Diagram,
    pub schema: DerivedSchema,
    pub diagnostics: Diagnostics,
}

#[derive(Debug, Clone)]
pub struct Generated {
    pub tree: OutputTree,
    pub diagnostics: Diagnostics,
}

#[derive(Debug, Clone)]
pub struct Packaged {
    pub bytes: Vec<u8>,
    pub diagnostics: Diagnostics,
}

#[derive(Debug, Clone, Default)]
pub struct Generator {
    config: GeneratorConfig,
}

impl Generator {
    pub fn new(config: GeneratorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Normalize associative classes and derive the schema.
    ///
    /// Fails only for a diagram without classes. Everything else is
    /// recovered and reported in the returned diagnostics.
    pub fn prepare(&self, diagram: &Diagram) -> Result<Prepared, GenerateError> {
        if diagram.is_empty() {
            return Err(GenerateError::EmptyDiagram);
        }
        let mut diagnostics = Diagnostics::new();
        let normalized = detect::normalize(diagram, &mut diagnostics);
        let schema = schema::derive(&normalized, &mut diagnostics);
        Ok(Prepared {
            diagram: normalized,
            schema,
            diagnostics,
        })
    }

    pub fn render(&self, schema: &DerivedSchema, target: Target) -> Result<OutputTree, GenerateError> {
        let tree = match target {
            Target::Server => emit::server::emit(schema, &self.config)?,
            Target::Client => emit::client::emit(schema, &self.config),
            Target::Collection => {
                let mut tree = OutputTree::new();
                tree.add(
                    emit::server::COLLECTION_FILE,
                    emit::collection::render(schema, &self.config)?,
                );
                tree
            }
        };
        Ok(tree)
    }

    pub fn generate(&self, diagram: &Diagram, target: Target) -> Result<Generated, GenerateError> {
        let prepared = self.prepare(diagram)?;
        let tree = self.render(&prepared.schema, target)?;
        summarize(target, &prepared, &tree);
        Ok(Generated {
            tree,
            diagnostics: prepared.diagnostics,
        })
    }

    /// Generate and zip. The archive is built only from a fully rendered tree.
    pub fn package(&self, diagram: &Diagram, target: Target) -> Result<Packaged, GenerateError> {
        let generated = self.generate(diagram, target)?;
        let bytes = archive::package(&generated.tree)?;
        Ok(Packaged {
            bytes,
            diagnostics: generated.diagnostics,
        })
    }
}

fn summarize(target: Target, prepared: &Prepared, tree: &OutputTree) {
    let diagnostics = &prepared.diagnostics;
    info!(
        target = target.as_str(),
        classes = prepared.schema.classes.len(),
        associative = prepared.schema.associative().count(),
        foreign_keys = prepared
            .schema
            .classes
            .iter()
            .map(|c| c.foreign_keys.len())
            .sum::<usize>(),
        files = tree.len(),
        diagnostics = diagnostics.len(),
        gaps = diagnostics.count(DiagnosticKind::InferenceGap),
        stale = diagnostics.count(DiagnosticKind::StaleReference),
        "generation finished"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PersistenceProfile;
    use crate::model::{Attribute, ClassEntity, Primitive, RelationEdge, RelationKind};
    use std::io::Cursor;

    fn enrollment() -> Diagram {
        Diagram {
            classes: vec![
                ClassEntity::regular("c1", "Course", vec![Attribute::new("name", Primitive::String)]),
                ClassEntity::regular("c2", "Student", vec![Attribute::new("name", Primitive::String)]),
                ClassEntity::associative(
                    "c3",
                    "Enrollment",
                    vec![Attribute::new("grade", Primitive::Real)],
                    "c1",
                    "c2",
                ),
            ],
            relations: vec![
                RelationEdge::new("e1", "c1", "c3", RelationKind::Association),
                RelationEdge::new("e2", "c2", "c3", RelationKind::Association),
                RelationEdge::new("e3", "c1", "c2", RelationKind::Association),
                RelationEdge::new("e4", "c1", "c9", RelationKind::Composition),
            ],
        }
    }

    #[test]
    fn test_empty_diagram_fails() {
        let err = Generator::default()
            .generate(&Diagram::default(), Target::Server)
            .unwrap_err();
        assert!(matches!(err, GenerateError::EmptyDiagram));
    }

    #[test]
    fn test_prepare_normalizes_and_derives() {
        let prepared = Generator::default().prepare(&enrollment()).unwrap();
        let junction = prepared.schema.class("c3").unwrap();
        let keys: Vec<(&str, bool)> = junction
            .foreign_keys
            .iter()
            .map(|fk| (fk.field_name.as_str(), fk.on_delete_cascade))
            .collect();
        assert_eq!(keys, vec![("courseId", true), ("studentId", true)]);
        assert!(!prepared.diagram.relations.iter().any(|e| e.joins("c1", "c2")));
        assert!(prepared.schema.class("c2").unwrap().foreign_keys.is_empty());
        assert_eq!(prepared.diagnostics.count(DiagnosticKind::StaleReference), 1);
    }

    #[test]
    fn test_targets() {
        let generator = Generator::default();
        let diagram = enrollment();
        let server = generator.generate(&diagram, Target::Server).unwrap();
        assert!(server.tree.contains("spring-crud/src/main/java/com/example/demo/entity/Enrollment.java"));
        assert_eq!(server.diagnostics.count(DiagnosticKind::StaleReference), 1);

        let client = generator.generate(&diagram, Target::Client).unwrap();
        assert!(client.tree.contains("flutter-mvp/lib/screens/student/enrollment_form_dialog.dart"));

        let collection = generator.generate(&diagram, Target::Collection).unwrap();
        assert_eq!(collection.tree.paths().collect::<Vec<_>>(), vec!["DemoAPI.postman_collection.json"]);
    }

    #[test]
    fn test_package_server_profile() {
        let generator = Generator::new(GeneratorConfig {
            persistence: PersistenceProfile::Server,
            ..GeneratorConfig::default()
        });
        let packaged = generator.package(&enrollment(), Target::Server).unwrap();
        let archive = zip::ZipArchive::new(Cursor::new(packaged.bytes)).unwrap();
        let names: Vec<&str> = archive.file_names().collect();
        assert!(names.contains(&"spring-crud/docker-compose.yml"));
        assert!(names.contains(&"spring-crud/DemoAPI.postman_collection.json"));
    }

    #[test]
    fn test_same_input_same_bytes() {
        let generator = Generator::default();
        let a = generator.package(&enrollment(), Target::Client).unwrap();
        let b = generator.package(&enrollment(), Target::Client).unwrap();
        assert_eq!(a.bytes, b.bytes);
    }

    #[test]
    fn test_target_names() {
        assert_eq!(Target::from_str("Flutter"), Some(Target::Client));
        assert_eq!(Target::from_str("postman"), Some(Target::Collection));
        assert_eq!(Target::from_str("sql"), None);
    }
}
