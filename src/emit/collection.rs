use serde_json::{Map, Value, json};

use crate::config::GeneratorConfig;
use crate::model::Primitive;
use crate::schema::{ClassSchema, DerivedSchema};

pub const NAME: &str = "DemoAPI";
const SCHEMA_URL: &str = "https://schema.getpostman.com/json/collection/v2.1.0/collection.json";

fn example(p: Primitive, updated: bool) -> Value {
    match p {
        Primitive::String if updated => json!("actualizado"),
        Primitive::String => json!("texto"),
        Primitive::Integer => json!(1),
        Primitive::Real => json!(1.5),
        Primitive::Boolean => json!(true),
        Primitive::Date => json!("2023-01-01"),
    }
}

/// Example request body: declared attributes, then foreign keys not
/// already declared, as integers.
pub fn example_body(class: &ClassSchema, updated: bool) -> Map<String, Value> {
    let mut body = Map::new();
    for attribute in &class.attributes {
        body.insert(attribute.name.clone(), example(attribute.primitive_type, updated));
    }
    for fk in &class.foreign_keys {
        if !body.contains_key(&fk.field_name) {
            body.insert(fk.field_name.clone(), example(Primitive::Integer, updated));
        }
    }
    body
}

fn url(resource: &str, with_id: bool) -> Value {
    let mut path = vec![json!(resource)];
    let mut raw = format!("{{{{baseUrl}}}}/{}", resource);
    if with_id {
        path.push(json!("1"));
        raw.push_str("/1");
    }
    json!({
        "raw": raw,
        "host": ["{{baseUrl}}"],
        "path": path,
    })
}

fn request(
    name: String,
    method: &str,
    resource: &str,
    with_id: bool,
    body: Option<&Map<String, Value>>,
) -> Result<Value, serde_json::Error> {
    let mut request = Map::new();
    request.insert("method".into(), json!(method));
    match body {
        Some(body) => {
            request.insert(
                "header".into(),
                json!([{ "key": "Content-Type", "value": "application/json" }]),
            );
            request.insert(
                "body".into(),
                json!({
                    "mode": "raw",
                    "raw": serde_json::to_string_pretty(body)?,
                    "options": { "raw": { "language": "json" } },
                }),
            );
        }
        None => {
            request.insert("header".into(), json!([]));
        }
    }
    request.insert("url".into(), url(resource, with_id));
    Ok(json!({
        "name": name,
        "request": Value::Object(request),
        "response": [],
    }))
}

/// The five requests of one class, in list/get/create/update/delete order.
pub fn requests(class: &ClassSchema) -> Result<Vec<Value>, serde_json::Error> {
    let name = &class.name;
    let resource = class.resource_path();
    let create = example_body(class, false);
    let update = example_body(class, true);
    Ok(vec![
        request(format!("Get All {}s", name), "GET", &resource, false, None)?,
        request(format!("Get {} by ID", name), "GET", &resource, true, None)?,
        request(format!("Create {}", name), "POST", &resource, false, Some(&create))?,
        request(format!("Update {}", name), "PUT", &resource, true, Some(&update))?,
        request(format!("Delete {}", name), "DELETE", &resource, true, None)?,
    ])
}

pub fn collection(schema: &DerivedSchema, config: &GeneratorConfig) -> Result<Value, serde_json::Error> {
    let mut folders = Vec::with_capacity(schema.classes.len());
    for class in &schema.classes {
        folders.push(json!({
            "name": class.name,
            "item": requests(class)?,
        }));
    }
    Ok(json!({
        "info": {
            "name": NAME,
            "_postman_id": "demo-api-collection",
            "schema": SCHEMA_URL,
        },
        "item": folders,
        "variable": [{ "key": "baseUrl", "value": config.api_base_url }],
    }))
}

pub fn render(schema: &DerivedSchema, config: &GeneratorConfig) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&collection(schema, config)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Diagnostics;
    use crate::model::Diagram;
    use crate::schema;

    fn schema_of(source: &str) -> DerivedSchema {
        let (diagram, _) = Diagram::parse(source).unwrap();
        schema::derive(&diagram, &mut Diagnostics::new())
    }

    #[test]
    fn test_example_bodies() {
        let schema = schema_of(
            r#"
            class Author { name String }
            class Book { title String pages Integer price Float available Boolean published Date }
            rel { Author 1 -- * Book }
            "#,
        );
        let book = schema.class("Book").unwrap();
        let create = Value::Object(example_body(book, false));
        assert_eq!(
            create,
            json!({
                "title": "texto",
                "pages": 1,
                "price": 1.5,
                "available": true,
                "published": "2023-01-01",
                "authorId": 1,
            })
        );
        let update = example_body(book, true);
        assert_eq!(update["title"], json!("actualizado"));
        assert_eq!(update["authorId"], json!(1));
    }

    #[test]
    fn test_five_requests_per_class() {
        let schema = schema_of("class Course { title String }");
        let requests = requests(schema.class("Course").unwrap()).unwrap();
        let summary: Vec<(String, String, String)> = requests
            .iter()
            .map(|r| {
                (
                    r["name"].as_str().unwrap().to_string(),
                    r["request"]["method"].as_str().unwrap().to_string(),
                    r["request"]["url"]["raw"].as_str().unwrap().to_string(),
                )
            })
            .collect();
        assert_eq!(
            summary,
            vec![
                ("Get All Courses".into(), "GET".into(), "{{baseUrl}}/courses".into()),
                ("Get Course by ID".into(), "GET".into(), "{{baseUrl}}/courses/1".into()),
                ("Create Course".into(), "POST".into(), "{{baseUrl}}/courses".into()),
                ("Update Course".into(), "PUT".into(), "{{baseUrl}}/courses/1".into()),
                ("Delete Course".into(), "DELETE".into(), "{{baseUrl}}/courses/1".into()),
            ]
        );
        assert!(requests[0]["request"].get("body").is_none());
        let raw = requests[2]["request"]["body"]["raw"].as_str().unwrap();
        let body: Value = serde_json::from_str(raw).unwrap();
        assert_eq!(body, json!({ "title": "texto" }));
    }

    #[test]
    fn test_collection_document() {
        let schema = schema_of(
            r#"
            class Course { title String }
            class Student { name String }
            class Enrollment associates Course, Student { }
            "#,
        );
        let config = GeneratorConfig {
            api_base_url: "http://api.local:9000".into(),
            ..GeneratorConfig::default()
        };
        let doc: Value = serde_json::from_str(&render(&schema, &config).unwrap()).unwrap();
        assert_eq!(doc["info"]["name"], json!("DemoAPI"));
        assert_eq!(doc["info"]["schema"], json!(SCHEMA_URL));
        assert_eq!(doc["variable"][0]["value"], json!("http://api.local:9000"));
        let folders = doc["item"].as_array().unwrap();
        assert_eq!(folders.len(), 3);
        assert_eq!(folders[2]["name"], json!("Enrollment"));
        let create_raw = folders[2]["item"][2]["request"]["body"]["raw"].as_str().unwrap();
        let body: Value = serde_json::from_str(create_raw).unwrap();
        assert_eq!(body, json!({ "courseId": 1, "studentId": 1 }));
    }
}
