use tracing::debug;

use super::code::{Block, Node, Renderer};
use super::collection;
use super::java::{CompilationUnit, Field, Method, TypeDecl, TypeKind};
use super::OutputTree;
use crate::config::{GeneratorConfig, PersistenceProfile};
use crate::model::Primitive;
use crate::naming;
use crate::schema::{ClassSchema, DerivedSchema, ForeignKey};

pub const ROOT: &str = "spring-crud";
pub const COLLECTION_FILE: &str = "DemoAPI.postman_collection.json";

pub fn java_type(p: Primitive) -> &'static str {
    match p {
        Primitive::String => "String",
        Primitive::Integer => "Integer",
        Primitive::Real => "Double",
        Primitive::Boolean => "Boolean",
        Primitive::Date => "LocalDate",
    }
}

fn foreign_key_field(class: &ClassSchema, fk: &ForeignKey) -> Field {
    let on_delete = if fk.on_delete_cascade { " ON DELETE CASCADE" } else { "" };
    let definition = format!(
        "FOREIGN KEY ({}) REFERENCES {}(id){}",
        fk.field_name,
        naming::table_name(&fk.referenced_class),
        on_delete
    );
    debug!(class = %class.name, field = %fk.field_name, "foreign key column");
    Field::private("Long", &fk.field_name)
        .annotated(format!("@Column(name = \"{}\")", fk.field_name))
        .annotated(format!(
            "@JoinColumn(name = \"{}\", referencedColumnName = \"id\", foreignKey = @ForeignKey(name = \"{}\", foreignKeyDefinition = \"{}\"))",
            fk.field_name, fk.constraint_name, definition
        ))
}

pub fn entity(class: &ClassSchema, config: &GeneratorConfig) -> CompilationUnit {
    let mut ty = TypeDecl::new(TypeKind::Class, &class.name);
    ty.annotations = vec![
        "@Entity".to_string(),
        "@Data".to_string(),
        format!("@Table(name = \"{}\")", class.table()),
    ];
    ty.fields.push(
        Field::private("Long", "id")
            .annotated("@Id")
            .annotated("@GeneratedValue(strategy = GenerationType.IDENTITY)"),
    );
    for attribute in &class.attributes {
        ty.fields
            .push(Field::private(java_type(attribute.primitive_type), &attribute.name));
    }
    for fk in &class.foreign_keys {
        ty.fields.push(foreign_key_field(class, fk));
    }

    let mut unit = CompilationUnit::new(format!("{}.entity", config.base_package), ty)
        .import("jakarta.persistence.*")
        .import("lombok.Data");
    if class
        .attributes
        .iter()
        .any(|a| a.primitive_type == Primitive::Date)
    {
        unit = unit.import("java.time.LocalDate");
    }
    unit
}

pub fn repository(class: &ClassSchema, config: &GeneratorConfig) -> CompilationUnit {
    let mut ty = TypeDecl::new(TypeKind::Interface, format!("{}Repository", class.name));
    ty.annotations.push("@Repository".to_string());
    ty.extends = Some(format!("JpaRepository<{}, Long>", class.name));
    CompilationUnit::new(format!("{}.repository", config.base_package), ty)
        .import(format!("{}.entity.{}", config.base_package, class.name))
        .import("org.springframework.data.jpa.repository.JpaRepository")
        .import("org.springframework.stereotype.Repository")
}

pub fn service(class: &ClassSchema, config: &GeneratorConfig) -> CompilationUnit {
    let name = &class.name;
    let repo = format!("{}Repository", name);
    let mut ty = TypeDecl::new(TypeKind::Class, format!("{}Service", name));
    ty.annotations.push("@Service".to_string());
    ty.fields.push(Field {
        annotations: Vec::new(),
        modifiers: "private final".to_string(),
        ty: repo.clone(),
        name: "repo".to_string(),
    });
    ty.methods = vec![
        Method::new(format!("public {}Service({} repo)", name, repo))
            .annotated("@Autowired")
            .line("this.repo = repo;"),
        Method::new(format!("public List<{}> findAll()", name)).line("return repo.findAll();"),
        Method::new(format!("public {} findById(Long id)", name))
            .line("return repo.findById(id).orElse(null);"),
        Method::new(format!("public {} save({} entity)", name, name)).line("return repo.save(entity);"),
        Method::new("public void delete(Long id)").line("repo.deleteById(id);"),
    ];
    CompilationUnit::new(format!("{}.service", config.base_package), ty)
        .import(format!("{}.entity.{}", config.base_package, name))
        .import(format!("{}.repository.{}", config.base_package, repo))
        .import("org.springframework.beans.factory.annotation.Autowired")
        .import("org.springframework.stereotype.Service")
        .import("java.util.List")
}

fn not_found_guard(var: &str) -> Block {
    Block::new(format!("if ({} == null) {{", var)).line("return ResponseEntity.notFound().build();")
}

pub fn controller(class: &ClassSchema, config: &GeneratorConfig) -> CompilationUnit {
    let name = &class.name;
    let service = format!("{}Service", name);
    let mut ty = TypeDecl::new(TypeKind::Class, format!("{}Controller", name));
    ty.annotations = vec![
        "@RestController".to_string(),
        format!("@RequestMapping(\"/{}\")", class.resource_path()),
    ];
    ty.fields.push(Field {
        annotations: Vec::new(),
        modifiers: "private final".to_string(),
        ty: service.clone(),
        name: "service".to_string(),
    });
    ty.methods = vec![
        Method::new(format!("public {}Controller({} service)", name, service))
            .annotated("@Autowired")
            .line("this.service = service;"),
        Method::new(format!("public ResponseEntity<List<{}>> getAll()", name))
            .annotated("@GetMapping")
            .line("return new ResponseEntity<>(service.findAll(), HttpStatus.OK);"),
        Method::new(format!("public ResponseEntity<{}> getById(@PathVariable Long id)", name))
            .annotated("@GetMapping(\"/{id}\")")
            .line(format!("{} obj = service.findById(id);", name))
            .block(not_found_guard("obj"))
            .line("return new ResponseEntity<>(obj, HttpStatus.OK);"),
        Method::new(format!("public ResponseEntity<{}> create(@RequestBody {} obj)", name, name))
            .annotated("@PostMapping")
            .line("return new ResponseEntity<>(service.save(obj), HttpStatus.CREATED);"),
        Method::new(format!(
            "public ResponseEntity<{}> update(@PathVariable Long id, @RequestBody {} obj)",
            name, name
        ))
        .annotated("@PutMapping(\"/{id}\")")
        .line(format!("{} existing = service.findById(id);", name))
        .block(not_found_guard("existing"))
        .line("obj.setId(existing.getId());")
        .line("return new ResponseEntity<>(service.save(obj), HttpStatus.OK);"),
        Method::new("public ResponseEntity<Void> delete(@PathVariable Long id)")
            .annotated("@DeleteMapping(\"/{id}\")")
            .block(not_found_guard("service.findById(id)"))
            .line("service.delete(id);")
            .line("return ResponseEntity.noContent().build();"),
    ];
    CompilationUnit::new(format!("{}.controller", config.base_package), ty)
        .import(format!("{}.entity.{}", config.base_package, name))
        .import(format!("{}.service.{}", config.base_package, service))
        .import("org.springframework.beans.factory.annotation.Autowired")
        .import("org.springframework.http.HttpStatus")
        .import("org.springframework.http.ResponseEntity")
        .import("org.springframework.web.bind.annotation.*")
        .import("java.util.List")
}

pub fn application(config: &GeneratorConfig) -> CompilationUnit {
    let class = config.application_class();
    let mut ty = TypeDecl::new(TypeKind::Class, &class);
    ty.annotations.push("@SpringBootApplication".to_string());
    ty.methods.push(
        Method::new("public static void main(String[] args)")
            .line(format!("SpringApplication.run({}.class, args);", class)),
    );
    CompilationUnit::new(&config.base_package, ty)
        .import("org.springframework.boot.SpringApplication")
        .import("org.springframework.boot.autoconfigure.SpringBootApplication")
}

fn dependency(group: &str, artifact: &str) -> Block {
    Block::with_tail("<dependency>", "</dependency>")
        .line(format!("<groupId>{}</groupId>", group))
        .line(format!("<artifactId>{}</artifactId>", artifact))
}

fn xml(tag: &str) -> Block {
    Block::with_tail(format!("<{}>", tag), format!("</{}>", tag))
}

pub fn pom(config: &GeneratorConfig) -> Vec<Node> {
    let database = match config.persistence {
        PersistenceProfile::Embedded => dependency("com.h2database", "h2"),
        PersistenceProfile::Server => dependency("org.postgresql", "postgresql"),
    }
    .line("<scope>runtime</scope>");

    let dependencies = xml("dependencies")
        .block(dependency("org.springframework.boot", "spring-boot-starter-web"))
        .block(dependency("org.springframework.boot", "spring-boot-starter-data-jpa"))
        .block(database)
        .block(dependency("org.projectlombok", "lombok").line("<optional>true</optional>"))
        .block(
            dependency("org.springdoc", "springdoc-openapi-starter-webmvc-ui")
                .line("<version>2.2.0</version>"),
        )
        .block(
            dependency("org.springframework.boot", "spring-boot-starter-test")
                .line("<scope>test</scope>"),
        );

    let build = xml("build").block(
        xml("plugins").block(
            Block::with_tail("<plugin>", "</plugin>")
                .line("<groupId>org.springframework.boot</groupId>")
                .line("<artifactId>spring-boot-maven-plugin</artifactId>")
                .block(xml("configuration").block(xml("excludes").block(
                    Block::with_tail("<exclude>", "</exclude>")
                        .line("<groupId>org.projectlombok</groupId>")
                        .line("<artifactId>lombok</artifactId>"),
                ))),
        ),
    );

    let project = Block::with_tail(
        "<project xmlns=\"http://maven.apache.org/POM/4.0.0\" xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\" xsi:schemaLocation=\"http://maven.apache.org/POM/4.0.0 http://maven.apache.org/xsd/maven-4.0.0.xsd\">",
        "</project>",
    )
    .line("<modelVersion>4.0.0</modelVersion>")
    .line(format!("<groupId>{}</groupId>", config.group_id()))
    .line(format!("<artifactId>{}</artifactId>", config.artifact_id()))
    .line("<version>0.0.1-SNAPSHOT</version>")
    .line("<packaging>jar</packaging>")
    .blank()
    .block(
        xml("parent")
            .line("<groupId>org.springframework.boot</groupId>")
            .line("<artifactId>spring-boot-starter-parent</artifactId>")
            .line("<version>3.3.3</version>")
            .line("<relativePath/>"),
    )
    .blank()
    .block(xml("properties").line("<java.version>17</java.version>"))
    .blank()
    .block(dependencies)
    .blank()
    .block(build);

    vec![
        Node::Line("<?xml version=\"1.0\" encoding=\"UTF-8\"?>".to_string()),
        Node::Block(project),
    ]
}

pub fn application_properties(config: &GeneratorConfig) -> String {
    let mut lines: Vec<String> = match config.persistence {
        PersistenceProfile::Embedded => vec![
            "spring.datasource.url=jdbc:h2:mem:testdb".into(),
            "spring.datasource.driver-class-name=org.h2.Driver".into(),
            "spring.datasource.username=sa".into(),
            "spring.datasource.password=".into(),
        ],
        PersistenceProfile::Server => vec![
            "spring.datasource.url=jdbc:postgresql://localhost:5432/demo".into(),
            "spring.datasource.driver-class-name=org.postgresql.Driver".into(),
            "spring.datasource.username=postgres".into(),
            "spring.datasource.password=postgres".into(),
        ],
    };
    lines.push(String::new());
    lines.extend([
        "spring.jpa.hibernate.ddl-auto=create-drop".to_string(),
        "spring.jpa.show-sql=true".to_string(),
        "spring.jpa.properties.hibernate.format_sql=true".to_string(),
    ]);
    if config.persistence == PersistenceProfile::Embedded {
        lines.extend([
            String::new(),
            "spring.h2.console.enabled=true".to_string(),
            "spring.h2.console.path=/h2-console".to_string(),
        ]);
    }
    lines.extend([String::new(), format!("server.port={}", config.server_port)]);
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

pub fn readme(schema: &DerivedSchema, config: &GeneratorConfig) -> String {
    let mut out = String::from("# Spring Boot CRUD API\n\nGenerated from a UML class diagram.\n\n## Run\n\n");
    match config.persistence {
        PersistenceProfile::Embedded => {
            out.push_str("```\nmvn clean install\nmvn spring-boot:run\n```\n\n");
            out.push_str(&format!(
                "The database is an in-memory H2 instance, reset on every start. Console: `http://localhost:{}/h2-console` (JDBC URL `jdbc:h2:mem:testdb`, user `sa`, empty password).\n\n",
                config.server_port
            ));
        }
        PersistenceProfile::Server => {
            out.push_str("Database only in Docker:\n\n```\n./start-postgres.sh\nmvn clean install\nmvn spring-boot:run\n```\n\n");
            out.push_str("Everything in Docker:\n\n```\nmvn clean install\ndocker-compose up --build\n```\n\n");
            out.push_str("PostgreSQL 15 on `localhost:5432`, database `demo`, user `postgres`, password `postgres`. Stop with `docker-compose down`, drop the data with `docker-compose down -v`.\n\n");
        }
    }
    out.push_str("## Endpoints\n\n");
    for class in &schema.classes {
        out.push_str(&format!(
            "- `/{}`: GET, POST, GET/PUT/DELETE `/{{id}}`\n",
            class.resource_path()
        ));
    }
    out.push_str(&format!(
        "\nSwagger UI: `http://localhost:{port}/swagger-ui.html`, API docs: `http://localhost:{port}/v3/api-docs`.\nA Postman collection is included as `{file}`.\n",
        port = config.server_port,
        file = COLLECTION_FILE
    ));
    out
}

pub fn dockerfile(config: &GeneratorConfig) -> String {
    format!(
        "FROM openjdk:17-jdk-slim\n\nWORKDIR /app\n\nCOPY target/{}-0.0.1-SNAPSHOT.jar app.jar\n\nEXPOSE {}\n\nENTRYPOINT [\"java\", \"-jar\", \"app.jar\"]\n",
        config.artifact_id(),
        config.server_port
    )
}

pub fn docker_compose(config: &GeneratorConfig) -> String {
    let nodes = vec![
        Node::Line("version: '3.8'".to_string()),
        Node::Blank,
        Node::Block(
            Block::with_tail("services:", "")
                .block(
                    Block::with_tail("postgres:", "")
                        .line("image: postgres:15-alpine")
                        .line("container_name: demo-postgres")
                        .block(Block::with_tail("environment:", "").lines([
                            "POSTGRES_DB: demo",
                            "POSTGRES_USER: postgres",
                            "POSTGRES_PASSWORD: postgres",
                        ]))
                        .block(Block::with_tail("ports:", "").line("- \"5432:5432\""))
                        .block(
                            Block::with_tail("volumes:", "")
                                .line("- postgres_data:/var/lib/postgresql/data"),
                        ),
                )
                .block(
                    Block::with_tail("app:", "")
                        .line("build: .")
                        .line("container_name: demo-app")
                        .block(Block::with_tail("depends_on:", "").line("- postgres"))
                        .block(Block::with_tail("ports:", "").line(format!(
                            "- \"{}:{}\"",
                            config.server_port, config.server_port
                        )))
                        .block(Block::with_tail("environment:", "").lines([
                            "SPRING_DATASOURCE_URL: jdbc:postgresql://postgres:5432/demo",
                            "SPRING_DATASOURCE_USERNAME: postgres",
                            "SPRING_DATASOURCE_PASSWORD: postgres",
                        ])),
                ),
        ),
        Node::Blank,
        Node::Block(Block::with_tail("volumes:", "").line("postgres_data:")),
    ];
    Renderer::new("  ").render(&nodes)
}

pub fn start_postgres_script() -> String {
    [
        "#!/bin/bash",
        "set -e",
        "echo \"Starting PostgreSQL in Docker...\"",
        "docker-compose up -d postgres",
        "echo \"PostgreSQL listening on localhost:5432 (database demo, user postgres)\"",
    ]
    .join("\n")
        + "\n"
}

/// Render the whole server project.
pub fn emit(schema: &DerivedSchema, config: &GeneratorConfig) -> Result<OutputTree, serde_json::Error> {
    let mut tree = OutputTree::new();
    let src = format!("{}/src/main/java/{}", ROOT, config.package_path());
    let java = Renderer::new("    ");

    for class in &schema.classes {
        tree.add(format!("{}/entity/{}.java", src, class.name), entity(class, config).render());
        tree.add(
            format!("{}/repository/{}Repository.java", src, class.name),
            repository(class, config).render(),
        );
        tree.add(
            format!("{}/service/{}Service.java", src, class.name),
            service(class, config).render(),
        );
        tree.add(
            format!("{}/controller/{}Controller.java", src, class.name),
            controller(class, config).render(),
        );
    }

    tree.add(
        format!("{}/{}.java", src, config.application_class()),
        application(config).render(),
    );
    tree.add(format!("{}/pom.xml", ROOT), java.render(&pom(config)));
    tree.add(
        format!("{}/src/main/resources/application.properties", ROOT),
        application_properties(config),
    );
    tree.add(format!("{}/README.md", ROOT), readme(schema, config));
    tree.add(
        format!("{}/{}", ROOT, COLLECTION_FILE),
        collection::render(schema, config)?,
    );

    if config.persistence == PersistenceProfile::Server {
        tree.add(format!("{}/Dockerfile", ROOT), dockerfile(config));
        tree.add(format!("{}/docker-compose.yml", ROOT), docker_compose(config));
        tree.add(format!("{}/start-postgres.sh", ROOT), start_postgres_script());
    }

    debug!(files = tree.len(), "rendered server project");
    Ok(tree)
}
