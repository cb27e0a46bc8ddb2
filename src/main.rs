use std::env;
use std::fs;
use std::process;

use tracing::error;
use tracing_subscriber::EnvFilter;
use umlgen::config::{GeneratorConfig, PersistenceProfile};
use umlgen::import;
use umlgen::model::Diagram;
use umlgen::pipeline::{Generator, Target};
use umlgen::report;
use umlgen::serializer;

enum Output {
    Archive(Target),
    Schema,
    Diagram,
    Notation,
}

impl Output {
    fn from_str(s: &str) -> Option<Self> {
        match s {
            "schema" => Some(Self::Schema),
            "diagram" => Some(Self::Diagram),
            "notation" => Some(Self::Notation),
            other => Target::from_str(other).map(Self::Archive),
        }
    }
}

fn usage(program: &str) -> ! {
    eprintln!("Usage: {} <input> [options]", program);
    eprintln!();
    eprintln!("Input is a diagram snapshot (.json), a classifier payload (--import)");
    eprintln!("or the class-diagram text notation.");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -t, --target <name>        server, client, collection, schema, diagram, notation");
    eprintln!("                             (default: server)");
    eprintln!("  -o, --output <file>        Output file (default: <target>.zip, or stdout for text)");
    eprintln!("  -p, --persistence <name>   embedded, server (default: embedded)");
    eprintln!("      --import               Read the input as a classifier payload");
    process::exit(1);
}

fn fail(message: impl std::fmt::Display) -> ! {
    error!("{}", message);
    eprintln!("{}", message);
    process::exit(1);
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("umlgen=info")))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        usage(&args[0]);
    }

    let input_path = &args[1];
    let mut output_path: Option<String> = None;
    let mut output = Output::Archive(Target::Server);
    let mut persistence: Option<PersistenceProfile> = None;
    let mut classifier = false;

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "-o" | "--output" => {
                i += 1;
                if i < args.len() {
                    output_path = Some(args[i].clone());
                }
            }
            "-t" | "--target" => {
                i += 1;
                if i < args.len() {
                    output = Output::from_str(&args[i]).unwrap_or_else(|| fail(format!("Invalid target: {}", args[i])));
                }
            }
            "-p" | "--persistence" => {
                i += 1;
                if i < args.len() {
                    persistence = Some(
                        PersistenceProfile::from_str(&args[i])
                            .unwrap_or_else(|| fail(format!("Invalid persistence profile: {}", args[i]))),
                    );
                }
            }
            "--import" => classifier = true,
            _ => {
                eprintln!("Unknown option: {}", args[i]);
                usage(&args[0]);
            }
        }
        i += 1;
    }

    let mut config = GeneratorConfig::from_env().unwrap_or_else(|e| fail(e));
    if let Some(persistence) = persistence {
        config.persistence = persistence;
    }

    let input = fs::read_to_string(input_path).unwrap_or_else(|e| fail(format!("Failed to read {}: {}", input_path, e)));

    // parse and import diagnostics are logged as they are recorded
    let diagram = if classifier {
        import::import_json(&input, &config.rules)
            .unwrap_or_else(|e| fail(e))
            .diagram
    } else if input_path.ends_with(".json") {
        Diagram::from_json(&input).unwrap_or_else(|e| fail(e))
    } else {
        Diagram::parse(&input).unwrap_or_else(|e| fail(e)).0
    };

    let generator = Generator::new(config);
    match output {
        Output::Archive(target) => {
            let packaged = generator.package(&diagram, target).unwrap_or_else(|e| fail(e));
            let path = output_path.unwrap_or_else(|| format!("{}.zip", target.as_str()));
            if let Err(e) = fs::write(&path, &packaged.bytes) {
                fail(format!("Failed to write {}: {}", path, e));
            }
            eprintln!("Wrote {} ({} bytes, {} diagnostics)", path, packaged.bytes.len(), packaged.diagnostics.len());
        }
        Output::Schema => {
            let prepared = generator.prepare(&diagram).unwrap_or_else(|e| fail(e));
            write_text(output_path, &report::render(&prepared.schema, &prepared.diagnostics));
        }
        Output::Diagram => {
            let prepared = generator.prepare(&diagram).unwrap_or_else(|e| fail(e));
            let json = prepared.diagram.to_json().unwrap_or_else(|e| fail(e));
            write_text(output_path, &json);
        }
        Output::Notation => {
            let prepared = generator.prepare(&diagram).unwrap_or_else(|e| fail(e));
            write_text(output_path, &serializer::serialize(&prepared.diagram));
        }
    }
}

fn write_text(output_path: Option<String>, text: &str) {
    match output_path {
        Some(path) => {
            if let Err(e) = fs::write(&path, text) {
                fail(format!("Failed to write {}: {}", path, e));
            }
        }
        None => print!("{}", text),
    }
}
