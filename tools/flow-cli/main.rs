use clap::{Parser, Subcommand};
use modelflow::learnkit::linear_model::Ridge;
use modelflow::learnkit::model_selection::{GridSearchCv, KFold};
use modelflow::learnkit::pipeline::Pipeline;
use modelflow::learnkit::preprocessing::StandardScaler;
use modelflow::prelude::*;
use std::fs;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// Inspect, verify and generate model flow descriptors
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Optional TOML codec configuration
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the component tree and parameters of a flow
    Show { flow_path: String },
    /// Rebuild the model from a flow and encode it again
    Roundtrip { flow_path: String },
    /// Check the dependency manifest of a flow against the known packages
    CheckDeps { flow_path: String },
    /// Write the flow of a small search-over-pipeline model as JSON
    Demo {
        /// Output file; printed to stdout when absent
        #[arg(short, long)]
        out: Option<String>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let codec = build_codec(cli.config.as_deref());

    match cli.command {
        Command::Show { flow_path } => {
            let flow = load_flow(&flow_path);
            print_flow(&flow, "", 0);
        }
        Command::Roundtrip { flow_path } => run_roundtrip(&codec, &flow_path),
        Command::CheckDeps { flow_path } => {
            let flow = load_flow(&flow_path);
            let mut failures = 0;
            check_tree(&codec, &flow, &mut failures);
            if failures > 0 {
                exit_with_error(&format!("{} flow(s) with unsatisfied dependencies", failures));
            }
            println!("All dependencies satisfied.");
        }
        Command::Demo { out } => {
            let flow = codec
                .model_to_flow(&demo_model())
                .unwrap_or_else(|e| exit_with_error(&format!("Failed to encode demo model: {}", e)));
            let json = flow
                .to_json()
                .unwrap_or_else(|e| exit_with_error(&format!("Failed to write flow JSON: {}", e)));
            match out {
                Some(path) => {
                    fs::write(&path, json).unwrap_or_else(|e| {
                        exit_with_error(&format!("Failed to write '{}': {}", path, e))
                    });
                    println!("Demo flow written to '{}'.", path);
                }
                None => println!("{}", json),
            }
        }
    }
}

fn build_codec(config_path: Option<&str>) -> Codec {
    let mut builder = Codec::builder();
    if let Some(path) = config_path {
        let config = CodecConfig::from_file(path)
            .unwrap_or_else(|e| exit_with_error(&format!("Failed to load config: {}", e)));
        builder = builder.with_config(config);
    }
    builder.build()
}

fn load_flow(path: &str) -> Flow {
    let json = fs::read_to_string(path)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to read flow file '{}': {}", path, e)));
    Flow::from_json(&json).unwrap_or_else(|e| exit_with_error(&format!("Failed to parse flow: {}", e)))
}

fn print_flow(flow: &Flow, key: &str, depth: usize) {
    let indent = "  ".repeat(depth);
    let label = if key.is_empty() {
        flow.name.clone()
    } else {
        format!("{}: {}", key, flow.name)
    };
    match flow.flow_id {
        Some(id) => println!("{}{} (id {})", indent, label, id),
        None => println!("{}{}", indent, label),
    }
    for (name, value) in &flow.parameters {
        println!("{}  - {} = {}", indent, name, value.as_deref().unwrap_or("<empty>"));
    }
    for (component_key, component) in &flow.components {
        print_flow(component, component_key, depth + 1);
    }
}

fn run_roundtrip(codec: &Codec, flow_path: &str) {
    let start = Instant::now();
    let flow = load_flow(flow_path);
    let model = codec
        .flow_to_model(&flow)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to reconstruct model: {}", e)));
    let decode_duration = start.elapsed();

    let encode_start = Instant::now();
    let rebuilt = codec
        .model_to_flow(model.as_ref())
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to re-encode model: {}", e)));
    let encode_duration = encode_start.elapsed();

    let mut original = flow.clone();
    clear_ids(&mut original);
    if original == rebuilt {
        println!("Descriptor is stable: {}", rebuilt.name);
    } else {
        println!("Descriptor changed after round trip.");
        println!("  before: {}", original.name);
        println!("  after:  {}", rebuilt.name);
        for (name, value) in &original.parameters {
            if rebuilt.parameters.get(name) != Some(value) {
                println!("  parameter '{}' differs", name);
            }
        }
    }

    println!("\n--- Performance Summary ---");
    println!("Reconstruction:  {:?}", decode_duration);
    println!("Encoding:        {:?}", encode_duration);
}

fn clear_ids(flow: &mut Flow) {
    flow.flow_id = None;
    flow.components.values_mut().for_each(clear_ids);
}

fn check_tree(codec: &Codec, flow: &Flow, failures: &mut usize) {
    match codec.check_dependencies(&flow.dependencies) {
        Ok(()) => println!("  ok    {}", flow.name),
        Err(e) => {
            *failures += 1;
            println!("  FAIL  {}: {}", flow.name, e);
        }
    }
    for component in flow.components.values() {
        check_tree(codec, component, failures);
    }
}

fn demo_model() -> GridSearchCv {
    let pipeline = Pipeline::new(vec![
        Value::step("scale", StandardScaler::new()),
        Value::step("fit", Ridge::default()),
    ]);
    let grid = Value::dict([(
        "fit__alpha",
        Value::List(vec![Value::Float(0.1), Value::Float(1.0), Value::Float(10.0)]),
    )]);
    GridSearchCv::new(pipeline, grid).cv(Value::CrossValidator(Box::new(KFold::new(5))))
}

fn exit_with_error(message: &str) -> ! {
    eprintln!("\nError: {}", message);
    std::process::exit(1);
}
