use std::fs;
use std::path::PathBuf;
use std::process;

use anyhow::Context;
use clap::{Parser, Subcommand};

use shadegen::{generate_shader, Document, GenOptions, TARGETS};

#[derive(Parser)]
#[command(name = "shadegen", version)]
#[command(about = "Compiles material shading networks to shader source")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate shader source for an element of a material document
    Compile {
        /// Input material document (JSON)
        file: PathBuf,

        /// Target dialect (glsl, essl, msl, osl, mdl)
        #[arg(long, default_value = "glsl")]
        target: String,

        /// Element to generate (an output, node, or nodegraph name);
        /// defaults to the document's first output
        #[arg(long)]
        element: Option<String>,

        /// Write per-stage files into this directory instead of stdout
        #[arg(short)]
        o: Option<PathBuf>,

        /// Generation options (JSON object)
        #[arg(long)]
        options: Option<String>,
    },

    /// Validate that a material document generates without errors
    Check {
        /// Input material document (JSON)
        file: PathBuf,

        /// Target dialect to check against
        #[arg(long, default_value = "glsl")]
        target: String,

        /// Fail when color-space transforms are unavailable
        #[arg(long)]
        strict: bool,
    },

    /// List supported targets
    Targets,
}

fn load_document(path: &PathBuf) -> anyhow::Result<Document> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    Document::from_json(&text).with_context(|| format!("cannot parse {}", path.display()))
}

fn default_element(doc: &Document) -> anyhow::Result<String> {
    doc.outputs
        .first()
        .map(|o| o.name.clone())
        .or_else(|| doc.nodes.first().map(|n| n.name.clone()))
        .context("document has no outputs or nodes to generate from")
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Compile {
            file,
            target,
            element,
            o,
            options,
        } => {
            let doc = load_document(&file)?;
            let element = match element {
                Some(e) => e,
                None => default_element(&doc)?,
            };
            let options: GenOptions = match options {
                Some(text) => serde_json::from_str(&text).context("cannot parse --options")?,
                None => GenOptions::default(),
            };

            let shader = generate_shader(&doc, &element, &target, options)
                .with_context(|| format!("generation failed for '{element}' on {target}"))?;

            for warning in shader.warnings() {
                eprintln!("warning: {warning}");
            }

            match o {
                Some(dir) => {
                    fs::create_dir_all(&dir)
                        .with_context(|| format!("cannot create {}", dir.display()))?;
                    let ext = match target.as_str() {
                        "osl" => "osl",
                        "mdl" => "mdl",
                        "msl" => "metal",
                        _ => "glsl",
                    };
                    for stage in shader.stage_names() {
                        let path = dir.join(format!("{element}.{stage}.{ext}"));
                        fs::write(&path, shader.source_code(stage))
                            .with_context(|| format!("cannot write {}", path.display()))?;
                        println!("wrote {}", path.display());
                    }
                }
                None => {
                    for stage in shader.stage_names() {
                        println!("// ---- stage: {stage} ----");
                        println!("{}", shader.source_code(stage));
                    }
                }
            }
        }

        Commands::Check { file, target, strict } => {
            let doc = load_document(&file)?;
            let element = default_element(&doc)?;
            let options = GenOptions {
                strict_color_transforms: strict,
                ..GenOptions::default()
            };
            let shader = generate_shader(&doc, &element, &target, options)
                .with_context(|| format!("check failed for '{element}' on {target}"))?;
            for warning in shader.warnings() {
                eprintln!("warning: {warning}");
            }
            println!("ok: '{element}' generates on {target}");
        }

        Commands::Targets => {
            for t in TARGETS {
                println!("{t}");
            }
        }
    }

    Ok(())
}

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}
