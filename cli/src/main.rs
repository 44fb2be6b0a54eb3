use clap::{Args, Parser, Subcommand};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use brine_nifxml::{load_file, model_to_json, natives_from_json, naming::member_name, Expr, Model, NativeTypes};
use brine_nifxml_compiler::error::NifError;

#[derive(Parser)]
#[command(name = "bnif")]
#[command(about = "Load, check and query nif.xml schema documents", long_about = None)]
struct Cli {
    /// Log loader progress (`RUST_LOG` takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct SchemaArgs {
    /// Input nif.xml file
    #[arg(short, long)]
    input: PathBuf,

    /// JSON object mapping basic type names to native types
    #[arg(long)]
    natives: Option<PathBuf>,

    /// Native type for one basic type, as `NAME=TYPE` (repeatable)
    #[arg(long = "native", value_parser = parse_native)]
    native: Vec<(String, String)>,
}

#[derive(Subcommand)]
enum Commands {
    /// Load and validate a schema, then print what it defines
    Check {
        #[command(flatten)]
        schema: SchemaArgs,
    },

    /// Load a schema and print the model as JSON
    Dump {
        #[command(flatten)]
        schema: SchemaArgs,

        /// Output `.json` file (if omitted, prints to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Evaluate an expression against field values
    Eval {
        /// The expression, e.g. `Num Vertices > 0 && Has Normals`
        #[arg(short, long)]
        expr: String,

        /// Field value as `NAME=VALUE` (repeatable)
        #[arg(short, long = "bind", value_parser = parse_binding)]
        bind: Vec<(String, i64)>,

        /// Schema whose block names are type checks
        #[arg(short, long, requires = "block")]
        input: Option<PathBuf>,

        /// Block type of the object being read
        #[arg(long, requires = "input")]
        block: Option<String>,
    },

    /// Render an expression for generated code
    Render {
        #[arg(short, long)]
        expr: String,

        /// Prepended to every field name
        #[arg(long, default_value = "")]
        prefix: String,

        /// Leave the outermost expression unbracketed
        #[arg(long)]
        no_brackets: bool,

        /// Write field names as camelCase members
        #[arg(long)]
        member_names: bool,

        /// Schema whose block names become type checks
        #[arg(short, long)]
        input: Option<PathBuf>,
    },
}

fn parse_native(arg: &str) -> Result<(String, String), String> {
    arg.split_once('=')
        .map(|(name, native)| (name.trim().to_string(), native.trim().to_string()))
        .ok_or_else(|| format!("expected NAME=TYPE, got {:?}", arg))
}

fn parse_binding(arg: &str) -> Result<(String, i64), String> {
    let (name, value) = arg
        .rsplit_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got {:?}", arg))?;
    let value = match value.trim() {
        "true" => 1,
        "false" => 0,
        v => v.parse::<i64>().map_err(|e| format!("bad value for {:?}: {}", name, e))?,
    };
    Ok((name.trim().to_string(), value))
}

impl SchemaArgs {
    fn natives(&self) -> Result<NativeTypes, NifError> {
        let mut natives = match &self.natives {
            Some(path) => natives_from_json(&fs::read_to_string(path)?)?,
            None => NativeTypes::new(),
        };
        natives.extend(self.native.iter().cloned());
        Ok(natives)
    }

    fn load(&self) -> Result<Model, NifError> {
        let natives = self.natives()?;
        debug!("Loading {} with {} native types", self.input.display(), natives.len());
        load_file(&self.input, &natives)
    }
}

fn load_plain(input: &Path) -> Result<Model, NifError> {
    load_file(input, &NativeTypes::new())
}

fn main() -> Result<(), NifError> {
    let cli = Cli::parse();

    let level = if cli.verbose { tracing::Level::DEBUG } else { tracing::Level::WARN };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .init();

    match &cli.command {
        Commands::Check { schema } => {
            let model = schema.load()?;
            println!("{}: schema version {}", schema.input.display(), model.schema_version());
            println!("  {} versions", model.versions().len());
            println!("  {} basics", model.basics().len());
            println!("  {} enums", model.enums().len());
            println!("  {} bitflags", model.flags().len());
            println!("  {} structs", model.structs().len());
            println!("  {} blocks", model.blocks().len());
            Ok(())
        }

        Commands::Dump { schema, output } => {
            let model = schema.load()?;
            let json = model_to_json(&model)?;
            if let Some(out_path) = output {
                fs::write(out_path, &json)?;
                println!("Model written to {}", out_path.display());
            } else {
                println!("{}", json);
            }
            Ok(())
        }

        Commands::Eval { expr, bind, input, block } => {
            let expr = Expr::parse(expr)?;
            let fields: HashMap<String, i64> = bind.iter().cloned().collect();
            let value = match (input, block) {
                (Some(input), Some(block)) => {
                    let model = load_plain(input)?;
                    expr.evaluate(&model.context_for(block, &fields))?
                }
                _ => expr.evaluate(&fields)?,
            };
            match value {
                Some(v) => println!("{}", v),
                None => println!("(empty)"),
            }
            Ok(())
        }

        Commands::Render { expr, prefix, no_brackets, member_names, input } => {
            let expr = Expr::parse(expr)?;
            let hook = |name: &str| member_name(name);
            let name_hook: Option<&dyn Fn(&str) -> String> = if *member_names { Some(&hook) } else { None };
            let rendered = match input {
                Some(input) => load_plain(input)?.render(&expr, prefix, !no_brackets, name_hook),
                None => expr.render(&brine_nifxml::RenderOptions {
                    prefix,
                    brackets: !no_brackets,
                    name_hook,
                    is_type: None,
                }),
            };
            println!("{}", rendered);
            Ok(())
        }
    }
}
