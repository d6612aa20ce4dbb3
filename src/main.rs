//! Path Templates CLI
//!
//! Usage:
//!   path-templates --schema <FILE> [--debug] <COMMAND>
//!
//! Commands:
//!   list                                 List templates with their definitions
//!   apply <TEMPLATE> [KEY=VALUE]...      Render a path or string from fields
//!   fields <TEMPLATE> <INPUT>            Extract fields from a path or string
//!   validate <TEMPLATE> <INPUT>          Exit 0 if the input matches the template

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing::Level;

use path_templates::{
    ApplyOptions, Fields, Platform, Schema, Template, TemplateError, TemplateSet,
};

#[derive(Parser)]
#[command(name = "path-templates")]
#[command(about = "Render and parse paths with typed key templates")]
struct Cli {
    /// Schema file declaring roots, keys and templates (TOML format)
    #[arg(short, long)]
    schema: PathBuf,

    /// Debug mode: log variation selection and parse decisions to stderr
    #[arg(short, long)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List every template with its kind and definition
    List,

    /// Render a template from KEY=VALUE pairs
    Apply {
        template: String,

        /// Field values, converted by each key's type
        #[arg(value_name = "KEY=VALUE")]
        fields: Vec<String>,

        /// Render a path for another platform (linux, mac, windows)
        #[arg(short, long, value_parser = parse_platform)]
        platform: Option<Platform>,

        /// Require values for keys that have defaults
        #[arg(long)]
        require_defaults: bool,
    },

    /// Print the fields recovered from an input, one KEY=VALUE per line
    Fields {
        template: String,
        input: String,

        /// Match a key positionally without validating or reporting it
        #[arg(long = "skip", value_name = "KEY")]
        skip: Vec<String>,
    },

    /// Exit with status 0 if the input matches the template, 1 otherwise
    Validate { template: String, input: String },
}

fn parse_platform(s: &str) -> Result<Platform, String> {
    s.parse()
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.debug { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let schema = match Schema::from_file(&cli.schema) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error loading schema '{}': {}", cli.schema.display(), e);
            process::exit(1);
        }
    };

    let set = match TemplateSet::from_schema(&schema) {
        Ok(set) => set,
        Err(e) => fail(&e),
    };

    match cli.command {
        Command::List => {
            for template in set.templates() {
                let kind = if template.is_path() { "path" } else { "string" };
                println!("{}\t{}\t{}", template.name(), kind, template.definition());
            }
        }
        Command::Apply {
            template,
            fields,
            platform,
            require_defaults,
        } => {
            let template = lookup(&set, &template);
            let fields = match parse_assignments(template, &fields) {
                Ok(fields) => fields,
                Err(e) => fail(&e),
            };
            let mut options = ApplyOptions::new().with_skip_defaults(!require_defaults);
            if let Some(platform) = platform {
                options = options.with_platform(platform);
            }
            match template.apply_fields_with(&fields, &options) {
                Ok(rendered) => println!("{}", rendered),
                Err(e) => fail(&e),
            }
        }
        Command::Fields {
            template,
            input,
            skip,
        } => {
            let template = lookup(&set, &template);
            let skip: Vec<&str> = skip.iter().map(String::as_str).collect();
            match template.get_fields(&input, &skip) {
                Ok(fields) => {
                    let mut pairs: Vec<_> = fields.into_iter().collect();
                    pairs.sort_by(|a, b| a.0.cmp(&b.0));
                    for (name, value) in pairs {
                        println!("{}={}", name, value);
                    }
                }
                Err(e) => fail(&e),
            }
        }
        Command::Validate { template, input } => {
            let template = lookup(&set, &template);
            if !template.validate(&input, None, &[]) {
                process::exit(1);
            }
        }
    }
}

fn lookup<'a>(set: &'a TemplateSet, name: &str) -> &'a Template {
    match set.get(name) {
        Some(template) => template,
        None => {
            eprintln!(
                "Error: unknown template '{}'. Available: {}",
                name,
                set.names().join(", ")
            );
            process::exit(1);
        }
    }
}

/// Convert `KEY=VALUE` arguments with the template's own keys
fn parse_assignments(template: &Template, assignments: &[String]) -> Result<Fields, TemplateError> {
    let mut fields = Fields::new();
    for assignment in assignments {
        let (name, raw) = assignment.split_once('=').ok_or_else(|| {
            TemplateError::configuration(format!("expected KEY=VALUE, got '{}'", assignment))
        })?;
        let key = template.keys().get(name).ok_or_else(|| {
            TemplateError::configuration(format!("{} has no key '{}'", template, name))
        })?;
        let value = key
            .value_from_str(raw)
            .map_err(|e| e.with_template(template.name()))?;
        fields.insert(name.to_string(), value);
    }
    Ok(fields)
}

fn fail(error: &TemplateError) -> ! {
    match error.report("definition") {
        Some(report) => eprint!("{}", report),
        None => eprintln!("Error: {}", error),
    }
    process::exit(1);
}
