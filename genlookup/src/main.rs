//! Command-line driver for the metric lookup generator.
//!
//! Reads a definition file shaped `{"category": {"metric": {"type": ...}}}`
//! (object order is preserved and drives every id assignment), assembles the
//! lookup tables and writes the generated header.

use std::error::Error;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use clap::Parser;
use log::info;
use metriclookup::{render, CategoryDef, EmitterContext, LookupAssembler, MetricDef};
use serde::Deserialize;

#[derive(Parser, Debug)]
struct Opt {
    /// JSON file mapping category -> metric name -> definition
    definitions: PathBuf,

    /// Write the generated header here instead of stdout
    #[clap(short, long)]
    output: Option<PathBuf>,
}

/// The body of a metric definition; the metric's name is its key in the
/// enclosing object.
#[derive(Debug, Deserialize)]
struct MetricBody {
    #[serde(rename = "type")]
    metric_type: String,
}

fn load_definitions(text: &str) -> Result<Vec<CategoryDef>, Box<dyn Error + Send + Sync>> {
    let document: serde_json::Map<String, serde_json::Value> = serde_json::from_str(text)?;

    let mut categories = Vec::with_capacity(document.len());
    for (category, metrics) in document {
        let metrics: serde_json::Map<String, serde_json::Value> =
            serde_json::from_value(metrics)?;

        let mut defs = Vec::with_capacity(metrics.len());
        for (name, body) in metrics {
            let body: MetricBody = serde_json::from_value(body)?;
            defs.push(MetricDef {
                name,
                metric_type: body.metric_type,
            });
        }

        categories.push(CategoryDef {
            name: category,
            metrics: defs,
        });
    }

    Ok(categories)
}

/// Writes `contents` to a sibling temporary file and renames it over
/// `path`, so an interrupted run never leaves a truncated header at the
/// destination.
fn write_output(path: &Path, contents: &str) -> io::Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, contents)?;
    fs::rename(&tmp, path)
}

fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    env_logger::init();
    let opt = Opt::parse();

    let text = fs::read_to_string(&opt.definitions)?;
    let categories = load_definitions(&text)?;

    let bundle = LookupAssembler::new().assemble(&categories)?;
    let context = EmitterContext::from_bundle(&bundle);

    // Render completely before touching the output; a failed run must not
    // leave partial output behind.
    let header = render(&context);

    match &opt.output {
        Some(path) => {
            write_output(path, &header)?;
            info!("wrote {} bytes to {}", header.len(), path.display());
        }
        None => print!("{header}"),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn definitions_preserve_input_order() {
        let text = r#"{
            "ui": {
                "click": { "type": "event" },
                "scroll": { "type": "event" }
            },
            "perf": {
                "page_load": { "type": "timing" }
            }
        }"#;

        let categories = load_definitions(text).unwrap();

        assert_eq!(categories.len(), 2);
        assert_eq!(categories[0].name, "ui");
        assert_eq!(categories[0].metrics[0].name, "click");
        assert_eq!(categories[0].metrics[1].name, "scroll");
        assert_eq!(categories[1].name, "perf");
        assert_eq!(categories[1].metrics[0].metric_type, "timing");
    }

    #[test]
    fn output_lands_in_a_single_rename() {
        let path = std::env::temp_dir().join(format!("genlookup_out_{}.h", std::process::id()));

        write_output(&path, "// first\n").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "// first\n");

        // Overwriting an existing header also goes through the rename.
        write_output(&path, "// second\n").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "// second\n");

        // The temporary never survives a successful write.
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        assert!(!PathBuf::from(tmp).exists());

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn unknown_definition_shapes_are_rejected() {
        assert!(load_definitions(r#"{"perf": 3}"#).is_err());
        assert!(load_definitions(r#"{"perf": {"page_load": {}}}"#).is_err());
    }
}
