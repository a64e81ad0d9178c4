use crate::cli::SelectArgs;
use crate::exit_codes;
use crate::output;
use bids_catalog::{Catalog, Criteria, EntityRecord, Result, Scanner};

pub fn execute(args: SelectArgs, config_path: Option<&str>) -> i32 {
    let config = match super::load_config(config_path) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return exit_codes::INPUT_ERROR;
        }
    };

    let catalog = match Scanner::new(config).scan_query(&args.root, &EntityRecord::new()) {
        Ok(c) => c,
        Err(e) => return super::report(&e),
    };
    if !catalog.errors().is_empty() {
        log::info!(
            "{} file(s) under {} were rejected and cannot be selected",
            catalog.errors().len(),
            catalog.root().display()
        );
    }

    let selection = match apply(&catalog, &args) {
        Ok(s) => s,
        Err(e) => return super::report(&e),
    };
    if selection.is_empty() {
        log::warn!("No file matches the selection");
    }

    let written = if args.json {
        output::emit_json(&selection.valid(), args.compact, args.output.as_deref())
    } else {
        let paths: Vec<String> = selection
            .paths()
            .iter()
            .map(|p| p.display().to_string())
            .collect();
        if paths.is_empty() && args.output.is_none() {
            Ok(())
        } else {
            output::write_output(&paths.join("\n"), args.output.as_deref())
        }
    };

    if let Err(e) = written {
        eprintln!("Error: {}", e);
        return exit_codes::EXECUTION_ERROR;
    }

    if let Some(ref path) = args.output {
        eprintln!("Wrote {} file(s) to {}", selection.len(), path);
    }
    exit_codes::SUCCESS
}

/// Repeated columns are merged, so `--where run=1 --where run=2` keeps both.
fn criteria(pairs: &[(String, String)]) -> Criteria {
    pairs.iter().fold(Criteria::new(), |criteria, (column, value)| {
        criteria.merge(Criteria::new().with(column.as_str(), value.as_str()))
    })
}

fn apply(catalog: &Catalog, args: &SelectArgs) -> Result<Catalog> {
    let selected = catalog.select(&criteria(&args.filters))?;
    if args.exclude.is_empty() {
        Ok(selected)
    } else {
        selected.remove(&criteria(&args.exclude))
    }
}
