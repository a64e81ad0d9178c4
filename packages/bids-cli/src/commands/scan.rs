use crate::cli::ScanArgs;
use crate::exit_codes;
use crate::output;
use bids_catalog::{CatalogSummary, Entity, EntityRecord, ErrorRecord, Result, Scanner};
use serde::Serialize;

#[derive(Serialize)]
struct ScanOutput<'a> {
    summary: CatalogSummary,
    errors: &'a [ErrorRecord],
}

pub fn execute(args: ScanArgs, config_path: Option<&str>) -> i32 {
    let config = match super::load_config(config_path) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return exit_codes::INPUT_ERROR;
        }
    };

    let query = match build_query(&args) {
        Ok(q) => q,
        Err(e) => return super::report(&e),
    };

    let scanner = Scanner::new(config);
    let result = if args.strict {
        let pattern = bids_catalog::PathCodec::new().encode_pattern(&query);
        scanner.strict_scan(&args.root, &pattern)
    } else {
        scanner.scan_query(&args.root, &query)
    };
    let catalog = match result {
        Ok(c) => c,
        Err(e) => return super::report(&e),
    };

    let summary = catalog.summary();

    if args.json {
        let result = ScanOutput {
            summary,
            errors: catalog.errors(),
        };
        if let Err(e) = output::emit_json(&result, false, None) {
            eprintln!("Error: {}", e);
            return exit_codes::EXECUTION_ERROR;
        }
    } else {
        println!("Results for {}", summary.root);
        println!("{}", summary);
        if args.errors {
            for error in catalog.errors() {
                println!("{}", error);
            }
        }
    }

    exit_codes::SUCCESS
}

/// Entity flags as a partial record.
fn build_query(args: &ScanArgs) -> Result<EntityRecord> {
    let fields = [
        (Entity::Subject, &args.subject),
        (Entity::Session, &args.session),
        (Entity::Datatype, &args.datatype),
        (Entity::Task, &args.task),
        (Entity::Run, &args.run),
        (Entity::Acquisition, &args.acquisition),
        (Entity::Description, &args.description),
        (Entity::Suffix, &args.suffix),
        (Entity::Extension, &args.extension),
    ];

    let mut query = EntityRecord::new();
    for (entity, value) in fields {
        if let Some(value) = value {
            query.set(entity, value)?;
        }
    }
    Ok(query)
}
