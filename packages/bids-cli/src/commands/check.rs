use crate::cli::CheckArgs;
use crate::exit_codes;
use crate::output;
use bids_catalog::{EntityRecord, PathCodec, Validator};
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct CheckOutput {
    path: String,
    valid: bool,
    entities: Option<EntityRecord>,
    decode_error: Option<String>,
    violations: Vec<String>,
}

pub fn execute(args: CheckArgs) -> i32 {
    let path = Path::new(&args.path);

    let decoded = PathCodec::new().decode(path);
    let violations = Validator::global().violations(path);

    let result = CheckOutput {
        path: args.path.clone(),
        valid: decoded.is_ok() && violations.is_empty(),
        entities: decoded.as_ref().ok().cloned(),
        decode_error: decoded.as_ref().err().map(|e| e.to_string()),
        violations: violations.iter().map(|v| v.to_string()).collect(),
    };

    if args.json {
        if let Err(e) = output::emit_json(&result, false, None) {
            eprintln!("Error: {}", e);
            return exit_codes::EXECUTION_ERROR;
        }
    } else if result.valid {
        println!("'{}' is valid", args.path);
        if let Some(ref entities) = result.entities {
            println!("{}", entities);
        }
    } else {
        if let Some(ref err) = result.decode_error {
            eprintln!("Error: {}", err);
        }
        for (i, violation) in result.violations.iter().enumerate() {
            eprintln!("  {}. {}", i + 1, violation);
        }
    }

    if result.valid {
        exit_codes::SUCCESS
    } else {
        exit_codes::DIRTY_DATASET
    }
}
