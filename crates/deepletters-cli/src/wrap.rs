use std::io::Write;

use crate::cli::{parse_command, print_wrap_help, write_error, Deps, ParsedArgs};

fn single_argument(pa: &ParsedArgs, deps: &mut Deps, what: &str) -> Option<String> {
    match pa.args.as_slice() {
        [one] => Some(one.trim().to_string()),
        [] => {
            write_error(&mut deps.stderr, pa.json, &format!("{} is required", what));
            None
        }
        _ => {
            write_error(
                &mut deps.stderr,
                pa.json,
                &format!("expected exactly one {}", what),
            );
            None
        }
    }
}

pub fn run_wrap(args: &[String], deps: &mut Deps) -> i32 {
    let pa = match parse_command(args, deps, print_wrap_help) {
        Ok(pa) => pa,
        Err(code) => return code,
    };
    let Some(key) = single_argument(&pa, deps, "content key") else {
        return 2;
    };

    let client = (deps.make_api)(&pa.wrap_url);
    match client.wrap(&key) {
        Ok(wrapped) => {
            if pa.json {
                let _ = writeln!(
                    deps.stdout,
                    "{}",
                    serde_json::json!({ "wrappedKey": wrapped })
                );
            } else {
                let _ = writeln!(deps.stdout, "{}", wrapped);
            }
            0
        }
        Err(e) => {
            write_error(&mut deps.stderr, pa.json, &format!("wrap failed: {}", e));
            1
        }
    }
}

pub fn run_unwrap(args: &[String], deps: &mut Deps) -> i32 {
    let pa = match parse_command(args, deps, print_wrap_help) {
        Ok(pa) => pa,
        Err(code) => return code,
    };
    let Some(wrapped) = single_argument(&pa, deps, "wrapped key") else {
        return 2;
    };

    let client = (deps.make_api)(&pa.wrap_url);
    match client.unwrap(&wrapped) {
        Ok(key) => {
            if pa.json {
                let _ = writeln!(deps.stdout, "{}", serde_json::json!({ "key": key }));
            } else {
                let _ = writeln!(deps.stdout, "{}", key);
            }
            0
        }
        Err(e) => {
            write_error(&mut deps.stderr, pa.json, &format!("unwrap failed: {}", e));
            1
        }
    }
}
