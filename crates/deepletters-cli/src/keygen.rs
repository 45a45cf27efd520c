use std::io::Write;

use crate::cli::{parse_command, print_keygen_help, write_error, Deps};
use crate::letters::{export_key, generate_key_with, KeyEncoding};

pub fn run_keygen(args: &[String], deps: &mut Deps) -> i32 {
    let pa = match parse_command(args, deps, print_keygen_help) {
        Ok(pa) => pa,
        Err(code) => return code,
    };

    if !pa.args.is_empty() {
        write_error(
            &mut deps.stderr,
            pa.json,
            &format!("unexpected argument: {}", pa.args[0]),
        );
        return 2;
    }

    let key = match generate_key_with(&*deps.rand_bytes) {
        Ok(k) => k,
        Err(e) => {
            write_error(&mut deps.stderr, pa.json, &e.to_string());
            return 1;
        }
    };

    let encoding = if pa.standard {
        KeyEncoding::Standard
    } else {
        KeyEncoding::UrlSafe
    };
    let text = export_key(&key, encoding);

    if pa.json {
        let _ = writeln!(deps.stdout, "{}", serde_json::json!({ "key": text }));
    } else {
        let _ = writeln!(deps.stdout, "{}", text);
    }
    0
}
