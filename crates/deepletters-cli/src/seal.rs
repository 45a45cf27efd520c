use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::cli::{parse_command, print_seal_help, write_error, Deps, ParsedArgs};
use crate::color::{color_func, DIM, SUCCESS};
use crate::letters::{
    download_filename, expires_at, format_share_link, generate_share_code_with, has_dpl_extension,
    package_download, seal_letter_with, LetterPlaintext, Theme, DEFAULT_MUSIC_VOLUME,
};

/// Read the letter text from exactly one source.
fn read_content(pa: &ParsedArgs, deps: &mut Deps) -> Result<String, String> {
    if !pa.args.is_empty() {
        return Err(format!("unexpected argument: {}", pa.args[0]));
    }
    if !pa.text.is_empty() && !pa.file.is_empty() {
        return Err("specify only one of --text or --file".into());
    }

    let content = if !pa.text.is_empty() {
        pa.text.clone()
    } else if !pa.file.is_empty() {
        fs::read_to_string(&pa.file).map_err(|e| format!("read {}: {}", pa.file, e))?
    } else {
        if (deps.is_tty)() {
            let _ = writeln!(deps.stderr, "Write your letter, then press Ctrl-D:");
            let _ = deps.stderr.flush();
        }
        let mut buf = String::new();
        deps.stdin
            .read_to_string(&mut buf)
            .map_err(|e| format!("read stdin: {}", e))?;
        buf.trim_end_matches(['\n', '\r']).to_string()
    };

    if content.trim().is_empty() {
        return Err("letter text is empty".into());
    }
    Ok(content)
}

fn parse_volume(raw: &str) -> Result<f64, String> {
    if raw.is_empty() {
        return Ok(DEFAULT_MUSIC_VOLUME);
    }
    match raw.trim().parse::<f64>() {
        Ok(v) if (0.0..=1.0).contains(&v) => Ok(v),
        _ => Err(format!("--volume must be a number between 0 and 1, got {:?}", raw)),
    }
}

fn parse_theme(raw: &str) -> Result<Option<Theme>, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "" => Ok(None),
        "light" => Ok(Some(Theme::Light)),
        "dark" => Ok(Some(Theme::Dark)),
        _ => Err(format!("--theme must be light or dark, got {:?}", raw)),
    }
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

fn build_letter(pa: &ParsedArgs, content: String) -> Result<LetterPlaintext, String> {
    Ok(LetterPlaintext {
        content,
        sender_name: pa.sender.trim().to_string(),
        audio_data_url: non_empty(&pa.audio_url),
        music_url: non_empty(&pa.music_url),
        music_volume: parse_volume(&pa.volume)?,
        theme: parse_theme(&pa.theme)?,
    })
}

fn valid_share_code(code: &str) -> bool {
    !code.is_empty()
        && code
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// A `.dpl` path or an existing directory means a download file.
fn download_target(out: &str) -> Option<(PathBuf, bool)> {
    if out.is_empty() {
        return None;
    }
    let path = Path::new(out);
    if path.is_dir() {
        Some((path.to_path_buf(), true))
    } else if has_dpl_extension(path) {
        Some((path.to_path_buf(), false))
    } else {
        None
    }
}

pub fn run_seal(args: &[String], deps: &mut Deps) -> i32 {
    let pa = match parse_command(args, deps, print_seal_help) {
        Ok(pa) => pa,
        Err(code) => return code,
    };

    let content = match read_content(&pa, deps) {
        Ok(c) => c,
        Err(e) => {
            write_error(&mut deps.stderr, pa.json, &e);
            return 2;
        }
    };
    let letter = match build_letter(&pa, content) {
        Ok(l) => l,
        Err(e) => {
            write_error(&mut deps.stderr, pa.json, &e);
            return 2;
        }
    };
    if !pa.share_code.is_empty() && !valid_share_code(&pa.share_code) {
        write_error(
            &mut deps.stderr,
            pa.json,
            "--share-code may only contain letters, digits, '-' and '_'",
        );
        return 2;
    }

    let sealed = match seal_letter_with(&letter, &*deps.rand_bytes) {
        Ok(s) => s,
        Err(e) => {
            write_error(
                &mut deps.stderr,
                pa.json,
                &format!("encryption failed: {}", e),
            );
            return 1;
        }
    };

    let now = (deps.now)();
    let is_tty = (deps.is_tty)();

    if let Some((target, is_dir)) = download_target(&pa.out) {
        let client = (deps.make_api)(&pa.wrap_url);
        let file = match package_download(&sealed, &*client) {
            Ok(f) => f,
            Err(e) => {
                write_error(&mut deps.stderr, pa.json, &format!("wrap failed: {}", e));
                return 1;
            }
        };
        let path = if is_dir {
            target.join(download_filename(now, letter.display_sender()))
        } else {
            target
        };
        if let Err(e) = fs::write(&path, &file) {
            write_error(
                &mut deps.stderr,
                pa.json,
                &format!("write {}: {}", path.display(), e),
            );
            return 1;
        }

        if pa.json {
            let _ = writeln!(
                deps.stdout,
                "{}",
                serde_json::json!({
                    "file": path.display().to_string(),
                    "bytes": file.len(),
                })
            );
        } else {
            if is_tty && !pa.silent {
                let c = color_func(true);
                let _ = writeln!(
                    deps.stderr,
                    "{} Letter sealed with a wrapped key.",
                    c(SUCCESS, "\u{2713}")
                );
            }
            let _ = writeln!(deps.stdout, "{}", path.display());
        }
        return 0;
    }

    let share_code = if pa.share_code.is_empty() {
        match generate_share_code_with(&*deps.rand_bytes) {
            Ok(code) => code,
            Err(e) => {
                write_error(&mut deps.stderr, pa.json, &e.to_string());
                return 1;
            }
        }
    } else {
        pa.share_code.clone()
    };
    let link = format_share_link(&pa.base_url, &share_code, &sealed.key);
    let expires = expires_at(now).to_rfc3339();

    if !pa.out.is_empty() {
        if let Err(e) = fs::write(&pa.out, &sealed.envelope) {
            write_error(
                &mut deps.stderr,
                pa.json,
                &format!("write {}: {}", pa.out, e),
            );
            return 1;
        }
    }

    if pa.json {
        let mut out = serde_json::json!({
            "shareCode": share_code,
            "shareLink": link,
            "expiresAt": expires,
        });
        if pa.out.is_empty() {
            out["envelope"] = serde_json::Value::String(STANDARD.encode(&sealed.envelope));
        } else {
            out["file"] = serde_json::Value::String(pa.out.clone());
        }
        let _ = writeln!(deps.stdout, "{}", out);
        return 0;
    }

    if is_tty && !pa.silent {
        let c = color_func(true);
        let _ = writeln!(
            deps.stderr,
            "{} Letter sealed.  {}",
            c(SUCCESS, "\u{2713}"),
            c(DIM, &format!("(expires {})", expires))
        );
    }
    let _ = writeln!(deps.stdout, "{}", link);
    if pa.out.is_empty() {
        let _ = writeln!(deps.stdout, "{}", STANDARD.encode(&sealed.envelope));
    }
    0
}
