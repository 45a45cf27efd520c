use std::fs;
use std::io::{Read, Write};

use crate::cli::{parse_command, print_open_help, write_error, Deps, ParsedArgs};
use crate::color::{color_func, LABEL, URL};
use crate::letters::{
    decode_b64_any, has_dpl_extension, open_download, open_letter, open_with_key,
    parse_share_link, LetterError, LetterPlaintext,
};

enum Source {
    ShareLink(String),
    KeyAndEnvelope,
    Download,
}

fn select_source(pa: &ParsedArgs) -> Result<Source, String> {
    match pa.args.as_slice() {
        [link] => {
            if !pa.key.is_empty() {
                return Err("use either a share link or --key, not both".into());
            }
            Ok(Source::ShareLink(link.clone()))
        }
        [] if pa.file.is_empty() => Err("share link or --file is required".into()),
        // With a key, a .dpl file is read as a bare envelope.
        [] if !pa.key.is_empty() => Ok(Source::KeyAndEnvelope),
        [] if has_dpl_extension(&pa.file) => Ok(Source::Download),
        [] => Err("--key is required to open an envelope file".into()),
        _ => Err("expected a single share link".into()),
    }
}

fn read_file(path: &str) -> Result<Vec<u8>, String> {
    fs::read(path).map_err(|e| format!("read {}: {}", path, e))
}

/// Base64 envelope text piped on stdin.
fn read_stdin_envelope(deps: &mut Deps) -> Result<String, String> {
    let mut buf = String::new();
    deps.stdin
        .read_to_string(&mut buf)
        .map_err(|e| format!("read stdin: {}", e))?;
    let text = buf.trim();
    if text.is_empty() {
        return Err("envelope is required: pass --file or pipe it on stdin".into());
    }
    Ok(text.to_string())
}

fn decode_envelope_text(text: &str) -> Result<Vec<u8>, LetterError> {
    decode_b64_any(text)
        .map_err(|_| LetterError::MalformedFile("envelope is not valid base64".into()))
}

fn write_letter(deps: &mut Deps, pa: &ParsedArgs, letter: &LetterPlaintext) {
    if pa.json {
        let _ = writeln!(
            deps.stdout,
            "{}",
            serde_json::to_string(letter).unwrap_or_default()
        );
        return;
    }

    if !pa.silent {
        let c = color_func((deps.is_tty)());
        let _ = writeln!(
            deps.stderr,
            "{} {}",
            c(LABEL, "From:"),
            letter.display_sender()
        );
        if let Some(music) = &letter.music_url {
            let _ = writeln!(
                deps.stderr,
                "{} {} (volume {})",
                c(LABEL, "Music:"),
                c(URL, music),
                letter.music_volume
            );
        }
        if letter.audio_data_url.is_some() {
            let _ = writeln!(deps.stderr, "{} attached", c(LABEL, "Voice message:"));
        }
    }
    let _ = writeln!(deps.stdout, "{}", letter.content);
}

pub fn run_open(args: &[String], deps: &mut Deps) -> i32 {
    let pa = match parse_command(args, deps, print_open_help) {
        Ok(pa) => pa,
        Err(code) => return code,
    };

    let source = match select_source(&pa) {
        Ok(s) => s,
        Err(e) => {
            write_error(&mut deps.stderr, pa.json, &e);
            return 2;
        }
    };

    let opened: Result<LetterPlaintext, LetterError> = match source {
        Source::ShareLink(link) => {
            let envelope = if pa.file.is_empty() {
                read_stdin_envelope(deps).map(|text| decode_envelope_text(&text))
            } else {
                read_file(&pa.file).map(Ok)
            };
            let envelope = match envelope {
                Ok(e) => e,
                Err(e) => {
                    write_error(&mut deps.stderr, pa.json, &e);
                    return 2;
                }
            };
            envelope.and_then(|envelope| {
                parse_share_link(&link).and_then(|(_, key)| open_with_key(&envelope, &key))
            })
        }
        Source::KeyAndEnvelope => match read_file(&pa.file) {
            Ok(envelope) => open_letter(&envelope, &pa.key),
            Err(e) => {
                write_error(&mut deps.stderr, pa.json, &e);
                return 2;
            }
        },
        Source::Download => match read_file(&pa.file) {
            Ok(file) => {
                let client = (deps.make_api)(&pa.wrap_url);
                open_download(&file, &*client)
            }
            Err(e) => {
                write_error(&mut deps.stderr, pa.json, &e);
                return 2;
            }
        },
    };

    match opened {
        Ok(letter) => {
            write_letter(deps, &pa, &letter);
            0
        }
        Err(e) => {
            write_error(&mut deps.stderr, pa.json, &e.user_message());
            1
        }
    }
}
