use std::io::{Read, Write};

use chrono::{DateTime, Utc};

use crate::color::{color_func, ARG, CMD, HEADING, OPT};
use crate::keygen::run_keygen;
use crate::letters::{KeyWrapper, LetterError};
use crate::open::run_open;
use crate::seal::run_seal;
use crate::wrap::{run_unwrap, run_wrap};

pub const DEFAULT_BASE_URL: &str = "https://deepletters.com";
const VERSION: &str = env!("CARGO_PKG_VERSION");

pub type GetenvFn = Box<dyn Fn(&str) -> Option<String>>;
pub type RandBytesFn = Box<dyn Fn(&mut [u8]) -> Result<(), LetterError>>;
pub type MakeApiFn = Box<dyn Fn(&str) -> Box<dyn KeyWrapper>>;
pub type NowFn = Box<dyn Fn() -> DateTime<Utc>>;

/// Injectable dependencies for testing.
pub struct Deps {
    pub stdin: Box<dyn Read>,
    pub stdout: Box<dyn Write>,
    pub stderr: Box<dyn Write>,
    pub is_tty: Box<dyn Fn() -> bool>,
    pub is_stdout_tty: Box<dyn Fn() -> bool>,
    pub getenv: GetenvFn,
    pub rand_bytes: RandBytesFn,
    pub make_api: MakeApiFn,
    pub now: NowFn,
}

/// Parsed global and command-specific flags.
#[derive(Default)]
pub struct ParsedArgs {
    pub args: Vec<String>,

    // Global
    pub base_url: String,
    pub wrap_url: String,
    pub json: bool,
    pub silent: bool,

    // Seal
    pub text: String,
    pub file: String,
    pub sender: String,
    pub audio_url: String,
    pub music_url: String,
    pub volume: String,
    pub theme: String,
    pub out: String,
    pub share_code: String,

    // Open
    pub key: String,

    // Keygen
    pub standard: bool,
}

#[derive(Debug)]
pub enum CliError {
    ShowHelp,
    Error(String),
}

/// Main entry point. Returns exit code.
pub fn run(args: &[String], deps: &mut Deps) -> i32 {
    if args.len() < 2 {
        print_usage(deps);
        return 2;
    }

    match args[1].as_str() {
        "--version" | "-v" => {
            let _ = writeln!(deps.stdout, "deepletters {}", VERSION);
            return 0;
        }
        "--help" | "-h" => {
            print_help(deps);
            return 0;
        }
        _ => {}
    }

    let command = &args[1];
    let remaining = &args[2..];

    match command.as_str() {
        "version" => {
            let _ = writeln!(deps.stdout, "deepletters {}", VERSION);
            0
        }
        "help" => run_help(remaining, deps),
        "keygen" => run_keygen(remaining, deps),
        "seal" => run_seal(remaining, deps),
        "open" => run_open(remaining, deps),
        "wrap" => run_wrap(remaining, deps),
        "unwrap" => run_unwrap(remaining, deps),
        _ => {
            let _ = writeln!(deps.stderr, "error: unknown command {:?}", command);
            print_usage(deps);
            2
        }
    }
}

fn run_help(args: &[String], deps: &mut Deps) -> i32 {
    if args.is_empty() {
        print_help(deps);
        return 0;
    }
    match args[0].as_str() {
        "keygen" => print_keygen_help(deps),
        "seal" => print_seal_help(deps),
        "open" => print_open_help(deps),
        "wrap" | "unwrap" => print_wrap_help(deps),
        _ => {
            let _ = writeln!(deps.stderr, "error: unknown command {:?}", args[0]);
            return 2;
        }
    }
    0
}

fn take_value(args: &[String], i: &mut usize, flag: &str) -> Result<String, CliError> {
    *i += 1;
    if *i >= args.len() {
        return Err(CliError::Error(format!("{} requires a value", flag)));
    }
    Ok(args[*i].clone())
}

/// Parse command-specific flags from args.
pub fn parse_flags(args: &[String]) -> Result<ParsedArgs, CliError> {
    let mut pa = ParsedArgs::default();
    let mut positional = Vec::new();

    let mut i = 0;
    while i < args.len() {
        let arg = &args[i];
        if !arg.starts_with('-') || arg == "-" {
            positional.push(arg.clone());
            i += 1;
            continue;
        }

        match arg.as_str() {
            "--help" | "-h" => return Err(CliError::ShowHelp),
            "--json" => pa.json = true,
            "--silent" | "-s" => pa.silent = true,
            "--standard" => pa.standard = true,
            "--base-url" => pa.base_url = take_value(args, &mut i, arg)?,
            "--wrap-url" => pa.wrap_url = take_value(args, &mut i, arg)?,
            "--text" => pa.text = take_value(args, &mut i, arg)?,
            "--file" => pa.file = take_value(args, &mut i, arg)?,
            "--sender" => pa.sender = take_value(args, &mut i, arg)?,
            "--audio-url" => pa.audio_url = take_value(args, &mut i, arg)?,
            "--music-url" => pa.music_url = take_value(args, &mut i, arg)?,
            "--volume" => pa.volume = take_value(args, &mut i, arg)?,
            "--theme" => pa.theme = take_value(args, &mut i, arg)?,
            "--out" | "-o" => pa.out = take_value(args, &mut i, arg)?,
            "--share-code" => pa.share_code = take_value(args, &mut i, arg)?,
            "--key" => pa.key = take_value(args, &mut i, arg)?,
            _ => return Err(CliError::Error(format!("unknown flag: {}", arg))),
        }
        i += 1;
    }

    pa.args = positional;
    Ok(pa)
}

/// Fill in defaults from env vars.
pub fn resolve_globals(pa: &mut ParsedArgs, deps: &Deps) {
    if pa.base_url.is_empty() {
        if let Some(env) = (deps.getenv)("DEEPLETTERS_BASE_URL") {
            pa.base_url = env;
        } else {
            pa.base_url = DEFAULT_BASE_URL.into();
        }
    }
    if pa.wrap_url.is_empty() {
        pa.wrap_url = (deps.getenv)("DEEPLETTERS_WRAP_URL")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| pa.base_url.clone());
    }
    pa.base_url = pa.base_url.trim_end_matches('/').to_string();
    pa.wrap_url = pa.wrap_url.trim_end_matches('/').to_string();
}

/// Write an error message to the writer, in JSON or plain format.
pub fn write_error(w: &mut dyn Write, json_mode: bool, msg: &str) {
    if json_mode {
        let _ = writeln!(w, "{}", serde_json::json!({ "error": msg }));
    } else {
        let _ = writeln!(w, "error: {}", msg);
    }
}

/// Parse flags for a subcommand, printing help or a usage error as needed.
/// `Err` carries the exit code to return.
pub fn parse_command(
    args: &[String],
    deps: &mut Deps,
    help: fn(&mut Deps),
) -> Result<ParsedArgs, i32> {
    let mut pa = match parse_flags(args) {
        Ok(pa) => pa,
        Err(CliError::ShowHelp) => {
            help(deps);
            return Err(0);
        }
        Err(CliError::Error(e)) => {
            write_error(&mut deps.stderr, false, &e);
            return Err(2);
        }
    };
    resolve_globals(&mut pa, deps);
    Ok(pa)
}

// --- Help text ---

fn print_usage(deps: &mut Deps) {
    let c = color_func((deps.is_stdout_tty)());
    let _ = write!(
        deps.stderr,
        "{}: end-to-end encrypted letters\n\nRun '{}' for usage.\n",
        c(CMD, "deepletters"),
        c(CMD, "deepletters help")
    );
}

pub fn print_help(deps: &mut Deps) {
    let c = color_func((deps.is_stdout_tty)());
    let _ = write!(
        deps.stderr,
        "{}: end-to-end encrypted letters\n\n\
{}\n  {} {} {}\n\n\
{}\n\
  {}       Generate a content key\n\
  {}         Encrypt a letter into a share link or a .dpl file\n\
  {}         Decrypt a letter from a share link or a .dpl file\n\
  {}         Wrap a content key with the server master key\n\
  {}       Unwrap a wrapped content key\n\
  {}      Show version\n\
  {}         Show this help\n\n\
{}\n\
  {} {}     Public site URL (default: {})\n\
  {} {}     Key service URL (default: base URL)\n\
  {}               Output as JSON\n\
  {}           Show help\n\
  {}        Show version\n\n\
{}\n\
  {} {} {} \"Hello\" {} Ann {} envelope.bin\n\
  {} {} {} 20250101120000_A_Letter_from_Ann.dpl\n",
        c(CMD, "deepletters"),
        c(HEADING, "USAGE"),
        c(CMD, "deepletters"),
        c(CMD, "<command>"),
        c(ARG, "[options]"),
        c(HEADING, "COMMANDS"),
        c(CMD, "keygen"),
        c(CMD, "seal"),
        c(CMD, "open"),
        c(CMD, "wrap"),
        c(CMD, "unwrap"),
        c(CMD, "version"),
        c(CMD, "help"),
        c(HEADING, "GLOBAL OPTIONS"),
        c(OPT, "--base-url"),
        c(ARG, "<url>"),
        DEFAULT_BASE_URL,
        c(OPT, "--wrap-url"),
        c(ARG, "<url>"),
        c(OPT, "--json"),
        c(OPT, "-h, --help"),
        c(OPT, "-v, --version"),
        c(HEADING, "EXAMPLES"),
        c(CMD, "deepletters"),
        c(CMD, "seal"),
        c(OPT, "--text"),
        c(OPT, "--sender"),
        c(OPT, "--out"),
        c(CMD, "deepletters"),
        c(CMD, "open"),
        c(OPT, "--file"),
    );
}

pub fn print_keygen_help(deps: &mut Deps) {
    let c = color_func((deps.is_stdout_tty)());
    let _ = write!(
        deps.stderr,
        "{} {}: Generate a content key\n\n\
{}\n  {} {} {}\n\n\
{}\n\
  {}           Use the standard base64 alphabet (default: URL-safe)\n\
  {}               Output as JSON\n\
  {}           Show help\n",
        c(CMD, "deepletters"),
        c(CMD, "keygen"),
        c(HEADING, "USAGE"),
        c(CMD, "deepletters"),
        c(CMD, "keygen"),
        c(ARG, "[options]"),
        c(HEADING, "OPTIONS"),
        c(OPT, "--standard"),
        c(OPT, "--json"),
        c(OPT, "-h, --help"),
    );
}

pub fn print_seal_help(deps: &mut Deps) {
    let c = color_func((deps.is_stdout_tty)());
    let _ = write!(
        deps.stderr,
        "{} {}: Encrypt a letter\n\n\
{}\n  {} {} {}\n\n\
{}\n\
  {} {}      Letter text (visible in shell history)\n\
  {} {}       Read letter text from file\n\
  {} {}     Sender name (default: Anonymous)\n\
  {} {}   Voice message data URL\n\
  {} {}   Background music URL\n\
  {} {}     Music volume between 0 and 1 (default: 0.5)\n\
  {} {}   light or dark\n\
  {} {}        Write the envelope here; a .dpl path or a directory\n\
                      produces a download file with a wrapped key\n\
  {} {}  Share code for the link (default: random)\n\
  {} {}     Public site URL\n\
  {} {}     Key service URL\n\
  {}         Suppress the confirmation line\n\
  {}               Output as JSON\n\
  {}           Show help\n\n\
{}\n\
  Reads the letter text from stdin by default. Use {} or {} for alternatives.\n\
  Without a .dpl output the envelope is written to {} (or printed as\n\
  base64) and the share link carries the key.\n\n\
{}\n\
  echo \"Hello\" | {} {} {} Ann\n\
  {} {} {} \"Hello\" {} letters/\n",
        c(CMD, "deepletters"),
        c(CMD, "seal"),
        c(HEADING, "USAGE"),
        c(CMD, "deepletters"),
        c(CMD, "seal"),
        c(ARG, "[options]"),
        c(HEADING, "OPTIONS"),
        c(OPT, "--text"),
        c(ARG, "<value>"),
        c(OPT, "--file"),
        c(ARG, "<path>"),
        c(OPT, "--sender"),
        c(ARG, "<name>"),
        c(OPT, "--audio-url"),
        c(ARG, "<url>"),
        c(OPT, "--music-url"),
        c(ARG, "<url>"),
        c(OPT, "--volume"),
        c(ARG, "<0-1>"),
        c(OPT, "--theme"),
        c(ARG, "<name>"),
        c(OPT, "--out"),
        c(ARG, "<path>"),
        c(OPT, "--share-code"),
        c(ARG, "<code>"),
        c(OPT, "--base-url"),
        c(ARG, "<url>"),
        c(OPT, "--wrap-url"),
        c(ARG, "<url>"),
        c(OPT, "-s, --silent"),
        c(OPT, "--json"),
        c(OPT, "-h, --help"),
        c(HEADING, "INPUT"),
        c(OPT, "--text"),
        c(OPT, "--file"),
        c(OPT, "--out"),
        c(HEADING, "EXAMPLES"),
        c(CMD, "deepletters"),
        c(CMD, "seal"),
        c(OPT, "--sender"),
        c(CMD, "deepletters"),
        c(CMD, "seal"),
        c(OPT, "--text"),
        c(OPT, "--out"),
    );
}

pub fn print_open_help(deps: &mut Deps) {
    let c = color_func((deps.is_stdout_tty)());
    let _ = write!(
        deps.stderr,
        "{} {}: Decrypt a letter\n\n\
{}\n  {} {} {} {}\n\
  {} {} {} {} {} {}\n\
  {} {} {} {}\n\n\
{}\n\
  {} {}        Content key (with an envelope file)\n\
  {} {}       Envelope file, or a .dpl download file\n\
  {} {}     Key service URL (for .dpl files without --key)\n\
  {}         Print only the letter text\n\
  {}               Output as JSON\n\
  {}           Show help\n\n\
{}\n\
  With a share link and no {}, the base64 envelope is read from stdin.\n",
        c(CMD, "deepletters"),
        c(CMD, "open"),
        c(HEADING, "USAGE"),
        c(CMD, "deepletters"),
        c(CMD, "open"),
        c(ARG, "<share-link>"),
        c(ARG, "[--file <envelope>]"),
        c(CMD, "deepletters"),
        c(CMD, "open"),
        c(OPT, "--key"),
        c(ARG, "<key>"),
        c(OPT, "--file"),
        c(ARG, "<envelope>"),
        c(CMD, "deepletters"),
        c(CMD, "open"),
        c(OPT, "--file"),
        c(ARG, "<letter.dpl>"),
        c(HEADING, "OPTIONS"),
        c(OPT, "--key"),
        c(ARG, "<key>"),
        c(OPT, "--file"),
        c(ARG, "<path>"),
        c(OPT, "--wrap-url"),
        c(ARG, "<url>"),
        c(OPT, "-s, --silent"),
        c(OPT, "--json"),
        c(OPT, "-h, --help"),
        c(HEADING, "INPUT"),
        c(OPT, "--file"),
    );
}

pub fn print_wrap_help(deps: &mut Deps) {
    let c = color_func((deps.is_stdout_tty)());
    let _ = write!(
        deps.stderr,
        "{} {} / {}: Wrap or unwrap a content key through the key service\n\n\
{}\n  {} {} {}\n  {} {} {}\n\n\
{}\n\
  {} {}     Key service URL\n\
  {}               Output as JSON\n\
  {}           Show help\n",
        c(CMD, "deepletters"),
        c(CMD, "wrap"),
        c(CMD, "unwrap"),
        c(HEADING, "USAGE"),
        c(CMD, "deepletters"),
        c(CMD, "wrap"),
        c(ARG, "<key>"),
        c(CMD, "deepletters"),
        c(CMD, "unwrap"),
        c(ARG, "<wrapped-key>"),
        c(HEADING, "OPTIONS"),
        c(OPT, "--wrap-url"),
        c(ARG, "<url>"),
        c(OPT, "--json"),
        c(OPT, "-h, --help"),
    );
}
