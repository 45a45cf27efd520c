//! ANSI styling for terminal output.

pub const CMD: &str = "36";
pub const OPT: &str = "33";
pub const HEADING: &str = "1";
pub const ARG: &str = "2";
pub const DIM: &str = "2";
pub const SUCCESS: &str = "32";
pub const URL: &str = "4";
pub const LABEL: &str = "1";

pub type ColorFn = Box<dyn Fn(&str, &str) -> String>;

/// Returns a styling function that wraps text in the given SGR code when
/// enabled, and passes it through unchanged otherwise.
pub fn color_func(enabled: bool) -> ColorFn {
    if enabled {
        Box::new(|code: &str, text: &str| format!("\x1b[{}m{}\x1b[0m", code, text))
    } else {
        Box::new(|_: &str, text: &str| text.to_string())
    }
}
