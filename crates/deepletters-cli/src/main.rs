use std::io;

use deepletters_cli::cli;
use deepletters_cli::client::ApiClient;
use deepletters_cli::letters;

fn main() {
    let mut deps = cli::Deps {
        stdin: Box::new(io::stdin()),
        stdout: Box::new(io::stdout()),
        stderr: Box::new(io::stderr()),
        is_tty: Box::new(|| is_terminal::is_terminal(io::stdin())),
        is_stdout_tty: Box::new(|| is_terminal::is_terminal(io::stdout())),
        getenv: Box::new(|key: &str| std::env::var(key).ok()),
        rand_bytes: Box::new(|buf: &mut [u8]| {
            use ring::rand::{SecureRandom, SystemRandom};
            let rng = SystemRandom::new();
            rng.fill(buf)
                .map_err(|_| letters::LetterError::RngError("SystemRandom failed".into()))
        }),
        make_api: Box::new(|base_url: &str| {
            Box::new(ApiClient {
                base_url: base_url.to_string(),
            }) as Box<dyn letters::KeyWrapper>
        }),
        now: Box::new(chrono::Utc::now),
    };

    let args: Vec<String> = std::env::args().collect();
    let code = cli::run(&args, &mut deps);
    std::process::exit(code);
}
