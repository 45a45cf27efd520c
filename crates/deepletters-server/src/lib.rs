pub mod config;
pub mod http;
pub mod runtime;

#[cfg(test)]
mod test_env;
