pub mod scenario;
pub mod storage;

pub use storage::JsonPlayerStorage;

/// Split a comma-separated CLI value, dropping blanks.
pub fn split_csv(s: &str) -> Vec<String> {
    s.split(',')
        .map(|x| x.trim().to_string())
        .filter(|x| !x.is_empty())
        .collect()
}
