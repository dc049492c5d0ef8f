#![allow(dead_code)]

#[allow(unused_imports)]
pub use unitjob_test_utils::{init_tracing, with_timeout};

/// `vec!["a", "b"]` → `vec!["a".to_string(), "b".to_string()]`.
pub fn argv(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
