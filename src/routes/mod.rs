//! Router builders. Each returns a `Router` with its state attached so `ModelApp` can merge them.

pub mod common;
pub mod docs;
pub mod service;

pub use common::common_routes;
pub use docs::docs_routes;
pub use service::service_routes;

/// `path` and, when it ends with a slash, the same path without it.
pub fn path_variants(path: &str) -> Vec<String> {
    let mut variants = vec![path.to_string()];
    let trimmed = path.trim_end_matches('/');
    if !trimmed.is_empty() && trimmed != path {
        variants.push(trimmed.to_string());
    }
    variants
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variants() {
        assert_eq!(path_variants("/a/b/"), vec!["/a/b/", "/a/b"]);
        assert_eq!(path_variants("/a/b"), vec!["/a/b"]);
        assert_eq!(path_variants("/"), vec!["/"]);
    }
}
