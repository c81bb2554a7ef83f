use crate::models::{Classification, PartitionKey};

const SUFFIX_RULES: [(&str, PartitionKey); 4] = [
    (".py", PartitionKey::PythonFiles),
    (".html", PartitionKey::HtmlFiles),
    (".css", PartitionKey::CssFiles),
    (".java", PartitionKey::JavaFiles),
];

/// Maps a file name to its partition by suffix. Total and deterministic:
/// anything without a known suffix is discarded.
pub fn classify(file_name: &str) -> Classification {
    SUFFIX_RULES
        .iter()
        .find(|(suffix, _)| file_name.ends_with(suffix))
        .map(|(_, key)| Classification::Route(*key))
        .unwrap_or(Classification::Discard)
}
