//! Cardinality of current values.

use crate::error::EngineError;
use revkv_store::{Filter, Status, VersionStore};

/// Number of keys whose current version holds exactly `value`.
///
/// Unset versions never match, not even for an empty `value`.
pub fn count_equal<S>(store: &S, value: &str) -> Result<usize, EngineError>
where
    S: VersionStore + ?Sized,
{
    let matches = store.query(
        &[
            Filter::Value(value.to_string()),
            Filter::Status(Status::Current),
        ],
        None,
    )?;
    Ok(matches.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mutation::{set, unset};
    use revkv_store::MemoryStore;

    #[test]
    fn counts_only_current_versions() {
        let store = MemoryStore::new();
        set(&store, "a", Some("5".to_string())).expect("set");
        set(&store, "a", Some("6".to_string())).expect("set");
        set(&store, "b", Some("5".to_string())).expect("set");

        assert_eq!(count_equal(&store, "5").expect("count"), 1);
        assert_eq!(count_equal(&store, "6").expect("count"), 1);
        assert_eq!(count_equal(&store, "7").expect("count"), 0);
    }

    #[test]
    fn empty_value_does_not_count_unset_keys() {
        let store = MemoryStore::new();
        set(&store, "a", Some(String::new())).expect("set");
        set(&store, "b", Some("1".to_string())).expect("set");
        unset(&store, "b").expect("unset");

        assert_eq!(count_equal(&store, "").expect("count"), 1);
    }
}
