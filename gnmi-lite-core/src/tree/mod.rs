//! Generic configuration tree
//!
//! Write transactions work on an encoded copy of the configuration held as a
//! JSON object. Containers are objects, keyed lists are non-empty arrays of
//! objects, leaves are scalars. The typed layer validates the result at
//! commit.

mod mutate;
mod navigate;
mod prune;

pub use mutate::{assign_child, replace_root};
pub use navigate::{
    coerce_key_value, delete_keyed_list_entry, format_key_value, key_kind, keyed_list_lookup,
    resolve_child, Child,
};
pub use prune::{prune, TreeFilter, DATA_TYPE_CONTAINERS};

/// Top-level fields of a generic tree.
pub type Tree = serde_json::Map<String, serde_json::Value>;
