//! Bidirectional tag index (§3 invariant 6: `tag → keys` and `key → tags`
//! are mutual inverses at all times).

use std::collections::{HashMap, HashSet};

#[derive(Default)]
pub(crate) struct TagIndex {
    tag_to_keys: HashMap<String, HashSet<String>>,
    key_to_tags: HashMap<String, HashSet<String>>,
}

impl TagIndex {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Replaces the tag set for `key`, first clearing any tags it
    /// previously held so the two maps never retain a stale entry.
    pub(crate) fn set(&mut self, key: &str, tags: &HashSet<String>) {
        self.remove_key(key);
        if tags.is_empty() {
            return;
        }
        for tag in tags {
            self.tag_to_keys
                .entry(tag.clone())
                .or_default()
                .insert(key.to_string());
        }
        self.key_to_tags.insert(key.to_string(), tags.clone());
    }

    pub(crate) fn remove_key(&mut self, key: &str) {
        if let Some(tags) = self.key_to_tags.remove(key) {
            for tag in tags {
                if let Some(keys) = self.tag_to_keys.get_mut(&tag) {
                    keys.remove(key);
                    if keys.is_empty() {
                        self.tag_to_keys.remove(&tag);
                    }
                }
            }
        }
    }

    /// Keys tagged with `tag`, copied out so the caller can iterate and
    /// remove without mutating the index mid-iteration (§9 Open Question:
    /// copy-first, not iterate-while-mutating).
    pub(crate) fn keys_for_tag(&self, tag: &str) -> HashSet<String> {
        self.tag_to_keys.get(tag).cloned().unwrap_or_default()
    }

    pub(crate) fn keys_for_tags(&self, tags: &[String]) -> HashSet<String> {
        let mut keys = HashSet::new();
        for tag in tags {
            keys.extend(self.keys_for_tag(tag));
        }
        keys
    }

    pub(crate) fn clear(&mut self) {
        self.tag_to_keys.clear();
        self.key_to_tags.clear();
    }

    #[cfg(test)]
    pub(crate) fn tags_for_key(&self, key: &str) -> HashSet<String> {
        self.key_to_tags.get(key).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(values: &[&str]) -> HashSet<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn s6_clear_by_tag_leaves_untagged_entry_and_mutual_inverse() {
        let mut index = TagIndex::new();
        index.set("u:1", &tags(&["user", "profile"]));
        index.set("u:2", &tags(&["user"]));
        index.set("p:1", &tags(&["post"]));

        let user_keys = index.keys_for_tag("user");
        for key in &user_keys {
            index.remove_key(key);
        }

        assert!(index.keys_for_tag("user").is_empty());
        assert_eq!(index.keys_for_tag("post"), tags(&["p:1"]));
        assert_eq!(index.tags_for_key("p:1"), tags(&["post"]));
        assert!(index.tags_for_key("u:1").is_empty());
        assert!(index.tags_for_key("u:2").is_empty());
    }

    #[test]
    fn reinserting_a_key_drops_its_old_tags() {
        let mut index = TagIndex::new();
        index.set("k", &tags(&["a", "b"]));
        index.set("k", &tags(&["c"]));

        assert!(index.keys_for_tag("a").is_empty());
        assert!(index.keys_for_tag("b").is_empty());
        assert_eq!(index.keys_for_tag("c"), tags(&["k"]));
    }

    #[test]
    fn keys_for_tags_is_a_union() {
        let mut index = TagIndex::new();
        index.set("k1", &tags(&["a"]));
        index.set("k2", &tags(&["b"]));
        index.set("k3", &tags(&["c"]));

        let union = index.keys_for_tags(&["a".to_string(), "b".to_string()]);
        assert_eq!(union, tags(&["k1", "k2"]));
    }
}
