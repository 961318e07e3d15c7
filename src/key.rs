//! Option keys and source-specific key normalization.
//!
//! An option is addressed by a [`Key`]: an ordered path of segments such as
//! `Worker.BufferSize`. Each source spells that path differently, so every
//! provider carries a [`KeyFunc`] that flattens the path into its own
//! convention:
//!
//! | KeyFunc | `Worker.BufferSize` |
//! |---|---|
//! | [`dot_key`] | `worker.buffer_size` |
//! | [`underscore_key`] | `worker_buffer_size` |
//! | [`dash_key`] | `worker-buffer-size` |
//! | [`env_key`] with prefix `myapp` | `MYAPP_WORKER_BUFFER_SIZE` |
//!
//! CamelCase segments are split into lowercase words joined by `_`
//! (see [`snake_segment`]); [`dot_key`] keeps those underscores inside a
//! segment, [`dash_key`] turns them into dashes. The underscore and dash
//! spellings can overlap across segment boundaries (`Server.HostName` vs
//! `ServerHost.Name`), so the registry rejects schemas where that happens.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Hierarchical option key. Comparison and hashing ignore ASCII case.
#[derive(Clone, Debug, Default)]
pub struct Key(Vec<String>);

impl Key {
    /// Build a key from path segments.
    pub fn new(segments: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// Parse a dotted path such as `"Server.HostName"`. Empty segments are dropped.
    pub fn parse(path: &str) -> Self {
        Self(
            path.split('.')
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Return a new key with `prefix` prepended as the first segment.
    pub fn prefixed(&self, prefix: &str) -> Self {
        let mut segments = Vec::with_capacity(self.0.len() + 1);
        segments.push(prefix.to_string());
        segments.extend(self.0.iter().cloned());
        Self(segments)
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        self.0.len() == other.0.len()
            && self
                .0
                .iter()
                .zip(&other.0)
                .all(|(a, b)| a.eq_ignore_ascii_case(b))
    }
}

impl Eq for Key {}

impl Hash for Key {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(self.0.len());
        for segment in &self.0 {
            for b in segment.bytes() {
                state.write_u8(b.to_ascii_lowercase());
            }
            state.write_u8(0xff);
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

impl From<&str> for Key {
    fn from(path: &str) -> Self {
        Key::parse(path)
    }
}

impl From<&Key> for Key {
    fn from(key: &Key) -> Self {
        key.clone()
    }
}

/// A pure function flattening a key into a source-specific string.
pub type KeyFunc = Arc<dyn Fn(&Key) -> String + Send + Sync>;

/// Wrap a plain function as a [`KeyFunc`].
pub fn key_func(f: fn(&Key) -> String) -> KeyFunc {
    Arc::new(f)
}

/// Split a CamelCase identifier into lowercase words joined by `_`.
///
/// Runs of capitals stay together as one word, so `URLPath` becomes
/// `url_path` and `BAZ` becomes `baz`. Already snake-cased input is
/// returned unchanged.
pub fn snake_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len() + 4);
    // A pending uppercase character, held back until we know whether it
    // starts a new word or continues an acronym.
    let mut pending: Option<char> = None;
    let mut in_acronym = false;

    fn boundary(out: &mut String) {
        if !out.is_empty() && !out.ends_with('_') {
            out.push('_');
        }
    }

    for ch in segment.chars() {
        if ch.is_uppercase() {
            if let Some(p) = pending {
                if !in_acronym {
                    boundary(&mut out);
                    in_acronym = true;
                }
                out.push(p);
            }
            pending = ch.to_lowercase().next();
        } else if ch.is_lowercase() {
            // The last capital before a lowercase run starts a new word.
            if let Some(p) = pending.take() {
                boundary(&mut out);
                out.push(p);
            }
            in_acronym = false;
            out.push(ch);
        } else {
            if let Some(p) = pending.take() {
                if !in_acronym {
                    boundary(&mut out);
                }
                out.push(p);
            }
            in_acronym = false;
            out.push(ch);
        }
    }
    if let Some(p) = pending {
        if !in_acronym {
            boundary(&mut out);
        }
        out.push(p);
    }
    out
}

fn join(key: &Key, delim: &str) -> String {
    key.segments()
        .iter()
        .map(|s| snake_segment(s))
        .collect::<Vec<_>>()
        .join(delim)
}

/// `Worker.BufferSize` → `worker.buffer_size`.
pub fn dot_key(key: &Key) -> String {
    join(key, ".")
}

/// `Worker.BufferSize` → `worker_buffer_size`.
pub fn underscore_key(key: &Key) -> String {
    join(key, "_")
}

/// `Worker.BufferSize` → `worker-buffer-size`.
pub fn dash_key(key: &Key) -> String {
    join(key, "-").replace('_', "-")
}

/// `Worker.BufferSize` → `WORKER_BUFFER_SIZE`.
pub fn env_key(key: &Key) -> String {
    underscore_key(key).to_uppercase()
}

/// Returns a KeyFunc which prepends `prefix` as a leading segment and then
/// runs `kf`. An empty prefix leaves `kf` unchanged; an empty key still
/// normalizes to the empty string.
pub fn prefix_key_func(prefix: &str, kf: KeyFunc) -> KeyFunc {
    if prefix.is_empty() {
        return kf;
    }
    let prefix = prefix.to_string();
    Arc::new(move |key: &Key| {
        if key.is_empty() {
            String::new()
        } else {
            kf(&key.prefixed(&prefix))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn canonical_key_funcs() {
        let key = Key::new(["Foo", "bar", "BAZ"]);
        assert_eq!(dot_key(&key), "foo.bar.baz");
        assert_eq!(underscore_key(&key), "foo_bar_baz");
        assert_eq!(dash_key(&key), "foo-bar-baz");
    }

    #[test]
    fn camel_case_segments_are_split() {
        let key = Key::new(["One", "Two", "ThreeFour"]);
        assert_eq!(underscore_key(&key), "one_two_three_four");
        assert_eq!(dot_key(&Key::parse("Worker.BufferSize")), "worker.buffer_size");
    }

    #[test]
    fn snake_segment_cases() {
        assert_eq!(snake_segment("HostName"), "host_name");
        assert_eq!(snake_segment("URLPath"), "url_path");
        assert_eq!(snake_segment("BAZ"), "baz");
        assert_eq!(snake_segment("buffer_size"), "buffer_size");
        assert_eq!(snake_segment("lower"), "lower");
        assert_eq!(snake_segment("ID"), "id");
        assert_eq!(snake_segment("BUFFER_SIZE"), "buffer_size");
        assert_eq!(snake_segment("Port8080"), "port8080");
        assert_eq!(snake_segment(""), "");
    }

    #[test]
    fn prefix_key_func_prepends_segment() {
        let kf = prefix_key_func("RogerThat", key_func(underscore_key));
        assert_eq!(kf(&Key::new(["One", "TwoThree"])), "roger_that_one_two_three");
    }

    #[test]
    fn env_key_with_prefix() {
        let kf = prefix_key_func("myapp", key_func(env_key));
        assert_eq!(kf(&Key::parse("Worker.BufferSize")), "MYAPP_WORKER_BUFFER_SIZE");
    }

    #[test]
    fn empty_key_normalizes_to_empty_string() {
        let empty = Key::default();
        assert_eq!(dot_key(&empty), "");
        assert_eq!(env_key(&empty), "");
        assert_eq!(prefix_key_func("app", key_func(dot_key))(&empty), "");
    }

    #[test]
    fn normalization_is_deterministic() {
        let key = Key::parse("Server.HostName");
        assert_eq!(dot_key(&key), dot_key(&key.clone()));
    }

    #[test]
    fn distinct_paths_do_not_collide() {
        let keys = [
            "Server.HostName",
            "Server.Host.Name",
            "ServerHost.Name",
            "Worker.BufferSize",
            "Worker.Buffer.Size",
        ];
        let dot: HashSet<_> = keys.iter().map(|k| dot_key(&Key::parse(k))).collect();
        assert_eq!(dot.len(), keys.len());
    }

    #[test]
    fn dash_key_splits_words_with_dashes() {
        assert_eq!(dash_key(&Key::parse("Worker.BufferSize")), "worker-buffer-size");
        assert_eq!(dash_key(&Key::parse("Server.URLPath")), "server-url-path");
        assert_eq!(dash_key(&Key::parse("worker.buffer_size")), "worker-buffer-size");
    }

    #[test]
    fn flat_joins_can_collide_across_segment_boundaries() {
        // Registry::register rejects schemas like this one.
        let (a, b) = (Key::parse("Server.HostName"), Key::parse("ServerHost.Name"));
        assert_eq!(underscore_key(&a), underscore_key(&b));
        assert_eq!(dash_key(&a), dash_key(&b));
    }

    #[test]
    fn key_equality_ignores_case() {
        let a = Key::parse("Server.HostName");
        let b = Key::parse("server.hostname");
        assert_eq!(a, b);

        let mut set = HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
        assert_ne!(Key::parse("Server"), Key::parse("Server.HostName"));
    }

    #[test]
    fn parse_and_display() {
        let key = Key::parse("Worker.BufferSize");
        assert_eq!(key.segments(), ["Worker", "BufferSize"]);
        assert_eq!(key.to_string(), "Worker.BufferSize");
        assert!(Key::parse("").is_empty());
    }
}
