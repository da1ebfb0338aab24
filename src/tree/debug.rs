//! Structural dump for diagnostics. Not part of the correctness surface.

use crate::error::Result;
use crate::node::{decode_weight, parse_node_key, prefix_end, Children, NODE_NAMESPACE};
use crate::store::OrderedStore;

use super::Tree;

impl<S: OrderedStore> Tree<S> {
    /// Renders every stored node, one line each, for troubleshooting.
    /// Keys are hex-encoded; branches list their `index:accumulation` pairs.
    ///
    /// # Panics
    /// Panics when a stored record cannot be decoded (corruption).
    pub fn debug_dump(&self) -> Result<String> {
        let end = prefix_end(NODE_NAMESPACE);
        let mut out = String::new();
        for (raw, value) in self.store.iter(Some(NODE_NAMESPACE), end.as_deref())? {
            let (level, key) = parse_node_key(&raw);
            if level == 0 {
                out.push_str(&format!(
                    "leaf   key={} weight={}\n",
                    hex::encode(&key),
                    decode_weight(&value)
                ));
            } else {
                let children = Children::decode(&value);
                let entries: Vec<String> = children
                    .0
                    .iter()
                    .map(|c| format!("{}:{}", hex::encode(&c.index), c.acc))
                    .collect();
                out.push_str(&format!(
                    "branch level={} key={} children=[{}]\n",
                    level,
                    hex::encode(&key),
                    entries.join(", ")
                ));
            }
        }
        Ok(out)
    }
}
