use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Hands out unique ids for routes and exchanges. A `Context` owns one and
/// shares it with every route it builds.
pub trait IdGenerator: Send + Sync + Debug {
    fn next_id(&self) -> String;
}

/// Random 128-bit ids rendered as 32 lowercase hex characters.
#[derive(Debug, Default, Clone)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn next_id(&self) -> String {
        Uuid::new_v4().simple().to_string()
    }
}

/// Monotonic ids tagged with a node name, e.g. `node-a-000000000000002a`.
#[derive(Debug)]
pub struct SequenceGenerator {
    node: String,
    counter: AtomicU64,
}

impl SequenceGenerator {
    pub fn new<N: Into<String>>(node: N) -> Self {
        Self {
            node: node.into(),
            counter: AtomicU64::new(0),
        }
    }
}

impl IdGenerator for SequenceGenerator {
    fn next_id(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        format!("{}-{:016x}", self.node, n)
    }
}
