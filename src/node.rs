use serde::{Deserialize, Serialize};

/// Role a machine plays in the cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Worker,
    Manager,
}

/// Description of a machine in the cluster. Inventory data only; capacity
/// tracking and placement decisions live outside this crate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    pub ip: String,
    pub cores: u64,
    pub memory: u64,
    pub memory_allocated: u64,
    pub disk: u64,
    pub disk_allocated: u64,
    pub role: Role,
    pub task_count: u64,
}

impl Node {
    pub fn new(name: impl Into<String>, ip: impl Into<String>, role: Role) -> Self {
        Node {
            name: name.into(),
            ip: ip.into(),
            cores: 0,
            memory: 0,
            memory_allocated: 0,
            disk: 0,
            disk_allocated: 0,
            role,
            task_count: 0,
        }
    }
}
