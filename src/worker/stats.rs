use serde::{Serialize, Serializer};
use sysinfo::{Disks, System};

/// Machine statistics reported by a worker's `/stats` endpoint.
///
/// Values are kept raw (bytes, percentages) and rendered with human-readable
/// units at serialization time.
#[derive(Debug, Clone, Serialize)]
pub struct SystemStats {
    #[serde(serialize_with = "as_percent")]
    pub cpu_usage: f32,
    #[serde(serialize_with = "as_megabytes")]
    pub total_memory: u64,
    #[serde(serialize_with = "as_megabytes")]
    pub used_memory: u64,
    #[serde(serialize_with = "as_megabytes")]
    pub total_swap: u64,
    #[serde(serialize_with = "as_megabytes")]
    pub used_swap: u64,
    pub system_name: String,
    pub hostname: String,
    pub total_cpus: usize,
    #[serde(serialize_with = "as_percent")]
    pub disk_usage: f32,
    pub task_count: u64,
}

impl SystemStats {
    /// Snapshot the machine from an already-refreshed [`System`].
    ///
    /// CPU usage only becomes meaningful once the caller's `System` has been
    /// refreshed at least twice; keep one instance around rather than
    /// building a fresh one per snapshot.
    pub fn collect(sysinfo: &System, task_count: u64) -> Self {
        SystemStats {
            cpu_usage: sysinfo.global_cpu_usage(),
            total_memory: sysinfo.total_memory(),
            used_memory: sysinfo.used_memory(),
            total_swap: sysinfo.total_swap(),
            used_swap: sysinfo.used_swap(),
            system_name: System::name().unwrap_or_else(|| "unknown".to_string()),
            hostname: System::host_name().unwrap_or_else(|| "unknown".to_string()),
            total_cpus: sysinfo.cpus().len(),
            disk_usage: disk_usage_percent(),
            task_count,
        }
    }
}

fn disk_usage_percent() -> f32 {
    let disks = Disks::new_with_refreshed_list();
    let total: u64 = disks.iter().map(|disk| disk.total_space()).sum();
    if total == 0 {
        return 0.0;
    }
    let available: u64 = disks.iter().map(|disk| disk.available_space()).sum();
    ((total - available) as f32 / total as f32) * 100.0
}

fn as_percent<S: Serializer>(value: &f32, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format!("{value:.2}%"))
}

fn as_megabytes<S: Serializer>(bytes: &u64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format!("{} MB", bytes / 1024 / 1024))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_serialize_with_human_readable_units() {
        let stats = SystemStats {
            cpu_usage: 12.5,
            total_memory: 2048 * 1024 * 1024,
            used_memory: 512 * 1024 * 1024,
            total_swap: 0,
            used_swap: 0,
            system_name: "linux".to_string(),
            hostname: "worker-1".to_string(),
            total_cpus: 8,
            disk_usage: 40.0,
            task_count: 3,
        };

        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["cpu_usage"], "12.50%");
        assert_eq!(json["total_memory"], "2048 MB");
        assert_eq!(json["used_memory"], "512 MB");
        assert_eq!(json["disk_usage"], "40.00%");
        assert_eq!(json["total_cpus"], 8);
        assert_eq!(json["task_count"], 3);
    }
}
