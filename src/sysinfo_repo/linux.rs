// Linux-specific helpers: /proc/cpuinfo, /proc/meminfo, /etc/os-release.

/// Read first "model name" from /proc/cpuinfo (Linux). Prefer over sysinfo when it returns "cpu0" etc.
pub(super) fn read_cpu_model_linux() -> Option<String> {
    #[cfg(target_os = "linux")]
    {
        let content = std::fs::read_to_string("/proc/cpuinfo").ok()?;
        for line in content.lines() {
            if line.starts_with("model name") {
                let name = line
                    .find(": ")
                    .map(|i| line[i + 2..].trim())
                    .filter(|s| !s.is_empty() && *s != "cpu0")?;
                return Some(name.to_string());
            }
        }
    }
    None
}

#[derive(Debug, Default, PartialEq)]
pub(super) struct MemInfo {
    pub cached: u64,
    pub buffers: u64,
}

/// Page cache and buffer sizes in bytes. sysinfo folds these into "available".
pub(super) fn read_meminfo_linux() -> Option<MemInfo> {
    #[cfg(target_os = "linux")]
    {
        let content = std::fs::read_to_string("/proc/meminfo").ok()?;
        return Some(parse_meminfo(&content));
    }
    #[cfg(not(target_os = "linux"))]
    None
}

#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_meminfo(content: &str) -> MemInfo {
    let mut info = MemInfo::default();
    for line in content.lines() {
        let Some((key, rest)) = line.split_once(':') else {
            continue;
        };
        let kib = rest
            .split_whitespace()
            .next()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(0);
        match key.trim() {
            "Cached" => info.cached = kib * 1024,
            "Buffers" => info.buffers = kib * 1024,
            _ => {}
        }
    }
    info
}

/// PRETTY_NAME (or NAME) from /etc/os-release.
pub(super) fn read_os_pretty_name_linux() -> Option<String> {
    #[cfg(target_os = "linux")]
    {
        let content = std::fs::read_to_string("/etc/os-release").ok()?;
        for key in ["PRETTY_NAME=", "NAME="] {
            for line in content.lines() {
                if let Some(v) = line.strip_prefix(key) {
                    let v = v.trim_matches('"');
                    if !v.is_empty() {
                        return Some(v.to_string());
                    }
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meminfo_reads_cached_and_buffers_in_bytes() {
        let sample = "MemTotal:       16318448 kB\n\
                      Buffers:          102400 kB\n\
                      Cached:          2048000 kB\n\
                      SwapCached:            0 kB\n";
        let info = parse_meminfo(sample);
        assert_eq!(info.buffers, 102_400 * 1024);
        assert_eq!(info.cached, 2_048_000 * 1024);
    }

    #[test]
    fn meminfo_missing_keys_are_zero() {
        assert_eq!(parse_meminfo("MemTotal: 1 kB\n"), MemInfo::default());
    }
}
