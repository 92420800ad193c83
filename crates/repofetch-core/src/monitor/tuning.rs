//! Speed-driven tuning: write chunk size and recommended parallelism.
//!
//! Speeds are bytes/sec; tier boundaries are in MiB/s.

const MIB: f64 = 1024.0 * 1024.0;
const KIB: usize = 1024;

/// Chunk size for an observed speed, non-decreasing in speed. With no
/// measurement yet the second tier is used.
pub fn recommended_chunk_size(speed_bps: Option<f64>) -> usize {
    let mbps = match speed_bps {
        Some(s) => s.max(0.0) / MIB,
        None => return 512 * KIB,
    };
    if mbps < 5.0 {
        256 * KIB
    } else if mbps < 20.0 {
        512 * KIB
    } else if mbps < 80.0 {
        1024 * KIB
    } else {
        2048 * KIB
    }
}

/// Worker recommendation for a machine with `cpus` logical CPUs.
pub fn recommended_workers_for(cpus: usize, speed_bps: Option<f64>) -> usize {
    let base = cpus.clamp(2, 8);
    let Some(speed) = speed_bps.filter(|s| *s > 0.0) else {
        return base;
    };
    let mbps = speed / MIB;
    if mbps < 5.0 {
        base.min(2)
    } else if mbps < 20.0 {
        base.min(4)
    } else {
        base.max(4).min(8)
    }
}

/// Worker recommendation for this machine. `speed_bps` is usually the
/// terminal speed of the previous session.
pub fn recommended_workers(speed_bps: Option<f64>) -> usize {
    let cpus = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4);
    recommended_workers_for(cpus, speed_bps)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MB: f64 = MIB;

    #[test]
    fn chunk_tiers() {
        assert_eq!(recommended_chunk_size(None), 512 * KIB);
        assert_eq!(recommended_chunk_size(Some(0.0)), 256 * KIB);
        assert_eq!(recommended_chunk_size(Some(1.0 * MB)), 256 * KIB);
        assert_eq!(recommended_chunk_size(Some(4.99 * MB)), 256 * KIB);
        assert_eq!(recommended_chunk_size(Some(5.0 * MB)), 512 * KIB);
        assert_eq!(recommended_chunk_size(Some(20.0 * MB)), 1024 * KIB);
        assert_eq!(recommended_chunk_size(Some(79.0 * MB)), 1024 * KIB);
        assert_eq!(recommended_chunk_size(Some(80.0 * MB)), 2048 * KIB);
        assert_eq!(recommended_chunk_size(Some(500.0 * MB)), 2048 * KIB);
    }

    #[test]
    fn chunk_size_is_monotonic_in_speed() {
        let mut prev = 0;
        for step in 0..200 {
            let c = recommended_chunk_size(Some(step as f64 * MB));
            assert!(c >= prev);
            prev = c;
        }
    }

    #[test]
    fn workers_without_history_follow_cpus() {
        assert_eq!(recommended_workers_for(1, None), 2);
        assert_eq!(recommended_workers_for(6, None), 6);
        assert_eq!(recommended_workers_for(32, None), 8);
        assert_eq!(recommended_workers_for(6, Some(0.0)), 6);
    }

    #[test]
    fn workers_by_speed_tier() {
        assert_eq!(recommended_workers_for(8, Some(3.0 * MB)), 2);
        assert_eq!(recommended_workers_for(8, Some(10.0 * MB)), 4);
        assert_eq!(recommended_workers_for(3, Some(10.0 * MB)), 3);
        assert_eq!(recommended_workers_for(2, Some(50.0 * MB)), 4);
        assert_eq!(recommended_workers_for(16, Some(50.0 * MB)), 8);
    }

    #[test]
    fn this_machine_is_in_range() {
        assert!((2..=8).contains(&recommended_workers(None)));
    }
}
