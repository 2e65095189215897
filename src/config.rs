use std::time::Duration;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(30);
pub const DEFAULT_JOIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Fixed numeric thresholds shared by the finger heuristic and pose sampler.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    /// Axis 1 value at or above which the index finger counts as touching.
    pub trigger: f32,
    /// Axis 2..4 value at or above which a grip finger counts as touching.
    pub grip: f32,
    /// |axis 0| above which the thumb counts as touching.
    pub thumbtouch: f32,
    /// Multiplier applied to each forward component to match screen projection.
    pub forward_sign: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            trigger: 0.30,
            grip: 0.30,
            thumbtouch: 0.01,
            forward_sign: -1.0,
        }
    }
}

/// Runtime configuration for a [`Tracker`](crate::Tracker).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackerConfig {
    /// Target duration of one poll cycle.
    pub poll_interval: Duration,
    /// How long `stop()` waits for the polling thread.
    pub join_timeout: Duration,
    pub thresholds: Thresholds,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            join_timeout: DEFAULT_JOIN_TIMEOUT,
            thresholds: Thresholds::default(),
        }
    }
}

impl TrackerConfig {
    /// Defaults overridden by `VRTRACK_*` environment variables.
    ///
    /// Unparseable values are logged and ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let thresholds = Thresholds {
            trigger: read_f32(&lookup, "VRTRACK_TRIGGER_THRESHOLD", defaults.thresholds.trigger),
            grip: read_f32(&lookup, "VRTRACK_GRIP_THRESHOLD", defaults.thresholds.grip),
            thumbtouch: read_f32(
                &lookup,
                "VRTRACK_THUMBTOUCH_THRESHOLD",
                defaults.thresholds.thumbtouch,
            ),
            forward_sign: read_forward_sign(&lookup, defaults.thresholds.forward_sign),
        };

        TrackerConfig {
            poll_interval: read_millis(&lookup, "VRTRACK_POLL_INTERVAL_MS", defaults.poll_interval),
            join_timeout: read_millis(&lookup, "VRTRACK_JOIN_TIMEOUT_MS", defaults.join_timeout),
            thresholds,
        }
    }
}

fn read_millis<F>(lookup: &F, name: &str, default: Duration) -> Duration
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(v) => match v.trim().parse::<u64>() {
            Ok(ms) if ms > 0 => Duration::from_millis(ms),
            _ => {
                log::warn!(
                    "Invalid {}='{}', using {}ms",
                    name,
                    v,
                    default.as_millis()
                );
                default
            }
        },
        None => default,
    }
}

fn read_f32<F>(lookup: &F, name: &str, default: f32) -> f32
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(v) => match v.trim().parse::<f32>() {
            Ok(x) if x.is_finite() && x >= 0.0 => x,
            _ => {
                log::warn!("Invalid {}='{}', using {}", name, v, default);
                default
            }
        },
        None => default,
    }
}

fn read_forward_sign<F>(lookup: &F, default: f64) -> f64
where
    F: Fn(&str) -> Option<String>,
{
    match lookup("VRTRACK_FORWARD_SIGN").as_deref().map(str::trim) {
        Some("1") | Some("+1") | Some("1.0") => 1.0,
        Some("-1") | Some("-1.0") => -1.0,
        Some(other) => {
            log::warn!(
                "Invalid VRTRACK_FORWARD_SIGN='{}', using {} (supported: 1|-1)",
                other,
                default
            );
            default
        }
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let cfg = TrackerConfig::from_lookup(lookup(&[]));
        assert_eq!(cfg, TrackerConfig::default());
        assert_eq!(cfg.poll_interval, Duration::from_millis(30));
        assert_eq!(cfg.thresholds.trigger, 0.30);
        assert_eq!(cfg.thresholds.grip, 0.30);
        assert_eq!(cfg.thresholds.thumbtouch, 0.01);
        assert_eq!(cfg.thresholds.forward_sign, -1.0);
    }

    #[test]
    fn test_overrides() {
        let cfg = TrackerConfig::from_lookup(lookup(&[
            ("VRTRACK_POLL_INTERVAL_MS", "11"),
            ("VRTRACK_JOIN_TIMEOUT_MS", "250"),
            ("VRTRACK_TRIGGER_THRESHOLD", "0.5"),
            ("VRTRACK_FORWARD_SIGN", "1"),
        ]));
        assert_eq!(cfg.poll_interval, Duration::from_millis(11));
        assert_eq!(cfg.join_timeout, Duration::from_millis(250));
        assert_eq!(cfg.thresholds.trigger, 0.5);
        assert_eq!(cfg.thresholds.grip, 0.30);
        assert_eq!(cfg.thresholds.forward_sign, 1.0);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let cfg = TrackerConfig::from_lookup(lookup(&[
            ("VRTRACK_POLL_INTERVAL_MS", "0"),
            ("VRTRACK_GRIP_THRESHOLD", "lots"),
            ("VRTRACK_THUMBTOUCH_THRESHOLD", "-0.2"),
            ("VRTRACK_FORWARD_SIGN", "sideways"),
        ]));
        assert_eq!(cfg, TrackerConfig::default());
    }
}
