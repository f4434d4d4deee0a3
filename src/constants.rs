// -
// Remote tree layout

/// Root path watched when none is configured.
pub const DEFAULT_ROOT_PATH: &str = "/dubbo";

/// Node appended to bare (non-absolute) root paths to form the watched path.
pub(crate) const CONFIG_NODE: &str = "config";

/// Absolute segment count (of the `/`-split path) at which live change
/// events are forwarded to listeners. Shallower or deeper changes stay
/// visible through snapshot reads only.
pub(crate) const NOTIFY_PATH_DEPTH: usize = 5;

// -
// Overlay change categories

/// Key suffix classified as a routing-rules change.
pub const ROUTERS_SUFFIX: &str = ".routers";

/// Key suffix classified as a traffic-governance change.
pub const CONFIGURATORS_SUFFIX: &str = ".configurators";

// -
// Configuration loading

/// Prefix of environment variables merged into [`crate::SourceConfig`].
pub(crate) const ENV_PREFIX: &str = "CONF_MIRROR";

pub(crate) const DEFAULT_SESSION_TIMEOUT_MS: u64 = 60_000;
pub(crate) const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 10_000;

/// Bound of the per-subscription event buffer handed out by the in-memory
/// backend.
pub(crate) const SUBSCRIPTION_BUFFER: usize = 1024;
