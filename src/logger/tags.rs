/// Log tags identify the subsystem a message comes from.
///
/// Each tag maps to a `--debug-<key>` flag through `to_debug_key`.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogTag {
    System,
    Config,
    Trader,
    Positions,
    Reentry,
    Monitor,
    Executor,
    Pricing,
}

impl LogTag {
    /// Key used by `--debug-<key>` / `--verbose-<key>` flags
    pub fn to_debug_key(&self) -> String {
        match self {
            LogTag::System => "system",
            LogTag::Config => "config",
            LogTag::Trader => "trader",
            LogTag::Positions => "positions",
            LogTag::Reentry => "reentry",
            LogTag::Monitor => "monitor",
            LogTag::Executor => "executor",
            LogTag::Pricing => "pricing",
        }
        .to_string()
    }

    /// Uncolored label used in the log file
    pub fn to_plain_string(&self) -> String {
        self.to_debug_key().to_uppercase()
    }
}

impl std::fmt::Display for LogTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_plain_string())
    }
}
