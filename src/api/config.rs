//! Per-link configuration.

/// What an interceptor does when a sink breaks the alignment contract.
///
/// `malloc` and `realloc` have no alignment argument, so a sink that changes
/// the alignment of such a request is asking for something the next
/// allocator cannot deliver. Silently passing the request on would hand the
/// caller a block that is less aligned than the sink believes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContractPolicy {
    /// Check only when `debug_assertions` are on, and abort on violation.
    /// With assertions off the check is compiled out and a violation is
    /// undefined behavior.
    #[default]
    DebugAbort,
    /// Check in every build, abort on violation.
    Abort,
    /// Check in every build, panic on violation.
    ///
    /// Only for tests: unwinding out of a `GlobalAlloc` is undefined
    /// behavior.
    Panic,
}

impl ContractPolicy {
    /// Whether the check runs in this build.
    #[inline]
    pub const fn is_checked(self) -> bool {
        match self {
            ContractPolicy::DebugAbort => cfg!(debug_assertions),
            ContractPolicy::Abort | ContractPolicy::Panic => true,
        }
    }

    /// Parse a policy name: `debug`, `abort` or `panic`.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "debug" | "debug-abort" | "default" => Some(ContractPolicy::DebugAbort),
            "abort" => Some(ContractPolicy::Abort),
            "panic" => Some(ContractPolicy::Panic),
            _ => None,
        }
    }
}

/// Configuration for one interceptor link.
///
/// Read once when the link is built; nothing on the call path consults the
/// environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HookConfig {
    /// Name of this link in traces and diagnostics (default: "allochook")
    pub label: &'static str,

    /// Print one line per intercepted call (default: off)
    pub trace: bool,

    /// Alignment contract enforcement (default: `DebugAbort`)
    pub contract: ContractPolicy,
}

impl Default for HookConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl HookConfig {
    /// The default configuration, usable in `static` initialisers.
    pub const fn new() -> Self {
        Self {
            label: "allochook",
            trace: false,
            contract: ContractPolicy::DebugAbort,
        }
    }

    /// Trace every call and check the contract in every build.
    pub const fn tracing() -> Self {
        Self {
            label: "allochook",
            trace: true,
            contract: ContractPolicy::Abort,
        }
    }

    /// Check the contract in every build and panic on violation.
    pub const fn strict() -> Self {
        Self {
            label: "allochook",
            trace: false,
            contract: ContractPolicy::Panic,
        }
    }

    /// Defaults overridden by `ALLOCHOOK_TRACE` (`1`, `true`, `on`) and
    /// `ALLOCHOOK_CONTRACT` (`debug`, `abort`, `panic`).
    ///
    /// Reading the environment allocates; call this before the chain is
    /// installed, never from inside a hook.
    pub fn from_env() -> Self {
        let mut config = Self::new();
        if let Ok(val) = std::env::var("ALLOCHOOK_TRACE") {
            config.trace = matches!(
                val.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "on" | "yes"
            );
        }
        if let Some(policy) = std::env::var("ALLOCHOOK_CONTRACT")
            .ok()
            .and_then(|val| ContractPolicy::parse(&val))
        {
            config.contract = policy;
        }
        config
    }

    /// Builder pattern: set the link label.
    pub const fn with_label(mut self, label: &'static str) -> Self {
        self.label = label;
        self
    }

    /// Builder pattern: enable per-call tracing.
    pub const fn with_trace(mut self, enable: bool) -> Self {
        self.trace = enable;
        self
    }

    /// Builder pattern: set the contract policy.
    pub const fn with_contract(mut self, contract: ContractPolicy) -> Self {
        self.contract = contract;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        const CONFIG: HookConfig = HookConfig::new()
            .with_label("outer")
            .with_trace(true)
            .with_contract(ContractPolicy::Panic);

        assert_eq!(CONFIG.label, "outer");
        assert!(CONFIG.trace);
        assert!(CONFIG.contract.is_checked());
        assert_eq!(HookConfig::default(), HookConfig::new());
    }

    #[test]
    fn test_policy_parse() {
        assert_eq!(ContractPolicy::parse("Abort"), Some(ContractPolicy::Abort));
        assert_eq!(ContractPolicy::parse("debug"), Some(ContractPolicy::DebugAbort));
        assert_eq!(ContractPolicy::parse(" panic "), Some(ContractPolicy::Panic));
        assert_eq!(ContractPolicy::parse("ignore"), None);
    }

    #[test]
    fn test_debug_abort_follows_assertions() {
        assert_eq!(ContractPolicy::DebugAbort.is_checked(), cfg!(debug_assertions));
        assert!(ContractPolicy::Abort.is_checked());
    }
}
