//! Sandbox configuration with builder pattern.

/// Configuration for a sandbox instance.
#[derive(Debug, Clone)]
pub struct SandboxConfig {
    /// Maximum accepted guest source length in bytes. An over-length source
    /// is reported as an `error` output event instead of being evaluated.
    pub max_source_len: usize,
    /// Whether to drain the engine's job queue after top-level evaluation,
    /// so output emitted from settled promises is captured too.
    pub run_jobs: bool,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            max_source_len: 1_000_000, // 1MB
            run_jobs: true,
        }
    }
}

impl SandboxConfig {
    /// Create a new builder for SandboxConfig.
    pub fn builder() -> SandboxConfigBuilder {
        SandboxConfigBuilder::default()
    }
}

/// Builder for creating SandboxConfig instances.
#[derive(Debug, Clone, Default)]
pub struct SandboxConfigBuilder {
    max_source_len: Option<usize>,
    run_jobs: Option<bool>,
}

impl SandboxConfigBuilder {
    /// Set the maximum guest source length in bytes.
    pub fn max_source_len(mut self, bytes: usize) -> Self {
        self.max_source_len = Some(bytes);
        self
    }

    /// Enable or disable job-queue draining after evaluation.
    pub fn run_jobs(mut self, run_jobs: bool) -> Self {
        self.run_jobs = Some(run_jobs);
        self
    }

    /// Build the SandboxConfig.
    pub fn build(self) -> SandboxConfig {
        let default = SandboxConfig::default();
        SandboxConfig {
            max_source_len: self.max_source_len.unwrap_or(default.max_source_len),
            run_jobs: self.run_jobs.unwrap_or(default.run_jobs),
        }
    }
}
