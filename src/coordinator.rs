//! Wiring capability checks to format requests.
//!
//! The coordinator is either unregistered (no formatter offered) or holds a
//! registration built from a successful capability check. Every
//! configuration change drops the current registration before checking
//! again. Requests take a reference-counted snapshot of the registration,
//! so a request already running when the configuration changes finishes
//! with the tool it started with.

use std::path::Path;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use crate::capability::{CapabilityError, Tool, check_tool};
use crate::config::FormattingConfig;
use crate::edits::TextEdit;
use crate::exec::{ProcessRunner, SubprocessRunner};
use crate::formatter::{FormatRequest, format_document};
use crate::introspection::{MesonResolver, ToolResolver};
use crate::output::OutputSink;

type RunnerFactory = dyn Fn(&FormattingConfig) -> Arc<dyn ProcessRunner> + Send + Sync;

/// Everything a format request needs, fixed at registration time.
pub struct Registration {
    pub tool: Tool,
    pub config: FormattingConfig,
    runner: Arc<dyn ProcessRunner>,
}

/// Result of [`FormattingCoordinator::reload`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReloadOutcome {
    /// Formatting is switched off in the configuration.
    Disabled,
    /// The capability check failed; nothing is registered.
    Unavailable(CapabilityError),
    Registered(Tool),
}

impl ReloadOutcome {
    pub fn is_registered(&self) -> bool {
        matches!(self, Self::Registered(_))
    }
}

pub struct FormattingCoordinator {
    resolver: Arc<dyn ToolResolver>,
    runner_factory: Arc<RunnerFactory>,
    sink: Arc<dyn OutputSink>,
    registration: RwLock<Option<Arc<Registration>>>,
    /// Serializes reloads so two configuration changes can't interleave.
    reload_lock: Mutex<()>,
}

impl FormattingCoordinator {
    /// Coordinator driving the real `meson` executable.
    pub fn new(sink: Arc<dyn OutputSink>) -> Self {
        let probe_runner: Arc<dyn ProcessRunner> = Arc::new(SubprocessRunner::default());
        Self {
            resolver: Arc::new(MesonResolver::new(probe_runner)),
            runner_factory: Arc::new(|config: &FormattingConfig| {
                Arc::new(SubprocessRunner::new(config.timeout)) as Arc<dyn ProcessRunner>
            }),
            sink,
            registration: RwLock::new(None),
            reload_lock: Mutex::new(()),
        }
    }

    /// Coordinator with an injected resolver and runner.
    pub fn with_collaborators(
        resolver: Arc<dyn ToolResolver>,
        runner: Arc<dyn ProcessRunner>,
        sink: Arc<dyn OutputSink>,
    ) -> Self {
        Self {
            resolver,
            runner_factory: Arc::new(move |_: &FormattingConfig| runner.clone()),
            sink,
            registration: RwLock::new(None),
            reload_lock: Mutex::new(()),
        }
    }

    pub fn sink(&self) -> &Arc<dyn OutputSink> {
        &self.sink
    }

    /// Drop the current registration, if any. Idempotent.
    pub async fn deregister(&self) {
        if self.registration.write().await.take().is_some() {
            log::debug!("Formatter deregistered");
        }
    }

    /// Deregister, then check the tool again under `config`.
    pub async fn reload(&self, config: &FormattingConfig) -> ReloadOutcome {
        let _reloading = self.reload_lock.lock().await;
        self.deregister().await;

        if !config.enabled {
            log::debug!("Formatting disabled by configuration");
            return ReloadOutcome::Disabled;
        }

        let name = config.provider.name();
        match check_tool(self.resolver.as_ref(), config).await {
            Err(e) => {
                log::debug!("Failed to enable formatter {name}: {e}");
                self.sink.append_line(&format!("Failed to enable formatter {name}: {e}"));
                self.sink.show(true);
                ReloadOutcome::Unavailable(e)
            }
            Ok(tool) => {
                self.sink
                    .append_line(&format!("tool formatter {name}: {}", tool.version));
                let registration = Registration {
                    tool: tool.clone(),
                    config: config.clone(),
                    runner: (self.runner_factory)(config),
                };
                *self.registration.write().await = Some(Arc::new(registration));
                ReloadOutcome::Registered(tool)
            }
        }
    }

    pub async fn current(&self) -> Option<Arc<Registration>> {
        self.registration.read().await.clone()
    }

    pub async fn is_registered(&self) -> bool {
        self.registration.read().await.is_some()
    }

    /// Format `text`, running the tool in `working_dir`.
    ///
    /// `None` means no formatter is registered.
    pub async fn format(&self, text: &str, working_dir: &Path) -> Option<Vec<TextEdit>> {
        let registration = self.current().await?;
        let request = FormatRequest {
            tool: &registration.tool,
            working_dir,
            original_text: text,
        };
        let edits = format_document(
            registration.runner.as_ref(),
            request,
            registration.config.meson_config.as_deref(),
            self.sink.as_ref(),
        )
        .await;
        Some(edits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::{CommandSpec, ExecResult};
    use crate::introspection::IntrospectionError;
    use crate::output::MemorySink;
    use crate::version::Version;
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::Notify;

    struct StaticResolver(Version);

    #[async_trait]
    impl ToolResolver for StaticResolver {
        async fn locate(&self, config: &FormattingConfig) -> Result<PathBuf, IntrospectionError> {
            Ok(PathBuf::from("/usr/bin").join(&config.meson_path))
        }

        async fn version(&self, _program: &Path) -> Result<Version, IntrospectionError> {
            Ok(self.0)
        }
    }

    /// Echoes the program path as the formatted text; the first call can be
    /// held until released.
    #[derive(Default)]
    struct GateRunner {
        hold_first: AtomicBool,
        started: Notify,
        release: Notify,
    }

    #[async_trait]
    impl ProcessRunner for GateRunner {
        async fn run(&self, command: &CommandSpec, _input: &str) -> ExecResult {
            if self.hold_first.swap(false, Ordering::SeqCst) {
                self.started.notify_one();
                self.release.notified().await;
            }
            ExecResult {
                stdout: command.program.display().to_string(),
                ..Default::default()
            }
        }
    }

    fn coordinator(version: Version, runner: Arc<GateRunner>, sink: Arc<MemorySink>) -> FormattingCoordinator {
        FormattingCoordinator::with_collaborators(Arc::new(StaticResolver(version)), runner, sink)
    }

    fn config(meson_path: &str) -> FormattingConfig {
        FormattingConfig {
            meson_path: meson_path.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_starts_unregistered() {
        let c = coordinator(Version::new(1, 7, 0), Arc::default(), Arc::default());
        assert!(!c.is_registered().await);
        assert_eq!(c.format("x", Path::new("/src")).await, None);
    }

    #[tokio::test]
    async fn test_registers_on_successful_check() {
        let sink = Arc::new(MemorySink::new());
        let c = coordinator(Version::new(1, 7, 0), Arc::default(), sink.clone());

        let outcome = c.reload(&config("meson")).await;

        assert!(outcome.is_registered());
        assert!(c.is_registered().await);
        assert_eq!(sink.lines(), vec!["tool formatter meson: 1.7.0".to_string()]);
        let edits = c.format("project('x')\n", Path::new("/src")).await.unwrap();
        assert_eq!(edits.len(), 1);
        assert_eq!(edits[0].new_text, "/usr/bin/meson");
    }

    #[tokio::test]
    async fn test_disabled_stays_unregistered_silently() {
        let sink = Arc::new(MemorySink::new());
        let c = coordinator(Version::new(1, 7, 0), Arc::default(), sink.clone());
        c.reload(&config("meson")).await;

        let disabled = FormattingConfig {
            enabled: false,
            ..Default::default()
        };
        let sink_lines_before = sink.lines().len();
        assert_eq!(c.reload(&disabled).await, ReloadOutcome::Disabled);
        assert!(!c.is_registered().await);
        assert_eq!(sink.lines().len(), sink_lines_before);
        assert_eq!(sink.shown(), 0);
    }

    #[tokio::test]
    async fn test_failed_check_is_logged_and_shown() {
        let sink = Arc::new(MemorySink::new());
        let c = coordinator(Version::new(1, 4, 9), Arc::default(), sink.clone());

        let outcome = c.reload(&config("meson")).await;

        assert!(matches!(outcome, ReloadOutcome::Unavailable(CapabilityError::TooOld { .. })));
        assert!(!c.is_registered().await);
        assert_eq!(sink.shown(), 1);
        let line = &sink.lines()[0];
        assert!(line.starts_with("Failed to enable formatter meson:"), "{line}");
        assert!(line.contains("1.5.0"), "{line}");
    }

    #[tokio::test]
    async fn test_deregister_is_idempotent() {
        let c = coordinator(Version::new(1, 7, 0), Arc::default(), Arc::default());
        c.deregister().await;
        c.reload(&config("meson")).await;
        c.deregister().await;
        c.deregister().await;
        assert!(!c.is_registered().await);
    }

    #[tokio::test]
    async fn test_in_flight_request_keeps_its_tool() {
        let runner = Arc::new(GateRunner {
            hold_first: AtomicBool::new(true),
            ..Default::default()
        });
        let c = Arc::new(coordinator(Version::new(1, 7, 0), runner.clone(), Arc::default()));
        c.reload(&config("meson-old")).await;

        let in_flight = {
            let c = c.clone();
            tokio::spawn(async move { c.format("x\n", Path::new("/src")).await })
        };
        runner.started.notified().await;

        assert!(c.reload(&config("meson-new")).await.is_registered());
        runner.release.notify_one();

        let old_edits = in_flight.await.unwrap().unwrap();
        assert_eq!(old_edits[0].new_text, "/usr/bin/meson-old");

        let new_edits = c.format("x\n", Path::new("/src")).await.unwrap();
        assert_eq!(new_edits[0].new_text, "/usr/bin/meson-new");
    }
}
