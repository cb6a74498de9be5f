//! Agent bootstrap.
//!
//! The host runtime hands the agent its argument string and a transformer registry. The
//! tracking [`Rewriter`] is always registered; a host-supplied I/O-tracking transformer is
//! registered after it when `io_tracking` is enabled.

use std::sync::Arc;

use crate::{
    engine::{ClassFileTransformer, EngineConfig, FacadeBinding, Rewriter},
    Result,
};

/// Host transformer registry.
pub trait Instrumentation {
    /// Register a transformer. Transformers run in registration order.
    fn add_transformer(&mut self, transformer: Arc<dyn ClassFileTransformer>);
}

impl Instrumentation for Vec<Arc<dyn ClassFileTransformer>> {
    fn add_transformer(&mut self, transformer: Arc<dyn ClassFileTransformer>) {
        self.push(transformer);
    }
}

/// Configured agent, ready to install.
pub struct Agent {
    config: EngineConfig,
    binding: FacadeBinding,
    io_transformer: Option<Arc<dyn ClassFileTransformer>>,
}

impl Agent {
    /// Creates an agent with the default facade binding.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Agent {
            config,
            binding: FacadeBinding::default(),
            io_transformer: None,
        }
    }

    /// Creates an agent from raw agent arguments.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Config`] if the arguments do not parse.
    pub fn from_args(args: Option<&str>) -> Result<Self> {
        Ok(Agent::new(EngineConfig::from_agent_args(args)?))
    }

    /// Use a different facade binding for generated code.
    #[must_use]
    pub fn with_binding(mut self, binding: FacadeBinding) -> Self {
        self.binding = binding;
        self
    }

    /// Supply the I/O-tracking transformer. It is only registered when enabled in the config.
    #[must_use]
    pub fn with_io_transformer(mut self, transformer: Arc<dyn ClassFileTransformer>) -> Self {
        self.io_transformer = Some(transformer);
        self
    }

    /// The parsed configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Register transformers with the host and return the tracking rewriter.
    pub fn install(self, instrumentation: &mut dyn Instrumentation) -> Arc<Rewriter> {
        log::info!("Starting probeweave v{}", env!("CARGO_PKG_VERSION"));

        let rewriter = Arc::new(Rewriter::new(self.config, self.binding));
        instrumentation.add_transformer(rewriter.clone());

        if self.config.io_tracking {
            match self.io_transformer {
                Some(transformer) => instrumentation.add_transformer(transformer),
                None => log::warn!("io_tracking is enabled but no I/O transformer was supplied"),
            }
        }
        rewriter
    }
}

/// Agent entry point: parse `args` and install into `instrumentation`.
///
/// # Errors
///
/// Returns [`crate::Error::Config`] if the arguments do not parse. Nothing is registered in
/// that case.
pub fn premain(args: Option<&str>, instrumentation: &mut dyn Instrumentation) -> Result<Arc<Rewriter>> {
    Ok(Agent::from_args(args)?.install(instrumentation))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{engine::LoadRequest, Error};

    struct Passthrough;

    impl ClassFileTransformer for Passthrough {
        fn transform(&self, _request: &LoadRequest<'_>) -> Option<Vec<u8>> {
            None
        }
    }

    #[test]
    fn registers_tracking_only_by_default() -> Result<()> {
        let mut registry: Vec<Arc<dyn ClassFileTransformer>> = Vec::new();
        let rewriter = premain(None, &mut registry)?;
        assert_eq!(registry.len(), 1);
        assert!(!rewriter.config().verbose);
        Ok(())
    }

    #[test]
    fn io_transformer_follows_switch() -> Result<()> {
        let mut registry: Vec<Arc<dyn ClassFileTransformer>> = Vec::new();
        Agent::from_args(Some("io_tracking=false"))?
            .with_io_transformer(Arc::new(Passthrough))
            .install(&mut registry);
        assert_eq!(registry.len(), 1);

        let mut registry: Vec<Arc<dyn ClassFileTransformer>> = Vec::new();
        Agent::from_args(Some("io_tracking,verbose"))?
            .with_io_transformer(Arc::new(Passthrough))
            .install(&mut registry);
        assert_eq!(registry.len(), 2);
        Ok(())
    }

    #[test]
    fn bad_arguments_register_nothing() {
        let mut registry: Vec<Arc<dyn ClassFileTransformer>> = Vec::new();
        assert!(matches!(premain(Some("unknown=1"), &mut registry), Err(Error::Config(_))));
        assert!(registry.is_empty());
    }
}
