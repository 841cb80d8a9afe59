// src/context.rs

//! Per-process run context passed explicitly to every component.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::gateway::{DispatchTable, ModelDispatch};
use crate::models::Config;
use crate::services::ExtractionRules;

/// Configuration, resolved model dispatch, compiled extraction rules and
/// the run-wide cancellation token.
#[derive(Clone)]
pub struct RunContext {
    pub config: Arc<Config>,
    pub dispatch: ModelDispatch,
    pub rules: Arc<ExtractionRules>,
    pub cancel: CancellationToken,
}

impl RunContext {
    /// Validate `config`, resolve the dispatch for its model and compile selectors.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let table = DispatchTable::from_config(&config.gateway);
        let dispatch = table.resolve(&config.gateway.model);
        log::debug!(
            "Model {} resolved to {:?} (dispatch table {})",
            config.gateway.model,
            dispatch,
            table.version()
        );
        let rules = Arc::new(ExtractionRules::new(&config)?);
        Ok(Self {
            config: Arc::new(config),
            dispatch,
            rules,
            cancel: CancellationToken::new(),
        })
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Cancel the run once `secs` have elapsed.
    pub fn cancel_after(&self, secs: u64) {
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(std::time::Duration::from_secs(secs)) => {
                    log::warn!("Run time limit of {secs}s reached, cancelling");
                    cancel.cancel();
                }
                _ = cancel.cancelled() => {}
            }
        });
    }
}
