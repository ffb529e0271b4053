//! Resolution context
//!
//! All state that a single resolution accumulates lives here and is passed
//! explicitly through every step. Two contexts never share anything, so
//! independent manifests can be resolved on separate threads.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{PlanError, Result};
use crate::events::{EventBus, ResolutionEvent};
use crate::warning::Warning;

/// States of the variant resolution state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResolutionState {
    Unresolved,
    SigningAssigned,
    RulesMerged,
    Resolved,
    Failed,
}

impl ResolutionState {
    /// Resolved and Failed accept no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, ResolutionState::Resolved | ResolutionState::Failed)
    }

    /// The only state reachable on success from this one
    pub fn next(&self) -> Option<ResolutionState> {
        match self {
            ResolutionState::Unresolved => Some(ResolutionState::SigningAssigned),
            ResolutionState::SigningAssigned => Some(ResolutionState::RulesMerged),
            ResolutionState::RulesMerged => Some(ResolutionState::Resolved),
            ResolutionState::Resolved | ResolutionState::Failed => None,
        }
    }
}

impl fmt::Display for ResolutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResolutionState::Unresolved => "Unresolved",
            ResolutionState::SigningAssigned => "SigningAssigned",
            ResolutionState::RulesMerged => "RulesMerged",
            ResolutionState::Resolved => "Resolved",
            ResolutionState::Failed => "Failed",
        };
        f.write_str(name)
    }
}

/// Per-invocation resolution state
pub struct ResolutionContext {
    id: Uuid,
    variant: String,
    state: ResolutionState,
    warnings: Vec<Warning>,
    events: Option<Arc<EventBus>>,
}

impl ResolutionContext {
    /// Create a context for resolving `variant`
    pub fn new(variant: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            variant: variant.into(),
            state: ResolutionState::Unresolved,
            warnings: Vec::new(),
            events: None,
        }
    }

    /// Publish state changes and warnings on `bus`
    pub fn with_events(mut self, bus: Arc<EventBus>) -> Self {
        self.events = Some(bus);
        self.emit(ResolutionEvent::Started {
            context_id: self.id,
            variant: self.variant.clone(),
        });
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn variant(&self) -> &str {
        &self.variant
    }

    pub fn state(&self) -> ResolutionState {
        self.state
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Move to the next state of the machine
    pub fn advance(&mut self, to: ResolutionState) -> Result<()> {
        if self.state.next() != Some(to) {
            return Err(PlanError::InvalidState(format!(
                "cannot move from {} to {}",
                self.state, to
            )));
        }
        self.transition(to);
        if to == ResolutionState::Resolved {
            self.emit(ResolutionEvent::Completed {
                context_id: self.id,
                variant: self.variant.clone(),
            });
        }
        Ok(())
    }

    /// Record a hard error and enter the Failed state
    pub fn fail(&mut self, error: &PlanError) {
        if self.state.is_terminal() {
            return;
        }
        self.transition(ResolutionState::Failed);
        self.emit(ResolutionEvent::Failed {
            context_id: self.id,
            error_kind: error.kind().to_string(),
        });
    }

    /// Record a soft warning
    pub fn warn(&mut self, warning: Warning) {
        warn!("{}: {}", warning.kind(), warning);
        self.emit(ResolutionEvent::WarningRaised {
            context_id: self.id,
            warning: warning.clone(),
        });
        self.warnings.push(warning);
    }

    /// Consume the context, keeping the collected warnings
    pub fn into_warnings(self) -> Vec<Warning> {
        self.warnings
    }

    fn transition(&mut self, to: ResolutionState) {
        debug!("State transition: {} -> {}", self.state, to);
        let from = std::mem::replace(&mut self.state, to);
        self.emit(ResolutionEvent::StateChanged {
            context_id: self.id,
            from,
            to,
        });
    }

    fn emit(&self, event: ResolutionEvent) {
        if let Some(ref bus) = self.events {
            bus.emit(event);
        }
    }
}
