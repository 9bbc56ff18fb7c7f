use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{Product, RecommendationSource};

/// Phase of the recommender widget
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WidgetStatus {
    Idle,
    /// Waiting on the remote scoring service
    Resolving,
    /// Remote path failed, local filter running
    LocalFallback,
}

/// Events that drive the widget state
#[derive(Debug, Clone, PartialEq)]
pub enum WidgetEvent {
    /// A non-blank query was submitted
    Submit { query: String },
    /// A blank query was refused before any work started
    Rejected { message: String },
    RemoteResolved {
        token: u64,
        products: Vec<Product>,
        reason: Option<String>,
    },
    RemoteFailed {
        token: u64,
        advisory: Option<String>,
    },
    LocalFilterComplete { token: u64, products: Vec<Product> },
    /// The submitting task went away before completing
    Abandoned { token: u64 },
}

/// Result of applying an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// A new resolution began under this token
    Started(u64),
    Applied,
    /// The event belonged to a superseded resolution and was dropped
    Stale,
    /// The event did not fit the current phase
    Ignored,
}

/// Everything the widget displays
///
/// Only changed through [`WidgetState::apply`]. Every resolution is tagged
/// with the generation it was issued under; events carrying an older token
/// never touch the displayed result.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WidgetState {
    pub status: WidgetStatus,
    pub query: String,
    pub products: Vec<Product>,
    pub reason: Option<String>,
    pub error: Option<String>,
    pub source: Option<RecommendationSource>,
    /// Latest issued request token
    pub generation: u64,
    pub updated_at: DateTime<Utc>,
}

impl Default for WidgetState {
    fn default() -> Self {
        Self::new()
    }
}

impl WidgetState {
    pub fn new() -> Self {
        Self {
            status: WidgetStatus::Idle,
            query: String::new(),
            products: Vec::new(),
            reason: None,
            error: None,
            source: None,
            generation: 0,
            updated_at: Utc::now(),
        }
    }

    /// Busy indicator
    pub fn busy(&self) -> bool {
        self.status != WidgetStatus::Idle
    }

    pub fn apply(&mut self, event: WidgetEvent) -> Transition {
        let transition = match event {
            WidgetEvent::Submit { query } => {
                self.generation += 1;
                self.status = WidgetStatus::Resolving;
                self.query = query;
                self.error = None;
                Transition::Started(self.generation)
            }
            WidgetEvent::Rejected { message } => {
                self.error = Some(message);
                Transition::Applied
            }
            WidgetEvent::RemoteResolved {
                token,
                products,
                reason,
            } => match self.check(token, WidgetStatus::Resolving) {
                Transition::Applied => {
                    self.finish(products, reason, RecommendationSource::Remote);
                    Transition::Applied
                }
                other => other,
            },
            WidgetEvent::RemoteFailed { token, advisory } => {
                match self.check(token, WidgetStatus::Resolving) {
                    Transition::Applied => {
                        self.status = WidgetStatus::LocalFallback;
                        self.error = advisory;
                        Transition::Applied
                    }
                    other => other,
                }
            }
            WidgetEvent::LocalFilterComplete { token, products } => {
                match self.check(token, WidgetStatus::LocalFallback) {
                    Transition::Applied => {
                        self.finish(products, None, RecommendationSource::Local);
                        Transition::Applied
                    }
                    other => other,
                }
            }
            WidgetEvent::Abandoned { token } => {
                if token != self.generation {
                    Transition::Stale
                } else if self.busy() {
                    self.status = WidgetStatus::Idle;
                    Transition::Applied
                } else {
                    Transition::Ignored
                }
            }
        };

        if transition != Transition::Stale && transition != Transition::Ignored {
            self.updated_at = Utc::now();
        }
        transition
    }

    fn check(&self, token: u64, expected: WidgetStatus) -> Transition {
        if token != self.generation {
            Transition::Stale
        } else if self.status != expected {
            Transition::Ignored
        } else {
            Transition::Applied
        }
    }

    fn finish(
        &mut self,
        products: Vec<Product>,
        reason: Option<String>,
        source: RecommendationSource,
    ) {
        self.status = WidgetStatus::Idle;
        self.products = products;
        self.reason = reason;
        self.source = Some(source);
    }
}
