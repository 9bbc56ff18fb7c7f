pub mod product;
pub mod recommendation;
pub mod widget;

pub use product::{Catalog, Product};
pub use recommendation::{
    Recommendation, RecommendationSource, ScoringRequest, ScoringResponse, SCORING_INSTRUCTION,
};
pub use widget::{Transition, WidgetEvent, WidgetState, WidgetStatus};
