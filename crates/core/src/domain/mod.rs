pub mod analytics;
pub mod context;
pub mod history;
pub mod partner;
pub mod product;
pub mod recommendation;
pub mod rule;
