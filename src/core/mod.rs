pub mod comparator;
pub mod discovery;
pub mod domain;
pub mod judging;
pub mod pipeline;
pub mod reporter;
pub mod traits;
