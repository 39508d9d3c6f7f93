mod catalog_rules;
mod merge_token;

pub use catalog_rules::{check_item_available, quantity_from_f64, resolve_options, ServingWindow};
pub use merge_token::{MergeClaims, MergeTokenError, MergeTokenIssuer, MERGE_TOKEN_LIFETIME_MINUTES};
