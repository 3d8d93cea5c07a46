pub mod action_follow_up;
pub mod catalog_item;
pub mod commitment_follow_up;
pub mod edit_history;
pub mod folio_sequence;
pub mod preventive_action;
pub mod report;
pub mod user;
