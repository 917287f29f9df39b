//! Savings goals.

mod contribute_endpoint;
mod core;
mod create_endpoint;
mod delete_endpoint;
mod edit_endpoint;
mod list_endpoint;

pub use contribute_endpoint::contribute_to_goal_endpoint;
pub use core::{Goal, GoalCategory, GoalId, create_goal_table};
pub use create_endpoint::create_goal_endpoint;
pub use delete_endpoint::delete_goal_endpoint;
pub use edit_endpoint::edit_goal_endpoint;
pub use list_endpoint::{get_goal_endpoint, get_goals_endpoint};
