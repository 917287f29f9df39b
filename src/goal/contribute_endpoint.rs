use axum::{
    Extension, Json,
    extract::{Path, State},
};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::{
    Error,
    auth::UserID,
    db::lock_connection,
    goal::core::{Goal, GoalId, GoalState, get_owned_goal, update_goal},
};

/// The body of a contribution to a goal.
#[derive(Debug, Deserialize)]
pub struct ContributionForm {
    amount: Decimal,
}

/// A route handler that adds money to the saved amount of a goal.
///
/// The goal is marked completed once the saved amount reaches the target.
pub async fn contribute_to_goal_endpoint(
    State(state): State<GoalState>,
    Extension(user_id): Extension<UserID>,
    Path(goal_id): Path<GoalId>,
    Json(form): Json<ContributionForm>,
) -> Result<Json<Goal>, Error> {
    if form.amount <= Decimal::ZERO {
        return Err(Error::Validation(
            "contribution must be greater than zero".to_owned(),
        ));
    }

    let connection = lock_connection(&state.db_connection)?;

    let mut goal = get_owned_goal(goal_id, user_id, &connection)?;
    goal.current_amount += form.amount;
    goal.update_completion(goal.is_completed);
    update_goal(&goal, &connection)?;

    tracing::info!(
        "user {user_id} contributed {} to goal {goal_id}",
        form.amount
    );

    Ok(Json(goal))
}
