use axum::{
    Extension, Json,
    extract::{Path, State},
};

use crate::{
    Error,
    auth::UserID,
    db::lock_connection,
    goal::core::{Goal, GoalId, GoalState, get_goals_for_user, get_owned_goal},
};

/// A route handler that lists the goals of the logged-in user.
pub async fn get_goals_endpoint(
    State(state): State<GoalState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Json<Vec<Goal>>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_goals_for_user(user_id, &connection).map(Json)
}

/// A route handler that gets a single goal of the logged-in user.
pub async fn get_goal_endpoint(
    State(state): State<GoalState>,
    Extension(user_id): Extension<UserID>,
    Path(goal_id): Path<GoalId>,
) -> Result<Json<Goal>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_owned_goal(goal_id, user_id, &connection).map(Json)
}
