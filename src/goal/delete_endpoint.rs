use axum::{
    Extension, Json,
    extract::{Path, State},
};
use serde_json::{Value, json};

use crate::{
    Error,
    auth::UserID,
    db::lock_connection,
    goal::core::{GoalId, GoalState, delete_goal, get_owned_goal},
};

/// A route handler for deleting a goal of the logged-in user.
pub async fn delete_goal_endpoint(
    State(state): State<GoalState>,
    Extension(user_id): Extension<UserID>,
    Path(goal_id): Path<GoalId>,
) -> Result<Json<Value>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_owned_goal(goal_id, user_id, &connection)?;
    delete_goal(goal_id, &connection)?;
    tracing::info!("user {user_id} deleted goal {goal_id}");

    Ok(Json(json!({ "message": "Goal removed" })))
}
