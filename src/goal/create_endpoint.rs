use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use time::Date;

use crate::{
    Error,
    auth::UserID,
    db::lock_connection,
    goal::core::{Goal, GoalCategory, GoalState, NewGoal, create_goal, validate_goal},
    money::currency_or_default,
};

/// The body of a request to create a goal.
#[derive(Debug, Deserialize)]
pub struct GoalForm {
    name: String,
    target_amount: Decimal,
    #[serde(default)]
    current_amount: Decimal,
    currency: Option<String>,
    deadline: Option<Date>,
    #[serde(default)]
    category: GoalCategory,
}

/// A route handler for creating a savings goal.
pub async fn create_goal_endpoint(
    State(state): State<GoalState>,
    Extension(user_id): Extension<UserID>,
    Json(form): Json<GoalForm>,
) -> Result<(StatusCode, Json<Goal>), Error> {
    let new_goal = NewGoal {
        name: validate_goal(&form.name, form.target_amount)?,
        target_amount: form.target_amount,
        current_amount: form.current_amount,
        currency: currency_or_default(form.currency.as_deref())?,
        deadline: form.deadline,
        category: form.category,
    };

    let connection = lock_connection(&state.db_connection)?;
    let goal = create_goal(user_id, new_goal, &connection)?;
    tracing::info!("user {user_id} created goal {}", goal.id);

    Ok((StatusCode::CREATED, Json(goal)))
}
