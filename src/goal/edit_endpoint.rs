use axum::{
    Extension, Json,
    extract::{Path, State},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use time::Date;

use crate::{
    Error,
    auth::UserID,
    db::lock_connection,
    form::deserialize_nullable,
    goal::core::{Goal, GoalCategory, GoalId, GoalState, get_owned_goal, update_goal, validate_goal},
    money::normalize_currency,
};

/// The body of a request to update a goal. Omitted fields keep their stored value, except
/// `is_completed`, which is recomputed from the amounts when omitted. A `null` deadline
/// removes it.
#[derive(Debug, Default, Deserialize)]
pub struct EditGoalForm {
    name: Option<String>,
    target_amount: Option<Decimal>,
    current_amount: Option<Decimal>,
    currency: Option<String>,
    #[serde(default, deserialize_with = "deserialize_nullable")]
    deadline: Option<Option<Date>>,
    category: Option<GoalCategory>,
    is_completed: Option<bool>,
}

impl EditGoalForm {
    fn apply(self, mut goal: Goal) -> Result<Goal, Error> {
        let name = self.name.unwrap_or(goal.name);
        let target_amount = self.target_amount.unwrap_or(goal.target_amount);
        goal.name = validate_goal(&name, target_amount)?;
        goal.target_amount = target_amount;

        if let Some(current_amount) = self.current_amount {
            goal.current_amount = current_amount;
        }

        if let Some(currency) = self.currency {
            goal.currency = normalize_currency(&currency)?;
        }

        if let Some(deadline) = self.deadline {
            goal.deadline = deadline;
        }

        if let Some(category) = self.category {
            goal.category = category;
        }

        goal.update_completion(self.is_completed.unwrap_or(false));

        Ok(goal)
    }
}

/// A route handler for updating a goal of the logged-in user.
pub async fn edit_goal_endpoint(
    State(state): State<GoalState>,
    Extension(user_id): Extension<UserID>,
    Path(goal_id): Path<GoalId>,
    Json(form): Json<EditGoalForm>,
) -> Result<Json<Goal>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    let goal = form.apply(get_owned_goal(goal_id, user_id, &connection)?)?;
    update_goal(&goal, &connection)?;
    tracing::info!("user {user_id} updated goal {goal_id}");

    Ok(Json(goal))
}
