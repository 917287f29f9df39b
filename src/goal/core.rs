use std::sync::{Arc, Mutex};

use axum::extract::FromRef;
use rusqlite::{Connection, Row, params};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::{
    AppState, Error,
    auth::UserID,
    db::{RowsAffected, sql_text_enum},
    money::get_decimal,
};

/// The database ID of a savings goal.
pub type GoalId = i64;

/// What a savings goal is for.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalCategory {
    /// A holiday.
    Vacation,
    /// Buying or repairing a car.
    Car,
    /// A house deposit or renovation.
    Home,
    /// Courses or tuition.
    Education,
    /// A rainy day fund.
    Emergency,
    /// Saving for retirement.
    Retirement,
    /// Anything else.
    #[default]
    Other,
}

sql_text_enum!(GoalCategory {
    Vacation => "vacation",
    Car => "car",
    Home => "home",
    Education => "education",
    Emergency => "emergency",
    Retirement => "retirement",
    Other => "other",
});

/// An amount of money a user wants to save up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    /// The ID of the goal.
    pub id: GoalId,
    /// The user the goal belongs to.
    pub user_id: UserID,
    /// The display name of the goal.
    pub name: String,
    /// How much money the user wants to save.
    pub target_amount: Decimal,
    /// How much has been saved so far.
    pub current_amount: Decimal,
    /// The ISO 4217 currency code of the amounts.
    pub currency: String,
    /// When the user wants to reach the goal by.
    pub deadline: Option<Date>,
    /// Whether the goal has been reached or marked as done.
    pub is_completed: bool,
    /// What the goal is for.
    pub category: GoalCategory,
    /// When the goal was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Goal {
    /// Recompute [Goal::is_completed].
    ///
    /// A goal is complete if `marked_completed` is set or the saved amount has reached the target.
    pub fn update_completion(&mut self, marked_completed: bool) {
        self.is_completed = marked_completed || self.current_amount >= self.target_amount;
    }
}

/// The fields of a goal that has not been stored yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewGoal {
    /// The display name of the goal.
    pub name: String,
    /// How much money the user wants to save.
    pub target_amount: Decimal,
    /// How much has been saved already.
    pub current_amount: Decimal,
    /// The upper-case ISO 4217 currency code.
    pub currency: String,
    /// When the user wants to reach the goal by.
    pub deadline: Option<Date>,
    /// What the goal is for.
    pub category: GoalCategory,
}

/// The state needed by the goal endpoints.
#[derive(Debug, Clone)]
pub struct GoalState {
    /// The database connection for managing goals.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for GoalState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Check that a goal's name is not blank and its target is positive.
pub fn validate_goal(name: &str, target_amount: Decimal) -> Result<String, Error> {
    let name = name.trim();

    if name.is_empty() {
        return Err(Error::Validation("goal name must not be empty".to_owned()));
    }

    if target_amount <= Decimal::ZERO {
        return Err(Error::Validation(
            "goal target amount must be greater than zero".to_owned(),
        ));
    }

    Ok(name.to_owned())
}

pub fn create_goal_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS goal (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL REFERENCES user(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            target_amount TEXT NOT NULL,
            current_amount TEXT NOT NULL,
            currency TEXT NOT NULL,
            deadline TEXT,
            is_completed INTEGER NOT NULL,
            category TEXT NOT NULL,
            created_at TEXT NOT NULL
        )",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_goal_user_id ON goal(user_id)",
        (),
    )?;

    Ok(())
}

const SELECT_GOAL: &str = "SELECT id, user_id, name, target_amount, current_amount, currency, \
    deadline, is_completed, category, created_at FROM goal";

pub fn map_goal_row(row: &Row) -> Result<Goal, rusqlite::Error> {
    Ok(Goal {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        target_amount: get_decimal(row, 3)?,
        current_amount: get_decimal(row, 4)?,
        currency: row.get(5)?,
        deadline: row.get(6)?,
        is_completed: row.get(7)?,
        category: row.get(8)?,
        created_at: row.get(9)?,
    })
}

/// Insert a new goal for `user_id`.
///
/// A goal whose current amount already meets the target is stored as completed.
pub fn create_goal(user_id: UserID, goal: NewGoal, connection: &Connection) -> Result<Goal, Error> {
    let created_at = OffsetDateTime::now_utc();
    let is_completed = goal.current_amount >= goal.target_amount;

    connection.execute(
        "INSERT INTO goal (user_id, name, target_amount, current_amount, currency, deadline, \
            is_completed, category, created_at) \
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            user_id,
            goal.name,
            goal.target_amount.to_string(),
            goal.current_amount.to_string(),
            goal.currency,
            goal.deadline,
            is_completed,
            goal.category,
            created_at,
        ],
    )?;

    Ok(Goal {
        id: connection.last_insert_rowid(),
        user_id,
        name: goal.name,
        target_amount: goal.target_amount,
        current_amount: goal.current_amount,
        currency: goal.currency,
        deadline: goal.deadline,
        is_completed,
        category: goal.category,
        created_at,
    })
}

/// Get a goal and check that it belongs to `user_id`.
///
/// # Errors
/// Returns [Error::NotFound] if there is no goal with `id`, or
/// [Error::Unauthorized] if the goal belongs to another user.
pub fn get_owned_goal(id: GoalId, user_id: UserID, connection: &Connection) -> Result<Goal, Error> {
    let goal = connection
        .prepare(&format!("{SELECT_GOAL} WHERE id = :id"))?
        .query_row(&[(":id", &id)], map_goal_row)?;

    if goal.user_id == user_id {
        Ok(goal)
    } else {
        tracing::warn!("user {user_id} tried to access goal {id} of another user");
        Err(Error::Unauthorized)
    }
}

/// Get all of the goals of `user_id`, oldest first.
pub fn get_goals_for_user(user_id: UserID, connection: &Connection) -> Result<Vec<Goal>, Error> {
    connection
        .prepare(&format!("{SELECT_GOAL} WHERE user_id = :user_id ORDER BY id ASC"))?
        .query_map(&[(":user_id", &user_id)], map_goal_row)?
        .map(|maybe_goal| maybe_goal.map_err(Error::from))
        .collect()
}

/// Overwrite the stored fields of `goal`.
pub fn update_goal(goal: &Goal, connection: &Connection) -> Result<RowsAffected, Error> {
    connection
        .execute(
            "UPDATE goal SET \
                name = ?1, \
                target_amount = ?2, \
                current_amount = ?3, \
                currency = ?4, \
                deadline = ?5, \
                is_completed = ?6, \
                category = ?7 \
            WHERE id = ?8",
            params![
                goal.name,
                goal.target_amount.to_string(),
                goal.current_amount.to_string(),
                goal.currency,
                goal.deadline,
                goal.is_completed,
                goal.category,
                goal.id,
            ],
        )
        .map_err(Error::from)
}

/// Delete the goal with `id`.
pub fn delete_goal(id: GoalId, connection: &Connection) -> Result<RowsAffected, Error> {
    connection
        .execute("DELETE FROM goal WHERE id = :id", &[(":id", &id)])
        .map_err(Error::from)
}
