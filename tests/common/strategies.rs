#![allow(dead_code)]

use proptest::prelude::*;
use tasker_planning::constants::PLANNING_USER_ID;
use tasker_planning::models::{Solution, User};

use super::builders::{task, user_with_tasks};

/// (pinned, non pinned) task counts of one regular user
pub fn user_shape_strategy() -> impl Strategy<Value = (usize, usize)> {
    (0usize..4, 0usize..6)
}

pub fn window_size_strategy() -> impl Strategy<Value = usize> {
    0usize..6
}

/// Initialized solution with a planning user holding `0..5` tasks and up to four
/// regular users. Task ids are unique across the solution.
pub fn solution_strategy() -> impl Strategy<Value = Solution> {
    (
        0usize..5,
        prop::collection::vec(user_shape_strategy(), 0..4),
    )
        .prop_map(|(reservoir, shapes)| {
            let mut next_id = 0;
            let mut planning_user = User::new(PLANNING_USER_ID);
            for _ in 0..reservoir {
                next_id += 1;
                planning_user.insert_task(task(next_id));
            }

            let mut users = vec![planning_user];
            for (position, (pinned, non_pinned)) in shapes.into_iter().enumerate() {
                users.push(user_with_tasks(
                    &format!("user-{position}"),
                    pinned,
                    non_pinned,
                    &mut next_id,
                ));
            }
            Solution::new(users)
        })
}
