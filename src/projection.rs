use crate::models::{Goal, GoalView};
use chrono::{Duration, Local, NaiveDate};

pub fn project(goal: &Goal, current: i64) -> GoalView {
    project_at(Local::now().date_naive(), goal, current)
}

/// Progress and forecast for one goal. `remaining` never goes negative; the
/// forecast needs a positive finite rate and rounds the day count up, so a
/// goal 60 short at 2/day lands 30 days out.
pub fn project_at(today: NaiveDate, goal: &Goal, current: i64) -> GoalView {
    let remaining = (goal.target - current).max(0);
    let (days_left, projected_date) = if remaining == 0 {
        (Some(0), Some(today))
    } else if goal.avg_per_day.is_finite() && goal.avg_per_day > 0.0 {
        let days = (remaining as f64 / goal.avg_per_day).ceil() as i64;
        (Some(days), today.checked_add_signed(Duration::days(days)))
    } else {
        (None, None)
    };

    GoalView {
        id: goal.id.clone(),
        name: goal.name.clone(),
        target: goal.target,
        current,
        remaining,
        avg_per_day: goal.avg_per_day,
        days_left,
        projected_date: projected_date.map(|date| date.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn goal(target: i64, avg_per_day: f64) -> Goal {
        Goal {
            id: "water".to_string(),
            name: "Water".to_string(),
            target,
            avg_per_day,
        }
    }

    #[test]
    fn forecast_rounds_days_up_from_today() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let view = project_at(today, &goal(100, 2.0), 40);

        assert_eq!(view.current, 40);
        assert_eq!(view.remaining, 60);
        assert_eq!(view.days_left, Some(30));
        assert_eq!(view.projected_date.as_deref(), Some("2026-03-31"));

        let view = project_at(today, &goal(100, 3.0), 40);
        assert_eq!(view.days_left, Some(20), "60 / 3 = 20");

        let view = project_at(today, &goal(100, 7.0), 40);
        assert_eq!(view.days_left, Some(9), "60 / 7 rounds up");
    }

    #[test]
    fn met_target_projects_today() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let view = project_at(today, &goal(100, 2.0), 120);

        assert_eq!(view.remaining, 0);
        assert_eq!(view.days_left, Some(0));
        assert_eq!(view.projected_date.as_deref(), Some("2026-03-01"));
    }

    #[test]
    fn missing_rate_means_no_forecast() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        for rate in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let view = project_at(today, &goal(100, rate), 40);
            assert_eq!(view.days_left, None, "rate {rate}");
            assert_eq!(view.projected_date, None, "rate {rate}");
        }
    }
}
