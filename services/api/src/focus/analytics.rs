//! Analytics over persisted focus sessions
//!
//! Every report is computed from scratch at request time; nothing is
//! cached between calls. All queries are scoped to one user.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Months, NaiveDate, Utc};
use serde::Serialize;
use sqlx::{PgPool, Row};
use tracing::error;
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    focus::seconds_to_minutes,
    models::focus::AnalyticsQuery,
    validation::parse_datetime,
};

const PERIODS: [&str; 5] = ["1d", "7d", "30d", "90d", "1y"];

/// Resolved date range for a report
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalyticsWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsOverview {
    pub total_sessions: i64,
    pub total_focus_time: i64,
    pub work_sessions: i64,
    pub work_time: i64,
    pub average_session_length: f64,
    pub interrupted_sessions: i64,
    pub streak_days: i64,
    pub total_focus_hours: f64,
    pub average_session_minutes: i64,
    pub completion_rate: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyStat {
    pub date: NaiveDate,
    pub sessions: i64,
    pub total_time: i64,
    pub work_time: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopTask {
    pub task_id: Uuid,
    pub task_title: String,
    pub task_category: Option<String>,
    pub total_time: i64,
    pub sessions: i64,
}

/// One day of work-type focus, in whole minutes
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeatmapDay {
    pub date: NaiveDate,
    pub value: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsPeriod {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub days: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsReport {
    pub overview: AnalyticsOverview,
    pub daily_stats: Vec<DailyStat>,
    pub top_tasks: Vec<TopTask>,
    pub heatmap: Vec<HeatmapDay>,
    pub period: AnalyticsPeriod,
}

#[derive(Debug, Default)]
struct OverviewTotals {
    total_sessions: i64,
    total_focus_time: i64,
    work_sessions: i64,
    work_time: i64,
    average_session_length: f64,
    interrupted_sessions: i64,
}

/// Turn the raw query parameters into a concrete date range
///
/// An explicit start date wins over the period shorthand; otherwise the
/// period is subtracted from the end of the range, which defaults to now.
pub fn resolve_window(query: &AnalyticsQuery, now: DateTime<Utc>) -> ApiResult<AnalyticsWindow> {
    let period = query.period.as_deref().unwrap_or("7d");
    if !PERIODS.contains(&period) {
        return Err(ApiError::Validation(
            "Period must be one of: 1d, 7d, 30d, 90d, 1y".to_string(),
        ));
    }

    let end = match query.end_date.as_deref() {
        Some(value) => parse_datetime(value, "End date must be a valid ISO8601 date")?,
        None => now,
    };

    let start = match query.start_date.as_deref() {
        Some(value) => parse_datetime(value, "Start date must be a valid ISO8601 date")?,
        None => match period {
            "1d" => end - Duration::days(1),
            "30d" => end - Duration::days(30),
            "90d" => end - Duration::days(90),
            "1y" => end
                .checked_sub_months(Months::new(12))
                .unwrap_or(end - Duration::days(365)),
            _ => end - Duration::days(7),
        },
    };

    Ok(AnalyticsWindow { start, end })
}

/// Number of calendar days the window spans, rounded up
pub fn window_days(window: &AnalyticsWindow) -> i64 {
    ((window.end - window.start).num_seconds() as f64 / 86_400.0).ceil() as i64
}

/// Share of sessions completed without interruption, as a whole percentage
fn completion_rate(total_sessions: i64, interrupted_sessions: i64) -> i64 {
    if total_sessions == 0 {
        return 100;
    }
    ((1.0 - interrupted_sessions as f64 / total_sessions as f64) * 100.0).round() as i64
}

/// Total focused time in hours, kept to one decimal place
fn focus_hours(total_seconds: i64) -> f64 {
    (total_seconds as f64 / 3600.0 * 10.0).round() / 10.0
}

/// Consecutive work days ending yesterday; the current partial day never
/// counts toward the streak
fn count_streak(work_days: &HashSet<NaiveDate>, today: NaiveDate) -> i64 {
    let mut streak = 0;
    let mut day = today;
    for _ in 0..365 {
        let Some(prev) = day.pred_opt() else { break };
        day = prev;
        if work_days.contains(&day) {
            streak += 1;
        } else {
            break;
        }
    }
    streak
}

#[derive(Clone)]
pub struct AnalyticsEngine {
    pool: PgPool,
}

impl AnalyticsEngine {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn report(&self, user_id: Uuid, query: &AnalyticsQuery) -> ApiResult<AnalyticsReport> {
        let now = Utc::now();
        let window = resolve_window(query, now)?;

        self.build_report(user_id, window, now).await.map_err(|e| {
            error!("Failed to compute focus analytics: {}", e);
            ApiError::InternalServerError
        })
    }

    async fn build_report(
        &self,
        user_id: Uuid,
        window: AnalyticsWindow,
        now: DateTime<Utc>,
    ) -> anyhow::Result<AnalyticsReport> {
        let totals = self.overview_totals(user_id, &window).await?;
        let daily_stats = self.daily_breakdown(user_id, &window).await?;
        let top_tasks = self.top_tasks(user_id, &window).await?;
        let streak_days = self.streak_days(user_id, now).await?;
        let heatmap = self.heatmap(user_id, now).await?;

        let overview = AnalyticsOverview {
            total_sessions: totals.total_sessions,
            total_focus_time: totals.total_focus_time,
            work_sessions: totals.work_sessions,
            work_time: totals.work_time,
            average_session_length: totals.average_session_length,
            interrupted_sessions: totals.interrupted_sessions,
            streak_days,
            total_focus_hours: focus_hours(totals.total_focus_time),
            average_session_minutes: (totals.average_session_length / 60.0).round() as i64,
            completion_rate: completion_rate(totals.total_sessions, totals.interrupted_sessions),
        };

        Ok(AnalyticsReport {
            overview,
            daily_stats,
            top_tasks,
            heatmap,
            period: AnalyticsPeriod {
                start: window.start,
                end: window.end,
                days: window_days(&window),
            },
        })
    }

    async fn overview_totals(
        &self,
        user_id: Uuid,
        window: &AnalyticsWindow,
    ) -> anyhow::Result<OverviewTotals> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS total_sessions,
                   COALESCE(SUM(duration_sec), 0)::bigint AS total_focus_time,
                   COUNT(*) FILTER (WHERE session_type = 'work') AS work_sessions,
                   COALESCE(SUM(duration_sec) FILTER (WHERE session_type = 'work'), 0)::bigint AS work_time,
                   COALESCE(AVG(duration_sec), 0)::float8 AS average_session_length,
                   COUNT(*) FILTER (WHERE interrupted) AS interrupted_sessions
            FROM focus_sessions
            WHERE user_id = $1 AND start_at >= $2 AND start_at <= $3
            "#,
        )
        .bind(user_id)
        .bind(window.start)
        .bind(window.end)
        .fetch_one(&self.pool)
        .await?;

        Ok(OverviewTotals {
            total_sessions: row.get("total_sessions"),
            total_focus_time: row.get("total_focus_time"),
            work_sessions: row.get("work_sessions"),
            work_time: row.get("work_time"),
            average_session_length: row.get("average_session_length"),
            interrupted_sessions: row.get("interrupted_sessions"),
        })
    }

    async fn daily_breakdown(
        &self,
        user_id: Uuid,
        window: &AnalyticsWindow,
    ) -> anyhow::Result<Vec<DailyStat>> {
        let rows = sqlx::query(
            r#"
            SELECT (start_at AT TIME ZONE 'UTC')::date AS date,
                   COUNT(*) AS sessions,
                   COALESCE(SUM(duration_sec), 0)::bigint AS total_time,
                   COALESCE(SUM(duration_sec) FILTER (WHERE session_type = 'work'), 0)::bigint AS work_time
            FROM focus_sessions
            WHERE user_id = $1 AND start_at >= $2 AND start_at <= $3
            GROUP BY (start_at AT TIME ZONE 'UTC')::date
            ORDER BY date ASC
            "#,
        )
        .bind(user_id)
        .bind(window.start)
        .bind(window.end)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| DailyStat {
                date: row.get("date"),
                sessions: row.get("sessions"),
                total_time: row.get("total_time"),
                work_time: row.get("work_time"),
            })
            .collect())
    }

    async fn top_tasks(
        &self,
        user_id: Uuid,
        window: &AnalyticsWindow,
    ) -> anyhow::Result<Vec<TopTask>> {
        let rows = sqlx::query(
            r#"
            SELECT fs.task_id, t.title AS task_title, t.category AS task_category,
                   COALESCE(SUM(fs.duration_sec), 0)::bigint AS total_time,
                   COUNT(*) AS sessions
            FROM focus_sessions fs
            JOIN tasks t ON t.id = fs.task_id
            WHERE fs.user_id = $1 AND fs.start_at >= $2 AND fs.start_at <= $3
              AND fs.session_type = 'work'
            GROUP BY fs.task_id, t.title, t.category
            ORDER BY total_time DESC
            LIMIT 10
            "#,
        )
        .bind(user_id)
        .bind(window.start)
        .bind(window.end)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| TopTask {
                task_id: row.get("task_id"),
                task_title: row.get("task_title"),
                task_category: row.get("task_category"),
                total_time: row.get("total_time"),
                sessions: row.get("sessions"),
            })
            .collect())
    }

    async fn streak_days(&self, user_id: Uuid, now: DateTime<Utc>) -> anyhow::Result<i64> {
        // One extra day of lookback so the walk can start at yesterday
        let since = now - Duration::days(366);

        let rows = sqlx::query(
            r#"
            SELECT DISTINCT (start_at AT TIME ZONE 'UTC')::date AS day
            FROM focus_sessions
            WHERE user_id = $1 AND session_type = 'work' AND start_at >= $2
            "#,
        )
        .bind(user_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        let work_days: HashSet<NaiveDate> = rows.iter().map(|row| row.get("day")).collect();
        Ok(count_streak(&work_days, now.date_naive()))
    }

    async fn heatmap(&self, user_id: Uuid, now: DateTime<Utc>) -> anyhow::Result<Vec<HeatmapDay>> {
        let since = now
            .checked_sub_months(Months::new(12))
            .unwrap_or(now - Duration::days(365));

        let rows = sqlx::query(
            r#"
            SELECT (start_at AT TIME ZONE 'UTC')::date AS date,
                   COALESCE(SUM(duration_sec), 0)::bigint AS seconds
            FROM focus_sessions
            WHERE user_id = $1 AND session_type = 'work' AND start_at >= $2
            GROUP BY (start_at AT TIME ZONE 'UTC')::date
            ORDER BY date ASC
            "#,
        )
        .bind(user_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| HeatmapDay {
                date: row.get("date"),
                value: seconds_to_minutes(row.get("seconds")),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(start: Option<&str>, end: Option<&str>, period: Option<&str>) -> AnalyticsQuery {
        AnalyticsQuery {
            start_date: start.map(String::from),
            end_date: end.map(String::from),
            period: period.map(String::from),
        }
    }

    fn fixed_now() -> DateTime<Utc> {
        "2025-06-15T10:30:00Z".parse().unwrap()
    }

    #[test]
    fn test_window_defaults_to_seven_days_ending_now() {
        let window = resolve_window(&query(None, None, None), fixed_now()).unwrap();

        assert_eq!(window.end, fixed_now());
        assert_eq!(window.start, fixed_now() - Duration::days(7));
        assert_eq!(window_days(&window), 7);
    }

    #[test]
    fn test_window_period_subtracts_from_end() {
        let window =
            resolve_window(&query(None, Some("2025-06-10T00:00:00Z"), Some("30d")), fixed_now())
                .unwrap();

        assert_eq!(window.end, "2025-06-10T00:00:00Z".parse::<DateTime<Utc>>().unwrap());
        assert_eq!(window.start, window.end - Duration::days(30));
        assert_eq!(window_days(&window), 30);
    }

    #[test]
    fn test_window_one_year_uses_calendar_months() {
        let window = resolve_window(&query(None, None, Some("1y")), fixed_now()).unwrap();

        assert_eq!(window.start, "2024-06-15T10:30:00Z".parse::<DateTime<Utc>>().unwrap());
    }

    #[test]
    fn test_window_explicit_start_wins_over_period() {
        let window =
            resolve_window(&query(Some("2025-06-01"), None, Some("90d")), fixed_now()).unwrap();

        assert_eq!(window.start, "2025-06-01T00:00:00Z".parse::<DateTime<Utc>>().unwrap());
        assert_eq!(window.end, fixed_now());
    }

    #[test]
    fn test_window_rejects_unknown_period() {
        let err = resolve_window(&query(None, None, Some("2w")), fixed_now()).unwrap_err();

        assert_eq!(
            err.to_string(),
            "Period must be one of: 1d, 7d, 30d, 90d, 1y"
        );
    }

    #[test]
    fn test_window_days_rounds_up_partial_days() {
        let window = AnalyticsWindow {
            start: "2025-06-01T00:00:00Z".parse().unwrap(),
            end: "2025-06-08T00:00:01Z".parse().unwrap(),
        };

        assert_eq!(window_days(&window), 8);
    }

    #[test]
    fn test_completion_rate_boundaries() {
        assert_eq!(completion_rate(0, 0), 100);
        assert_eq!(completion_rate(5, 0), 100);
        assert_eq!(completion_rate(4, 1), 75);
        assert_eq!(completion_rate(3, 2), 33);
        assert_eq!(completion_rate(2, 2), 0);
    }

    #[test]
    fn test_focus_hours_keeps_one_decimal() {
        assert_eq!(focus_hours(0), 0.0);
        assert_eq!(focus_hours(5400), 1.5);
        assert_eq!(focus_hours(5370), 1.5);
        assert_eq!(focus_hours(3000), 0.8);
    }

    #[test]
    fn test_streak_counts_back_from_yesterday() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();
        let mut work_days = HashSet::new();
        work_days.insert(NaiveDate::from_ymd_opt(2025, 6, 14).unwrap());
        work_days.insert(NaiveDate::from_ymd_opt(2025, 6, 13).unwrap());

        assert_eq!(count_streak(&work_days, today), 2);
    }

    #[test]
    fn test_streak_ignores_today() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();
        let mut work_days = HashSet::new();
        work_days.insert(today);

        assert_eq!(count_streak(&work_days, today), 0);
    }

    #[test]
    fn test_streak_breaks_on_first_gap() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();
        let mut work_days = HashSet::new();
        work_days.insert(NaiveDate::from_ymd_opt(2025, 6, 14).unwrap());
        work_days.insert(NaiveDate::from_ymd_opt(2025, 6, 12).unwrap());

        assert_eq!(count_streak(&work_days, today), 1);
    }

    #[test]
    fn test_streak_caps_at_a_year() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();
        let mut work_days = HashSet::new();
        let mut day = today;
        for _ in 0..400 {
            day = day.pred_opt().unwrap();
            work_days.insert(day);
        }

        assert_eq!(count_streak(&work_days, today), 365);
    }
}
