//! Compliance coverage and the status dashboard

use chrono::{Days, NaiveDate};
use serde::Serialize;

use crate::core::store::{CapaFilter, RiskFilter, Store, StoreError, TaskFilter};
use crate::entities::risk::RiskLevel;
use crate::entities::task::TaskStatus;
use crate::entities::training::TrainingProgram;

/// Training due within this many days shows on the dashboard
pub const TRAINING_HORIZON_DAYS: u64 = 30;

/// Implementation progress of one framework
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameworkCoverage {
    pub code: String,
    pub name: String,
    pub total: usize,
    pub implemented: usize,
    pub in_progress: usize,
    pub not_applicable: usize,
    pub not_started: usize,
    pub percent: f64,
}

impl FrameworkCoverage {
    /// Implemented share of the applicable controls
    pub fn compute_percent(total: usize, implemented: usize, not_applicable: usize) -> f64 {
        if total == 0 {
            return 0.0;
        }
        let applicable = total.saturating_sub(not_applicable);
        if applicable == 0 {
            return 100.0;
        }
        implemented as f64 / applicable as f64 * 100.0
    }
}

/// Coverage for every seeded framework, ordered by code
pub fn coverage(store: &Store) -> Result<Vec<FrameworkCoverage>, StoreError> {
    let mut stmt = store.connection().prepare(
        r#"SELECT f.code, f.name,
                  COUNT(c.id) AS total,
                  COALESCE(SUM(i.status = 'implemented'), 0) AS implemented,
                  COALESCE(SUM(i.status = 'in_progress'), 0) AS in_progress,
                  COALESCE(SUM(i.status = 'not_applicable'), 0) AS not_applicable
           FROM frameworks f
           LEFT JOIN controls c ON c.framework_id = f.id
           LEFT JOIN control_implementations i ON i.control_id = c.id
           GROUP BY f.id
           ORDER BY f.code"#,
    )?;
    let rows = stmt.query_map([], |row| {
        let total = row.get::<_, i64>("total")? as usize;
        let implemented = row.get::<_, i64>("implemented")? as usize;
        let in_progress = row.get::<_, i64>("in_progress")? as usize;
        let not_applicable = row.get::<_, i64>("not_applicable")? as usize;
        Ok(FrameworkCoverage {
            code: row.get("code")?,
            name: row.get("name")?,
            total,
            implemented,
            in_progress,
            not_applicable,
            not_started: total - implemented - in_progress - not_applicable,
            percent: FrameworkCoverage::compute_percent(total, implemented, not_applicable),
        })
    })?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusCount {
    pub status: TaskStatus,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct LevelCount {
    pub level: RiskLevel,
    pub count: usize,
}

/// Workspace-wide summary shown by `grc status`
#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub today: NaiveDate,
    pub coverage: Vec<FrameworkCoverage>,
    pub tasks: Vec<StatusCount>,
    /// Open tasks past their due date, flagged or not
    pub overdue_tasks: usize,
    pub open_risks: Vec<LevelCount>,
    pub open_capas: usize,
    pub overdue_capas: usize,
    pub training_due: Vec<TrainingProgram>,
}

impl Dashboard {
    pub fn task_count(&self, status: TaskStatus) -> usize {
        self.tasks
            .iter()
            .find(|s| s.status == status)
            .map_or(0, |s| s.count)
    }

    pub fn open_risk_count(&self) -> usize {
        self.open_risks.iter().map(|l| l.count).sum()
    }
}

pub fn dashboard(store: &Store, today: NaiveDate) -> Result<Dashboard, StoreError> {
    let tasks = store.list_tasks(&TaskFilter::default())?;
    let task_counts = TaskStatus::all()
        .iter()
        .map(|status| StatusCount {
            status: *status,
            count: tasks.iter().filter(|t| t.status == *status).count(),
        })
        .collect();
    let overdue_tasks = tasks
        .iter()
        .filter(|t| t.status == TaskStatus::Overdue || t.is_past_due(today))
        .count();

    let risks = store.list_risks(&RiskFilter {
        open_only: true,
        ..Default::default()
    })?;
    let open_risks = RiskLevel::all()
        .iter()
        .rev()
        .map(|level| LevelCount {
            level: *level,
            count: risks.iter().filter(|r| r.level() == *level).count(),
        })
        .collect();

    let capas = store.list_capas(&CapaFilter {
        open_only: true,
        ..Default::default()
    })?;
    let overdue_capas = capas.iter().filter(|c| c.is_overdue(today)).count();

    let horizon = today
        .checked_add_days(Days::new(TRAINING_HORIZON_DAYS))
        .unwrap_or(today);
    let training_due = store
        .list_training()?
        .into_iter()
        .filter(|p| p.is_due_by(horizon))
        .collect();

    Ok(Dashboard {
        today,
        coverage: coverage(store)?,
        tasks: task_counts,
        overdue_tasks,
        open_risks,
        open_capas: capas.len(),
        overdue_capas,
        training_due,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::core::identity::EntityPrefix;
    use crate::core::seed::seed;
    use crate::entities::implementation::ImplementationStatus;
    use crate::entities::risk::Risk;
    use crate::entities::task::Task;
    use crate::entities::training::Frequency;

    const DEMO: &str = r#"
code: DEMO
name: Demo Standard
version: "1"
clauses:
  - ref: "1"
    title: Everything
    controls:
      - { ref: "1.1", title: One }
      - { ref: "1.2", title: Two }
      - { ref: "1.3", title: Three }
      - { ref: "1.4", title: Four }
      - { ref: "1.5", title: Five }
"#;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_percent_edge_cases() {
        assert_eq!(FrameworkCoverage::compute_percent(0, 0, 0), 0.0);
        assert_eq!(FrameworkCoverage::compute_percent(4, 0, 4), 100.0);
        assert_eq!(FrameworkCoverage::compute_percent(5, 2, 1), 50.0);
    }

    #[test]
    fn test_coverage_counts_statuses() {
        let store = Store::open_in_memory().unwrap();
        seed(&store, &Catalog::from_yaml("demo", DEMO).unwrap(), false).unwrap();

        for (reference, status) in [
            ("DEMO:1.1", ImplementationStatus::Implemented),
            ("DEMO:1.2", ImplementationStatus::Implemented),
            ("DEMO:1.3", ImplementationStatus::InProgress),
            ("DEMO:1.4", ImplementationStatus::NotApplicable),
        ] {
            let id = store.resolve(reference, EntityPrefix::Ctrl).unwrap();
            store
                .set_implementation(&id, status, None, None, None, "a")
                .unwrap();
        }

        let rows = coverage(&store).unwrap();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.total, 5);
        assert_eq!(row.implemented, 2);
        assert_eq!(row.in_progress, 1);
        assert_eq!(row.not_applicable, 1);
        assert_eq!(row.not_started, 1);
        assert_eq!(row.percent, 50.0);
    }

    #[test]
    fn test_dashboard_counts() {
        let store = Store::open_in_memory().unwrap();
        let today = date(2026, 3, 1);

        let mut late = Task::new("late".to_string(), "a".to_string());
        late.due_date = Some(date(2026, 2, 1));
        store.insert_task(&late).unwrap();
        store
            .insert_task(&Task::new("fresh".to_string(), "a".to_string()))
            .unwrap();

        let risk = Risk::new("ransomware".to_string(), 5, 4, "a".to_string()).unwrap();
        store.insert_risk(&risk).unwrap();

        let mut soon = TrainingProgram::new("phishing".to_string(), Frequency::Annual, "a".to_string());
        soon.next_due = Some(date(2026, 3, 20));
        store.insert_training(&soon).unwrap();
        let mut later = TrainingProgram::new("bcp drill".to_string(), Frequency::Annual, "a".to_string());
        later.next_due = Some(date(2026, 9, 1));
        store.insert_training(&later).unwrap();

        let board = dashboard(&store, today).unwrap();
        assert_eq!(board.task_count(TaskStatus::Todo), 2);
        assert_eq!(board.overdue_tasks, 1);
        assert_eq!(board.open_risk_count(), 1);
        assert_eq!(board.open_risks[0].level, RiskLevel::Critical);
        assert_eq!(board.open_risks[0].count, 1);
        assert_eq!(board.training_due.len(), 1);
        assert_eq!(board.training_due[0].title, "phishing");
    }
}
