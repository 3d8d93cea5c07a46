use chrono::{Datelike, Days, Months, NaiveDate};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use vigia_common::status::{ActionStatus, ReportStatus};
use vigia_common::types::{
    ActionStats, AdminDashboard, AdminStats, DashboardSummary, MonthlyCount, ReportStats,
};

use crate::entities::{preventive_action, report};
use crate::error::Result;
use crate::store::Store;

const RECENT_ON_DASHBOARD: usize = 5;
const RECENT_ON_ADMIN_DASHBOARD: usize = 10;
const MONTHLY_WINDOW: u32 = 6;

/// First day of the month `back` months before the one containing `day`,
/// and the first day of the month after it.
fn month_bounds(day: NaiveDate, back: u32) -> (NaiveDate, NaiveDate) {
    let first = day - Days::new(u64::from(day.day0()));
    let start = first - Months::new(back);
    (start, start + Months::new(1))
}

impl Store {
    async fn report_stats(&self, today: NaiveDate) -> Result<ReportStats> {
        let (month_start, month_end) = month_bounds(today, 0);
        let count_status = |status: ReportStatus| {
            report::Entity::find()
                .filter(report::Column::Status.eq(status.as_str()))
                .count(self.db())
        };
        Ok(ReportStats {
            total: report::Entity::find().count(self.db()).await?,
            in_progress: count_status(ReportStatus::InProgress).await?,
            completed: count_status(ReportStatus::Completed).await?,
            this_month: report::Entity::find()
                .filter(report::Column::ReportDate.gte(month_start))
                .filter(report::Column::ReportDate.lt(month_end))
                .count(self.db())
                .await?,
        })
    }

    async fn count_actions_between(&self, start: NaiveDate, end: NaiveDate) -> Result<u64> {
        Ok(preventive_action::Entity::find()
            .filter(preventive_action::Column::RegistrationDate.gte(start))
            .filter(preventive_action::Column::RegistrationDate.lt(end))
            .count(self.db())
            .await?)
    }

    async fn action_stats(&self, today: NaiveDate) -> Result<ActionStats> {
        let (month_start, month_end) = month_bounds(today, 0);
        Ok(ActionStats {
            total: self.count_actions(None).await?,
            completed: self.count_actions(Some(ActionStatus::Completed)).await?,
            in_process: self.count_actions(Some(ActionStatus::InProcess)).await?,
            registered: self.count_actions(Some(ActionStatus::Registered)).await?,
            this_month: self.count_actions_between(month_start, month_end).await?,
        })
    }

    /// Landing page figures for any signed-in user. "This month" is the
    /// calendar month containing `today`.
    pub async fn dashboard_summary(&self, today: NaiveDate) -> Result<DashboardSummary> {
        Ok(DashboardSummary {
            reports: self.report_stats(today).await?,
            actions: self.action_stats(today).await?,
            recent_reports: self.list_reports(None, RECENT_ON_DASHBOARD, 0).await?,
            recent_actions: self.list_actions(None, RECENT_ON_DASHBOARD, 0).await?,
        })
    }

    /// Administrator view over preventive actions.
    ///
    /// Overdue actions have an end date before `today` and are neither
    /// completed nor cancelled. `monthly` covers the trailing six calendar
    /// months including the current one, oldest first.
    pub async fn admin_dashboard(&self, today: NaiveDate) -> Result<AdminDashboard> {
        let overdue = preventive_action::Entity::find()
            .filter(preventive_action::Column::EndDate.lt(today))
            .filter(preventive_action::Column::Status.is_not_in([
                ActionStatus::Completed.as_str(),
                ActionStatus::Cancelled.as_str(),
            ]))
            .count(self.db())
            .await?;

        let mut monthly = Vec::with_capacity(MONTHLY_WINDOW as usize);
        for back in (0..MONTHLY_WINDOW).rev() {
            let (start, end) = month_bounds(today, back);
            monthly.push(MonthlyCount {
                month: start.format("%Y-%m").to_string(),
                count: self.count_actions_between(start, end).await?,
            });
        }

        Ok(AdminDashboard {
            total: self.count_actions(None).await?,
            completed: self.count_actions(Some(ActionStatus::Completed)).await?,
            in_process: self.count_actions(Some(ActionStatus::InProcess)).await?,
            pending: self.count_actions(Some(ActionStatus::Registered)).await?,
            overdue,
            recent_actions: self.list_actions(None, RECENT_ON_ADMIN_DASHBOARD, 0).await?,
            monthly,
        })
    }

    /// Pending commitments are registered or in-progress reports that carry
    /// a commitment date.
    pub async fn admin_stats(&self, today: NaiveDate) -> Result<AdminStats> {
        let (month_start, month_end) = month_bounds(today, 0);
        let reports_this_month = report::Entity::find()
            .filter(report::Column::ReportDate.gte(month_start))
            .filter(report::Column::ReportDate.lt(month_end))
            .count(self.db())
            .await?;
        let pending_commitments = report::Entity::find()
            .filter(report::Column::Status.is_in([
                ReportStatus::Registered.as_str(),
                ReportStatus::InProgress.as_str(),
            ]))
            .filter(report::Column::CommitmentDate.is_not_null())
            .count(self.db())
            .await?;
        Ok(AdminStats {
            active_users: self.count_active_users().await?,
            reports_this_month,
            pending_commitments,
        })
    }
}
