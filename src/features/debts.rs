//! Debts and their payments

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;
use tracing::{debug, info};

use crate::core::{Module, RouteMatch};
use crate::display::{format_debt_details, format_debt_list};
use crate::error::{SheetbookError, SheetbookResult};
use crate::models::state::paths;
use crate::models::{Debt, DebtId, Money};
use crate::reports::{DebtOverview, DebtSummary};

use super::{
    find_unique, invalidate_on, FeatureContext, ViewCache, Watches, AUTH_LOGIN, AUTH_LOGOUT,
};

pub const DEBTS_ROUTE: &str = "/debts";
pub const DEBT_ROUTE: &str = "/debt/:id";

pub struct DebtsModule {
    ctx: FeatureContext,
    view: Arc<ViewCache>,
    watches: Watches,
    stale: AtomicBool,
}

impl DebtsModule {
    pub fn new(ctx: FeatureContext) -> Self {
        Self {
            ctx,
            view: Arc::new(ViewCache::default()),
            watches: Watches::default(),
            stale: AtomicBool::new(true),
        }
    }

    /// Debts in state, open ones first
    pub fn debts(&self) -> Vec<Debt> {
        self.ctx
            .state
            .get_as(paths::DEBTS)
            .ok()
            .flatten()
            .unwrap_or_default()
    }

    pub fn selected_debt(&self) -> Option<DebtId> {
        self.ctx.state.get_as(paths::SELECTED_DEBT).ok().flatten()
    }

    pub async fn refresh(&self) -> SheetbookResult<()> {
        let debts = match self.ctx.current_user() {
            Some(user) => self.ctx.api.list_debts(user.user_id).await?,
            None => Vec::new(),
        };
        debug!(debts = debts.len(), "Loaded debts");
        self.ctx.state.set_as(paths::DEBTS, &debts)?;
        self.stale.store(false, Ordering::SeqCst);
        Ok(())
    }

    pub async fn ensure_loaded(&self) -> SheetbookResult<()> {
        if self.stale.load(Ordering::SeqCst) {
            self.refresh().await?;
        }
        Ok(())
    }

    pub fn find_debt(&self, input: &str) -> SheetbookResult<Debt> {
        let debts = self.debts();
        find_unique(
            &debts,
            input,
            |debt, input| debt.id.matches(input),
            || SheetbookError::debt_not_found(input.trim()),
        )
        .cloned()
    }

    pub async fn add_debt(
        &self,
        creditor: &str,
        amount: Money,
        date: NaiveDate,
        notes: Option<&str>,
    ) -> SheetbookResult<Debt> {
        let user = self.ctx.require_user()?;
        let mut debt = Debt::new(user.user_id, creditor, amount, date);
        if let Some(notes) = notes {
            debt = debt.with_notes(notes);
        }
        debt.validate()?;
        self.ensure_loaded().await?;

        let created = self.ctx.api.create_debt(debt).await?;
        let mut debts = self.debts();
        debts.push(created.clone());
        self.store(debts)?;

        info!(debt = %created.id, creditor = %created.creditor, amount = %created.amount, "Debt added");
        Ok(created)
    }

    /// Record a payment; returns the updated debt
    pub async fn record_payment(
        &self,
        input: &str,
        amount: Money,
        date: NaiveDate,
    ) -> SheetbookResult<Debt> {
        let user = self.ctx.require_user()?;
        if !amount.is_positive() {
            return Err(SheetbookError::Validation(
                "Payment amount must be greater than zero".into(),
            ));
        }
        self.ensure_loaded().await?;
        let debt = self.find_debt(input)?;

        let updated = self
            .ctx
            .api
            .record_payment(user.user_id, debt.id, amount, date)
            .await?;
        let debts = self
            .debts()
            .into_iter()
            .map(|d| if d.id == updated.id { updated.clone() } else { d })
            .collect();
        self.store(debts)?;

        info!(
            debt = %updated.id,
            amount = %amount,
            remaining = %updated.remaining(),
            "Payment recorded"
        );
        Ok(updated)
    }

    pub async fn remove_debt(&self, input: &str) -> SheetbookResult<Debt> {
        let user = self.ctx.require_user()?;
        self.ensure_loaded().await?;
        let debt = self.find_debt(input)?;

        self.ctx.api.delete_debt(user.user_id, debt.id).await?;
        let debts = self.debts().into_iter().filter(|d| d.id != debt.id).collect();
        self.store(debts)?;
        if self.selected_debt() == Some(debt.id) {
            self.ctx.state.set_state(paths::SELECTED_DEBT, Value::Null)?;
        }

        info!(debt = %debt.id, "Debt removed");
        Ok(debt)
    }

    fn store(&self, mut debts: Vec<Debt>) -> SheetbookResult<()> {
        debts.sort_by_key(|d| (d.is_settled(), d.date, d.created_at));
        self.ctx.state.set_as(paths::DEBTS, &debts)?;
        Ok(())
    }

    fn render_view(&self) -> String {
        let debts = self.debts();
        let symbol = self.ctx.symbol();
        let selected = self
            .selected_debt()
            .and_then(|id| debts.iter().find(|d| d.id == id));
        match selected {
            Some(debt) => format_debt_details(debt, &DebtSummary::compute(debt), symbol),
            None => format_debt_list(&DebtOverview::compute(&debts), symbol),
        }
    }
}

#[async_trait]
impl Module for DebtsModule {
    fn id(&self) -> &str {
        "debts"
    }

    fn name(&self) -> &str {
        "Debts"
    }

    fn dependencies(&self) -> Vec<String> {
        vec!["auth".to_string()]
    }

    fn routes(&self) -> Vec<String> {
        vec![DEBTS_ROUTE.to_string(), DEBT_ROUTE.to_string()]
    }

    fn events(&self) -> Vec<String> {
        vec![AUTH_LOGIN.to_string(), AUTH_LOGOUT.to_string()]
    }

    fn handle_event(&self, topic: &str, _payload: &Value) -> anyhow::Result<()> {
        debug!(topic = topic, "Debts marked stale");
        self.stale.store(true, Ordering::SeqCst);
        self.view.invalidate();
        Ok(())
    }

    async fn init(&self) -> anyhow::Result<()> {
        self.watches.replace(invalidate_on(
            &self.ctx.state,
            &[paths::DEBTS, paths::SELECTED_DEBT],
            &self.view,
        )?);
        self.refresh().await?;
        Ok(())
    }

    async fn activate(&self) -> anyhow::Result<()> {
        self.ensure_loaded().await?;
        Ok(())
    }

    async fn on_route(&self, route: &RouteMatch) -> anyhow::Result<()> {
        let selected = match route.param("id") {
            Some(input) => Some(self.find_debt(input)?.id),
            None => None,
        };
        self.ctx.state.set_as(paths::SELECTED_DEBT, &selected)?;
        Ok(())
    }

    fn render(&self) -> Option<String> {
        Some(self.view.get_or_render(|| self.render_view()))
    }
}
